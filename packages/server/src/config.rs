use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domains::phone_verification::OtpSettings;

/// Twilio credentials; present only when every variable is set
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub twilio: Option<TwilioConfig>,
    pub otp_ttl_secs: i64,
    pub otp_max_attempts: i32,
    pub otp_call_timeout_secs: u64,
    pub otp_hash_memory_kib: u32,
    pub otp_hash_iterations: u32,
    pub otp_sweep_enabled: bool,
    pub rate_limit_enabled: bool,
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: parse_or("PORT", 8080)?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "agrimarket".to_string()),
            twilio: twilio_from_env(),
            otp_ttl_secs: parse_or("OTP_TTL_SECS", 300)?,
            otp_max_attempts: parse_or("OTP_MAX_ATTEMPTS", 5)?,
            otp_call_timeout_secs: parse_or("OTP_CALL_TIMEOUT_SECS", 5)?,
            otp_hash_memory_kib: parse_or("OTP_HASH_MEMORY_KIB", argon2::Params::DEFAULT_M_COST)?,
            otp_hash_iterations: parse_or("OTP_HASH_ITERATIONS", argon2::Params::DEFAULT_T_COST)?,
            otp_sweep_enabled: parse_or("OTP_SWEEP_ENABLED", false)?,
            rate_limit_enabled: parse_or("RATE_LIMIT_ENABLED", true)?,
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }

    /// OTP policy derived from this configuration
    pub fn otp_settings(&self) -> OtpSettings {
        OtpSettings {
            ttl: chrono::Duration::seconds(self.otp_ttl_secs),
            max_attempts: self.otp_max_attempts,
            call_timeout: Duration::from_secs(self.otp_call_timeout_secs),
        }
    }
}

/// Twilio is optional: without it, issued codes are returned to the caller.
fn twilio_from_env() -> Option<TwilioConfig> {
    let account_sid = env::var("TWILIO_ACCOUNT_SID").ok().filter(|v| !v.is_empty())?;
    let auth_token = env::var("TWILIO_AUTH_TOKEN").ok().filter(|v| !v.is_empty())?;
    let from_number = env::var("TWILIO_FROM_NUMBER").ok().filter(|v| !v.is_empty())?;

    Some(TwilioConfig {
        account_sid,
        auth_token,
        from_number,
    })
}

fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid value, got {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_falls_back_to_default() {
        let value: u16 = parse_or("CONFIG_TEST_UNSET_PORT", 9090).unwrap();
        assert_eq!(value, 9090);
    }

    #[test]
    fn test_parse_or_rejects_garbage() {
        env::set_var("CONFIG_TEST_BAD_ATTEMPTS", "five");
        let result: Result<i32> = parse_or("CONFIG_TEST_BAD_ATTEMPTS", 5);
        assert!(result.is_err());
        env::remove_var("CONFIG_TEST_BAD_ATTEMPTS");
    }

    #[test]
    fn test_parse_or_reads_bool() {
        env::set_var("CONFIG_TEST_SWEEP", "true");
        let value: bool = parse_or("CONFIG_TEST_SWEEP", false).unwrap();
        assert!(value);
        env::remove_var("CONFIG_TEST_SWEEP");
    }
}
