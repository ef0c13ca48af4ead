//! OTP code generation and hashing.
//!
//! Codes are hashed with Argon2id and a per-code random salt. The PHC string
//! produced by `CodeHasher::hash` embeds the salt and cost parameters, so
//! verification works even after the configured cost changes.

use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::Rng;

/// Smallest and largest 6-digit codes
const CODE_MIN: u32 = 100_000;
const CODE_MAX: u32 = 999_999;

/// Generate a uniformly random 6-digit numeric code
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(CODE_MIN..=CODE_MAX).to_string()
}

/// Argon2id hasher with a fixed cost
#[derive(Debug, Clone)]
pub struct CodeHasher {
    params: Params,
}

impl Default for CodeHasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl CodeHasher {
    /// Build a hasher with explicit memory (KiB) and iteration costs
    pub fn with_cost(memory_kib: u32, iterations: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, Params::DEFAULT_P_COST, None)
            .map_err(|e| anyhow!("invalid argon2 parameters: {}", e))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a code into a PHC string
    pub fn hash(&self, code: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = self
            .argon2()
            .hash_password(code.as_bytes(), &salt)
            .map_err(|e| anyhow!("failed to hash code: {}", e))?;
        Ok(digest.to_string())
    }

    /// Check a submitted code against a stored digest.
    ///
    /// Returns `Ok(false)` on mismatch and `Err` only if the digest is unusable.
    pub fn verify(&self, code: &str, digest: &str) -> Result<bool> {
        let parsed =
            PasswordHash::new(digest).map_err(|e| anyhow!("stored digest is malformed: {}", e))?;

        match self.argon2().verify_password(code.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(anyhow!("failed to verify code: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_hasher() -> CodeHasher {
        CodeHasher::with_cost(1024, 1).unwrap()
    }

    #[test]
    fn test_generated_code_is_six_digits() {
        for _ in 0..1_000 {
            let code = generate_code();
            assert_eq!(code.len(), 6, "code {} should be 6 digits", code);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(code.chars().next(), Some('0'));
        }
    }

    #[test]
    fn test_digest_differs_from_code() {
        let hasher = cheap_hasher();
        let digest = hasher.hash("482913").unwrap();

        assert_ne!(digest, "482913");
        assert!(!digest.contains("482913"));
        assert!(digest.starts_with("$argon2id$"));
    }

    #[test]
    fn test_same_code_hashes_differently() {
        let hasher = cheap_hasher();
        let a = hasher.hash("123456").unwrap();
        let b = hasher.hash("123456").unwrap();
        assert_ne!(a, b, "salts should differ per hash");
    }

    #[test]
    fn test_verify_matches_only_original_code() {
        let hasher = cheap_hasher();
        let digest = hasher.hash("654321").unwrap();

        assert!(hasher.verify("654321", &digest).unwrap());
        assert!(!hasher.verify("654320", &digest).unwrap());
        assert!(!hasher.verify("000000", &digest).unwrap());
    }

    #[test]
    fn test_verify_uses_params_from_digest() {
        let digest = cheap_hasher().hash("111222").unwrap();
        let other = CodeHasher::with_cost(2048, 2).unwrap();
        assert!(other.verify("111222", &digest).unwrap());
    }

    #[test]
    fn test_malformed_digest_is_an_error() {
        let hasher = cheap_hasher();
        assert!(hasher.verify("123456", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_invalid_cost_rejected() {
        assert!(CodeHasher::with_cost(1, 1).is_err());
    }
}
