//! Phone verification data types
//!
//! Plain types returned by the phone verification actions.

use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

/// OTP policy knobs
#[derive(Debug, Clone)]
pub struct OtpSettings {
    /// How long an issued code stays valid
    pub ttl: chrono::Duration,
    /// Verification attempts allowed per challenge
    pub max_attempts: i32,
    /// Upper bound on every store/notifier call
    pub call_timeout: Duration,
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self {
            ttl: chrono::Duration::minutes(5),
            max_attempts: 5,
            call_timeout: Duration::from_secs(5),
        }
    }
}

/// How the issued code reached (or failed to reach) the owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// SMS gateway accepted the message
    Sent,
    /// Gateway configured but the send failed
    SendFailed,
    /// No gateway configured
    NotConfigured,
}

/// Result of issuing an OTP
#[derive(Debug, Clone)]
pub struct OtpIssued {
    pub delivery: Delivery,
    /// Plaintext code, present only when SMS delivery did not happen
    pub code_for_testing: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Result of verifying an OTP
#[derive(Debug, Clone)]
pub struct PhoneVerified {
    pub owner_id: Uuid,
    pub phone: String,
    pub verified_at: DateTime<Utc>,
}
