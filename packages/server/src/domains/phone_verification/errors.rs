use thiserror::Error;

/// Failure outcomes of issuing or verifying a phone OTP.
///
/// Every variant except `Internal` is an expected, user-facing outcome.
/// The `Display` text is safe to show to the end user.
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Unauthorized")]
    Unauthenticated,

    #[error("{0}")]
    InvalidArgument(&'static str),

    #[error("No OTP found. Please request a new one.")]
    NotFound,

    #[error("Too many attempts. Please request a new OTP.")]
    TooManyAttempts,

    #[error("OTP has expired. Please request a new one.")]
    Expired,

    #[error("Invalid OTP code")]
    InvalidCode,

    /// Store, notifier or profile failure. `cause` is for operators only.
    #[error("{message}")]
    Internal {
        message: &'static str,
        cause: anyhow::Error,
    },
}

impl VerificationError {
    pub fn internal(message: &'static str, cause: anyhow::Error) -> Self {
        Self::Internal { message, cause }
    }

    /// Terminal failures require a fresh `issue` before any code can succeed.
    pub fn requires_reissue(&self) -> bool {
        matches!(self, Self::NotFound | Self::TooManyAttempts | Self::Expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_messages() {
        assert_eq!(
            VerificationError::TooManyAttempts.to_string(),
            "Too many attempts. Please request a new OTP."
        );
        assert_eq!(
            VerificationError::InvalidArgument("OTP code is required").to_string(),
            "OTP code is required"
        );
    }

    #[test]
    fn test_internal_hides_cause() {
        let err = VerificationError::internal(
            "Failed to generate OTP",
            anyhow::anyhow!("connection refused (10.0.0.4:5432)"),
        );
        assert_eq!(err.to_string(), "Failed to generate OTP");
    }

    #[test]
    fn test_requires_reissue() {
        assert!(VerificationError::Expired.requires_reissue());
        assert!(VerificationError::TooManyAttempts.requires_reissue());
        assert!(VerificationError::NotFound.requires_reissue());
        assert!(!VerificationError::InvalidCode.requires_reissue());
        assert!(!VerificationError::Unauthenticated.requires_reissue());
    }
}
