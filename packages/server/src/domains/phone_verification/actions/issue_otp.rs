//! Issue OTP action

use tracing::{info, warn};
use uuid::Uuid;

use super::{blocking, bounded, internal_failure};
use crate::domains::phone_verification::code::generate_code;
use crate::domains::phone_verification::models::Challenge;
use crate::domains::phone_verification::{Delivery, OtpIssued, VerificationError};
use crate::kernel::ServerDeps;

const ISSUE_FAILED: &str = "Failed to generate OTP";

/// Issue a fresh 6-digit code for the owner's claimed phone number.
///
/// Any earlier challenge for the owner is replaced. SMS delivery problems
/// never fail the call: the code is handed back in `code_for_testing`
/// instead.
pub async fn issue_otp(
    owner_id: Option<Uuid>,
    phone: &str,
    deps: &ServerDeps,
) -> Result<OtpIssued, VerificationError> {
    let owner_id = owner_id.ok_or(VerificationError::Unauthenticated)?;
    if phone.is_empty() {
        return Err(VerificationError::InvalidArgument("Phone number is required"));
    }

    let _guard = deps.owner_locks.lock(owner_id).await;
    let limit = deps.otp.call_timeout;

    // 1. Generate and hash
    let code = generate_code();
    let hasher = deps.code_hasher.clone();
    let plaintext = code.clone();
    let code_digest = blocking(move || hasher.hash(&plaintext))
        .await
        .map_err(|e| internal_failure(owner_id, ISSUE_FAILED, e))?;

    // 2. Replace whatever the owner had outstanding
    let challenge = Challenge::new(owner_id, phone, code_digest, deps.clock.now(), deps.otp.ttl);
    bounded(
        limit,
        "challenge replace",
        deps.challenge_store.replace_for_owner(&challenge),
    )
    .await
    .map_err(|e| internal_failure(owner_id, ISSUE_FAILED, e))?;

    // 3. Deliver, degrading to the fallback channel
    let delivery = match &deps.sms_notifier {
        Some(notifier) => {
            let body = sms_body(&code, deps.otp.ttl);
            match bounded(limit, "sms send", notifier.send_sms(phone, &body)).await {
                Ok(()) => Delivery::Sent,
                Err(e) => {
                    warn!(
                        owner_id = %owner_id,
                        error = %format!("{:#}", e),
                        "SMS delivery failed, returning code through fallback channel"
                    );
                    Delivery::SendFailed
                }
            }
        }
        None => {
            info!(owner_id = %owner_id, "SMS notifier not configured, returning code through fallback channel");
            Delivery::NotConfigured
        }
    };

    info!(owner_id = %owner_id, challenge_id = %challenge.id, ?delivery, "OTP issued");

    Ok(OtpIssued {
        delivery,
        code_for_testing: (delivery != Delivery::Sent).then_some(code),
        expires_at: challenge.expires_at,
    })
}

fn sms_body(code: &str, ttl: chrono::Duration) -> String {
    // Round up so a 90s TTL reads "2 minutes", never "1"
    let minutes = (ttl.num_seconds() + 59) / 60;
    format!(
        "Your verification code is {}. It expires in {} minutes.",
        code, minutes
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::{MockSmsNotifier, TestDependencies};

    #[test]
    fn test_sms_body_rounds_minutes_up() {
        assert_eq!(
            sms_body("123456", chrono::Duration::minutes(5)),
            "Your verification code is 123456. It expires in 5 minutes."
        );
        assert!(sms_body("123456", chrono::Duration::seconds(90)).contains("2 minutes"));
    }

    #[tokio::test]
    async fn test_requires_owner() {
        let deps = TestDependencies::new().into_server_deps();

        let err = issue_otp(None, "+919999999999", &deps).await.unwrap_err();
        assert!(matches!(err, VerificationError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_requires_phone() {
        let test_deps = TestDependencies::new();
        let deps = test_deps.clone().into_server_deps();

        let err = issue_otp(Some(Uuid::new_v4()), "", &deps).await.unwrap_err();
        assert!(matches!(err, VerificationError::InvalidArgument(_)));
        assert_eq!(test_deps.challenge_store.len(), 0);
    }

    #[tokio::test]
    async fn test_phone_format_is_not_validated() {
        let test_deps = TestDependencies::new();
        let deps = test_deps.clone().into_server_deps();
        let owner = Uuid::new_v4();

        issue_otp(Some(owner), "call me maybe", &deps).await.unwrap();

        let stored = test_deps.challenge_store.challenges_for(owner);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].claimed_phone, "call me maybe");
    }

    #[tokio::test]
    async fn test_without_notifier_returns_fallback_code() {
        let test_deps = TestDependencies::new();
        let deps = test_deps.clone().into_server_deps();
        let owner = Uuid::new_v4();

        let issued = issue_otp(Some(owner), "+919999999999", &deps).await.unwrap();

        assert_eq!(issued.delivery, Delivery::NotConfigured);
        let code = issued.code_for_testing.expect("fallback code");
        assert_eq!(code.len(), 6);

        let stored = test_deps.challenge_store.challenges_for(owner);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].attempt_count, 0);
        assert_ne!(stored[0].code_digest, code);
    }

    #[tokio::test]
    async fn test_delivered_code_is_not_returned() {
        let notifier = MockSmsNotifier::new();
        let test_deps = TestDependencies::new().mock_sms(notifier.clone());
        let deps = test_deps.clone().into_server_deps();

        let issued = issue_otp(Some(Uuid::new_v4()), "+919999999999", &deps)
            .await
            .unwrap();

        assert_eq!(issued.delivery, Delivery::Sent);
        assert!(issued.code_for_testing.is_none());

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+919999999999");
        assert!(sent[0].1.starts_with("Your verification code is "));
    }

    #[tokio::test]
    async fn test_failed_delivery_degrades_to_fallback() {
        let notifier = MockSmsNotifier::new().failing();
        let deps = TestDependencies::new()
            .mock_sms(notifier.clone())
            .into_server_deps();

        let issued = issue_otp(Some(Uuid::new_v4()), "+919999999999", &deps)
            .await
            .unwrap();

        assert_eq!(issued.delivery, Delivery::SendFailed);
        let code = issued.code_for_testing.expect("fallback code");
        assert!(notifier.sent()[0].1.contains(&code));
    }

    #[tokio::test]
    async fn test_reissue_replaces_previous_challenge() {
        let test_deps = TestDependencies::new();
        let deps = test_deps.clone().into_server_deps();
        let owner = Uuid::new_v4();

        issue_otp(Some(owner), "+919999999999", &deps).await.unwrap();
        let first = test_deps.challenge_store.challenges_for(owner)[0].id;
        issue_otp(Some(owner), "+918888888888", &deps).await.unwrap();

        let stored = test_deps.challenge_store.challenges_for(owner);
        assert_eq!(stored.len(), 1);
        assert_ne!(stored[0].id, first);
        assert_eq!(stored[0].claimed_phone, "+918888888888");
    }

    #[tokio::test]
    async fn test_store_failure_is_internal() {
        let test_deps = TestDependencies::new();
        test_deps.challenge_store.fail_writes(true);
        let deps = test_deps.clone().into_server_deps();

        let err = issue_otp(Some(Uuid::new_v4()), "+919999999999", &deps)
            .await
            .unwrap_err();

        assert!(matches!(err, VerificationError::Internal { .. }));
        assert_eq!(err.to_string(), "Failed to generate OTP");
    }

    #[tokio::test]
    async fn test_other_owners_are_untouched() {
        let test_deps = TestDependencies::new();
        let deps = test_deps.clone().into_server_deps();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        issue_otp(Some(a), "+911111111111", &deps).await.unwrap();
        issue_otp(Some(b), "+912222222222", &deps).await.unwrap();
        issue_otp(Some(a), "+913333333333", &deps).await.unwrap();

        assert_eq!(test_deps.challenge_store.challenges_for(a).len(), 1);
        assert_eq!(test_deps.challenge_store.challenges_for(b).len(), 1);
    }
}
