//! Verify OTP action

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{blocking, bounded, internal_failure};
use crate::domains::phone_verification::models::Challenge;
use crate::domains::phone_verification::{PhoneVerified, VerificationError};
use crate::kernel::ServerDeps;

const LOOKUP_FAILED: &str = "Internal server error";
const PROFILE_FAILED: &str = "Failed to verify phone number";

/// Check a submitted code against the owner's latest challenge.
///
/// Order matters: the ceiling and expiry are checked first, then the attempt
/// is charged and persisted, and only then is the code compared. A correct
/// code therefore still costs an attempt.
///
/// If the profile write fails the challenge is kept (with the attempt
/// charged) so the owner can submit the same code again.
pub async fn verify_otp(
    owner_id: Option<Uuid>,
    code: &str,
    deps: &ServerDeps,
) -> Result<PhoneVerified, VerificationError> {
    let owner_id = owner_id.ok_or(VerificationError::Unauthenticated)?;
    if code.is_empty() {
        return Err(VerificationError::InvalidArgument("OTP code is required"));
    }

    let _guard = deps.owner_locks.lock(owner_id).await;
    let store = &deps.challenge_store;
    let limit = deps.otp.call_timeout;

    // 1. Latest challenge
    let mut challenge = bounded(limit, "challenge lookup", store.find_latest_for_owner(owner_id))
        .await
        .map_err(|e| internal_failure(owner_id, LOOKUP_FAILED, e))?
        .ok_or(VerificationError::NotFound)?;

    // 2. Ceiling
    if challenge.attempts_exhausted(deps.otp.max_attempts) {
        discard(deps, &challenge, "attempt ceiling reached").await;
        return Err(VerificationError::TooManyAttempts);
    }

    // 3. Expiry
    if challenge.is_expired(deps.clock.now()) {
        discard(deps, &challenge, "expired").await;
        return Err(VerificationError::Expired);
    }

    // 4. Charge the attempt before looking at the code
    challenge.attempt_count += 1;
    bounded(
        limit,
        "attempt count update",
        store.update_attempt_count(challenge.id, challenge.attempt_count),
    )
    .await
    .map_err(|e| internal_failure(owner_id, LOOKUP_FAILED, e))?;

    // 5. Compare
    let hasher = deps.code_hasher.clone();
    let submitted = code.to_string();
    let digest = challenge.code_digest.clone();
    let matches = blocking(move || hasher.verify(&submitted, &digest))
        .await
        .map_err(|e| internal_failure(owner_id, LOOKUP_FAILED, e))?;

    if !matches {
        debug!(
            owner_id = %owner_id,
            attempt = challenge.attempt_count,
            max_attempts = deps.otp.max_attempts,
            "OTP mismatch"
        );
        return Err(VerificationError::InvalidCode);
    }

    // 6. Profile write; on failure the challenge stays for a retry
    let verified_at = deps.clock.now();
    bounded(
        limit,
        "profile update",
        deps.profile_store
            .mark_phone_verified(owner_id, &challenge.claimed_phone, verified_at),
    )
    .await
    .map_err(|e| internal_failure(owner_id, PROFILE_FAILED, e))?;

    // 7. Single use. If this delete fails the caller retries; the profile
    // write above is idempotent.
    bounded(limit, "challenge delete", store.delete(challenge.id))
        .await
        .map_err(|e| internal_failure(owner_id, PROFILE_FAILED, e))?;

    info!(owner_id = %owner_id, challenge_id = %challenge.id, "Phone number verified");

    Ok(PhoneVerified {
        owner_id,
        phone: challenge.claimed_phone,
        verified_at,
    })
}

/// Delete a dead challenge. A failed delete is only logged: the next call
/// reaches the same verdict and tries again.
async fn discard(deps: &ServerDeps, challenge: &Challenge, reason: &'static str) {
    info!(
        owner_id = %challenge.owner_id,
        challenge_id = %challenge.id,
        reason,
        "Discarding OTP challenge"
    );

    if let Err(e) = bounded(
        deps.otp.call_timeout,
        "challenge delete",
        deps.challenge_store.delete(challenge.id),
    )
    .await
    {
        warn!(
            owner_id = %challenge.owner_id,
            error = %format!("{:#}", e),
            "Failed to delete dead OTP challenge"
        );
    }
}
