//! Expired challenge sweep
//!
//! Storage hygiene only. Expiry is enforced in `verify_otp` whether or not
//! this ever runs.

use anyhow::Result;
use tracing::info;

use super::bounded;
use crate::kernel::ServerDeps;

/// Delete every challenge past its expiry. Returns rows removed.
pub async fn sweep_expired(deps: &ServerDeps) -> Result<u64> {
    let now = deps.clock.now();
    let removed = bounded(
        deps.otp.call_timeout,
        "expired challenge sweep",
        deps.challenge_store.delete_expired(now),
    )
    .await?;

    info!(removed, "Swept expired OTP challenges");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::phone_verification::actions::issue_otp;
    use crate::kernel::test_dependencies::TestDependencies;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let test_deps = TestDependencies::new();
        let deps = test_deps.clone().into_server_deps();
        let stale = Uuid::new_v4();
        let fresh = Uuid::new_v4();

        issue_otp(Some(stale), "+911111111111", &deps).await.unwrap();
        test_deps.clock.advance(chrono::Duration::minutes(4));
        issue_otp(Some(fresh), "+912222222222", &deps).await.unwrap();
        test_deps.clock.advance(chrono::Duration::minutes(2));

        let removed = sweep_expired(&deps).await.unwrap();

        assert_eq!(removed, 1);
        assert!(test_deps.challenge_store.challenges_for(stale).is_empty());
        assert_eq!(test_deps.challenge_store.challenges_for(fresh).len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_on_empty_store() {
        let deps = TestDependencies::new().into_server_deps();
        assert_eq!(sweep_expired(&deps).await.unwrap(), 0);
    }
}
