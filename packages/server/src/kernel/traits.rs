// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// The OTP rules (ceiling, expiry, ordering) live in domains/phone_verification/actions.
//
// Naming convention: Base* for trait names (e.g., BaseChallengeStore, BaseSmsNotifier)

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domains::phone_verification::models::{Challenge, Profile};

// =============================================================================
// Challenge Store Trait (Infrastructure - OTP persistence)
// =============================================================================

#[async_trait]
pub trait BaseChallengeStore: Send + Sync {
    /// Delete every challenge belonging to the owner. Returns rows removed.
    async fn delete_for_owner(&self, owner_id: Uuid) -> Result<u64>;

    /// Persist a new challenge
    async fn insert(&self, challenge: &Challenge) -> Result<()>;

    /// Clear the owner's challenges and insert the new one.
    ///
    /// Stores that support transactions should override this so the two
    /// steps commit together.
    async fn replace_for_owner(&self, challenge: &Challenge) -> Result<()> {
        self.delete_for_owner(challenge.owner_id).await?;
        self.insert(challenge).await
    }

    /// Most recently created challenge for the owner, if any
    async fn find_latest_for_owner(&self, owner_id: Uuid) -> Result<Option<Challenge>>;

    /// Overwrite the attempt counter of a single challenge
    async fn update_attempt_count(&self, id: Uuid, attempt_count: i32) -> Result<()>;

    /// Delete a single challenge
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Delete challenges that expired before `now`. Returns rows removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Cheap liveness probe for the health endpoint
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Profile Store Trait (Infrastructure - owner profile writes)
// =============================================================================

#[async_trait]
pub trait BaseProfileStore: Send + Sync {
    /// Record `phone` as the owner's verified phone number
    async fn mark_phone_verified(
        &self,
        owner_id: Uuid,
        phone: &str,
        verified_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Phone fields of the owner's profile
    async fn find_profile(&self, owner_id: Uuid) -> Result<Option<Profile>>;
}

// =============================================================================
// SMS Notifier Trait (Infrastructure - SMS gateway)
// =============================================================================

#[async_trait]
pub trait BaseSmsNotifier: Send + Sync {
    /// Send a text message to a phone number
    async fn send_sms(&self, phone_number: &str, body: &str) -> Result<()>;
}

// =============================================================================
// Clock Trait (Infrastructure - time source)
// =============================================================================

pub trait BaseClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl BaseClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
