//! Server dependencies (using traits for testability)
//!
//! This module provides the central dependency container used by the phone
//! verification actions, plus the production adapters behind each trait.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use twilio::TwilioService;
use uuid::Uuid;

use crate::domains::phone_verification::models::{Challenge, Profile};
use crate::domains::phone_verification::{CodeHasher, OtpSettings, OwnerLocks};
use crate::kernel::{BaseChallengeStore, BaseClock, BaseProfileStore, BaseSmsNotifier, SystemClock};

// =============================================================================
// TwilioService Adapter (implements BaseSmsNotifier trait)
// =============================================================================

/// Wrapper around TwilioService that implements BaseSmsNotifier trait
pub struct TwilioAdapter(pub Arc<TwilioService>);

impl TwilioAdapter {
    pub fn new(service: Arc<TwilioService>) -> Self {
        Self(service)
    }
}

#[async_trait]
impl BaseSmsNotifier for TwilioAdapter {
    async fn send_sms(&self, phone_number: &str, body: &str) -> Result<()> {
        self.0
            .send_sms(phone_number, body)
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("{}", e))
    }
}

// =============================================================================
// Postgres Adapters (implement the store traits over models/)
// =============================================================================

/// Challenge store backed by the `phone_verifications` table
#[derive(Clone)]
pub struct PgChallengeStore {
    pool: PgPool,
}

impl PgChallengeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseChallengeStore for PgChallengeStore {
    async fn delete_for_owner(&self, owner_id: Uuid) -> Result<u64> {
        Challenge::delete_for_owner(owner_id, &self.pool).await
    }

    async fn insert(&self, challenge: &Challenge) -> Result<()> {
        challenge.insert(&self.pool).await
    }

    /// Delete and insert in one transaction so no reader sees zero or two
    async fn replace_for_owner(&self, challenge: &Challenge) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Challenge::delete_for_owner(challenge.owner_id, &mut *tx).await?;
        challenge.insert(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_latest_for_owner(&self, owner_id: Uuid) -> Result<Option<Challenge>> {
        Challenge::find_latest_for_owner(owner_id, &self.pool).await
    }

    async fn update_attempt_count(&self, id: Uuid, attempt_count: i32) -> Result<()> {
        Challenge::update_attempt_count(id, attempt_count, &self.pool).await
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        Challenge::delete(id, &self.pool).await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        Challenge::delete_expired(now, &self.pool).await
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Profile store backed by the `profiles` table
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseProfileStore for PgProfileStore {
    async fn mark_phone_verified(
        &self,
        owner_id: Uuid,
        phone: &str,
        verified_at: DateTime<Utc>,
    ) -> Result<()> {
        Profile::mark_phone_verified(owner_id, phone, verified_at, &self.pool).await
    }

    async fn find_profile(&self, owner_id: Uuid) -> Result<Option<Profile>> {
        Profile::find_by_id(owner_id, &self.pool).await
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies accessible to actions (using traits for testability)
///
/// Built once at startup and shared behind an `Arc`.
#[derive(Clone)]
pub struct ServerDeps {
    pub challenge_store: Arc<dyn BaseChallengeStore>,
    pub profile_store: Arc<dyn BaseProfileStore>,
    /// `None` puts issuance in fallback mode: codes are returned to the caller
    pub sms_notifier: Option<Arc<dyn BaseSmsNotifier>>,
    pub clock: Arc<dyn BaseClock>,
    pub code_hasher: CodeHasher,
    pub otp: OtpSettings,
    pub owner_locks: OwnerLocks,
}

impl ServerDeps {
    /// Create new ServerDeps with the given dependencies
    pub fn new(
        challenge_store: Arc<dyn BaseChallengeStore>,
        profile_store: Arc<dyn BaseProfileStore>,
        sms_notifier: Option<Arc<dyn BaseSmsNotifier>>,
        code_hasher: CodeHasher,
        otp: OtpSettings,
    ) -> Self {
        Self {
            challenge_store,
            profile_store,
            sms_notifier,
            clock: Arc::new(SystemClock),
            code_hasher,
            otp,
            owner_locks: OwnerLocks::new(),
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn BaseClock>) -> Self {
        self.clock = clock;
        self
    }
}
