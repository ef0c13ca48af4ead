// TestDependencies - mock implementations for testing
//
// Provides in-memory stores, a recording SMS notifier and a manual clock
// that can be injected into ServerDeps for tests.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::{BaseChallengeStore, BaseClock, BaseProfileStore, BaseSmsNotifier, ServerDeps};
use crate::domains::phone_verification::models::{Challenge, Profile};
use crate::domains::phone_verification::{CodeHasher, OtpSettings};

// =============================================================================
// Mock Challenge Store
// =============================================================================

#[derive(Clone, Default)]
pub struct MockChallengeStore {
    rows: Arc<Mutex<Vec<Challenge>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MockChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write (insert, update, delete) and the health check fail
    /// until switched off
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Seed a row directly, bypassing issuance
    pub fn seed(&self, challenge: Challenge) {
        self.rows.lock().unwrap().push(challenge);
    }

    pub fn challenges_for(&self, owner_id: Uuid) -> Vec<Challenge> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("mock challenge store: write rejected");
        }
        Ok(())
    }
}

#[async_trait]
impl BaseChallengeStore for MockChallengeStore {
    async fn delete_for_owner(&self, owner_id: Uuid) -> Result<u64> {
        self.check_writable()?;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|c| c.owner_id != owner_id);
        Ok((before - rows.len()) as u64)
    }

    async fn insert(&self, challenge: &Challenge) -> Result<()> {
        self.check_writable()?;
        self.rows.lock().unwrap().push(challenge.clone());
        Ok(())
    }

    async fn find_latest_for_owner(&self, owner_id: Uuid) -> Result<Option<Challenge>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.owner_id == owner_id)
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn update_attempt_count(&self, id: Uuid, attempt_count: i32) -> Result<()> {
        self.check_writable()?;
        if let Some(row) = self.rows.lock().unwrap().iter_mut().find(|c| c.id == id) {
            row.attempt_count = attempt_count;
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.check_writable()?;
        self.rows.lock().unwrap().retain(|c| c.id != id);
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        self.check_writable()?;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|c| c.expires_at >= now);
        Ok((before - rows.len()) as u64)
    }

    async fn health_check(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("mock challenge store: connection refused (10.1.2.3:5432)");
        }
        Ok(())
    }
}

// =============================================================================
// Mock Profile Store
// =============================================================================

#[derive(Clone, Default)]
pub struct MockProfileStore {
    profiles: Arc<Mutex<HashMap<Uuid, Profile>>>,
    fail_next: Arc<AtomicBool>,
}

impl MockProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `mark_phone_verified` call fail once
    pub fn fail_next_update(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn profile(&self, owner_id: Uuid) -> Option<Profile> {
        self.profiles.lock().unwrap().get(&owner_id).cloned()
    }
}

#[async_trait]
impl BaseProfileStore for MockProfileStore {
    async fn mark_phone_verified(
        &self,
        owner_id: Uuid,
        phone: &str,
        verified_at: DateTime<Utc>,
    ) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            bail!("mock profile store: update rejected");
        }

        self.profiles.lock().unwrap().insert(
            owner_id,
            Profile {
                id: owner_id,
                phone: Some(phone.to_string()),
                phone_verified: true,
                phone_verified_at: Some(verified_at),
            },
        );
        Ok(())
    }

    async fn find_profile(&self, owner_id: Uuid) -> Result<Option<Profile>> {
        Ok(self.profile(owner_id))
    }
}

// =============================================================================
// Mock SMS Notifier
// =============================================================================

#[derive(Clone, Default)]
pub struct MockSmsNotifier {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    failing: bool,
}

impl MockSmsNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record sends but report every one as failed
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// (phone, body) pairs in send order
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseSmsNotifier for MockSmsNotifier {
    async fn send_sms(&self, phone_number: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((phone_number.to_string(), body.to_string()));

        if self.failing {
            bail!("mock sms gateway unavailable");
        }
        Ok(())
    }
}

// =============================================================================
// Mock Clock
// =============================================================================

#[derive(Clone)]
pub struct MockClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl BaseClock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

#[derive(Clone)]
pub struct TestDependencies {
    pub challenge_store: MockChallengeStore,
    pub profile_store: MockProfileStore,
    pub sms_notifier: Option<MockSmsNotifier>,
    pub clock: MockClock,
    pub otp: OtpSettings,
}

impl TestDependencies {
    /// Fresh mocks, no SMS notifier (fallback mode)
    pub fn new() -> Self {
        Self {
            challenge_store: MockChallengeStore::new(),
            profile_store: MockProfileStore::new(),
            sms_notifier: None,
            clock: MockClock::default(),
            otp: OtpSettings::default(),
        }
    }

    /// Set a mock SMS notifier
    pub fn mock_sms(mut self, notifier: MockSmsNotifier) -> Self {
        self.sms_notifier = Some(notifier);
        self
    }

    /// Override the OTP policy
    pub fn otp_settings(mut self, otp: OtpSettings) -> Self {
        self.otp = otp;
        self
    }

    /// Convert into ServerDeps for testing
    ///
    /// Uses a cheap Argon2 cost so hashing does not dominate test time.
    pub fn into_server_deps(self) -> ServerDeps {
        let hasher = CodeHasher::with_cost(1024, 1).expect("valid test argon2 params");

        ServerDeps::new(
            Arc::new(self.challenge_store),
            Arc::new(self.profile_store),
            self.sms_notifier
                .map(|n| Arc::new(n) as Arc<dyn BaseSmsNotifier>),
            hasher,
            self.otp,
        )
        .with_clock(Arc::new(self.clock))
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
