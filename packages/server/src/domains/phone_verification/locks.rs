//! Per-owner serialization of OTP operations.
//!
//! `issue` (delete-then-insert) and `verify` (read, increment, delete) are
//! multi-step against the store. Holding the owner's lock for the whole
//! operation keeps the single-live-challenge invariant within one process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

type Slot = Arc<AsyncMutex<()>>;

#[derive(Clone, Default)]
pub struct OwnerLocks {
    slots: Arc<Mutex<HashMap<Uuid, Slot>>>,
}

/// Held for the duration of one operation. Releasing the last guard for an
/// owner drops that owner's slot.
pub struct OwnerGuard {
    owner_id: Uuid,
    slots: Arc<Mutex<HashMap<Uuid, Slot>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl OwnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `owner_id`
    pub async fn lock(&self, owner_id: Uuid) -> OwnerGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(owner_id).or_default().clone()
        };

        let guard = slot.lock_owned().await;
        OwnerGuard {
            owner_id,
            slots: self.slots.clone(),
            guard: Some(guard),
        }
    }

    /// Number of owners with a live slot
    pub fn active_owners(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for OwnerGuard {
    fn drop(&mut self) {
        self.guard.take();

        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map still references the slot: nobody holds or awaits it
        if let Some(slot) = slots.get(&self.owner_id) {
            if Arc::strong_count(slot) == 1 {
                slots.remove(&self.owner_id);
            }
        }
    }
}
