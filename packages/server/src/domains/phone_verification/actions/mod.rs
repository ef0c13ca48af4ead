//! Phone verification actions - business logic functions
//!
//! Actions are async functions called directly from the HTTP routes and the
//! scheduler. Collaborators come in through `ServerDeps`.

mod issue_otp;
mod sweep_expired;
mod verify_otp;

pub use issue_otp::issue_otp;
pub use sweep_expired::sweep_expired;
pub use verify_otp::verify_otp;

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::error;
use uuid::Uuid;

use crate::domains::phone_verification::VerificationError;

/// Run a collaborator call, failing if it does not finish within `limit`
async fn bounded<T, F>(limit: Duration, what: &'static str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, call)
        .await
        .with_context(|| format!("{} timed out after {:?}", what, limit))?
}

/// Run CPU-heavy work (Argon2) off the async workers
async fn blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .context("blocking task failed")?
}

/// Log an infrastructure failure and wrap it for the caller.
///
/// Only the error chain is logged. Codes and digests never reach this point.
fn internal_failure(owner_id: Uuid, message: &'static str, cause: anyhow::Error) -> VerificationError {
    error!(owner_id = %owner_id, error = %format!("{:#}", cause), "{}", message);
    VerificationError::internal(message, cause)
}
