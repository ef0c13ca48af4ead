//! Phone verification domain - OTP challenges bound to an owner's claimed phone
//!
//! Architecture:
//!   HTTP route → action (issue_otp / verify_otp) → Base* traits in ServerDeps
//!
//! Responsibilities:
//! - Issue 6-digit codes, stored only as Argon2id digests
//! - Enforce expiry, the attempt ceiling and single use
//! - Mark the owner's profile phone as verified
//! - Optional sweep of expired challenges

pub mod actions;
pub mod code;
pub mod errors;
pub mod locks;
pub mod models;
pub mod types;

pub use actions::{issue_otp, sweep_expired, verify_otp};
pub use code::{generate_code, CodeHasher};
pub use errors::VerificationError;
pub use locks::OwnerLocks;
pub use types::{Delivery, OtpIssued, OtpSettings, PhoneVerified};
