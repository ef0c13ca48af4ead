// Agricultural Marketplace - Phone Verification Core
//
// This crate provides the OTP phone verification backend used by the
// marketplace dashboard: owners claim a phone number, receive a one-time
// code, and submit it back to mark the phone as verified on their profile.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
