//! Auth domain - verifies the identity provider's access tokens
//!
//! Sessions and token issuance live with the identity provider. This crate
//! only needs to turn a bearer token into an owner id.

pub mod jwt;

pub use jwt::{Claims, JwtService};
