//! Use cases (interactors) for Optin
//!
//! Use cases are thin coordinators that delegate business rules to domain
//! methods and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`IdentityResolver`] - Maps an (address, mode) pair to a subject token

pub mod resolve_identity;

pub use resolve_identity::{require_token, IdentityResolver, Resolution};
