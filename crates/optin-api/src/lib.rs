//! Optin API - HTTP adapter for the consent ledger
//!
//! Exposes the accept, cancel and list flows over HTTP/1:
//!
//! | method | path                                  | flow   |
//! |--------|---------------------------------------|--------|
//! | POST   | `/v1/consent/{mode}/{address}`        | accept |
//! | POST   | `/v1/consent/{mode}/{address}/cancel` | cancel |
//! | DELETE | `/v1/consent/{mode}/{address}`        | cancel |
//! | GET    | `/v1/consent/{mode}/{address}`        | list   |
//! | GET    | `/healthz`                            | health |
//!
//! ## Key Components
//!
//! - [`ApiServer`] - hyper accept loop with cancellation
//! - [`ApiContext`] - Ports, audit logger and settings shared by all requests
//! - [`TokenAuthEnforcer`] - Header token check against root and user tokens
//! - [`decode_consent_body`] - JSON / form body decoding

pub mod auth;
pub mod body;
pub mod context;
pub mod handlers;
pub mod response;
pub mod router;
pub mod server;

pub use auth::TokenAuthEnforcer;
pub use body::{decode_consent_body, BodyError, ConsentBody};
pub use context::ApiContext;
pub use router::route;
pub use server::ApiServer;
