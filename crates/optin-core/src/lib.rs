//! Optin Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `ConsentRecord`, `UserRecord`, `AuditEntry`
//! - **Use cases** - `IdentityResolver`
//! - **Port definitions** - Traits for adapters: `IUserDirectory`, `IConsentLedger`,
//!   `IAuditStore`, `IAuthEnforcer`
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement
//! (`optin-cache` for storage, `optin-api` for HTTP and auth).
//! Use cases orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
