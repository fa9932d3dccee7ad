//! frostpix Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Asset`, `Album`, `LibrarySnapshot`, `SyncPlan`
//! - **Diffing** - pure snapshot reconciliation producing a minimal change set
//! - **Failure taxonomy** - kinds, severities and recoverability for error routing
//! - **Port definitions** - Traits for adapters: `RemoteLibrary`, `LocalLibrary`,
//!   `AuthSession`, and the observer capability set
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure logic with no I/O. Ports define trait
//! interfaces that the `frostpix-icloud` and `frostpix-sync` adapter crates
//! implement. The sync and archive engines orchestrate domain entities
//! through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
