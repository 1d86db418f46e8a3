//! Per-consumer tool server resolution and loading.
//!
//! This module resolves which tool servers a consumer may use from a global
//! configuration and a per-consumer configuration, turns each entry into a
//! ready-to-start connection descriptor, starts servers once per consumer
//! scope and ties their teardown to a session-wide cleanup scope. The module
//! follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
