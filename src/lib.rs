//! Toolscope: per-consumer tool server configuration and loading.
//!
//! This crate resolves the tool servers available to a consumer, starts them
//! through a host runtime and owns their teardown.
//!
//! # Architecture
//!
//! Toolscope follows hexagonal architecture principles:
//!
//! - **Domain**: Names, configuration records, descriptors and load states
//! - **Ports**: Configuration source and host runtime contracts
//! - **Adapters**: Filesystem and in-memory implementations of the ports
//!
//! # Modules
//!
//! - [`tool_registry`]: Resolution, descriptor building and server lifecycle
//! - [`shell`]: Shell quoting and stderr-silencing command wrappers

pub mod shell;
pub mod tool_registry;
