//! Adapter implementations for configuration and host runtime ports.

pub mod filesystem;
pub mod memory;

mod runtime;

pub use filesystem::{ConfigLayout, FsConfigSource};
pub use runtime::InMemoryToolServerHost;
