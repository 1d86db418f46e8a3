//! In-memory adapters for configuration and tests.

mod config_source;

pub use config_source::InMemoryConfigSource;
