//! Configuration source port for global and per-consumer server configs.

use crate::tool_registry::domain::{ConsumerConfig, ConsumerConfigLookup, ConsumerName, GlobalConfig};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for configuration source operations.
pub type ConfigSourceResult<T> = Result<T, ConfigSourceError>;

/// Read and write contract for server configuration records.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Loads the process-wide configuration.
    ///
    /// A missing global file yields an empty [`GlobalConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigSourceError`] when the file exists but cannot be read
    /// or parsed.
    async fn load_global(&self) -> ConfigSourceResult<GlobalConfig>;

    /// Looks up the configuration for `consumer`.
    ///
    /// The consumer's own file wins; otherwise the file of `fallback` is tried;
    /// otherwise the lookup reports an absent, empty record.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigSourceError`] when the selected file cannot be read or
    /// parsed.
    async fn load_consumer(
        &self,
        consumer: &ConsumerName,
        fallback: Option<&ConsumerName>,
    ) -> ConfigSourceResult<ConsumerConfigLookup>;

    /// Writes `config` as the primary file of `consumer`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigSourceError`] when serialisation or writing fails.
    async fn save_consumer(
        &self,
        consumer: &ConsumerName,
        config: &ConsumerConfig,
    ) -> ConfigSourceResult<()>;
}

/// Errors returned by configuration sources.
#[derive(Debug, Clone, Error)]
pub enum ConfigSourceError {
    /// The file exists but could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Location of the file.
        path: String,
        /// Underlying I/O error.
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// The file content is not a valid configuration record.
    #[error("malformed config {path}: {reason}")]
    Parse {
        /// Location of the file.
        path: String,
        /// Parser message.
        reason: String,
    },

    /// The configuration could not be written.
    #[error("failed to write config {path}: {source}")]
    Write {
        /// Location of the file.
        path: String,
        /// Underlying I/O error.
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// The configuration could not be serialised.
    #[error("failed to serialise config: {0}")]
    Serialize(String),
}

impl ConfigSourceError {
    /// Wraps a read failure for `path`.
    pub fn read(path: impl Into<String>, err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Read {
            path: path.into(),
            source: Arc::new(err),
        }
    }

    /// Wraps a write failure for `path`.
    pub fn write(
        path: impl Into<String>,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Write {
            path: path.into(),
            source: Arc::new(err),
        }
    }
}
