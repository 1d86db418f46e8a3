//! In-memory configuration source.

use crate::tool_registry::{
    domain::{ConsumerConfig, ConsumerConfigLookup, ConsumerName, GlobalConfig},
    ports::{ConfigSource, ConfigSourceError, ConfigSourceResult},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory configuration source.
///
/// Records the number of loads so tests can assert that resolution reads
/// configuration once per call.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfigSource {
    state: Arc<RwLock<InMemoryConfigState>>,
}

#[derive(Debug, Default)]
struct InMemoryConfigState {
    global: GlobalConfig,
    global_error: Option<ConfigSourceError>,
    consumers: HashMap<ConsumerName, ConsumerConfig>,
    global_loads: usize,
}

fn lock_error(err: impl ToString) -> ConfigSourceError {
    ConfigSourceError::read("memory", std::io::Error::other(err.to_string()))
}

impl InMemoryConfigSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the global configuration.
    ///
    /// # Errors
    ///
    /// Returns a read error when lock acquisition fails.
    pub fn set_global(&self, config: GlobalConfig) -> ConfigSourceResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.global = config;
        Ok(())
    }

    /// Makes every subsequent global load fail with `error`.
    ///
    /// # Errors
    ///
    /// Returns a read error when lock acquisition fails.
    pub fn fail_global_with(&self, error: ConfigSourceError) -> ConfigSourceResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.global_error = Some(error);
        Ok(())
    }

    /// Stores the configuration file of `consumer`.
    ///
    /// # Errors
    ///
    /// Returns a read error when lock acquisition fails.
    pub fn set_consumer(
        &self,
        consumer: ConsumerName,
        config: ConsumerConfig,
    ) -> ConfigSourceResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.consumers.insert(consumer, config);
        Ok(())
    }

    /// Returns how many times the global configuration was loaded.
    ///
    /// # Errors
    ///
    /// Returns a read error when lock acquisition fails.
    pub fn global_loads(&self) -> ConfigSourceResult<usize> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.global_loads)
    }
}

#[async_trait]
impl ConfigSource for InMemoryConfigSource {
    async fn load_global(&self) -> ConfigSourceResult<GlobalConfig> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.global_loads += 1;
        if let Some(error) = &state.global_error {
            return Err(error.clone());
        }
        Ok(state.global.clone())
    }

    async fn load_consumer(
        &self,
        consumer: &ConsumerName,
        fallback: Option<&ConsumerName>,
    ) -> ConfigSourceResult<ConsumerConfigLookup> {
        let state = self.state.read().map_err(lock_error)?;
        if let Some(config) = state.consumers.get(consumer) {
            return Ok(ConsumerConfigLookup::primary(config.clone()));
        }

        let fallback_lookup = fallback.and_then(|name| {
            state
                .consumers
                .get(name)
                .map(|config| ConsumerConfigLookup::fallback(config.clone(), name.clone()))
        });
        Ok(fallback_lookup.unwrap_or_else(ConsumerConfigLookup::absent))
    }

    async fn save_consumer(
        &self,
        consumer: &ConsumerName,
        config: &ConsumerConfig,
    ) -> ConfigSourceResult<()> {
        self.set_consumer(consumer.clone(), config.clone())
    }
}
