//! Lookup of live server handles per consumer scope.

use crate::tool_registry::domain::{ConsumerScopeKey, LoadedServerHandle, ServerName};
use std::collections::HashMap;

/// Map from `(scope key, server name)` to the live handle of that server.
///
/// The cache never owns release capabilities; releasing the cleanup scope is
/// the only way to terminate a server.
#[derive(Debug, Clone, Default)]
pub struct LoadCache {
    entries: HashMap<(ConsumerScopeKey, ServerName), LoadedServerHandle>,
}

impl LoadCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle of `server` in `scope`.
    #[must_use]
    pub fn get(&self, scope: &ConsumerScopeKey, server: &ServerName) -> Option<&LoadedServerHandle> {
        self.entries.get(&(scope.clone(), server.clone()))
    }

    /// Stores `handle` under `scope` and returns the previous one.
    pub fn insert(
        &mut self,
        scope: ConsumerScopeKey,
        handle: LoadedServerHandle,
    ) -> Option<LoadedServerHandle> {
        self.entries.insert((scope, handle.server().clone()), handle)
    }

    /// Returns handles stored for `scope`.
    pub fn handles_for<'a>(
        &'a self,
        scope: &'a ConsumerScopeKey,
    ) -> impl Iterator<Item = &'a LoadedServerHandle> + 'a {
        self.entries
            .iter()
            .filter(move |((key, _), _)| key == scope)
            .map(|(_, handle)| handle)
    }

    /// Drops every handle.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the number of cached handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
