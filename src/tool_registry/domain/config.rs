//! Global and per-consumer configuration records and resolution results.

use super::{ConsumerName, ServerConfigEntry, ServerName, TransportKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Process-wide server configuration.
///
/// Server order follows the order of the source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalConfig {
    mcp_servers: Map<String, Value>,
}

impl GlobalConfig {
    /// Creates an empty global configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a server entry.
    #[must_use]
    pub fn with_server(mut self, name: impl Into<String>, entry: Value) -> Self {
        self.mcp_servers.insert(name.into(), entry);
        self
    }

    /// Returns the entry for `name`.
    #[must_use]
    pub fn server(&self, name: &str) -> Option<ServerConfigEntry> {
        self.mcp_servers.get(name).cloned().map(ServerConfigEntry::new)
    }

    /// Returns whether a server named `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.mcp_servers.contains_key(name)
    }

    /// Iterates server names in file order.
    pub fn server_names(&self) -> impl Iterator<Item = &str> {
        self.mcp_servers.keys().map(String::as_str)
    }
}

/// Per-consumer server configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsumerConfig {
    mcp_servers: Map<String, Value>,
    global_servers: Vec<String>,
    excluded_servers: Vec<String>,
    server_overrides: Map<String, Value>,
}

impl ConsumerConfig {
    /// Creates an empty consumer configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a consumer-owned server entry.
    #[must_use]
    pub fn with_server(mut self, name: impl Into<String>, entry: Value) -> Self {
        self.mcp_servers.insert(name.into(), entry);
        self
    }

    /// Replaces the list of opted-in global servers.
    #[must_use]
    pub fn with_global_servers(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.global_servers = names.into_iter().collect();
        self
    }

    /// Replaces the list of excluded servers.
    #[must_use]
    pub fn with_excluded_servers(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.excluded_servers = names.into_iter().collect();
        self
    }

    /// Adds or replaces a partial override for `name`.
    #[must_use]
    pub fn with_override(mut self, name: impl Into<String>, patch: Value) -> Self {
        self.server_overrides.insert(name.into(), patch);
        self
    }

    /// Returns the consumer-owned entry for `name`.
    #[must_use]
    pub fn server(&self, name: &str) -> Option<ServerConfigEntry> {
        self.mcp_servers.get(name).cloned().map(ServerConfigEntry::new)
    }

    /// Returns whether the consumer declares its own server `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.mcp_servers.contains_key(name)
    }

    /// Iterates consumer-owned server names in file order.
    pub fn server_names(&self) -> impl Iterator<Item = &str> {
        self.mcp_servers.keys().map(String::as_str)
    }

    /// Returns opted-in global server names in file order.
    #[must_use]
    pub fn global_servers(&self) -> &[String] {
        &self.global_servers
    }

    /// Returns excluded server names.
    #[must_use]
    pub fn excluded_servers(&self) -> &[String] {
        &self.excluded_servers
    }

    /// Returns the file-configured override for `name`.
    #[must_use]
    pub fn server_override(&self, name: &str) -> Option<&Value> {
        self.server_overrides.get(name)
    }
}

/// Where a consumer configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// The consumer's own file.
    Primary,
    /// The file of the consumer named by the fallback convention.
    Fallback {
        /// Consumer whose file was loaded.
        from: ConsumerName,
    },
    /// No file exists; an empty record was used.
    Absent,
}

/// Result of looking up a consumer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerConfigLookup {
    /// Loaded configuration, empty when absent.
    pub config: ConsumerConfig,
    /// Which file supplied it.
    pub origin: ConfigOrigin,
}

impl ConsumerConfigLookup {
    /// Creates a lookup result for the consumer's primary file.
    #[must_use]
    pub const fn primary(config: ConsumerConfig) -> Self {
        Self {
            config,
            origin: ConfigOrigin::Primary,
        }
    }

    /// Creates a lookup result for a fallback file.
    #[must_use]
    pub const fn fallback(config: ConsumerConfig, from: ConsumerName) -> Self {
        Self {
            config,
            origin: ConfigOrigin::Fallback { from },
        }
    }

    /// Creates a lookup result for a consumer without any file.
    #[must_use]
    pub fn absent() -> Self {
        Self {
            config: ConsumerConfig::default(),
            origin: ConfigOrigin::Absent,
        }
    }
}

/// Config scope that supplied the base entry of a resolved server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerOrigin {
    /// Declared in the consumer configuration.
    Consumer,
    /// Declared in the global configuration and opted into by the consumer.
    Global,
}

/// One server selected for a consumer, with overrides applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedServer {
    /// Server name.
    pub name: ServerName,
    /// Effective entry after override merging.
    pub entry: ServerConfigEntry,
    /// Scope of the base entry.
    pub origin: ServerOrigin,
}

/// Non-fatal observations made while resolving a server set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionWarning {
    /// A requested name has no entry in either config.
    #[error("server '{name}' is not configured for consumer or globally")]
    UnknownServer {
        /// Requested name.
        name: String,
    },

    /// The caller filter names a global server the consumer has not opted into.
    #[error("server '{name}' is global but not enabled for this consumer")]
    NotOptedIn {
        /// Requested name.
        name: String,
    },

    /// The caller filter names an opted-in global server while global servers
    /// are disabled for the call.
    #[error("server '{name}' is global and global servers are disabled for this call")]
    GlobalServersDisabled {
        /// Requested name.
        name: String,
    },

    /// A configured key cannot name a server.
    #[error("server name '{name}' is invalid: {reason}")]
    InvalidServerName {
        /// Configured key.
        name: String,
        /// Validation failure.
        reason: String,
    },

    /// An override key was dropped because it would switch transport.
    #[error("override of '{key}' on server '{server}' ignored: would change {from} transport")]
    TransportChangeDropped {
        /// Server the override targeted.
        server: ServerName,
        /// Dropped key.
        key: String,
        /// Transport of the base entry.
        from: TransportKind,
    },
}

/// Ordered list of servers to instantiate for one consumer invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedServerSet {
    consumer: ConsumerName,
    origin: ConfigOrigin,
    servers: Vec<ResolvedServer>,
    warnings: Vec<ResolutionWarning>,
}

impl ResolvedServerSet {
    /// Assembles a resolved set.
    #[must_use]
    pub const fn new(
        consumer: ConsumerName,
        origin: ConfigOrigin,
        servers: Vec<ResolvedServer>,
        warnings: Vec<ResolutionWarning>,
    ) -> Self {
        Self {
            consumer,
            origin,
            servers,
            warnings,
        }
    }

    /// Returns the consumer the set was resolved for.
    #[must_use]
    pub const fn consumer(&self) -> &ConsumerName {
        &self.consumer
    }

    /// Returns which consumer file was used.
    #[must_use]
    pub const fn origin(&self) -> &ConfigOrigin {
        &self.origin
    }

    /// Returns servers in startup order.
    #[must_use]
    pub fn servers(&self) -> &[ResolvedServer] {
        &self.servers
    }

    /// Returns server names in startup order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.servers.iter().map(|server| server.name.as_str()).collect()
    }

    /// Returns resolution warnings.
    #[must_use]
    pub fn warnings(&self) -> &[ResolutionWarning] {
        &self.warnings
    }

    /// Returns whether no servers were selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Returns the number of selected servers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.servers.len()
    }
}
