//! Resolution of the ordered server set for one consumer.

use crate::tool_registry::{
    domain::{
        ConsumerConfig, ConsumerName, GlobalConfig, ResolutionWarning, ResolvedServer,
        ResolvedServerSet, ServerConfigEntry, ServerName, ServerOrigin,
    },
    ports::{ConfigSource, ConfigSourceResult},
};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// Default fallback prefixes for consumer config lookup.
pub const DEFAULT_FALLBACK_PREFIXES: &[&str] = &["enhanced_"];

/// Caller-level options for one resolution call.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Hard allow-list of server names, when present.
    pub filter: Option<Vec<String>>,
    /// Whether opted-in global servers are candidates.
    pub include_global: bool,
    /// Names removed from the candidate set.
    pub excluded: Vec<String>,
    /// Per-server partial entries merged after file-configured overrides.
    pub overrides: Map<String, Value>,
}

impl LoadOptions {
    /// Creates options that include opted-in global servers and nothing else.
    #[must_use]
    pub fn new() -> Self {
        Self {
            filter: None,
            include_global: true,
            excluded: Vec::new(),
            overrides: Map::new(),
        }
    }

    /// Restricts resolution to `names`.
    #[must_use]
    pub fn with_filter<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.filter = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Sets whether opted-in global servers are considered.
    #[must_use]
    pub const fn with_include_global(mut self, include_global: bool) -> Self {
        self.include_global = include_global;
        self
    }

    /// Adds caller-level exclusions.
    #[must_use]
    pub fn with_excluded<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.excluded.extend(names.into_iter().map(Into::into));
        self
    }

    /// Adds a caller-level override for `server`.
    #[must_use]
    pub fn with_override(mut self, server: impl Into<String>, patch: Value) -> Self {
        self.overrides.insert(server.into(), patch);
        self
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves global and consumer configuration into an ordered server set.
#[derive(Debug)]
pub struct ConfigResolver<S>
where
    S: ConfigSource,
{
    source: Arc<S>,
    fallback_prefixes: Vec<String>,
}

impl<S> Clone for ConfigResolver<S>
where
    S: ConfigSource,
{
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            fallback_prefixes: self.fallback_prefixes.clone(),
        }
    }
}

impl<S> ConfigResolver<S>
where
    S: ConfigSource,
{
    /// Creates a resolver reading from `source` with the default fallback
    /// prefixes.
    #[must_use]
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            fallback_prefixes: DEFAULT_FALLBACK_PREFIXES
                .iter()
                .map(|&prefix| prefix.to_owned())
                .collect(),
        }
    }

    /// Replaces the fallback prefixes.
    #[must_use]
    pub fn with_fallback_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.fallback_prefixes = prefixes;
        self
    }

    /// Returns the configuration source.
    #[must_use]
    pub const fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Resolves the servers `consumer` should load.
    ///
    /// Unknown and invalid names are dropped with a warning. Exclusion always
    /// wins over the filter.
    ///
    /// # Errors
    ///
    /// Returns [`crate::tool_registry::ports::ConfigSourceError`] when the
    /// global or selected consumer file cannot be read or parsed.
    pub async fn resolve(
        &self,
        consumer: &ConsumerName,
        options: &LoadOptions,
    ) -> ConfigSourceResult<ResolvedServerSet> {
        let global = self.source.load_global().await?;
        let fallback = consumer.fallback_name(&self.fallback_prefixes);
        let lookup = self
            .source
            .load_consumer(consumer, fallback.as_ref())
            .await?;

        let mut warnings = Vec::new();
        let candidates = candidate_names(&global, &lookup.config, options, &mut warnings);
        let servers = candidates
            .into_iter()
            .filter_map(|(name, origin)| {
                build_server(&global, &lookup.config, options, name, origin, &mut warnings)
            })
            .collect::<Vec<_>>();

        for warning in &warnings {
            tracing::warn!(consumer = %consumer, "{warning}");
        }
        tracing::debug!(
            consumer = %consumer,
            origin = ?lookup.origin,
            server_count = servers.len(),
            "resolved server set"
        );

        Ok(ResolvedServerSet::new(
            consumer.clone(),
            lookup.origin,
            servers,
            warnings,
        ))
    }
}

fn candidate_names<'a>(
    global: &'a GlobalConfig,
    consumer: &'a ConsumerConfig,
    options: &LoadOptions,
    warnings: &mut Vec<ResolutionWarning>,
) -> Vec<(&'a str, ServerOrigin)> {
    let mut candidates: Vec<(&str, ServerOrigin)> = consumer
        .server_names()
        .map(|name| (name, ServerOrigin::Consumer))
        .collect();

    let opted_in: HashSet<&str> = consumer.global_servers().iter().map(String::as_str).collect();
    if options.include_global {
        for name in consumer.global_servers() {
            if !global.contains(name) && !consumer.contains(name) {
                warnings.push(ResolutionWarning::UnknownServer { name: name.clone() });
            }
        }
        candidates.extend(
            global
                .server_names()
                .filter(|name| opted_in.contains(name) && !consumer.contains(name))
                .map(|name| (name, ServerOrigin::Global)),
        );
    }

    if let Some(filter) = &options.filter {
        let selected: HashSet<&str> = candidates.iter().map(|(name, _)| *name).collect();
        for name in filter {
            if selected.contains(name.as_str()) {
                continue;
            }
            let known_global = global.contains(name);
            warnings.push(if known_global && opted_in.contains(name.as_str()) {
                ResolutionWarning::GlobalServersDisabled { name: name.clone() }
            } else if known_global {
                ResolutionWarning::NotOptedIn { name: name.clone() }
            } else {
                ResolutionWarning::UnknownServer { name: name.clone() }
            });
        }
        let allowed: HashSet<&str> = filter.iter().map(String::as_str).collect();
        candidates.retain(|(name, _)| allowed.contains(name));
    }

    let excluded: HashSet<&str> = consumer
        .excluded_servers()
        .iter()
        .chain(&options.excluded)
        .map(String::as_str)
        .collect();
    candidates.retain(|(name, _)| !excluded.contains(name));
    candidates
}

fn build_server(
    global: &GlobalConfig,
    consumer: &ConsumerConfig,
    options: &LoadOptions,
    name: &str,
    origin: ServerOrigin,
    warnings: &mut Vec<ResolutionWarning>,
) -> Option<ResolvedServer> {
    let server = match ServerName::new(name) {
        Ok(server) => server,
        Err(err) => {
            warnings.push(ResolutionWarning::InvalidServerName {
                name: name.to_owned(),
                reason: err.to_string(),
            });
            return None;
        }
    };

    let base = match origin {
        ServerOrigin::Consumer => consumer.server(name),
        ServerOrigin::Global => global.server(name),
    }?;

    let patches = [consumer.server_override(name), options.overrides.get(name)];
    let entry = patches
        .into_iter()
        .flatten()
        .fold(base, |entry: ServerConfigEntry, patch| {
            let (merged, rejected) = entry.merged_with(patch);
            warnings.extend(rejected.into_iter().map(|rejection| {
                ResolutionWarning::TransportChangeDropped {
                    server: server.clone(),
                    key: rejection.key,
                    from: rejection.from,
                }
            }));
            merged
        });

    Some(ResolvedServer {
        name: server,
        entry,
        origin,
    })
}
