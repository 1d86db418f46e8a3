//! Sequential per-server startup driven by the load state machine.

use super::{
    cache::LoadCache,
    descriptor::DescriptorBuilder,
    scope::CleanupScope,
    starter::{ServerStarter, StartOutcome},
};
use crate::tool_registry::domain::{
    ConsumerScopeKey, LoadFailure, LoadReport, LoadedServerHandle, ResolvedServer,
    ResolvedServerSet, ServerLoadOutcome, ServerLoadState, ServerLoadTracker,
    ToolRegistryDomainError,
};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;

/// Default time a single server may take to start.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, ToolRegistryDomainError>;

/// Starts resolved servers one at a time and records their outcomes.
pub struct LifecycleManager<C>
where
    C: Clock + Send + Sync,
{
    starter: Box<dyn ServerStarter>,
    builder: DescriptorBuilder,
    clock: Arc<C>,
    startup_timeout: Duration,
}

impl<C> LifecycleManager<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a manager using `starter` for every server.
    #[must_use]
    pub fn new(starter: Box<dyn ServerStarter>, builder: DescriptorBuilder, clock: Arc<C>) -> Self {
        Self {
            starter,
            builder,
            clock,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
        }
    }

    /// Replaces the per-server startup timeout.
    #[must_use]
    pub const fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Replaces the descriptor builder.
    #[must_use]
    pub fn with_builder(mut self, builder: DescriptorBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Returns the starter chosen for this manager.
    #[must_use]
    pub fn starter(&self) -> &dyn ServerStarter {
        self.starter.as_ref()
    }

    /// Loads every server of `servers` in order.
    ///
    /// Cached servers are reused; others are started and cached. Release
    /// capabilities from the composable path are entered into `scope`. A
    /// failing server is skipped and never affects its siblings.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::InvalidLoadTransition`] only if the
    /// state machine is driven out of order.
    pub async fn load(
        &self,
        key: &ConsumerScopeKey,
        servers: &ResolvedServerSet,
        cache: &mut LoadCache,
        scope: &mut CleanupScope,
    ) -> LifecycleResult<LoadReport> {
        let mut report = LoadReport::default();
        for server in servers.servers() {
            let outcome = if let Some(handle) = cache.get(key, &server.name) {
                let mut tracker = ServerLoadTracker::new(server.name.clone());
                tracker.advance(ServerLoadState::CacheHit)?;
                tracker.advance(ServerLoadState::Reused)?;
                tracing::debug!(consumer = %key, server_name = %server.name, "reusing cached server");
                report.tools.extend(handle.tools().iter().cloned());
                ServerLoadOutcome {
                    server: server.name.clone(),
                    state: tracker.state(),
                    path: Some(handle.path()),
                    tool_count: handle.tools().len(),
                    failure: None,
                }
            } else {
                let (outcome, handle) = self.start_server(key, server, scope).await?;
                if let Some(loaded) = handle {
                    report.tools.extend(loaded.tools().iter().cloned());
                    cache.insert(key.clone(), loaded);
                }
                outcome
            };
            report.outcomes.push(outcome);
        }
        Ok(report)
    }

    async fn start_server(
        &self,
        key: &ConsumerScopeKey,
        server: &ResolvedServer,
        scope: &mut CleanupScope,
    ) -> LifecycleResult<(ServerLoadOutcome, Option<LoadedServerHandle>)> {
        let mut tracker = ServerLoadTracker::new(server.name.clone());
        tracker.advance(ServerLoadState::Starting)?;

        let built = match self.builder.build(&server.name, &server.entry) {
            Ok(built) => built,
            Err(rejection) => {
                return Self::skip(key, tracker, LoadFailure::Rejected(rejection));
            }
        };
        for warning in &built.warnings {
            tracing::warn!(consumer = %key, server_name = %server.name, "{warning}");
        }

        let started = tokio::time::timeout(
            self.startup_timeout,
            self.starter.start(&server.name, &built.descriptor),
        )
        .await;
        let StartOutcome {
            tools,
            release,
            path,
        } = match started {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => return Self::skip(key, tracker, LoadFailure::Startup(err.to_string())),
            Err(_) => {
                return Self::skip(key, tracker, LoadFailure::TimedOut(self.startup_timeout));
            }
        };
        tracker.advance(ServerLoadState::Started)?;

        let mut handle = LoadedServerHandle::new(server.name.clone(), tools, path, self.clock.utc());
        if let Some(resource) = release {
            handle = handle.with_ticket(scope.enter(server.name.as_str(), resource));
        }
        tracker.advance(ServerLoadState::Registered)?;
        tracing::info!(
            consumer = %key,
            server_name = %server.name,
            tool_count = handle.tools().len(),
            path = %path,
            "started tool server"
        );

        let outcome = ServerLoadOutcome {
            server: server.name.clone(),
            state: tracker.state(),
            path: Some(path),
            tool_count: handle.tools().len(),
            failure: None,
        };
        Ok((outcome, Some(handle)))
    }

    fn skip(
        key: &ConsumerScopeKey,
        mut tracker: ServerLoadTracker,
        failure: LoadFailure,
    ) -> LifecycleResult<(ServerLoadOutcome, Option<LoadedServerHandle>)> {
        tracker.advance(ServerLoadState::Failed)?;
        tracing::warn!(
            consumer = %key,
            server_name = %tracker.server(),
            failure = %failure,
            "skipping tool server"
        );
        tracker.advance(ServerLoadState::Skipped)?;
        let outcome = ServerLoadOutcome {
            server: tracker.server().clone(),
            state: tracker.state(),
            path: None,
            tool_count: 0,
            failure: Some(failure),
        };
        Ok((outcome, None))
    }
}
