//! Facade resolving and starting the tool servers of one consumer.

use super::{
    cache::LoadCache,
    descriptor::DescriptorBuilder,
    lifecycle::LifecycleManager,
    resolver::{ConfigResolver, LoadOptions},
    scope::{CleanupScope, ScopeCloseReport},
    settings::LoaderSettings,
    starter::select_starter,
    template::EnvSnapshot,
};
use crate::tool_registry::{
    adapters::FsConfigSource,
    domain::{
        ConsumerName, ConsumerScopeKey, LoadReport, LoadedServerHandle, ResolvedServerSet,
        ServerName, SessionId, StartupPath, ToolDefinition, ToolRegistryDomainError,
    },
    ports::{ConfigSource, ConfigSourceError, ToolServerHost},
};
use mockable::Clock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::{Handle, RuntimeFlavor};

/// Errors returned by the loader facade.
///
/// Failures of individual servers are never errors; they appear as skipped
/// outcomes in the [`LoadReport`].
#[derive(Debug, Clone, Error)]
pub enum LoaderError {
    /// The global or consumer configuration could not be read or parsed.
    #[error(transparent)]
    Config(#[from] ConfigSourceError),
    /// The load state machine was driven out of order.
    #[error(transparent)]
    Lifecycle(#[from] ToolRegistryDomainError),
    /// The blocking variant could not drive the async sequence.
    #[error("loader runtime error: {0}")]
    Runtime(Arc<dyn std::error::Error + Send + Sync>),
}

impl LoaderError {
    /// Wraps a runtime error.
    pub fn runtime(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Runtime(Arc::new(err))
    }
}

/// Result type for loader operations.
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Session state shared by every load call: the cache and the cleanup scope
/// owning release capabilities.
///
/// Dropping a context inside a tokio runtime schedules release of the
/// servers it still owns. Dropped outside a runtime it releases nothing, so
/// sessions driven through [`ToolLoader::load_tools_blocking`] without a
/// runtime must end with [`LoaderContext::shutdown_blocking`].
#[derive(Debug, Default)]
pub struct LoaderContext {
    session: SessionId,
    cache: LoadCache,
    scope: CleanupScope,
}

impl LoaderContext {
    /// Creates a context for a fresh session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context for `session`.
    #[must_use]
    pub fn for_session(session: SessionId) -> Self {
        Self {
            session,
            cache: LoadCache::new(),
            scope: CleanupScope::new(),
        }
    }

    /// Returns the session discriminator.
    #[must_use]
    pub const fn session(&self) -> SessionId {
        self.session
    }

    /// Returns the cache key for `consumer` in this session.
    #[must_use]
    pub fn scope_key(&self, consumer: &ConsumerName) -> ConsumerScopeKey {
        ConsumerScopeKey::new(self.session, consumer.clone())
    }

    /// Returns the live handle of `server` for `consumer`, if loaded.
    #[must_use]
    pub fn cached(&self, consumer: &ConsumerName, server: &ServerName) -> Option<&LoadedServerHandle> {
        self.cache.get(&self.scope_key(consumer), server)
    }

    /// Returns whether the release capability behind `handle` is still held.
    ///
    /// Simple-path handles have no ticket and report `false`.
    #[must_use]
    pub fn is_releasable(&self, handle: &LoadedServerHandle) -> bool {
        handle
            .ticket()
            .is_some_and(|ticket| self.scope.is_live(ticket))
    }

    /// Returns the number of servers awaiting release.
    #[must_use]
    pub fn pending_releases(&self) -> usize {
        self.scope.pending()
    }

    /// Releases every started server, newest first, and clears the cache.
    pub async fn shutdown(&mut self) -> ScopeCloseReport {
        let report = self.scope.close().await;
        self.cache.clear();
        tracing::info!(
            session = %self.session,
            released = report.released.len(),
            failures = report.failures.len(),
            "loader session shut down"
        );
        report
    }

    /// Synchronous twin of [`LoaderContext::shutdown`].
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Runtime`] when no runtime can drive the
    /// shutdown.
    pub fn shutdown_blocking(&mut self) -> LoaderResult<ScopeCloseReport> {
        block_on(self.shutdown())
    }
}

/// Resolves consumer configuration and starts the selected tool servers.
pub struct ToolLoader<S, H, C>
where
    S: ConfigSource,
    H: ToolServerHost,
    C: Clock + Send + Sync,
{
    resolver: ConfigResolver<S>,
    lifecycle: LifecycleManager<C>,
    host: Arc<H>,
}

impl<S, H, C> ToolLoader<S, H, C>
where
    S: ConfigSource,
    H: ToolServerHost + 'static,
    C: Clock + Send + Sync,
{
    /// Creates a loader substituting from the current process environment.
    ///
    /// Host capabilities are read once here; the chosen startup path is used
    /// for the lifetime of the loader.
    #[must_use]
    pub fn new(source: Arc<S>, host: Arc<H>, clock: Arc<C>) -> Self {
        Self::with_env(source, host, clock, EnvSnapshot::capture())
    }

    /// Creates a loader substituting from `env`.
    #[must_use]
    pub fn with_env(source: Arc<S>, host: Arc<H>, clock: Arc<C>, env: EnvSnapshot) -> Self {
        let starter = select_starter(Arc::clone(&host));
        Self {
            resolver: ConfigResolver::new(source),
            lifecycle: LifecycleManager::new(starter, DescriptorBuilder::new(env), clock),
            host,
        }
    }

    /// Replaces the descriptor builder.
    #[must_use]
    pub fn with_descriptor_builder(mut self, builder: DescriptorBuilder) -> Self {
        self.lifecycle = self.lifecycle.with_builder(builder);
        self
    }

    /// Replaces the fallback prefixes used for consumer lookup.
    #[must_use]
    pub fn with_fallback_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.resolver = self.resolver.with_fallback_prefixes(prefixes);
        self
    }

    /// Replaces the per-server startup timeout.
    #[must_use]
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.lifecycle = self.lifecycle.with_startup_timeout(timeout);
        self
    }

    /// Returns the host runtime.
    #[must_use]
    pub const fn host(&self) -> &Arc<H> {
        &self.host
    }

    /// Returns the startup path chosen when the loader was created.
    #[must_use]
    pub fn startup_path(&self) -> StartupPath {
        self.lifecycle.starter().path()
    }

    /// Resolves the server set of `consumer` without starting anything.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Config`] when configuration cannot be read.
    pub async fn resolve(
        &self,
        consumer: &ConsumerName,
        options: &LoadOptions,
    ) -> LoaderResult<ResolvedServerSet> {
        Ok(self.resolver.resolve(consumer, options).await?)
    }

    /// Resolves and loads the servers of `consumer`, reporting per-server
    /// outcomes.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Config`] when configuration cannot be read.
    /// Server failures are reported as skipped outcomes instead.
    pub async fn load_report(
        &self,
        context: &mut LoaderContext,
        consumer: &ConsumerName,
        options: &LoadOptions,
    ) -> LoaderResult<LoadReport> {
        let servers = self.resolver.resolve(consumer, options).await?;
        let key = context.scope_key(consumer);
        let report = self
            .lifecycle
            .load(&key, &servers, &mut context.cache, &mut context.scope)
            .await?;
        tracing::info!(
            consumer = %key,
            server_count = report.outcomes.len(),
            skipped = report.skipped().count(),
            tool_count = report.tools.len(),
            "loaded tools for consumer"
        );
        Ok(report)
    }

    /// Resolves and loads the servers of `consumer`, returning their tools in
    /// startup order.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Config`] when configuration cannot be read.
    pub async fn load_tools(
        &self,
        context: &mut LoaderContext,
        consumer: &ConsumerName,
        options: &LoadOptions,
    ) -> LoaderResult<Vec<ToolDefinition>> {
        Ok(self.load_report(context, consumer, options).await?.tools)
    }

    /// Synchronous twin of [`ToolLoader::load_tools`].
    ///
    /// Inside a multi-threaded runtime the current worker is handed over
    /// while blocking; outside any runtime a private one is created for the
    /// call. In that mode the servers started on the composable path are only
    /// released by [`LoaderContext::shutdown_blocking`]; dropping the context
    /// logs a warning and leaks them.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Config`] when configuration cannot be read, or
    /// [`LoaderError::Runtime`] when called from a current-thread runtime or
    /// when no runtime can be built.
    pub fn load_tools_blocking(
        &self,
        context: &mut LoaderContext,
        consumer: &ConsumerName,
        options: &LoadOptions,
    ) -> LoaderResult<Vec<ToolDefinition>> {
        block_on(self.load_tools(context, consumer, options))?
    }
}

impl<H, C> ToolLoader<FsConfigSource, H, C>
where
    H: ToolServerHost + 'static,
    C: Clock + Send + Sync,
{
    /// Creates a filesystem-backed loader from `settings`.
    #[must_use]
    pub fn from_settings(
        settings: LoaderSettings,
        host: Arc<H>,
        clock: Arc<C>,
        env: EnvSnapshot,
    ) -> Self {
        let LoaderSettings {
            layout,
            fallback_prefixes,
            startup_timeout,
        } = settings;
        Self::with_env(Arc::new(FsConfigSource::new(layout)), host, clock, env)
            .with_fallback_prefixes(fallback_prefixes)
            .with_startup_timeout(startup_timeout)
    }
}

fn block_on<F: Future>(future: F) -> LoaderResult<F::Output> {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::CurrentThread => {
            Err(LoaderError::runtime(std::io::Error::other(
                "blocking load called from a current-thread runtime",
            )))
        }
        Ok(handle) => Ok(tokio::task::block_in_place(|| handle.block_on(future))),
        Err(_) => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(LoaderError::runtime)?;
            Ok(runtime.block_on(future))
        }
    }
}
