//! Startup paths selected from host runtime capabilities.

use crate::tool_registry::{
    domain::{ConnectionDescriptor, ServerName, StartupPath, ToolDefinition},
    ports::{ReleasableResource, ToolServerHost, ToolServerHostError, ToolServerHostResult},
};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Tools returned by a started server, with the release capability when the
/// composable path produced one.
pub struct StartOutcome {
    /// Tools exposed by the server.
    pub tools: Vec<ToolDefinition>,
    /// Release capability to enter into the session scope.
    pub release: Option<Box<dyn ReleasableResource>>,
    /// Path that started the server.
    pub path: StartupPath,
}

impl fmt::Debug for StartOutcome {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("StartOutcome")
            .field("tools", &self.tools)
            .field("releasable", &self.release.is_some())
            .field("path", &self.path)
            .finish()
    }
}

/// Strategy for starting one server.
#[async_trait]
pub trait ServerStarter: Send + Sync {
    /// Returns the preferred path of this starter.
    fn path(&self) -> StartupPath;

    /// Starts `server` from `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolServerHostError`] when the host cannot start the server.
    async fn start(
        &self,
        server: &ServerName,
        descriptor: &ConnectionDescriptor,
    ) -> ToolServerHostResult<StartOutcome>;
}

/// Starts servers through the host's toolset builder; the host owns teardown.
#[derive(Debug)]
pub struct SimpleStarter<H>
where
    H: ToolServerHost,
{
    host: Arc<H>,
}

impl<H> SimpleStarter<H>
where
    H: ToolServerHost,
{
    /// Creates a simple starter over `host`.
    #[must_use]
    pub const fn new(host: Arc<H>) -> Self {
        Self { host }
    }
}

#[async_trait]
impl<H> ServerStarter for SimpleStarter<H>
where
    H: ToolServerHost,
{
    fn path(&self) -> StartupPath {
        StartupPath::Simple
    }

    async fn start(
        &self,
        server: &ServerName,
        descriptor: &ConnectionDescriptor,
    ) -> ToolServerHostResult<StartOutcome> {
        let tools = self.host.start_toolset(server, descriptor).await?;
        Ok(StartOutcome {
            tools,
            release: None,
            path: StartupPath::Simple,
        })
    }
}

/// Starts servers with a separate release capability.
///
/// When the host reports [`ToolServerHostError::Unsupported`] for a server,
/// that server is started on the simple path instead.
#[derive(Debug)]
pub struct ComposableStarter<H>
where
    H: ToolServerHost,
{
    host: Arc<H>,
    fallback: SimpleStarter<H>,
}

impl<H> ComposableStarter<H>
where
    H: ToolServerHost,
{
    /// Creates a composable starter over `host`.
    #[must_use]
    pub fn new(host: Arc<H>) -> Self {
        Self {
            fallback: SimpleStarter::new(Arc::clone(&host)),
            host,
        }
    }
}

#[async_trait]
impl<H> ServerStarter for ComposableStarter<H>
where
    H: ToolServerHost,
{
    fn path(&self) -> StartupPath {
        StartupPath::Composable
    }

    async fn start(
        &self,
        server: &ServerName,
        descriptor: &ConnectionDescriptor,
    ) -> ToolServerHostResult<StartOutcome> {
        match self.host.start_releasable(server, descriptor).await {
            Ok(started) => Ok(StartOutcome {
                tools: started.tools,
                release: Some(started.release),
                path: StartupPath::Composable,
            }),
            Err(ToolServerHostError::Unsupported { reason, .. }) => {
                tracing::debug!(
                    server_name = %server,
                    reason = %reason,
                    "composable start unsupported; using simple path"
                );
                self.fallback.start(server, descriptor).await
            }
            Err(err) => Err(err),
        }
    }
}

/// Reads the capabilities of `host` once and returns the matching starter.
#[must_use]
pub fn select_starter<H>(host: Arc<H>) -> Box<dyn ServerStarter>
where
    H: ToolServerHost + 'static,
{
    let capabilities = host.capabilities();
    tracing::debug!(
        releasable_start = capabilities.releasable_start,
        "selected startup path from host capabilities"
    );
    if capabilities.releasable_start {
        Box::new(ComposableStarter::new(host))
    } else {
        Box::new(SimpleStarter::new(host))
    }
}
