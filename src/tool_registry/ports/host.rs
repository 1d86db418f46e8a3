//! Host runtime port for starting tool servers.

use crate::tool_registry::domain::{ConnectionDescriptor, ServerName, ToolDefinition};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for host runtime operations.
pub type ToolServerHostResult<T> = Result<T, ToolServerHostError>;

/// Capability surface advertised by a host runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HostCapabilities {
    /// Whether the host can start a server and hand back a separate release
    /// capability.
    pub releasable_start: bool,
}

impl HostCapabilities {
    /// Capabilities of a host that hands back release capabilities.
    #[must_use]
    pub const fn composable() -> Self {
        Self {
            releasable_start: true,
        }
    }

    /// Capabilities of a host that only builds toolsets.
    #[must_use]
    pub const fn simple() -> Self {
        Self {
            releasable_start: false,
        }
    }
}

/// Capability to tear down a started server.
#[async_trait]
pub trait ReleasableResource: Send + Sync {
    /// Terminates the underlying process or connection.
    ///
    /// The caller invokes this at most once per resource.
    async fn release(&mut self) -> ToolServerHostResult<()>;
}

/// Tools and release capability returned by the composable start path.
pub struct StartedServer {
    /// Tools exposed by the server.
    pub tools: Vec<ToolDefinition>,
    /// Capability that terminates the server.
    pub release: Box<dyn ReleasableResource>,
}

impl fmt::Debug for StartedServer {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("StartedServer")
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}

/// Runtime contract for starting tool servers.
///
/// Implementations speak the tool protocol; the loader only sees tool lists
/// and release capabilities.
#[async_trait]
pub trait ToolServerHost: Send + Sync {
    /// Reports which start paths the host supports.
    fn capabilities(&self) -> HostCapabilities;

    /// Starts a server and hands back its tools together with a release
    /// capability.
    ///
    /// # Errors
    ///
    /// Returns [`ToolServerHostError::Unsupported`] when the host cannot hand
    /// back a release capability for this server, or any startup error.
    async fn start_releasable(
        &self,
        server: &ServerName,
        descriptor: &ConnectionDescriptor,
    ) -> ToolServerHostResult<StartedServer>;

    /// Builds the toolset for a server whose teardown the host owns.
    ///
    /// # Errors
    ///
    /// Returns startup errors from the host runtime.
    async fn start_toolset(
        &self,
        server: &ServerName,
        descriptor: &ConnectionDescriptor,
    ) -> ToolServerHostResult<Vec<ToolDefinition>>;
}

/// Errors returned by host runtime adapters.
#[derive(Debug, Clone, Error)]
pub enum ToolServerHostError {
    /// The host cannot use the requested start path for this server.
    #[error("host cannot start server {server} on the composable path: {reason}")]
    Unsupported {
        /// Server name.
        server: ServerName,
        /// Reason string.
        reason: String,
    },

    /// The server failed to start.
    #[error("server {server} failed to start: {reason}")]
    Startup {
        /// Server name.
        server: ServerName,
        /// Reason string.
        reason: String,
    },

    /// Releasing a started server failed.
    #[error("failed to release server {server}: {reason}")]
    Release {
        /// Server name.
        server: ServerName,
        /// Reason string.
        reason: String,
    },

    /// Generic runtime failure.
    #[error("tool server host runtime error: {0}")]
    Runtime(Arc<dyn std::error::Error + Send + Sync>),
}

impl ToolServerHostError {
    /// Wraps a runtime error from the host adapter.
    pub fn runtime(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Runtime(Arc::new(err))
    }
}
