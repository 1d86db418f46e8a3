//! In-memory host runtime adapter for loader tests.

use crate::tool_registry::{
    domain::{ConnectionDescriptor, ServerName, ToolDefinition},
    ports::{
        HostCapabilities, ReleasableResource, StartedServer, ToolServerHost, ToolServerHostError,
        ToolServerHostResult,
    },
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// In-memory tool server host.
///
/// This adapter models startup and teardown without spawning external
/// processes. It records every start, the descriptor it was given and every
/// release, so tests can assert deduplication and release ordering.
#[derive(Debug, Clone)]
pub struct InMemoryToolServerHost {
    capabilities: HostCapabilities,
    state: Arc<RwLock<InMemoryHostState>>,
}

#[derive(Debug, Default)]
struct InMemoryHostState {
    tool_catalogs: HashMap<ServerName, Vec<ToolDefinition>>,
    failing_servers: HashMap<ServerName, String>,
    composable_unsupported: HashSet<ServerName>,
    failing_releases: HashMap<ServerName, String>,
    start_delays: HashMap<ServerName, Duration>,
    start_counts: HashMap<ServerName, usize>,
    descriptors: HashMap<ServerName, ConnectionDescriptor>,
    running_servers: Vec<ServerName>,
    released_servers: Vec<ServerName>,
}

fn lock_error(err: impl ToString) -> ToolServerHostError {
    ToolServerHostError::runtime(std::io::Error::other(err.to_string()))
}

impl InMemoryToolServerHost {
    /// Creates a host advertising `capabilities`.
    #[must_use]
    pub fn new(capabilities: HostCapabilities) -> Self {
        Self {
            capabilities,
            state: Arc::new(RwLock::new(InMemoryHostState::default())),
        }
    }

    /// Creates a host that hands back release capabilities.
    #[must_use]
    pub fn composable() -> Self {
        Self::new(HostCapabilities::composable())
    }

    /// Creates a host that only builds toolsets.
    #[must_use]
    pub fn simple() -> Self {
        Self::new(HostCapabilities::simple())
    }

    /// Associates a tool catalog with a server name.
    ///
    /// Existing catalog entries are replaced.
    ///
    /// # Errors
    ///
    /// Returns host runtime errors when lock acquisition fails.
    pub fn set_tool_catalog(
        &self,
        server_name: ServerName,
        tools: Vec<ToolDefinition>,
    ) -> ToolServerHostResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.tool_catalogs.insert(server_name, tools);
        Ok(())
    }

    /// Makes every start of `server_name` fail with `reason`.
    ///
    /// # Errors
    ///
    /// Returns host runtime errors when lock acquisition fails.
    pub fn fail_start(
        &self,
        server_name: ServerName,
        reason: impl Into<String>,
    ) -> ToolServerHostResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.failing_servers.insert(server_name, reason.into());
        Ok(())
    }

    /// Makes the composable path report `Unsupported` for `server_name`.
    ///
    /// # Errors
    ///
    /// Returns host runtime errors when lock acquisition fails.
    pub fn reject_composable(&self, server_name: ServerName) -> ToolServerHostResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.composable_unsupported.insert(server_name);
        Ok(())
    }

    /// Makes releasing `server_name` fail with `reason`.
    ///
    /// # Errors
    ///
    /// Returns host runtime errors when lock acquisition fails.
    pub fn fail_release(
        &self,
        server_name: ServerName,
        reason: impl Into<String>,
    ) -> ToolServerHostResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.failing_releases.insert(server_name, reason.into());
        Ok(())
    }

    /// Delays every start of `server_name` by `delay`.
    ///
    /// # Errors
    ///
    /// Returns host runtime errors when lock acquisition fails.
    pub fn delay_start(&self, server_name: ServerName, delay: Duration) -> ToolServerHostResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.start_delays.insert(server_name, delay);
        Ok(())
    }

    /// Returns how many times `server_name` was started.
    ///
    /// # Errors
    ///
    /// Returns host runtime errors when lock acquisition fails.
    pub fn start_count(&self, server_name: &ServerName) -> ToolServerHostResult<usize> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.start_counts.get(server_name).copied().unwrap_or_default())
    }

    /// Returns the descriptor `server_name` was last started with.
    ///
    /// # Errors
    ///
    /// Returns host runtime errors when lock acquisition fails.
    pub fn last_descriptor(
        &self,
        server_name: &ServerName,
    ) -> ToolServerHostResult<Option<ConnectionDescriptor>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.descriptors.get(server_name).cloned())
    }

    /// Returns servers that are started and not yet released.
    ///
    /// # Errors
    ///
    /// Returns host runtime errors when lock acquisition fails.
    pub fn running_servers(&self) -> ToolServerHostResult<Vec<ServerName>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.running_servers.clone())
    }

    /// Returns released servers in release order.
    ///
    /// # Errors
    ///
    /// Returns host runtime errors when lock acquisition fails.
    pub fn released_servers(&self) -> ToolServerHostResult<Vec<ServerName>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.released_servers.clone())
    }

    async fn start(
        &self,
        server: &ServerName,
        descriptor: &ConnectionDescriptor,
    ) -> ToolServerHostResult<Vec<ToolDefinition>> {
        let delay = {
            let state = self.state.read().map_err(lock_error)?;
            if let Some(reason) = state.failing_servers.get(server) {
                return Err(ToolServerHostError::Startup {
                    server: server.clone(),
                    reason: reason.clone(),
                });
            }
            state.start_delays.get(server).copied()
        };

        if let Some(pause) = delay {
            tokio::time::sleep(pause).await;
        }

        let mut state = self.state.write().map_err(lock_error)?;
        *state.start_counts.entry(server.clone()).or_default() += 1;
        state.descriptors.insert(server.clone(), descriptor.clone());
        state.running_servers.push(server.clone());
        Ok(state.tool_catalogs.get(server).cloned().unwrap_or_default())
    }
}

impl Default for InMemoryToolServerHost {
    fn default() -> Self {
        Self::composable()
    }
}

#[async_trait]
impl ToolServerHost for InMemoryToolServerHost {
    fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }

    async fn start_releasable(
        &self,
        server: &ServerName,
        descriptor: &ConnectionDescriptor,
    ) -> ToolServerHostResult<StartedServer> {
        let unsupported = {
            let state = self.state.read().map_err(lock_error)?;
            !self.capabilities.releasable_start || state.composable_unsupported.contains(server)
        };
        if unsupported {
            return Err(ToolServerHostError::Unsupported {
                server: server.clone(),
                reason: "release capabilities are not available".to_owned(),
            });
        }

        let tools = self.start(server, descriptor).await?;
        Ok(StartedServer {
            tools,
            release: Box::new(InMemoryRelease {
                server: server.clone(),
                state: Arc::clone(&self.state),
            }),
        })
    }

    async fn start_toolset(
        &self,
        server: &ServerName,
        descriptor: &ConnectionDescriptor,
    ) -> ToolServerHostResult<Vec<ToolDefinition>> {
        self.start(server, descriptor).await
    }
}

struct InMemoryRelease {
    server: ServerName,
    state: Arc<RwLock<InMemoryHostState>>,
}

#[async_trait]
impl ReleasableResource for InMemoryRelease {
    async fn release(&mut self) -> ToolServerHostResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if let Some(position) = state
            .running_servers
            .iter()
            .position(|running| *running == self.server)
        {
            state.running_servers.remove(position);
        }
        state.released_servers.push(self.server.clone());

        if let Some(reason) = state.failing_releases.get(&self.server) {
            return Err(ToolServerHostError::Release {
                server: self.server.clone(),
                reason: reason.clone(),
            });
        }
        Ok(())
    }
}
