//! Live server handles and release tickets.

use super::{ServerName, StartupPath, ToolDefinition};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identifier of one cleanup scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(Uuid);

impl ScopeId {
    /// Creates a new random scope identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Non-owning reference to a resource entered into a cleanup scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReleaseTicket {
    scope: ScopeId,
    slot: usize,
}

impl ReleaseTicket {
    /// Creates a ticket for `slot` in `scope`.
    #[must_use]
    pub const fn new(scope: ScopeId, slot: usize) -> Self {
        Self { scope, slot }
    }

    /// Returns the owning scope.
    #[must_use]
    pub const fn scope(self) -> ScopeId {
        self.scope
    }

    /// Returns the slot within the owning scope.
    #[must_use]
    pub const fn slot(self) -> usize {
        self.slot
    }
}

/// Live tool list of a started server.
///
/// The handle never owns the server's release capability: on the composable
/// path it carries a [`ReleaseTicket`] into the scope that does, on the simple
/// path the host runtime owns teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedServerHandle {
    server: ServerName,
    tools: Arc<Vec<ToolDefinition>>,
    path: StartupPath,
    ticket: Option<ReleaseTicket>,
    started_at: DateTime<Utc>,
}

impl LoadedServerHandle {
    /// Creates a handle for a freshly started server.
    #[must_use]
    pub fn new(
        server: ServerName,
        tools: Vec<ToolDefinition>,
        path: StartupPath,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            server,
            tools: Arc::new(tools),
            path,
            ticket: None,
            started_at,
        }
    }

    /// Attaches the scope ticket of the server's release capability.
    #[must_use]
    pub const fn with_ticket(mut self, ticket: ReleaseTicket) -> Self {
        self.ticket = Some(ticket);
        self
    }

    /// Returns the server name.
    #[must_use]
    pub const fn server(&self) -> &ServerName {
        &self.server
    }

    /// Returns the shared tool list.
    #[must_use]
    pub const fn tools(&self) -> &Arc<Vec<ToolDefinition>> {
        &self.tools
    }

    /// Returns the startup path that produced the handle.
    #[must_use]
    pub const fn path(&self) -> StartupPath {
        self.path
    }

    /// Returns the release ticket, if the server was entered into a scope.
    #[must_use]
    pub const fn ticket(&self) -> Option<ReleaseTicket> {
        self.ticket
    }

    /// Returns when the server was started.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
