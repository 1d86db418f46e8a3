//! Per-server load state machine and load outcomes.

use super::{DescriptorRejection, ServerName, ToolDefinition, ToolRegistryDomainError};
use std::fmt;
use std::time::Duration;

/// Load state of one server within a single resolution call.
///
/// ```text
/// Pending -> CacheHit -> Reused
/// Pending -> Starting -> Started -> Registered
/// Pending -> Starting -> Failed  -> Skipped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerLoadState {
    /// Not yet examined.
    Pending,
    /// A live handle exists for this consumer scope.
    CacheHit,
    /// The cached handle's tools were reused.
    Reused,
    /// Descriptor construction and host startup are in progress.
    Starting,
    /// The host returned a tool list.
    Started,
    /// The handle is cached and, on the composable path, owned by the scope.
    Registered,
    /// Descriptor construction or startup failed.
    Failed,
    /// The server contributes no tools to this call.
    Skipped,
}

impl ServerLoadState {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::CacheHit => "cache_hit",
            Self::Reused => "reused",
            Self::Starting => "starting",
            Self::Started => "started",
            Self::Registered => "registered",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Returns whether transition to `target` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::CacheHit | Self::Starting)
                | (Self::CacheHit, Self::Reused)
                | (Self::Starting, Self::Started | Self::Failed)
                | (Self::Started, Self::Registered)
                | (Self::Failed, Self::Skipped)
        )
    }

    /// Returns whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Reused | Self::Registered | Self::Skipped)
    }
}

impl fmt::Display for ServerLoadState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Startup path chosen from the host runtime's capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StartupPath {
    /// Host returns tools plus a releasable resource.
    Composable,
    /// Host builds the toolset and owns its teardown.
    Simple,
}

impl StartupPath {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Composable => "composable",
            Self::Simple => "simple",
        }
    }
}

impl fmt::Display for StartupPath {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Why a server contributed no tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadFailure {
    /// The entry could not be turned into a descriptor.
    Rejected(DescriptorRejection),
    /// The host start call failed.
    Startup(String),
    /// The host start call exceeded the startup timeout.
    TimedOut(Duration),
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(rejection) => write!(formatter, "invalid entry: {rejection}"),
            Self::Startup(reason) => write!(formatter, "startup failed: {reason}"),
            Self::TimedOut(after) => write!(formatter, "startup timed out after {after:?}"),
        }
    }
}

/// Tracks one server through the load state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLoadTracker {
    server: ServerName,
    state: ServerLoadState,
}

impl ServerLoadTracker {
    /// Starts tracking `server` in the `Pending` state.
    #[must_use]
    pub const fn new(server: ServerName) -> Self {
        Self {
            server,
            state: ServerLoadState::Pending,
        }
    }

    /// Returns the tracked server.
    #[must_use]
    pub const fn server(&self) -> &ServerName {
        &self.server
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> ServerLoadState {
        self.state
    }

    /// Moves to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::InvalidLoadTransition`] when the
    /// transition is not allowed.
    pub fn advance(&mut self, target: ServerLoadState) -> Result<(), ToolRegistryDomainError> {
        if !self.state.can_transition_to(target) {
            return Err(ToolRegistryDomainError::InvalidLoadTransition {
                from: self.state,
                to: target,
            });
        }
        self.state = target;
        Ok(())
    }
}

/// Final result of loading one server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLoadOutcome {
    /// Server name.
    pub server: ServerName,
    /// Terminal load state.
    pub state: ServerLoadState,
    /// Startup path, when the server was started or reused.
    pub path: Option<StartupPath>,
    /// Number of tools contributed.
    pub tool_count: usize,
    /// Failure reason for skipped servers.
    pub failure: Option<LoadFailure>,
}

impl ServerLoadOutcome {
    /// Returns whether the server contributed tools to the call.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(
            self.state,
            ServerLoadState::Reused | ServerLoadState::Registered
        )
    }
}

/// Aggregate tool list and per-server outcomes for one consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Tools in server startup order.
    pub tools: Vec<ToolDefinition>,
    /// One outcome per resolved server, in startup order.
    pub outcomes: Vec<ServerLoadOutcome>,
}

impl LoadReport {
    /// Returns the outcome for `server`.
    #[must_use]
    pub fn outcome(&self, server: &str) -> Option<&ServerLoadOutcome> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.server.as_str() == server)
    }

    /// Returns outcomes of servers that were skipped.
    pub fn skipped(&self) -> impl Iterator<Item = &ServerLoadOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.state == ServerLoadState::Skipped)
    }
}
