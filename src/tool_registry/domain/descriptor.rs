//! Ready-to-start connection descriptors.

use super::TransportKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Launch settings for a tool server running as a local subprocess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubprocessDescriptor {
    command: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    output_suppressed: bool,
}

impl SubprocessDescriptor {
    /// Creates a subprocess descriptor with no arguments or environment.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            output_suppressed: false,
        }
    }

    /// Replaces command-line arguments.
    #[must_use]
    pub fn with_args(mut self, values: impl IntoIterator<Item = String>) -> Self {
        self.args = values.into_iter().collect();
        self
    }

    /// Replaces process environment variables.
    #[must_use]
    pub fn with_env(mut self, values: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env = values.into_iter().collect();
        self
    }

    /// Records that the command has been wrapped to discard diagnostics.
    #[must_use]
    pub const fn with_output_suppressed(mut self, suppressed: bool) -> Self {
        self.output_suppressed = suppressed;
        self
    }

    /// Returns the executable command.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Returns command-line arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns environment variables.
    #[must_use]
    pub const fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Returns whether the command was wrapped for output suppression.
    #[must_use]
    pub const fn output_suppressed(&self) -> bool {
        self.output_suppressed
    }
}

/// Connection settings for a tool server reached over the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    url: String,
    headers: BTreeMap<String, String>,
}

impl NetworkDescriptor {
    /// Creates a network descriptor without headers.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Replaces request headers.
    #[must_use]
    pub fn with_headers(mut self, values: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers = values.into_iter().collect();
        self
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns request headers.
    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }
}

/// Fully substituted description of how to reach a tool server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "config")]
pub enum ConnectionDescriptor {
    /// Spawn a local process.
    Subprocess(SubprocessDescriptor),
    /// Connect to a remote endpoint.
    Network(NetworkDescriptor),
}

impl ConnectionDescriptor {
    /// Returns the transport family.
    #[must_use]
    pub const fn kind(&self) -> TransportKind {
        match self {
            Self::Subprocess(_) => TransportKind::Subprocess,
            Self::Network(_) => TransportKind::Network,
        }
    }

    /// Returns the subprocess settings when this is a subprocess descriptor.
    #[must_use]
    pub const fn as_subprocess(&self) -> Option<&SubprocessDescriptor> {
        match self {
            Self::Subprocess(descriptor) => Some(descriptor),
            Self::Network(_) => None,
        }
    }

    /// Returns the network settings when this is a network descriptor.
    #[must_use]
    pub const fn as_network(&self) -> Option<&NetworkDescriptor> {
        match self {
            Self::Network(descriptor) => Some(descriptor),
            Self::Subprocess(_) => None,
        }
    }
}
