//! Identifier and validated-name types for tool servers and consumers.

use super::ToolRegistryDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum length for consumer names.
const MAX_NAME_LENGTH: usize = 100;

fn normalize_name(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_owned())
}

fn has_valid_characters(value: &str) -> bool {
    value
        .chars()
        .all(|character| !character.is_whitespace() && !character.is_control() && character != '/')
}

/// Tool server name.
///
/// Names are the keys of a `mcpServers` map and are kept verbatim: no trimming
/// or case folding, so two keys name the same server only when they are equal.
/// The only rejected key is the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerName(String);

impl ServerName {
    /// Creates a server name from a configuration key.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::EmptyServerName`] when `value` is
    /// empty.
    pub fn new(value: impl Into<String>) -> Result<Self, ToolRegistryDomainError> {
        let name = value.into();
        if name.is_empty() {
            return Err(ToolRegistryDomainError::EmptyServerName);
        }
        Ok(Self(name))
    }

    /// Returns the server name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ServerName {
    type Error = ToolRegistryDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ServerName> for String {
    fn from(value: ServerName) -> Self {
        value.0
    }
}

impl AsRef<str> for ServerName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ServerName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Validated consumer name (for example an agent persona).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConsumerName(String);

impl ConsumerName {
    /// Creates a validated consumer name.
    ///
    /// Consumer names become file names: surrounding whitespace is trimmed
    /// and whitespace, control characters, `/` and a leading `.` are
    /// rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError`] when validation fails.
    pub fn new(value: impl Into<String>) -> Result<Self, ToolRegistryDomainError> {
        let normalized =
            normalize_name(value.into()).ok_or(ToolRegistryDomainError::EmptyConsumerName)?;

        if !has_valid_characters(&normalized) || normalized.starts_with('.') {
            return Err(ToolRegistryDomainError::InvalidConsumerName(normalized));
        }

        if normalized.len() > MAX_NAME_LENGTH {
            return Err(ToolRegistryDomainError::ConsumerNameTooLong(normalized));
        }

        Ok(Self(normalized))
    }

    /// Returns the consumer name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derives the fallback consumer name by stripping the first matching
    /// prefix.
    ///
    /// Returns `None` when no prefix matches or stripping leaves nothing.
    #[must_use]
    pub fn fallback_name(&self, prefixes: &[String]) -> Option<Self> {
        prefixes
            .iter()
            .filter(|prefix| !prefix.is_empty())
            .find_map(|prefix| self.0.strip_prefix(prefix.as_str()))
            .and_then(|stripped| Self::new(stripped).ok())
    }
}

impl TryFrom<String> for ConsumerName {
    type Error = ToolRegistryDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ConsumerName> for String {
    fn from(value: ConsumerName) -> Self {
        value.0
    }
}

impl AsRef<str> for ConsumerName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ConsumerName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Identifier of one loader session.
///
/// Sessions discriminate cache entries when several consumer sessions share a
/// process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a new random session identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Cache scope for one consumer inside one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConsumerScopeKey {
    session: SessionId,
    consumer: ConsumerName,
}

impl ConsumerScopeKey {
    /// Creates a consumer scope key.
    #[must_use]
    pub const fn new(session: SessionId, consumer: ConsumerName) -> Self {
        Self { session, consumer }
    }

    /// Returns the session discriminator.
    #[must_use]
    pub const fn session(&self) -> SessionId {
        self.session
    }

    /// Returns the consumer name.
    #[must_use]
    pub const fn consumer(&self) -> &ConsumerName {
        &self.consumer
    }
}

impl fmt::Display for ConsumerScopeKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}/{}", self.session, self.consumer)
    }
}
