//! Error types for tool registry domain validation.

use super::{ServerLoadState, TransportKind};
use thiserror::Error;

/// Errors returned while constructing tool registry domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolRegistryDomainError {
    /// The server name is empty.
    #[error("tool server name must not be empty")]
    EmptyServerName,

    /// The consumer name is empty after trimming.
    #[error("consumer name must not be empty")]
    EmptyConsumerName,

    /// The consumer name cannot be used as a file name.
    #[error("consumer name '{0}' contains invalid characters")]
    InvalidConsumerName(String),

    /// The consumer name exceeds the 100-character limit.
    #[error("consumer name exceeds 100 character limit: {0}")]
    ConsumerNameTooLong(String),

    /// A tool definition name is empty after trimming.
    #[error("tool name must not be empty")]
    EmptyToolName,

    /// Transitioning between two load states is invalid.
    #[error("invalid server load transition: {from} -> {to}")]
    InvalidLoadTransition {
        /// Current load state.
        from: ServerLoadState,
        /// Requested target load state.
        to: ServerLoadState,
    },
}

/// Reasons a server entry cannot be turned into a connection descriptor.
///
/// A rejection skips only the offending server.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DescriptorRejection {
    /// The entry is not a JSON object.
    #[error("server entry must be an object, found {found}")]
    EntryNotObject {
        /// JSON type that was found.
        found: &'static str,
    },

    /// The entry has neither `command` nor `url`.
    #[error("server entry declares neither 'command' nor 'url'")]
    MissingTransport,

    /// The network `url` is not a string.
    #[error("'url' must be a string, found {found}")]
    UrlNotString {
        /// JSON type that was found.
        found: &'static str,
    },

    /// The network `url` is empty.
    #[error("'url' must not be empty")]
    EmptyUrl,

    /// The subprocess `command` is not a string.
    #[error("'command' must be a string, found {found}")]
    CommandNotString {
        /// JSON type that was found.
        found: &'static str,
    },

    /// The subprocess `command` is empty.
    #[error("'command' must not be empty")]
    EmptyCommand,

    /// The subprocess `args` value is not a list.
    #[error("'args' must be a list of strings, found {found}")]
    ArgsNotList {
        /// JSON type that was found.
        found: &'static str,
    },

    /// One element of `args` is not a string.
    #[error("'args[{index}]' must be a string, found {found}")]
    ArgNotString {
        /// Position of the offending argument.
        index: usize,
        /// JSON type that was found.
        found: &'static str,
    },

    /// A string-map field (`env` or `headers`) is not an object.
    #[error("'{field}' must be an object, found {found}")]
    MapNotObject {
        /// Field name.
        field: &'static str,
        /// JSON type that was found.
        found: &'static str,
    },
}

/// Error returned when an override would switch the transport of an entry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("override key '{key}' would change transport from {from}")]
pub struct TransportChangeRejected {
    /// Rejected override key.
    pub key: String,
    /// Transport of the base entry.
    pub from: TransportKind,
}
