//! Raw server configuration entries and override merging.

use super::TransportChangeRejected;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Key holding the subprocess executable.
pub const COMMAND_KEY: &str = "command";
/// Key holding the subprocess argument list.
pub const ARGS_KEY: &str = "args";
/// Key holding the subprocess environment.
pub const ENV_KEY: &str = "env";
/// Key holding the network endpoint.
pub const URL_KEY: &str = "url";
/// Key holding the network request headers.
pub const HEADERS_KEY: &str = "headers";
/// Key holding the explicit output-suppression flag.
pub const SUPPRESS_OUTPUT_KEY: &str = "suppressOutput";

/// Returns a short JSON type name for diagnostics.
#[must_use]
pub const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Transport family of a server entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Local process speaking the tool protocol on STDIO.
    Subprocess,
    /// Remote endpoint reached over the network.
    Network,
}

impl TransportKind {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subprocess => "subprocess",
            Self::Network => "network",
        }
    }

    /// Returns the key whose presence selects the other transport.
    const fn foreign_key(self) -> &'static str {
        match self {
            Self::Subprocess => URL_KEY,
            Self::Network => COMMAND_KEY,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Raw description of one tool server as read from a config file.
///
/// The entry is kept as untyped JSON until the descriptor builder validates
/// it, so a single malformed entry never fails the whole file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerConfigEntry(Value);

impl ServerConfigEntry {
    /// Wraps a raw JSON value.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self(value)
    }

    /// Returns the raw JSON value.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    /// Returns the entry fields when the entry is an object.
    #[must_use]
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        self.0.as_object()
    }

    /// Classifies the entry by the transport key it declares.
    ///
    /// `url` takes precedence when both keys are present.
    #[must_use]
    pub fn transport_kind(&self) -> Option<TransportKind> {
        let fields = self.fields()?;
        if fields.contains_key(URL_KEY) {
            Some(TransportKind::Network)
        } else if fields.contains_key(COMMAND_KEY) {
            Some(TransportKind::Subprocess)
        } else {
            None
        }
    }

    /// Returns the explicit `suppressOutput` flag, when the entry sets one.
    #[must_use]
    pub fn explicit_suppression(&self) -> Option<bool> {
        self.fields()
            .and_then(|fields| fields.get(SUPPRESS_OUTPUT_KEY))
            .and_then(Value::as_bool)
    }

    /// Shallow-merges `patch` over this entry and returns the merged entry.
    ///
    /// Top-level keys in `patch` replace keys in the entry. A key that would
    /// switch the transport family (`url` on a subprocess entry, `command` on
    /// a network entry) is dropped and reported. When either side is not an
    /// object the entry is returned unchanged.
    #[must_use]
    pub fn merged_with(&self, patch: &Value) -> (Self, Vec<TransportChangeRejected>) {
        let (Some(base), Some(overrides)) = (self.fields(), patch.as_object()) else {
            return (self.clone(), Vec::new());
        };

        let kind = self.transport_kind();
        let mut merged = base.clone();
        let mut rejected = Vec::new();
        for (key, value) in overrides {
            if let Some(from) = kind
                && key == from.foreign_key()
            {
                rejected.push(TransportChangeRejected {
                    key: key.clone(),
                    from,
                });
                continue;
            }
            merged.insert(key.clone(), value.clone());
        }

        (Self(Value::Object(merged)), rejected)
    }
}

impl From<Value> for ServerConfigEntry {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transport_kind_prefers_url() {
        let entry = ServerConfigEntry::new(json!({"url": "https://x", "command": "y"}));
        assert_eq!(entry.transport_kind(), Some(TransportKind::Network));
    }

    #[test]
    fn merge_replaces_top_level_keys_without_deep_merge() {
        let entry = ServerConfigEntry::new(json!({
            "command": "npx",
            "env": {"A": "1", "B": "2"}
        }));

        let (merged, rejected) = entry.merged_with(&json!({"env": {"A": "9"}}));

        assert!(rejected.is_empty());
        assert_eq!(
            merged.as_value(),
            &json!({"command": "npx", "env": {"A": "9"}})
        );
    }

    #[test]
    fn merge_refuses_to_switch_transport() {
        let entry = ServerConfigEntry::new(json!({"command": "npx"}));

        let (merged, rejected) = entry.merged_with(&json!({"url": "https://x", "args": ["a"]}));

        assert_eq!(merged.transport_kind(), Some(TransportKind::Subprocess));
        assert_eq!(merged.as_value(), &json!({"command": "npx", "args": ["a"]}));
        assert_eq!(
            rejected,
            vec![TransportChangeRejected {
                key: "url".to_owned(),
                from: TransportKind::Subprocess,
            }]
        );
    }

    #[test]
    fn merge_leaves_source_untouched() {
        let entry = ServerConfigEntry::new(json!({"url": "https://a"}));
        let (merged, _) = entry.merged_with(&json!({"headers": {"X": "1"}}));

        assert_eq!(entry.as_value(), &json!({"url": "https://a"}));
        assert_ne!(merged, entry);
    }
}
