//! `{{env.NAME}}` placeholder substitution over raw configuration values.
//!
//! Only strings that consist of exactly one placeholder are substituted.
//! A placeholder embedded in other text is left untouched and reported, so
//! composite strings are never half-rewritten.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const ENV_NAMESPACE: &str = "env.";

/// Immutable snapshot of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Captures the current process environment.
    ///
    /// Variables whose name or value is not valid Unicode are skipped.
    #[must_use]
    pub fn capture() -> Self {
        std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect()
    }

    /// Adds or replaces a variable.
    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Returns the value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for EnvSnapshot
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Non-fatal substitution finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubstitutionWarning {
    /// The referenced variable is unset; the value became an empty string.
    MissingVariable {
        /// Variable name.
        name: String,
    },
    /// A placeholder appears inside other text; the string was kept as is.
    EmbeddedPlaceholder {
        /// Original string.
        value: String,
    },
}

impl fmt::Display for SubstitutionWarning {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVariable { name } => write!(
                formatter,
                "environment variable '{name}' is not set; using an empty string"
            ),
            Self::EmbeddedPlaceholder { value } => write!(
                formatter,
                "placeholder inside '{value}' left unresolved; only whole-string placeholders are substituted"
            ),
        }
    }
}

/// Substituted value together with the warnings raised while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Substitution {
    /// Value with placeholders resolved.
    pub value: Value,
    /// Findings in traversal order.
    pub warnings: Vec<SubstitutionWarning>,
}

/// Returns the variable name when `value` is exactly one placeholder.
fn whole_placeholder(value: &str) -> Option<&str> {
    let inner = value.strip_prefix(OPEN)?.strip_suffix(CLOSE)?.trim();
    let name = inner.strip_prefix(ENV_NAMESPACE)?;
    let is_identifier = !name.is_empty()
        && name
            .chars()
            .all(|character| character.is_ascii_alphanumeric() || character == '_');
    is_identifier.then_some(name)
}

fn contains_placeholder(value: &str) -> bool {
    value.match_indices(OPEN).any(|(index, _)| {
        value
            .get(index + OPEN.len()..)
            .is_some_and(|rest| rest.trim_start().starts_with(ENV_NAMESPACE) && rest.contains(CLOSE))
    })
}

/// Resolves a single string against `env`.
#[must_use]
pub fn substitute_str(value: &str, env: &EnvSnapshot) -> (String, Option<SubstitutionWarning>) {
    if let Some(name) = whole_placeholder(value) {
        return env.get(name).map_or_else(
            || {
                (
                    String::new(),
                    Some(SubstitutionWarning::MissingVariable {
                        name: name.to_owned(),
                    }),
                )
            },
            |resolved| (resolved.to_owned(), None),
        );
    }

    let warning = contains_placeholder(value).then(|| SubstitutionWarning::EmbeddedPlaceholder {
        value: value.to_owned(),
    });
    (value.to_owned(), warning)
}

fn substitute_into(value: &Value, env: &EnvSnapshot, warnings: &mut Vec<SubstitutionWarning>) -> Value {
    match value {
        Value::String(text) => {
            let (resolved, warning) = substitute_str(text, env);
            warnings.extend(warning);
            Value::String(resolved)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| substitute_into(item, env, warnings))
                .collect(),
        ),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, item)| (key.clone(), substitute_into(item, env, warnings)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
    }
}

/// Recursively resolves placeholders in `value`.
///
/// Object keys are never substituted; non-string leaves pass through.
#[must_use]
pub fn substitute(value: &Value, env: &EnvSnapshot) -> Substitution {
    let mut warnings = Vec::new();
    let resolved = substitute_into(value, env, &mut warnings);
    Substitution {
        value: resolved,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn env() -> EnvSnapshot {
        EnvSnapshot::default().with_var("FOO", "bar")
    }

    #[test]
    fn whole_placeholder_is_replaced() {
        assert_eq!(substitute_str("{{env.FOO}}", &env()), ("bar".to_owned(), None));
    }

    #[test]
    fn inner_whitespace_is_tolerated() {
        assert_eq!(substitute_str("{{ env.FOO }}", &env()).0, "bar");
    }

    #[test]
    fn missing_variable_becomes_empty_with_warning() {
        let (value, warning) = substitute_str("{{env.MISSING}}", &env());

        assert_eq!(value, "");
        assert_eq!(
            warning,
            Some(SubstitutionWarning::MissingVariable {
                name: "MISSING".to_owned()
            })
        );
    }

    #[rstest]
    #[case("prefix-{{env.FOO}}-suffix")]
    #[case("{{env.FOO}}{{env.FOO}}")]
    #[case("Bearer {{env.FOO}}")]
    fn embedded_placeholder_is_returned_unchanged(#[case] input: &str) {
        let (value, warning) = substitute_str(input, &env());

        assert_eq!(value, input);
        assert!(matches!(
            warning,
            Some(SubstitutionWarning::EmbeddedPlaceholder { .. })
        ));
    }

    #[rstest]
    #[case("plain")]
    #[case("{{other.FOO}}")]
    #[case("{ {env.FOO} }")]
    fn strings_without_env_placeholders_are_silent(#[case] input: &str) {
        assert_eq!(substitute_str(input, &env()), (input.to_owned(), None));
    }

    #[test]
    fn nested_values_are_substituted_recursively() {
        let input = json!({
            "command": "{{env.FOO}}",
            "args": ["--token", "{{env.FOO}}", 3],
            "env": {"{{env.FOO}}": "{{env.NOPE}}"},
            "suppressOutput": true
        });

        let result = substitute(&input, &env());

        assert_eq!(
            result.value,
            json!({
                "command": "bar",
                "args": ["--token", "bar", 3],
                "env": {"{{env.FOO}}": ""},
                "suppressOutput": true
            })
        );
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn snapshot_collects_pairs() {
        let snapshot: EnvSnapshot = [("A", "1"), ("B", "2")].into_iter().collect();
        assert_eq!(snapshot.get("B"), Some("2"));
        assert_eq!(snapshot.get("C"), None);
    }
}
