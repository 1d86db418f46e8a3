//! Turns substituted server entries into connection descriptors.

use super::template::{EnvSnapshot, SubstitutionWarning, substitute};
use crate::shell::ShellFlavor;
use crate::tool_registry::domain::{
    ARGS_KEY, COMMAND_KEY, ConnectionDescriptor, DescriptorRejection, ENV_KEY, HEADERS_KEY,
    NetworkDescriptor, ServerConfigEntry, ServerName, SubprocessDescriptor, URL_KEY,
    json_type_name,
};
use camino::Utf8Path;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Environment applied beneath explicit values of output-suppressed servers.
pub const QUIET_ENV: &[(&str, &str)] = &[
    ("LOG_LEVEL", "error"),
    ("NO_COLOR", "1"),
    ("FORCE_COLOR", "0"),
    ("NODE_NO_WARNINGS", "1"),
    ("NPM_CONFIG_LOGLEVEL", "silent"),
    ("NO_BANNER", "1"),
    ("PYTHONWARNINGS", "ignore"),
];

const NOISY_SERVER_NAMES: &[&str] = &["filesystem", "memory", "sequential-thinking", "everything"];
const PACKAGE_RUNNERS: &[&str] = &["npx", "uvx", "bunx", "pnpx"];
const NOISY_PACKAGE_MARKERS: &[&str] = &["filesystem", "memory"];

/// Decides which subprocess servers get their diagnostics discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSuppression {
    flavor: ShellFlavor,
    noisy_names: Vec<String>,
}

impl OutputSuppression {
    /// Creates a policy wrapping commands for `flavor`.
    #[must_use]
    pub fn new(flavor: ShellFlavor) -> Self {
        Self {
            flavor,
            noisy_names: NOISY_SERVER_NAMES.iter().map(|&name| name.to_owned()).collect(),
        }
    }

    /// Adds a server name that is always suppressed.
    #[must_use]
    pub fn with_noisy_server(mut self, name: impl Into<String>) -> Self {
        self.noisy_names.push(name.into());
        self
    }

    /// Returns the shell used for wrapping.
    #[must_use]
    pub const fn flavor(&self) -> ShellFlavor {
        self.flavor
    }

    /// Returns whether the server should be suppressed.
    ///
    /// An explicit flag decides on its own; otherwise the server name and the
    /// launcher pattern are checked.
    #[must_use]
    pub fn is_eligible(
        &self,
        server: &ServerName,
        explicit: Option<bool>,
        command: &str,
        args: &[String],
    ) -> bool {
        if let Some(flag) = explicit {
            return flag;
        }
        self.noisy_names.iter().any(|name| name == server.as_str())
            || is_noisy_launch(command, args)
    }
}

impl Default for OutputSuppression {
    fn default() -> Self {
        Self::new(ShellFlavor::current())
    }
}

fn is_noisy_launch(command: &str, args: &[String]) -> bool {
    let program = Utf8Path::new(command).file_stem().unwrap_or(command);
    PACKAGE_RUNNERS.contains(&program)
        && args.iter().any(|arg| {
            NOISY_PACKAGE_MARKERS
                .iter()
                .any(|marker| arg.contains(marker))
        })
}

/// Non-fatal observation made while building a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorWarning {
    /// Placeholder substitution finding.
    Substitution(SubstitutionWarning),
    /// A non-string map value was converted to its string form.
    CoercedValue {
        /// Map field (`env` or `headers`).
        field: &'static str,
        /// Map key.
        key: String,
        /// JSON type that was found.
        found: &'static str,
    },
}

impl fmt::Display for DescriptorWarning {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Substitution(warning) => warning.fmt(formatter),
            Self::CoercedValue { field, key, found } => write!(
                formatter,
                "'{field}.{key}' was a {found}; converted to a string"
            ),
        }
    }
}

/// Descriptor plus the warnings raised while building it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltDescriptor {
    /// Ready-to-start descriptor.
    pub descriptor: ConnectionDescriptor,
    /// Warnings in discovery order.
    pub warnings: Vec<DescriptorWarning>,
}

/// Builds connection descriptors from raw server entries.
#[derive(Debug, Clone, Default)]
pub struct DescriptorBuilder {
    env: EnvSnapshot,
    suppression: OutputSuppression,
}

impl DescriptorBuilder {
    /// Creates a builder substituting from `env`.
    #[must_use]
    pub fn new(env: EnvSnapshot) -> Self {
        Self {
            env,
            suppression: OutputSuppression::default(),
        }
    }

    /// Replaces the output-suppression policy.
    #[must_use]
    pub fn with_suppression(mut self, suppression: OutputSuppression) -> Self {
        self.suppression = suppression;
        self
    }

    /// Returns the environment snapshot used for substitution.
    #[must_use]
    pub const fn env(&self) -> &EnvSnapshot {
        &self.env
    }

    /// Substitutes placeholders in `entry` and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorRejection`] when a field has the wrong type after
    /// substitution. Only the offending server is affected.
    pub fn build(
        &self,
        server: &ServerName,
        entry: &ServerConfigEntry,
    ) -> Result<BuiltDescriptor, DescriptorRejection> {
        let substituted = substitute(entry.as_value(), &self.env);
        let mut warnings: Vec<DescriptorWarning> = substituted
            .warnings
            .into_iter()
            .map(DescriptorWarning::Substitution)
            .collect();

        let fields = substituted
            .value
            .as_object()
            .ok_or(DescriptorRejection::EntryNotObject {
                found: json_type_name(&substituted.value),
            })?;

        let descriptor = if let Some(url) = fields.get(URL_KEY) {
            let network = build_network(url, fields, &mut warnings)?;
            ConnectionDescriptor::Network(network)
        } else if let Some(command) = fields.get(COMMAND_KEY) {
            let explicit_flag = entry.explicit_suppression();
            let subprocess =
                self.build_subprocess(server, command, fields, explicit_flag, &mut warnings)?;
            ConnectionDescriptor::Subprocess(subprocess)
        } else {
            return Err(DescriptorRejection::MissingTransport);
        };

        Ok(BuiltDescriptor {
            descriptor,
            warnings,
        })
    }

    fn build_subprocess(
        &self,
        server: &ServerName,
        command: &Value,
        fields: &Map<String, Value>,
        explicit_flag: Option<bool>,
        warnings: &mut Vec<DescriptorWarning>,
    ) -> Result<SubprocessDescriptor, DescriptorRejection> {
        let command = match command {
            Value::String(text) if text.trim().is_empty() => {
                return Err(DescriptorRejection::EmptyCommand);
            }
            Value::String(text) => text.clone(),
            other => {
                return Err(DescriptorRejection::CommandNotString {
                    found: json_type_name(other),
                });
            }
        };
        let args = string_list(fields.get(ARGS_KEY))?;
        let explicit_env = string_map(ENV_KEY, fields.get(ENV_KEY), warnings)?;

        if !self
            .suppression
            .is_eligible(server, explicit_flag, &command, &args)
        {
            return Ok(SubprocessDescriptor::new(command)
                .with_args(args)
                .with_env(explicit_env));
        }

        let mut env: BTreeMap<String, String> = QUIET_ENV
            .iter()
            .map(|&(key, value)| (key.to_owned(), value.to_owned()))
            .collect();
        env.extend(explicit_env);
        let (program, wrapped) = self.suppression.flavor().wrap_silencing_stderr(&command, &args);

        Ok(SubprocessDescriptor::new(program)
            .with_args(wrapped)
            .with_env(env)
            .with_output_suppressed(true))
    }
}

fn build_network(
    url: &Value,
    fields: &Map<String, Value>,
    warnings: &mut Vec<DescriptorWarning>,
) -> Result<NetworkDescriptor, DescriptorRejection> {
    let url = match url {
        Value::String(text) if text.trim().is_empty() => return Err(DescriptorRejection::EmptyUrl),
        Value::String(text) => text.clone(),
        other => {
            return Err(DescriptorRejection::UrlNotString {
                found: json_type_name(other),
            });
        }
    };
    let headers = string_map(HEADERS_KEY, fields.get(HEADERS_KEY), warnings)?;
    Ok(NetworkDescriptor::new(url).with_headers(headers))
}

fn string_list(value: Option<&Value>) -> Result<Vec<String>, DescriptorRejection> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(DescriptorRejection::ArgsNotList {
                found: json_type_name(other),
            });
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_str()
                .map(str::to_owned)
                .ok_or(DescriptorRejection::ArgNotString {
                    index,
                    found: json_type_name(item),
                })
        })
        .collect()
}

fn string_map(
    field: &'static str,
    value: Option<&Value>,
    warnings: &mut Vec<DescriptorWarning>,
) -> Result<BTreeMap<String, String>, DescriptorRejection> {
    let entries = match value {
        None | Some(Value::Null) => return Ok(BTreeMap::new()),
        Some(Value::Object(entries)) => entries,
        Some(other) => {
            return Err(DescriptorRejection::MapNotObject {
                field,
                found: json_type_name(other),
            });
        }
    };

    Ok(entries
        .iter()
        .map(|(key, item)| {
            let text = match item {
                Value::String(text) => return (key.clone(), text.clone()),
                Value::Null => String::new(),
                Value::Bool(flag) => flag.to_string(),
                Value::Number(number) => number.to_string(),
                Value::Array(_) | Value::Object(_) => item.to_string(),
            };
            warnings.push(DescriptorWarning::CoercedValue {
                field,
                key: key.clone(),
                found: json_type_name(item),
            });
            (key.clone(), text)
        })
        .collect())
}
