//! Loader settings with environment overrides.

use super::{
    lifecycle::DEFAULT_STARTUP_TIMEOUT, resolver::DEFAULT_FALLBACK_PREFIXES, template::EnvSnapshot,
};
use crate::tool_registry::adapters::ConfigLayout;
use camino::Utf8PathBuf;
use std::time::Duration;

/// Variable overriding the configuration root directory.
pub const CONFIG_ROOT_VAR: &str = "TOOLSCOPE_CONFIG_ROOT";
/// Variable overriding the per-server startup timeout, in whole seconds.
pub const STARTUP_TIMEOUT_VAR: &str = "TOOLSCOPE_STARTUP_TIMEOUT_SECS";
/// Variable overriding the fallback prefixes, comma-separated.
pub const FALLBACK_PREFIXES_VAR: &str = "TOOLSCOPE_FALLBACK_PREFIXES";

/// Settings for a filesystem-backed tool loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderSettings {
    /// Configuration file layout.
    pub layout: ConfigLayout,
    /// Prefixes stripped to find a consumer's fallback file.
    pub fallback_prefixes: Vec<String>,
    /// Time a single server may take to start.
    pub startup_timeout: Duration,
}

impl LoaderSettings {
    /// Creates default settings rooted at the working directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            layout: ConfigLayout::default(),
            fallback_prefixes: DEFAULT_FALLBACK_PREFIXES
                .iter()
                .map(|&prefix| prefix.to_owned())
                .collect(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
        }
    }

    /// Applies overrides from `env` over the defaults.
    ///
    /// A malformed timeout keeps the default and logs a warning.
    #[must_use]
    pub fn from_env(env: &EnvSnapshot) -> Self {
        let mut settings = Self::new();

        if let Some(root) = non_blank(env.get(CONFIG_ROOT_VAR)) {
            settings.layout = settings.layout.with_root(Utf8PathBuf::from(root));
        }

        if let Some(raw) = non_blank(env.get(STARTUP_TIMEOUT_VAR)) {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => settings.startup_timeout = Duration::from_secs(secs),
                Ok(_) | Err(_) => tracing::warn!(
                    variable = STARTUP_TIMEOUT_VAR,
                    value = raw,
                    "ignoring invalid startup timeout"
                ),
            }
        }

        if let Some(raw) = env.get(FALLBACK_PREFIXES_VAR) {
            settings.fallback_prefixes = raw
                .split(',')
                .map(str::trim)
                .filter(|prefix| !prefix.is_empty())
                .map(str::to_owned)
                .collect();
        }

        settings
    }

    /// Replaces the file layout.
    #[must_use]
    pub fn with_layout(mut self, layout: ConfigLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Replaces the fallback prefixes.
    #[must_use]
    pub fn with_fallback_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.fallback_prefixes = prefixes;
        self
    }

    /// Replaces the startup timeout.
    #[must_use]
    pub const fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self::new()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults_match_documented_layout() {
        let settings = LoaderSettings::default();

        assert_eq!(settings.layout.root().as_str(), ".");
        assert_eq!(settings.layout.global_file().as_str(), "mcp_config.json");
        assert_eq!(settings.fallback_prefixes, vec!["enhanced_".to_owned()]);
        assert_eq!(settings.startup_timeout, Duration::from_secs(30));
    }

    #[test]
    fn environment_overrides_defaults() {
        let env = EnvSnapshot::default()
            .with_var(CONFIG_ROOT_VAR, "/etc/toolscope")
            .with_var(STARTUP_TIMEOUT_VAR, "5")
            .with_var(FALLBACK_PREFIXES_VAR, "enhanced_, pro_ ,");

        let settings = LoaderSettings::from_env(&env);

        assert_eq!(settings.layout.root().as_str(), "/etc/toolscope");
        assert_eq!(settings.startup_timeout, Duration::from_secs(5));
        assert_eq!(
            settings.fallback_prefixes,
            vec!["enhanced_".to_owned(), "pro_".to_owned()]
        );
    }

    #[rstest]
    #[case("soon")]
    #[case("0")]
    #[case("-3")]
    fn malformed_timeout_keeps_default(#[case] raw: &str) {
        let env = EnvSnapshot::default().with_var(STARTUP_TIMEOUT_VAR, raw);
        assert_eq!(
            LoaderSettings::from_env(&env).startup_timeout,
            DEFAULT_STARTUP_TIMEOUT
        );
    }
}
