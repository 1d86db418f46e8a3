//! Filesystem configuration source integration tests.

use std::sync::Arc;

use camino::Utf8PathBuf;
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;
use toolscope::tool_registry::{
    adapters::{ConfigLayout, FsConfigSource, InMemoryToolServerHost},
    domain::{ConfigOrigin, ConsumerConfig, ConsumerName},
    ports::{ConfigSource, ConfigSourceError},
    services::{EnvSnapshot, LoadOptions, LoaderContext, LoaderError, LoaderSettings, ToolLoader},
};

struct ConfigDir {
    _temp: TempDir,
    root: Utf8PathBuf,
}

impl ConfigDir {
    fn write(&self, relative: &str, contents: &str) {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent directories");
        }
        std::fs::write(path, contents).expect("write config file");
    }

    fn source(&self) -> FsConfigSource {
        FsConfigSource::new(ConfigLayout::new(self.root.clone()))
    }
}

#[fixture]
fn config_dir() -> ConfigDir {
    let temp = tempfile::tempdir().expect("create temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 temp path");
    ConfigDir { _temp: temp, root }
}

fn consumer(name: &str) -> ConsumerName {
    ConsumerName::new(name).expect("valid consumer name")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn missing_files_yield_empty_records(config_dir: ConfigDir) {
    let source = config_dir.source();

    let global = source.load_global().await.expect("global load");
    let lookup = source
        .load_consumer(&consumer("analyst"), None)
        .await
        .expect("consumer load");

    assert_eq!(global.server_names().count(), 0);
    assert_eq!(lookup.origin, ConfigOrigin::Absent);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn missing_root_directory_is_treated_as_empty() {
    let source = FsConfigSource::new(ConfigLayout::new("/nonexistent/toolscope-config-root"));

    let global = source.load_global().await.expect("global load");

    assert_eq!(global.server_names().count(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn global_file_preserves_declaration_order(config_dir: ConfigDir) {
    config_dir.write(
        "mcp_config.json",
        r#"{"mcpServers": {"zeta": {"command": "z"}, "alpha": {"command": "a"}, "mid": {"url": "https://m.test"}}}"#,
    );

    let global = config_dir.source().load_global().await.expect("global load");

    assert_eq!(global.server_names().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn malformed_global_file_is_a_parse_error(config_dir: ConfigDir) {
    config_dir.write("mcp_config.json", "{ not json");

    let result = config_dir.source().load_global().await;

    assert!(matches!(result, Err(ConfigSourceError::Parse { .. })));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn fallback_file_is_read_when_primary_is_missing(config_dir: ConfigDir) {
    config_dir.write(
        "consumers/analyst.json",
        r#"{"mcpServers": {"datadog": {"command": "dd"}}, "excludedServers": ["github"]}"#,
    );

    let lookup = config_dir
        .source()
        .load_consumer(&consumer("enhanced_analyst"), Some(&consumer("analyst")))
        .await
        .expect("consumer load");

    assert_eq!(
        lookup.origin,
        ConfigOrigin::Fallback {
            from: consumer("analyst")
        }
    );
    assert_eq!(lookup.config.excluded_servers(), ["github".to_owned()]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn saved_consumer_round_trips(config_dir: ConfigDir) {
    let source = config_dir.source();
    let config = ConsumerConfig::new()
        .with_server("datadog", json!({"command": "dd", "args": ["--stdio"]}))
        .with_global_servers(["filesystem".to_owned()])
        .with_override("datadog", json!({"env": {"DD_SITE": "eu"}}));

    source
        .save_consumer(&consumer("writer"), &config)
        .await
        .expect("save should succeed");
    let lookup = source
        .load_consumer(&consumer("writer"), None)
        .await
        .expect("consumer load");

    assert_eq!(lookup.origin, ConfigOrigin::Primary);
    assert_eq!(lookup.config, config);
    assert!(config_dir.root.join("consumers/writer.json").is_file());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn loader_from_settings_surfaces_config_errors(config_dir: ConfigDir) {
    config_dir.write("mcp_config.json", "42");
    let env = EnvSnapshot::default().with_var("TOOLSCOPE_CONFIG_ROOT", config_dir.root.as_str());
    let loader = ToolLoader::from_settings(
        LoaderSettings::from_env(&env),
        Arc::new(InMemoryToolServerHost::composable()),
        Arc::new(DefaultClock),
        env,
    );
    let mut context = LoaderContext::new();

    let result = loader
        .load_tools(&mut context, &consumer("analyst"), &LoadOptions::new())
        .await;

    assert!(matches!(
        result,
        Err(LoaderError::Config(ConfigSourceError::Parse { .. }))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn loader_from_settings_reads_files(config_dir: ConfigDir) {
    config_dir.write(
        "mcp_config.json",
        r#"{"mcpServers": {"filesystem": {"command": "npx", "args": ["-y", "server-filesystem"]}}}"#,
    );
    config_dir.write(
        "consumers/analyst.json",
        r#"{"mcpServers": {"datadog": {"command": "dd"}}, "globalServers": ["filesystem"]}"#,
    );
    let settings = LoaderSettings::new().with_layout(ConfigLayout::new(config_dir.root.clone()));
    let loader = ToolLoader::from_settings(
        settings,
        Arc::new(InMemoryToolServerHost::composable()),
        Arc::new(DefaultClock),
        EnvSnapshot::default(),
    );

    let set = loader
        .resolve(&consumer("enhanced_analyst"), &LoadOptions::new())
        .await
        .expect("resolution should succeed");

    assert_eq!(set.names(), vec!["datadog", "filesystem"]);
}
