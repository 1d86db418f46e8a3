//! Shared fixtures for in-memory loader integration tests.

use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use serde_json::json;
use toolscope::shell::ShellFlavor;
use toolscope::tool_registry::{
    adapters::{InMemoryToolServerHost, memory::InMemoryConfigSource},
    domain::{ConsumerConfig, ConsumerName, GlobalConfig, ServerName, ToolDefinition},
    services::{DescriptorBuilder, EnvSnapshot, OutputSuppression, ToolLoader},
};

/// Loader type used across in-memory tests.
pub type TestLoader = ToolLoader<InMemoryConfigSource, InMemoryToolServerHost, DefaultClock>;

/// Configuration source, host and loader wired together.
pub struct Fixture {
    /// Configuration records.
    pub source: Arc<InMemoryConfigSource>,
    /// Host runtime double.
    pub host: Arc<InMemoryToolServerHost>,
    /// Loader under test.
    pub loader: TestLoader,
}

/// Parses a server name.
///
/// # Panics
///
/// Panics when `value` is not a valid server name.
#[must_use]
pub fn server(value: &str) -> ServerName {
    ServerName::new(value).expect("valid server name")
}

/// Parses a consumer name.
///
/// # Panics
///
/// Panics when `value` is not a valid consumer name.
#[must_use]
pub fn consumer(value: &str) -> ConsumerName {
    ConsumerName::new(value).expect("valid consumer name")
}

/// Returns tool names in order.
#[must_use]
pub fn tool_names(tools: &[ToolDefinition]) -> Vec<String> {
    tools.iter().map(|tool| tool.name().to_owned()).collect()
}

/// Registers one tool named `<server>_tool` for each server.
///
/// # Panics
///
/// Panics when the host state cannot be updated.
pub fn give_each_server_a_tool(host: &InMemoryToolServerHost, servers: &[&str]) {
    for name in servers {
        let tool = ToolDefinition::new(format!("{name}_tool"), format!("Tool of {name}"), json!({}))
            .expect("valid tool");
        host.set_tool_catalog(server(name), vec![tool])
            .expect("catalog setup should succeed");
    }
}

/// Wires a loader over `source` and `host` with a fixed environment.
#[must_use]
pub fn loader_over(
    source: &Arc<InMemoryConfigSource>,
    host: &Arc<InMemoryToolServerHost>,
    env: EnvSnapshot,
) -> TestLoader {
    ToolLoader::with_env(
        Arc::clone(source),
        Arc::clone(host),
        Arc::new(DefaultClock),
        env.clone(),
    )
    .with_descriptor_builder(
        DescriptorBuilder::new(env).with_suppression(OutputSuppression::new(ShellFlavor::Posix)),
    )
}

/// Global config declaring `filesystem` and `github`; consumer `analyst`
/// owning `datadog`, opting into `filesystem` and excluding `github`.
///
/// # Panics
///
/// Panics when fixture state cannot be written.
#[fixture]
pub fn analyst_fixture() -> Fixture {
    let source = Arc::new(InMemoryConfigSource::new());
    source
        .set_global(
            GlobalConfig::new()
                .with_server(
                    "filesystem",
                    json!({"command": "npx", "args": ["-y", "@modelcontextprotocol/server-filesystem", "/tmp"]}),
                )
                .with_server("github", json!({"command": "github-mcp"})),
        )
        .expect("global setup should succeed");
    source
        .set_consumer(
            consumer("analyst"),
            ConsumerConfig::new()
                .with_server(
                    "datadog",
                    json!({
                        "command": "datadog-mcp",
                        "env": {"DD_API_KEY": "{{env.DD_API_KEY}}", "DD_SITE": "datadoghq.com"}
                    }),
                )
                .with_global_servers(["filesystem".to_owned()])
                .with_excluded_servers(["github".to_owned()]),
        )
        .expect("consumer setup should succeed");

    let host = Arc::new(InMemoryToolServerHost::composable());
    give_each_server_a_tool(&host, &["datadog", "filesystem", "github"]);
    let env = EnvSnapshot::default().with_var("DD_API_KEY", "dd-secret");
    let loader = loader_over(&source, &host, env);

    Fixture {
        source,
        host,
        loader,
    }
}
