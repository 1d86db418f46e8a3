//! Resolution ordering and precedence tests.

use super::helpers::{Fixture, analyst_fixture, consumer};
use rstest::rstest;
use serde_json::json;
use toolscope::tool_registry::{
    domain::{ConfigOrigin, ConsumerConfig, ResolutionWarning, ServerOrigin},
    services::LoadOptions,
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn consumer_servers_then_opted_in_globals(analyst_fixture: Fixture) {
    let set = analyst_fixture
        .loader
        .resolve(&consumer("analyst"), &LoadOptions::new())
        .await
        .expect("resolution should succeed");

    assert_eq!(set.names(), vec!["datadog", "filesystem"]);
    let origins: Vec<ServerOrigin> = set.servers().iter().map(|server| server.origin).collect();
    assert_eq!(origins, vec![ServerOrigin::Consumer, ServerOrigin::Global]);
}

#[rstest]
#[case(LoadOptions::new())]
#[case(LoadOptions::new().with_include_global(false))]
#[case(LoadOptions::new().with_filter(["github"]))]
#[case(LoadOptions::new().with_filter(["github", "datadog", "filesystem"]))]
#[tokio::test(flavor = "multi_thread")]
async fn consumer_exclusion_always_wins(analyst_fixture: Fixture, #[case] options: LoadOptions) {
    analyst_fixture
        .source
        .set_consumer(
            consumer("analyst"),
            ConsumerConfig::new()
                .with_server("github", json!({"command": "github-mcp"}))
                .with_server("datadog", json!({"command": "datadog-mcp"}))
                .with_global_servers(["filesystem".to_owned(), "github".to_owned()])
                .with_excluded_servers(["github".to_owned()]),
        )
        .expect("consumer setup should succeed");

    let set = analyst_fixture
        .loader
        .resolve(&consumer("analyst"), &options)
        .await
        .expect("resolution should succeed");

    assert!(!set.names().contains(&"github"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn caller_exclusion_removes_global_server(analyst_fixture: Fixture) {
    let set = analyst_fixture
        .loader
        .resolve(
            &consumer("analyst"),
            &LoadOptions::new().with_excluded(["filesystem"]),
        )
        .await
        .expect("resolution should succeed");

    assert_eq!(set.names(), vec!["datadog"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn caller_override_wins_for_same_field(analyst_fixture: Fixture) {
    analyst_fixture
        .source
        .set_consumer(
            consumer("analyst"),
            ConsumerConfig::new()
                .with_server("datadog", json!({"command": "datadog-mcp", "args": ["--v1"]}))
                .with_override("datadog", json!({"args": ["--file"], "env": {"A": "1"}})),
        )
        .expect("consumer setup should succeed");
    let options = LoadOptions::new().with_override("datadog", json!({"args": ["--caller"]}));

    let set = analyst_fixture
        .loader
        .resolve(&consumer("analyst"), &options)
        .await
        .expect("resolution should succeed");
    let entry = set.servers().first().expect("datadog resolved").entry.as_value();

    assert_eq!(entry["args"], json!(["--caller"]));
    assert_eq!(entry["env"], json!({"A": "1"}));
    assert_eq!(entry["command"], json!("datadog-mcp"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn fallback_resolution_is_idempotent(analyst_fixture: Fixture) {
    let enhanced = consumer("enhanced_analyst");

    let first = analyst_fixture
        .loader
        .resolve(&enhanced, &LoadOptions::new())
        .await
        .expect("resolution should succeed");
    let second = analyst_fixture
        .loader
        .resolve(&enhanced, &LoadOptions::new())
        .await
        .expect("resolution should succeed");

    assert_eq!(
        first.origin(),
        &ConfigOrigin::Fallback {
            from: consumer("analyst")
        }
    );
    assert_eq!(first.names(), vec!["datadog", "filesystem"]);
    assert_eq!(first, second);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn primary_file_beats_fallback(analyst_fixture: Fixture) {
    analyst_fixture
        .source
        .set_consumer(
            consumer("enhanced_analyst"),
            ConsumerConfig::new().with_server("sentry", json!({"url": "https://sentry.test/mcp"})),
        )
        .expect("consumer setup should succeed");

    let set = analyst_fixture
        .loader
        .resolve(&consumer("enhanced_analyst"), &LoadOptions::new())
        .await
        .expect("resolution should succeed");

    assert_eq!(set.origin(), &ConfigOrigin::Primary);
    assert_eq!(set.names(), vec!["sentry"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn filter_names_not_opted_in_are_reported(analyst_fixture: Fixture) {
    let set = analyst_fixture
        .loader
        .resolve(
            &consumer("analyst"),
            &LoadOptions::new().with_filter(["datadog", "github", "ghost"]),
        )
        .await
        .expect("resolution should succeed");

    assert_eq!(set.names(), vec!["datadog"]);
    assert_eq!(
        set.warnings(),
        [
            ResolutionWarning::NotOptedIn {
                name: "github".to_owned()
            },
            ResolutionWarning::UnknownServer {
                name: "ghost".to_owned()
            },
        ]
    );
}
