//! Startup, caching, failure isolation and shutdown tests.

use std::sync::Arc;
use std::time::Duration;

use super::helpers::{
    Fixture, analyst_fixture, consumer, give_each_server_a_tool, loader_over, server, tool_names,
};
use rstest::rstest;
use serde_json::json;
use toolscope::tool_registry::{
    adapters::{InMemoryToolServerHost, memory::InMemoryConfigSource},
    domain::{ConsumerConfig, LoadFailure, ServerLoadState, StartupPath},
    services::{EnvSnapshot, LoadOptions, LoaderContext},
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn end_to_end_loads_datadog_then_filesystem(analyst_fixture: Fixture) {
    let mut context = LoaderContext::new();

    let tools = analyst_fixture
        .loader
        .load_tools(&mut context, &consumer("analyst"), &LoadOptions::new())
        .await
        .expect("load should succeed");

    assert_eq!(tool_names(&tools), vec!["datadog_tool", "filesystem_tool"]);
    assert_eq!(
        analyst_fixture
            .host
            .start_count(&server("github"))
            .expect("count"),
        0
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn malformed_middle_server_is_isolated() {
    let source = Arc::new(InMemoryConfigSource::new());
    source
        .set_consumer(
            consumer("ops"),
            ConsumerConfig::new()
                .with_server("first", json!({"command": "first-mcp"}))
                .with_server("second", json!({"command": ["not", "a", "string"]}))
                .with_server("third", json!({"url": "https://third.test/mcp"})),
        )
        .expect("consumer setup should succeed");
    let host = Arc::new(InMemoryToolServerHost::composable());
    give_each_server_a_tool(&host, &["first", "second", "third"]);
    let loader = loader_over(&source, &host, EnvSnapshot::default());
    let mut context = LoaderContext::new();

    let report = loader
        .load_report(&mut context, &consumer("ops"), &LoadOptions::new())
        .await
        .expect("load should succeed");

    assert_eq!(tool_names(&report.tools), vec!["first_tool", "third_tool"]);
    let second = report.outcome("second").expect("second outcome");
    assert_eq!(second.state, ServerLoadState::Skipped);
    assert!(matches!(second.failure, Some(LoadFailure::Rejected(_))));
    assert_eq!(host.start_count(&server("second")).expect("count"), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn startup_failure_and_timeout_do_not_stop_siblings(analyst_fixture: Fixture) {
    let Fixture {
        source, host, ..
    } = analyst_fixture;
    host.fail_start(server("datadog"), "exit status 127")
        .expect("failure setup should succeed");
    host.delay_start(server("filesystem"), Duration::from_secs(5))
        .expect("delay setup should succeed");
    source
        .set_consumer(
            consumer("analyst"),
            ConsumerConfig::new()
                .with_server("datadog", json!({"command": "datadog-mcp"}))
                .with_server("github", json!({"command": "github-mcp"}))
                .with_global_servers(["filesystem".to_owned()]),
        )
        .expect("consumer setup should succeed");
    let loader = loader_over(&source, &host, EnvSnapshot::default())
        .with_startup_timeout(Duration::from_millis(50));
    let mut context = LoaderContext::new();

    let report = loader
        .load_report(&mut context, &consumer("analyst"), &LoadOptions::new())
        .await
        .expect("load should succeed");

    assert_eq!(tool_names(&report.tools), vec!["github_tool"]);
    assert!(matches!(
        report.outcome("datadog").and_then(|outcome| outcome.failure.clone()),
        Some(LoadFailure::Startup(_))
    ));
    assert!(matches!(
        report.outcome("filesystem").and_then(|outcome| outcome.failure.clone()),
        Some(LoadFailure::TimedOut(_))
    ));
    assert_eq!(report.skipped().count(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn second_load_starts_nothing_new(analyst_fixture: Fixture) {
    let mut context = LoaderContext::new();
    let analyst = consumer("analyst");

    let first = analyst_fixture
        .loader
        .load_tools(&mut context, &analyst, &LoadOptions::new())
        .await
        .expect("first load");
    let handle = context
        .cached(&analyst, &server("datadog"))
        .expect("datadog cached")
        .clone();
    let second = analyst_fixture
        .loader
        .load_tools(&mut context, &analyst, &LoadOptions::new())
        .await
        .expect("second load");

    assert_eq!(first, second);
    assert_eq!(
        analyst_fixture
            .host
            .start_count(&server("datadog"))
            .expect("count"),
        1
    );
    let cached = context
        .cached(&analyst, &server("datadog"))
        .expect("datadog still cached");
    assert!(Arc::ptr_eq(handle.tools(), cached.tools()));
    assert_eq!(cached.path(), StartupPath::Composable);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn separate_sessions_start_their_own_servers(analyst_fixture: Fixture) {
    let mut first = LoaderContext::new();
    let mut second = LoaderContext::new();

    for context in [&mut first, &mut second] {
        analyst_fixture
            .loader
            .load_tools(context, &consumer("analyst"), &LoadOptions::new())
            .await
            .expect("load should succeed");
    }

    assert_eq!(
        analyst_fixture
            .host
            .start_count(&server("datadog"))
            .expect("count"),
        2
    );
    assert_ne!(first.session(), second.session());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn shutdown_releases_newest_first_and_tolerates_failures(analyst_fixture: Fixture) {
    analyst_fixture
        .host
        .fail_release(server("filesystem"), "already gone")
        .expect("release failure setup should succeed");
    let mut context = LoaderContext::new();
    analyst_fixture
        .loader
        .load_tools(&mut context, &consumer("analyst"), &LoadOptions::new())
        .await
        .expect("load should succeed");

    let report = context.shutdown().await;
    let again = context.shutdown().await;

    assert_eq!(report.released, vec!["datadog".to_owned()]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(
        analyst_fixture.host.released_servers().expect("released"),
        vec![server("filesystem"), server("datadog")]
    );
    assert!(again.released.is_empty() && again.is_clean());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dropped_context_still_releases_servers(analyst_fixture: Fixture) {
    {
        let mut context = LoaderContext::new();
        analyst_fixture
            .loader
            .load_tools(&mut context, &consumer("analyst"), &LoadOptions::new())
            .await
            .expect("load should succeed");
    }

    for _ in 0..100 {
        if analyst_fixture
            .host
            .running_servers()
            .expect("running")
            .is_empty()
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(
        analyst_fixture
            .host
            .running_servers()
            .expect("running")
            .is_empty()
    );
}
