//! Unit tests for the build wait loop and termination.

use std::time::{Duration, Instant};

use crate::provider::{InstanceSnapshot, InstanceState, LaunchSpec};
use crate::test_support::{ProviderCall, ScriptedProvider};

use super::{InstanceLifecycle, LifecycleError, PollPolicy};

const TEST_INTERVAL: Duration = Duration::from_millis(5);

fn snapshot(id: &str, state: InstanceState, public_ip: Option<&str>) -> InstanceSnapshot {
    InstanceSnapshot {
        id: id.to_owned(),
        state,
        public_ip: public_ip.map(str::to_owned),
        private_ip: Some(String::from("10.0.0.5")),
    }
}

fn spec() -> LaunchSpec {
    LaunchSpec::builder()
        .ami("ami-06fd113e1286dd166")
        .key_name("aws_c2")
        .group_name("aws_c2")
        .build()
        .expect("spec should validate")
}

fn lifecycle(provider: ScriptedProvider, deadline: Option<Duration>) -> InstanceLifecycle<ScriptedProvider> {
    InstanceLifecycle::new(provider)
        .with_poll_policy(PollPolicy {
            interval: TEST_INTERVAL,
            deadline,
        })
        .with_teardown_delay(Duration::from_millis(1))
}

fn group_queries(provider: &ScriptedProvider) -> usize {
    provider
        .calls()
        .iter()
        .filter(|call| matches!(call, ProviderCall::InstancesInGroup(_)))
        .count()
}

#[tokio::test]
async fn polls_until_running_and_reports_public_ip() {
    let provider = ScriptedProvider::new();
    provider.push_launch(Ok(snapshot("i-1", InstanceState::Pending, None)));
    provider.push_group_query(Ok(vec![snapshot("i-1", InstanceState::Pending, None)]));
    provider.push_group_query(Ok(vec![snapshot(
        "i-1",
        InstanceState::Running,
        Some("3.82.174.138"),
    )]));

    let started = Instant::now();
    let built = lifecycle(provider.clone(), None)
        .build(&spec())
        .await
        .expect("build should succeed");

    assert_eq!(built.id, "i-1");
    assert_eq!(built.public_ip, "3.82.174.138");
    assert_eq!(group_queries(&provider), 2);
    assert!(
        started.elapsed() >= TEST_INTERVAL * 2,
        "each poll must wait the configured interval"
    );
}

#[tokio::test]
async fn immediately_running_instance_skips_polling() {
    let provider = ScriptedProvider::new();
    provider.push_launch(Ok(snapshot(
        "i-1",
        InstanceState::Running,
        Some("3.82.174.138"),
    )));

    let built = lifecycle(provider.clone(), None)
        .build(&spec())
        .await
        .expect("build should succeed");

    assert_eq!(built.public_ip, "3.82.174.138");
    assert_eq!(group_queries(&provider), 0);
    let launches = provider
        .calls()
        .iter()
        .filter(|call| matches!(call, ProviderCall::LaunchInstance { .. }))
        .count();
    assert_eq!(launches, 1);
}

#[tokio::test]
async fn keeps_waiting_when_instance_missing_from_query() {
    let provider = ScriptedProvider::new();
    provider.push_launch(Ok(snapshot("i-1", InstanceState::Pending, None)));
    provider.push_group_query(Ok(Vec::new()));
    provider.push_group_query(Ok(vec![snapshot(
        "i-1",
        InstanceState::Running,
        Some("3.82.174.138"),
    )]));

    let built = lifecycle(provider, None)
        .build(&spec())
        .await
        .expect("build should ride out an empty query");
    assert_eq!(built.id, "i-1");
}

#[tokio::test]
async fn deadline_bounds_the_wait() {
    let provider = ScriptedProvider::new();
    provider.push_launch(Ok(snapshot("i-1", InstanceState::Pending, None)));
    provider.set_steady_group_query(vec![snapshot("i-1", InstanceState::Pending, None)]);

    let err = lifecycle(provider, Some(Duration::from_millis(20)))
        .build(&spec())
        .await
        .expect_err("a never-running instance must time out");

    assert_eq!(
        err,
        LifecycleError::Timeout {
            instance_id: String::from("i-1"),
        }
    );
}

#[tokio::test]
async fn running_without_public_ip_is_an_error() {
    let provider = ScriptedProvider::new();
    provider.push_launch(Ok(snapshot("i-1", InstanceState::Running, None)));

    let err = lifecycle(provider, None)
        .build(&spec())
        .await
        .expect_err("missing address must surface");
    assert_eq!(
        err,
        LifecycleError::MissingPublicIp {
            instance_id: String::from("i-1"),
        }
    );
}

#[tokio::test]
async fn query_failure_during_wait_propagates() {
    let provider = ScriptedProvider::new();
    provider.push_launch(Ok(snapshot("i-1", InstanceState::Pending, None)));
    provider.push_group_query(Err(crate::provider::ProviderError::Api {
        code: Some(String::from("RequestLimitExceeded")),
        message: String::from("throttled"),
    }));

    let err = lifecycle(provider, None)
        .build(&spec())
        .await
        .expect_err("query failure must surface");
    assert!(matches!(err, LifecycleError::Provider(_)));
}

#[tokio::test]
async fn terminate_issues_one_request() {
    let provider = ScriptedProvider::new();

    lifecycle(provider.clone(), None)
        .terminate("i-0ae81973075a67c70")
        .await
        .expect("terminate should succeed");

    assert_eq!(
        provider.calls(),
        vec![ProviderCall::TerminateInstance(String::from(
            "i-0ae81973075a67c70"
        ))]
    );
}
