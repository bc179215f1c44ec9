//! Argument-contract tests for the `beachhead` binary.
//!
//! Every case here fails parsing before any AWS or ssh call is attempted,
//! so the tests never touch the network.

use assert_cmd::Command;
use predicates::prelude::*;

fn beachhead() -> Command {
    Command::cargo_bin("beachhead").expect("binary should be built")
}

#[test]
fn bare_invocation_prints_usage_and_fails() {
    beachhead().assert().failure();
}

#[test]
fn help_lists_the_workflow_flags() {
    beachhead()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--createkey")
                .and(predicate::str::contains("--build"))
                .and(predicate::str::contains("--config"))
                .and(predicate::str::contains("--framework"))
                .and(predicate::str::contains("--terminate"))
                .and(predicate::str::contains("--status")),
        );
}

#[test]
fn config_requires_framework_and_ip() {
    beachhead()
        .arg("--config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--framework").and(predicate::str::contains("--ip")));
}

#[test]
fn unknown_framework_is_rejected() {
    beachhead()
        .args(["--config", "--framework", "sliver", "--ip", "10.0.0.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn malformed_ip_is_rejected() {
    beachhead()
        .args(["--config", "--framework", "poshc2", "--ip", "not-an-ip"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn terminate_requires_an_instance_id() {
    beachhead()
        .arg("--terminate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("value"));
}

#[test]
fn help_shows_the_documented_defaults() {
    beachhead()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("us-east-1")
                .and(predicate::str::contains("ami-06fd113e1286dd166"))
                .and(predicate::str::contains("aws_c2"))
                .and(predicate::str::contains("t2.micro")),
        );
}
