//! Integration tests for the transfer simulator CLI.
//!
//! These run the actual binary with fast configurations (no pacing delay)
//! and verify the conservation report on stdout.

use assert_cmd::Command;
use predicates::prelude::*;

/// Run the binary with the given positional arguments.
fn sim_command(args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("transfer-sim").unwrap();
    cmd.args(args);
    cmd
}

#[test]
fn test_run_conserves_total_balance() {
    sim_command(&["4", "3", "15", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("total balance conserved"))
        .stdout(predicate::str::contains("initial total: 40000"))
        .stdout(predicate::str::contains("final total: 40000"));
}

#[test]
fn test_zero_transaction_cap_moves_nothing() {
    sim_command(&["4", "3", "0", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("transactions: 0 / 0"))
        .stdout(predicate::str::contains("total balance conserved"));
}

#[test]
fn test_single_account_finishes_without_transfers() {
    sim_command(&["1", "2", "10", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("transactions: 0 / 10"))
        .stdout(predicate::str::contains("total balance conserved"));
}

#[test]
fn test_many_workers_terminate() {
    // More workers than accounts, no pacing: exercises lock-order discipline
    // under contention. The harness timeout is the deadlock detector.
    sim_command(&["2", "8", "50", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("total balance conserved"));
}

#[test]
fn test_invalid_argument_is_rejected() {
    sim_command(&["abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value for accounts"));
}

#[test]
fn test_zero_workers_is_rejected() {
    sim_command(&["4", "0", "10", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one worker"));
}
