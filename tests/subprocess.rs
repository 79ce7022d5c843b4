//! End-to-end coverage of the exception-safe subprocess execution harness
//! (spec §4.8, §8: P5, P6, scenario 6), driven through the dedicated
//! `autotrail-subprocess-worker` binary.

use std::time::Duration;

use autotrail::value::named;
use autotrail::{ApiError, SubprocessTask};
use serde_json::{json, Value};

fn worker_path() -> &'static str {
    env!("CARGO_BIN_EXE_autotrail-subprocess-worker")
}

/// `get_result` is non-blocking (spec §4.8, §5): a single call can land
/// before the background reader task has drained the child's response.
/// Poll it the way a real caller would rather than assume the first call
/// already has an answer.
async fn wait_for_result(task: &SubprocessTask) -> (Option<Value>, Option<ApiError>) {
    for _ in 0..200 {
        let result = task.get_result().await;
        if result.0.is_some() || result.1.is_some() {
            return result;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("subprocess task did not produce a result in time");
}

// P6 (and the happy path of scenario 6): a job that runs to completion
// produces exactly one of `(value, error)`, never both, never neither.
#[tokio::test]
async fn p6_a_completed_job_yields_exactly_one_side_of_the_result() {
    let task = SubprocessTask::start_with_worker(
        worker_path(),
        "demo::double",
        vec![json!(21)],
        named([]),
    )
    .await
    .unwrap();

    let (value, error) = wait_for_result(&task).await;
    assert_eq!(value, Some(json!(42)));
    assert!(error.is_none());
    task.join().await.unwrap();
}

// P5: `get_result` is idempotent: the same tuple comes back on every call
// after the first non-empty read, without re-touching the channel.
#[tokio::test]
async fn p5_get_result_is_idempotent() {
    let task = SubprocessTask::start_with_worker(
        worker_path(),
        "demo::double",
        vec![json!(10)],
        named([]),
    )
    .await
    .unwrap();

    let first = wait_for_result(&task).await;
    let second = task.get_result().await;
    let third = task.get_result().await;
    assert_eq!(first, second);
    assert_eq!(second, third);
    assert_eq!(first.0, Some(json!(20)));
}

// Scenario 6: a job that crashes its child process leaves `get_result`
// returning `None` forever, and a later, unrelated task started in the
// same parent process is unaffected by the prior crash.
#[tokio::test]
async fn scenario_6_a_crashed_child_does_not_poison_later_tasks() {
    let crashing = SubprocessTask::start_with_worker(
        worker_path(),
        "demo::crash",
        vec![],
        named([]),
    )
    .await
    .unwrap();

    crashing.join().await.unwrap();
    assert!(!crashing.is_alive());

    let (value, error) = crashing.get_result().await;
    assert!(value.is_none());
    assert!(error.is_none());

    // Calling again must not block or panic; it replays the same empty
    // outcome.
    let (value_again, error_again) = crashing.get_result().await;
    assert!(value_again.is_none());
    assert!(error_again.is_none());

    let healthy = SubprocessTask::start_with_worker(
        worker_path(),
        "demo::double",
        vec![json!(21)],
        named([]),
    )
    .await
    .unwrap();
    let (value, error) = wait_for_result(&healthy).await;
    assert_eq!(value, Some(json!(42)));
    assert!(error.is_none());
}

// A job that returns an application-level error (rather than crashing)
// surfaces as the error half of the pair, matching the handler-exception
// path that Tier 1 (`call_safe`) is responsible for.
#[tokio::test]
async fn a_job_erroring_without_crashing_yields_the_error_half() {
    let task = SubprocessTask::start_with_worker(
        worker_path(),
        "demo::double",
        vec![], // missing the required argument
        named([]),
    )
    .await
    .unwrap();

    let (value, error) = wait_for_result(&task).await;
    assert!(value.is_none());
    assert_eq!(error.unwrap().kind, "ValueError");
}

// `terminate` kills the child without draining or caching a result; a
// subsequent `get_result` on a terminated child resolves to the "no result"
// outcome rather than hanging.
#[tokio::test]
async fn terminate_leaves_no_result_without_hanging() {
    let task = SubprocessTask::start_with_worker(
        worker_path(),
        "demo::double",
        vec![json!(1)],
        named([]),
    )
    .await
    .unwrap();

    task.terminate().unwrap();
    task.join().await.unwrap();
    assert!(!task.is_alive());

    let result = tokio::time::timeout(Duration::from_secs(1), task.get_result())
        .await
        .expect("get_result must not hang after terminate");
    // The worker may have already written its one frame before the kill
    // signal landed; either outcome is acceptable, but it must not hang.
    let _ = result;
}
