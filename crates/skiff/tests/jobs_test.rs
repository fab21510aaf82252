//! Job execution controller tests.

use skiff::test_utils::mock_client;
use skiff::{Error, ExecutionStatus, TaskParams};
use std::time::Duration;
use tokio_test::assert_ok;

fn task(pairs: &[(&str, &str)]) -> TaskParams {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::from(*v)))
        .collect()
}

#[tokio::test]
async fn test_create_and_get_execution() {
    let (_api, client) = mock_client();
    let job = client.job("nightly-build");

    let id = job
        .create_execution(vec![task(&[("target", "x86_64")]), task(&[("target", "aarch64")])])
        .await
        .expect("Failed to create execution");
    assert!(!id.is_empty());

    let record = assert_ok!(job.get_execution(&id).await);
    assert_eq!(record.id, id);
    assert_eq!(record.job, "nightly-build");
    assert_eq!(record.tasks.len(), 2);
}

#[tokio::test]
async fn test_execution_status_reports_current_state() {
    let (_api, client) = mock_client();
    let job = client.job("nightly-build");

    let id = job
        .create_execution(vec![task(&[("target", "x86_64")])])
        .await
        .expect("Failed to create execution");
    let status = assert_ok!(job.execution_status(&id).await);
    assert_eq!(status, ExecutionStatus::Completed);
}

#[tokio::test]
async fn test_get_absent_execution_is_not_found() {
    let (_api, client) = mock_client();
    let job = client.job("nightly-build");

    let err = job
        .get_execution("exec-999")
        .await
        .expect_err("get of absent execution must fail");
    assert!(err.is_not_found());
}

#[tokio::test(start_paused = true)]
async fn test_wait_polls_until_terminal() {
    let (api, client) = mock_client();
    api.set_executions_complete_after(4);
    let job = client.job("nightly-build");

    let id = job
        .create_execution(vec![task(&[("target", "x86_64")])])
        .await
        .expect("Failed to create execution");

    let record = job
        .wait_for_execution(&id, Duration::from_secs(30), Duration::from_millis(250))
        .await
        .expect("Failed to wait for execution");
    assert_eq!(record.status, ExecutionStatus::Completed);
    assert!(api.execution_polls(&id) >= 4);
}

#[tokio::test(start_paused = true)]
async fn test_wait_times_out_on_stuck_execution() {
    let (api, client) = mock_client();
    api.set_executions_complete_after(u32::MAX);
    let job = client.job("nightly-build");

    let id = job
        .create_execution(vec![task(&[("target", "x86_64")])])
        .await
        .expect("Failed to create execution");

    let err = job
        .wait_for_execution(&id, Duration::from_secs(2), Duration::from_millis(250))
        .await
        .expect_err("wait must time out");
    assert!(matches!(err, Error::Timeout(_)));

    // Roughly max_wait / poll_interval status fetches before giving up.
    let polls = api.execution_polls(&id);
    assert!((6..=10).contains(&polls), "unexpected poll count {polls}");
}

#[tokio::test]
async fn test_list_is_scoped_to_the_job() {
    let (_api, client) = mock_client();
    let nightly = client.job("nightly-build");
    let deploy = client.job("deploy");

    nightly
        .create_execution(vec![task(&[])])
        .await
        .expect("Failed to create execution");
    nightly
        .create_execution(vec![task(&[])])
        .await
        .expect("Failed to create execution");
    deploy
        .create_execution(vec![task(&[])])
        .await
        .expect("Failed to create execution");

    assert_eq!(nightly.list_executions().await.expect("list").len(), 2);
    assert_eq!(deploy.list_executions().await.expect("list").len(), 1);
}

#[tokio::test]
async fn test_delete_execution_is_idempotent() {
    let (_api, client) = mock_client();
    let job = client.job("nightly-build");

    let id = job
        .create_execution(vec![task(&[])])
        .await
        .expect("Failed to create execution");

    job.delete_execution(&id).await.expect("Failed to delete");
    job.delete_execution(&id)
        .await
        .expect("delete of absent execution must succeed");
    assert!(job.list_executions().await.expect("list").is_empty());
}
