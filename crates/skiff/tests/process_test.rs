//! Process execution tests: wait policies, restarts, kill.

use skiff::test_utils::mock_client;
use skiff::{Error, ExecSpec, ProcessState, Sandbox, Skiff, WaitPolicy};
use std::time::Duration;

async fn sandbox(client: &Skiff, name: &str) -> Sandbox {
    client
        .sandbox(name)
        .port(3000)
        .create()
        .await
        .expect("Failed to create sandbox")
}

#[tokio::test]
async fn test_detached_exec_returns_immediately() {
    let (api, client) = mock_client();
    api.set_long_running("sleep infinity");
    let sb = sandbox(&client, "sb").await;

    let process = sb
        .exec(ExecSpec::new("sleep infinity").name("sleeper"))
        .await
        .expect("Failed to launch process");

    assert_eq!(process.name(), "sleeper");
    assert_eq!(
        process.status().await.expect("Failed to fetch status"),
        ProcessState::Running
    );
    // No completion wait, so no captured output.
    assert!(process.captured_logs().is_none());
}

#[tokio::test]
async fn test_unnamed_process_gets_generated_name() {
    let (_api, client) = mock_client();
    let sb = sandbox(&client, "sb").await;

    let process = sb
        .exec(ExecSpec::new("true"))
        .await
        .expect("Failed to launch process");
    assert!(!process.name().is_empty());
}

#[tokio::test]
async fn test_exec_conflicts_with_running_process_of_same_name() {
    let (api, client) = mock_client();
    api.set_long_running("sleep infinity");
    let sb = sandbox(&client, "sb").await;

    sb.exec(ExecSpec::new("sleep infinity").name("svc"))
        .await
        .expect("Failed to launch process");

    let err = sb
        .exec(ExecSpec::new("sleep infinity").name("svc"))
        .await
        .expect_err("reusing the name of a running process must fail");
    assert!(matches!(err, Error::Conflict { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_completion_wait_captures_logs() {
    let (api, client) = mock_client();
    api.set_stdout("echo hi", "hi\n");
    let sb = sandbox(&client, "sb").await;

    let process = sb
        .exec(
            ExecSpec::new("echo hi")
                .name("greeter")
                .wait(WaitPolicy::completion(Duration::from_secs(30))),
        )
        .await
        .expect("Failed to run process");

    let record = process.record().await.expect("Failed to fetch record");
    assert_eq!(record.state, ProcessState::Completed);
    assert_eq!(record.exit_code, Some(0));
    let logs = process.captured_logs().expect("completion wait captures logs");
    assert_eq!(logs.stdout, "hi\n");
}

#[tokio::test(start_paused = true)]
async fn test_nonzero_exit_is_not_a_client_error() {
    let (api, client) = mock_client();
    api.set_exit_code("false", 1);
    let sb = sandbox(&client, "sb").await;

    let process = sb
        .exec(
            ExecSpec::new("false")
                .name("failer")
                .wait(WaitPolicy::completion(Duration::from_secs(30))),
        )
        .await
        .expect("non-zero exit must not surface as Err");

    let record = process.record().await.expect("Failed to fetch record");
    assert_eq!(record.state, ProcessState::Failed);
    assert_eq!(record.exit_code, Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_restart_until_success() {
    let (api, client) = mock_client();
    api.queue_exit_codes("flaky-build", [1, 1, 0]);
    let sb = sandbox(&client, "sb").await;

    let process = sb
        .exec(
            ExecSpec::new("flaky-build")
                .name("build")
                .wait(WaitPolicy::completion(Duration::from_secs(60)))
                .restart_on_failure(5),
        )
        .await
        .expect("Failed to run process");

    assert_eq!(
        process.status().await.expect("Failed to fetch status"),
        ProcessState::Completed
    );
    assert_eq!(process.restarts(), 2);
    assert_eq!(api.launch_count("sb", "build"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_restarts_exhaust_and_settle_failed() {
    let (api, client) = mock_client();
    api.set_exit_code("doomed", 1);
    let sb = sandbox(&client, "sb").await;

    let process = sb
        .exec(
            ExecSpec::new("doomed")
                .name("doomed")
                .wait(WaitPolicy::completion(Duration::from_secs(60)))
                .restart_on_failure(2),
        )
        .await
        .expect("exhausted restarts settle, not error");

    let record = process.record().await.expect("Failed to fetch record");
    assert_eq!(record.state, ProcessState::Failed);
    // Cumulative cap: initial launch plus exactly max_restarts relaunches.
    assert_eq!(process.restarts(), 2);
    assert_eq!(api.launch_count("sb", "doomed"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_restart_trusts_relaunch_response_over_lagging_reads() {
    let (api, client) = mock_client();
    // The run fails once, and after the relaunch the server keeps reporting
    // the failed run for two more status reads.
    api.queue_exit_codes("flaky-build", [1, 0]);
    api.set_process_read_lag(2);
    let sb = sandbox(&client, "sb").await;

    let process = sb
        .exec(
            ExecSpec::new("flaky-build")
                .name("build")
                .wait(WaitPolicy::completion(Duration::from_secs(60)))
                .restart_on_failure(5),
        )
        .await
        .expect("Failed to run process");

    // One restart, not a second one charged against the lagging reads.
    assert_eq!(process.restarts(), 1);
    assert_eq!(api.launch_count("sb", "build"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_completion_wait_times_out() {
    let (api, client) = mock_client();
    api.set_long_running("sleep infinity");
    let sb = sandbox(&client, "sb").await;

    let err = sb
        .exec(
            ExecSpec::new("sleep infinity")
                .name("stuck")
                .wait(WaitPolicy::completion(Duration::from_secs(2))),
        )
        .await
        .expect_err("wait must time out");
    assert!(matches!(err, Error::Timeout(_)));

    // The timeout bounded only the client's waiting.
    let process = sb.process("stuck").await.expect("process still exists");
    assert_eq!(
        process.status().await.expect("Failed to fetch status"),
        ProcessState::Running
    );
}

#[tokio::test(start_paused = true)]
async fn test_ports_wait_blocks_until_listening() {
    let (api, client) = mock_client();
    api.set_long_running("npm run dev");
    api.set_listening_after("sb", 3000, 4);
    let sb = sandbox(&client, "sb").await;

    let process = sb
        .exec(
            ExecSpec::new("npm run dev")
                .name("dev-server")
                .wait(WaitPolicy::ports([3000], Duration::from_secs(60))),
        )
        .await
        .expect("Failed to wait for ports");
    assert_eq!(
        process.status().await.expect("Failed to fetch status"),
        ProcessState::Running
    );
}

#[tokio::test(start_paused = true)]
async fn test_ports_wait_times_out_when_never_listening() {
    let (api, client) = mock_client();
    api.set_long_running("npm run dev");
    let sb = sandbox(&client, "sb").await;

    let err = sb
        .exec(
            ExecSpec::new("npm run dev")
                .name("dev-server")
                .wait(WaitPolicy::ports([3000], Duration::from_secs(2))),
        )
        .await
        .expect_err("ports wait must time out");
    assert!(matches!(err, Error::Timeout(_)));
}

#[tokio::test]
async fn test_kill_is_fire_and_forget() {
    let (api, client) = mock_client();
    api.set_long_running("sleep infinity");
    let sb = sandbox(&client, "sb").await;

    let process = sb
        .exec(ExecSpec::new("sleep infinity").name("victim"))
        .await
        .expect("Failed to launch process");

    process.kill().await.expect("Failed to signal kill");
    assert_eq!(
        process.status().await.expect("Failed to fetch status"),
        ProcessState::Killed
    );
}

#[tokio::test]
async fn test_kill_of_absent_process_is_not_found() {
    let (_api, client) = mock_client();
    let sb = sandbox(&client, "sb").await;

    let err = sb
        .kill("nobody")
        .await
        .expect_err("kill of absent process must fail");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_attach_to_existing_process_by_name() {
    let (api, client) = mock_client();
    api.set_long_running("sleep infinity");
    let sb = sandbox(&client, "sb").await;

    sb.exec(ExecSpec::new("sleep infinity").name("svc"))
        .await
        .expect("Failed to launch process");

    let attached = sb.process("svc").await.expect("Failed to attach");
    assert_eq!(attached.name(), "svc");
    assert!(format!("{attached:?}").contains("svc"));
    assert_eq!(
        attached.status().await.expect("Failed to fetch status"),
        ProcessState::Running
    );

    let err = sb
        .process("ghost")
        .await
        .expect_err("attach to absent process must fail");
    assert!(err.is_not_found());
}
