//! Process execution proxy.
//!
//! [`Sandbox::exec`](crate::Sandbox::exec) launches a command remotely and,
//! depending on the [`WaitPolicy`], returns immediately, waits for a set of
//! ports to start listening, or waits for the process to finish. The restart
//! policy is driven from the completion wait: a process that exits non-zero
//! is relaunched under the same name until the cumulative attempt cap is
//! reached, after which it settles in terminal `failed`.
//!
//! Timeouts bound only the client's waiting. A [`Error::Timeout`] means the
//! client gave up; the remote process may well still be running.

use skiff_core::{
    Error, ExecRequest, PlatformApi, ProcessLogs, ProcessRecord, ProcessState, ResourceKind,
    Result,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout};
use uuid::Uuid;

const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(250);
const PORT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How `exec` waits before handing back a [`Process`].
#[derive(Debug, Clone, PartialEq)]
pub enum WaitPolicy {
    /// Return as soon as the server accepts the launch.
    Detached,
    /// Wait until the process reaches a terminal state, bounded by `timeout`.
    Completion { timeout: Duration },
    /// Wait until every listed port is accepting connections, bounded by
    /// `timeout`.
    Ports { ports: Vec<u16>, timeout: Duration },
}

impl WaitPolicy {
    pub fn completion(timeout: Duration) -> Self {
        WaitPolicy::Completion { timeout }
    }

    pub fn ports(ports: impl IntoIterator<Item = u16>, timeout: Duration) -> Self {
        WaitPolicy::Ports {
            ports: ports.into_iter().collect(),
            timeout,
        }
    }
}

/// Relaunch-on-failure policy with a cumulative attempt cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    pub max_restarts: u32,
}

/// Options for launching a process.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecSpec {
    command: String,
    name: Option<String>,
    working_dir: Option<String>,
    wait: WaitPolicy,
    restart: Option<RestartPolicy>,
}

impl ExecSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            name: None,
            working_dir: None,
            wait: WaitPolicy::Detached,
            restart: None,
        }
    }

    /// Names the process. Names are unique per sandbox; reusing the name of
    /// a still-running process is a conflict. A name is generated when this
    /// is not set.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn wait(mut self, policy: WaitPolicy) -> Self {
        self.wait = policy;
        self
    }

    /// Relaunches the command on non-zero exit, up to `max_restarts` times
    /// cumulatively. Only observable under a completion wait.
    pub fn restart_on_failure(mut self, max_restarts: u32) -> Self {
        self.restart = Some(RestartPolicy { max_restarts });
        self
    }
}

pub(crate) async fn exec(
    api: Arc<dyn PlatformApi>,
    sandbox: &str,
    spec: ExecSpec,
) -> Result<Process> {
    let name = spec
        .name
        .unwrap_or_else(|| format!("proc-{}", Uuid::new_v4()));
    let request = ExecRequest {
        name: name.clone(),
        command: spec.command,
        working_dir: spec.working_dir,
    };

    tracing::debug!(sandbox = %sandbox, process = %name, command = %request.command, "launching process");
    api.exec(sandbox, &request).await?;

    let mut process = Process {
        api,
        sandbox: sandbox.to_string(),
        name,
        request: Some(request),
        restart: spec.restart,
        restarts_used: 0,
        logs: None,
    };

    match spec.wait {
        WaitPolicy::Detached => {}
        WaitPolicy::Completion { timeout } => {
            process.wait(timeout).await?;
        }
        WaitPolicy::Ports { ports, timeout } => {
            wait_for_ports(process.api.as_ref(), sandbox, &ports, timeout).await?;
        }
    }

    Ok(process)
}

pub(crate) async fn wait_for_ports(
    api: &dyn PlatformApi,
    sandbox: &str,
    ports: &[u16],
    wait_timeout: Duration,
) -> Result<()> {
    let result = timeout(wait_timeout, async {
        let mut interval = interval(PORT_POLL_INTERVAL);
        loop {
            let listening = api.listening_ports(sandbox).await?;
            if ports.iter().all(|port| listening.contains(port)) {
                return Ok(());
            }
            tracing::debug!(sandbox = %sandbox, "ports {:?} not all listening yet, retrying...", ports);
            interval.tick().await;
        }
    })
    .await;

    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(Error::Timeout(format!(
            "ports {ports:?} in sandbox '{sandbox}' not reachable after {wait_timeout:?}"
        ))),
    }
}

/// Handle to a process inside a sandbox.
///
/// The handle always has a retrievable status. When obtained through a
/// completion wait it also carries the captured output logs.
pub struct Process {
    api: Arc<dyn PlatformApi>,
    sandbox: String,
    name: String,
    /// Original launch request; `None` for handles attached to an already
    /// existing process, which therefore cannot drive restarts.
    request: Option<ExecRequest>,
    restart: Option<RestartPolicy>,
    restarts_used: u32,
    logs: Option<ProcessLogs>,
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("sandbox", &self.sandbox)
            .field("name", &self.name)
            .field("restarts_used", &self.restarts_used)
            .finish_non_exhaustive()
    }
}

impl Process {
    pub(crate) fn attached(api: Arc<dyn PlatformApi>, sandbox: String, name: String) -> Self {
        Self {
            api,
            sandbox,
            name,
            request: None,
            restart: None,
            restarts_used: 0,
            logs: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Restart attempts consumed so far. Cumulative: never reset by a
    /// restart.
    pub fn restarts(&self) -> u32 {
        self.restarts_used
    }

    /// Fetches the current state from the platform.
    pub async fn status(&self) -> Result<ProcessState> {
        Ok(self.api.get_process(&self.sandbox, &self.name).await?.state)
    }

    /// Fetches the full process record.
    pub async fn record(&self) -> Result<ProcessRecord> {
        self.api.get_process(&self.sandbox, &self.name).await
    }

    /// Output captured by the most recent completion wait, if any.
    pub fn captured_logs(&self) -> Option<&ProcessLogs> {
        self.logs.as_ref()
    }

    /// Fetches the process output from the platform.
    pub async fn logs(&self) -> Result<ProcessLogs> {
        self.api.process_logs(&self.sandbox, &self.name).await
    }

    /// Waits for the process to reach a terminal state, applying the restart
    /// policy along the way, bounded by `wait_timeout`.
    ///
    /// A non-zero exit is not an error from the client's point of view: the
    /// returned record simply reports `failed`. [`Error::Timeout`] means the
    /// client stopped waiting; the remote process keeps its own course.
    pub async fn wait(&mut self, wait_timeout: Duration) -> Result<ProcessRecord> {
        let sandbox = self.sandbox.clone();
        let name = self.name.clone();

        let result = timeout(wait_timeout, async {
            let mut interval = interval(STATUS_POLL_INTERVAL);
            let mut record = self.api.get_process(&sandbox, &name).await?;
            loop {
                if record.state == ProcessState::Failed && self.can_restart() {
                    self.restarts_used += 1;
                    tracing::debug!(
                        sandbox = %sandbox,
                        process = %name,
                        attempt = self.restarts_used,
                        "process failed, restarting"
                    );
                    if let Some(request) = &self.request {
                        // The relaunch response is the acknowledged new state;
                        // a status read straight afterwards could still report
                        // the previous run's failure.
                        record = self.api.exec(&sandbox, request).await?;
                        continue;
                    }
                }

                if record.state.is_terminal() {
                    self.logs = Some(self.api.process_logs(&sandbox, &name).await?);
                    return Ok(record);
                }

                interval.tick().await;
                record = self.api.get_process(&sandbox, &name).await?;
            }
        })
        .await;

        match result {
            Ok(Ok(record)) => Ok(record),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::Timeout(format!(
                "process '{name}' in sandbox '{sandbox}' not finished after {wait_timeout:?}"
            ))),
        }
    }

    /// Signals termination. Fire-and-forget; does not wait for the process
    /// to actually stop.
    pub async fn kill(&self) -> Result<()> {
        self.api
            .kill_process(&self.sandbox, &self.name)
            .await
            .map_err(|e| match e {
                Error::NotFound { .. } => Error::not_found(ResourceKind::Process, &self.name),
                other => other,
            })
    }

    fn can_restart(&self) -> bool {
        let Some(policy) = self.restart else {
            return false;
        };
        self.request.is_some() && self.restarts_used < policy.max_restarts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_spec_defaults_to_detached() {
        let spec = ExecSpec::new("echo hi");
        assert_eq!(spec.wait, WaitPolicy::Detached);
        assert!(spec.name.is_none());
        assert!(spec.restart.is_none());
    }

    #[test]
    fn exec_spec_builder_methods() {
        let spec = ExecSpec::new("npm run dev")
            .name("dev-server")
            .working_dir("/app")
            .wait(WaitPolicy::ports([3000], Duration::from_secs(60)))
            .restart_on_failure(3);
        assert_eq!(spec.name.as_deref(), Some("dev-server"));
        assert_eq!(spec.working_dir.as_deref(), Some("/app"));
        assert_eq!(
            spec.wait,
            WaitPolicy::Ports {
                ports: vec![3000],
                timeout: Duration::from_secs(60)
            }
        );
        assert_eq!(spec.restart, Some(RestartPolicy { max_restarts: 3 }));
    }

    #[test]
    fn wait_policy_completion_constructor() {
        let policy = WaitPolicy::completion(Duration::from_secs(5));
        assert_eq!(
            policy,
            WaitPolicy::Completion {
                timeout: Duration::from_secs(5)
            }
        );
    }
}
