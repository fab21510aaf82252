//! Batch job execution control.
//!
//! A job accepts executions: sets of independent parameterized tasks that
//! run in parallel server-side. The controller only creates, polls, and
//! cancels executions; it never sequences tasks.

use skiff_core::{Error, ExecutionRecord, ExecutionStatus, PlatformApi, Result, TaskParams};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout};

/// Controller for one job's executions. Obtained from
/// [`Skiff::job`](crate::Skiff::job).
pub struct Job {
    api: Arc<dyn PlatformApi>,
    name: String,
}

impl Job {
    pub(crate) fn new(api: Arc<dyn PlatformApi>, name: impl Into<String>) -> Self {
        Self {
            api,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Submits `tasks` as one execution and returns its id.
    pub async fn create_execution(&self, tasks: Vec<TaskParams>) -> Result<String> {
        let record = self.api.create_execution(&self.name, &tasks).await?;
        tracing::info!(job = %self.name, execution = %record.id, tasks = record.tasks.len(), "execution created");
        Ok(record.id)
    }

    /// Current aggregated status of an execution.
    pub async fn execution_status(&self, id: &str) -> Result<ExecutionStatus> {
        Ok(self.api.get_execution(&self.name, id).await?.status)
    }

    /// Full execution record.
    pub async fn get_execution(&self, id: &str) -> Result<ExecutionRecord> {
        self.api.get_execution(&self.name, id).await
    }

    /// Polls the execution at `poll_interval` until it reaches a terminal
    /// state, failing with [`Error::Timeout`] once `max_wait` elapses.
    pub async fn wait_for_execution(
        &self,
        id: &str,
        max_wait: Duration,
        poll_interval: Duration,
    ) -> Result<ExecutionRecord> {
        let result = timeout(max_wait, async {
            let mut interval = interval(poll_interval);
            loop {
                let record = self.api.get_execution(&self.name, id).await?;
                if record.status.is_terminal() {
                    return Ok(record);
                }
                tracing::debug!(job = %self.name, execution = %id, status = ?record.status, "execution not terminal, retrying...");
                interval.tick().await;
            }
        })
        .await;

        match result {
            Ok(Ok(record)) => Ok(record),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::Timeout(format!(
                "execution '{id}' of job '{}' not terminal after {max_wait:?}",
                self.name
            ))),
        }
    }

    pub async fn list_executions(&self) -> Result<Vec<ExecutionRecord>> {
        self.api.list_executions(&self.name).await
    }

    /// Cancels and removes an execution. Delete-of-absent is success.
    pub async fn delete_execution(&self, id: &str) -> Result<()> {
        match self.api.delete_execution(&self.name, id).await {
            Ok(()) => {
                tracing::info!(job = %self.name, execution = %id, "execution deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(job = %self.name, execution = %id, "execution already deleted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
