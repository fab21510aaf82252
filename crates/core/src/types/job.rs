use serde::{Deserialize, Serialize};

/// Parameter record for one task of a batch execution.
pub type TaskParams = serde_json::Map<String, serde_json::Value>;

/// Execution-level status aggregated by the platform.
///
/// Tasks within one execution run independently and in parallel server-side;
/// the client never sequences them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

/// Full record of one batch-job execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: String,
    pub job: String,
    pub tasks: Vec<TaskParams>,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}
