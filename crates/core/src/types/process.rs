use serde::{Deserialize, Serialize};

/// Wire request for launching a process inside a sandbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecRequest {
    pub name: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
}

/// State of a process inside a sandbox.
///
/// Transitions: `Pending -> Running -> {Completed, Failed, Killed}`.
/// A restart re-enters `Running` without resetting the attempt counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Pending,
    Running,
    Completed,
    Failed,
    Killed,
}

impl ProcessState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessState::Completed | ProcessState::Failed | ProcessState::Killed
        )
    }
}

/// Server-side record of a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub name: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    pub state: ProcessState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

/// Captured output of a process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessLogs {
    pub stdout: String,
    pub stderr: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!ProcessState::Pending.is_terminal());
        assert!(!ProcessState::Running.is_terminal());
        assert!(ProcessState::Completed.is_terminal());
        assert!(ProcessState::Failed.is_terminal());
        assert!(ProcessState::Killed.is_terminal());
    }

    #[test]
    fn process_record_roundtrip() {
        let record = ProcessRecord {
            name: "dev-server".to_string(),
            command: "npm run dev".to_string(),
            working_dir: Some("/app".to_string()),
            state: ProcessState::Running,
            exit_code: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: ProcessRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ProcessState::Completed).unwrap(),
            "\"completed\""
        );
    }
}
