mod fs;
mod job;
mod preview;
mod process;
mod sandbox;

pub use fs::{
    DirListing, EntryType, FindRequest, FsEvent, FsEventKind, GrepMatch, GrepRequest, WatchRequest,
};
pub use job::{ExecutionRecord, ExecutionStatus, TaskParams};
pub use preview::{PreviewRecord, PreviewSpec, PreviewToken, PreviewVisibility};
pub use process::{ExecRequest, ProcessLogs, ProcessRecord, ProcessState};
pub use sandbox::{
    validate_ports, SandboxRecord, SandboxSpec, VolumeAttachment, VolumeRecord, VolumeSpec,
    DEFAULT_IMAGE, DEFAULT_MEMORY_MB, RESERVED_PORTS,
};

use serde::{Deserialize, Serialize};

/// Kind of a named remote resource, used for error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    Sandbox,
    Volume,
    Process,
    Preview,
    PreviewToken,
    Execution,
    File,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResourceKind::Sandbox => "sandbox",
            ResourceKind::Volume => "volume",
            ResourceKind::Process => "process",
            ResourceKind::Preview => "preview",
            ResourceKind::PreviewToken => "preview token",
            ResourceKind::Execution => "execution",
            ResourceKind::File => "file",
        };
        f.write_str(s)
    }
}

/// Provisioning state of a sandbox or volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    Provisioning,
    Ready,
    Failed,
}
