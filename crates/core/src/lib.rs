pub mod api;
pub mod error;
pub mod types;

pub use api::{EventStream, PlatformApi};
pub use error::{Error, Result};
pub use types::{
    validate_ports, DirListing, EntryType, ExecRequest, ExecutionRecord, ExecutionStatus,
    FindRequest, FsEvent, FsEventKind, GrepMatch, GrepRequest, PreviewRecord, PreviewSpec, PreviewToken,
    PreviewVisibility, ProcessLogs, ProcessRecord, ProcessState, ResourceKind, ResourceState,
    SandboxRecord, SandboxSpec, TaskParams, VolumeAttachment, VolumeRecord, VolumeSpec,
    WatchRequest, DEFAULT_IMAGE, DEFAULT_MEMORY_MB, RESERVED_PORTS,
};
