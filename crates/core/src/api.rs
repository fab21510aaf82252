//! Transport trait between the SDK surface and the platform API.
//!
//! The SDK never talks to the network directly; every remote operation goes
//! through [`PlatformApi`]. The production implementation is an HTTP client,
//! and tests substitute an in-memory one.

use crate::error::Result;
use crate::types::{
    DirListing, ExecRequest, ExecutionRecord, FindRequest, FsEvent, GrepMatch, GrepRequest,
    PreviewRecord, PreviewSpec, PreviewToken, ProcessLogs, ProcessRecord, SandboxRecord,
    SandboxSpec, TaskParams, VolumeRecord, VolumeSpec, WatchRequest,
};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::time::Duration;

/// Stream of filesystem events for one watch subscription.
pub type EventStream = BoxStream<'static, Result<FsEvent>>;

/// One logical call per remote endpoint. Implementations must not retry
/// failures on their own; all retry and polling policy lives in the SDK.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    // Sandboxes
    async fn create_sandbox(&self, spec: &SandboxSpec) -> Result<SandboxRecord>;
    async fn get_sandbox(&self, name: &str) -> Result<SandboxRecord>;
    async fn list_sandboxes(&self) -> Result<Vec<SandboxRecord>>;
    async fn delete_sandbox(&self, name: &str) -> Result<()>;

    // Volumes
    async fn create_volume(&self, spec: &VolumeSpec) -> Result<VolumeRecord>;
    async fn get_volume(&self, name: &str) -> Result<VolumeRecord>;
    async fn list_volumes(&self) -> Result<Vec<VolumeRecord>>;
    async fn delete_volume(&self, name: &str) -> Result<()>;

    // Processes
    async fn exec(&self, sandbox: &str, req: &ExecRequest) -> Result<ProcessRecord>;
    async fn get_process(&self, sandbox: &str, name: &str) -> Result<ProcessRecord>;
    async fn process_logs(&self, sandbox: &str, name: &str) -> Result<ProcessLogs>;
    async fn kill_process(&self, sandbox: &str, name: &str) -> Result<()>;
    /// Snapshot of ports currently accepting connections inside the sandbox.
    async fn listening_ports(&self, sandbox: &str) -> Result<Vec<u16>>;

    // Filesystem
    async fn read_file(&self, sandbox: &str, path: &str) -> Result<Vec<u8>>;
    async fn write_file(&self, sandbox: &str, path: &str, contents: &[u8]) -> Result<()>;
    async fn mkdir(&self, sandbox: &str, path: &str) -> Result<()>;
    async fn list_dir(&self, sandbox: &str, path: &str) -> Result<DirListing>;
    async fn grep(&self, sandbox: &str, req: &GrepRequest) -> Result<Vec<GrepMatch>>;
    async fn find(&self, sandbox: &str, req: &FindRequest) -> Result<Vec<String>>;
    async fn watch(&self, sandbox: &str, req: &WatchRequest) -> Result<EventStream>;

    // Previews
    async fn create_preview(&self, sandbox: &str, spec: &PreviewSpec) -> Result<PreviewRecord>;
    async fn get_preview(&self, sandbox: &str, name: &str) -> Result<PreviewRecord>;
    async fn list_previews(&self, sandbox: &str) -> Result<Vec<PreviewRecord>>;
    async fn delete_preview(&self, sandbox: &str, name: &str) -> Result<()>;
    async fn create_preview_token(
        &self,
        sandbox: &str,
        preview: &str,
        ttl: Duration,
    ) -> Result<PreviewToken>;
    async fn list_preview_tokens(&self, sandbox: &str, preview: &str)
        -> Result<Vec<PreviewToken>>;
    async fn delete_preview_token(&self, sandbox: &str, preview: &str, token: &str) -> Result<()>;

    // Job executions
    async fn create_execution(&self, job: &str, tasks: &[TaskParams]) -> Result<ExecutionRecord>;
    async fn get_execution(&self, job: &str, id: &str) -> Result<ExecutionRecord>;
    async fn list_executions(&self, job: &str) -> Result<Vec<ExecutionRecord>>;
    async fn delete_execution(&self, job: &str, id: &str) -> Result<()>;
}
