//! Sandbox handles and lifecycle.
//!
//! A [`Sandbox`] is a typed reference to a remote compute instance, bound to
//! its workspace-unique name. Creation is idempotent: asking for a name that
//! already exists returns a handle to the existing sandbox unconditionally —
//! the requested spec is advisory and is never reconciled against what is
//! already there.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example(client: skiff::Skiff) -> skiff::Result<()> {
//! let sandbox = client
//!     .sandbox("ci-runner")
//!     .image("rust:1.84")
//!     .port(3000)
//!     .create()
//!     .await?;
//!
//! sandbox.fs().write_text("/app/main.rs", "fn main() {}").await?;
//! sandbox.delete().await?;
//! # Ok(())
//! # }
//! ```

mod builder;

pub use builder::SandboxBuilder;

use crate::fs::SandboxFs;
use crate::preview::Previews;
use crate::process::{self, ExecSpec, Process};
use skiff_core::{
    validate_ports, Error, PlatformApi, ResourceKind, ResourceState, Result, SandboxRecord,
    SandboxSpec,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout};

pub(crate) const PROVISION_POLL_INTERVAL: Duration = Duration::from_millis(250);
pub(crate) const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(120);

/// The workspace's sandbox collection.
pub struct Sandboxes {
    api: Arc<dyn PlatformApi>,
}

impl Sandboxes {
    pub(crate) fn new(api: Arc<dyn PlatformApi>) -> Self {
        Self { api }
    }

    /// Returns a handle to the named sandbox, creating it if absent.
    ///
    /// If a sandbox of that name already exists it is returned as-is; spec
    /// mismatches are not reconciled (name-is-key). A fresh sandbox is
    /// provisioned remotely and this call blocks until it reports ready,
    /// fails with [`Error::Provisioning`], or the default ready timeout
    /// elapses.
    pub async fn create_if_not_exists(&self, spec: SandboxSpec) -> Result<Sandbox> {
        self.create_with_timeout(spec, DEFAULT_READY_TIMEOUT).await
    }

    pub(crate) async fn create_with_timeout(
        &self,
        spec: SandboxSpec,
        ready_timeout: Duration,
    ) -> Result<Sandbox> {
        validate_ports(&spec.ports)?;

        match self.api.get_sandbox(&spec.name).await {
            Ok(record) if record.state == ResourceState::Ready => {
                return Ok(Sandbox::new(Arc::clone(&self.api), record));
            }
            Ok(_) => {
                // Someone else is provisioning it; wait alongside them.
                let record = self.wait_ready(&spec.name, ready_timeout).await?;
                return Ok(Sandbox::new(Arc::clone(&self.api), record));
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        tracing::info!(sandbox = %spec.name, image = %spec.image, "creating sandbox");
        match self.api.create_sandbox(&spec).await {
            Ok(_) => {}
            // Lost a create race; the winner's sandbox is the one we want.
            Err(Error::Conflict { .. }) => {}
            Err(e) => return Err(e),
        }

        let record = self.wait_ready(&spec.name, ready_timeout).await?;
        Ok(Sandbox::new(Arc::clone(&self.api), record))
    }

    /// Fails with [`Error::NotFound`] if the sandbox does not exist.
    pub async fn get(&self, name: &str) -> Result<Sandbox> {
        let record = self.api.get_sandbox(name).await?;
        Ok(Sandbox::new(Arc::clone(&self.api), record))
    }

    pub async fn list(&self) -> Result<Vec<Sandbox>> {
        let records = self.api.list_sandboxes().await?;
        Ok(records
            .into_iter()
            .map(|record| Sandbox::new(Arc::clone(&self.api), record))
            .collect())
    }

    /// Deletes the named sandbox. Deleting an absent sandbox is success, so
    /// cleanup code never has to special-case it.
    pub async fn delete(&self, name: &str) -> Result<()> {
        match self.api.delete_sandbox(name).await {
            Ok(()) => {
                tracing::info!(sandbox = %name, "sandbox deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(sandbox = %name, "sandbox already deleted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn wait_ready(&self, name: &str, wait_timeout: Duration) -> Result<SandboxRecord> {
        let result = timeout(wait_timeout, async {
            let mut interval = interval(PROVISION_POLL_INTERVAL);
            loop {
                let record = self.api.get_sandbox(name).await?;
                match record.state {
                    ResourceState::Ready => return Ok(record),
                    ResourceState::Failed => {
                        return Err(Error::Provisioning {
                            name: name.to_string(),
                            reason: record
                                .status_message
                                .unwrap_or_else(|| "no reason reported".to_string()),
                        });
                    }
                    ResourceState::Provisioning => {
                        tracing::debug!(sandbox = %name, "still provisioning, retrying...");
                    }
                }
                interval.tick().await;
            }
        })
        .await;

        match result {
            Ok(Ok(record)) => Ok(record),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::Timeout(format!(
                "sandbox '{name}' not ready after {wait_timeout:?}"
            ))),
        }
    }
}

/// Handle to a sandbox.
///
/// The remote sandbox is the source of truth; the handle carries the record
/// observed when it was obtained plus the operations that act on the
/// sandbox. Handles are cheap to clone.
#[derive(Clone)]
pub struct Sandbox {
    api: Arc<dyn PlatformApi>,
    record: SandboxRecord,
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

impl Sandbox {
    pub(crate) fn new(api: Arc<dyn PlatformApi>, record: SandboxRecord) -> Self {
        Self { api, record }
    }

    pub fn name(&self) -> &str {
        &self.record.spec.name
    }

    /// Ports declared at creation. This set never changes afterwards.
    pub fn ports(&self) -> &[u16] {
        &self.record.spec.ports
    }

    pub fn record(&self) -> &SandboxRecord {
        &self.record
    }

    /// Filesystem operations scoped to this sandbox.
    pub fn fs(&self) -> SandboxFs {
        SandboxFs::new(Arc::clone(&self.api), self.name().to_string())
    }

    /// Network previews bound to this sandbox.
    pub fn previews(&self) -> Previews {
        Previews::new(
            Arc::clone(&self.api),
            self.name().to_string(),
            self.record.spec.ports.clone(),
        )
    }

    /// Runs a command inside the sandbox. See [`ExecSpec`] for wait and
    /// restart policies.
    ///
    /// Fails with [`Error::Conflict`] when the spec names a process that is
    /// still running.
    pub async fn exec(&self, spec: ExecSpec) -> Result<Process> {
        process::exec(Arc::clone(&self.api), self.name(), spec).await
    }

    /// Looks up a running or finished process by name.
    pub async fn process(&self, name: &str) -> Result<Process> {
        let record = self.api.get_process(self.name(), name).await?;
        Ok(Process::attached(
            Arc::clone(&self.api),
            self.name().to_string(),
            record.name,
        ))
    }

    /// Signals a process to terminate. Fire-and-forget: success means the
    /// signal was accepted, not that the process has stopped. Fails with
    /// [`Error::NotFound`] if no process of that name exists.
    pub async fn kill(&self, process_name: &str) -> Result<()> {
        self.api
            .kill_process(self.name(), process_name)
            .await
            .map_err(|e| match e {
                Error::NotFound { .. } => {
                    Error::not_found(ResourceKind::Process, process_name)
                }
                other => other,
            })
    }

    /// Deletes this sandbox (idempotent, like [`Sandboxes::delete`]).
    pub async fn delete(&self) -> Result<()> {
        Sandboxes::new(Arc::clone(&self.api))
            .delete(self.name())
            .await
    }
}
