//! Fluent builder for sandbox creation.

use super::{Sandbox, Sandboxes, DEFAULT_READY_TIMEOUT};
use skiff_core::{PlatformApi, Result, SandboxSpec};
use std::sync::Arc;
use std::time::Duration;

/// Builder returned by [`Skiff::sandbox`](crate::Skiff::sandbox).
///
/// Accumulates a [`SandboxSpec`] and creates the sandbox if it does not
/// already exist. The declared port set and volume attachments are fixed at
/// creation; reserved ports (80, 443, 8080) are rejected before any network
/// call.
pub struct SandboxBuilder {
    api: Arc<dyn PlatformApi>,
    spec: SandboxSpec,
    ready_timeout: Duration,
}

impl SandboxBuilder {
    pub(crate) fn new(api: Arc<dyn PlatformApi>, name: impl Into<String>) -> Self {
        Self {
            api,
            spec: SandboxSpec::new(name),
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.spec = self.spec.image(image);
        self
    }

    pub fn memory_mb(mut self, mb: u32) -> Self {
        self.spec = self.spec.memory_mb(mb);
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.spec = self.spec.region(region);
        self
    }

    /// Declares a port to expose. Must not be 80, 443, or 8080.
    pub fn port(mut self, port: u16) -> Self {
        self.spec = self.spec.port(port);
        self
    }

    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec = self.spec.label(key, value);
        self
    }

    /// Server-side time-to-live after which the sandbox is reclaimed.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.spec = self.spec.ttl_seconds(ttl.as_secs());
        self
    }

    /// Attaches an existing volume at `mount_path`.
    pub fn volume(
        mut self,
        volume: impl Into<String>,
        mount_path: impl Into<String>,
        read_only: bool,
    ) -> Self {
        self.spec = self.spec.volume(volume, mount_path, read_only);
        self
    }

    /// How long `create` waits for a fresh sandbox to report ready.
    pub fn ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// Creates the sandbox if absent and returns a handle to it.
    pub async fn create(self) -> Result<Sandbox> {
        Sandboxes::new(self.api)
            .create_with_timeout(self.spec, self.ready_timeout)
            .await
    }
}
