//! Persistent volume handles.
//!
//! Volumes are created independently of sandboxes and attached only at
//! sandbox-creation time (see
//! [`SandboxBuilder::volume`](crate::SandboxBuilder::volume)).

use crate::sandbox::{DEFAULT_READY_TIMEOUT, PROVISION_POLL_INTERVAL};
use skiff_core::{Error, PlatformApi, ResourceState, Result, VolumeRecord, VolumeSpec};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout};

/// The workspace's volume collection.
pub struct Volumes {
    api: Arc<dyn PlatformApi>,
}

impl Volumes {
    pub(crate) fn new(api: Arc<dyn PlatformApi>) -> Self {
        Self { api }
    }

    /// Returns a handle to the named volume, creating it if absent.
    ///
    /// Same idempotence as sandboxes: an existing volume is returned
    /// unconditionally, spec mismatches are not reconciled.
    pub async fn create_if_not_exists(&self, spec: VolumeSpec) -> Result<Volume> {
        match self.api.get_volume(&spec.name).await {
            Ok(record) if record.state == ResourceState::Ready => {
                return Ok(Volume::new(Arc::clone(&self.api), record));
            }
            Ok(_) => {
                let record = self.wait_ready(&spec.name, DEFAULT_READY_TIMEOUT).await?;
                return Ok(Volume::new(Arc::clone(&self.api), record));
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        tracing::info!(volume = %spec.name, size_mb = spec.size_mb, "creating volume");
        match self.api.create_volume(&spec).await {
            Ok(_) => {}
            Err(Error::Conflict { .. }) => {}
            Err(e) => return Err(e),
        }

        let record = self.wait_ready(&spec.name, DEFAULT_READY_TIMEOUT).await?;
        Ok(Volume::new(Arc::clone(&self.api), record))
    }

    /// Fails with [`Error::NotFound`] if the volume does not exist.
    pub async fn get(&self, name: &str) -> Result<Volume> {
        let record = self.api.get_volume(name).await?;
        Ok(Volume::new(Arc::clone(&self.api), record))
    }

    pub async fn list(&self) -> Result<Vec<Volume>> {
        let records = self.api.list_volumes().await?;
        Ok(records
            .into_iter()
            .map(|record| Volume::new(Arc::clone(&self.api), record))
            .collect())
    }

    /// Deletes the named volume. Delete-of-absent is success.
    pub async fn delete(&self, name: &str) -> Result<()> {
        match self.api.delete_volume(name).await {
            Ok(()) => {
                tracing::info!(volume = %name, "volume deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(volume = %name, "volume already deleted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn wait_ready(&self, name: &str, wait_timeout: Duration) -> Result<VolumeRecord> {
        let result = timeout(wait_timeout, async {
            let mut interval = interval(PROVISION_POLL_INTERVAL);
            loop {
                let record = self.api.get_volume(name).await?;
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
                        tracing::debug!(volume = %name, "still provisioning, retrying...");
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
                "volume '{name}' not ready after {wait_timeout:?}"
            ))),
        }
    }
}

/// Handle to a persistent volume.
#[derive(Clone)]
pub struct Volume {
    api: Arc<dyn PlatformApi>,
    record: VolumeRecord,
}

impl std::fmt::Debug for Volume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Volume")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

impl Volume {
    pub(crate) fn new(api: Arc<dyn PlatformApi>, record: VolumeRecord) -> Self {
        Self { api, record }
    }

    pub fn name(&self) -> &str {
        &self.record.spec.name
    }

    pub fn size_mb(&self) -> u32 {
        self.record.spec.size_mb
    }

    pub fn record(&self) -> &VolumeRecord {
        &self.record
    }

    /// Deletes this volume (idempotent).
    pub async fn delete(&self) -> Result<()> {
        Volumes::new(Arc::clone(&self.api)).delete(self.name()).await
    }
}
