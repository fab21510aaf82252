use super::ResourceState;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ports that may never appear in a sandbox's declared port set.
pub const RESERVED_PORTS: [u16; 3] = [80, 443, 8080];

/// Image used when a sandbox spec does not name one.
pub const DEFAULT_IMAGE: &str = "ubuntu:24.04";

/// Memory used when a sandbox spec does not set it.
pub const DEFAULT_MEMORY_MB: u32 = 512;

/// Rejects reserved ports before any network call is made.
pub fn validate_ports(ports: &[u16]) -> Result<()> {
    for &port in ports {
        if RESERVED_PORTS.contains(&port) {
            return Err(Error::InvalidPort {
                port,
                reason: "reserved by the platform".to_string(),
            });
        }
    }
    Ok(())
}

/// A volume attached to a sandbox at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeAttachment {
    pub volume: String,
    pub mount_path: String,
    #[serde(default)]
    pub read_only: bool,
}

/// Requested shape of a sandbox.
///
/// The port set is fixed at creation; the platform exposes no way to add
/// ports to an existing sandbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxSpec {
    pub name: String,
    pub image: String,
    pub memory_mb: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default)]
    pub ports: Vec<u16>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
    #[serde(default)]
    pub volumes: Vec<VolumeAttachment>,
}

impl SandboxSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: DEFAULT_IMAGE.to_string(),
            memory_mb: DEFAULT_MEMORY_MB,
            region: None,
            ports: Vec::new(),
            labels: BTreeMap::new(),
            ttl_seconds: None,
            volumes: Vec::new(),
        }
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn memory_mb(mut self, mb: u32) -> Self {
        self.memory_mb = mb;
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Declares a port. The set is fixed once the sandbox is created.
    pub fn port(mut self, port: u16) -> Self {
        self.ports.push(port);
        self
    }

    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn ttl_seconds(mut self, seconds: u64) -> Self {
        self.ttl_seconds = Some(seconds);
        self
    }

    /// Attaches a volume at creation time. Volumes cannot be attached later.
    pub fn volume(
        mut self,
        volume: impl Into<String>,
        mount_path: impl Into<String>,
        read_only: bool,
    ) -> Self {
        self.volumes.push(VolumeAttachment {
            volume: volume.into(),
            mount_path: mount_path.into(),
            read_only,
        });
        self
    }
}

/// Server-side record of a sandbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxRecord {
    #[serde(flatten)]
    pub spec: SandboxSpec,
    pub state: ResourceState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

/// Requested shape of a persistent volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeSpec {
    pub name: String,
    pub size_mb: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl VolumeSpec {
    pub fn new(name: impl Into<String>, size_mb: u32) -> Self {
        Self {
            name: name.into(),
            size_mb,
            region: None,
            labels: BTreeMap::new(),
        }
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Server-side record of a volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeRecord {
    #[serde(flatten)]
    pub spec: VolumeSpec,
    pub state: ResourceState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_ports_accepts_unreserved() {
        assert!(validate_ports(&[3000, 5173, 8000]).is_ok());
    }

    #[test]
    fn validate_ports_rejects_each_reserved_port() {
        for port in RESERVED_PORTS {
            let err = validate_ports(&[3000, port]).unwrap_err();
            match err {
                Error::InvalidPort { port: p, .. } => assert_eq!(p, port),
                other => panic!("expected InvalidPort, got {other:?}"),
            }
        }
    }

    #[test]
    fn volume_spec_builder_methods() {
        let spec = VolumeSpec::new("data", 512)
            .region("eu-west")
            .label("team", "infra");
        assert_eq!(spec.name, "data");
        assert_eq!(spec.size_mb, 512);
        assert_eq!(spec.region.as_deref(), Some("eu-west"));
        assert_eq!(spec.labels.get("team").map(String::as_str), Some("infra"));
    }

    #[test]
    fn sandbox_spec_defaults() {
        let spec = SandboxSpec::new("sb");
        assert_eq!(spec.image, DEFAULT_IMAGE);
        assert_eq!(spec.memory_mb, DEFAULT_MEMORY_MB);
        assert!(spec.ports.is_empty());
        assert!(spec.ttl_seconds.is_none());
    }

    #[test]
    fn sandbox_spec_builder_methods() {
        let spec = SandboxSpec::new("sb")
            .image("node:22")
            .memory_mb(2048)
            .region("us-east")
            .port(3000)
            .port(5173)
            .label("env", "dev")
            .ttl_seconds(600)
            .volume("data", "/data", true);
        assert_eq!(spec.image, "node:22");
        assert_eq!(spec.memory_mb, 2048);
        assert_eq!(spec.ports, vec![3000, 5173]);
        assert_eq!(spec.ttl_seconds, Some(600));
        assert_eq!(spec.volumes.len(), 1);
        assert_eq!(spec.volumes[0].mount_path, "/data");
        assert!(spec.volumes[0].read_only);
    }

    #[test]
    fn sandbox_record_flattens_spec() {
        let record = SandboxRecord {
            spec: SandboxSpec {
                name: "sb".to_string(),
                image: "ubuntu:24.04".to_string(),
                memory_mb: 1024,
                region: None,
                ports: vec![3000],
                labels: BTreeMap::new(),
                ttl_seconds: Some(3600),
                volumes: vec![],
            },
            state: ResourceState::Ready,
            status_message: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["name"], "sb");
        assert_eq!(json["state"], "ready");
        assert_eq!(json["ttl_seconds"], 3600);
    }
}
