//! Client SDK for the skiff remote sandbox platform.
//!
//! A sandbox is a remote, instantly resumable compute instance exposing
//! filesystem, process, and network-preview capabilities. This crate wraps
//! the platform's HTTP API in typed handles: resolve credentials once,
//! connect a [`Skiff`] client, and work through the handles it hands out.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use skiff::{Credentials, ExecSpec, PreviewSpec, PreviewVisibility, Skiff, WaitPolicy};
//! use std::time::Duration;
//!
//! # async fn example() -> skiff::Result<()> {
//! let creds = Credentials::resolve()?;
//! let client = Skiff::connect(creds);
//!
//! let sandbox = client
//!     .sandbox("my-sandbox")
//!     .image("node:22")
//!     .memory_mb(1024)
//!     .port(3000)
//!     .create()
//!     .await?;
//!
//! sandbox
//!     .exec(ExecSpec::new("npm run dev").wait(WaitPolicy::ports([3000], Duration::from_secs(60))))
//!     .await?;
//!
//! let preview = sandbox
//!     .previews()
//!     .create_if_not_exists(PreviewSpec {
//!         name: "web".into(),
//!         port: 3000,
//!         visibility: PreviewVisibility::Public,
//!         prefix: None,
//!     })
//!     .await?;
//! println!("open {}", preview.url());
//! # Ok(())
//! # }
//! ```

mod client;
mod credentials;
mod fs;
mod http;
mod jobs;
mod preview;
mod process;
pub mod sandbox;
mod volume;
mod watch;

#[cfg(feature = "test-utils")]
pub mod test_utils;

// ============================================================================
// Core API - The types most users need
// ============================================================================

pub use client::Skiff;
pub use credentials::{CredentialSource, Credentials};
pub use fs::{FindOptions, GrepOptions, SandboxFs, WatchOptions};
pub use http::HttpApi;
pub use jobs::Job;
pub use preview::{Preview, PreviewTokens, Previews};
pub use process::{ExecSpec, Process, RestartPolicy, WaitPolicy};
pub use sandbox::{Sandbox, SandboxBuilder, Sandboxes};
pub use volume::{Volume, Volumes};
pub use watch::WatchSubscription;

// Shared types and the transport seam
pub use skiff_core::{
    DirListing, EntryType, ExecutionRecord, ExecutionStatus, FindRequest, FsEvent, FsEventKind,
    GrepMatch, GrepRequest, PlatformApi, PreviewRecord, PreviewSpec, PreviewToken,
    PreviewVisibility, ProcessLogs, ProcessRecord, ProcessState, ResourceKind, ResourceState,
    SandboxRecord, SandboxSpec, TaskParams, VolumeAttachment, VolumeRecord, VolumeSpec,
    WatchRequest, RESERVED_PORTS,
};

// Errors
pub use skiff_core::{Error, Result};
