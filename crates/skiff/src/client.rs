use crate::credentials::Credentials;
use crate::http::HttpApi;
use crate::jobs::Job;
use crate::sandbox::{SandboxBuilder, Sandboxes};
use crate::volume::Volumes;
use skiff_core::PlatformApi;
use std::sync::Arc;

/// Default platform endpoint.
pub(crate) const DEFAULT_BASE_URL: &str = "https://api.skiff.dev";

/// Entry point for working with the sandbox platform.
///
/// A `Skiff` client is cheap to clone; all handles it produces share one
/// transport. Credentials are resolved once and injected here — the client
/// never consults ambient state afterwards.
///
/// # Example
///
/// ```rust,no_run
/// use skiff::{Credentials, Skiff};
///
/// # async fn example() -> skiff::Result<()> {
/// let client = Skiff::connect(Credentials::resolve()?);
///
/// for sandbox in client.sandboxes().list().await? {
///     println!("{}", sandbox.name());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Skiff {
    api: Arc<dyn PlatformApi>,
}

impl Skiff {
    /// Connects to the platform at the default endpoint.
    pub fn connect(credentials: Credentials) -> Self {
        Self::with_base_url(credentials, DEFAULT_BASE_URL)
    }

    /// Connects to the platform at a custom endpoint.
    pub fn with_base_url(credentials: Credentials, base_url: impl Into<String>) -> Self {
        Self::with_api(Arc::new(HttpApi::new(base_url.into(), credentials)))
    }

    /// Builds a client over an arbitrary transport.
    ///
    /// This is the seam tests use to substitute an in-memory platform.
    pub fn with_api(api: Arc<dyn PlatformApi>) -> Self {
        Self { api }
    }

    /// Sandbox collection: create, get, list, delete.
    pub fn sandboxes(&self) -> Sandboxes {
        Sandboxes::new(Arc::clone(&self.api))
    }

    /// Shortcut: a builder for the named sandbox.
    pub fn sandbox(&self, name: impl Into<String>) -> SandboxBuilder {
        SandboxBuilder::new(Arc::clone(&self.api), name)
    }

    /// Volume collection: create, get, list, delete.
    pub fn volumes(&self) -> Volumes {
        Volumes::new(Arc::clone(&self.api))
    }

    /// Controller for the named batch job's executions.
    pub fn job(&self, name: impl Into<String>) -> Job {
        Job::new(Arc::clone(&self.api), name)
    }
}
