//! Network preview management.
//!
//! A preview is an ingress binding that exposes one of a sandbox's declared
//! ports externally. Public previews are open URLs; private previews are
//! token-gated by the platform's ingress — the client cannot enforce that,
//! but it surfaces the requirement so callers never treat a private preview
//! URL as open.

use skiff_core::{
    validate_ports, Error, PlatformApi, PreviewRecord, PreviewSpec, PreviewToken,
    PreviewVisibility, Result,
};
use std::sync::Arc;
use std::time::Duration;

/// Previews bound to one sandbox. Obtained from
/// [`Sandbox::previews`](crate::Sandbox::previews).
pub struct Previews {
    api: Arc<dyn PlatformApi>,
    sandbox: String,
    declared_ports: Vec<u16>,
}

impl Previews {
    pub(crate) fn new(api: Arc<dyn PlatformApi>, sandbox: String, declared_ports: Vec<u16>) -> Self {
        Self {
            api,
            sandbox,
            declared_ports,
        }
    }

    /// Returns the named preview, creating it if absent.
    ///
    /// `spec.port` must be one of the sandbox's declared ports, or the call
    /// fails with [`Error::InvalidPort`] before reaching the platform. An
    /// existing preview is returned as-is; its spec is not reconciled.
    pub async fn create_if_not_exists(&self, spec: PreviewSpec) -> Result<Preview> {
        validate_ports(&[spec.port])?;
        if !self.declared_ports.contains(&spec.port) {
            return Err(Error::InvalidPort {
                port: spec.port,
                reason: format!("not declared on sandbox '{}'", self.sandbox),
            });
        }

        match self.api.get_preview(&self.sandbox, &spec.name).await {
            Ok(record) => return Ok(self.preview(record)),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        tracing::info!(sandbox = %self.sandbox, preview = %spec.name, port = spec.port, "creating preview");
        match self.api.create_preview(&self.sandbox, &spec).await {
            Ok(record) => Ok(self.preview(record)),
            // Lost a create race; fetch the winner.
            Err(Error::Conflict { .. }) => {
                let record = self.api.get_preview(&self.sandbox, &spec.name).await?;
                Ok(self.preview(record))
            }
            Err(e) => Err(e),
        }
    }

    /// Fails with [`Error::NotFound`] if the preview does not exist.
    pub async fn get(&self, name: &str) -> Result<Preview> {
        let record = self.api.get_preview(&self.sandbox, name).await?;
        Ok(self.preview(record))
    }

    pub async fn list(&self) -> Result<Vec<Preview>> {
        let records = self.api.list_previews(&self.sandbox).await?;
        Ok(records.into_iter().map(|r| self.preview(r)).collect())
    }

    /// Deletes the named preview. Delete-of-absent is success.
    pub async fn delete(&self, name: &str) -> Result<()> {
        match self.api.delete_preview(&self.sandbox, name).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::warn!(sandbox = %self.sandbox, preview = %name, "preview already deleted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn preview(&self, record: PreviewRecord) -> Preview {
        Preview {
            api: Arc::clone(&self.api),
            sandbox: self.sandbox.clone(),
            record,
        }
    }
}

/// Handle to a preview.
#[derive(Clone)]
pub struct Preview {
    api: Arc<dyn PlatformApi>,
    sandbox: String,
    record: PreviewRecord,
}

impl std::fmt::Debug for Preview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preview")
            .field("sandbox", &self.sandbox)
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

impl Preview {
    pub fn name(&self) -> &str {
        &self.record.spec.name
    }

    pub fn port(&self) -> u16 {
        self.record.spec.port
    }

    /// The externally reachable URL.
    pub fn url(&self) -> &str {
        &self.record.url
    }

    pub fn visibility(&self) -> PreviewVisibility {
        self.record.spec.visibility
    }

    /// True for private previews: requests to [`url`](Self::url) must carry
    /// a token minted via [`tokens`](Self::tokens) as a query parameter or
    /// header. Public previews never require one.
    pub fn requires_token(&self) -> bool {
        self.record.spec.visibility == PreviewVisibility::Private
    }

    pub fn record(&self) -> &PreviewRecord {
        &self.record
    }

    /// Access tokens for this preview. Only meaningful for private
    /// previews; the platform rejects token operations on public ones.
    pub fn tokens(&self) -> PreviewTokens {
        PreviewTokens {
            api: Arc::clone(&self.api),
            sandbox: self.sandbox.clone(),
            preview: self.name().to_string(),
        }
    }

    /// Deletes this preview (idempotent).
    pub async fn delete(&self) -> Result<()> {
        match self.api.delete_preview(&self.sandbox, self.name()).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Token sub-resource of a private preview.
pub struct PreviewTokens {
    api: Arc<dyn PlatformApi>,
    sandbox: String,
    preview: String,
}

impl PreviewTokens {
    /// Mints a token valid for `expiry`.
    pub async fn create(&self, expiry: Duration) -> Result<PreviewToken> {
        self.api
            .create_preview_token(&self.sandbox, &self.preview, expiry)
            .await
    }

    pub async fn list(&self) -> Result<Vec<PreviewToken>> {
        self.api
            .list_preview_tokens(&self.sandbox, &self.preview)
            .await
    }

    /// Revokes a token. Revoke-of-absent is success.
    pub async fn delete(&self, token: &str) -> Result<()> {
        match self
            .api
            .delete_preview_token(&self.sandbox, &self.preview, token)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}
