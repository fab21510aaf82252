//! Workspace credential resolution.
//!
//! Credentials come from the first source that yields both a workspace id
//! and an API key, tried in fixed order:
//!
//! 1. logged-in CLI session (`~/.skiff/session.json`)
//! 2. `.env` in the working directory (`SKIFF_WORKSPACE` / `SKIFF_API_KEY`)
//! 3. process environment variables (same names)
//! 4. config file (`~/.skiff/config.json`)
//!
//! Resolution only reads local state; it never mutates stored credentials or
//! the process environment. Resolve once at startup and inject the result
//! into [`Skiff::connect`](crate::Skiff::connect) — there is no ambient
//! global credential.

use serde::Deserialize;
use skiff_core::{Error, Result};
use std::path::Path;

pub const WORKSPACE_VAR: &str = "SKIFF_WORKSPACE";
pub const API_KEY_VAR: &str = "SKIFF_API_KEY";

const SKIFF_DIR: &str = ".skiff";
const SESSION_FILE: &str = "session.json";
const CONFIG_FILE: &str = "config.json";

/// Where a credential was resolved from, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Passed directly by the caller, bypassing resolution.
    Explicit,
    /// Logged-in CLI session file.
    Session,
    /// `.env` file in the working directory.
    DotEnv,
    /// Process environment variables.
    Environment,
    /// On-disk config file.
    ConfigFile,
}

/// A resolved workspace identity. Immutable once resolved.
#[derive(Debug, Clone)]
pub struct Credentials {
    workspace: String,
    api_key: String,
    source: CredentialSource,
}

/// On-disk shape shared by the session and config files. Partial files are
/// treated as an absent source, not an error.
#[derive(Debug, Deserialize)]
struct CredentialFile {
    workspace: Option<String>,
    api_key: Option<String>,
}

impl Credentials {
    /// Builds credentials directly, bypassing source resolution.
    pub fn new(workspace: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            api_key: api_key.into(),
            source: CredentialSource::Explicit,
        }
    }

    /// Resolves credentials from the standard sources.
    ///
    /// Fails with [`Error::Authentication`] if no source yields both a
    /// workspace id and an API key.
    pub fn resolve() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::resolve_from(&cwd, dirs::home_dir().as_deref())
    }

    /// Resolves credentials rooted at an explicit working directory and home
    /// directory. Useful for tests; `resolve` delegates here.
    pub fn resolve_from(cwd: &Path, home: Option<&Path>) -> Result<Self> {
        Self::resolve_inner(cwd, home, &|name| std::env::var(name).ok())
    }

    fn resolve_inner(
        cwd: &Path,
        home: Option<&Path>,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let skiff_dir = home.map(|h| h.join(SKIFF_DIR));

        if let Some(dir) = &skiff_dir {
            if let Some(creds) = from_file(&dir.join(SESSION_FILE), CredentialSource::Session) {
                return Ok(creds);
            }
        }

        if let Some(creds) = from_dotenv(&cwd.join(".env")) {
            return Ok(creds);
        }

        if let (Some(workspace), Some(api_key)) = (env(WORKSPACE_VAR), env(API_KEY_VAR)) {
            tracing::debug!("credentials resolved from process environment");
            return Ok(Self {
                workspace,
                api_key,
                source: CredentialSource::Environment,
            });
        }

        if let Some(dir) = &skiff_dir {
            if let Some(creds) = from_file(&dir.join(CONFIG_FILE), CredentialSource::ConfigFile) {
                return Ok(creds);
            }
        }

        Err(Error::Authentication)
    }

    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

fn from_file(path: &Path, source: CredentialSource) -> Option<Credentials> {
    let contents = std::fs::read_to_string(path).ok()?;
    let file: CredentialFile = match serde_json::from_str(&contents) {
        Ok(file) => file,
        Err(e) => {
            tracing::debug!("skipping malformed credential file {:?}: {}", path, e);
            return None;
        }
    };
    let (workspace, api_key) = (file.workspace?, file.api_key?);
    tracing::debug!("credentials resolved from {:?}", path);
    Some(Credentials {
        workspace,
        api_key,
        source,
    })
}

fn from_dotenv(path: &Path) -> Option<Credentials> {
    let mut workspace = None;
    let mut api_key = None;
    for item in dotenvy::from_path_iter(path).ok()? {
        let (key, value) = match item {
            Ok(pair) => pair,
            Err(e) => {
                tracing::debug!("skipping malformed .env at {:?}: {}", path, e);
                return None;
            }
        };
        match key.as_str() {
            WORKSPACE_VAR => workspace = Some(value),
            API_KEY_VAR => api_key = Some(value),
            _ => {}
        }
    }
    let (workspace, api_key) = (workspace?, api_key?);
    tracing::debug!("credentials resolved from {:?}", path);
    Some(Credentials {
        workspace,
        api_key,
        source: CredentialSource::DotEnv,
    })
}
