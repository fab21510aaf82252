//! Filesystem operations proxied into a sandbox.
//!
//! All paths are absolute paths inside the sandbox's file tree. Operations
//! are remote calls; nothing here touches the local filesystem.

use crate::watch::{self, WatchSubscription};
use skiff_core::{
    DirListing, EntryType, FindRequest, FsEvent, GrepMatch, GrepRequest, PlatformApi, Result,
    WatchRequest,
};
use std::sync::Arc;

/// Options for [`SandboxFs::grep`].
#[derive(Debug, Clone, PartialEq)]
pub struct GrepOptions {
    pub case_insensitive: bool,
    /// Context lines captured around each match.
    pub context_lines: u32,
    /// File glob to restrict the search, e.g. `*.rs`.
    pub include: Option<String>,
    /// Directory names skipped during the walk.
    pub exclude_dirs: Vec<String>,
    /// Hard cap on returned matches, enforced client-side as well.
    pub max_results: usize,
}

impl Default for GrepOptions {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            context_lines: 0,
            include: None,
            exclude_dirs: Vec::new(),
            max_results: 100,
        }
    }
}

/// Options for [`SandboxFs::find`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Restrict results to files or directories.
    pub entry_type: Option<EntryType>,
}

/// Options for [`SandboxFs::watch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchOptions {
    /// Attach file content to created/modified events.
    pub include_content: bool,
}

/// Filesystem proxy scoped to one sandbox.
#[derive(Clone)]
pub struct SandboxFs {
    api: Arc<dyn PlatformApi>,
    sandbox: String,
}

impl SandboxFs {
    pub(crate) fn new(api: Arc<dyn PlatformApi>, sandbox: String) -> Self {
        Self { api, sandbox }
    }

    /// Reads a file's bytes.
    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.api.read_file(&self.sandbox, path).await
    }

    /// Reads a file as UTF-8 text.
    pub async fn read_text(&self, path: &str) -> Result<String> {
        let bytes = self.read(path).await?;
        String::from_utf8(bytes).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{path} is not valid UTF-8: {e}"),
            )
            .into()
        })
    }

    /// Writes bytes to a file, creating it if absent.
    pub async fn write(&self, path: &str, contents: &[u8]) -> Result<()> {
        self.api.write_file(&self.sandbox, path, contents).await
    }

    /// Writes UTF-8 text to a file.
    pub async fn write_text(&self, path: &str, contents: &str) -> Result<()> {
        self.write(path, contents.as_bytes()).await
    }

    /// Creates a directory, including missing parents.
    pub async fn mkdir(&self, path: &str) -> Result<()> {
        self.api.mkdir(&self.sandbox, path).await
    }

    /// Lists a directory: subdirectories and files as separate ordered
    /// sequences.
    pub async fn ls(&self, path: &str) -> Result<DirListing> {
        self.api.list_dir(&self.sandbox, path).await
    }

    /// Recursive text search under `path`.
    ///
    /// Never returns more than `options.max_results` matches, even if the
    /// platform over-returns.
    pub async fn grep(
        &self,
        pattern: &str,
        path: &str,
        options: GrepOptions,
    ) -> Result<Vec<GrepMatch>> {
        let max_results = options.max_results;
        let request = GrepRequest {
            pattern: pattern.to_string(),
            path: path.to_string(),
            case_insensitive: options.case_insensitive,
            context_lines: options.context_lines,
            include: options.include,
            exclude_dirs: options.exclude_dirs,
            max_results,
        };
        let mut matches = self.api.grep(&self.sandbox, &request).await?;
        matches.truncate(max_results);
        Ok(matches)
    }

    /// Recursive find by name glob under `path`.
    pub async fn find(
        &self,
        pattern: &str,
        path: &str,
        options: FindOptions,
    ) -> Result<Vec<String>> {
        let request = FindRequest {
            pattern: pattern.to_string(),
            path: path.to_string(),
            entry_type: options.entry_type,
        };
        self.api.find(&self.sandbox, &request).await
    }

    /// Subscribes to filesystem changes under `path`.
    ///
    /// `handler` is invoked once per event, in stream order, from a
    /// dedicated dispatch task — the caller's thread of control is never
    /// blocked. The subscription stands until
    /// [`WatchSubscription::close`] is awaited; after `close` returns, no
    /// further handler invocation is observed.
    pub async fn watch<F>(
        &self,
        path: &str,
        options: WatchOptions,
        handler: F,
    ) -> Result<WatchSubscription>
    where
        F: FnMut(FsEvent) + Send + 'static,
    {
        let request = WatchRequest {
            path: path.to_string(),
            include_content: options.include_content,
        };
        let stream = self.api.watch(&self.sandbox, &request).await?;
        tracing::debug!(sandbox = %self.sandbox, path = %path, "watch subscription opened");
        Ok(watch::spawn(stream, handler))
    }
}
