//! HTTP implementation of the platform transport.
//!
//! Thin JSON-over-HTTPS client: one method per endpoint, status codes mapped
//! to typed errors (404 → `NotFound`, 409 → `Conflict`, 408/504 →
//! `Timeout`). Authentication is a pair of workspace/API-key headers on
//! every request. The watch endpoint streams newline-delimited JSON events.
//!
//! No retries happen here; retry and polling policy is the SDK's business.

use crate::credentials::Credentials;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::StreamExt;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use skiff_core::{
    DirListing, Error, EventStream, ExecRequest, ExecutionRecord, FindRequest, FsEvent, GrepMatch,
    GrepRequest, PlatformApi, PreviewRecord, PreviewSpec, PreviewToken, ProcessLogs, ProcessRecord,
    ResourceKind, Result, SandboxRecord, SandboxSpec, TaskParams, VolumeRecord, VolumeSpec,
    WatchRequest,
};
use std::time::Duration;

const WORKSPACE_HEADER: &str = "x-skiff-workspace";
const API_KEY_HEADER: &str = "x-skiff-api-key";

#[derive(Serialize)]
struct PathBody<'a> {
    path: &'a str,
}

#[derive(Serialize)]
struct WriteFileBody<'a> {
    path: &'a str,
    /// Base64-encoded file bytes.
    content: String,
}

#[derive(Deserialize)]
struct FileContentBody {
    content: String,
}

#[derive(Deserialize)]
struct PortsBody {
    ports: Vec<u16>,
}

#[derive(Serialize)]
struct TokenCreateBody {
    expires_in_seconds: u64,
}

#[derive(Serialize)]
struct ExecutionCreateBody<'a> {
    tasks: &'a [TaskParams],
}

/// Production [`PlatformApi`] over the platform's REST API.
#[derive(Debug, Clone)]
pub struct HttpApi {
    base_url: String,
    credentials: Credentials,
    client: reqwest::Client,
}

impl HttpApi {
    pub fn new(base_url: String, credentials: Credentials) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            credentials,
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header(WORKSPACE_HEADER, self.credentials.workspace())
            .header(API_KEY_HEADER, self.credentials.api_key())
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        kind: ResourceKind,
        name: &str,
    ) -> Result<reqwest::Response> {
        let resp = builder
            .send()
            .await
            .map_err(|e| Error::Transport(format!("{kind} '{name}': {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            404 => Error::not_found(kind, name),
            409 => Error::Conflict {
                name: name.to_string(),
                reason: body,
            },
            408 | 504 => Error::Timeout(body),
            s => Error::Api { status: s, body },
        })
    }

    async fn json_of<T: DeserializeOwned>(resp: reqwest::Response, what: &str) -> Result<T> {
        resp.json::<T>()
            .await
            .map_err(|e| Error::Transport(format!("failed to parse {what}: {e}")))
    }
}

/// Parses one line of the watch ND-JSON stream. Blank lines are keep-alives.
fn parse_event_line(line: &[u8]) -> Result<Option<FsEvent>> {
    let text = std::str::from_utf8(line)
        .map_err(|e| Error::Transport(format!("malformed watch event: {e}")))?
        .trim();
    if text.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text)
        .map(Some)
        .map_err(|e| Error::Transport(format!("malformed watch event: {e}")))
}

#[async_trait]
impl PlatformApi for HttpApi {
    async fn create_sandbox(&self, spec: &SandboxSpec) -> Result<SandboxRecord> {
        let resp = self
            .send(
                self.request(Method::POST, "/sandboxes").json(spec),
                ResourceKind::Sandbox,
                &spec.name,
            )
            .await?;
        Self::json_of(resp, "sandbox record").await
    }

    async fn get_sandbox(&self, name: &str) -> Result<SandboxRecord> {
        let resp = self
            .send(
                self.request(Method::GET, &format!("/sandboxes/{name}")),
                ResourceKind::Sandbox,
                name,
            )
            .await?;
        Self::json_of(resp, "sandbox record").await
    }

    async fn list_sandboxes(&self) -> Result<Vec<SandboxRecord>> {
        let resp = self
            .send(
                self.request(Method::GET, "/sandboxes"),
                ResourceKind::Sandbox,
                "*",
            )
            .await?;
        Self::json_of(resp, "sandbox list").await
    }

    async fn delete_sandbox(&self, name: &str) -> Result<()> {
        self.send(
            self.request(Method::DELETE, &format!("/sandboxes/{name}")),
            ResourceKind::Sandbox,
            name,
        )
        .await?;
        Ok(())
    }

    async fn create_volume(&self, spec: &VolumeSpec) -> Result<VolumeRecord> {
        let resp = self
            .send(
                self.request(Method::POST, "/volumes").json(spec),
                ResourceKind::Volume,
                &spec.name,
            )
            .await?;
        Self::json_of(resp, "volume record").await
    }

    async fn get_volume(&self, name: &str) -> Result<VolumeRecord> {
        let resp = self
            .send(
                self.request(Method::GET, &format!("/volumes/{name}")),
                ResourceKind::Volume,
                name,
            )
            .await?;
        Self::json_of(resp, "volume record").await
    }

    async fn list_volumes(&self) -> Result<Vec<VolumeRecord>> {
        let resp = self
            .send(
                self.request(Method::GET, "/volumes"),
                ResourceKind::Volume,
                "*",
            )
            .await?;
        Self::json_of(resp, "volume list").await
    }

    async fn delete_volume(&self, name: &str) -> Result<()> {
        self.send(
            self.request(Method::DELETE, &format!("/volumes/{name}")),
            ResourceKind::Volume,
            name,
        )
        .await?;
        Ok(())
    }

    async fn exec(&self, sandbox: &str, req: &ExecRequest) -> Result<ProcessRecord> {
        let resp = self
            .send(
                self.request(Method::POST, &format!("/sandboxes/{sandbox}/processes"))
                    .json(req),
                ResourceKind::Process,
                &req.name,
            )
            .await?;
        Self::json_of(resp, "process record").await
    }

    async fn get_process(&self, sandbox: &str, name: &str) -> Result<ProcessRecord> {
        let resp = self
            .send(
                self.request(
                    Method::GET,
                    &format!("/sandboxes/{sandbox}/processes/{name}"),
                ),
                ResourceKind::Process,
                name,
            )
            .await?;
        Self::json_of(resp, "process record").await
    }

    async fn process_logs(&self, sandbox: &str, name: &str) -> Result<ProcessLogs> {
        let resp = self
            .send(
                self.request(
                    Method::GET,
                    &format!("/sandboxes/{sandbox}/processes/{name}/logs"),
                ),
                ResourceKind::Process,
                name,
            )
            .await?;
        Self::json_of(resp, "process logs").await
    }

    async fn kill_process(&self, sandbox: &str, name: &str) -> Result<()> {
        self.send(
            self.request(
                Method::DELETE,
                &format!("/sandboxes/{sandbox}/processes/{name}"),
            ),
            ResourceKind::Process,
            name,
        )
        .await?;
        Ok(())
    }

    async fn listening_ports(&self, sandbox: &str) -> Result<Vec<u16>> {
        let resp = self
            .send(
                self.request(Method::GET, &format!("/sandboxes/{sandbox}/network/ports")),
                ResourceKind::Sandbox,
                sandbox,
            )
            .await?;
        let body: PortsBody = Self::json_of(resp, "port snapshot").await?;
        Ok(body.ports)
    }

    async fn read_file(&self, sandbox: &str, path: &str) -> Result<Vec<u8>> {
        let resp = self
            .send(
                self.request(Method::POST, &format!("/sandboxes/{sandbox}/fs/read"))
                    .json(&PathBody { path }),
                ResourceKind::Sandbox,
                sandbox,
            )
            .await?;
        let body: FileContentBody = Self::json_of(resp, "file content").await?;
        BASE64
            .decode(body.content)
            .map_err(|e| Error::Transport(format!("malformed file content for {path}: {e}")))
    }

    async fn write_file(&self, sandbox: &str, path: &str, contents: &[u8]) -> Result<()> {
        self.send(
            self.request(Method::POST, &format!("/sandboxes/{sandbox}/fs/write"))
                .json(&WriteFileBody {
                    path,
                    content: BASE64.encode(contents),
                }),
            ResourceKind::Sandbox,
            sandbox,
        )
        .await?;
        Ok(())
    }

    async fn mkdir(&self, sandbox: &str, path: &str) -> Result<()> {
        self.send(
            self.request(Method::POST, &format!("/sandboxes/{sandbox}/fs/mkdir"))
                .json(&PathBody { path }),
            ResourceKind::Sandbox,
            sandbox,
        )
        .await?;
        Ok(())
    }

    async fn list_dir(&self, sandbox: &str, path: &str) -> Result<DirListing> {
        let resp = self
            .send(
                self.request(Method::POST, &format!("/sandboxes/{sandbox}/fs/ls"))
                    .json(&PathBody { path }),
                ResourceKind::Sandbox,
                sandbox,
            )
            .await?;
        Self::json_of(resp, "directory listing").await
    }

    async fn grep(&self, sandbox: &str, req: &GrepRequest) -> Result<Vec<GrepMatch>> {
        let resp = self
            .send(
                self.request(Method::POST, &format!("/sandboxes/{sandbox}/fs/grep"))
                    .json(req),
                ResourceKind::Sandbox,
                sandbox,
            )
            .await?;
        Self::json_of(resp, "grep matches").await
    }

    async fn find(&self, sandbox: &str, req: &FindRequest) -> Result<Vec<String>> {
        let resp = self
            .send(
                self.request(Method::POST, &format!("/sandboxes/{sandbox}/fs/find"))
                    .json(req),
                ResourceKind::Sandbox,
                sandbox,
            )
            .await?;
        Self::json_of(resp, "find results").await
    }

    async fn watch(&self, sandbox: &str, req: &WatchRequest) -> Result<EventStream> {
        let resp = self
            .send(
                self.request(Method::GET, &format!("/sandboxes/{sandbox}/fs/watch"))
                    .query(&[
                        ("path", req.path.as_str()),
                        ("content", if req.include_content { "true" } else { "false" }),
                    ]),
                ResourceKind::Sandbox,
                sandbox,
            )
            .await?;

        let mut bytes = resp.bytes_stream();
        let stream = async_stream::try_stream! {
            let mut buf: Vec<u8> = Vec::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|e| Error::Transport(format!("watch stream: {e}")))?;
                buf.extend_from_slice(&chunk);
                while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    if let Some(event) = parse_event_line(&line)? {
                        yield event;
                    }
                }
            }
        };
        Ok(stream.boxed())
    }

    async fn create_preview(&self, sandbox: &str, spec: &PreviewSpec) -> Result<PreviewRecord> {
        let resp = self
            .send(
                self.request(Method::POST, &format!("/sandboxes/{sandbox}/previews"))
                    .json(spec),
                ResourceKind::Preview,
                &spec.name,
            )
            .await?;
        Self::json_of(resp, "preview record").await
    }

    async fn get_preview(&self, sandbox: &str, name: &str) -> Result<PreviewRecord> {
        let resp = self
            .send(
                self.request(
                    Method::GET,
                    &format!("/sandboxes/{sandbox}/previews/{name}"),
                ),
                ResourceKind::Preview,
                name,
            )
            .await?;
        Self::json_of(resp, "preview record").await
    }

    async fn list_previews(&self, sandbox: &str) -> Result<Vec<PreviewRecord>> {
        let resp = self
            .send(
                self.request(Method::GET, &format!("/sandboxes/{sandbox}/previews")),
                ResourceKind::Preview,
                "*",
            )
            .await?;
        Self::json_of(resp, "preview list").await
    }

    async fn delete_preview(&self, sandbox: &str, name: &str) -> Result<()> {
        self.send(
            self.request(
                Method::DELETE,
                &format!("/sandboxes/{sandbox}/previews/{name}"),
            ),
            ResourceKind::Preview,
            name,
        )
        .await?;
        Ok(())
    }

    async fn create_preview_token(
        &self,
        sandbox: &str,
        preview: &str,
        ttl: Duration,
    ) -> Result<PreviewToken> {
        let resp = self
            .send(
                self.request(
                    Method::POST,
                    &format!("/sandboxes/{sandbox}/previews/{preview}/tokens"),
                )
                .json(&TokenCreateBody {
                    expires_in_seconds: ttl.as_secs(),
                }),
                ResourceKind::PreviewToken,
                preview,
            )
            .await?;
        Self::json_of(resp, "preview token").await
    }

    async fn list_preview_tokens(
        &self,
        sandbox: &str,
        preview: &str,
    ) -> Result<Vec<PreviewToken>> {
        let resp = self
            .send(
                self.request(
                    Method::GET,
                    &format!("/sandboxes/{sandbox}/previews/{preview}/tokens"),
                ),
                ResourceKind::PreviewToken,
                preview,
            )
            .await?;
        Self::json_of(resp, "preview token list").await
    }

    async fn delete_preview_token(&self, sandbox: &str, preview: &str, token: &str) -> Result<()> {
        self.send(
            self.request(
                Method::DELETE,
                &format!("/sandboxes/{sandbox}/previews/{preview}/tokens/{token}"),
            ),
            ResourceKind::PreviewToken,
            token,
        )
        .await?;
        Ok(())
    }

    async fn create_execution(&self, job: &str, tasks: &[TaskParams]) -> Result<ExecutionRecord> {
        let resp = self
            .send(
                self.request(Method::POST, &format!("/jobs/{job}/executions"))
                    .json(&ExecutionCreateBody { tasks }),
                ResourceKind::Execution,
                job,
            )
            .await?;
        Self::json_of(resp, "execution record").await
    }

    async fn get_execution(&self, job: &str, id: &str) -> Result<ExecutionRecord> {
        let resp = self
            .send(
                self.request(Method::GET, &format!("/jobs/{job}/executions/{id}")),
                ResourceKind::Execution,
                id,
            )
            .await?;
        Self::json_of(resp, "execution record").await
    }

    async fn list_executions(&self, job: &str) -> Result<Vec<ExecutionRecord>> {
        let resp = self
            .send(
                self.request(Method::GET, &format!("/jobs/{job}/executions")),
                ResourceKind::Execution,
                "*",
            )
            .await?;
        Self::json_of(resp, "execution list").await
    }

    async fn delete_execution(&self, job: &str, id: &str) -> Result<()> {
        self.send(
            self.request(Method::DELETE, &format!("/jobs/{job}/executions/{id}")),
            ResourceKind::Execution,
            id,
        )
        .await?;
        Ok(())
    }
}
