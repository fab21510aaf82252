//! In-memory platform for tests.
//!
//! [`MockApi`] implements [`PlatformApi`] against local state, with knobs to
//! script the behaviors the SDK has to cope with: delayed provisioning,
//! failing commands, ports that start listening late, executions that never
//! finish. Wire it in with [`Skiff::with_api`](crate::Skiff::with_api).

use async_trait::async_trait;
use futures::StreamExt as _;
use skiff_core::{
    DirListing, EntryType, Error, EventStream, ExecRequest, ExecutionRecord, ExecutionStatus,
    FindRequest, FsEvent, FsEventKind, GrepMatch, GrepRequest, PlatformApi, PreviewRecord,
    PreviewSpec, PreviewToken, ProcessLogs, ProcessRecord, ProcessState, ResourceKind,
    ResourceState, Result, SandboxRecord, SandboxSpec, TaskParams, VolumeRecord, VolumeSpec,
    WatchRequest,
};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

struct MockWatcher {
    sandbox: String,
    path: String,
    include_content: bool,
    tx: mpsc::UnboundedSender<Result<FsEvent>>,
}

#[derive(Default)]
struct MockState {
    sandboxes: HashMap<String, SandboxRecord>,
    sandbox_ready_after: HashMap<String, u32>,
    provisioning_failures: HashSet<String>,
    create_sandbox_calls: u32,

    volumes: HashMap<String, VolumeRecord>,

    processes: HashMap<(String, String), ProcessRecord>,
    stale_process_reads: HashMap<(String, String), (ProcessRecord, u32)>,
    process_read_lag: u32,
    launch_counts: HashMap<(String, String), u32>,
    exit_codes: HashMap<String, i32>,
    exit_queues: HashMap<String, VecDeque<i32>>,
    long_running: HashSet<String>,
    stdout: HashMap<String, String>,

    listening: HashMap<String, Vec<u16>>,
    listening_after: HashMap<(String, u16), u32>,

    files: BTreeMap<(String, String), Vec<u8>>,
    dirs: BTreeSet<(String, String)>,
    watchers: Vec<MockWatcher>,

    previews: HashMap<(String, String), PreviewRecord>,
    tokens: HashMap<(String, String), Vec<PreviewToken>>,

    executions: HashMap<String, ExecutionRecord>,
    execution_polls: HashMap<String, u32>,
    executions_complete_after: u32,
    next_execution: u32,
}

/// Scriptable in-memory stand-in for the platform.
#[derive(Default)]
pub struct MockApi {
    state: Mutex<MockState>,
}

/// A fresh mock platform and a client wired to it.
pub fn mock_client() -> (Arc<MockApi>, crate::Skiff) {
    let api = Arc::new(MockApi::new());
    let client = crate::Skiff::with_api(api.clone());
    (api, client)
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Scripting knobs ─────────────────────────────────────────────

    /// Sandbox `name` reports `provisioning` for the next `polls` gets.
    pub fn set_ready_after(&self, name: &str, polls: u32) {
        let mut state = self.state.lock().unwrap();
        state.sandbox_ready_after.insert(name.to_string(), polls);
    }

    /// Creating sandbox `name` ends in a provisioning failure.
    pub fn fail_provisioning(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.provisioning_failures.insert(name.to_string());
    }

    /// Every launch of `command` exits with `code`.
    pub fn set_exit_code(&self, command: &str, code: i32) {
        let mut state = self.state.lock().unwrap();
        state.exit_codes.insert(command.to_string(), code);
    }

    /// The next launches of `command` exit with these codes, one per launch,
    /// before falling back to [`set_exit_code`](Self::set_exit_code) or 0.
    pub fn queue_exit_codes(&self, command: &str, codes: impl IntoIterator<Item = i32>) {
        let mut state = self.state.lock().unwrap();
        state
            .exit_queues
            .insert(command.to_string(), codes.into_iter().collect());
    }

    /// After each relaunch, the next `polls` status reads still report the
    /// replaced run's record, as a lagging server would.
    pub fn set_process_read_lag(&self, polls: u32) {
        let mut state = self.state.lock().unwrap();
        state.process_read_lag = polls;
    }

    /// `command` stays in `running` until killed.
    pub fn set_long_running(&self, command: &str) {
        let mut state = self.state.lock().unwrap();
        state.long_running.insert(command.to_string());
    }

    /// Captured stdout reported for `command`.
    pub fn set_stdout(&self, command: &str, stdout: &str) {
        let mut state = self.state.lock().unwrap();
        state.stdout.insert(command.to_string(), stdout.to_string());
    }

    /// `port` shows up as listening in `sandbox` immediately.
    pub fn set_listening(&self, sandbox: &str, port: u16) {
        let mut state = self.state.lock().unwrap();
        state.listening.entry(sandbox.to_string()).or_default().push(port);
    }

    /// `port` shows up as listening only after `polls` port snapshots.
    pub fn set_listening_after(&self, sandbox: &str, port: u16, polls: u32) {
        let mut state = self.state.lock().unwrap();
        state
            .listening_after
            .insert((sandbox.to_string(), port), polls);
    }

    /// Executions reach `completed` only after `polls` status gets;
    /// `u32::MAX` means never.
    pub fn set_executions_complete_after(&self, polls: u32) {
        let mut state = self.state.lock().unwrap();
        state.executions_complete_after = polls;
    }

    /// Pushes an arbitrary event to matching watch subscriptions, as if the
    /// change happened inside the sandbox.
    pub fn emit_fs_event(&self, sandbox: &str, event: FsEvent) {
        let mut state = self.state.lock().unwrap();
        Self::dispatch_event(&mut state, sandbox, event);
    }

    // ── Assertion helpers ───────────────────────────────────────────

    /// How many times `create_sandbox` was called.
    pub fn create_sandbox_calls(&self) -> u32 {
        self.state.lock().unwrap().create_sandbox_calls
    }

    /// How many times the named process was launched (including restarts).
    pub fn launch_count(&self, sandbox: &str, name: &str) -> u32 {
        let state = self.state.lock().unwrap();
        state
            .launch_counts
            .get(&(sandbox.to_string(), name.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// How many times an execution's status was fetched.
    pub fn execution_polls(&self, id: &str) -> u32 {
        let state = self.state.lock().unwrap();
        state.execution_polls.get(id).copied().unwrap_or(0)
    }

    // ── Internals ───────────────────────────────────────────────────

    fn dispatch_event(state: &mut MockState, sandbox: &str, event: FsEvent) {
        state.watchers.retain(|watcher| {
            if watcher.sandbox != sandbox || !event.path.starts_with(&watcher.path) {
                return true;
            }
            let mut delivered = event.clone();
            if !watcher.include_content {
                delivered.content = None;
            }
            watcher.tx.send(Ok(delivered)).is_ok()
        });
    }

    fn require_sandbox(state: &MockState, sandbox: &str) -> Result<()> {
        if state.sandboxes.contains_key(sandbox) {
            return Ok(());
        }
        Err(Error::not_found(ResourceKind::Sandbox, sandbox))
    }
}

/// Minimal glob: `*` matches any run of characters, everything else is
/// literal.
fn glob_match(pattern: &str, name: &str) -> bool {
    fn inner(p: &[u8], n: &[u8]) -> bool {
        match p.first() {
            None => n.is_empty(),
            Some(b'*') => inner(&p[1..], n) || (!n.is_empty() && inner(p, &n[1..])),
            Some(c) => n.first() == Some(c) && inner(&p[1..], &n[1..]),
        }
    }
    inner(pattern.as_bytes(), name.as_bytes())
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[async_trait]
impl PlatformApi for MockApi {
    async fn create_sandbox(&self, spec: &SandboxSpec) -> Result<SandboxRecord> {
        let mut state = self.state.lock().unwrap();
        state.create_sandbox_calls += 1;
        if state.sandboxes.contains_key(&spec.name) {
            return Err(Error::Conflict {
                name: spec.name.clone(),
                reason: "sandbox already exists".to_string(),
            });
        }
        let failing = state.provisioning_failures.contains(&spec.name);
        let pending = state.sandbox_ready_after.get(&spec.name).copied().unwrap_or(0);
        let record = SandboxRecord {
            spec: spec.clone(),
            state: if failing || pending > 0 {
                ResourceState::Provisioning
            } else {
                ResourceState::Ready
            },
            status_message: None,
        };
        state.sandboxes.insert(spec.name.clone(), record.clone());
        Ok(record)
    }

    async fn get_sandbox(&self, name: &str) -> Result<SandboxRecord> {
        let mut state = self.state.lock().unwrap();
        if !state.sandboxes.contains_key(name) {
            return Err(Error::not_found(ResourceKind::Sandbox, name));
        }

        let pending = state.sandbox_ready_after.get(name).copied().unwrap_or(0);
        if pending > 0 {
            state.sandbox_ready_after.insert(name.to_string(), pending - 1);
        } else if state.provisioning_failures.contains(name) {
            let record = state.sandboxes.get_mut(name).expect("checked above");
            record.state = ResourceState::Failed;
            record.status_message = Some("image pull failed".to_string());
        } else {
            state.sandboxes.get_mut(name).expect("checked above").state = ResourceState::Ready;
        }
        Ok(state.sandboxes.get(name).expect("checked above").clone())
    }

    async fn list_sandboxes(&self) -> Result<Vec<SandboxRecord>> {
        let state = self.state.lock().unwrap();
        let mut records: Vec<_> = state.sandboxes.values().cloned().collect();
        records.sort_by(|a, b| a.spec.name.cmp(&b.spec.name));
        Ok(records)
    }

    async fn delete_sandbox(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.sandboxes.remove(name).is_none() {
            return Err(Error::not_found(ResourceKind::Sandbox, name));
        }
        Ok(())
    }

    async fn create_volume(&self, spec: &VolumeSpec) -> Result<VolumeRecord> {
        let mut state = self.state.lock().unwrap();
        if state.volumes.contains_key(&spec.name) {
            return Err(Error::Conflict {
                name: spec.name.clone(),
                reason: "volume already exists".to_string(),
            });
        }
        let record = VolumeRecord {
            spec: spec.clone(),
            state: ResourceState::Ready,
            status_message: None,
        };
        state.volumes.insert(spec.name.clone(), record.clone());
        Ok(record)
    }

    async fn get_volume(&self, name: &str) -> Result<VolumeRecord> {
        let state = self.state.lock().unwrap();
        state
            .volumes
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(ResourceKind::Volume, name))
    }

    async fn list_volumes(&self) -> Result<Vec<VolumeRecord>> {
        let state = self.state.lock().unwrap();
        let mut records: Vec<_> = state.volumes.values().cloned().collect();
        records.sort_by(|a, b| a.spec.name.cmp(&b.spec.name));
        Ok(records)
    }

    async fn delete_volume(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.volumes.remove(name).is_none() {
            return Err(Error::not_found(ResourceKind::Volume, name));
        }
        Ok(())
    }

    async fn exec(&self, sandbox: &str, req: &ExecRequest) -> Result<ProcessRecord> {
        let mut state = self.state.lock().unwrap();
        Self::require_sandbox(&state, sandbox)?;

        let key = (sandbox.to_string(), req.name.clone());
        if let Some(existing) = state.processes.get(&key) {
            if !existing.state.is_terminal() {
                return Err(Error::Conflict {
                    name: req.name.clone(),
                    reason: "process is still running".to_string(),
                });
            }
            if state.process_read_lag > 0 {
                let stale = (existing.clone(), state.process_read_lag);
                state.stale_process_reads.insert(key.clone(), stale);
            }
        }

        *state.launch_counts.entry(key.clone()).or_insert(0) += 1;

        let (proc_state, exit_code) = if state.long_running.contains(&req.command) {
            (ProcessState::Running, None)
        } else {
            let queued = state
                .exit_queues
                .get_mut(&req.command)
                .and_then(VecDeque::pop_front);
            let code = queued
                .or_else(|| state.exit_codes.get(&req.command).copied())
                .unwrap_or(0);
            if code == 0 {
                (ProcessState::Completed, Some(0))
            } else {
                (ProcessState::Failed, Some(code))
            }
        };

        let record = ProcessRecord {
            name: req.name.clone(),
            command: req.command.clone(),
            working_dir: req.working_dir.clone(),
            state: proc_state,
            exit_code,
        };
        state.processes.insert(key, record.clone());
        Ok(record)
    }

    async fn get_process(&self, sandbox: &str, name: &str) -> Result<ProcessRecord> {
        let mut state = self.state.lock().unwrap();
        let key = (sandbox.to_string(), name.to_string());
        if let Some((stale, remaining)) = state.stale_process_reads.remove(&key) {
            if remaining > 1 {
                state
                    .stale_process_reads
                    .insert(key.clone(), (stale.clone(), remaining - 1));
            }
            return Ok(stale);
        }
        state
            .processes
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::not_found(ResourceKind::Process, name))
    }

    async fn process_logs(&self, sandbox: &str, name: &str) -> Result<ProcessLogs> {
        let state = self.state.lock().unwrap();
        let record = state
            .processes
            .get(&(sandbox.to_string(), name.to_string()))
            .ok_or_else(|| Error::not_found(ResourceKind::Process, name))?;
        Ok(ProcessLogs {
            stdout: state.stdout.get(&record.command).cloned().unwrap_or_default(),
            stderr: String::new(),
        })
    }

    async fn kill_process(&self, sandbox: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let record = state
            .processes
            .get_mut(&(sandbox.to_string(), name.to_string()))
            .ok_or_else(|| Error::not_found(ResourceKind::Process, name))?;
        if !record.state.is_terminal() {
            record.state = ProcessState::Killed;
        }
        Ok(())
    }

    async fn listening_ports(&self, sandbox: &str) -> Result<Vec<u16>> {
        let mut state = self.state.lock().unwrap();
        Self::require_sandbox(&state, sandbox)?;

        let mut ports: Vec<u16> = state
            .listening
            .get(sandbox)
            .cloned()
            .unwrap_or_default();

        for ((sb, port), remaining) in state.listening_after.iter_mut() {
            if sb != sandbox {
                continue;
            }
            if *remaining == 0 {
                ports.push(*port);
            } else {
                *remaining -= 1;
            }
        }
        ports.sort_unstable();
        Ok(ports)
    }

    async fn read_file(&self, sandbox: &str, path: &str) -> Result<Vec<u8>> {
        let state = self.state.lock().unwrap();
        Self::require_sandbox(&state, sandbox)?;
        state
            .files
            .get(&(sandbox.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| Error::not_found(ResourceKind::File, path))
    }

    async fn write_file(&self, sandbox: &str, path: &str, contents: &[u8]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::require_sandbox(&state, sandbox)?;
        let key = (sandbox.to_string(), path.to_string());
        let existed = state.files.contains_key(&key);
        state.files.insert(key, contents.to_vec());
        let event = FsEvent {
            kind: if existed {
                FsEventKind::Modified
            } else {
                FsEventKind::Created
            },
            path: path.to_string(),
            content: Some(contents.to_vec()),
        };
        Self::dispatch_event(&mut state, sandbox, event);
        Ok(())
    }

    async fn mkdir(&self, sandbox: &str, path: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        Self::require_sandbox(&state, sandbox)?;
        state.dirs.insert((sandbox.to_string(), path.to_string()));
        Ok(())
    }

    async fn list_dir(&self, sandbox: &str, path: &str) -> Result<DirListing> {
        let state = self.state.lock().unwrap();
        Self::require_sandbox(&state, sandbox)?;

        let prefix = format!("{}/", path.trim_end_matches('/'));
        let mut dirs = BTreeSet::new();
        let mut files = BTreeSet::new();

        for (sb, file_path) in state.files.keys() {
            if sb != sandbox || !file_path.starts_with(&prefix) {
                continue;
            }
            let rest = &file_path[prefix.len()..];
            match rest.split_once('/') {
                Some((dir, _)) => {
                    dirs.insert(dir.to_string());
                }
                None => {
                    files.insert(rest.to_string());
                }
            }
        }
        for (sb, dir_path) in &state.dirs {
            if sb != sandbox || !dir_path.starts_with(&prefix) {
                continue;
            }
            let rest = &dir_path[prefix.len()..];
            let first = rest.split('/').next().unwrap_or(rest);
            if !first.is_empty() {
                dirs.insert(first.to_string());
            }
        }

        Ok(DirListing {
            dirs: dirs.into_iter().collect(),
            files: files.into_iter().collect(),
        })
    }

    /// Returns every match; the SDK enforces the `max_results` cap.
    async fn grep(&self, sandbox: &str, req: &GrepRequest) -> Result<Vec<GrepMatch>> {
        let state = self.state.lock().unwrap();
        Self::require_sandbox(&state, sandbox)?;

        let needle = if req.case_insensitive {
            req.pattern.to_lowercase()
        } else {
            req.pattern.clone()
        };
        let prefix = format!("{}/", req.path.trim_end_matches('/'));
        let mut matches = Vec::new();

        for ((sb, file_path), contents) in &state.files {
            if sb != sandbox || !(file_path.starts_with(&prefix) || file_path == &req.path) {
                continue;
            }
            if req
                .exclude_dirs
                .iter()
                .any(|dir| file_path.split('/').any(|seg| seg == dir))
            {
                continue;
            }
            if let Some(include) = &req.include {
                if !glob_match(include, basename(file_path)) {
                    continue;
                }
            }
            let Ok(text) = std::str::from_utf8(contents) else {
                continue;
            };
            let lines: Vec<&str> = text.lines().collect();
            for (idx, line) in lines.iter().enumerate() {
                let haystack = if req.case_insensitive {
                    line.to_lowercase()
                } else {
                    (*line).to_string()
                };
                if !haystack.contains(&needle) {
                    continue;
                }
                let ctx = req.context_lines as usize;
                let before_start = idx.saturating_sub(ctx);
                let after_end = (idx + 1 + ctx).min(lines.len());
                matches.push(GrepMatch {
                    file: file_path.clone(),
                    line: (idx + 1) as u64,
                    text: (*line).to_string(),
                    context_before: lines[before_start..idx]
                        .iter()
                        .map(|l| (*l).to_string())
                        .collect(),
                    context_after: lines[idx + 1..after_end]
                        .iter()
                        .map(|l| (*l).to_string())
                        .collect(),
                });
            }
        }
        Ok(matches)
    }

    async fn find(&self, sandbox: &str, req: &FindRequest) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        Self::require_sandbox(&state, sandbox)?;

        let prefix = format!("{}/", req.path.trim_end_matches('/'));
        let mut results = Vec::new();

        if req.entry_type != Some(EntryType::Directory) {
            for (sb, file_path) in state.files.keys() {
                if sb == sandbox
                    && file_path.starts_with(&prefix)
                    && glob_match(&req.pattern, basename(file_path))
                {
                    results.push(file_path.clone());
                }
            }
        }
        if req.entry_type != Some(EntryType::File) {
            for (sb, dir_path) in &state.dirs {
                if sb == sandbox
                    && dir_path.starts_with(&prefix)
                    && glob_match(&req.pattern, basename(dir_path))
                {
                    results.push(dir_path.clone());
                }
            }
        }
        results.sort();
        Ok(results)
    }

    async fn watch(&self, sandbox: &str, req: &WatchRequest) -> Result<EventStream> {
        let mut state = self.state.lock().unwrap();
        Self::require_sandbox(&state, sandbox)?;
        let (tx, rx) = mpsc::unbounded_channel();
        state.watchers.push(MockWatcher {
            sandbox: sandbox.to_string(),
            path: req.path.clone(),
            include_content: req.include_content,
            tx,
        });
        Ok(UnboundedReceiverStream::new(rx).boxed())
    }

    async fn create_preview(&self, sandbox: &str, spec: &PreviewSpec) -> Result<PreviewRecord> {
        let mut state = self.state.lock().unwrap();
        let declared = state
            .sandboxes
            .get(sandbox)
            .ok_or_else(|| Error::not_found(ResourceKind::Sandbox, sandbox))?
            .spec
            .ports
            .clone();
        if !declared.contains(&spec.port) {
            return Err(Error::InvalidPort {
                port: spec.port,
                reason: format!("not declared on sandbox '{sandbox}'"),
            });
        }
        let key = (sandbox.to_string(), spec.name.clone());
        if state.previews.contains_key(&key) {
            return Err(Error::Conflict {
                name: spec.name.clone(),
                reason: "preview already exists".to_string(),
            });
        }
        let host_prefix = spec
            .prefix
            .as_ref()
            .map(|p| format!("{p}-"))
            .unwrap_or_default();
        let record = PreviewRecord {
            spec: spec.clone(),
            url: format!(
                "https://{host_prefix}{}-{sandbox}.preview.skiff.dev",
                spec.name
            ),
        };
        state.previews.insert(key, record.clone());
        Ok(record)
    }

    async fn get_preview(&self, sandbox: &str, name: &str) -> Result<PreviewRecord> {
        let state = self.state.lock().unwrap();
        state
            .previews
            .get(&(sandbox.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| Error::not_found(ResourceKind::Preview, name))
    }

    async fn list_previews(&self, sandbox: &str) -> Result<Vec<PreviewRecord>> {
        let state = self.state.lock().unwrap();
        let mut records: Vec<_> = state
            .previews
            .iter()
            .filter(|((sb, _), _)| sb == sandbox)
            .map(|(_, record)| record.clone())
            .collect();
        records.sort_by(|a, b| a.spec.name.cmp(&b.spec.name));
        Ok(records)
    }

    async fn delete_preview(&self, sandbox: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state
            .previews
            .remove(&(sandbox.to_string(), name.to_string()))
            .is_none()
        {
            return Err(Error::not_found(ResourceKind::Preview, name));
        }
        Ok(())
    }

    async fn create_preview_token(
        &self,
        sandbox: &str,
        preview: &str,
        ttl: Duration,
    ) -> Result<PreviewToken> {
        let mut state = self.state.lock().unwrap();
        let key = (sandbox.to_string(), preview.to_string());
        if !state.previews.contains_key(&key) {
            return Err(Error::not_found(ResourceKind::Preview, preview));
        }
        let token = PreviewToken {
            value: Uuid::new_v4().to_string(),
            expires_at: Some(unix_now() + ttl.as_secs()),
        };
        state.tokens.entry(key).or_default().push(token.clone());
        Ok(token)
    }

    async fn list_preview_tokens(
        &self,
        sandbox: &str,
        preview: &str,
    ) -> Result<Vec<PreviewToken>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tokens
            .get(&(sandbox.to_string(), preview.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_preview_token(&self, sandbox: &str, preview: &str, token: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let tokens = state
            .tokens
            .get_mut(&(sandbox.to_string(), preview.to_string()))
            .ok_or_else(|| Error::not_found(ResourceKind::PreviewToken, token))?;
        let before = tokens.len();
        tokens.retain(|t| t.value != token);
        if tokens.len() == before {
            return Err(Error::not_found(ResourceKind::PreviewToken, token));
        }
        Ok(())
    }

    async fn create_execution(&self, job: &str, tasks: &[TaskParams]) -> Result<ExecutionRecord> {
        let mut state = self.state.lock().unwrap();
        state.next_execution += 1;
        let id = format!("exec-{}", state.next_execution);
        let status = if state.executions_complete_after == 0 {
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::Pending
        };
        let record = ExecutionRecord {
            id: id.clone(),
            job: job.to_string(),
            tasks: tasks.to_vec(),
            status,
            metadata: serde_json::Map::new(),
        };
        state.executions.insert(id, record.clone());
        Ok(record)
    }

    async fn get_execution(&self, _job: &str, id: &str) -> Result<ExecutionRecord> {
        let mut state = self.state.lock().unwrap();
        let polls = state.execution_polls.entry(id.to_string()).or_insert(0);
        *polls += 1;
        let polls = *polls;

        let complete_after = state.executions_complete_after;
        let record = state
            .executions
            .get_mut(id)
            .ok_or_else(|| Error::not_found(ResourceKind::Execution, id))?;
        if !record.status.is_terminal() {
            record.status = if complete_after != u32::MAX && polls >= complete_after {
                ExecutionStatus::Completed
            } else {
                ExecutionStatus::Running
            };
        }
        Ok(record.clone())
    }

    async fn list_executions(&self, job: &str) -> Result<Vec<ExecutionRecord>> {
        let state = self.state.lock().unwrap();
        let mut records: Vec<_> = state
            .executions
            .values()
            .filter(|record| record.job == job)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn delete_execution(&self, _job: &str, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.executions.remove(id).is_none() {
            return Err(Error::not_found(ResourceKind::Execution, id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_star_matches_any_run() {
        assert!(glob_match("*.rs", "main.rs"));
        assert!(glob_match("config.*", "config.json"));
        assert!(glob_match("*", "anything"));
        assert!(!glob_match("*.rs", "main.py"));
    }

    #[test]
    fn glob_literal_is_exact() {
        assert!(glob_match("main.rs", "main.rs"));
        assert!(!glob_match("main.rs", "main.rss"));
    }

    #[test]
    fn basename_takes_last_segment() {
        assert_eq!(basename("/app/src/main.rs"), "main.rs");
        assert_eq!(basename("main.rs"), "main.rs");
    }
}
