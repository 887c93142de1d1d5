//! Live state of one editor: files, timers, the frame, and the last result.
//!
//! Hot-reload presets re-render a short while after the last edit; manual
//! presets wait for [`PreviewSession::run`]. Saves are debounced per file.
//! Timers hold only a weak reference to the session, so dropping or
//! unmounting it leaves nothing running.

use crate::config::PreviewConfig;
use crate::debounce::DebouncedTask;
use crate::error::SessionError;
use crate::host::SandboxHost;
use crate::loader::RuntimeLoader;
use crate::seed::{seed_files, SeedRequest, SeedSource};
use crate::store::ProjectStore;
use sandpad_preview::{
    decode_relay, resolve_preset, synthesize, CdnTable, ExecutionResult, LanguagePreset,
    PreviewResult, ProjectFile, ProjectKey, SandboxPolicy, SynthOptions,
};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewState {
    Idle,
    Scheduled,
    LoadingRuntime,
    Rendering,
    AwaitingManualRun,
}

/// What to open: the project, where its section sits in the course, and the
/// caller's starter content.
#[derive(Debug, Clone)]
pub struct MountRequest {
    pub key: ProjectKey,
    /// Section ids of the subject, in course order.
    pub section_order: Vec<String>,
    pub starter_overrides: HashMap<String, String>,
    /// Standard input passed to the C harness.
    pub stdin: Option<String>,
}

impl MountRequest {
    pub fn new(key: ProjectKey) -> Self {
        Self {
            key,
            section_order: Vec::new(),
            starter_overrides: HashMap::new(),
            stdin: None,
        }
    }
}

struct Shared {
    files: Vec<ProjectFile>,
    active_file: String,
    state: PreviewState,
    last_snapshot: Option<String>,
    last_result: Option<ExecutionResult>,
    current_run_id: Option<String>,
    stdin: Option<String>,
    /// An edit asked for a render that has not started yet.
    render_requested: bool,
    dirty: HashSet<String>,
    disposed: bool,
}

struct Inner {
    id: Uuid,
    key: ProjectKey,
    preset: &'static LanguagePreset,
    store: Arc<dyn ProjectStore>,
    loader: Arc<RuntimeLoader>,
    cdn: CdnTable,
    host: Mutex<Box<dyn SandboxHost>>,
    render_timer: DebouncedTask,
    save_timers: HashMap<String, DebouncedTask>,
    /// Serializes renders; a timer render and an explicit run never overlap.
    render_gate: tokio::sync::Mutex<()>,
    render_seq: AtomicU64,
    shared: Mutex<Shared>,
}

pub struct PreviewSession {
    inner: Arc<Inner>,
}

/// sha-256 over every file name and body.
pub fn snapshot_hash(files: &[ProjectFile]) -> String {
    let mut hasher = Sha256::new();
    for f in files {
        hasher.update(f.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(f.content.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

impl PreviewSession {
    /// Seed the files and, for hot-reload presets, render once.
    /// Must be called from within a tokio runtime.
    pub async fn mount(
        req: MountRequest,
        store: Arc<dyn ProjectStore>,
        loader: Arc<RuntimeLoader>,
        host: Box<dyn SandboxHost>,
        config: &PreviewConfig,
    ) -> PreviewSession {
        let preset = resolve_preset(&req.key.preset_id);
        let seeded = seed_files(
            store.as_ref(),
            &SeedRequest {
                key: &req.key,
                preset,
                section_order: &req.section_order,
                starter_overrides: &req.starter_overrides,
            },
        );
        if host.policy() != SandboxPolicy::for_surface(preset.surface) {
            tracing::warn!(
                "Host sandbox policy '{}' differs from the {} preset's surface",
                host.policy().attribute(),
                preset.id
            );
        }

        let id = Uuid::new_v4();
        let save_timers = seeded
            .files
            .iter()
            .map(|f| {
                let task = DebouncedTask::new(format!("save {}", f.name), config.save_debounce());
                (f.name.clone(), task)
            })
            .collect();
        let active_file = seeded
            .files
            .first()
            .map(|f| f.name.clone())
            .unwrap_or_default();
        let resting = if preset.hot_reload {
            PreviewState::Idle
        } else {
            PreviewState::AwaitingManualRun
        };
        tracing::info!(
            "[session {}] mounted {} for {}/{} ({})",
            id,
            preset.id,
            req.key.subject_id,
            req.key.section_id,
            match &seeded.source {
                SeedSource::Saved => "saved".to_string(),
                SeedSource::Inherited { section_id } => format!("inherited from {}", section_id),
                SeedSource::Starter => "starter".to_string(),
            }
        );

        let inner = Arc::new(Inner {
            id,
            key: req.key,
            preset,
            store,
            cdn: loader.cdn().clone(),
            loader,
            host: Mutex::new(host),
            render_timer: DebouncedTask::new("render", config.render_debounce()),
            save_timers,
            render_gate: tokio::sync::Mutex::new(()),
            render_seq: AtomicU64::new(0),
            shared: Mutex::new(Shared {
                files: seeded.files,
                active_file,
                state: resting,
                last_snapshot: None,
                last_result: None,
                current_run_id: None,
                stdin: req.stdin,
                render_requested: false,
                dirty: HashSet::new(),
                disposed: false,
            }),
        });

        if preset.hot_reload {
            inner.render(false).await;
        }
        PreviewSession { inner }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn preset(&self) -> &'static LanguagePreset {
        self.inner.preset
    }

    pub fn state(&self) -> PreviewState {
        self.inner.lock().state
    }

    pub fn files(&self) -> Vec<ProjectFile> {
        self.inner.lock().files.clone()
    }

    pub fn active_file(&self) -> String {
        self.inner.lock().active_file.clone()
    }

    pub fn last_result(&self) -> Option<ExecutionResult> {
        self.inner.lock().last_result.clone()
    }

    /// Run id of the document currently in the frame.
    pub fn current_run_id(&self) -> Option<String> {
        self.inner.lock().current_run_id.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }

    pub fn set_active_file(&self, name: &str) -> Result<(), SessionError> {
        let mut shared = self.inner.lock();
        if shared.disposed {
            return Err(SessionError::Disposed);
        }
        if !shared.files.iter().any(|f| f.name == name) {
            return Err(SessionError::UnknownFile(name.to_string()));
        }
        shared.active_file = name.to_string();
        Ok(())
    }

    pub fn set_stdin(&self, stdin: Option<String>) {
        self.inner.lock().stdin = stdin;
    }

    /// Replace a file's content, schedule its save and, for hot-reload
    /// presets, a render. Must be called from within a tokio runtime.
    pub fn edit(&self, name: &str, content: impl Into<String>) -> Result<(), SessionError> {
        let inner = &self.inner;
        let mut shared = inner.lock();
        if shared.disposed {
            return Err(SessionError::Disposed);
        }
        let file = shared
            .files
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| SessionError::UnknownFile(name.to_string()))?;
        file.set_content(content.into());
        shared.dirty.insert(name.to_string());

        if let Some(timer) = inner.save_timers.get(name) {
            let weak = Arc::downgrade(inner);
            let file_name = name.to_string();
            timer.schedule(async move {
                if let Some(inner) = weak.upgrade() {
                    inner.flush_file(&file_name);
                }
            });
        }

        if !inner.preset.hot_reload {
            return Ok(());
        }
        let snapshot = snapshot_hash(&shared.files);
        if shared.last_snapshot.as_deref() == Some(snapshot.as_str()) {
            inner.render_timer.cancel();
            shared.render_requested = false;
            shared.state = PreviewState::Idle;
            tracing::debug!("[session {}] back to rendered snapshot, render cancelled", inner.id);
        } else {
            shared.state = PreviewState::Scheduled;
            shared.render_requested = true;
            let weak: Weak<Inner> = Arc::downgrade(inner);
            inner.render_timer.schedule(async move {
                if let Some(inner) = weak.upgrade() {
                    inner.render(false).await;
                }
            });
        }
        Ok(())
    }

    /// Explicit run: drop any pending render, make sure the runtime is
    /// loaded, and render the current files.
    pub async fn run(&self) -> Result<(), SessionError> {
        {
            let mut shared = self.inner.lock();
            if shared.disposed {
                return Err(SessionError::Disposed);
            }
            shared.render_requested = false;
        }
        self.inner.render_timer.cancel();
        self.inner.render(true).await;
        Ok(())
    }

    /// Take a result message from the frame. Returns whether it was accepted;
    /// messages from an earlier render are ignored.
    pub fn accept_relay(&self, json: &str) -> PreviewResult<bool> {
        let envelope = decode_relay(json)?;
        let mut shared = self.inner.lock();
        if shared.disposed
            || shared.current_run_id.is_none()
            || envelope.run_id != shared.current_run_id
        {
            tracing::debug!(
                "[session {}] ignoring relay for run {:?}",
                self.inner.id,
                envelope.run_id
            );
            return Ok(false);
        }
        tracing::debug!(
            "[session {}] result: {}",
            self.inner.id,
            envelope.result.status_line()
        );
        shared.last_result = Some(envelope.result);
        Ok(true)
    }

    /// Cancel the render timer, write pending saves now, and stop accepting
    /// edits. Idempotent.
    pub fn unmount(&self) {
        let inner = &self.inner;
        let dirty: Vec<String> = {
            let mut shared = inner.lock();
            if shared.disposed {
                return;
            }
            shared.disposed = true;
            shared.dirty.iter().cloned().collect()
        };
        inner.render_timer.cancel();
        for name in &dirty {
            inner.flush_file(name);
        }
        for timer in inner.save_timers.values() {
            timer.cancel();
        }
        tracing::info!(
            "[session {}] unmounted ({} pending saves flushed)",
            inner.id,
            dirty.len()
        );
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// State once a render settles: `Scheduled` if an edit arrived meanwhile.
    fn settled_state(&self, shared: &Shared) -> PreviewState {
        if shared.render_requested {
            PreviewState::Scheduled
        } else if self.preset.hot_reload {
            PreviewState::Idle
        } else {
            PreviewState::AwaitingManualRun
        }
    }

    /// Write one file to the store. Failures are logged, not raised.
    fn flush_file(&self, name: &str) {
        let entry = {
            let mut shared = self.lock();
            if !shared.dirty.remove(name) {
                return;
            }
            shared
                .files
                .iter()
                .find(|f| f.name == name)
                .map(|f| (f.content.clone(), f.language))
        };
        let Some((content, language)) = entry else {
            return;
        };
        let key = self.key.file_key(name);
        match self.store.set(&key, &content, language) {
            Ok(()) => tracing::debug!("[session {}] saved {}", self.id, key),
            Err(e) => tracing::warn!("[session {}] save failed: {}", self.id, e),
        }
    }

    /// Synthesize and hand the document to the frame. Unless `force`, a
    /// snapshot equal to the last rendered one is skipped.
    async fn render(&self, force: bool) {
        let _gate = self.render_gate.lock().await;
        let harness = self.preset.harness;

        let needs_runtime = {
            let mut shared = self.lock();
            if shared.disposed {
                return;
            }
            shared.render_requested = false;
            let snapshot = snapshot_hash(&shared.files);
            if !force && shared.last_snapshot.as_deref() == Some(snapshot.as_str()) {
                let settled = self.settled_state(&shared);
                shared.state = settled;
                return;
            }
            let needs_runtime = !self.loader.is_ready(harness);
            if needs_runtime {
                shared.state = PreviewState::LoadingRuntime;
            }
            needs_runtime
        };

        if needs_runtime {
            if let Err(e) = self.loader.ensure_loaded(harness).await {
                tracing::warn!("[session {}] {}", self.id, e);
                let mut shared = self.lock();
                shared.last_result = Some(ExecutionResult::infra_error(e.to_string()));
                let settled = self.settled_state(&shared);
                shared.state = settled;
                return;
            }
        }

        let (files, options, snapshot) = {
            let mut shared = self.lock();
            if shared.disposed {
                return;
            }
            shared.state = PreviewState::Rendering;
            let seq = self.render_seq.fetch_add(1, Ordering::SeqCst) + 1;
            let options = SynthOptions {
                run_id: Some(format!("{}-{}", self.id, seq)),
                cache_bust: None,
                stdin: shared.stdin.clone(),
                cdn: self.cdn.clone(),
            };
            (shared.files.clone(), options, snapshot_hash(&shared.files))
        };

        let doc = synthesize(self.preset, &files, &options);
        self.host
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .render(&doc);

        let mut shared = self.lock();
        shared.last_snapshot = Some(snapshot);
        shared.current_run_id = doc.run_id;
        let settled = self.settled_state(&shared);
        shared.state = settled;
        tracing::debug!(
            "[session {}] rendered {} ({} files)",
            self.id,
            self.preset.harness.as_str(),
            files.len()
        );
    }
}
