use pretty_assertions::assert_eq;
use sandpad_core::config::PreviewConfig;
use sandpad_core::error::{LoadError, SessionError};
use sandpad_core::loader::{FetchFuture, RuntimeLoader, ScriptFetcher};
use sandpad_core::{FrameHost, MemoryStore, MountRequest, PreviewSession, PreviewState, ProjectStore};
use sandpad_preview::{resolve_preset, CdnTable, FileLanguage, ProjectKey, RunStatus};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct FakeFetcher {
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl ScriptFetcher for FakeFetcher {
    fn fetch(&self, url: &str) -> FetchFuture {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fail = self.fail.load(Ordering::SeqCst);
        let url = url.to_string();
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            if fail {
                Err(LoadError::Fetch {
                    url,
                    message: "offline".into(),
                })
            } else {
                Ok(())
            }
        })
    }
}

struct Fixture {
    store: Arc<MemoryStore>,
    loader: Arc<RuntimeLoader>,
    fetcher: Arc<FakeFetcher>,
}

impl Fixture {
    fn new(fail: bool) -> Self {
        let fetcher = Arc::new(FakeFetcher {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(fail),
        });
        Self {
            store: Arc::new(MemoryStore::new()),
            loader: Arc::new(RuntimeLoader::new(fetcher.clone(), CdnTable::default())),
            fetcher,
        }
    }

    async fn mount(&self, key: ProjectKey) -> (PreviewSession, FrameHost) {
        self.mount_request(MountRequest::new(key)).await
    }

    async fn mount_request(&self, req: MountRequest) -> (PreviewSession, FrameHost) {
        let host = FrameHost::new(resolve_preset(&req.key.preset_id).surface);
        let session = PreviewSession::mount(
            req,
            self.store.clone(),
            self.loader.clone(),
            Box::new(host.clone()),
            &PreviewConfig::default(),
        )
        .await;
        (session, host)
    }
}

fn key(preset: &str) -> ProjectKey {
    ProjectKey::new("intro", "s1", preset)
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn hot_reload_preset_renders_on_mount() {
    let fx = Fixture::new(false);
    let (session, host) = fx.mount(key("web")).await;
    assert_eq!(host.render_count(), 1);
    assert_eq!(session.state(), PreviewState::Idle);
    assert_eq!(host.run_id(), session.current_run_id());
}

#[tokio::test(start_paused = true)]
async fn rapid_edits_collapse_into_one_render() {
    let fx = Fixture::new(false);
    let (session, host) = fx.mount(key("web")).await;

    for i in 0..5 {
        session
            .edit("script.js", format!("console.log('edit {}');", i))
            .unwrap();
        assert_eq!(session.state(), PreviewState::Scheduled);
        sleep_ms(100).await;
    }
    assert_eq!(host.render_count(), 1);

    sleep_ms(800).await;
    assert_eq!(host.render_count(), 2);
    let html = host.srcdoc().unwrap();
    assert!(html.contains("console.log('edit 4');"));
    assert!(!html.contains("edit 3"));
    assert_eq!(session.state(), PreviewState::Idle);
}

#[tokio::test(start_paused = true)]
async fn reverting_to_rendered_content_cancels_render() {
    let fx = Fixture::new(false);
    let (session, host) = fx.mount(key("web")).await;
    let original = session
        .files()
        .into_iter()
        .find(|f| f.name == "script.js")
        .unwrap()
        .content;

    session.edit("script.js", "console.log('changed');").unwrap();
    session.edit("script.js", original).unwrap();
    assert_eq!(session.state(), PreviewState::Idle);

    sleep_ms(2_000).await;
    assert_eq!(host.render_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn unmount_cancels_pending_render_and_flushes_saves() {
    let fx = Fixture::new(false);
    let (session, host) = fx.mount(key("web")).await;

    session.edit("styles.css", "body { color: red; }").unwrap();
    sleep_ms(100).await;
    assert!(fx.store.is_empty());
    session.unmount();

    let saved = fx
        .store
        .get(&key("web").file_key("styles.css"))
        .unwrap()
        .unwrap();
    assert_eq!(saved.content, "body { color: red; }");
    assert_eq!(saved.language, FileLanguage::Css);

    sleep_ms(2_000).await;
    assert_eq!(host.render_count(), 1);
    assert_eq!(fx.store.len(), 1);
    assert_eq!(session.edit("styles.css", "x"), Err(SessionError::Disposed));
}

#[tokio::test(start_paused = true)]
async fn dropping_session_stops_timers() {
    let fx = Fixture::new(false);
    let (session, host) = fx.mount(key("web")).await;
    session.edit("index.html", "<p>bye</p>").unwrap();
    drop(session);

    sleep_ms(2_000).await;
    assert_eq!(host.render_count(), 1);
    let saved = fx.store.get(&key("web").file_key("index.html")).unwrap();
    assert_eq!(saved.map(|s| s.content).as_deref(), Some("<p>bye</p>"));
}

#[tokio::test(start_paused = true)]
async fn saves_are_debounced_per_file() {
    let fx = Fixture::new(false);
    let (session, _host) = fx.mount(key("web")).await;

    session.edit("index.html", "<h1>a</h1>").unwrap();
    sleep_ms(300).await;
    session.edit("index.html", "<h1>b</h1>").unwrap();
    sleep_ms(300).await;
    assert!(fx.store.is_empty());

    sleep_ms(300).await;
    let saved = fx.store.get(&key("web").file_key("index.html")).unwrap().unwrap();
    assert_eq!(saved.content, "<h1>b</h1>");
}

#[tokio::test(start_paused = true)]
async fn manual_preset_waits_for_run() {
    let fx = Fixture::new(false);
    let (session, host) = fx.mount(key("python")).await;
    assert_eq!(session.state(), PreviewState::AwaitingManualRun);
    assert_eq!(host.render_count(), 0);

    session.edit("main.py", "print(6 * 7)").unwrap();
    sleep_ms(2_000).await;
    assert_eq!(host.render_count(), 0);
    assert_eq!(session.state(), PreviewState::AwaitingManualRun);

    session.run().await.unwrap();
    assert_eq!(host.render_count(), 1);
    assert!(host.srcdoc().unwrap().contains("print(6 * 7)"));
    assert_eq!(session.state(), PreviewState::AwaitingManualRun);
    assert_eq!(fx.fetcher.calls.load(Ordering::SeqCst), 1);

    session.run().await.unwrap();
    assert_eq!(host.render_count(), 2);
    assert_eq!(fx.fetcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn runtime_failure_reports_infra_error_without_rendering() {
    let fx = Fixture::new(true);
    let (session, host) = fx.mount(key("c")).await;

    session.run().await.unwrap();
    let result = session.last_result().unwrap();
    assert_eq!(result.status, RunStatus::InfraError);
    assert!(result.message.unwrap().contains("offline"));
    assert_eq!(host.render_count(), 0);
    assert_eq!(session.state(), PreviewState::AwaitingManualRun);
}

#[tokio::test(start_paused = true)]
async fn relay_from_stale_run_is_ignored() {
    let fx = Fixture::new(false);
    let (session, host) = fx.mount(key("web")).await;
    let first = host.run_id().unwrap();

    session.edit("script.js", "console.log(2);").unwrap();
    sleep_ms(900).await;
    let second = host.run_id().unwrap();
    assert_ne!(first, second);

    let message = |run_id: &str, text: &str| {
        serde_json::json!({
            "channel": "sandpad",
            "runId": run_id,
            "status": "success",
            "lines": [{ "stream": "log", "text": text }],
        })
        .to_string()
    };

    assert!(!session.accept_relay(&message(&first, "old")).unwrap());
    assert_eq!(session.last_result(), None);

    assert!(session.accept_relay(&message(&second, "2")).unwrap());
    let result = session.last_result().unwrap();
    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(result.lines[0].text, "2");
}

#[tokio::test(start_paused = true)]
async fn transpiled_preset_loads_runtime_before_first_render() {
    let fx = Fixture::new(false);
    let (session, host) = fx.mount(key("react")).await;
    assert_eq!(host.render_count(), 1);
    assert_eq!(fx.fetcher.calls.load(Ordering::SeqCst), 3);
    assert_eq!(session.state(), PreviewState::Idle);
    assert!(host.srcdoc().unwrap().contains("id=\"root\""));
}

#[tokio::test(start_paused = true)]
async fn mount_continues_from_earlier_section() {
    let fx = Fixture::new(false);
    let earlier = ProjectKey::new("intro", "s1", "python");
    fx.store
        .set(&earlier.file_key("main.py"), "print('from s1')", FileLanguage::Py)
        .unwrap();

    let mut req = MountRequest::new(ProjectKey::new("intro", "s2", "python"));
    req.section_order = vec!["s1".into(), "s2".into()];
    let (session, _host) = fx.mount_request(req).await;
    assert_eq!(session.files()[0].content, "print('from s1')");
    assert_eq!(session.active_file(), "main.py");
}

#[tokio::test(start_paused = true)]
async fn unknown_file_is_rejected() {
    let fx = Fixture::new(false);
    let (session, _host) = fx.mount(key("web")).await;
    assert_eq!(
        session.edit("missing.js", "x"),
        Err(SessionError::UnknownFile("missing.js".into()))
    );
    assert!(session.set_active_file("styles.css").is_ok());
    assert_eq!(session.active_file(), "styles.css");
}

#[tokio::test(start_paused = true)]
async fn edit_during_run_leaves_render_scheduled() {
    let fx = Fixture::new(true);
    let (session, host) = fx.mount(key("react")).await;
    assert_eq!(host.render_count(), 0);
    assert_eq!(session.last_result().unwrap().status, RunStatus::InfraError);

    fx.fetcher.fail.store(false, Ordering::SeqCst);
    let session = Arc::new(session);
    let running = tokio::spawn({
        let session = session.clone();
        async move { session.run().await }
    });
    sleep_ms(10).await;
    assert_eq!(session.state(), PreviewState::LoadingRuntime);
    session.edit("styles.css", "button { color: teal; }").unwrap();

    running.await.unwrap().unwrap();
    assert_eq!(host.render_count(), 1);
    assert_eq!(session.state(), PreviewState::Scheduled);

    // The run already picked up the edit, so the timer render is skipped.
    sleep_ms(900).await;
    assert_eq!(host.render_count(), 1);
    assert_eq!(session.state(), PreviewState::Idle);
}
