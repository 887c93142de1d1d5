//! Per-runtime load state for the CDN scripts a harness depends on.
//!
//! Each harness has one slot. The first request starts a fetch on a spawned
//! task and every later caller subscribes to the same slot, so concurrent
//! callers share one fetch and a caller that goes away cannot leave the slot
//! stuck in `Loading`. A failed slot stays failed until someone asks again.

use crate::error::LoadError;
use sandpad_preview::{CdnTable, Harness};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

pub type FetchFuture = Pin<Box<dyn Future<Output = Result<(), LoadError>> + Send>>;

/// Fetches one runtime script. Only reachability matters here; the sandboxed
/// document loads the script itself.
pub trait ScriptFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> FetchFuture;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> FetchFuture {
        let client = self.client.clone();
        let url = url.to_string();
        Box::pin(async move {
            let to_err = |e: reqwest::Error| LoadError::Fetch {
                url: url.clone(),
                message: e.to_string(),
            };
            let resp = client.get(&url).send().await.map_err(to_err)?;
            let resp = resp.error_for_status().map_err(to_err)?;
            resp.bytes().await.map_err(to_err)?;
            Ok(())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Ready,
    Failed(String),
}

impl LoadState {
    pub fn is_settled(&self) -> bool {
        matches!(self, LoadState::Ready | LoadState::Failed(_))
    }
}

/// A pending, ready or failed runtime. Cheap to clone; `wait` resolves it.
#[derive(Clone)]
pub struct ResourceHandle {
    harness: Harness,
    rx: watch::Receiver<LoadState>,
}

impl ResourceHandle {
    fn ready(harness: Harness) -> Self {
        let (_tx, rx) = watch::channel(LoadState::Ready);
        Self { harness, rx }
    }

    pub fn harness(&self) -> Harness {
        self.harness
    }

    pub fn state(&self) -> LoadState {
        self.rx.borrow().clone()
    }

    pub async fn wait(mut self) -> Result<(), LoadError> {
        let harness = self.harness.as_str().to_string();
        let waited = self
            .rx
            .wait_for(LoadState::is_settled)
            .await
            .map(|state| (*state).clone());
        let settled = match waited {
            Ok(state) => state,
            // A closed channel still holds the last value.
            Err(_) => self.rx.borrow().clone(),
        };
        match settled {
            LoadState::Ready => Ok(()),
            LoadState::Failed(message) => Err(LoadError::Unavailable { harness, message }),
            LoadState::Unloaded | LoadState::Loading => Err(LoadError::Abandoned { harness }),
        }
    }
}

pub struct RuntimeLoader {
    fetcher: Arc<dyn ScriptFetcher>,
    cdn: CdnTable,
    slots: Mutex<HashMap<Harness, Arc<watch::Sender<LoadState>>>>,
}

impl RuntimeLoader {
    pub fn new(fetcher: Arc<dyn ScriptFetcher>, cdn: CdnTable) -> Self {
        Self {
            fetcher,
            cdn,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn cdn(&self) -> &CdnTable {
        &self.cdn
    }

    /// Start loading `harness` unless it is loading or loaded already.
    /// Must be called from within a tokio runtime.
    pub fn request(&self, harness: Harness) -> ResourceHandle {
        let urls = self.cdn.scripts(harness).to_vec();
        if urls.is_empty() {
            return ResourceHandle::ready(harness);
        }

        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let tx = slots
            .entry(harness)
            .or_insert_with(|| Arc::new(watch::channel(LoadState::Unloaded).0))
            .clone();
        let start = matches!(*tx.borrow(), LoadState::Unloaded | LoadState::Failed(_));
        if start {
            tx.send_replace(LoadState::Loading);
            tracing::info!("Loading {} runtime ({} scripts)", harness.as_str(), urls.len());
            let fetcher = self.fetcher.clone();
            let task_tx = tx.clone();
            tokio::spawn(async move {
                let mut outcome = LoadState::Ready;
                for url in &urls {
                    if let Err(e) = fetcher.fetch(url).await {
                        tracing::warn!("{} runtime failed to load: {}", harness.as_str(), e);
                        outcome = LoadState::Failed(e.to_string());
                        break;
                    }
                }
                if outcome == LoadState::Ready {
                    tracing::info!("{} runtime ready", harness.as_str());
                }
                task_tx.send_replace(outcome);
            });
        }
        ResourceHandle {
            harness,
            rx: tx.subscribe(),
        }
    }

    pub async fn ensure_loaded(&self, harness: Harness) -> Result<(), LoadError> {
        self.request(harness).wait().await
    }

    pub fn state(&self, harness: Harness) -> LoadState {
        if self.cdn.scripts(harness).is_empty() {
            return LoadState::Ready;
        }
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .get(&harness)
            .map_or(LoadState::Unloaded, |tx| tx.borrow().clone())
    }

    pub fn is_ready(&self, harness: Harness) -> bool {
        self.state(harness) == LoadState::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeFetcher {
        calls: AtomicUsize,
        fail: Mutex<bool>,
    }

    impl FakeFetcher {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: Mutex::new(fail),
            })
        }
    }

    impl ScriptFetcher for FakeFetcher {
        fn fetch(&self, url: &str) -> FetchFuture {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = *self.fail.lock().unwrap();
            let url = url.to_string();
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                if fail {
                    Err(LoadError::Fetch {
                        url,
                        message: "network down".into(),
                    })
                } else {
                    Ok(())
                }
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn native_harness_is_ready_without_fetching() {
        let fetcher = FakeFetcher::new(false);
        let loader = RuntimeLoader::new(fetcher.clone(), CdnTable::default());
        assert!(loader.is_ready(Harness::WebBasics));
        loader.ensure_loaded(Harness::Script).await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_fetch() {
        let fetcher = FakeFetcher::new(false);
        let loader = RuntimeLoader::new(fetcher.clone(), CdnTable::default());
        let a = loader.request(Harness::Python);
        let b = loader.request(Harness::Python);
        assert_eq!(a.state(), LoadState::Loading);
        let (ra, rb) = tokio::join!(a.wait(), b.wait());
        ra.unwrap();
        rb.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(loader.is_ready(Harness::Python));

        loader.ensure_loaded(Harness::Python).await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_reported_and_retried_on_request() {
        let fetcher = FakeFetcher::new(true);
        let loader = RuntimeLoader::new(fetcher.clone(), CdnTable::default());
        let err = loader.ensure_loaded(Harness::C).await.unwrap_err();
        assert!(matches!(err, LoadError::Unavailable { .. }));
        assert!(matches!(loader.state(Harness::C), LoadState::Failed(_)));

        *fetcher.fail.lock().unwrap() = false;
        loader.ensure_loaded(Harness::C).await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_caller_does_not_strand_loading() {
        let fetcher = FakeFetcher::new(false);
        let loader = RuntimeLoader::new(fetcher.clone(), CdnTable::default());
        drop(loader.request(Harness::Vue));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(loader.state(Harness::Vue), LoadState::Ready);
    }
}
