//! Host side of the sandpad preview: project storage, runtime loading,
//! debounced preview sessions and a host-thread JavaScript runner.

pub mod config;
pub mod debounce;
pub mod error;
pub mod host;
pub mod host_js;
pub mod loader;
pub mod seed;
pub mod session;
pub mod store;

pub use config::Config;
pub use error::{ConfigError, LoadError, SessionError, StoreError, StoreResult};
pub use host::{FrameHost, SandboxHost};
pub use host_js::{run_javascript, CaptureBuffer, ExecutionContext, OutputSink, RunLimits, StdinLines};
pub use loader::{HttpFetcher, LoadState, RuntimeLoader, ScriptFetcher};
pub use session::{MountRequest, PreviewSession, PreviewState};
pub use store::{FileStore, MemoryStore, ProjectStore, StoredFile};
