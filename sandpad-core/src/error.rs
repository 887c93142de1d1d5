use std::path::PathBuf;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O error for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored entry '{key}' is corrupt: {message}")]
    Corrupt { key: String, message: String },

    #[error(transparent)]
    Project(#[from] sandpad_preview::PreviewError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Failed to load runtime script {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Runtime '{harness}' is unavailable: {message}")]
    Unavailable { harness: String, message: String },

    #[error("Runtime loader task for {harness} stopped before finishing")]
    Abandoned { harness: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session was unmounted")]
    Disposed,

    #[error("No file named '{0}' in this project")]
    UnknownFile(String),
}
