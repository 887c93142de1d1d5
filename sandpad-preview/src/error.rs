use thiserror::Error;

pub type PreviewResult<T> = Result<T, PreviewError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreviewError {
    #[error("Relay message is not valid JSON: {0}")]
    RelayJson(String),

    #[error("Relay message on unexpected channel '{channel}'")]
    UnexpectedChannel { channel: String },

    #[error("Unknown preset '{id}'")]
    UnknownPreset { id: String },

    #[error("Preset '{preset}' has no file named '{name}'")]
    UnknownFile { preset: String, name: String },
}

impl From<serde_json::Error> for PreviewError {
    fn from(err: serde_json::Error) -> Self {
        PreviewError::RelayJson(err.to_string())
    }
}
