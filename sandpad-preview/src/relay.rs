//! Result messages posted by sandboxed documents.
//!
//! Every harness posts one JSON object through `parent.postMessage`:
//!
//! ```text
//! { "channel": "sandpad", "runId": "…", "status": "success",
//!   "lines": [{ "stream": "log", "text": "…" }],
//!   "stdout": "…", "stderr": "…", "value": …,
//!   "elapsedMs": 12.4, "exitCode": 0, "message": "…" }
//! ```
//!
//! Everything except `channel` and `status` is optional.

use crate::error::{PreviewError, PreviewResult};
use crate::result::{CapturedLine, ExecutionResult, RunStatus, Stream};
use serde::{Deserialize, Serialize};

pub const CHANNEL: &str = "sandpad";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayMessage {
    pub channel: String,
    #[serde(default)]
    pub run_id: Option<String>,
    pub status: RunStatus,
    #[serde(default)]
    pub lines: Vec<CapturedLine>,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub elapsed_ms: Option<f64>,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A decoded message together with the render it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEnvelope {
    pub run_id: Option<String>,
    pub result: ExecutionResult,
}

/// Split captured stream text into lines, dropping empty ones.
pub fn extract_lines(text: &str, stream: Stream) -> Vec<CapturedLine> {
    text.lines()
        .filter(|l| !l.is_empty())
        .map(|l| CapturedLine::new(stream, l))
        .collect()
}

pub fn decode(json: &str) -> PreviewResult<RelayEnvelope> {
    let msg: RelayMessage = serde_json::from_str(json)?;
    if msg.channel != CHANNEL {
        return Err(PreviewError::UnexpectedChannel {
            channel: msg.channel,
        });
    }
    Ok(RelayEnvelope {
        run_id: msg.run_id.clone(),
        result: msg.into_result(),
    })
}

impl RelayMessage {
    pub fn into_result(self) -> ExecutionResult {
        let mut lines = self.lines;
        if let Some(stdout) = &self.stdout {
            lines.extend(extract_lines(stdout, Stream::Stdout));
        }
        if let Some(stderr) = &self.stderr {
            lines.extend(extract_lines(stderr, Stream::Stderr));
        }
        let value = self.value.and_then(|v| match v {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        });
        let elapsed_ms = self
            .elapsed_ms
            .filter(|ms| ms.is_finite() && *ms > 0.0)
            .map_or(0, |ms| ms.round() as u64);

        let mut result = ExecutionResult {
            lines,
            exit_code: self.exit_code,
            message: self.message,
            ..ExecutionResult::new(self.status)
        }
        .with_value(value)
        .with_elapsed(elapsed_ms);
        if result.status != RunStatus::Success && result.message.is_none() {
            result.message = Some(result.status.label().to_string());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extract_drops_empty_lines() {
        let lines = extract_lines("a\n\nb\n", Stream::Stdout);
        assert_eq!(
            lines,
            vec![
                CapturedLine::new(Stream::Stdout, "a"),
                CapturedLine::new(Stream::Stdout, "b"),
            ]
        );
        assert!(extract_lines("", Stream::Stderr).is_empty());
    }

    #[test]
    fn decodes_console_lines_and_value() {
        let env = decode(
            r#"{"channel":"sandpad","runId":"r1","status":"success",
                "lines":[{"stream":"log","text":"hello"}],"value":{"a":1},"elapsedMs":4.6}"#,
        )
        .unwrap();
        assert_eq!(env.run_id.as_deref(), Some("r1"));
        assert_eq!(env.result.lines_of(Stream::Log), vec!["hello"]);
        assert_eq!(env.result.value.as_deref(), Some("{\"a\":1}"));
        assert_eq!(env.result.elapsed_ms, 5);
    }

    #[test]
    fn compile_error_keeps_message() {
        let env = decode(
            r#"{"channel":"sandpad","status":"compile-error","stderr":"main.c:3: error: expected ';'\n","exitCode":1,"message":"bad"}"#,
        )
        .unwrap();
        assert_eq!(env.result.status, RunStatus::CompileError);
        assert_eq!(env.result.stderr_lines(), vec!["main.c:3: error: expected ';'"]);
        assert_eq!(env.result.exit_code, Some(1));
        assert_eq!(env.result.message.as_deref(), Some("bad"));
    }

    #[test]
    fn rejects_foreign_channel() {
        let err = decode(r#"{"channel":"devtools","status":"success"}"#).unwrap_err();
        assert_eq!(
            err,
            PreviewError::UnexpectedChannel {
                channel: "devtools".into()
            }
        );
        assert!(matches!(decode("not json"), Err(PreviewError::RelayJson(_))));
    }
}
