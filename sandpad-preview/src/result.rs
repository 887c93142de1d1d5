//! Outcome of one run, in the shape the host UI renders.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stream {
    Stdout,
    Stderr,
    Log,
    Info,
    Warn,
    Error,
    Result,
}

impl Stream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
            Stream::Log => "log",
            Stream::Info => "info",
            Stream::Warn => "warn",
            Stream::Error => "error",
            Stream::Result => "result",
        }
    }

    /// Streams shown in red in the output panel.
    pub fn is_error(&self) -> bool {
        matches!(self, Stream::Stderr | Stream::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Success,
    CompileError,
    RuntimeError,
    /// Reserved for the judged-assignment flow; previews never time out.
    Timeout,
    InfraError,
}

impl RunStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RunStatus::Success => "Success",
            RunStatus::CompileError => "Compile error",
            RunStatus::RuntimeError => "Runtime error",
            RunStatus::Timeout => "Timed out",
            RunStatus::InfraError => "Runtime unavailable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedLine {
    pub stream: Stream,
    pub text: String,
}

impl CapturedLine {
    pub fn new(stream: Stream, text: impl Into<String>) -> Self {
        Self {
            stream,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: RunStatus,
    pub lines: Vec<CapturedLine>,
    pub value: Option<String>,
    /// Wall-clock milliseconds, rounded to a whole number.
    pub elapsed_ms: u64,
    /// Synthetic process exit code; only the C harness sets it.
    pub exit_code: Option<i32>,
    pub message: Option<String>,
}

impl ExecutionResult {
    pub fn new(status: RunStatus) -> Self {
        Self {
            status,
            lines: Vec::new(),
            value: None,
            elapsed_ms: 0,
            exit_code: None,
            message: None,
        }
    }

    pub fn success(lines: Vec<CapturedLine>) -> Self {
        Self {
            lines,
            ..Self::new(RunStatus::Success)
        }
    }

    pub fn infra_error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(RunStatus::InfraError)
        }
    }

    /// Record the final expression value, echoed as a `result` line.
    pub fn with_value(mut self, value: Option<String>) -> Self {
        if let Some(v) = &value {
            self.lines.push(CapturedLine::new(Stream::Result, v.clone()));
        }
        self.value = value;
        self
    }

    pub fn with_elapsed(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    pub fn lines_of(&self, stream: Stream) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|l| l.stream == stream)
            .map(|l| l.text.as_str())
            .collect()
    }

    pub fn stdout_lines(&self) -> Vec<&str> {
        self.lines_of(Stream::Stdout)
    }

    pub fn stderr_lines(&self) -> Vec<&str> {
        self.lines_of(Stream::Stderr)
    }

    /// Stdout as text, each line terminated by a newline.
    pub fn stdout(&self) -> String {
        self.stdout_lines()
            .into_iter()
            .map(|l| format!("{}\n", l))
            .collect()
    }

    /// One-line status summary: icon, label, duration and message.
    pub fn status_line(&self) -> String {
        let icon = if self.is_success() { "✓" } else { "✗" };
        let mut line = format!("{} {} ({} ms)", icon, self.status.label(), self.elapsed_ms);
        if let Some(code) = self.exit_code {
            line.push_str(&format!(" exit code {}", code));
        }
        if let Some(msg) = &self.message {
            line.push_str(&format!(": {}", msg));
        }
        line
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line.text)?;
        }
        write!(f, "{}", self.status_line())
    }
}
