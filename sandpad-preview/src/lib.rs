//! # Sandpad preview documents
//!
//! Builds self-contained HTML documents for the "try it yourself" sandbox.
//! Each document embeds learner source plus the smallest harness needed to
//! run it inside a sandboxed iframe and report results back to the host.
//!
//! ## Features
//! - Preset catalog for web, React, Vue, TypeScript, C and Python editors
//! - One pure synthesizer per runtime family
//! - Escaping helpers that keep user source from terminating script blocks
//! - Regex-based TypeScript annotation stripping (an approximation, not a parser)
//! - Sandbox attribute policy per embedding surface
//! - Decoding of the result messages posted by the harnesses
//!
//! ## Example
//! ```ignore
//! use sandpad_preview::{resolve_preset, synthesize, ProjectFile, SynthOptions};
//!
//! let preset = resolve_preset("web");
//! let files = preset.starter_files();
//! let doc = synthesize(preset, &files, &SynthOptions::default());
//! assert!(doc.html.starts_with("<!DOCTYPE html>"));
//! ```

pub mod cdn;
pub mod error;
pub mod escape;
pub mod project;
pub mod registry;
pub mod relay;
pub mod result;
pub mod sandbox;
pub mod strip;
pub mod synth;
pub mod vue_sfc;

// --- Core types ---
pub use cdn::CdnTable;
pub use error::{PreviewError, PreviewResult};
pub use project::{FileLanguage, ProjectFile, ProjectKey};
pub use registry::{FileSpec, Harness, LanguagePreset, RuntimeKind};
pub use result::{CapturedLine, ExecutionResult, RunStatus, Stream};
pub use sandbox::{SandboxPolicy, Surface};
pub use synth::{SynthOptions, SynthesizedDocument};

/// Look up a preset by id. Unknown ids resolve to the plain-text sentinel.
pub fn resolve_preset(id: &str) -> &'static LanguagePreset {
    registry::resolve_preset(id)
}

/// Build the preview document for `files` using the harness of `preset`.
pub fn synthesize(
    preset: &LanguagePreset,
    files: &[ProjectFile],
    options: &SynthOptions,
) -> SynthesizedDocument {
    synth::synthesize(preset, files, options)
}

/// Decode a result message posted by a sandboxed harness.
pub fn decode_relay(json: &str) -> PreviewResult<relay::RelayEnvelope> {
    relay::decode(json)
}
