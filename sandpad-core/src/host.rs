//! Owner of the sandboxed frame a session renders into.

use sandpad_preview::escape::escape_html;
use sandpad_preview::{SandboxPolicy, Surface, SynthesizedDocument};
use std::fmt::Write;
use std::sync::{Arc, Mutex};

pub trait SandboxHost: Send {
    /// Replace the frame content with `doc`.
    fn render(&mut self, doc: &SynthesizedDocument);
    fn policy(&self) -> SandboxPolicy;
}

#[derive(Default)]
struct FrameState {
    srcdoc: Option<String>,
    run_id: Option<String>,
    render_count: usize,
}

/// In-process frame: keeps the current `srcdoc` and can emit the host page
/// that embeds it. Clones share state, so an observer can watch renders.
#[derive(Clone)]
pub struct FrameHost {
    policy: SandboxPolicy,
    state: Arc<Mutex<FrameState>>,
}

impl FrameHost {
    pub fn new(surface: Surface) -> Self {
        Self {
            policy: SandboxPolicy::for_surface(surface),
            state: Arc::new(Mutex::new(FrameState::default())),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FrameState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn srcdoc(&self) -> Option<String> {
        self.lock().srcdoc.clone()
    }

    pub fn run_id(&self) -> Option<String> {
        self.lock().run_id.clone()
    }

    pub fn render_count(&self) -> usize {
        self.lock().render_count
    }

    /// A page with one `<iframe>` carrying the sandbox attribute and the
    /// current document as `srcdoc`.
    pub fn host_page(&self, title: &str) -> String {
        let srcdoc = self.srcdoc().unwrap_or_default();
        let mut html = String::new();
        // Writing into a String cannot fail.
        let _ = write!(
            html,
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>{}</title>
<style>html,body{{margin:0;height:100%;}}iframe{{border:0;width:100%;height:100%;}}</style>
</head>
<body>
<iframe title="preview" sandbox="{}" srcdoc="{}"></iframe>
</body>
</html>
"#,
            escape_html(title),
            self.policy.attribute(),
            escape_html(&srcdoc)
        );
        html
    }
}

impl SandboxHost for FrameHost {
    fn render(&mut self, doc: &SynthesizedDocument) {
        let mut state = self.lock();
        state.srcdoc = Some(doc.html.clone());
        state.run_id = doc.run_id.clone();
        state.render_count += 1;
        tracing::debug!(
            "Frame rendered {} document ({} bytes)",
            doc.harness.as_str(),
            doc.html.len()
        );
    }

    fn policy(&self) -> SandboxPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandpad_preview::{resolve_preset, synthesize, SynthOptions};

    #[test]
    fn clones_observe_renders() {
        let host = FrameHost::new(Surface::CodePreview);
        let mut writer = host.clone();
        let preset = resolve_preset("python");
        let doc = synthesize(preset, &preset.starter_files(), &SynthOptions::default());
        writer.render(&doc);
        assert_eq!(host.render_count(), 1);
        assert_eq!(host.srcdoc().as_deref(), Some(doc.html.as_str()));
    }

    #[test]
    fn host_page_escapes_srcdoc() {
        let mut host = FrameHost::new(Surface::LearnerWebPreview);
        let preset = resolve_preset("web");
        let doc = synthesize(preset, &preset.starter_files(), &SynthOptions::default());
        host.render(&doc);
        let page = host.host_page("Preview");
        assert!(page.contains("sandbox=\"allow-scripts\" srcdoc=\"&lt;!DOCTYPE html&gt;"));
        assert!(!page.contains("allow-same-origin"));
    }
}
