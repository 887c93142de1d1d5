//! iframe `sandbox` attribute policy.
//!
//! The policy is chosen per embedding surface. The learner-facing web preview
//! never gets `allow-same-origin`, so scripts in it cannot read the host page's
//! storage or cookies. The general code preview and the Monaco-embedded preview
//! keep same-origin and modal dialogs so `alert()` demos work.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Surface {
    CodePreview,
    MonacoPreview,
    LearnerWebPreview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxPolicy {
    pub allow_same_origin: bool,
    pub allow_modals: bool,
}

impl SandboxPolicy {
    pub fn for_surface(surface: Surface) -> Self {
        match surface {
            Surface::CodePreview | Surface::MonacoPreview => SandboxPolicy {
                allow_same_origin: true,
                allow_modals: true,
            },
            Surface::LearnerWebPreview => SandboxPolicy {
                allow_same_origin: false,
                allow_modals: false,
            },
        }
    }

    /// Sandbox tokens; `allow-scripts` is always first.
    pub fn tokens(&self) -> Vec<&'static str> {
        let mut tokens = vec!["allow-scripts"];
        if self.allow_same_origin {
            tokens.push("allow-same-origin");
        }
        if self.allow_modals {
            tokens.push("allow-modals");
        }
        tokens
    }

    /// Value for the iframe `sandbox` attribute.
    pub fn attribute(&self) -> String {
        self.tokens().join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_preview_allows_same_origin_and_modals() {
        let p = SandboxPolicy::for_surface(Surface::CodePreview);
        assert_eq!(p.attribute(), "allow-scripts allow-same-origin allow-modals");
        assert_eq!(SandboxPolicy::for_surface(Surface::MonacoPreview), p);
    }

    #[test]
    fn learner_web_preview_is_isolated() {
        let p = SandboxPolicy::for_surface(Surface::LearnerWebPreview);
        assert_eq!(p.attribute(), "allow-scripts");
        assert!(!p.tokens().contains(&"allow-same-origin"));
    }
}
