//! Source buffers owned by one (subject, section, preset) project.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Sub-language tag of a single project file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileLanguage {
    Html,
    Css,
    Js,
    Ts,
    Tsx,
    VueSfc,
    Py,
    C,
    Text,
}

impl FileLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileLanguage::Html => "html",
            FileLanguage::Css => "css",
            FileLanguage::Js => "js",
            FileLanguage::Ts => "ts",
            FileLanguage::Tsx => "tsx",
            FileLanguage::VueSfc => "vue-sfc",
            FileLanguage::Py => "py",
            FileLanguage::C => "c",
            FileLanguage::Text => "text",
        }
    }

    /// Guess the tag from a file name extension. Unknown extensions are plain text.
    pub fn from_file_name(name: &str) -> Self {
        let ext = name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("html") | Some("htm") => FileLanguage::Html,
            Some("css") => FileLanguage::Css,
            Some("js") | Some("mjs") | Some("jsx") => FileLanguage::Js,
            Some("ts") => FileLanguage::Ts,
            Some("tsx") => FileLanguage::Tsx,
            Some("vue") => FileLanguage::VueSfc,
            Some("py") => FileLanguage::Py,
            Some("c") | Some("h") => FileLanguage::C,
            _ => FileLanguage::Text,
        }
    }
}

impl fmt::Display for FileLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named source buffer. `updated_at` is refreshed on every edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub name: String,
    pub language: FileLanguage,
    pub content: String,
    pub updated_at: SystemTime,
}

impl ProjectFile {
    pub fn new(name: impl Into<String>, language: FileLanguage, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language,
            content: content.into(),
            updated_at: SystemTime::now(),
        }
    }

    /// Replace the content and bump the modification time.
    pub fn set_content(&mut self, content: String) {
        self.content = content;
        self.updated_at = SystemTime::now();
    }
}

/// Identity of a project: which subject, section and preset it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectKey {
    pub subject_id: String,
    pub section_id: String,
    pub preset_id: String,
}

impl ProjectKey {
    pub fn new(
        subject_id: impl Into<String>,
        section_id: impl Into<String>,
        preset_id: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            section_id: section_id.into(),
            preset_id: preset_id.into(),
        }
    }

    /// Same subject and preset, different section.
    pub fn with_section(&self, section_id: &str) -> Self {
        Self {
            section_id: section_id.to_string(),
            ..self.clone()
        }
    }

    /// Storage key for one file of this project.
    pub fn file_key(&self, file_name: &str) -> String {
        format!(
            "sandpad:{}:{}:{}:{}",
            self.subject_id, self.section_id, self.preset_id, file_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_key_is_deterministic() {
        let key = ProjectKey::new("rust-101", "intro", "web");
        assert_eq!(key.file_key("index.html"), "sandpad:rust-101:intro:web:index.html");
        assert_eq!(key.file_key("index.html"), key.file_key("index.html"));
    }

    #[test]
    fn with_section_keeps_subject_and_preset() {
        let key = ProjectKey::new("s", "b", "react");
        let earlier = key.with_section("a");
        assert_eq!(earlier.subject_id, "s");
        assert_eq!(earlier.preset_id, "react");
        assert_eq!(earlier.section_id, "a");
    }

    #[test]
    fn language_from_extension() {
        assert_eq!(FileLanguage::from_file_name("App.tsx"), FileLanguage::Tsx);
        assert_eq!(FileLanguage::from_file_name("main.PY"), FileLanguage::Py);
        assert_eq!(FileLanguage::from_file_name("README"), FileLanguage::Text);
        assert_eq!(FileLanguage::VueSfc.to_string(), "vue-sfc");
    }
}
