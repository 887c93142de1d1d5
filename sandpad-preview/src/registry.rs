//! Static catalog of language presets.
//!
//! A preset decides which harness builds the preview document, which files the
//! editor shows, and whether edits re-render automatically.

use crate::error::{PreviewError, PreviewResult};
use crate::project::{FileLanguage, ProjectFile};
use crate::sandbox::Surface;

/// How a preset's files become something the browser can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeKind {
    /// Runs as-is in the iframe.
    NativeBrowser,
    /// Transpiled inside the iframe by a CDN-hosted transpiler or framework build.
    Transpile,
    /// Interpreted by a CDN-hosted WebAssembly runtime.
    WasmInterpreter,
}

/// Which synthesizer builds the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Harness {
    WebBasics,
    React,
    Vue,
    Script,
    C,
    Python,
    PlainText,
}

impl Harness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Harness::WebBasics => "web-basics",
            Harness::React => "react",
            Harness::Vue => "vue",
            Harness::Script => "script",
            Harness::C => "c",
            Harness::Python => "python",
            Harness::PlainText => "plain-text",
        }
    }
}

/// A logical file of a preset with its starter body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSpec {
    pub name: &'static str,
    pub language: FileLanguage,
    pub starter: &'static str,
}

#[derive(Debug, PartialEq, Eq)]
pub struct LanguagePreset {
    pub id: &'static str,
    pub label: &'static str,
    pub runtime_kind: RuntimeKind,
    pub harness: Harness,
    /// Edits re-render after a debounce instead of waiting for an explicit run.
    pub hot_reload: bool,
    pub surface: Surface,
    pub files: &'static [FileSpec],
}

impl LanguagePreset {
    pub fn file_spec(&self, name: &str) -> PreviewResult<&FileSpec> {
        self.files
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| PreviewError::UnknownFile {
                preset: self.id.to_string(),
                name: name.to_string(),
            })
    }

    /// Fresh buffers holding the starter content of every file.
    pub fn starter_files(&self) -> Vec<ProjectFile> {
        self.files
            .iter()
            .map(|f| ProjectFile::new(f.name, f.language, f.starter))
            .collect()
    }

    pub fn is_plain(&self) -> bool {
        self.harness == Harness::PlainText
    }
}

const WEB_HTML: &str = "<h1>Hello, sandbox!</h1>\n<p>Edit the files to see your changes.</p>\n";
const WEB_CSS: &str = "body {\n  font-family: system-ui, sans-serif;\n  padding: 1rem;\n}\n\nh1 {\n  color: #2563eb;\n}\n";
const WEB_JS: &str = "document.querySelector('h1').addEventListener('click', () => {\n  console.log('clicked');\n});\n";

const REACT_APP: &str = "import { useState } from 'react';\n\nexport default function App() {\n  const [count, setCount] = useState<number>(0);\n  return (\n    <button onClick={() => setCount(count + 1)}>\n      Clicked {count} times\n    </button>\n  );\n}\n";
const REACT_CSS: &str = "button {\n  font-size: 1.25rem;\n  padding: 0.5rem 1rem;\n}\n";

const VUE_APP: &str = "<template>\n  <button @click=\"increment\">Clicked {{ count }} times</button>\n</template>\n\n<script>\nimport { ref } from 'vue';\n\nexport default {\n  setup() {\n    const count = ref(0);\n    const increment = () => count.value++;\n    return { count, increment };\n  }\n};\n</script>\n\n<style>\nbutton { font-size: 1.25rem; }\n</style>\n";

const TS_MAIN: &str = "function greet(name: string): string {\n  return `Hello, ${name}!`;\n}\n\nconsole.log(greet('TypeScript'));\n";

const PY_MAIN: &str = "name = \"Python\"\nprint(f\"Hello, {name}!\")\n";

const C_MAIN: &str = "#include <stdio.h>\n\nint main(void) {\n    int n;\n    scanf(\"%d\", &n);\n    printf(\"%d\\n\", n * 2);\n    return 0;\n}\n";

const C_ASSIGNMENT_MAIN: &str = "#include <stdio.h>\n\nint main(void) {\n    /* Read the input and print the answer */\n    return 0;\n}\n";

pub static PRESETS: &[LanguagePreset] = &[
    LanguagePreset {
        id: "web",
        label: "HTML / CSS / JS",
        runtime_kind: RuntimeKind::NativeBrowser,
        harness: Harness::WebBasics,
        hot_reload: true,
        surface: Surface::LearnerWebPreview,
        files: &[
            FileSpec { name: "index.html", language: FileLanguage::Html, starter: WEB_HTML },
            FileSpec { name: "styles.css", language: FileLanguage::Css, starter: WEB_CSS },
            FileSpec { name: "script.js", language: FileLanguage::Js, starter: WEB_JS },
        ],
    },
    LanguagePreset {
        id: "react",
        label: "React",
        runtime_kind: RuntimeKind::Transpile,
        harness: Harness::React,
        hot_reload: true,
        surface: Surface::CodePreview,
        files: &[
            FileSpec { name: "App.tsx", language: FileLanguage::Tsx, starter: REACT_APP },
            FileSpec { name: "styles.css", language: FileLanguage::Css, starter: REACT_CSS },
        ],
    },
    LanguagePreset {
        id: "vue",
        label: "Vue",
        runtime_kind: RuntimeKind::Transpile,
        harness: Harness::Vue,
        hot_reload: true,
        surface: Surface::CodePreview,
        files: &[FileSpec { name: "App.vue", language: FileLanguage::VueSfc, starter: VUE_APP }],
    },
    LanguagePreset {
        id: "typescript",
        label: "TypeScript",
        runtime_kind: RuntimeKind::NativeBrowser,
        harness: Harness::Script,
        hot_reload: false,
        surface: Surface::CodePreview,
        files: &[FileSpec { name: "main.ts", language: FileLanguage::Ts, starter: TS_MAIN }],
    },
    LanguagePreset {
        id: "python",
        label: "Python",
        runtime_kind: RuntimeKind::WasmInterpreter,
        harness: Harness::Python,
        hot_reload: false,
        surface: Surface::CodePreview,
        files: &[FileSpec { name: "main.py", language: FileLanguage::Py, starter: PY_MAIN }],
    },
    LanguagePreset {
        id: "c",
        label: "C",
        runtime_kind: RuntimeKind::WasmInterpreter,
        harness: Harness::C,
        hot_reload: false,
        surface: Surface::CodePreview,
        files: &[FileSpec { name: "main.c", language: FileLanguage::C, starter: C_MAIN }],
    },
    LanguagePreset {
        id: "c-assignment",
        label: "C (assignment)",
        runtime_kind: RuntimeKind::WasmInterpreter,
        harness: Harness::C,
        hot_reload: false,
        surface: Surface::MonacoPreview,
        files: &[FileSpec { name: "main.c", language: FileLanguage::C, starter: C_ASSIGNMENT_MAIN }],
    },
];

/// Returned for ids that are not in the catalog: shows the raw source as text.
pub static PLAIN_PRESET: LanguagePreset = LanguagePreset {
    id: "plain",
    label: "Plain text",
    runtime_kind: RuntimeKind::NativeBrowser,
    harness: Harness::PlainText,
    hot_reload: true,
    surface: Surface::CodePreview,
    files: &[FileSpec { name: "main.txt", language: FileLanguage::Text, starter: "" }],
};

pub fn presets() -> &'static [LanguagePreset] {
    PRESETS
}

pub fn find_preset(id: &str) -> Option<&'static LanguagePreset> {
    PRESETS.iter().find(|p| p.id == id)
}

/// Strict lookup for callers that must reject unknown ids, such as the
/// `fetch` and `save` commands.
pub fn lookup(id: &str) -> PreviewResult<&'static LanguagePreset> {
    find_preset(id).ok_or_else(|| PreviewError::UnknownPreset { id: id.to_string() })
}

pub fn resolve_preset(id: &str) -> &'static LanguagePreset {
    find_preset(id).unwrap_or(&PLAIN_PRESET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_has_files() {
        for p in presets() {
            assert!(!p.files.is_empty(), "{} has no files", p.id);
        }
        assert!(!PLAIN_PRESET.files.is_empty());
    }

    #[test]
    fn preset_ids_are_unique() {
        let mut ids: Vec<_> = presets().iter().map(|p| p.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), presets().len());
    }

    #[test]
    fn unknown_id_resolves_to_plain() {
        let p = resolve_preset("cobol");
        assert_eq!(p.id, "plain");
        assert!(p.is_plain());
        assert!(matches!(lookup("cobol"), Err(PreviewError::UnknownPreset { .. })));
    }

    #[test]
    fn manual_presets_do_not_hot_reload() {
        for id in ["typescript", "python", "c", "c-assignment"] {
            assert!(!resolve_preset(id).hot_reload, "{} should wait for run", id);
        }
        for id in ["web", "react", "vue"] {
            assert!(resolve_preset(id).hot_reload, "{} should hot reload", id);
        }
    }

    #[test]
    fn file_spec_lookup() {
        let web = resolve_preset("web");
        assert_eq!(web.file_spec("styles.css").unwrap().language, FileLanguage::Css);
        assert!(web.file_spec("nope.js").is_err());
    }
}
