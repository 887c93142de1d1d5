//! Third-party runtime scripts loaded by the harnesses.

use crate::registry::Harness;
use serde::{Deserialize, Serialize};

pub const REACT_URL: &str = "https://unpkg.com/react@18.3.1/umd/react.development.js";
pub const REACT_DOM_URL: &str = "https://unpkg.com/react-dom@18.3.1/umd/react-dom.development.js";
pub const BABEL_URL: &str = "https://unpkg.com/@babel/standalone@7.24.7/babel.min.js";
pub const VUE_URL: &str = "https://unpkg.com/vue@3.4.31/dist/vue.global.js";
/// Emscripten build of the picoc interpreter (exports `FS` and `callMain`).
pub const PICOC_URL: &str = "https://cdn.jsdelivr.net/npm/picoc-wasm@0.2.0/dist/picoc.js";
pub const PYODIDE_URL: &str = "https://cdn.jsdelivr.net/pyodide/v0.26.2/full/pyodide.js";

/// Script URLs per harness, in load order. Overridable from config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CdnTable {
    pub react: Vec<String>,
    pub vue: Vec<String>,
    pub c: Vec<String>,
    pub python: Vec<String>,
}

impl Default for CdnTable {
    fn default() -> Self {
        Self {
            react: vec![
                REACT_URL.to_string(),
                REACT_DOM_URL.to_string(),
                BABEL_URL.to_string(),
            ],
            vue: vec![VUE_URL.to_string()],
            c: vec![PICOC_URL.to_string()],
            python: vec![PYODIDE_URL.to_string()],
        }
    }
}

impl CdnTable {
    /// Scripts a harness needs before user code can run. Empty for harnesses
    /// that execute natively.
    pub fn scripts(&self, harness: Harness) -> &[String] {
        match harness {
            Harness::React => &self.react,
            Harness::Vue => &self.vue,
            Harness::C => &self.c,
            Harness::Python => &self.python,
            Harness::WebBasics | Harness::Script | Harness::PlainText => &[],
        }
    }
}

/// Append a cache-busting query parameter.
pub fn with_cache_bust(url: &str, cache_bust: Option<u64>) -> String {
    match cache_bust {
        Some(v) if url.contains('?') => format!("{}&v={}", url, v),
        Some(v) => format!("{}?v={}", url, v),
        None => url.to_string(),
    }
}
