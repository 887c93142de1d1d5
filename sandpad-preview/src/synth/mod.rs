//! Document synthesizers: learner files in, one self-contained HTML page out.
//!
//! Each harness family has its own module. All of them are pure and
//! deterministic: the same files and options always give the same bytes.

mod c;
pub(crate) mod harness;
mod plain;
mod python;
mod react;
mod script;
mod vue;
mod web;

use crate::cdn::{with_cache_bust, CdnTable};
use crate::escape::escape_html;
use crate::project::{FileLanguage, ProjectFile};
use crate::registry::{Harness, LanguagePreset};
use std::fmt::{self, Write};

/// Base styles for the status line and output panel.
const BASE_STYLES: &str = "#sandpad-status{font:12px/1.4 ui-monospace,monospace;padding:4px 8px;border-top:1px solid #e4e4e7;}\
#sandpad-status.ok{color:#15803d;}\
#sandpad-status.err{color:#b91c1c;}\
#sandpad-loading{font:12px system-ui,sans-serif;color:#71717a;padding:4px 8px;}\
#output{font:13px/1.5 ui-monospace,monospace;white-space:pre-wrap;margin:0;padding:8px;}\
#output .err{color:#b91c1c;}";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthOptions {
    /// Correlates the posted result with the render that produced it.
    pub run_id: Option<String>,
    /// Appended to CDN URLs as `?v=<n>`.
    pub cache_bust: Option<u64>,
    /// Standard input for the C harness, one `scanf` line per `prompt()` call.
    pub stdin: Option<String>,
    pub cdn: CdnTable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedDocument {
    pub html: String,
    pub harness: Harness,
    pub run_id: Option<String>,
}

/// Head and body fragments produced by a family builder.
#[derive(Default)]
pub(crate) struct Page {
    pub head: String,
    pub body: String,
}

/// What every family builder sees.
pub(crate) struct Input<'a> {
    pub preset: &'a LanguagePreset,
    pub files: &'a [ProjectFile],
    pub options: &'a SynthOptions,
}

impl Input<'_> {
    /// Content of the first file with `language`, or of the preset file named
    /// `fallback_name`, or the empty string.
    pub fn source(&self, language: FileLanguage) -> &str {
        self.files
            .iter()
            .find(|f| f.language == language)
            .or_else(|| {
                let spec = self.preset.files.iter().find(|s| s.language == language)?;
                self.files.iter().find(|f| f.name == spec.name)
            })
            .map(|f| f.content.as_str())
            .unwrap_or("")
    }

    /// CDN scripts for this preset's harness, cache-busted.
    pub fn cdn_urls(&self) -> Vec<String> {
        self.options
            .cdn
            .scripts(self.preset.harness)
            .iter()
            .map(|u| with_cache_bust(u, self.options.cache_bust))
            .collect()
    }

    pub fn run_id(&self) -> Option<&str> {
        self.options.run_id.as_deref()
    }
}

pub fn synthesize(
    preset: &LanguagePreset,
    files: &[ProjectFile],
    options: &SynthOptions,
) -> SynthesizedDocument {
    let input = Input {
        preset,
        files,
        options,
    };
    let page = match preset.harness {
        Harness::WebBasics => web::build(&input),
        Harness::React => react::build(&input),
        Harness::Vue => vue::build(&input),
        Harness::Script => script::build(&input),
        Harness::C => c::build(&input),
        Harness::Python => python::build(&input),
        Harness::PlainText => plain::build(&input),
    };
    // fmt::Write into a String only fails when a Display impl does; ours don't.
    let html = page
        .and_then(|p| write_document(preset.label, &p))
        .unwrap_or_default();
    SynthesizedDocument {
        html,
        harness: preset.harness,
        run_id: options.run_id.clone(),
    }
}

fn write_document(title: &str, page: &Page) -> Result<String, fmt::Error> {
    let mut html = String::new();
    write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{}</title>
<style>{}</style>
{}</head>
<body>
{}</body>
</html>
"#,
        escape_html(title),
        BASE_STYLES,
        page.head,
        page.body
    )?;
    Ok(html)
}

/// A `<style>` block for user CSS. Only a literal `</style` could end it early.
pub(crate) fn style_block(out: &mut String, css: &str) -> fmt::Result {
    if css.trim().is_empty() {
        return Ok(());
    }
    writeln!(out, "<style>\n{}\n</style>", css.replace("</style", "<\\/style"))
}

/// Standard head for runnable documents: relay first, then CDN scripts.
pub(crate) fn runnable_head(input: &Input<'_>, out: &mut String) -> fmt::Result {
    harness::relay_script(out, input.run_id())?;
    for url in input.cdn_urls() {
        harness::cdn_script(out, &url)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::resolve_preset;

    #[test]
    fn document_has_doctype_and_title() {
        let preset = resolve_preset("web");
        let doc = synthesize(preset, &preset.starter_files(), &SynthOptions::default());
        assert!(doc.html.starts_with("<!DOCTYPE html>"));
        assert!(doc.html.contains("<title>HTML / CSS / JS</title>"));
        assert_eq!(doc.harness, Harness::WebBasics);
    }

    #[test]
    fn source_falls_back_to_empty() {
        let preset = resolve_preset("web");
        let options = SynthOptions::default();
        let input = Input {
            preset,
            files: &[],
            options: &options,
        };
        assert_eq!(input.source(FileLanguage::Css), "");
    }

    #[test]
    fn cdn_urls_are_cache_busted() {
        let preset = resolve_preset("vue");
        let options = SynthOptions {
            cache_bust: Some(3),
            ..SynthOptions::default()
        };
        let input = Input {
            preset,
            files: &[],
            options: &options,
        };
        assert!(input.cdn_urls()[0].ends_with("vue.global.js?v=3"));
    }
}
