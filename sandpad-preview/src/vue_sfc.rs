//! Single-file-component splitting by delimiter scanning.
//!
//! Not a parser: blocks are found by their opening and closing tags, and the
//! bindings a component exposes are found by a lightweight source scan.

use crate::strip::strip_types;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VueParts {
    pub template: String,
    pub script: String,
    /// The script came from `<script setup>`.
    pub setup: bool,
    pub style: String,
    /// Identifiers returned from `setup()` (or declared at the top level of a
    /// `<script setup>` block).
    pub returned: Vec<String>,
}

/// Split an SFC into template, script and style text.
///
/// A `lang="ts"` script is passed through the annotation stripper. Missing
/// blocks come back empty.
pub fn parse_sfc(src: &str) -> VueParts {
    let template = outer_block(src, "template").map(|(_, body)| body).unwrap_or_default();
    let style = first_block(src, "style").map(|(_, body)| body).unwrap_or_default();
    let (attrs, script) = first_block(src, "script").unwrap_or_default();

    let setup = attrs.split_whitespace().any(|a| a == "setup");
    let is_ts = attrs.contains("lang=\"ts\"") || attrs.contains("lang='ts'");
    let script = if is_ts { strip_types(&script) } else { script };

    let returned = if setup {
        top_level_bindings(&script)
    } else {
        setup_returned_bindings(&script)
    };

    VueParts {
        template: template.trim().to_string(),
        script,
        setup,
        style,
        returned,
    }
}

/// First `<tag ...>body</tag>`; returns (attributes, body).
fn first_block(src: &str, tag: &str) -> Option<(String, String)> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let start = find_open_tag(src, &open)?;
    let head_end = start + src[start..].find('>')?;
    let attrs = src[start + open.len()..head_end].trim().to_string();
    let body_start = head_end + 1;
    let body_end = body_start + src[body_start..].find(&close)?;
    Some((attrs, src[body_start..body_end].to_string()))
}

/// Like [`first_block`] but closes at the last closing tag, so nested
/// `<template v-if>` blocks stay inside the outer template.
fn outer_block(src: &str, tag: &str) -> Option<(String, String)> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let start = find_open_tag(src, &open)?;
    let head_end = start + src[start..].find('>')?;
    let attrs = src[start + open.len()..head_end].trim().to_string();
    let body_start = head_end + 1;
    let body_end = src.rfind(&close).filter(|&e| e >= body_start)?;
    Some((attrs, src[body_start..body_end].to_string()))
}

/// Position of `<tag` followed by `>` or whitespace (so `<script` does not
/// match `<scripts`).
fn find_open_tag(src: &str, open: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(rel) = src[from..].find(open) {
        let at = from + rel;
        let next = src[at + open.len()..].chars().next();
        if matches!(next, Some(c) if c == '>' || c.is_whitespace()) {
            return Some(at);
        }
        from = at + open.len();
    }
    None
}

fn declaration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^(?:export\s+)?(?:const|let|var|class|(?:async\s+)?function\*?)\s+([A-Za-z_$][\w$]*)")
            .expect("declaration pattern must compile")
    })
}

/// Names declared at column zero of a `<script setup>` body.
pub fn top_level_bindings(script: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for cap in declaration_re().captures_iter(script) {
        let name = cap[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Keys of the object literal returned from `setup(...)`.
pub fn setup_returned_bindings(script: &str) -> Vec<String> {
    let Some(setup_at) = script.find("setup(") else {
        return Vec::new();
    };
    let after = &script[setup_at..];
    let Some(ret) = after.find("return {") else {
        return Vec::new();
    };
    let body_start = ret + "return {".len();
    let mut depth = 1usize;
    let mut body_end = None;
    for (i, c) in after[body_start..].char_indices() {
        match c {
            '{' | '(' | '[' => depth += 1,
            '}' | ')' | ']' => {
                depth -= 1;
                if depth == 0 {
                    body_end = Some(body_start + i);
                    break;
                }
            }
            _ => {}
        }
    }
    let Some(body_end) = body_end else {
        return Vec::new();
    };
    split_top_level(&after[body_start..body_end])
        .into_iter()
        .filter_map(|entry| {
            let key = entry.split(':').next()?.trim();
            let key = key.trim_start_matches("...");
            let ident = key.split(|c: char| c == '(' || c.is_whitespace()).next()?;
            let valid = ident
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$');
            valid.then(|| ident.to_string())
        })
        .collect()
}

/// Split on commas that are not nested in brackets.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut last = 0;
    for (i, c) in s.char_indices() {
        match c {
            '{' | '(' | '[' => depth += 1,
            '}' | ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&s[last..i]);
                last = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[last..]);
    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}
