//! React: strip annotations, map module imports onto the UMD globals, and let
//! Babel standalone compile JSX inside the sandbox.

use super::{harness, runnable_head, style_block, Input, Page};
use crate::escape::js_string_literal;
use crate::project::FileLanguage;
use crate::strip::strip_types;
use regex::{Captures, Regex};
use std::fmt::{self, Write};
use std::sync::OnceLock;

const DEFAULT_COMPONENT: &str = "App";

struct Patterns {
    react_import: Regex,
    other_import: Regex,
    default_named: Regex,
    default_ident: Regex,
    default_expr: Regex,
    named_export: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let build = |p: &str| Regex::new(p).expect("react pattern must compile");
        Patterns {
            react_import: build(
                r#"(?m)^[ \t]*import\s+([^;\n]+?)\s+from\s+['"](react|react-dom|react-dom/client)['"];?[ \t]*$"#,
            ),
            other_import: build(r#"(?m)^[ \t]*import\s+(?:[^;\n]+?\s+from\s+)?['"][^'"\n]+['"];?[ \t]*\n?"#),
            default_named: build(r"(?m)^([ \t]*)export\s+default\s+((?:async\s+)?function\*?|class)\s+([A-Za-z_$][\w$]*)"),
            default_ident: build(r"(?m)^[ \t]*export\s+default\s+([A-Za-z_$][\w$]*)\s*;?[ \t]*$"),
            default_expr: build(r"(?m)^([ \t]*)export\s+default\s+"),
            named_export: build(r"(?m)^([ \t]*)export\s+((?:async\s+)?function|class|const|let|var)\b"),
        }
    })
}

/// Module-free source plus the name of the component to mount.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Prepared {
    pub code: String,
    pub component: String,
}

pub(crate) fn prepare(src: &str) -> Prepared {
    let p = patterns();
    let stripped = strip_types(src);

    let code = p
        .react_import
        .replace_all(&stripped, |c: &Captures| import_to_global(&c[1], &c[2]))
        .into_owned();
    let code = p.other_import.replace_all(&code, "").into_owned();

    let mut component = None;
    let code = if let Some(c) = p.default_named.captures(&code) {
        component = Some(c[3].to_string());
        p.default_named.replace(&code, "${1}${2} ${3}").into_owned()
    } else if let Some(c) = p.default_ident.captures(&code) {
        component = Some(c[1].to_string());
        p.default_ident.replace(&code, "").into_owned()
    } else if p.default_expr.is_match(&code) {
        p.default_expr
            .replace(&code, format!("${{1}}const {} = ", DEFAULT_COMPONENT))
            .into_owned()
    } else {
        code
    };
    let code = p.named_export.replace_all(&code, "${1}${2}").into_owned();

    Prepared {
        code,
        component: component.unwrap_or_else(|| DEFAULT_COMPONENT.to_string()),
    }
}

/// `import React, { useState as us } from 'react'` → `const { useState: us } = React;`
fn import_to_global(clause: &str, module: &str) -> String {
    let global = if module == "react" { "React" } else { "ReactDOM" };
    let mut decls = Vec::new();
    let (default_part, named_part) = match clause.find('{') {
        Some(open) => {
            let close = clause.rfind('}').unwrap_or(clause.len());
            (&clause[..open], Some(&clause[open + 1..close.max(open + 1)]))
        }
        None => (clause, None),
    };
    let default_part = default_part.trim().trim_end_matches(',').trim();
    let default_name = default_part
        .strip_prefix("* as ")
        .map(str::trim)
        .unwrap_or(default_part);
    if !default_name.is_empty() && default_name != global {
        decls.push(format!("const {} = {};", default_name, global));
    }
    if let Some(named) = named_part {
        let names: Vec<String> = named
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty() && !n.starts_with("type "))
            .map(|n| match n.split_once(" as ") {
                Some((orig, alias)) => format!("{}: {}", orig.trim(), alias.trim()),
                None => n.to_string(),
            })
            .collect();
        if !names.is_empty() {
            decls.push(format!("const {{ {} }} = {};", names.join(", "), global));
        }
    }
    decls.join(" ")
}

pub(super) fn build(input: &Input<'_>) -> Result<Page, fmt::Error> {
    let mut page = Page::default();
    runnable_head(input, &mut page.head)?;
    style_block(&mut page.head, input.source(FileLanguage::Css))?;

    let prepared = prepare(input.source(FileLanguage::Tsx));
    harness::status_markup(&mut page.body, true)?;
    writeln!(page.body, "<div id=\"root\"></div>")?;
    writeln!(
        page.body,
        r#"<script>
(function () {{
  if (typeof React === 'undefined' || typeof ReactDOM === 'undefined' || typeof Babel === 'undefined') {{
    __sandpad.infra('react runtime');
    return;
  }}
  __sandpad.captureConsole();
  var source = {source};
  var name = {name};
  var compiled;
  try {{
    compiled = Babel.transform(source, {{ presets: ['react'] }}).code;
  }} catch (e) {{
    __sandpad.fail('compile-error', e);
    return;
  }}
  try {{
    var Component = new Function('React', 'ReactDOM', compiled + '\nreturn ' + name + ';')(React, ReactDOM);
    ReactDOM.createRoot(document.getElementById('root')).render(React.createElement(Component));
    __sandpad.done();
  }} catch (e) {{
    console.error(e);
    __sandpad.fail('runtime-error', e);
  }}
}})();
</script>"#,
        source = js_string_literal(&prepared.code),
        name = js_string_literal(&prepared.component),
    )?;
    Ok(page)
}
