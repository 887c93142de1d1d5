use super::{harness, runnable_head, style_block, Input, Page};
use crate::escape::{js_string_literal, template_literal_body};
use crate::project::FileLanguage;
use crate::vue_sfc::{parse_sfc, VueParts};
use regex::{Captures, Regex};
use std::fmt::{self, Write};
use std::sync::OnceLock;

fn vue_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^[ \t]*import\s+\{([^}]*)\}\s+from\s+['"]vue['"];?[ \t]*$"#)
            .expect("vue import pattern must compile")
    })
}

fn other_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^[ \t]*import\s+(?:[^;\n]+?\s+from\s+)?['"][^'"\n]+['"];?[ \t]*\n?"#)
            .expect("import pattern must compile")
    })
}

fn export_default() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^([ \t]*)export\s+default\s+").expect("export pattern must compile")
    })
}

/// Script body that leaves the component object in `__component`.
pub(crate) fn component_script(parts: &VueParts) -> String {
    let script = vue_import()
        .replace_all(&parts.script, |c: &Captures| {
            let names = c[1]
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(|n| match n.split_once(" as ") {
                    Some((orig, alias)) => format!("{}: {}", orig.trim(), alias.trim()),
                    None => n.to_string(),
                })
                .collect::<Vec<_>>();
            format!("const {{ {} }} = Vue;", names.join(", "))
        })
        .into_owned();
    let script = other_import().replace_all(&script, "").into_owned();

    if parts.setup {
        let (imports, body) = split_leading_vue_destructure(&script);
        format!(
            "{}const __component = {{\n  setup() {{\n{}\n    return {{ {} }};\n  }}\n}};",
            imports,
            body.trim_end(),
            parts.returned.join(", ")
        )
    } else if export_default().is_match(&script) {
        export_default()
            .replace(&script, "${1}const __component = ")
            .into_owned()
    } else {
        format!("{}\nconst __component = {{}};", script)
    }
}

/// Keep `const { … } = Vue;` lines outside `setup()` so the setup body holds
/// only the learner's declarations.
fn split_leading_vue_destructure(script: &str) -> (String, String) {
    let mut imports = String::new();
    let mut body = String::new();
    for line in script.lines() {
        if line.trim_start().starts_with("const {") && line.trim_end().ends_with("} = Vue;") {
            imports.push_str(line.trim());
            imports.push('\n');
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }
    (imports, body)
}

pub(super) fn build(input: &Input<'_>) -> Result<Page, fmt::Error> {
    let parts = parse_sfc(input.source(FileLanguage::VueSfc));
    let mut page = Page::default();
    runnable_head(input, &mut page.head)?;
    style_block(&mut page.head, &parts.style)?;

    harness::status_markup(&mut page.body, true)?;
    writeln!(page.body, "<div id=\"app\"></div>")?;
    writeln!(
        page.body,
        r#"<script>
(function () {{
  if (typeof Vue === 'undefined') {{
    __sandpad.infra('vue runtime');
    return;
  }}
  __sandpad.captureConsole();
  var template = `{template}`;
  var source = {source};
  var component;
  try {{
    component = new Function('Vue', source + '\nreturn __component;')(Vue);
  }} catch (e) {{
    __sandpad.fail(e instanceof SyntaxError ? 'compile-error' : 'runtime-error', e);
    return;
  }}
  component.template = template;
  try {{
    var app = Vue.createApp(component);
    app.config.errorHandler = function (err) {{
      console.error(err);
      __sandpad.fail('runtime-error', err);
    }};
    app.mount('#app');
    __sandpad.done();
  }} catch (e) {{
    console.error(e);
    __sandpad.fail('runtime-error', e);
  }}
}})();
</script>"#,
        template = template_literal_body(&parts.template),
        source = js_string_literal(&component_script(&parts)),
    )?;
    Ok(page)
}
