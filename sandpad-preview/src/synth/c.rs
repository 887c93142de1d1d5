//! C through an Emscripten build of an interpreter.
//!
//! `Module` is configured before the interpreter script loads: output hooks
//! collect stdout and stderr, and `onRuntimeInitialized` writes the source into
//! the virtual filesystem and calls `main`. `scanf` reads through
//! `window.prompt`, which is overridden to hand out the pre-split stdin lines.

use super::{harness, Input, Page};
use crate::escape::{js_string_array, js_string_literal};
use crate::project::FileLanguage;
use std::fmt::{self, Write};

pub(crate) const SOURCE_PATH: &str = "/main.c";

/// Stdin split into the lines `prompt()` hands out, one per call.
pub(crate) fn stdin_lines(stdin: Option<&str>) -> Vec<String> {
    stdin
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

pub(super) fn build(input: &Input<'_>) -> Result<Page, fmt::Error> {
    let mut page = Page::default();
    harness::relay_script(&mut page.head, input.run_id())?;

    let stdin = stdin_lines(input.options.stdin.as_deref());
    writeln!(page.body, "<pre id=\"output\"></pre>")?;
    harness::status_markup(&mut page.body, true)?;
    writeln!(
        page.body,
        r#"<script>
(function () {{
  var source = {source};
  var stdin = {stdin};
  var stdout = [];
  var stderr = [];
  window.prompt = function () {{
    return stdin.length ? stdin.shift() : null;
  }};
  window.Module = {{
    noInitialRun: true,
    print: function (text) {{
      stdout.push(text);
      __sandpad.output(text, false);
    }},
    printErr: function (text) {{
      stderr.push(text);
      __sandpad.output(text, true);
    }},
    onRuntimeInitialized: function () {{
      __sandpad.mark();
      try {{
        var fs = Module.FS || window.FS;
        fs.writeFile({path}, source);
        Module.callMain([{path}]);
      }} catch (e) {{
        if (!(e && e.name === 'ExitStatus')) stderr.push(String((e && e.message) || e));
      }}
      var errText = stderr.join('\n');
      var failed = /error/i.test(errText);
      var status = 'success';
      if (failed) status = stdout.length ? 'runtime-error' : 'compile-error';
      __sandpad.finish(status, {{
        stdout: stdout.join('\n'),
        stderr: errText,
        exitCode: failed ? 1 : 0
      }});
    }}
  }};
}})();
</script>"#,
        source = js_string_literal(input.source(FileLanguage::C)),
        stdin = js_string_array(&stdin),
        path = js_string_literal(SOURCE_PATH),
    )?;
    // The interpreter must load after `Module` exists.
    for url in input.cdn_urls() {
        harness::cdn_script(&mut page.body, &url)?;
    }
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdin_splits_on_lines() {
        assert_eq!(stdin_lines(Some("5\n7\n")), vec!["5", "7"]);
        assert_eq!(stdin_lines(Some("")), Vec::<String>::new());
        assert!(stdin_lines(None).is_empty());
    }
}
