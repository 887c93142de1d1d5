use super::{harness, runnable_head, Input, Page};
use crate::escape::js_string_literal;
use crate::project::FileLanguage;
use std::fmt::{self, Write};

/// Python source run by Pyodide, with `sys.stdout`/`sys.stderr` swapped for
/// `io.StringIO` buffers for the duration of the run.
pub(super) fn build(input: &Input<'_>) -> Result<Page, fmt::Error> {
    let mut page = Page::default();
    runnable_head(input, &mut page.head)?;

    writeln!(page.body, "<pre id=\"output\"></pre>")?;
    harness::status_markup(&mut page.body, true)?;
    writeln!(
        page.body,
        r#"<script>
(async function () {{
  if (typeof loadPyodide === 'undefined') {{
    __sandpad.infra('pyodide');
    return;
  }}
  var source = {source};
  var py;
  try {{
    py = await loadPyodide();
  }} catch (e) {{
    __sandpad.fail('infra-error', e);
    return;
  }}
  __sandpad.mark();
  var result = {{ status: 'success' }};
  var traceback = '';
  py.runPython('import sys, io\n__sp_out, __sp_err = io.StringIO(), io.StringIO()\n__sp_saved = (sys.stdout, sys.stderr)\nsys.stdout, sys.stderr = __sp_out, __sp_err');
  try {{
    var value = await py.runPythonAsync(source);
    if (value !== undefined && value !== null) {{
      result.value = String(value);
      if (value.destroy) value.destroy();
    }}
  }} catch (e) {{
    traceback = String((e && e.message) || e);
    result.status = /(SyntaxError|IndentationError)/.test(traceback) ? 'compile-error' : 'runtime-error';
    var last = traceback.trim().split('\n').pop();
    result.message = last;
  }} finally {{
    result.stdout = py.runPython('__sp_out.getvalue()');
    result.stderr = py.runPython('__sp_err.getvalue()');
    py.runPython('sys.stdout, sys.stderr = __sp_saved');
  }}
  if (traceback) result.stderr += (result.stderr && result.stderr.slice(-1) !== '\n' ? '\n' : '') + traceback;
  result.stdout.split('\n').forEach(function (l) {{ if (l) __sandpad.output(l, false); }});
  result.stderr.split('\n').forEach(function (l) {{ if (l) __sandpad.output(l, true); }});
  if (result.value !== undefined) __sandpad.output(result.value, false);
  var status = result.status;
  delete result.status;
  __sandpad.finish(status, result);
}})();
</script>"#,
        source = js_string_literal(input.source(FileLanguage::Py)),
    )?;
    Ok(page)
}
