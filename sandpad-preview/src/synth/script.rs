use super::{harness, runnable_head, Input, Page};
use crate::escape::script_block_body;
use crate::project::FileLanguage;
use crate::strip::strip_types;
use std::fmt::{self, Write};

/// TypeScript run as a plain script. Console output is mirrored into a visible
/// `#output` panel as well as the real console.
pub(super) fn build(input: &Input<'_>) -> Result<Page, fmt::Error> {
    let mut page = Page::default();
    runnable_head(input, &mut page.head)?;

    let source = match input.source(FileLanguage::Ts) {
        "" => input.source(FileLanguage::Js),
        ts => ts,
    };
    let code = strip_types(source);

    writeln!(page.body, "<pre id=\"output\"></pre>")?;
    harness::status_markup(&mut page.body, false)?;
    writeln!(
        page.body,
        r#"<script>
__sandpad.captureConsole(function (stream, text) {{
  __sandpad.output(text, stream === 'error' || stream === 'warn');
}});
</script>
<script>
try {{
{}
}} catch (e) {{
  console.error(e);
  __sandpad.fail('runtime-error', e);
}}
__sandpad.done();
</script>"#,
        script_block_body(&code)
    )?;
    Ok(page)
}
