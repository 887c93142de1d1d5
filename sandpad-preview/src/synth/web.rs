use super::{runnable_head, style_block, Input, Page};
use crate::escape::script_block_body;
use crate::project::FileLanguage;
use std::fmt::{self, Write};

/// HTML body as written, CSS in a `<style>`, JS wrapped so a thrown error is
/// logged and reported instead of stopping silently.
pub(super) fn build(input: &Input<'_>) -> Result<Page, fmt::Error> {
    let mut page = Page::default();
    runnable_head(input, &mut page.head)?;
    style_block(&mut page.head, input.source(FileLanguage::Css))?;

    writeln!(page.body, "{}", input.source(FileLanguage::Html))?;
    writeln!(
        page.body,
        r#"<script>
__sandpad.captureConsole();
try {{
{}
}} catch (e) {{
  console.error(e);
  __sandpad.fail(e instanceof SyntaxError ? 'compile-error' : 'runtime-error', e);
}}
__sandpad.done();
</script>"#,
        script_block_body(input.source(FileLanguage::Js))
    )?;
    Ok(page)
}
