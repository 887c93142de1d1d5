use super::{Input, Page};
use crate::escape::escape_html;
use std::fmt::{self, Write};

/// Every file as escaped text. No scripts, so nothing is posted back.
pub(super) fn build(input: &Input<'_>) -> Result<Page, fmt::Error> {
    let mut page = Page::default();
    for file in input.files {
        writeln!(
            page.body,
            "<section class=\"file\"><h2>{}</h2><pre>{}</pre></section>",
            escape_html(&file.name),
            escape_html(&file.content)
        )?;
    }
    Ok(page)
}
