//! Escaping rules for embedding user source into a synthesized document.
//!
//! User text must never be able to close the script block (or attribute) that
//! carries it. Each helper has an exact inverse, so the embedded text can be
//! recovered byte for byte.

/// Escape text for HTML element content and double-quoted attributes.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Encode `s` as a JavaScript string literal, JSON style.
///
/// `<` is written as `\u003c` so `</script>` and `<!--` cannot appear, and the
/// line separators U+2028/U+2029 are escaped for older parsers. The output is
/// still valid JSON, so `serde_json::from_str` recovers the input.
pub fn js_string_literal(s: &str) -> String {
    let json = match serde_json::to_string(s) {
        Ok(json) => json,
        // Serializing a &str cannot fail; keep an empty literal as the fallback.
        Err(_) => return "\"\"".to_string(),
    };
    json.replace('<', "\\u003c")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

/// Encode a list of strings as a JavaScript array literal of escaped strings.
pub fn js_string_array(items: &[String]) -> String {
    let parts: Vec<String> = items.iter().map(|s| js_string_literal(s)).collect();
    format!("[{}]", parts.join(","))
}

/// Encode `s` as the body of a JavaScript template literal (without the
/// surrounding backticks).
///
/// Backslashes, backticks and `$` are escaped, so neither the closing backtick
/// nor `${` interpolation can be produced by user text. `</` becomes `<\/`.
pub fn template_literal_body(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            '$' => out.push_str("\\$"),
            '<' if chars.peek() == Some(&'/') => {
                chars.next();
                out.push_str("<\\/");
            }
            _ => out.push(c),
        }
    }
    out
}

/// Neutralize `</script` inside source that is placed literally in a script
/// block. The match is case-insensitive, as in the HTML tokenizer.
pub fn script_block_body(s: &str) -> String {
    const NEEDLE: &[u8] = b"</script";
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    let mut i = 0;
    while i + NEEDLE.len() <= bytes.len() {
        if bytes[i..i + NEEDLE.len()].eq_ignore_ascii_case(NEEDLE) {
            out.push_str(&s[last..i]);
            out.push_str("<\\/");
            // keep the original casing of "script"
            out.push_str(&s[i + 2..i + NEEDLE.len()]);
            i += NEEDLE.len();
            last = i;
        } else {
            i += 1;
        }
    }
    out.push_str(&s[last..]);
    out
}

#[cfg(test)]
pub(crate) fn unescape_template_literal_body(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(n) => out.push(n),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn html_escapes_markup() {
        assert_eq!(escape_html("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }

    #[test]
    fn js_literal_cannot_close_script() {
        let lit = js_string_literal("x</script><script>alert(1)</script>");
        assert!(!lit.contains("</"));
        assert!(!lit.contains('<'));
        let back: String = serde_json::from_str(&lit).unwrap();
        assert_eq!(back, "x</script><script>alert(1)</script>");
    }

    #[test]
    fn js_literal_keeps_backticks_and_dollars() {
        let src = "const s = `${a}`; $('#x');";
        let lit = js_string_literal(src);
        let back: String = serde_json::from_str(&lit).unwrap();
        assert_eq!(back, src);
    }

    #[test]
    fn template_body_escapes_delimiters() {
        let body = template_literal_body("a`b${c}\\d</div>");
        assert_eq!(body, "a\\`b\\${c}\\\\d<\\/div>");
        assert_eq!(unescape_template_literal_body(&body), "a`b${c}\\d</div>");
    }

    #[test]
    fn script_body_neutralizes_closing_tag() {
        let out = script_block_body("let s = '</SCRIPT>'; let t = '</script >';");
        assert_eq!(out, "let s = '<\\/SCRIPT>'; let t = '<\\/script >';");
        assert_eq!(script_block_body("console.log(1)"), "console.log(1)");
    }

    #[test]
    fn string_array_literal() {
        let lit = js_string_array(&["5".to_string(), "a\"b".to_string()]);
        assert_eq!(lit, "[\"5\",\"a\\\"b\"]");
        let back: Vec<String> = serde_json::from_str(&lit).unwrap();
        assert_eq!(back, vec!["5", "a\"b"]);
    }

    proptest! {
        #[test]
        fn js_literal_round_trips(s in "\\PC*") {
            let lit = js_string_literal(&s);
            prop_assert!(!lit.contains("</"));
            let back: String = serde_json::from_str(&lit).unwrap();
            prop_assert_eq!(back, s);
        }

        #[test]
        fn template_body_round_trips(s in "[a-z`$\\\\{}</ ]*") {
            let body = template_literal_body(&s);
            prop_assert!(!body.replace("\\$", "").contains('$'));
            prop_assert!(!body.contains("</"));
            prop_assert_eq!(unescape_template_literal_body(&body), s);
        }
    }
}
