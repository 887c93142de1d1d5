//! Regex-based TypeScript annotation stripping.
//!
//! This is a conservative approximation, not a parser. It removes the common
//! shapes learners write (`: Type` on declarations, parameters and return
//! types, `interface` and `type` declarations, `import type`, generic call
//! arguments, `as Type` casts before a closing delimiter). Known failure modes:
//! complex generic arguments, function-typed annotations, destructuring
//! annotations, and string or JSX text that happens to look like an annotation
//! (for example `Hello<b>(x)</b>` loses its `<b>`). Parameter detection counts
//! brackets without skipping string contents, so a `(` inside a string literal
//! can make `key: value` in a following object literal look like a parameter.

use regex::{Captures, Regex};
use std::sync::OnceLock;

const IDENT: &str = r"[A-Za-z_$][\w$]*";

/// One type operand: a (dotted) name with optional generic arguments nested
/// one level, a string/number literal type, then optional `[]` suffixes.
fn type_atom() -> String {
    let generic = r"<[^<>()=;\n]*(?:<[^<>()=;\n]*>[^<>()=;\n]*)*>";
    format!(
        r#"(?:[A-Za-z_$][\w$.]*(?:{generic})?|'[^'\n]*'|"[^"\n]*"|\d+)(?:\[\])*"#
    )
}

/// A union or intersection of atoms.
fn type_expr() -> String {
    let atom = type_atom();
    format!(r"{atom}(?:\s*[|&]\s*{atom})*")
}

struct Patterns {
    import_type: Regex,
    interface_head: Regex,
    type_alias_head: Regex,
    declaration: Regex,
    parameter: Regex,
    destructured_parameter: Regex,
    return_type: Regex,
    generic_call: Regex,
    cast: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let ty = type_expr();
        let build = |p: &str| Regex::new(p).expect("annotation pattern must compile");
        Patterns {
            import_type: build(r"(?m)^[ \t]*import\s+type\s+[^;\n]*;?[ \t]*\n?"),
            interface_head: build(&format!(r"(?m)^[ \t]*(?:export\s+)?interface\s+{IDENT}[^{{\n]*\{{")),
            type_alias_head: build(&format!(r"(?m)^[ \t]*(?:export\s+)?type\s+{IDENT}\s*(?:<[^>\n]*>)?\s*=")),
            declaration: build(&format!(r"\b(const|let|var)(\s+)({IDENT})\s*:\s*{ty}(\s*[=;])")),
            parameter: build(&format!(r"([(,]\s*)(\.\.\.)?({IDENT})\??\s*:\s*{ty}(\s*[,)=])")),
            destructured_parameter: build(&format!(r"([}}\]])\s*:\s*{ty}(\s*[,)=])")),
            return_type: build(&format!(r"\)\s*:\s*{ty}(\s*(?:\{{|=>))")),
            generic_call: build(&format!(r"\b({IDENT})\s*<{ty}(?:\s*,\s*{ty})*>\s*\(")),
            cast: build(&format!(r"([\w$)\]])\s+as\s+(?:const\b|{ty})(\s*[);,\]])")),
        }
    })
}

/// Remove TypeScript-only syntax, leaving JavaScript (or JSX) behind.
pub fn strip_types(src: &str) -> String {
    let p = patterns();
    let mut out = p.import_type.replace_all(src, "").into_owned();
    out = remove_blocks(&out, &p.interface_head);
    out = remove_type_aliases(&out, &p.type_alias_head);
    out = p
        .declaration
        .replace_all(&out, "${1}${2}${3}${4}")
        .into_owned();
    // Adjacent parameters share their separator, so repeat until stable.
    out = replace_until_stable(&out, &p.parameter, |text, c| {
        let start = c.get(0).map_or(0, |m| m.start());
        // `key: value` inside an object or array literal is not a parameter.
        if !in_parameter_list(&text[..=start]) {
            return c[0].to_string();
        }
        format!("{}{}{}{}", &c[1], c.get(2).map_or("", |m| m.as_str()), &c[3], &c[4])
    });
    out = replace_until_stable(&out, &p.destructured_parameter, |_, c| {
        format!("{}{}", &c[1], &c[2])
    });
    out = p.return_type.replace_all(&out, ")${1}").into_owned();
    out = p.generic_call.replace_all(&out, "${1}(").into_owned();
    out = p.cast.replace_all(&out, "${1}${2}").into_owned();
    out
}

/// `rep` sees the whole text of the current pass along with each match.
fn replace_until_stable<F>(src: &str, re: &Regex, rep: F) -> String
where
    F: Fn(&str, &Captures) -> String,
{
    let mut current = src.to_string();
    // Bounded: each pass removes at least one annotation or stops.
    for _ in 0..32 {
        let next = re
            .replace_all(&current, |c: &Captures| rep(&current, c))
            .into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Whether the innermost bracket still open at the end of `prefix` is `(`.
/// String contents are not skipped.
fn in_parameter_list(prefix: &str) -> bool {
    let mut depth = 0usize;
    for c in prefix.chars().rev() {
        match c {
            ')' | ']' | '}' => depth += 1,
            '(' | '[' | '{' if depth > 0 => depth -= 1,
            '(' => return true,
            '[' | '{' => return false,
            _ => {}
        }
    }
    false
}

/// Drop every block whose header matches `head`, through its matching `}`.
fn remove_blocks(src: &str, head: &Regex) -> String {
    let mut out = String::with_capacity(src.len());
    let mut rest = src;
    while let Some(m) = head.find(rest) {
        out.push_str(&rest[..m.start()]);
        let body_start = m.end();
        let end = match matching_brace(&rest[body_start..]) {
            Some(close) => body_start + close + 1,
            None => rest.len(),
        };
        rest = skip_line_end(&rest[end..]);
    }
    out.push_str(rest);
    out
}

/// Offset of the `}` closing an already-open brace.
fn matching_brace(s: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Drop a `type X = ...` alias up to its `;`, or up to a line end that is not
/// followed by a continuation (`|` or `&`).
fn remove_type_aliases(src: &str, head: &Regex) -> String {
    let mut out = String::with_capacity(src.len());
    let mut rest = src;
    while let Some(m) = head.find(rest) {
        out.push_str(&rest[..m.start()]);
        let tail = &rest[m.end()..];
        let end = alias_end(tail);
        rest = skip_line_end(&tail[end..]);
    }
    out.push_str(rest);
    out
}

fn alias_end(s: &str) -> usize {
    let mut depth = 0i32;
    let mut started = false;
    let mut prev = '\0';
    for (i, c) in s.char_indices() {
        let after_eq = prev == '=';
        prev = c;
        match c {
            // The arrow of a function type closes nothing.
            '>' if after_eq => {}
            '{' | '(' | '[' | '<' => depth += 1,
            '}' | ')' | ']' | '>' => depth -= 1,
            ';' if depth <= 0 => return i + 1,
            '\n' if depth <= 0 && started => {
                let next = s[i + 1..].trim_start();
                if !(next.starts_with('|') || next.starts_with('&')) {
                    return i;
                }
            }
            c if !c.is_whitespace() => started = true,
            _ => {}
        }
    }
    s.len()
}

fn skip_line_end(s: &str) -> &str {
    let trimmed = s.trim_start_matches([' ', '\t']);
    trimmed.strip_prefix('\n').unwrap_or(trimmed)
}
