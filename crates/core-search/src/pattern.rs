//! Pattern normalisation: delimiter stripping and shorthand
//! translation applied before every compile.

use core_state::{CoreError, CoreResult};
use regex::bytes::{Regex, RegexBuilder};

/// Recognised pattern delimiters, in order: `/`, `'`, `"`, `!`.
fn is_delimiter(b: u8) -> bool {
    matches!(b, b'/' | b'\'' | b'"' | b'!')
}

/// Strip a matching delimiter pair from both ends; the closing one is
/// optional. Anything not starting with a delimiter is copied as-is.
pub fn cut_delimiters(expr: &str) -> &str {
    let bytes = expr.as_bytes();
    match bytes.first() {
        Some(&d) if is_delimiter(d) => {
            let inner = &expr[1..];
            inner.strip_suffix(d as char).unwrap_or(inner)
        }
        _ => expr,
    }
}

/// Translate the editor's regex shorthands: `\d` to `[0-9]`, `\D` to
/// `[^0-9]`, `\t` to a literal TAB. `\w \W \s \S` pass through to the
/// engine, and an escape before any other character is preserved.
pub fn expand_shorthands(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut escaped = false;
    for ch in pattern.chars() {
        if escaped {
            match ch {
                'd' => out.push_str("[0-9]"),
                'D' => out.push_str("[^0-9]"),
                't' => out.push('\t'),
                _ => {
                    out.push('\\');
                    out.push(ch);
                }
            }
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Compile a user expression: strip delimiters, expand shorthands,
/// apply the global case option. Compile errors surface verbatim for
/// the trace area.
pub fn compile(expr: &str, case_sensitive: bool) -> CoreResult<Regex> {
    let translated = expand_shorthands(cut_delimiters(expr));
    compile_translated(&translated, case_sensitive)
}

/// Compile an already-translated pattern.
pub fn compile_translated(pattern: &str, case_sensitive: bool) -> CoreResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .multi_line(false)
        .build()
        .map_err(|e| CoreError::Regex(e.to_string()))
}

/// An anchored pattern starts with `^` or `$` after translation and
/// needs the special zero-width stepping.
pub fn is_anchored(translated: &str) -> bool {
    translated.starts_with('^') || translated.starts_with('$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiters_stripped_pairwise() {
        assert_eq!(cut_delimiters("/foo/"), "foo");
        assert_eq!(cut_delimiters("'foo'"), "foo");
        assert_eq!(cut_delimiters("!foo"), "foo");
        assert_eq!(cut_delimiters("foo"), "foo");
        // a lone leading delimiter is enough
        assert_eq!(cut_delimiters("/foo"), "foo");
        // inner delimiters stay
        assert_eq!(cut_delimiters("/a/b/"), "a/b");
    }

    #[test]
    fn shorthands_translate() {
        assert_eq!(expand_shorthands(r"\d+"), "[0-9]+");
        assert_eq!(expand_shorthands(r"\D"), "[^0-9]");
        assert_eq!(expand_shorthands(r"a\tb"), "a\tb");
        assert_eq!(expand_shorthands(r"\w\s"), r"\w\s");
        assert_eq!(expand_shorthands(r"\."), r"\.");
        assert_eq!(expand_shorthands(r"\\d"), r"\\d");
    }

    #[test]
    fn case_option_controls_matching() {
        let ci = compile("/abc/", false).unwrap();
        assert!(ci.is_match(b"ABC"));
        let cs = compile("/abc/", true).unwrap();
        assert!(!cs.is_match(b"ABC"));
    }

    #[test]
    fn compile_error_is_reported() {
        assert!(compile("/a(/", true).is_err());
    }

    #[test]
    fn anchor_detection() {
        assert!(is_anchored("^x"));
        assert!(is_anchored("$"));
        assert!(!is_anchored("x^"));
    }
}
