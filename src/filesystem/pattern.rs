//! Glob pattern compilation
//!
//! Query values are glob-like strings: `*` matches any run of characters
//! (including `/`), `?` matches exactly one character and a backslash takes
//! the following character literally. Every other character, regex
//! metacharacters included, matches itself. The compiled expression is
//! anchored so it must match the whole subject.

use regex::{Regex, RegexBuilder};

/// Translate a glob into anchored regex source, or `None` for an empty glob.
pub fn glob_to_regex(glob: &str) -> Option<String> {
    if glob.is_empty() {
        return None;
    }

    let mut source = String::with_capacity(glob.len() * 2 + 2);
    source.push('^');

    let mut chars = glob.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => push_literal(&mut source, escaped),
                None => push_literal(&mut source, '\\'),
            },
            _ => push_literal(&mut source, ch),
        }
    }

    source.push('$');
    Some(source)
}

/// Compile a glob into an anchored regex.
///
/// Returns `Ok(None)` for an empty glob; the caller drops such a predicate.
pub fn compile(glob: &str, ignore_case: bool) -> Result<Option<Regex>, regex::Error> {
    let Some(source) = glob_to_regex(glob) else {
        return Ok(None);
    };
    RegexBuilder::new(&source)
        .case_insensitive(ignore_case)
        .build()
        .map(Some)
}

fn push_literal(source: &mut String, ch: char) {
    let mut buf = [0u8; 4];
    source.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
}
