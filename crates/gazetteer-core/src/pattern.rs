//! Per-entry regular expressions for the pattern match strategy.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::config::EntrySyntax;

static LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\p{L}$").unwrap());

/// A `\p{L}` letter, the class that decides where word boundaries apply.
pub(crate) fn is_letter(c: char) -> bool {
    let mut buf = [0u8; 4];
    LETTER.is_match(c.encode_utf8(&mut buf))
}

/// Wrap an entry in word boundaries on the sides that start or end with a
/// letter.
///
/// Entries bounded by digits or punctuation get no boundary on that side:
/// `"U.S."` still matches inside `"U.S.A"`.
pub fn boundary_pattern(entry: &str, syntax: EntrySyntax) -> String {
    let body = match syntax {
        EntrySyntax::Literal => regex::escape(entry),
        EntrySyntax::Pattern => entry.to_string(),
    };
    let leading = entry.chars().next().is_some_and(is_letter);
    let trailing = entry.chars().next_back().is_some_and(is_letter);

    let mut pattern = String::with_capacity(body.len() + 8);
    if leading {
        pattern.push_str(r"\b");
    }
    if syntax == EntrySyntax::Pattern {
        // Keep a top-level alternation inside the anchors.
        pattern.push_str("(?:");
        pattern.push_str(&body);
        pattern.push(')');
    } else {
        pattern.push_str(&body);
    }
    if trailing {
        pattern.push_str(r"\b");
    }
    pattern
}

/// Compile the boundary pattern for one entry. `.` also matches newlines.
pub fn compile_entry(entry: &str, syntax: EntrySyntax) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&boundary_pattern(entry, syntax))
        .dot_matches_new_line(true)
        .build()
}
