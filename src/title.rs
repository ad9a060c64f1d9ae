//! Title normalization for joining report rows and building lookup queries.
//!
//! Reports print re-releases as `Jaws (50th Anniversary)`. The canonical title
//! drops that annotation so the re-release joins with plain `Jaws` rows from
//! other weekends, and the lookup query searches for the film itself.

use once_cell::sync::Lazy;
use regex::Regex;

static ANNIVERSARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(.*anniversary.*\)").expect("anniversary pattern is valid"));

/// Separator the metadata service expects between title words.
pub const QUERY_JOINER: char = '+';

/// True when the unstripped title carries an anniversary-edition annotation.
pub fn is_anniversary_edition(raw_title: &str) -> bool {
    ANNIVERSARY.is_match(raw_title)
}

/// Join key used across reports: the title with any anniversary
/// parenthetical removed and trailing whitespace trimmed.
pub fn canonicalize(raw_title: &str) -> String {
    if is_anniversary_edition(raw_title) {
        ANNIVERSARY
            .replace_all(raw_title, "")
            .trim_end()
            .to_string()
    } else {
        raw_title.to_string()
    }
}

/// Lookup query string: the canonical title with spaces encoded as `+`.
pub fn to_query(raw_title: &str) -> String {
    canonicalize(raw_title).replace(' ', &QUERY_JOINER.to_string())
}
