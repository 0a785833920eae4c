// src/utils/slug.rs

use std::sync::LazyLock;

use regex::Regex;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\s]").expect("non-word pattern is valid"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

pub const WORDS_PER_MINUTE: usize = 200;
pub const MAX_TAG_LEN: usize = 30;

/// Derives the URL identifier of a title or tag name.
///
/// Lowercases, drops every character that is not an ASCII word character or
/// whitespace, then turns each whitespace run into a single hyphen.
pub fn slugify(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, "");
    WHITESPACE.replace_all(&stripped, "-").into_owned()
}

/// Minutes needed to read `content`, rounded up.
pub fn reading_time(content: &str) -> i64 {
    content.split_whitespace().count().div_ceil(WORDS_PER_MINUTE) as i64
}

/// Canonical form of a tag name.
pub fn normalize_tag(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Lowercases and trims every name, drops blanks and duplicates.
/// First occurrence wins, so the caller's ordering is preserved.
pub fn normalize_tags<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let tag = normalize_tag(name.as_ref());
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}
