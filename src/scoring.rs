//! Relevance scoring and excerpt generation for search candidates.
//!
//! Both functions are pure; the full-text index only decides which documents
//! are candidates, the final order comes from [`score`].

use crate::models::Document;

pub const SCORE_TITLE_MATCH: f64 = 3.0;
pub const SCORE_SECTION_MATCH: f64 = 1.5;
pub const SCORE_CONTENT_MATCH: f64 = 0.5;
/// Total content contribution, shared between all query words.
pub const SCORE_MAX_CONTENT: f64 = 5.0;
pub const SCORE_PATH_MATCH: f64 = 0.5;
pub const SCORE_MAX: f64 = 10.0;

pub const DEFAULT_EXCERPT_LENGTH: usize = 200;
pub const EXCERPT_CONTEXT_BEFORE: usize = 50;
pub const EXCERPT_CONTEXT_AFTER: usize = 150;

const ELLIPSIS: &str = "...";

/// Scores `doc` against `query`, in `[0, SCORE_MAX]`.
pub fn score(query: &str, doc: &Document) -> f64 {
    let query_lower = query.to_lowercase();
    let words: Vec<&str> = query_lower.split_whitespace().collect();
    if words.is_empty() {
        return 0.0;
    }

    let title = doc.title.to_lowercase();
    let section = doc.section.to_lowercase();
    let content = doc.content.to_lowercase();
    let path = doc.path.to_lowercase();
    let content_cap = SCORE_MAX_CONTENT / words.len() as f64;

    let mut total = 0.0;
    for word in &words {
        if title.contains(word) {
            total += SCORE_TITLE_MATCH;
            if title == query_lower {
                total += SCORE_TITLE_MATCH;
            }
        }

        if section.contains(word) {
            total += SCORE_SECTION_MATCH;
        }

        if word.chars().count() >= 3 {
            let occurrences = content.matches(word).count();
            total += (occurrences as f64 * SCORE_CONTENT_MATCH).min(content_cap);
        }

        if path.contains(word) {
            total += SCORE_PATH_MATCH;
        }
    }

    total.clamp(0.0, SCORE_MAX)
}

/// Text around the first case-insensitive occurrence of `query` in `content`.
///
/// Without an occurrence, the first `max_length` characters are returned
/// followed by an ellipsis.
pub fn excerpt(query: &str, content: &str, max_length: usize) -> String {
    let Some((start, end)) = find_case_insensitive(content, query) else {
        let end = forward_chars(content, 0, max_length);
        return format!("{}{}", &content[..end], ELLIPSIS);
    };

    let from = back_chars(content, start, EXCERPT_CONTEXT_BEFORE);
    let to = forward_chars(content, end, EXCERPT_CONTEXT_AFTER);

    let mut out = String::with_capacity(to - from + 2 * ELLIPSIS.len());
    if from > 0 {
        out.push_str(ELLIPSIS);
    }
    out.push_str(&content[from..to]);
    if to < content.len() {
        out.push_str(ELLIPSIS);
    }
    out
}

/// Byte range of the first match of `needle` in `haystack`, comparing
/// lower-cased characters.
fn find_case_insensitive(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    let needle: Vec<char> = needle.chars().flat_map(char::to_lowercase).collect();
    haystack
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(haystack.len()))
        .find_map(|start| match_at(haystack, start, &needle).map(|end| (start, end)))
}

fn match_at(haystack: &str, start: usize, needle: &[char]) -> Option<usize> {
    let mut remaining = needle;
    for (offset, c) in haystack[start..].char_indices() {
        if remaining.is_empty() {
            return Some(start + offset);
        }
        for lower in c.to_lowercase() {
            match remaining.split_first() {
                Some((first, rest)) if *first == lower => remaining = rest,
                _ => return None,
            }
        }
    }
    remaining.is_empty().then_some(haystack.len())
}

/// Byte offset `n` characters before `byte`, stopping at the start.
fn back_chars(s: &str, byte: usize, n: usize) -> usize {
    s[..byte]
        .char_indices()
        .rev()
        .take(n)
        .last()
        .map_or(byte, |(i, _)| i)
}

/// Byte offset `n` characters after `byte`, stopping at the end.
fn forward_chars(s: &str, byte: usize, n: usize) -> usize {
    s[byte..]
        .char_indices()
        .nth(n)
        .map_or(s.len(), |(i, _)| byte + i)
}
