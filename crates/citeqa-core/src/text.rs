//! Tokenization and sentence helpers shared by fusion, snippet extraction
//! and ingestion chunking.

use std::collections::HashSet;
use std::fmt;

/// Rendering of a lexical query that can match nothing.
pub const NO_MATCH_SENTINEL: &str = "__nomatch__";

/// Lowercase ASCII alphanumeric runs, in order of appearance.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            current.push(c.to_ascii_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

pub fn token_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// Split after `.`, `!` or `?` when followed by whitespace. Fragments are
/// trimmed and empty ones dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c.is_whitespace() && matches!(prev, Some('.' | '!' | '?')) {
            push_trimmed(&mut sentences, &text[start..i]);
            let mut end = i + c.len_utf8();
            while let Some(&(j, w)) = chars.peek() {
                if !w.is_whitespace() {
                    break;
                }
                end = j + w.len_utf8();
                chars.next();
            }
            start = end;
            prev = None;
            continue;
        }
        prev = Some(c);
    }
    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

fn push_trimmed<'a>(out: &mut Vec<&'a str>, fragment: &'a str) {
    let t = fragment.trim();
    if !t.is_empty() {
        out.push(t);
    }
}

/// First `max_chars` characters of `text` (char boundary safe).
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Display form of a passage: first `max_chars` characters plus `...` when cut.
pub fn display_text(text: &str, max_chars: usize) -> String {
    let head = truncate_chars(text, max_chars);
    if head.len() < text.len() {
        format!("{head}...")
    } else {
        head.to_string()
    }
}

/// Disjunctive token query handed to the lexical index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexicalQuery {
    AnyOf(Vec<String>),
    /// No token survived extraction; matches nothing.
    NoMatch,
}

impl LexicalQuery {
    pub fn from_raw(raw: &str) -> Self {
        let tokens = tokenize(raw);
        if tokens.is_empty() {
            LexicalQuery::NoMatch
        } else {
            LexicalQuery::AnyOf(tokens)
        }
    }
}

impl fmt::Display for LexicalQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexicalQuery::AnyOf(tokens) => f.write_str(&tokens.join(" OR ")),
            LexicalQuery::NoMatch => f.write_str(NO_MATCH_SENTINEL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_lowercases_and_splits_on_punctuation() {
        assert_eq!(tokenize("Eye-protection, REQUIRED? ok2"), vec!["eye", "protection", "required", "ok2"]);
        assert!(tokenize("?!  --").is_empty());
    }

    #[test]
    fn sentences_split_only_before_whitespace() {
        let s = split_sentences("  Wear gloves. Use v1.2 tools!   Why?\nBecause.");
        assert_eq!(s, vec!["Wear gloves.", "Use v1.2 tools!", "Why?", "Because."]);
        assert!(split_sentences("   ").is_empty());
    }

    #[test]
    fn display_text_marks_truncation() {
        assert_eq!(display_text("abcdef", 3), "abc...");
        assert_eq!(display_text("abc", 3), "abc");
        assert_eq!(display_text("ééé", 2), "éé...");
    }

    #[test]
    fn lexical_query_uses_sentinel_when_nothing_survives() {
        assert_eq!(LexicalQuery::from_raw("!!!"), LexicalQuery::NoMatch);
        assert_eq!(LexicalQuery::from_raw("!!!").to_string(), NO_MATCH_SENTINEL);
        assert_eq!(LexicalQuery::from_raw("Eye protection").to_string(), "eye OR protection");
    }
}
