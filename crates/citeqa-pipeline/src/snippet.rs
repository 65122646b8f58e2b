use std::collections::HashSet;

use citeqa_core::text::{split_sentences, token_set, truncate_chars};

pub const MAX_SNIPPET_CHARS: usize = 500;
pub const FALLBACK_CHARS: usize = 300;

/// Up to `max_sentences` sentences of `text` with the largest query token
/// overlap (longer sentences win ties), joined in that order and cut to
/// `max_chars` characters. Falls back to the first `fallback_chars`
/// characters of `text` when no sentence is found.
pub fn extract_snippet_with(query: &str, text: &str, max_sentences: usize, max_chars: usize, fallback_chars: usize) -> String {
    let query_tokens = token_set(query);
    let mut scored: Vec<(usize, usize, &str)> = split_sentences(text)
        .into_iter()
        .map(|s| {
            let tokens: HashSet<String> = token_set(s);
            (tokens.intersection(&query_tokens).count(), s.chars().count(), s)
        })
        .collect();
    // Stable: full ties keep document order.
    scored.sort_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));
    let joined = scored.iter().take(max_sentences).map(|(_, _, s)| *s).collect::<Vec<_>>().join(" ");
    let snippet = truncate_chars(&joined, max_chars).to_string();
    if snippet.is_empty() {
        return truncate_chars(text, fallback_chars).to_string();
    }
    snippet
}

pub fn extract_snippet(query: &str, text: &str, max_sentences: usize) -> String {
    extract_snippet_with(query, text, max_sentences, MAX_SNIPPET_CHARS, FALLBACK_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_sentence_with_most_overlap() {
        let text = "Operators must wear gloves. Eye protection is mandatory. Report incidents promptly.";
        assert_eq!(extract_snippet("eye protection required", text, 1), "Eye protection is mandatory.");
        assert_eq!(
            extract_snippet("eye protection gloves", text, 2),
            "Eye protection is mandatory. Operators must wear gloves."
        );
    }

    #[test]
    fn zero_overlap_prefers_longest_sentences() {
        let text = "Short. A much longer sentence here. Mid length one.";
        assert_eq!(extract_snippet("zebra", text, 1), "A much longer sentence here.");
    }

    #[test]
    fn result_is_bounded_and_falls_back() {
        let long = format!("{}.", "word ".repeat(200).trim());
        assert_eq!(extract_snippet("word", &long, 2).chars().count(), MAX_SNIPPET_CHARS);
        assert_eq!(extract_snippet_with("q", "abc", 0, 500, 2), "ab");
    }
}
