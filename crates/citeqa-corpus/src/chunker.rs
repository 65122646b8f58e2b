//! Sentence-packing chunker with character-bounded overlap.

use citeqa_core::text::split_sentences;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_chars: 1200, overlap_chars: 200 }
    }
}

/// Greedily pack sentences into chunks shorter than `max_chars`. Each new
/// chunk opens with the trailing sentences of the previous one, up to
/// `overlap_chars` in total, when they still fit. A single sentence longer
/// than the limit becomes a chunk on its own.
pub fn chunk_text(text: &str, config: ChunkingConfig) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(text) {
        let len = sentence.chars().count();
        if current.is_empty() {
            current.push(sentence);
            current_len = len;
            continue;
        }
        if current_len + 1 + len < config.max_chars {
            current.push(sentence);
            current_len += 1 + len;
            continue;
        }
        chunks.push(current.join(" "));
        let mut tail = overlap_tail(&current, config.overlap_chars);
        let tail_len = joined_chars(&tail);
        if tail.is_empty() || tail_len + 1 + len >= config.max_chars {
            tail.clear();
            current_len = len;
        } else {
            current_len = tail_len + 1 + len;
        }
        tail.push(sentence);
        current = tail;
    }
    if !current.is_empty() {
        chunks.push(current.join(" "));
    }
    chunks
}

fn overlap_tail<'a>(sentences: &[&'a str], overlap_chars: usize) -> Vec<&'a str> {
    let mut tail = Vec::new();
    let mut total = 0usize;
    for s in sentences.iter().rev() {
        let len = s.chars().count() + usize::from(!tail.is_empty());
        if total + len > overlap_chars {
            break;
        }
        total += len;
        tail.push(*s);
    }
    tail.reverse();
    tail
}

fn joined_chars(sentences: &[&str]) -> usize {
    let chars: usize = sentences.iter().map(|s| s.chars().count()).sum();
    chars + sentences.len().saturating_sub(1)
}
