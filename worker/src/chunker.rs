//! Recursive character chunker.
//!
//! Splits on paragraph boundaries first, then lines, then words, then raw
//! characters, merging pieces greedily up to `chunk_size` characters with
//! `chunk_overlap` characters carried between consecutive chunks. Length
//! is measured in characters, not bytes.

use std::collections::VecDeque;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

#[derive(Debug, Clone)]
pub struct RecursiveCharacterChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for RecursiveCharacterChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl RecursiveCharacterChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        assert!(chunk_size > 0, "chunk_size must be positive");
        assert!(
            chunk_overlap < chunk_size,
            "chunk_overlap must be smaller than chunk_size"
        );
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split(text, &SEPARATORS)
            .into_iter()
            .map(|chunk| chunk.trim().to_string())
            .filter(|chunk| !chunk.is_empty())
            .collect()
    }

    fn split<'a>(&self, text: &str, separators: &'a [&'a str]) -> Vec<String> {
        let (separator, rest) = pick_separator(text, separators);

        if separator.is_empty() {
            return self.split_by_characters(text);
        }

        let mut chunks = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        for piece in text.split(separator).filter(|p| !p.is_empty()) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece.to_string());
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending, separator));
                pending.clear();
            }
            if rest.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split(piece, rest));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(&pending, separator));
        }
        chunks
    }

    /// Last-resort split: fixed windows stepped by `chunk_size - overlap`.
    fn split_by_characters(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.chunk_size {
            return vec![text.to_string()];
        }
        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        chunks
    }

    /// Greedy merge of small pieces into chunks of at most `chunk_size`
    /// characters, keeping roughly `chunk_overlap` trailing characters as
    /// the head of the next chunk.
    fn merge(&self, pieces: &[String], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut window: VecDeque<&String> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let piece_len = char_len(piece);
            let joined = total + piece_len + if window.is_empty() { 0 } else { sep_len };
            if joined > self.chunk_size && !window.is_empty() {
                chunks.push(join(&window, separator));
                // Shrink the window down to the overlap budget.
                while total > self.chunk_overlap
                    || (total + piece_len + if window.is_empty() { 0 } else { sep_len }
                        > self.chunk_size
                        && total > 0)
                {
                    let Some(dropped) = window.pop_front() else { break };
                    total -= char_len(dropped) + if window.is_empty() { 0 } else { sep_len };
                }
            }
            total += piece_len + if window.is_empty() { 0 } else { sep_len };
            window.push_back(piece);
        }
        if !window.is_empty() {
            chunks.push(join(&window, separator));
        }
        chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn join(window: &VecDeque<&String>, separator: &str) -> String {
    window
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

/// First separator that actually occurs in `text` (the empty separator
/// matches anything), together with the levels below it.
fn pick_separator<'a>(text: &str, separators: &'a [&'a str]) -> (&'a str, &'a [&'a str]) {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() || text.contains(sep) {
            return (sep, &separators[i + 1..]);
        }
    }
    ("", &[])
}
