//! Recursive character splitter producing overlapping windows with char offsets.
//!
//! Each window is at most `chunk_size` chars. A window ends right after the last
//! paragraph break in range, else the last line break, else the last space, else at the
//! hard limit. The next window starts `chunk_overlap` chars before the previous end.

use thiserror::Error;

/// Default window size in chars.
pub const DEFAULT_CHUNK_SIZE: usize = 256;
/// Default overlap between consecutive windows in chars.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    #[error("chunk size must be greater than zero")]
    ZeroSize,
    #[error("chunk overlap {overlap} must be smaller than chunk size {size}")]
    OverlapTooLarge { size: usize, overlap: usize },
}

/// One window of the source text. `content` equals the chars in `start_offset..end_offset`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub content: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, SplitError> {
        if chunk_size == 0 {
            return Err(SplitError::ZeroSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(SplitError::OverlapTooLarge {
                size: chunk_size,
                overlap: chunk_overlap,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Splits `text` into ordered windows. Empty or whitespace-only text yields none.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let hard_end = (start + self.chunk_size).min(len);
            let end = if hard_end == len {
                len
            } else {
                self.break_point(&chars, start, hard_end)
            };
            chunks.push(Chunk {
                content: chars[start..end].iter().collect(),
                start_offset: start,
                end_offset: end,
            });
            if end == len {
                break;
            }
            start = end - self.chunk_overlap;
        }
        chunks
    }

    /// Latest separator boundary in `(start + overlap, hard_end]`, so the next window
    /// always advances.
    fn break_point(&self, chars: &[char], start: usize, hard_end: usize) -> usize {
        let lower = start + self.chunk_overlap + 1;
        for sep in SEPARATORS {
            let sep: Vec<char> = sep.chars().collect();
            let mut end = hard_end;
            while end >= lower && end >= sep.len() {
                if chars[end - sep.len()..end] == sep[..] {
                    return end;
                }
                end -= 1;
            }
        }
        hard_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(text: &str, c: &Chunk) -> String {
        text.chars()
            .skip(c.start_offset)
            .take(c.end_offset - c.start_offset)
            .collect()
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = TextSplitter::default().split("Save ten percent of every paycheck.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[0].end_offset, 35);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(TextSplitter::default().split("").is_empty());
        assert!(TextSplitter::default().split("  \n ").is_empty());
    }

    #[test]
    fn windows_overlap_and_cover_text() {
        let text = "word ".repeat(200);
        let splitter = TextSplitter::new(64, 10).unwrap();
        let chunks = splitter.split(&text);
        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks.last().unwrap().end_offset, text.chars().count());
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].start_offset, pair[0].end_offset - 10);
            assert!(pair[1].start_offset > pair[0].start_offset);
        }
        for c in &chunks {
            assert!(c.end_offset - c.start_offset <= 64);
            assert_eq!(c.content, slice(&text, c));
        }
    }

    #[test]
    fn prefers_paragraph_breaks() {
        let text = format!("{}\n\n{}", "a".repeat(30), "b".repeat(30));
        let chunks = TextSplitter::new(40, 5).unwrap().split(&text);
        assert_eq!(chunks[0].end_offset, 32);
        assert!(chunks[0].content.ends_with("\n\n"));
    }

    #[test]
    fn unbroken_text_splits_at_hard_limit() {
        let text = "x".repeat(100);
        let chunks = TextSplitter::new(40, 10).unwrap().split(&text);
        let bounds: Vec<(usize, usize)> =
            chunks.iter().map(|c| (c.start_offset, c.end_offset)).collect();
        assert_eq!(bounds, vec![(0, 40), (30, 70), (60, 100)]);
    }

    #[test]
    fn offsets_are_char_based() {
        let text = "é".repeat(50);
        let chunks = TextSplitter::new(20, 5).unwrap().split(&text);
        for c in &chunks {
            assert_eq!(c.content.chars().count(), c.end_offset - c.start_offset);
        }
    }

    #[test]
    fn invalid_policy_is_rejected() {
        assert_eq!(TextSplitter::new(0, 0).unwrap_err(), SplitError::ZeroSize);
        assert_eq!(
            TextSplitter::new(10, 10).unwrap_err(),
            SplitError::OverlapTooLarge {
                size: 10,
                overlap: 10
            }
        );
    }

    #[test]
    fn serializes_offsets_in_camel_case() {
        let c = Chunk {
            content: "a".to_string(),
            start_offset: 0,
            end_offset: 1,
        };
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["startOffset"], 0);
        assert_eq!(v["endOffset"], 1);
    }
}
