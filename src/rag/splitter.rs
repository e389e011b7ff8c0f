//! Fixed-size character splitter used before embedding.

use serde::{Deserialize, Serialize};

/// A text chunk with source information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    /// The text content
    pub text: String,
    /// Source identifier (file path)
    pub source: String,
    /// Character offset in original document
    pub start_offset: usize,
    /// Chunk index within the source
    pub chunk_index: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    /// `chunk_overlap` is clamped below `chunk_size` so windows always advance.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split text into windows of `chunk_size` characters, each starting
    /// `chunk_size - chunk_overlap` characters after the previous one.
    ///
    /// Text no longer than one window comes back as a single chunk equal to
    /// the input; whitespace-only text yields nothing.
    pub fn split(&self, text: &str, source: &str) -> Vec<TextChunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let total_chars = chars.len();

        if total_chars <= self.chunk_size {
            return vec![TextChunk {
                text: text.to_string(),
                source: source.to_string(),
                start_offset: 0,
                chunk_index: 0,
            }];
        }

        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let end = (start + self.chunk_size).min(total_chars);
            chunks.push(TextChunk {
                text: chars[start..end].iter().collect(),
                source: source.to_string(),
                start_offset: start,
                chunk_index: chunks.len(),
            });

            if end >= total_chars {
                break;
            }
            start += step;
        }

        chunks
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(1000, 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_identical_chunk() {
        let splitter = TextSplitter::new(1000, 100);
        let text = "  Kakao Sync lets users sign up with one tap.\n\nSecond paragraph.  ";

        let chunks = splitter.split(text, "doc.md");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].source, "doc.md");
    }

    #[test]
    fn exactly_chunk_size_is_still_one_chunk() {
        let text = "x".repeat(1000);
        let chunks = TextSplitter::new(1000, 100).split(&text, "a.txt");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn long_text_windows_overlap_by_configured_amount() {
        let text: String = ('a'..='z').cycle().take(2500).collect();
        let chunks = TextSplitter::new(1000, 100).split(&text, "a.txt");

        let offsets: Vec<usize> = chunks.iter().map(|c| c.start_offset).collect();
        assert_eq!(offsets, vec![0, 900, 1800]);
        assert_eq!(chunks[0].text.chars().count(), 1000);
        assert_eq!(chunks[2].text.chars().count(), 700);

        let tail: String = chunks[0].text.chars().skip(900).collect();
        let head: String = chunks[1].text.chars().take(100).collect();
        assert_eq!(tail, head);

        let indices: Vec<usize> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "카카오".repeat(5);
        let chunks = TextSplitter::new(10, 2).split(&text, "ko.txt");

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text.chars().count(), 10);
        assert_eq!(chunks[1].start_offset, 8);
        assert_eq!(chunks[1].text.chars().count(), 7);
    }

    #[test]
    fn blank_text_has_no_chunks() {
        assert!(TextSplitter::default().split(" \n\t ", "blank.txt").is_empty());
        assert!(TextSplitter::default().split("", "empty.txt").is_empty());
    }

    #[test]
    fn overlap_is_clamped_below_chunk_size() {
        let splitter = TextSplitter::new(4, 10);
        assert_eq!(splitter.chunk_overlap(), 3);
        let chunks = splitter.split("abcdefgh", "a");
        assert_eq!(chunks.len(), 5);
    }
}
