//! Fixed-size overlapping character windows

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::Chunk;

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    /// Window size in characters
    chunk_size: usize,
    /// Characters shared by consecutive windows
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker. The overlap must be smaller than the size so that
    /// every step advances.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than zero".into()));
        }
        if overlap >= chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Create a chunker from configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Distance between consecutive window starts
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Split text into windows of `chunk_size` characters starting every
    /// `stride` characters. The last window is whatever text remains.
    pub fn chunk(&self, text: &str, source: &str) -> Vec<Chunk> {
        // Byte offset of every char boundary, plus the end of the text
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = boundaries.len() - 1;

        (0..char_count)
            .step_by(self.stride())
            .map(|start| {
                let end = (start + self.chunk_size).min(char_count);
                Chunk::new(&text[boundaries[start]..boundaries[end]], source, start)
            })
            .collect()
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_offsets_and_truncated_tail() {
        let text = "x".repeat(1200);
        let chunks = TextChunker::default().chunk(&text, "doc.txt");

        let offsets: Vec<usize> = chunks.iter().map(|c| c.offset).collect();
        assert_eq!(offsets, vec![0, 450, 900]);
        assert_eq!(chunks[0].char_len(), 500);
        assert_eq!(chunks[1].char_len(), 500);
        assert_eq!(chunks[2].char_len(), 300);
        assert!(chunks.iter().all(|c| c.source == "doc.txt"));
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(TextChunker::default().chunk("", "empty.txt").is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = TextChunker::default().chunk("The capital of France is Paris.", "f.txt");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "The capital of France is Paris.");
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let text = "é".repeat(10);
        let chunks = TextChunker::new(4, 1).unwrap().chunk(&text, "u.txt");
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].text, "éééé");
        assert_eq!(chunks[3].offset, 9);
        assert_eq!(chunks[3].text, "é");
    }

    #[test]
    fn test_invalid_overlap_rejected() {
        assert!(TextChunker::new(500, 500).is_err());
        assert!(TextChunker::new(500, 600).is_err());
        assert!(TextChunker::new(0, 0).is_err());
    }

    proptest! {
        #[test]
        fn prop_windows_cover_text_without_gaps(
            text in "[a-zé ]{0,400}",
            size in 1usize..60,
            overlap_seed in 0usize..60,
        ) {
            let overlap = overlap_seed % size;
            let chunker = TextChunker::new(size, overlap).unwrap();
            let chunks = chunker.chunk(&text, "p.txt");
            let chars: Vec<char> = text.chars().collect();

            let mut covered = 0usize;
            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.offset, i * chunker.stride());
                prop_assert!(chunk.offset <= covered);
                let expected: String = chars[chunk.offset..(chunk.offset + size).min(chars.len())]
                    .iter()
                    .collect();
                prop_assert_eq!(&chunk.text, &expected);
                covered = chunk.offset + chunk.char_len();
            }
            prop_assert_eq!(covered, chars.len());
        }
    }
}
