//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`]: exact character windows with configurable overlap
//! - [`RecursiveChunker`]: the same windows, with each cut pulled back to a
//!   paragraph, sentence, or word boundary when one is close to the size limit
//!
//! Both measure sizes in characters (Unicode scalar values), keep the original
//! text order, and repeat the last `chunk_overlap` characters of each chunk
//! verbatim at the start of the next one.

use crate::document::{CHUNK_INDEX_KEY, Chunk, Document, chunk_id};
use crate::error::{RagError, Result};

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] if the chunker's size parameters
    /// are unusable (`chunk_size == 0` or `chunk_overlap >= chunk_size`).
    fn chunk(&self, document: &Document) -> Result<Vec<Chunk>>;
}

/// Split `document` into fixed-size windows of at most `max_chunk_size`
/// characters, each sharing `overlap` characters with its predecessor.
///
/// For text of length `L > overlap` this yields exactly
/// `ceil((L - overlap) / (max_chunk_size - overlap))` chunks.
pub fn split(document: &Document, max_chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    FixedSizeChunker::new(max_chunk_size, overlap).chunk(document)
}

fn validate(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::InvalidArgument("chunk_size must be greater than zero".to_string()));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::InvalidArgument(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Walk `chars` in windows of `chunk_size`, asking `cut` where to end each
/// non-final window.
///
/// `cut(chars, min, max)` must return a position in `min..=max`; `min` is one
/// past the overlap so every window advances.
fn split_windows<F>(chars: &[char], chunk_size: usize, chunk_overlap: usize, cut: F) -> Vec<String>
where
    F: Fn(&[char], usize, usize) -> usize,
{
    let mut pieces = Vec::new();
    let mut start = 0;

    loop {
        let hard_end = (start + chunk_size).min(chars.len());
        if hard_end == chars.len() {
            pieces.push(chars[start..hard_end].iter().collect());
            break;
        }
        let end = cut(chars, start + chunk_overlap + 1, hard_end);
        pieces.push(chars[start..end].iter().collect());
        start = end - chunk_overlap;
    }

    pieces
}

fn into_chunks(document: &Document, pieces: Vec<String>) -> Vec<Chunk> {
    pieces
        .into_iter()
        .enumerate()
        .map(|(sequence, text)| {
            let mut metadata = document.metadata.clone();
            metadata.insert(CHUNK_INDEX_KEY.to_string(), sequence.to_string());
            Chunk {
                id: chunk_id(&document.id, sequence),
                document_id: document.id.clone(),
                text,
                sequence,
                metadata,
            }
        })
        .collect()
}

/// Splits text into fixed-size chunks by character count with configurable overlap.
///
/// Chunk IDs are generated as `{document_id}_{sequence}`. Each chunk inherits
/// the parent document's metadata plus a `chunk_index` field.
///
/// # Example
///
/// ```rust,ignore
/// use ragkit::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(256, 50);
/// let chunks = chunker.chunk(&document)?;
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Result<Vec<Chunk>> {
        validate(self.chunk_size, self.chunk_overlap)?;
        if document.text.is_empty() {
            return Ok(Vec::new());
        }

        let chars: Vec<char> = document.text.chars().collect();
        let pieces = split_windows(&chars, self.chunk_size, self.chunk_overlap, |_, _, end| end);
        Ok(into_chunks(document, pieces))
    }
}

/// Splits text on natural boundaries near the size limit.
///
/// Each window is cut at the last paragraph break (`\n\n`) within the
/// look-back band; failing that, after the last sentence terminator
/// (`.`, `!`, `?` followed by whitespace); failing that, after the last
/// whitespace; and only then mid-word at the size limit. The look-back band
/// defaults to a quarter of `chunk_size`.
///
/// # Example
///
/// ```rust,ignore
/// use ragkit::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(512, 100);
/// let chunks = chunker.chunk(&document)?;
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    lookback: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap, lookback: (chunk_size / 4).max(1) }
    }

    /// Set how many characters before the size limit a boundary may sit.
    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }
}

/// Boundary tiers, most preferred first. Each predicate is asked whether a
/// cut at `pos` (chunk ends just before `chars[pos]`) lands on that boundary.
const BOUNDARY_TIERS: [fn(&[char], usize) -> bool; 3] =
    [is_paragraph_break, is_sentence_end, is_word_break];

fn is_paragraph_break(chars: &[char], pos: usize) -> bool {
    pos >= 2 && chars[pos - 1] == '\n' && chars[pos - 2] == '\n'
}

fn is_sentence_end(chars: &[char], pos: usize) -> bool {
    pos >= 2 && chars[pos - 1].is_whitespace() && matches!(chars[pos - 2], '.' | '!' | '?')
}

fn is_word_break(chars: &[char], pos: usize) -> bool {
    pos >= 1 && chars[pos - 1].is_whitespace()
}

fn boundary_cut(chars: &[char], min: usize, max: usize, lookback: usize) -> usize {
    let floor = min.max(max.saturating_sub(lookback));
    for tier in BOUNDARY_TIERS {
        if let Some(pos) = (floor..=max).rev().find(|&pos| tier(chars, pos)) {
            return pos;
        }
    }
    max
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Result<Vec<Chunk>> {
        validate(self.chunk_size, self.chunk_overlap)?;
        if document.text.is_empty() {
            return Ok(Vec::new());
        }

        let chars: Vec<char> = document.text.chars().collect();
        let lookback = self.lookback;
        let pieces = split_windows(&chars, self.chunk_size, self.chunk_overlap, |c, min, max| {
            boundary_cut(c, min, max, lookback)
        });
        Ok(into_chunks(document, pieces))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new("doc", text)
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        let err = FixedSizeChunker::new(10, 10).chunk(&doc("abc")).unwrap_err();
        assert!(matches!(err, RagError::InvalidArgument(_)));
        let err = RecursiveChunker::new(0, 0).chunk(&doc("abc")).unwrap_err();
        assert!(matches!(err, RagError::InvalidArgument(_)));
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split(&doc(""), 10, 2).unwrap().is_empty());
        assert!(RecursiveChunker::new(10, 2).chunk(&doc("")).unwrap().is_empty());
    }

    #[test]
    fn fixed_windows_overlap_verbatim() {
        let chunks = split(&doc("abcdefghij"), 5, 2).unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["abcde", "defgh", "ghij"]);
        assert_eq!(chunks[2].id, "doc_2");
        assert_eq!(chunks[2].sequence, 2);
        assert_eq!(chunks[2].metadata[CHUNK_INDEX_KEY], "2");
    }

    #[test]
    fn sizes_count_characters_not_bytes() {
        let chunks = split(&doc("héllo wörld ünïcode"), 4, 1).unwrap();
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 4));
        assert_eq!(chunks[0].text, "héll");
    }

    #[test]
    fn recursive_prefers_sentence_boundary() {
        let text = "The cat sat down. It was warm outside today";
        let chunks = RecursiveChunker::new(24, 0).with_lookback(12).chunk(&doc(text)).unwrap();
        assert_eq!(chunks[0].text, "The cat sat down. ");
        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn recursive_prefers_paragraph_over_sentence() {
        let text = "One. Two three.\n\nFour five six seven eight";
        let chunks = RecursiveChunker::new(20, 0).with_lookback(10).chunk(&doc(text)).unwrap();
        assert_eq!(chunks[0].text, "One. Two three.\n\n");
    }

    #[test]
    fn recursive_keeps_overlap_invariant() {
        let text = "Alpha beta gamma. Delta epsilon zeta eta.\n\nTheta iota kappa lambda mu nu xi.";
        let overlap = 5;
        let chunks = RecursiveChunker::new(20, overlap).chunk(&doc(text)).unwrap();
        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].text.chars().collect();
            let next: Vec<char> = pair[1].text.chars().collect();
            assert!(prev.len() <= 20);
            assert_eq!(prev[prev.len() - overlap..], next[..overlap]);
        }
    }

    #[test]
    fn recursive_falls_back_to_hard_cut() {
        let chunks = RecursiveChunker::new(4, 0).chunk(&doc("abcdefghij")).unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["abcd", "efgh", "ij"]);
    }
}
