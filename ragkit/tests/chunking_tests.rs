//! Property tests for chunk count, size bound, and overlap.

use proptest::prelude::*;
use ragkit::chunking::{Chunker, RecursiveChunker, split};
use ragkit::document::Document;

/// Text with multibyte characters, spaces, sentence ends and paragraph breaks.
fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            8 => "[a-zé]{1,8}",
            3 => Just(" ".to_string()),
            1 => Just(". ".to_string()),
            1 => Just("\n\n".to_string()),
        ],
        0..60,
    )
    .prop_map(|parts| parts.concat())
}

/// Chunk size and an overlap strictly below it.
fn arb_sizes() -> impl Strategy<Value = (usize, usize)> {
    (1usize..40).prop_flat_map(|size| (Just(size), 0..size))
}

fn chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// For text of length `L > O`, fixed-size chunking yields
    /// `ceil((L - O) / (M - O))` chunks of at most `M` characters, each
    /// starting with the previous chunk's last `O` characters.
    #[test]
    fn fixed_size_count_size_and_overlap(text in arb_text(), (size, overlap) in arb_sizes()) {
        let document = Document::new("doc", text.clone());
        let chunks = split(&document, size, overlap).unwrap();
        let len = text.chars().count();

        if len == 0 {
            prop_assert!(chunks.is_empty());
        } else if len > overlap {
            let expected = (len - overlap).div_ceil(size - overlap);
            prop_assert_eq!(chunks.len(), expected);
        } else {
            prop_assert_eq!(chunks.len(), 1);
        }

        for chunk in &chunks {
            prop_assert!(chunk.text.chars().count() <= size);
        }
        for pair in chunks.windows(2) {
            let prev = chars(&pair[0].text);
            let next = chars(&pair[1].text);
            prop_assert_eq!(&prev[prev.len() - overlap..], &next[..overlap]);
        }
    }

    /// Boundary-preferring chunking keeps the size bound and the verbatim
    /// overlap, and dropping each overlap reconstructs the original text.
    #[test]
    fn recursive_preserves_text(text in arb_text(), (size, overlap) in arb_sizes()) {
        let document = Document::new("doc", text.clone());
        let chunks = RecursiveChunker::new(size, overlap).chunk(&document).unwrap();

        let mut rebuilt: Vec<char> = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let piece = chars(&chunk.text);
            prop_assert!(piece.len() <= size);
            prop_assert_eq!(chunk.sequence, i);
            prop_assert_eq!(&chunk.id, &format!("doc_{i}"));
            if i == 0 {
                rebuilt.extend(piece);
            } else {
                prop_assert_eq!(&rebuilt[rebuilt.len() - overlap..], &piece[..overlap]);
                rebuilt.extend(&piece[overlap..]);
            }
        }
        prop_assert_eq!(rebuilt, chars(&text));
    }

    #[test]
    fn overlap_at_or_above_size_is_rejected(size in 0usize..20, extra in 0usize..5) {
        let document = Document::new("doc", "some text");
        prop_assert!(split(&document, size, size + extra).is_err());
    }
}
