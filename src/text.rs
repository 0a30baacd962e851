//! Text normalization, fingerprinting, and chunking
//!
//! Everything stored in the vector index passes through [`normalize`] first,
//! so chunk boundaries and fingerprints always agree on the same text.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Custom emoji tags like `<:pepe:123456>` or `<a:wave:987654>`.
static CUSTOM_EMOJI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<a?:[A-Za-z0-9_~]+:[0-9]+>").expect("valid emoji regex"));

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Content fingerprint: sha256 hex of the normalized text.
///
/// A pure function of normalized text only, so identical content from any
/// guild, author, or time maps to the same fingerprint.
pub fn fingerprint(text: &str) -> String {
    let digest = Sha256::digest(normalize(text).as_bytes());
    hex::encode(digest)
}

/// Deterministic point id derived from the content fingerprint.
///
/// Qdrant point ids must be UUIDs or unsigned integers, so the first 16
/// digest bytes become the UUID; re-ingesting identical content upserts the
/// same point in place.
pub fn point_id(text: &str) -> Uuid {
    let digest = Sha256::digest(normalize(text).as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes)
}

/// Split normalized text into overlapping char windows.
///
/// Text at most `max_chars` long comes back as a single chunk. Longer text is
/// windowed: each window is `max_chars` chars, the next window starts
/// `max_chars - overlap` further in, and the final window ends exactly at the
/// text's end. Overlap keeps concepts spanning a boundary retrievable from at
/// least one chunk. `overlap >= max_chars` is clamped to `max_chars - 1` so
/// the window always advances.
pub fn chunk(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let text = normalize(text);
    let max_chars = max_chars.max(1);
    let overlap = overlap.min(max_chars - 1);

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + max_chars).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start = end - overlap;
    }
    chunks
}

/// True when nothing ingestible remains after stripping custom emoji tags,
/// whitespace, and punctuation. Used to skip emoji-only or empty messages.
pub fn is_trivial(text: &str) -> bool {
    if text.is_empty() {
        return true;
    }
    let stripped = CUSTOM_EMOJI.replace_all(text, "");
    !stripped.chars().any(|c| c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize("  hello \t\n  world  "), "hello world");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("one"), "one");
    }

    #[test]
    fn fingerprint_is_stable_and_whitespace_insensitive() {
        let a = fingerprint("the quick   brown fox");
        let b = fingerprint("  the quick brown\nfox ");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn fingerprint_differs_for_different_text() {
        assert_ne!(fingerprint("alpha"), fingerprint("beta"));
    }

    #[test]
    fn point_id_is_deterministic() {
        let a = point_id("some chunk of text");
        let b = point_id("some  chunk of\ttext");
        assert_eq!(a, b);
        assert_ne!(a, point_id("other text"));
    }

    #[test]
    fn chunk_short_text_is_single_chunk() {
        let chunks = chunk("The quick brown fox jumps over the lazy dog", 1200, 120);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "The quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn chunk_long_text_overlaps() {
        let text = "abcdefghij".repeat(10); // 100 chars
        let chunks = chunk(&text, 40, 10);
        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].chars().count(), 40);
        // each boundary repeats the previous window's tail
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().rev().take(10).collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            let head: String = pair[1].chars().take(10).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn chunk_round_trip_reconstructs_text() {
        let text = "word ".repeat(500); // 2500 chars before normalize
        let normalized = normalize(&text);
        let overlap = 120;
        let chunks = chunk(&text, 1200, overlap);
        assert!(chunks.len() > 1);

        let mut rebuilt = chunks[0].clone();
        for piece in &chunks[1..] {
            rebuilt.extend(piece.chars().skip(overlap));
        }
        assert_eq!(rebuilt, normalized);
    }

    #[test]
    fn chunk_final_window_truncated_not_overrun() {
        let text = "x".repeat(95);
        let chunks = chunk(&text, 40, 10);
        let last = chunks.last().unwrap();
        assert!(last.chars().count() <= 40);
        let total: usize = chunks[0].chars().count()
            + chunks[1..]
                .iter()
                .map(|c| c.chars().count() - 10)
                .sum::<usize>();
        assert_eq!(total, 95);
    }

    #[test]
    fn chunk_clamps_excessive_overlap() {
        // overlap >= max_chars must not loop forever
        let text = "y".repeat(50);
        let chunks = chunk(&text, 10, 10);
        assert!(!chunks.is_empty());
        assert!(chunks.len() < 100);
        let again = chunk(&text, 10, 99);
        assert_eq!(chunks.len(), again.len());
    }

    #[test]
    fn chunk_handles_multibyte_chars() {
        let text = "Привет мир ".repeat(30);
        let chunks = chunk(&text, 50, 5);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 50);
        }
    }

    #[test]
    fn trivial_empty_and_whitespace() {
        assert!(is_trivial(""));
        assert!(is_trivial("   \t\n"));
    }

    #[test]
    fn trivial_custom_emoji_only() {
        assert!(is_trivial("<:pepe:123456>"));
        assert!(is_trivial("<a:wave:987654> <:lol:111>  !!"));
    }

    #[test]
    fn trivial_punctuation_only() {
        assert!(is_trivial("?!... ---"));
    }

    #[test]
    fn not_trivial_with_words() {
        assert!(!is_trivial("hello <:pepe:123456>"));
        assert!(!is_trivial("ok"));
        assert!(!is_trivial("день"));
    }
}
