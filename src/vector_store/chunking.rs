//! Splitting page text into overlapping chunks for embedding

use sha2::Digest;
use sha2::Sha256;

/// Split `text` into chunks of at most `chunk_size` characters, each starting
/// `chunk_size - overlap` characters after the previous one.
///
/// Chunk ends are pulled back to the last whitespace in the window when one
/// exists in its second half, so words are not cut mid-way.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.trim().chars().collect();
    if chars.is_empty() || chunk_size == 0 {
        return Vec::new();
    }
    if chars.len() <= chunk_size {
        return vec![chars.iter().collect()];
    }

    let overlap = overlap.min(chunk_size.saturating_sub(1));
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let mut end = (start + chunk_size).min(chars.len());
        if end < chars.len() {
            let window = &chars[start..end];
            if let Some(ws) = window.iter().rposition(|c| c.is_whitespace()) {
                if ws > chunk_size / 2 {
                    end = start + ws;
                }
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        if end >= chars.len() {
            break;
        }
        // Always advance, even when the overlap would pull start back
        start = end.saturating_sub(overlap).max(start + 1);
    }

    chunks
}

/// Stable id for chunk `index` of `url`
pub fn document_id(url: &str, index: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(b"#");
    hasher.update(index.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(chunk_text("  hello world  ", 1000, 200), vec!["hello world"]);
        assert!(chunk_text("   ", 1000, 200).is_empty());
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let text = "word ".repeat(600);
        let chunks = chunk_text(&text, 1000, 200);

        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 1000));
        // Consecutive chunks share text
        let tail: String = chunks[0].chars().rev().take(50).collect::<Vec<_>>().into_iter().rev().collect();
        assert!(chunks[1].contains(tail.trim()));
    }

    #[test]
    fn test_text_without_whitespace_terminates() {
        let text = "x".repeat(2500);
        let chunks = chunk_text(&text, 1000, 999);
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.len() <= 1000));
    }

    #[test]
    fn test_document_id_is_stable() {
        assert_eq!(document_id("https://a.com", 0), document_id("https://a.com", 0));
        assert_ne!(document_id("https://a.com", 0), document_id("https://a.com", 1));
        assert_eq!(document_id("https://a.com", 0).len(), 64);
    }
}
