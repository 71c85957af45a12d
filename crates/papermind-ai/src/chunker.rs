//! Overlapping text windows sized in characters.

use text_splitter::{ChunkConfig, TextSplitter};
use tracing::debug;

/// A window of document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub content: String,
    pub index: usize,
    /// Character offset of the window start.
    pub start: usize,
}

/// Split `text` into windows of at most `chunk_chars` characters, breaking
/// at the largest semantic unit that fits. Consecutive windows share up to
/// `overlap` characters; an overlap not smaller than the window falls back
/// to half a window.
pub fn chunk_text(text: &str, chunk_chars: usize, overlap: usize) -> Vec<TextChunk> {
    if text.trim().is_empty() || chunk_chars == 0 {
        return Vec::new();
    }

    let overlap = if overlap < chunk_chars {
        overlap
    } else {
        chunk_chars / 2
    };
    let config = ChunkConfig::new(chunk_chars)
        .with_overlap(overlap)
        .unwrap_or_else(|_| ChunkConfig::new(chunk_chars));
    let splitter = TextSplitter::new(config);

    let mut chunks = Vec::new();
    let mut byte_pos = 0;
    let mut char_pos = 0;
    for (offset, content) in splitter.chunk_indices(text) {
        char_pos += text[byte_pos..offset].chars().count();
        byte_pos = offset;
        chunks.push(TextChunk {
            content: content.to_string(),
            index: chunks.len(),
            start: char_pos,
        });
    }

    debug!(
        input_chars = text.chars().count(),
        chunk_count = chunks.len(),
        chunk_chars,
        overlap,
        "text chunked"
    );
    chunks
}
