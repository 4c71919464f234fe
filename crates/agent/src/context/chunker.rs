//! Fixed-size document chunking.
//!
//! Splits extracted text into contiguous non-overlapping slices of a fixed
//! character count. Sizes are counted in Unicode scalar values, not bytes:
//! the documents this pipeline sees are largely Cyrillic, and byte slicing
//! would cut code points in half.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("Chunk size must be positive")]
    InvalidSize,
}

/// Split `text` into ordered chunks of `size` characters; the last chunk
/// may be shorter. Lossless: the concatenation of the result equals the
/// input exactly. Empty input yields an empty vector.
pub fn chunk(text: &str, size: usize) -> Result<Vec<String>, ChunkError> {
    if size == 0 {
        return Err(ChunkError::InvalidSize);
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == size {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    Ok(chunks)
}
