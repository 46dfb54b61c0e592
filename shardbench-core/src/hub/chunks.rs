//! Byte chunking for tensor storage
//!
//! Splits a sample's bytes into pieces that top up the last incomplete
//! chunk first, then fill whole chunks.

/// Split `data` into chunk-sized pieces
///
/// When the previous chunk holds `last_chunk_num_bytes` (less than
/// `chunk_size`), the first piece is sized to fill it. Every following
/// piece is at most `chunk_size` bytes. Empty input yields nothing.
///
/// # Panics
///
/// Panics if `chunk_size` is 0.
pub fn generate_chunks(data: &[u8], chunk_size: usize, last_chunk_num_bytes: Option<usize>) -> Vec<&[u8]> {
    assert!(chunk_size > 0, "chunk_size must be non-zero");

    let mut pieces = Vec::new();
    let mut rest = data;

    if let Some(last) = last_chunk_num_bytes {
        if last < chunk_size && !rest.is_empty() {
            let fill = (chunk_size - last).min(rest.len());
            let (head, tail) = rest.split_at(fill);
            pieces.push(head);
            rest = tail;
        }
    }

    pieces.extend(rest.chunks(chunk_size));
    pieces
}
