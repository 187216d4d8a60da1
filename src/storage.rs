// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Chunked file content storage
//!
//! File bytes are held as an ordered sequence of fixed-size chunks; the
//! logical content is the in-order concatenation of the chunks. Read,
//! write and truncate operate on that logical byte stream. The chunked
//! layout is an implementation detail; every operation behaves exactly
//! as if it edited one flat buffer.
//!
//! Invariant: after any operation returns, every chunk except the last is
//! exactly `chunk_size` bytes and the last is between 1 and `chunk_size`
//! bytes (an empty file has no chunks at all).

/// Per-file content store. Created empty alongside a regular-file node and
/// destroyed with it; never shared between nodes.
#[derive(Clone, Debug)]
pub struct ChunkedContent {
    chunk_size: usize,
    chunks: Vec<Vec<u8>>,
}

impl ChunkedContent {
    /// New empty content with the given fixed chunk size (non-zero).
    pub fn new(chunk_size: usize) -> Self {
        debug_assert!(chunk_size > 0);
        Self {
            chunk_size,
            chunks: Vec::new(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Logical byte length. All chunks before the last are full, so this
    /// is pure integer arithmetic.
    pub fn len(&self) -> u64 {
        match self.chunks.split_last() {
            Some((last, full)) => (full.len() * self.chunk_size + last.len()) as u64,
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Read `[offset, offset + size)` clipped to the content length.
    /// Returns empty when `offset` is at or past EOF.
    pub fn read(&self, offset: u64, size: usize) -> Vec<u8> {
        let total = self.len();
        if size == 0 || offset >= total {
            return Vec::new();
        }
        let end = total.min(offset + size as u64);
        let mut remaining = (end - offset) as usize;
        let mut out = Vec::with_capacity(remaining);

        // Integer chunk addressing: the starting chunk and the offset
        // inside it. Subsequent chunks are consumed from their start.
        let mut chunk_index = (offset / self.chunk_size as u64) as usize;
        let mut in_chunk = (offset % self.chunk_size as u64) as usize;
        while remaining > 0 {
            let chunk = &self.chunks[chunk_index];
            let take = remaining.min(chunk.len() - in_chunk);
            out.extend_from_slice(&chunk[in_chunk..in_chunk + take]);
            remaining -= take;
            chunk_index += 1;
            in_chunk = 0;
        }
        out
    }

    /// Splice `data` into the logical buffer at `offset`, overwriting in
    /// place and extending the content where the write runs past EOF. A
    /// write starting beyond EOF zero-fills the gap first. Returns the
    /// number of bytes written, always `data.len()`.
    pub fn write(&mut self, offset: u64, data: &[u8]) -> usize {
        let mut buf = self.to_vec();
        let offset = offset as usize;
        if offset > buf.len() {
            // Zero-fill the hole between EOF and the write offset.
            buf.resize(offset, 0);
        }
        let end = offset + data.len();
        if end > buf.len() {
            buf.resize(end, 0);
        }
        buf[offset..end].copy_from_slice(data);
        self.rechunk(buf);
        data.len()
    }

    /// Standard truncate/extend: shrinking keeps the first `new_len`
    /// bytes, growing zero-extends to `new_len`.
    pub fn truncate(&mut self, new_len: u64) {
        let total = self.len();
        if new_len < total {
            let keep_chunks = (new_len / self.chunk_size as u64) as usize;
            let tail = (new_len % self.chunk_size as u64) as usize;
            if tail == 0 {
                self.chunks.truncate(keep_chunks);
            } else {
                self.chunks.truncate(keep_chunks + 1);
                self.chunks[keep_chunks].truncate(tail);
            }
        } else {
            let mut remaining = new_len - total;
            // Pad the short last chunk to a full chunk before appending
            // fresh zero chunks.
            if let Some(last) = self.chunks.last_mut() {
                let pad = (self.chunk_size - last.len()).min(remaining as usize);
                last.resize(last.len() + pad, 0);
                remaining -= pad as u64;
            }
            while remaining > 0 {
                let take = remaining.min(self.chunk_size as u64) as usize;
                self.chunks.push(vec![0u8; take]);
                remaining -= take as u64;
            }
        }
    }

    /// Materialize the logical buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() as usize);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }

    fn rechunk(&mut self, buf: Vec<u8>) {
        self.chunks.clear();
        let mut start = 0;
        while start < buf.len() {
            let end = (start + self.chunk_size).min(buf.len());
            self.chunks.push(buf[start..end].to_vec());
            start = end;
        }
    }

    #[cfg(test)]
    fn chunk_lens(&self) -> Vec<usize> {
        self.chunks.iter().map(|c| c.len()).collect()
    }
}
