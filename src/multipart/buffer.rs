//! Growable scan buffer for the multipart decoder.
//!
//! Holds the unconsumed tail of the body. Chunks are appended at the end,
//! the parsed prefix is discarded in place by `compact`, and token searches
//! start from an explicit offset so bytes already scanned are never
//! scanned again.

/// Initial capacity; small forms never reallocate.
const INITIAL_CAPACITY: usize = 64 * 1024;

#[derive(Debug)]
pub struct ScanBuffer {
    data: Vec<u8>,
}

impl ScanBuffer {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Append a chunk. Capacity at least doubles when it runs out, or grows
    /// to exactly what the chunk needs if that is larger.
    pub fn append(&mut self, chunk: &[u8]) {
        let needed = self.data.len() + chunk.len();
        if needed > self.data.capacity() {
            let target = (self.data.capacity() * 2).max(needed);
            self.data.reserve_exact(target - self.data.len());
        }
        self.data.extend_from_slice(chunk);
    }

    /// Drop the first `consumed` bytes, moving the rest to the front.
    pub fn compact(&mut self, consumed: usize) {
        let consumed = consumed.min(self.data.len());
        if consumed == 0 {
            return;
        }
        self.data.copy_within(consumed.., 0);
        self.data.truncate(self.data.len() - consumed);
    }

    /// Offset of the first `token` at or after `from`.
    pub fn find(&self, token: &[u8], from: usize) -> Option<usize> {
        if token.is_empty() || from >= self.data.len() {
            return None;
        }
        self.data[from..]
            .windows(token.len())
            .position(|window| window == token)
            .map(|pos| from + pos)
    }

    /// Where the next search for `token` must start after a miss: only the
    /// last `token.len() - 1` bytes can still begin a match once more data
    /// arrives.
    pub fn resume_offset(&self, token: &[u8], from: usize) -> usize {
        self.data
            .len()
            .saturating_sub(token.len().saturating_sub(1))
            .max(from)
    }

    /// Whether the bytes at `at` equal `pattern`; `None` until enough bytes
    /// have arrived to tell.
    pub fn matches_at(&self, at: usize, pattern: &[u8]) -> Option<bool> {
        let end = at + pattern.len();
        if end > self.data.len() {
            return None;
        }
        Some(&self.data[at..end] == pattern)
    }

    pub fn slice(&self, start: usize, end: usize) -> &[u8] {
        &self.data[start..end]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }
}

impl Default for ScanBuffer {
    fn default() -> Self {
        Self::new()
    }
}
