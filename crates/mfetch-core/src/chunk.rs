//! Fixed-size chunk layout and range math.

/// Inclusive byte range of one chunk: `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    pub start: u64,
    pub end: u64,
}

impl ChunkRange {
    /// Length of this chunk in bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// HTTP Range header value: `bytes=start-end`.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Splits `content_length` bytes into chunks of `chunk_size`; the last chunk
/// may be shorter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    content_length: u64,
    chunk_size: u64,
}

impl ChunkLayout {
    /// `chunk_size` must be non-zero (checked during session pre-flight).
    pub fn new(content_length: u64, chunk_size: u64) -> Self {
        debug_assert!(chunk_size > 0);
        Self {
            content_length,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// `ceil(content_length / chunk_size)`.
    pub fn count(&self) -> u64 {
        self.content_length.div_ceil(self.chunk_size)
    }

    /// Byte range of chunk `index`, clipped to the content length.
    /// `index` must be below [`count`](Self::count).
    pub fn range(&self, index: u64) -> ChunkRange {
        let start = index * self.chunk_size;
        let end = (start + self.chunk_size).min(self.content_length) - 1;
        ChunkRange { start, end }
    }
}
