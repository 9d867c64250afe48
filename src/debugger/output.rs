use std::borrow::Cow;

/// Default cap on retained process output
pub const DEFAULT_OUTPUT_LIMIT: usize = 1024 * 1024;

/// Rolling buffer of raw process output (stdout and stderr interleaved)
///
/// Once more than `limit` bytes are stored, the oldest bytes are dropped.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    bytes: Vec<u8>,
    limit: usize,
}

impl OutputBuffer {
    /// Create an empty buffer retaining at most `limit` bytes
    pub fn new(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            limit,
        }
    }

    /// Append raw bytes
    pub fn append(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }

        self.bytes.extend_from_slice(data);

        if self.bytes.len() > self.limit {
            let excess = self.bytes.len() - self.limit;
            self.bytes.drain(..excess);
        }
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Raw contents
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Contents as text, with invalid UTF-8 replaced
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Number of stored bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Maximum number of retained bytes
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_LIMIT)
    }
}
