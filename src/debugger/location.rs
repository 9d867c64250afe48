use std::fmt;
use std::sync::Arc;

/// A line in a source file
///
/// The path is reference counted so that the symbol index can hand out
/// locations that share one interned copy of each file path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileLocation {
    /// Full path of the source file
    pub path: Arc<str>,
    /// One-based line number
    pub line: u32,
}

impl FileLocation {
    /// Create a new file location
    pub fn new(path: impl Into<Arc<str>>, line: u32) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }

    /// Get the path as a string slice
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the line number
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.line)
    }
}
