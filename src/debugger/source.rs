use std::io;

use log::{debug, error};

/// Reads source files for the source view
#[cfg_attr(test, mockall::automock)]
pub trait SourceReader: Send {
    /// Read the whole file at `path`
    fn read_source(&self, path: &str) -> io::Result<String>;
}

/// Reads source files from the local file system
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSourceReader;

impl SourceReader for FsSourceReader {
    fn read_source(&self, path: &str) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Load state of the source text
#[derive(Debug, Clone, PartialEq, Eq)]
enum SourceText {
    /// Not read yet
    NotLoaded,
    /// Read successfully
    Loaded(String),
    /// Reading failed; stays failed until explicitly reloaded
    Failed,
}

/// The file currently shown in the source view
#[derive(Debug, Clone)]
pub struct SourceViewState {
    path: String,
    text: SourceText,
    scroll_to_line: Option<u32>,
}

impl SourceViewState {
    /// Create a source view for `path`, optionally scrolled to a line
    pub fn new(path: impl Into<String>, scroll_to_line: Option<u32>) -> Self {
        Self {
            path: path.into(),
            text: SourceText::NotLoaded,
            scroll_to_line,
        }
    }

    /// Path of the viewed file
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Request that the next render scrolls `line` into view
    pub fn set_scroll_to_line(&mut self, line: u32) {
        self.scroll_to_line = Some(line);
    }

    /// Pending scroll request, without consuming it
    pub fn scroll_to_line(&self) -> Option<u32> {
        self.scroll_to_line
    }

    /// Consume the pending scroll request
    ///
    /// The hint is valid for exactly one render pass.
    pub fn take_scroll_to_line(&mut self) -> Option<u32> {
        self.scroll_to_line.take()
    }

    /// Text of the file, reading it on first access
    ///
    /// A failed read yields an empty text and is not retried until
    /// [`SourceViewState::invalidate`] is called.
    pub fn text(&mut self, reader: &dyn SourceReader) -> &str {
        if self.text == SourceText::NotLoaded {
            self.text = match reader.read_source(&self.path) {
                Ok(text) => {
                    debug!("Loaded source file {} ({} bytes)", self.path, text.len());
                    SourceText::Loaded(text)
                }
                Err(e) => {
                    error!("Failed to read source file {}: {}", self.path, e);
                    SourceText::Failed
                }
            };
        }

        match &self.text {
            SourceText::Loaded(text) => text,
            SourceText::NotLoaded | SourceText::Failed => "",
        }
    }

    /// Check if the last read attempt failed
    pub fn load_failed(&self) -> bool {
        self.text == SourceText::Failed
    }

    /// Forget the cached text so the next access reads the file again
    pub fn invalidate(&mut self) {
        self.text = SourceText::NotLoaded;
    }
}
