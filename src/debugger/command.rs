/// Prefix that turns palette text into a symbol search
pub const SYMBOL_PREFIX: char = '@';

/// Classified command palette text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedCommand<'a> {
    /// Look for a source file whose path contains the text
    LookForFile(&'a str),
    /// Look for a symbol whose name contains the text
    LookForSymbol(&'a str),
}

impl<'a> ParsedCommand<'a> {
    /// Search text without the prefix
    pub fn text(&self) -> &'a str {
        match self {
            Self::LookForFile(text) | Self::LookForSymbol(text) => text,
        }
    }
}

/// Classify command palette text
///
/// `@text` searches symbols for `text`; anything else is a file search.
pub fn parse_command(text: &str) -> ParsedCommand<'_> {
    match text.strip_prefix(SYMBOL_PREFIX) {
        Some(rest) => ParsedCommand::LookForSymbol(rest),
        None => ParsedCommand::LookForFile(text),
    }
}
