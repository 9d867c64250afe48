//! Persisted session state
//!
//! A small line-oriented `key value` format:
//!
//! ```text
//! version 1
//! target_settings.exe_path "/home/me/my app/build/app"
//! target_settings.working_dir "/home/me/my app"
//! source_view_state.path "/home/me/my app/src/main.c"
//! ```
//!
//! String values are written quoted, with `\` escaping `"` and `\`. Unquoted
//! values are read up to the first whitespace. Unknown keys and malformed
//! lines are skipped; missing keys keep their defaults.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, warn};

/// Current version of the state file format
pub const STATE_VERSION: u32 = 1;

const KEY_VERSION: &str = "version";
const KEY_EXE_PATH: &str = "target_settings.exe_path";
const KEY_WORKING_DIR: &str = "target_settings.working_dir";
const KEY_SOURCE_PATH: &str = "source_view_state.path";

/// User-editable launch settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSettings {
    /// Path of the executable to debug
    pub exe_path: String,
    /// Working directory for launched processes
    pub working_dir: String,
}

/// Everything that survives a restart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedState {
    pub version: u32,
    pub target_settings: TargetSettings,
    /// File shown in the source view
    pub source_path: Option<String>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            target_settings: TargetSettings::default(),
            source_path: None,
        }
    }
}

impl PersistedState {
    /// Parse state file text
    ///
    /// Never fails: bad lines are logged and skipped.
    pub fn parse(text: &str) -> Self {
        let mut state = Self::default();

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let (key, rest) = match line.split_once(char::is_whitespace) {
                Some((key, rest)) => (key, rest.trim_start()),
                None => (line, ""),
            };

            match key {
                KEY_VERSION => match rest.trim().parse::<u32>() {
                    Ok(version) => {
                        if version > STATE_VERSION {
                            warn!("State file version {} is newer than {}", version, STATE_VERSION);
                        }
                        state.version = version;
                    }
                    Err(_) => warn!("Line {}: invalid version {:?}", number + 1, rest),
                },
                KEY_EXE_PATH | KEY_WORKING_DIR | KEY_SOURCE_PATH => {
                    let Some(value) = parse_value(rest) else {
                        warn!("Line {}: malformed value for {}", number + 1, key);
                        continue;
                    };

                    match key {
                        KEY_EXE_PATH => state.target_settings.exe_path = value,
                        KEY_WORKING_DIR => state.target_settings.working_dir = value,
                        _ => state.source_path = Some(value),
                    }
                }
                _ => debug!("Line {}: ignoring unknown key {}", number + 1, key),
            }
        }

        state
    }

    /// Read and parse the state file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file {}", path.display()))?;
        Ok(Self::parse(&text))
    }

    /// Write the state file at `path`, replacing its contents
    pub fn store(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_string())
            .with_context(|| format!("Failed to write state file {}", path.display()))
    }
}

impl fmt::Display for PersistedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", KEY_VERSION, STATE_VERSION)?;
        writeln!(f, "{} {}", KEY_EXE_PATH, quote(&self.target_settings.exe_path))?;
        writeln!(f, "{} {}", KEY_WORKING_DIR, quote(&self.target_settings.working_dir))?;
        if let Some(path) = &self.source_path {
            writeln!(f, "{} {}", KEY_SOURCE_PATH, quote(path))?;
        }
        Ok(())
    }
}

/// Quote a value for the state file
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Parse a (possibly quoted) value
///
/// Returns `None` for an empty value or an unterminated quote.
pub fn parse_value(text: &str) -> Option<String> {
    let text = text.trim_start();

    let Some(quoted) = text.strip_prefix('"') else {
        return text.split_whitespace().next().map(str::to_string);
    };

    let mut value = String::new();
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => value.push(chars.next()?),
            '"' => return Some(value),
            c => value.push(c),
        }
    }

    None
}
