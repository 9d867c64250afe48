//! lodeb - a terminal front end for native debugging engines
//!
//! The library holds the engine-independent core (symbol index, session
//! state machine, breakpoints, persisted state) and the ratatui front end.
//! The binary wires both to an engine implementation.

pub mod debugger;
pub mod platform;
pub mod tui;

use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, Result};
use log::LevelFilter;

/// Re-export key types for easier access in tests
pub use debugger::command::{parse_command, ParsedCommand};
pub use debugger::persist::{PersistedState, TargetSettings};
pub use debugger::symbols::SymbolLocIndex;
pub use debugger::{DebugEngine, DebugStateChange, FileLocation, Session, SessionConfig, SessionEvent};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Initialize the logging system
///
/// With a `file`, log records are appended to it instead of going to stderr,
/// which the terminal UI owns.
pub fn init_logging(level: LevelFilter, file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(LevelFilter::Warn)
        .filter_module("lodeb", level)
        .format_timestamp_secs();

    if let Some(path) = file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.try_init().context("Logger already initialized")?;
    Ok(())
}
