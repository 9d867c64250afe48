use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::debugger::engine::ThreadId;

/// A variable in scope of a stack frame, as described by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// Variable name
    pub name: String,
    /// Type name (if known)
    pub type_name: Option<String>,
    /// Human-readable value description
    pub description: String,
}

impl Variable {
    /// Create a new variable
    pub fn new(name: impl Into<String>, type_name: Option<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name,
            description: description.into(),
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.type_name {
            Some(type_name) => write!(f, "({}) {} = {}", type_name, self.name, self.description),
            None => write!(f, "{} = {}", self.name, self.description),
        }
    }
}

/// Identity of a frame for caching purposes
///
/// Frame indices are only stable while the process stays stopped, so the
/// program counter is part of the key as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameKey {
    pub thread: ThreadId,
    pub frame: usize,
    pub pc: u64,
}

/// Per-session cache of frame locals
#[derive(Debug, Default)]
pub struct LocalsCache {
    entries: HashMap<FrameKey, Vec<Variable>>,
}

impl LocalsCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the locals for `key`, fetching them with `fetch` on a miss
    pub fn get_or_fetch<F>(&mut self, key: FrameKey, fetch: F) -> &[Variable]
    where
        F: FnOnce() -> Vec<Variable>,
    {
        self.entries.entry(key).or_insert_with(|| {
            debug!("Fetching locals for frame #{} of thread {}", key.frame, key.thread);
            fetch()
        })
    }

    /// Check if `key` is cached
    pub fn contains(&self, key: &FrameKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Drop every cached entry
    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    /// Number of cached frames
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Value of a watch expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchValue {
    /// The engine evaluated the expression
    Value(String),
    /// The engine reported an error
    Error(String),
    /// There is no stopped frame to evaluate in
    Unavailable,
}

impl fmt::Display for WatchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => write!(f, "{}", value),
            Self::Error(message) => write!(f, "<error: {}>", message),
            Self::Unavailable => write!(f, "<unavailable>"),
        }
    }
}
