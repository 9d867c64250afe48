//! Capability surface of the native debugging engine
//!
//! The session never talks to a concrete engine. Everything it needs is
//! expressed by the traits in this module, so the whole front end can run
//! against an in-process fake in tests or against the stub in
//! [`crate::platform`] when no engine is linked.
//!
//! Durable handles (targets, processes, listeners and breakpoint ids) may be
//! stored across ticks. Threads and frames are only ever handed out as owned
//! snapshots identified by [`ThreadId`] and a frame index; callers must not
//! keep them beyond the current tick.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::debugger::location::FileLocation;
use crate::debugger::variables::Variable;

/// Result type for engine calls
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Errors reported by the debugging engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// No engine is linked into this build
    #[error("debugging engine unavailable: {0}")]
    Unavailable(String),
    /// The executable could not be turned into a target
    #[error("could not create target for '{path}': {reason}")]
    InvalidTarget { path: String, reason: String },
    /// The process could not be launched
    #[error("failed to launch process: {0}")]
    LaunchFailed(String),
    /// Breakpoint creation or deletion failed
    #[error("breakpoint operation failed: {0}")]
    Breakpoint(String),
    /// Kill, continue or step was refused
    #[error("process control failed: {0}")]
    ProcessControl(String),
    /// The referenced thread no longer exists
    #[error("no such thread: {0}")]
    NoSuchThread(ThreadId),
    /// The referenced frame no longer exists
    #[error("no frame #{index} on thread {thread}")]
    NoSuchFrame { thread: ThreadId, index: usize },
    /// Expression evaluation failed
    #[error("{0}")]
    Evaluation(String),
}

/// Engine handle for a breakpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BreakpointId(pub u32);

impl fmt::Display for BreakpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Engine identifier for a thread of the debuggee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(pub u64);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Symbol classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Executable code (functions, trampolines)
    Code,
    /// Global or static data
    Data,
    /// Debugger-only symbols
    Debug,
    /// Anything else
    Other,
}

/// A symbol as enumerated from one module of a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSymbol {
    /// Symbol name as reported by the engine
    pub name: String,
    /// Symbol kind
    pub kind: SymbolKind,
    /// Start address, if the symbol has one
    pub start_address: Option<u64>,
}

impl EngineSymbol {
    /// Create a code symbol starting at `address`
    pub fn code(name: impl Into<String>, address: u64) -> Self {
        Self {
            name: name.into(),
            kind: SymbolKind::Code,
            start_address: Some(address),
        }
    }
}

/// Why a thread is stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The thread is not stopped for any reason of its own
    None,
    /// The thread hit a breakpoint
    Breakpoint,
    /// A step or other thread plan finished
    PlanComplete,
    /// The thread hit a watchpoint
    Watchpoint,
    /// The thread received a signal
    Signal(i32),
    /// The thread raised an exception
    Exception(String),
    /// Some other engine-specific reason
    Other(String),
}

impl StopReason {
    /// Check if this stop was requested by the user (breakpoint hit or step finished)
    pub fn is_user_stop(&self) -> bool {
        matches!(self, Self::Breakpoint | Self::PlanComplete)
    }

    /// Short description for display
    pub fn description(&self) -> String {
        match self {
            Self::None => "none".to_string(),
            Self::Breakpoint => "breakpoint".to_string(),
            Self::PlanComplete => "step complete".to_string(),
            Self::Watchpoint => "watchpoint".to_string(),
            Self::Signal(signal) => format!("signal {}", signal),
            Self::Exception(what) => format!("exception: {}", what),
            Self::Other(what) => what.clone(),
        }
    }
}

/// Snapshot of one thread of the debuggee
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadInfo {
    pub id: ThreadId,
    pub name: Option<String>,
    pub stop_reason: StopReason,
}

/// Snapshot of one stack frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    /// Frame number (0 is the innermost frame)
    pub index: usize,
    /// Program counter
    pub pc: u64,
    /// Function name (if known)
    pub function: Option<String>,
    /// Source location (if the frame has line information)
    pub location: Option<FileLocation>,
}

impl FrameInfo {
    /// Get a descriptive string for the frame
    pub fn description(&self) -> String {
        let function = self.function.as_deref().unwrap_or("??");
        match &self.location {
            Some(location) => format!("#{} {} at {}", self.index, function, location),
            None => format!("#{} {} ({:#x})", self.index, function, self.pc),
        }
    }
}

/// Process state-change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessEvent {
    /// The process stopped; inspect the threads to find out why
    Stopped,
    /// The process resumed
    Running,
    /// The process exited with the given status (if known)
    Exited(Option<i32>),
    /// The debugger detached from the process
    Detached,
    /// The process was unloaded
    Unloaded,
}

impl ProcessEvent {
    /// Check if the process is gone after this notification
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exited(_) | Self::Detached | Self::Unloaded)
    }
}

/// A freshly launched process together with the listener bound to it
pub struct LaunchedProcess {
    pub process: Box<dyn EngineProcess>,
    pub listener: Box<dyn ProcessListener>,
}

/// Entry point of the debugging engine
#[cfg_attr(test, mockall::automock)]
pub trait DebugEngine {
    /// Create a target from the executable at `exe_path`
    fn create_target(&mut self, exe_path: &str) -> EngineResult<Arc<dyn EngineTarget>>;
}

/// A loaded executable and the modules it pulls in
///
/// Targets are shared with the background symbol indexer, so implementations
/// must be usable from another thread.
#[cfg_attr(test, mockall::automock)]
pub trait EngineTarget: Send + Sync {
    /// Path of the executable this target was created from
    fn executable(&self) -> String;

    /// Number of modules loaded for this target
    fn module_count(&self) -> usize;

    /// All symbols of the module at `module`
    fn module_symbols(&self, module: usize) -> Vec<EngineSymbol>;

    /// Resolve an address through the line table
    fn address_location(&self, address: u64) -> Option<FileLocation>;

    /// Create a breakpoint at a source line
    fn create_breakpoint(&self, location: &FileLocation) -> EngineResult<BreakpointId>;

    /// Delete a breakpoint
    fn delete_breakpoint(&self, id: BreakpointId) -> EngineResult<()>;

    /// Number of code locations the breakpoint currently resolves to
    fn breakpoint_location_count(&self, id: BreakpointId) -> usize;

    /// Launch the target in `working_dir`, bound to a new listener
    fn launch(&self, working_dir: &str) -> EngineResult<LaunchedProcess>;
}

/// A live debuggee process
pub trait EngineProcess {
    /// Operating system process id (if known)
    fn pid(&self) -> Option<u32>;

    /// Non-blocking read of at most `buf.len()` bytes of stdout
    fn read_stdout(&mut self, buf: &mut [u8]) -> usize;

    /// Non-blocking read of at most `buf.len()` bytes of stderr
    fn read_stderr(&mut self, buf: &mut [u8]) -> usize;

    /// Terminate the process
    fn kill(&mut self) -> EngineResult<()>;

    /// Resume execution
    fn resume(&mut self) -> EngineResult<()>;

    /// Source-level step into calls on `thread`
    fn step_into(&mut self, thread: ThreadId) -> EngineResult<()>;

    /// Source-level step over calls on `thread`
    fn step_over(&mut self, thread: ThreadId) -> EngineResult<()>;

    /// Snapshot of all threads
    fn threads(&self) -> Vec<ThreadInfo>;

    /// Currently selected thread
    fn selected_thread(&self) -> Option<ThreadId>;

    /// Make `thread` the selected thread
    fn select_thread(&mut self, thread: ThreadId) -> EngineResult<()>;

    /// Snapshot of the call stack of `thread`, innermost first
    fn frames(&self, thread: ThreadId) -> Vec<FrameInfo>;

    /// Index of the selected frame of `thread`
    fn selected_frame(&self, thread: ThreadId) -> Option<usize>;

    /// Make frame `index` the selected frame of `thread`
    fn select_frame(&mut self, thread: ThreadId, index: usize) -> EngineResult<()>;

    /// In-scope variables of a frame with their human-readable descriptions
    fn variables(&self, thread: ThreadId, frame: usize) -> Vec<Variable>;

    /// Evaluate an expression in the context of a frame
    fn evaluate(&self, thread: ThreadId, frame: usize, expression: &str) -> EngineResult<String>;
}

/// Channel delivering process state-change notifications
pub trait ProcessListener {
    /// Next pending notification, without blocking
    fn poll_event(&mut self) -> Option<ProcessEvent>;
}
