use std::fmt;

use crate::debugger::location::FileLocation;

/// Requested change of the debuggee's execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugStateChange {
    /// Terminate the process
    Kill,
    /// Step one source line, entering calls
    StepIn,
    /// Step one source line, stepping over calls
    StepOver,
    /// Resume execution
    Continue,
}

impl fmt::Display for DebugStateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Kill => "kill",
            Self::StepIn => "step in",
            Self::StepOver => "step over",
            Self::Continue => "continue",
        };
        f.write_str(name)
    }
}

/// Events consumed by [`crate::debugger::session::Session::tick`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Create a target from the configured executable path
    LoadTarget,
    /// Show a source location
    ViewSource(FileLocation),
    /// Launch the loaded target
    StartProcess,
    /// Create or delete the breakpoint at a location
    ToggleBreakpoint(FileLocation),
    /// Kill, step or continue the stopped process
    ChangeDebugState(DebugStateChange),
    /// Select a frame of the selected thread
    SetSelectedFrame(usize),
}
