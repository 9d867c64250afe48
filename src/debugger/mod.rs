pub mod breakpoint;
pub mod command;
pub mod engine;
pub mod event;
pub mod location;
pub mod output;
pub mod persist;
pub mod session;
pub mod source;
pub mod symbols;
pub mod variables;

// Re-export the types most callers need
pub use engine::{DebugEngine, EngineError, EngineProcess, EngineResult, EngineTarget, ProcessListener};
pub use event::{DebugStateChange, SessionEvent};
pub use location::FileLocation;
pub use session::{IndexStatus, Session, SessionConfig, SessionPhase};
