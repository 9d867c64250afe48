// Engine implementations available to the binary.
//
// No native engine is linked into this build, so the binary runs against
// `UnavailableEngine`: the whole front end works, but every target load is
// refused with a diagnostic.

use std::sync::Arc;

use log::debug;

use crate::debugger::engine::{DebugEngine, EngineError, EngineResult, EngineTarget};

/// Engine stub used when no native debugging engine is available
#[derive(Debug, Clone)]
pub struct UnavailableEngine {
    reason: String,
}

impl UnavailableEngine {
    pub fn new() -> Self {
        Self::with_reason("no native debugging engine is linked into this build")
    }

    /// Create a stub that reports `reason` on every call
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Default for UnavailableEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugEngine for UnavailableEngine {
    fn create_target(&mut self, exe_path: &str) -> EngineResult<Arc<dyn EngineTarget>> {
        debug!("Refusing to create target {}: {}", exe_path, self.reason);
        Err(EngineError::Unavailable(self.reason.clone()))
    }
}
