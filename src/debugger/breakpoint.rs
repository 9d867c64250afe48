use std::collections::HashMap;

use log::{debug, info};

use crate::debugger::engine::{BreakpointId, EngineResult, EngineTarget};
use crate::debugger::location::FileLocation;

/// Outcome of toggling a breakpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointToggle {
    /// A new breakpoint was created
    Added(BreakpointId),
    /// An existing breakpoint was deleted
    Removed(BreakpointId),
}

/// Source line breakpoints of one target
///
/// The map is only touched after the corresponding engine call succeeded, so
/// the registry and the engine always agree on which breakpoints exist.
/// Breakpoints that currently resolve to no code (for example in a file
/// whose module is not loaded yet) stay registered.
#[derive(Debug, Default)]
pub struct BreakpointRegistry {
    breakpoints: HashMap<FileLocation, BreakpointId>,
}

impl BreakpointRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the breakpoint at `location` if it does not exist, delete it otherwise
    pub fn toggle(&mut self, target: &dyn EngineTarget, location: &FileLocation) -> EngineResult<BreakpointToggle> {
        if let Some(&id) = self.breakpoints.get(location) {
            target.delete_breakpoint(id)?;
            self.breakpoints.remove(location);
            info!("Removed breakpoint {} at {}", id, location);
            return Ok(BreakpointToggle::Removed(id));
        }

        let id = target.create_breakpoint(location)?;
        let resolved = target.breakpoint_location_count(id);
        if resolved == 0 {
            debug!("Breakpoint {} at {} has no resolved locations yet", id, location);
        }

        self.breakpoints.insert(location.clone(), id);
        info!("Set breakpoint {} at {}", id, location);
        Ok(BreakpointToggle::Added(id))
    }

    /// Get the breakpoint at `location`
    pub fn get(&self, location: &FileLocation) -> Option<BreakpointId> {
        self.breakpoints.get(location).copied()
    }

    /// Check if there is a breakpoint at `location`
    pub fn contains(&self, location: &FileLocation) -> bool {
        self.breakpoints.contains_key(location)
    }

    /// Check if there is a breakpoint on `line` of the file at `path`
    pub fn contains_line(&self, path: &str, line: u32) -> bool {
        self.breakpoints.contains_key(&FileLocation::new(path, line))
    }

    /// All breakpoints, sorted by location
    pub fn sorted(&self) -> Vec<(&FileLocation, BreakpointId)> {
        let mut all: Vec<_> = self.breakpoints.iter().map(|(loc, &id)| (loc, id)).collect();
        all.sort();
        all
    }

    /// Iterate over all breakpoints in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&FileLocation, BreakpointId)> {
        self.breakpoints.iter().map(|(loc, &id)| (loc, id))
    }

    /// Number of breakpoints
    pub fn count(&self) -> usize {
        self.breakpoints.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }
}
