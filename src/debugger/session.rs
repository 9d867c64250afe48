//! Debug session state machine
//!
//! The UI appends [`SessionEvent`]s with [`Session::push_event`] and calls
//! [`Session::tick`] once per update. A tick:
//!
//! 1. polls the process, if any: a bounded read of stdout and stderr, then
//!    every pending state-change notification,
//! 2. drains the events queued since the last tick, in order,
//! 3. adopts a finished symbol index build for the current target,
//! 4. installs the events produced along the way as the queue for the next
//!    tick.
//!
//! Requests that do not make sense in the current state (stepping without a
//! stopped process, launching without a target, ...) are logged and ignored.
//! Engine failures are logged and leave the previous state in place.

use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

use anyhow::Result;
use log::{debug, error, info, warn};

use crate::debugger::breakpoint::BreakpointRegistry;
use crate::debugger::engine::{
    BreakpointId, DebugEngine, EngineProcess, EngineTarget, FrameInfo, LaunchedProcess, ProcessEvent, ProcessListener, ThreadId,
    ThreadInfo,
};
use crate::debugger::event::{DebugStateChange, SessionEvent};
use crate::debugger::location::FileLocation;
use crate::debugger::output::{OutputBuffer, DEFAULT_OUTPUT_LIMIT};
use crate::debugger::persist::{PersistedState, TargetSettings};
use crate::debugger::source::{FsSourceReader, SourceReader, SourceViewState};
use crate::debugger::symbols::SymbolLocIndex;
use crate::debugger::variables::{FrameKey, LocalsCache, Variable, WatchValue};

/// Default size of a single stdout/stderr read
pub const DEFAULT_READ_CHUNK: usize = 4096;

/// Session tuning knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximum number of process output bytes retained
    pub output_limit: usize,
    /// Maximum number of bytes read from each of stdout and stderr per tick
    pub read_chunk: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_limit: DEFAULT_OUTPUT_LIMIT,
            read_chunk: DEFAULT_READ_CHUNK,
        }
    }
}

/// Coarse session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No target loaded
    NoTarget,
    /// Target loaded, symbols still being indexed
    TargetLoading,
    /// Target loaded and ready to launch
    TargetReady,
    /// Process running
    ProcessRunning,
    /// Process stopped
    ProcessStopped,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoTarget => "no target",
            Self::TargetLoading => "loading symbols",
            Self::TargetReady => "ready",
            Self::ProcessRunning => "running",
            Self::ProcessStopped => "stopped",
        };
        f.write_str(text)
    }
}

/// Availability of the symbol index
#[derive(Debug, Clone, Copy)]
pub enum IndexStatus<'a> {
    /// No target is loaded
    NoTarget,
    /// The index for the current target is still being built
    Loading,
    /// The build died without producing an index
    Failed,
    /// The index is ready
    Ready(&'a SymbolLocIndex),
}

/// Execution state of a live process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Stopped,
}

/// A launched process
pub struct ProcessState {
    process: Box<dyn EngineProcess>,
    listener: Box<dyn ProcessListener>,
    run_state: RunState,
}

impl ProcessState {
    fn new(launched: LaunchedProcess) -> Self {
        Self {
            process: launched.process,
            listener: launched.listener,
            run_state: RunState::Running,
        }
    }

    /// Current execution state
    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Operating system process id (if known)
    pub fn pid(&self) -> Option<u32> {
        self.process.pid()
    }
}

impl fmt::Debug for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessState")
            .field("pid", &self.process.pid())
            .field("run_state", &self.run_state)
            .finish()
    }
}

/// A loaded target and everything that hangs off it
pub struct TargetState {
    generation: u64,
    target: Arc<dyn EngineTarget>,
    breakpoints: BreakpointRegistry,
    symbol_index: Option<SymbolLocIndex>,
    process: Option<ProcessState>,
}

impl TargetState {
    fn new(generation: u64, target: Arc<dyn EngineTarget>) -> Self {
        Self {
            generation,
            target,
            breakpoints: BreakpointRegistry::new(),
            symbol_index: None,
            process: None,
        }
    }

    /// Load counter value this target was created with
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Path of the executable
    pub fn executable(&self) -> String {
        self.target.executable()
    }

    /// Breakpoints of this target
    pub fn breakpoints(&self) -> &BreakpointRegistry {
        &self.breakpoints
    }

    /// The symbol index, once adopted
    pub fn symbol_index(&self) -> Option<&SymbolLocIndex> {
        self.symbol_index.as_ref()
    }

    /// The live process, if any
    pub fn process(&self) -> Option<&ProcessState> {
        self.process.as_ref()
    }
}

impl fmt::Debug for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetState")
            .field("generation", &self.generation)
            .field("breakpoints", &self.breakpoints)
            .field("indexed_symbols", &self.symbol_index.as_ref().map(SymbolLocIndex::len))
            .field("process", &self.process)
            .finish()
    }
}

/// Symbol index build running on a background thread
struct IndexBuild {
    generation: u64,
    receiver: Receiver<SymbolLocIndex>,
}

/// Debug session
pub struct Session<E: DebugEngine> {
    engine: E,
    config: SessionConfig,
    target_settings: TargetSettings,
    target: Option<TargetState>,
    generation: u64,
    index_builds: Vec<IndexBuild>,
    source_view: Option<SourceViewState>,
    source_reader: Box<dyn SourceReader>,
    output: OutputBuffer,
    read_buf: Vec<u8>,
    events: Vec<SessionEvent>,
    locals_cache: LocalsCache,
    watches: Vec<String>,
    watch_cache: HashMap<(FrameKey, String), WatchValue>,
}

impl<E: DebugEngine> Session<E> {
    /// Create a session with the default configuration
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, SessionConfig::default())
    }

    /// Create a session with an explicit configuration
    pub fn with_config(engine: E, config: SessionConfig) -> Self {
        Self {
            engine,
            output: OutputBuffer::new(config.output_limit),
            read_buf: vec![0; config.read_chunk],
            config,
            target_settings: TargetSettings::default(),
            target: None,
            generation: 0,
            index_builds: Vec::new(),
            source_view: None,
            source_reader: Box::new(FsSourceReader),
            events: Vec::new(),
            locals_cache: LocalsCache::new(),
            watches: Vec::new(),
            watch_cache: HashMap::new(),
        }
    }

    /// Replace the reader used for the source view
    pub fn with_source_reader(mut self, reader: impl SourceReader + 'static) -> Self {
        self.source_reader = Box::new(reader);
        self
    }

    /// Queue an event for the next tick
    pub fn push_event(&mut self, event: SessionEvent) {
        debug!("Queuing event: {:?}", event);
        self.events.push(event);
    }

    /// Events waiting for the next tick
    pub fn pending_events(&self) -> &[SessionEvent] {
        &self.events
    }

    /// Run one update cycle
    pub fn tick(&mut self) {
        let mut next = Vec::new();

        self.poll_process(&mut next);

        for event in mem::take(&mut self.events) {
            self.handle_event(event, &mut next);
        }

        self.poll_index_builds();

        self.events.append(&mut next);
    }

    fn poll_process(&mut self, next: &mut Vec<SessionEvent>) {
        let Some(target) = self.target.as_mut() else {
            return;
        };
        let Some(process) = target.process.as_mut() else {
            return;
        };

        let read = process.process.read_stdout(&mut self.read_buf);
        self.output.append(&self.read_buf[..read]);
        let read = process.process.read_stderr(&mut self.read_buf);
        self.output.append(&self.read_buf[..read]);

        let mut terminated = None;

        while let Some(event) = process.listener.poll_event() {
            if event.is_terminal() {
                terminated = Some(event);
                break;
            }

            match event {
                ProcessEvent::Stopped => {
                    process.run_state = RunState::Stopped;
                    self.locals_cache.invalidate();
                    self.watch_cache.clear();

                    if let Some(location) = select_stopped_thread(process.process.as_mut()) {
                        next.push(SessionEvent::ViewSource(location));
                    }
                }
                ProcessEvent::Running => {
                    process.run_state = RunState::Running;
                }
                ProcessEvent::Exited(_) | ProcessEvent::Detached | ProcessEvent::Unloaded => {}
            }
        }

        if let Some(event) = terminated {
            match event {
                ProcessEvent::Exited(Some(code)) => info!("Process exited with status {}", code),
                ProcessEvent::Exited(None) => info!("Process exited"),
                ProcessEvent::Detached => info!("Detached from process"),
                _ => info!("Process unloaded"),
            }

            target.process = None;
            self.locals_cache.invalidate();
            self.watch_cache.clear();
        }
    }

    fn handle_event(&mut self, event: SessionEvent, next: &mut Vec<SessionEvent>) {
        match event {
            SessionEvent::LoadTarget => self.load_target(),
            SessionEvent::ViewSource(location) => self.view_source(&location),
            SessionEvent::StartProcess => self.start_process(),
            SessionEvent::ToggleBreakpoint(location) => self.toggle_breakpoint(&location),
            SessionEvent::ChangeDebugState(change) => self.change_debug_state(change),
            SessionEvent::SetSelectedFrame(index) => self.set_selected_frame(index, next),
        }
    }

    fn load_target(&mut self) {
        let exe_path = self.target_settings.exe_path.clone();
        if exe_path.trim().is_empty() {
            warn!("Cannot load target: no executable path set");
            return;
        }

        let target = match self.engine.create_target(&exe_path) {
            Ok(target) => target,
            Err(e) => {
                error!("Failed to create target {}: {}", exe_path, e);
                return;
            }
        };

        if let Some(process) = self.target.as_mut().and_then(|old| old.process.as_mut()) {
            if let Err(e) = process.process.kill() {
                warn!("Failed to kill the previous process: {}", e);
            }
        }

        self.generation += 1;
        self.locals_cache.invalidate();
        self.watch_cache.clear();
        self.start_index_build(self.generation, Arc::clone(&target));
        self.target = Some(TargetState::new(self.generation, target));

        info!("Created target {}", exe_path);
    }

    fn start_index_build(&mut self, generation: u64, target: Arc<dyn EngineTarget>) {
        let (sender, receiver) = mpsc::channel();

        let spawned = thread::Builder::new()
            .name(format!("symbol-index-{}", generation))
            .spawn(move || {
                let index = SymbolLocIndex::load(target.as_ref());
                if sender.send(index).is_err() {
                    debug!("Symbol index {} finished after its session went away", generation);
                }
            });

        match spawned {
            Ok(_) => self.index_builds.push(IndexBuild { generation, receiver }),
            Err(e) => error!("Failed to start symbol indexing: {}", e),
        }
    }

    fn poll_index_builds(&mut self) {
        let current = self.target.as_ref().map(TargetState::generation);
        let mut finished = Vec::new();

        self.index_builds.retain(|build| match build.receiver.try_recv() {
            Ok(index) => {
                finished.push((build.generation, index));
                false
            }
            Err(TryRecvError::Empty) => true,
            Err(TryRecvError::Disconnected) => {
                error!("Symbol indexing for target generation {} died", build.generation);
                false
            }
        });

        for (generation, index) in finished {
            match self.target.as_mut() {
                Some(target) if Some(generation) == current && target.symbol_index.is_none() => {
                    info!("Symbol index ready ({} symbols)", index.len());
                    target.symbol_index = Some(index);
                }
                _ => debug!("Discarding stale symbol index for target generation {}", generation),
            }
        }
    }

    fn view_source(&mut self, location: &FileLocation) {
        if let Some(view) = self.source_view.as_mut().filter(|view| view.path() == location.path()) {
            view.set_scroll_to_line(location.line);
            return;
        }

        self.source_view = Some(SourceViewState::new(location.path(), Some(location.line)));
    }

    fn start_process(&mut self) {
        let Some(target) = self.target.as_mut() else {
            warn!("Cannot start a process: no target loaded");
            return;
        };

        if target.process.is_some() {
            warn!("Cannot start a process: one is already running");
            return;
        }

        self.output.clear();

        match target.target.launch(&self.target_settings.working_dir) {
            Ok(launched) => {
                let process = ProcessState::new(launched);
                info!("Launched {} (pid {:?})", target.target.executable(), process.pid());
                target.process = Some(process);
                self.locals_cache.invalidate();
                self.watch_cache.clear();
            }
            Err(e) => error!("Failed to launch {}: {}", target.target.executable(), e),
        }
    }

    fn toggle_breakpoint(&mut self, location: &FileLocation) {
        let Some(target) = self.target.as_mut() else {
            warn!("Cannot toggle breakpoint at {}: no target loaded", location);
            return;
        };

        if let Err(e) = target.breakpoints.toggle(target.target.as_ref(), location) {
            error!("Failed to toggle breakpoint at {}: {}", location, e);
        }
    }

    fn change_debug_state(&mut self, change: DebugStateChange) {
        let Some(process) = self.target.as_mut().and_then(|target| target.process.as_mut()) else {
            warn!("Cannot {}: no process", change);
            return;
        };

        if process.run_state != RunState::Stopped {
            warn!("Cannot {} while the process is running", change);
            return;
        }

        let result = match change {
            DebugStateChange::Kill => process.process.kill(),
            DebugStateChange::Continue => process.process.resume(),
            DebugStateChange::StepIn | DebugStateChange::StepOver => {
                let Some(thread) = process.process.selected_thread() else {
                    warn!("Cannot {}: no thread selected", change);
                    return;
                };

                if change == DebugStateChange::StepIn {
                    process.process.step_into(thread)
                } else {
                    process.process.step_over(thread)
                }
            }
        };

        match result {
            Ok(()) => {
                debug!("Requested {}", change);
                process.run_state = RunState::Running;
            }
            Err(e) => error!("Failed to {}: {}", change, e),
        }
    }

    fn set_selected_frame(&mut self, index: usize, next: &mut Vec<SessionEvent>) {
        let Some(process) = self.target.as_mut().and_then(|target| target.process.as_mut()) else {
            warn!("Cannot select frame #{}: no process", index);
            return;
        };

        let Some(thread) = process.process.selected_thread() else {
            warn!("Cannot select frame #{}: no thread selected", index);
            return;
        };

        if let Err(e) = process.process.select_frame(thread, index) {
            error!("Failed to select frame #{}: {}", index, e);
            return;
        }

        if let Some(location) = frame_location(process.process.as_ref(), thread, index) {
            next.push(SessionEvent::ViewSource(location));
        }
    }

    /// Coarse state of the session
    pub fn phase(&self) -> SessionPhase {
        let Some(target) = &self.target else {
            return SessionPhase::NoTarget;
        };

        match &target.process {
            Some(process) if process.run_state == RunState::Stopped => SessionPhase::ProcessStopped,
            Some(_) => SessionPhase::ProcessRunning,
            None if matches!(self.index_status(), IndexStatus::Loading) => SessionPhase::TargetLoading,
            None => SessionPhase::TargetReady,
        }
    }

    /// Availability of the symbol index of the current target
    pub fn index_status(&self) -> IndexStatus<'_> {
        let Some(target) = &self.target else {
            return IndexStatus::NoTarget;
        };

        if let Some(index) = &target.symbol_index {
            return IndexStatus::Ready(index);
        }

        if self.index_builds.iter().any(|build| build.generation == target.generation) {
            IndexStatus::Loading
        } else {
            IndexStatus::Failed
        }
    }

    /// The debugging engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Launch settings
    pub fn target_settings(&self) -> &TargetSettings {
        &self.target_settings
    }

    /// Launch settings, for editing
    pub fn target_settings_mut(&mut self) -> &mut TargetSettings {
        &mut self.target_settings
    }

    /// The loaded target
    pub fn target(&self) -> Option<&TargetState> {
        self.target.as_ref()
    }

    /// Breakpoints of the loaded target
    pub fn breakpoints(&self) -> Option<&BreakpointRegistry> {
        self.target.as_ref().map(TargetState::breakpoints)
    }

    /// Number of code locations the breakpoint `id` resolves to
    pub fn breakpoint_locations(&self, id: BreakpointId) -> usize {
        self.target
            .as_ref()
            .map_or(0, |target| target.target.breakpoint_location_count(id))
    }

    /// The live process
    pub fn process(&self) -> Option<&ProcessState> {
        self.target.as_ref().and_then(TargetState::process)
    }

    /// Output of the current (or last) process
    pub fn output(&self) -> &OutputBuffer {
        &self.output
    }

    fn live_process(&self) -> Option<&dyn EngineProcess> {
        self.process().map(|process| process.process.as_ref())
    }

    /// Snapshot of the process's threads
    pub fn threads(&self) -> Vec<ThreadInfo> {
        self.live_process().map(|process| process.threads()).unwrap_or_default()
    }

    /// Currently selected thread
    pub fn selected_thread(&self) -> Option<ThreadId> {
        self.live_process().and_then(|process| process.selected_thread())
    }

    /// Call stack of the selected thread
    pub fn frames(&self) -> Vec<FrameInfo> {
        let Some(process) = self.live_process() else {
            return Vec::new();
        };

        process
            .selected_thread()
            .map(|thread| process.frames(thread))
            .unwrap_or_default()
    }

    /// Index of the selected frame of the selected thread
    pub fn selected_frame(&self) -> Option<usize> {
        let process = self.live_process()?;
        process.selected_thread().and_then(|thread| process.selected_frame(thread))
    }

    /// Identity of the selected frame, if the process is stopped
    fn stopped_frame(&self) -> Option<FrameKey> {
        let process = self.process()?;
        if process.run_state != RunState::Stopped {
            return None;
        }

        let thread = process.process.selected_thread()?;
        let frame = process.process.selected_frame(thread).unwrap_or(0);
        let pc = process
            .process
            .frames(thread)
            .into_iter()
            .find(|info| info.index == frame)?
            .pc;

        Some(FrameKey { thread, frame, pc })
    }

    /// Variables in scope of the selected frame
    ///
    /// Fetched from the engine once per stop and frame.
    pub fn locals(&mut self) -> &[Variable] {
        let Some(key) = self.stopped_frame() else {
            return &[];
        };
        let Some(process) = self.target.as_ref().and_then(|target| target.process.as_ref()) else {
            return &[];
        };

        self.locals_cache
            .get_or_fetch(key, || process.process.variables(key.thread, key.frame))
    }

    /// Watch expressions
    pub fn watches(&self) -> &[String] {
        &self.watches
    }

    /// Add a watch expression
    pub fn add_watch(&mut self, expression: impl Into<String>) {
        let expression = expression.into();
        if expression.trim().is_empty() {
            return;
        }
        self.watches.push(expression);
    }

    /// Remove the watch expression at `index`
    pub fn remove_watch(&mut self, index: usize) -> Option<String> {
        (index < self.watches.len()).then(|| self.watches.remove(index))
    }

    /// Values of all watch expressions in the selected frame
    pub fn watch_values(&mut self) -> Vec<(String, WatchValue)> {
        let key = self.stopped_frame();
        let process = self.target.as_ref().and_then(|target| target.process.as_ref());

        let mut values = Vec::with_capacity(self.watches.len());
        for expression in &self.watches {
            let value = match (key, process) {
                (Some(key), Some(process)) => self
                    .watch_cache
                    .entry((key, expression.clone()))
                    .or_insert_with(|| {
                        match process.process.evaluate(key.thread, key.frame, expression) {
                            Ok(value) => WatchValue::Value(value),
                            Err(e) => WatchValue::Error(e.to_string()),
                        }
                    })
                    .clone(),
                _ => WatchValue::Unavailable,
            };
            values.push((expression.clone(), value));
        }
        values
    }

    /// The source view, if a file is shown
    pub fn source_view(&self) -> Option<&SourceViewState> {
        self.source_view.as_ref()
    }

    /// Text of the shown file, read on first access
    pub fn source_text(&mut self) -> Option<&str> {
        let reader = self.source_reader.as_ref();
        self.source_view.as_mut().map(|view| view.text(reader))
    }

    /// Consume the source view's one-shot scroll request
    pub fn take_scroll_to_line(&mut self) -> Option<u32> {
        self.source_view.as_mut().and_then(SourceViewState::take_scroll_to_line)
    }

    /// Read the shown file again on next access
    pub fn reload_source(&mut self) {
        if let Some(view) = self.source_view.as_mut() {
            info!("Reloading {}", view.path());
            view.invalidate();
        }
    }

    /// State to persist across restarts
    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            target_settings: self.target_settings.clone(),
            source_path: self.source_view.as_ref().map(|view| view.path().to_string()),
            ..PersistedState::default()
        }
    }

    /// Restore persisted state
    ///
    /// A non-empty executable path queues a [`SessionEvent::LoadTarget`].
    pub fn apply_persisted_state(&mut self, state: PersistedState) {
        self.target_settings = state.target_settings;

        if let Some(path) = state.source_path {
            self.source_view = Some(SourceViewState::new(path, None));
        }

        if !self.target_settings.exe_path.trim().is_empty() {
            self.push_event(SessionEvent::LoadTarget);
        }
    }

    /// Restore persisted state from the file at `path`
    pub fn load_state(&mut self, path: &Path) -> Result<()> {
        let state = PersistedState::load(path)?;
        info!("Loaded session state from {}", path.display());
        self.apply_persisted_state(state);
        Ok(())
    }

    /// Persist state to the file at `path`
    pub fn store_state(&self, path: &Path) -> Result<()> {
        self.persisted_state().store(path)?;
        debug!("Stored session state to {}", path.display());
        Ok(())
    }
}

/// Select the thread that stopped at a breakpoint or after a step and
/// return its current source location
fn select_stopped_thread(process: &mut dyn EngineProcess) -> Option<FileLocation> {
    let thread = process
        .threads()
        .into_iter()
        .find(|thread| thread.stop_reason.is_user_stop())?;

    if let Err(e) = process.select_thread(thread.id) {
        error!("Failed to select thread {}: {}", thread.id, e);
        return None;
    }

    info!("Thread {} stopped: {}", thread.id, thread.stop_reason.description());

    let frame = process.selected_frame(thread.id).unwrap_or(0);
    frame_location(process, thread.id, frame)
}

/// Source location of frame `index` of `thread`
fn frame_location(process: &dyn EngineProcess, thread: ThreadId, index: usize) -> Option<FileLocation> {
    process
        .frames(thread)
        .into_iter()
        .find(|frame| frame.index == index)
        .and_then(|frame| frame.location)
}
