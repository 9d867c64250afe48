//! In-process fake debugging engine
//!
//! Targets and processes share their state with the test through
//! `Arc<Mutex<..>>`, so a test can script notifications, output and thread
//! state and then inspect which engine calls the session made.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use lodeb::debugger::engine::{
    BreakpointId, DebugEngine, EngineError, EngineProcess, EngineResult, EngineSymbol, EngineTarget, FrameInfo,
    LaunchedProcess, ProcessEvent, ProcessListener, StopReason, ThreadId, ThreadInfo,
};
use lodeb::debugger::session::{IndexStatus, Session};
use lodeb::debugger::variables::Variable;
use lodeb::FileLocation;

/// Scriptable state of the (single) fake process of a target
#[derive(Debug, Default)]
pub struct ProcessScript {
    pub stdout: VecDeque<u8>,
    pub stderr: VecDeque<u8>,
    pub events: VecDeque<ProcessEvent>,
    pub threads: Vec<ThreadInfo>,
    pub frames: HashMap<ThreadId, Vec<FrameInfo>>,
    pub selected_thread: Option<ThreadId>,
    pub selected_frames: HashMap<ThreadId, usize>,
    pub variables: Vec<Variable>,
    pub watch_values: HashMap<String, String>,
    /// Engine calls in order, e.g. `"resume"`, `"step_over 0x1"`
    pub calls: Vec<String>,
    pub variable_fetches: usize,
    pub evaluations: usize,
    pub launches: usize,
    pub fail_launch: bool,
    pub fail_control: bool,
}

impl ProcessScript {
    /// Put the process into a stop at `location` on thread `id`
    pub fn stop_at(&mut self, id: ThreadId, reason: StopReason, location: FileLocation) {
        self.threads = vec![
            ThreadInfo {
                id: ThreadId(0xdead),
                name: Some("idle".to_string()),
                stop_reason: StopReason::None,
            },
            ThreadInfo {
                id,
                name: Some("main".to_string()),
                stop_reason: reason,
            },
        ];
        self.frames.insert(
            id,
            vec![
                FrameInfo {
                    index: 0,
                    pc: 0x1000,
                    function: Some("inner".to_string()),
                    location: Some(location),
                },
                FrameInfo {
                    index: 1,
                    pc: 0x2000,
                    function: Some("outer".to_string()),
                    location: Some(FileLocation::new("/src/outer.c", 40)),
                },
                FrameInfo {
                    index: 2,
                    pc: 0x3000,
                    function: None,
                    location: None,
                },
            ],
        );
        self.selected_frames.insert(id, 0);
        self.events.push_back(ProcessEvent::Stopped);
    }
}

pub type Script = Arc<Mutex<ProcessScript>>;

pub fn lock(script: &Script) -> MutexGuard<'_, ProcessScript> {
    script.lock().unwrap()
}

/// Fake target built from a list of symbols
pub struct FakeTarget {
    exe: String,
    modules: Vec<Vec<EngineSymbol>>,
    lines: HashMap<u64, FileLocation>,
    breakpoints: Mutex<(u32, HashSet<BreakpointId>)>,
    fail_breakpoints: bool,
    gate: Option<Mutex<Receiver<()>>>,
    pub script: Script,
}

impl FakeTarget {
    /// Target with one module whose code symbols resolve to `path:line`
    pub fn new(exe: &str, symbols: &[(&str, &str, u32)]) -> Self {
        let mut modules = vec![Vec::new()];
        let mut lines = HashMap::new();

        for (i, (name, path, line)) in symbols.iter().enumerate() {
            let address = 0x1000 + i as u64 * 0x10;
            modules[0].push(EngineSymbol::code(*name, address));
            lines.insert(address, FileLocation::new(*path, *line));
        }

        Self {
            exe: exe.to_string(),
            modules,
            lines,
            breakpoints: Mutex::new((1, HashSet::new())),
            fail_breakpoints: false,
            gate: None,
            script: Script::default(),
        }
    }

    /// Make symbol enumeration block until the returned sender fires (or drops)
    pub fn gated(mut self) -> (Self, Sender<()>) {
        let (tx, rx) = mpsc::channel();
        self.gate = Some(Mutex::new(rx));
        (self, tx)
    }

    pub fn failing_breakpoints(mut self) -> Self {
        self.fail_breakpoints = true;
        self
    }

    pub fn breakpoint_count(&self) -> usize {
        self.breakpoints.lock().unwrap().1.len()
    }
}

impl EngineTarget for FakeTarget {
    fn executable(&self) -> String {
        self.exe.clone()
    }

    fn module_count(&self) -> usize {
        if let Some(gate) = &self.gate {
            let _ = gate.lock().unwrap().recv();
        }
        self.modules.len()
    }

    fn module_symbols(&self, module: usize) -> Vec<EngineSymbol> {
        self.modules.get(module).cloned().unwrap_or_default()
    }

    fn address_location(&self, address: u64) -> Option<FileLocation> {
        self.lines.get(&address).cloned()
    }

    fn create_breakpoint(&self, _location: &FileLocation) -> EngineResult<BreakpointId> {
        if self.fail_breakpoints {
            return Err(EngineError::Breakpoint("no code at location".to_string()));
        }

        let mut breakpoints = self.breakpoints.lock().unwrap();
        let id = BreakpointId(breakpoints.0);
        breakpoints.0 += 1;
        breakpoints.1.insert(id);
        Ok(id)
    }

    fn delete_breakpoint(&self, id: BreakpointId) -> EngineResult<()> {
        if self.breakpoints.lock().unwrap().1.remove(&id) {
            Ok(())
        } else {
            Err(EngineError::Breakpoint(format!("unknown breakpoint {}", id)))
        }
    }

    fn breakpoint_location_count(&self, _id: BreakpointId) -> usize {
        1
    }

    fn launch(&self, _working_dir: &str) -> EngineResult<LaunchedProcess> {
        let mut script = lock(&self.script);
        if script.fail_launch {
            return Err(EngineError::LaunchFailed("permission denied".to_string()));
        }
        script.launches += 1;

        Ok(LaunchedProcess {
            process: Box::new(FakeProcess {
                script: Arc::clone(&self.script),
            }),
            listener: Box::new(FakeListener {
                script: Arc::clone(&self.script),
            }),
        })
    }
}

struct FakeProcess {
    script: Script,
}

fn drain(queue: &mut VecDeque<u8>, buf: &mut [u8]) -> usize {
    let n = queue.len().min(buf.len());
    for (slot, byte) in buf.iter_mut().zip(queue.drain(..n)) {
        *slot = byte;
    }
    n
}

impl FakeProcess {
    fn control(&self, call: String) -> EngineResult<()> {
        let mut script = lock(&self.script);
        if script.fail_control {
            return Err(EngineError::ProcessControl(format!("{} refused", call)));
        }
        script.calls.push(call);
        Ok(())
    }
}

impl EngineProcess for FakeProcess {
    fn pid(&self) -> Option<u32> {
        Some(4242)
    }

    fn read_stdout(&mut self, buf: &mut [u8]) -> usize {
        drain(&mut lock(&self.script).stdout, buf)
    }

    fn read_stderr(&mut self, buf: &mut [u8]) -> usize {
        drain(&mut lock(&self.script).stderr, buf)
    }

    fn kill(&mut self) -> EngineResult<()> {
        self.control("kill".to_string())
    }

    fn resume(&mut self) -> EngineResult<()> {
        self.control("resume".to_string())
    }

    fn step_into(&mut self, thread: ThreadId) -> EngineResult<()> {
        self.control(format!("step_into {}", thread))
    }

    fn step_over(&mut self, thread: ThreadId) -> EngineResult<()> {
        self.control(format!("step_over {}", thread))
    }

    fn threads(&self) -> Vec<ThreadInfo> {
        lock(&self.script).threads.clone()
    }

    fn selected_thread(&self) -> Option<ThreadId> {
        lock(&self.script).selected_thread
    }

    fn select_thread(&mut self, thread: ThreadId) -> EngineResult<()> {
        let mut script = lock(&self.script);
        if !script.threads.iter().any(|t| t.id == thread) {
            return Err(EngineError::NoSuchThread(thread));
        }
        script.selected_thread = Some(thread);
        Ok(())
    }

    fn frames(&self, thread: ThreadId) -> Vec<FrameInfo> {
        lock(&self.script).frames.get(&thread).cloned().unwrap_or_default()
    }

    fn selected_frame(&self, thread: ThreadId) -> Option<usize> {
        lock(&self.script).selected_frames.get(&thread).copied()
    }

    fn select_frame(&mut self, thread: ThreadId, index: usize) -> EngineResult<()> {
        let mut script = lock(&self.script);
        let count = script.frames.get(&thread).map_or(0, Vec::len);
        if index >= count {
            return Err(EngineError::NoSuchFrame { thread, index });
        }
        script.selected_frames.insert(thread, index);
        Ok(())
    }

    fn variables(&self, _thread: ThreadId, _frame: usize) -> Vec<Variable> {
        let mut script = lock(&self.script);
        script.variable_fetches += 1;
        script.variables.clone()
    }

    fn evaluate(&self, _thread: ThreadId, _frame: usize, expression: &str) -> EngineResult<String> {
        let mut script = lock(&self.script);
        script.evaluations += 1;
        script
            .watch_values
            .get(expression)
            .cloned()
            .ok_or_else(|| EngineError::Evaluation(format!("use of undeclared identifier '{}'", expression)))
    }
}

struct FakeListener {
    script: Script,
}

impl ProcessListener for FakeListener {
    fn poll_event(&mut self) -> Option<ProcessEvent> {
        lock(&self.script).events.pop_front()
    }
}

/// Fake engine serving a fixed set of targets by executable path
#[derive(Default)]
pub struct FakeEngine {
    targets: HashMap<String, Arc<FakeTarget>>,
    pub created: Vec<String>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, target: FakeTarget) -> Self {
        self.targets.insert(target.exe.clone(), Arc::new(target));
        self
    }

    pub fn target(&self, exe: &str) -> Arc<FakeTarget> {
        Arc::clone(&self.targets[exe])
    }
}

impl DebugEngine for FakeEngine {
    fn create_target(&mut self, exe_path: &str) -> EngineResult<Arc<dyn EngineTarget>> {
        self.created.push(exe_path.to_string());

        match self.targets.get(exe_path) {
            Some(target) => Ok(Arc::clone(target) as Arc<dyn EngineTarget>),
            None => Err(EngineError::InvalidTarget {
                path: exe_path.to_string(),
                reason: "no such file".to_string(),
            }),
        }
    }
}

/// Symbols of the sample program used throughout the tests
pub const SAMPLE_SYMBOLS: &[(&str, &str, u32)] = &[
    ("main", "/src/main.c", 3),
    ("helper", "/src/util.c", 10),
    ("mainLoop", "/src/main.c", 20),
];

pub const SAMPLE_EXE: &str = "/build/sample";

/// Session over the sample target, with the target loaded and indexed
pub fn loaded_session() -> (Session<FakeEngine>, Arc<FakeTarget>) {
    let engine = FakeEngine::new().with_target(FakeTarget::new(SAMPLE_EXE, SAMPLE_SYMBOLS));
    let target = engine.target(SAMPLE_EXE);

    let mut session = Session::new(engine);
    session.target_settings_mut().exe_path = SAMPLE_EXE.to_string();
    session.push_event(lodeb::SessionEvent::LoadTarget);
    session.tick();
    wait_for_index(&mut session);

    (session, target)
}

/// Session over the sample target with a launched process
pub fn running_session() -> (Session<FakeEngine>, Arc<FakeTarget>) {
    let (mut session, target) = loaded_session();
    session.push_event(lodeb::SessionEvent::StartProcess);
    session.tick();
    (session, target)
}

/// Tick until the current target's index is ready
pub fn wait_for_index<E: DebugEngine>(session: &mut Session<E>) {
    for _ in 0..500 {
        if matches!(session.index_status(), IndexStatus::Ready(_)) {
            return;
        }
        thread::sleep(Duration::from_millis(5));
        session.tick();
    }
    panic!("symbol index was not built in time");
}
