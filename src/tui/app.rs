#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use log::{debug, error, info, warn};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::debugger::engine::DebugEngine;
use crate::debugger::event::{DebugStateChange, SessionEvent};
use crate::debugger::location::FileLocation;
use crate::debugger::session::{Session, SessionPhase};
use crate::tui::events::{Event, Events};
use crate::tui::palette::{self, CommandPalette, PaletteAction};
use crate::tui::ui;

/// Default number of symbol results shown in the palette
pub const DEFAULT_PALETTE_LIMIT: usize = 200;

/// Front end settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// How often the session is ticked without input
    pub tick_rate: Duration,
    /// Where session state is loaded from and stored to
    pub state_file: Option<PathBuf>,
    /// Maximum number of palette results
    pub palette_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tick_rate: Duration::from_millis(50),
            state_file: None,
            palette_limit: DEFAULT_PALETTE_LIMIT,
        }
    }
}

/// What keyboard input currently goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Palette,
    EditExePath,
    EditWorkingDir,
    AddWatch,
}

/// Application state
pub struct App<E: DebugEngine> {
    /// The debug session
    pub session: Session<E>,
    pub config: AppConfig,
    /// Is the application running?
    pub running: bool,
    pub input_mode: InputMode,
    pub palette: CommandPalette,
    /// Text being edited in one of the edit modes
    pub edit_buffer: String,
    /// One-based cursor line in the source view
    pub cursor_line: u32,
    /// First source line shown (zero-based)
    pub source_scroll: u32,
}

impl<E: DebugEngine> App<E> {
    pub fn new(session: Session<E>, config: AppConfig) -> Self {
        Self {
            session,
            config,
            running: true,
            input_mode: InputMode::Normal,
            palette: CommandPalette::new(),
            edit_buffer: String::new(),
            cursor_line: 1,
            source_scroll: 0,
        }
    }

    /// Restore persisted state and apply the command line executable
    ///
    /// A missing state file is not an error.
    pub fn startup(&mut self, exe_override: Option<String>) {
        if let Some(path) = self.config.state_file.clone() {
            if path.exists() {
                if let Err(e) = self.session.load_state(&path) {
                    warn!("{:#}", e);
                }
            } else {
                debug!("No state file at {}", path.display());
            }
        }

        if let Some(exe) = exe_override {
            self.session.target_settings_mut().exe_path = exe;
            if !self.session.pending_events().contains(&SessionEvent::LoadTarget) {
                self.session.push_event(SessionEvent::LoadTarget);
            }
        }
    }

    /// Store persisted state, if a state file is configured
    pub fn shutdown(&self) -> Result<()> {
        match &self.config.state_file {
            Some(path) => self.session.store_state(path),
            None => Ok(()),
        }
    }

    /// Advance the session by one tick
    pub fn update(&mut self) {
        self.session.tick();

        if let Some(line) = self.session.take_scroll_to_line() {
            self.cursor_line = line.max(1);
        }
    }

    /// Run the application
    pub fn run(&mut self) -> Result<()> {
        // Terminal initialization
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("Failed to enter the alternate screen")?;

        let backend = CrosstermBackend::new(stdout);
        let result = match Terminal::new(backend) {
            Ok(mut terminal) => {
                let result = self.event_loop(&mut terminal);
                if let Err(e) = terminal.show_cursor() {
                    error!("Failed to show cursor: {}", e);
                }
                result
            }
            Err(e) => Err(e).context("Failed to create terminal"),
        };

        // Terminal cleanup
        disable_raw_mode().context("Failed to disable raw mode")?;
        execute!(io::stdout(), LeaveAlternateScreen).context("Failed to leave the alternate screen")?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        let events = Events::new(self.config.tick_rate);
        info!("Entering main loop");

        while self.running {
            self.update();
            terminal.draw(|f| ui::draw(f, self)).context("Failed to draw")?;

            match events.next() {
                Ok(Event::Input(key)) => self.handle_key(key),
                Ok(Event::Resize | Event::Tick) => {}
                Err(_) => {
                    error!("Terminal event thread stopped");
                    self.running = false;
                }
            }
        }

        Ok(())
    }

    /// Handle a key press
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }

        match self.input_mode {
            InputMode::Palette => self.handle_palette_key(key),
            InputMode::EditExePath | InputMode::EditWorkingDir | InputMode::AddWatch => self.handle_edit_key(key),
            InputMode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);

        if CommandPalette::is_open_chord(&key) {
            self.palette.open();
            self.input_mode = InputMode::Palette;
            return;
        }

        match key.code {
            KeyCode::Char('l') if ctrl => self.session.push_event(SessionEvent::LoadTarget),
            KeyCode::Char('b') if ctrl => self.toggle_breakpoint_at_cursor(),
            KeyCode::Char('r') if ctrl => self.session.reload_source(),
            KeyCode::F(5) if shift => self.change_debug_state(DebugStateChange::Kill),
            KeyCode::F(5) => {
                if self.session.phase() == SessionPhase::ProcessStopped {
                    self.change_debug_state(DebugStateChange::Continue);
                } else {
                    self.session.push_event(SessionEvent::StartProcess);
                }
            }
            KeyCode::F(10) => self.change_debug_state(DebugStateChange::StepOver),
            KeyCode::F(11) => self.change_debug_state(DebugStateChange::StepIn),
            KeyCode::Up if ctrl => self.select_frame_offset(-1),
            KeyCode::Down if ctrl => self.select_frame_offset(1),
            KeyCode::Up => self.cursor_line = self.cursor_line.saturating_sub(1).max(1),
            KeyCode::Down => self.cursor_line = self.cursor_line.saturating_add(1),
            KeyCode::PageUp => self.cursor_line = self.cursor_line.saturating_sub(20).max(1),
            KeyCode::PageDown => self.cursor_line = self.cursor_line.saturating_add(20),
            KeyCode::Char(c) if !ctrl => match c {
                'q' => self.running = false,
                'e' => self.begin_edit(InputMode::EditExePath),
                'w' => self.begin_edit(InputMode::EditWorkingDir),
                'a' => self.begin_edit(InputMode::AddWatch),
                'x' => {
                    let last = self.session.watches().len().checked_sub(1);
                    if let Some(index) = last {
                        self.session.remove_watch(index);
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    fn handle_palette_key(&mut self, key: KeyEvent) {
        match self.palette.handle_key(key) {
            PaletteAction::None => {}
            PaletteAction::Close => self.input_mode = InputMode::Normal,
            PaletteAction::Submit => {
                let results = palette::search(
                    self.palette.input(),
                    self.session.index_status(),
                    self.config.palette_limit,
                );
                let location = self.palette.selected_location(&results);

                if let Some(location) = location {
                    self.session.push_event(SessionEvent::ViewSource(location));
                    self.palette.close();
                    self.input_mode = InputMode::Normal;
                }
            }
        }
    }

    fn begin_edit(&mut self, mode: InputMode) {
        self.edit_buffer = match mode {
            InputMode::EditExePath => self.session.target_settings().exe_path.clone(),
            InputMode::EditWorkingDir => self.session.target_settings().working_dir.clone(),
            _ => String::new(),
        };
        self.input_mode = mode;
    }

    fn handle_edit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.edit_buffer.clear();
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Enter => {
                let text = std::mem::take(&mut self.edit_buffer);
                match self.input_mode {
                    InputMode::EditExePath => self.session.target_settings_mut().exe_path = text,
                    InputMode::EditWorkingDir => self.session.target_settings_mut().working_dir = text,
                    InputMode::AddWatch => self.session.add_watch(text),
                    InputMode::Normal | InputMode::Palette => {}
                }
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Backspace => {
                self.edit_buffer.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => self.edit_buffer.push(c),
            _ => {}
        }
    }

    fn change_debug_state(&mut self, change: DebugStateChange) {
        self.session.push_event(SessionEvent::ChangeDebugState(change));
    }

    fn toggle_breakpoint_at_cursor(&mut self) {
        let Some(view) = self.session.source_view() else {
            debug!("No source file shown, nothing to toggle");
            return;
        };

        let location = FileLocation::new(view.path(), self.cursor_line);
        self.session.push_event(SessionEvent::ToggleBreakpoint(location));
    }

    fn select_frame_offset(&mut self, offset: isize) {
        let frames = self.session.frames().len();
        if frames == 0 {
            return;
        }

        let current = self.session.selected_frame().unwrap_or(0);
        let Some(index) = current.checked_add_signed(offset).filter(|index| *index < frames) else {
            return;
        };

        self.session.push_event(SessionEvent::SetSelectedFrame(index));
    }
}
