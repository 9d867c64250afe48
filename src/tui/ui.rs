#![allow(clippy::uninlined_format_args)]
#![allow(clippy::must_use_candidate)]

use std::collections::HashMap;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::debugger::engine::DebugEngine;
use crate::debugger::session::{IndexStatus, SessionPhase};
use crate::tui::app::{App, InputMode};
use crate::tui::palette;

/// Text shown in the stack and locals panes when there is nothing to inspect
pub fn inspect_placeholder(phase: SessionPhase) -> Option<&'static str> {
    match phase {
        SessionPhase::NoTarget => Some("No target loaded"),
        SessionPhase::TargetLoading => Some("Loading symbols..."),
        SessionPhase::TargetReady => Some("Not running"),
        SessionPhase::ProcessRunning => Some("Running..."),
        SessionPhase::ProcessStopped => None,
    }
}

/// Status line text for the session
pub fn status_text(phase: SessionPhase, index: IndexStatus<'_>) -> String {
    match index {
        IndexStatus::Ready(index) => format!("{} | {} symbols", phase, index.len()),
        IndexStatus::Failed => format!("{} | symbols unavailable", phase),
        IndexStatus::NoTarget | IndexStatus::Loading => phase.to_string(),
    }
}

/// First visible line (zero-based) so that `cursor` (one-based) stays on screen
pub fn scroll_offset(cursor: u32, height: u16, offset: u32) -> u32 {
    let height = u32::from(height.max(1));
    let cursor = cursor.saturating_sub(1);

    if cursor < offset {
        cursor
    } else if cursor >= offset + height {
        cursor + 1 - height
    } else {
        offset
    }
}

/// Breakpoint marker for a line, given the breakpoint's resolved location count
pub fn breakpoint_marker(resolved: Option<usize>) -> char {
    match resolved {
        None => ' ',
        Some(0) => '○',
        Some(_) => '●',
    }
}

/// Gutter for one source line: breakpoint marker, then the line number
pub fn gutter(line: u32, marker: char, width: usize) -> String {
    format!("{}{:>width$} ", marker, line, width = width)
}

/// Main UI drawing function
pub fn draw<E: DebugEngine>(f: &mut Frame, app: &mut App<E>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Settings
            Constraint::Min(8),    // Source and inspection panes
            Constraint::Length(8), // Process output
            Constraint::Length(1), // Help bar
        ])
        .split(f.size());

    draw_settings(f, app, chunks[0]);

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);

    draw_source(f, app, main[0]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(35),
            Constraint::Percentage(25),
        ])
        .split(main[1]);

    draw_call_stack(f, app, side[0]);
    draw_locals(f, app, side[1]);
    draw_watches(f, app, side[2]);
    draw_output(f, app, chunks[2]);
    draw_help_bar(f, app, chunks[3]);

    if app.input_mode == InputMode::Palette {
        let results = palette::search(
            app.palette.input(),
            app.session.index_status(),
            app.config.palette_limit,
        );
        let area = f.size();
        app.palette.render(f, area, &results);
    }
}

fn draw_settings<E: DebugEngine>(f: &mut Frame, app: &App<E>, area: Rect) {
    let settings = app.session.target_settings();

    let (exe, working_dir) = match app.input_mode {
        InputMode::EditExePath => (format!("{}_", app.edit_buffer), settings.working_dir.clone()),
        InputMode::EditWorkingDir => (settings.exe_path.clone(), format!("{}_", app.edit_buffer)),
        _ => (settings.exe_path.clone(), settings.working_dir.clone()),
    };

    let label = Style::default().fg(Color::DarkGray);
    let line = Line::from(vec![
        Span::styled("exe [e] ", label),
        Span::raw(exe),
        Span::styled("   cwd [w] ", label),
        Span::raw(working_dir),
    ]);

    let title = status_text(app.session.phase(), app.session.index_status());
    let paragraph = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(Span::styled(
                format!("lodeb | {}", title),
                Style::default().add_modifier(Modifier::BOLD),
            )),
    );

    f.render_widget(paragraph, area);
}

fn draw_source<E: DebugEngine>(f: &mut Frame, app: &mut App<E>, area: Rect) {
    let block = Block::default().borders(Borders::ALL);

    let Some(view) = app.session.source_view() else {
        let text = Paragraph::new(Span::styled(
            "Ctrl+P then @name to find a symbol",
            Style::default().fg(Color::DarkGray),
        ))
        .block(block.title("Source"));
        f.render_widget(text, area);
        return;
    };

    let path = view.path().to_string();
    let breakpoints: HashMap<u32, usize> = app
        .session
        .breakpoints()
        .map(|registry| {
            registry
                .iter()
                .filter(|(location, _)| location.path() == path)
                .map(|(location, id)| (location.line, app.session.breakpoint_locations(id)))
                .collect()
        })
        .unwrap_or_default();

    let height = area.height.saturating_sub(2);
    app.source_scroll = scroll_offset(app.cursor_line, height, app.source_scroll);
    let first = app.source_scroll;
    let cursor = app.cursor_line;

    let text = app.session.source_text().unwrap_or_default();
    let width = text.lines().count().max(1).to_string().len();
    let lines: Vec<Line> = text
        .lines()
        .enumerate()
        .skip(first as usize)
        .take(usize::from(height))
        .map(|(index, content)| {
            let number = index as u32 + 1;
            let marker = gutter(number, breakpoint_marker(breakpoints.get(&number).copied()), width);
            let style = if number == cursor {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::Red)),
                Span::styled(content.to_string(), style),
            ])
        })
        .collect();

    let failed = app.session.source_view().is_some_and(|view| view.load_failed());
    let title = if failed {
        format!("{} (unreadable, Ctrl+R to retry)", path)
    } else {
        path
    };

    f.render_widget(Paragraph::new(lines).block(block.title(title)), area);
}

fn draw_call_stack<E: DebugEngine>(f: &mut Frame, app: &App<E>, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Call Stack");

    if let Some(text) = inspect_placeholder(app.session.phase()) {
        f.render_widget(Paragraph::new(text).block(block), area);
        return;
    }

    let items: Vec<ListItem> = app
        .session
        .frames()
        .iter()
        .map(|frame| ListItem::new(frame.description()))
        .collect();

    let mut state = ListState::default();
    state.select(app.session.selected_frame());

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    f.render_stateful_widget(list, area, &mut state);
}

fn draw_locals<E: DebugEngine>(f: &mut Frame, app: &mut App<E>, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Locals");

    if let Some(text) = inspect_placeholder(app.session.phase()) {
        f.render_widget(Paragraph::new(text).block(block), area);
        return;
    }

    let items: Vec<ListItem> = app
        .session
        .locals()
        .iter()
        .map(|var| ListItem::new(var.to_string()))
        .collect();

    f.render_widget(List::new(items).block(block), area);
}

fn draw_watches<E: DebugEngine>(f: &mut Frame, app: &mut App<E>, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Watches [a/x]");

    let mut items: Vec<ListItem> = app
        .session
        .watch_values()
        .into_iter()
        .map(|(expression, value)| ListItem::new(format!("{} = {}", expression, value)))
        .collect();

    if app.input_mode == InputMode::AddWatch {
        items.push(ListItem::new(format!("{}_", app.edit_buffer)));
    }

    f.render_widget(List::new(items).block(block), area);
}

fn draw_output<E: DebugEngine>(f: &mut Frame, app: &App<E>, area: Rect) {
    let text = app.session.output().text();
    let height = usize::from(area.height.saturating_sub(2));

    let lines: Vec<&str> = text.lines().collect();
    let visible: Vec<Line> = lines[lines.len().saturating_sub(height)..]
        .iter()
        .map(|line| Line::from(*line))
        .collect();

    let paragraph = Paragraph::new(visible).block(Block::default().borders(Borders::ALL).title("Output"));
    f.render_widget(paragraph, area);
}

fn draw_help_bar<E: DebugEngine>(f: &mut Frame, app: &App<E>, area: Rect) {
    let help = match app.input_mode {
        InputMode::Palette => "[Esc] Close | [Up/Down] Select | [Enter] Go",
        InputMode::EditExePath | InputMode::EditWorkingDir | InputMode::AddWatch => "[Esc] Cancel | [Enter] Apply",
        InputMode::Normal => {
            "[^P] Find | [^L] Load | [F5] Run/Continue | [S-F5] Kill | [F10] Over | [F11] Into | [^B] Breakpoint | [q] Quit"
        }
    };

    f.render_widget(
        Paragraph::new(Span::styled(help, Style::default().fg(Color::DarkGray))),
        area,
    );
}
