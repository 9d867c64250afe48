use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::debugger::command::{parse_command, ParsedCommand};
use crate::debugger::location::FileLocation;
use crate::debugger::session::IndexStatus;
use crate::debugger::symbols::SymbolMatch;

/// What the palette wants the app to do after a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteAction {
    /// Nothing beyond updating the palette itself
    None,
    /// The palette was dismissed
    Close,
    /// The selected result was accepted
    Submit,
}

/// Results shown below the palette input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteResults<'a> {
    /// Symbol search can't run yet
    Placeholder(&'static str),
    /// Matching symbols
    Symbols(Vec<SymbolMatch<'a>>),
    /// File search; nothing to list
    Files,
}

impl PaletteResults<'_> {
    pub fn len(&self) -> usize {
        match self {
            Self::Symbols(matches) => matches.len(),
            Self::Placeholder(_) | Self::Files => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Compute the palette results for `text`
pub fn search<'a>(text: &str, status: IndexStatus<'a>, limit: usize) -> PaletteResults<'a> {
    match parse_command(text) {
        ParsedCommand::LookForFile(_) => PaletteResults::Files,
        ParsedCommand::LookForSymbol(needle) => match status {
            IndexStatus::NoTarget => PaletteResults::Placeholder("No target loaded"),
            IndexStatus::Loading => PaletteResults::Placeholder("Loading symbols..."),
            IndexStatus::Failed => PaletteResults::Placeholder("Symbol index unavailable"),
            IndexStatus::Ready(index) => PaletteResults::Symbols(index.matches(needle, limit)),
        },
    }
}

/// Ctrl+P command palette
#[derive(Debug, Default)]
pub struct CommandPalette {
    open: bool,
    input: String,
    selected: usize,
}

impl CommandPalette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if `key` is the chord that opens the palette
    pub fn is_open_chord(key: &KeyEvent) -> bool {
        key.code == KeyCode::Char('p') && key.modifiers.contains(KeyModifiers::CONTROL)
    }

    pub fn open(&mut self) {
        self.open = true;
        self.input.clear();
        self.selected = 0;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Handle a key while the palette is open
    pub fn handle_key(&mut self, key: KeyEvent) -> PaletteAction {
        match key.code {
            KeyCode::Esc => {
                self.close();
                PaletteAction::Close
            }
            KeyCode::Enter => PaletteAction::Submit,
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                PaletteAction::None
            }
            KeyCode::Down => {
                self.selected += 1;
                PaletteAction::None
            }
            KeyCode::Backspace => {
                self.input.pop();
                self.selected = 0;
                PaletteAction::None
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.input.push(c);
                self.selected = 0;
                PaletteAction::None
            }
            _ => PaletteAction::None,
        }
    }

    /// Location of the selected result, clamping the selection to the list
    pub fn selected_location(&mut self, results: &PaletteResults<'_>) -> Option<FileLocation> {
        let PaletteResults::Symbols(matches) = results else {
            return None;
        };
        if matches.is_empty() {
            return None;
        }

        self.selected = self.selected.min(matches.len() - 1);
        Some(matches[self.selected].location.clone())
    }

    /// Render the palette as a popup over `area`
    pub fn render(&self, f: &mut Frame, area: Rect, results: &PaletteResults<'_>) {
        let popup = popup_area(area);
        f.render_widget(Clear, popup);

        let block = Block::default()
            .borders(Borders::ALL)
            .title("Go to (@symbol)")
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(popup);
        f.render_widget(block, popup);

        if inner.height == 0 {
            return;
        }

        let input_area = Rect { height: 1, ..inner };
        let list_area = Rect {
            y: inner.y + 1,
            height: inner.height - 1,
            ..inner
        };

        let input = Paragraph::new(Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::DarkGray)),
            Span::raw(self.input.as_str()),
        ]));
        f.render_widget(input, input_area);
        f.set_cursor(cursor_column(input_area.x, &self.input), input_area.y);

        match results {
            PaletteResults::Placeholder(text) => {
                let text = Paragraph::new(Span::styled(*text, Style::default().fg(Color::DarkGray)));
                f.render_widget(text, list_area);
            }
            PaletteResults::Files => {}
            PaletteResults::Symbols(matches) => {
                let items: Vec<ListItem> = matches
                    .iter()
                    .map(|m| {
                        ListItem::new(Line::from(vec![
                            Span::raw(m.name),
                            Span::styled(format!("  {}", m.location), Style::default().fg(Color::DarkGray)),
                        ]))
                    })
                    .collect();

                let mut state = ListState::default();
                if !matches.is_empty() {
                    state.select(Some(self.selected.min(matches.len() - 1)));
                }

                let list = List::new(items)
                    .highlight_style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Yellow))
                    .highlight_symbol("> ");
                f.render_stateful_widget(list, list_area, &mut state);
            }
        }
    }
}

/// Centered popup covering most of `area`
fn popup_area(area: Rect) -> Rect {
    let width = area.width.saturating_sub(area.width / 5).max(20).min(area.width);
    let height = area.height.saturating_sub(area.height / 3).max(5).min(area.height);

    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 4,
        width,
        height,
    }
}

/// Terminal column of the input cursor, after the `"> "` prompt starting at `x`
fn cursor_column(x: u16, input: &str) -> u16 {
    let typed = u16::try_from(input.chars().count()).unwrap_or(u16::MAX);
    x.saturating_add(2).saturating_add(typed)
}
