// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use memoria_app::{
    COMPLETED_PLACEHOLDER, Input, TaskRepository, ViewController, ViewEvent, ViewMode,
    apply_mutation,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Tabs};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;

const INPUT_PROMPT: &str = "> ";
const INPUT_PLACEHOLDER: &str = "task...";
const DELETE_PROMPT: &str = "Are you sure you want to delete this task? (y/N) ";
const DONE_MARK: &str = "✓";
const FILTER_MARK_ACTIVE: &str = "▼";
const NOTE_SCROLL_STEP: u16 = 1;
const NOTE_PAGE_STEP: u16 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneKind {
    Todos,
    Notes,
}

impl PaneKind {
    pub const ALL: [Self; 2] = [Self::Todos, Self::Notes];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Todos => "TODO",
            Self::Notes => "Notes",
        }
    }

    const fn other(self) -> Self {
        match self {
            Self::Todos => Self::Notes,
            Self::Notes => Self::Todos,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ViewData {
    pane: PaneKind,
    note_text: String,
    note_scroll: u16,
    status: Option<String>,
    status_token: u64,
}

impl ViewData {
    fn new(note_text: String) -> Self {
        Self {
            pane: PaneKind::Todos,
            note_text,
            note_scroll: 0,
            status: None,
            status_token: 0,
        }
    }
}

pub fn run_app<R: TaskRepository>(
    controller: &mut ViewController,
    repository: &mut R,
    note_text: String,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(note_text);
    let (internal_tx, internal_rx) = mpsc::channel();

    let mut result = Ok(());
    loop {
        process_internal_events(&mut view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, controller, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(controller, repository, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(view_data: &mut ViewData, rx: &Receiver<InternalEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                view_data.status = None;
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    view_data.status = Some(message.into());
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<R: TaskRepository>(
    controller: &mut ViewController,
    repository: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if should_quit(controller.mode(), view_data.pane, &key) {
        return true;
    }

    if key.code == KeyCode::Tab && controller.mode() == ViewMode::Browsing {
        view_data.pane = view_data.pane.other();
        return false;
    }

    match view_data.pane {
        PaneKind::Notes => handle_notes_key(view_data, &key),
        PaneKind::Todos => {
            if let Some(input) = map_key(&key) {
                let events = controller.dispatch(input, OffsetDateTime::now_utc());
                persist_events(controller, repository, view_data, internal_tx, &events);
            }
        }
    }
    false
}

/// `q` exits only when no overlay is capturing text; ctrl+c always exits.
fn should_quit(mode: ViewMode, pane: PaneKind, key: &KeyEvent) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }
    key.code == KeyCode::Char('q')
        && key.modifiers.is_empty()
        && (pane == PaneKind::Notes || mode == ViewMode::Browsing)
}

fn handle_notes_key(view_data: &mut ViewData, key: &KeyEvent) {
    let max = max_note_scroll(&view_data.note_text);
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            view_data.note_scroll = view_data.note_scroll.saturating_sub(NOTE_SCROLL_STEP);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            view_data.note_scroll = (view_data.note_scroll + NOTE_SCROLL_STEP).min(max);
        }
        KeyCode::PageUp => {
            view_data.note_scroll = view_data.note_scroll.saturating_sub(NOTE_PAGE_STEP);
        }
        KeyCode::PageDown => {
            view_data.note_scroll = (view_data.note_scroll + NOTE_PAGE_STEP).min(max);
        }
        KeyCode::Home | KeyCode::Char('g') => view_data.note_scroll = 0,
        KeyCode::End | KeyCode::Char('G') => view_data.note_scroll = max,
        _ => {}
    }
}

fn max_note_scroll(note_text: &str) -> u16 {
    let lines = note_text.lines().count();
    u16::try_from(lines.saturating_sub(1)).unwrap_or(u16::MAX)
}

fn map_key(key: &KeyEvent) -> Option<Input> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return None;
    }
    match key.code {
        KeyCode::Up => Some(Input::Up),
        KeyCode::Down => Some(Input::Down),
        KeyCode::PageUp => Some(Input::PageUp),
        KeyCode::PageDown => Some(Input::PageDown),
        KeyCode::Home => Some(Input::Home),
        KeyCode::End => Some(Input::End),
        KeyCode::Enter => Some(Input::Enter),
        KeyCode::Esc => Some(Input::Esc),
        KeyCode::Backspace => Some(Input::Backspace),
        KeyCode::Delete => Some(Input::DeleteChar),
        KeyCode::Left => Some(Input::Left),
        KeyCode::Right => Some(Input::Right),
        KeyCode::Char(ch) => Some(Input::Char(ch)),
        _ => None,
    }
}

/// Write-through: every applied store mutation is mirrored into the
/// repository. A failed write keeps the in-memory change and surfaces on the
/// status line instead of rolling back.
fn persist_events<R: TaskRepository>(
    controller: &mut ViewController,
    repository: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    events: &[ViewEvent],
) {
    for event in events {
        match event {
            ViewEvent::Mutated(mutation) => match apply_mutation(repository, mutation) {
                Ok(Some(task)) => controller.adopt_identity(task.id),
                Ok(None) => {}
                Err(error) => {
                    emit_status(view_data, internal_tx, format!("save failed: {error}"));
                }
            },
            ViewEvent::FilterChanged(hidden) => {
                let status = if *hidden {
                    "completed hidden"
                } else {
                    "completed shown"
                };
                emit_status(view_data, internal_tx, status);
            }
            ViewEvent::CursorMoved(_) | ViewEvent::ModeChanged(_) => {}
        }
    }
}

fn render(frame: &mut ratatui::Frame<'_>, controller: &ViewController, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let selected = PaneKind::ALL
        .iter()
        .position(|pane| *pane == view_data.pane)
        .unwrap_or(0);
    let tab_titles = PaneKind::ALL
        .iter()
        .map(|pane| pane_title(*pane, controller))
        .collect::<Vec<String>>();
    let tabs = Tabs::new(tab_titles)
        .block(Block::default().title("memoria").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    match view_data.pane {
        PaneKind::Todos => render_table(frame, layout[1], controller),
        PaneKind::Notes => {
            let notes = Paragraph::new(view_data.note_text.as_str())
                .scroll((view_data.note_scroll, 0))
                .block(Block::default().borders(Borders::ALL).title("note.md"));
            frame.render_widget(notes, layout[1]);
        }
    }

    let footer = view_data
        .status
        .clone()
        .unwrap_or_else(|| footer_hints(controller.mode(), view_data.pane).to_owned());
    let footer_widget = Paragraph::new(footer)
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer_widget, layout[2]);

    if controller.mode().is_overlay() {
        render_input_overlay(frame, controller);
    }
}

fn render_table(frame: &mut ratatui::Frame<'_>, area: Rect, controller: &ViewController) {
    let header_cells = ["#", "Done", "Task", "Created", "Completed"].map(|label| {
        Cell::from(label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    });
    let header = Row::new(header_cells);

    let rows = controller.projection().rows().iter().map(|row| {
        let style = if row.done {
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::CROSSED_OUT)
        } else {
            Style::default()
        };
        Row::new([
            Cell::from(row.index.to_string()),
            Cell::from(if row.done { DONE_MARK } else { "" }),
            Cell::from(row.description.replace('\n', " ")),
            Cell::from(row.created_at.clone()),
            Cell::from(row.completed_at.clone()),
        ])
        .style(style)
    });

    let widths = [
        Constraint::Length(4),
        Constraint::Length(4),
        Constraint::Min(20),
        Constraint::Length(12),
        Constraint::Length(12),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .row_highlight_style(Style::default().bg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL).title("todos"));

    let mut table_state = TableState::default();
    if controller.projection().row_count() > 0 {
        table_state.select(Some(controller.cursor()));
    }
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn render_input_overlay(frame: &mut ratatui::Frame<'_>, controller: &ViewController) {
    let area = centered_rect(60, 20, frame.area());
    frame.render_widget(Clear, area);

    let text = overlay_text(controller);
    let overlay = Paragraph::new(text).block(
        Block::default()
            .title(overlay_title(controller.mode()))
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(overlay, area);

    // Cursor sits inside the prompt line, offset by the prompt prefix.
    let prefix = match controller.mode() {
        ViewMode::ConfirmingDelete => DELETE_PROMPT.chars().count() + INPUT_PROMPT.len(),
        _ => INPUT_PROMPT.len(),
    };
    let x = area
        .x
        .saturating_add(1)
        .saturating_add(u16::try_from(prefix + controller.buffer().cursor()).unwrap_or(u16::MAX));
    let y = area.y.saturating_add(1);
    frame.set_cursor_position(Position::new(x.min(area.right().saturating_sub(1)), y));
}

fn overlay_title(mode: ViewMode) -> &'static str {
    match mode {
        ViewMode::Adding => "add task",
        ViewMode::Editing => "edit task",
        ViewMode::ConfirmingDelete => "delete task",
        ViewMode::Browsing => "",
    }
}

fn overlay_text(controller: &ViewController) -> String {
    let value = controller.buffer().value();
    match controller.mode() {
        ViewMode::ConfirmingDelete => format!("{DELETE_PROMPT}{INPUT_PROMPT}{value}"),
        _ if value.is_empty() => format!("{INPUT_PROMPT}{INPUT_PLACEHOLDER}"),
        _ => format!("{INPUT_PROMPT}{value}"),
    }
}

fn pane_title(pane: PaneKind, controller: &ViewController) -> String {
    if pane == PaneKind::Todos && controller.hide_completed() {
        return format!("{} {FILTER_MARK_ACTIVE}", pane.label());
    }
    pane.label().to_owned()
}

fn footer_hints(mode: ViewMode, pane: PaneKind) -> &'static str {
    match (pane, mode) {
        (PaneKind::Notes, _) => "j/k scroll · g/G top/bottom · tab todos · q quit",
        (PaneKind::Todos, ViewMode::Browsing) => {
            "space toggle · a add · e edit · d delete · h hide done · tab notes · q quit"
        }
        (PaneKind::Todos, ViewMode::ConfirmingDelete) => "enter confirm · esc cancel",
        (PaneKind::Todos, ViewMode::Adding | ViewMode::Editing) => "enter save · esc cancel",
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        DELETE_PROMPT, INPUT_PLACEHOLDER, PaneKind, footer_hints, map_key, max_note_scroll,
        overlay_text, pane_title, should_quit,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use memoria_app::{Input, TaskStore, ViewController, ViewMode};
    use time::macros::datetime;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    #[test]
    fn map_key_decodes_navigation_and_text() {
        assert_eq!(map_key(&key(KeyCode::Up)), Some(Input::Up));
        assert_eq!(map_key(&key(KeyCode::Enter)), Some(Input::Enter));
        assert_eq!(map_key(&key(KeyCode::Char('x'))), Some(Input::Char('x')));
        assert_eq!(map_key(&key(KeyCode::Delete)), Some(Input::DeleteChar));
        assert_eq!(map_key(&ctrl('a')), None);
        assert_eq!(map_key(&key(KeyCode::F(1))), None);
    }

    #[test]
    fn quit_is_gated_while_an_overlay_captures_text() {
        let q = key(KeyCode::Char('q'));
        assert!(should_quit(ViewMode::Browsing, PaneKind::Todos, &q));
        assert!(should_quit(ViewMode::Browsing, PaneKind::Notes, &q));
        assert!(!should_quit(ViewMode::Adding, PaneKind::Todos, &q));
        assert!(!should_quit(ViewMode::ConfirmingDelete, PaneKind::Todos, &q));

        assert!(should_quit(ViewMode::Adding, PaneKind::Todos, &ctrl('c')));
    }

    #[test]
    fn overlay_text_shows_placeholder_prompt_and_confirmation() {
        let mut controller = ViewController::new(TaskStore::new(), false);
        let now = datetime!(2026-03-14 12:00 UTC);

        controller.dispatch(Input::Char('a'), now);
        assert_eq!(overlay_text(&controller), format!("> {INPUT_PLACEHOLDER}"));
        controller.dispatch(Input::Char('B'), now);
        controller.dispatch(Input::Char('u'), now);
        controller.dispatch(Input::Char('y'), now);
        assert_eq!(overlay_text(&controller), "> Buy");
        controller.dispatch(Input::Esc, now);

        controller.dispatch(Input::Char('d'), now);
        assert_eq!(overlay_text(&controller), format!("{DELETE_PROMPT}> "));
    }

    #[test]
    fn todo_pane_title_carries_filter_marker() {
        let hidden = ViewController::new(TaskStore::new(), true);
        let shown = ViewController::new(TaskStore::new(), false);
        assert_eq!(pane_title(PaneKind::Todos, &hidden), "TODO ▼");
        assert_eq!(pane_title(PaneKind::Todos, &shown), "TODO");
        assert_eq!(pane_title(PaneKind::Notes, &hidden), "Notes");
    }

    #[test]
    fn note_scroll_is_bounded_by_line_count() {
        assert_eq!(max_note_scroll(""), 0);
        assert_eq!(max_note_scroll("one line"), 0);
        assert_eq!(max_note_scroll("a\nb\nc"), 2);
    }

    #[test]
    fn footer_hints_follow_mode_and_pane() {
        assert!(footer_hints(ViewMode::Browsing, PaneKind::Todos).contains("space toggle"));
        assert!(footer_hints(ViewMode::Adding, PaneKind::Todos).contains("esc cancel"));
        assert!(footer_hints(ViewMode::Browsing, PaneKind::Notes).contains("scroll"));
    }
}
