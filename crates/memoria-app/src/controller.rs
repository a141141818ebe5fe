// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::OffsetDateTime;

use crate::{TableProjection, TaskId, TaskStore};

/// Literal text the delete overlay must contain before a delete is applied.
pub const DELETE_CONFIRMATION: &str = "y";

const PAGE_JUMP_ROWS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Browsing,
    Adding,
    Editing,
    ConfirmingDelete,
}

impl ViewMode {
    pub const fn is_overlay(self) -> bool {
        !matches!(self, Self::Browsing)
    }
}

/// Decoded keystroke, free of mode semantics. The controller interprets the
/// same input differently per mode: `Char('a')` opens the add overlay while
/// browsing and types an `a` while an overlay is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
    Enter,
    Esc,
    Backspace,
    DeleteChar,
    Left,
    Right,
    Char(char),
}

/// A store mutation that has already been applied in memory and now needs
/// write-through. `Added` has no durable id yet; the repository assigns one
/// and the controller adopts it via [`ViewController::adopt_identity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskMutation {
    Added {
        description: String,
        created_at: OffsetDateTime,
    },
    Toggled {
        id: TaskId,
        completed: bool,
        completed_at: Option<OffsetDateTime>,
    },
    Edited {
        id: TaskId,
        description: String,
    },
    Deleted {
        id: TaskId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Mutated(TaskMutation),
    FilterChanged(bool),
    CursorMoved(usize),
    ModeChanged(ViewMode),
}

/// Free-text entry buffer for the overlays. The cursor counts characters, not
/// bytes, so arrow keys behave on multibyte input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputBuffer {
    value: String,
    cursor: usize,
}

impl InputBuffer {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Replaces the contents and places the cursor at the end, used when an
    /// overlay opens pre-filled (edit).
    pub fn seed(&mut self, value: &str) {
        self.value = value.to_owned();
        self.cursor = self.value.chars().count();
    }

    pub fn insert(&mut self, ch: char) {
        let offset = self.byte_offset(self.cursor);
        self.value.insert(offset, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let offset = self.byte_offset(self.cursor - 1);
        self.value.remove(offset);
        self.cursor -= 1;
    }

    pub fn delete(&mut self) {
        if self.cursor >= self.value.chars().count() {
            return;
        }
        let offset = self.byte_offset(self.cursor);
        self.value.remove(offset);
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.value.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.value
            .char_indices()
            .nth(chars)
            .map(|(offset, _)| offset)
            .unwrap_or(self.value.len())
    }
}

/// The todo pane's input state machine. Owns the store, the current
/// projection, the overlay mode and buffer, and the selected display row.
/// State is mutated only through [`ViewController::dispatch`], one input event
/// per call, so every transition is testable in isolation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewController {
    store: TaskStore,
    projection: TableProjection,
    mode: ViewMode,
    hide_completed: bool,
    buffer: InputBuffer,
    cursor: usize,
}

impl ViewController {
    pub fn new(store: TaskStore, hide_completed: bool) -> Self {
        let projection = TableProjection::build(&store, hide_completed);
        Self {
            store,
            projection,
            mode: ViewMode::Browsing,
            hide_completed,
            buffer: InputBuffer::default(),
            cursor: 0,
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn hide_completed(&self) -> bool {
        self.hide_completed
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn buffer(&self) -> &InputBuffer {
        &self.buffer
    }

    pub fn projection(&self) -> &TableProjection {
        &self.projection
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn selected_row(&self) -> Option<&crate::TaskRow> {
        self.projection.row(self.cursor)
    }

    pub fn dispatch(&mut self, input: Input, now: OffsetDateTime) -> Vec<ViewEvent> {
        match self.mode {
            ViewMode::Browsing => self.dispatch_browsing(input, now),
            _ => self.dispatch_overlay(input, now),
        }
    }

    /// Called after the repository persisted an `Added` mutation; replaces the
    /// provisional id on the freshly added task (always at canonical index 0).
    pub fn adopt_identity(&mut self, id: TaskId) {
        if self.store.bind_identity(0, id).is_ok() {
            self.rebuild();
        }
    }

    fn dispatch_browsing(&mut self, input: Input, now: OffsetDateTime) -> Vec<ViewEvent> {
        match input {
            Input::Char(' ') => self.toggle_selected(now),
            Input::Char('a') => self.open_overlay(ViewMode::Adding),
            Input::Char('d') => self.open_overlay(ViewMode::ConfirmingDelete),
            Input::Char('e') => self.open_edit_overlay(),
            Input::Char('h') => self.toggle_hide_completed(),
            Input::Up | Input::Char('k') => self.move_cursor(-1),
            Input::Down | Input::Char('j') => self.move_cursor(1),
            Input::PageUp => self.move_cursor(-(PAGE_JUMP_ROWS as isize)),
            Input::PageDown => self.move_cursor(PAGE_JUMP_ROWS as isize),
            Input::Home | Input::Char('g') => self.set_cursor(0),
            Input::End | Input::Char('G') => {
                self.set_cursor(self.projection.row_count().saturating_sub(1))
            }
            _ => Vec::new(),
        }
    }

    fn dispatch_overlay(&mut self, input: Input, now: OffsetDateTime) -> Vec<ViewEvent> {
        match input {
            Input::Esc => {
                self.buffer.clear();
                self.mode = ViewMode::Browsing;
                vec![ViewEvent::ModeChanged(self.mode)]
            }
            Input::Enter => self.confirm(now),
            Input::Backspace => {
                self.buffer.backspace();
                Vec::new()
            }
            Input::DeleteChar => {
                self.buffer.delete();
                Vec::new()
            }
            Input::Left => {
                self.buffer.move_left();
                Vec::new()
            }
            Input::Right => {
                self.buffer.move_right();
                Vec::new()
            }
            Input::Home => {
                self.buffer.move_home();
                Vec::new()
            }
            Input::End => {
                self.buffer.move_end();
                Vec::new()
            }
            Input::Char(ch) => {
                self.buffer.insert(ch);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn confirm(&mut self, now: OffsetDateTime) -> Vec<ViewEvent> {
        let mut events = Vec::new();
        match self.mode {
            ViewMode::Adding => {
                let description = self.buffer.value().to_owned();
                self.store.add(&description, now);
                events.push(ViewEvent::Mutated(TaskMutation::Added {
                    description,
                    created_at: now,
                }));
                self.rebuild();
                events.extend(self.set_cursor(0));
            }
            ViewMode::Editing => {
                if let Some(row) = self.selected_row().cloned() {
                    let description = self.buffer.value().to_owned();
                    // A stale index skips the mutation silently; the overlay
                    // still closes.
                    if self.store.edit(row.index, &description).is_ok() {
                        events.push(ViewEvent::Mutated(TaskMutation::Edited {
                            id: row.id,
                            description,
                        }));
                    }
                }
                self.rebuild();
                // Cursor resets to the top after an edit, matching the
                // long-standing behavior of the table.
                events.extend(self.set_cursor(0));
            }
            ViewMode::ConfirmingDelete => {
                if self.buffer.value() == DELETE_CONFIRMATION {
                    if let Some(row) = self.selected_row().cloned() {
                        let previous = self.cursor;
                        if self.store.delete(row.index).is_ok() {
                            events.push(ViewEvent::Mutated(TaskMutation::Deleted { id: row.id }));
                            self.rebuild();
                            let clamped =
                                previous.min(self.projection.row_count().saturating_sub(1));
                            events.extend(self.set_cursor(clamped));
                        }
                    }
                }
            }
            ViewMode::Browsing => {}
        }

        self.buffer.clear();
        self.mode = ViewMode::Browsing;
        events.push(ViewEvent::ModeChanged(self.mode));
        events
    }

    fn toggle_selected(&mut self, now: OffsetDateTime) -> Vec<ViewEvent> {
        let Some(row) = self.selected_row().cloned() else {
            return Vec::new();
        };
        if self.store.toggle(row.index, now).is_err() {
            return Vec::new();
        }

        let mut events = Vec::new();
        if let Some(task) = self.store.get(row.index) {
            events.push(ViewEvent::Mutated(TaskMutation::Toggled {
                id: task.id,
                completed: task.completed,
                completed_at: task.completed_at,
            }));
        }
        self.rebuild();
        events.extend(self.set_cursor(self.projection.position_of_key(row.index)));
        events
    }

    fn open_overlay(&mut self, mode: ViewMode) -> Vec<ViewEvent> {
        self.buffer.clear();
        self.mode = mode;
        vec![ViewEvent::ModeChanged(mode)]
    }

    fn open_edit_overlay(&mut self) -> Vec<ViewEvent> {
        let seed = self
            .selected_row()
            .and_then(|row| self.store.get(row.index))
            .map(|task| task.description.clone());
        match seed {
            Some(description) => self.buffer.seed(&description),
            None => self.buffer.clear(),
        }
        self.mode = ViewMode::Editing;
        vec![ViewEvent::ModeChanged(self.mode)]
    }

    fn toggle_hide_completed(&mut self) -> Vec<ViewEvent> {
        self.hide_completed = !self.hide_completed;
        self.rebuild();
        let mut events = vec![ViewEvent::FilterChanged(self.hide_completed)];
        events.extend(self.set_cursor(0));
        events
    }

    fn move_cursor(&mut self, delta: isize) -> Vec<ViewEvent> {
        let last = self.projection.row_count().saturating_sub(1);
        let target = self
            .cursor
            .saturating_add_signed(delta)
            .min(last);
        self.set_cursor(target)
    }

    fn set_cursor(&mut self, target: usize) -> Vec<ViewEvent> {
        let clamped = target.min(self.projection.row_count().saturating_sub(1));
        if clamped == self.cursor {
            return Vec::new();
        }
        self.cursor = clamped;
        vec![ViewEvent::CursorMoved(clamped)]
    }

    fn rebuild(&mut self) {
        self.projection = TableProjection::build(&self.store, self.hide_completed);
    }
}
