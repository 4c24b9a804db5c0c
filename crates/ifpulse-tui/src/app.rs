//! Application event loop and key handling.
//!
//! The app watches the poller's snapshot store and re-pulls the grouped
//! view whenever the version counter moves; terminal input and a slow
//! redraw tick interleave in the same select loop. Nothing here blocks
//! the scheduler — snapshots are immutable copies.

use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use tracing::debug;

use ifpulse_core::{GroupSnapshot, InterfaceSnapshot, Poller};

use crate::screens::dashboard;
use crate::tui::Tui;

/// Fallback redraw cadence, for clock and spinner-ish updates.
const REDRAW_INTERVAL: Duration = Duration::from_millis(250);

pub struct App {
    pub(crate) poller: Poller,
    pub(crate) groups: Vec<GroupSnapshot>,
    /// Flat selection index over interface rows, group headers excluded.
    pub(crate) selected: usize,
    should_quit: bool,
}

impl App {
    pub fn new(poller: Poller) -> Self {
        let groups = poller.snapshot();
        Self {
            poller,
            groups,
            selected: 0,
            should_quit: false,
        }
    }

    pub async fn run(&mut self, terminal: &mut Tui) -> Result<()> {
        let mut store_rx = self.poller.subscribe();
        let mut events = EventStream::new();
        let mut redraw = tokio::time::interval(REDRAW_INTERVAL);

        loop {
            terminal.draw(|frame| dashboard::render(frame, self))?;

            tokio::select! {
                maybe_event = events.next() => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            self.on_key(key);
                        }
                        Some(Ok(_)) => {}
                        // Terminal input stream ended: nothing left to do.
                        Some(Err(_)) | None => break,
                    }
                }
                changed = store_rx.changed() => {
                    if changed.is_ok() {
                        store_rx.borrow_and_update();
                        self.groups = self.poller.snapshot();
                        self.clamp_selection();
                    }
                }
                _ = redraw.tick() => {}
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('r') => {
                debug!("manual refresh requested");
                if self.poller.poll_now().is_err() {
                    self.should_quit = true;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = (self.selected + 1).min(self.interface_count().saturating_sub(1));
            }
            KeyCode::Tab => self.select_next_group(),
            _ => {}
        }
    }

    pub(crate) fn interface_count(&self) -> usize {
        self.groups.iter().map(|g| g.interfaces.len()).sum()
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.interface_count().saturating_sub(1));
    }

    /// Jump to the first interface of the group after the selection.
    fn select_next_group(&mut self) {
        let total = self.interface_count();
        if total == 0 {
            return;
        }
        let mut start = 0;
        let mut boundaries = Vec::with_capacity(self.groups.len());
        for group in &self.groups {
            boundaries.push(start);
            start += group.interfaces.len();
        }
        self.selected = boundaries
            .iter()
            .copied()
            .find(|b| *b > self.selected)
            .unwrap_or(0);
    }

    /// The currently selected interface, if any exist.
    pub(crate) fn selected_interface(&self) -> Option<&Arc<InterfaceSnapshot>> {
        let mut remaining = self.selected;
        for group in &self.groups {
            if remaining < group.interfaces.len() {
                return group.interfaces.get(remaining);
            }
            remaining -= group.interfaces.len();
        }
        None
    }
}
