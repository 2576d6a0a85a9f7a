mod actions;
mod render;
mod session;

use std::collections::HashMap;
use std::io;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::TableState;

use crate::store::KeyValueStore;

use super::api::ApiClient;
use super::catalog::{Song, SongCategory};
use super::selection::{SelectedSong, SelectionListManager};

use self::actions::{
    apply_fetch_results, clamp_selection, ensure_category_loaded, refresh_category, status_error,
    status_info, visible_songs,
};
use self::render::draw_tui;
use self::session::TuiSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pane {
    Catalog,
    List,
}

impl Pane {
    pub(crate) fn toggle(self) -> Self {
        match self {
            Self::Catalog => Self::List,
            Self::List => Self::Catalog,
        }
    }
}

pub(crate) struct CatalogFetchResult {
    pub(crate) category: SongCategory,
    pub(crate) result: Result<Vec<Song>, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CatalogState {
    /// A fetch is in flight; `stale` is shown meanwhile when there is one.
    Loading { stale: Option<Vec<Song>> },
    Ready {
        songs: Vec<Song>,
        warning: Option<String>,
    },
}

impl CatalogState {
    pub(crate) fn songs(&self) -> &[Song] {
        match self {
            Self::Loading { stale: Some(songs) } | Self::Ready { songs, .. } => songs,
            Self::Loading { stale: None } => &[],
        }
    }

    pub(crate) fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    pub(crate) fn warning(&self) -> Option<&str> {
        match self {
            Self::Ready {
                warning: Some(warning),
                ..
            } => Some(warning.as_str()),
            _ => None,
        }
    }
}

pub(crate) struct TuiState {
    pub(crate) pane: Pane,
    pub(crate) category: SongCategory,
    pub(crate) catalogs: HashMap<SongCategory, CatalogState>,
    pub(crate) catalog_table: TableState,
    pub(crate) list_table: TableState,
    pub(crate) search: String,
    pub(crate) editing_search: bool,
    pub(crate) confirm_clear: bool,
    pub(crate) status: String,
}

impl TuiState {
    pub(crate) fn new(list_len: usize) -> Self {
        let mut list_table = TableState::default();
        list_table.select((list_len > 0).then_some(0));
        Self {
            pane: Pane::Catalog,
            category: SongCategory::Praise,
            catalogs: HashMap::new(),
            catalog_table: TableState::default(),
            list_table,
            search: String::new(),
            editing_search: false,
            confirm_clear: false,
            status: status_info("Ready."),
        }
    }

    pub(crate) fn current_catalog(&self) -> Option<&CatalogState> {
        self.catalogs.get(&self.category)
    }
}

pub(crate) fn run_tui(store: &dyn KeyValueStore, client: &ApiClient) -> Result<()> {
    let mut session = TuiSession::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
        .context("failed to initialize terminal backend")?;
    terminal.clear()?;

    let mut list = SelectionListManager::load(store);
    let mut state = TuiState::new(list.len());
    let (fetch_tx, fetch_rx) = mpsc::channel::<CatalogFetchResult>();

    loop {
        apply_fetch_results(store, client, &fetch_rx, &mut state);
        ensure_category_loaded(store, client, &mut state, &fetch_tx);
        let catalog_len = visible_songs(&state).len();
        clamp_selection(&mut state.catalog_table, catalog_len);
        clamp_selection(&mut state.list_table, list.len());

        terminal.draw(|frame| draw_tui(frame, &mut state, list.songs()))?;

        if !event::poll(Duration::from_millis(200))? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if state.confirm_clear {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    state.confirm_clear = false;
                    list.clear();
                    state.status = persisted_status(&list, "Worship list cleared.");
                }
                KeyCode::Esc | KeyCode::Char('n') => {
                    state.confirm_clear = false;
                    state.status = status_info("Clear canceled.");
                }
                _ => {}
            }
            continue;
        }

        if state.editing_search {
            match key.code {
                KeyCode::Esc => {
                    state.editing_search = false;
                    state.search.clear();
                }
                KeyCode::Enter => state.editing_search = false,
                KeyCode::Backspace => {
                    state.search.pop();
                }
                KeyCode::Char(ch) => state.search.push(ch),
                _ => {}
            }
            state.catalog_table.select(Some(0));
            continue;
        }

        let shifted = key.modifiers.contains(KeyModifiers::SHIFT);
        match (state.pane, key.code) {
            (_, KeyCode::Char('q')) => break,
            (_, KeyCode::Tab) => state.pane = state.pane.toggle(),
            (_, KeyCode::Char('c')) => {
                if list.is_empty() {
                    state.status = status_info("The worship list is already empty.");
                } else {
                    state.confirm_clear = true;
                    state.status = status_info("Confirm clear: y/Enter to clear, n/Esc to cancel.");
                }
            }
            (Pane::Catalog, KeyCode::Char('/')) => state.editing_search = true,
            (Pane::Catalog, KeyCode::Left) => {
                state.category = state.category.previous();
                state.catalog_table.select(Some(0));
            }
            (Pane::Catalog, KeyCode::Right) => {
                state.category = state.category.next();
                state.catalog_table.select(Some(0));
            }
            (Pane::Catalog, KeyCode::Char('r')) => {
                if refresh_category(client, &mut state, &fetch_tx) {
                    state.status = status_info(&format!("Refreshing {}...", state.category));
                }
            }
            (Pane::Catalog, KeyCode::Up) => move_cursor(&mut state.catalog_table, -1, catalog_len),
            (Pane::Catalog, KeyCode::Down) => move_cursor(&mut state.catalog_table, 1, catalog_len),
            (Pane::Catalog, KeyCode::Enter | KeyCode::Char(' ')) => {
                let selected = state
                    .catalog_table
                    .selected()
                    .and_then(|idx| visible_songs(&state).get(idx).copied())
                    .map(SelectedSong::from);
                let Some(song) = selected else {
                    continue;
                };
                let title = song.title.clone();
                let was_listed = list.contains(&song.song_id);
                list.toggle(song);
                let message = if was_listed {
                    format!("Removed: {title}")
                } else {
                    format!("Added: {title}")
                };
                state.status = persisted_status(&list, &message);
            }
            (Pane::List, KeyCode::Char('K')) => move_listed_song(&mut list, &mut state, -1),
            (Pane::List, KeyCode::Char('J')) => move_listed_song(&mut list, &mut state, 1),
            (Pane::List, KeyCode::Up) if shifted => move_listed_song(&mut list, &mut state, -1),
            (Pane::List, KeyCode::Down) if shifted => move_listed_song(&mut list, &mut state, 1),
            (Pane::List, KeyCode::Up) => move_cursor(&mut state.list_table, -1, list.len()),
            (Pane::List, KeyCode::Down) => move_cursor(&mut state.list_table, 1, list.len()),
            (Pane::List, KeyCode::Char('d') | KeyCode::Delete) => {
                let Some(song) = state
                    .list_table
                    .selected()
                    .and_then(|idx| list.songs().get(idx))
                    .cloned()
                else {
                    state.status = status_error("Remove failed: no song selected.");
                    continue;
                };
                list.remove(&song.song_id);
                state.status = persisted_status(&list, &format!("Removed: {}", song.title));
            }
            _ => {}
        }
    }

    terminal.show_cursor()?;
    session.leave()?;
    Ok(())
}

fn move_cursor(table: &mut TableState, delta: isize, len: usize) {
    if len == 0 {
        table.select(None);
        return;
    }
    let current = table.selected().unwrap_or(0);
    let next = current.saturating_add_signed(delta).min(len - 1);
    table.select(Some(next));
}

fn move_listed_song(list: &mut SelectionListManager<'_>, state: &mut TuiState, delta: isize) {
    let Some(from) = state.list_table.selected() else {
        return;
    };
    let Some(to) = from.checked_add_signed(delta).filter(|to| *to < list.len()) else {
        return;
    };
    list.move_song(from, to);
    state.list_table.select(Some(to));
    state.status = persisted_status(list, &format!("Moved to position {}.", to + 1));
}

fn persisted_status(list: &SelectionListManager<'_>, message: &str) -> String {
    match list.persist_error() {
        Some(err) => status_error(&format!("{message} Not saved: {err}")),
        None => status_info(message),
    }
}
