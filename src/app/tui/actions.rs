use std::sync::mpsc;

use chrono::Utc;
use ratatui::widgets::TableState;

use crate::store::KeyValueStore;

use super::super::api::ApiClient;
use super::super::cache::Lookup;
use super::super::catalog::{Song, SongCategory, filter_songs};
use super::super::resources;
use super::{CatalogFetchResult, CatalogState, TuiState};

pub(super) fn status_info(msg: &str) -> String {
    format!("INFO: {msg}")
}

pub(super) fn status_error(msg: &str) -> String {
    format!("ERROR: {msg}")
}

pub(super) fn visible_songs(state: &TuiState) -> Vec<&Song> {
    state
        .current_catalog()
        .map(|catalog| filter_songs(catalog.songs(), &state.search))
        .unwrap_or_default()
}

pub(super) fn clamp_selection(table: &mut TableState, len: usize) {
    if len == 0 {
        table.select(None);
        return;
    }
    match table.selected() {
        Some(selected) => table.select(Some(selected.min(len - 1))),
        None => table.select(Some(0)),
    }
}

/// Serves the current category from the cache or starts a background fetch.
/// Returns whether a fetch was started.
pub(super) fn ensure_category_loaded(
    store: &dyn KeyValueStore,
    client: &ApiClient,
    state: &mut TuiState,
    tx: &mpsc::Sender<CatalogFetchResult>,
) -> bool {
    let category = state.category;
    if state.catalogs.contains_key(&category) {
        return false;
    }

    let resource = resources::category_songs(&client.config().ttls, category);
    match resource.lookup(store, Utc::now()) {
        Lookup::Fresh(songs) => {
            state.catalogs.insert(
                category,
                CatalogState::Ready {
                    songs,
                    warning: None,
                },
            );
            false
        }
        Lookup::Refresh { stale } => {
            state.catalogs.insert(category, CatalogState::Loading { stale });
            spawn_fetch(client, category, tx);
            true
        }
    }
}

/// Refetches the current category even when its cache is fresh.
pub(super) fn refresh_category(
    client: &ApiClient,
    state: &mut TuiState,
    tx: &mpsc::Sender<CatalogFetchResult>,
) -> bool {
    let category = state.category;
    let stale = match state.catalogs.get(&category) {
        Some(CatalogState::Loading { .. }) => return false,
        Some(catalog) => Some(catalog.songs().to_vec()),
        None => None,
    };
    state.catalogs.insert(category, CatalogState::Loading { stale });
    spawn_fetch(client, category, tx);
    true
}

fn spawn_fetch(client: &ApiClient, category: SongCategory, tx: &mpsc::Sender<CatalogFetchResult>) {
    let client = client.clone();
    let tx = tx.clone();
    std::thread::spawn(move || {
        let result = client
            .songs_by_category(category)
            .map_err(|err| err.to_string());
        let _ = tx.send(CatalogFetchResult { category, result });
    });
}

/// Writes finished fetches through the cache. Results for a category the
/// user has moved away from are stored too and show up when they come back.
pub(super) fn apply_fetch_results(
    store: &dyn KeyValueStore,
    client: &ApiClient,
    rx: &mpsc::Receiver<CatalogFetchResult>,
    state: &mut TuiState,
) {
    while let Ok(CatalogFetchResult { category, result }) = rx.try_recv() {
        let stale = match state.catalogs.remove(&category) {
            Some(CatalogState::Loading { stale }) => stale,
            Some(catalog) => Some(catalog.songs().to_vec()),
            None => None,
        };
        let resource = resources::category_songs(&client.config().ttls, category);
        let fetched = resource.complete(store, Utc::now(), stale, result);
        tracing::debug!(
            key = resource.key(),
            songs = fetched.value.len(),
            failed = fetched.is_error(),
            "catalog fetch finished"
        );
        state.catalogs.insert(
            category,
            CatalogState::Ready {
                songs: fetched.value,
                warning: fetched.error,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::MemoryStore;

    fn song(title: &str, id: &str) -> Song {
        Song {
            title: title.to_string(),
            song_id: id.to_string(),
        }
    }

    #[test]
    fn fresh_cache_is_served_without_fetching() {
        let store = MemoryStore::new();
        let client = ApiClient::new(Config::default());
        resources::category_songs(&client.config().ttls, SongCategory::Praise).complete(
            &store,
            Utc::now(),
            None,
            Ok::<_, String>(vec![song("Way Maker", "wm")]),
        );

        let (tx, _rx) = mpsc::channel();
        let mut state = TuiState::new(0);
        assert!(!ensure_category_loaded(&store, &client, &mut state, &tx));
        assert_eq!(visible_songs(&state).len(), 1);
    }

    #[test]
    fn loading_category_is_not_fetched_twice() {
        let store = MemoryStore::new();
        let client = ApiClient::new(Config::default());
        let (tx, _rx) = mpsc::channel();
        let mut state = TuiState::new(0);
        state
            .catalogs
            .insert(SongCategory::Praise, CatalogState::Loading { stale: None });

        assert!(!ensure_category_loaded(&store, &client, &mut state, &tx));
        assert!(!refresh_category(&client, &mut state, &tx));
    }

    #[test]
    fn finished_fetch_is_cached_even_after_switching_category() {
        let store = MemoryStore::new();
        let client = ApiClient::new(Config::default());
        let (tx, rx) = mpsc::channel();
        let mut state = TuiState::new(0);
        state
            .catalogs
            .insert(SongCategory::Worship, CatalogState::Loading { stale: None });
        state.category = SongCategory::Praise;

        tx.send(CatalogFetchResult {
            category: SongCategory::Worship,
            result: Ok(vec![song("Holy Forever", "hf")]),
        })
        .expect("send");
        apply_fetch_results(&store, &client, &rx, &mut state);

        assert!(visible_songs(&state).is_empty());
        assert!(store.get("songs:Worship").expect("read").is_some());
        state.category = SongCategory::Worship;
        assert_eq!(visible_songs(&state)[0].song_id, "hf");
    }

    #[test]
    fn failed_fetch_keeps_stale_songs() {
        let store = MemoryStore::new();
        let client = ApiClient::new(Config::default());
        let (tx, rx) = mpsc::channel();
        let mut state = TuiState::new(0);
        state.catalogs.insert(
            SongCategory::Praise,
            CatalogState::Loading {
                stale: Some(vec![song("Old", "old")]),
            },
        );

        tx.send(CatalogFetchResult {
            category: SongCategory::Praise,
            result: Err("offline".to_string()),
        })
        .expect("send");
        apply_fetch_results(&store, &client, &rx, &mut state);

        let catalog = state.current_catalog().expect("catalog");
        assert_eq!(catalog.songs()[0].song_id, "old");
        assert_eq!(catalog.warning(), None);
    }

    #[test]
    fn failed_first_fetch_surfaces_a_warning() {
        let store = MemoryStore::new();
        let client = ApiClient::new(Config::default());
        let (tx, rx) = mpsc::channel();
        let mut state = TuiState::new(0);
        state
            .catalogs
            .insert(SongCategory::Praise, CatalogState::Loading { stale: None });

        tx.send(CatalogFetchResult {
            category: SongCategory::Praise,
            result: Err("offline".to_string()),
        })
        .expect("send");
        apply_fetch_results(&store, &client, &rx, &mut state);

        let catalog = state.current_catalog().expect("catalog");
        assert!(catalog.songs().is_empty());
        assert_eq!(catalog.warning(), Some("offline"));
    }

    #[test]
    fn search_filters_the_visible_catalog() {
        let mut state = TuiState::new(0);
        state.catalogs.insert(
            SongCategory::Praise,
            CatalogState::Ready {
                songs: vec![song("Way Maker", "wm"), song("Goodness of God", "gog")],
                warning: None,
            },
        );
        state.search = "good".to_string();
        let ids: Vec<&str> = visible_songs(&state)
            .iter()
            .map(|song| song.song_id.as_str())
            .collect();
        assert_eq!(ids, vec!["gog"]);
    }

    #[test]
    fn clamp_selection_tracks_list_length() {
        let mut table = TableState::default();
        table.select(Some(5));
        clamp_selection(&mut table, 3);
        assert_eq!(table.selected(), Some(2));
        clamp_selection(&mut table, 0);
        assert_eq!(table.selected(), None);
        clamp_selection(&mut table, 2);
        assert_eq!(table.selected(), Some(0));
    }
}
