use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{KeyValueStore, StoreError};

pub(crate) const SELECTION_KEY: &str = "selectedVideos";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) struct SelectedSong {
    #[serde(rename = "youtubeId", alias = "songId")]
    pub(crate) song_id: String,
    pub(crate) title: String,
}

impl SelectedSong {
    pub(crate) fn new(song_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            song_id: song_id.into(),
            title: title.into(),
        }
    }
}

/// The worship list for this device. Mutations update memory first and then
/// write the whole list back to the store; write failures are logged and
/// kept in `persist_error`, never returned.
pub(crate) struct SelectionListManager<'a> {
    store: &'a dyn KeyValueStore,
    songs: Vec<SelectedSong>,
    persist_error: Option<String>,
}

impl<'a> SelectionListManager<'a> {
    pub(crate) fn load(store: &'a dyn KeyValueStore) -> Self {
        let mut manager = Self {
            store,
            songs: Vec::new(),
            persist_error: None,
        };

        let raw = match store.get(SELECTION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return manager,
            Err(err) => {
                tracing::warn!(%err, "failed to read worship list; starting empty");
                return manager;
            }
        };

        let Some((songs, changed)) = parse_persisted_list(&raw) else {
            tracing::warn!("persisted worship list is malformed; starting empty");
            return manager;
        };
        manager.songs = songs;
        if changed {
            tracing::info!(
                count = manager.songs.len(),
                "cleaned duplicate or malformed worship list entries"
            );
            manager.persist();
        }
        manager
    }

    pub(crate) fn songs(&self) -> &[SelectedSong] {
        &self.songs
    }

    pub(crate) fn len(&self) -> usize {
        self.songs.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub(crate) fn contains(&self, song_id: &str) -> bool {
        self.songs.iter().any(|song| song.song_id == song_id)
    }

    pub(crate) fn persist_error(&self) -> Option<&str> {
        self.persist_error.as_deref()
    }

    pub(crate) fn toggle(&mut self, song: SelectedSong) -> &[SelectedSong] {
        if self.contains(&song.song_id) {
            self.songs.retain(|existing| existing.song_id != song.song_id);
        } else {
            self.songs.push(song);
        }
        self.persist();
        &self.songs
    }

    pub(crate) fn remove(&mut self, song_id: &str) -> &[SelectedSong] {
        self.songs.retain(|song| song.song_id != song_id);
        self.persist();
        &self.songs
    }

    /// Replaces the list with `new_order` as given. Callers are expected to
    /// pass a permutation of the current songs.
    pub(crate) fn reorder(&mut self, new_order: Vec<SelectedSong>) -> &[SelectedSong] {
        if !is_permutation(&self.songs, &new_order) {
            tracing::warn!(
                current = self.songs.len(),
                supplied = new_order.len(),
                "reorder received a list that is not a permutation of the current songs"
            );
        }
        self.songs = new_order;
        self.persist();
        &self.songs
    }

    pub(crate) fn move_song(&mut self, from: usize, to: usize) -> &[SelectedSong] {
        if from == to || from >= self.songs.len() || to >= self.songs.len() {
            return &self.songs;
        }
        let mut new_order = self.songs.clone();
        let moved = new_order.remove(from);
        new_order.insert(to, moved);
        self.reorder(new_order)
    }

    pub(crate) fn clear(&mut self) -> &[SelectedSong] {
        self.songs.clear();
        self.persist();
        &self.songs
    }

    fn persist(&mut self) {
        match self.write_list() {
            Ok(()) => self.persist_error = None,
            Err(err) => {
                tracing::warn!(%err, "failed to persist worship list; keeping it in memory");
                self.persist_error = Some(err.to_string());
            }
        }
    }

    fn write_list(&self) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(&self.songs)
            .map_err(|err| StoreError::Unavailable(format!("encode failed: {err}")))?;
        self.store.set(SELECTION_KEY, &encoded)
    }
}

/// Returns the usable songs of a persisted list and whether anything had to
/// be dropped (duplicates or malformed entries). `None` when the value is not
/// a JSON array at all.
fn parse_persisted_list(raw: &str) -> Option<(Vec<SelectedSong>, bool)> {
    let parsed: Value = serde_json::from_str(raw).ok()?;
    let entries = parsed.as_array()?;

    let mut seen = HashSet::new();
    let mut songs = Vec::with_capacity(entries.len());
    for entry in entries {
        let Ok(song) = serde_json::from_value::<SelectedSong>(entry.clone()) else {
            continue;
        };
        if seen.insert(song.song_id.clone()) {
            songs.push(song);
        }
    }
    let changed = songs.len() != entries.len();
    Some((songs, changed))
}

fn is_permutation(current: &[SelectedSong], candidate: &[SelectedSong]) -> bool {
    if current.len() != candidate.len() {
        return false;
    }
    let current_ids: HashSet<&str> = current.iter().map(|song| song.song_id.as_str()).collect();
    let candidate_ids: HashSet<&str> = candidate.iter().map(|song| song.song_id.as_str()).collect();
    candidate_ids.len() == candidate.len() && current_ids == candidate_ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::store::testing::FlakyStore;

    fn song(id: &str) -> SelectedSong {
        SelectedSong::new(id, format!("Song {}", id.to_uppercase()))
    }

    fn persisted(store: &dyn KeyValueStore) -> Vec<SelectedSong> {
        let raw = store
            .get(SELECTION_KEY)
            .expect("read")
            .expect("list should be persisted");
        serde_json::from_str(&raw).expect("persisted list should be valid json")
    }

    #[test]
    fn load_without_persisted_list_is_empty() {
        let store = MemoryStore::new();
        let manager = SelectionListManager::load(&store);
        assert!(manager.is_empty());
        assert!(store.get(SELECTION_KEY).expect("read").is_none());
    }

    #[test]
    fn toggle_scenario_tracks_membership_and_persists_each_step() {
        let store = MemoryStore::new();
        let mut manager = SelectionListManager::load(&store);

        manager.toggle(song("a"));
        assert_eq!(persisted(&store), vec![song("a")]);

        manager.toggle(song("b"));
        assert_eq!(persisted(&store), vec![song("a"), song("b")]);

        manager.toggle(song("a"));
        assert_eq!(manager.songs(), &[song("b")]);
        assert_eq!(persisted(&store), vec![song("b")]);

        manager.reorder(vec![song("b")]);
        assert_eq!(manager.songs(), &[song("b")]);
        assert_eq!(persisted(&store), vec![song("b")]);
    }

    #[test]
    fn toggle_twice_restores_previous_list() {
        let store = MemoryStore::new();
        let mut manager = SelectionListManager::load(&store);
        manager.toggle(song("a"));
        manager.toggle(song("b"));
        let before = manager.songs().to_vec();

        manager.toggle(song("c"));
        manager.toggle(song("c"));
        assert_eq!(manager.songs(), before.as_slice());

        manager.toggle(song("a"));
        manager.toggle(song("a"));
        // Re-adding appends, so membership is restored but `a` moves to the end.
        assert_eq!(manager.songs(), &[song("b"), song("a")]);
    }

    #[test]
    fn toggle_matches_by_id_not_title() {
        let store = MemoryStore::new();
        let mut manager = SelectionListManager::load(&store);
        manager.toggle(SelectedSong::new("a", "Original title"));
        manager.toggle(SelectedSong::new("a", "Different title"));
        assert!(manager.is_empty());
    }

    #[test]
    fn any_toggle_sequence_keeps_ids_unique() {
        let store = MemoryStore::new();
        let mut manager = SelectionListManager::load(&store);
        for id in ["a", "b", "a", "c", "b", "b", "d", "a", "c", "e"] {
            manager.toggle(song(id));
            let ids: HashSet<&str> = manager
                .songs()
                .iter()
                .map(|song| song.song_id.as_str())
                .collect();
            assert_eq!(ids.len(), manager.len());
        }
        assert_eq!(manager.songs(), &[song("b"), song("d"), song("a"), song("e")]);
    }

    #[test]
    fn remove_absent_song_is_noop() {
        let store = MemoryStore::new();
        let mut manager = SelectionListManager::load(&store);
        manager.toggle(song("a"));
        manager.toggle(song("b"));
        let before = manager.songs().to_vec();

        let after = manager.remove("zzz").to_vec();
        assert_eq!(after, before);
        assert_eq!(persisted(&store), before);
    }

    #[test]
    fn load_collapses_duplicates_and_writes_back() {
        let store = MemoryStore::new();
        store
            .set(
                SELECTION_KEY,
                r#"[{"title":"A","youtubeId":"a"},{"title":"B","youtubeId":"b"},{"title":"A again","youtubeId":"a"},{"title":"C","youtubeId":"c"},{"title":"B again","youtubeId":"b"}]"#,
            )
            .expect("seed");

        let manager = SelectionListManager::load(&store);
        let expected = vec![
            SelectedSong::new("a", "A"),
            SelectedSong::new("b", "B"),
            SelectedSong::new("c", "C"),
        ];
        assert_eq!(manager.songs(), expected.as_slice());
        assert_eq!(persisted(&store), expected);

        let reloaded = SelectionListManager::load(&store);
        assert_eq!(reloaded.songs(), expected.as_slice());
    }

    #[test]
    fn load_without_duplicates_does_not_rewrite() {
        let store = FlakyStore::default();
        store
            .inner
            .set(SELECTION_KEY, r#"[{"title":"A","youtubeId":"a"}]"#)
            .expect("seed");

        let manager = SelectionListManager::load(&store);
        assert_eq!(manager.len(), 1);
        assert_eq!(store.writes.get(), 0);
    }

    #[test]
    fn load_accepts_song_id_alias() {
        let store = MemoryStore::new();
        store
            .set(SELECTION_KEY, r#"[{"title":"A","songId":"a"}]"#)
            .expect("seed");
        let manager = SelectionListManager::load(&store);
        assert_eq!(manager.songs(), &[SelectedSong::new("a", "A")]);
    }

    #[test]
    fn load_tolerates_malformed_storage() {
        for raw in ["not json", "{\"youtubeId\":\"a\"}", "42", ""] {
            let store = MemoryStore::new();
            store.set(SELECTION_KEY, raw).expect("seed");
            let manager = SelectionListManager::load(&store);
            assert!(manager.is_empty(), "raw value {raw:?} should load empty");
        }
    }

    #[test]
    fn load_drops_malformed_entries_and_rewrites() {
        let store = MemoryStore::new();
        store
            .set(
                SELECTION_KEY,
                r#"[{"title":"A","youtubeId":"a"},{"title":"no id"},7]"#,
            )
            .expect("seed");
        let manager = SelectionListManager::load(&store);
        assert_eq!(manager.songs(), &[SelectedSong::new("a", "A")]);
        assert_eq!(persisted(&store), vec![SelectedSong::new("a", "A")]);
    }

    #[test]
    fn load_survives_read_failure() {
        let store = FlakyStore::default();
        store.fail_reads.set(true);
        let manager = SelectionListManager::load(&store);
        assert!(manager.is_empty());
    }

    #[test]
    fn reorder_survives_restart() {
        let store = MemoryStore::new();
        {
            let mut manager = SelectionListManager::load(&store);
            manager.toggle(song("a"));
            manager.toggle(song("b"));
            manager.toggle(song("c"));
            manager.reorder(vec![song("c"), song("a"), song("b")]);
        }
        let reloaded = SelectionListManager::load(&store);
        assert_eq!(reloaded.songs(), &[song("c"), song("a"), song("b")]);
    }

    #[test]
    fn reorder_accepts_non_permutation_verbatim() {
        let store = MemoryStore::new();
        let mut manager = SelectionListManager::load(&store);
        manager.toggle(song("a"));
        manager.reorder(vec![song("x"), song("y")]);
        assert_eq!(manager.songs(), &[song("x"), song("y")]);
    }

    #[test]
    fn move_song_splices_like_drag_and_drop() {
        let store = MemoryStore::new();
        let mut manager = SelectionListManager::load(&store);
        for id in ["a", "b", "c", "d"] {
            manager.toggle(song(id));
        }

        manager.move_song(0, 2);
        assert_eq!(manager.songs(), &[song("b"), song("c"), song("a"), song("d")]);
        manager.move_song(3, 0);
        assert_eq!(manager.songs(), &[song("d"), song("b"), song("c"), song("a")]);
        manager.move_song(1, 9);
        assert_eq!(manager.songs(), &[song("d"), song("b"), song("c"), song("a")]);

        let reloaded = SelectionListManager::load(&store);
        assert_eq!(reloaded.songs(), manager.songs());
    }

    #[test]
    fn clear_empties_and_persists() {
        let store = MemoryStore::new();
        let mut manager = SelectionListManager::load(&store);
        manager.toggle(song("a"));
        manager.clear();
        assert!(manager.is_empty());
        assert!(persisted(&store).is_empty());
    }

    #[test]
    fn write_failures_keep_memory_authoritative() {
        let store = FlakyStore::default();
        let mut manager = SelectionListManager::load(&store);
        manager.toggle(song("a"));
        assert!(manager.persist_error().is_none());

        store.fail_writes.set(true);
        manager.toggle(song("b"));
        assert_eq!(manager.songs(), &[song("a"), song("b")]);
        let error = manager.persist_error().expect("write failure should be recorded");
        assert!(error.contains("quota"), "unexpected error: {error}");
        assert_eq!(persisted(&store.inner), vec![song("a")]);

        store.fail_writes.set(false);
        manager.toggle(song("c"));
        assert!(manager.persist_error().is_none());
        assert_eq!(persisted(&store.inner), vec![song("a"), song("b"), song("c")]);
    }
}
