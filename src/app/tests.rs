use std::cell::Cell;

use chrono::{DateTime, Duration, Utc};

use crate::config::CacheTtls;
use crate::db::Database;
use crate::store::KeyValueStore;

use super::cache::Lookup;
use super::catalog::{Song, SongCategory, filter_songs};
use super::quiet_time::{QuietTimeNote, QuietTimeStats};
use super::resources;
use super::selection::{SELECTION_KEY, SelectedSong, SelectionListManager};
use super::truncate;

fn test_db() -> Database {
    let db = Database::open_in_memory().expect("in-memory database");
    db.migrate().expect("migrate");
    db
}

fn stored_ids(store: &dyn KeyValueStore) -> Vec<String> {
    let raw = store
        .get(SELECTION_KEY)
        .expect("read")
        .expect("list should be persisted");
    let songs: Vec<SelectedSong> = serde_json::from_str(&raw).expect("persisted list is json");
    songs.into_iter().map(|song| song.song_id).collect()
}

fn at(minutes: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_736_000_000, 0).expect("valid timestamp")
        + Duration::minutes(minutes)
}

#[test]
fn worship_list_scenario_is_persisted_after_each_step() {
    let db = test_db();
    let mut list = SelectionListManager::load(&db);
    assert!(list.is_empty());

    list.toggle(SelectedSong::new("a", "Song A"));
    assert_eq!(stored_ids(&db), vec!["a"]);

    list.toggle(SelectedSong::new("b", "Song B"));
    assert_eq!(stored_ids(&db), vec!["a", "b"]);

    list.toggle(SelectedSong::new("a", "Song A"));
    assert_eq!(stored_ids(&db), vec!["b"]);

    list.reorder(vec![SelectedSong::new("b", "Song B")]);
    assert_eq!(stored_ids(&db), vec!["b"]);
    assert_eq!(list.songs(), &[SelectedSong::new("b", "Song B")]);
    assert!(list.persist_error().is_none());
}

#[test]
fn reordered_list_survives_a_restart() {
    let db = test_db();
    {
        let mut list = SelectionListManager::load(&db);
        for (id, title) in [("a", "Way Maker"), ("b", "Holy Forever"), ("c", "Gratitude")] {
            list.toggle(SelectedSong::new(id, title));
        }
        list.move_song(2, 0);
    }

    let reloaded = SelectionListManager::load(&db);
    let ids: Vec<&str> = reloaded
        .songs()
        .iter()
        .map(|song| song.song_id.as_str())
        .collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
}

#[test]
fn duplicate_entries_are_cleaned_once_in_the_database() {
    let db = test_db();
    db.set(
        SELECTION_KEY,
        r#"[{"youtubeId":"a","title":"A"},{"youtubeId":"b","title":"B"},{"youtubeId":"a","title":"A again"}]"#,
    )
    .expect("seed");

    let first = SelectionListManager::load(&db);
    assert_eq!(first.len(), 2);
    assert_eq!(first.songs()[0].title, "A");
    assert_eq!(stored_ids(&db), vec!["a", "b"]);

    let second = SelectionListManager::load(&db);
    assert_eq!(second.songs(), first.songs());
}

#[test]
fn catalog_songs_toggle_into_the_worship_list() {
    let db = test_db();
    let catalog = vec![
        Song {
            title: "Goodness of God".to_string(),
            song_id: "gog".to_string(),
        },
        Song {
            title: "Way Maker".to_string(),
            song_id: "wm".to_string(),
        },
    ];

    let mut list = SelectionListManager::load(&db);
    for song in filter_songs(&catalog, "way") {
        list.toggle(SelectedSong::from(song));
    }
    assert_eq!(list.songs(), &[SelectedSong::new("wm", "Way Maker")]);

    list.toggle(SelectedSong::from(&catalog[1]));
    assert!(list.is_empty());
    assert_eq!(stored_ids(&db), Vec::<String>::new());
}

#[test]
fn category_cache_and_worship_list_share_one_database() {
    let db = test_db();
    let ttls = CacheTtls::default();
    let resource = resources::category_songs(&ttls, SongCategory::Worship);
    let calls = Cell::new(0);
    let fetch = || {
        calls.set(calls.get() + 1);
        Ok::<_, String>(vec![Song {
            title: "Holy Forever".to_string(),
            song_id: "hf".to_string(),
        }])
    };

    let fetched = resource.get_or_fetch_at(&db, at(0), fetch);
    let mut list = SelectionListManager::load(&db);
    list.toggle(SelectedSong::from(&fetched.value[0]));

    let again = resource.get_or_fetch_at(&db, at(30), fetch);
    assert_eq!(calls.get(), 1);
    assert_eq!(again.value, fetched.value);

    resource.invalidate(&db);
    assert_eq!(resource.lookup(&db, at(31)), Lookup::Refresh { stale: None });
    assert_eq!(SelectionListManager::load(&db).len(), 1);
}

#[test]
fn expired_category_cache_falls_back_to_stale_songs() {
    let db = test_db();
    let ttls = CacheTtls::default();
    let resource = resources::category_songs(&ttls, SongCategory::Praise);
    let cached = vec![Song {
        title: "Raise a Hallelujah".to_string(),
        song_id: "rah".to_string(),
    }];
    resource.get_or_fetch_at(&db, at(0), || Ok::<_, String>(cached.clone()));

    let result = resource.get_or_fetch_at(&db, at(61), || Err::<Vec<Song>, _>("timeout"));
    assert_eq!(result.value, cached);
    assert!(!result.is_error());
}

#[test]
fn analytics_default_is_served_when_nothing_is_cached() {
    let db = test_db();
    let resource = resources::member_analytics(&CacheTtls::default());
    let result = resource.get_or_fetch_at(&db, at(0), || Err::<Vec<_>, _>("401 unauthorized"));
    assert!(result.is_error());
    assert!(!result.value.is_empty());
    assert!(db.get(resources::ANALYTICS_KEY).expect("read").is_none());
}

#[test]
fn quiet_time_caches_are_separate_per_mentee_and_clearable() {
    let db = test_db();
    let ttls = CacheTtls::default();
    let note = |id: &str| QuietTimeNote {
        id: id.to_string(),
        note: format!("note {id}"),
        date: "2025-03-09T06:00:00Z".to_string(),
        image_url: None,
        author: None,
    };

    resources::mentee_notes(&ttls, "m1").get_or_fetch_at(&db, at(0), || {
        Ok::<_, String>(vec![note("a")])
    });
    let other = resources::mentee_notes(&ttls, "m2")
        .get_or_fetch_at(&db, at(1), || Ok::<_, String>(vec![note("b")]));
    assert_eq!(other.value, vec![note("b")]);

    let stats = QuietTimeStats {
        current_streak: 3,
        longest_streak: 10,
        total_quiet_times: 42,
    };
    let resource = resources::quiet_time_stats(&ttls);
    resource.get_or_fetch_at(&db, at(0), || Ok::<_, String>(stats));
    let offline = resource.get_or_fetch_at(&db, at(20), || Err::<QuietTimeStats, _>("offline"));
    assert_eq!(offline.value, stats);
    assert!(!offline.is_error());

    let keys = db.keys().expect("keys");
    let cached: Vec<&String> = keys.iter().filter(|key| resources::is_cache_key(key)).collect();
    assert_eq!(cached.len(), 3);
}

#[test]
fn truncate_limits_char_count_with_ellipsis() {
    assert_eq!(truncate("Short", 10), "Short");
    assert_eq!(truncate("Great Are You Lord", 10), "Great A...");
    assert_eq!(truncate("Über Alles Gut", 6), "Übe...");
}
