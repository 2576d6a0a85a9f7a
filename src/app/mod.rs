mod analytics;
mod api;
mod assets;
mod cache;
mod catalog;
mod message;
mod quiet_time;
mod resources;
mod roster;
mod selection;
mod tui;

#[cfg(test)]
mod tests;

use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Local, Utc};

use crate::cli::{CacheAction, Cli, Command};
use crate::config::Config;
use crate::db::Database;
use crate::paths::database_file_path;
use crate::store::{KeyValueStore, MemoryStore};

use self::analytics::{overall_score, score_band, team_stats};
use self::api::ApiClient;
use self::catalog::{SONGS_PER_PAGE, SongCategory, filter_songs, page};
use self::quiet_time::{
    QuietTimeNote, note_date_display, notes_per_week, sort_by_activity, streak_status,
};
use self::roster::visible_days;
use self::selection::{SELECTION_KEY, SelectedSong, SelectionListManager};

pub fn run(cli: Cli) -> Result<()> {
    let config = Config::from_args(&cli.global);
    let owned_store = open_store();
    let store = owned_store.as_ref();
    let client = ApiClient::new(config);

    match cli.command {
        Some(Command::Songs {
            category,
            search,
            page,
        }) => run_songs(store, &client, &category, search.as_deref(), page)?,
        Some(Command::Add { song_id, title }) => run_add(store, SelectedSong::new(song_id, title)),
        Some(Command::Remove { song_id }) => run_remove(store, &song_id),
        Some(Command::Move { from, to }) => run_move(store, from, to)?,
        Some(Command::Clear) => run_clear(store),
        Some(Command::List) => run_list(store),
        Some(Command::Weekly) => run_weekly(store, &client),
        Some(Command::Roster { location, search }) => {
            run_roster(store, &client, &location, search.as_deref())
        }
        Some(Command::Locations) => run_locations(store, &client),
        Some(Command::Analytics) => run_analytics(store, &client),
        Some(Command::QuietTime { mentees, mentee }) => match mentee {
            Some(id) => run_mentee_notes(store, &client, &id),
            None if mentees => run_mentees(store, &client),
            None => run_quiet_time(store, &client),
        },
        Some(Command::Message {
            theme,
            reference,
            verse,
        }) => run_message(store, &theme, &reference, &verse),
        Some(Command::Hero {
            url,
            key,
            out,
            refresh,
        }) => run_hero(store, &client, &url, &key, out.as_deref(), refresh)?,
        Some(Command::Cache { action }) => run_cache(store, action)?,
        Some(Command::Tui) | None => tui::run_tui(store, &client)?,
    }

    Ok(())
}

/// Falls back to a session-only store so the app keeps working when the
/// database cannot be opened.
fn open_store() -> Box<dyn KeyValueStore> {
    match open_db() {
        Ok(db) => Box::new(db),
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "database unavailable; using memory store");
            eprintln!("warning: {err:#}. Changes will not be saved after exit.");
            Box::new(MemoryStore::new())
        }
    }
}

fn open_db() -> Result<Database> {
    let db_path = database_file_path()?;
    let db = Database::open(&db_path)?;
    db.migrate()?;
    Ok(db)
}

fn run_songs(
    store: &dyn KeyValueStore,
    client: &ApiClient,
    category: &str,
    search: Option<&str>,
    page_number: usize,
) -> Result<()> {
    let category: SongCategory = category.parse()?;
    let fetched = resources::category_songs(&client.config().ttls, category)
        .get_or_fetch(store, || client.songs_by_category(category));
    if let Some(err) = &fetched.error {
        println!("Could not load {}: {err}", category.label());
    }

    let matching = filter_songs(&fetched.value, search.unwrap_or(""));
    if matching.is_empty() {
        println!("No songs found.");
        return Ok(());
    }

    let (visible, total_pages) = page(&matching, page_number, SONGS_PER_PAGE);
    let list = SelectionListManager::load(store);
    println!("{} (page {} of {})", category.label(), page_number.max(1), total_pages);
    println!("{:<4} {:<48} {:<14}", "", "TITLE", "SONG ID");
    for song in visible {
        let marker = if list.contains(&song.song_id) { "[x]" } else { "[ ]" };
        println!(
            "{:<4} {:<48} {:<14}",
            marker,
            truncate(&song.title, 48),
            song.song_id
        );
    }
    Ok(())
}

fn run_add(store: &dyn KeyValueStore, song: SelectedSong) {
    let mut list = SelectionListManager::load(store);
    let title = song.title.clone();
    let was_listed = list.contains(&song.song_id);
    list.toggle(song);
    if was_listed {
        println!("Removed from worship list: {title}");
    } else {
        println!("Added to worship list: {title} (#{})", list.len());
    }
    report_persist_error(&list);
}

fn run_remove(store: &dyn KeyValueStore, song_id: &str) {
    let mut list = SelectionListManager::load(store);
    let before = list.len();
    list.remove(song_id);
    if list.len() < before {
        println!("Removed {song_id} from the worship list.");
    } else {
        println!("{song_id} is not in the worship list.");
    }
    report_persist_error(&list);
}

fn run_move(store: &dyn KeyValueStore, from: usize, to: usize) -> Result<()> {
    let mut list = SelectionListManager::load(store);
    let len = list.len();
    if from == 0 || to == 0 || from > len || to > len {
        bail!("positions must be between 1 and {len}");
    }
    list.move_song(from - 1, to - 1);
    print_list(&list);
    report_persist_error(&list);
    Ok(())
}

fn run_clear(store: &dyn KeyValueStore) {
    let mut list = SelectionListManager::load(store);
    list.clear();
    println!("Worship list cleared.");
    report_persist_error(&list);
}

fn run_list(store: &dyn KeyValueStore) {
    let list = SelectionListManager::load(store);
    print_list(&list);
}

fn print_list(list: &SelectionListManager<'_>) {
    if list.is_empty() {
        println!("No songs selected yet. Browse with `worshiplist songs <category>`.");
        return;
    }
    let count = list.len();
    println!("{count} song{} selected", if count == 1 { "" } else { "s" });
    for (idx, song) in list.songs().iter().enumerate() {
        println!("{:>3}. {:<48} {}", idx + 1, truncate(&song.title, 48), song.song_id);
    }
}

fn report_persist_error(list: &SelectionListManager<'_>) {
    if let Some(err) = list.persist_error() {
        println!(
            "warning: the worship list could not be saved ({err}); \
             it is kept for this session only."
        );
    }
}

fn run_weekly(store: &dyn KeyValueStore, client: &ApiClient) {
    let fetched = resources::weekly_songs(&client.config().ttls)
        .get_or_fetch(store, || client.weekly_songs());
    if let Some(err) = &fetched.error {
        println!("Could not load this week's songs: {err}");
    }
    if fetched.value.is_empty() {
        println!("No songs for this week yet.");
        return;
    }
    let count = fetched.value.len();
    println!("{count} song{} for this week", if count == 1 { "" } else { "s" });
    for song in &fetched.value {
        println!("  {:<40} {}", truncate(&song.name, 40), song.link);
    }
}

fn run_roster(store: &dyn KeyValueStore, client: &ApiClient, location: &str, search: Option<&str>) {
    let fetched = resources::roster(&client.config().ttls, location)
        .get_or_fetch(store, || client.roster(location));
    if let Some(err) = &fetched.error {
        println!("Could not load roster for {location}: {err}");
    }

    let today = Local::now().date_naive();
    let days = visible_days(&fetched.value, search.unwrap_or(""), today);
    if days.is_empty() {
        println!("No roster entries found.");
        return;
    }
    for day in days {
        println!("{}", roster::copy_text(&day));
    }
}

fn run_locations(store: &dyn KeyValueStore, client: &ApiClient) {
    let fetched =
        resources::locations(&client.config().ttls).get_or_fetch(store, || client.locations());
    if let Some(err) = &fetched.error {
        println!("Failed to load locations: {err}");
        return;
    }
    println!("{:<16} {:<32} {:<10}", "ID", "NAME", "TYPE");
    for location in &fetched.value {
        println!(
            "{:<16} {:<32} {:<10}",
            truncate(&location.id, 16),
            truncate(&location.name, 32),
            location.kind
        );
    }
}

fn run_analytics(store: &dyn KeyValueStore, client: &ApiClient) {
    let fetched = resources::member_analytics(&client.config().ttls)
        .get_or_fetch(store, || client.member_analytics());
    if let Some(err) = &fetched.error {
        println!("Analytics unavailable ({err}); showing sample data.");
    }

    let Some(stats) = team_stats(&fetched.value) else {
        println!("No members to show.");
        return;
    };
    println!(
        "Team average {:.1} across {} members\n",
        stats.average_score, stats.total_members
    );
    for member in &fetched.value {
        let score = overall_score(member);
        println!(
            "{:<24} {:<12} {:.1} ({})",
            truncate(&member.name, 24),
            truncate(&member.instrument, 12),
            score,
            score_band(score).label()
        );
        for (label, value) in member.metrics() {
            println!("    {label:<28} {value:.1}");
        }
    }
}

fn run_quiet_time(store: &dyn KeyValueStore, client: &ApiClient) {
    let ttls = &client.config().ttls;
    let stats =
        resources::quiet_time_stats(ttls).get_or_fetch(store, || client.quiet_time_stats());
    if let Some(err) = &stats.error {
        println!("Could not load streak stats: {err}");
    }
    println!(
        "Current streak {} days   longest {} days   {} quiet times\n",
        stats.value.current_streak, stats.value.longest_streak, stats.value.total_quiet_times
    );

    let notes = resources::my_notes(ttls).get_or_fetch(store, || client.my_notes());
    if let Some(err) = &notes.error {
        println!("Could not load notes: {err}");
    }
    print_notes(&notes.value, false);
}

fn run_mentees(store: &dyn KeyValueStore, client: &ApiClient) {
    let fetched =
        resources::mentees(&client.config().ttls).get_or_fetch(store, || client.mentees());
    if let Some(err) = &fetched.error {
        println!("Could not load mentees: {err}");
    }
    let mut mentees = fetched.value;
    if mentees.is_empty() {
        println!("No mentees assigned.");
        return;
    }
    sort_by_activity(&mut mentees);
    let now = Utc::now();
    println!(
        "{:<24} {:<16} {:>7} {:>7} {:>6} {:>8}  {:<24}",
        "NAME", "STATUS", "STREAK", "LONGEST", "TOTAL", "PER WEEK", "ID"
    );
    for mentee in &mentees {
        println!(
            "{:<24} {:<16} {:>7} {:>7} {:>6} {:>8.1}  {:<24}",
            truncate(&mentee.name, 24),
            streak_status(mentee, now).label(),
            mentee.current_streak,
            mentee.longest_streak,
            mentee.total_quiet_times,
            notes_per_week(mentee),
            mentee.id
        );
    }
}

fn run_mentee_notes(store: &dyn KeyValueStore, client: &ApiClient, mentee_id: &str) {
    let fetched = resources::mentee_notes(&client.config().ttls, mentee_id)
        .get_or_fetch(store, || client.mentee_notes(mentee_id));
    if let Some(err) = &fetched.error {
        println!("Could not load notes for {mentee_id}: {err}");
    }
    print_notes(&fetched.value, true);
}

fn print_notes(notes: &[QuietTimeNote], with_author: bool) {
    if notes.is_empty() {
        println!("No quiet-time notes yet.");
        return;
    }
    for note in notes {
        let author = match note.author_name() {
            Some(name) if with_author => format!("{}  ", truncate(name, 20)),
            _ => String::new(),
        };
        let image = if note.has_image() { "  [image]" } else { "" };
        println!(
            "{:<13} {author}{}{image}",
            note_date_display(&note.date),
            truncate(note.note.trim(), 60)
        );
    }
}

fn run_message(store: &dyn KeyValueStore, theme: &str, reference: &str, verse: &str) {
    let list = SelectionListManager::load(store);
    if list.is_empty() {
        println!("note: the worship list is empty.\n");
    }
    print!("{}", message::generate_message(theme, reference, verse, list.songs()));
}

fn run_hero(
    store: &dyn KeyValueStore,
    client: &ApiClient,
    url: &str,
    key: &str,
    out: Option<&Path>,
    refresh: bool,
) -> Result<()> {
    if ![assets::LIST_IMAGE_KEY, assets::SONGS_IMAGE_KEY].contains(&key) {
        bail!(
            "image key must be {} or {}",
            assets::LIST_IMAGE_KEY,
            assets::SONGS_IMAGE_KEY
        );
    }
    let fetched = assets::cached_image(store, client, key, url, refresh);
    if let Some(err) = &fetched.error {
        bail!("could not fetch image: {err}");
    }
    println!("Cached {key} ({} characters).", fetched.value.len());
    if let Some(path) = out {
        let bytes = assets::decode_data_url(&fetched.value)?;
        std::fs::write(path, &bytes)
            .with_context(|| format!("failed to write image to {}", path.display()))?;
        println!("Wrote {} bytes to {}", bytes.len(), path.display());
    }
    Ok(())
}

fn run_cache(store: &dyn KeyValueStore, action: CacheAction) -> Result<()> {
    let keys = store.keys().context("failed to list stored keys")?;
    match action {
        CacheAction::Keys => {
            for key in keys {
                println!("{key}");
            }
        }
        CacheAction::Clear { key: Some(key) } => {
            if key == SELECTION_KEY {
                bail!("use `worshiplist clear` to empty the worship list");
            }
            cache::invalidate_key(store, &key);
            println!("Cleared {key}.");
        }
        CacheAction::Clear { key: None } => {
            let mut cleared = 0;
            for key in keys.iter().filter(|key| resources::is_cache_key(key)) {
                cache::invalidate_key(store, key);
                cleared += 1;
            }
            println!("Cleared {cleared} cached resource(s).");
        }
    }
    Ok(())
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    let mut out = s.to_string();
    if out.chars().count() > max {
        out = out.chars().take(max.saturating_sub(3)).collect::<String>() + "...";
    }
    out
}
