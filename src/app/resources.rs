use crate::config::CacheTtls;

use super::analytics::{MemberMetrics, placeholder_members};
use super::cache::{CachedResource, Ttl};
use super::catalog::{Song, SongCategory, WeeklySong};
use super::quiet_time::{Mentee, QuietTimeNote, QuietTimeStats};
use super::roster::{Location, RosterDay};

pub(crate) const WEEKLY_SONGS_KEY: &str = "songs";
pub(crate) const LOCATIONS_KEY: &str = "locations";
pub(crate) const ANALYTICS_KEY: &str = "memberAnalytics";
pub(crate) const MY_NOTES_KEY: &str = "quietTimeNotes";
pub(crate) const QUIET_TIME_STATS_KEY: &str = "quietTimeStats";
pub(crate) const MENTEES_KEY: &str = "mentees";

pub(crate) fn roster_key(location: &str) -> String {
    format!("roster:{}", location.trim().to_lowercase())
}

pub(crate) fn mentee_notes_key(mentee_id: &str) -> String {
    format!("menteeNotes:{}", mentee_id.trim())
}

pub(crate) fn category_songs(
    ttls: &CacheTtls,
    category: SongCategory,
) -> CachedResource<Vec<Song>> {
    CachedResource::new(category.cache_key(), Ttl::For(ttls.songs), Vec::new())
}

pub(crate) fn weekly_songs(ttls: &CacheTtls) -> CachedResource<Vec<WeeklySong>> {
    CachedResource::new(WEEKLY_SONGS_KEY, Ttl::For(ttls.songs), Vec::new())
}

pub(crate) fn roster(ttls: &CacheTtls, location: &str) -> CachedResource<Vec<RosterDay>> {
    CachedResource::new(roster_key(location), Ttl::For(ttls.roster), Vec::new())
}

pub(crate) fn locations(ttls: &CacheTtls) -> CachedResource<Vec<Location>> {
    CachedResource::new(LOCATIONS_KEY, Ttl::For(ttls.locations), Vec::new())
}

pub(crate) fn member_analytics(ttls: &CacheTtls) -> CachedResource<Vec<MemberMetrics>> {
    CachedResource::new(ANALYTICS_KEY, Ttl::For(ttls.analytics), placeholder_members())
}

pub(crate) fn my_notes(ttls: &CacheTtls) -> CachedResource<Vec<QuietTimeNote>> {
    CachedResource::new(MY_NOTES_KEY, Ttl::For(ttls.quiet_time), Vec::new())
}

pub(crate) fn quiet_time_stats(ttls: &CacheTtls) -> CachedResource<QuietTimeStats> {
    CachedResource::new(
        QUIET_TIME_STATS_KEY,
        Ttl::For(ttls.quiet_time),
        QuietTimeStats::default(),
    )
}

pub(crate) fn mentees(ttls: &CacheTtls) -> CachedResource<Vec<Mentee>> {
    CachedResource::new(MENTEES_KEY, Ttl::For(ttls.quiet_time), Vec::new())
}

pub(crate) fn mentee_notes(
    ttls: &CacheTtls,
    mentee_id: &str,
) -> CachedResource<Vec<QuietTimeNote>> {
    CachedResource::new(
        mentee_notes_key(mentee_id),
        Ttl::For(ttls.quiet_time),
        Vec::new(),
    )
}

/// Keys `cache clear` removes when no key is given. The worship list itself
/// is never part of it.
pub(crate) fn is_cache_key(key: &str) -> bool {
    !key.ends_with("Timestamp")
        && (key == WEEKLY_SONGS_KEY
            || key == LOCATIONS_KEY
            || key == ANALYTICS_KEY
            || key == MY_NOTES_KEY
            || key == QUIET_TIME_STATS_KEY
            || key == MENTEES_KEY
            || key.starts_with("menteeNotes:")
            || key.starts_with("songs:")
            || key.starts_with("roster:")
            || key.starts_with("cached"))
}
