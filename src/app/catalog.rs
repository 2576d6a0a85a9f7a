use std::fmt;
use std::str::FromStr;

use anyhow::{Error, anyhow};
use serde::{Deserialize, Serialize};

use super::selection::SelectedSong;

pub(crate) const SONGS_PER_PAGE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum SongCategory {
    Praise,
    Worship,
    Transitional,
}

impl SongCategory {
    pub(crate) const ALL: [SongCategory; 3] = [Self::Praise, Self::Worship, Self::Transitional];

    /// Path segment used by the songs-by-category endpoint.
    pub(crate) fn api_name(self) -> &'static str {
        match self {
            Self::Praise => "Praise",
            Self::Worship => "Worship",
            Self::Transitional => "Transitional",
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Praise => "Praise Songs",
            Self::Worship => "Core Worship",
            Self::Transitional => "Transitional Songs",
        }
    }

    pub(crate) fn cache_key(self) -> String {
        format!("songs:{}", self.api_name())
    }

    pub(crate) fn next(self) -> Self {
        match self {
            Self::Praise => Self::Worship,
            Self::Worship => Self::Transitional,
            Self::Transitional => Self::Praise,
        }
    }

    pub(crate) fn previous(self) -> Self {
        match self {
            Self::Praise => Self::Transitional,
            Self::Worship => Self::Praise,
            Self::Transitional => Self::Worship,
        }
    }
}

impl fmt::Display for SongCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SongCategory {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "praise" => Ok(Self::Praise),
            "worship" | "core" | "coreworship" | "core-worship" => Ok(Self::Worship),
            "transitional" | "transition" => Ok(Self::Transitional),
            other => Err(anyhow!(
                "unknown song category '{other}' (expected praise, worship or transitional)"
            )),
        }
    }
}

/// Catalog entry as served by the songs-by-category endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Song {
    #[serde(rename = "songName")]
    pub(crate) title: String,
    #[serde(rename = "youtubeId")]
    pub(crate) song_id: String,
}

impl From<&Song> for SelectedSong {
    fn from(song: &Song) -> Self {
        SelectedSong::new(song.song_id.clone(), song.title.clone())
    }
}

/// Weekly song with a chord sheet link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct WeeklySong {
    #[serde(rename = "songName")]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) link: String,
}

pub(crate) fn filter_songs<'s>(songs: &'s [Song], query: &str) -> Vec<&'s Song> {
    let needle = query.trim().to_lowercase();
    songs
        .iter()
        .filter(|song| needle.is_empty() || song.title.to_lowercase().contains(&needle))
        .collect()
}

/// Returns the items of a 1-based page and the total page count.
pub(crate) fn page<T>(items: &[T], page: usize, per_page: usize) -> (&[T], usize) {
    let per_page = per_page.max(1);
    let total_pages = items.len().div_ceil(per_page);
    let page = page.max(1);
    let start = (page - 1).saturating_mul(per_page).min(items.len());
    let end = (start + per_page).min(items.len());
    (&items[start..end], total_pages)
}
