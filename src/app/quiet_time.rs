use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A mentee quiet for this many days needs a check-in.
const ATTENTION_AFTER_DAYS: i64 = 3;
const EXCELLENT_STREAK: u32 = 7;

/// `userId` is a bare id on the member's own notes and a populated member on
/// mentee notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum NoteAuthor {
    Member {
        #[serde(default)]
        name: String,
    },
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct QuietTimeNote {
    #[serde(rename = "_id", default)]
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) note: String,
    #[serde(default)]
    pub(crate) date: String,
    #[serde(rename = "imageUrl", default)]
    pub(crate) image_url: Option<String>,
    #[serde(rename = "userId", default)]
    pub(crate) author: Option<NoteAuthor>,
}

impl QuietTimeNote {
    pub(crate) fn author_name(&self) -> Option<&str> {
        match &self.author {
            Some(NoteAuthor::Member { name }) if !name.trim().is_empty() => Some(name.trim()),
            _ => None,
        }
    }

    pub(crate) fn has_image(&self) -> bool {
        self.image_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct QuietTimeStats {
    pub(crate) current_streak: u32,
    pub(crate) longest_streak: u32,
    pub(crate) total_quiet_times: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Mentee {
    #[serde(rename = "_id")]
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) email: String,
    #[serde(default)]
    pub(crate) current_streak: u32,
    #[serde(default)]
    pub(crate) longest_streak: u32,
    #[serde(default)]
    pub(crate) total_quiet_times: u32,
    #[serde(default)]
    pub(crate) last_quiet_time: Option<String>,
    #[serde(default)]
    pub(crate) days_since_mentor: Option<f64>,
}

impl Mentee {
    fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_quiet_time.as_deref().and_then(parse_timestamp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreakStatus {
    Excellent,
    Good,
    NeedsAttention,
}

impl StreakStatus {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::NeedsAttention => "needs attention",
        }
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

/// `Mar 9, 2025` for ISO timestamps; anything else is shown as sent.
pub(crate) fn note_date_display(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(date) => date.format("%b %-d, %Y").to_string(),
        None => raw.trim().to_string(),
    }
}

pub(crate) fn streak_status(mentee: &Mentee, now: DateTime<Utc>) -> StreakStatus {
    let quiet_days = mentee
        .last_activity()
        .map(|last| now.signed_duration_since(last).num_days());
    match quiet_days {
        None => StreakStatus::NeedsAttention,
        Some(days) if days >= ATTENTION_AFTER_DAYS => StreakStatus::NeedsAttention,
        Some(_) if mentee.current_streak >= EXCELLENT_STREAK => StreakStatus::Excellent,
        Some(_) => StreakStatus::Good,
    }
}

pub(crate) fn notes_per_week(mentee: &Mentee) -> f64 {
    if mentee.total_quiet_times == 0 {
        return 0.0;
    }
    let days = mentee
        .days_since_mentor
        .filter(|days| *days > 0.0)
        .unwrap_or(1.0);
    (f64::from(mentee.total_quiet_times) / days * 7.0 * 10.0).round() / 10.0
}

/// Most recently active first; mentees with no activity go last.
pub(crate) fn sort_by_activity(mentees: &mut [Mentee]) {
    mentees.sort_by(|left, right| match (left.last_activity(), right.last_activity()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
