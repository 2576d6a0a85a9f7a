use std::cmp::Ordering;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

const LOOKBACK_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RosterDay {
    #[serde(rename = "_id", default)]
    pub(crate) id: String,
    #[serde(rename = "Date")]
    pub(crate) date: String,
    #[serde(rename = "Lead/ Lyrics/ Posting", default)]
    pub(crate) lead: String,
    #[serde(rename = "Guitar", default)]
    pub(crate) guitar: String,
    #[serde(rename = "Bass", default)]
    pub(crate) bass: String,
    #[serde(rename = "Keyboard", default)]
    pub(crate) keyboard: String,
    #[serde(rename = "Drums", default)]
    pub(crate) drums: String,
    #[serde(rename = "Supporting Vocals", default)]
    pub(crate) supporting_vocals: String,
}

impl RosterDay {
    pub(crate) fn roles(&self) -> [(&'static str, &str); 6] {
        [
            ("Lead", self.lead.as_str()),
            ("Guitar", self.guitar.as_str()),
            ("Bass", self.bass.as_str()),
            ("Keys", self.keyboard.as_str()),
            ("Drums", self.drums.as_str()),
            ("Vocals", self.supporting_vocals.as_str()),
        ]
    }

    fn matches(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.date.to_lowercase().contains(needle)
            || self
                .roles()
                .iter()
                .any(|(_, name)| name.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Location {
    pub(crate) id: String,
    pub(crate) name: String,
    #[serde(rename = "type", default)]
    pub(crate) kind: String,
}

pub(crate) fn role_display(name: &str) -> &str {
    let trimmed = name.trim();
    if trimmed.is_empty() { "TBD" } else { trimmed }
}

/// Parses roster dates such as `5th January 2025` or `21st March 2024`.
pub(crate) fn parse_roster_date(raw: &str) -> Option<NaiveDate> {
    let mut parts = raw.split_whitespace();
    let day = parts.next()?;
    let month = parts.next()?;
    let year = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let day = day
        .trim_end_matches(|ch: char| ch.is_ascii_alphabetic())
        .trim_end_matches(',');
    let day = day.parse::<u32>().ok()?;
    NaiveDate::parse_from_str(&format!("{day} {month} {year}"), "%d %B %Y").ok()
}

/// Days from the last 30 days onward matching `query`, Sundays first and
/// each group in date order. Days with unreadable dates are dropped.
pub(crate) fn visible_days(days: &[RosterDay], query: &str, today: NaiveDate) -> Vec<RosterDay> {
    let cutoff = today - Duration::days(LOOKBACK_DAYS);
    let needle = query.trim().to_lowercase();

    let mut visible: Vec<(NaiveDate, RosterDay)> = days
        .iter()
        .filter_map(|day| {
            let date = parse_roster_date(&day.date)?;
            (date >= cutoff && day.matches(&needle)).then(|| (date, day.clone()))
        })
        .collect();
    visible.sort_by(|(left, _), (right, _)| compare_sunday_first(*left, *right));
    visible.into_iter().map(|(_, day)| day).collect()
}

fn compare_sunday_first(left: NaiveDate, right: NaiveDate) -> Ordering {
    let left_sunday = left.weekday() == Weekday::Sun;
    let right_sunday = right.weekday() == Weekday::Sun;
    right_sunday.cmp(&left_sunday).then_with(|| left.cmp(&right))
}

pub(crate) fn copy_text(day: &RosterDay) -> String {
    let mut text = format!("Worship Team Roster - {}\n\n", day.date);
    for (label, name) in day.roles() {
        text.push_str(&format!("{label}: {}\n", role_display(name)));
    }
    text
}
