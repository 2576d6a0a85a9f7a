use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;
use crate::http::{HttpError, Request, get_bytes_with_retries, get_text_with_retries};

use super::analytics::MemberMetrics;
use super::catalog::{Song, SongCategory, WeeklySong};
use super::quiet_time::{Mentee, QuietTimeNote, QuietTimeStats};
use super::roster::{Location, RosterDay};

// The API sits behind an ngrok tunnel in some deployments.
const NGROK_HEADER: (&str, &str) = ("ngrok-skip-browser-warning", "69420");
const ROSTER_LIMIT: &str = "1000";

#[derive(Debug, Error)]
pub(crate) enum ApiError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("unexpected response from {endpoint}: {detail}")]
    Unexpected {
        endpoint: &'static str,
        detail: String,
    },
    #[error("{endpoint} needs a sign-in token (pass --token or set WORSHIPLIST_TOKEN)")]
    MissingToken { endpoint: &'static str },
}

/// Blocking client for the worship-team API. Cheap to clone so a copy can be
/// moved into a worker thread.
#[derive(Debug, Clone)]
pub(crate) struct ApiClient {
    config: Config,
}

impl ApiClient {
    pub(crate) fn new(config: Config) -> Self {
        Self { config }
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    fn get_text(&self, url: &str, bearer: Option<&str>) -> Result<String, ApiError> {
        let mut request = Request::get(url).header(NGROK_HEADER.0, NGROK_HEADER.1);
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        Ok(get_text_with_retries(&request, &self.config.retry)?)
    }

    fn require_token(&self, endpoint: &'static str) -> Result<&str, ApiError> {
        self.config
            .token
            .as_deref()
            .ok_or(ApiError::MissingToken { endpoint })
    }

    pub(crate) fn songs_by_category(&self, category: SongCategory) -> Result<Vec<Song>, ApiError> {
        let url = self
            .config
            .api_url(&format!("getSongsByCategory/{}", category.api_name()));
        let raw = self.get_text(&url, None)?;
        parse_songs(&raw)
    }

    pub(crate) fn weekly_songs(&self) -> Result<Vec<WeeklySong>, ApiError> {
        let raw = self.get_text(&self.config.api_url("getSongs"), None)?;
        parse_weekly_songs(&raw)
    }

    pub(crate) fn roster(&self, location: &str) -> Result<Vec<RosterDay>, ApiError> {
        let url = self.config.api_url(&format!("getRoster/{}", location.trim()));
        let request = Request::get(&url)
            .header(NGROK_HEADER.0, NGROK_HEADER.1)
            .query("limit", ROSTER_LIMIT);
        let raw = get_text_with_retries(&request, &self.config.retry)?;
        parse_roster(&raw)
    }

    pub(crate) fn locations(&self) -> Result<Vec<Location>, ApiError> {
        let token = self.require_token("getLocationSummary")?;
        let raw = self.get_text(&self.config.api_url("getLocationSummary"), Some(token))?;
        parse_locations(&raw)
    }

    pub(crate) fn member_analytics(&self) -> Result<Vec<MemberMetrics>, ApiError> {
        let token = self.require_token("member-analytics")?;
        let raw = self.get_text(&self.config.api_url("member-analytics"), Some(token))?;
        parse_member_analytics(&raw)
    }

    pub(crate) fn my_notes(&self) -> Result<Vec<QuietTimeNote>, ApiError> {
        let raw = self.get_authorized("getMyNotes")?;
        parse_notes(&raw, "getMyNotes")
    }

    pub(crate) fn quiet_time_stats(&self) -> Result<QuietTimeStats, ApiError> {
        let raw = self.get_authorized("getStats")?;
        parse_quiet_time_stats(&raw)
    }

    pub(crate) fn mentees(&self) -> Result<Vec<Mentee>, ApiError> {
        let raw = self.get_authorized("getMentees")?;
        parse_mentees(&raw)
    }

    pub(crate) fn mentee_notes(&self, mentee_id: &str) -> Result<Vec<QuietTimeNote>, ApiError> {
        let token = self.require_token("getMenteeNotes")?;
        let url = self
            .config
            .api_url(&format!("getMenteeNotes/{}", mentee_id.trim()));
        let raw = self.get_text(&url, Some(token))?;
        parse_notes(&raw, "getMenteeNotes")
    }

    fn get_authorized(&self, endpoint: &'static str) -> Result<String, ApiError> {
        let token = self.require_token(endpoint)?;
        self.get_text(&self.config.api_url(endpoint), Some(token))
    }

    pub(crate) fn blob(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let request = Request::get(url);
        Ok(get_bytes_with_retries(&request, &self.config.retry)?)
    }
}

fn parse_json(raw: &str, endpoint: &'static str) -> Result<Value, ApiError> {
    serde_json::from_str(raw).map_err(|err| ApiError::Unexpected {
        endpoint,
        detail: format!("invalid json: {err}"),
    })
}

/// Accepts both `{ "data": [...] }` envelopes and bare arrays.
fn data_array<'v>(value: &'v Value, endpoint: &'static str) -> Result<&'v Vec<Value>, ApiError> {
    value
        .get("data")
        .and_then(Value::as_array)
        .or_else(|| value.as_array())
        .ok_or_else(|| ApiError::Unexpected {
            endpoint,
            detail: "expected a list of records".to_string(),
        })
}

fn parse_entries<T: DeserializeOwned>(entries: &[Value]) -> Vec<T> {
    entries
        .iter()
        .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
        .collect()
}

pub(crate) fn parse_songs(raw: &str) -> Result<Vec<Song>, ApiError> {
    let parsed = parse_json(raw, "getSongsByCategory")?;
    let entries = data_array(&parsed, "getSongsByCategory")?;
    Ok(parse_entries::<Song>(entries)
        .into_iter()
        .filter_map(|song| {
            let title = song.title.trim();
            let song_id = song.song_id.trim();
            if title.is_empty() || song_id.is_empty() {
                return None;
            }
            Some(Song {
                title: title.to_string(),
                song_id: song_id.to_string(),
            })
        })
        .collect())
}

pub(crate) fn parse_weekly_songs(raw: &str) -> Result<Vec<WeeklySong>, ApiError> {
    let parsed = parse_json(raw, "getSongs")?;
    let entries = data_array(&parsed, "getSongs")?;
    Ok(parse_entries(entries))
}

pub(crate) fn parse_roster(raw: &str) -> Result<Vec<RosterDay>, ApiError> {
    let parsed = parse_json(raw, "getRoster")?;
    let entries = data_array(&parsed, "getRoster")?;
    Ok(parse_entries(entries))
}

pub(crate) fn parse_locations(raw: &str) -> Result<Vec<Location>, ApiError> {
    let parsed = parse_json(raw, "getLocationSummary")?;
    if parsed.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(ApiError::Unexpected {
            endpoint: "getLocationSummary",
            detail: "server reported failure".to_string(),
        });
    }
    let entries = data_array(&parsed, "getLocationSummary")?;
    Ok(parse_entries(entries))
}

pub(crate) fn parse_member_analytics(raw: &str) -> Result<Vec<MemberMetrics>, ApiError> {
    let parsed = parse_json(raw, "member-analytics")?;
    let entries = data_array(&parsed, "member-analytics")?;
    Ok(parse_entries(entries))
}

pub(crate) fn parse_notes(
    raw: &str,
    endpoint: &'static str,
) -> Result<Vec<QuietTimeNote>, ApiError> {
    let parsed = parse_json(raw, endpoint)?;
    let entries = data_array(&parsed, endpoint)?;
    Ok(parse_entries(entries))
}

pub(crate) fn parse_mentees(raw: &str) -> Result<Vec<Mentee>, ApiError> {
    let parsed = parse_json(raw, "getMentees")?;
    Ok(parse_entries(data_array(&parsed, "getMentees")?))
}

/// `getStats` answers with a bare object, sometimes wrapped in `data`.
pub(crate) fn parse_quiet_time_stats(raw: &str) -> Result<QuietTimeStats, ApiError> {
    let parsed = parse_json(raw, "getStats")?;
    let stats = parsed.get("data").unwrap_or(&parsed);
    if !stats.is_object() {
        return Err(ApiError::Unexpected {
            endpoint: "getStats",
            detail: "expected a stats object".to_string(),
        });
    }
    serde_json::from_value(stats.clone()).map_err(|err| ApiError::Unexpected {
        endpoint: "getStats",
        detail: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_songs_trims_and_skips_incomplete_entries() {
        let raw = r#"[
            {"songName":" Way Maker ","youtubeId":"abc"},
            {"songName":"No id"},
            {"songName":"","youtubeId":"blank"},
            {"songName":"Goodness of God","youtubeId":"xyz","category":"Praise"}
        ]"#;
        let songs = parse_songs(raw).expect("songs should parse");
        let ids: Vec<&str> = songs.iter().map(|song| song.song_id.as_str()).collect();
        assert_eq!(ids, vec!["abc", "xyz"]);
        assert_eq!(songs[0].title, "Way Maker");
    }

    #[test]
    fn parse_weekly_songs_reads_data_envelope() {
        let raw = r#"{"data":[{"songName":"Way Maker","link":"https://example.test/wm.pdf"}]}"#;
        let songs = parse_weekly_songs(raw).expect("weekly songs should parse");
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].link, "https://example.test/wm.pdf");
    }

    #[test]
    fn parse_roster_accepts_envelope_or_bare_array() {
        let day = r#"{"_id":"1","Date":"5th January 2025","Guitar":"Ben"}"#;
        let enveloped = parse_roster(&format!("{{\"data\":[{day}]}}")).expect("enveloped");
        let bare = parse_roster(&format!("[{day}]")).expect("bare");
        assert_eq!(enveloped, bare);
        assert_eq!(bare[0].guitar, "Ben");
    }

    #[test]
    fn parse_roster_rejects_non_list_payloads() {
        let err = parse_roster(r#"{"message":"oops"}"#).expect_err("object is not a roster");
        assert!(err.to_string().contains("getRoster"), "unexpected error: {err}");
        assert!(parse_roster("<html>").is_err());
    }

    #[test]
    fn parse_locations_honors_success_flag() {
        let ok = r#"{"success":true,"data":[{"id":"studio","name":"Studio","type":"main"}]}"#;
        let locations = parse_locations(ok).expect("locations should parse");
        assert_eq!(locations[0].kind, "main");

        let failed = r#"{"success":false,"data":[]}"#;
        assert!(parse_locations(failed).is_err());
    }

    #[test]
    fn protected_endpoints_require_a_token() {
        let client = ApiClient::new(Config::default());
        let err = client.member_analytics().expect_err("no token configured");
        assert!(matches!(err, ApiError::MissingToken { .. }));
        assert!(matches!(
            client.my_notes(),
            Err(ApiError::MissingToken { endpoint: "getMyNotes" })
        ));
        assert!(matches!(
            client.mentee_notes("m1"),
            Err(ApiError::MissingToken { .. })
        ));
    }

    #[test]
    fn parse_notes_skips_entries_of_the_wrong_shape() {
        let raw = r#"[
            {"_id":"n1","note":"Psalm 23","date":"2025-03-09T06:00:00Z"},
            "not a note",
            {"_id":"n2","note":"John 15","date":"2025-03-08T06:00:00Z","userId":{"name":"Grace"}}
        ]"#;
        let notes = parse_notes(raw, "getMenteeNotes").expect("notes should parse");
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[1].author_name(), Some("Grace"));
    }

    #[test]
    fn parse_mentees_requires_an_id() {
        let raw = r#"{"data":[
            {"_id":"m1","name":"Grace","currentStreak":4,"lastQuietTime":"2025-03-09T06:00:00Z"},
            {"name":"No id"}
        ]}"#;
        let mentees = parse_mentees(raw).expect("mentees should parse");
        assert_eq!(mentees.len(), 1);
        assert_eq!(mentees[0].current_streak, 4);
    }

    #[test]
    fn parse_quiet_time_stats_accepts_bare_or_enveloped_object() {
        let bare = parse_quiet_time_stats(r#"{"currentStreak":3,"longestStreak":9}"#)
            .expect("bare stats");
        let enveloped = parse_quiet_time_stats(r#"{"data":{"currentStreak":3,"longestStreak":9}}"#)
            .expect("enveloped stats");
        assert_eq!(bare, enveloped);
        assert_eq!(bare.longest_streak, 9);
        assert!(parse_quiet_time_stats("[]").is_err());
    }
}
