use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::cli::GlobalArgs;
use crate::http::RetryPolicy;

pub const DEFAULT_API_BASE_URL: &str = "https://api-uzrygaqa3a-uc.a.run.app/api";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub songs: Duration,
    pub roster: Duration,
    pub locations: Duration,
    pub analytics: Duration,
    pub quiet_time: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            songs: Duration::hours(1),
            roster: Duration::minutes(15),
            locations: Duration::hours(24),
            analytics: Duration::hours(1),
            quiet_time: Duration::minutes(15),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub token: Option<String>,
    pub retry: RetryPolicy,
    pub ttls: CacheTtls,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token: None,
            retry: RetryPolicy::default(),
            ttls: CacheTtls::default(),
        }
    }
}

impl Config {
    pub fn from_args(args: &GlobalArgs) -> Self {
        let mut config = Self::default();
        if let Some(url) = args.api_url.as_deref().map(str::trim)
            && !url.is_empty()
        {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        config.token = args
            .token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string);

        let ttls = &mut config.ttls;
        for (slot, minutes) in [
            (&mut ttls.songs, args.songs_ttl_mins),
            (&mut ttls.roster, args.roster_ttl_mins),
            (&mut ttls.locations, args.locations_ttl_mins),
            (&mut ttls.analytics, args.analytics_ttl_mins),
            (&mut ttls.quiet_time, args.quiet_time_ttl_mins),
        ] {
            if let Some(minutes) = minutes.filter(|minutes| *minutes >= 0) {
                *slot = Duration::minutes(minutes);
            }
        }

        if let Some(attempts) = args.http_attempts {
            config.retry.attempts = attempts.max(1);
        }
        if let Some(secs) = args.http_timeout_secs.filter(|secs| *secs > 0) {
            config.retry.read_timeout = StdDuration::from_secs(secs);
        }
        config
    }

    pub fn api_url(&self, endpoint: &str) -> String {
        let endpoint = endpoint.strip_prefix('/').unwrap_or(endpoint);
        format!("{}/{endpoint}", self.api_base_url)
    }
}
