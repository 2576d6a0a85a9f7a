use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "worshiplist",
    version,
    about = "Build worship lists and browse songs, rosters and team analytics"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Base URL of the worship-team API.
    #[arg(long, global = true, env = "WORSHIPLIST_API_URL")]
    pub api_url: Option<String>,

    /// Bearer token for endpoints that need a signed-in member.
    #[arg(long, global = true, env = "WORSHIPLIST_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Minutes song catalogs stay fresh.
    #[arg(long, global = true, env = "WORSHIPLIST_SONGS_TTL")]
    pub songs_ttl_mins: Option<i64>,

    /// Minutes a roster stays fresh.
    #[arg(long, global = true, env = "WORSHIPLIST_ROSTER_TTL")]
    pub roster_ttl_mins: Option<i64>,

    /// Minutes the location list stays fresh.
    #[arg(long, global = true, env = "WORSHIPLIST_LOCATIONS_TTL")]
    pub locations_ttl_mins: Option<i64>,

    /// Minutes member analytics stay fresh.
    #[arg(long, global = true, env = "WORSHIPLIST_ANALYTICS_TTL")]
    pub analytics_ttl_mins: Option<i64>,

    /// Minutes quiet-time notes and stats stay fresh.
    #[arg(long, global = true, env = "WORSHIPLIST_QUIET_TIME_TTL")]
    pub quiet_time_ttl_mins: Option<i64>,

    /// Attempts per request before giving up.
    #[arg(long, global = true, env = "WORSHIPLIST_HTTP_ATTEMPTS")]
    pub http_attempts: Option<usize>,

    /// Seconds to wait for a response body.
    #[arg(long, global = true, env = "WORSHIPLIST_HTTP_TIMEOUT")]
    pub http_timeout_secs: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive worship list builder.
    Tui,
    /// Browse songs of a category (praise, worship, transitional).
    Songs {
        category: String,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Add a song to the worship list, or remove it if already listed.
    Add { song_id: String, title: String },
    /// Remove a song from the worship list.
    Remove { song_id: String },
    /// Move the song at one position to another (1-based).
    Move { from: usize, to: usize },
    /// Empty the worship list.
    Clear,
    /// Print the worship list.
    List,
    /// Songs with chord sheets for the coming week.
    Weekly,
    /// Roster for a location.
    Roster {
        #[arg(default_value = "studio")]
        location: String,
        #[arg(long)]
        search: Option<String>,
    },
    /// Roster locations.
    Locations,
    /// Member analytics.
    Analytics,
    /// Quiet-time streaks and notes for the signed-in member.
    QuietTime {
        /// List mentees with their streak status instead.
        #[arg(long, conflicts_with = "mentee")]
        mentees: bool,
        /// Show the notes of one mentee by id.
        #[arg(long)]
        mentee: Option<String>,
    },
    /// Generate the worship announcement for the current list.
    Message {
        #[arg(long)]
        theme: String,
        /// Scripture reference, e.g. "Psalm 100:4".
        #[arg(long)]
        reference: String,
        /// Scripture text to quote.
        #[arg(long)]
        verse: String,
    },
    /// Cache an image blob until it is cleared.
    Hero {
        url: String,
        #[arg(long, default_value = "cachedListImage")]
        key: String,
        #[arg(long)]
        out: Option<std::path::PathBuf>,
        /// Download again even when the image is cached.
        #[arg(long)]
        refresh: bool,
    },
    /// Inspect or clear cached entries.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// List stored keys.
    Keys,
    /// Clear one cached resource, or every cached resource when no key is given.
    Clear { key: Option<String> },
}
