/// Configuration module for managing environment variables and API keys
///
/// This module loads and validates all required configuration values from
/// environment variables (typically from a .env file). Keyword and search
/// term lists are comma-separated; keywords are lowercased at load time
/// because the classifier matches against lowercased text.

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer token for the Twitter/X API v2
    pub bearer_token: String,

    /// The bot's own screen name (without the leading @)
    pub screen_name: String,

    /// Keywords that mark a post as asking for a follow
    pub follow_keywords: Vec<String>,

    /// Keywords that mark a post as asking for a re-share
    pub retweet_keywords: Vec<String>,

    /// Keywords that ask for both at once (e.g. "rt+follow")
    pub combined_keywords: Vec<String>,

    /// Terms to run the periodic search against
    pub search_terms: Vec<String>,

    /// Result count requested per search term
    pub search_count: u32,

    /// Maximum follow+re-share actions per day
    pub daily_action_limit: u32,

    /// Maximum candidates processed per post cycle
    pub hourly_action_cap: u32,

    /// Ceiling on accounts the bot follows before unfollow maintenance kicks in
    pub max_following: u32,

    /// Seconds between search cycles
    pub search_interval_secs: u64,

    /// Seconds between post cycles
    pub post_interval_secs: u64,

    /// Seconds between day-reset cycles
    pub day_interval_secs: u64,

    /// Self-throttle sleep between consecutive follow+re-share pairs
    pub inter_action_delay_secs: u64,

    /// Self-throttle sleep between consecutive unfollow calls
    pub unfollow_delay_secs: u64,

    /// Grace period before the first post cycle, so the first search
    /// has time to populate the queue
    pub post_start_delay_secs: u64,

    /// Number of accounts removed per unfollow maintenance pass
    pub unfollow_batch_size: usize,

    /// Port for the HTTP status server
    pub status_port: u16,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if any required environment variable is missing
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        Ok(Config {
            bearer_token: env::var("TWITTER_BEARER_TOKEN")
                .context("TWITTER_BEARER_TOKEN must be set")?,

            screen_name: env::var("SCREEN_NAME")
                .context("SCREEN_NAME must be set")?,

            follow_keywords: list_var("FOLLOW_KEYWORDS", "#follow,follow,following"),
            retweet_keywords: list_var("RETWEET_KEYWORDS", "#rt,#retweet,retweet,rt"),
            combined_keywords: list_var("COMBINED_KEYWORDS", "rt+follow,rt/follow"),
            search_terms: list_var("SEARCH_TERMS", "#giveaway,giveaway"),

            search_count: parsed_var("SEARCH_COUNT", 40),
            daily_action_limit: parsed_var("DAILY_ACTION_LIMIT", 2400),
            hourly_action_cap: parsed_var("HOURLY_ACTION_CAP", 25),
            max_following: parsed_var("MAX_FOLLOWING", 1500),

            search_interval_secs: parsed_var("SEARCH_INTERVAL_SECS", 3600),
            post_interval_secs: parsed_var("POST_INTERVAL_SECS", 3600),
            day_interval_secs: parsed_var("DAY_INTERVAL_SECS", 86400),
            inter_action_delay_secs: parsed_var("INTER_ACTION_DELAY_SECS", 90),
            unfollow_delay_secs: parsed_var("UNFOLLOW_DELAY_SECS", 3),
            post_start_delay_secs: parsed_var("POST_START_DELAY_SECS", 15),
            unfollow_batch_size: parsed_var("UNFOLLOW_BATCH_SIZE", 25),

            status_port: env::var("STATUS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| {
                    // Default to PORT env var (Railway/Fly.io) or 8080
                    env::var("PORT")
                        .ok()
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(8080)
                }),
        })
    }
}

/// Parse a comma-separated list variable, lowercasing and trimming each entry
fn list_var(name: &str, default: &str) -> Vec<String> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a numeric variable, falling back to the default on absence or garbage
fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
impl Config {
    /// A config with the stock keyword sets, generous limits, and zero
    /// delays so cycle tests run instantly. Tests tweak fields as needed.
    pub(crate) fn for_tests() -> Self {
        Config {
            bearer_token: "test-token".to_string(),
            screen_name: "sweeper_bot".to_string(),
            follow_keywords: vec!["#follow".into(), "follow".into(), "following".into()],
            retweet_keywords: vec!["#rt".into(), "#retweet".into(), "retweet".into(), "rt".into()],
            combined_keywords: vec!["rt+follow".into(), "rt/follow".into()],
            search_terms: vec!["#giveaway".into(), "giveaway".into()],
            search_count: 40,
            daily_action_limit: 2400,
            hourly_action_cap: 25,
            max_following: 1500,
            search_interval_secs: 3600,
            post_interval_secs: 3600,
            day_interval_secs: 86400,
            inter_action_delay_secs: 0,
            unfollow_delay_secs: 0,
            post_start_delay_secs: 0,
            unfollow_batch_size: 25,
            status_port: 0,
        }
    }
}
