/// Platform Client
///
/// The interface the periodic tasks consume, plus the real Twitter/X API v2
/// implementation. Every call is a thin bearer-authenticated HTTP request;
/// failures come back as errors for the calling task to log and skip.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::Config;
use crate::state::Candidate;

const API_BASE: &str = "https://api.twitter.com/2";

/// The bot's own profile, as far as the core cares
#[derive(Debug, Clone)]
pub struct Profile {
    pub following_count: u32,
}

/// External platform operations the task cycles depend on.
/// Object-safe so the tasks can run against a mock in tests.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Search recent posts for a term, returning up to `count` candidates
    async fn search(&self, term: &str, count: u32) -> Result<Vec<Candidate>>;

    /// Follow the account behind a handle
    async fn follow(&self, author: &str) -> Result<()>;

    /// Unfollow an account by platform user id
    async fn unfollow(&self, user_id: &str) -> Result<()>;

    /// Re-share a piece of content by id
    async fn repost(&self, content_id: &str) -> Result<()>;

    /// Ordered list of user ids the account currently follows
    async fn list_following(&self, account: &str) -> Result<Vec<String>>;

    /// Profile lookup, used to resync the following count
    async fn profile(&self, account: &str) -> Result<Profile>;
}

// --- Twitter API v2 response shapes ---

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Option<Vec<ApiTweet>>,
    includes: Option<ApiIncludes>,
}

#[derive(Debug, Deserialize)]
struct ApiTweet {
    id: String,
    text: String,
    author_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiIncludes {
    users: Option<Vec<ApiUser>>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    data: Option<ApiUserDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiUserDetail {
    id: String,
    #[allow(dead_code)]
    username: Option<String>,
    public_metrics: Option<ApiUserMetrics>,
}

#[derive(Debug, Deserialize)]
struct ApiUserMetrics {
    following_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct FollowingResponse {
    data: Option<Vec<ApiUser>>,
}

/// Twitter/X API v2 client using Bearer Token authentication.
///
/// The write endpoints (follow, unfollow, retweet) are only accepted under
/// OAuth user context, so TWITTER_BEARER_TOKEN must be a user-context
/// token, not an app-only one — with an app-only token every write call
/// comes back 403.
pub struct TwitterClient {
    http: reqwest::Client,
    bearer_token: String,
    /// The bot's own user id, resolved once at startup
    user_id: String,
}

impl TwitterClient {
    /// Build the HTTP client and resolve the bot's own user id.
    ///
    /// A failure here means bad credentials or no connectivity and is
    /// fatal at startup.
    pub async fn connect(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let mut client = Self {
            http,
            bearer_token: config.bearer_token.trim().to_string(),
            user_id: String::new(),
        };

        let detail = client
            .lookup_user(&config.screen_name)
            .await
            .context("Credential check failed (could not look up own account)")?;
        client.user_id = detail.id;

        log::info!(
            "Authenticated against platform as @{} (user id {})",
            config.screen_name,
            client.user_id
        );
        Ok(client)
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .header("Authorization", format!("Bearer {}", self.bearer_token))
    }

    async fn lookup_user(&self, account: &str) -> Result<ApiUserDetail> {
        let url = format!("{}/users/by/username/{}", API_BASE, account);
        let response = self
            .get(&url)
            .query(&[("user.fields", "public_metrics")])
            .send()
            .await
            .context("User lookup request failed")?;

        let response = check_status(response).await?;
        let body: UserResponse = response
            .json()
            .await
            .context("Failed to parse user lookup response")?;
        body.data
            .with_context(|| format!("No user data returned for @{}", account))
    }
}

/// Map non-success statuses to readable errors and log rate-limit headers
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    if let Some(remaining) = response
        .headers()
        .get("x-rate-limit-remaining")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<u32>().ok())
    {
        log::debug!("Platform rate limit: {} requests remaining", remaining);
        if remaining < 5 {
            log::warn!("Low platform rate limit remaining ({})", remaining);
        }
    }

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = match status.as_u16() {
        401 => format!("Unauthorized (401): invalid or expired bearer token. {}", text),
        403 => format!(
            "Forbidden (403): token lacks access to this endpoint. {}",
            text
        ),
        429 => format!("Rate Limited (429): too many requests. {}", text),
        _ => format!("Platform API error: {} - {}", status, text),
    };
    anyhow::bail!("{}", message)
}

#[async_trait]
impl PlatformClient for TwitterClient {
    async fn search(&self, term: &str, count: u32) -> Result<Vec<Candidate>> {
        let url = format!("{}/tweets/search/recent", API_BASE);
        // The endpoint accepts 10..=100 results per page
        let max_results = count.clamp(10, 100).to_string();
        let query = format!("{} -is:retweet", term);

        log::debug!("Searching for {:?} (max {})", term, max_results);

        let response = self
            .get(&url)
            .query(&[
                ("query", query.as_str()),
                ("max_results", max_results.as_str()),
                ("tweet.fields", "author_id"),
                ("expansions", "author_id"),
                ("user.fields", "username"),
            ])
            .send()
            .await
            .context("Search request failed")?;

        let response = check_status(response).await?;
        let body: SearchResponse = response
            .json()
            .await
            .context("Failed to parse search response")?;

        // Map expanded author ids to handles
        let users: HashMap<String, String> = body
            .includes
            .and_then(|i| i.users)
            .unwrap_or_default()
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect();

        let candidates = body
            .data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|tweet| {
                let author = tweet
                    .author_id
                    .as_ref()
                    .and_then(|id| users.get(id).cloned())
                    .or_else(|| author_from_text(&tweet.text))?;
                Some(Candidate {
                    id: tweet.id,
                    author,
                    text: tweet.text,
                })
            })
            .collect();

        Ok(candidates)
    }

    async fn follow(&self, author: &str) -> Result<()> {
        let target = self
            .lookup_user(author)
            .await
            .with_context(|| format!("Could not resolve @{}", author))?;

        let url = format!("{}/users/{}/following", API_BASE, self.user_id);
        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.bearer_token))
            .json(&serde_json::json!({ "target_user_id": target.id }))
            .send()
            .await
            .context("Follow request failed")?;

        check_status(response).await?;
        Ok(())
    }

    async fn unfollow(&self, user_id: &str) -> Result<()> {
        let url = format!("{}/users/{}/following/{}", API_BASE, self.user_id, user_id);
        let response = self
            .http
            .delete(&url)
            .header("Authorization", format!("Bearer {}", self.bearer_token))
            .send()
            .await
            .context("Unfollow request failed")?;

        check_status(response).await?;
        Ok(())
    }

    async fn repost(&self, content_id: &str) -> Result<()> {
        let url = format!("{}/users/{}/retweets", API_BASE, self.user_id);
        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.bearer_token))
            .json(&serde_json::json!({ "tweet_id": content_id }))
            .send()
            .await
            .context("Repost request failed")?;

        check_status(response).await?;
        Ok(())
    }

    async fn list_following(&self, account: &str) -> Result<Vec<String>> {
        let detail = self.lookup_user(account).await?;
        let url = format!("{}/users/{}/following", API_BASE, detail.id);
        let response = self
            .get(&url)
            .query(&[("max_results", "1000")])
            .send()
            .await
            .context("Following list request failed")?;

        let response = check_status(response).await?;
        let body: FollowingResponse = response
            .json()
            .await
            .context("Failed to parse following list response")?;

        Ok(body
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|u| u.id)
            .collect())
    }

    async fn profile(&self, account: &str) -> Result<Profile> {
        let detail = self.lookup_user(account).await?;
        let following_count = detail
            .public_metrics
            .and_then(|m| m.following_count)
            .unwrap_or(0);
        Ok(Profile { following_count })
    }
}

/// Fallback author extraction from a "@user: ..." salutation, for search
/// results whose author expansion is missing
fn author_from_text(text: &str) -> Option<String> {
    let at = text.find('@')?;
    let rest = &text[at + 1..];
    let colon = rest.find(':')?;
    let handle = rest[..colon].trim();
    if handle.is_empty() {
        None
    } else {
        Some(handle.to_string())
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scriptable in-memory platform for exercising the task cycles.

    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockPlatform {
        /// Canned search results per term
        pub results: HashMap<String, Vec<Candidate>>,
        /// Terms whose search call should fail
        pub fail_search: HashSet<String>,
        pub fail_follow: bool,
        pub fail_repost: bool,
        pub fail_profile: bool,
        /// What `list_following` returns
        pub following_ids: Vec<String>,
        /// What `profile` reports
        pub profile_following: u32,

        pub searches: Mutex<Vec<String>>,
        pub follows: Mutex<Vec<String>>,
        pub reposts: Mutex<Vec<String>>,
        pub unfollows: Mutex<Vec<String>>,
    }

    impl MockPlatform {
        pub fn with_results(results: HashMap<String, Vec<Candidate>>) -> Self {
            Self {
                results,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl PlatformClient for MockPlatform {
        async fn search(&self, term: &str, _count: u32) -> Result<Vec<Candidate>> {
            self.searches.lock().unwrap().push(term.to_string());
            if self.fail_search.contains(term) {
                anyhow::bail!("search for {:?} blew up", term);
            }
            Ok(self.results.get(term).cloned().unwrap_or_default())
        }

        async fn follow(&self, author: &str) -> Result<()> {
            if self.fail_follow {
                anyhow::bail!("follow rejected");
            }
            self.follows.lock().unwrap().push(author.to_string());
            Ok(())
        }

        async fn unfollow(&self, user_id: &str) -> Result<()> {
            self.unfollows.lock().unwrap().push(user_id.to_string());
            Ok(())
        }

        async fn repost(&self, content_id: &str) -> Result<()> {
            if self.fail_repost {
                anyhow::bail!("repost rejected");
            }
            self.reposts.lock().unwrap().push(content_id.to_string());
            Ok(())
        }

        async fn list_following(&self, _account: &str) -> Result<Vec<String>> {
            Ok(self.following_ids.clone())
        }

        async fn profile(&self, _account: &str) -> Result<Profile> {
            if self.fail_profile {
                anyhow::bail!("profile lookup failed");
            }
            Ok(Profile {
                following_count: self.profile_following,
            })
        }
    }

}
