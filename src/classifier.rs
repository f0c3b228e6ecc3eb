/// Keyword Classifier
///
/// Pure text classification: decides whether a post is asking readers to
/// follow, to re-share, or both. A candidate is only worth acting on when
/// both intents are present (either via separate keywords or a combined
/// keyword like "rt+follow").

use crate::config::Config;

/// The intent flags detected in a piece of text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intent {
    pub follow: bool,
    pub retweet: bool,
}

pub struct Classifier {
    follow_keywords: Vec<String>,
    retweet_keywords: Vec<String>,
    combined_keywords: Vec<String>,
}

impl Classifier {
    pub fn new(
        follow_keywords: Vec<String>,
        retweet_keywords: Vec<String>,
        combined_keywords: Vec<String>,
    ) -> Self {
        Self {
            follow_keywords,
            retweet_keywords,
            combined_keywords,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.follow_keywords.clone(),
            config.retweet_keywords.clone(),
            config.combined_keywords.clone(),
        )
    }

    /// Classify raw post text into intent flags
    pub fn classify(&self, raw: &str) -> Intent {
        let text = normalize(raw);

        let follow = self.follow_keywords.iter().any(|k| text.contains(k.as_str()));
        let retweet = self.retweet_keywords.iter().any(|k| text.contains(k.as_str()));

        if follow && retweet {
            return Intent { follow, retweet };
        }

        // A combined keyword ("rt+follow") satisfies both at once
        if self.combined_keywords.iter().any(|k| text.contains(k.as_str())) {
            return Intent {
                follow: true,
                retweet: true,
            };
        }

        Intent { follow, retweet }
    }

    /// A candidate is eligible only when the text asks for both actions
    pub fn is_eligible(&self, raw: &str) -> bool {
        let intent = self.classify(raw);
        intent.follow && intent.retweet
    }
}

/// Normalize post text before keyword matching
///
/// Lowercases, strips the "@user:" salutation (everything up to and
/// including the first colon), and rewrites "&amp;" entities to " and "
/// so "rt&amp;follow" reads as two separate keywords.
pub fn normalize(raw: &str) -> String {
    let mut text = raw.to_lowercase();
    if let Some(i) = text.find(':') {
        text = text[i + 1..].to_string();
    }
    text.replace("&amp;", " and ")
}
