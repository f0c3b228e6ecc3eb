/// Shared Bot State
///
/// One object owns everything the periodic tasks share: the FIFO candidate
/// queue, the dedup record of content already acted upon, and the quota
/// counters. All of it sits behind a single coarse lock; critical sections
/// only ever touch memory (no network calls, no sleeps under the lock).

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use tokio::sync::Mutex;

/// A piece of content eligible for a follow+re-share action pair.
/// Produced by the search cycle, consumed at most once by the post cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub id: String,
    pub author: String,
    pub text: String,
}

/// Point-in-time view of the shared state, for the console and status server
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub queue_len: usize,
    pub dedup_len: usize,
    pub following: u32,
    pub daily_actions: u32,
    pub next_search: Option<DateTime<Utc>>,
    pub next_post: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Inner {
    queue: VecDeque<Candidate>,
    /// Membership check for already-processed content ids
    seen: HashSet<String>,
    /// Same ids in insertion order, so day-reset can drop the older half
    seen_order: VecDeque<String>,
    daily_actions: u32,
    following: u32,
    next_search: Option<DateTime<Utc>>,
    next_post: Option<DateTime<Utc>>,
}

pub struct BotState {
    inner: Mutex<Inner>,
}

impl BotState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Append candidates to the queue tail. A candidate whose id has already
    /// been processed, or is already waiting in the queue, is dropped here so
    /// back-to-back search cycles cannot enqueue the same content twice.
    /// Returns how many were actually enqueued.
    pub async fn enqueue_all(&self, candidates: Vec<Candidate>) -> usize {
        let mut inner = self.inner.lock().await;
        let mut added = 0;
        for candidate in candidates {
            if inner.seen.contains(&candidate.id) {
                continue;
            }
            if inner.queue.iter().any(|c| c.id == candidate.id) {
                continue;
            }
            inner.queue.push_back(candidate);
            added += 1;
        }
        added
    }

    /// Remove and return up to `max` of the oldest queued candidates.
    /// This is the boundary that caps how many platform calls one post
    /// cycle will make.
    pub async fn drain(&self, max: usize) -> Vec<Candidate> {
        let mut inner = self.inner.lock().await;
        let take = max.min(inner.queue.len());
        inner.queue.drain(..take).collect()
    }

    pub async fn queue_len(&self) -> usize {
        self.inner.lock().await.queue.len()
    }

    pub async fn dedup_len(&self) -> usize {
        self.inner.lock().await.seen.len()
    }

    /// Clone of the pending queue, for display only
    pub async fn pending(&self) -> Vec<Candidate> {
        self.inner.lock().await.queue.iter().cloned().collect()
    }

    pub async fn is_processed(&self, id: &str) -> bool {
        self.inner.lock().await.seen.contains(id)
    }

    /// Record a content id as acted upon (successfully or not)
    pub async fn mark_processed(&self, id: String) {
        let mut inner = self.inner.lock().await;
        if inner.seen.insert(id.clone()) {
            inner.seen_order.push_back(id);
        }
    }

    pub async fn daily_actions(&self) -> u32 {
        self.inner.lock().await.daily_actions
    }

    pub async fn record_action(&self) {
        self.inner.lock().await.daily_actions += 1;
    }

    pub async fn following(&self) -> u32 {
        self.inner.lock().await.following
    }

    pub async fn record_follow(&self) {
        self.inner.lock().await.following += 1;
    }

    pub async fn record_unfollow(&self) {
        let mut inner = self.inner.lock().await;
        inner.following = inner.following.saturating_sub(1);
    }

    /// Resync the following count against platform ground truth
    pub async fn set_following(&self, count: u32) {
        self.inner.lock().await.following = count;
    }

    /// How many actions the next post batch may perform: the hourly cap,
    /// shrunk so the daily count lands exactly on the daily limit and
    /// never past it.
    pub async fn action_allowance(&self, daily_limit: u32, hourly_cap: u32) -> usize {
        let inner = self.inner.lock().await;
        let remaining = daily_limit.saturating_sub(inner.daily_actions);
        remaining.min(hourly_cap) as usize
    }

    /// Day rollover: zero the daily counter and truncate the dedup record
    /// to its most-recently-inserted half (insertion order stands in for
    /// recency). Returns how many entries were dropped.
    pub async fn start_new_day(&self) -> usize {
        let mut inner = self.inner.lock().await;
        inner.daily_actions = 0;

        let keep = inner.seen_order.len() / 2;
        let drop_count = inner.seen_order.len() - keep;
        for _ in 0..drop_count {
            if let Some(id) = inner.seen_order.pop_front() {
                inner.seen.remove(&id);
            }
        }
        drop_count
    }

    pub async fn set_next_search(&self, at: DateTime<Utc>) {
        self.inner.lock().await.next_search = Some(at);
    }

    pub async fn set_next_post(&self, at: DateTime<Utc>) {
        self.inner.lock().await.next_post = Some(at);
    }

    pub async fn snapshot(&self) -> StatsSnapshot {
        let inner = self.inner.lock().await;
        StatsSnapshot {
            queue_len: inner.queue.len(),
            dedup_len: inner.seen.len(),
            following: inner.following,
            daily_actions: inner.daily_actions,
            next_search: inner.next_search,
            next_post: inner.next_post,
        }
    }
}

impl Default for BotState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str) -> Candidate {
        Candidate {
            id: id.to_string(),
            author: format!("author_{}", id),
            text: format!("text for {}", id),
        }
    }

    #[tokio::test]
    async fn drain_respects_bound_and_never_repeats() {
        let state = BotState::new();
        state
            .enqueue_all(vec![candidate("a"), candidate("b"), candidate("c")])
            .await;

        let first = state.drain(2).await;
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].id, "a");
        assert_eq!(first[1].id, "b");

        let second = state.drain(2).await;
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, "c");

        assert!(state.drain(2).await.is_empty());
    }

    #[tokio::test]
    async fn enqueue_skips_processed_and_already_queued_ids() {
        let state = BotState::new();
        state.mark_processed("done".to_string()).await;

        let added = state
            .enqueue_all(vec![candidate("done"), candidate("x"), candidate("x")])
            .await;
        assert_eq!(added, 1);
        assert_eq!(state.queue_len().await, 1);

        // a later cycle finding the same content again is also a no-op
        let added = state.enqueue_all(vec![candidate("x")]).await;
        assert_eq!(added, 0);
    }

    #[tokio::test]
    async fn new_day_keeps_most_recent_half_of_dedup() {
        let state = BotState::new();
        for i in 0..5 {
            state.mark_processed(format!("id{}", i)).await;
        }

        let dropped = state.start_new_day().await;
        assert_eq!(dropped, 3);
        assert_eq!(state.dedup_len().await, 2);

        // the survivors are the most recently added entries
        assert!(state.is_processed("id3").await);
        assert!(state.is_processed("id4").await);
        assert!(!state.is_processed("id0").await);
        assert!(!state.is_processed("id2").await);
    }

    #[tokio::test]
    async fn new_day_resets_daily_counter_only() {
        let state = BotState::new();
        state.record_action().await;
        state.record_action().await;
        state.record_follow().await;

        state.start_new_day().await;
        assert_eq!(state.daily_actions().await, 0);
        assert_eq!(state.following().await, 1);
    }

    #[tokio::test]
    async fn allowance_caps_at_remaining_daily_quota() {
        let state = BotState::new();
        assert_eq!(state.action_allowance(10, 4).await, 4);

        for _ in 0..8 {
            state.record_action().await;
        }
        assert_eq!(state.action_allowance(10, 4).await, 2);

        state.record_action().await;
        state.record_action().await;
        assert_eq!(state.action_allowance(10, 4).await, 0);
    }

    #[tokio::test]
    async fn unfollow_never_underflows() {
        let state = BotState::new();
        state.record_unfollow().await;
        assert_eq!(state.following().await, 0);
    }
}
