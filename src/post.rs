/// Post Cycle
///
/// The consumer side: drain a bounded batch from the queue and perform a
/// follow + re-share pair per candidate, sequentially, with a fixed
/// self-throttle sleep between candidates. The platform rate-limits hard,
/// so actions are deliberately never issued concurrently. All sleeps and
/// network calls happen outside the state lock.

use anyhow::Result;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;

use crate::config::Config;
use crate::platform::PlatformClient;
use crate::state::BotState;

pub async fn run_post_cycle(
    config: &Config,
    state: &BotState,
    client: &dyn PlatformClient,
    shutdown: &watch::Receiver<bool>,
) -> Result<()> {
    state
        .set_next_post(Utc::now() + chrono::Duration::seconds(config.post_interval_secs as i64))
        .await;

    if state.daily_actions().await >= config.daily_action_limit {
        log::info!(
            "Exceeded action limit ({}) for the day, skipping post cycle",
            config.daily_action_limit
        );
        return Ok(());
    }

    if state.following().await >= config.max_following {
        log::info!(
            "Over {} following, removing oldest follows first...",
            config.max_following
        );
        if let Err(e) = unfollow_maintenance(config, state, client).await {
            log::error!("Unfollow maintenance failed: {:#}", e);
        }
    }

    let allowance = state
        .action_allowance(config.daily_action_limit, config.hourly_action_cap)
        .await;
    let batch = state.drain(allowance).await;
    if batch.is_empty() {
        log::info!("Nothing to post for now");
        return Ok(());
    }

    let total = batch.len();
    let mut posted = 0;
    for (i, candidate) in batch.iter().enumerate() {
        // Cooperative cancellation between candidates, never mid-sleep
        if *shutdown.borrow() {
            log::info!("Shutdown requested, stopping post cycle early");
            break;
        }

        if state.is_processed(&candidate.id).await {
            log::info!("{} of {}: already posted, skipping", i + 1, total);
            continue;
        }

        log::info!("Posting {} of {} (@{})...", i + 1, total, candidate.author);

        match client.follow(&candidate.author).await {
            Ok(()) => state.record_follow().await,
            Err(e) => log::error!("Follow @{} failed: {:#}", candidate.author, e),
        }

        match client.repost(&candidate.id).await {
            Ok(()) => {
                state.record_action().await;
                posted += 1;
            }
            Err(e) => log::error!("Repost {} failed: {:#}", candidate.id, e),
        }

        // Recorded even on failure, so the same content is never retried
        state.mark_processed(candidate.id.clone()).await;

        if i + 1 < total && config.inter_action_delay_secs > 0 {
            time::sleep(Duration::from_secs(config.inter_action_delay_secs)).await;
        }
    }

    log::info!("Posted {} of {} candidates successfully", posted, total);
    Ok(())
}

/// Drop a fixed batch of accounts from the tail of the follow list, with a
/// short self-throttle between unfollow calls. Individual failures are
/// logged and skipped.
pub async fn unfollow_maintenance(
    config: &Config,
    state: &BotState,
    client: &dyn PlatformClient,
) -> Result<()> {
    let following = client.list_following(&config.screen_name).await?;

    let batch: Vec<&String> = following
        .iter()
        .rev()
        .take(config.unfollow_batch_size)
        .collect();
    let total = batch.len();

    for (i, user_id) in batch.into_iter().enumerate() {
        match client.unfollow(user_id).await {
            Ok(()) => state.record_unfollow().await,
            Err(e) => log::error!("Unfollow {} failed: {:#}", user_id, e),
        }

        if i + 1 < total && config.unfollow_delay_secs > 0 {
            time::sleep(Duration::from_secs(config.unfollow_delay_secs)).await;
        }
    }

    log::info!("Unfollow maintenance complete, removed up to {}", total);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockPlatform;
    use crate::state::Candidate;

    fn candidate(id: &str) -> Candidate {
        Candidate {
            id: id.to_string(),
            author: format!("author_{}", id),
            text: format!("@author_{}: rt+follow to win", id),
        }
    }

    fn idle_shutdown() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    #[tokio::test]
    async fn drains_up_to_the_hourly_cap_in_fifo_order() {
        let mut config = Config::for_tests();
        config.hourly_action_cap = 2;
        let state = BotState::new();
        state
            .enqueue_all(vec![candidate("a"), candidate("b"), candidate("c")])
            .await;
        let platform = MockPlatform::default();

        let (_tx, shutdown) = idle_shutdown();
        run_post_cycle(&config, &state, &platform, &shutdown)
            .await
            .unwrap();

        assert_eq!(
            *platform.reposts.lock().unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
        let pending = state.pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "c");
        assert!(state.is_processed("a").await);
        assert!(state.is_processed("b").await);
        assert!(!state.is_processed("c").await);
    }

    #[tokio::test]
    async fn daily_count_caps_exactly_at_the_limit() {
        let mut config = Config::for_tests();
        config.daily_action_limit = 5;
        config.hourly_action_cap = 2;
        let state = BotState::new();
        let platform = MockPlatform::default();
        let (_tx, shutdown) = idle_shutdown();

        for i in 0..10 {
            state.enqueue_all(vec![candidate(&format!("c{}", i))]).await;
            state.enqueue_all(vec![candidate(&format!("d{}", i))]).await;
            run_post_cycle(&config, &state, &platform, &shutdown)
                .await
                .unwrap();
        }

        assert_eq!(state.daily_actions().await, 5);
        assert_eq!(platform.reposts.lock().unwrap().len(), 5);

        // further cycles are no-ops even with a full queue
        let queued_before = state.queue_len().await;
        run_post_cycle(&config, &state, &platform, &shutdown)
            .await
            .unwrap();
        assert_eq!(state.queue_len().await, queued_before);
        assert_eq!(state.daily_actions().await, 5);
    }

    #[tokio::test]
    async fn follow_failure_still_reposts_and_dedups() {
        let config = Config::for_tests();
        let state = BotState::new();
        state.set_following(7).await;
        state.enqueue_all(vec![candidate("x")]).await;
        let platform = MockPlatform {
            fail_follow: true,
            ..Default::default()
        };

        let (_tx, shutdown) = idle_shutdown();
        run_post_cycle(&config, &state, &platform, &shutdown)
            .await
            .unwrap();

        assert_eq!(state.daily_actions().await, 1);
        assert_eq!(state.following().await, 7);
        assert!(state.is_processed("x").await);
        assert!(platform.follows.lock().unwrap().is_empty());
        assert_eq!(*platform.reposts.lock().unwrap(), vec!["x".to_string()]);
    }

    #[tokio::test]
    async fn repost_failure_is_not_retried() {
        let config = Config::for_tests();
        let state = BotState::new();
        state.enqueue_all(vec![candidate("x")]).await;
        let platform = MockPlatform {
            fail_repost: true,
            ..Default::default()
        };

        let (_tx, shutdown) = idle_shutdown();
        run_post_cycle(&config, &state, &platform, &shutdown)
            .await
            .unwrap();

        assert_eq!(state.daily_actions().await, 0);
        // the follow half succeeded
        assert_eq!(state.following().await, 1);
        assert!(state.is_processed("x").await);

        // the same content never comes back around
        state.enqueue_all(vec![candidate("x")]).await;
        assert_eq!(state.queue_len().await, 0);
    }

    #[tokio::test]
    async fn already_processed_candidates_are_skipped() {
        let config = Config::for_tests();
        let state = BotState::new();
        // enqueued first, then marked processed before the cycle drains it,
        // as happens when a search races a slow post batch
        state.enqueue_all(vec![candidate("x")]).await;
        state.mark_processed("x".to_string()).await;
        let platform = MockPlatform::default();

        let (_tx, shutdown) = idle_shutdown();
        run_post_cycle(&config, &state, &platform, &shutdown)
            .await
            .unwrap();

        assert!(platform.reposts.lock().unwrap().is_empty());
        assert!(platform.follows.lock().unwrap().is_empty());
        assert_eq!(state.daily_actions().await, 0);
    }

    #[tokio::test]
    async fn unfollow_runs_before_posting_when_over_ceiling() {
        let mut config = Config::for_tests();
        config.max_following = 10;
        config.unfollow_batch_size = 3;
        let state = BotState::new();
        state.set_following(10).await;
        state.enqueue_all(vec![candidate("a")]).await;
        let platform = MockPlatform {
            following_ids: (0..6).map(|i| format!("u{}", i)).collect(),
            ..Default::default()
        };

        let (_tx, shutdown) = idle_shutdown();
        run_post_cycle(&config, &state, &platform, &shutdown)
            .await
            .unwrap();

        // exactly the batch size was unfollowed, from the tail of the list
        assert_eq!(
            *platform.unfollows.lock().unwrap(),
            vec!["u5".to_string(), "u4".to_string(), "u3".to_string()]
        );
        // 10 - 3 unfollows + 1 new follow
        assert_eq!(state.following().await, 8);
        // posting still proceeded in the same cycle
        assert_eq!(*platform.reposts.lock().unwrap(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn shutdown_flag_stops_the_batch_between_candidates() {
        let mut config = Config::for_tests();
        config.hourly_action_cap = 5;
        let state = BotState::new();
        state
            .enqueue_all(vec![candidate("a"), candidate("b")])
            .await;
        let platform = MockPlatform::default();
        let (tx, rx) = watch::channel(true);

        run_post_cycle(&config, &state, &platform, &rx).await.unwrap();
        drop(tx);

        assert!(platform.reposts.lock().unwrap().is_empty());
        assert_eq!(state.daily_actions().await, 0);
    }
}
