/// Day-Reset Cycle
///
/// Runs once per day: zeroes the daily action counter, trims the dedup
/// record so it cannot grow without bound, and resyncs the following count
/// against what the platform actually reports.

use anyhow::Result;

use crate::config::Config;
use crate::platform::PlatformClient;
use crate::state::BotState;

pub async fn run_day_reset(
    config: &Config,
    state: &BotState,
    client: &dyn PlatformClient,
) -> Result<()> {
    log::info!("New day...");

    let dropped = state.start_new_day().await;
    log::info!(
        "Daily counters reset, {} old dedup entries dropped ({} kept)",
        dropped,
        state.dedup_len().await
    );

    // Local bookkeeping drifts when follow/unfollow calls half-fail, so
    // ground truth wins once a day. A failed lookup keeps the stale count.
    match client.profile(&config.screen_name).await {
        Ok(profile) => {
            state.set_following(profile.following_count).await;
            log::info!("Following count resynced to {}", profile.following_count);
        }
        Err(e) => log::warn!(
            "Profile lookup failed, keeping last known following count: {:#}",
            e
        ),
    }

    Ok(())
}
