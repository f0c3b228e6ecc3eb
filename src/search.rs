/// Search Cycle
///
/// The producer side of the pipeline: query the platform for each configured
/// term, keep only posts the classifier marks eligible, and append them to
/// the shared queue. A per-term failure is logged and the remaining terms
/// still run.

use anyhow::Result;
use chrono::Utc;

use crate::classifier::Classifier;
use crate::config::Config;
use crate::platform::PlatformClient;
use crate::state::BotState;

pub async fn run_search_cycle(
    config: &Config,
    state: &BotState,
    client: &dyn PlatformClient,
) -> Result<()> {
    let queued = state.queue_len().await;

    // Back-pressure: a queue already past the hourly cap means the post
    // cycle is behind, so growing it further is pointless.
    if queued > config.hourly_action_cap as usize {
        log::info!(
            "Currently have {} candidates in queue, skipping search this cycle",
            queued
        );
    } else {
        log::info!("Searching for {} terms...", config.search_terms.len());

        let classifier = Classifier::from_config(config);
        let mut results = Vec::new();
        for term in &config.search_terms {
            match client.search(term, config.search_count).await {
                Ok(batch) => {
                    log::debug!("Search for {:?} returned {} posts", term, batch.len());
                    results.extend(batch);
                }
                Err(e) => log::error!("Search for {:?} failed: {:#}", term, e),
            }
        }

        let found = results.len();
        let eligible: Vec<_> = results
            .into_iter()
            .filter(|c| classifier.is_eligible(&c.text))
            .collect();
        let matched = eligible.len();

        let added = state.enqueue_all(eligible).await;
        log::info!(
            "Search complete: {} found, {} eligible, {} enqueued ({} now pending)",
            found,
            matched,
            added,
            state.queue_len().await
        );
    }

    state
        .set_next_search(Utc::now() + chrono::Duration::seconds(config.search_interval_secs as i64))
        .await;
    Ok(())
}
