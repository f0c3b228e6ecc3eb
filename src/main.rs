/// Giveaway Sweeper Bot
///
/// Searches the platform every hour for giveaway posts that ask readers to
/// follow and re-share, queues the eligible ones, and works through the
/// queue at a throttled rate under daily and hourly quotas. A day-reset
/// task keeps the counters and dedup record in check. Operated via stdin
/// commands or the HTTP status server.

use anyhow::Result;
use giveaway_sweeper::{bot, config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    pretty_env_logger::init();

    log::info!("Starting Giveaway Sweeper Bot...");

    // Load configuration from environment
    let cfg = config::Config::from_env()?;

    // Run the bot
    bot::run(cfg).await?;

    Ok(())
}
