/// Bot wiring
///
/// Connects the pieces: platform client with startup credential check,
/// shared state seeded with the real following count, the scheduler, the
/// HTTP status server, and the operator console. Shutdown (operator quit
/// or ctrl-c) cancels every pending timer before returning.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::Config;
use crate::console;
use crate::http_server::{self, AppState};
use crate::platform::{PlatformClient, TwitterClient};
use crate::scheduler::Scheduler;
use crate::state::BotState;

pub async fn run(config: Config) -> Result<()> {
    log::info!("Initializing bot...");

    // Bad credentials are the one fatal startup failure
    let client = TwitterClient::connect(&config)
        .await
        .context("Platform client setup failed")?;

    let profile = client
        .profile(&config.screen_name)
        .await
        .context("Initial profile lookup failed")?;

    let state = Arc::new(BotState::new());
    state.set_following(profile.following_count).await;
    log::info!(
        "Starting with {} accounts followed (limit {})",
        profile.following_count,
        config.max_following
    );

    let config = Arc::new(config);
    let client: Arc<dyn PlatformClient> = Arc::new(client);
    let scheduler = Scheduler::start(config.clone(), state.clone(), client);

    // Status server runs alongside; its failure is logged, not fatal
    let app = AppState {
        state: state.clone(),
        search_trigger: scheduler.search_trigger(),
    };
    let port = config.status_port;
    tokio::spawn(async move {
        if let Err(e) = http_server::start_server(app, port).await {
            log::error!("Status server error: {:#}", e);
        }
    });

    log::info!("Bot is running. Press Ctrl+C to stop.");

    tokio::select! {
        result = console::run_console(state, scheduler.search_trigger()) => {
            if let Err(e) = result {
                log::error!("Console error: {:#}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("Ctrl+C received");
        }
    }

    log::info!("Shutting down, cancelling scheduled tasks...");
    scheduler.shutdown();
    Ok(())
}
