/// Scheduler Module
///
/// Owns the three periodic task loops (search, post, day-reset). Each loop
/// runs its cycle, logs and swallows any cycle-level error so a bad cycle
/// never stops future scheduling, then re-arms. Search and day-reset sleep
/// their interval from cycle completion; the post loop sleeps from cycle
/// start, so a long throttled batch does not stretch its period. The loops
/// make the re-arm decision here rather than rescheduling themselves from
/// inside the cycle functions, so cancelling everything is a single
/// operation.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::Config;
use crate::maintenance;
use crate::platform::PlatformClient;
use crate::post;
use crate::search;
use crate::state::BotState;

pub struct Scheduler {
    shutdown_tx: watch::Sender<bool>,
    search_trigger: Arc<Notify>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Arm all three periodic tasks. Day-reset and search fire near
    /// immediately; the first post cycle waits a short grace period so the
    /// first search can populate the queue.
    pub fn start(
        config: Arc<Config>,
        state: Arc<BotState>,
        client: Arc<dyn PlatformClient>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let search_trigger = Arc::new(Notify::new());
        let mut handles = Vec::new();

        // Day-reset loop
        {
            let (config, state, client) = (config.clone(), state.clone(), client.clone());
            let mut shutdown = shutdown_tx.subscribe();
            handles.push(tokio::spawn(async move {
                loop {
                    if let Err(e) = maintenance::run_day_reset(&config, &state, client.as_ref()).await
                    {
                        log::error!("Day-reset cycle failed: {:#}", e);
                    }
                    tokio::select! {
                        _ = time::sleep(Duration::from_secs(config.day_interval_secs)) => {}
                        _ = shutdown.changed() => break,
                    }
                }
                log::debug!("Day-reset task stopped");
            }));
        }

        // Search loop; the trigger lets an operator force an out-of-band
        // cycle, cancelling the pending timer so there is no double fire
        {
            let (config, state, client) = (config.clone(), state.clone(), client.clone());
            let trigger = search_trigger.clone();
            let mut shutdown = shutdown_tx.subscribe();
            handles.push(tokio::spawn(async move {
                loop {
                    if let Err(e) = search::run_search_cycle(&config, &state, client.as_ref()).await
                    {
                        log::error!("Search cycle failed: {:#}", e);
                    }
                    tokio::select! {
                        _ = time::sleep(Duration::from_secs(config.search_interval_secs)) => {}
                        _ = trigger.notified() => {
                            log::info!("Search triggered manually");
                        }
                        _ = shutdown.changed() => break,
                    }
                }
                log::debug!("Search task stopped");
            }));
        }

        // Post loop, delayed at startup
        {
            let mut shutdown = shutdown_tx.subscribe();
            let cycle_flag = shutdown_tx.subscribe();
            handles.push(tokio::spawn(async move {
                tokio::select! {
                    _ = time::sleep(Duration::from_secs(config.post_start_delay_secs)) => {}
                    _ = shutdown.changed() => return,
                }
                loop {
                    // A full batch of throttled actions can take most of an
                    // hour, so the next fire is measured from cycle start,
                    // matching the next_post timestamp the cycle records
                    let cycle_start = time::Instant::now();
                    if let Err(e) =
                        post::run_post_cycle(&config, &state, client.as_ref(), &cycle_flag).await
                    {
                        log::error!("Post cycle failed: {:#}", e);
                    }
                    tokio::select! {
                        _ = time::sleep_until(cycle_start + Duration::from_secs(config.post_interval_secs)) => {}
                        _ = shutdown.changed() => break,
                    }
                }
                log::debug!("Post task stopped");
            }));
        }

        Self {
            shutdown_tx,
            search_trigger,
            handles,
        }
    }

    /// Handle the operator or status server can use to force a search cycle
    pub fn search_trigger(&self) -> Arc<Notify> {
        self.search_trigger.clone()
    }

    pub fn trigger_search(&self) {
        self.search_trigger.notify_one();
    }

    /// Cancel every pending timer. A cycle already in flight may be
    /// interrupted; no state lock is ever held across an await, so this
    /// cannot strand the shared state locked.
    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for handle in &self.handles {
            handle.abort();
        }
        log::info!("All scheduled tasks cancelled");
    }
}
