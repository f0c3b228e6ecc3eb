/// Giveaway Sweeper Bot Library
///
/// Core of a scheduled social-media automation agent: periodic search for
/// giveaway posts asking for follow+re-share, a rate-limited work queue
/// with duplicate suppression, daily/hourly quota tracking, and a
/// cooperative scheduler with operator controls.

pub mod bot;
pub mod classifier;
pub mod config;
pub mod console;
pub mod http_server;
pub mod maintenance;
pub mod platform;
pub mod post;
pub mod scheduler;
pub mod search;
pub mod state;
