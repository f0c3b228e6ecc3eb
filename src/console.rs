/// Operator Console
///
/// Reads commands from stdin while the scheduler runs: print stats, dump
/// the pending queue, force a search, or quit. Returns once the operator
/// quits or stdin closes; the caller then shuts the scheduler down.

use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Notify;

use crate::state::BotState;

pub async fn run_console(state: Arc<BotState>, search_trigger: Arc<Notify>) -> Result<()> {
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "p" | "stats" => print_stats(&state).await,
            "pt" | "queue" => print_queue(&state).await,
            "s" | "search" => {
                println!("Triggering a search now...");
                search_trigger.notify_one();
            }
            "q" | "quit" | "exit" => {
                println!("goodbye ...");
                return Ok(());
            }
            "" | "h" | "help" => print_help(),
            other => println!("Unknown command: {:?} (try 'help')", other),
        }
    }

    // stdin closed (e.g. running detached); park here so the caller only
    // shuts down on operator intent or ctrl-c
    log::info!("Console input closed");
    std::future::pending().await
}

fn print_help() {
    println!("Commands: p|stats, pt|queue, s|search, q|quit");
}

async fn print_stats(state: &BotState) {
    let snapshot = state.snapshot().await;
    println!("----------------------------------------");
    println!("|                Info                  |");
    println!("----------------------------------------");
    println!("+ Queued        : {}", snapshot.queue_len);
    println!("+ Already posted: {}", snapshot.dedup_len);
    println!("+ Following     : {}", snapshot.following);
    println!("+ Actions today : {}", snapshot.daily_actions);
    println!("----------------------------------------");
    println!("+ Next search   : {}", format_time(snapshot.next_search));
    println!("+ Next post     : {}", format_time(snapshot.next_post));
    println!("----------------------------------------");
}

async fn print_queue(state: &BotState) {
    let pending = state.pending().await;
    if pending.is_empty() {
        println!("Queue is empty");
        return;
    }
    for candidate in pending {
        println!("{} (@{}): {}", candidate.id, candidate.author, candidate.text);
        println!("--------------------------------------------");
    }
}

fn format_time(at: Option<chrono::DateTime<chrono::Utc>>) -> String {
    match at {
        Some(t) => t.format("%I:%M %p").to_string(),
        None => "not scheduled".to_string(),
    }
}
