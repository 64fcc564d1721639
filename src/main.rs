// src/main.rs
mod bulletin;
mod config;
mod discord;
mod fleet;
mod models;
mod query;
mod render;

use env_logger::Env;
use log::{info, warn};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::MissedTickBehavior;

use crate::bulletin::BulletinBoard;
use crate::config::Config;
use crate::discord::DiscordClient;
use crate::fleet::Fleet;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger only once at the start
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    dotenv::dotenv().ok();

    // Load configuration
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to load configuration: {}", e),
            ));
        }
    };

    let token = match std::env::var("DISCORD_TOKEN") {
        Ok(token) => token,
        Err(_) => {
            log::error!("DISCORD_TOKEN is not set");
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "DISCORD_TOKEN is not set",
            ));
        }
    };

    let client = DiscordClient::new(token, &config);
    let mut fleet = Fleet::from_config(&config.servers);

    info!(
        "Watching {} servers, updating channel {} every {}s",
        fleet.len(),
        config.channel,
        config.query_interval_secs
    );

    // One cycle runs to completion before the next tick; an overrun delays
    // the next cycle instead of overlapping it.
    let mut ticker = tokio::time::interval(Duration::from_secs(config.query_interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        run_cycle(&mut fleet, &client, &config).await;
    }
}

// Poll, render, publish. Publishing failures are logged and skipped; the
// poll state they would have shown survives into the next cycle.
async fn run_cycle(fleet: &mut Fleet, client: &DiscordClient, config: &Config) {
    let snapshot = fleet.poll_all().await;
    if snapshot.cycle_failed {
        warn!("No server answered this cycle");
    }

    let mut board = BulletinBoard::new();
    for block in render::render_board(&snapshot, unix_now()) {
        board.add_block(block);
    }
    if let Err(e) = board.push_to_channel(client, config.channel).await {
        warn!("Skipping bulletin update this cycle: {}", e);
    }

    // A fully failed cycle clears the status text rather than pinning a
    // stale player count.
    let status = if snapshot.cycle_failed {
        None
    } else {
        Some(render::status_text(snapshot.total_players()))
    };
    if let Err(e) = client.set_status_text(config.channel, status.as_deref()).await {
        warn!("Skipping status update this cycle: {}", e);
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
