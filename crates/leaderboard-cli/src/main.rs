//! leaderboard-client: drive the leaderboard bridge from a terminal
//!
//! Connects to the leaderboard server, registers the player, then reads
//! commands from stdin:
//! - `start`        restart the run timer
//! - `finish`       report the elapsed run time
//! - `time <secs>`  report an explicit time
//! - `board`        print the leaderboard, fastest first
//! - `quit`         leave (reports departure)

use anyhow::{Context, Result, bail};
use leaderboard_bridge::{Bridge, BridgeConfig, Client, RunTimer};
use leaderboard_core::Leaderboard;
use leaderboard_core::leaderboard::rank;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const ENDPOINT_ENV: &str = "LEADERBOARD_ENDPOINT";

enum Command {
    Start,
    Finish,
    Time(f64),
    Board,
    Quit,
}

fn parse_command(line: &str) -> Result<Command> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("start"), None) => Ok(Command::Start),
        (Some("finish"), None) => Ok(Command::Finish),
        (Some("time"), Some(secs)) => Ok(Command::Time(
            secs.parse().with_context(|| format!("invalid time: {}", secs))?,
        )),
        (Some("board"), None) => Ok(Command::Board),
        (Some("quit"), None) | (Some("exit"), None) => Ok(Command::Quit),
        _ => bail!("unknown command: {}", line.trim()),
    }
}

fn print_board(client: &mut Client) {
    client.sync();
    let entries = rank(client.leaderboard());

    if entries.is_empty() {
        println!("(no times yet)");
    }
    for (position, (name, time)) in entries.iter().enumerate() {
        let marker = if name == client.name().as_str() { "*" } else { " " };
        println!("{}{:>3}. {:<20} {:>8.2}s", marker, position + 1, name, time);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let Some(name) = args.get(1) else {
        let program = args.first().map(String::as_str).unwrap_or("leaderboard-client");
        bail!("usage: {} <name> [endpoint]", program);
    };

    let mut config = BridgeConfig::default();
    if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
        config.endpoint = endpoint;
    }
    if let Some(endpoint) = args.get(2) {
        config.endpoint = endpoint.clone();
    }

    info!("Starting leaderboard client, endpoint: {}", config.endpoint);

    let board = Leaderboard::new();
    let bridge = Bridge::connect(&config, Arc::new(board.clone())).await?;
    let mut client = Client::new(name.as_str(), bridge.handle(), board)?;
    let mut timer = RunTimer::new();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(Command::Start) => {
                timer.reset();
                println!("Run started");
            }
            Ok(Command::Finish) => {
                let secs = timer.elapsed().as_secs_f64();
                client.register_time(secs);
                println!("Finished in {:.2}s", secs);
            }
            Ok(Command::Time(secs)) => client.register_time(secs),
            Ok(Command::Board) => print_board(&mut client),
            Ok(Command::Quit) => break,
            Err(e) => warn!("{}", e),
        }
    }

    // Departure goes out before the disconnect
    drop(client);
    bridge.shutdown().await?;

    Ok(())
}
