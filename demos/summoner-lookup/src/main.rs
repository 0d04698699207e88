//! Logs in with a JSON connection profile and prints a summoner's profile
//! and recent game count.
//!
//! ```text
//! RUST_LOG=riftlink=debug summoner-lookup profile.json "Some Summoner"
//! ```

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use riftlink::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "summoner-lookup", about = "Look up a summoner and their recent games")]
struct Cli {
    /// Connection profile (JSON): credentials, region endpoints, client info
    profile: PathBuf,

    /// Summoner name to look up
    name: String,

    /// Seconds to wait for the login handshake
    #[arg(long, default_value_t = 120)]
    connect_timeout: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "lookup failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let Cli {
        profile,
        name,
        connect_timeout,
    } = cli;
    let profile: ConnectionProfile = serde_json::from_str(&fs::read_to_string(&profile)?)?;

    // The WebSocket transport runs on this runtime; the lookup itself
    // uses the blocking API from the main thread.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let (tx, rx) = mpsc::channel();
    let acquirer = profile.token_acquirer();
    let client = RpcClientBuilder::new(profile)
        .on_connect(move |result| {
            let _ = tx.send(result);
        })
        .on_disconnect(|| info!("session ended"))
        .on_status(|status| info!(%status, "gateway status"))
        .build(WebSocketConnector::new(runtime.handle().clone()), acquirer);

    client.connect()?;
    let result = rx.recv_timeout(Duration::from_secs(connect_timeout))?;
    if !result.is_success() {
        return Err(result.to_string().into());
    }

    match client.get_summoner_by_name(&name)? {
        None => println!("no summoner named {name:?}"),
        Some(summoner) => {
            println!(
                "{} (level {}, summoner id {}, account id {})",
                summoner.name, summoner.summoner_level, summoner.summoner_id, summoner.acct_id
            );
            let games = client.get_recent_games(summoner.acct_id)?;
            println!("{} recent games on record", games.game_statistics.len());
        }
    }

    client.disconnect();
    Ok(())
}
