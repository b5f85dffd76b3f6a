//! Runs a Huddle server hosting every party game.
//!
//! `HUDDLE_BIND` sets the listen address (default `0.0.0.0:8080`);
//! `RUST_LOG` sets the log filter (default `info`).

use huddle::prelude::*;
use huddle_games::Party;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let bind = std::env::var("HUDDLE_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let server = HuddleServerBuilder::new()
        .bind(&bind)
        .build::<Party>()
        .await?;

    tracing::info!(addr = %server.local_addr()?, games = GameKind::ALL.len(), "party server listening");
    server.run().await?;
    Ok(())
}
