//! Grid trading bot binary
//!
//! ## Setup
//!
//! 1. Create a `config.toml` (see the repository README) and a `.env` file
//!    in the project root:
//!    ```
//!    HYPERGRID_NETWORK__PRIVATE_KEY=0xYourPrivateKeyHere
//!    ```
//!
//! 2. Run the bot:
//!    ```bash
//!    cargo run --bin grid_bot -- --config config.toml
//!    ```
//!
//! ## Security
//!
//! - Never commit your `.env` file to version control
//! - Add `.env` to your `.gitignore`
//! - The `.env` file is loaded automatically from the current directory

use std::env;
use std::sync::Arc;

use alloy::signers::local::PrivateKeySigner;
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use hypergrid::bot::{start_server, Orchestrator, StatusBoard};
use hypergrid::config::Settings;
use hypergrid::{BaseUrl, HyperliquidClient};

#[tokio::main]
async fn main() {
    // Load .env first so the config layer can see the overrides
    match dotenvy::dotenv() {
        Ok(path) => println!("Loaded environment from: {}", path.display()),
        Err(_) => println!("No .env file found, using system environment variables"),
    }

    let args: Vec<String> = env::args().collect();
    let config_path = if args.len() > 2 && args[1] == "--config" {
        args[2].clone()
    } else {
        "config".to_string()
    };

    let settings = match Settings::new(&config_path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load config '{config_path}': {e}");
            return;
        }
    };

    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", &settings.log.level);
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = settings.validate() {
        error!("{e}");
        return;
    }

    let wallet: PrivateKeySigner = match settings.network.private_key.parse() {
        Ok(wallet) => wallet,
        Err(e) => {
            error!("Failed to parse private key: {e}");
            return;
        }
    };

    let base = if settings.network.mainnet {
        warn!("Using MAINNET - real funds at risk!");
        BaseUrl::Mainnet
    } else {
        info!("Using TESTNET (set network.mainnet = true for mainnet)");
        BaseUrl::Testnet
    };

    let client = match HyperliquidClient::new(base, wallet, &settings.network.wallet_address) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to create exchange client: {e}");
            return;
        }
    };

    info!(
        "Grid bot starting for {} ({} levels, {}% spacing, size {} BTC, every {}s)",
        settings.grid.symbol,
        settings.grid.grid_levels,
        settings.grid.grid_spacing_percent,
        settings.grid.order_size_btc,
        settings.grid.sync_interval_seconds
    );
    info!("Account address: {}", client.user_address());

    let board = Arc::new(StatusBoard::new());
    let cancel = CancellationToken::new();

    tokio::spawn(start_server(
        board.clone(),
        settings.server.host.clone(),
        settings.server.port,
        cancel.clone(),
    ));

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            signal_cancel.cancel();
        }
    });

    let orchestrator = Orchestrator::new(settings, client, board, cancel.clone());
    match orchestrator.run().await {
        Ok(()) => info!("Grid bot stopped; resting orders remain on the book"),
        Err(e) => error!("Grid bot error: {e}"),
    }
    cancel.cancel();
}
