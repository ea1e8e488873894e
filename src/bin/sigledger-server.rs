#![forbid(unsafe_code)]
//! Ledger HTTP server: seeds demo wallets, prints them, then serves requests

use clap::Parser;
use colored::*;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use sigledger::api::{run_api_server, ApiNode};
use sigledger::config::{load_config_from, DEFAULT_CONFIG_PATH};
use sigledger::ledger::Ledger;
use sigledger::seed::{accounts_dump, render_private_keys, seed_wallets};
use sigledger::service::LedgerService;
use sigledger::signature::SchemeKind;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Port to listen on (overrides config and PORT)
    #[arg(long)]
    port: Option<u16>,
    /// Number of demo wallets to seed (overrides config)
    #[arg(long)]
    wallets: Option<usize>,
    /// Signature scheme: "recovery" or "public-key" (overrides config)
    #[arg(long)]
    scheme: Option<SchemeKind>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_config_from(&cli.config)?;

    let scheme = cli.scheme.unwrap_or(config.ledger.scheme);
    let wallet_count = cli.wallets.unwrap_or(config.seed.wallets);
    let port = cli
        .port
        .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()))
        .unwrap_or(config.server.port);
    let host: IpAddr = config
        .server
        .host
        .parse()
        .map_err(|e| format!("Invalid server.host '{}': {}", config.server.host, e))?;

    let ledger = Arc::new(Ledger::with_policy(config.ledger.policy()));
    let wallets = seed_wallets(&ledger, wallet_count, config.seed.initial_balance)?;

    println!();
    println!("{}", accounts_dump(&ledger, &wallets));
    println!();
    println!("{}", "Private Keys".bright_yellow().bold());
    println!("{}", render_private_keys(&wallets));
    println!();

    tracing::info!(
        scheme = %scheme,
        require_sufficient_balance = config.ledger.require_sufficient_balance,
        require_nonce = config.ledger.require_nonce,
        "ledger.ready"
    );

    let node = Arc::new(ApiNode::new(LedgerService::new(ledger, scheme).with_wallets(wallets)));
    let addr = SocketAddr::new(host, port);
    println!("{}", format!("Listening on http://{}", addr).green());

    run_api_server(node, addr).await
}
