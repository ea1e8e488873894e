#![forbid(unsafe_code)]
//! Client-side helper: generate keys and produce signed transfer requests

use clap::{Parser, Subcommand};
use colored::*;
use sigledger::crypto::{derive_address, KeyPair};
use sigledger::signature::{sign_transfer, SchemeKind};
use sigledger::transaction::TransferRequest;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generates a new keypair and prints its address
    Keygen,
    /// Derives the address of a hex public key
    Address {
        /// Hex-encoded public key (compressed or uncompressed)
        public_key: String,
    },
    /// Signs a transfer and prints the JSON body for /verify or /send
    Sign {
        /// Hex private key of the sender
        #[arg(long)]
        key: String,
        /// Amount to transfer
        #[arg(long)]
        amount: String,
        /// Recipient address
        #[arg(long)]
        recipient: String,
        /// Sender address; defaults to the key's own address
        #[arg(long)]
        sender: Option<String>,
        /// Signature scheme: "recovery" or "public-key"
        #[arg(long, default_value = "recovery")]
        scheme: SchemeKind,
        /// Include a nonce in the signed message
        #[arg(long)]
        nonce: Option<u64>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen => {
            let keypair = KeyPair::generate();
            println!("{} {}", "Address:    ".bright_cyan(), keypair.address());
            println!("{} {}", "Public key: ".bright_cyan(), keypair.public_key_hex());
            println!("{} {}", "Private key:".bright_yellow(), keypair.secret_key_hex());
        }
        Commands::Address { public_key } => {
            println!("{}", derive_address(&public_key)?);
        }
        Commands::Sign {
            key,
            amount,
            recipient,
            sender,
            scheme,
            nonce,
        } => {
            let keypair = KeyPair::from_secret_hex(&key)?;
            let sender = sender.unwrap_or_else(|| keypair.address().to_string());

            let mut request = TransferRequest::new(&sender, &amount, &recipient);
            if let Some(nonce) = nonce {
                request = request.with_nonce(nonce);
            }
            let signed = sign_transfer(&keypair, request, scheme);

            println!("{}", serde_json::to_string_pretty(&signed)?);
        }
    }

    Ok(())
}
