//! Demo wallet seeding and console dumps
//!
//! The server funds a handful of fresh wallets at boot so the ledger has
//! accounts before the first request arrives. Private keys are printed to the
//! console; this is a demonstration ledger.

use crate::crypto::{Address, KeyPair};
use crate::error::LedgerError;
use crate::ledger::{Account, Ledger};
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Table};

#[derive(Debug, Clone)]
pub struct SeededWallet {
    pub index: usize,
    pub address: Address,
    pub keypair: KeyPair,
}

/// Generates `count` keypairs and opens an account for each holding `balance`.
pub fn seed_wallets(ledger: &Ledger, count: usize, balance: i64) -> Result<Vec<SeededWallet>, LedgerError> {
    let mut wallets = Vec::with_capacity(count);
    while wallets.len() < count {
        let keypair = KeyPair::generate();
        let account = Account::with_public_key(&keypair.public_key_hex(), balance)
            .map_err(|e| LedgerError::CryptoError(e.to_string()))?;
        match ledger.open_account(account) {
            Ok(()) => {}
            // An address collision only means another draw is needed.
            Err(LedgerError::AccountExists(addr)) => {
                tracing::warn!(address = %addr, "seed.address_collision");
                continue;
            }
            Err(e) => return Err(e),
        }
        wallets.push(SeededWallet {
            index: wallets.len(),
            address: keypair.address(),
            keypair,
        });
    }
    tracing::info!(count, balance, "seed.wallets_created");
    Ok(wallets)
}

/// "Available Accounts" table with current balances.
pub fn render_accounts(ledger: &Ledger, wallets: &[SeededWallet]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "Address", "Balance"]);
    for wallet in wallets {
        table.add_row(vec![
            Cell::new(wallet.index),
            Cell::new(wallet.address.as_str()),
            Cell::new(ledger.balance_of(&wallet.address)),
        ]);
    }
    table.to_string()
}

/// Titled "Available Accounts" block as printed on the server console.
pub fn accounts_dump(ledger: &Ledger, wallets: &[SeededWallet]) -> String {
    format!(
        "{}\n{}",
        "Available Accounts".bright_cyan().bold(),
        render_accounts(ledger, wallets)
    )
}

/// "Private Keys" table.
pub fn render_private_keys(wallets: &[SeededWallet]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "Private Key"]);
    for wallet in wallets {
        table.add_row(vec![
            Cell::new(wallet.index),
            Cell::new(wallet.keypair.secret_key_hex()),
        ]);
    }
    table.to_string()
}
