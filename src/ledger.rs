//! In-memory account store and the single transfer mutation path

use crate::crypto::{derive_address, Address, DecodeError};
use crate::error::LedgerError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    /// Hex public key, uncompressed. Absent for accounts only reachable
    /// through recovery-based verification.
    pub public_key: Option<String>,
    pub balance: i64,
    /// Number of transfers debited from this account; the next expected nonce.
    pub nonce: u64,
}

impl Account {
    pub fn new(address: Address, balance: i64) -> Self {
        Account {
            address,
            public_key: None,
            balance,
            nonce: 0,
        }
    }

    /// Opens an account keyed by the address derived from `public_key_hex`.
    pub fn with_public_key(public_key_hex: &str, balance: i64) -> Result<Self, DecodeError> {
        let address = derive_address(public_key_hex)?;
        Ok(Account {
            address,
            public_key: Some(public_key_hex.trim().to_ascii_lowercase()),
            balance,
            nonce: 0,
        })
    }
}

/// Optional strictness knobs. Both default to the permissive behaviour:
/// overdrafts are allowed and signed requests can be replayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerPolicy {
    #[serde(default)]
    pub require_sufficient_balance: bool,
    #[serde(default)]
    pub require_nonce: bool,
}

/// Address → account map shared by the whole process.
#[derive(Debug, Default)]
pub struct Ledger {
    accounts: RwLock<HashMap<Address, Account>>,
    policy: LedgerPolicy,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: LedgerPolicy) -> Self {
        Ledger {
            accounts: RwLock::new(HashMap::new()),
            policy,
        }
    }

    pub fn policy(&self) -> LedgerPolicy {
        self.policy
    }

    /// Adds an account. Addresses are unique.
    pub fn open_account(&self, account: Account) -> Result<(), LedgerError> {
        let mut accounts = self.accounts.write();
        if accounts.contains_key(&account.address) {
            return Err(LedgerError::AccountExists(account.address.to_string()));
        }
        accounts.insert(account.address.clone(), account);
        Ok(())
    }

    /// Balance of `address`; unknown addresses hold 0.
    pub fn balance_of(&self, address: &Address) -> i64 {
        self.accounts
            .read()
            .get(address)
            .map(|a| a.balance)
            .unwrap_or(0)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.accounts.read().contains_key(address)
    }

    pub fn public_key_of(&self, address: &Address) -> Option<String> {
        self.accounts
            .read()
            .get(address)
            .and_then(|a| a.public_key.clone())
    }

    pub fn nonce_of(&self, address: &Address) -> Option<u64> {
        self.accounts.read().get(address).map(|a| a.nonce)
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }

    /// Sum of all balances.
    pub fn total_balance(&self) -> i128 {
        self.accounts
            .read()
            .values()
            .map(|a| i128::from(a.balance))
            .sum()
    }

    /// Snapshot of all accounts ordered by address.
    pub fn accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self.accounts.read().values().cloned().collect();
        accounts.sort_by(|a, b| a.address.cmp(&b.address));
        accounts
    }

    /// Moves `amount` from `sender` to `recipient` and returns the sender's new balance.
    ///
    /// Callers verify the signature first; this only enforces account
    /// existence and the configured policy. The whole check-and-mutate runs
    /// under one write lock, so either both balances change or neither does.
    pub fn apply_transfer(
        &self,
        sender: &Address,
        recipient: &Address,
        amount: i64,
        nonce: Option<u64>,
    ) -> Result<i64, LedgerError> {
        if amount < 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "amount must not be negative: {}",
                amount
            )));
        }

        let mut accounts = self.accounts.write();

        let (sender_balance, sender_nonce) = match accounts.get(sender) {
            Some(account) => (account.balance, account.nonce),
            None => return Err(LedgerError::UnknownSender),
        };
        let recipient_balance = match accounts.get(recipient) {
            Some(account) => account.balance,
            None => return Err(LedgerError::InvalidRecipient),
        };

        if self.policy.require_nonce && nonce != Some(sender_nonce) {
            return Err(LedgerError::InvalidNonce {
                expected: sender_nonce,
                got: nonce,
            });
        }

        if self.policy.require_sufficient_balance && sender_balance < amount {
            return Err(LedgerError::InsufficientBalance {
                balance: sender_balance,
                amount,
            });
        }

        let debited = sender_balance
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InvalidAmount("sender balance would underflow".to_string()))?;

        if sender == recipient {
            if let Some(account) = accounts.get_mut(sender) {
                account.nonce += 1;
            }
            return Ok(sender_balance);
        }

        let credited = recipient_balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::InvalidAmount("recipient balance would overflow".to_string()))?;

        if let Some(account) = accounts.get_mut(sender) {
            account.balance = debited;
            account.nonce += 1;
        }
        if let Some(account) = accounts.get_mut(recipient) {
            account.balance = credited;
        }

        Ok(debited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ledger_with(policy: LedgerPolicy, balances: &[(&str, i64)]) -> Ledger {
        let ledger = Ledger::with_policy(policy);
        for (addr, balance) in balances {
            ledger.open_account(Account::new(Address::new(addr), *balance)).unwrap();
        }
        ledger
    }

    #[test]
    fn test_unknown_address_has_zero_balance() {
        let ledger = Ledger::new();
        assert_eq!(ledger.balance_of(&Address::new("nobody")), 0);
    }

    #[test]
    fn test_transfer_conserves_balances() {
        let ledger = ledger_with(LedgerPolicy::default(), &[("a", 100), ("b", 100)]);
        let (a, b) = (Address::new("a"), Address::new("b"));

        let new_balance = ledger.apply_transfer(&a, &b, 30, None).unwrap();

        assert_eq!(new_balance, 70);
        assert_eq!(ledger.balance_of(&a), 70);
        assert_eq!(ledger.balance_of(&b), 130);
        assert_eq!(ledger.total_balance(), 200);
        assert_eq!(ledger.nonce_of(&a), Some(1));
        assert_eq!(ledger.nonce_of(&b), Some(0));
    }

    #[test]
    fn test_permissive_policy_allows_overdraft() {
        let ledger = ledger_with(LedgerPolicy::default(), &[("a", 10), ("b", 0)]);
        let balance = ledger
            .apply_transfer(&Address::new("a"), &Address::new("b"), 25, None)
            .unwrap();
        assert_eq!(balance, -15);
        assert_eq!(ledger.balance_of(&Address::new("b")), 25);
    }

    #[test]
    fn test_sufficient_balance_policy_rejects_without_mutation() {
        let policy = LedgerPolicy {
            require_sufficient_balance: true,
            ..Default::default()
        };
        let ledger = ledger_with(policy, &[("a", 10), ("b", 0)]);

        let result = ledger.apply_transfer(&Address::new("a"), &Address::new("b"), 25, None);

        assert_eq!(
            result,
            Err(LedgerError::InsufficientBalance {
                balance: 10,
                amount: 25
            })
        );
        assert_eq!(ledger.balance_of(&Address::new("a")), 10);
        assert_eq!(ledger.balance_of(&Address::new("b")), 0);
        assert_eq!(ledger.nonce_of(&Address::new("a")), Some(0));
    }

    #[test]
    fn test_nonce_policy() {
        let policy = LedgerPolicy {
            require_nonce: true,
            ..Default::default()
        };
        let ledger = ledger_with(policy, &[("a", 100), ("b", 0)]);
        let (a, b) = (Address::new("a"), Address::new("b"));

        assert_eq!(
            ledger.apply_transfer(&a, &b, 1, None),
            Err(LedgerError::InvalidNonce {
                expected: 0,
                got: None
            })
        );
        assert_eq!(ledger.apply_transfer(&a, &b, 1, Some(0)), Ok(99));
        assert_eq!(
            ledger.apply_transfer(&a, &b, 1, Some(0)),
            Err(LedgerError::InvalidNonce {
                expected: 1,
                got: Some(0)
            })
        );
        assert_eq!(ledger.apply_transfer(&a, &b, 1, Some(1)), Ok(98));
    }

    #[test]
    fn test_missing_accounts() {
        let ledger = ledger_with(LedgerPolicy::default(), &[("a", 100)]);
        assert_eq!(
            ledger.apply_transfer(&Address::new("a"), &Address::new("ghost"), 1, None),
            Err(LedgerError::InvalidRecipient)
        );
        assert_eq!(
            ledger.apply_transfer(&Address::new("ghost"), &Address::new("a"), 1, None),
            Err(LedgerError::UnknownSender)
        );
        assert_eq!(ledger.balance_of(&Address::new("a")), 100);
        assert!(!ledger.contains(&Address::new("ghost")));
    }

    #[test]
    fn test_self_transfer_keeps_balance() {
        let ledger = ledger_with(LedgerPolicy::default(), &[("a", 100)]);
        let a = Address::new("a");
        assert_eq!(ledger.apply_transfer(&a, &a, 40, None), Ok(100));
        assert_eq!(ledger.balance_of(&a), 100);
        assert_eq!(ledger.nonce_of(&a), Some(1));
    }

    #[test]
    fn test_overflow_rejected() {
        let ledger = ledger_with(LedgerPolicy::default(), &[("a", 0), ("b", i64::MAX)]);
        let result = ledger.apply_transfer(&Address::new("a"), &Address::new("b"), 1, None);
        assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));
        assert_eq!(ledger.balance_of(&Address::new("a")), 0);
    }

    #[test]
    fn test_duplicate_account_rejected() {
        let ledger = ledger_with(LedgerPolicy::default(), &[("a", 1)]);
        let result = ledger.open_account(Account::new(Address::new("A"), 5));
        assert_eq!(result, Err(LedgerError::AccountExists("a".to_string())));
        assert_eq!(ledger.balance_of(&Address::new("a")), 1);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_concurrent_transfers_do_not_lose_updates() {
        let ledger = Arc::new(ledger_with(
            LedgerPolicy::default(),
            &[("a", 1_000), ("b", 1_000), ("c", 1_000)],
        ));
        let pairs = [("a", "b"), ("b", "c"), ("c", "a"), ("b", "a")];

        let handles: Vec<_> = pairs
            .iter()
            .map(|(from, to)| {
                let ledger = Arc::clone(&ledger);
                let (from, to) = (Address::new(from), Address::new(to));
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        ledger.apply_transfer(&from, &to, 1, None).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ledger.total_balance(), 3_000);
        // a: -250 (to b) +250 (from c) +250 (from b)
        assert_eq!(ledger.balance_of(&Address::new("a")), 1_250);
        assert_eq!(ledger.balance_of(&Address::new("b")), 750);
        assert_eq!(ledger.balance_of(&Address::new("c")), 1_000);
    }
}
