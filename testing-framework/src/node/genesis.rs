// File: testing-framework/src/node/genesis.rs
//
// Deterministic genesis state and the keys that control it.

use lazy_static::lazy_static;
use nom_common::{
    crypto::{Address, KeyPair},
    time::TimestampSeconds,
    token::{TokenStandard, QSR_TOKEN_STANDARD, ZNN_TOKEN_STANDARD},
};
use serde::{Deserialize, Serialize};

/// Timestamp of the genesis momentum (2001-09-09T01:46:40Z)
pub const GENESIS_TIMESTAMP: TimestampSeconds = 1_000_000_000;

/// ZNN every genesis user starts with
pub const GENESIS_ZNN_BALANCE: u64 = 1_000_000;

/// QSR every genesis user starts with
pub const GENESIS_QSR_BALANCE: u64 = 10_000_000;

const PILLAR_SEED_BASE: u64 = 0x5049_4c4c_4152_0000;
const USER_SEED_BASE: u64 = 0x5553_4552_0000_0000;

/// Number of genesis pillars
pub const PILLAR_COUNT: usize = 3;

/// Number of funded genesis users
pub const USER_COUNT: usize = 6;

lazy_static! {
    /// Keys of the genesis pillars, in genesis order
    ///
    /// Consensus reshuffles them every epoch; this order only fixes the
    /// indexes used by `with_owned_pillars`.
    pub static ref PILLAR_KEYS: Vec<KeyPair> = (0..PILLAR_COUNT as u64)
        .map(|i| KeyPair::from_seed(PILLAR_SEED_BASE + i))
        .collect();

    /// Keys of the funded genesis users
    pub static ref USER_KEYS: Vec<KeyPair> = (0..USER_COUNT as u64)
        .map(|i| KeyPair::from_seed(USER_SEED_BASE + i))
        .collect();

    /// Every key the harness can sign with
    pub static ref ALL_KEY_PAIRS: Vec<KeyPair> = PILLAR_KEYS
        .iter()
        .chain(USER_KEYS.iter())
        .cloned()
        .collect();
}

/// Key registered for an address, if any
pub fn key_for(address: &Address) -> Option<&'static KeyPair> {
    ALL_KEY_PAIRS.iter().find(|key| key.address() == *address)
}

/// Initial balance of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisBalance {
    pub address: Address,
    pub token_standard: TokenStandard,
    pub amount: u64,
}

/// State the ledger starts from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    pub timestamp: TimestampSeconds,
    pub pillars: Vec<Address>,
    pub balances: Vec<GenesisBalance>,
}

impl Genesis {
    /// Genesis with every pillar elected and every user funded
    pub fn embedded() -> Self {
        let balances = USER_KEYS
            .iter()
            .flat_map(|key| {
                [
                    GenesisBalance {
                        address: key.address(),
                        token_standard: ZNN_TOKEN_STANDARD,
                        amount: GENESIS_ZNN_BALANCE,
                    },
                    GenesisBalance {
                        address: key.address(),
                        token_standard: QSR_TOKEN_STANDARD,
                        amount: GENESIS_QSR_BALANCE,
                    },
                ]
            })
            .collect();

        Self {
            timestamp: GENESIS_TIMESTAMP,
            pillars: PILLAR_KEYS.iter().map(|key| key.address()).collect(),
            balances,
        }
    }

    /// Addresses holding at least one genesis balance, in first-seen order
    pub fn funded_addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = Vec::new();
        for balance in &self.balances {
            if !addresses.contains(&balance.address) {
                addresses.push(balance.address);
            }
        }
        addresses
    }
}

impl Default for Genesis {
    fn default() -> Self {
        Self::embedded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_keys_are_distinct() {
        let mut addresses: Vec<Address> = ALL_KEY_PAIRS.iter().map(|k| k.address()).collect();
        addresses.sort();
        addresses.dedup();
        assert_eq!(addresses.len(), PILLAR_COUNT + USER_COUNT);
    }

    #[test]
    fn test_key_lookup() {
        let user = USER_KEYS[2].address();
        assert_eq!(key_for(&user).map(|k| k.address()), Some(user));
        assert!(key_for(&Address::embedded(1)).is_none());
    }

    #[test]
    fn test_embedded_genesis_funds_users_only() {
        let genesis = Genesis::embedded();
        assert_eq!(genesis.pillars.len(), PILLAR_COUNT);
        assert_eq!(genesis.funded_addresses().len(), USER_COUNT);
        assert_eq!(genesis.balances.len(), USER_COUNT * 2);
        for pillar in &genesis.pillars {
            assert!(!genesis.funded_addresses().contains(pillar));
        }
    }
}
