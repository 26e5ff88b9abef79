// File: testing-framework/src/node/embedded.rs
//
// Embedded contracts
//
// Embedded contracts live at reserved addresses and are executed by the
// supervisor when a pillar picks up a send addressed to them. Call data is
// a JSON document tagged by `method`.

use std::collections::BTreeMap;

use nom_common::{
    block::AccountBlock,
    crypto::Address,
    patch::Patch,
    token::{TokenStandard, ZNN_TOKEN_STANDARD},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{error::ChainError, Chain};

/// Address of the deposit vault
pub const VAULT_ADDRESS: Address = Address::embedded(1);

const DEPOSIT_KEY_PREFIX: &[u8] = b"deposit:";

/// Errors an embedded contract returns to the caller.
///
/// The rendered message is what ends up in the diagnostic outcome of the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmbeddedError {
    #[error("invalid method data")]
    InvalidMethod,

    #[error("deposit amount must be positive")]
    ZeroDeposit,

    #[error("withdraw amount must be positive")]
    ZeroWithdraw,

    #[error("only ZNN can be deposited")]
    InvalidToken,

    #[error("withdraw does not accept funds")]
    UnexpectedFunds,

    #[error("insufficient deposit: requested {requested}, available {available}")]
    InsufficientDeposit { requested: u64, available: u64 },

    #[error("contract balance too low")]
    InsufficientBalance,

    #[error("contract balance overflow")]
    BalanceOverflow,

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Methods of the deposit vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum VaultMethod {
    /// Lock the ZNN attached to the call
    Deposit,
    /// Release previously deposited ZNN back to the caller
    Withdraw { amount: u64 },
}

impl VaultMethod {
    /// Call data for this method
    pub fn to_data(&self) -> Vec<u8> {
        // Serializing a fieldless or u64-only enum cannot fail
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Funds an embedded contract sends out as a result of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractTransfer {
    pub to_address: Address,
    pub token_standard: TokenStandard,
    pub amount: u64,
}

/// Mutable view of one contract's state during a call.
///
/// Reads fall through to the chain; writes stay local until the supervisor
/// turns them into blocks. Dropping the context discards every change.
pub struct ContractContext<'a> {
    address: Address,
    chain: &'a dyn Chain,
    storage: Patch,
    balances: BTreeMap<TokenStandard, u64>,
    transfers: Vec<ContractTransfer>,
}

impl<'a> ContractContext<'a> {
    pub fn new(address: Address, chain: &'a dyn Chain) -> Self {
        Self {
            address,
            chain,
            storage: Patch::new(),
            balances: BTreeMap::new(),
            transfers: Vec::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn storage_value(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ChainError> {
        match self.storage.get(key) {
            Some(value) => Ok(value.map(<[u8]>::to_vec)),
            None => self.chain.storage_value(&self.address, key),
        }
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.storage.put(key, value);
    }

    pub fn balance(&self, token_standard: &TokenStandard) -> Result<u64, ChainError> {
        match self.balances.get(token_standard) {
            Some(amount) => Ok(*amount),
            None => Ok(self
                .chain
                .balance(&self.address, token_standard)?
                .unwrap_or(0)),
        }
    }

    pub fn credit(&mut self, token_standard: TokenStandard, amount: u64) -> Result<(), EmbeddedError> {
        let balance = self
            .balance(&token_standard)?
            .checked_add(amount)
            .ok_or(EmbeddedError::BalanceOverflow)?;
        self.balances.insert(token_standard, balance);
        Ok(())
    }

    /// Queue an outgoing send, debiting the contract balance
    pub fn transfer(
        &mut self,
        to_address: Address,
        token_standard: TokenStandard,
        amount: u64,
    ) -> Result<(), EmbeddedError> {
        let balance = self
            .balance(&token_standard)?
            .checked_sub(amount)
            .ok_or(EmbeddedError::InsufficientBalance)?;
        self.balances.insert(token_standard, balance);
        self.transfers.push(ContractTransfer {
            to_address,
            token_standard,
            amount,
        });
        Ok(())
    }

    /// Storage writes, final balances and queued transfers
    pub fn into_parts(self) -> (Patch, BTreeMap<TokenStandard, u64>, Vec<ContractTransfer>) {
        (self.storage, self.balances, self.transfers)
    }
}

/// An embedded contract.
pub trait EmbeddedContract: Send + Sync {
    fn name(&self) -> &'static str;

    /// Execute the call carried by `send`.
    /// The attached funds are already credited to the context.
    fn execute(&self, context: &mut ContractContext<'_>, send: &AccountBlock) -> Result<(), EmbeddedError>;
}

/// Contract deployed at `address`, if any
pub fn contract_for(address: &Address) -> Option<&'static dyn EmbeddedContract> {
    match *address {
        VAULT_ADDRESS => Some(&Vault),
        _ => None,
    }
}

/// Keeps ZNN deposits per depositor.
pub struct Vault;

impl Vault {
    fn deposit_key(depositor: &Address) -> Vec<u8> {
        let mut key = DEPOSIT_KEY_PREFIX.to_vec();
        key.extend_from_slice(depositor.as_bytes());
        key
    }

    fn decode_amount(value: Option<Vec<u8>>) -> u64 {
        value
            .and_then(|bytes| <[u8; 8]>::try_from(bytes.as_slice()).ok())
            .map(u64::from_be_bytes)
            .unwrap_or(0)
    }

    /// Confirmed deposit of `depositor`
    pub fn deposit_of(chain: &dyn Chain, depositor: &Address) -> Result<u64, ChainError> {
        let value = chain.storage_value(&VAULT_ADDRESS, &Self::deposit_key(depositor))?;
        Ok(Self::decode_amount(value))
    }
}

impl EmbeddedContract for Vault {
    fn name(&self) -> &'static str {
        "vault"
    }

    fn execute(&self, context: &mut ContractContext<'_>, send: &AccountBlock) -> Result<(), EmbeddedError> {
        let method: VaultMethod =
            serde_json::from_slice(&send.data).map_err(|_| EmbeddedError::InvalidMethod)?;
        let key = Self::deposit_key(&send.address);
        let available = Self::decode_amount(context.storage_value(&key)?);

        match method {
            VaultMethod::Deposit => {
                if send.amount == 0 {
                    return Err(EmbeddedError::ZeroDeposit);
                }
                if send.token_standard != ZNN_TOKEN_STANDARD {
                    return Err(EmbeddedError::InvalidToken);
                }
                let total = available
                    .checked_add(send.amount)
                    .ok_or(EmbeddedError::BalanceOverflow)?;
                context.put(key, total.to_be_bytes().to_vec());
            }
            VaultMethod::Withdraw { amount } => {
                if send.amount != 0 {
                    return Err(EmbeddedError::UnexpectedFunds);
                }
                if amount == 0 {
                    return Err(EmbeddedError::ZeroWithdraw);
                }
                if amount > available {
                    return Err(EmbeddedError::InsufficientDeposit {
                        requested: amount,
                        available,
                    });
                }
                context.put(key, (available - amount).to_be_bytes().to_vec());
                context.transfer(send.address, ZNN_TOKEN_STANDARD, amount)?;
            }
        }
        Ok(())
    }
}
