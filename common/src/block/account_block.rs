use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::{
    crypto::{hash_parts, Address, Hash},
    patch::Patch,
    token::TokenStandard,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlockType {
    // Left unset in templates, filled in by the supervisor
    #[default]
    Unspecified = 0,
    Genesis = 1,
    UserSend = 2,
    UserReceive = 3,
    ContractSend = 4,
    ContractReceive = 5,
}

impl BlockType {
    pub fn is_send(&self) -> bool {
        matches!(self, BlockType::UserSend | BlockType::ContractSend)
    }

    pub fn is_receive(&self) -> bool {
        matches!(self, BlockType::UserReceive | BlockType::ContractReceive)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashHeight {
    pub hash: Hash,
    pub height: u64,
}

impl HashHeight {
    pub fn new(hash: Hash, height: u64) -> Self {
        Self { hash, height }
    }
}

impl Display for HashHeight {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{hash:{} height:{}}}", self.hash, self.height)
    }
}

// Uniquely identifies one block of one account chain
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountHeader {
    pub address: Address,
    pub height: u64,
    pub hash: Hash,
}

impl AccountHeader {
    pub fn identifier(&self) -> HashHeight {
        HashHeight::new(self.hash, self.height)
    }
}

impl Display for AccountHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{address:{} hash:{} height:{}}}",
            self.address, self.hash, self.height
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBlock {
    pub block_type: BlockType,
    pub hash: Hash,
    pub previous_hash: Hash,
    pub height: u64,
    pub momentum_acknowledged: HashHeight,

    pub address: Address,
    // Send fields
    pub to_address: Address,
    pub amount: u64,
    pub token_standard: TokenStandard,
    // Receive fields
    pub from_block_hash: Hash,

    pub data: Vec<u8>,

    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,
}

impl AccountBlock {
    pub fn header(&self) -> AccountHeader {
        AccountHeader {
            address: self.address,
            height: self.height,
            hash: self.hash,
        }
    }

    pub fn identifier(&self) -> HashHeight {
        HashHeight::new(self.hash, self.height)
    }

    // Everything but the hash and the signature is covered
    pub fn compute_hash(&self) -> Hash {
        let block_type = [self.block_type as u8];
        let height = self.height.to_be_bytes();
        let ack_height = self.momentum_acknowledged.height.to_be_bytes();
        let amount = self.amount.to_be_bytes();
        let data_len = (self.data.len() as u64).to_be_bytes();

        hash_parts(&[
            &block_type,
            self.previous_hash.as_bytes(),
            &height,
            self.momentum_acknowledged.hash.as_bytes(),
            &ack_height,
            self.address.as_bytes(),
            self.to_address.as_bytes(),
            &amount,
            self.token_standard.as_bytes(),
            self.from_block_hash.as_bytes(),
            &data_len,
            &self.data,
            &self.public_key,
        ])
    }
}

// A completed block together with the changes it applies
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountBlockTransaction {
    pub block: AccountBlock,
    pub changes: Patch,
}
