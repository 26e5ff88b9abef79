use serde::{Deserialize, Serialize};

use super::{AccountHeader, HashHeight};
use crate::{
    crypto::{hash_parts, Address, Hash},
    time::TimestampSeconds,
};

// A momentum confirms a batch of account blocks for one time slot
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Momentum {
    pub height: u64,
    pub hash: Hash,
    pub previous_hash: Hash,
    pub timestamp: TimestampSeconds,
    pub producer: Address,
    pub content: Vec<AccountHeader>,

    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,
}

impl Momentum {
    pub fn identifier(&self) -> HashHeight {
        HashHeight::new(self.hash, self.height)
    }

    pub fn compute_hash(&self) -> Hash {
        let height = self.height.to_be_bytes();
        let timestamp = self.timestamp.to_be_bytes();
        let content_len = (self.content.len() as u64).to_be_bytes();

        let mut content = Vec::with_capacity(self.content.len() * 60);
        for header in &self.content {
            content.extend_from_slice(header.address.as_bytes());
            content.extend_from_slice(&header.height.to_be_bytes());
            content.extend_from_slice(header.hash.as_bytes());
        }

        hash_parts(&[
            &height,
            self.previous_hash.as_bytes(),
            &timestamp,
            self.producer.as_bytes(),
            &content_len,
            &content,
            &self.public_key,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_covers_content() {
        let mut momentum = Momentum {
            height: 2,
            timestamp: 1_000_000_010,
            ..Default::default()
        };
        let empty = momentum.compute_hash();
        momentum.content.push(AccountHeader {
            height: 2,
            ..Default::default()
        });
        assert_ne!(empty, momentum.compute_hash());
        assert_eq!(momentum.identifier().height, 2);
    }
}
