// File: testing-framework/src/node/chain.rs
//
// In-memory ledger
//
// Holds one append-only chain per account plus the momentum sequence.
// Every insert is validated against the current frontier, so the harness
// exercises the same ordering rules a persistent ledger would enforce.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, trace};
use nom_common::{
    block::{AccountBlock, AccountBlockTransaction, AccountHeader, BlockType, Momentum},
    crypto::{verify_signature, Address, Hash},
    patch::Patch,
    token::TokenStandard,
};
use parking_lot::RwLock;

use super::{
    error::ChainError,
    genesis::Genesis,
    lifecycle::{ComponentState, Lifecycle, LifecycleError},
    Chain,
};

#[derive(Default)]
struct AccountChain {
    blocks: Vec<AccountBlock>,
    balances: BTreeMap<TokenStandard, u64>,
    storage: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl AccountChain {
    fn apply(&mut self, changes: &Patch) {
        for (key, value) in changes.storage() {
            match value {
                Some(value) => {
                    self.storage.insert(key.clone(), value.clone());
                }
                None => {
                    self.storage.remove(key);
                }
            }
        }
        for (token_standard, amount) in changes.balances() {
            self.balances.insert(*token_standard, *amount);
        }
    }
}

#[derive(Default)]
struct ChainState {
    momentums: Vec<Momentum>,
    accounts: HashMap<Address, AccountChain>,
    // hash -> (address, height)
    block_index: HashMap<Hash, (Address, u64)>,
    received: HashSet<Hash>,
    uncommitted: Vec<AccountHeader>,
    pending_embedded: Vec<Hash>,
}

impl ChainState {
    fn block(&self, hash: &Hash) -> Option<&AccountBlock> {
        let (address, height) = self.block_index.get(hash)?;
        self.accounts
            .get(address)?
            .blocks
            .get((*height as usize).checked_sub(1)?)
    }

    fn append(&mut self, transaction: AccountBlockTransaction) {
        let block = transaction.block;
        let header = block.header();
        let account = self.accounts.entry(block.address).or_default();
        account.apply(&transaction.changes);

        if block.block_type.is_receive() {
            self.received.insert(block.from_block_hash);
            self.pending_embedded.retain(|hash| *hash != block.from_block_hash);
        }
        if block.block_type.is_send() && block.to_address.is_embedded() {
            self.pending_embedded.push(block.hash);
        }

        self.block_index
            .insert(block.hash, (block.address, block.height));
        account.blocks.push(block);
        self.uncommitted.push(header);
    }
}

/// In-memory [`Chain`] seeded from a [`Genesis`].
pub struct MemoryChain {
    genesis: Genesis,
    lifecycle: Lifecycle,
    state: RwLock<ChainState>,
}

impl MemoryChain {
    pub fn new(genesis: Genesis) -> Self {
        Self {
            genesis,
            lifecycle: Lifecycle::new("chain"),
            state: RwLock::new(ChainState::default()),
        }
    }

    pub fn genesis(&self) -> &Genesis {
        &self.genesis
    }

    pub fn state(&self) -> ComponentState {
        self.lifecycle.state()
    }

    /// Number of momentums, genesis included
    pub fn momentum_count(&self) -> Result<usize, ChainError> {
        self.ensure_readable()?;
        Ok(self.state.read().momentums.len())
    }

    /// Momentum at a given height
    pub fn momentum_by_height(&self, height: u64) -> Result<Option<Momentum>, ChainError> {
        self.ensure_readable()?;
        let state = self.state.read();
        Ok(height
            .checked_sub(1)
            .and_then(|index| state.momentums.get(index as usize))
            .cloned())
    }

    fn ensure_readable(&self) -> Result<(), ChainError> {
        match self.lifecycle.state() {
            ComponentState::Created => Err(ChainError::NotInitialized),
            ComponentState::Stopped => Err(ChainError::Stopped),
            ComponentState::Initialized | ComponentState::Running => Ok(()),
        }
    }

    fn ensure_writable(&self, action: &'static str) -> Result<(), ChainError> {
        match self.lifecycle.state() {
            ComponentState::Running => Ok(()),
            ComponentState::Stopped => Err(ChainError::Stopped),
            state => Err(LifecycleError {
                component: "chain",
                action,
                state,
            }
            .into()),
        }
    }

    // Genesis blocks are unsigned and confirmed by the genesis momentum
    fn build_genesis(&self) -> Result<ChainState, ChainError> {
        let mut state = ChainState::default();

        for address in self.genesis.funded_addresses() {
            let mut changes = Patch::new();
            for balance in self.genesis.balances.iter().filter(|b| b.address == address) {
                changes.set_balance(balance.token_standard, balance.amount);
            }

            let mut block = AccountBlock {
                block_type: BlockType::Genesis,
                height: 1,
                address,
                ..Default::default()
            };
            block.hash = block.compute_hash();
            state.append(AccountBlockTransaction { block, changes });
        }

        let mut momentum = Momentum {
            height: 1,
            timestamp: self.genesis.timestamp,
            content: std::mem::take(&mut state.uncommitted),
            ..Default::default()
        };
        momentum.hash = momentum.compute_hash();
        debug!(
            "genesis momentum {} confirms {} accounts",
            momentum.hash,
            momentum.content.len()
        );
        state.momentums.push(momentum);

        Ok(state)
    }

    fn validate_account_block(
        state: &ChainState,
        block: &AccountBlock,
    ) -> Result<(), ChainError> {
        let computed = block.compute_hash();
        if computed != block.hash {
            return Err(ChainError::InvalidHash {
                expected: computed,
                got: block.hash,
            });
        }
        if state.block_index.contains_key(&block.hash) {
            return Err(ChainError::DuplicateBlock(block.hash));
        }

        let frontier = state
            .accounts
            .get(&block.address)
            .and_then(|account| account.blocks.last());
        let expected_height = frontier.map_or(1, |b| b.height + 1);
        if block.height != expected_height {
            return Err(ChainError::InvalidHeight {
                address: block.address,
                expected: expected_height,
                got: block.height,
            });
        }
        let expected_previous = frontier.map_or(Hash::zero(), |b| b.hash);
        if block.previous_hash != expected_previous {
            return Err(ChainError::InvalidPreviousHash {
                expected: expected_previous,
                got: block.previous_hash,
            });
        }

        // Embedded contracts have no keys
        if !block.address.is_embedded() {
            let signed = verify_signature(&block.public_key, &block.hash, &block.signature).is_ok();
            if !signed || Address::from_public_key(&block.public_key) != block.address {
                return Err(ChainError::InvalidSignature(block.hash));
            }
        }

        if block.block_type.is_receive() && state.received.contains(&block.from_block_hash) {
            return Err(ChainError::AlreadyReceived(block.from_block_hash));
        }
        Ok(())
    }
}

impl Chain for MemoryChain {
    fn init(&self) -> Result<(), ChainError> {
        self.lifecycle.init()?;
        let genesis = self.build_genesis()?;
        *self.state.write() = genesis;
        Ok(())
    }

    fn start(&self) -> Result<(), ChainError> {
        self.lifecycle.start()?;
        Ok(())
    }

    fn stop(&self) -> Result<(), ChainError> {
        self.lifecycle.stop()?;
        Ok(())
    }

    fn frontier_momentum(&self) -> Result<Momentum, ChainError> {
        self.ensure_readable()?;
        self.state
            .read()
            .momentums
            .last()
            .cloned()
            .ok_or(ChainError::NotInitialized)
    }

    fn frontier_account_block(&self, address: &Address) -> Result<Option<AccountBlock>, ChainError> {
        self.ensure_readable()?;
        Ok(self
            .state
            .read()
            .accounts
            .get(address)
            .and_then(|account| account.blocks.last())
            .cloned())
    }

    fn account_block_by_height(
        &self,
        address: &Address,
        height: u64,
    ) -> Result<Option<AccountBlock>, ChainError> {
        self.ensure_readable()?;
        let state = self.state.read();
        Ok(height.checked_sub(1).and_then(|index| {
            state
                .accounts
                .get(address)
                .and_then(|account| account.blocks.get(index as usize))
                .cloned()
        }))
    }

    fn account_block_by_hash(&self, hash: &Hash) -> Result<Option<AccountBlock>, ChainError> {
        self.ensure_readable()?;
        Ok(self.state.read().block(hash).cloned())
    }

    fn balance(
        &self,
        address: &Address,
        token_standard: &TokenStandard,
    ) -> Result<Option<u64>, ChainError> {
        self.ensure_readable()?;
        Ok(self
            .state
            .read()
            .accounts
            .get(address)
            .and_then(|account| account.balances.get(token_standard))
            .copied())
    }

    fn storage_value(&self, address: &Address, key: &[u8]) -> Result<Option<Vec<u8>>, ChainError> {
        self.ensure_readable()?;
        Ok(self
            .state
            .read()
            .accounts
            .get(address)
            .and_then(|account| account.storage.get(key))
            .cloned())
    }

    fn is_received(&self, send_hash: &Hash) -> Result<bool, ChainError> {
        self.ensure_readable()?;
        Ok(self.state.read().received.contains(send_hash))
    }

    fn insert_account_block(&self, transaction: AccountBlockTransaction) -> Result<(), ChainError> {
        self.ensure_writable("insert account-block")?;
        let mut state = self.state.write();
        Self::validate_account_block(&state, &transaction.block)?;
        trace!("inserting account-block {}", transaction.block.header());
        state.append(transaction);
        Ok(())
    }

    fn insert_momentum(&self, momentum: Momentum) -> Result<(), ChainError> {
        self.ensure_writable("insert momentum")?;
        let mut state = self.state.write();
        let frontier = state.momentums.last().ok_or(ChainError::NotInitialized)?;

        if momentum.height != frontier.height + 1 {
            return Err(ChainError::InvalidMomentumHeight {
                expected: frontier.height + 1,
                got: momentum.height,
            });
        }
        if momentum.previous_hash != frontier.hash {
            return Err(ChainError::InvalidMomentumPrevious {
                expected: frontier.hash,
                got: momentum.previous_hash,
            });
        }
        if momentum.timestamp <= frontier.timestamp {
            return Err(ChainError::InvalidMomentumTimestamp {
                frontier: frontier.timestamp,
                got: momentum.timestamp,
            });
        }
        let computed = momentum.compute_hash();
        if computed != momentum.hash {
            return Err(ChainError::InvalidHash {
                expected: computed,
                got: momentum.hash,
            });
        }
        let signed =
            verify_signature(&momentum.public_key, &momentum.hash, &momentum.signature).is_ok();
        if !signed || Address::from_public_key(&momentum.public_key) != momentum.producer {
            return Err(ChainError::InvalidSignature(momentum.hash));
        }
        if let Some(unknown) = momentum
            .content
            .iter()
            .find(|header| !state.uncommitted.contains(header))
        {
            return Err(ChainError::InvalidMomentumContent(*unknown));
        }

        state
            .uncommitted
            .retain(|header| !momentum.content.contains(header));
        debug!(
            "inserted momentum height={} hash={} blocks={}",
            momentum.height,
            momentum.hash,
            momentum.content.len()
        );
        state.momentums.push(momentum);
        Ok(())
    }

    fn uncommitted_account_blocks(&self) -> Result<Vec<AccountHeader>, ChainError> {
        self.ensure_readable()?;
        Ok(self.state.read().uncommitted.clone())
    }

    fn unreceived_embedded_sends(&self) -> Result<Vec<AccountBlock>, ChainError> {
        self.ensure_readable()?;
        let state = self.state.read();
        Ok(state
            .pending_embedded
            .iter()
            .filter_map(|hash| state.block(hash).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::genesis::{GENESIS_TIMESTAMP, GENESIS_ZNN_BALANCE, PILLAR_KEYS, USER_KEYS};
    use nom_common::token::ZNN_TOKEN_STANDARD;

    fn running_chain() -> MemoryChain {
        let chain = MemoryChain::new(Genesis::embedded());
        chain.init().unwrap();
        chain.start().unwrap();
        chain
    }

    fn signed_send(chain: &MemoryChain, amount: u64) -> AccountBlockTransaction {
        let key = &USER_KEYS[0];
        let frontier = chain
            .frontier_account_block(&key.address())
            .unwrap()
            .unwrap();
        let mut block = AccountBlock {
            block_type: BlockType::UserSend,
            height: frontier.height + 1,
            previous_hash: frontier.hash,
            address: key.address(),
            to_address: USER_KEYS[1].address(),
            amount,
            token_standard: ZNN_TOKEN_STANDARD,
            public_key: key.public_key().to_vec(),
            ..Default::default()
        };
        block.hash = block.compute_hash();
        block.signature = key.sign(&block.hash);

        let mut changes = Patch::new();
        changes.set_balance(ZNN_TOKEN_STANDARD, GENESIS_ZNN_BALANCE - amount);
        AccountBlockTransaction { block, changes }
    }

    fn signed_momentum(chain: &MemoryChain, offset: u64) -> Momentum {
        let key = &PILLAR_KEYS[0];
        let frontier = chain.frontier_momentum().unwrap();
        let mut momentum = Momentum {
            height: frontier.height + 1,
            previous_hash: frontier.hash,
            timestamp: frontier.timestamp + offset,
            producer: key.address(),
            content: chain.uncommitted_account_blocks().unwrap(),
            public_key: key.public_key().to_vec(),
            ..Default::default()
        };
        momentum.hash = momentum.compute_hash();
        momentum.signature = key.sign(&momentum.hash);
        momentum
    }

    #[test]
    fn test_genesis_state() {
        let chain = running_chain();
        let frontier = chain.frontier_momentum().unwrap();
        assert_eq!(frontier.height, 1);
        assert_eq!(frontier.timestamp, GENESIS_TIMESTAMP);
        assert!(chain.uncommitted_account_blocks().unwrap().is_empty());

        let alice = USER_KEYS[0].address();
        assert_eq!(
            chain.balance(&alice, &ZNN_TOKEN_STANDARD).unwrap(),
            Some(GENESIS_ZNN_BALANCE)
        );
        assert_eq!(
            chain.balance(&PILLAR_KEYS[0].address(), &ZNN_TOKEN_STANDARD).unwrap(),
            None
        );
    }

    #[test]
    fn test_reads_fail_before_init_and_after_stop() {
        let chain = MemoryChain::new(Genesis::embedded());
        assert_eq!(chain.frontier_momentum(), Err(ChainError::NotInitialized));

        chain.init().unwrap();
        chain.start().unwrap();
        chain.stop().unwrap();
        assert_eq!(chain.frontier_momentum(), Err(ChainError::Stopped));
    }

    #[test]
    fn test_insert_send_then_momentum() {
        let chain = running_chain();
        let send = signed_send(&chain, 10);
        let header = send.block.header();
        chain.insert_account_block(send).unwrap();

        assert_eq!(chain.uncommitted_account_blocks().unwrap(), vec![header]);
        assert_eq!(
            chain.balance(&header.address, &ZNN_TOKEN_STANDARD).unwrap(),
            Some(GENESIS_ZNN_BALANCE - 10)
        );

        chain.insert_momentum(signed_momentum(&chain, 10)).unwrap();
        assert_eq!(chain.frontier_momentum().unwrap().height, 2);
        assert!(chain.uncommitted_account_blocks().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_out_of_order_block() {
        let chain = running_chain();
        let mut send = signed_send(&chain, 1);
        send.block.height += 1;
        send.block.hash = send.block.compute_hash();
        send.block.signature = USER_KEYS[0].sign(&send.block.hash);

        assert!(matches!(
            chain.insert_account_block(send),
            Err(ChainError::InvalidHeight { expected: 2, got: 3, .. })
        ));
    }

    #[test]
    fn test_rejects_foreign_signature() {
        let chain = running_chain();
        let mut send = signed_send(&chain, 1);
        send.block.signature = USER_KEYS[1].sign(&send.block.hash);
        assert_eq!(
            chain.insert_account_block(send.clone()),
            Err(ChainError::InvalidSignature(send.block.hash))
        );
    }

    #[test]
    fn test_rejects_momentum_not_after_frontier() {
        let chain = running_chain();
        let momentum = signed_momentum(&chain, 0);
        assert!(matches!(
            chain.insert_momentum(momentum),
            Err(ChainError::InvalidMomentumTimestamp { .. })
        ));
    }

    #[test]
    fn test_inserts_require_running_chain() {
        let chain = MemoryChain::new(Genesis::embedded());
        chain.init().unwrap();
        let send = signed_send(&chain, 1);
        assert!(matches!(
            chain.insert_account_block(send),
            Err(ChainError::Lifecycle(_))
        ));
    }
}
