// File: testing-framework/src/node/supervisor.rs
//
// Block generation
//
// Turns user templates into signed, fully linked blocks and executes
// embedded contracts on behalf of the pillar that picks up their sends.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use nom_common::{
    block::{AccountBlock, AccountBlockTransaction, BlockType, HashHeight},
    crypto::{Address, Hash, KeyPair},
    patch::Patch,
    token::{TokenStandard, ZNN_TOKEN_STANDARD},
};

use super::{
    embedded::{contract_for, ContractContext, ContractTransfer, EmbeddedError},
    error::VmError,
    Chain,
};

// Failures of the bookkeeping around a call, not of the call itself
fn contract_failure(err: EmbeddedError) -> VmError {
    match err {
        EmbeddedError::Chain(err) => VmError::Chain(err),
        _ => VmError::BalanceOverflow,
    }
}

/// Outcome of running an embedded contract over one send block.
#[derive(Debug, Clone)]
pub struct EmbeddedExecution {
    /// Contract receive consuming the send
    pub receive: AccountBlockTransaction,
    /// Contract sends issued by the call, chained after the receive
    pub descendants: Vec<AccountBlockTransaction>,
    /// Rendered contract error; `None` on success
    pub returned_error: Option<String>,
}

/// Generates blocks against the current chain state.
pub struct Supervisor {
    chain: Arc<dyn Chain>,
}

impl Supervisor {
    pub fn new(chain: Arc<dyn Chain>) -> Self {
        Self { chain }
    }

    /// Complete a user template and sign it with `signer`.
    ///
    /// Linking fields (height, previous hash, acknowledged momentum) and
    /// the hash, key and signature are always overwritten.
    pub fn generate_from_template(
        &self,
        template: &AccountBlock,
        signer: &KeyPair,
    ) -> Result<AccountBlockTransaction, VmError> {
        if template.address != signer.address() {
            return Err(VmError::SignerMismatch {
                template: template.address,
                signer: signer.address(),
            });
        }

        let mut block = template.clone();
        let mut changes = Patch::new();
        match block.block_type {
            BlockType::UserSend => {
                if block.to_address.is_zero() {
                    return Err(VmError::MissingToAddress);
                }
                if block.to_address.is_embedded() && contract_for(&block.to_address).is_none() {
                    return Err(VmError::UnknownContract(block.to_address));
                }
                if block.token_standard.is_zero() {
                    block.token_standard = ZNN_TOKEN_STANDARD;
                }
                let have = self
                    .chain
                    .balance(&block.address, &block.token_standard)?
                    .unwrap_or(0);
                if block.amount > have {
                    return Err(VmError::InsufficientBalance {
                        need: block.amount,
                        have,
                    });
                }
                if block.amount > 0 {
                    changes.set_balance(block.token_standard, have - block.amount);
                }
            }
            BlockType::UserReceive => {
                let from = self.receivable(&block.from_block_hash, &block.address)?;
                block.amount = from.amount;
                block.token_standard = from.token_standard;
                if block.amount > 0 {
                    let balance = self
                        .chain
                        .balance(&block.address, &block.token_standard)?
                        .unwrap_or(0)
                        .checked_add(block.amount)
                        .ok_or(VmError::BalanceOverflow)?;
                    changes.set_balance(block.token_standard, balance);
                }
            }
            other => return Err(VmError::InvalidBlockType(other)),
        }

        self.link(&mut block)?;
        block.public_key = signer.public_key().to_vec();
        block.hash = block.compute_hash();
        block.signature = signer.sign(&block.hash);

        Ok(AccountBlockTransaction { block, changes })
    }

    /// Run the embedded contract addressed by `send`.
    ///
    /// A contract error discards every change the call made; the attached
    /// funds are refunded to the caller through a contract send instead.
    pub fn generate_embedded(&self, send: &AccountBlock) -> Result<EmbeddedExecution, VmError> {
        let contract_address = send.to_address;
        let contract =
            contract_for(&contract_address).ok_or(VmError::UnknownContract(contract_address))?;
        if !send.block_type.is_send() {
            return Err(VmError::NotASendBlock(send.hash));
        }
        if self.chain.is_received(&send.hash)? {
            return Err(VmError::AlreadyReceived(send.hash));
        }

        let chain = self.chain.as_ref();
        let mut context = ContractContext::new(contract_address, chain);
        context
            .credit(send.token_standard, send.amount)
            .map_err(contract_failure)?;

        let returned_error = match contract.execute(&mut context, send) {
            Ok(()) => None,
            Err(err) => {
                debug!("{} rejected {}: {}", contract.name(), send.hash, err);
                context = ContractContext::new(contract_address, chain);
                context
                    .credit(send.token_standard, send.amount)
                    .map_err(contract_failure)?;
                if send.amount > 0 {
                    context
                        .transfer(send.address, send.token_standard, send.amount)
                        .map_err(contract_failure)?;
                }
                Some(err.to_string())
            }
        };

        let (storage, final_balances, transfers) = context.into_parts();
        let mut balances = Self::balances_before_transfers(final_balances, &transfers);

        let mut receive = AccountBlock {
            block_type: BlockType::ContractReceive,
            address: contract_address,
            from_block_hash: send.hash,
            amount: send.amount,
            token_standard: send.token_standard,
            ..Default::default()
        };
        self.link(&mut receive)?;
        receive.hash = receive.compute_hash();

        let mut receive_changes = storage;
        for (token_standard, amount) in &balances {
            receive_changes.set_balance(*token_standard, *amount);
        }

        let mut previous = receive.clone();
        let mut descendants = Vec::with_capacity(transfers.len());
        for transfer in transfers {
            let mut block = AccountBlock {
                block_type: BlockType::ContractSend,
                address: contract_address,
                height: previous.height + 1,
                previous_hash: previous.hash,
                momentum_acknowledged: previous.momentum_acknowledged,
                to_address: transfer.to_address,
                amount: transfer.amount,
                token_standard: transfer.token_standard,
                ..Default::default()
            };
            block.hash = block.compute_hash();

            let remaining = balances.entry(transfer.token_standard).or_default();
            *remaining -= transfer.amount;
            let mut changes = Patch::new();
            changes.set_balance(transfer.token_standard, *remaining);

            previous = block.clone();
            descendants.push(AccountBlockTransaction { block, changes });
        }

        Ok(EmbeddedExecution {
            receive: AccountBlockTransaction {
                block: receive,
                changes: receive_changes,
            },
            descendants,
            returned_error,
        })
    }

    fn receivable(&self, from_hash: &Hash, receiver: &Address) -> Result<AccountBlock, VmError> {
        let from = self
            .chain
            .account_block_by_hash(from_hash)?
            .ok_or(VmError::MissingFromBlock(*from_hash))?;
        if !from.block_type.is_send() {
            return Err(VmError::NotASendBlock(from.hash));
        }
        if from.to_address != *receiver {
            return Err(VmError::InvalidReceiver {
                hash: from.hash,
                expected: from.to_address,
                got: *receiver,
            });
        }
        if self.chain.is_received(&from.hash)? {
            return Err(VmError::AlreadyReceived(from.hash));
        }
        Ok(from)
    }

    fn link(&self, block: &mut AccountBlock) -> Result<(), VmError> {
        let frontier = self.chain.frontier_account_block(&block.address)?;
        let momentum = self.chain.frontier_momentum()?;
        block.height = frontier.as_ref().map_or(1, |b| b.height + 1);
        block.previous_hash = frontier.map_or(Hash::zero(), |b| b.hash);
        block.momentum_acknowledged = HashHeight::new(momentum.hash, momentum.height);
        Ok(())
    }

    // Contract balances right after the receive, before any outgoing send
    fn balances_before_transfers(
        mut balances: BTreeMap<TokenStandard, u64>,
        transfers: &[ContractTransfer],
    ) -> BTreeMap<TokenStandard, u64> {
        for transfer in transfers {
            *balances.entry(transfer.token_standard).or_default() += transfer.amount;
        }
        balances
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{
        embedded::{VaultMethod, VAULT_ADDRESS},
        genesis::{Genesis, GENESIS_ZNN_BALANCE, USER_KEYS},
        MemoryChain,
    };

    fn supervisor() -> (Arc<MemoryChain>, Supervisor) {
        let chain = Arc::new(MemoryChain::new(Genesis::embedded()));
        chain.init().unwrap();
        chain.start().unwrap();
        let supervisor = Supervisor::new(chain.clone());
        (chain, supervisor)
    }

    fn send_template(to: Address, amount: u64) -> AccountBlock {
        AccountBlock {
            block_type: BlockType::UserSend,
            address: USER_KEYS[0].address(),
            to_address: to,
            amount,
            ..Default::default()
        }
    }

    #[test]
    fn test_send_defaults_and_linking() {
        let (chain, supervisor) = supervisor();
        let transaction = supervisor
            .generate_from_template(&send_template(USER_KEYS[1].address(), 7), &USER_KEYS[0])
            .unwrap();
        let block = &transaction.block;

        assert_eq!(block.height, 2);
        assert_eq!(block.token_standard, ZNN_TOKEN_STANDARD);
        assert_eq!(block.momentum_acknowledged.height, 1);
        assert_eq!(block.hash, block.compute_hash());
        assert_eq!(transaction.changes.balance(&ZNN_TOKEN_STANDARD), Some(GENESIS_ZNN_BALANCE - 7));
        chain.insert_account_block(transaction).unwrap();
    }

    #[test]
    fn test_send_rejections() {
        let (_, supervisor) = supervisor();
        let signer = &USER_KEYS[0];

        let err = supervisor
            .generate_from_template(&send_template(Address::zero(), 1), signer)
            .unwrap_err();
        assert_eq!(err, VmError::MissingToAddress);

        let err = supervisor
            .generate_from_template(&send_template(Address::embedded(9), 1), signer)
            .unwrap_err();
        assert_eq!(err, VmError::UnknownContract(Address::embedded(9)));

        let err = supervisor
            .generate_from_template(
                &send_template(USER_KEYS[1].address(), GENESIS_ZNN_BALANCE + 1),
                signer,
            )
            .unwrap_err();
        assert!(matches!(err, VmError::InsufficientBalance { .. }));

        let err = supervisor
            .generate_from_template(&send_template(USER_KEYS[1].address(), 1), &USER_KEYS[2])
            .unwrap_err();
        assert!(matches!(err, VmError::SignerMismatch { .. }));
    }

    #[test]
    fn test_receive_copies_funds() {
        let (chain, supervisor) = supervisor();
        let send = supervisor
            .generate_from_template(&send_template(USER_KEYS[1].address(), 9), &USER_KEYS[0])
            .unwrap();
        let send_hash = send.block.hash;
        chain.insert_account_block(send).unwrap();

        let template = AccountBlock {
            block_type: BlockType::UserReceive,
            address: USER_KEYS[1].address(),
            from_block_hash: send_hash,
            ..Default::default()
        };
        let receive = supervisor.generate_from_template(&template, &USER_KEYS[1]).unwrap();
        assert_eq!(receive.block.amount, 9);
        assert_eq!(
            receive.changes.balance(&ZNN_TOKEN_STANDARD),
            Some(GENESIS_ZNN_BALANCE + 9)
        );
        chain.insert_account_block(receive).unwrap();

        let err = supervisor.generate_from_template(&template, &USER_KEYS[1]).unwrap_err();
        assert_eq!(err, VmError::AlreadyReceived(send_hash));
    }

    #[test]
    fn test_failed_call_is_refunded() {
        let (chain, supervisor) = supervisor();
        let mut template = send_template(VAULT_ADDRESS, 25);
        template.data = VaultMethod::Withdraw { amount: 1 }.to_data();
        let send = supervisor.generate_from_template(&template, &USER_KEYS[0]).unwrap();
        let send_block = send.block.clone();
        chain.insert_account_block(send).unwrap();

        let execution = supervisor.generate_embedded(&send_block).unwrap();
        assert_eq!(
            execution.returned_error.as_deref(),
            Some("withdraw does not accept funds")
        );
        assert_eq!(execution.descendants.len(), 1);

        let refund = &execution.descendants[0];
        assert_eq!(refund.block.block_type, BlockType::ContractSend);
        assert_eq!(refund.block.to_address, send_block.address);
        assert_eq!(refund.block.amount, 25);
        assert_eq!(refund.block.previous_hash, execution.receive.block.hash);
        assert_eq!(refund.changes.balance(&ZNN_TOKEN_STANDARD), Some(0));
        assert_eq!(execution.receive.changes.balance(&ZNN_TOKEN_STANDARD), Some(25));
        assert_eq!(execution.receive.changes.get(b"deposit:"), None);
    }

    #[test]
    fn test_successful_deposit_has_no_descendants() {
        let (chain, supervisor) = supervisor();
        let mut template = send_template(VAULT_ADDRESS, 30);
        template.data = VaultMethod::Deposit.to_data();
        let send = supervisor.generate_from_template(&template, &USER_KEYS[0]).unwrap();
        let send_block = send.block.clone();
        chain.insert_account_block(send).unwrap();

        let execution = supervisor.generate_embedded(&send_block).unwrap();
        assert_eq!(execution.returned_error, None);
        assert!(execution.descendants.is_empty());
        assert_eq!(execution.receive.block.from_block_hash, send_block.hash);
        chain.insert_account_block(execution.receive).unwrap();
        assert!(chain.is_received(&send_block.hash).unwrap());
    }
}
