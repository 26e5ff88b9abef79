//! Transaction injector - completes, signs and submits user blocks

use log::debug;
use nom_common::{
    block::{AccountBlock, AccountHeader, BlockType},
    token::ZNN_TOKEN_STANDARD,
};

use super::harness::TestHarness;
use crate::node::{genesis::key_for, Chain};
use crate::utilities::{expect_error, expect_string};

/// Pass as the expected diff to skip the state-diff comparison
pub const SKIP_VM_CHANGES: &str = "PASS-VM-CHANGES";

impl TestHarness {
    /// Complete `template` as a user send and insert it
    ///
    /// The block type is forced to `UserSend` and a zero token standard
    /// defaults to ZNN. The block is signed with the key registered for
    /// `template.address`.
    ///
    /// A mismatch with `expected_error` or, on success, between the
    /// generated changes and `expected_diff` is recorded as an assertion
    /// failure. Returns the inserted block.
    ///
    /// # Panics
    ///
    /// Panics if no key is registered for the sender.
    pub fn submit_send(
        &self,
        template: AccountBlock,
        expected_error: Option<&str>,
        expected_diff: &str,
    ) -> Option<AccountBlock> {
        let mut template = template;
        template.block_type = BlockType::UserSend;
        if template.token_standard.is_zero() {
            template.token_standard = ZNN_TOKEN_STANDARD;
        }
        self.insert_user_block(template, expected_error, expected_diff)
    }

    /// Complete `template` as the receive of the send identified by `from`
    ///
    /// Unset fields default to: block type `UserReceive`, address the
    /// send's recipient, from-block hash the send's hash.
    ///
    /// # Panics
    ///
    /// Panics before touching the ledger if `from` does not identify an
    /// existing block, or if no key is registered for the receiver.
    pub fn submit_receive(
        &self,
        from: &AccountHeader,
        template: AccountBlock,
        expected_error: Option<&str>,
        expected_diff: &str,
    ) -> Option<AccountBlock> {
        let components = self.running("submit a receive");
        let lookup = components
            .chain
            .account_block_by_height(&from.address, from.height);
        let send = match self.fatal_on_error("read send-block", lookup) {
            Some(send) => send,
            None => self
                .reporter()
                .fatal(format!("send-block {} does not exist", from)),
        };
        if send.hash != from.hash {
            self.reporter().fatal(format!(
                "send-block identifier mismatch: expected {}, found {}",
                from,
                send.header()
            ));
        }

        let mut template = template;
        if template.block_type == BlockType::Unspecified {
            template.block_type = BlockType::UserReceive;
        }
        if template.address.is_zero() {
            template.address = send.to_address;
        }
        if template.from_block_hash.is_zero() {
            template.from_block_hash = send.hash;
        }
        self.insert_user_block(template, expected_error, expected_diff)
    }

    fn insert_user_block(
        &self,
        template: AccountBlock,
        expected_error: Option<&str>,
        expected_diff: &str,
    ) -> Option<AccountBlock> {
        let components = self.running("submit a block");
        let key = match key_for(&template.address) {
            Some(key) => key,
            None => self
                .reporter()
                .fatal(format!("no signing key registered for {}", template.address)),
        };

        let result = components
            .supervisor
            .generate_from_template(&template, key)
            .map_err(|e| e.to_string())
            .and_then(|transaction| {
                components
                    .chain
                    .insert_account_block(transaction.clone())
                    .map(|_| transaction)
                    .map_err(|e| e.to_string())
            });

        match result {
            Err(err) => {
                debug!("template from {} rejected: {}", template.address, err);
                expect_error(self.reporter(), Some(err.as_str()), expected_error);
                None
            }
            Ok(transaction) => {
                expect_error(self.reporter(), None, expected_error);
                if expected_diff != SKIP_VM_CHANGES {
                    expect_string(
                        self.reporter(),
                        &transaction.changes.debug_dump(),
                        expected_diff,
                    );
                }
                debug!("inserted {:?} {}", transaction.block.block_type, transaction.block.header());
                Some(transaction.block)
            }
        }
    }
}
