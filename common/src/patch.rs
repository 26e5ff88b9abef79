use std::collections::BTreeMap;

use crate::token::TokenStandard;

// Textual dump of a patch that touches nothing
pub const NO_VM_CHANGES: &str = "\nstorage\nbalance";

// Changes a single account block applies to its account.
// Storage writes map to None when the key gets deleted,
// balances always carry the new absolute value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Patch {
    storage: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    balances: BTreeMap<TokenStandard, u64>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.storage.insert(key, Some(value));
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.storage.insert(key, None);
    }

    pub fn set_balance(&mut self, token_standard: TokenStandard, amount: u64) {
        self.balances.insert(token_standard, amount);
    }

    // Some(None) when the key was deleted by this patch
    pub fn get(&self, key: &[u8]) -> Option<Option<&[u8]>> {
        self.storage.get(key).map(|value| value.as_deref())
    }

    pub fn balance(&self, token_standard: &TokenStandard) -> Option<u64> {
        self.balances.get(token_standard).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty() && self.balances.is_empty()
    }

    pub fn storage(&self) -> impl Iterator<Item = (&Vec<u8>, &Option<Vec<u8>>)> {
        self.storage.iter()
    }

    pub fn balances(&self) -> impl Iterator<Item = (&TokenStandard, &u64)> {
        self.balances.iter()
    }

    // Stable, line-oriented rendering used by tests to assert VM effects.
    // Keys and values are hex encoded; deleted keys render as `<key>=`.
    pub fn debug_dump(&self) -> String {
        let mut out = String::from("\nstorage");
        for (key, value) in &self.storage {
            out.push('\n');
            out.push_str(&hex::encode(key));
            out.push('=');
            if let Some(value) = value {
                out.push_str(&hex::encode(value));
            }
        }
        out.push_str("\nbalance");
        for (token_standard, amount) in &self.balances {
            out.push_str(&format!("\n{} {}", token_standard, amount));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{QSR_TOKEN_STANDARD, ZNN_TOKEN_STANDARD};

    #[test]
    fn test_empty_patch_dump() {
        assert_eq!(Patch::new().debug_dump(), NO_VM_CHANGES);
    }

    #[test]
    fn test_patch_dump_is_sorted() {
        let mut patch = Patch::new();
        patch.set_balance(QSR_TOKEN_STANDARD, 5);
        patch.set_balance(ZNN_TOKEN_STANDARD, 10);
        patch.put(vec![0x02], vec![0xff]);
        patch.delete(vec![0x01]);

        let expected = format!(
            "\nstorage\n01=\n02=ff\nbalance\n{} 10\n{} 5",
            ZNN_TOKEN_STANDARD, QSR_TOKEN_STANDARD
        );
        assert_eq!(patch.debug_dump(), expected);
    }
}
