mod account_block;
mod momentum;

pub use account_block::{AccountBlock, AccountBlockTransaction, AccountHeader, BlockType, HashHeight};
pub use momentum::Momentum;
