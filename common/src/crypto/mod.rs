mod address;
mod hash;
mod key;

pub use address::*;
pub use hash::*;
pub use key::*;
