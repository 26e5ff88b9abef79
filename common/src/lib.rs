#![allow(clippy::module_inception)]

pub mod block;
pub mod crypto;
pub mod patch;
pub mod time;
pub mod token;
