// Thin re-export module: implementation lives in `blockchain/core.rs`, split
// into the block and ledger types, tallying, and chain validation.

pub mod core;
pub use core::*;
