//! Semi-Fungible Token Ledger
//!
//! Each token has a unique identity (like an NFT) and carries a divisible
//! value (like a fungible balance). Value only moves between tokens of the
//! same slot.
//!
//! # Architecture
//!
//! - **TokenLedger**: token table, ownership index, id allocation
//! - **ApprovalRegistry**: operator, single-token and value-allowance layers
//! - **Transfer engine**: split, merge and ownership-move protocols
//! - **Mint engine**: token creation and burn
//! - **Single Writer**: one actor applies every mutation atomically

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]
//!
//! # Invariants
//!
//! - Slot immutability: a token's slot never changes after mint
//! - Value never goes negative and never wraps
//! - Ids are assigned once and never reused, even after burn
//! - Owned-token counts always match the token table
//! - A failed operation changes nothing

pub mod types;
pub mod error;
pub mod token_ledger;
pub mod approvals;
pub mod authorization;
pub mod state;
pub mod mint;
pub mod transfer;
pub mod actor;
pub mod ledger;
pub mod snapshot;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, Result};
pub use types::{EventRecord, LedgerEvent, Principal, Slot, Token, TokenId, Value};
pub use authorization::Authority;
pub use state::{LedgerState, Outcome};
pub use ledger::Ledger;
pub use config::Config;
