//! Curve Ledger
//!
//! Single-node proof-of-work ledger for a synthetic asset priced on a
//! bonding curve.
//!
//! # Architecture
//!
//! - **Single Writer**: One actor task validates, mines and appends, in submission order
//! - **Full Replay**: Balances are derived from the persisted history, never cached
//! - **Bonding Curve**: Mints and burns move buy/sell prices; peer transfers do not
//! - **Atomic Append**: Block, transaction and market snapshot commit together
//!
//! # Invariants
//!
//! - Chain linkage: `block[i].previous_hash == block[i - 1].hash`
//! - Index continuity: block `i` is stored at position `i`
//! - Supply accounting: `total_supply == total_bought - total_sold`
//! - Supply cap: `total_supply <= max_coin_supply`

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications, clippy::all)]

pub mod actor;
pub mod balance;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod metrics;
pub mod mining;
pub mod pricing;
pub mod storage;
pub mod types;
pub mod validation;

// Re-exports
pub use config::Config;
pub use error::{Error, Rejection, Result};
pub use ledger::{ChainSummary, Ledger};
pub use memory::MemoryStore;
pub use pricing::{BondingCurve, Quote};
pub use storage::{LedgerStore, LedgerView, Storage};
pub use types::{Amount, Block, Hash, Identity, MarketSnapshot, Price, Transaction, TransferKind, TransferRequest};
