//! Core types for the ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode on disk, camelCase JSON for callers)
//! - Exact arithmetic (Decimal for amounts and prices)
//! - Immutability once appended

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quantity of the synthetic asset (never negative once admitted)
pub type Amount = Decimal;

/// Quoted price per unit
pub type Price = Decimal;

/// Milliseconds since the Unix epoch
pub type Timestamp = i64;

/// Current wall-clock time in milliseconds
pub fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

/// Opaque account identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Reserved identity of the minting/burning authority
    pub const SYSTEM: &'static str = "system";

    /// Create new identity
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The minting/burning authority
    pub fn system() -> Self {
        Self(Self::SYSTEM.to_string())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the reserved `"system"` identity
    pub fn is_system(&self) -> bool {
        self.0 == Self::SYSTEM
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Identity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Lowercase hex SHA-256 digest, or the genesis sentinel `"0"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hash(String);

impl Hash {
    /// `previousHash` of the genesis block
    pub const GENESIS_PARENT: &'static str = "0";

    /// Wrap an already-encoded digest
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Sentinel parent of block 0
    pub fn genesis_parent() -> Self {
        Self(Self::GENESIS_PARENT.to_string())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Proof-of-work predicate: the first `difficulty` hex digits are `'0'`
    pub fn meets_difficulty(&self, difficulty: usize) -> bool {
        self.0.len() >= difficulty && self.0.bytes().take(difficulty).all(|b| b == b'0')
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Value transfer between two identities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Paying identity
    pub sender: Identity,

    /// Receiving identity
    pub recipient: Identity,

    /// Transferred quantity
    pub amount: Amount,
}

impl Transaction {
    /// Create a transaction
    pub fn new(sender: impl Into<Identity>, recipient: impl Into<Identity>, amount: Amount) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }

    /// The sentinel transaction paired with block 0
    pub fn genesis() -> Self {
        Self::new(Identity::system(), Identity::system(), Decimal::ZERO)
    }

    /// Canonical bytes for hashing (JSON, fixed field order).
    ///
    /// The amount is normalized, so `40` and `40.00` encode identically.
    pub fn canonical_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&Transaction {
            sender: self.sender.clone(),
            recipient: self.recipient.clone(),
            amount: self.amount.normalize(),
        })
    }

    /// Classify the transfer by which side, if any, is the system
    pub fn kind(&self) -> TransferKind {
        if self.sender.is_system() {
            TransferKind::Mint
        } else if self.recipient.is_system() {
            TransferKind::Burn
        } else {
            TransferKind::Peer
        }
    }
}

/// Effect of a transfer on circulating supply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// `"system"` pays: supply grows
    Mint,
    /// `"system"` receives: supply shrinks
    Burn,
    /// Neither side is the system: supply and price untouched
    Peer,
}

impl TransferKind {
    /// Whether this transfer moves the market snapshot
    pub fn moves_market(&self) -> bool {
        !matches!(self, TransferKind::Peer)
    }
}

/// Sealed, hash-chained block. Paired 1:1 with the transaction at the same index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Position in the chain, genesis is 0
    pub index: u64,

    /// Creation time (refreshed while mining goes stale)
    pub timestamp: Timestamp,

    /// Hash of block `index - 1`, or `"0"` for genesis
    pub previous_hash: Hash,

    /// Digest of this block's fields and its transaction
    pub hash: Hash,

    /// Proof-of-work counter
    pub nonce: u64,
}

impl Block {
    /// Whether this is block 0
    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }
}

/// Aggregate supply statistics and current bonding-curve quotes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    /// Cumulative minted amount
    pub total_bought: Amount,

    /// Cumulative burned amount
    pub total_sold: Amount,

    /// Circulating supply, always `total_bought - total_sold`
    pub total_supply: Amount,

    /// Price to buy one unit
    pub buy_price: Price,

    /// Price received selling one unit
    pub sell_price: Price,
}

impl MarketSnapshot {
    /// Snapshot written alongside genesis
    pub fn initial(initial_price: Price) -> Self {
        Self {
            total_bought: Decimal::ZERO,
            total_sold: Decimal::ZERO,
            total_supply: Decimal::ZERO,
            buy_price: initial_price,
            sell_price: initial_price,
        }
    }

    /// `total_supply == total_bought - total_sold`
    pub fn is_balanced(&self) -> bool {
        self.total_supply == self.total_bought - self.total_sold
    }
}

/// Incoming transfer request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Paying identity
    pub sender: Identity,

    /// Receiving identity
    pub recipient: Identity,

    /// Requested quantity
    pub amount: Amount,
}

impl TransferRequest {
    /// Create a request
    pub fn new(sender: impl Into<Identity>, recipient: impl Into<Identity>, amount: Amount) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }

    /// The transaction this request appends once accepted
    pub fn to_transaction(&self) -> Transaction {
        Transaction::new(self.sender.clone(), self.recipient.clone(), self.amount)
    }
}
