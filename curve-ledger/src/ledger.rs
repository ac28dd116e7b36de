//! Main ledger orchestration layer
//!
//! This module ties together storage, the writer actor and the pricing and
//! balance components into the API callers use.
//!
//! # Example
//!
//! ```no_run
//! use curve_ledger::{Config, Ledger};
//! use rust_decimal::Decimal;
//!
//! #[tokio::main]
//! async fn main() -> curve_ledger::Result<()> {
//!     let ledger = Ledger::open(Config::default()).await?;
//!     ledger.init().await?;
//!
//!     ledger.submit_transfer("system", "alice", Decimal::from(100)).await?;
//!     assert_eq!(ledger.balance_of("alice")?, Decimal::from(100));
//!
//!     ledger.shutdown().await
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    balance::BalanceCalculator,
    crypto::rehash,
    metrics::Metrics,
    pricing::{BondingCurve, Quote},
    storage::{LedgerStore, LedgerView, Storage},
    types::{Amount, Block, Hash, Identity, MarketSnapshot, Transaction, TransferKind, TransferRequest},
    Config, Error, Rejection, Result,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Outcome of a successful [`Ledger::verify_chain`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSummary {
    /// Number of blocks, genesis included
    pub length: u64,

    /// Hash of the last block
    pub tip: Hash,

    /// Circulating supply implied by the replayed mints and burns
    pub total_supply: Amount,
}

/// Main ledger interface
///
/// Cheap to clone; every clone talks to the same writer.
#[derive(Clone)]
pub struct Ledger {
    /// Actor handle for writes
    handle: LedgerHandle,

    /// Direct store access (for reads)
    store: Arc<dyn LedgerStore>,

    /// Curve used for read-only quotes
    curve: BondingCurve,

    /// Metrics shared with the actor
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("service_name", &self.config.service_name)
            .field("data_dir", &self.config.data_dir)
            .finish()
    }
}

impl Ledger {
    /// Open ledger backed by RocksDB at `config.data_dir`
    pub async fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(Storage::open(&config)?);
        Self::open_with_store(config, store).await
    }

    /// Open ledger over any persistence gateway
    pub async fn open_with_store(config: Config, store: Arc<dyn LedgerStore>) -> Result<Self> {
        config.validate()?;

        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("Failed to register metrics: {}", e)))?;

        let handle = spawn_ledger_actor(store.clone(), &config, metrics.clone());

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            difficulty = config.mining.difficulty,
            "Ledger opened"
        );

        Ok(Self {
            handle,
            store,
            curve: BondingCurve::from_config(&config.market),
            metrics,
            config,
        })
    }

    /// Create the genesis block and initial market snapshot.
    ///
    /// Idempotent: once genesis exists the stored block 0 is returned.
    pub async fn init(&self) -> Result<Block> {
        self.handle.initialize().await
    }

    /// Validate, mine and append a transfer
    ///
    /// Returns the sealed block, or [`Error::Rejected`] with the reason when
    /// admission fails (nothing is written in that case).
    pub async fn submit_transfer(
        &self,
        sender: impl Into<Identity>,
        recipient: impl Into<Identity>,
        amount: Amount,
    ) -> Result<Block> {
        self.submit(TransferRequest::new(sender, recipient, amount))
            .await
    }

    /// Submit a prepared request
    pub async fn submit(&self, request: TransferRequest) -> Result<Block> {
        self.handle.submit_transfer(request).await
    }

    /// Replayed balance of `identity`
    pub fn balance_of(&self, identity: impl Into<Identity>) -> Result<Amount> {
        BalanceCalculator::new(self.store.as_ref()).balance_of(&identity.into())
    }

    /// Replayed balance of every identity that ever transacted
    pub fn balances(&self) -> Result<BTreeMap<Identity, Amount>> {
        BalanceCalculator::new(self.store.as_ref()).balances()
    }

    /// Current supply statistics and prices
    pub fn current_market_snapshot(&self) -> Result<MarketSnapshot> {
        self.store.market_snapshot()?.ok_or(Error::NotInitialized)
    }

    /// Prices a trade of `amount` would see at the current totals.
    ///
    /// Read-only; the stored snapshot is not touched.
    pub fn quote(&self, amount: Amount) -> Result<Quote> {
        if amount < Decimal::ZERO {
            return Err(Rejection::NegativeAmount.into());
        }
        let snapshot = self.current_market_snapshot()?;
        self.curve.quote(
            snapshot.total_bought,
            snapshot.total_sold,
            snapshot.total_supply,
            amount,
        )
    }

    /// All blocks in append order
    pub fn blocks(&self) -> Result<Vec<Block>> {
        self.store.blocks()
    }

    /// Block by index
    pub fn block(&self, index: u64) -> Result<Block> {
        self.store.get_block(index)
    }

    /// Chain tip
    pub fn latest_block(&self) -> Result<Option<Block>> {
        self.store.latest_block()
    }

    /// All transactions in append order
    pub fn transactions(&self) -> Result<Vec<Transaction>> {
        self.store.transactions()
    }

    /// Whether genesis has been written
    pub fn is_initialized(&self) -> Result<bool> {
        Ok(self.store.latest_block()?.is_some())
    }

    /// Metrics for this ledger instance
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration the ledger was opened with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Audit the whole chain against its stored transactions and snapshot.
    ///
    /// Reads one consistent view of the store, so appends racing the audit
    /// are either fully included or fully ignored. Non-genesis hashes are
    /// checked against the currently configured difficulty.
    pub fn verify_chain(&self) -> Result<ChainSummary> {
        let LedgerView {
            blocks,
            transactions,
            snapshot,
        } = self.store.view()?;

        if blocks.is_empty() {
            return Err(Error::NotInitialized);
        }
        if blocks.len() != transactions.len() {
            return Err(Error::InvariantViolation(format!(
                "{} blocks but {} transactions",
                blocks.len(),
                transactions.len()
            )));
        }

        let difficulty = self.config.mining.difficulty;
        let mut minted = Decimal::ZERO;
        let mut burned = Decimal::ZERO;

        for (position, (block, tx)) in blocks.iter().zip(&transactions).enumerate() {
            let expected_index = position as u64;
            if block.index != expected_index {
                return Err(Error::InvariantViolation(format!(
                    "Block at position {} has index {}",
                    position, block.index
                )));
            }

            if position == 0 {
                if block.previous_hash != Hash::genesis_parent() {
                    return Err(Error::InvariantViolation(
                        "Genesis does not point at the sentinel parent".to_string(),
                    ));
                }
            } else {
                let parent = &blocks[position - 1];
                if block.previous_hash != parent.hash {
                    return Err(Error::InvariantViolation(format!(
                        "Block {} does not link to block {}",
                        block.index, parent.index
                    )));
                }
                if !block.hash.meets_difficulty(difficulty) {
                    return Err(Error::InvariantViolation(format!(
                        "Block {} hash misses difficulty {}",
                        block.index, difficulty
                    )));
                }
            }

            if rehash(block, tx)? != block.hash {
                return Err(Error::InvariantViolation(format!(
                    "Block {} hash does not match its contents",
                    block.index
                )));
            }

            match tx.kind() {
                TransferKind::Mint => minted += tx.amount,
                TransferKind::Burn => burned += tx.amount,
                TransferKind::Peer => {}
            }
        }

        let snapshot = snapshot.ok_or(Error::NotInitialized)?;
        let total_supply = minted - burned;
        if snapshot.total_supply != total_supply
            || snapshot.total_bought != minted
            || snapshot.total_sold != burned
        {
            return Err(Error::InvariantViolation(format!(
                "Snapshot supply {} disagrees with replayed supply {}",
                snapshot.total_supply, total_supply
            )));
        }

        let tip = blocks
            .last()
            .map(|b| b.hash.clone())
            .ok_or(Error::NotInitialized)?;

        Ok(ChainSummary {
            length: blocks.len() as u64,
            tip,
            total_supply,
        })
    }

    /// Shutdown ledger
    ///
    /// Cancels an in-flight mining search; transfers not yet committed are
    /// answered with [`Error::TransferIncomplete`].
    pub async fn shutdown(&self) -> Result<()> {
        self.handle.shutdown().await
    }
}
