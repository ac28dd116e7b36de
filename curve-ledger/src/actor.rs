//! Single-writer actor
//!
//! Every operation that appends to the chain goes through one Tokio task.
//! Validation, curve update, mining and the atomic append for one transfer
//! complete before the next message is taken, so no two transfers ever
//! observe the same chain tip.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │         Sends messages to actor mailbox              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │   validate → curve → spawn_blocking(mine) → append    │
//! │                       │                               │
//! │                       ▼                               │
//! │              LedgerStore::append()                    │
//! │       (block + transaction + snapshot, atomic)        │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! Reads never enter the mailbox; they go straight to the store.

use crate::{
    config::Config,
    crypto::hash_block,
    metrics::Metrics,
    mining::{CancelFlag, Miner},
    pricing::BondingCurve,
    storage::LedgerStore,
    types::{now_millis, Block, Hash, MarketSnapshot, Price, Transaction, TransferRequest},
    validation::TransferValidator,
    Error, Result,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Create genesis if the chain is empty
    Initialize {
        response: oneshot::Sender<Result<Block>>,
    },

    /// Validate, mine and append one transfer
    SubmitTransfer {
        request: TransferRequest,
        response: oneshot::Sender<Result<Block>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Lifecycle of the writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerState {
    /// No genesis block yet; transfers are refused
    Uninitialized,
    /// Genesis present; transfers are accepted
    Ready,
}

/// Actor that owns every write to the chain
pub struct LedgerActor {
    store: Arc<dyn LedgerStore>,
    mailbox: mpsc::Receiver<LedgerMessage>,
    validator: TransferValidator,
    miner: Miner,
    curve: BondingCurve,
    initial_price: Price,
    metrics: Metrics,
    cancel: CancelFlag,
    state: LedgerState,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        store: Arc<dyn LedgerStore>,
        mailbox: mpsc::Receiver<LedgerMessage>,
        config: &Config,
        metrics: Metrics,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            store,
            mailbox,
            validator: TransferValidator::from_config(&config.market),
            miner: Miner::from_config(&config.mining),
            curve: BondingCurve::from_config(&config.market),
            initial_price: config.market.initial_price,
            metrics,
            cancel,
            state: LedgerState::Uninitialized,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        match self.store.latest_block() {
            Ok(Some(latest)) => {
                self.state = LedgerState::Ready;
                tracing::info!(height = latest.index, hash = %latest.hash, "Resuming existing chain");
            }
            Ok(None) => tracing::info!("Empty chain, waiting for initialization"),
            Err(e) => tracing::error!(error = %e, "Failed to read chain tip"),
        }

        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Initialize { response } => {
                    let result = self.initialize();
                    if let Err(ref e) = result {
                        tracing::error!(error = %e, "Initialization failed");
                    }
                    let _ = response.send(result);
                }

                LedgerMessage::SubmitTransfer { request, response } => {
                    let result = self.submit_transfer(request).await;
                    let _ = response.send(result);
                }

                LedgerMessage::Shutdown => {
                    tracing::info!("Ledger actor shutting down");
                    break;
                }
            }
        }

        // Answer anything still queued so no caller waits forever
        self.mailbox.close();
        while let Ok(msg) = self.mailbox.try_recv() {
            match msg {
                LedgerMessage::Initialize { response }
                | LedgerMessage::SubmitTransfer { response, .. } => {
                    let _ = response.send(Err(Error::TransferIncomplete(
                        "ledger shutting down".to_string(),
                    )));
                }
                LedgerMessage::Shutdown => {}
            }
        }
    }

    /// Create the genesis block, or return the existing one
    fn initialize(&mut self) -> Result<Block> {
        if self.store.latest_block()?.is_some() {
            let genesis = self.store.get_block(0)?;
            self.state = LedgerState::Ready;
            tracing::debug!(hash = %genesis.hash, "Genesis already present");
            return Ok(genesis);
        }

        let transaction = Transaction::genesis();
        let timestamp = now_millis();
        let previous_hash = Hash::genesis_parent();
        let hash = hash_block(0, timestamp, &previous_hash, 0, &transaction)?;

        let block = Block {
            index: 0,
            timestamp,
            previous_hash,
            hash,
            nonce: 0,
        };
        let snapshot = MarketSnapshot::initial(self.initial_price);

        self.store.append(&block, &transaction, Some(&snapshot))?;
        self.state = LedgerState::Ready;

        self.metrics.record_genesis();
        self.metrics.update_total_supply(snapshot.total_supply);

        tracing::info!(hash = %block.hash, timestamp, "Genesis block created");

        Ok(block)
    }

    /// Process one transfer end to end
    async fn submit_transfer(&mut self, request: TransferRequest) -> Result<Block> {
        if self.state != LedgerState::Ready {
            return Err(Error::NotInitialized);
        }

        let snapshot = self
            .store
            .market_snapshot()?
            .ok_or(Error::NotInitialized)?;

        if let Err(e) = self
            .validator
            .validate(self.store.as_ref(), &request, &snapshot)
        {
            if e.is_rejection() {
                self.metrics.record_transfer_rejected();
                tracing::warn!(
                    sender = %request.sender,
                    recipient = %request.recipient,
                    amount = %request.amount,
                    reason = %e,
                    "Transfer rejected"
                );
            }
            return Err(e);
        }

        let transaction = request.to_transaction();
        let kind = transaction.kind();

        // Peers leave the snapshot as it is
        let next_snapshot = if kind.moves_market() {
            Some(self.curve.apply(&snapshot, kind, transaction.amount)?)
        } else {
            None
        };

        let previous = self.store.latest_block()?.ok_or(Error::NotInitialized)?;

        let miner = self.miner.clone();
        let cancel = self.cancel.clone();
        let candidate = transaction.clone();
        let started = Instant::now();

        let mined = tokio::task::spawn_blocking(move || miner.mine(&previous, &candidate, &cancel))
            .await
            .map_err(|e| Error::Concurrency(format!("Mining task failed: {}", e)))??;

        let elapsed = started.elapsed().as_secs_f64();

        self.store
            .append(&mined.block, &transaction, next_snapshot.as_ref())?;

        self.metrics.record_transfer_accepted(mined.attempts, elapsed);
        if let Some(ref next) = next_snapshot {
            self.metrics.update_total_supply(next.total_supply);
        }

        tracing::info!(
            index = mined.block.index,
            nonce = mined.block.nonce,
            hash = %mined.block.hash,
            sender = %transaction.sender,
            recipient = %transaction.recipient,
            amount = %transaction.amount,
            attempts = mined.attempts,
            "Block appended"
        );

        Ok(mined.block)
    }
}

/// Handle for sending messages to the actor
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
    cancel: CancelFlag,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>, cancel: CancelFlag) -> Self {
        Self { sender, cancel }
    }

    /// Create genesis if absent; returns block 0 either way
    pub async fn initialize(&self) -> Result<Block> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::Initialize { response: tx })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Submit a transfer and wait for its block
    pub async fn submit_transfer(&self, request: TransferRequest) -> Result<Block> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::SubmitTransfer {
                request,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Stop any in-flight mining and shut the actor down.
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&self) -> Result<()> {
        self.cancel.cancel();
        if self.sender.send(LedgerMessage::Shutdown).await.is_err() {
            tracing::debug!("Ledger actor already stopped");
        }
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(
    store: Arc<dyn LedgerStore>,
    config: &Config,
    metrics: Metrics,
) -> LedgerHandle {
    // Bounded channel for backpressure
    let (tx, rx) = mpsc::channel(config.actor.mailbox_capacity);
    let cancel = CancelFlag::new();
    let actor = LedgerActor::new(store, rx, config, metrics, cancel.clone());

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx, cancel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use rust_decimal::Decimal;
    use tokio::time::Duration;

    fn spawn_with(difficulty: usize) -> (LedgerHandle, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let mut config = Config::default();
        config.mining.difficulty = difficulty;
        let handle = spawn_ledger_actor(store.clone(), &config, Metrics::new().unwrap());
        (handle, store)
    }

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let (handle, _store) = spawn_with(1);
        handle.shutdown().await.unwrap();
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_submit_before_initialize() {
        let (handle, store) = spawn_with(1);
        let err = handle
            .submit_transfer(TransferRequest::new("system", "alice", Decimal::from(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotInitialized));
        assert_eq!(store.block_count().unwrap(), 0);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let (handle, store) = spawn_with(1);
        let first = handle.initialize().await.unwrap();
        let second = handle.initialize().await.unwrap();

        assert_eq!(first, second);
        assert!(first.is_genesis());
        assert_eq!(first.previous_hash, Hash::genesis_parent());
        assert_eq!(store.block_count().unwrap(), 1);
        assert_eq!(
            store.market_snapshot().unwrap(),
            Some(MarketSnapshot::initial(Decimal::ONE))
        );
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_mint_appends_linked_block() {
        let (handle, store) = spawn_with(1);
        let genesis = handle.initialize().await.unwrap();

        let block = handle
            .submit_transfer(TransferRequest::new("system", "alice", Decimal::from(100)))
            .await
            .unwrap();

        assert_eq!(block.index, 1);
        assert_eq!(block.previous_hash, genesis.hash);
        assert!(block.hash.meets_difficulty(1));

        let snapshot = store.market_snapshot().unwrap().unwrap();
        assert_eq!(snapshot.total_supply, Decimal::from(100));
        assert_eq!(snapshot.total_bought, Decimal::from(100));
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejection_leaves_store_untouched() {
        let (handle, store) = spawn_with(1);
        handle.initialize().await.unwrap();

        let err = handle
            .submit_transfer(TransferRequest::new("alice", "bob", Decimal::from(1)))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "insufficient balance");
        assert_eq!(store.block_count().unwrap(), 1);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_cancels_mining() {
        let (handle, store) = spawn_with(64);
        handle.initialize().await.unwrap();

        let submitter = handle.clone();
        let pending = tokio::spawn(async move {
            submitter
                .submit_transfer(TransferRequest::new("system", "alice", Decimal::from(5)))
                .await
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.shutdown().await.unwrap();

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(Error::TransferIncomplete(_))));
        assert_eq!(store.block_count().unwrap(), 1);
    }
}
