//! Proof-of-work sealing
//!
//! The search is CPU-bound and unbounded. Callers on an async runtime must
//! run [`Miner::mine`] on a blocking thread (`tokio::task::spawn_blocking`).
//! A [`CancelFlag`] lets shutdown stop the search; a cancelled search
//! produces no block and the transfer is reported incomplete.

use crate::config::MiningConfig;
use crate::crypto::hash_block;
use crate::types::{now_millis, Block, Timestamp, Transaction};
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cooperative cancellation signal
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// New, unraised flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether the flag has been raised
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Result of a successful search
#[derive(Debug, Clone)]
pub struct MinedBlock {
    /// The sealed block
    pub block: Block,

    /// Hashes computed, including the winning one
    pub attempts: u64,

    /// Times the candidate timestamp was refreshed
    pub timestamp_refreshes: u32,
}

/// Proof-of-work engine
#[derive(Debug, Clone)]
pub struct Miner {
    difficulty: usize,
    refresh_after: u64,
}

impl Miner {
    /// Create a miner
    pub fn new(difficulty: usize, refresh_after: u64) -> Self {
        Self {
            difficulty,
            refresh_after: refresh_after.max(1),
        }
    }

    /// Miner configured from the mining section
    pub fn from_config(config: &MiningConfig) -> Self {
        Self::new(config.difficulty, config.timestamp_refresh_attempts)
    }

    /// Required leading zero hex digits
    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Seal `transaction` into the block after `previous`
    pub fn mine(
        &self,
        previous: &Block,
        transaction: &Transaction,
        cancel: &CancelFlag,
    ) -> Result<MinedBlock> {
        self.mine_with_clock(previous, transaction, cancel, now_millis)
    }

    /// Seal with an injectable clock
    pub fn mine_with_clock<C>(
        &self,
        previous: &Block,
        transaction: &Transaction,
        cancel: &CancelFlag,
        clock: C,
    ) -> Result<MinedBlock>
    where
        C: Fn() -> Timestamp,
    {
        let index = previous.index + 1;
        let previous_hash = previous.hash.clone();
        let mut timestamp = clock();
        let mut nonce = 0u64;
        let mut hash = hash_block(index, timestamp, &previous_hash, nonce, transaction)?;

        let mut attempts = 1u64;
        let mut stale_attempts = 0u64;
        let mut timestamp_refreshes = 0u32;

        while !hash.meets_difficulty(self.difficulty) {
            if cancel.is_cancelled() {
                tracing::warn!(index, attempts, "Mining cancelled");
                return Err(Error::TransferIncomplete(format!(
                    "mining of block {} cancelled after {} attempts",
                    index, attempts
                )));
            }

            // The refresh must precede the rehash so the winning hash covers it
            stale_attempts += 1;
            if stale_attempts >= self.refresh_after {
                timestamp = clock();
                stale_attempts = 0;
                timestamp_refreshes += 1;
                tracing::debug!(index, nonce, timestamp, "Refreshed stale mining timestamp");
            }

            nonce = nonce.wrapping_add(1);
            hash = hash_block(index, timestamp, &previous_hash, nonce, transaction)?;
            attempts += 1;
        }

        Ok(MinedBlock {
            block: Block {
                index,
                timestamp,
                previous_hash,
                hash,
                nonce,
            },
            attempts,
            timestamp_refreshes,
        })
    }
}

impl Default for Miner {
    fn default() -> Self {
        Self::from_config(&MiningConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::rehash;
    use crate::types::Hash;
    use rust_decimal::Decimal;
    use std::cell::Cell;

    fn genesis() -> Block {
        let tx = Transaction::genesis();
        let hash = hash_block(0, 0, &Hash::genesis_parent(), 0, &tx).unwrap();
        Block {
            index: 0,
            timestamp: 0,
            previous_hash: Hash::genesis_parent(),
            hash,
            nonce: 0,
        }
    }

    #[test]
    fn test_mined_block_meets_difficulty_and_links() {
        let previous = genesis();
        let tx = Transaction::new("system", "alice", Decimal::from(100));
        let mined = Miner::new(2, 100_000)
            .mine(&previous, &tx, &CancelFlag::new())
            .unwrap();

        let block = mined.block;
        assert_eq!(block.index, 1);
        assert_eq!(block.previous_hash, previous.hash);
        assert!(block.hash.as_str().starts_with("00"));
        assert_eq!(rehash(&block, &tx).unwrap(), block.hash);
        assert_eq!(mined.attempts, block.nonce + 1);
    }

    #[test]
    fn test_zero_difficulty_accepts_first_hash() {
        let tx = Transaction::new("alice", "bob", Decimal::from(1));
        let mined = Miner::new(0, 10)
            .mine(&genesis(), &tx, &CancelFlag::new())
            .unwrap();
        assert_eq!(mined.block.nonce, 0);
        assert_eq!(mined.attempts, 1);
    }

    #[test]
    fn test_timestamp_refreshes_after_stale_attempts() {
        let tx = Transaction::new("system", "alice", Decimal::from(5));
        let ticks = Cell::new(1_000i64);
        let clock = || {
            let now = ticks.get();
            ticks.set(now + 1);
            now
        };

        let mined = Miner::new(2, 1)
            .mine_with_clock(&genesis(), &tx, &CancelFlag::new(), clock)
            .unwrap();

        // One refresh per failed attempt
        assert_eq!(u64::from(mined.timestamp_refreshes), mined.attempts - 1);
        assert_eq!(
            mined.block.timestamp,
            1_000 + i64::from(mined.timestamp_refreshes)
        );
        assert!(mined.block.hash.meets_difficulty(2));
        assert_eq!(rehash(&mined.block, &tx).unwrap(), mined.block.hash);
    }

    #[test]
    fn test_cancelled_search_returns_incomplete() {
        let cancel = CancelFlag::new();
        cancel.cancel();

        let tx = Transaction::new("system", "alice", Decimal::from(5));
        // 64 leading zeros is unreachable, only cancellation ends the loop
        let err = Miner::new(64, 100_000)
            .mine(&genesis(), &tx, &cancel)
            .unwrap_err();
        assert!(matches!(err, Error::TransferIncomplete(_)));
    }
}
