//! In-memory persistence gateway
//!
//! Same contract as the RocksDB store, without durability. Used by tests,
//! benches and embedders that bring their own persistence.

use crate::error::{Error, Result};
use crate::storage::{LedgerStore, LedgerView};
use crate::types::{Block, MarketSnapshot, Transaction};
use parking_lot::RwLock;

#[derive(Debug, Default)]
struct Inner {
    blocks: Vec<Block>,
    transactions: Vec<Transaction>,
    snapshot: Option<MarketSnapshot>,
}

/// Volatile store guarded by a single lock
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Empty store, no genesis
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryStore {
    fn append(
        &self,
        block: &Block,
        transaction: &Transaction,
        snapshot: Option<&MarketSnapshot>,
    ) -> Result<()> {
        let mut inner = self.inner.write();

        let expected = inner.blocks.len() as u64;
        if block.index != expected {
            return Err(Error::InvariantViolation(format!(
                "Append of block {} out of order, next index is {}",
                block.index, expected
            )));
        }

        inner.blocks.push(block.clone());
        inner.transactions.push(transaction.clone());
        if let Some(snapshot) = snapshot {
            inner.snapshot = Some(snapshot.clone());
        }

        Ok(())
    }

    fn get_block(&self, index: u64) -> Result<Block> {
        self.inner
            .read()
            .blocks
            .get(index as usize)
            .cloned()
            .ok_or(Error::BlockNotFound(index))
    }

    fn get_transaction(&self, index: u64) -> Result<Transaction> {
        self.inner
            .read()
            .transactions
            .get(index as usize)
            .cloned()
            .ok_or(Error::TransactionNotFound(index))
    }

    fn latest_block(&self) -> Result<Option<Block>> {
        Ok(self.inner.read().blocks.last().cloned())
    }

    fn blocks(&self) -> Result<Vec<Block>> {
        Ok(self.inner.read().blocks.clone())
    }

    fn transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.inner.read().transactions.clone())
    }

    fn market_snapshot(&self) -> Result<Option<MarketSnapshot>> {
        Ok(self.inner.read().snapshot.clone())
    }

    fn view(&self) -> Result<LedgerView> {
        let inner = self.inner.read();
        Ok(LedgerView {
            blocks: inner.blocks.clone(),
            transactions: inner.transactions.clone(),
            snapshot: inner.snapshot.clone(),
        })
    }

    fn block_count(&self) -> Result<u64> {
        Ok(self.inner.read().blocks.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Hash;
    use rust_decimal::Decimal;

    fn block(index: u64) -> Block {
        Block {
            index,
            timestamp: index as i64,
            previous_hash: Hash::genesis_parent(),
            hash: Hash::from_hex(format!("{:02x}", index)),
            nonce: 0,
        }
    }

    #[test]
    fn test_append_keeps_snapshot_when_none_given() {
        let store = MemoryStore::new();
        let initial = MarketSnapshot::initial(Decimal::ONE);

        store
            .append(&block(0), &Transaction::genesis(), Some(&initial))
            .unwrap();
        store
            .append(
                &block(1),
                &Transaction::new("alice", "bob", Decimal::ONE),
                None,
            )
            .unwrap();

        assert_eq!(store.block_count().unwrap(), 2);
        assert_eq!(store.market_snapshot().unwrap(), Some(initial));
        assert_eq!(store.get_transaction(1).unwrap().sender.as_str(), "alice");
    }

    #[test]
    fn test_out_of_order_append_leaves_store_untouched() {
        let store = MemoryStore::new();
        let err = store
            .append(&block(3), &Transaction::genesis(), None)
            .unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
        assert!(store.latest_block().unwrap().is_none());
        assert!(store.transactions().unwrap().is_empty());
    }

    #[test]
    fn test_view_matches_individual_reads() {
        let store = MemoryStore::new();
        let initial = MarketSnapshot::initial(Decimal::ONE);
        store
            .append(&block(0), &Transaction::genesis(), Some(&initial))
            .unwrap();

        let view = store.view().unwrap();
        assert_eq!(view.blocks, store.blocks().unwrap());
        assert_eq!(view.transactions, store.transactions().unwrap());
        assert_eq!(view.snapshot, Some(initial));
    }

    #[test]
    fn test_missing_block() {
        let store = MemoryStore::new();
        assert!(matches!(store.get_block(0), Err(Error::BlockNotFound(0))));
    }
}
