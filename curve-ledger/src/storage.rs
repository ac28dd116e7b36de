//! Persistence gateway and its RocksDB implementation
//!
//! # Column Families
//!
//! - `blocks` - Sealed blocks (key: big-endian index)
//! - `transactions` - Transaction paired with each block (key: big-endian index)
//! - `market` - The single current market snapshot (key: `current`)
//!
//! Every append writes its block, transaction and (optional) snapshot in one
//! `WriteBatch`, so readers see either all of it or none of it.

use crate::{
    error::{Error, Result},
    types::{Block, MarketSnapshot, Transaction},
    Config,
};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, Snapshot, WriteBatch, DB,
};
use serde::de::DeserializeOwned;

/// Column family names
const CF_BLOCKS: &str = "blocks";
const CF_TRANSACTIONS: &str = "transactions";
const CF_MARKET: &str = "market";

const MARKET_KEY: &[u8] = b"current";

/// Blocks, transactions and snapshot read at one instant
#[derive(Debug, Clone, Default)]
pub struct LedgerView {
    /// All blocks in append order
    pub blocks: Vec<Block>,

    /// All transactions in append order
    pub transactions: Vec<Transaction>,

    /// Snapshot as of the last block in `blocks`
    pub snapshot: Option<MarketSnapshot>,
}

/// Append-only store the ledger core persists through
pub trait LedgerStore: Send + Sync {
    /// Atomically append a block, its transaction and, for mint/burn, the new snapshot.
    ///
    /// `block.index` must equal the current block count.
    fn append(
        &self,
        block: &Block,
        transaction: &Transaction,
        snapshot: Option<&MarketSnapshot>,
    ) -> Result<()>;

    /// Block at `index`
    fn get_block(&self, index: u64) -> Result<Block>;

    /// Transaction paired with block `index`
    fn get_transaction(&self, index: u64) -> Result<Transaction>;

    /// Highest-index block, `None` before genesis
    fn latest_block(&self) -> Result<Option<Block>>;

    /// All blocks in append order
    fn blocks(&self) -> Result<Vec<Block>>;

    /// All transactions in append order
    fn transactions(&self) -> Result<Vec<Transaction>>;

    /// Current market snapshot, `None` before genesis
    fn market_snapshot(&self) -> Result<Option<MarketSnapshot>>;

    /// Whole ledger as of a single point in time, unaffected by concurrent appends
    fn view(&self) -> Result<LedgerView>;

    /// Number of appended blocks
    fn block_count(&self) -> Result<u64> {
        Ok(self.latest_block()?.map(|b| b.index + 1).unwrap_or(0))
    }
}

/// Storage wrapper for RocksDB
pub struct Storage {
    db: DB,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").field("path", &self.db.path()).finish()
    }
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_BLOCKS, Self::cf_options_log()),
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Self::cf_options_log()),
            ColumnFamilyDescriptor::new(CF_MARKET, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened RocksDB ledger store");

        Ok(Self { db })
    }

    fn cf_options_log() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    fn get_indexed<T: DeserializeOwned>(&self, cf_name: &str, index: u64) -> Result<Option<T>> {
        let cf = self.cf_handle(cf_name)?;
        match self.db.get_cf(cf, index.to_be_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf_handle(cf_name)?;
        let mut items = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            items.push(bincode::deserialize(&value)?);
        }
        Ok(items)
    }

    fn scan_snapshot<T: DeserializeOwned>(
        &self,
        snapshot: &Snapshot<'_>,
        cf_name: &str,
    ) -> Result<Vec<T>> {
        let cf = self.cf_handle(cf_name)?;
        let mut items = Vec::new();
        for item in snapshot.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            items.push(bincode::deserialize(&value)?);
        }
        Ok(items)
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

impl LedgerStore for Storage {
    fn append(
        &self,
        block: &Block,
        transaction: &Transaction,
        snapshot: Option<&MarketSnapshot>,
    ) -> Result<()> {
        let expected = self.block_count()?;
        if block.index != expected {
            return Err(Error::InvariantViolation(format!(
                "Append of block {} out of order, next index is {}",
                block.index, expected
            )));
        }

        let key = block.index.to_be_bytes();
        let mut batch = WriteBatch::default();

        // 1. Block
        batch.put_cf(self.cf_handle(CF_BLOCKS)?, key, bincode::serialize(block)?);

        // 2. Paired transaction
        batch.put_cf(
            self.cf_handle(CF_TRANSACTIONS)?,
            key,
            bincode::serialize(transaction)?,
        );

        // 3. Market snapshot (mint/burn and genesis only)
        if let Some(snapshot) = snapshot {
            batch.put_cf(self.cf_handle(CF_MARKET)?, MARKET_KEY, bincode::serialize(snapshot)?);
        }

        // Atomic commit
        self.db.write(batch)?;

        tracing::debug!(index = block.index, hash = %block.hash, "Block persisted");

        Ok(())
    }

    fn get_block(&self, index: u64) -> Result<Block> {
        self.get_indexed(CF_BLOCKS, index)?
            .ok_or(Error::BlockNotFound(index))
    }

    fn get_transaction(&self, index: u64) -> Result<Transaction> {
        self.get_indexed(CF_TRANSACTIONS, index)?
            .ok_or(Error::TransactionNotFound(index))
    }

    fn latest_block(&self) -> Result<Option<Block>> {
        let cf = self.cf_handle(CF_BLOCKS)?;

        if let Some(item) = self.db.iterator_cf(cf, IteratorMode::End).next() {
            let (_, value) = item?;
            return Ok(Some(bincode::deserialize(&value)?));
        }

        Ok(None)
    }

    fn blocks(&self) -> Result<Vec<Block>> {
        self.scan(CF_BLOCKS)
    }

    fn transactions(&self) -> Result<Vec<Transaction>> {
        self.scan(CF_TRANSACTIONS)
    }

    fn market_snapshot(&self) -> Result<Option<MarketSnapshot>> {
        let cf = self.cf_handle(CF_MARKET)?;
        match self.db.get_cf(cf, MARKET_KEY)? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    fn view(&self) -> Result<LedgerView> {
        // Every read below goes through the same RocksDB snapshot
        let db_snapshot = self.db.snapshot();

        let blocks = self.scan_snapshot(&db_snapshot, CF_BLOCKS)?;
        let transactions = self.scan_snapshot(&db_snapshot, CF_TRANSACTIONS)?;
        let snapshot = match db_snapshot.get_cf(self.cf_handle(CF_MARKET)?, MARKET_KEY)? {
            Some(value) => Some(bincode::deserialize(&value)?),
            None => None,
        };

        Ok(LedgerView {
            blocks,
            transactions,
            snapshot,
        })
    }
}
