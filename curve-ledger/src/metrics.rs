//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `ledger_transfers_accepted_total` - Transfers sealed into a block
//! - `ledger_transfers_rejected_total` - Transfers refused by admission rules
//! - `ledger_blocks_total` - Blocks appended, genesis included
//! - `ledger_hash_attempts_total` - Hashes computed while mining
//! - `ledger_mining_duration_seconds` - Histogram of proof-of-work search time
//! - `ledger_total_supply` - Circulating supply after the last mint or burn
//!
//! Each [`Metrics`] owns its registry, so several ledgers can live in one
//! process.

use prometheus::{Gauge, Histogram, HistogramOpts, IntCounter, Registry};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Accepted transfers
    pub transfers_accepted: IntCounter,

    /// Rejected transfers
    pub transfers_rejected: IntCounter,

    /// Total blocks appended
    pub blocks_total: IntCounter,

    /// Total hashes computed by the miner
    pub hash_attempts: IntCounter,

    /// Mining duration histogram
    pub mining_duration: Histogram,

    /// Circulating supply
    pub total_supply: Gauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("transfers_accepted", &self.transfers_accepted.get())
            .field("transfers_rejected", &self.transfers_rejected.get())
            .field("blocks_total", &self.blocks_total.get())
            .finish()
    }
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let transfers_accepted = IntCounter::new(
            "ledger_transfers_accepted_total",
            "Transfers sealed into a block",
        )?;
        registry.register(Box::new(transfers_accepted.clone()))?;

        let transfers_rejected = IntCounter::new(
            "ledger_transfers_rejected_total",
            "Transfers refused by admission rules",
        )?;
        registry.register(Box::new(transfers_rejected.clone()))?;

        let blocks_total = IntCounter::new("ledger_blocks_total", "Total number of blocks appended")?;
        registry.register(Box::new(blocks_total.clone()))?;

        let hash_attempts = IntCounter::new(
            "ledger_hash_attempts_total",
            "Hashes computed during proof-of-work",
        )?;
        registry.register(Box::new(hash_attempts.clone()))?;

        let mining_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_mining_duration_seconds",
                "Histogram of proof-of-work search time",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.050, 0.100, 0.500, 1.0, 5.0, 30.0]),
        )?;
        registry.register(Box::new(mining_duration.clone()))?;

        let total_supply = Gauge::new("ledger_total_supply", "Circulating supply")?;
        registry.register(Box::new(total_supply.clone()))?;

        Ok(Self {
            transfers_accepted,
            transfers_rejected,
            blocks_total,
            hash_attempts,
            mining_duration,
            total_supply,
            registry,
        })
    }

    /// Record a sealed transfer and the work it took
    pub fn record_transfer_accepted(&self, attempts: u64, duration_seconds: f64) {
        self.transfers_accepted.inc();
        self.blocks_total.inc();
        self.hash_attempts.inc_by(attempts);
        self.mining_duration.observe(duration_seconds);
    }

    /// Record a rejected transfer
    pub fn record_transfer_rejected(&self) {
        self.transfers_rejected.inc();
    }

    /// Record the genesis block
    pub fn record_genesis(&self) {
        self.blocks_total.inc();
    }

    /// Update circulating supply
    pub fn update_total_supply(&self, supply: Decimal) {
        self.total_supply.set(supply.to_f64().unwrap_or(f64::NAN));
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.transfers_accepted.get(), 0);
        assert_eq!(metrics.blocks_total.get(), 0);
    }

    #[test]
    fn test_independent_instances() {
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();
        first.record_transfer_rejected();
        assert_eq!(first.transfers_rejected.get(), 1);
        assert_eq!(second.transfers_rejected.get(), 0);
    }

    #[test]
    fn test_record_transfer_accepted() {
        let metrics = Metrics::new().unwrap();
        metrics.record_genesis();
        metrics.record_transfer_accepted(42, 0.003);
        assert_eq!(metrics.transfers_accepted.get(), 1);
        assert_eq!(metrics.blocks_total.get(), 2);
        assert_eq!(metrics.hash_attempts.get(), 42);
        assert_eq!(metrics.mining_duration.get_sample_count(), 1);
    }

    #[test]
    fn test_update_total_supply() {
        let metrics = Metrics::new().unwrap();
        metrics.update_total_supply(Decimal::new(1505, 1));
        assert_eq!(metrics.total_supply.get(), 150.5);
        assert_eq!(metrics.registry().gather().len(), 6);
    }
}
