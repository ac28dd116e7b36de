//! Transfer admission rules
//!
//! Checked in order, first failure wins:
//! 1. amount is non-negative
//! 2. amount does not exceed the per-transfer maximum
//! 3. a non-system sender's replayed balance covers the amount
//! 4. a mint keeps circulating supply within the cap
//!
//! Burns (`recipient == "system"`) carry no recipient-side check.

use crate::balance::BalanceCalculator;
use crate::config::MarketConfig;
use crate::error::Rejection;
use crate::storage::LedgerStore;
use crate::types::{Amount, Identity, MarketSnapshot, TransferRequest};
use crate::Result;
use rust_decimal::Decimal;

/// Validator holding the configured limits
#[derive(Debug, Clone)]
pub struct TransferValidator {
    max_transaction_amount: Amount,
    max_coin_supply: Amount,
}

impl TransferValidator {
    /// Create a validator with explicit limits
    pub fn new(max_transaction_amount: Amount, max_coin_supply: Amount) -> Self {
        Self {
            max_transaction_amount,
            max_coin_supply,
        }
    }

    /// Validator configured from the market section
    pub fn from_config(config: &MarketConfig) -> Self {
        Self::new(config.max_transaction_amount, config.max_coin_supply)
    }

    /// Validate against the persisted history in `store`
    pub fn validate(
        &self,
        store: &dyn LedgerStore,
        request: &TransferRequest,
        snapshot: &MarketSnapshot,
    ) -> Result<()> {
        let calculator = BalanceCalculator::new(store);
        self.validate_with(request, snapshot, |sender| calculator.balance_of(sender))
    }

    /// Validate with a caller-supplied balance lookup.
    ///
    /// `balance_of` is only invoked for non-system senders that passed the
    /// amount checks.
    pub fn validate_with<F>(
        &self,
        request: &TransferRequest,
        snapshot: &MarketSnapshot,
        balance_of: F,
    ) -> Result<()>
    where
        F: FnOnce(&Identity) -> Result<Amount>,
    {
        if request.amount < Decimal::ZERO {
            return Err(Rejection::NegativeAmount.into());
        }

        if request.amount > self.max_transaction_amount {
            return Err(Rejection::AmountExceedsMaximum.into());
        }

        if !request.sender.is_system() {
            let balance = balance_of(&request.sender)?;
            if balance < request.amount {
                return Err(Rejection::InsufficientBalance.into());
            }
        }

        if request.sender.is_system()
            && snapshot.total_supply + request.amount > self.max_coin_supply
        {
            return Err(Rejection::ExceedsMaximumSupply.into());
        }

        Ok(())
    }
}
