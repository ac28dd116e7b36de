//! Bonding-curve pricing
//!
//! `delta = ln(1 + k * amount)`
//! `base = initial * (1 + delta * (bought - sold) / max(supply, 1))`
//! `buy = base * (1 + spread)`, `sell = base * (1 - spread)`

use crate::config::MarketConfig;
use crate::types::{Amount, MarketSnapshot, Price, TransferKind};
use crate::{Error, Result};
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

/// Buy/sell pair produced by the curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Price to buy one unit
    pub buy_price: Price,
    /// Price received selling one unit
    pub sell_price: Price,
}

/// Curve constants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BondingCurve {
    initial_price: Price,
    spread: Decimal,
    k: Decimal,
}

impl BondingCurve {
    /// Create a curve from explicit constants
    pub fn new(initial_price: Price, spread: Decimal, k: Decimal) -> Self {
        Self {
            initial_price,
            spread,
            k,
        }
    }

    /// Curve configured from the market section
    pub fn from_config(config: &MarketConfig) -> Self {
        Self::new(config.initial_price, config.spread, config.curve_k)
    }

    /// Price both sides of the book for a trade of `amount`
    pub fn quote(
        &self,
        total_bought: Amount,
        total_sold: Amount,
        total_supply: Amount,
        amount: Amount,
    ) -> Result<Quote> {
        let delta = (Decimal::ONE + self.k * amount)
            .checked_ln()
            .ok_or_else(|| {
                Error::InvariantViolation(format!(
                    "Curve undefined for k = {} and amount = {}",
                    self.k, amount
                ))
            })?;

        let denominator = total_supply.max(Decimal::ONE);
        let base = self.initial_price
            * (Decimal::ONE + delta * (total_bought - total_sold) / denominator);

        Ok(Quote {
            buy_price: base * (Decimal::ONE + self.spread),
            sell_price: base * (Decimal::ONE - self.spread),
        })
    }

    /// Snapshot after a mint or burn of `amount`; peers leave it untouched
    pub fn apply(
        &self,
        snapshot: &MarketSnapshot,
        kind: TransferKind,
        amount: Amount,
    ) -> Result<MarketSnapshot> {
        let mut next = snapshot.clone();

        match kind {
            TransferKind::Mint => {
                next.total_bought += amount;
                next.total_supply += amount;
            }
            TransferKind::Burn => {
                next.total_sold += amount;
                next.total_supply -= amount;
            }
            TransferKind::Peer => return Ok(next),
        }

        if next.total_supply < Decimal::ZERO {
            return Err(Error::InvariantViolation(format!(
                "Burn of {} would leave negative supply {}",
                amount, next.total_supply
            )));
        }

        let quote = self.quote(next.total_bought, next.total_sold, next.total_supply, amount)?;
        next.buy_price = quote.buy_price;
        next.sell_price = quote.sell_price;

        Ok(next)
    }
}

impl Default for BondingCurve {
    fn default() -> Self {
        Self::from_config(&MarketConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::ToPrimitive;

    fn approx(value: Decimal, expected: f64) {
        let v = value.to_f64().unwrap();
        assert!((v - expected).abs() < 1e-6, "{} != {}", v, expected);
    }

    #[test]
    fn test_quote_balanced_book_is_initial_price() {
        let curve = BondingCurve::default();
        let q = curve
            .quote(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, Decimal::from(100))
            .unwrap();
        approx(q.buy_price, 1.5);
        approx(q.sell_price, 0.5);
    }

    #[test]
    fn test_quote_after_first_mint() {
        let curve = BondingCurve::default();
        let amount = Decimal::from(100);
        let q = curve
            .quote(amount, Decimal::ZERO, amount, amount)
            .unwrap();

        let base = 1.0 + 2f64.ln();
        approx(q.buy_price, base * 1.5);
        approx(q.sell_price, base * 0.5);
    }

    #[test]
    fn test_quote_zero_supply_uses_unit_denominator() {
        let curve = BondingCurve::default();
        let q = curve
            .quote(Decimal::from(5), Decimal::from(5), Decimal::ZERO, Decimal::from(10))
            .unwrap();
        approx(q.buy_price, 1.5);
    }

    #[test]
    fn test_apply_mint_and_burn() {
        let curve = BondingCurve::default();
        let start = MarketSnapshot::initial(Decimal::ONE);

        let minted = curve
            .apply(&start, TransferKind::Mint, Decimal::from(100))
            .unwrap();
        assert_eq!(minted.total_bought, Decimal::from(100));
        assert_eq!(minted.total_supply, Decimal::from(100));
        assert!(minted.is_balanced());
        assert!(minted.buy_price > minted.sell_price);

        let burned = curve
            .apply(&minted, TransferKind::Burn, Decimal::from(30))
            .unwrap();
        assert_eq!(burned.total_sold, Decimal::from(30));
        assert_eq!(burned.total_supply, Decimal::from(70));
        assert!(burned.is_balanced());
    }

    #[test]
    fn test_apply_peer_is_noop() {
        let curve = BondingCurve::default();
        let start = MarketSnapshot::initial(Decimal::ONE);
        let next = curve
            .apply(&start, TransferKind::Peer, Decimal::from(100))
            .unwrap();
        assert_eq!(next, start);
    }

    #[test]
    fn test_apply_burn_below_zero_is_invariant_violation() {
        let curve = BondingCurve::default();
        let start = MarketSnapshot::initial(Decimal::ONE);
        let err = curve
            .apply(&start, TransferKind::Burn, Decimal::from(1))
            .unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
    }

    #[test]
    fn test_undefined_log_is_invariant_violation() {
        // 1 + k * amount == 0 has no logarithm
        let curve = BondingCurve::new(Decimal::ONE, Decimal::new(5, 1), Decimal::from(-1));
        let err = curve
            .quote(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, Decimal::ONE)
            .unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
        assert!(!err.is_rejection());
    }
}
