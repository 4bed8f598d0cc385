//! Constant product liquidity pool (x * y = k) pairing the base asset
//! with the subnet token.
//!
//! The pool is mutated only through [`LiquidityPool::buy`] and
//! [`LiquidityPool::sell`] (trades) and the emission-side injection
//! methods. A rejected trade leaves both reserves untouched.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Errors raised by pool operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The requested output would equal or exceed the opposite reserve.
    /// Recoverable: the triggering trade is a no-op.
    #[error("insufficient liquidity: output {output} against reserve {reserve}")]
    InsufficientLiquidity { output: Decimal, reserve: Decimal },

    /// Spot price is undefined because the token reserve is zero.
    #[error("spot price undefined: token reserve is zero")]
    DivisionUndefined,

    /// Trade or injection amount was zero or negative.
    #[error("invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// A checked arithmetic operation overflowed. Fatal to the run.
    #[error("numeric overflow in pool arithmetic")]
    NumericOverflow,
}

/// Which side of the pool a trade entered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSide {
    /// Base in, token out.
    Buy,
    /// Token in, base out.
    Sell,
}

/// Result of an executed swap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub side: TradeSide,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub fee_paid: Decimal,
    /// Relative price move caused by the trade.
    pub price_impact: Decimal,
    pub price_after: Decimal,
}

/// A constant-product market maker holding two reserves.
#[derive(Debug, Clone, Serialize)]
pub struct LiquidityPool {
    reserve_base: Decimal,
    reserve_token: Decimal,
    /// Fee fraction deducted from the input side of every trade (e.g. 0.003).
    fee_rate: Decimal,
    /// Cumulative traded volume, in base terms.
    total_volume_base: Decimal,
    /// Tokens minted directly into the pool by emission.
    total_token_injected: Decimal,
    /// Base minted directly into the pool by emission.
    total_base_injected: Decimal,
    swap_count: u64,
}

impl LiquidityPool {
    /// Create a pool. Both reserves must be strictly positive and the fee
    /// fraction must lie in `[0, 1)`.
    pub fn new(
        reserve_base: Decimal,
        reserve_token: Decimal,
        fee_rate: Decimal,
    ) -> Result<Self, PoolError> {
        if reserve_base <= Decimal::ZERO {
            return Err(PoolError::InvalidAmount(reserve_base));
        }
        if reserve_token <= Decimal::ZERO {
            return Err(PoolError::InvalidAmount(reserve_token));
        }
        if fee_rate < Decimal::ZERO || fee_rate >= Decimal::ONE {
            return Err(PoolError::InvalidAmount(fee_rate));
        }

        Ok(Self {
            reserve_base,
            reserve_token,
            fee_rate,
            total_volume_base: Decimal::ZERO,
            total_token_injected: Decimal::ZERO,
            total_base_injected: Decimal::ZERO,
            swap_count: 0,
        })
    }

    pub fn reserve_base(&self) -> Decimal {
        self.reserve_base
    }

    pub fn reserve_token(&self) -> Decimal {
        self.reserve_token
    }

    pub fn fee_rate(&self) -> Decimal {
        self.fee_rate
    }

    pub fn total_volume_base(&self) -> Decimal {
        self.total_volume_base
    }

    pub fn total_token_injected(&self) -> Decimal {
        self.total_token_injected
    }

    pub fn total_base_injected(&self) -> Decimal {
        self.total_base_injected
    }

    pub fn swap_count(&self) -> u64 {
        self.swap_count
    }

    /// The invariant `k = reserve_base * reserve_token`.
    ///
    /// Non-decreasing across trades; grows by exactly the retained fee.
    pub fn constant_product(&self) -> Result<Decimal, PoolError> {
        self.reserve_base
            .checked_mul(self.reserve_token)
            .ok_or(PoolError::NumericOverflow)
    }

    /// Spot price of the token in base terms: `reserve_base / reserve_token`.
    pub fn spot_price(&self) -> Result<Decimal, PoolError> {
        if self.reserve_token.is_zero() {
            return Err(PoolError::DivisionUndefined);
        }
        Ok(self.reserve_base / self.reserve_token)
    }

    /// Swap base for token. The fee is deducted from the input before the
    /// constant-product formula is applied; the full input (fee included)
    /// enters the base reserve, so `k` grows by the fee.
    pub fn buy(&mut self, amount_base: Decimal) -> Result<Trade, PoolError> {
        if amount_base <= Decimal::ZERO {
            return Err(PoolError::InvalidAmount(amount_base));
        }

        let price_before = self.spot_price()?;
        let fee = amount_base * self.fee_rate;
        let in_after_fee = amount_base - fee;

        // token_out = reserve_token - k / (reserve_base + in_after_fee)
        // rearranged to (reserve_token * in_after_fee) / (reserve_base + in_after_fee)
        let numer = self
            .reserve_token
            .checked_mul(in_after_fee)
            .ok_or(PoolError::NumericOverflow)?;
        let token_out = numer / (self.reserve_base + in_after_fee);

        if token_out >= self.reserve_token {
            return Err(PoolError::InsufficientLiquidity {
                output: token_out,
                reserve: self.reserve_token,
            });
        }

        self.reserve_base += amount_base;
        self.reserve_token -= token_out;
        self.total_volume_base += amount_base;
        self.swap_count += 1;

        let price_after = self.spot_price()?;
        let price_impact = (price_after - price_before) / price_before;

        log::debug!(
            "pool buy: {amount_base} base -> {token_out} token (fee {fee}, impact {price_impact})"
        );

        Ok(Trade {
            side: TradeSide::Buy,
            amount_in: amount_base,
            amount_out: token_out,
            fee_paid: fee,
            price_impact,
            price_after,
        })
    }

    /// Swap token for base. Symmetric to [`LiquidityPool::buy`].
    pub fn sell(&mut self, amount_token: Decimal) -> Result<Trade, PoolError> {
        if amount_token <= Decimal::ZERO {
            return Err(PoolError::InvalidAmount(amount_token));
        }

        let price_before = self.spot_price()?;
        let fee = amount_token * self.fee_rate;
        let in_after_fee = amount_token - fee;

        let numer = self
            .reserve_base
            .checked_mul(in_after_fee)
            .ok_or(PoolError::NumericOverflow)?;
        let base_out = numer / (self.reserve_token + in_after_fee);

        if base_out >= self.reserve_base {
            return Err(PoolError::InsufficientLiquidity {
                output: base_out,
                reserve: self.reserve_base,
            });
        }

        self.reserve_token += amount_token;
        self.reserve_base -= base_out;
        self.total_volume_base += base_out;
        self.swap_count += 1;

        let price_after = self.spot_price()?;
        let price_impact = (price_after - price_before) / price_before;

        log::debug!(
            "pool sell: {amount_token} token -> {base_out} base (fee {fee}, impact {price_impact})"
        );

        Ok(Trade {
            side: TradeSide::Sell,
            amount_in: amount_token,
            amount_out: base_out,
            fee_paid: fee,
            price_impact,
            price_after,
        })
    }

    /// Mint tokens directly into the token reserve.
    ///
    /// Emission-side operation: deliberately moves `k`. Only the emission
    /// distributor calls this; it is not a trade.
    pub fn inject_token(&mut self, amount: Decimal) -> Result<(), PoolError> {
        if amount < Decimal::ZERO {
            return Err(PoolError::InvalidAmount(amount));
        }
        self.reserve_token += amount;
        self.total_token_injected += amount;
        Ok(())
    }

    /// Mint base directly into the base reserve. Emission-side operation.
    pub fn inject_base(&mut self, amount: Decimal) -> Result<(), PoolError> {
        if amount < Decimal::ZERO {
            return Err(PoolError::InvalidAmount(amount));
        }
        self.reserve_base += amount;
        self.total_base_injected += amount;
        Ok(())
    }

    /// Both reserves are strictly positive and a price is computable.
    pub fn is_healthy(&self) -> bool {
        self.reserve_base > Decimal::ZERO && self.reserve_token > Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pool() -> LiquidityPool {
        LiquidityPool::new(dec!(1000), dec!(250000), dec!(0.003)).unwrap()
    }

    #[test]
    fn rejects_non_positive_reserves() {
        assert!(LiquidityPool::new(dec!(0), dec!(1), dec!(0)).is_err());
        assert!(LiquidityPool::new(dec!(1), dec!(-5), dec!(0)).is_err());
    }

    #[test]
    fn rejects_fee_out_of_range() {
        assert!(LiquidityPool::new(dec!(1), dec!(1), dec!(1)).is_err());
        assert!(LiquidityPool::new(dec!(1), dec!(1), dec!(-0.01)).is_err());
        assert!(LiquidityPool::new(dec!(1), dec!(1), dec!(0.999)).is_ok());
    }

    #[test]
    fn spot_price_is_reserve_ratio() {
        let p = pool();
        assert_eq!(p.spot_price().unwrap(), dec!(0.004));
    }

    #[test]
    fn buy_moves_price_up_and_sell_moves_it_down() {
        let mut p = pool();
        let before = p.spot_price().unwrap();

        let trade = p.buy(dec!(10)).unwrap();
        assert!(trade.amount_out > Decimal::ZERO);
        assert!(p.spot_price().unwrap() > before);
        assert!(trade.price_impact > Decimal::ZERO);

        let after_buy = p.spot_price().unwrap();
        let trade = p.sell(trade.amount_out).unwrap();
        assert!(p.spot_price().unwrap() < after_buy);
        assert!(trade.price_impact < Decimal::ZERO);
    }

    #[test]
    fn constant_product_never_decreases() {
        let mut p = pool();
        let mut k = p.constant_product().unwrap();

        for i in 1..=50 {
            if i % 2 == 0 {
                p.buy(Decimal::from(i)).unwrap();
            } else {
                p.sell(Decimal::from(i * 100)).unwrap();
            }
            let k_next = p.constant_product().unwrap();
            assert!(k_next >= k, "k decreased on trade {i}: {k} -> {k_next}");
            k = k_next;
        }
    }

    #[test]
    fn zero_fee_preserves_constant_product() {
        let mut p = LiquidityPool::new(dec!(1000), dec!(1000), Decimal::ZERO).unwrap();
        let k = p.constant_product().unwrap();
        p.buy(dec!(100)).unwrap();
        let k_after = p.constant_product().unwrap();

        // Equality up to Decimal's 28-digit rounding of the quotient.
        let drift = ((k_after - k) / k).abs();
        assert!(drift < dec!(0.0000000000000000001), "drift {drift}");
    }

    #[test]
    fn trade_rejects_non_positive_amounts() {
        let mut p = pool();
        assert!(matches!(p.buy(dec!(0)), Err(PoolError::InvalidAmount(_))));
        assert!(matches!(p.sell(dec!(-1)), Err(PoolError::InvalidAmount(_))));
    }

    #[test]
    fn rejected_trade_leaves_reserves_untouched() {
        let mut p = pool();
        let (rb, rt) = (p.reserve_base(), p.reserve_token());
        let _ = p.buy(dec!(-3));
        assert_eq!(p.reserve_base(), rb);
        assert_eq!(p.reserve_token(), rt);
        assert_eq!(p.swap_count(), 0);
    }

    #[test]
    fn reserves_never_fully_drain() {
        let mut p = LiquidityPool::new(dec!(1), dec!(1), dec!(0.003)).unwrap();
        // Even an enormous input leaves a strictly positive token reserve.
        p.buy(dec!(1000000000)).unwrap();
        assert!(p.reserve_token() > Decimal::ZERO);
        assert!(p.is_healthy());
    }

    #[test]
    fn injections_track_totals() {
        let mut p = pool();
        p.inject_token(dec!(2)).unwrap();
        p.inject_base(dec!(1)).unwrap();
        assert_eq!(p.total_token_injected(), dec!(2));
        assert_eq!(p.total_base_injected(), dec!(1));
        assert_eq!(p.reserve_token(), dec!(250002));
        assert_eq!(p.reserve_base(), dec!(1001));
    }
}
