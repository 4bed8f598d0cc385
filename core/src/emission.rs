//! Fixed-rate token emission and its allocation across stakeholders.
//!
//! The schedule is a pure function of elapsed ticks: a constant amount per
//! period, spread evenly over the period's ticks. Each tick the distributor
//! optionally mints a configured fraction straight into the pool's token
//! reserve and allocates the rest across holders proportional to the
//! supplied weights. Allocations sum exactly to the distributable amount:
//! every share is truncated and the rounding remainder goes to the default
//! holder, so no supply drifts in or out of existence.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::pool::{LiquidityPool, PoolError};

/// Decimal places kept on individual holder shares before the remainder is
/// swept to the default holder.
const SHARE_DP: u32 = 12;

/// How holder weights are derived when splitting the per-tick emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeightingRule {
    /// Proportional to each holder's current token balance.
    #[default]
    StakeProportional,
    /// Proportional to each holder's current base-asset balance.
    CapitalProportional,
}

/// Fixed periodic emission of new tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmissionSchedule {
    /// Tokens minted per period (e.g. 7200 per day).
    pub rate_per_period: Decimal,
    /// Ticks per period (e.g. 7200 ticks per day).
    pub period_length: u64,
}

impl EmissionSchedule {
    /// Emission amount for a single tick.
    pub fn per_tick(&self) -> Decimal {
        self.rate_per_period / Decimal::from(self.period_length)
    }
}

/// Outcome of one tick of emission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmissionTick {
    /// Total minted this tick.
    pub total: Decimal,
    /// Portion minted directly into the pool's token reserve.
    pub minted_to_pool: Decimal,
    /// Per-holder token allocations, aligned with the weight slice passed
    /// to [`EmissionDistributor::distribute`]. Sums exactly to
    /// `total - minted_to_pool` when a default holder exists.
    pub allocations: Vec<Decimal>,
    /// Amount with no holder to receive it (no holders, or zero weights and
    /// no default holder). Tracked so total supply still reconciles.
    pub unallocated: Decimal,
}

/// Computes and allocates the per-tick emission.
#[derive(Debug, Clone)]
pub struct EmissionDistributor {
    schedule: EmissionSchedule,
    /// Fraction of each tick's emission minted straight into the pool.
    pool_mint_fraction: Decimal,
    /// Holder index receiving the rounding remainder (and everything when
    /// total weight is zero). `None` routes those amounts to `unallocated`.
    default_holder: Option<usize>,
}

impl EmissionDistributor {
    pub fn new(
        schedule: EmissionSchedule,
        pool_mint_fraction: Decimal,
        default_holder: Option<usize>,
    ) -> Self {
        Self {
            schedule,
            pool_mint_fraction,
            default_holder,
        }
    }

    pub fn schedule(&self) -> &EmissionSchedule {
        &self.schedule
    }

    /// Emit one tick's tokens: mint the pool fraction into `pool` and split
    /// the remainder across `weights`.
    ///
    /// `tick` is accepted for interface symmetry with the orchestrator; the
    /// schedule itself is stateless in elapsed ticks.
    pub fn distribute(
        &self,
        _tick: u64,
        pool: &mut LiquidityPool,
        weights: &[Decimal],
    ) -> Result<EmissionTick, PoolError> {
        let total = self.schedule.per_tick();
        let minted_to_pool = total * self.pool_mint_fraction;
        if minted_to_pool > Decimal::ZERO {
            pool.inject_token(minted_to_pool)?;
        }

        let distributable = total - minted_to_pool;
        let mut allocations = vec![Decimal::ZERO; weights.len()];
        let mut unallocated = Decimal::ZERO;

        if distributable > Decimal::ZERO {
            let weight_sum: Decimal = weights.iter().copied().sum();

            if weight_sum > Decimal::ZERO {
                let mut assigned = Decimal::ZERO;
                for (alloc, weight) in allocations.iter_mut().zip(weights) {
                    if *weight <= Decimal::ZERO {
                        continue;
                    }
                    let share = (distributable * *weight / weight_sum)
                        .round_dp_with_strategy(SHARE_DP, RoundingStrategy::ToZero);
                    *alloc = share;
                    assigned += share;
                }
                let remainder = distributable - assigned;
                match self.default_holder {
                    Some(idx) if idx < allocations.len() => allocations[idx] += remainder,
                    _ => unallocated += remainder,
                }
            } else {
                match self.default_holder {
                    Some(idx) if idx < allocations.len() => allocations[idx] += distributable,
                    _ => unallocated += distributable,
                }
            }
        }

        Ok(EmissionTick {
            total,
            minted_to_pool,
            allocations,
            unallocated,
        })
    }
}
