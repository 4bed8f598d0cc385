//! The bot population: deterministic construction, a shared price window
//! for volatility, and creation-order iteration each tick.

use std::collections::VecDeque;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use subnet_core::{LiquidityPool, PoolError, WeightingRule};

use super::archetype::{Archetype, ParamOverrides};
use super::bot::{BotEvent, BotState, TradingBot};

/// Ticks of price history kept for the volatility estimate.
const PRICE_WINDOW: usize = 48;
/// Samples required before the estimate is trusted; below this the
/// population assumes a neutral default so early ticks are not all gated.
const MIN_SAMPLES: usize = 10;

/// One homogeneous cohort in the population spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CohortSpec {
    pub archetype: Archetype,
    pub count: usize,
    /// Starting base-asset capital per bot.
    pub capital_base: Decimal,
    #[serde(default)]
    pub overrides: ParamOverrides,
}

/// Declarative description of the whole population.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PopulationSpec {
    pub cohorts: Vec<CohortSpec>,
}

impl PopulationSpec {
    pub fn total_bots(&self) -> usize {
        self.cohorts.iter().map(|c| c.count).sum()
    }
}

/// Aggregate view of the population at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PopulationStats {
    pub dormant: usize,
    pub active: usize,
    pub exited: usize,
}

/// All bots, iterated strictly in creation order every tick.
#[derive(Debug)]
pub struct BotPopulation {
    bots: Vec<TradingBot>,
    price_window: VecDeque<Decimal>,
}

/// splitmix64 finalizer, used to derive per-bot seeds from the top-level
/// seed so adjacent indices get uncorrelated streams.
fn mix_seed(seed: u64, index: u64) -> u64 {
    let mut z = seed.wrapping_add(index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

impl BotPopulation {
    /// Instantiate the population. Bot ids are creation indices, assigned
    /// cohort by cohort in spec order.
    pub fn new(spec: &PopulationSpec, seed: u64) -> Self {
        let mut bots = Vec::with_capacity(spec.total_bots());
        for cohort in &spec.cohorts {
            let params = cohort.overrides.apply(cohort.archetype.params());
            for _ in 0..cohort.count {
                let id = bots.len();
                bots.push(TradingBot::new(
                    id,
                    cohort.archetype,
                    params,
                    cohort.capital_base,
                    mix_seed(seed, id as u64),
                ));
            }
        }
        Self {
            bots,
            price_window: VecDeque::with_capacity(PRICE_WINDOW),
        }
    }

    pub fn len(&self) -> usize {
        self.bots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }

    pub fn bots(&self) -> &[TradingBot] {
        &self.bots
    }

    /// Record the tick's opening price into the volatility window.
    pub fn observe_price(&mut self, price: Decimal) {
        if self.price_window.len() == PRICE_WINDOW {
            self.price_window.pop_front();
        }
        self.price_window.push_back(price);
    }

    /// Relative volatility over the window: mean absolute deviation divided
    /// by the mean price. A neutral default until enough samples exist.
    pub fn volatility(&self) -> Decimal {
        use rust_decimal_macros::dec;
        if self.price_window.len() < MIN_SAMPLES {
            return dec!(0.1);
        }
        let n = Decimal::from(self.price_window.len());
        let mean: Decimal = self.price_window.iter().copied().sum::<Decimal>() / n;
        if mean <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let mad: Decimal = self
            .price_window
            .iter()
            .map(|p| (*p - mean).abs())
            .sum::<Decimal>()
            / n;
        mad / mean
    }

    /// Run every bot for one tick, in creation order. Returns the events
    /// bots produced, tagged with the bot id.
    pub fn on_tick(
        &mut self,
        tick: u64,
        pool: &mut LiquidityPool,
    ) -> Result<Vec<(usize, BotEvent)>, PoolError> {
        let volatility = self.volatility();
        let mut events = Vec::new();
        for bot in &mut self.bots {
            if let Some(event) = bot.on_tick(tick, pool, volatility)? {
                events.push((bot.id(), event));
            }
        }
        Ok(events)
    }

    /// Emission weight of each bot under the given rule, in creation order.
    pub fn weights(&self, rule: WeightingRule) -> Vec<Decimal> {
        self.bots
            .iter()
            .map(|b| match rule {
                WeightingRule::StakeProportional => b.token_balance(),
                WeightingRule::CapitalProportional => b.capital_base(),
            })
            .collect()
    }

    /// Credit per-bot emission allocations, aligned with [`Self::weights`].
    pub fn apply_allocations(&mut self, allocations: &[Decimal]) {
        for (bot, tokens) in self.bots.iter_mut().zip(allocations) {
            if *tokens > Decimal::ZERO {
                bot.receive_emission(*tokens);
            }
        }
    }

    pub fn stats(&self) -> PopulationStats {
        let mut stats = PopulationStats {
            dormant: 0,
            active: 0,
            exited: 0,
        };
        for bot in &self.bots {
            match bot.state() {
                BotState::Dormant => stats.dormant += 1,
                BotState::Active => stats.active += 1,
                BotState::Exited => stats.exited += 1,
            }
        }
        stats
    }

    pub fn total_token_balance(&self) -> Decimal {
        self.bots.iter().map(|b| b.token_balance()).sum()
    }

    pub fn total_capital_base(&self) -> Decimal {
        self.bots.iter().map(|b| b.capital_base()).sum()
    }
}
