//! The platform's controlled trading strategy.
//!
//! Three phases, entered in order and never revisited: keep the market
//! orderly while bots churn (maintenance), buy cheap supply (accumulation),
//! then unwind the position once the pool is deep enough (distribution).

mod engine;

pub use engine::{PhaseLedger, StrategyEngine, StrategyEvent};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Strategy lifecycle phase. Transitions are one-way:
/// `Maintenance -> Accumulation -> Distribution`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Maintenance,
    Accumulation,
    Distribution,
}

/// How the maintenance phase leans on the bot population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SqueezeMode {
    /// Sell into the market to push price toward bot stop-losses.
    StopLoss,
    /// Buy to lift price into bot take-profit bands.
    TakeProfit,
    /// Alternate buys and sells to shake out both sides.
    Oscillate,
    /// Hold flat and let bot hold horizons expire.
    TimeDecay,
    /// Sustained buying followed by sustained selling, in cycles.
    PumpDump,
    /// Pick a mode per tick from the number of active bots.
    #[default]
    Mixed,
}

/// Strategy tuning. Budgets are denominated in the base asset and are
/// ceilings on spending, not separate wallets; the engine draws everything
/// from one base balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct StrategyConfig {
    /// Total base capital the strategy starts with.
    pub total_budget: Decimal,
    /// Spending ceiling for the maintenance phase.
    pub maintenance_budget: Decimal,
    /// Spending ceiling for the accumulation phase. Unspent maintenance
    /// budget rolls over on top of this.
    pub accumulation_budget: Decimal,
    pub squeeze_mode: SqueezeMode,
    /// Price the maintenance phase defends.
    pub platform_price: Decimal,
    /// Relative band around `platform_price`; the engine only intervenes
    /// once price leaves it.
    pub price_tolerance: Decimal,
    /// Maintenance ends after this many ticks even if budget remains.
    pub maintenance_ticks: u64,
    /// Maintenance also ends as soon as price falls to this level, handing
    /// over to accumulation while the market is cheap. `None` disables it.
    pub maintenance_exit_price: Option<Decimal>,
    /// Minimum ticks between maintenance interventions.
    pub cooldown_ticks: u64,
    /// Intervention size bounds, in base.
    pub min_intervention: Decimal,
    pub max_intervention: Decimal,
    /// Accumulation buys only at or below this price.
    pub buy_threshold: Decimal,
    /// Base spent per accumulation buy.
    pub buy_step_size: Decimal,
    /// Distribution starts once `pool.reserve_base >= total_budget *
    /// trigger_multiplier`.
    pub trigger_multiplier: Decimal,
    /// Fraction of token holdings sold per distribution tick.
    pub distribution_fraction: Decimal,
    /// Full buy-then-sell cycle length for [`SqueezeMode::PumpDump`].
    pub pump_cycle_ticks: u64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            total_budget: dec!(1000),
            maintenance_budget: dec!(200),
            accumulation_budget: dec!(600),
            squeeze_mode: SqueezeMode::default(),
            platform_price: dec!(1),
            price_tolerance: dec!(0.05),
            maintenance_ticks: 7200,
            maintenance_exit_price: None,
            cooldown_ticks: 12,
            min_intervention: dec!(0.1),
            max_intervention: dec!(5),
            buy_threshold: dec!(0.02),
            buy_step_size: dec!(2),
            trigger_multiplier: dec!(1.5),
            distribution_fraction: dec!(0.01),
            pump_cycle_ticks: 24,
        }
    }
}
