//! Bot archetypes and their behavioral parameter table.
//!
//! Five fixed profiles calibrated from observed on-chain trader cohorts:
//! holding horizon, entry/exit thresholds, sizing and entry staggering all
//! come from this table. Instances of the same archetype differ only in
//! capital and random draws.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Behavioral profile of a trading bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Archetype {
    /// High-frequency short-horizon trader (~0.3 day hold).
    HfShort,
    /// Medium-horizon trader (~2.8 day hold), the largest cohort.
    HfMedium,
    /// Long-horizon trader (~19 day hold).
    HfLong,
    /// Large-capital trader entering in tranches.
    Whale,
    /// Opportunistic dip buyer (~5 day hold).
    Opportunist,
}

impl Archetype {
    pub const ALL: [Archetype; 5] = [
        Archetype::HfShort,
        Archetype::HfMedium,
        Archetype::HfLong,
        Archetype::Whale,
        Archetype::Opportunist,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Archetype::HfShort => "HF_SHORT",
            Archetype::HfMedium => "HF_MEDIUM",
            Archetype::HfLong => "HF_LONG",
            Archetype::Whale => "WHALE",
            Archetype::Opportunist => "OPPORTUNIST",
        }
    }

    /// The static parameter set for this archetype.
    pub fn params(&self) -> ArchetypeParams {
        match self {
            Archetype::HfShort => ArchetypeParams {
                entry_threshold: dec!(0.003),
                activation_probability: 0.8,
                stop_loss: dec!(0.5),
                take_profit: dec!(0.08),
                hold_horizon_ticks: 2_160,
                position_fraction: dec!(0.5),
                tranches: 1,
                min_volatility: dec!(0.05),
            },
            Archetype::HfMedium => ArchetypeParams {
                entry_threshold: dec!(0.0086),
                activation_probability: 0.6,
                stop_loss: dec!(0.672),
                take_profit: dec!(0.15),
                hold_horizon_ticks: 20_160,
                position_fraction: dec!(0.3),
                tranches: 1,
                min_volatility: dec!(0.028),
            },
            Archetype::HfLong => ArchetypeParams {
                entry_threshold: dec!(0.0073),
                activation_probability: 0.3,
                stop_loss: dec!(0.8),
                take_profit: dec!(0.25),
                hold_horizon_ticks: 138_240,
                position_fraction: dec!(0.2),
                tranches: 1,
                min_volatility: dec!(0.01),
            },
            Archetype::Whale => ArchetypeParams {
                entry_threshold: dec!(0.005),
                activation_probability: 0.4,
                stop_loss: dec!(0.9),
                take_profit: dec!(0.3),
                hold_horizon_ticks: 72_000,
                position_fraction: dec!(0.8),
                tranches: 4,
                min_volatility: dec!(0.02),
            },
            Archetype::Opportunist => ArchetypeParams {
                entry_threshold: dec!(0.004),
                activation_probability: 0.7,
                stop_loss: dec!(0.4),
                take_profit: dec!(0.12),
                hold_horizon_ticks: 36_000,
                position_fraction: dec!(0.4),
                tranches: 1,
                min_volatility: dec!(0.03),
            },
        }
    }
}

impl std::fmt::Display for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Parameter set governing one archetype's behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArchetypeParams {
    /// Absolute price below which entry becomes eligible.
    pub entry_threshold: Decimal,
    /// Per-tick probability an eligible bot actually enters. Models
    /// staggered, heterogeneous entry across a cohort.
    pub activation_probability: f64,
    /// Fractional drawdown from entry price that triggers a stop-loss exit
    /// (0.672 means exit at -67.2%).
    pub stop_loss: Decimal,
    /// Fractional gain from entry price that triggers a take-profit exit.
    pub take_profit: Decimal,
    /// Active ticks after which the time-decay exit fires.
    pub hold_horizon_ticks: u64,
    /// Fraction of capital committed to a position.
    pub position_fraction: Decimal,
    /// Number of equal orders the position is split into (whales scale in
    /// rather than entering with a single order).
    pub tranches: u32,
    /// Minimum observed volatility required before entering.
    pub min_volatility: Decimal,
}

/// Optional per-archetype parameter overrides from the population spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ParamOverrides {
    pub entry_threshold: Option<Decimal>,
    pub activation_probability: Option<f64>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub hold_horizon_ticks: Option<u64>,
    pub position_fraction: Option<Decimal>,
    pub tranches: Option<u32>,
    pub min_volatility: Option<Decimal>,
}

impl ParamOverrides {
    /// Apply the overrides on top of an archetype's static table entry.
    pub fn apply(&self, base: ArchetypeParams) -> ArchetypeParams {
        ArchetypeParams {
            entry_threshold: self.entry_threshold.unwrap_or(base.entry_threshold),
            activation_probability: self
                .activation_probability
                .unwrap_or(base.activation_probability),
            stop_loss: self.stop_loss.unwrap_or(base.stop_loss),
            take_profit: self.take_profit.unwrap_or(base.take_profit),
            hold_horizon_ticks: self.hold_horizon_ticks.unwrap_or(base.hold_horizon_ticks),
            position_fraction: self.position_fraction.unwrap_or(base.position_fraction),
            tranches: self.tranches.unwrap_or(base.tranches),
            min_volatility: self.min_volatility.unwrap_or(base.min_volatility),
        }
    }
}
