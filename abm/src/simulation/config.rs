//! Declarative simulation configuration and its validation.

use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use subnet_core::{PoolError, WeightingRule};
use thiserror::Error;

use crate::agents::PopulationSpec;
use crate::strategy::StrategyConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("pool rejected initial state: {0}")]
    Pool(#[from] PoolError),
    #[error("pool reserves must be positive (base {base}, token {token})")]
    NonPositiveReserve { base: Decimal, token: Decimal },
    #[error("fee rate {0} outside [0, 1)")]
    FeeOutOfRange(Decimal),
    #[error("simulation must run for at least one tick")]
    ZeroTicks,
    #[error("emission period length must be positive")]
    ZeroPeriodLength,
    #[error("emission rate per period must not be negative, got {0}")]
    NegativeEmissionRate(Decimal),
    #[error("{name} {value} outside [0, 1]")]
    FractionOutOfRange { name: &'static str, value: Decimal },
    #[error(
        "phase budgets exceed total: maintenance {maintenance} + accumulation {accumulation} > {total}"
    )]
    BudgetSplit {
        maintenance: Decimal,
        accumulation: Decimal,
        total: Decimal,
    },
    #[error("intervention bounds invalid: min {min}, max {max}")]
    InterventionBounds { min: Decimal, max: Decimal },
    #[error("platform price must be positive, got {0}")]
    NonPositivePlatformPrice(Decimal),
    #[error("maintenance exit price must be positive, got {0}")]
    NonPositiveExitPrice(Decimal),
    #[error("cohort of {archetype} has non-positive capital {capital}")]
    NonPositiveCapital {
        archetype: String,
        capital: Decimal,
    },
}

/// Initial pool state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PoolConfig {
    pub reserve_base: Decimal,
    pub reserve_token: Decimal,
    pub fee_rate: Decimal,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            reserve_base: dec!(1000),
            reserve_token: dec!(1000),
            fee_rate: dec!(0.003),
        }
    }
}

/// Emission schedule and routing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EmissionConfig {
    /// Tokens minted per period.
    pub rate_per_period: Decimal,
    /// Ticks per period.
    pub period_length: u64,
    /// Fraction of each tick's emission minted straight into the pool.
    pub pool_mint_fraction: Decimal,
    /// How the rest is split across holders.
    pub weighting: WeightingRule,
}

impl Default for EmissionConfig {
    fn default() -> Self {
        Self {
            rate_per_period: dec!(7200),
            period_length: 7200,
            pool_mint_fraction: dec!(0.5),
            weighting: WeightingRule::default(),
        }
    }
}

/// The whole simulation, ready to hand to the runner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SimulationConfig {
    /// Top-level seed. Every random stream in the run derives from it.
    pub seed: u64,
    /// Number of ticks to simulate.
    pub ticks: u64,
    pub pool: PoolConfig,
    pub emission: EmissionConfig,
    pub population: PopulationSpec,
    /// `None` disables the platform strategy entirely.
    pub strategy: Option<StrategyConfig>,
}

impl SimulationConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Reject configurations that cannot produce a meaningful run. Called
    /// by the runner before the first tick; nothing is mutated on failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticks == 0 {
            return Err(ConfigError::ZeroTicks);
        }
        if self.pool.reserve_base <= Decimal::ZERO || self.pool.reserve_token <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveReserve {
                base: self.pool.reserve_base,
                token: self.pool.reserve_token,
            });
        }
        if self.pool.fee_rate < Decimal::ZERO || self.pool.fee_rate >= Decimal::ONE {
            return Err(ConfigError::FeeOutOfRange(self.pool.fee_rate));
        }
        if self.emission.period_length == 0 {
            return Err(ConfigError::ZeroPeriodLength);
        }
        if self.emission.rate_per_period < Decimal::ZERO {
            return Err(ConfigError::NegativeEmissionRate(
                self.emission.rate_per_period,
            ));
        }
        check_fraction("pool_mint_fraction", self.emission.pool_mint_fraction)?;

        for cohort in &self.population.cohorts {
            if cohort.count > 0 && cohort.capital_base <= Decimal::ZERO {
                return Err(ConfigError::NonPositiveCapital {
                    archetype: cohort.archetype.to_string(),
                    capital: cohort.capital_base,
                });
            }
        }

        if let Some(strategy) = &self.strategy {
            if strategy.maintenance_budget + strategy.accumulation_budget > strategy.total_budget {
                return Err(ConfigError::BudgetSplit {
                    maintenance: strategy.maintenance_budget,
                    accumulation: strategy.accumulation_budget,
                    total: strategy.total_budget,
                });
            }
            if strategy.min_intervention <= Decimal::ZERO
                || strategy.max_intervention < strategy.min_intervention
            {
                return Err(ConfigError::InterventionBounds {
                    min: strategy.min_intervention,
                    max: strategy.max_intervention,
                });
            }
            if strategy.platform_price <= Decimal::ZERO {
                return Err(ConfigError::NonPositivePlatformPrice(
                    strategy.platform_price,
                ));
            }
            check_fraction("price_tolerance", strategy.price_tolerance)?;
            if let Some(price) = strategy.maintenance_exit_price {
                if price <= Decimal::ZERO {
                    return Err(ConfigError::NonPositiveExitPrice(price));
                }
            }
            check_fraction("distribution_fraction", strategy.distribution_fraction)?;
        }
        Ok(())
    }
}

fn check_fraction(name: &'static str, value: Decimal) -> Result<(), ConfigError> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(ConfigError::FractionOutOfRange { name, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{Archetype, CohortSpec, ParamOverrides};

    #[test]
    fn default_config_is_valid() {
        let mut config = SimulationConfig::default();
        config.ticks = 100;
        config.validate().unwrap();
    }

    #[test]
    fn zero_ticks_rejected() {
        let config = SimulationConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTicks)));
    }

    #[test]
    fn budget_split_must_fit_total() {
        let mut config = SimulationConfig::default();
        config.ticks = 1;
        config.strategy = Some(StrategyConfig {
            total_budget: dec!(10),
            maintenance_budget: dec!(8),
            accumulation_budget: dec!(8),
            ..StrategyConfig::default()
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BudgetSplit { .. })
        ));
    }

    #[test]
    fn maintenance_exit_price_must_be_positive() {
        let mut config = SimulationConfig::default();
        config.ticks = 1;
        config.strategy = Some(StrategyConfig {
            maintenance_exit_price: Some(Decimal::ZERO),
            ..StrategyConfig::default()
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveExitPrice(_))
        ));
    }

    #[test]
    fn fee_must_stay_below_one() {
        let mut config = SimulationConfig::default();
        config.ticks = 1;
        config.pool.fee_rate = Decimal::ONE;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::FeeOutOfRange(_))
        ));
    }

    #[test]
    fn cohort_capital_must_be_positive() {
        let mut config = SimulationConfig::default();
        config.ticks = 1;
        config.population.cohorts.push(CohortSpec {
            archetype: Archetype::Whale,
            count: 2,
            capital_base: Decimal::ZERO,
            overrides: ParamOverrides::default(),
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveCapital { .. })
        ));
    }

    #[test]
    fn json_round_trip() {
        let mut config = SimulationConfig::default();
        config.ticks = 50;
        config.seed = 7;
        let json = serde_json::to_string(&config).unwrap();
        let parsed = SimulationConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn unknown_fields_rejected() {
        let err = SimulationConfig::from_json(r#"{"ticks": 1, "turbo": true}"#);
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }
}
