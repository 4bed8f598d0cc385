//! Tick orchestrator. One tick runs, in fixed order: emission, bots in
//! creation order, the strategy, then a snapshot. The order never varies,
//! so a seed fully determines the run.

use rust_decimal::Decimal;
use subnet_core::{
    EmissionDistributor, EmissionSchedule, LiquidityPool, PoolError, WeightingRule,
};
use thiserror::Error;

use super::config::{ConfigError, SimulationConfig};
use super::series::{
    ActorId, AgentSnapshot, SimEvent, StrategySnapshot, TickSnapshot, TimeSeriesRecord,
};
use crate::agents::{BotEvent, BotPopulation};
use crate::strategy::{StrategyEngine, StrategyEvent};

/// Salt mixed into the strategy's rng seed so it never shares a stream
/// with bot index 0.
const STRATEGY_SEED_SALT: u64 = 0xc2b2_ae3d_27d4_eb4f;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Pool math broke down mid-run. The series up to the previous tick
    /// remains available on the runner.
    #[error("numeric instability at tick {tick}: {source}")]
    NumericInstability {
        tick: u64,
        #[source]
        source: PoolError,
    },
    #[error("pool entered an unhealthy state at tick {tick}")]
    UnhealthyPool { tick: u64 },
}

/// Owns every simulated component and drives them tick by tick.
pub struct SimulationRunner {
    config: SimulationConfig,
    pool: LiquidityPool,
    distributor: EmissionDistributor,
    population: BotPopulation,
    strategy: Option<StrategyEngine>,
    series: TimeSeriesRecord,
    cumulative_emission: Decimal,
    cumulative_unallocated: Decimal,
}

impl SimulationRunner {
    /// Validate the config and build the initial world. Nothing has traded
    /// yet when this returns.
    pub fn new(config: SimulationConfig) -> Result<Self, SimError> {
        config.validate()?;
        let pool = LiquidityPool::new(
            config.pool.reserve_base,
            config.pool.reserve_token,
            config.pool.fee_rate,
        )
        .map_err(ConfigError::from)?;

        let strategy = config
            .strategy
            .clone()
            .map(|cfg| StrategyEngine::new(cfg, config.seed ^ STRATEGY_SEED_SALT));

        // Holder slot 0 is the strategy when present; it also absorbs
        // rounding remainders. Without a strategy, remainders stay
        // unallocated rather than skewing a bot.
        let default_holder = strategy.as_ref().map(|_| 0);
        let distributor = EmissionDistributor::new(
            EmissionSchedule {
                rate_per_period: config.emission.rate_per_period,
                period_length: config.emission.period_length,
            },
            config.emission.pool_mint_fraction,
            default_holder,
        );

        let population = BotPopulation::new(&config.population, config.seed);

        Ok(Self {
            pool,
            distributor,
            population,
            strategy,
            series: TimeSeriesRecord::new(),
            cumulative_emission: Decimal::ZERO,
            cumulative_unallocated: Decimal::ZERO,
            config,
        })
    }

    pub fn series(&self) -> &TimeSeriesRecord {
        &self.series
    }

    pub fn into_series(self) -> TimeSeriesRecord {
        self.series
    }

    pub fn pool(&self) -> &LiquidityPool {
        &self.pool
    }

    /// Run every configured tick. On a fatal error the series still holds
    /// every snapshot completed before the failing tick.
    pub fn run(&mut self) -> Result<&TimeSeriesRecord, SimError> {
        log::info!(
            "starting run: {} ticks, {} bots, seed {}",
            self.config.ticks,
            self.population.len(),
            self.config.seed
        );
        for tick in 0..self.config.ticks {
            self.step(tick)?;
        }
        Ok(&self.series)
    }

    /// Emission weight per holder slot: strategy first (when present),
    /// then every bot in creation order.
    fn weights(&self) -> Vec<Decimal> {
        let rule = self.config.emission.weighting;
        let mut weights = Vec::with_capacity(self.population.len() + 1);
        if let Some(strategy) = &self.strategy {
            weights.push(match rule {
                WeightingRule::StakeProportional => strategy.token_balance(),
                WeightingRule::CapitalProportional => strategy.base_balance(),
            });
        }
        weights.extend(self.population.weights(rule));
        weights
    }

    fn step(&mut self, tick: u64) -> Result<(), SimError> {
        let fatal = |source: PoolError| SimError::NumericInstability { tick, source };

        let opening_price = self.pool.spot_price().map_err(fatal)?;
        self.population.observe_price(opening_price);

        // 1. Emission.
        let weights = self.weights();
        let emission = self
            .distributor
            .distribute(tick, &mut self.pool, &weights)
            .map_err(fatal)?;
        self.cumulative_emission += emission.total;
        self.cumulative_unallocated += emission.unallocated;

        let bot_allocations = if let Some(strategy) = &mut self.strategy {
            strategy.receive_emission(emission.allocations[0]);
            &emission.allocations[1..]
        } else {
            &emission.allocations[..]
        };
        self.population.apply_allocations(bot_allocations);

        // 2. Bots, in creation order.
        let mut events = Vec::new();
        for (bot, event) in self
            .population
            .on_tick(tick, &mut self.pool)
            .map_err(fatal)?
        {
            events.push(match event {
                BotEvent::Entered { price, spent } => SimEvent::BotEntered { bot, price, spent },
                BotEvent::Exited { reason, proceeds } => SimEvent::BotExited {
                    bot,
                    reason,
                    proceeds,
                },
                BotEvent::TradeRejected => SimEvent::TradeRejected {
                    actor: ActorId::Bot(bot),
                },
            });
        }

        // 3. Strategy.
        if let Some(strategy) = &mut self.strategy {
            let active = self.population.stats().active;
            for event in strategy
                .on_tick(tick, &mut self.pool, active)
                .map_err(fatal)?
            {
                events.push(match event {
                    StrategyEvent::PhaseChanged { from, to } => {
                        SimEvent::PhaseTransition { from, to }
                    }
                    StrategyEvent::MissedOpportunity { wanted, available } => {
                        SimEvent::MissedOpportunity { wanted, available }
                    }
                    StrategyEvent::TradeRejected => SimEvent::TradeRejected {
                        actor: ActorId::Strategy,
                    },
                });
            }
        }

        if !self.pool.is_healthy() {
            return Err(SimError::UnhealthyPool { tick });
        }

        // 4. Snapshot.
        let spot_price = self.pool.spot_price().map_err(fatal)?;
        let agents = self
            .population
            .bots()
            .iter()
            .map(|b| AgentSnapshot {
                id: b.id(),
                archetype: b.archetype(),
                state: b.state(),
                capital_base: b.capital_base(),
                token_balance: b.token_balance(),
            })
            .collect();
        let strategy = self.strategy.as_ref().map(|s| StrategySnapshot {
            phase: s.phase(),
            base_balance: s.base_balance(),
            token_balance: s.token_balance(),
            maintenance_spent: s.maintenance_ledger().spent,
            accumulation_spent: s.accumulation_ledger().spent,
        });
        self.series.push(TickSnapshot {
            tick,
            reserve_base: self.pool.reserve_base(),
            reserve_token: self.pool.reserve_token(),
            spot_price,
            emission: emission.total,
            cumulative_emission: self.cumulative_emission,
            unallocated: emission.unallocated,
            cumulative_unallocated: self.cumulative_unallocated,
            population: self.population.stats(),
            agents,
            strategy,
            events,
        });
        Ok(())
    }
}

/// Build a runner, run it to completion and hand back the series.
pub fn run_config(config: SimulationConfig) -> Result<TimeSeriesRecord, SimError> {
    let mut runner = SimulationRunner::new(config)?;
    runner.run()?;
    Ok(runner.into_series())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn minimal_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.ticks = 20;
        config.seed = 42;
        config.strategy = None;
        config
    }

    #[test]
    fn produces_one_snapshot_per_tick() {
        let series = run_config(minimal_config()).unwrap();
        assert_eq!(series.len(), 20);
        let ticks: Vec<u64> = series.iter().map(|s| s.tick).collect();
        assert_eq!(ticks, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn cumulative_emission_accumulates_per_tick() {
        let series = run_config(minimal_config()).unwrap();
        let per_tick = dec!(1); // 7200 per 7200 ticks
        for snap in series.iter() {
            assert_eq!(snap.emission, per_tick);
            assert_eq!(
                snap.cumulative_emission,
                per_tick * Decimal::from(snap.tick + 1)
            );
            // No strategy and no stakers: the non-pool half of each tick
            // has no recipient and shows up as unallocated.
            assert_eq!(snap.unallocated, dec!(0.5));
            assert_eq!(
                snap.cumulative_unallocated,
                dec!(0.5) * Decimal::from(snap.tick + 1)
            );
        }
    }

    #[test]
    fn invalid_config_fails_before_any_tick() {
        let mut config = minimal_config();
        config.ticks = 0;
        assert!(matches!(
            SimulationRunner::new(config),
            Err(SimError::Config(ConfigError::ZeroTicks))
        ));
    }

    #[test]
    fn strategy_slot_receives_unweighted_remainder() {
        let mut config = minimal_config();
        config.ticks = 1;
        config.emission.pool_mint_fraction = Decimal::ZERO;
        config.strategy = Some(crate::strategy::StrategyConfig {
            maintenance_budget: Decimal::ZERO,
            accumulation_budget: Decimal::ZERO,
            buy_threshold: Decimal::ZERO,
            ..Default::default()
        });

        let mut runner = SimulationRunner::new(config).unwrap();
        runner.run().unwrap();
        // No bots, stake-proportional weights all zero: the whole tick's
        // emission lands on the default holder, the strategy.
        let snap = runner.series().last().unwrap();
        let strategy = snap.strategy.unwrap();
        assert_eq!(strategy.token_balance, dec!(1));
    }
}
