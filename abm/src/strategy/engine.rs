//! Phase engine: one base-asset wallet, per-phase spending ledgers, and the
//! tick behaviors for maintenance, accumulation and distribution.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::Serialize;
use subnet_core::{LiquidityPool, PoolError};

use super::{Phase, SqueezeMode, StrategyConfig};

/// Spending ceiling for one phase. Tracks what was spent against it; the
/// actual base lives in the engine's single wallet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseLedger {
    pub allocation: Decimal,
    pub spent: Decimal,
}

impl PhaseLedger {
    fn new(allocation: Decimal) -> Self {
        Self {
            allocation,
            spent: Decimal::ZERO,
        }
    }

    pub fn remaining(&self) -> Decimal {
        self.allocation - self.spent
    }
}

/// What the strategy did during one tick, for the event log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrategyEvent {
    PhaseChanged { from: Phase, to: Phase },
    /// A buy the strategy wanted but the phase ledger could not cover. The
    /// trade is dropped, not shrunk.
    MissedOpportunity { wanted: Decimal, available: Decimal },
    /// The pool refused a trade this tick.
    TradeRejected,
}

#[derive(Debug)]
pub struct StrategyEngine {
    config: StrategyConfig,
    phase: Phase,
    phase_started_at: u64,
    base_balance: Decimal,
    token_balance: Decimal,
    maintenance: PhaseLedger,
    accumulation: PhaseLedger,
    last_intervention: Option<u64>,
    /// Direction of the next oscillate intervention.
    oscillate_buy: bool,
    rng: StdRng,
}

impl StrategyEngine {
    pub fn new(config: StrategyConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let oscillate_buy = rng.r#gen::<bool>();
        Self {
            base_balance: config.total_budget,
            token_balance: Decimal::ZERO,
            maintenance: PhaseLedger::new(config.maintenance_budget),
            accumulation: PhaseLedger::new(config.accumulation_budget),
            phase: Phase::Maintenance,
            phase_started_at: 0,
            last_intervention: None,
            oscillate_buy,
            rng,
            config,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn base_balance(&self) -> Decimal {
        self.base_balance
    }

    pub fn token_balance(&self) -> Decimal {
        self.token_balance
    }

    pub fn maintenance_ledger(&self) -> &PhaseLedger {
        &self.maintenance
    }

    pub fn accumulation_ledger(&self) -> &PhaseLedger {
        &self.accumulation
    }

    /// Credit emission tokens to the strategy's holdings.
    pub fn receive_emission(&mut self, tokens: Decimal) {
        self.token_balance += tokens;
    }

    fn cooldown_elapsed(&self, tick: u64) -> bool {
        match self.last_intervention {
            Some(last) => tick.saturating_sub(last) >= self.config.cooldown_ticks,
            None => true,
        }
    }

    fn transition(&mut self, tick: u64, to: Phase, events: &mut Vec<StrategyEvent>) {
        let from = self.phase;
        if from == to {
            return;
        }
        if to == Phase::Accumulation {
            // Unspent maintenance budget rolls over.
            self.accumulation.allocation += self.maintenance.remaining();
            self.maintenance.spent = self.maintenance.allocation;
        }
        log::info!("strategy phase {from:?} -> {to:?} at tick {tick}");
        self.phase = to;
        self.phase_started_at = tick;
        events.push(StrategyEvent::PhaseChanged { from, to });
    }

    /// Advance the strategy by one tick. `active_bots` feeds the mixed
    /// squeeze-mode selection.
    pub fn on_tick(
        &mut self,
        tick: u64,
        pool: &mut LiquidityPool,
        active_bots: usize,
    ) -> Result<Vec<StrategyEvent>, PoolError> {
        let mut events = Vec::new();
        match self.phase {
            Phase::Maintenance => self.maintenance_tick(tick, pool, active_bots, &mut events)?,
            Phase::Accumulation => self.accumulation_tick(tick, pool, &mut events)?,
            Phase::Distribution => self.distribution_tick(pool, &mut events)?,
        }
        Ok(events)
    }

    fn maintenance_tick(
        &mut self,
        tick: u64,
        pool: &mut LiquidityPool,
        active_bots: usize,
        events: &mut Vec<StrategyEvent>,
    ) -> Result<(), PoolError> {
        let elapsed = tick.saturating_sub(self.phase_started_at);
        let price = pool.spot_price()?;
        let budget_exhausted = self.maintenance.remaining() < self.config.min_intervention;
        let horizon_reached = elapsed >= self.config.maintenance_ticks;
        let price_reached = self
            .config
            .maintenance_exit_price
            .is_some_and(|floor| price <= floor);
        if budget_exhausted || horizon_reached || price_reached {
            self.transition(tick, Phase::Accumulation, events);
            return Ok(());
        }
        if !self.cooldown_elapsed(tick) {
            return Ok(());
        }

        // Only intervene once price has left the defended band.
        if self.config.platform_price > Decimal::ZERO {
            let deviation =
                ((price - self.config.platform_price) / self.config.platform_price).abs();
            if deviation <= self.config.price_tolerance {
                return Ok(());
            }
        }

        let mode = match self.config.squeeze_mode {
            SqueezeMode::Mixed => {
                // Few active bots: waiting them out is cheapest. A handful:
                // shake both sides. A crowd: lift into their take-profits.
                if active_bots <= 2 {
                    SqueezeMode::TimeDecay
                } else if active_bots <= 5 {
                    SqueezeMode::Oscillate
                } else {
                    SqueezeMode::TakeProfit
                }
            }
            mode => mode,
        };

        match mode {
            SqueezeMode::TimeDecay => {}
            SqueezeMode::TakeProfit => {
                self.maintenance_buy(tick, pool, events)?;
            }
            SqueezeMode::StopLoss => {
                self.maintenance_sell(tick, pool, events)?;
            }
            SqueezeMode::Oscillate => {
                if self.oscillate_buy {
                    self.maintenance_buy(tick, pool, events)?;
                } else {
                    self.maintenance_sell(tick, pool, events)?;
                }
                self.oscillate_buy = !self.oscillate_buy;
            }
            SqueezeMode::PumpDump => {
                let cycle = self.config.pump_cycle_ticks.max(2);
                if elapsed % cycle < cycle / 2 {
                    self.maintenance_buy(tick, pool, events)?;
                } else {
                    self.maintenance_sell(tick, pool, events)?;
                }
            }
            SqueezeMode::Mixed => unreachable!("resolved above"),
        }
        Ok(())
    }

    /// Intervention size in base, varied within the configured bounds.
    fn intervention_size(&mut self) -> Decimal {
        let span = self.config.max_intervention - self.config.min_intervention;
        if span <= Decimal::ZERO {
            return self.config.min_intervention;
        }
        // Vary in eighths of the span to stay exactly representable.
        let step = Decimal::from(self.rng.gen_range(0..=8u32));
        self.config.min_intervention + span * step / Decimal::from(8u32)
    }

    fn maintenance_buy(
        &mut self,
        tick: u64,
        pool: &mut LiquidityPool,
        events: &mut Vec<StrategyEvent>,
    ) -> Result<(), PoolError> {
        let wanted = self.intervention_size();
        let available = self.maintenance.remaining();
        if wanted > available {
            events.push(StrategyEvent::MissedOpportunity { wanted, available });
            return Ok(());
        }
        match pool.buy(wanted) {
            Ok(trade) => {
                self.base_balance -= wanted;
                self.maintenance.spent += wanted;
                self.token_balance += trade.amount_out;
                self.last_intervention = Some(tick);
            }
            Err(PoolError::InsufficientLiquidity { .. }) => {
                events.push(StrategyEvent::TradeRejected);
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Sell roughly `intervention_size` worth of tokens at the current
    /// price. Sells release capital rather than consuming budget.
    fn maintenance_sell(
        &mut self,
        tick: u64,
        pool: &mut LiquidityPool,
        events: &mut Vec<StrategyEvent>,
    ) -> Result<(), PoolError> {
        if self.token_balance <= Decimal::ZERO {
            return Ok(());
        }
        let price = pool.spot_price()?;
        if price <= Decimal::ZERO {
            return Ok(());
        }
        let tokens = (self.intervention_size() / price).min(self.token_balance);
        if tokens <= Decimal::ZERO {
            return Ok(());
        }
        match pool.sell(tokens) {
            Ok(trade) => {
                self.token_balance -= tokens;
                self.base_balance += trade.amount_out;
                self.last_intervention = Some(tick);
            }
            Err(PoolError::InsufficientLiquidity { .. }) => {
                events.push(StrategyEvent::TradeRejected);
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn accumulation_tick(
        &mut self,
        tick: u64,
        pool: &mut LiquidityPool,
        events: &mut Vec<StrategyEvent>,
    ) -> Result<(), PoolError> {
        if pool.reserve_base() >= self.config.total_budget * self.config.trigger_multiplier {
            self.transition(tick, Phase::Distribution, events);
            return Ok(());
        }

        let price = pool.spot_price()?;
        if price > self.config.buy_threshold || !self.cooldown_elapsed(tick) {
            return Ok(());
        }

        let wanted = self.config.buy_step_size;
        let available = self.accumulation.remaining();
        if wanted > available {
            events.push(StrategyEvent::MissedOpportunity { wanted, available });
            return Ok(());
        }
        match pool.buy(wanted) {
            Ok(trade) => {
                self.base_balance -= wanted;
                self.accumulation.spent += wanted;
                self.token_balance += trade.amount_out;
                self.last_intervention = Some(tick);
                log::debug!("accumulated {} tokens at price {price}", trade.amount_out);
            }
            Err(PoolError::InsufficientLiquidity { .. }) => {
                events.push(StrategyEvent::TradeRejected);
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn distribution_tick(
        &mut self,
        pool: &mut LiquidityPool,
        events: &mut Vec<StrategyEvent>,
    ) -> Result<(), PoolError> {
        let tokens = self.token_balance * self.config.distribution_fraction;
        if tokens <= Decimal::ZERO {
            return Ok(());
        }
        match pool.sell(tokens) {
            Ok(trade) => {
                self.token_balance -= tokens;
                self.base_balance += trade.amount_out;
            }
            Err(PoolError::InsufficientLiquidity { .. }) => {
                events.push(StrategyEvent::TradeRejected);
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}
