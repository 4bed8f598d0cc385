//! A single trading bot: a small state machine over a liquidity pool.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::Serialize;
use subnet_core::{LiquidityPool, PoolError};

use super::archetype::{Archetype, ArchetypeParams};

/// Lifecycle of a bot. Transitions are one-way:
/// `Dormant -> Active -> Exited`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BotState {
    /// Waiting for its entry conditions.
    Dormant,
    /// Holding a position (possibly still scaling in).
    Active,
    /// Position liquidated. Terminal; the bot never re-enters.
    Exited,
}

/// Why an active bot closed its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    TimeDecay,
}

/// What a bot did during one tick, for the event log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BotEvent {
    /// First tranche filled; the bot is now active.
    Entered { price: Decimal, spent: Decimal },
    /// Position fully liquidated.
    Exited {
        reason: ExitReason,
        proceeds: Decimal,
    },
    /// The pool refused a trade this tick (entry skipped, or liquidation
    /// deferred to the next tick).
    TradeRejected,
}

/// One heterogeneous trader. Behavior comes from the archetype parameter
/// table; randomness from an owned rng so the bot is deterministic given
/// its seed.
#[derive(Debug)]
pub struct TradingBot {
    id: usize,
    archetype: Archetype,
    params: ArchetypeParams,
    state: BotState,
    rng: StdRng,
    /// Uncommitted base-asset capital.
    capital_base: Decimal,
    token_balance: Decimal,
    /// Base spent on the current position, across tranches.
    cost_base: Decimal,
    /// Volume-weighted entry price, updated per tranche.
    entry_price: Decimal,
    tranches_filled: u32,
    activated_at: Option<u64>,
    /// Set when a liquidation was rejected by the pool; retried next tick.
    pending_exit: Option<ExitReason>,
}

impl TradingBot {
    pub fn new(
        id: usize,
        archetype: Archetype,
        params: ArchetypeParams,
        capital_base: Decimal,
        seed: u64,
    ) -> Self {
        Self {
            id,
            archetype,
            params,
            state: BotState::Dormant,
            rng: StdRng::seed_from_u64(seed),
            capital_base,
            token_balance: Decimal::ZERO,
            cost_base: Decimal::ZERO,
            entry_price: Decimal::ZERO,
            tranches_filled: 0,
            activated_at: None,
            pending_exit: None,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn archetype(&self) -> Archetype {
        self.archetype
    }

    pub fn state(&self) -> BotState {
        self.state
    }

    pub fn capital_base(&self) -> Decimal {
        self.capital_base
    }

    pub fn token_balance(&self) -> Decimal {
        self.token_balance
    }

    pub fn entry_price(&self) -> Decimal {
        self.entry_price
    }

    /// Credit emission tokens to this bot's balance.
    pub fn receive_emission(&mut self, tokens: Decimal) {
        self.token_balance += tokens;
    }

    /// Base committed per tranche.
    fn tranche_size(&self) -> Decimal {
        self.capital_base * self.params.position_fraction / Decimal::from(self.params.tranches)
    }

    /// Advance the bot by one tick against the shared pool.
    ///
    /// A rejected trade is absorbed (the bot skips or retries); only errors
    /// that indicate a broken pool propagate.
    pub fn on_tick(
        &mut self,
        tick: u64,
        pool: &mut LiquidityPool,
        volatility: Decimal,
    ) -> Result<Option<BotEvent>, PoolError> {
        match self.state {
            BotState::Exited => Ok(None),
            BotState::Dormant => self.try_enter(tick, pool, volatility),
            BotState::Active => self.run_active(tick, pool),
        }
    }

    fn try_enter(
        &mut self,
        tick: u64,
        pool: &mut LiquidityPool,
        volatility: Decimal,
    ) -> Result<Option<BotEvent>, PoolError> {
        let price = pool.spot_price()?;
        if price > self.params.entry_threshold || volatility < self.params.min_volatility {
            return Ok(None);
        }
        if self.rng.r#gen::<f64>() >= self.params.activation_probability {
            return Ok(None);
        }

        let spend = self.tranche_size();
        if spend <= Decimal::ZERO || spend > self.capital_base {
            return Ok(None);
        }
        match pool.buy(spend) {
            Ok(trade) => {
                self.capital_base -= spend;
                self.cost_base += spend;
                self.token_balance += trade.amount_out;
                self.tranches_filled = 1;
                self.entry_price = self.cost_base / self.token_balance;
                self.activated_at = Some(tick);
                self.state = BotState::Active;
                log::debug!(
                    "bot {} ({}) entered at price {price} spending {spend}",
                    self.id,
                    self.archetype
                );
                Ok(Some(BotEvent::Entered { price, spent: spend }))
            }
            Err(PoolError::InsufficientLiquidity { .. }) => Ok(Some(BotEvent::TradeRejected)),
            Err(e) => Err(e),
        }
    }

    fn run_active(
        &mut self,
        tick: u64,
        pool: &mut LiquidityPool,
    ) -> Result<Option<BotEvent>, PoolError> {
        if let Some(reason) = self.pending_exit {
            return self.liquidate(pool, reason);
        }

        let price = pool.spot_price()?;
        if let Some(reason) = self.exit_reason(tick, price) {
            return self.liquidate(pool, reason);
        }

        // Whales keep scaling in one tranche per tick until filled.
        if self.tranches_filled < self.params.tranches {
            let spend = self.tranche_size();
            if spend > Decimal::ZERO && spend <= self.capital_base {
                match pool.buy(spend) {
                    Ok(trade) => {
                        self.capital_base -= spend;
                        self.cost_base += spend;
                        self.token_balance += trade.amount_out;
                        self.tranches_filled += 1;
                        self.entry_price = self.cost_base / self.token_balance;
                    }
                    Err(PoolError::InsufficientLiquidity { .. }) => {
                        return Ok(Some(BotEvent::TradeRejected));
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(None)
    }

    /// Exit checks in fixed precedence: stop-loss, then take-profit, then
    /// the hold-horizon time decay.
    fn exit_reason(&self, tick: u64, price: Decimal) -> Option<ExitReason> {
        if self.entry_price <= Decimal::ZERO {
            return None;
        }
        let gain = (price - self.entry_price) / self.entry_price;
        if gain <= -self.params.stop_loss {
            return Some(ExitReason::StopLoss);
        }
        if gain >= self.params.take_profit {
            return Some(ExitReason::TakeProfit);
        }
        let held = tick.saturating_sub(self.activated_at.unwrap_or(tick));
        if held >= self.params.hold_horizon_ticks {
            return Some(ExitReason::TimeDecay);
        }
        None
    }

    fn liquidate(
        &mut self,
        pool: &mut LiquidityPool,
        reason: ExitReason,
    ) -> Result<Option<BotEvent>, PoolError> {
        if self.token_balance <= Decimal::ZERO {
            // Nothing to sell; treat as a clean exit.
            self.pending_exit = None;
            self.state = BotState::Exited;
            return Ok(Some(BotEvent::Exited {
                reason,
                proceeds: Decimal::ZERO,
            }));
        }
        match pool.sell(self.token_balance) {
            Ok(trade) => {
                self.capital_base += trade.amount_out;
                self.token_balance = Decimal::ZERO;
                self.cost_base = Decimal::ZERO;
                self.pending_exit = None;
                self.state = BotState::Exited;
                log::debug!(
                    "bot {} ({}) exited ({reason:?}) for {}",
                    self.id,
                    self.archetype,
                    trade.amount_out
                );
                Ok(Some(BotEvent::Exited {
                    reason,
                    proceeds: trade.amount_out,
                }))
            }
            Err(PoolError::InsufficientLiquidity { .. }) => {
                // Keep the position and retry on the next tick.
                self.pending_exit = Some(reason);
                Ok(Some(BotEvent::TradeRejected))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn eager_params() -> ArchetypeParams {
        ArchetypeParams {
            entry_threshold: dec!(10),
            activation_probability: 1.0,
            stop_loss: dec!(0.5),
            take_profit: dec!(0.1),
            hold_horizon_ticks: 100,
            position_fraction: dec!(0.5),
            tranches: 1,
            min_volatility: Decimal::ZERO,
        }
    }

    fn pool() -> LiquidityPool {
        LiquidityPool::new(dec!(1000), dec!(1000), dec!(0.003)).unwrap()
    }

    #[test]
    fn dormant_bot_enters_when_gates_pass() {
        let mut bot = TradingBot::new(0, Archetype::HfShort, eager_params(), dec!(100), 7);
        let mut p = pool();
        let event = bot.on_tick(0, &mut p, dec!(0.1)).unwrap();
        assert!(matches!(event, Some(BotEvent::Entered { .. })));
        assert_eq!(bot.state(), BotState::Active);
        assert_eq!(bot.capital_base(), dec!(50));
        assert!(bot.token_balance() > Decimal::ZERO);
    }

    #[test]
    fn price_above_threshold_blocks_entry() {
        let mut params = eager_params();
        params.entry_threshold = dec!(0.5);
        let mut bot = TradingBot::new(0, Archetype::HfShort, params, dec!(100), 7);
        let mut p = pool(); // spot price 1.0
        assert_eq!(bot.on_tick(0, &mut p, dec!(0.1)).unwrap(), None);
        assert_eq!(bot.state(), BotState::Dormant);
    }

    #[test]
    fn low_volatility_blocks_entry() {
        let mut params = eager_params();
        params.min_volatility = dec!(0.5);
        let mut bot = TradingBot::new(0, Archetype::HfShort, params, dec!(100), 7);
        let mut p = pool();
        assert_eq!(bot.on_tick(0, &mut p, dec!(0.01)).unwrap(), None);
        assert_eq!(bot.state(), BotState::Dormant);
    }

    #[test]
    fn time_decay_exit_is_terminal() {
        let mut params = eager_params();
        params.hold_horizon_ticks = 2;
        params.take_profit = dec!(1000); // unreachable
        let mut bot = TradingBot::new(0, Archetype::HfShort, params, dec!(100), 7);
        let mut p = pool();

        bot.on_tick(0, &mut p, dec!(0.1)).unwrap();
        assert_eq!(bot.state(), BotState::Active);
        bot.on_tick(1, &mut p, dec!(0.1)).unwrap();
        let event = bot.on_tick(2, &mut p, dec!(0.1)).unwrap();
        assert!(matches!(
            event,
            Some(BotEvent::Exited {
                reason: ExitReason::TimeDecay,
                ..
            })
        ));
        assert_eq!(bot.state(), BotState::Exited);
        assert_eq!(bot.token_balance(), Decimal::ZERO);

        // Exited is terminal: later ticks are no-ops.
        assert_eq!(bot.on_tick(3, &mut p, dec!(0.1)).unwrap(), None);
        assert_eq!(bot.state(), BotState::Exited);
    }

    #[test]
    fn take_profit_fires_before_time_decay() {
        let mut params = eager_params();
        params.take_profit = dec!(0.05);
        params.hold_horizon_ticks = 1;
        let mut bot = TradingBot::new(0, Archetype::HfShort, params, dec!(100), 7);
        let mut p = pool();

        bot.on_tick(0, &mut p, dec!(0.1)).unwrap();
        // Push the price up past take-profit before the horizon elapses.
        p.buy(dec!(200)).unwrap();
        let event = bot.on_tick(1, &mut p, dec!(0.1)).unwrap();
        assert!(matches!(
            event,
            Some(BotEvent::Exited {
                reason: ExitReason::TakeProfit,
                ..
            })
        ));
    }

    #[test]
    fn stop_loss_fires_on_drawdown() {
        let mut params = eager_params();
        params.stop_loss = dec!(0.3);
        let mut bot = TradingBot::new(0, Archetype::HfShort, params, dec!(100), 7);
        let mut p = pool();

        bot.on_tick(0, &mut p, dec!(0.1)).unwrap();
        // Crash the price well past the stop.
        p.sell(dec!(2000)).unwrap();
        let event = bot.on_tick(1, &mut p, dec!(0.1)).unwrap();
        assert!(matches!(
            event,
            Some(BotEvent::Exited {
                reason: ExitReason::StopLoss,
                ..
            })
        ));
    }

    #[test]
    fn whale_fills_tranches_over_successive_ticks() {
        let mut params = eager_params();
        params.tranches = 3;
        params.take_profit = dec!(1000);
        let mut bot = TradingBot::new(0, Archetype::Whale, params, dec!(300), 7);
        let mut p = pool();

        bot.on_tick(0, &mut p, dec!(0.1)).unwrap();
        // tranche size = 300 * 0.5 / 3 = 50
        assert_eq!(bot.capital_base(), dec!(250));
        bot.on_tick(1, &mut p, dec!(0.1)).unwrap();
        assert_eq!(bot.capital_base(), dec!(200));
        bot.on_tick(2, &mut p, dec!(0.1)).unwrap();
        assert_eq!(bot.capital_base(), dec!(150));
        // Fully filled; a further tick buys nothing.
        bot.on_tick(3, &mut p, dec!(0.1)).unwrap();
        assert_eq!(bot.capital_base(), dec!(150));
    }

    #[test]
    fn same_seed_same_decisions() {
        let mut params = eager_params();
        params.activation_probability = 0.5;
        let run = |seed| {
            let mut bot = TradingBot::new(0, Archetype::HfShort, params, dec!(100), seed);
            let mut p = pool();
            let mut entered_at = None;
            for tick in 0..20 {
                if let Some(BotEvent::Entered { .. }) =
                    bot.on_tick(tick, &mut p, dec!(0.1)).unwrap()
                {
                    entered_at = Some(tick);
                    break;
                }
            }
            entered_at
        };
        assert_eq!(run(42), run(42));
    }
}
