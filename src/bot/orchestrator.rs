//! Long-running sync loop: init, fetch, risk, act, sleep.
//!
//! Every cycle is isolated: a failing tick is logged and absorbed, the
//! next one starts from live exchange state. Cancellation is first-class
//! and threads through every await.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::consts::{ANNUAL_OSCILLATIONS, SETTLEMENT_PAUSE, TAKER_FEE};
use crate::errors::{Error, Result};
use crate::exchange::types::{AccountState, MarketData};
use crate::exchange::ExchangeApi;
use crate::grid::calculator;
use crate::grid::strategy::GridStrategy;
use crate::risk::{RiskManager, RiskVerdict};

use super::status::{StatusBoard, StatusUpdate};

/// Owns the strategy and risk manager and drives one tick at a time;
/// ticks never overlap.
pub struct Orchestrator<E: ExchangeApi> {
    settings: Settings,
    exchange: Arc<E>,
    strategy: GridStrategy,
    risk: RiskManager,
    board: Arc<StatusBoard>,
    cancel: CancellationToken,
    asset: u32,
    grid_lower: Decimal,
    grid_upper: Decimal,
    sync_count: u64,
    halted: bool,
}

impl<E: ExchangeApi> Orchestrator<E> {
    pub fn new(
        settings: Settings,
        exchange: Arc<E>,
        board: Arc<StatusBoard>,
        cancel: CancellationToken,
    ) -> Self {
        let strategy = GridStrategy::new(settings.grid.clone(), 0);
        let risk = RiskManager::new(settings.risk.clone(), settings.grid.symbol.clone());
        Self {
            settings,
            exchange,
            strategy,
            risk,
            board,
            cancel,
            asset: 0,
            grid_lower: Decimal::ZERO,
            grid_upper: Decimal::ZERO,
            sync_count: 0,
            halted: false,
        }
    }

    /// Initialise and run until cancelled. Open orders are deliberately
    /// left on the book at shutdown; the exchange retains them across
    /// restarts.
    pub async fn run(mut self) -> Result<()> {
        self.startup().await?;

        let interval = Duration::from_secs(self.settings.grid.sync_interval_seconds);
        let cancel = self.cancel.clone();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Cancellation received, shutting down after {} cycles", self.sync_count);
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }

            self.sync_count += 1;
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Cancelled mid-cycle, shutting down");
                    break;
                }
                result = self.tick() => {
                    if let Err(e) = result {
                        error!("Sync cycle {} failed: {e}", self.sync_count);
                    }
                }
            }
        }
        Ok(())
    }

    async fn startup(&mut self) -> Result<()> {
        let symbol = self.settings.grid.symbol.clone();

        // The exchange meta wins over any configured index
        let resolved = self.exchange.asset_index(&symbol).await?;
        if let Some(configured) = self.settings.grid.asset_index {
            if configured != resolved {
                warn!("Configured asset index {configured} differs from exchange meta {resolved}");
            }
        }
        self.asset = resolved;
        self.strategy.set_asset(resolved);

        let mut account = self.exchange.account_state().await?;
        if account.total_equity.is_zero() {
            let spot = self.exchange.spot_usdc_balance().await?;
            if spot > Decimal::ZERO {
                info!("Perp wallet empty, transferring {spot} USDC from spot");
                self.exchange.transfer_spot_to_perps(spot).await?;
                tokio::time::sleep(SETTLEMENT_PAUSE).await;
                account = self.exchange.account_state().await?;
            }
        }

        let market = self.exchange.market_data(&symbol).await?;
        let rate = calculator::estimated_annual_return_rate(
            market.mid_price,
            &self.settings.grid,
            ANNUAL_OSCILLATIONS,
            TAKER_FEE,
        );
        if rate <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "grid spacing {}% does not cover round-trip fees",
                self.settings.grid.grid_spacing_percent
            )));
        }
        info!(
            "Starting {symbol} grid: {} levels, {}% spacing, estimated annual return {:.1}%",
            self.settings.grid.grid_levels,
            self.settings.grid.grid_spacing_percent,
            rate * 100.0
        );

        self.risk.set_initial_equity(account.total_equity);
        self.strategy
            .initialize(self.exchange.as_ref(), account.total_equity)
            .await?;
        self.refresh_bounds();
        Ok(())
    }

    fn refresh_bounds(&mut self) {
        let levels = self.strategy.levels();
        if let (Some(first), Some(last)) = (levels.first(), levels.last()) {
            self.grid_lower = first.price;
            self.grid_upper = last.price;
            info!("Grid bounds [{}, {}]", self.grid_lower, self.grid_upper);
        }
    }

    /// One cycle: fetch, evaluate, act, publish
    async fn tick(&mut self) -> Result<()> {
        let symbol = self.settings.grid.symbol.clone();
        let market = self.exchange.market_data(&symbol).await?;
        let account = self.exchange.account_state().await?;

        match self.risk.evaluate(&account, &market) {
            RiskVerdict::Halt(reason) => {
                if !self.halted {
                    error!("Risk halt: {reason}");
                    let removed = self.exchange.cancel_all_orders(self.asset).await?;
                    self.strategy.cancel_grid();
                    self.halted = true;
                    error!("Trading halted, {removed} orders cancelled; manual restart required");
                } else {
                    debug!("Still halted: {reason}");
                }
            }
            RiskVerdict::ResetGrid(reason) => {
                warn!("Grid rebuild requested: {reason}");
                self.strategy.reset(self.exchange.as_ref()).await?;
                self.refresh_bounds();
            }
            RiskVerdict::Continue => {
                if RiskManager::should_reset_grid(
                    market.mid_price,
                    self.grid_lower,
                    self.grid_upper,
                ) {
                    info!(
                        "Mid {} drifted from grid [{}, {}], re-centring",
                        market.mid_price, self.grid_lower, self.grid_upper
                    );
                    self.strategy.reset(self.exchange.as_ref()).await?;
                    self.refresh_bounds();
                } else {
                    self.strategy.sync(self.exchange.as_ref()).await?;
                }
            }
        }

        self.publish(&market, &account).await;
        Ok(())
    }

    async fn publish(&mut self, market: &MarketData, account: &AccountState) {
        let update = StatusUpdate {
            is_running: !self.halted,
            sync_count: self.sync_count,
            mid_price: market.mid_price,
            total_equity: account.total_equity,
            available_balance: account.available_balance,
            realized_pnl: self.strategy.realized_pnl(),
            levels: self.strategy.levels().to_vec(),
            new_fills: self.strategy.drain_new_fills(),
        };
        self.board.publish(update).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_settings;
    use crate::exchange::mock::MockExchange;
    use crate::grid::types::LevelStatus;
    use rust_decimal_macros::dec;
    use std::sync::atomic::Ordering;

    fn orchestrator(
        settings: Settings,
        exchange: Arc<MockExchange>,
    ) -> Orchestrator<MockExchange> {
        Orchestrator::new(
            settings,
            exchange,
            Arc::new(StatusBoard::new()),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_startup_initializes_grid_and_bounds() {
        let exchange = Arc::new(MockExchange::new(dec!(50000)));
        let mut orch = orchestrator(test_settings(), exchange.clone());

        orch.startup().await.unwrap();

        assert!(orch.strategy.is_initialized());
        assert!(orch.grid_lower < dec!(50000) && orch.grid_upper > dec!(50000));
        assert_eq!(exchange.placed_count().await, 9);
    }

    #[tokio::test]
    async fn test_halt_cancels_and_stops_placing() {
        // Mid far below the allowed floor on startup
        let exchange = Arc::new(MockExchange::new(dec!(1000)));
        let mut orch = orchestrator(test_settings(), exchange.clone());
        orch.startup().await.unwrap();
        let placed_at_startup = exchange.placed_count().await;

        orch.sync_count += 1;
        orch.tick().await.unwrap();

        assert!(exchange.cancel_all_calls.load(Ordering::SeqCst) >= 1);
        assert_eq!(exchange.placed_count().await, placed_at_startup);
        assert!(orch.halted);
        assert!(exchange.open_orders().await.unwrap().is_empty());
        assert!(!orch.board.snapshot().await.is_running);

        // Grid is marked cancelled locally
        assert!(orch
            .strategy
            .levels()
            .iter()
            .all(|l| l.status != LevelStatus::Active));

        // Subsequent halted ticks keep checking without spamming cancels
        let cancels = exchange.cancel_all_calls.load(Ordering::SeqCst);
        orch.sync_count += 1;
        orch.tick().await.unwrap();
        assert_eq!(exchange.cancel_all_calls.load(Ordering::SeqCst), cancels);
    }

    #[tokio::test]
    async fn test_tick_syncs_and_publishes_fills() {
        let exchange = Arc::new(MockExchange::new(dec!(50000)));
        let mut orch = orchestrator(test_settings(), exchange.clone());
        orch.startup().await.unwrap();

        let oid = orch.strategy.levels()[4].order_id.unwrap();
        exchange.remove_order(oid).await;

        orch.sync_count += 1;
        orch.tick().await.unwrap();

        let snapshot = orch.board.snapshot().await;
        assert!(snapshot.is_running);
        assert_eq!(snapshot.sync_count, 1);
        assert_eq!(snapshot.total_fills, 1);
        assert_eq!(snapshot.recent_fills.len(), 1);
        assert_eq!(snapshot.mid_price, dec!(50000));
    }

    #[tokio::test]
    async fn test_drifted_mid_recentres_the_grid() {
        let exchange = Arc::new(MockExchange::new(dec!(50000)));
        let mut orch = orchestrator(test_settings(), exchange.clone());
        orch.startup().await.unwrap();
        let old_upper = orch.grid_upper;

        exchange.set_mid(dec!(55000)).await;
        orch.sync_count += 1;
        orch.tick().await.unwrap();

        assert!(orch.grid_upper > old_upper, "bounds should follow the new mid");
        assert!(orch.grid_lower < dec!(55000) && orch.grid_upper > dec!(55000));
    }

    #[tokio::test]
    async fn test_position_cap_triggers_rebuild() {
        let exchange = Arc::new(MockExchange::new(dec!(50000)));
        let mut orch = orchestrator(test_settings(), exchange.clone());
        orch.startup().await.unwrap();
        let cancels_before = exchange.cancel_all_calls.load(Ordering::SeqCst);

        {
            let mut account = exchange.account.lock().await;
            account.positions.push(crate::exchange::types::Position {
                symbol: "BTC".to_string(),
                size: dec!(0.05),
                entry_price: dec!(50000),
                unrealized_pnl: Decimal::ZERO,
            });
        }

        orch.sync_count += 1;
        orch.tick().await.unwrap();

        // Reset rebuilds through initialize, which cancels the book first
        assert!(exchange.cancel_all_calls.load(Ordering::SeqCst) > cancels_before);
        assert!(orch.strategy.is_initialized());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_perp_wallet_is_funded_from_spot() {
        let exchange = Arc::new(MockExchange::new(dec!(50000)));
        exchange.set_equity(Decimal::ZERO).await;
        *exchange.spot_usdc.lock().await = dec!(2500);

        let mut orch = orchestrator(test_settings(), exchange.clone());
        orch.startup().await.unwrap();

        assert_eq!(exchange.transfers.lock().await.as_slice(), &[dec!(2500)]);
        assert_eq!(orch.risk.peak_equity(), dec!(2500));
    }

    #[tokio::test]
    async fn test_unprofitable_spacing_refused_at_startup() {
        let exchange = Arc::new(MockExchange::new(dec!(50000)));
        let mut settings = test_settings();
        settings.grid.grid_spacing_percent = dec!(0.05);
        let mut orch = orchestrator(settings, exchange);

        let result = orch.startup().await;
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_run_stops_on_cancellation() {
        let exchange = Arc::new(MockExchange::new(dec!(50000)));
        let cancel = CancellationToken::new();
        let orch = Orchestrator::new(
            test_settings(),
            exchange,
            Arc::new(StatusBoard::new()),
            cancel.clone(),
        );

        cancel.cancel();
        // Startup succeeds, then the loop observes the token and exits
        orch.run().await.unwrap();
    }
}
