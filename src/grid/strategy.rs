//! Stateful grid lifecycle: initial placement, fill detection by diffing
//! the live book against tracked state, and counter-order reposting with
//! realized-PnL attribution

use std::collections::HashSet;

use chrono::Utc;
use log::{debug, info, warn};
use rust_decimal::Decimal;

use crate::config::GridSettings;
use crate::errors::Result;
use crate::exchange::ExchangeApi;

use super::calculator;
use super::types::{FillRecord, GridLevel, LevelStatus, OrderSide};

/// Owns the level collection and is its only mutator. The orchestrator
/// holds a read-only view for logging and status.
pub struct GridStrategy {
    settings: GridSettings,
    asset: u32,
    levels: Vec<GridLevel>,
    /// Rung straddling mid at build time. Never placed directly (it sits
    /// inside the bid-ask spread and would cross); it arms only when a
    /// neighbouring fill re-points it as a counter.
    anchor: Option<usize>,
    /// Fills detected since the last drain, in detection order
    new_fills: Vec<FillRecord>,
    initialized: bool,
}

impl GridStrategy {
    pub fn new(settings: GridSettings, asset: u32) -> Self {
        Self {
            settings,
            asset,
            levels: Vec::new(),
            anchor: None,
            new_fills: Vec::new(),
            initialized: false,
        }
    }

    /// Replace the asset index once the exchange meta has been resolved
    pub fn set_asset(&mut self, asset: u32) {
        self.asset = asset;
    }

    /// Read-only view of the ladder
    pub fn levels(&self) -> &[GridLevel] {
        &self.levels
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Total profit realized across all rungs
    pub fn realized_pnl(&self) -> Decimal {
        self.levels.iter().map(|l| l.realized_pnl).sum()
    }

    /// Take the fills detected since the last call, leaving the queue empty
    pub fn drain_new_fills(&mut self) -> Vec<FillRecord> {
        std::mem::take(&mut self.new_fills)
    }

    /// Cancel the whole grid and rebuild it around the current mid.
    ///
    /// Prior levels are discarded wholesale once the cancel succeeds; no
    /// partial state survives the gap.
    pub async fn initialize<E: ExchangeApi>(
        &mut self,
        exchange: &E,
        initial_equity: Decimal,
    ) -> Result<()> {
        self.initialized = false;

        let removed = exchange.cancel_all_orders(self.asset).await?;
        info!("Cleared {removed} resting orders ahead of grid build");

        let market = exchange.market_data(&self.settings.symbol).await?;
        let mid = market.mid_price;

        self.levels = calculator::build_grid(mid, &self.settings)?;
        self.anchor = None;
        self.new_fills.clear();

        let half_spacing = self.settings.spacing_fraction() / Decimal::TWO;
        for index in 0..self.levels.len() {
            let price = self.levels[index].price;
            let distance = ((price - mid) / mid).abs();
            if distance < half_spacing {
                // The rung nearest mid would cross the spread immediately.
                debug!("Level {index} at {price} straddles mid {mid}, skipping placement");
                self.anchor = Some(index);
                continue;
            }
            self.try_place_level(exchange, index).await;
        }

        self.initialized = true;
        info!(
            "Grid initialised for {}: {} levels around {mid}, equity {initial_equity}",
            self.settings.symbol,
            self.levels.len()
        );
        Ok(())
    }

    /// One pass of the fill-detection protocol.
    ///
    /// The snapshot of active order ids is taken before any counter order is
    /// placed, so ids created mid-pass can never be mistaken for fills.
    pub async fn sync<E: ExchangeApi>(&mut self, exchange: &E) -> Result<()> {
        let live = exchange.open_orders().await?;
        let live_ids: HashSet<u64> = live.iter().map(|o| o.id).collect();

        let snapshot: Vec<(usize, u64)> = self
            .levels
            .iter()
            .filter(|l| l.status == LevelStatus::Active)
            .filter_map(|l| l.order_id.map(|oid| (l.index, oid)))
            .collect();

        for (index, oid) in snapshot {
            if !live_ids.contains(&oid) {
                debug!("Order {oid} at level {index} left the book");
                self.handle_fill(exchange, index).await;
            }
        }

        // Retry levels that previously failed to place; the anchor stays
        // parked until a fill re-points it.
        let pending: Vec<usize> = self
            .levels
            .iter()
            .filter(|l| l.status == LevelStatus::Pending && Some(l.index) != self.anchor)
            .map(|l| l.index)
            .collect();
        for index in pending {
            self.try_place_level(exchange, index).await;
        }

        Ok(())
    }

    /// Refetch equity and rebuild the ladder around the current mid.
    ///
    /// An equity fetch failure aborts the reset; the tick handler catches it
    /// and the next cycle retries.
    pub async fn reset<E: ExchangeApi>(&mut self, exchange: &E) -> Result<()> {
        self.initialized = false;
        let account = exchange.account_state().await?;
        info!(
            "Rebuilding grid with equity {} after drift or position cap",
            account.total_equity
        );
        self.initialize(exchange, account.total_equity).await
    }

    /// Mark every resting level cancelled after a whole-grid cancel
    pub fn cancel_grid(&mut self) {
        for level in &mut self.levels {
            if level.status == LevelStatus::Active {
                level.status = LevelStatus::Cancelled;
                level.order_id = None;
            }
        }
    }

    /// Process a level whose order disappeared from the book
    async fn handle_fill<E: ExchangeApi>(&mut self, exchange: &E, index: usize) {
        let now = Utc::now();
        let (side, price, size) = {
            let level = &self.levels[index];
            (level.side, level.price, level.size)
        };

        // Profit realises only on the sell leg of a round trip; the paired
        // buy entry is the adjacent rung below.
        let pnl = match side {
            OrderSide::Buy => Decimal::ZERO,
            OrderSide::Sell => calculator::counter_buy_price(index, &self.levels)
                .map(|entry| (price - entry) * size)
                .unwrap_or(Decimal::ZERO),
        };

        {
            let level = &mut self.levels[index];
            level.status = LevelStatus::Filled;
            level.filled_at = Some(now);
            level.realized_pnl += pnl;
        }

        info!("Fill: level {index} {side:?} {size} @ {price}, pnl {pnl}");
        self.new_fills.push(FillRecord {
            time: now,
            side,
            price,
            size,
            pnl,
        });

        let counter_index = match side {
            OrderSide::Buy => {
                let up = index + 1;
                (up < self.levels.len()).then_some(up)
            }
            OrderSide::Sell => index.checked_sub(1),
        };

        let Some(counter_index) = counter_index else {
            debug!("Fill at level {index} has no counter rung, edge of grid");
            return;
        };

        let counter = &mut self.levels[counter_index];
        counter.side = side.opposite();
        if counter.status != LevelStatus::Active {
            // Stale ids are dropped rather than cancelled; the next sync
            // reconciles against the live book.
            counter.order_id = None;
            counter.status = LevelStatus::Pending;
        }
        if self.anchor == Some(counter_index) {
            self.anchor = None;
        }
        self.try_place_level(exchange, counter_index).await;
    }

    /// Attempt to place a pending level; failures leave it pending for the
    /// next sync to retry.
    async fn try_place_level<E: ExchangeApi>(&mut self, exchange: &E, index: usize) {
        let (side, price, size) = {
            let level = &self.levels[index];
            if level.status != LevelStatus::Pending {
                return;
            }
            (level.side, level.price, level.size)
        };

        match exchange
            .place_limit_order(&self.settings.symbol, self.asset, side, price, size)
            .await
        {
            Ok(order_id) => {
                self.levels[index].mark_active(order_id);
                debug!("Placed {side:?} {size} @ {price} for level {index}, oid {order_id}");
            }
            Err(e) => {
                warn!("Placement failed for level {index} ({side:?} @ {price}): {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_settings;
    use crate::exchange::mock::MockExchange;
    use rust_decimal_macros::dec;

    fn strategy() -> GridStrategy {
        GridStrategy::new(test_settings().grid, 0)
    }

    #[tokio::test]
    async fn test_initialize_places_all_but_the_mid_rung() {
        let exchange = MockExchange::new(dec!(50000));
        let mut strategy = strategy();

        strategy.initialize(&exchange, dec!(10000)).await.unwrap();

        assert!(strategy.is_initialized());
        let placed = exchange.placed.lock().await;
        assert_eq!(placed.len(), 9);
        for order in placed.iter() {
            match order.side {
                OrderSide::Buy => assert!(order.price < dec!(50000)),
                OrderSide::Sell => assert!(order.price > dec!(50000)),
            }
        }
    }

    #[tokio::test]
    async fn test_sync_detects_single_fill_and_reposts_counter() {
        let exchange = MockExchange::new(dec!(50000));
        let mut strategy = strategy();
        strategy.initialize(&exchange, dec!(10000)).await.unwrap();

        // Price drops through the buy nearest mid
        let filled_oid = strategy.levels()[4].order_id.unwrap();
        exchange.remove_order(filled_oid).await;

        strategy.sync(&exchange).await.unwrap();

        let filled: Vec<_> = strategy
            .levels()
            .iter()
            .filter(|l| l.status == LevelStatus::Filled)
            .collect();
        assert_eq!(filled.len(), 1);
        assert_eq!(filled[0].index, 4);

        let placed = exchange.placed.lock().await;
        assert_eq!(placed.len(), 10, "exactly one counter placement expected");
        let counter = placed.last().unwrap();
        assert_eq!(counter.side, OrderSide::Sell);
        assert_eq!(counter.price, strategy.levels()[5].price);
    }

    #[tokio::test]
    async fn test_buy_fill_realizes_nothing_until_the_sell_leg() {
        let exchange = MockExchange::new(dec!(50000));
        let mut strategy = strategy();
        strategy.initialize(&exchange, dec!(10000)).await.unwrap();

        let buy_oid = strategy.levels()[4].order_id.unwrap();
        exchange.remove_order(buy_oid).await;
        strategy.sync(&exchange).await.unwrap();

        assert_eq!(strategy.levels()[4].realized_pnl, Decimal::ZERO);
        assert_eq!(strategy.realized_pnl(), Decimal::ZERO);

        let fills = strategy.drain_new_fills();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].pnl, Decimal::ZERO);
        // Queue drains exactly once
        assert!(strategy.drain_new_fills().is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_realizes_adjacent_rung_spread() {
        let exchange = MockExchange::new(dec!(50000));
        let mut strategy = strategy();
        strategy.initialize(&exchange, dec!(10000)).await.unwrap();

        // Leg one: the buy at rung 4 fills and arms the sell at rung 5
        let buy_oid = strategy.levels()[4].order_id.unwrap();
        exchange.remove_order(buy_oid).await;
        strategy.sync(&exchange).await.unwrap();
        assert_eq!(strategy.realized_pnl(), Decimal::ZERO);

        // Leg two: price comes back up and the counter sell fills
        let sell_price = strategy.levels()[5].price;
        let entry_price = strategy.levels()[4].price;
        let size = strategy.levels()[5].size;
        let sell_oid = strategy.levels()[5].order_id.unwrap();
        exchange.remove_order(sell_oid).await;
        strategy.sync(&exchange).await.unwrap();

        let expected = (sell_price - entry_price) * size;
        assert_eq!(strategy.levels()[5].realized_pnl, expected);
        assert_eq!(strategy.realized_pnl(), expected);

        // The just-filled buy rung re-arms as the next buy
        let placed = exchange.placed.lock().await;
        let counter = placed.last().unwrap();
        assert_eq!(counter.side, OrderSide::Buy);
        assert_eq!(counter.price, entry_price);
        assert_eq!(strategy.levels()[4].status, LevelStatus::Active);

        let fills = strategy.drain_new_fills();
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[1].pnl, expected);
    }

    #[tokio::test]
    async fn test_reset_recentres_on_moved_mid() {
        let exchange = MockExchange::new(dec!(50000));
        let mut settings = test_settings().grid;
        settings.grid_levels = 20;
        let mut strategy = GridStrategy::new(settings, 0);
        strategy.initialize(&exchange, dec!(10000)).await.unwrap();

        exchange.set_mid(dec!(55000)).await;
        strategy.reset(&exchange).await.unwrap();

        assert!(strategy.is_initialized());
        let levels = strategy.levels();
        let centre = (levels[0].price + levels[levels.len() - 1].price) / Decimal::TWO;
        assert!(centre >= dec!(52000) && centre <= dec!(58000), "centre {centre}");
    }

    #[tokio::test]
    async fn test_placement_failures_are_non_fatal() {
        let exchange = MockExchange::new(dec!(50000));
        exchange.set_fail_placement(true).await;
        let mut strategy = strategy();

        strategy.initialize(&exchange, dec!(10000)).await.unwrap();

        assert!(strategy.is_initialized());
        for level in strategy.levels() {
            assert!(
                matches!(level.status, LevelStatus::Pending | LevelStatus::Active),
                "unexpected status {:?} at {}",
                level.status,
                level.index
            );
            assert_ne!(level.status, LevelStatus::Filled);
        }
    }

    #[tokio::test]
    async fn test_failed_placements_retry_on_next_sync() {
        let exchange = MockExchange::new(dec!(50000));
        exchange.set_fail_placement(true).await;
        let mut strategy = strategy();
        strategy.initialize(&exchange, dec!(10000)).await.unwrap();

        exchange.set_fail_placement(false).await;
        strategy.sync(&exchange).await.unwrap();

        let active = strategy.levels().iter().filter(|l| l.is_active()).count();
        // Everything but the anchor rung comes back
        assert_eq!(active, 9);
    }

    #[tokio::test]
    async fn test_fill_with_resting_counter_leaves_it_on_the_book() {
        let exchange = MockExchange::new(dec!(50000));
        let mut strategy = strategy();
        strategy.initialize(&exchange, dec!(10000)).await.unwrap();

        // The top sell fills while the rung below still rests; the live
        // order stays put and only the intended side flips.
        let top = strategy.levels().len() - 1;
        let below_oid = strategy.levels()[top - 1].order_id.unwrap();
        let top_oid = strategy.levels()[top].order_id.unwrap();
        exchange.remove_order(top_oid).await;

        let placed_before = exchange.placed.lock().await.len();
        strategy.sync(&exchange).await.unwrap();
        let placed_after = exchange.placed.lock().await.len();

        assert_eq!(strategy.levels()[top].status, LevelStatus::Filled);
        assert_eq!(placed_before, placed_after);
        assert_eq!(strategy.levels()[top - 1].side, OrderSide::Buy);
        assert_eq!(strategy.levels()[top - 1].status, LevelStatus::Active);
        assert_eq!(strategy.levels()[top - 1].order_id, Some(below_oid));
    }

    #[tokio::test]
    async fn test_counter_ids_placed_mid_pass_are_not_fills() {
        let exchange = MockExchange::new(dec!(50000));
        let mut strategy = strategy();
        strategy.initialize(&exchange, dec!(10000)).await.unwrap();

        // Fill a buy whose counter rung (4 -> 5) is the unplaced anchor; the
        // counter order id it acquires mid-pass is absent from the snapshot
        // and must survive the same sync untouched.
        let buy_oid = strategy.levels()[4].order_id.unwrap();
        exchange.remove_order(buy_oid).await;
        strategy.sync(&exchange).await.unwrap();

        assert_eq!(strategy.levels()[5].status, LevelStatus::Active);
        let filled = strategy
            .levels()
            .iter()
            .filter(|l| l.status == LevelStatus::Filled)
            .count();
        assert_eq!(filled, 1);
    }
}
