//! In-memory exchange fake backing the strategy and orchestrator tests

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::errors::{Error, Result};
use crate::grid::types::OrderSide;

use super::types::{AccountState, MarketData, Order};
use super::ExchangeApi;

/// Record of a `place_limit_order` call
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub oid: u64,
    pub symbol: String,
    pub side: OrderSide,
    pub price: Decimal,
    pub size: Decimal,
}

/// Scriptable fake: the live book is a plain list, fills are simulated by
/// removing an order id, and every placement is recorded for assertions.
pub struct MockExchange {
    pub mid_price: Mutex<Decimal>,
    /// Orders currently "resting on the book"
    pub book: Mutex<Vec<Order>>,
    /// Every placement ever attempted successfully
    pub placed: Mutex<Vec<PlacedOrder>>,
    pub cancelled: Mutex<Vec<u64>>,
    pub cancel_all_calls: AtomicU32,
    pub transfers: Mutex<Vec<Decimal>>,
    pub account: Mutex<AccountState>,
    pub spot_usdc: Mutex<Decimal>,
    fail_placement: Mutex<bool>,
    next_oid: AtomicU64,
}

impl MockExchange {
    pub fn new(mid_price: Decimal) -> Self {
        Self {
            mid_price: Mutex::new(mid_price),
            book: Mutex::new(Vec::new()),
            placed: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            cancel_all_calls: AtomicU32::new(0),
            transfers: Mutex::new(Vec::new()),
            account: Mutex::new(AccountState {
                total_equity: Decimal::new(10000, 0),
                available_balance: Decimal::new(10000, 0),
                margin_used: Decimal::ZERO,
                positions: Vec::new(),
            }),
            spot_usdc: Mutex::new(Decimal::ZERO),
            fail_placement: Mutex::new(false),
            next_oid: AtomicU64::new(1),
        }
    }

    pub async fn set_mid(&self, price: Decimal) {
        *self.mid_price.lock().await = price;
    }

    pub async fn set_fail_placement(&self, fail: bool) {
        *self.fail_placement.lock().await = fail;
    }

    pub async fn set_equity(&self, equity: Decimal) {
        let mut account = self.account.lock().await;
        account.total_equity = equity;
        account.available_balance = equity;
    }

    /// Simulate a fill by dropping the order from the live book
    pub async fn remove_order(&self, oid: u64) {
        self.book.lock().await.retain(|o| o.id != oid);
    }

    pub async fn placed_count(&self) -> usize {
        self.placed.lock().await.len()
    }
}

#[async_trait]
impl ExchangeApi for MockExchange {
    async fn market_data(&self, symbol: &str) -> Result<MarketData> {
        let mid = *self.mid_price.lock().await;
        let half_tick = Decimal::new(5, 1);
        Ok(MarketData {
            symbol: symbol.to_string(),
            mid_price: mid,
            bid_price: mid - half_tick,
            ask_price: mid + half_tick,
            timestamp: Utc::now(),
        })
    }

    async fn account_state(&self) -> Result<AccountState> {
        Ok(self.account.lock().await.clone())
    }

    async fn open_orders(&self) -> Result<Vec<Order>> {
        Ok(self.book.lock().await.clone())
    }

    async fn place_limit_order(
        &self,
        symbol: &str,
        _asset: u32,
        side: OrderSide,
        price: Decimal,
        size: Decimal,
    ) -> Result<u64> {
        if *self.fail_placement.lock().await {
            return Err(Error::Rejected("mock placement failure".into()));
        }

        let oid = self.next_oid.fetch_add(1, Ordering::SeqCst);
        self.book.lock().await.push(Order {
            id: oid,
            symbol: symbol.to_string(),
            side,
            price,
            size,
            filled_size: Decimal::ZERO,
            created_at: Utc::now(),
        });
        self.placed.lock().await.push(PlacedOrder {
            oid,
            symbol: symbol.to_string(),
            side,
            price,
            size,
        });
        Ok(oid)
    }

    async fn cancel_order(&self, _asset: u32, order_id: u64) -> Result<bool> {
        let mut book = self.book.lock().await;
        let before = book.len();
        book.retain(|o| o.id != order_id);
        let removed = book.len() < before;
        drop(book);
        self.cancelled.lock().await.push(order_id);
        Ok(removed)
    }

    async fn cancel_all_orders(&self, _asset: u32) -> Result<u32> {
        self.cancel_all_calls.fetch_add(1, Ordering::SeqCst);
        let mut book = self.book.lock().await;
        let count = book.len() as u32;
        book.clear();
        Ok(count)
    }

    async fn asset_index(&self, _symbol: &str) -> Result<u32> {
        Ok(0)
    }

    async fn spot_usdc_balance(&self) -> Result<Decimal> {
        Ok(*self.spot_usdc.lock().await)
    }

    async fn transfer_spot_to_perps(&self, amount: Decimal) -> Result<()> {
        self.transfers.lock().await.push(amount);
        let mut spot = self.spot_usdc.lock().await;
        *spot -= amount;
        let mut account = self.account.lock().await;
        account.total_equity += amount;
        account.available_balance += amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_mock_tracks_book_and_placements() {
        let exchange = MockExchange::new(dec!(50000));

        let oid = exchange
            .place_limit_order("BTC", 0, OrderSide::Buy, dec!(49500), dec!(0.001))
            .await
            .unwrap();
        assert_eq!(exchange.open_orders().await.unwrap().len(), 1);
        assert_eq!(exchange.placed_count().await, 1);

        exchange.remove_order(oid).await;
        assert!(exchange.open_orders().await.unwrap().is_empty());
        // Placement history survives simulated fills
        assert_eq!(exchange.placed_count().await, 1);
    }

    #[tokio::test]
    async fn test_mock_transfer_moves_balance() {
        let exchange = MockExchange::new(dec!(50000));
        exchange.set_equity(Decimal::ZERO).await;
        *exchange.spot_usdc.lock().await = dec!(500);

        exchange.transfer_spot_to_perps(dec!(500)).await.unwrap();

        assert_eq!(*exchange.spot_usdc.lock().await, Decimal::ZERO);
        assert_eq!(
            exchange.account_state().await.unwrap().total_equity,
            dec!(500)
        );
    }
}
