//! Exchange capability contract and its backends

pub mod client;
pub mod mock;
pub mod types;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::errors::Result;
use crate::grid::types::OrderSide;

pub use client::HyperliquidClient;
pub use types::{AccountState, MarketData, Order, Position};

/// Capability set the strategy and orchestrator depend on.
///
/// Deliberately thin so an in-memory fake can back unit tests. Callers must
/// tolerate eventual consistency: an order id returned by a place response
/// may not yet appear in the next `open_orders` snapshot.
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    /// Market snapshot with a strictly positive mid
    async fn market_data(&self, symbol: &str) -> Result<MarketData>;

    /// Account equity, margin, and open positions
    async fn account_state(&self) -> Result<AccountState>;

    /// Snapshot of currently resting orders
    async fn open_orders(&self) -> Result<Vec<Order>>;

    /// Place a GTC limit order; returns the exchange-assigned order id
    async fn place_limit_order(
        &self,
        symbol: &str,
        asset: u32,
        side: OrderSide,
        price: Decimal,
        size: Decimal,
    ) -> Result<u64>;

    /// True iff the exchange confirmed removal
    async fn cancel_order(&self, asset: u32, order_id: u64) -> Result<bool>;

    /// Cancel every resting order on the asset; returns the count removed
    async fn cancel_all_orders(&self, asset: u32) -> Result<u32>;

    /// 0-based index of the symbol in the exchange universe
    async fn asset_index(&self, symbol: &str) -> Result<u32>;

    /// USDC sitting in the spot wallet
    async fn spot_usdc_balance(&self) -> Result<Decimal>;

    /// Move USDC from spot to the perp wallet; settles asynchronously at
    /// the exchange
    async fn transfer_spot_to_perps(&self, amount: Decimal) -> Result<()>;
}
