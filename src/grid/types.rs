//! Core data types for the grid ladder

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side for grid levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }

    /// Convert to exchange side string
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "B",
            OrderSide::Sell => "A",
        }
    }
}

impl From<&str> for OrderSide {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "B" | "BUY" => OrderSide::Buy,
            _ => OrderSide::Sell,
        }
    }
}

/// Status of an individual grid level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelStatus {
    /// No resting order; placement pending
    Pending,
    /// Order resting on the book
    Active,
    /// Order disappeared from the book; treated as filled
    Filled,
    /// Order removed by an explicit grid cancel
    Cancelled,
}

/// One rung of the ladder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridLevel {
    /// 0-based position from the lowest price upward
    pub index: usize,
    /// Price rounded to the exchange tick
    pub price: Decimal,
    /// Current direction of this rung; counter fills rewrite it
    pub side: OrderSide,
    /// Constant per-level quantity
    pub size: Decimal,
    pub status: LevelStatus,
    /// Exchange-assigned id, present once the level has been resting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filled_at: Option<DateTime<Utc>>,
    /// Running profit attributed to this rung
    pub realized_pnl: Decimal,
}

impl GridLevel {
    /// Create a new pending grid level
    pub fn new(index: usize, price: Decimal, side: OrderSide, size: Decimal) -> Self {
        Self {
            index,
            price,
            side,
            size,
            status: LevelStatus::Pending,
            order_id: None,
            placed_at: None,
            filled_at: None,
            realized_pnl: Decimal::ZERO,
        }
    }

    /// Check if this level has an order resting on the book
    pub fn is_active(&self) -> bool {
        self.status == LevelStatus::Active
    }

    /// Mark as resting with the exchange-assigned id
    pub fn mark_active(&mut self, order_id: u64) {
        self.order_id = Some(order_id);
        self.status = LevelStatus::Active;
        self.placed_at = Some(Utc::now());
    }
}

/// Append-only record of a detected fill
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillRecord {
    pub time: DateTime<Utc>,
    pub side: OrderSide,
    pub price: Decimal,
    pub size: Decimal,
    pub pnl: Decimal,
}
