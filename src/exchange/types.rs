//! Domain model and wire shapes at the exchange boundary

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::{Error, Result};
use crate::grid::types::OrderSide;
use crate::helpers::parse_decimal;

/// Snapshot of top-of-book market state. `mid_price` is strictly positive;
/// downstream code assumes it.
#[derive(Debug, Clone)]
pub struct MarketData {
    pub symbol: String,
    pub mid_price: Decimal,
    pub bid_price: Decimal,
    pub ask_price: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Perp account snapshot
#[derive(Debug, Clone, Default)]
pub struct AccountState {
    pub total_equity: Decimal,
    pub available_balance: Decimal,
    pub margin_used: Decimal,
    pub positions: Vec<Position>,
}

/// One open position; size is signed, positive for long
#[derive(Debug, Clone)]
pub struct Position {
    pub symbol: String,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub unrealized_pnl: Decimal,
}

/// Normalised resting order
#[derive(Debug, Clone)]
pub struct Order {
    pub id: u64,
    pub symbol: String,
    pub side: OrderSide,
    pub price: Decimal,
    pub size: Decimal,
    pub filled_size: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn is_fully_filled(&self) -> bool {
        self.filled_size >= self.size
    }
}

// ---------------------------------------------------------------------------
// Wire shapes (POST /info responses)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct L2BookResponse {
    /// `levels[0]` bids, `levels[1]` asks; best price is element 0
    pub levels: Vec<Vec<L2BookEntry>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct L2BookEntry {
    pub px: String,
    #[allow(dead_code)]
    pub sz: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ClearinghouseState {
    pub margin_summary: MarginSummary,
    #[serde(default)]
    pub asset_positions: Vec<AssetPosition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MarginSummary {
    pub account_value: String,
    pub total_margin_used: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssetPosition {
    pub position: PositionWire,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PositionWire {
    pub coin: String,
    pub szi: String,
    #[serde(default)]
    pub entry_px: Option<String>,
    pub unrealized_pnl: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OpenOrderWire {
    pub oid: u64,
    pub coin: String,
    pub side: String,
    pub limit_px: String,
    pub sz: String,
    pub orig_sz: String,
    pub timestamp: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Meta {
    pub universe: Vec<AssetMeta>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssetMeta {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotClearinghouseState {
    #[serde(default)]
    pub balances: Vec<SpotBalance>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotBalance {
    pub coin: String,
    pub total: String,
}

// ---------------------------------------------------------------------------
// Wire shapes (POST /exchange responses)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct ExchangeEnvelope {
    pub status: String,
    #[serde(default)]
    pub response: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExchangeResponseBody {
    #[serde(default)]
    pub data: Option<ExchangeResponseData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExchangeResponseData {
    #[serde(default)]
    pub statuses: Vec<ExchangeDataStatus>,
}

/// Per-order outcome inside an exchange response. Cancel confirmations
/// arrive as the bare string "success".
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum ExchangeDataStatus {
    Success,
    WaitingForFill,
    WaitingForTrigger,
    Resting(RestingOrderWire),
    Filled(FilledOrderWire),
    Error(String),
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestingOrderWire {
    pub oid: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FilledOrderWire {
    pub oid: u64,
}

// ---------------------------------------------------------------------------
// Wire -> domain conversions
// ---------------------------------------------------------------------------

impl TryFrom<OpenOrderWire> for Order {
    type Error = Error;

    fn try_from(wire: OpenOrderWire) -> Result<Order> {
        let remaining = parse_decimal(&wire.sz, "order sz")?;
        let original = parse_decimal(&wire.orig_sz, "order origSz")?;
        Ok(Order {
            id: wire.oid,
            symbol: wire.coin,
            side: OrderSide::from(wire.side.as_str()),
            price: parse_decimal(&wire.limit_px, "order limitPx")?,
            size: original,
            filled_size: original - remaining,
            created_at: Utc
                .timestamp_millis_opt(wire.timestamp as i64)
                .single()
                .unwrap_or_else(Utc::now),
        })
    }
}

impl TryFrom<ClearinghouseState> for AccountState {
    type Error = Error;

    fn try_from(wire: ClearinghouseState) -> Result<AccountState> {
        let total_equity = parse_decimal(&wire.margin_summary.account_value, "accountValue")?;
        let margin_used = parse_decimal(&wire.margin_summary.total_margin_used, "totalMarginUsed")?;

        let mut positions = Vec::with_capacity(wire.asset_positions.len());
        for entry in wire.asset_positions {
            let p = entry.position;
            let size = parse_decimal(&p.szi, "position szi")?;
            if size.is_zero() {
                continue;
            }
            let entry_price = match &p.entry_px {
                Some(raw) => parse_decimal(raw, "position entryPx")?,
                None => Decimal::ZERO,
            };
            positions.push(Position {
                symbol: p.coin,
                size,
                entry_price,
                unrealized_pnl: parse_decimal(&p.unrealized_pnl, "position unrealizedPnl")?,
            });
        }

        Ok(AccountState {
            total_equity,
            available_balance: total_equity - margin_used,
            margin_used,
            positions,
        })
    }
}
