//! Observer snapshot shared with the status endpoint.
//!
//! The writer replaces the snapshot wholesale under a short-held lock;
//! readers copy out. Histories are bounded FIFOs with drop-oldest
//! semantics.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::consts::{PNL_HISTORY_CAP, PRICE_HISTORY_CAP, RECENT_FILLS_CAP};
use crate::grid::types::{FillRecord, GridLevel};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub time: DateTime<Utc>,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PnlPoint {
    pub time: DateTime<Utc>,
    pub pnl: Decimal,
}

/// Everything the status endpoint reports for one sync cycle
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub is_running: bool,
    pub sync_count: u64,
    pub mid_price: Decimal,
    pub total_equity: Decimal,
    pub available_balance: Decimal,
    pub realized_pnl: Decimal,
    pub active_orders: usize,
    pub filled_levels: usize,
    pub total_fills: u64,
    pub levels: Vec<GridLevel>,
    pub recent_fills: Vec<FillRecord>,
    pub price_history: Vec<PricePoint>,
    pub pnl_history: Vec<PnlPoint>,
}

/// Per-tick input to the board; histories accumulate internally
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub is_running: bool,
    pub sync_count: u64,
    pub mid_price: Decimal,
    pub total_equity: Decimal,
    pub available_balance: Decimal,
    pub realized_pnl: Decimal,
    pub levels: Vec<GridLevel>,
    pub new_fills: Vec<FillRecord>,
}

struct Inner {
    snapshot: StatusSnapshot,
    price_history: VecDeque<PricePoint>,
    pnl_history: VecDeque<PnlPoint>,
    recent_fills: VecDeque<FillRecord>,
    total_fills: u64,
}

/// Single shared snapshot between the orchestrator (writer) and the HTTP
/// handler (reader)
pub struct StatusBoard {
    inner: RwLock<Inner>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                snapshot: StatusSnapshot::default(),
                price_history: VecDeque::with_capacity(PRICE_HISTORY_CAP),
                pnl_history: VecDeque::with_capacity(PNL_HISTORY_CAP),
                recent_fills: VecDeque::with_capacity(RECENT_FILLS_CAP),
                total_fills: 0,
            }),
        }
    }

    /// Fold one tick's state into the histories and publish a fresh
    /// snapshot
    pub async fn publish(&self, update: StatusUpdate) {
        let now = Utc::now();
        let mut inner = self.inner.write().await;

        push_capped(
            &mut inner.price_history,
            PricePoint { time: now, price: update.mid_price },
            PRICE_HISTORY_CAP,
        );
        push_capped(
            &mut inner.pnl_history,
            PnlPoint { time: now, pnl: update.realized_pnl },
            PNL_HISTORY_CAP,
        );
        for fill in update.new_fills {
            inner.total_fills += 1;
            push_capped(&mut inner.recent_fills, fill, RECENT_FILLS_CAP);
        }

        let active_orders = update.levels.iter().filter(|l| l.is_active()).count();
        let filled_levels = update
            .levels
            .iter()
            .filter(|l| l.filled_at.is_some())
            .count();

        inner.snapshot = StatusSnapshot {
            is_running: update.is_running,
            sync_count: update.sync_count,
            mid_price: update.mid_price,
            total_equity: update.total_equity,
            available_balance: update.available_balance,
            realized_pnl: update.realized_pnl,
            active_orders,
            filled_levels,
            total_fills: inner.total_fills,
            levels: update.levels,
            recent_fills: inner.recent_fills.iter().cloned().collect(),
            price_history: inner.price_history.iter().cloned().collect(),
            pnl_history: inner.pnl_history.iter().cloned().collect(),
        };
    }

    /// Copy of the latest snapshot
    pub async fn snapshot(&self) -> StatusSnapshot {
        self.inner.read().await.snapshot.clone()
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

fn push_capped<T>(queue: &mut VecDeque<T>, item: T, cap: usize) {
    if queue.len() == cap {
        queue.pop_front();
    }
    queue.push_back(item);
}
