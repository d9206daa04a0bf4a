#![deny(unreachable_pub)]
//! Automated grid trading engine for Hyperliquid BTC perpetuals.
//!
//! A symmetric ladder of resting limit orders is kept centred on the mid
//! price; each fill is paired with a counter order one rung away, turning
//! oscillation into realized profit. A sampled risk guard decides every
//! cycle whether to continue, rebuild the grid, or halt.

pub mod bot;
pub mod config;
pub mod consts;
pub mod errors;
pub mod exchange;
pub mod grid;
pub mod helpers;
pub mod risk;
pub mod signing;

pub use bot::{Orchestrator, StatusBoard};
pub use config::Settings;
pub use errors::{Error, Result};
pub use exchange::{ExchangeApi, HyperliquidClient};
pub use grid::GridStrategy;
pub use helpers::BaseUrl;
pub use risk::{RiskManager, RiskVerdict};
