//! Crate-wide constants

use std::time::Duration;

use rust_decimal::Decimal;

pub const MAINNET_API_URL: &str = "https://api.hyperliquid.xyz";
pub const TESTNET_API_URL: &str = "https://api.hyperliquid-testnet.xyz";

/// Per-request HTTP timeout; failures are retried on the next sync cycle,
/// never inside one.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause after a spot-to-perp transfer before re-reading the account. The
/// balance moves asynchronously at the exchange.
pub const SETTLEMENT_PAUSE: Duration = Duration::from_secs(2);

/// Exchange tick size for BTC perp prices.
pub const DEFAULT_TICK: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

/// Assumed full grid oscillations per year for the return estimate.
pub const ANNUAL_OSCILLATIONS: f64 = 300.0;

/// Taker fee fraction used when gating unprofitable spacing.
pub const TAKER_FEE: f64 = 0.00045;

pub const PRICE_HISTORY_CAP: usize = 120;
pub const PNL_HISTORY_CAP: usize = 120;
pub const RECENT_FILLS_CAP: usize = 50;
