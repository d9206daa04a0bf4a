//! Pure grid geometry: level prices, bounds, counter lookups, and the
//! a-priori return estimate used for sanity gating

use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::GridSettings;
use crate::consts::DEFAULT_TICK;
use crate::errors::{Error, Result};

use super::types::{GridLevel, OrderSide};

/// Build a geometrically spaced ladder centred on `mid`.
///
/// Rungs below the midpoint index are buys, the rest sells; everything
/// starts `Pending`. Multiplicative spacing is deliberate: additive spacing
/// drifts in log-space and biases side allocation after a reset.
pub fn build_grid(mid: Decimal, cfg: &GridSettings) -> Result<Vec<GridLevel>> {
    if mid <= Decimal::ZERO {
        return Err(Error::InvalidConfig(format!(
            "mid price must be positive, got {mid}"
        )));
    }
    if cfg.grid_levels < 2 {
        return Err(Error::InvalidConfig(format!(
            "grid needs at least 2 levels, got {}",
            cfg.grid_levels
        )));
    }

    let n = cfg.grid_levels as i32;
    let m = n / 2;
    let spacing = cfg.spacing_fraction();

    let levels = (0..n)
        .map(|i| {
            let price = level_price(mid, spacing, i - m);
            let side = if i < m { OrderSide::Buy } else { OrderSide::Sell };
            GridLevel::new(i as usize, price, side, cfg.order_size_btc)
        })
        .collect();

    Ok(levels)
}

/// Lowest and highest rung prices for a grid built at `mid`
pub fn grid_bounds(mid: Decimal, cfg: &GridSettings) -> Result<(Decimal, Decimal)> {
    if mid <= Decimal::ZERO {
        return Err(Error::InvalidConfig(format!(
            "mid price must be positive, got {mid}"
        )));
    }
    if cfg.grid_levels < 2 {
        return Err(Error::InvalidConfig(format!(
            "grid needs at least 2 levels, got {}",
            cfg.grid_levels
        )));
    }

    let n = cfg.grid_levels as i32;
    let m = n / 2;
    let spacing = cfg.spacing_fraction();

    let lower = level_price(mid, spacing, -m);
    let upper = level_price(mid, spacing, n - 1 - m);
    Ok((lower, upper))
}

/// Price of the rung a filled buy pairs with, one level up
pub fn counter_sell_price(filled_buy_index: usize, levels: &[GridLevel]) -> Option<Decimal> {
    levels.get(filled_buy_index + 1).map(|l| l.price)
}

/// Price of the rung a filled sell pairs with, one level down
pub fn counter_buy_price(filled_sell_index: usize, levels: &[GridLevel]) -> Option<Decimal> {
    if filled_sell_index == 0 {
        return None;
    }
    levels.get(filled_sell_index - 1).map(|l| l.price)
}

/// Coarse annualised return estimate for a grid configuration.
///
/// The model exists to reject configurations whose spacing is tighter than
/// the round-trip fee; any non-positive result means "unprofitable".
pub fn estimated_annual_return_rate(
    mid: Decimal,
    cfg: &GridSettings,
    annual_oscillations: f64,
    taker_fee: f64,
) -> f64 {
    if mid.is_zero() || cfg.grid_levels == 0 || cfg.order_size_btc.is_zero() {
        return 0.0;
    }
    let profit_fraction = cfg.spacing_fraction().to_f64().unwrap_or(0.0) - 2.0 * taker_fee;
    if profit_fraction <= 0.0 {
        return 0.0;
    }
    // Per-oscillation profit and capital both scale with size and price, so
    // they cancel out of the ratio.
    annual_oscillations * profit_fraction / cfg.grid_levels as f64
}

/// Round to the nearest multiple of `tick`, ties away from zero
pub fn round_to_tick(price: Decimal, tick: Decimal) -> Decimal {
    if tick <= Decimal::ZERO {
        return price;
    }
    let steps = (price / tick).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    (steps * tick).normalize()
}

/// Price `steps` rungs away from `mid`.
///
/// The geometric power is the one place binary floats are permitted; the
/// result converts straight back to decimal and is rounded to tick.
fn level_price(mid: Decimal, spacing: Decimal, steps: i32) -> Decimal {
    let factor = (1.0 + spacing.to_f64().unwrap_or(0.0)).powi(steps);
    let scaled = mid * Decimal::from_f64(factor).unwrap_or(Decimal::ONE);
    round_to_tick(scaled, DEFAULT_TICK)
}
