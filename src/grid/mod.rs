//! Grid geometry and the stateful level lifecycle

pub mod calculator;
pub mod strategy;
pub mod types;

pub use calculator::{
    build_grid, counter_buy_price, counter_sell_price, estimated_annual_return_rate, grid_bounds,
    round_to_tick,
};
pub use strategy::GridStrategy;
pub use types::{FillRecord, GridLevel, LevelStatus, OrderSide};
