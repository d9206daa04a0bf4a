//! Risk supervision: drawdown, price-range, and net-position guards

use log::{debug, warn};
use rust_decimal::Decimal;

use crate::config::RiskSettings;
use crate::exchange::types::{AccountState, MarketData};

/// Verdict produced once per sync cycle. Consumers branch exhaustively;
/// the first triggered guard wins and the rest are not reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskVerdict {
    Continue,
    ResetGrid(String),
    Halt(String),
}

/// Stateless per call apart from the equity high-water mark, which lives
/// for the process lifetime once seeded.
pub struct RiskManager {
    settings: RiskSettings,
    symbol: String,
    peak_equity: Decimal,
}

impl RiskManager {
    pub fn new(settings: RiskSettings, symbol: impl Into<String>) -> Self {
        Self {
            settings,
            symbol: symbol.into(),
            peak_equity: Decimal::ZERO,
        }
    }

    /// Seed the high-water mark at startup
    pub fn set_initial_equity(&mut self, equity: Decimal) {
        self.peak_equity = equity;
        debug!("Peak equity seeded at {equity}");
    }

    pub fn peak_equity(&self) -> Decimal {
        self.peak_equity
    }

    /// Evaluate the guards in stable order: drawdown, price range, net
    /// position.
    pub fn evaluate(&mut self, account: &AccountState, market: &MarketData) -> RiskVerdict {
        if account.total_equity > self.peak_equity {
            self.peak_equity = account.total_equity;
        }

        if self.peak_equity > Decimal::ZERO {
            let drawdown = (self.peak_equity - account.total_equity) / self.peak_equity;
            let limit = self.settings.max_drawdown_percent / Decimal::ONE_HUNDRED;
            if drawdown >= limit {
                return RiskVerdict::Halt(format!(
                    "drawdown {:.2}% from peak {} breaches the {}% limit",
                    drawdown * Decimal::ONE_HUNDRED,
                    self.peak_equity,
                    self.settings.max_drawdown_percent
                ));
            }
        }

        // Boundary values are inclusive; at-boundary passes
        if market.mid_price < self.settings.min_grid_price
            || market.mid_price > self.settings.max_grid_price
        {
            return RiskVerdict::Halt(format!(
                "mid {} outside the allowed range [{}, {}]",
                market.mid_price, self.settings.min_grid_price, self.settings.max_grid_price
            ));
        }

        let net: Decimal = account
            .positions
            .iter()
            .filter(|p| p.symbol == self.symbol)
            .map(|p| p.size)
            .sum();
        if net.abs() > self.settings.max_position_size_btc {
            warn!("Net position {net} exceeds the {} cap", self.settings.max_position_size_btc);
            return RiskVerdict::ResetGrid(format!(
                "net position {net} exceeds the {} cap",
                self.settings.max_position_size_btc
            ));
        }

        RiskVerdict::Continue
    }

    /// True when the mid has drifted past 80% of the half-range from the
    /// grid centre. The factor keeps the grid from thrashing at the edge
    /// while still re-centring before orders become useless.
    pub fn should_reset_grid(current_price: Decimal, lower: Decimal, upper: Decimal) -> bool {
        let centre = (lower + upper) / Decimal::TWO;
        let half_range = (upper - lower) / Decimal::TWO;
        (current_price - centre).abs() > Decimal::new(8, 1) * half_range
    }
}
