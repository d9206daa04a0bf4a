//! Shared helpers: network selection and wire-format numeric rendering

use rust_decimal::{Decimal, RoundingStrategy};

use crate::consts::{MAINNET_API_URL, TESTNET_API_URL};
use crate::errors::{Error, Result};

/// Which Hyperliquid deployment to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseUrl {
    Mainnet,
    Testnet,
}

impl BaseUrl {
    pub fn rest_url(&self) -> &'static str {
        match self {
            BaseUrl::Mainnet => MAINNET_API_URL,
            BaseUrl::Testnet => TESTNET_API_URL,
        }
    }

    /// Phantom-agent source string for the L1 signing domain
    pub fn agent_source(&self) -> &'static str {
        match self {
            BaseUrl::Mainnet => "a",
            BaseUrl::Testnet => "b",
        }
    }

    /// Chain name carried in user-signed actions
    pub fn hyperliquid_chain(&self) -> &'static str {
        match self {
            BaseUrl::Mainnet => "Mainnet",
            BaseUrl::Testnet => "Testnet",
        }
    }

    /// Arbitrum chain id for the user-signed domain. Unlike the L1 domain
    /// (pinned at 1337), this one tracks the actual network.
    pub fn signature_chain_id(&self) -> u64 {
        match self {
            BaseUrl::Mainnet => 42161,
            BaseUrl::Testnet => 421614,
        }
    }
}

/// Render a price or size the way the exchange expects it on the wire:
/// at most 8 fractional digits, trailing zeros stripped, never scientific
/// notation. Two renderings of the same value byte-match regardless of
/// locale, which the signature verification depends on.
pub fn wire_decimal(value: Decimal) -> String {
    value
        .round_dp_with_strategy(8, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
        .to_string()
}

/// Parse an exchange-reported decimal string, mapping failure to a parse
/// error naming the field.
pub fn parse_decimal(raw: &str, field: &str) -> Result<Decimal> {
    raw.parse::<Decimal>()
        .map_err(|e| Error::Parse(format!("{field} '{raw}': {e}")))
}
