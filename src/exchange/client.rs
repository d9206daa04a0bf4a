//! Signed REST backend for the Hyperliquid API

use std::collections::HashMap;

use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::Mutex;

use crate::consts::HTTP_TIMEOUT;
use crate::errors::{Error, Result};
use crate::grid::types::OrderSide;
use crate::helpers::{parse_decimal, wire_decimal, BaseUrl};
use crate::signing::{
    sign_l1_action, sign_usd_class_transfer, CancelAction, CancelWire, OrderAction, OrderTypeWire,
    OrderWire, Signature, UsdClassTransferAction,
};

use super::types::{
    AccountState, ClearinghouseState, ExchangeDataStatus, ExchangeEnvelope, ExchangeResponseBody,
    L2BookResponse, MarketData, Meta, OpenOrderWire, Order, SpotClearinghouseState,
};
use super::ExchangeApi;

/// Long-lived signed REST client. The HTTP handle is shared and every
/// request carries a single 10-second timeout; the next sync cycle is the
/// retry.
pub struct HyperliquidClient {
    http: reqwest::Client,
    base: BaseUrl,
    signer: PrivateKeySigner,
    user_address: String,
    /// Universe names from meta, fetched once and cached
    universe: Mutex<Option<Vec<String>>>,
}

impl HyperliquidClient {
    /// Create a client for the given network. An empty `wallet_address`
    /// queries state for the signing key's own address (API wallets sign
    /// for a master account, so they can differ).
    pub fn new(base: BaseUrl, signer: PrivateKeySigner, wallet_address: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        let user_address = if wallet_address.trim().is_empty() {
            format!("{:#x}", signer.address())
        } else {
            wallet_address.trim().to_string()
        };

        Ok(Self {
            http,
            base,
            signer,
            user_address,
            universe: Mutex::new(None),
        })
    }

    pub fn user_address(&self) -> &str {
        &self.user_address
    }

    async fn post_info<T: DeserializeOwned>(&self, body: serde_json::Value) -> Result<T> {
        let response = self
            .http
            .post(format!("{}/info", self.base.rest_url()))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::Transport(format!("info returned {status}: {text}")));
        }
        serde_json::from_str(&text).map_err(|e| Error::Parse(format!("info response: {e}")))
    }

    async fn post_exchange(
        &self,
        action: serde_json::Value,
        nonce: u64,
        signature: Signature,
    ) -> Result<serde_json::Value> {
        let payload = json!({
            "action": action,
            "nonce": nonce,
            "signature": signature,
            "vaultAddress": null,
            "expiresAfter": null,
        });

        let response = self
            .http
            .post(format!("{}/exchange", self.base.rest_url()))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::Transport(format!("exchange returned {status}: {text}")));
        }

        let envelope: ExchangeEnvelope = serde_json::from_str(&text)
            .map_err(|e| Error::Parse(format!("exchange response: {e}")))?;
        if envelope.status != "ok" {
            return Err(Error::Rejected(envelope.response.to_string()));
        }
        Ok(envelope.response)
    }

    fn first_status(response: serde_json::Value) -> Result<ExchangeDataStatus> {
        let body: ExchangeResponseBody = serde_json::from_value(response)
            .map_err(|e| Error::Parse(format!("exchange statuses: {e}")))?;
        body.data
            .and_then(|data| data.statuses.into_iter().next())
            .ok_or_else(|| Error::Parse("no status in exchange response".into()))
    }

    fn statuses(response: serde_json::Value) -> Result<Vec<ExchangeDataStatus>> {
        let body: ExchangeResponseBody = serde_json::from_value(response)
            .map_err(|e| Error::Parse(format!("exchange statuses: {e}")))?;
        Ok(body.data.map(|data| data.statuses).unwrap_or_default())
    }

    /// Universe names, fetched from meta on first use
    async fn universe_names(&self) -> Result<Vec<String>> {
        let mut cache = self.universe.lock().await;
        if let Some(names) = cache.as_ref() {
            return Ok(names.clone());
        }
        let meta: Meta = self.post_info(json!({"type": "meta"})).await?;
        let names: Vec<String> = meta.universe.into_iter().map(|a| a.name).collect();
        debug!("Loaded {} assets from universe", names.len());
        *cache = Some(names.clone());
        Ok(names)
    }

    async fn coin_for_asset(&self, asset: u32) -> Result<String> {
        let names = self.universe_names().await?;
        names
            .get(asset as usize)
            .cloned()
            .ok_or_else(|| Error::AssetNotFound(format!("asset index {asset}")))
    }

    fn nonce() -> u64 {
        Utc::now().timestamp_millis() as u64
    }
}

#[async_trait]
impl ExchangeApi for HyperliquidClient {
    async fn market_data(&self, symbol: &str) -> Result<MarketData> {
        let book: L2BookResponse = self
            .post_info(json!({"type": "l2Book", "coin": symbol}))
            .await?;

        let best_bid = book
            .levels
            .first()
            .and_then(|side| side.first())
            .ok_or_else(|| Error::Parse(format!("l2Book for {symbol} has no bids")))?;
        let best_ask = book
            .levels
            .get(1)
            .and_then(|side| side.first())
            .ok_or_else(|| Error::Parse(format!("l2Book for {symbol} has no asks")))?;

        let bid_price = parse_decimal(&best_bid.px, "bid px")?;
        let ask_price = parse_decimal(&best_ask.px, "ask px")?;

        // Prefer the exchange-reported mid; fall back to the book midpoint
        let mids: HashMap<String, String> = self.post_info(json!({"type": "allMids"})).await?;
        let mid_price = match mids.get(symbol) {
            Some(raw) => parse_decimal(raw, "mid px")?,
            None => (bid_price + ask_price) / Decimal::TWO,
        };
        if mid_price <= Decimal::ZERO {
            return Err(Error::Parse(format!("non-positive mid {mid_price} for {symbol}")));
        }

        Ok(MarketData {
            symbol: symbol.to_string(),
            mid_price,
            bid_price,
            ask_price,
            timestamp: Utc::now(),
        })
    }

    async fn account_state(&self) -> Result<AccountState> {
        let state: ClearinghouseState = self
            .post_info(json!({"type": "clearinghouseState", "user": self.user_address}))
            .await?;
        state.try_into()
    }

    async fn open_orders(&self) -> Result<Vec<Order>> {
        let wires: Vec<OpenOrderWire> = self
            .post_info(json!({"type": "openOrders", "user": self.user_address}))
            .await?;
        wires.into_iter().map(Order::try_from).collect()
    }

    async fn place_limit_order(
        &self,
        symbol: &str,
        asset: u32,
        side: OrderSide,
        price: Decimal,
        size: Decimal,
    ) -> Result<u64> {
        if price <= Decimal::ZERO || size <= Decimal::ZERO {
            return Err(Error::Rejected(format!(
                "non-positive price {price} or size {size}"
            )));
        }

        let action = OrderAction::new(vec![OrderWire {
            a: asset,
            b: side == OrderSide::Buy,
            p: wire_decimal(price),
            s: wire_decimal(size),
            r: false,
            t: OrderTypeWire::gtc(),
        }]);

        let nonce = Self::nonce();
        let signature = sign_l1_action(&self.signer, &action, nonce, self.base)?;
        let response = self
            .post_exchange(serde_json::to_value(&action)?, nonce, signature)
            .await?;

        match Self::first_status(response)? {
            ExchangeDataStatus::Resting(resting) => {
                debug!("Order resting: {symbol} {side:?} {size} @ {price}, oid {}", resting.oid);
                Ok(resting.oid)
            }
            ExchangeDataStatus::Filled(filled) => {
                debug!("Order crossed immediately: {symbol} oid {}", filled.oid);
                Ok(filled.oid)
            }
            ExchangeDataStatus::Error(message) => Err(Error::Rejected(message)),
            other => Err(Error::Parse(format!("unexpected order status {other:?}"))),
        }
    }

    async fn cancel_order(&self, asset: u32, order_id: u64) -> Result<bool> {
        let action = CancelAction::new(vec![CancelWire {
            a: asset,
            o: order_id,
        }]);
        let nonce = Self::nonce();
        let signature = sign_l1_action(&self.signer, &action, nonce, self.base)?;
        let response = self
            .post_exchange(serde_json::to_value(&action)?, nonce, signature)
            .await?;

        match Self::first_status(response)? {
            ExchangeDataStatus::Success => Ok(true),
            ExchangeDataStatus::Error(message) => {
                warn!("Cancel of oid {order_id} declined: {message}");
                Ok(false)
            }
            other => Err(Error::Parse(format!("unexpected cancel status {other:?}"))),
        }
    }

    async fn cancel_all_orders(&self, asset: u32) -> Result<u32> {
        let coin = self.coin_for_asset(asset).await?;
        let orders = self.open_orders().await?;
        let cancels: Vec<CancelWire> = orders
            .iter()
            .filter(|o| o.symbol == coin)
            .map(|o| CancelWire { a: asset, o: o.id })
            .collect();
        if cancels.is_empty() {
            return Ok(0);
        }

        let total = cancels.len();
        let action = CancelAction::new(cancels);
        let nonce = Self::nonce();
        let signature = sign_l1_action(&self.signer, &action, nonce, self.base)?;
        let response = self
            .post_exchange(serde_json::to_value(&action)?, nonce, signature)
            .await?;

        let mut removed = 0u32;
        for status in Self::statuses(response)? {
            match status {
                ExchangeDataStatus::Success => removed += 1,
                ExchangeDataStatus::Error(message) => {
                    warn!("Cancel declined during sweep: {message}")
                }
                other => warn!("Unexpected status during sweep: {other:?}"),
            }
        }
        debug!("Cancelled {removed}/{total} orders on {coin}");
        Ok(removed)
    }

    async fn asset_index(&self, symbol: &str) -> Result<u32> {
        let names = self.universe_names().await?;
        names
            .iter()
            .position(|name| name == symbol)
            .map(|index| index as u32)
            .ok_or_else(|| Error::AssetNotFound(symbol.to_string()))
    }

    async fn spot_usdc_balance(&self) -> Result<Decimal> {
        let state: SpotClearinghouseState = self
            .post_info(json!({"type": "spotClearinghouseState", "user": self.user_address}))
            .await?;
        match state.balances.iter().find(|b| b.coin == "USDC") {
            Some(balance) => parse_decimal(&balance.total, "spot USDC total"),
            None => Ok(Decimal::ZERO),
        }
    }

    async fn transfer_spot_to_perps(&self, amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(Error::Rejected(format!(
                "transfer amount must be positive, got {amount}"
            )));
        }

        let nonce = Self::nonce();
        let amount_wire = wire_decimal(amount);
        let signature =
            sign_usd_class_transfer(&self.signer, self.base, &amount_wire, true, nonce)?;

        let action = UsdClassTransferAction {
            r#type: "usdClassTransfer".to_string(),
            amount: amount_wire,
            to_perp: true,
            nonce,
            signature_chain_id: format!("0x{:x}", self.base.signature_chain_id()),
            hyperliquid_chain: self.base.hyperliquid_chain().to_string(),
        };

        self.post_exchange(serde_json::to_value(&action)?, nonce, signature)
            .await?;
        Ok(())
    }
}
