//! Action wire types, serialized to msgpack for hashing and to JSON for
//! transport.
//!
//! Field order is load-bearing on both paths: the exchange re-packs the
//! JSON body preserving key order to verify the signature, so struct field
//! declaration order must match the reference SDK's insertion order.

use alloy::primitives::{keccak256, Address, B256};
use serde::Serialize;

use crate::errors::{Error, Result};

/// One order inside an order action: `a` asset, `b` is-buy, `p` price,
/// `s` size, `r` reduce-only, `t` order type.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWire {
    pub a: u32,
    pub b: bool,
    pub p: String,
    pub s: String,
    pub r: bool,
    pub t: OrderTypeWire,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderTypeWire {
    pub limit: LimitWire,
}

#[derive(Debug, Clone, Serialize)]
pub struct LimitWire {
    pub tif: String,
}

impl OrderTypeWire {
    /// Good-till-cancelled resting limit
    pub fn gtc() -> Self {
        Self {
            limit: LimitWire {
                tif: "Gtc".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderAction {
    pub r#type: String,
    pub orders: Vec<OrderWire>,
    pub grouping: String,
}

impl OrderAction {
    pub fn new(orders: Vec<OrderWire>) -> Self {
        Self {
            r#type: "order".to_string(),
            orders,
            grouping: "na".to_string(),
        }
    }
}

/// One cancel inside a cancel action: `a` asset, `o` order id
#[derive(Debug, Clone, Serialize)]
pub struct CancelWire {
    pub a: u32,
    pub o: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelAction {
    pub r#type: String,
    pub cancels: Vec<CancelWire>,
}

impl CancelAction {
    pub fn new(cancels: Vec<CancelWire>) -> Self {
        Self {
            r#type: "cancel".to_string(),
            cancels,
        }
    }
}

/// Scheme-B signed transfer between the spot and perp wallets
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsdClassTransferAction {
    pub r#type: String,
    pub amount: String,
    pub to_perp: bool,
    pub nonce: u64,
    pub signature_chain_id: String,
    pub hyperliquid_chain: String,
}

/// Hash an L1 action the way the exchange recomputes it: msgpack bytes,
/// then the nonce as 8 big-endian bytes, then the vault flag.
pub fn action_hash<T: Serialize>(
    action: &T,
    nonce: u64,
    vault_address: Option<Address>,
) -> Result<B256> {
    let mut data = Vec::new();
    let mut serializer = rmp_serde::Serializer::new(&mut data).with_struct_map();
    action
        .serialize(&mut serializer)
        .map_err(|e| Error::Signing(format!("msgpack encode: {e}")))?;

    data.extend_from_slice(&nonce.to_be_bytes());
    match vault_address {
        None => data.push(0x00),
        Some(address) => {
            data.push(0x01);
            data.extend_from_slice(address.as_slice());
        }
    }

    Ok(keccak256(&data))
}
