//! Deterministic EIP-712 signing of exchange actions.
//!
//! Two schemes: L1 actions (orders, cancels) sign a phantom agent whose
//! `connectionId` is the keccak of the serialized action; user-signed
//! actions (class transfers) sign the typed struct directly under the
//! HyperliquidSignTransaction domain.

pub mod action;
pub mod eip712;

use alloy::primitives::B256;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::helpers::BaseUrl;

pub use action::{
    action_hash, CancelAction, CancelWire, LimitWire, OrderAction, OrderTypeWire, OrderWire,
    UsdClassTransferAction,
};

/// ECDSA signature rendered the way the exchange expects it: 32-byte
/// big-endian `r` and `s` as 0x-prefixed lowercase hex, `v` in {27, 28}.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    pub r: String,
    pub s: String,
    pub v: u8,
}

/// Sign an order or cancel action under the phantom-agent scheme
pub fn sign_l1_action<T: Serialize>(
    signer: &PrivateKeySigner,
    action: &T,
    nonce: u64,
    base: BaseUrl,
) -> Result<Signature> {
    let connection_id = action::action_hash(action, nonce, None)?;
    let digest = eip712::l1_digest(base.agent_source(), connection_id);
    sign_digest(signer, digest)
}

/// Sign a spot<->perp transfer under the user-signed scheme
pub fn sign_usd_class_transfer(
    signer: &PrivateKeySigner,
    base: BaseUrl,
    amount: &str,
    to_perp: bool,
    time: u64,
) -> Result<Signature> {
    let destination = if to_perp { "perp" } else { "spot" };
    let digest = eip712::usd_class_transfer_digest(
        base.signature_chain_id(),
        base.hyperliquid_chain(),
        destination,
        amount,
        time,
    );
    sign_digest(signer, digest)
}

fn sign_digest(signer: &PrivateKeySigner, digest: B256) -> Result<Signature> {
    let signature = signer
        .sign_hash_sync(&digest)
        .map_err(|e| Error::Signing(e.to_string()))?;

    Ok(Signature {
        r: format!("0x{:064x}", signature.r()),
        s: format!("0x{:064x}", signature.s()),
        v: 27 + signature.v() as u8,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> PrivateKeySigner {
        "0x0123456789012345678901234567890123456789012345678901234567890123"
            .parse()
            .unwrap()
    }

    fn sample_action() -> OrderAction {
        OrderAction::new(vec![OrderWire {
            a: 0,
            b: true,
            p: "50000".to_string(),
            s: "0.001".to_string(),
            r: false,
            t: OrderTypeWire::gtc(),
        }])
    }

    #[test]
    fn test_signature_shape() {
        let sig = sign_l1_action(&signer(), &sample_action(), 1700000000000, BaseUrl::Testnet)
            .unwrap();

        assert!(sig.r.starts_with("0x") && sig.r.len() == 66);
        assert!(sig.s.starts_with("0x") && sig.s.len() == 66);
        assert!(sig.r[2..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(sig.r[2..], sig.r[2..].to_lowercase());
        assert!(sig.v == 27 || sig.v == 28);
    }

    #[test]
    fn test_signing_is_deterministic() {
        let first =
            sign_l1_action(&signer(), &sample_action(), 1700000000000, BaseUrl::Mainnet).unwrap();
        let second =
            sign_l1_action(&signer(), &sample_action(), 1700000000000, BaseUrl::Mainnet).unwrap();
        assert_eq!(first.r, second.r);
        assert_eq!(first.s, second.s);
        assert_eq!(first.v, second.v);
    }

    #[test]
    fn test_nonce_changes_signature() {
        let first =
            sign_l1_action(&signer(), &sample_action(), 1700000000000, BaseUrl::Mainnet).unwrap();
        let second =
            sign_l1_action(&signer(), &sample_action(), 1700000000001, BaseUrl::Mainnet).unwrap();
        assert!(first.r != second.r || first.s != second.s);
    }

    #[test]
    fn test_networks_sign_differently() {
        let mainnet =
            sign_l1_action(&signer(), &sample_action(), 1700000000000, BaseUrl::Mainnet).unwrap();
        let testnet =
            sign_l1_action(&signer(), &sample_action(), 1700000000000, BaseUrl::Testnet).unwrap();
        assert!(mainnet.r != testnet.r || mainnet.s != testnet.s);
    }

    #[test]
    fn test_transfer_signature_shape() {
        let sig =
            sign_usd_class_transfer(&signer(), BaseUrl::Mainnet, "123.45", true, 1700000000000)
                .unwrap();
        assert!(sig.r.starts_with("0x") && sig.r.len() == 66);
        assert!(sig.v == 27 || sig.v == 28);
    }
}
