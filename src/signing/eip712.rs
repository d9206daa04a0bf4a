//! EIP-712 domains and struct hashing for the two exchange signing schemes

use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::sol;
use alloy::sol_types::{eip712_domain, Eip712Domain, SolStruct};

/// Chain id pinned by the L1 agent domain regardless of network
pub const L1_CHAIN_ID: u64 = 1337;

sol! {
    /// Phantom agent whose connectionId commits to the real action bytes,
    /// keeping the full action type out of the signer domain
    struct Agent {
        string source;
        bytes32 connectionId;
    }
}

fn l1_domain() -> Eip712Domain {
    eip712_domain! {
        name: "Exchange",
        version: "1",
        chain_id: L1_CHAIN_ID,
        verifying_contract: Address::ZERO,
    }
}

fn user_signed_domain(chain_id: u64) -> Eip712Domain {
    eip712_domain! {
        name: "HyperliquidSignTransaction",
        version: "1",
        chain_id: chain_id,
        verifying_contract: Address::ZERO,
    }
}

/// Digest for an L1 action: the agent struct under the fixed Exchange
/// domain. `source` is "a" on mainnet, "b" on testnet.
pub fn l1_digest(source: &str, connection_id: B256) -> B256 {
    let agent = Agent {
        source: source.to_string(),
        connectionId: connection_id,
    };
    agent.eip712_signing_hash(&l1_domain())
}

/// Digest for a spot<->perp class transfer.
///
/// The struct type carries a namespaced name the `sol!` grammar cannot
/// express, so the struct hash is assembled by hand: string fields are
/// keccak-hashed, the uint64 is left-padded to 32 bytes.
pub fn usd_class_transfer_digest(
    chain_id: u64,
    hyperliquid_chain: &str,
    destination: &str,
    amount: &str,
    time: u64,
) -> B256 {
    const TYPE: &str = "HyperliquidTransaction:UsdClassTransfer(string hyperliquidChain,string destination,string amount,uint64 time)";

    let mut encoded = Vec::with_capacity(32 * 5);
    encoded.extend_from_slice(keccak256(TYPE.as_bytes()).as_slice());
    encoded.extend_from_slice(keccak256(hyperliquid_chain.as_bytes()).as_slice());
    encoded.extend_from_slice(keccak256(destination.as_bytes()).as_slice());
    encoded.extend_from_slice(keccak256(amount.as_bytes()).as_slice());
    encoded.extend_from_slice(&U256::from(time).to_be_bytes::<32>());
    let struct_hash = keccak256(&encoded);

    let domain_separator = user_signed_domain(chain_id).hash_struct();

    let mut payload = Vec::with_capacity(2 + 32 + 32);
    payload.extend_from_slice(&[0x19, 0x01]);
    payload.extend_from_slice(domain_separator.as_slice());
    payload.extend_from_slice(struct_hash.as_slice());
    keccak256(&payload)
}
