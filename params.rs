//! Per-network chain parameters: grounded on `CMainParams`/`CRegTestParams` in
//! `chainparams.cpp`, with the BIP9-style deployment table patterned after
//! `zebra-chain`'s `NetworkUpgrade` activation-height lookup
//! (`BTreeMap<height, _>` queried by range) rather than the original's
//! array-of-structs-plus-linear-scan.

use std::collections::BTreeMap;

use bitcoin::secp256k1::{Secp256k1, SecretKey};

use crate::hashes::{sha256, sha256d, Amount, Hash256};
use crate::script::Script;
use crate::transaction::{OutPoint, Transaction, TransactionBuilder, TxIn, TxOut};

pub const COINBASE_MATURITY: u32 = 100;

/// `nHeight` a deployment is active from forever, used by deployments with no
/// real activation window (the consensus rule is simply always in force).
pub const ALWAYS_ACTIVE: u32 = 0;

/// Sentinel meaning a BIP9 deployment window never times out.
pub const NO_TIMEOUT: u32 = u32::MAX;

/// One BIP9-style deployment window: the rule is only consulted for blocks at
/// or above `start_height`; `timeout_height` bounds how long signaling can run
/// before the deployment is abandoned. Neither original field is a real
/// calendar time in this crate (no block-time model here) — both are block
/// heights, which is the simplification a consensus core with no P2P/mining
/// component can make without losing the shape of the original mechanism.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Deployment {
    pub start_height: u32,
    pub timeout_height: u32,
}

impl Deployment {
    pub const fn always_active() -> Self {
        Self {
            start_height: ALWAYS_ACTIVE,
            timeout_height: NO_TIMEOUT,
        }
    }

    pub fn is_active(&self, height: u32) -> bool {
        height >= self.start_height && height < self.timeout_height
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Network {
    Main,
    Regtest,
}

/// The two BIP9-gated deployments this crate tracks. `spec.md` §4.H lists a
/// third ("testdummy"); §2 drops it here as test-only with no consensus
/// meaning outside the original's regression suite.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Upgrade {
    Csv,
    Segwit,
}

/// A full parameter set for one network: magic bytes, address prefixes,
/// subsidy schedule, deployment windows and the ICANN registration key hash.
/// Grounded on `CChainParams`'s data members in `chainparams.cpp`; the
/// proof-of-work/targeting fields a block validator would need are out of
/// scope here (§1 excludes block validation) and are not reproduced.
pub struct ChainParams {
    pub network: Network,
    pub subsidy_halving_interval: u32,
    pub pch_message_start: [u8; 4],
    pub default_port: u16,
    pub pubkey_address_prefix: u8,
    pub script_address_prefix: u8,
    pub bech32_hrp: &'static str,
    /// SHA-256 hash of the compressed pubkey authorized to sign ICANN batch
    /// registrations. Mainnet carries the original's placeholder zero pending
    /// real key issuance (§9); regtest derives a fixed test key from a
    /// passphrase so the batch path is exercisable in tests.
    pub icann_registration_key_hash: Hash256,
    deployments: BTreeMap<Upgrade, Deployment>,
}

impl ChainParams {
    pub fn main() -> Self {
        let mut deployments = BTreeMap::new();
        deployments.insert(Upgrade::Csv, Deployment::always_active());
        deployments.insert(Upgrade::Segwit, Deployment::always_active());
        Self {
            network: Network::Main,
            subsidy_halving_interval: 210_000,
            pch_message_start: [0x1a, 0xc2, 0x18, 0x3d],
            default_port: 2600,
            pubkey_address_prefix: 125,
            script_address_prefix: 5,
            bech32_hrp: "sc",
            icann_registration_key_hash: Hash256::default(),
            deployments,
        }
    }

    pub fn regtest() -> Self {
        let mut deployments = BTreeMap::new();
        deployments.insert(Upgrade::Csv, Deployment::always_active());
        deployments.insert(Upgrade::Segwit, Deployment::always_active());
        Self {
            network: Network::Regtest,
            subsidy_halving_interval: 150,
            pch_message_start: [0x36, 0x4d, 0x1c, 0x0c],
            default_port: 12744,
            pubkey_address_prefix: 111,
            script_address_prefix: 5,
            bech32_hrp: "sc",
            icann_registration_key_hash: regtest_icann_key_hash(),
            deployments,
        }
    }

    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Main => Self::main(),
            Network::Regtest => Self::regtest(),
        }
    }

    pub fn deployment(&self, upgrade: Upgrade) -> Deployment {
        self.deployments
            .get(&upgrade)
            .copied()
            .unwrap_or(Deployment {
                start_height: NO_TIMEOUT,
                timeout_height: NO_TIMEOUT,
            })
    }

    pub fn is_active(&self, upgrade: Upgrade, height: u32) -> bool {
        self.deployment(upgrade).is_active(height)
    }

    /// A pure constructor for the height-0 coinbase (`CreateGenesisBlock` in
    /// the original, minus the surrounding block header and the debug
    /// `printf` calls §9 flags for removal — a library has no business
    /// printing to stdout, and this crate's own lints forbid it).
    pub fn genesis_coinbase(&self) -> Transaction {
        let reward: Amount = 50 * 100_000_000;
        TransactionBuilder::new(crate::transaction::CURRENT_VERSION)
            .input(TxIn {
                previous_output: OutPoint::null(),
                script_sig: Script::new(b"nnnnnn:0xnnnnnnnnnnnnnnnnnnnnnnnnnnnnnnnn".to_vec()),
                sequence: 0xffff_ffff,
                witness: Vec::new(),
            })
            .output(TxOut {
                value: reward,
                script_pubkey: genesis_output_script(),
            })
            .finish()
    }
}

/// A fixed, well-known pay-to-pubkey script, standing in for the original's
/// hardcoded genesis pubkey + `OP_CHECKSIG` output.
fn genesis_output_script() -> Script {
    let mut buf = Vec::with_capacity(35);
    buf.push(0x21); // push 33 bytes
    buf.extend_from_slice(&GENESIS_PUBKEY);
    buf.push(0xac); // OP_CHECKSIG
    Script::new(buf)
}

const GENESIS_PUBKEY: [u8; 33] = [
    0x02, 0x9e, 0x36, 0x54, 0x1e, 0xc8, 0x2e, 0x13, 0x15, 0x24, 0x1a, 0x6e, 0xde, 0x26, 0x17, 0x63,
    0x3f, 0x08, 0x54, 0xd6, 0x5f, 0x2a, 0x40, 0xcb, 0x4c, 0x68, 0xa2, 0xb2, 0xf9, 0xbb, 0x1e, 0x1c,
    0x7f,
];

/// Derives the regtest ICANN registration key hash from the fixed passphrase
/// `"layer two labs icann reg test"`: `CHash256(passphrase) -> SecretKey ->
/// PublicKey -> SHA256(compressed)`. Deterministic, so every regtest instance
/// of this crate agrees on the same authorized key without shipping one.
fn regtest_icann_key_hash() -> Hash256 {
    let seed = sha256d(b"layer two labs icann reg test");
    let sk = SecretKey::from_slice(seed.as_bytes()).expect("sha256d output is a valid scalar");
    let pk = sk.public_key(&Secp256k1::new());
    sha256(&pk.serialize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_deployments_are_always_active() {
        let params = ChainParams::main();
        assert!(params.is_active(Upgrade::Csv, 0));
        assert!(params.is_active(Upgrade::Segwit, 1_000_000));
    }

    #[test]
    fn mainnet_icann_key_hash_is_placeholder_zero() {
        assert!(ChainParams::main().icann_registration_key_hash.is_null());
    }

    #[test]
    fn regtest_icann_key_hash_is_deterministic_and_nonzero() {
        let a = ChainParams::regtest().icann_registration_key_hash;
        let b = ChainParams::regtest().icann_registration_key_hash;
        assert_eq!(a, b);
        assert!(!a.is_null());
    }

    #[test]
    fn genesis_coinbase_is_well_formed() {
        let params = ChainParams::regtest();
        let tx = params.genesis_coinbase();
        assert!(tx.is_coinbase());
        assert_eq!(tx.outputs().len(), 1);
        assert_eq!(tx.outputs()[0].value, 50 * 100_000_000);
    }

    #[test]
    fn for_network_matches_direct_constructors() {
        assert_eq!(
            ChainParams::for_network(Network::Main).default_port,
            ChainParams::main().default_port
        );
        assert_eq!(
            ChainParams::for_network(Network::Regtest).default_port,
            ChainParams::regtest().default_port
        );
    }
}
