//! `scriptSig`/`scriptPubKey` as opaque byte strings.
//!
//! The script *interpreter* (evaluating `scriptSig` against `scriptPubKey`) is
//! out of scope (`spec.md` §1): it belongs to a host that actually spends coins.
//! The consensus core only needs the handful of structural predicates Bitcoin
//! Core computes without running the interpreter at all.

use serde::{Deserialize, Serialize};

use crate::serde_hexstr_human_readable;

const OP_RETURN: u8 = 0x6a;
const OP_HASH160: u8 = 0xa9;
const OP_DUP: u8 = 0x76;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;

/// An opaque, unparsed script.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Script(#[serde(with = "serde_hexstr_human_readable")] pub Vec<u8>);

impl Script {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `CScript::IsUnspendable`: starts with `OP_RETURN`, or is larger than the
    /// maximum script size Bitcoin Core ever accepts into a `scriptPubKey`.
    pub fn is_unspendable(&self) -> bool {
        const MAX_SCRIPT_SIZE: usize = 10_000;
        matches!(self.0.first(), Some(&op) if op == OP_RETURN) || self.0.len() > MAX_SCRIPT_SIZE
    }

    /// `CScript::IsPayToPubkeyHash`-equivalent, used only by tests to build a
    /// realistic non-unspendable `scriptPubKey`.
    pub fn pay_to_pubkey_hash(hash160: [u8; 20]) -> Self {
        let mut buf = Vec::with_capacity(25);
        buf.push(OP_DUP);
        buf.push(OP_HASH160);
        buf.push(0x14);
        buf.extend_from_slice(&hash160);
        buf.push(OP_EQUALVERIFY);
        buf.push(OP_CHECKSIG);
        Self(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_return_is_unspendable() {
        assert!(Script::new(vec![OP_RETURN]).is_unspendable());
        assert!(Script::new(vec![OP_RETURN, 0x01, 0xff]).is_unspendable());
    }

    #[test]
    fn p2pkh_is_spendable() {
        let script = Script::pay_to_pubkey_hash([0u8; 20]);
        assert!(!script.is_unspendable());
    }
}
