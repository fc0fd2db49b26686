//! The name-index contract (§6 "Name index contract (`NameRegistry`)"): a
//! read-only trait the consensus core references but never implements or
//! writes through. The disk format (`pbitnametree` in the original) is an
//! external indexer's concern, out of scope here (`spec.md` §1).

use crate::hashes::Hash256;
use crate::signature::PubKey;
use crate::transaction::Txid;

/// One revision of a registered name: the transaction that produced it and
/// the fields it set, mirroring the per-field history the original's
/// `bitnamescontacts`/name-index machinery (out of scope here) accumulates.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NameRevision {
    pub txid: Txid,
    pub commitment: Hash256,
    pub in4: Option<std::net::Ipv4Addr>,
    pub cpk: Option<PubKey>,
}

/// A single BitName's full history, keyed by its `name_hash` (reservations)
/// or its name hash derived at registration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BitName {
    pub name_hash: Hash256,
    pub history: Vec<NameRevision>,
}

impl BitName {
    pub fn history_of(&self) -> &[NameRevision] {
        &self.history
    }
}

/// Read-only lookup the consensus core is handed by a host indexer. Consensus
/// code reads only `Coin::asset_id`/`Coin::commitment` directly from the view
/// stack; this trait exists for the non-consensus callers (wallet, RPC) the
/// original source routes through `GetName`, and is never required by
/// [`crate::check`]/[`crate::check_inputs`]/[`crate::apply`] themselves.
pub trait NameRegistry {
    fn get_name(&self, name_hash: &Hash256) -> Option<BitName>;
    fn get_name_by_plaintext(&self, plaintext: &str) -> Option<BitName>;
}
