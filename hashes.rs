//! Fixed-width hash types and the two hash functions BitNames uses on the wire:
//! `SHA256d` (double SHA-256, for txids and outpoint-vector hashes) and plain
//! `SHA256` (for the ICANN signature digests).

use bitcoin::hashes::Hash as _;
use serde::{Deserialize, Serialize};

use crate::serde_hexstr_human_readable;

/// A fixed 32-byte hash value. Little-endian on the wire, big-endian (the
/// conventional block-explorer order) in `Display`/`Debug`.
#[derive(Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hash256(#[serde(with = "serde_hexstr_human_readable")] pub [u8; 32]);

impl Hash256 {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The all-zero sentinel value used throughout the spec (absent commitment,
    /// absent name hash, absent asset id, ...).
    pub const fn is_null(&self) -> bool {
        let mut i = 0;
        while i < 32 {
            if self.0[i] != 0 {
                return false;
            }
            i += 1;
        }
        true
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Displayed in reversed (big-endian) byte order, matching Bitcoin's txid
        // display convention.
        let mut reversed = self.0;
        reversed.reverse();
        write!(f, "{}", hex::encode(reversed))
    }
}

impl std::fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

/// `SHA256d(x) = SHA256(SHA256(x))`
pub fn sha256d(data: &[u8]) -> Hash256 {
    let digest = bitcoin::hashes::sha256d::Hash::hash(data);
    Hash256(digest.to_byte_array())
}

/// Incremental `SHA256d` sink, mirroring `CHash256::Write`/`Finalize` call sites
/// in the original source (e.g. the registration commitment and ICANN batch
/// auth hash, which are each built from several concatenated pieces).
#[derive(Default)]
pub struct Sha256dWriter(Vec<u8>);

impl Sha256dWriter {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn write(&mut self, bytes: &[u8]) -> &mut Self {
        self.0.extend_from_slice(bytes);
        self
    }

    pub fn finalize(&self) -> Hash256 {
        sha256d(&self.0)
    }
}

/// Single `SHA256`, used only for the ICANN signature digests (`CSHA256` in the
/// original, as distinct from `CHash256` which is `SHA256d`).
pub fn sha256(data: &[u8]) -> Hash256 {
    let digest = bitcoin::hashes::sha256::Hash::hash(data);
    Hash256(digest.to_byte_array())
}

#[derive(Default)]
pub struct Sha256Writer(Vec<u8>);

impl Sha256Writer {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn write(&mut self, bytes: &[u8]) -> &mut Self {
        self.0.extend_from_slice(bytes);
        self
    }

    pub fn finalize(&self) -> Hash256 {
        sha256(&self.0)
    }
}

/// Satoshi-denominated amount. Signed to mirror `CAmount`, so that subtraction
/// (fee accounting) cannot underflow silently before the range check runs.
pub type Amount = i64;

pub const MAX_MONEY: Amount = 21_000_000 * 100_000_000;

/// `MoneyRange(a)` holds iff `0 <= a <= MAX_MONEY`.
pub const fn money_range(amount: Amount) -> bool {
    amount >= 0 && amount <= MAX_MONEY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_hash_is_null() {
        assert!(Hash256::default().is_null());
        assert!(!Hash256(sha256d(b"x").0).is_null());
    }

    #[test]
    fn sha256d_matches_double_sha256() {
        let once = bitcoin::hashes::sha256::Hash::hash(b"bitnames");
        let twice = bitcoin::hashes::sha256::Hash::hash(once.as_byte_array());
        assert_eq!(sha256d(b"bitnames").0, twice.to_byte_array());
    }

    #[test]
    fn money_range_bounds() {
        assert!(money_range(0));
        assert!(money_range(MAX_MONEY));
        assert!(!money_range(MAX_MONEY + 1));
        assert!(!money_range(-1));
    }
}
