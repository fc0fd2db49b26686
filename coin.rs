//! The per-output record the view stack caches: `Coin::new`/`Clear`/
//! `DynamicMemoryUsage` in `coins.cpp`, extended with the name-asset tagging
//! fields `AddCoins` fills in.

use serde::{Deserialize, Serialize};

use crate::hashes::{Amount, Hash256};
use crate::script::Script;
use crate::transaction::TxOut;

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub value: Amount,
    pub script: Script,
    pub height: u32,
    pub is_coinbase: bool,
    pub is_reservation: bool,
    pub is_registration_or_holder: bool,
    pub asset_id: Hash256,
    pub commitment: Hash256,
    pub spent: bool,
}

impl Coin {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        out: TxOut,
        height: u32,
        is_coinbase: bool,
        is_reservation: bool,
        is_registration_or_holder: bool,
        asset_id: Hash256,
        commitment: Hash256,
    ) -> Self {
        Self {
            value: out.value,
            script: out.script_pubkey,
            height,
            is_coinbase,
            is_reservation,
            is_registration_or_holder,
            asset_id,
            commitment,
            spent: false,
        }
    }

    pub fn has_asset(&self) -> bool {
        !self.asset_id.is_null()
    }

    pub fn carries_name(&self) -> bool {
        self.is_reservation || self.is_registration_or_holder
    }

    /// Zeroes the output fields and marks the coin spent, leaving a tombstone
    /// behind for the view stack's FRESH/DIRTY bookkeeping.
    pub fn clear(&mut self) {
        self.value = 0;
        self.script = Script::default();
        self.asset_id = Hash256::default();
        self.commitment = Hash256::default();
        self.is_reservation = false;
        self.is_registration_or_holder = false;
        self.spent = true;
    }

    pub fn is_spent(&self) -> bool {
        self.spent
    }

    /// Heap footprint of the embedded script, used by the cache's
    /// `estimate_size` accounting (`DynamicMemoryUsage` in the original).
    pub fn dynamic_memory_usage(&self) -> usize {
        self.script.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_asset_implies_carries_name_for_well_formed_coins() {
        let coin = Coin::new(
            TxOut {
                value: 1,
                script_pubkey: Script::default(),
            },
            100,
            false,
            false,
            true,
            Hash256::new([1u8; 32]),
            Hash256::new([2u8; 32]),
        );
        assert!(coin.has_asset());
        assert!(coin.carries_name());
    }

    #[test]
    fn clear_zeros_and_marks_spent() {
        let mut coin = Coin::new(
            TxOut {
                value: 500,
                script_pubkey: Script::pay_to_pubkey_hash([1u8; 20]),
            },
            10,
            false,
            false,
            false,
            Hash256::default(),
            Hash256::default(),
        );
        coin.clear();
        assert!(coin.is_spent());
        assert_eq!(coin.value, 0);
        assert!(coin.script.is_empty());
    }
}
