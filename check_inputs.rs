//! Input-aware transaction validation: `Consensus::CheckTxInputs` in
//! `consensus/tx_verify.cpp`. Assumes [`crate::check::check_transaction`] has
//! already passed; this module only adds the checks that need the referenced
//! coins.

use crate::error::{RejectReason, ValidationState};
use crate::hashes::{money_range, sha256, sha256d, Amount};
use crate::params::{ChainParams, COINBASE_MATURITY};
use crate::signature::recover_and_verify;
use crate::transaction::{
    serialize_outpoints, serialize_strings, serialize_txouts, OutPoint, Transaction,
    TRANSACTION_BITNAME_CREATE_VERSION, TRANSACTION_BITNAME_REGISTER_ICANN_VERSION,
    TRANSACTION_BITNAME_UPDATE_VERSION,
};
use crate::view::View;

fn reject(reason: RejectReason) -> ValidationState {
    let state = ValidationState::new(reason);
    tracing::debug!(reason = %state.reason, dos_score = state.dos_score, "transaction inputs rejected");
    state
}

/// `Consensus::CheckTxInputs`. Returns the transaction's fee on success.
pub fn check_tx_inputs<V: View>(
    tx: &Transaction,
    view: &mut V,
    spend_height: u32,
    params: &ChainParams,
) -> Result<Amount, ValidationState> {
    let txid = tx.txid();
    tracing::trace!(%txid, spend_height, "checking transaction inputs");
    for input in tx.inputs() {
        if !view.has_coin(&input.previous_output) {
            return Err(reject(RejectReason::InputsMissingOrSpent(input.previous_output)));
        }
    }

    let is_create = tx.version() == TRANSACTION_BITNAME_CREATE_VERSION;
    let is_update = tx.version() == TRANSACTION_BITNAME_UPDATE_VERSION;
    let is_icann_batch = tx.version() == TRANSACTION_BITNAME_REGISTER_ICANN_VERSION;

    if is_create {
        let create = tx.payload().as_create().expect("create payload on v=10 tx");
        if create.is_registration() {
            let last_op = tx.inputs().last().expect("non-empty inputs").previous_output;
            let last_coin = view.get_coin(&last_op).expect("checked available above");
            if !last_coin.is_reservation {
                return Err(reject(RejectReason::InputsMissingReservation));
            }
            let mut preimage = Vec::with_capacity(64);
            preimage.extend_from_slice(create.name_hash.as_bytes());
            preimage.extend_from_slice(create.sok.as_bytes());
            let expected = sha256d(&preimage);
            if last_coin.commitment != expected {
                return Err(reject(RejectReason::InputsWrongCommitment));
            }
        }
    }

    if is_update {
        let last_op = tx.inputs().last().expect("non-empty inputs").previous_output;
        let last_coin = view.get_coin(&last_op).expect("checked available above");
        if !last_coin.carries_name() {
            return Err(reject(RejectReason::InputsMissingBitName));
        }
    }

    if is_icann_batch {
        let (registrations, icann_sig) = tx.payload().as_icann_batch().expect("icann batch payload");
        let mut bitcoin_input_found = false;
        let mut bitname_outpoints: Vec<OutPoint> = Vec::new();
        for (index, input) in tx.inputs().iter().enumerate() {
            let coin = view
                .get_coin(&input.previous_output)
                .expect("checked available above");
            if coin.carries_name() {
                if bitcoin_input_found {
                    return Err(reject(RejectReason::InputsUnexpectedBitName));
                }
                if index >= registrations.len() {
                    return Err(reject(RejectReason::InputsMissingRegistration));
                }
                let expected = sha256d(registrations[index].as_bytes());
                if expected != coin.asset_id {
                    return Err(reject(RejectReason::InputsWrongRegistration));
                }
                bitname_outpoints.push(input.previous_output);
            } else {
                bitcoin_input_found = true;
            }
        }

        let registration_outputs = &tx.outputs()[..registrations.len()];
        let mut preimage = Vec::new();
        preimage.extend_from_slice(&tx.version().to_le_bytes());
        preimage.extend_from_slice(sha256d(&serialize_outpoints(&bitname_outpoints)).as_bytes());
        preimage.extend_from_slice(sha256d(&serialize_txouts(registration_outputs)).as_bytes());
        preimage.extend_from_slice(&tx.lock_time().to_le_bytes());
        preimage.extend_from_slice(sha256d(&serialize_strings(registrations)).as_bytes());
        let auth_hash = sha256(&preimage);

        let pubkey = recover_and_verify(auth_hash, icann_sig).map_err(|_| reject(RejectReason::BadIcannSig))?;
        let recovered_hash = sha256(&pubkey.serialize());
        if recovered_hash != params.icann_registration_key_hash {
            return Err(reject(RejectReason::BadIcannSig));
        }
    }

    let mut value_in: Amount = 0;
    let last_index = tx.inputs().len() - 1;
    for (index, input) in tx.inputs().iter().enumerate() {
        let coin = view
            .get_coin(&input.previous_output)
            .expect("checked available above");

        if coin.is_coinbase {
            let matured = spend_height
                .checked_sub(coin.height)
                .is_some_and(|depth| depth >= COINBASE_MATURITY);
            if !matured {
                return Err(reject(RejectReason::PrematureSpendOfCoinbase {
                    input_height: coin.height,
                    spend_height,
                }));
            }
        }

        if !coin.has_asset() {
            value_in += coin.value;
        }
        if !money_range(coin.value) || !money_range(value_in) {
            return Err(reject(RejectReason::InputValuesOutOfRange));
        }

        if (is_create || is_update) && coin.has_asset() && index != last_index {
            return Err(reject(RejectReason::InputsUnexpectedAssets));
        }
    }

    let value_out = tx.value_out();
    if value_in < value_out {
        return Err(reject(RejectReason::FeeOutOfRange { value_in, value_out }));
    }
    let fee = value_in - value_out;
    if !money_range(fee) {
        return Err(reject(RejectReason::FeeOutOfRange { value_in, value_out }));
    }

    Ok(fee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coin::Coin;
    use crate::hashes::Hash256;
    use crate::script::Script;
    use crate::transaction::{Payload, TransactionBuilder, TxIn, TxOut, Txid};
    use crate::view::{CacheView, HashMapView};
    use std::net::Ipv4Addr;

    fn reservation_op() -> OutPoint {
        OutPoint {
            txid: Txid(Hash256::new([1u8; 32])),
            index: 0,
        }
    }

    fn fee_input_op() -> OutPoint {
        OutPoint {
            txid: Txid(Hash256::new([2u8; 32])),
            index: 0,
        }
    }

    /// E2: a reservation coin committing to `h = SHA256d(name_hash || sok)`,
    /// spent by a registration whose last input is the reservation.
    #[test]
    fn e2_registration_accepts_matching_commitment() {
        let name_hash = sha256d(b"alice");
        let sok = Hash256::new([0x42; 32]);
        let mut preimage = Vec::new();
        preimage.extend_from_slice(name_hash.as_bytes());
        preimage.extend_from_slice(sok.as_bytes());
        let commitment = sha256d(&preimage);

        let mut backing = HashMapView::new();
        backing.insert(
            reservation_op(),
            Coin::new(
                TxOut {
                    value: 1,
                    script_pubkey: Script::default(),
                },
                100,
                false,
                true,
                false,
                Hash256::new([0x99; 32]),
                commitment,
            ),
        );
        backing.insert(
            fee_input_op(),
            Coin::new(
                TxOut {
                    value: 10_000,
                    script_pubkey: Script::default(),
                },
                50,
                false,
                false,
                false,
                Hash256::default(),
                Hash256::default(),
            ),
        );
        let mut view = CacheView::new(backing);

        let tx = TransactionBuilder::new(TRANSACTION_BITNAME_CREATE_VERSION)
            .input(TxIn {
                previous_output: fee_input_op(),
                script_sig: Script::default(),
                sequence: 0xffff_ffff,
                witness: Vec::new(),
            })
            .input(TxIn {
                previous_output: reservation_op(),
                script_sig: Script::default(),
                sequence: 0xffff_ffff,
                witness: Vec::new(),
            })
            .output(TxOut {
                value: 1,
                script_pubkey: Script::default(),
            })
            .output(TxOut {
                value: 9_000,
                script_pubkey: Script::default(),
            })
            .payload(Payload::Create {
                has_in4: false,
                commitment,
                name_hash,
                sok,
                in4: Ipv4Addr::UNSPECIFIED,
                cpk: None,
                is_icann: false,
                icann_sig: None,
            })
            .finish();

        let params = ChainParams::regtest();
        let fee = check_tx_inputs(&tx, &mut view, 101, &params).unwrap();
        // the reservation coin carries an asset id, so its value (1) is excluded
        // from value_in: 10_000 in, 9_000 + 1 out, fee 999.
        assert_eq!(fee, 999);
    }

    #[test]
    fn registration_rejects_wrong_commitment() {
        let name_hash = sha256d(b"alice");
        let sok = Hash256::new([0x42; 32]);
        let wrong_commitment = Hash256::new([0xff; 32]);

        let mut backing = HashMapView::new();
        backing.insert(
            reservation_op(),
            Coin::new(
                TxOut {
                    value: 1,
                    script_pubkey: Script::default(),
                },
                100,
                false,
                true,
                false,
                Hash256::default(),
                wrong_commitment,
            ),
        );
        let mut view = CacheView::new(backing);

        let tx = TransactionBuilder::new(TRANSACTION_BITNAME_CREATE_VERSION)
            .input(TxIn {
                previous_output: reservation_op(),
                script_sig: Script::default(),
                sequence: 0xffff_ffff,
                witness: Vec::new(),
            })
            .output(TxOut {
                value: 1,
                script_pubkey: Script::default(),
            })
            .payload(Payload::Create {
                has_in4: false,
                commitment: wrong_commitment,
                name_hash,
                sok,
                in4: Ipv4Addr::UNSPECIFIED,
                cpk: None,
                is_icann: false,
                icann_sig: None,
            })
            .finish();

        let params = ChainParams::regtest();
        let err = check_tx_inputs(&tx, &mut view, 101, &params).unwrap_err();
        assert_eq!(err.reason, RejectReason::InputsWrongCommitment);
    }

    #[test]
    fn coinbase_spend_before_maturity_is_rejected() {
        let op = OutPoint {
            txid: Txid(Hash256::new([9u8; 32])),
            index: 0,
        };
        let mut backing = HashMapView::new();
        backing.insert(
            op,
            Coin::new(
                TxOut {
                    value: 5_000_000_000,
                    script_pubkey: Script::default(),
                },
                100,
                true,
                false,
                false,
                Hash256::default(),
                Hash256::default(),
            ),
        );
        let mut view = CacheView::new(backing);
        let tx = TransactionBuilder::new(3)
            .input(TxIn {
                previous_output: op,
                script_sig: Script::default(),
                sequence: 0xffff_ffff,
                witness: Vec::new(),
            })
            .output(TxOut {
                value: 1,
                script_pubkey: Script::default(),
            })
            .finish();
        let params = ChainParams::regtest();
        let err = check_tx_inputs(&tx, &mut view, 150, &params).unwrap_err();
        assert_eq!(
            err.reason,
            RejectReason::PrematureSpendOfCoinbase {
                input_height: 100,
                spend_height: 150
            }
        );
    }

    #[test]
    fn missing_input_is_rejected() {
        let mut view = CacheView::new(HashMapView::new());
        let tx = TransactionBuilder::new(3)
            .input(TxIn {
                previous_output: reservation_op(),
                script_sig: Script::default(),
                sequence: 0xffff_ffff,
                witness: Vec::new(),
            })
            .output(TxOut {
                value: 1,
                script_pubkey: Script::default(),
            })
            .finish();
        let params = ChainParams::regtest();
        let err = check_tx_inputs(&tx, &mut view, 1, &params).unwrap_err();
        assert_eq!(
            err.reason,
            RejectReason::InputsMissingOrSpent(reservation_op())
        );
    }
}
