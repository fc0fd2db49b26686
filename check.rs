//! Context-free transaction validation: `CheckTransaction` in
//! `consensus/tx_verify.cpp`, translated check-for-check into a `Result`
//! pipeline instead of `state.DoS(...)` out-parameters.

use std::collections::BTreeSet;

use crate::error::{RejectReason, ValidationState};
use crate::hashes::{money_range, sha256, sha256d};
use crate::icann::is_icann_name;
use crate::signature::recover_and_verify;
use crate::transaction::{
    serialize_txout, Transaction, TRANSACTION_BITNAME_CREATE_VERSION,
    TRANSACTION_BITNAME_REGISTER_ICANN_VERSION, TRANSACTION_BITNAME_UPDATE_VERSION,
};

/// `WITNESS_SCALE_FACTOR`/`MAX_BLOCK_WEIGHT` from `consensus/consensus.h`: the
/// oversize check is computed against the witness-free serialization times
/// this factor, not the raw byte count.
const WITNESS_SCALE_FACTOR: u64 = 4;
const MAX_BLOCK_WEIGHT: u64 = 4_000_000;

fn reject(reason: RejectReason) -> ValidationState {
    let state = ValidationState::new(reason);
    tracing::debug!(reason = %state.reason, dos_score = state.dos_score, "transaction rejected");
    state
}

/// `CheckTransaction`. `check_duplicate_inputs` mirrors `fCheckDuplicateInputs`:
/// a block validator already screens duplicate inputs cheaply elsewhere and
/// may skip the (slower) `O(n log n)` check done here.
pub fn check_transaction(tx: &Transaction, check_duplicate_inputs: bool) -> Result<(), ValidationState> {
    let txid = tx.txid();
    tracing::trace!(%txid, version = tx.version(), "checking transaction");
    if tx.inputs().is_empty() {
        return Err(reject(RejectReason::VinEmpty));
    }
    if tx.outputs().is_empty() {
        return Err(reject(RejectReason::VoutEmpty));
    }
    let weight = tx.serialize_no_witness().len() as u64 * WITNESS_SCALE_FACTOR;
    if weight > MAX_BLOCK_WEIGHT {
        return Err(reject(RejectReason::Oversize {
            weight,
            max: MAX_BLOCK_WEIGHT,
        }));
    }

    let is_create = tx.version() == TRANSACTION_BITNAME_CREATE_VERSION;
    let is_update = tx.version() == TRANSACTION_BITNAME_UPDATE_VERSION;
    let is_bitname = is_create || is_update;
    let is_icann_batch = tx.version() == TRANSACTION_BITNAME_REGISTER_ICANN_VERSION;

    if is_create && tx.outputs().is_empty() {
        return Err(reject(RejectReason::CreateBitNameVoutSize));
    }

    if is_create {
        let create = tx.payload().as_create().expect("create payload on v=10 tx");
        if create.is_registration() && create.is_icann {
            let registration_output_hash = sha256d(&serialize_txout(&tx.outputs()[0]));
            let mut preimage = Vec::with_capacity(64);
            preimage.extend_from_slice(create.name_hash.as_bytes());
            preimage.extend_from_slice(registration_output_hash.as_bytes());
            let digest = sha256(&preimage);
            let sig = create.icann_sig.as_ref().expect("icann_sig when is_icann");
            recover_and_verify(digest, sig).map_err(|_| reject(RejectReason::BadIcannSig))?;
        }
    }

    let mut icann_names_count = 0usize;
    if is_icann_batch {
        let (registrations, _sig) = tx.payload().as_icann_batch().expect("icann batch payload");
        icann_names_count = registrations.len();
        if tx.outputs().len() < registrations.len() {
            return Err(reject(RejectReason::RegisterIcannVoutSize));
        }
        let mut hashes = Vec::with_capacity(registrations.len());
        for name in registrations {
            if !is_icann_name(name) {
                return Err(reject(RejectReason::RegisterIcannInvalidName {
                    name: name.clone(),
                }));
            }
            hashes.push(sha256d(name.as_bytes()));
        }
        hashes.sort();
        if hashes.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(reject(RejectReason::RegisterIcannBadRegistrations));
        }
    }

    if is_update {
        let (has_commitment, has_in4, _commitment, _in4, cpk) =
            tx.payload().as_update().expect("update payload on v=11 tx");
        if !(has_commitment || has_in4 || cpk.is_some()) {
            return Err(reject(RejectReason::UpdateBitNameNoUpdates));
        }
    }

    let name_carrying_count = if is_bitname {
        1
    } else if is_icann_batch {
        icann_names_count
    } else {
        0
    };
    let mut value_out: i64 = 0;
    for (index, output) in tx.outputs().iter().enumerate() {
        if index < name_carrying_count {
            if output.value > 1 {
                return Err(reject(RejectReason::VoutToolarge { index }));
            }
            if output.value < 0 {
                return Err(reject(RejectReason::VoutNegative { index }));
            }
            continue;
        }
        if output.value < 0 {
            return Err(reject(RejectReason::VoutNegative { index }));
        }
        if !money_range(output.value) {
            return Err(reject(RejectReason::VoutToolarge { index }));
        }
        value_out += output.value;
        if !money_range(value_out) {
            return Err(reject(RejectReason::TxOutTotalToolarge));
        }
    }

    if check_duplicate_inputs {
        let mut seen = BTreeSet::new();
        for input in tx.inputs() {
            if !seen.insert(input.previous_output) {
                return Err(reject(RejectReason::InputsDuplicate(input.previous_output)));
            }
        }
    }

    if tx.is_coinbase() {
        let script_len = tx.inputs()[0].script_sig.len();
        if !(2..=100).contains(&script_len) {
            return Err(reject(RejectReason::BadCoinbaseLength));
        }
    } else {
        for (index, input) in tx.inputs().iter().enumerate() {
            if input.previous_output.is_null() {
                return Err(reject(RejectReason::PrevoutNull { index }));
            }
        }
    }

    Ok(())
}
