//! `AddCoins`: lifts a transaction's outputs into the view stack as coins,
//! tagging the asset identity and commitment according to the transaction's
//! version. Grounded on `AddCoins` in `coins.cpp`, generalized to the ICANN
//! batch case the original leaves with a `// FIXME: doesn't work for icann
//! batch registration` comment — that gap is closed below (§4.E).

use crate::coin::Coin;
use crate::error::CacheCorruption;
use crate::hashes::sha256d;
use crate::transaction::{
    OutPoint, Transaction, TRANSACTION_BITNAME_CREATE_VERSION, TRANSACTION_BITNAME_REGISTER_ICANN_VERSION,
    TRANSACTION_BITNAME_UPDATE_VERSION,
};
use crate::view::{CacheView, View};

/// Applies every output of `tx` to `view` at `height`. `check` mirrors the
/// original's `check` parameter: when true, `possible_overwrite` for each
/// output is derived from whether the view already has a coin there (the
/// permissive path used when re-applying a block that might already be
/// partially indexed); when false, only coinbase outputs are allowed to
/// overwrite.
pub fn add_coins<B: View>(
    view: &mut CacheView<B>,
    tx: &Transaction,
    height: u32,
    check: bool,
) -> Result<(), CacheCorruption> {
    let txid = tx.txid();
    let is_coinbase = tx.is_coinbase();
    tracing::trace!(%txid, height, version = tx.version(), "adding coins");
    match tx.version() {
        TRANSACTION_BITNAME_CREATE_VERSION => add_create(view, tx, txid, height, check),
        TRANSACTION_BITNAME_UPDATE_VERSION => add_update(view, tx, txid, height, check),
        TRANSACTION_BITNAME_REGISTER_ICANN_VERSION => add_icann_batch(view, tx, txid, height, check),
        _ => add_plain(view, tx, txid, height, check, is_coinbase),
    }
}

fn overwrite_for<B: View>(view: &mut CacheView<B>, op: &OutPoint, check: bool, default: bool) -> bool {
    if check {
        view.has_coin(op)
    } else {
        default
    }
}

fn add_create<B: View>(
    view: &mut CacheView<B>,
    tx: &Transaction,
    txid: crate::transaction::Txid,
    height: u32,
    check: bool,
) -> Result<(), CacheCorruption> {
    let create = tx.payload().as_create().expect("create payload on v=10 tx");
    let is_reservation = create.is_reservation();
    for (i, output) in tx.outputs().iter().enumerate() {
        let op = OutPoint { txid, index: i as u32 };
        let overwrite = overwrite_for(view, &op, check, false);
        let is_first = i == 0;
        let (asset_id, commitment) = if is_first {
            let asset_id = if is_reservation { txid.0 } else { *create.name_hash };
            (asset_id, *create.commitment)
        } else {
            (Default::default(), Default::default())
        };
        let coin = Coin::new(
            output.clone(),
            height,
            false,
            is_reservation && is_first,
            !is_reservation && is_first,
            asset_id,
            commitment,
        );
        view.add_coin(op, coin, overwrite)?;
    }
    Ok(())
}

fn add_update<B: View>(
    view: &mut CacheView<B>,
    tx: &Transaction,
    txid: crate::transaction::Txid,
    height: u32,
    check: bool,
) -> Result<(), CacheCorruption> {
    let (_, _, commitment, _, _) = tx.payload().as_update().expect("update payload on v=11 tx");
    let last_input = tx.inputs().last().expect("non-empty inputs (checked earlier)");
    let last_input_coin = view.get_coin(&last_input.previous_output);
    let asset_id = last_input_coin.map(|c| c.asset_id).unwrap_or_default();
    for (i, output) in tx.outputs().iter().enumerate() {
        let op = OutPoint { txid, index: i as u32 };
        let overwrite = overwrite_for(view, &op, check, false);
        let is_first = i == 0;
        let coin = Coin::new(
            output.clone(),
            height,
            false,
            false,
            is_first,
            if is_first { asset_id } else { Default::default() },
            if is_first { *commitment } else { Default::default() },
        );
        view.add_coin(op, coin, overwrite)?;
    }
    Ok(())
}

fn add_icann_batch<B: View>(
    view: &mut CacheView<B>,
    tx: &Transaction,
    txid: crate::transaction::Txid,
    height: u32,
    check: bool,
) -> Result<(), CacheCorruption> {
    let (registrations, _sig) = tx
        .payload()
        .as_icann_batch()
        .expect("icann batch payload on v=icann tx");
    let name_hashes: Vec<_> = registrations.iter().map(|name| sha256d(name.as_bytes())).collect();
    for (i, output) in tx.outputs().iter().enumerate() {
        let op = OutPoint { txid, index: i as u32 };
        let overwrite = overwrite_for(view, &op, check, false);
        let is_holder = i < registrations.len();
        let coin = Coin::new(
            output.clone(),
            height,
            false,
            false,
            is_holder,
            if is_holder { name_hashes[i] } else { Default::default() },
            Default::default(),
        );
        view.add_coin(op, coin, overwrite)?;
    }
    Ok(())
}

fn add_plain<B: View>(
    view: &mut CacheView<B>,
    tx: &Transaction,
    txid: crate::transaction::Txid,
    height: u32,
    check: bool,
    is_coinbase: bool,
) -> Result<(), CacheCorruption> {
    for (i, output) in tx.outputs().iter().enumerate() {
        let op = OutPoint { txid, index: i as u32 };
        let overwrite = overwrite_for(view, &op, check, is_coinbase);
        let coin = Coin::new(
            output.clone(),
            height,
            is_coinbase,
            false,
            false,
            Default::default(),
            Default::default(),
        );
        view.add_coin(op, coin, overwrite)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashes::Hash256;
    use crate::script::Script;
    use crate::transaction::{Payload, TransactionBuilder, TxIn, TxOut, Txid};
    use crate::view::{access_by_txid, HashMapView};
    use std::net::Ipv4Addr;

    fn sample_input() -> TxIn {
        TxIn {
            previous_output: OutPoint {
                txid: Txid(Hash256::new([1u8; 32])),
                index: 0,
            },
            script_sig: Script::default(),
            sequence: 0xffff_ffff,
            witness: Vec::new(),
        }
    }

    fn sample_output(value: i64) -> TxOut {
        TxOut {
            value,
            script_pubkey: Script::pay_to_pubkey_hash([9u8; 20]),
        }
    }

    #[test]
    fn reservation_tags_output_zero() {
        let mut view = CacheView::new(HashMapView::new());
        let tx = TransactionBuilder::new(TRANSACTION_BITNAME_CREATE_VERSION)
            .input(sample_input())
            .output(sample_output(1))
            .payload(Payload::Create {
                has_in4: false,
                commitment: Hash256::new([7u8; 32]),
                name_hash: Hash256::default(),
                sok: Hash256::default(),
                in4: Ipv4Addr::UNSPECIFIED,
                cpk: None,
                is_icann: false,
                icann_sig: None,
            })
            .finish();
        add_coins(&mut view, &tx, 10, false).unwrap();
        let op = OutPoint { txid: tx.txid(), index: 0 };
        let coin = view.get_coin(&op).unwrap();
        assert!(coin.is_reservation);
        assert_eq!(coin.asset_id, tx.txid().0);
        assert_eq!(coin.commitment, Hash256::new([7u8; 32]));
    }

    #[test]
    fn update_carries_forward_last_input_asset_id() {
        let mut backing = HashMapView::new();
        let holder_op = OutPoint {
            txid: Txid(Hash256::new([2u8; 32])),
            index: 0,
        };
        backing.insert(
            holder_op,
            Coin::new(
                sample_output(1),
                5,
                false,
                false,
                true,
                Hash256::new([0xaa; 32]),
                Hash256::new([0xbb; 32]),
            ),
        );
        let mut view = CacheView::new(backing);
        let tx = TransactionBuilder::new(TRANSACTION_BITNAME_UPDATE_VERSION)
            .input(TxIn {
                previous_output: holder_op,
                script_sig: Script::default(),
                sequence: 0xffff_ffff,
                witness: Vec::new(),
            })
            .output(sample_output(1))
            .payload(Payload::Update {
                has_commitment: true,
                has_in4: false,
                commitment: Hash256::new([0xcc; 32]),
                in4: Ipv4Addr::UNSPECIFIED,
                cpk: None,
            })
            .finish();
        add_coins(&mut view, &tx, 20, false).unwrap();
        let op = OutPoint { txid: tx.txid(), index: 0 };
        let coin = view.get_coin(&op).unwrap();
        assert_eq!(coin.asset_id, Hash256::new([0xaa; 32]));
        assert_eq!(coin.commitment, Hash256::new([0xcc; 32]));
    }

    #[test]
    fn icann_batch_tags_holder_prefix_only() {
        let mut view = CacheView::new(HashMapView::new());
        let tx = TransactionBuilder::new(TRANSACTION_BITNAME_REGISTER_ICANN_VERSION)
            .input(sample_input())
            .output(sample_output(1))
            .output(sample_output(5_000))
            .payload(Payload::IcannBatch {
                registrations: vec!["example.com".to_string()],
                icann_sig: crate::signature::CompactSignature([0u8; 64]),
            })
            .finish();
        add_coins(&mut view, &tx, 1, false).unwrap();
        let holder = view
            .get_coin(&OutPoint { txid: tx.txid(), index: 0 })
            .unwrap();
        assert!(holder.is_registration_or_holder);
        assert_eq!(holder.asset_id, sha256d(b"example.com"));
        let plain = view
            .get_coin(&OutPoint { txid: tx.txid(), index: 1 })
            .unwrap();
        assert!(!plain.is_registration_or_holder);
    }

    #[test]
    fn coinbase_outputs_allow_overwrite_without_check() {
        let mut view = CacheView::new(HashMapView::new());
        let tx = TransactionBuilder::new(1)
            .input(TxIn {
                previous_output: OutPoint::null(),
                script_sig: Script::new(vec![0x51, 0x51]),
                sequence: 0xffff_ffff,
                witness: Vec::new(),
            })
            .output(sample_output(5_000_000_000))
            .finish();
        add_coins(&mut view, &tx, 0, false).unwrap();
        add_coins(&mut view, &tx, 0, false).unwrap();
        assert!(access_by_txid(&mut view, tx.txid()).is_some());
    }
}
