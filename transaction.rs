//! The transaction model and its bit-exact wire format.
//!
//! Grounded on `primitives/transaction.h` (`SerializeTransaction`/
//! `UnserializeTransaction`) and the teacher's `Transaction`/builder split in
//! `lib/types/transaction.rs`: a mutable [`TransactionBuilder`] that is built
//! field-by-field, and an immutable [`Transaction`] that carries its `txid`
//! computed once at construction.

use std::io::{self, Read};
use std::net::Ipv4Addr;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::hashes::{sha256d, Hash256};
use crate::script::Script;
use crate::signature::{CompactSignature, PubKey};

/// Bitcoin's variable-length integer ("CompactSize") encoding.
fn write_compact_size(w: &mut Vec<u8>, value: u64) -> io::Result<()> {
    if value < 253 {
        w.write_u8(value as u8)
    } else if value <= u16::MAX as u64 {
        w.write_u8(253)?;
        w.write_u16::<LittleEndian>(value as u16)
    } else if value <= u32::MAX as u64 {
        w.write_u8(254)?;
        w.write_u32::<LittleEndian>(value as u32)
    } else {
        w.write_u8(255)?;
        w.write_u64::<LittleEndian>(value)
    }
}

fn read_compact_size(r: &mut impl io::Read) -> io::Result<u64> {
    let first = r.read_u8()?;
    match first {
        0..=252 => Ok(first as u64),
        253 => Ok(r.read_u16::<LittleEndian>()? as u64),
        254 => Ok(r.read_u32::<LittleEndian>()? as u64),
        255 => r.read_u64::<LittleEndian>(),
    }
}

fn write_var_bytes(w: &mut Vec<u8>, bytes: &[u8]) -> io::Result<()> {
    write_compact_size(w, bytes.len() as u64)?;
    w.write_all(bytes)
}

fn read_var_bytes(r: &mut impl io::Read) -> io::Result<Vec<u8>> {
    let len = read_compact_size(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

pub const CURRENT_VERSION: i32 = 3;
pub const TRANSACTION_BITNAME_CREATE_VERSION: i32 = 10;
pub const TRANSACTION_BITNAME_UPDATE_VERSION: i32 = 11;
pub const TRANSACTION_BITNAME_REGISTER_ICANN_VERSION: i32 = 12;

/// Maximum number of outputs `access_by_txid` (`view.rs`) will scan looking for
/// an unspent one; mirrors `MAX_OUTPUTS_PER_BLOCK` in the original.
pub const MAX_OUTPUTS_PER_BLOCK: u32 = 1_000_000;

/// A transaction identifier: `SHA256d` of the transaction serialized without
/// its witness data or memo (§4.B).
#[derive(Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Txid(pub Hash256);

impl std::fmt::Display for Txid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::fmt::Debug for Txid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

/// `{txid, index}`; the null sentinel `{0, u32::MAX}` marks a coinbase input.
#[derive(Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: Txid,
    pub index: u32,
}

impl OutPoint {
    pub const fn null() -> Self {
        Self {
            txid: Txid(Hash256::new([0u8; 32])),
            index: u32::MAX,
        }
    }

    pub fn is_null(&self) -> bool {
        self.txid.0.is_null() && self.index == u32::MAX
    }
}

impl std::fmt::Debug for OutPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.txid, self.index)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TxIn {
    pub previous_output: OutPoint,
    pub script_sig: Script,
    pub sequence: u32,
    /// Per-input witness stack; only serialized (and only meaningful) when the
    /// transaction as a whole uses the extended (witness) wire form.
    #[serde(default)]
    pub witness: Vec<Vec<u8>>,
}

impl TxIn {
    pub fn has_witness(&self) -> bool {
        !self.witness.is_empty()
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: crate::hashes::Amount,
    pub script_pubkey: Script,
}

/// Version-specific trailing fields (§3 "Transaction" field table).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    None,
    /// `version == TRANSACTION_BITNAME_CREATE_VERSION`. `name_hash == 0` marks
    /// a reservation; `name_hash != 0` marks a registration.
    Create {
        has_in4: bool,
        commitment: Hash256,
        name_hash: Hash256,
        sok: Hash256,
        in4: Ipv4Addr,
        cpk: Option<PubKey>,
        is_icann: bool,
        icann_sig: Option<CompactSignature>,
    },
    /// `version == TRANSACTION_BITNAME_UPDATE_VERSION`.
    Update {
        has_commitment: bool,
        has_in4: bool,
        commitment: Hash256,
        in4: Ipv4Addr,
        cpk: Option<PubKey>,
    },
    /// `version == TRANSACTION_BITNAME_REGISTER_ICANN_VERSION`.
    IcannBatch {
        registrations: Vec<String>,
        icann_sig: CompactSignature,
    },
}

impl Payload {
    pub fn as_create(&self) -> Option<CreateFields<'_>> {
        match self {
            Payload::Create {
                has_in4,
                commitment,
                name_hash,
                sok,
                in4,
                cpk,
                is_icann,
                icann_sig,
            } => Some(CreateFields {
                has_in4: *has_in4,
                commitment,
                name_hash,
                sok,
                in4: *in4,
                cpk,
                is_icann: *is_icann,
                icann_sig,
            }),
            _ => None,
        }
    }

    pub fn as_update(&self) -> Option<(bool, bool, &Hash256, Ipv4Addr, &Option<PubKey>)> {
        match self {
            Payload::Update {
                has_commitment,
                has_in4,
                commitment,
                in4,
                cpk,
            } => Some((*has_commitment, *has_in4, commitment, *in4, cpk)),
            _ => None,
        }
    }

    pub fn as_icann_batch(&self) -> Option<(&[String], &CompactSignature)> {
        match self {
            Payload::IcannBatch {
                registrations,
                icann_sig,
            } => Some((registrations, icann_sig)),
            _ => None,
        }
    }
}

pub struct CreateFields<'a> {
    pub has_in4: bool,
    pub commitment: &'a Hash256,
    pub name_hash: &'a Hash256,
    pub sok: &'a Hash256,
    pub in4: Ipv4Addr,
    pub cpk: &'a Option<PubKey>,
    pub is_icann: bool,
    pub icann_sig: &'a Option<CompactSignature>,
}

impl CreateFields<'_> {
    pub fn is_reservation(&self) -> bool {
        self.name_hash.is_null()
    }

    pub fn is_registration(&self) -> bool {
        !self.is_reservation()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("unknown flags byte {0:#x}")]
    UnknownFlags(u8),
    #[error("name string is not valid UTF-8")]
    InvalidName,
    #[error("invalid compressed public key")]
    InvalidPubKey,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Common fields shared by [`Transaction`] and [`TransactionBuilder`]; wire
/// (de)serialization is implemented once against this view so both types stay
/// bit-for-bit consistent.
#[derive(Clone, Debug, Eq, PartialEq)]
struct Fields {
    version: i32,
    replay_byte: u8,
    inputs: Vec<TxIn>,
    outputs: Vec<TxOut>,
    memo: Vec<u8>,
    lock_time: u32,
    payload: Payload,
}

impl Fields {
    fn has_any_witness(&self) -> bool {
        self.inputs.iter().any(TxIn::has_witness)
    }

    /// §4.B serialization contract. `include_witness = false` is the hash-basis
    /// form (always omits witness/memo, regardless of `has_any_witness`).
    fn serialize(&self, w: &mut Vec<u8>, include_witness: bool) -> Result<(), SerializeError> {
        w.write_i32::<LittleEndian>(self.version)?;
        if self.version == CURRENT_VERSION {
            w.write_u8(self.replay_byte)?;
        }
        let use_extended = include_witness && self.has_any_witness();
        if use_extended {
            write_compact_size(w, 0)?;
            w.write_u8(1)?; // flags: bit 0 (witness present)
        }
        write_compact_size(w, self.inputs.len() as u64)?;
        for input in &self.inputs {
            write_outpoint(w, &input.previous_output)?;
            write_var_bytes(w, &input.script_sig.0)?;
            w.write_u32::<LittleEndian>(input.sequence)?;
        }
        write_compact_size(w, self.outputs.len() as u64)?;
        for output in &self.outputs {
            w.write_i64::<LittleEndian>(output.value)?;
            write_var_bytes(w, &output.script_pubkey.0)?;
        }
        if use_extended {
            write_var_bytes(w, &self.memo)?;
            for input in &self.inputs {
                write_compact_size(w, input.witness.len() as u64)?;
                for item in &input.witness {
                    write_var_bytes(w, item)?;
                }
            }
        }
        w.write_u32::<LittleEndian>(self.lock_time)?;
        match self.version {
            TRANSACTION_BITNAME_CREATE_VERSION => {
                let create = self.payload.as_create().expect("create payload");
                w.write_u8(create.has_in4 as u8)?;
                w.extend_from_slice(create.commitment.as_bytes());
                w.extend_from_slice(create.name_hash.as_bytes());
                w.extend_from_slice(create.sok.as_bytes());
                w.write_u32::<byteorder::BigEndian>(u32::from(create.in4))?;
                write_optional_pubkey(w, create.cpk)?;
                w.write_u8(create.is_icann as u8)?;
                if create.is_icann {
                    let sig = create.icann_sig.as_ref().expect("icann_sig when is_icann");
                    w.extend_from_slice(&sig.0);
                }
            }
            TRANSACTION_BITNAME_UPDATE_VERSION => {
                let (has_commitment, has_in4, commitment, in4, cpk) =
                    self.payload.as_update().expect("update payload");
                w.write_u8(has_commitment as u8)?;
                w.write_u8(has_in4 as u8)?;
                w.write_u8(cpk.is_some() as u8)?;
                if has_commitment {
                    w.extend_from_slice(commitment.as_bytes());
                }
                if has_in4 {
                    w.write_u32::<byteorder::BigEndian>(u32::from(in4))?;
                }
                if let Some(cpk) = cpk {
                    w.extend_from_slice(&cpk.0.serialize());
                }
            }
            TRANSACTION_BITNAME_REGISTER_ICANN_VERSION => {
                let (registrations, icann_sig) =
                    self.payload.as_icann_batch().expect("icann batch payload");
                write_compact_size(w, registrations.len() as u64)?;
                for name in registrations {
                    write_var_bytes(w, name.as_bytes())?;
                }
                w.extend_from_slice(&icann_sig.0);
            }
            _ => {}
        }
        Ok(())
    }

    fn deserialize(bytes: &[u8]) -> Result<Self, SerializeError> {
        let mut cur = io::Cursor::new(bytes);
        let version = cur.read_i32::<LittleEndian>()?;
        let replay_byte = if version == CURRENT_VERSION {
            cur.read_u8()?
        } else {
            0
        };
        let first_count = read_compact_size(&mut cur)?;
        let (use_extended, input_count) = if first_count == 0 {
            let flags = cur.read_u8()?;
            if flags != 1 {
                return Err(SerializeError::UnknownFlags(flags));
            }
            (true, read_compact_size(&mut cur)?)
        } else {
            (false, first_count)
        };
        let mut inputs = Vec::with_capacity(input_count as usize);
        for _ in 0..input_count {
            let previous_output = read_outpoint(&mut cur)?;
            let script_sig = Script::new(read_var_bytes(&mut cur)?);
            let sequence = cur.read_u32::<LittleEndian>()?;
            inputs.push(TxIn {
                previous_output,
                script_sig,
                sequence,
                witness: Vec::new(),
            });
        }
        let output_count = read_compact_size(&mut cur)?;
        let mut outputs = Vec::with_capacity(output_count as usize);
        for _ in 0..output_count {
            let value = cur.read_i64::<LittleEndian>()?;
            let script_pubkey = Script::new(read_var_bytes(&mut cur)?);
            outputs.push(TxOut {
                value,
                script_pubkey,
            });
        }
        let mut memo = Vec::new();
        if use_extended {
            memo = read_var_bytes(&mut cur)?;
            for input in &mut inputs {
                let item_count = read_compact_size(&mut cur)?;
                let mut witness = Vec::with_capacity(item_count as usize);
                for _ in 0..item_count {
                    witness.push(read_var_bytes(&mut cur)?);
                }
                input.witness = witness;
            }
        }
        let lock_time = cur.read_u32::<LittleEndian>()?;
        let payload = match version {
            TRANSACTION_BITNAME_CREATE_VERSION => {
                let has_in4 = cur.read_u8()? != 0;
                let commitment = read_hash(&mut cur)?;
                let name_hash = read_hash(&mut cur)?;
                let sok = read_hash(&mut cur)?;
                let in4 = Ipv4Addr::from(cur.read_u32::<byteorder::BigEndian>()?);
                let cpk = read_optional_pubkey(&mut cur)?;
                let is_icann = cur.read_u8()? != 0;
                let icann_sig = if is_icann {
                    Some(read_compact_sig(&mut cur)?)
                } else {
                    None
                };
                Payload::Create {
                    has_in4,
                    commitment,
                    name_hash,
                    sok,
                    in4,
                    cpk,
                    is_icann,
                    icann_sig,
                }
            }
            TRANSACTION_BITNAME_UPDATE_VERSION => {
                let has_commitment = cur.read_u8()? != 0;
                let has_in4 = cur.read_u8()? != 0;
                let has_cpk = cur.read_u8()? != 0;
                let commitment = if has_commitment {
                    read_hash(&mut cur)?
                } else {
                    Hash256::default()
                };
                let in4 = if has_in4 {
                    Ipv4Addr::from(cur.read_u32::<byteorder::BigEndian>()?)
                } else {
                    Ipv4Addr::UNSPECIFIED
                };
                let cpk = if has_cpk {
                    Some(read_pubkey(&mut cur)?)
                } else {
                    None
                };
                Payload::Update {
                    has_commitment,
                    has_in4,
                    commitment,
                    in4,
                    cpk,
                }
            }
            TRANSACTION_BITNAME_REGISTER_ICANN_VERSION => {
                let count = read_compact_size(&mut cur)?;
                let mut registrations = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let bytes = read_var_bytes(&mut cur)?;
                    registrations.push(
                        String::from_utf8(bytes).map_err(|_| SerializeError::InvalidName)?,
                    );
                }
                let icann_sig = read_compact_sig(&mut cur)?;
                Payload::IcannBatch {
                    registrations,
                    icann_sig,
                }
            }
            _ => Payload::None,
        };
        Ok(Fields {
            version,
            replay_byte,
            inputs,
            outputs,
            memo,
            lock_time,
            payload,
        })
    }
}

/// `SerializeHash` over a single [`TxOut`]: used by the ICANN single-registration
/// signature digest (§4.F(5)).
pub fn serialize_txout(out: &TxOut) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.write_i64::<LittleEndian>(out.value).expect("writing to Vec cannot fail");
    write_var_bytes(&mut buf, &out.script_pubkey.0).expect("writing to Vec cannot fail");
    buf
}

/// `SerializeHash` over a `vector<T>`: a compact-size length prefix followed by
/// each element's own serialization, concatenated. Used to build the ICANN
/// batch authorization digest (§4.G) over outpoints, outputs and registration
/// strings.
pub fn serialize_outpoints(ops: &[OutPoint]) -> Vec<u8> {
    let mut buf = Vec::new();
    write_compact_size(&mut buf, ops.len() as u64).expect("writing to Vec cannot fail");
    for op in ops {
        write_outpoint(&mut buf, op).expect("writing to Vec cannot fail");
    }
    buf
}

pub fn serialize_txouts(outs: &[TxOut]) -> Vec<u8> {
    let mut buf = Vec::new();
    write_compact_size(&mut buf, outs.len() as u64).expect("writing to Vec cannot fail");
    for out in outs {
        buf.extend_from_slice(&serialize_txout(out));
    }
    buf
}

pub fn serialize_strings(strings: &[String]) -> Vec<u8> {
    let mut buf = Vec::new();
    write_compact_size(&mut buf, strings.len() as u64).expect("writing to Vec cannot fail");
    for s in strings {
        write_var_bytes(&mut buf, s.as_bytes()).expect("writing to Vec cannot fail");
    }
    buf
}

fn write_outpoint(w: &mut Vec<u8>, op: &OutPoint) -> io::Result<()> {
    w.extend_from_slice(op.txid.0.as_bytes());
    w.write_u32::<LittleEndian>(op.index)
}

fn read_outpoint(cur: &mut io::Cursor<&[u8]>) -> io::Result<OutPoint> {
    let txid = Txid(read_hash(cur)?);
    let index = cur.read_u32::<LittleEndian>()?;
    Ok(OutPoint { txid, index })
}

fn read_hash(cur: &mut io::Cursor<&[u8]>) -> io::Result<Hash256> {
    let mut bytes = [0u8; 32];
    cur.read_exact(&mut bytes)?;
    Ok(Hash256::new(bytes))
}

fn read_compact_sig(cur: &mut io::Cursor<&[u8]>) -> io::Result<CompactSignature> {
    let mut bytes = [0u8; 64];
    cur.read_exact(&mut bytes)?;
    Ok(CompactSignature(bytes))
}

fn read_pubkey(cur: &mut io::Cursor<&[u8]>) -> Result<PubKey, SerializeError> {
    let mut bytes = [0u8; 33];
    cur.read_exact(&mut bytes)?;
    bitcoin::secp256k1::PublicKey::from_slice(&bytes)
        .map(PubKey)
        .map_err(|_| SerializeError::InvalidPubKey)
}

fn read_optional_pubkey(cur: &mut io::Cursor<&[u8]>) -> Result<Option<PubKey>, SerializeError> {
    let has_cpk = cur.read_u8()? != 0;
    if has_cpk {
        Ok(Some(read_pubkey(cur)?))
    } else {
        Ok(None)
    }
}

fn write_optional_pubkey(w: &mut Vec<u8>, cpk: &Option<PubKey>) -> io::Result<()> {
    w.write_u8(cpk.is_some() as u8)?;
    if let Some(cpk) = cpk {
        w.extend_from_slice(&cpk.0.serialize());
    }
    Ok(())
}

/// The mutable half of the builder/immutable split: built up field-by-field,
/// then converted via [`TransactionBuilder::finish`] into a [`Transaction`],
/// which computes the cached `txid` exactly once.
#[derive(Clone, Debug)]
pub struct TransactionBuilder {
    fields: Fields,
}

impl TransactionBuilder {
    pub fn new(version: i32) -> Self {
        Self {
            fields: Fields {
                version,
                replay_byte: 0,
                inputs: Vec::new(),
                outputs: Vec::new(),
                memo: Vec::new(),
                lock_time: 0,
                payload: Payload::None,
            },
        }
    }

    pub fn replay_byte(mut self, byte: u8) -> Self {
        self.fields.replay_byte = byte;
        self
    }

    pub fn input(mut self, input: TxIn) -> Self {
        self.fields.inputs.push(input);
        self
    }

    pub fn output(mut self, output: TxOut) -> Self {
        self.fields.outputs.push(output);
        self
    }

    pub fn memo(mut self, memo: Vec<u8>) -> Self {
        self.fields.memo = memo;
        self
    }

    pub fn lock_time(mut self, lock_time: u32) -> Self {
        self.fields.lock_time = lock_time;
        self
    }

    pub fn payload(mut self, payload: Payload) -> Self {
        self.fields.payload = payload;
        self
    }

    pub fn finish(self) -> Transaction {
        let mut buf = Vec::new();
        self.fields
            .serialize(&mut buf, false)
            .expect("in-memory serialization cannot fail");
        let txid = Txid(sha256d(&buf));
        Transaction {
            fields: self.fields,
            txid,
        }
    }
}

/// An immutable transaction with its `txid` computed once at construction
/// (via [`TransactionBuilder::finish`]). Identity and ordering are by `txid`.
#[derive(Clone, Debug)]
pub struct Transaction {
    fields: Fields,
    txid: Txid,
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.txid == other.txid
    }
}
impl Eq for Transaction {}

impl PartialOrd for Transaction {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Transaction {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.txid.cmp(&other.txid)
    }
}

impl Transaction {
    pub fn txid(&self) -> Txid {
        self.txid
    }

    pub fn version(&self) -> i32 {
        self.fields.version
    }

    pub fn inputs(&self) -> &[TxIn] {
        &self.fields.inputs
    }

    pub fn outputs(&self) -> &[TxOut] {
        &self.fields.outputs
    }

    pub fn memo(&self) -> &[u8] {
        &self.fields.memo
    }

    pub fn lock_time(&self) -> u32 {
        self.fields.lock_time
    }

    pub fn payload(&self) -> &Payload {
        &self.fields.payload
    }

    pub fn is_coinbase(&self) -> bool {
        self.fields.inputs.len() == 1 && self.fields.inputs[0].previous_output.is_null()
    }

    pub fn value_out(&self) -> i64 {
        self.fields.outputs.iter().map(|o| o.value).sum()
    }

    /// Full wire serialization, including witness data when present. This is
    /// what a host P2P layer transmits; it is *not* the hash basis.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.fields
            .serialize(&mut buf, true)
            .expect("in-memory serialization cannot fail");
        buf
    }

    /// Serialization with the witness/memo suppressed, matching
    /// `SERIALIZE_TRANSACTION_NO_WITNESS` in the original: used for the
    /// oversize check (`CheckTransaction`), which predates witness
    /// malleability fixes and so is computed against the witness-free form.
    pub fn serialize_no_witness(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.fields
            .serialize(&mut buf, false)
            .expect("in-memory serialization cannot fail");
        buf
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, SerializeError> {
        let fields = Fields::deserialize(bytes)?;
        let mut hash_buf = Vec::new();
        fields
            .serialize(&mut hash_buf, false)
            .expect("in-memory serialization cannot fail");
        let txid = Txid(sha256d(&hash_buf));
        Ok(Transaction { fields, txid })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_txin() -> TxIn {
        TxIn {
            previous_output: OutPoint {
                txid: Txid(Hash256::new([1u8; 32])),
                index: 0,
            },
            script_sig: Script::new(vec![0x51, 0x51]),
            sequence: 0xffff_ffff,
            witness: Vec::new(),
        }
    }

    fn sample_txout(value: i64) -> TxOut {
        TxOut {
            value,
            script_pubkey: Script::pay_to_pubkey_hash([2u8; 20]),
        }
    }

    #[test]
    fn round_trips_plain_transaction() {
        let tx = TransactionBuilder::new(CURRENT_VERSION)
            .replay_byte(7)
            .input(sample_txin())
            .output(sample_txout(1000))
            .lock_time(42)
            .finish();
        let bytes = tx.serialize();
        let decoded = Transaction::deserialize(&bytes).unwrap();
        assert_eq!(decoded.txid(), tx.txid());
        assert_eq!(decoded.lock_time(), 42);
        assert_eq!(decoded.outputs()[0].value, 1000);
    }

    #[test]
    fn witness_is_excluded_from_txid() {
        let mut with_witness = sample_txin();
        with_witness.witness = vec![vec![0xde, 0xad]];
        let tx_a = TransactionBuilder::new(CURRENT_VERSION)
            .input(with_witness)
            .output(sample_txout(1))
            .finish();
        let tx_b = TransactionBuilder::new(CURRENT_VERSION)
            .input(sample_txin())
            .output(sample_txout(1))
            .finish();
        assert_eq!(tx_a.txid(), tx_b.txid());
        assert_ne!(tx_a.serialize(), tx_b.serialize());
    }

    #[test]
    fn round_trips_create_payload() {
        let tx = TransactionBuilder::new(TRANSACTION_BITNAME_CREATE_VERSION)
            .input(sample_txin())
            .output(sample_txout(1))
            .payload(Payload::Create {
                has_in4: true,
                commitment: Hash256::new([3u8; 32]),
                name_hash: Hash256::new([4u8; 32]),
                sok: Hash256::new([5u8; 32]),
                in4: Ipv4Addr::new(192, 0, 2, 1),
                cpk: None,
                is_icann: false,
                icann_sig: None,
            })
            .finish();
        let decoded = Transaction::deserialize(&tx.serialize()).unwrap();
        assert_eq!(decoded.txid(), tx.txid());
        let create = decoded.payload().as_create().unwrap();
        assert!(create.is_registration());
        assert_eq!(create.in4, Ipv4Addr::new(192, 0, 2, 1));
    }

    #[test]
    fn round_trips_icann_batch_payload() {
        let tx = TransactionBuilder::new(TRANSACTION_BITNAME_REGISTER_ICANN_VERSION)
            .input(sample_txin())
            .output(sample_txout(1))
            .output(sample_txout(1))
            .payload(Payload::IcannBatch {
                registrations: vec!["example.com".to_string(), "example.org".to_string()],
                icann_sig: CompactSignature([9u8; 64]),
            })
            .finish();
        let decoded = Transaction::deserialize(&tx.serialize()).unwrap();
        let (names, _sig) = decoded.payload().as_icann_batch().unwrap();
        assert_eq!(names, ["example.com", "example.org"]);
    }

    #[test]
    fn outpoint_null_is_coinbase_marker() {
        assert!(OutPoint::null().is_null());
        let coinbase = TransactionBuilder::new(1)
            .input(TxIn {
                previous_output: OutPoint::null(),
                script_sig: Script::new(vec![0x51, 0x51]),
                sequence: 0xffff_ffff,
                witness: Vec::new(),
            })
            .output(sample_txout(5_000_000_000))
            .finish();
        assert!(coinbase.is_coinbase());
    }
}
