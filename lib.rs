//! BitNames sidechain consensus core: primitive types, the transaction model
//! and wire format, the coin model, the layered UTXO view stack, transaction
//! validation, and the chain-parameter/sequence-lock machinery that a host
//! chain driver (block validator, P2P layer, wallet, mempool, name indexer)
//! calls into. Those hosts are not implemented here.

pub mod apply;
pub mod check;
pub mod check_inputs;
pub mod coin;
pub mod error;
pub mod hashes;
pub mod icann;
pub mod name_registry;
pub mod params;
pub mod script;
pub mod sequence_lock;
pub mod signature;
pub mod transaction;
pub mod view;

/// `serde(with = "...")` helper for fixed/variable byte buffers: hex-encoded
/// under a human-readable format (JSON, TOML, ...), raw bytes otherwise
/// (`bincode`). Shared by every newtype wrapping a byte buffer in this crate.
pub(crate) mod serde_hexstr_human_readable {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(bytes: T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: AsRef<[u8]>,
    {
        if serializer.is_human_readable() {
            hex::serde::serialize(bytes, serializer)
        } else {
            bytes.as_ref().serialize(serializer)
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<Vec<u8>> + Deserialize<'de>,
    {
        if deserializer.is_human_readable() {
            let bytes: Vec<u8> = hex::serde::deserialize(deserializer)?;
            let len = bytes.len();
            T::try_from(bytes)
                .map_err(|_| serde::de::Error::invalid_length(len, &"a differently-sized buffer"))
        } else {
            T::deserialize(deserializer)
        }
    }
}

/// `serde(with = "...")` helper for types whose `Display`/`FromStr` already
/// round-trip exactly (hashes, hex-string newtypes used as map keys): renders
/// through `Display`/`FromStr` for human-readable formats, falls back to the
/// type's own `Serialize`/`Deserialize` otherwise. Needed because `serde_json`
/// map keys must be strings, but `bincode` wants the compact native encoding.
#[allow(dead_code)]
pub(crate) mod serde_display_fromstr_human_readable {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_with::{DeserializeAs, DisplayFromStr, SerializeAs};
    use std::fmt::Display;
    use std::str::FromStr;

    pub fn serialize<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Display + Serialize,
    {
        if serializer.is_human_readable() {
            DisplayFromStr::serialize_as(value, serializer)
        } else {
            value.serialize(serializer)
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr + Deserialize<'de>,
        T::Err: Display,
    {
        if deserializer.is_human_readable() {
            DisplayFromStr::deserialize_as(deserializer)
        } else {
            T::deserialize(deserializer)
        }
    }
}
