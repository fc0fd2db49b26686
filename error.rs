//! Structured validation failures. One `thiserror` enum per concern, following
//! the teacher's `state/error.rs` convention of message-bearing variants
//! rather than bare string reasons.

use thiserror::Error;

use crate::hashes::Amount;
use crate::transaction::OutPoint;

/// One variant per reject code in the validation-failure table (§7). Each
/// carries the fields needed to reproduce its message; `dos_score` lives on
/// the wrapping [`ValidationState`], not here, since the same reason can in
/// principle be reached with different ban weights depending on caller policy.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum RejectReason {
    #[error("bad-txns-vin-empty")]
    VinEmpty,
    #[error("bad-txns-vout-empty")]
    VoutEmpty,
    #[error("bad-txns-oversize: {weight} > {max}")]
    Oversize { weight: u64, max: u64 },

    #[error("bad-txns-vout-negative: output {index}")]
    VoutNegative { index: usize },
    #[error("bad-txns-vout-toolarge: output {index}")]
    VoutToolarge { index: usize },
    #[error("bad-txns-txouttotal-toolarge")]
    TxOutTotalToolarge,
    #[error("bad-txns-inputvalues-outofrange")]
    InputValuesOutOfRange,
    #[error("bad-txns-fee-outofrange: value_in {value_in} value_out {value_out}")]
    FeeOutOfRange { value_in: Amount, value_out: Amount },
    #[error("bad-txns-inputs-duplicate: {0:?}")]
    InputsDuplicate(OutPoint),
    #[error("bad-txns-prevout-null: input {index}")]
    PrevoutNull { index: usize },

    #[error("bad-txns-create-bitname-vout-size")]
    CreateBitNameVoutSize,
    #[error("bad-txns-update-bitname-no-updates")]
    UpdateBitNameNoUpdates,
    #[error("bad-txns-inputs-missing-reservation")]
    InputsMissingReservation,
    #[error("bad-txns-inputs-wrong-commitment")]
    InputsWrongCommitment,
    #[error("bad-txns-inputs-missing-bitname")]
    InputsMissingBitName,
    #[error("bad-txns-inputs-unexpected-assets")]
    InputsUnexpectedAssets,
    #[error("bad-txns-inputs-unexpected-bitname")]
    InputsUnexpectedBitName,
    #[error("bad-txns-inputs-missing-registration")]
    InputsMissingRegistration,
    #[error("bad-txns-inputs-wrong-registration")]
    InputsWrongRegistration,

    #[error("bad-txns-register-icann-bitname-vout-size")]
    RegisterIcannVoutSize,
    #[error("bad-txns-register-icann-invalid-name: {name}")]
    RegisterIcannInvalidName { name: String },
    #[error("bad-txns-register-icann-bad-registrations")]
    RegisterIcannBadRegistrations,
    #[error("bad-icann-sig")]
    BadIcannSig,

    #[error("bad-txns-inputs-missingorspent: {0:?}")]
    InputsMissingOrSpent(OutPoint),

    #[error("bad-cb-length")]
    BadCoinbaseLength,
    #[error("bad-txns-premature-spend-of-coinbase: input height {input_height} spend height {spend_height}")]
    PrematureSpendOfCoinbase { input_height: u32, spend_height: u32 },
}

impl RejectReason {
    /// Default DoS score per the failure-class table in §7; callers that need
    /// a different weight (e.g. a policy-only mempool) may override it.
    pub fn default_dos_score(&self) -> u8 {
        use RejectReason::*;
        match self {
            VinEmpty | VoutEmpty | Oversize { .. } => 100,
            VoutNegative { .. }
            | VoutToolarge { .. }
            | TxOutTotalToolarge
            | InputValuesOutOfRange
            | FeeOutOfRange { .. } => 100,
            InputsDuplicate(_) => 100,
            PrevoutNull { .. } => 10,
            CreateBitNameVoutSize
            | UpdateBitNameNoUpdates
            | InputsMissingReservation
            | InputsWrongCommitment
            | InputsMissingBitName
            | InputsUnexpectedAssets
            | InputsUnexpectedBitName
            | InputsMissingRegistration
            | InputsWrongRegistration => 10,
            RegisterIcannVoutSize | RegisterIcannInvalidName { .. } | RegisterIcannBadRegistrations => 10,
            BadIcannSig => 100,
            InputsMissingOrSpent(_) => 100,
            BadCoinbaseLength | PrematureSpendOfCoinbase { .. } => 100,
        }
    }
}

/// A validation failure, carrying the reject reason and the DoS score a
/// caller (e.g. a host's P2P ban-scoring policy) should attribute to the peer
/// that relayed the offending transaction.
#[derive(Debug, Error, Eq, PartialEq)]
#[error("{reason}")]
pub struct ValidationState {
    pub reason: RejectReason,
    pub dos_score: u8,
}

impl ValidationState {
    pub fn new(reason: RejectReason) -> Self {
        let dos_score = reason.default_dos_score();
        Self { reason, dos_score }
    }
}

impl From<RejectReason> for ValidationState {
    fn from(reason: RejectReason) -> Self {
        Self::new(reason)
    }
}

/// A fatal violation of the view stack's own invariants — FRESH misapplied, or
/// an unspent entry silently overwritten. This is never part of
/// [`ValidationState`]: it indicates a caller contract violation, not
/// adversarial input, and per §7 should terminate the caller rather than be
/// handled as a rejected transaction.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum CacheCorruption {
    #[error("FRESH flag on child entry for {0:?} but parent has an unspent coin")]
    FreshOverUnspent(OutPoint),
    #[error("attempted to overwrite unspent coin at {0:?} without possible_overwrite")]
    OverwriteUnspent(OutPoint),
}

/// Distinguishes the "never heard of it" and "heard of it, it's spent" cases a
/// backing store must represent identically for [`crate::view::View::has_coin`],
/// without forcing every caller to match on `Option<Coin>` by hand.
pub fn coin_is_unspent(coin: &Option<crate::coin::Coin>) -> bool {
    matches!(coin, Some(c) if !c.is_spent())
}
