//! The layered UTXO view stack: `CCoinsView`/`CCoinsViewBacked`/`CCoinsViewCache`
//! in `coins.h`/`coins.cpp`, recast as a trait plus two concrete
//! implementations instead of a C++ class hierarchy. This is the heart of the
//! core: every other module either reads through a [`View`] or mutates one.

use std::collections::HashMap;
use std::hash::BuildHasher;

use siphasher::sip::SipHasher24;

use crate::coin::Coin;
use crate::error::CacheCorruption;
use crate::hashes::Hash256;
use crate::transaction::{OutPoint, Txid, MAX_OUTPUTS_PER_BLOCK};

pub const DIRTY: u8 = 1 << 0;
pub const FRESH: u8 = 1 << 1;

/// One cached coin plus its FRESH/DIRTY bookkeeping bits (§3 "Cache entry").
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entry {
    pub coin: Coin,
    pub flags: u8,
}

impl Entry {
    fn is_dirty(&self) -> bool {
        self.flags & DIRTY != 0
    }

    fn is_fresh(&self) -> bool {
        self.flags & FRESH != 0
    }
}

/// The capability every level of the view stack implements: a read-through
/// UTXO lookup plus the batched write a cache level above flushes down with.
///
/// `get_coin`/`has_coin` take `&mut self` rather than the `&self` of the
/// original `CCoinsView` interface: [`CacheView::fetch`] must memoize a
/// backing-store hit into its own cache on a read miss, and §5 establishes
/// that a view is owned by a single thread between construction and flush, so
/// `&mut self` is the more direct fit than wrapping the cache in a `RefCell`.
pub trait View {
    /// Looks up `op`. `Some(coin)` where `coin.is_spent()` is a legitimate
    /// tombstone (the outpoint is known but already spent); `None` means the
    /// outpoint has never been seen. Callers that only care about spendability
    /// should use [`has_coin`](View::has_coin), which treats both identically.
    fn get_coin(&mut self, op: &OutPoint) -> Option<Coin>;

    fn has_coin(&mut self, op: &OutPoint) -> bool {
        matches!(self.get_coin(op), Some(coin) if !coin.is_spent())
    }

    fn best_block(&self) -> Hash256;

    /// A cache's parents, most recent first; the base view of the stack has
    /// none (the empty `Vec`, not a zero hash), matching the original's
    /// 0-or-1-entry `GetHeadBlocks`.
    fn head_blocks(&self) -> Vec<Hash256> {
        vec![self.best_block()]
    }

    /// Applies `entries` (already flagged, as produced by a child
    /// [`CacheView`]) on top of this view and advances `best_block`. Returns
    /// [`CacheCorruption`] if `entries` violates the FRESH/DIRTY discipline in
    /// a way that indicates a caller bug rather than adversarial input.
    fn batch_write(
        &mut self,
        entries: Vec<(OutPoint, Entry)>,
        best_block: Hash256,
    ) -> Result<(), CacheCorruption>;

    /// Approximate memory footprint, for a host's cache-eviction policy (§5).
    /// The base view of the stack has none of its own to report.
    fn estimate_size(&self) -> usize {
        0
    }
}

/// A view that does nothing but forward to `base`; the consensus-core
/// equivalent of `CCoinsViewBacked`. On its own it adds no behavior — it
/// exists so a [`CacheView`] can be rebased onto a new backing store without
/// rebuilding the cache (`CCoinsViewBacked::SetBackend`).
pub struct BackedView<B> {
    base: B,
}

impl<B> BackedView<B> {
    pub fn new(base: B) -> Self {
        Self { base }
    }

    pub fn set_backend(&mut self, base: B) {
        self.base = base;
    }

    pub fn into_inner(self) -> B {
        self.base
    }
}

impl<B: View> View for BackedView<B> {
    fn get_coin(&mut self, op: &OutPoint) -> Option<Coin> {
        self.base.get_coin(op)
    }

    fn has_coin(&mut self, op: &OutPoint) -> bool {
        self.base.has_coin(op)
    }

    fn best_block(&self) -> Hash256 {
        self.base.best_block()
    }

    fn head_blocks(&self) -> Vec<Hash256> {
        self.base.head_blocks()
    }

    fn batch_write(
        &mut self,
        entries: Vec<(OutPoint, Entry)>,
        best_block: Hash256,
    ) -> Result<(), CacheCorruption> {
        self.base.batch_write(entries, best_block)
    }

    fn estimate_size(&self) -> usize {
        self.base.estimate_size()
    }
}

/// Seeds a process-salted [`SipHasher24`] per outpoint, mirroring
/// `SaltedOutpointHasher` in `coins.cpp`: the salt is drawn once from the OS
/// CSPRNG so an adversary who can choose outpoints cannot predict or force
/// hash collisions in the cache's `HashMap`.
#[derive(Clone)]
pub struct SaltedOutpointHasher {
    k0: u64,
    k1: u64,
}

impl SaltedOutpointHasher {
    pub fn new() -> Self {
        let mut seed = [0u8; 16];
        getrandom::getrandom(&mut seed).expect("OS CSPRNG unavailable");
        Self {
            k0: u64::from_le_bytes(seed[..8].try_into().unwrap()),
            k1: u64::from_le_bytes(seed[8..].try_into().unwrap()),
        }
    }
}

impl Default for SaltedOutpointHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildHasher for SaltedOutpointHasher {
    type Hasher = SipHasher24;

    fn build_hasher(&self) -> Self::Hasher {
        SipHasher24::new_with_keys(self.k0, self.k1)
    }
}

/// The in-memory, copy-on-write cache layer: `CCoinsViewCache`. Reads fall
/// through to `backing` and memoize; writes accumulate in `cache` until
/// [`CacheView::flush`] (or an enclosing cache's `batch_write`) pushes them
/// down.
pub struct CacheView<B> {
    backing: B,
    cache: HashMap<OutPoint, Entry, SaltedOutpointHasher>,
    best_block: Hash256,
    cached_usage: usize,
}

impl<B: View> CacheView<B> {
    pub fn new(backing: B) -> Self {
        let best_block = backing.best_block();
        Self {
            backing,
            cache: HashMap::with_hasher(SaltedOutpointHasher::new()),
            best_block,
            cached_usage: 0,
        }
    }

    /// Returns the cached entry for `op`, pulling it from `backing` on a miss
    /// and memoizing the result (even a "doesn't exist" miss is *not*
    /// negatively cached, matching the original: a backing store is assumed
    /// cheap enough to re-query, and negative caching would let a transaction
    /// poison the cache for outpoints that come into existence later in the
    /// same block).
    fn ensure_cached(&mut self, op: &OutPoint) -> Option<&Entry> {
        if !self.cache.contains_key(op) {
            match self.backing.get_coin(op) {
                None => return None,
                Some(coin) => {
                    // Cached clean (flags == 0) for a live coin, since it's
                    // exactly as authoritative as the backing store already
                    // says. But if the backing coin is already spent, the
                    // backing store only carries a tombstone for this
                    // outpoint — as far as this cache's own parent is
                    // concerned the coin might as well not exist, so the
                    // freshly inserted entry is marked FRESH (§4.D "fetch").
                    let spent = coin.is_spent();
                    let usage = coin.dynamic_memory_usage();
                    self.cached_usage += usage;
                    let flags = if spent { FRESH } else { 0 };
                    self.cache.insert(*op, Entry { coin, flags });
                }
            }
        }
        self.cache.get(op)
    }

    /// `AddCoin`: inserts `coin` at `op`. Unspendable outputs are silently
    /// dropped (mirroring `AddCoins`' own skip of unspendable outputs, here
    /// pushed down to the one place every caller funnels through).
    /// `possible_overwrite` must be true for coinbase outputs, and for any
    /// outpoint a caller has already confirmed is either absent or spent.
    pub fn add_coin(
        &mut self,
        op: OutPoint,
        coin: Coin,
        possible_overwrite: bool,
    ) -> Result<(), CacheCorruption> {
        debug_assert!(!coin.is_spent());
        if coin.script.is_unspendable() {
            return Ok(());
        }
        self.ensure_cached(&op);
        let existing = self.cache.remove(&op);
        let fresh = match &existing {
            Some(entry) => {
                self.cached_usage -= entry.coin.dynamic_memory_usage();
                if !possible_overwrite && !entry.coin.is_spent() {
                    return Err(CacheCorruption::OverwriteUnspent(op));
                }
                !entry.is_dirty()
            }
            None => true,
        };
        self.cached_usage += coin.dynamic_memory_usage();
        let mut flags = DIRTY;
        if fresh {
            flags |= FRESH;
        }
        self.cache.insert(op, Entry { coin, flags });
        Ok(())
    }

    /// `SpendCoin`: marks `op` spent, returning the coin that was there (for a
    /// caller that wants to undo the spend, e.g. disconnecting a block).
    /// Returns `None` if `op` is unknown. A FRESH entry is removed outright
    /// (the backing store never saw it, so there's nothing to tombstone);
    /// otherwise the entry is cleared in place and left as a DIRTY tombstone
    /// so the spend propagates on the next `batch_write`. No special case for
    /// an already-spent entry: spending a FRESH tombstone still erases it
    /// (and returns the, now-cleared, coin that was there), matching the
    /// original's unconditional `FRESH ? erase : clear` branch.
    pub fn spend_coin(&mut self, op: &OutPoint) -> Option<Coin> {
        self.ensure_cached(op)?;
        let entry = self.cache.get(op)?;
        if entry.is_fresh() {
            let entry = self.cache.remove(op).unwrap();
            self.cached_usage -= entry.coin.dynamic_memory_usage();
            return Some(entry.coin);
        }
        let entry = self.cache.get_mut(op).unwrap();
        let old = entry.coin.clone();
        entry.coin.clear();
        entry.flags |= DIRTY;
        Some(old)
    }

    /// Writes every entry still flagged DIRTY or FRESH (`uncache` having
    /// already dropped the clean ones) down to `backing` and clears this
    /// cache. Used both by an explicit flush and, implicitly, whenever this
    /// view is discarded after `batch_write`-ing its contents into a parent.
    pub fn flush(&mut self) -> Result<(), CacheCorruption> {
        let entries = std::mem::take(&mut self.cache)
            .into_iter()
            .collect::<Vec<_>>();
        self.backing.batch_write(entries, self.best_block)?;
        self.cached_usage = 0;
        Ok(())
    }

    /// Drops a clean (`flags == 0`) entry to free memory, per §5's resource
    /// policy. No-op for dirty or fresh entries, since dropping those would
    /// silently lose an uncommitted write.
    pub fn uncache(&mut self, op: &OutPoint) {
        if let Some(entry) = self.cache.get(op) {
            if entry.flags == 0 {
                let entry = self.cache.remove(op).unwrap();
                self.cached_usage -= entry.coin.dynamic_memory_usage();
            }
        }
    }

    pub fn set_best_block(&mut self, best_block: Hash256) {
        self.best_block = best_block;
    }
}

impl<B: View> View for CacheView<B> {
    fn get_coin(&mut self, op: &OutPoint) -> Option<Coin> {
        self.ensure_cached(op).map(|entry| entry.coin.clone())
    }

    fn best_block(&self) -> Hash256 {
        self.best_block
    }

    /// `CCoinsViewCache::BatchWrite`: merges `entries` from a child cache into
    /// this one. This is the one place FRESH/DIRTY semantics are load-bearing
    /// across cache levels, so every branch below has a named original-source
    /// counterpart.
    fn batch_write(
        &mut self,
        entries: Vec<(OutPoint, Entry)>,
        best_block: Hash256,
    ) -> Result<(), CacheCorruption> {
        for (op, child) in entries {
            if !child.is_dirty() {
                continue;
            }
            match self.cache.remove(&op) {
                None => {
                    // Parent has no entry. A FRESH-and-spent child entry never
                    // existed as far as anyone downstream is concerned, so
                    // there's nothing to propagate; otherwise create the
                    // parent entry, carrying FRESH forward iff the child was
                    // FRESH (a non-FRESH child entry might shadow something
                    // the parent's own backing store still has).
                    if child.is_fresh() && child.coin.is_spent() {
                        continue;
                    }
                    let usage = child.coin.dynamic_memory_usage();
                    self.cached_usage += usage;
                    let mut flags = DIRTY;
                    if child.is_fresh() {
                        flags |= FRESH;
                    }
                    self.cache.insert(op, Entry { coin: child.coin, flags });
                }
                Some(parent) => {
                    if child.is_fresh() && !parent.coin.is_spent() {
                        self.cache.insert(op, parent);
                        tracing::error!(outpoint = ?op, "FRESH child entry over unspent parent coin");
                        return Err(CacheCorruption::FreshOverUnspent(op));
                    }
                    self.cached_usage -= parent.coin.dynamic_memory_usage();
                    if parent.is_fresh() && child.coin.is_spent() {
                        // The parent never had this entry as far as anything
                        // below it is concerned, and the child is now telling
                        // us it's spent too: collapse both away rather than
                        // keep a FRESH tombstone around.
                        continue;
                    }
                    // Otherwise take the child's coin, stay DIRTY, but never
                    // propagate the child's FRESH flag upward: FRESH only
                    // describes this cache's relationship to *its* backing
                    // store, which the parent doesn't share.
                    self.cached_usage += child.coin.dynamic_memory_usage();
                    self.cache.insert(
                        op,
                        Entry {
                            coin: child.coin,
                            flags: DIRTY,
                        },
                    );
                }
            }
        }
        self.best_block = best_block;
        Ok(())
    }

    fn estimate_size(&self) -> usize {
        self.cached_usage
    }
}

/// Lets a `&mut CacheView<_>` (or any `&mut V: View`) itself stand in as a
/// `View`, so a child cache can be built directly on top of a parent without
/// the parent giving up ownership — used to compose the stack generically
/// (§9's "composition not inheritance").
impl<B: View> View for &mut B {
    fn get_coin(&mut self, op: &OutPoint) -> Option<Coin> {
        (**self).get_coin(op)
    }

    fn best_block(&self) -> Hash256 {
        (**self).best_block()
    }

    fn batch_write(
        &mut self,
        entries: Vec<(OutPoint, Entry)>,
        best_block: Hash256,
    ) -> Result<(), CacheCorruption> {
        (**self).batch_write(entries, best_block)
    }

    fn estimate_size(&self) -> usize {
        (**self).estimate_size()
    }
}

/// `AccessByTxid`: the bounded linear scan a host uses to find *an* unspent
/// output of `txid` without knowing which index, e.g. to check whether a
/// transaction has already been mined. Bounded by
/// [`MAX_OUTPUTS_PER_BLOCK`] since a well-formed transaction can never have
/// more outputs than that.
pub fn access_by_txid<V: View>(view: &mut V, txid: Txid) -> Option<Coin> {
    for index in 0..MAX_OUTPUTS_PER_BLOCK {
        let op = OutPoint { txid, index };
        match view.get_coin(&op) {
            Some(coin) if !coin.is_spent() => return Some(coin),
            Some(_) => continue,
            None => return None,
        }
    }
    None
}

/// A `View` over a plain `HashMap`, standing in for a host's persistent
/// backing store. Exists only for tests across the crate (this module's own,
/// plus [`crate::apply`] and [`crate::check_inputs`]) — it is not a backing
/// store any host should actually use.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct HashMapView {
    coins: HashMap<OutPoint, Coin>,
    best_block: Hash256,
}

#[cfg(test)]
impl HashMapView {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, op: OutPoint, coin: Coin) {
        self.coins.insert(op, coin);
    }
}

#[cfg(test)]
impl View for HashMapView {
    fn get_coin(&mut self, op: &OutPoint) -> Option<Coin> {
        self.coins.get(op).cloned()
    }

    fn best_block(&self) -> Hash256 {
        self.best_block
    }

    fn batch_write(
        &mut self,
        entries: Vec<(OutPoint, Entry)>,
        best_block: Hash256,
    ) -> Result<(), CacheCorruption> {
        for (op, entry) in entries {
            if entry.coin.is_spent() {
                self.coins.remove(&op);
            } else {
                self.coins.insert(op, entry.coin);
            }
        }
        self.best_block = best_block;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Script;
    use crate::transaction::TxOut;

    fn sample_coin(value: i64) -> Coin {
        Coin::new(
            TxOut {
                value,
                script_pubkey: Script::pay_to_pubkey_hash([1u8; 20]),
            },
            1,
            false,
            false,
            false,
            Hash256::default(),
            Hash256::default(),
        )
    }

    fn sample_op(seed: u8) -> OutPoint {
        OutPoint {
            txid: crate::transaction::Txid(Hash256::new([seed; 32])),
            index: 0,
        }
    }

    #[test]
    fn add_then_get_round_trips() {
        let mut cache = CacheView::new(HashMapView::new());
        let op = sample_op(1);
        cache.add_coin(op, sample_coin(100), false).unwrap();
        let got = cache.get_coin(&op).unwrap();
        assert_eq!(got.value, 100);
        assert!(cache.has_coin(&op));
    }

    #[test]
    fn spend_then_has_coin_is_false() {
        let mut cache = CacheView::new(HashMapView::new());
        let op = sample_op(2);
        cache.add_coin(op, sample_coin(50), false).unwrap();
        let spent = cache.spend_coin(&op).unwrap();
        assert_eq!(spent.value, 50);
        assert!(!cache.has_coin(&op));
    }

    #[test]
    fn fresh_spend_erases_entry_entirely() {
        // A coin added in this very cache (FRESH) and then spent should leave
        // no trace at all, rather than a tombstone: the backing store never
        // saw it, so there's nothing to propagate on flush.
        let mut cache = CacheView::new(HashMapView::new());
        let op = sample_op(3);
        cache.add_coin(op, sample_coin(7), false).unwrap();
        cache.spend_coin(&op).unwrap();
        assert_eq!(cache.estimate_size(), 0);
    }

    #[test]
    fn flush_equivalence() {
        let mut cache = CacheView::new(HashMapView::new());
        let op = sample_op(4);
        cache.add_coin(op, sample_coin(900), false).unwrap();
        cache.flush().unwrap();
        let mut direct = HashMapView::new();
        direct.coins.insert(op, sample_coin(900));
        assert_eq!(cache.get_coin(&op), direct.get_coin(&op));
    }

    #[test]
    fn two_level_merge_prunes_through_both_levels() {
        // grandparent has a coin, parent cache is empty, child spends it: the
        // spend must reach the grandparent after both `batch_write`s.
        let mut grandparent = HashMapView::new();
        let op = sample_op(5);
        grandparent.coins.insert(op, sample_coin(42));
        let mut parent = CacheView::new(grandparent);
        let mut child = CacheView::new(&mut parent);
        assert!(child.has_coin(&op));
        child.spend_coin(&op).unwrap();
        child.flush().unwrap();
        parent.flush().unwrap();
        assert!(!parent.backing.coins.contains_key(&op));
    }

    #[test]
    fn fetching_an_already_spent_backing_coin_marks_entry_fresh() {
        // The backing store only carries a tombstone for `op`; `spend_coin`
        // must still find it (not short-circuit as "already gone") and, since
        // the fetched entry is FRESH, erase it outright rather than leaving a
        // DIRTY tombstone behind.
        let mut backing = HashMapView::new();
        let op = sample_op(7);
        let mut spent_coin = sample_coin(10);
        spent_coin.clear();
        backing.insert(op, spent_coin);
        let mut cache = CacheView::new(backing);
        assert!(!cache.has_coin(&op));
        assert!(cache.spend_coin(&op).unwrap().is_spent());
        assert!(!cache.cache.contains_key(&op));
    }

    #[test]
    fn overwrite_unspent_without_possible_overwrite_is_corruption() {
        let mut cache = CacheView::new(HashMapView::new());
        let op = sample_op(6);
        cache.add_coin(op, sample_coin(1), false).unwrap();
        let err = cache.add_coin(op, sample_coin(2), false).unwrap_err();
        assert_eq!(err, CacheCorruption::OverwriteUnspent(op));
    }
}
