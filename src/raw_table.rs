//! RawTable: structural layer. Bucket array of chains over stored keys and
//! values, with growth/shrink policy and a position-based key cursor.
//!
//! Entries live in a generational arena; bucket heads and `next` links are
//! arena keys. Rehashing relinks entries in place and never moves, clones or
//! drops a key or value. Each entry caches its mixed 16-bit hash, so the new
//! bucket index is recomputed without calling back into `KeyBytes`.

use crate::config::TableConfig;
use crate::error::TableError;
use crate::guard::{Epoch, RelinkCheck};
use crate::hash::{bucket_of, mix16, KeyBytes, MAX_BUCKETS};
use log::{debug, trace, warn};
use slotmap::{DefaultKey, SlotMap};

#[derive(Debug)]
struct Node<SK, SV> {
    key: SK,
    value: SV,
    hash: u16,
    next: Option<DefaultKey>,
}

pub struct RawTable<SK, SV> {
    buckets: Vec<Option<DefaultKey>>,
    slots: SlotMap<DefaultKey, Node<SK, SV>>,
    config: TableConfig,
    epoch: Epoch,
    relink: RelinkCheck,
}

/// Position of an external key walk: a bucket index and an offset into that
/// bucket's chain.
///
/// Valid until the next structural mutation of the table it was reset
/// against; advancing a stale cursor panics.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyCursor {
    bucket: usize,
    offset: usize,
    epoch: Epoch,
}

/// Iterator over stored entries in `RawTable`, in arena order.
pub struct Iter<'a, SK, SV> {
    it: slotmap::basic::Values<'a, DefaultKey, Node<SK, SV>>,
}

impl<'a, SK, SV> Iterator for Iter<'a, SK, SV> {
    type Item = (&'a SK, &'a SV);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|n| (&n.key, &n.value))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

#[inline]
fn same_key(stored: &[u8], probe: &[u8]) -> bool {
    // Length first: keys of different length are never byte-compared.
    stored.len() == probe.len() && stored == probe
}

fn alloc_buckets(n: usize) -> Result<Vec<Option<DefaultKey>>, TableError> {
    let mut buckets = Vec::new();
    buckets
        .try_reserve_exact(n)
        .map_err(|_| TableError::OutOfMemory { buckets: n })?;
    buckets.resize(n, None);
    Ok(buckets)
}

/// Bucket count to grow to from `n`, or `None` once the hash range is used up.
fn grow_target(n: usize) -> Option<usize> {
    let target = n.saturating_mul(2).min(MAX_BUCKETS);
    (target > n).then_some(target)
}

impl<SK, SV> RawTable<SK, SV>
where
    SK: KeyBytes,
{
    pub fn new() -> Self {
        // The default config is always valid and small enough to allocate
        // through the infallible path.
        let config = TableConfig::default();
        Self {
            buckets: vec![None; config.initial_buckets],
            slots: SlotMap::with_key(),
            config,
            epoch: Epoch::default(),
            relink: RelinkCheck::new(),
        }
    }

    pub fn with_config(config: TableConfig) -> Result<Self, TableError> {
        config.validate()?;
        Ok(Self {
            buckets: alloc_buckets(config.initial_buckets)?,
            slots: SlotMap::with_key(),
            config,
            epoch: Epoch::default(),
            relink: RelinkCheck::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
    pub fn config(&self) -> TableConfig {
        self.config
    }

    /// Number of entries reachable by walking every chain. Always equals
    /// `len()`; the walk exists to check exactly that.
    pub fn chained_len(&self) -> usize {
        let mut count = 0;
        for &head in &self.buckets {
            let mut cursor = head;
            while let Some(k) = cursor {
                count += 1;
                cursor = self.slots[k].next;
            }
        }
        count
    }

    #[inline]
    fn debug_check_count(&self) {
        debug_assert_eq!(self.chained_len(), self.len(), "chain count drifted from len");
    }

    fn locate(&self, bytes: &[u8]) -> Option<DefaultKey> {
        let _g = self.relink.hold();
        let hash = mix16(bytes);
        let bucket = bucket_of(hash, self.buckets.len());
        let mut cursor = self.buckets[bucket];
        while let Some(k) = cursor {
            let node = &self.slots[k];
            if same_key(node.key.key_bytes(), bytes) {
                return Some(k);
            }
            cursor = node.next;
        }
        trace!("key not found in bucket {}", bucket);
        None
    }

    pub fn get(&self, bytes: &[u8]) -> Option<(&SK, &SV)> {
        let k = self.locate(bytes)?;
        let node = &self.slots[k];
        Some((&node.key, &node.value))
    }

    /// Swap the stored pair of an existing key for `key -> value` and hand
    /// the displaced pair back. No link changes, so cursors stay valid.
    pub fn replace(&mut self, key: SK, value: SV) -> Result<(SK, SV), TableError> {
        let k = self.locate(key.key_bytes()).ok_or(TableError::NotFound)?;
        let _g = self.relink.hold();
        let node = &mut self.slots[k];
        trace!("replacing pair in place (hash {:#06x})", node.hash);
        let old_key = core::mem::replace(&mut node.key, key);
        let old_value = core::mem::replace(&mut node.value, value);
        Ok((old_key, old_value))
    }

    pub fn contains_key(&self, bytes: &[u8]) -> bool {
        self.locate(bytes).is_some()
    }

    /// Link `key -> value`. Grows first when the load ratio is reached.
    ///
    /// On a duplicate key the stored pair is swapped in place and the
    /// displaced pair is returned for the caller to release; `len()` does
    /// not change. A growth failure leaves the table untouched.
    pub fn insert(&mut self, key: SK, value: SV) -> Result<Option<(SK, SV)>, TableError> {
        self.debug_check_count();
        self.grow_if_needed()?;

        let _g = self.relink.hold();
        let hash = mix16(key.key_bytes());
        let bucket = bucket_of(hash, self.buckets.len());

        let mut found = None;
        let mut tail = None;
        let mut cursor = self.buckets[bucket];
        while let Some(k) = cursor {
            let node = &self.slots[k];
            if same_key(node.key.key_bytes(), key.key_bytes()) {
                found = Some(k);
                break;
            }
            tail = Some(k);
            cursor = node.next;
        }
        self.epoch.bump();

        if let Some(k) = found {
            trace!("replacing existing key in bucket {}", bucket);
            let node = &mut self.slots[k];
            let old_key = core::mem::replace(&mut node.key, key);
            let old_value = core::mem::replace(&mut node.value, value);
            return Ok(Some((old_key, old_value)));
        }

        let k = self.slots.insert(Node {
            key,
            value,
            hash,
            next: None,
        });
        match tail {
            None => self.buckets[bucket] = Some(k),
            Some(t) => {
                trace!("chaining onto bucket {}", bucket);
                self.slots[t].next = Some(k);
            }
        }
        Ok(None)
    }

    /// Unlink the entry for `bytes` and hand back its stored pair.
    /// Shrinks first when the table has become sparse.
    pub fn remove(&mut self, bytes: &[u8]) -> Result<(SK, SV), TableError> {
        self.debug_check_count();
        self.shrink_if_needed();

        let _g = self.relink.hold();
        let hash = mix16(bytes);
        let bucket = bucket_of(hash, self.buckets.len());

        let mut prev: Option<DefaultKey> = None;
        let mut cursor = self.buckets[bucket];
        while let Some(k) = cursor {
            let node = &self.slots[k];
            let next = node.next;
            if same_key(node.key.key_bytes(), bytes) {
                match prev {
                    None => self.buckets[bucket] = next,
                    Some(p) => self.slots[p].next = next,
                }
                let node = self
                    .slots
                    .remove(k)
                    .expect("linked entry must be live in the arena");
                self.epoch.bump();
                return Ok((node.key, node.value));
            }
            prev = Some(k);
            cursor = next;
        }
        trace!("key not found in bucket {}", bucket);
        Err(TableError::NotFound)
    }

    /// Rehash into `new_buckets` buckets, bounded by the configured floor and
    /// the hash range.
    pub fn resize(&mut self, new_buckets: usize) -> Result<(), TableError> {
        let min = self.config.initial_buckets;
        if new_buckets < min || new_buckets > MAX_BUCKETS {
            return Err(TableError::CapacityOutOfRange {
                requested: new_buckets,
                min,
                max: MAX_BUCKETS,
            });
        }
        self.rehash(new_buckets)
    }

    fn grow_if_needed(&mut self) -> Result<(), TableError> {
        let n = self.buckets.len();
        if self.len() / n < self.config.growth_ratio {
            return Ok(());
        }
        match grow_target(n) {
            Some(target) => {
                debug!(
                    "load {} per bucket reached ratio {}, growing to {} buckets",
                    self.len() / n,
                    self.config.growth_ratio,
                    target
                );
                self.rehash(target)
            }
            None => {
                debug!("growth capped at {} buckets, chaining deeper", n);
                Ok(())
            }
        }
    }

    fn shrink_if_needed(&mut self) {
        let len = self.len();
        let n = self.buckets.len();
        // An empty table is never shrunk below where it stands.
        if len == 0 || n / len < self.config.growth_ratio {
            return;
        }
        let target = n / 2;
        if target < self.config.initial_buckets {
            return;
        }
        debug!(
            "{} buckets per key reached ratio {}, shrinking to {} buckets",
            n / len,
            self.config.growth_ratio,
            target
        );
        if let Err(e) = self.rehash(target) {
            warn!("shrink skipped: {}", e);
        }
    }

    fn rehash(&mut self, new_buckets: usize) -> Result<(), TableError> {
        let fresh = alloc_buckets(new_buckets)?;
        let _g = self.relink.hold();
        debug!(
            "rehashing {} entries from {} to {} buckets",
            self.len(),
            self.buckets.len(),
            new_buckets
        );
        let old = core::mem::replace(&mut self.buckets, fresh);
        for head in old {
            let mut cursor = head;
            while let Some(k) = cursor {
                let node = &mut self.slots[k];
                cursor = node.next;
                let bucket = bucket_of(node.hash, new_buckets);
                node.next = self.buckets[bucket];
                self.buckets[bucket] = Some(k);
            }
        }
        self.epoch.bump();
        Ok(())
    }

    /// Unlink every entry, yielding stored pairs.
    pub fn drain(&mut self) -> impl Iterator<Item = (SK, SV)> + '_ {
        self.buckets.iter_mut().for_each(|b| *b = None);
        self.epoch.bump();
        self.slots.drain().map(|(_, n)| (n.key, n.value))
    }

    pub fn iter(&self) -> Iter<'_, SK, SV> {
        Iter {
            it: self.slots.values(),
        }
    }

    fn next_occupied(&self, from: usize) -> usize {
        (from..self.buckets.len())
            .find(|&b| self.buckets[b].is_some())
            .unwrap_or(self.buckets.len())
    }

    /// A cursor resting on the first key of the first non-empty bucket.
    pub fn cursor(&self) -> KeyCursor {
        KeyCursor {
            bucket: self.next_occupied(0),
            offset: 0,
            epoch: self.epoch,
        }
    }

    pub fn cursor_reset(&self, cursor: &mut KeyCursor) {
        *cursor = self.cursor();
    }

    pub fn cursor_is_done(&self, cursor: &KeyCursor) -> bool {
        self.is_empty() || cursor.bucket >= self.buckets.len()
    }

    /// Return the key under `cursor` and advance it.
    ///
    /// # Panics
    /// If the cursor is done, or the table was structurally mutated since
    /// the cursor was reset.
    pub fn cursor_next<'t>(&'t self, cursor: &mut KeyCursor) -> &'t SK {
        assert!(
            cursor.epoch == self.epoch,
            "key cursor used after the table was structurally mutated"
        );
        assert!(
            !self.cursor_is_done(cursor),
            "key cursor advanced past the last key"
        );
        let mut at = self.buckets[cursor.bucket].expect("cursor rests on an occupied bucket");
        for _ in 0..cursor.offset {
            at = self.slots[at].next.expect("cursor offset lies within the chain");
        }
        let node = &self.slots[at];
        if node.next.is_some() {
            cursor.offset += 1;
        } else {
            cursor.offset = 0;
            cursor.bucket = self.next_occupied(cursor.bucket + 1);
        }
        &node.key
    }
}

impl<SK, SV> Default for RawTable<SK, SV>
where
    SK: KeyBytes,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn small(initial_buckets: usize, growth_ratio: usize) -> RawTable<Vec<u8>, u32> {
        RawTable::with_config(TableConfig {
            initial_buckets,
            growth_ratio,
        })
        .unwrap()
    }

    fn k(n: u32) -> Vec<u8> {
        n.to_ne_bytes().to_vec()
    }

    /// Invariant: A duplicate insert swaps the pair in place, returns the
    /// displaced pair and leaves `len()` unchanged.
    #[test]
    fn duplicate_insert_replaces_in_place() {
        let mut t: RawTable<Vec<u8>, u32> = RawTable::new();
        assert_eq!(t.insert(b"dup".to_vec(), 1).unwrap(), None);
        let old = t.insert(b"dup".to_vec(), 2).unwrap();
        assert_eq!(old, Some((b"dup".to_vec(), 1)));
        assert_eq!(t.len(), 1);
        assert_eq!(t.get(b"dup").map(|(_, v)| *v), Some(2));
    }

    /// Invariant: replace swaps key and value of an existing entry without
    /// touching links; an absent key is NotFound with the table unchanged.
    #[test]
    fn replace_swaps_pair_of_existing_key_only() {
        let mut t = small(1, 64);
        t.insert(k(1), 10).unwrap();
        t.insert(k(2), 20).unwrap();
        let mut c = t.cursor();
        assert_eq!(t.replace(k(2), 21).unwrap(), (k(2), 20));
        assert_eq!(t.get(&k(2)).map(|(_, v)| *v), Some(21));
        assert_eq!(t.cursor_next(&mut c), &k(1));

        assert_eq!(t.replace(k(3), 30), Err(TableError::NotFound));
        assert!(!t.contains_key(&k(3)));
        assert_eq!(t.len(), 2);
    }

    /// Invariant: Keys that share a prefix but differ in length are distinct.
    #[test]
    fn length_distinguishes_keys() {
        let mut t = small(1, 64);
        t.insert(b"ab".to_vec(), 1).unwrap();
        t.insert(b"abc".to_vec(), 2).unwrap();
        t.insert(b"abcd".to_vec(), 3).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.get(b"ab").map(|(_, v)| *v), Some(1));
        assert_eq!(t.get(b"abc").map(|(_, v)| *v), Some(2));
        assert_eq!(t.get(b"abcd").map(|(_, v)| *v), Some(3));
        assert!(!t.contains_key(b"a"));
    }

    /// Invariant: With a single bucket every key chains together; unlinking
    /// the head, a middle entry and the tail keeps the rest reachable.
    #[test]
    fn unlink_head_middle_and_tail_of_one_chain() {
        let mut t = small(1, 64);
        for i in 0..6 {
            t.insert(k(i), i).unwrap();
        }
        assert_eq!(t.bucket_count(), 1);

        for gone in [0, 3, 5] {
            assert_eq!(t.remove(&k(gone)).unwrap(), (k(gone), gone));
            assert_eq!(t.chained_len(), t.len());
        }
        for i in [1, 2, 4] {
            assert_eq!(t.get(&k(i)).map(|(_, v)| *v), Some(i));
        }
        for i in [0, 3, 5] {
            assert!(!t.contains_key(&k(i)));
            assert_eq!(t.remove(&k(i)), Err(TableError::NotFound));
        }
        assert_eq!(t.len(), 3);
    }

    /// Invariant: Growth happens before the insert that would exceed the
    /// ratio and doubles the bucket count.
    #[test]
    fn grows_by_doubling_at_ratio() {
        let mut t = small(4, 1);
        for i in 0..4 {
            t.insert(k(i), i).unwrap();
        }
        assert_eq!(t.bucket_count(), 4);
        t.insert(k(4), 4).unwrap();
        assert_eq!(t.bucket_count(), 8);
        for i in 0..5 {
            assert_eq!(t.get(&k(i)).map(|(_, v)| *v), Some(i));
        }
    }

    /// Invariant: Removal halves a sparse table but never below the initial
    /// bucket count; membership survives every shrink.
    #[test]
    fn shrinks_down_to_floor_only() {
        let mut t = small(4, 2);
        for i in 0..16 {
            t.insert(k(i), i).unwrap();
        }
        assert_eq!(t.bucket_count(), 8);

        for i in 0..13 {
            t.remove(&k(i)).unwrap();
        }
        assert_eq!(t.bucket_count(), 4);
        for i in 13..16 {
            assert_eq!(t.get(&k(i)).map(|(_, v)| *v), Some(i));
        }

        for i in 13..16 {
            t.remove(&k(i)).unwrap();
        }
        assert!(t.is_empty());
        assert_eq!(t.bucket_count(), 4);
        assert_eq!(t.remove(&k(0)), Err(TableError::NotFound));
    }

    /// Invariant: Manual resize preserves membership and rejects counts
    /// outside `[floor, MAX_BUCKETS]` without touching the table.
    #[test]
    fn manual_resize_bounds_and_membership() {
        let mut t = small(8, 4);
        for i in 0..100 {
            t.insert(k(i), i * 10).unwrap();
        }
        let before = t.bucket_count();

        assert_eq!(
            t.resize(4),
            Err(TableError::CapacityOutOfRange {
                requested: 4,
                min: 8,
                max: MAX_BUCKETS
            })
        );
        assert!(matches!(
            t.resize(MAX_BUCKETS + 1),
            Err(TableError::CapacityOutOfRange { .. })
        ));
        assert_eq!(t.bucket_count(), before);

        for n in [1000, 8, MAX_BUCKETS, 77] {
            t.resize(n).unwrap();
            assert_eq!(t.bucket_count(), n);
            assert_eq!(t.chained_len(), 100);
            for i in 0..100 {
                assert_eq!(t.get(&k(i)).map(|(_, v)| *v), Some(i * 10));
            }
        }
    }

    /// Invariant: Growth stops at the hash range instead of overflowing it.
    #[test]
    fn growth_target_is_capped_by_hash_range() {
        assert_eq!(grow_target(128), Some(256));
        assert_eq!(grow_target(32_768), Some(MAX_BUCKETS));
        assert_eq!(grow_target(MAX_BUCKETS), None);
    }

    /// Invariant: A cursor walk yields every key exactly once.
    #[test]
    fn cursor_visits_every_key_once() {
        let mut t = small(4, 2);
        for i in 0..50 {
            t.insert(k(i), i).unwrap();
        }
        let mut c = t.cursor();
        let mut seen = Vec::new();
        while !t.cursor_is_done(&c) {
            seen.push(t.cursor_next(&mut c).clone());
        }
        let unique: BTreeSet<_> = seen.iter().cloned().collect();
        assert_eq!(seen.len(), 50);
        assert_eq!(unique, (0..50).map(k).collect());
    }

    /// Invariant: A cursor over an empty table is done immediately.
    #[test]
    fn cursor_on_empty_table_is_done() {
        let t: RawTable<Vec<u8>, u32> = RawTable::new();
        assert!(t.cursor_is_done(&t.cursor()));
    }

    /// Invariant: Advancing past the end panics.
    #[test]
    #[should_panic(expected = "past the last key")]
    fn cursor_next_past_end_panics() {
        let mut t = small(4, 4);
        t.insert(k(1), 1).unwrap();
        let mut c = t.cursor();
        let _ = t.cursor_next(&mut c);
        let _ = t.cursor_next(&mut c);
    }

    /// Invariant: Advancing a cursor reset before a structural mutation panics.
    #[test]
    #[should_panic(expected = "structurally mutated")]
    fn cursor_next_after_mutation_panics() {
        let mut t = small(4, 4);
        t.insert(k(1), 1).unwrap();
        t.insert(k(2), 2).unwrap();
        let mut c = t.cursor();
        t.remove(&k(2)).unwrap();
        let _ = t.cursor_next(&mut c);
    }

    /// Invariant: `drain` empties every chain and yields each pair once.
    #[test]
    fn drain_yields_all_pairs() {
        let mut t = small(4, 4);
        for i in 0..10 {
            t.insert(k(i), i).unwrap();
        }
        let drained: BTreeSet<u32> = t.drain().map(|(_, v)| v).collect();
        assert_eq!(drained, (0..10).collect());
        assert!(t.is_empty());
        assert_eq!(t.chained_len(), 0);
    }
}
