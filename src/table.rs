//! Table: public map. Applies an ownership mode on top of `RawTable`.
//!
//! Every release of an entry happens after `RawTable` has unlinked it, so a
//! finalizer always observes a consistent table.

use crate::config::{TableBuilder, TableConfig};
use crate::error::TableError;
use crate::hash::KeyBytes;
use crate::ownership::{Finalizer, Finalizers, Mode, Notify, Ownership};
use crate::raw_table::{self, KeyCursor, RawTable};
use core::marker::PhantomData;
use log::debug;

/// Chained hash table whose key/value ownership is fixed by the mode
/// marker `M` ([`Owned`](crate::Owned), [`BorrowedValue`](crate::BorrowedValue)
/// or [`BorrowedAll`](crate::BorrowedAll)).
///
/// One logical owner, no internal locking. Borrowed keys and values must
/// outlive the table, which the `'a` lifetime enforces.
pub struct Table<'a, K, V, M>
where
    K: ?Sized + KeyBytes + 'a,
    V: ?Sized + 'a,
    M: Ownership<'a, K, V>,
{
    raw: RawTable<M::Key, M::Value>,
    mode: M,
    finalizers: Finalizers<'a, K, V>,
    cursor: KeyCursor,
}

impl<'a, K, V, M> Table<'a, K, V, M>
where
    K: ?Sized + KeyBytes + 'a,
    V: ?Sized + 'a,
    M: Ownership<'a, K, V>,
{
    /// Empty table with the default sizing and no finalizers.
    pub fn new(mode: M) -> Self {
        Self::from_raw(mode, RawTable::new(), Finalizers::default())
    }

    /// Empty table with the default sizing that reports released borrowed
    /// keys/values to the given finalizers (see [`Ownership`] for when).
    pub fn new_with_destructors(
        mode: M,
        key_finalizer: Option<Finalizer<'a, K>>,
        value_finalizer: Option<Finalizer<'a, V>>,
    ) -> Self {
        Self::from_raw(
            mode,
            RawTable::new(),
            Finalizers::new(key_finalizer, value_finalizer),
        )
    }

    pub fn with_config(mode: M, config: TableConfig) -> Result<Self, TableError> {
        Self::from_parts(mode, config, Finalizers::default())
    }

    pub fn builder(mode: M) -> TableBuilder<'a, K, V, M> {
        TableBuilder::new(mode)
    }

    pub(crate) fn from_parts(
        mode: M,
        config: TableConfig,
        finalizers: Finalizers<'a, K, V>,
    ) -> Result<Self, TableError> {
        Ok(Self::from_raw(mode, RawTable::with_config(config)?, finalizers))
    }

    fn from_raw(mode: M, raw: RawTable<M::Key, M::Value>, finalizers: Finalizers<'a, K, V>) -> Self {
        let cursor = raw.cursor();
        Self {
            raw,
            mode,
            finalizers,
            cursor,
        }
    }

    pub fn mode(&self) -> Mode {
        M::MODE
    }
    pub fn len(&self) -> usize {
        self.raw.len()
    }
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
    pub fn bucket_count(&self) -> usize {
        self.raw.bucket_count()
    }
    pub fn growth_ratio(&self) -> usize {
        self.raw.config().growth_ratio
    }

    /// Number of entries found by walking every chain; equals `len()`.
    pub fn chained_len(&self) -> usize {
        self.raw.chained_len()
    }

    /// Insert `key -> value`, replacing the entry for an equal key.
    ///
    /// A replaced entry is released with notification, so borrowed modes
    /// report its old key/value to the finalizers. `len()` grows only for
    /// a new key.
    pub fn insert<'k>(&mut self, key: M::KeyArg<'k>, value: M::ValueArg<'k>) -> Result<(), TableError>
    where
        K: 'k,
        V: 'k,
    {
        let key = M::adopt_key(key);
        let value = M::adopt_value(value);
        if let Some((old_key, old_value)) = self.raw.insert(key, value)? {
            M::release(old_key, old_value, &mut self.finalizers, Notify::Finalize);
        }
        Ok(())
    }

    /// Like [`Table::insert`] for a key that must already be present, except
    /// that the displaced value is handed off without running the value
    /// finalizer.
    ///
    /// The new key and value are adopted per mode and take the entry's place.
    /// The displaced key is released as on insert (a borrowed key is reported
    /// to the key finalizer in all-reference mode). Fails with `NotFound`,
    /// leaving the table unchanged, if the key is absent.
    pub fn replace<'k>(&mut self, key: M::KeyArg<'k>, value: M::ValueArg<'k>) -> Result<(), TableError>
    where
        K: 'k,
        V: 'k,
    {
        let (old_key, old_value) = self
            .raw
            .replace(M::adopt_key(key), M::adopt_value(value))?;
        M::release(old_key, old_value, &mut self.finalizers, Notify::KeyOnly);
        Ok(())
    }

    /// Remove `key`, releasing its entry with notification.
    pub fn remove(&mut self, key: &K) -> Result<(), TableError> {
        let (k, v) = self.raw.remove(key.key_bytes())?;
        M::release(k, v, &mut self.finalizers, Notify::Finalize);
        Ok(())
    }

    /// Remove `key` without notification, handing the stored pair back.
    pub fn steal(&mut self, key: &K) -> Result<(M::Key, M::Value), TableError> {
        self.raw.remove(key.key_bytes())
    }

    /// Rehash into `buckets` buckets. Bounded below by the initial bucket
    /// count and above by [`MAX_BUCKETS`](crate::MAX_BUCKETS); on failure the
    /// table is unchanged.
    pub fn resize(&mut self, buckets: usize) -> Result<(), TableError> {
        self.raw.resize(buckets)
    }

    /// The stored value for `key`. Valid until the next mutation.
    pub fn lookup(&self, key: &K) -> Option<&V> {
        self.raw.get(key.key_bytes()).map(|(_, v)| M::value_ref(v))
    }

    /// The stored key and value for `key`. In copy modes the key is the
    /// table's own copy.
    pub fn lookup_extended(&self, key: &K) -> Option<(&K, &V)> {
        self.raw
            .get(key.key_bytes())
            .map(|(k, v)| (M::key_ref(k), M::value_ref(v)))
    }

    pub fn has_key(&self, key: &K) -> bool {
        self.raw.contains_key(key.key_bytes())
    }

    /// Release every entry with notification, then free the table.
    pub fn destroy(self) {
        let Table {
            mut raw,
            mut finalizers,
            ..
        } = self;
        debug!("destroying {:?} table with {} entries", M::MODE, raw.len());
        for (k, v) in raw.drain() {
            M::release(k, v, &mut finalizers, Notify::Finalize);
        }
    }

    /// Free the table without notifying anyone. Owned keys/values are
    /// dropped; borrowed ones stay the caller's concern. Same as dropping.
    pub fn free(self) {
        debug!("freeing {:?} table with {} entries", M::MODE, self.len());
        drop(self);
    }

    /// Rewind the table's own key cursor to the first key.
    pub fn iter_reset(&mut self) {
        self.raw.cursor_reset(&mut self.cursor);
    }

    pub fn iter_is_done(&self) -> bool {
        self.raw.cursor_is_done(&self.cursor)
    }

    /// Return the key under the table's cursor and advance it.
    ///
    /// # Panics
    /// If the cursor is done, or the table was structurally mutated
    /// (insert, remove, steal, resize) since `iter_reset`.
    pub fn iter_next(&mut self) -> &K {
        M::key_ref(self.raw.cursor_next(&mut self.cursor))
    }

    /// A standalone cursor at the first key, for walks driven against `&self`.
    pub fn key_cursor(&self) -> KeyCursor {
        self.raw.cursor()
    }

    pub fn cursor_is_done(&self, cursor: &KeyCursor) -> bool {
        self.raw.cursor_is_done(cursor)
    }

    /// See [`Table::iter_next`].
    pub fn cursor_next<'t>(&'t self, cursor: &mut KeyCursor) -> &'t K {
        M::key_ref(self.raw.cursor_next(cursor))
    }

    pub fn keys(&self) -> Keys<'_, 'a, K, V, M> {
        Keys {
            inner: self.raw.iter(),
            _marker: PhantomData,
        }
    }

    pub fn iter(&self) -> Iter<'_, 'a, K, V, M> {
        Iter {
            inner: self.raw.iter(),
            _marker: PhantomData,
        }
    }
}

/// Keys of a [`Table`], in arena order.
pub struct Keys<'t, 'a: 't, K, V, M>
where
    K: ?Sized + KeyBytes + 'a,
    V: ?Sized + 'a,
    M: Ownership<'a, K, V>,
{
    inner: raw_table::Iter<'t, M::Key, M::Value>,
    _marker: PhantomData<(fn() -> M, &'a K, &'a V)>,
}

impl<'t, 'a: 't, K, V, M> Iterator for Keys<'t, 'a, K, V, M>
where
    K: ?Sized + KeyBytes + 'a,
    V: ?Sized + 'a,
    M: Ownership<'a, K, V>,
{
    type Item = &'t K;

    #[inline]
    fn next(&mut self) -> Option<&'t K> {
        self.inner.next().map(|(k, _)| M::key_ref(k))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Key/value pairs of a [`Table`], in arena order.
pub struct Iter<'t, 'a: 't, K, V, M>
where
    K: ?Sized + KeyBytes + 'a,
    V: ?Sized + 'a,
    M: Ownership<'a, K, V>,
{
    inner: raw_table::Iter<'t, M::Key, M::Value>,
    _marker: PhantomData<(fn() -> M, &'a K, &'a V)>,
}

impl<'t, 'a: 't, K, V, M> Iterator for Iter<'t, 'a, K, V, M>
where
    K: ?Sized + KeyBytes + 'a,
    V: ?Sized + 'a,
    M: Ownership<'a, K, V>,
{
    type Item = (&'t K, &'t V);

    #[inline]
    fn next(&mut self) -> Option<(&'t K, &'t V)> {
        self.inner
            .next()
            .map(|(k, v)| (M::key_ref(k), M::value_ref(v)))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V, M> core::fmt::Debug for Table<'a, K, V, M>
where
    K: ?Sized + KeyBytes + 'a,
    V: ?Sized + 'a,
    M: Ownership<'a, K, V> + core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Table")
            .field("mode", &self.mode)
            .field("len", &self.len())
            .field("buckets", &self.bucket_count())
            .field("finalizers", &self.finalizers)
            .finish()
    }
}
