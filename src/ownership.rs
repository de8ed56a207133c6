//! Ownership modes: who copies, who keeps, and who is told when an entry
//! leaves the table.
//!
//! | marker            | [`Mode`]   | stored key      | stored value    |
//! |-------------------|------------|-----------------|-----------------|
//! | [`Owned`]         | `Copy`     | `K::Owned`      | `V::Owned`      |
//! | [`BorrowedValue`] | `ValueRef` | `K::Owned`      | `&'a V`         |
//! | [`BorrowedAll`]   | `AllRef`   | `&'a K`         | `&'a V`         |
//!
//! Owned data is dropped by the table. Borrowed data is never dropped; when
//! an entry is released with [`Notify::Finalize`] the configured finalizers
//! are called with the borrowed reference instead. [`Notify::KeyOnly`] (used
//! by `replace`) reports a borrowed key but never the value. `Owned` tables
//! never call finalizers.

use crate::hash::KeyBytes;
use core::borrow::Borrow;

/// Runtime description of a table's ownership marker.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Mode {
    /// Keys and values are copied in and owned by the table.
    Copy,
    /// Keys are copied in; values are borrowed from the caller.
    ValueRef,
    /// Keys and values are both borrowed from the caller.
    AllRef,
}

/// Callback run on a borrowed key or value when its entry is released.
pub type Finalizer<'a, T> = Box<dyn FnMut(&'a T) + 'a>;

/// Optional key/value finalizers attached to a table at construction.
pub struct Finalizers<'a, K: ?Sized, V: ?Sized> {
    pub(crate) key: Option<Finalizer<'a, K>>,
    pub(crate) value: Option<Finalizer<'a, V>>,
}

impl<'a, K: ?Sized, V: ?Sized> Finalizers<'a, K, V> {
    pub fn new(key: Option<Finalizer<'a, K>>, value: Option<Finalizer<'a, V>>) -> Self {
        Self { key, value }
    }

    fn run_key(&mut self, key: &'a K) {
        if let Some(f) = self.key.as_mut() {
            f(key);
        }
    }

    fn run_value(&mut self, value: &'a V) {
        if let Some(f) = self.value.as_mut() {
            f(value);
        }
    }
}

impl<K: ?Sized, V: ?Sized> Default for Finalizers<'_, K, V> {
    fn default() -> Self {
        Self {
            key: None,
            value: None,
        }
    }
}

impl<K: ?Sized, V: ?Sized> core::fmt::Debug for Finalizers<'_, K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Finalizers")
            .field("key", &self.key.is_some())
            .field("value", &self.value.is_some())
            .finish()
    }
}

/// Which finalizers releasing an entry may run.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Notify {
    Finalize,
    /// Key finalizer only; the value is handed off without teardown.
    KeyOnly,
    Silent,
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Owned {}
    impl Sealed for super::BorrowedValue {}
    impl Sealed for super::BorrowedAll {}
}

/// Copy mode marker.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Owned;

/// Value-reference mode marker.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BorrowedValue;

/// All-reference mode marker.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BorrowedAll;

/// Storage policy of a table. Implemented only by the three mode markers.
///
/// `KeyArg`/`ValueArg` are what `insert`/`replace` accept: a short borrow
/// when the table copies, a borrow for the table's whole lifetime `'a`
/// when it keeps the reference.
pub trait Ownership<'a, K: ?Sized + 'a, V: ?Sized + 'a>: sealed::Sealed {
    const MODE: Mode;

    type Key: KeyBytes;
    type Value;

    type KeyArg<'k>
    where
        K: 'k;
    type ValueArg<'k>
    where
        V: 'k;

    fn adopt_key<'k>(key: Self::KeyArg<'k>) -> Self::Key
    where
        K: 'k;

    fn adopt_value<'k>(value: Self::ValueArg<'k>) -> Self::Value
    where
        V: 'k;

    fn key_ref(key: &Self::Key) -> &K;

    fn value_ref(value: &Self::Value) -> &V;

    /// Dispose of an unlinked entry.
    fn release(
        key: Self::Key,
        value: Self::Value,
        finalizers: &mut Finalizers<'a, K, V>,
        notify: Notify,
    );
}

impl<'a, K, V> Ownership<'a, K, V> for Owned
where
    K: ?Sized + KeyBytes + ToOwned + 'a,
    K::Owned: KeyBytes,
    V: ?Sized + ToOwned + 'a,
{
    const MODE: Mode = Mode::Copy;

    type Key = K::Owned;
    type Value = V::Owned;

    type KeyArg<'k> = &'k K
    where
        K: 'k;
    type ValueArg<'k> = &'k V
    where
        V: 'k;

    #[inline]
    fn adopt_key<'k>(key: &'k K) -> K::Owned
    where
        K: 'k,
    {
        key.to_owned()
    }

    #[inline]
    fn adopt_value<'k>(value: &'k V) -> V::Owned
    where
        V: 'k,
    {
        value.to_owned()
    }

    #[inline]
    fn key_ref(key: &K::Owned) -> &K {
        key.borrow()
    }

    #[inline]
    fn value_ref(value: &V::Owned) -> &V {
        value.borrow()
    }

    fn release(key: K::Owned, value: V::Owned, _: &mut Finalizers<'a, K, V>, _: Notify) {
        drop(key);
        drop(value);
    }
}

impl<'a, K, V> Ownership<'a, K, V> for BorrowedValue
where
    K: ?Sized + KeyBytes + ToOwned + 'a,
    K::Owned: KeyBytes,
    V: ?Sized + 'a,
{
    const MODE: Mode = Mode::ValueRef;

    type Key = K::Owned;
    type Value = &'a V;

    type KeyArg<'k> = &'k K
    where
        K: 'k;
    type ValueArg<'k> = &'a V
    where
        V: 'k;

    #[inline]
    fn adopt_key<'k>(key: &'k K) -> K::Owned
    where
        K: 'k,
    {
        key.to_owned()
    }

    #[inline]
    fn adopt_value<'k>(value: &'a V) -> &'a V
    where
        V: 'k,
    {
        value
    }

    #[inline]
    fn key_ref(key: &K::Owned) -> &K {
        key.borrow()
    }

    #[inline]
    fn value_ref<'s>(value: &'s &'a V) -> &'s V {
        value
    }

    fn release(key: K::Owned, value: &'a V, finalizers: &mut Finalizers<'a, K, V>, notify: Notify) {
        drop(key);
        if notify == Notify::Finalize {
            finalizers.run_value(value);
        }
    }
}

impl<'a, K, V> Ownership<'a, K, V> for BorrowedAll
where
    K: ?Sized + KeyBytes + 'a,
    V: ?Sized + 'a,
{
    const MODE: Mode = Mode::AllRef;

    type Key = &'a K;
    type Value = &'a V;

    type KeyArg<'k> = &'a K
    where
        K: 'k;
    type ValueArg<'k> = &'a V
    where
        V: 'k;

    #[inline]
    fn adopt_key<'k>(key: &'a K) -> &'a K
    where
        K: 'k,
    {
        key
    }

    #[inline]
    fn adopt_value<'k>(value: &'a V) -> &'a V
    where
        V: 'k,
    {
        value
    }

    #[inline]
    fn key_ref<'s>(key: &'s &'a K) -> &'s K {
        key
    }

    #[inline]
    fn value_ref<'s>(value: &'s &'a V) -> &'s V {
        value
    }

    fn release(key: &'a K, value: &'a V, finalizers: &mut Finalizers<'a, K, V>, notify: Notify) {
        match notify {
            Notify::Finalize => {
                finalizers.run_key(key);
                finalizers.run_value(value);
            }
            Notify::KeyOnly => finalizers.run_key(key),
            Notify::Silent => {}
        }
    }
}
