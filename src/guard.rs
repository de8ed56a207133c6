//! Misuse detection for single-threaded tables.
//!
//! - [`RelinkCheck`] flags a table that is entered again while one of its
//!   chain walks is still open, e.g. from a `KeyBytes` impl that reaches back
//!   into the table. Debug builds only.
//! - [`Epoch`] stamps every structural mutation so a key cursor can tell it
//!   was invalidated. Always on.

#[cfg(debug_assertions)]
use core::cell::Cell;
use core::marker::PhantomData;

/// Busy flag for a table's chains. Also keeps the owning table
/// `!Send`/`!Sync`.
#[derive(Debug)]
pub(crate) struct RelinkCheck {
    #[cfg(debug_assertions)]
    busy: Cell<bool>,
    _single_owner: PhantomData<*mut ()>,
}

impl RelinkCheck {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            busy: Cell::new(false),
            _single_owner: PhantomData,
        }
    }

    /// Mark the chains busy until the returned hold drops.
    #[inline]
    pub(crate) fn hold(&self) -> RelinkHold<'_> {
        #[cfg(debug_assertions)]
        assert!(
            !self.busy.replace(true),
            "table re-entered during a chain walk"
        );
        RelinkHold { check: self }
    }
}

pub(crate) struct RelinkHold<'a> {
    #[cfg_attr(not(debug_assertions), allow(dead_code))]
    check: &'a RelinkCheck,
}

impl Drop for RelinkHold<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.check.busy.set(false);
    }
}

/// Monotonic count of structural mutations (link, unlink, rehash).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct Epoch(u64);

impl Epoch {
    #[inline]
    pub(crate) fn bump(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}
