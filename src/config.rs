//! Sizing knobs for a table, and the builder that combines them with
//! finalizers.

use crate::error::TableError;
use crate::hash::{KeyBytes, MAX_BUCKETS};
use crate::ownership::{Finalizers, Ownership};
use crate::table::Table;

/// Bucket count of a freshly created table; also the shrink floor.
pub const DEFAULT_INITIAL_BUCKETS: usize = 128;

/// Entries per bucket that trigger growth (and, inverted, shrinking).
pub const DEFAULT_GROWTH_RATIO: usize = 4;

/// Sizing of a table, fixed at construction.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TableConfig {
    /// Bucket count at creation. The table never shrinks below it.
    pub initial_buckets: usize,
    /// The table doubles when `len / buckets >= growth_ratio` and halves when
    /// `buckets / len >= growth_ratio`.
    pub growth_ratio: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            initial_buckets: DEFAULT_INITIAL_BUCKETS,
            growth_ratio: DEFAULT_GROWTH_RATIO,
        }
    }
}

impl TableConfig {
    pub fn validate(&self) -> Result<(), TableError> {
        if self.growth_ratio == 0 {
            return Err(TableError::InvalidArgument("growth ratio must be at least 1"));
        }
        if self.initial_buckets == 0 || self.initial_buckets > MAX_BUCKETS {
            return Err(TableError::CapacityOutOfRange {
                requested: self.initial_buckets,
                min: 1,
                max: MAX_BUCKETS,
            });
        }
        Ok(())
    }
}

/// Builds a [`Table`] with non-default sizing or finalizers.
///
/// ```
/// use chain_table::{BorrowedAll, Table};
/// use std::cell::Cell;
///
/// let released = Cell::new(0);
/// let (k, v) = (1u32, 2u32);
/// let mut t: Table<u32, u32, BorrowedAll> = Table::builder(BorrowedAll)
///     .initial_buckets(16)
///     .growth_ratio(2)
///     .value_finalizer(|_: &u32| released.set(released.get() + 1))
///     .build()
///     .unwrap();
/// t.insert(&k, &v).unwrap();
/// t.destroy();
/// assert_eq!(released.get(), 1);
/// ```
pub struct TableBuilder<'a, K: ?Sized, V: ?Sized, M> {
    mode: M,
    config: TableConfig,
    finalizers: Finalizers<'a, K, V>,
}

impl<'a, K, V, M> TableBuilder<'a, K, V, M>
where
    K: ?Sized + KeyBytes + 'a,
    V: ?Sized + 'a,
    M: Ownership<'a, K, V>,
{
    pub(crate) fn new(mode: M) -> Self {
        Self {
            mode,
            config: TableConfig::default(),
            finalizers: Finalizers::default(),
        }
    }

    pub fn config(mut self, config: TableConfig) -> Self {
        self.config = config;
        self
    }

    pub fn initial_buckets(mut self, n: usize) -> Self {
        self.config.initial_buckets = n;
        self
    }

    pub fn growth_ratio(mut self, ratio: usize) -> Self {
        self.config.growth_ratio = ratio;
        self
    }

    /// Called with each borrowed key released with notification
    /// (all-reference mode only).
    pub fn key_finalizer(mut self, f: impl FnMut(&'a K) + 'a) -> Self {
        self.finalizers.key = Some(Box::new(f));
        self
    }

    /// Called with each borrowed value released with notification
    /// (value-reference and all-reference modes).
    pub fn value_finalizer(mut self, f: impl FnMut(&'a V) + 'a) -> Self {
        self.finalizers.value = Some(Box::new(f));
        self
    }

    pub fn build(self) -> Result<Table<'a, K, V, M>, TableError> {
        Table::from_parts(self.mode, self.config, self.finalizers)
    }
}
