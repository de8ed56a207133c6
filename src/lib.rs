//! chain-table: a single-threaded chained hash table whose key/value
//! ownership is chosen per table: copied in, value borrowed, or both
//! borrowed.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: one chained-bucket algorithm serving three ownership policies,
//!   with the compiler (not a runtime flag) deciding which cleanup applies.
//! - Layers:
//!   - RawTable<SK, SV>: structural table over *stored* keys/values. Bucket
//!     array of chain heads; entries live in a generational arena and are
//!     linked by arena keys. Owns growth/shrink, rehash and the key cursor.
//!   - Ownership<'a, K, V>: sealed policy implemented by the markers
//!     `Owned` (copy mode), `BorrowedValue` (value-reference mode) and
//!     `BorrowedAll` (all-reference mode). Decides what `insert` accepts,
//!     what is stored and what releasing an entry does.
//!   - Table<'a, K, V, M>: public API; adopts caller input through `M`,
//!     delegates structure to `RawTable`, releases through `M`.
//!
//! Constraints
//! - Single-threaded: one logical owner, no internal locking; the table is
//!   `!Send`/`!Sync`.
//! - Keys are compared by their byte view (`KeyBytes`): equal length first,
//!   then equal content. Keys of different length are never byte-compared.
//! - Bucket index is `mix16(key) % bucket_count`. The hash is 16 bits wide,
//!   so a table addresses at most `MAX_BUCKETS` buckets; past that, growth
//!   stops and chains lengthen.
//! - Borrowed keys/values outlive the table (`'a`); the table never drops
//!   them. Owned keys/values are dropped by the table.
//!
//! Resizing
//! - Growth: before an insert, if `len / buckets >= growth_ratio`, the
//!   bucket count doubles. Shrink: before a remove/steal, if
//!   `buckets / len >= growth_ratio` (and `len > 0`), it halves, but never
//!   below the initial bucket count.
//! - Rehash relinks arena entries into a fresh bucket array. No key or
//!   value is cloned, dropped or finalized, and no mode is switched during
//!   the move. Each entry caches its mixed hash, so `KeyBytes` is not
//!   called again.
//! - If the new bucket array cannot be allocated the table keeps its old
//!   array and the operation reports `OutOfMemory`.
//!
//! Notification
//! - `insert` over an existing key, `remove` and `destroy` release entries
//!   with notification: borrowed values (and, in all-reference mode,
//!   borrowed keys) are passed to the table's finalizers.
//! - `replace` takes the new key and value like `insert` but never reports
//!   the displaced value; a displaced borrowed key is still reported.
//! - `steal`, `free` and plain drop never run finalizers.
//!
//! Iteration
//! - `keys()`/`iter()` borrow the table, so mutation during a walk does
//!   not compile.
//! - The external cursor (`iter_reset`/`iter_is_done`/`iter_next`, or a
//!   standalone `KeyCursor`) records a mutation epoch; advancing it after
//!   an insert/remove/steal/resize panics instead of walking stale chains.
//!   Each cursor owns its position; nothing is shared between walks.
//!
//! A destroyed table is gone; using it afterwards does not compile:
//!
//! ```compile_fail
//! use chain_table::{Owned, Table};
//!
//! let t: Table<u32, u32, Owned> = Table::new(Owned);
//! t.destroy();
//! let _ = t.len();
//! ```

mod config;
mod error;
mod guard;
pub mod hash;
mod ownership;
pub mod raw_table;
mod raw_table_proptest;
mod table;

// Public surface
pub use config::{TableBuilder, TableConfig, DEFAULT_GROWTH_RATIO, DEFAULT_INITIAL_BUCKETS};
pub use error::TableError;
pub use hash::{KeyBytes, MAX_BUCKETS};
pub use ownership::{
    BorrowedAll, BorrowedValue, Finalizer, Finalizers, Mode, Notify, Owned, Ownership,
};
pub use raw_table::KeyCursor;
pub use table::{Iter, Keys, Table};
