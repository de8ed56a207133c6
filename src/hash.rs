//! Key bytes and the 16-bit bucket hash.
//!
//! The table never looks at a key through `Hash`/`Eq`; it hashes and
//! compares the byte view returned by [`KeyBytes`]. Two keys are the same
//! key iff their byte views have equal length and equal content.
//!
//! The mixer produces a `u16`, so a table can address at most
//! [`MAX_BUCKETS`] buckets. Growth stops there and chains get longer.

/// Starting state of the mixer.
pub const HASH_SEED: u16 = 0xbabe;

/// Largest bucket count the 16-bit hash can spread keys over.
pub const MAX_BUCKETS: usize = u16::MAX as usize;

/// Byte view of a key, replacing an explicit `(pointer, length)` pair.
///
/// Implementations must return the same bytes for the whole time the key is
/// stored in a table.
pub trait KeyBytes {
    fn key_bytes(&self) -> &[u8];
}

impl KeyBytes for [u8] {
    #[inline]
    fn key_bytes(&self) -> &[u8] {
        self
    }
}

impl<const N: usize> KeyBytes for [u8; N] {
    #[inline]
    fn key_bytes(&self) -> &[u8] {
        self
    }
}

impl KeyBytes for Vec<u8> {
    #[inline]
    fn key_bytes(&self) -> &[u8] {
        self
    }
}

impl KeyBytes for Box<[u8]> {
    #[inline]
    fn key_bytes(&self) -> &[u8] {
        self
    }
}

impl KeyBytes for str {
    #[inline]
    fn key_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl KeyBytes for String {
    #[inline]
    fn key_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl<T: ?Sized + KeyBytes> KeyBytes for &T {
    #[inline]
    fn key_bytes(&self) -> &[u8] {
        (**self).key_bytes()
    }
}

// Integers hash by their in-memory (native-endian) representation.
macro_rules! int_key_bytes {
    ($($t:ty),* $(,)?) => {$(
        impl KeyBytes for $t {
            #[inline]
            fn key_bytes(&self) -> &[u8] {
                // SAFETY: primitive integers have no padding and every byte
                // is initialized; the slice borrows `self`.
                unsafe {
                    core::slice::from_raw_parts(
                        (self as *const $t).cast::<u8>(),
                        core::mem::size_of::<$t>(),
                    )
                }
            }
        }
    )*};
}

int_key_bytes!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

/// Mix `bytes` into a 16-bit hash.
///
/// Walks the key as native-endian 16-bit words, salting each word with its
/// position. A trailing odd byte does not contribute. Not resistant to
/// adversarial keys.
pub fn mix16(bytes: &[u8]) -> u16 {
    let mut hash = HASH_SEED;
    for (i, pair) in bytes.chunks_exact(2).enumerate() {
        let word = u16::from_ne_bytes([pair[0], pair[1]]) as usize;
        hash ^= ((i << 4) ^ (word << 8) ^ word) as u16;
    }
    hash
}

/// Fold a mixed hash into `[0, bucket_count)`.
#[inline]
pub fn bucket_of(hash: u16, bucket_count: usize) -> usize {
    debug_assert!(bucket_count > 0 && bucket_count <= MAX_BUCKETS);
    hash as usize % bucket_count
}
