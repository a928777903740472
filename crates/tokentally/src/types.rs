//! # Common Types and Traits

use core::fmt::{Debug, Display};
use core::hash::Hash;

use num_traits::{FromPrimitive, PrimInt, ToPrimitive, Unsigned};

/// A type that can be used as a token rank in a BPE encoding.
///
/// These are constrained to be unsigned primitive integers;
/// such that the max rank in a vocabulary is less than `T::max_value()`
/// (the max value is reserved as the "no rank" sentinel in the merge loop).
pub trait TokenType:
    'static
    + PrimInt
    + FromPrimitive
    + ToPrimitive
    + Unsigned
    + Hash
    + Default
    + Debug
    + Display
    + Send
    + Sync
{
}

impl<T> TokenType for T where
    T: 'static
        + PrimInt
        + FromPrimitive
        + ToPrimitive
        + Unsigned
        + Hash
        + Default
        + Debug
        + Display
        + Send
        + Sync
{
}

/// Type Alias for hash maps in this crate.
pub type TallyHashMap<K, V> = ahash::AHashMap<K, V>;

/// Type Alias for hash sets in this crate.
pub type TallyHashSet<V> = ahash::AHashSet<V>;
