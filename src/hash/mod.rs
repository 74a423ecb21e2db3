//! Hash Module
//!
//! Persistent structural hashing of call arguments and cache key derivation.

mod bind;
mod key;
mod structural;
mod value;

#[cfg(test)]
mod property_tests;

pub use bind::{Args, BoundArguments, Param, ParamKind, Signature};
pub use key::{CacheKey, KeyBuilder, KEY_WIDTH};
pub use structural::{
    djb2, hash_complex, hash_float, hash_int, mix, persistent_hash, persistent_hash_in,
    StructuralHasher, HASH_BITS, MAX_HASH_MASK,
};
pub use value::{FromValue, HashValue, Heap, NodeId, Record, Reflect, Value};
