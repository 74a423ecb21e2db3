//! Cache Key Module
//!
//! Derives a fixed-width byte key from bound call arguments.

use std::fmt;

use crate::error::Result;
use crate::hash::bind::BoundArguments;
use crate::hash::structural::{persistent_hash_in, HASH_BITS};
use crate::hash::value::{HashValue, Value};

/// Width of a cache key in bytes.
pub const KEY_WIDTH: usize = (HASH_BITS / 8) as usize;

// == Cache Key ==
/// Little-endian bytes of the argument hash.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(Vec<u8>);

impl CacheKey {
    /// Encodes a hash as a key.
    pub fn from_hash(hash: HashValue) -> Self {
        Self(hash.to_le_bytes()[..KEY_WIDTH].to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Lowercase hex form, as used on the wire by the remote store.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl AsRef<[u8]> for CacheKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({})", self.to_hex())
    }
}

// == Key Builder ==
/// Canonicalizes bound arguments and hashes them.
///
/// Arguments are sorted by parameter name and each one becomes a
/// `(name, value)` tuple, or `(name, type, value)` when `typed` is set,
/// so `f(1, 2)` and `f(b=2, a=1)` produce the same key.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyBuilder {
    typed: bool,
}

impl KeyBuilder {
    pub fn new(typed: bool) -> Self {
        Self { typed }
    }

    pub fn typed(&self) -> bool {
        self.typed
    }

    /// Hashes the canonical argument list.
    pub fn hash(&self, bound: &BoundArguments) -> Result<HashValue> {
        let heap = bound.heap();
        let mut arguments: Vec<(&str, &Value)> = bound.iter().collect();
        arguments.sort_by(|a, b| a.0.cmp(b.0));

        let mut canonical = Vec::with_capacity(arguments.len());
        for (name, value) in arguments {
            let mut element = vec![Value::Str(name.to_string())];
            if self.typed {
                element.push(Value::Type(value.type_name(heap)));
            }
            element.push(value.clone());
            canonical.push(Value::Tuple(element));
        }

        persistent_hash_in(heap, &Value::List(canonical))
    }

    /// Builds the cache key for one call.
    pub fn build(&self, bound: &BoundArguments) -> Result<CacheKey> {
        self.hash(bound).map(CacheKey::from_hash)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::bind::{Args, Signature};
    use crate::hash::value::Record;

    fn sig() -> Signature {
        Signature::new("f").param("a").param("b")
    }

    #[test]
    fn test_call_shapes_share_a_key() {
        let builder = KeyBuilder::new(false);
        let positional = builder.build(&sig().bind(Args::new().arg(1).arg(2)).unwrap()).unwrap();
        let keywords = builder
            .build(&sig().bind(Args::new().kwarg("b", 2).kwarg("a", 1)).unwrap())
            .unwrap();
        let mixed = builder
            .build(&sig().bind(Args::new().arg(1).kwarg("b", 2)).unwrap())
            .unwrap();

        assert_eq!(positional, keywords);
        assert_eq!(positional, mixed);
    }

    #[test]
    fn test_defaults_share_a_key() {
        let sig = Signature::new("f").param("a").param_with_default("b", 2);
        let builder = KeyBuilder::new(false);

        let implicit = builder.build(&sig.bind(Args::new().arg(1)).unwrap()).unwrap();
        let explicit = builder.build(&sig.bind(Args::new().arg(1).arg(2)).unwrap()).unwrap();

        assert_eq!(implicit, explicit);
    }

    #[test]
    fn test_different_values_differ() {
        let builder = KeyBuilder::new(false);
        let one = builder.build(&sig().bind(Args::new().arg(1).arg(2)).unwrap()).unwrap();
        let two = builder.build(&sig().bind(Args::new().arg(2).arg(1)).unwrap()).unwrap();
        assert_ne!(one, two);
    }

    #[test]
    fn test_typed_distinguishes_int_and_float() {
        let sig = Signature::new("f").param("x");
        let int_call = sig.bind(Args::new().arg(1)).unwrap();
        let float_call = sig.bind(Args::new().arg(1.0)).unwrap();

        let untyped = KeyBuilder::new(false);
        assert_eq!(untyped.build(&int_call).unwrap(), untyped.build(&float_call).unwrap());

        let typed = KeyBuilder::new(true);
        assert_ne!(typed.build(&int_call).unwrap(), typed.build(&float_call).unwrap());
    }

    #[test]
    fn test_typed_keys_use_record_type_name() {
        let sig = Signature::new("f").param("p");
        let call = |type_name: &str| {
            let record = Record::new(type_name).field("x", 1).field("y", 2);
            sig.bind(Args::new().arg(Value::object(record))).unwrap()
        };

        let untyped = KeyBuilder::new(false);
        assert_eq!(untyped.build(&call("Point")).unwrap(), untyped.build(&call("Vector")).unwrap());

        let typed = KeyBuilder::new(true);
        assert_eq!(typed.build(&call("Point")).unwrap(), typed.build(&call("Point")).unwrap());
        assert_ne!(typed.build(&call("Point")).unwrap(), typed.build(&call("Vector")).unwrap());
    }

    #[test]
    fn test_key_width() {
        let key = KeyBuilder::default()
            .build(&sig().bind(Args::new().arg(1).arg(2)).unwrap())
            .unwrap();
        assert_eq!(key.as_bytes().len(), KEY_WIDTH);
        assert_eq!(key.to_hex().len(), KEY_WIDTH * 2);
    }

    // Reference values recorded from the reference algorithm on a 64-bit
    // platform for f(a=1, b=2).
    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_golden_keys() {
        let bound = sig().bind(Args::new().arg(1).arg(2)).unwrap();

        assert_eq!(KeyBuilder::new(false).hash(&bound).unwrap(), 10659348419085554407);
        assert_eq!(KeyBuilder::new(true).hash(&bound).unwrap(), 4970978787676869001);
        assert_eq!(
            KeyBuilder::new(false).build(&bound).unwrap().into_bytes(),
            10659348419085554407u64.to_le_bytes().to_vec()
        );
    }
}
