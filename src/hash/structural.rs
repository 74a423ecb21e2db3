//! Structural Hasher Module
//!
//! Turns a value graph into an integer that stays the same across process
//! restarts. Shared nodes are hashed once per computation and cycles are
//! replaced by a substitute derived from their discovery order.

use std::collections::HashMap;

use crate::error::{MemoError, Result};
use crate::hash::value::{HashValue, Heap, NodeId, Reflect, Value};

// == Public Constants ==
/// Bit width of every hash, the platform's native word width.
pub const HASH_BITS: u32 = usize::BITS;

/// Mask applied to every hash so it fits the native word width.
pub const MAX_HASH_MASK: HashValue = usize::MAX as HashValue;

// == Algorithm Constants ==
const CYCLE_FACTOR: HashValue = 873_506_627;
const NONE_HASH: i64 = -776_769_781;
const DJB2_SEED: HashValue = 5381;

const MIX_SEED: HashValue = 3_430_008;
const MIX_MULTIPLIER: HashValue = 1_000_003;
const MIX_MULTIPLIER_STEP: HashValue = 82_520;
const MIX_FINAL: HashValue = 97_531;

// Numeric hashing reduces modulo the Mersenne prime 2^61 - 1.
const MODULUS_BITS: u32 = 61;
const MODULUS: u64 = (1 << MODULUS_BITS) - 1;
const INFINITY_HASH: i64 = 314_159;
const IMAG_MULTIPLIER: u64 = 1_000_003;

// == Building Blocks ==
/// DJB2 running hash over bytes: `h = h * 33 + byte`, starting at 5381.
pub fn djb2(bytes: &[u8]) -> HashValue {
    bytes.iter().fold(DJB2_SEED, |hash, &byte| {
        hash.wrapping_shl(5)
            .wrapping_add(hash)
            .wrapping_add(HashValue::from(byte))
    })
}

/// Order-sensitive mix of element hashes.
pub fn mix(items: &[HashValue]) -> HashValue {
    let mut multiplier = MIX_MULTIPLIER;
    let mut x = MIX_SEED;
    for (index, &item) in items.iter().enumerate().rev() {
        x = (x ^ item).wrapping_mul(multiplier);
        multiplier = multiplier.wrapping_add(MIX_MULTIPLIER_STEP + 2 * index as HashValue);
    }
    x.wrapping_add(MIX_FINAL)
}

/// Stable integer hash; equal to the hash of the same number as a float.
pub fn hash_int(n: i64) -> i64 {
    let reduced = (n.unsigned_abs() % MODULUS) as i64;
    let hash = if n < 0 { -reduced } else { reduced };
    if hash == -1 {
        -2
    } else {
        hash
    }
}

/// Stable float hash; integral floats hash like the matching integer.
pub fn hash_float(value: f64) -> i64 {
    if value.is_nan() {
        return 0;
    }
    if value.is_infinite() {
        return if value > 0.0 {
            INFINITY_HASH
        } else {
            -INFINITY_HASH
        };
    }

    let (mut mantissa, mut exponent) = frexp(value);
    let mut sign = 1;
    if mantissa < 0.0 {
        sign = -1;
        mantissa = -mantissa;
    }

    // Consume the mantissa 28 bits at a time, rotating within 61 bits.
    let mut x: u64 = 0;
    while mantissa != 0.0 {
        x = ((x << 28) & MODULUS) | x >> (MODULUS_BITS - 28);
        mantissa *= 268_435_456.0;
        exponent -= 28;
        let integral = mantissa as u64;
        mantissa -= integral as f64;
        x += integral;
        if x >= MODULUS {
            x -= MODULUS;
        }
    }

    let bits = MODULUS_BITS as i32;
    let shift = (if exponent >= 0 {
        exponent % bits
    } else {
        bits - 1 - ((-1 - exponent) % bits)
    }) as u32;
    x = ((x << shift) & MODULUS) | x >> (MODULUS_BITS - shift);

    let hash = x as i64 * sign;
    if hash == -1 {
        -2
    } else {
        hash
    }
}

/// Stable complex hash combining the real and imaginary parts.
pub fn hash_complex(re: f64, im: f64) -> i64 {
    let real = hash_float(re) as u64;
    let imag = hash_float(im) as u64;
    let hash = real.wrapping_add(IMAG_MULTIPLIER.wrapping_mul(imag)) as i64;
    if hash == -1 {
        -2
    } else {
        hash
    }
}

/// Splits a finite float into a mantissa in `[0.5, 1)` and a power of two.
fn frexp(value: f64) -> (f64, i32) {
    if value == 0.0 || !value.is_finite() {
        return (value, 0);
    }
    let bits = value.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i32;
    if biased == 0 {
        // Subnormal: scale into the normal range first.
        let (mantissa, exponent) = frexp(value * f64::powi(2.0, 54));
        return (mantissa, exponent - 54);
    }
    let mantissa = f64::from_bits((bits & !(0x7ff << 52)) | (1022 << 52));
    (mantissa, biased - 1022)
}

fn mask(hash: i64) -> HashValue {
    (hash as HashValue) & MAX_HASH_MASK
}

// == Hash History ==
#[derive(Debug, Clone, Copy)]
enum Slot {
    InProgress,
    Done(HashValue),
}

// == Structural Hasher ==
/// One top-level hash computation over a value graph.
///
/// History and cycle registry live only as long as the hasher, so a fresh
/// hasher must be used per top-level value.
#[derive(Debug)]
pub struct StructuralHasher<'h> {
    heap: &'h Heap,
    history: HashMap<NodeId, Slot>,
    cyclers: Vec<NodeId>,
}

impl<'h> StructuralHasher<'h> {
    /// Creates a hasher resolving references against `heap`.
    pub fn new(heap: &'h Heap) -> Self {
        Self {
            heap,
            history: HashMap::new(),
            cyclers: Vec::new(),
        }
    }

    /// Hashes `value`, masked to [`MAX_HASH_MASK`].
    pub fn hash(&mut self, value: &Value) -> Result<HashValue> {
        let hash = match value {
            Value::None => mask(NONE_HASH),
            Value::Bool(b) => mask(i64::from(*b)),
            Value::Int(n) => mask(hash_int(*n)),
            Value::Float(f) => mask(hash_float(*f)),
            Value::Complex(re, im) => mask(hash_complex(*re, *im)),
            Value::Str(s) => djb2(s.as_bytes()) & MAX_HASH_MASK,
            Value::Bytes(bytes) => djb2(bytes) & MAX_HASH_MASK,
            Value::ByteArray(bytes) => {
                let hashes: Vec<HashValue> =
                    bytes.iter().map(|b| mask(hash_int(i64::from(*b)))).collect();
                mix(&hashes) & MAX_HASH_MASK
            }
            Value::List(items) | Value::Tuple(items) => {
                let hashes = self.hash_each(items)?;
                mix(&hashes) & MAX_HASH_MASK
            }
            Value::Set(items) => {
                let mut hashes = self.hash_each(items)?;
                hashes.sort_unstable();
                mix(&hashes) & MAX_HASH_MASK
            }
            Value::Map(pairs) => {
                let mut hashes = Vec::with_capacity(pairs.len());
                for (key, value) in pairs {
                    let pair = [self.hash(key)?, self.hash(value)?];
                    hashes.push(mix(&pair) & MAX_HASH_MASK);
                }
                mix(&hashes) & MAX_HASH_MASK
            }
            Value::Type(name) | Value::Function(name) | Value::NativeFunction(name) => {
                djb2(name.as_bytes()) & MAX_HASH_MASK
            }
            Value::Object(object) => self.hash_object(object.as_ref())?,
            Value::Ref(id) => self.hash_node(*id)?,
        };
        Ok(hash)
    }

    fn hash_each(&mut self, items: &[Value]) -> Result<Vec<HashValue>> {
        items.iter().map(|item| self.hash(item)).collect()
    }

    fn hash_node(&mut self, id: NodeId) -> Result<HashValue> {
        match self.history.get(&id).copied() {
            Some(Slot::Done(hash)) => return Ok(hash),
            Some(Slot::InProgress) => return Ok(self.cycle_substitute(id)),
            None => {}
        }

        let heap = self.heap;
        let node = heap.get(id).ok_or_else(|| {
            MemoError::Hashing(format!("dangling reference to node {}", id.index()))
        })?;

        self.history.insert(id, Slot::InProgress);
        let hash = self.hash(node)?;
        self.history.insert(id, Slot::Done(hash));
        Ok(hash)
    }

    /// Substitute for a node met again while it is still being hashed.
    fn cycle_substitute(&mut self, id: NodeId) -> HashValue {
        let position = match self.cyclers.iter().position(|seen| *seen == id) {
            Some(position) => position,
            None => {
                self.cyclers.push(id);
                self.cyclers.len() - 1
            }
        };
        (position as HashValue).wrapping_mul(CYCLE_FACTOR) & MAX_HASH_MASK
    }

    fn hash_object(&mut self, object: &dyn Reflect) -> Result<HashValue> {
        if let Some(hash) = object.persistent_hash() {
            return Ok(hash & MAX_HASH_MASK);
        }

        let mut attributes = object.attributes().map_err(|e| match e {
            MemoError::Hashing(_) => e,
            other => MemoError::Hashing(format!(
                "cannot enumerate attributes of {}: {}",
                object.type_name(),
                other
            )),
        })?;
        attributes.sort_by(|a, b| a.0.cmp(&b.0));

        let heap = self.heap;
        let pairs: Vec<Value> = attributes
            .into_iter()
            .filter(|(_, value)| !value.is_native_function(heap))
            .map(|(name, value)| Value::Tuple(vec![Value::Str(name), value]))
            .collect();

        self.hash(&Value::Tuple(pairs))
    }
}

// == Entry Points ==
/// Hashes a value that holds no heap references.
pub fn persistent_hash(value: &Value) -> Result<HashValue> {
    persistent_hash_in(&Heap::new(), value)
}

/// Hashes a value whose references point into `heap`.
pub fn persistent_hash_in(heap: &Heap, value: &Value) -> Result<HashValue> {
    StructuralHasher::new(heap).hash(value)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::value::Record;

    fn h(value: impl Into<Value>) -> HashValue {
        persistent_hash(&value.into()).unwrap()
    }

    // Reference values recorded from the reference algorithm on a 64-bit
    // host; a match proves hashes do not depend on the process.
    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_golden_scalars() {
        assert_eq!(h(1), 1);
        assert_eq!(h(-1), 18446744073709551614);
        assert_eq!(h(0), 0);
        assert_eq!(h(true), 1);
        assert_eq!(h(false), 0);
        assert_eq!(h(2.0), 2);
        assert_eq!(h(-2.0), 18446744073709551614);
        assert_eq!(h(1.5), 1152921504606846977);
        assert_eq!(h(0.1), 230584300921369408);
        assert_eq!(h(Value::Complex(3.0, 3.0)), 3000012);
        assert_eq!(h(Value::None), 18446744072932781835);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_golden_text_and_bytes() {
        assert_eq!(h(""), 5381);
        assert_eq!(h("string"), 6954031493116);
        assert_eq!(h("héllo"), 6953696671296);
        assert_eq!(h(Value::bytes(b"".to_vec())), 5381);
        assert_eq!(h(Value::bytes(b"bytes".to_vec())), 210708248140);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_golden_collections() {
        assert_eq!(h(Value::List(vec![])), 3527539);
        assert_eq!(h(Value::Tuple(vec![])), 3527539);
        assert_eq!(h(Value::Map(vec![])), 3527539);
        assert_eq!(h(vec![1, 2, 3]), 5050909583595644743);
        assert_eq!(h((1, 2, 3)), 5050909583595644743);
        assert_eq!(
            h(Value::Map(vec![
                (Value::from(1), Value::from(1)),
                (Value::from("2"), Value::from("2")),
                (Value::from(3), Value::from("3")),
            ])),
            14111630147354361238
        );
        assert_eq!(
            h(Value::List(vec![
                Value::from(vec![1, 2]),
                Value::List(vec![Value::from(3), Value::from(vec![4])]),
            ])),
            14865143080218121572
        );
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_golden_types() {
        assert_eq!(h(Value::Type("str".into())), 193506174);
        assert_eq!(h(Value::Type("list".into())), 6385440353);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_golden_self_referencing_list() {
        let mut heap = Heap::new();
        let id = heap.reserve();
        heap.set(id, Value::List(vec![Value::Int(1), Value::Ref(id)]));

        let hash = persistent_hash_in(&heap, &Value::Ref(id)).unwrap();
        assert_eq!(hash, 3713080549409410656);
    }

    #[test]
    fn test_integer_modulus_wraps_to_zero() {
        assert_eq!(h((1i64 << 61) - 1), 0);
    }

    #[test]
    fn test_equal_numbers_share_hash() {
        assert_eq!(h(1), h(1.0));
        assert_eq!(h(1), h(true));
        assert_eq!(h(Value::Complex(5.0, 0.0)), h(5));
    }

    #[test]
    fn test_non_finite_floats() {
        assert_eq!(h(f64::INFINITY), 314_159);
        assert_eq!(h(f64::NEG_INFINITY), mask(-314_159));
        assert_eq!(h(f64::NAN), 0);
    }

    #[test]
    fn test_subnormal_float_is_stable() {
        let tiny = 3.25e-310;
        assert_eq!(h(tiny), h(tiny));
        assert_ne!(h(tiny), 0);
    }

    #[test]
    fn test_sequences_are_order_sensitive() {
        assert_ne!(h(vec![1, 2]), h(vec![2, 1]));
    }

    #[test]
    fn test_sets_are_order_independent() {
        let a = Value::Set(vec![Value::from("x"), Value::from("y"), Value::from(3)]);
        let b = Value::Set(vec![Value::from(3), Value::from("y"), Value::from("x")]);
        assert_eq!(h(a), h(b));
    }

    #[test]
    fn test_bytes_and_bytearray_differ() {
        assert_ne!(
            h(Value::Bytes(b"abc".to_vec())),
            h(Value::ByteArray(b"abc".to_vec()))
        );
    }

    #[test]
    fn test_isomorphic_cycles_hash_equal() {
        let mut first = Heap::new();
        let a = first.reserve();
        first.set(a, Value::List(vec![Value::from("x"), Value::Ref(a)]));

        let mut second = Heap::new();
        let _padding = second.alloc(99);
        let b = second.reserve();
        second.set(b, Value::List(vec![Value::from("x"), Value::Ref(b)]));

        let ha = persistent_hash_in(&first, &Value::Ref(a)).unwrap();
        let hb = persistent_hash_in(&second, &Value::Ref(b)).unwrap();
        assert_eq!(ha, hb);
    }

    #[test]
    fn test_mutual_cycle_terminates_and_repeats() {
        let mut heap = Heap::new();
        let a = heap.reserve();
        let b = heap.reserve();
        heap.set(a, Value::List(vec![Value::Ref(b)]));
        heap.set(b, Value::Map(vec![(Value::from("back"), Value::Ref(a))]));

        let first = persistent_hash_in(&heap, &Value::Ref(a)).unwrap();
        let second = persistent_hash_in(&heap, &Value::Ref(a)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_same_cycle_twice_in_one_call_gets_same_substitute() {
        let mut heap = Heap::new();
        let a = heap.reserve();
        heap.set(a, Value::List(vec![Value::Ref(a), Value::Ref(a)]));

        let mut hasher = StructuralHasher::new(&heap);
        let hash = hasher.hash(&Value::Ref(a)).unwrap();

        // Both back-references resolve to registry position 0.
        assert_eq!(hash, mix(&[0, 0]) & MAX_HASH_MASK);
    }

    #[test]
    fn test_shared_reference_hashes_like_inline_copy() {
        let mut heap = Heap::new();
        let shared = heap.alloc(vec![1, 2]);
        let with_refs = Value::List(vec![Value::Ref(shared), Value::Ref(shared)]);
        let inline = Value::from(vec![vec![1, 2], vec![1, 2]]);

        assert_eq!(
            persistent_hash_in(&heap, &with_refs).unwrap(),
            persistent_hash(&inline).unwrap()
        );
    }

    #[test]
    fn test_dangling_reference_is_hashing_error() {
        let mut other = Heap::new();
        let id = other.alloc(1);
        let result = persistent_hash(&Value::Ref(id));
        assert!(matches!(result, Err(MemoError::Hashing(_))));
    }

    #[test]
    fn test_hash_hook_takes_precedence() {
        let record = Record::new("Bespoke")
            .field("noise", 12345)
            .with_hash(123456789);
        assert_eq!(h(Value::object(record)), 123456789);
    }

    #[test]
    fn test_hash_hook_is_masked_to_native_width() {
        let record = Record::new("Bespoke").with_hash(HashValue::MAX);
        let hash = h(Value::object(record));
        assert_eq!(hash, HashValue::MAX & MAX_HASH_MASK);
        assert_eq!(hash & !MAX_HASH_MASK, 0);
    }

    #[test]
    fn test_reflection_fallback_is_deterministic() {
        let make = || {
            Value::object(
                Record::new("Point")
                    .field("y", 2)
                    .field("x", 1),
            )
        };
        assert_eq!(h(make()), h(make()));
    }

    #[test]
    fn test_reflection_fallback_hashes_sorted_attribute_pairs() {
        let record = Value::object(Record::new("Point").field("y", 2).field("x", 1));
        let expected = Value::Tuple(vec![
            Value::Tuple(vec![Value::from("x"), Value::from(1)]),
            Value::Tuple(vec![Value::from("y"), Value::from(2)]),
        ]);
        assert_eq!(h(record), h(expected));
    }

    #[test]
    fn test_reflection_fallback_strips_native_functions() {
        let with_native = Value::object(
            Record::new("Thing")
                .field("size", 3)
                .field("__len__", Value::NativeFunction("len".into())),
        );
        let without = Value::object(Record::new("Thing").field("size", 3));
        assert_eq!(h(with_native), h(without));
    }

    #[derive(Debug)]
    struct Unreadable;

    impl Reflect for Unreadable {
        fn type_name(&self) -> &str {
            "app.Unreadable"
        }

        fn attributes(&self) -> Result<Vec<(String, Value)>> {
            Err(MemoError::Internal("attribute access denied".into()))
        }
    }

    #[test]
    fn test_failing_attribute_enumeration_is_hashing_error() {
        let result = persistent_hash(&Value::object(Unreadable));
        assert!(matches!(result, Err(MemoError::Hashing(msg)) if msg.contains("app.Unreadable")));
    }

    #[test]
    fn test_functions_hash_by_qualified_name() {
        assert_eq!(
            h(Value::Function("pkg.mod.compute".into())),
            h("pkg.mod.compute")
        );
    }

    #[test]
    fn test_djb2_matches_definition() {
        let expected = b"ab"
            .iter()
            .fold(5381u64, |h, &b| h.wrapping_mul(33).wrapping_add(u64::from(b)));
        assert_eq!(djb2(b"ab"), expected);
    }
}
