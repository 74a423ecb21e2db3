//! Property-Based Tests for Hash Module
//!
//! Uses proptest to check determinism, order handling and key equivalence.

use proptest::prelude::*;

use crate::hash::{
    persistent_hash, persistent_hash_in, Args, Heap, KeyBuilder, Signature, Value, MAX_HASH_MASK,
};

// == Strategies ==
/// Acyclic values of bounded depth
fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::None),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e12f64..1.0e12).prop_map(Value::Float),
        "[a-z0-9 ]{0,12}".prop_map(Value::Str),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
        "[A-Z][a-z]{1,8}".prop_map(Value::Type),
    ];
    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Tuple),
            prop::collection::vec((inner.clone(), inner), 0..3).prop_map(Value::Map),
        ]
    })
}

/// Builds `[items..., <self>]` in a fresh heap.
fn self_referencing_list(items: &[i64]) -> (Heap, Value) {
    let mut heap = Heap::new();
    let id = heap.reserve();
    let mut elements: Vec<Value> = items.iter().copied().map(Value::Int).collect();
    elements.push(Value::Ref(id));
    heap.set(id, Value::List(elements));
    (heap, Value::Ref(id))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Hashing the same value twice gives the same, masked result.
    #[test]
    fn prop_hash_is_deterministic(value in value_strategy()) {
        let first = persistent_hash(&value).unwrap();
        let second = persistent_hash(&value.clone()).unwrap();
        prop_assert_eq!(first, second);
        prop_assert_eq!(first & MAX_HASH_MASK, first);
    }

    // Set hashes do not depend on element order.
    #[test]
    fn prop_set_order_independent(items in prop::collection::vec(any::<i64>(), 0..12)) {
        let mut reversed = items.clone();
        reversed.reverse();

        let forward = Value::Set(items.into_iter().map(Value::Int).collect());
        let backward = Value::Set(reversed.into_iter().map(Value::Int).collect());
        prop_assert_eq!(persistent_hash(&forward).unwrap(), persistent_hash(&backward).unwrap());
    }

    // Two separately built cycles of the same shape hash identically.
    #[test]
    fn prop_isomorphic_cycles(items in prop::collection::vec(any::<i64>(), 0..8)) {
        let (heap_a, root_a) = self_referencing_list(&items);
        let (heap_b, root_b) = self_referencing_list(&items);

        let a = persistent_hash_in(&heap_a, &root_a).unwrap();
        let b = persistent_hash_in(&heap_b, &root_b).unwrap();
        prop_assert_eq!(a, b);
        prop_assert_eq!(a, persistent_hash_in(&heap_a, &root_a).unwrap());
    }

    // Positional, keyword and mixed call shapes bind to the same key.
    #[test]
    fn prop_call_shapes_share_key(a in any::<i64>(), b in any::<i64>(), typed in any::<bool>()) {
        let sig = Signature::new("f").param("a").param("b");
        let builder = KeyBuilder::new(typed);

        let positional = builder.build(&sig.bind(Args::new().arg(a).arg(b)).unwrap()).unwrap();
        let keywords = builder
            .build(&sig.bind(Args::new().kwarg("b", b).kwarg("a", a)).unwrap())
            .unwrap();
        let mixed = builder
            .build(&sig.bind(Args::new().arg(a).kwarg("b", b)).unwrap())
            .unwrap();

        prop_assert_eq!(&positional, &keywords);
        prop_assert_eq!(&positional, &mixed);
    }
}
