//! Value Graph Module
//!
//! The shapes a memoized call argument can take, plus the arena that gives
//! nodes a stable identity so shared and cyclic structures can be expressed.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::error::{MemoError, Result};

/// Hash produced by the structural hasher, masked to the native word width.
pub type HashValue = u64;

// == Reflect ==
/// Extension point for opaque, user-defined values.
///
/// Implementors either provide a [`Reflect::persistent_hash`] hook, which is
/// used as-is, or expose their attributes for the best-effort fallback that
/// hashes `(name, value)` pairs. The fallback only sees what `attributes`
/// returns, so incidental runtime state leaks into the hash unless the hook
/// is overridden.
pub trait Reflect: fmt::Debug + Send + Sync {
    /// Qualified name of the runtime type, also used for `typed` keys.
    ///
    /// Return the name nested within its module without the module path
    /// (`Point`, `Outer.Inner`), so typed keys stay stable when the type is
    /// loaded from a different module path in another process.
    fn type_name(&self) -> &str;

    /// Custom hash hook. When `Some`, no further processing takes place.
    fn persistent_hash(&self) -> Option<HashValue> {
        None
    }

    /// Readable attributes for the fallback reflection path.
    fn attributes(&self) -> Result<Vec<(String, Value)>>;
}

// == Record ==
/// A ready-made [`Reflect`] implementation built from named fields.
#[derive(Debug, Clone)]
pub struct Record {
    type_name: String,
    fields: Vec<(String, Value)>,
    hash_hook: Option<HashValue>,
}

impl Record {
    /// Creates an empty record of the given type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
            hash_hook: None,
        }
    }

    /// Adds a field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Pins the hash of this record, bypassing attribute reflection.
    pub fn with_hash(mut self, hash: HashValue) -> Self {
        self.hash_hook = Some(hash);
        self
    }
}

impl Reflect for Record {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn persistent_hash(&self) -> Option<HashValue> {
        self.hash_hook
    }

    fn attributes(&self) -> Result<Vec<(String, Value)>> {
        Ok(self.fields.clone())
    }
}

// == Node Id ==
/// Stable identity of a node allocated in a [`Heap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in its heap.
    pub fn index(self) -> usize {
        self.0
    }
}

// == Value ==
/// A node of a call's value graph.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex(f64, f64),
    Str(String),
    /// Immutable byte string, hashed like text.
    Bytes(Vec<u8>),
    /// Mutable byte sequence, hashed element by element.
    ByteArray(Vec<u8>),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// Unordered collection; element order never affects the hash.
    Set(Vec<Value>),
    /// Insertion-ordered mapping.
    Map(Vec<(Value, Value)>),
    /// A type, by qualified name.
    Type(String),
    /// A function or method, by qualified name.
    Function(String),
    /// A natively implemented function; dropped from reflected attributes.
    NativeFunction(String),
    Object(Arc<dyn Reflect>),
    /// Reference to a heap node; the only values carrying identity.
    Ref(NodeId),
}

impl Value {
    /// Wraps a [`Reflect`] implementation.
    pub fn object(object: impl Reflect + 'static) -> Self {
        Value::Object(Arc::new(object))
    }

    /// Builds an immutable byte string.
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(bytes.into())
    }

    /// Qualified name of this value's runtime type.
    pub fn type_name(&self, heap: &Heap) -> String {
        match self {
            Value::None => "NoneType".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Complex(..) => "complex".to_string(),
            Value::Str(_) => "str".to_string(),
            Value::Bytes(_) => "bytes".to_string(),
            Value::ByteArray(_) => "bytearray".to_string(),
            Value::List(_) => "list".to_string(),
            Value::Tuple(_) => "tuple".to_string(),
            Value::Set(_) => "set".to_string(),
            Value::Map(_) => "dict".to_string(),
            Value::Type(_) => "type".to_string(),
            Value::Function(_) => "function".to_string(),
            Value::NativeFunction(_) => "builtin_function_or_method".to_string(),
            Value::Object(object) => object.type_name().to_string(),
            Value::Ref(_) => match heap.resolve(self) {
                Ok(target) => target.type_name(heap),
                Err(_) => "reference".to_string(),
            },
        }
    }

    /// Whether this value (after following references) is a native function.
    pub fn is_native_function(&self, heap: &Heap) -> bool {
        matches!(heap.resolve(self), Ok(Value::NativeFunction(_)))
    }
}

// == Heap ==
/// Arena of boxed nodes addressed by [`NodeId`].
///
/// Nodes referencing each other through [`Value::Ref`] form shared or cyclic
/// graphs; the hasher keys its history by node id rather than by equality.
#[derive(Debug, Clone, Default)]
pub struct Heap {
    nodes: Vec<Value>,
}

impl Heap {
    /// Creates an empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a node holding `value`.
    pub fn alloc(&mut self, value: impl Into<Value>) -> NodeId {
        self.nodes.push(value.into());
        NodeId(self.nodes.len() - 1)
    }

    /// Allocates a placeholder node, to be filled with [`Heap::set`] once
    /// its (possibly self-referencing) contents are known.
    pub fn reserve(&mut self) -> NodeId {
        self.alloc(Value::None)
    }

    /// Replaces the contents of a node. Ids from another heap are ignored.
    pub fn set(&mut self, id: NodeId, value: impl Into<Value>) {
        if let Some(slot) = self.nodes.get_mut(id.0) {
            *slot = value.into();
        }
    }

    /// Returns the node's contents.
    pub fn get(&self, id: NodeId) -> Option<&Value> {
        self.nodes.get(id.0)
    }

    /// Returns the node's contents mutably.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Value> {
        self.nodes.get_mut(id.0)
    }

    /// Number of allocated nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no node was allocated.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Follows `Ref` links until a non-reference value is reached.
    pub fn resolve<'a>(&'a self, value: &'a Value) -> Result<&'a Value> {
        let mut current = value;
        let mut hops = 0;
        while let Value::Ref(id) = current {
            if hops > self.nodes.len() {
                return Err(MemoError::Hashing(format!(
                    "reference chain through node {} never reaches a value",
                    id.0
                )));
            }
            current = self.get(*id).ok_or_else(|| {
                MemoError::Hashing(format!("dangling reference to node {}", id.0))
            })?;
            hops += 1;
        }
        Ok(current)
    }
}

// == Conversions into Value ==
impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::None
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! int_into_value {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::Int(i64::from(value))
            }
        })*
    };
}

int_into_value!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<NodeId> for Value {
    fn from(id: NodeId) -> Self {
        Value::Ref(id)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::None, Into::into)
    }
}

impl<T: Into<Value>> From<BTreeSet<T>> for Value {
    fn from(items: BTreeSet<T>) -> Self {
        Value::Set(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, S> From<HashSet<T, S>> for Value {
    fn from(items: HashSet<T, S>) -> Self {
        Value::Set(items.into_iter().map(Into::into).collect())
    }
}

// Only ordered maps convert implicitly: mapping hashes are order-sensitive.
impl<K: Into<Value>, V: Into<Value>> From<BTreeMap<K, V>> for Value {
    fn from(map: BTreeMap<K, V>) -> Self {
        Value::Map(map.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

macro_rules! tuple_into_value {
    ($($name:ident),+) => {
        impl<$($name: Into<Value>),+> From<($($name,)+)> for Value {
            #[allow(non_snake_case)]
            fn from(($($name,)+): ($($name,)+)) -> Self {
                Value::Tuple(vec![$($name.into()),+])
            }
        }
    };
}

tuple_into_value!(A);
tuple_into_value!(A, B);
tuple_into_value!(A, B, C);
tuple_into_value!(A, B, C, D);

// == Conversions out of Value ==
/// Typed extraction of bound arguments.
pub trait FromValue: Sized {
    fn from_value(value: &Value, heap: &Heap) -> Result<Self>;
}

fn mismatch(expected: &str, found: &Value, heap: &Heap) -> MemoError {
    MemoError::ArgumentBinding(format!(
        "expected {}, found {}",
        expected,
        found.type_name(heap)
    ))
}

impl FromValue for Value {
    fn from_value(value: &Value, heap: &Heap) -> Result<Self> {
        Ok(heap.resolve(value)?.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value, heap: &Heap) -> Result<Self> {
        match heap.resolve(value)? {
            Value::Bool(b) => Ok(*b),
            other => Err(mismatch("bool", other, heap)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value, heap: &Heap) -> Result<Self> {
        match heap.resolve(value)? {
            Value::Int(n) => Ok(*n),
            Value::Bool(b) => Ok(i64::from(*b)),
            other => Err(mismatch("int", other, heap)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value, heap: &Heap) -> Result<Self> {
        let n = i64::from_value(value, heap)?;
        i32::try_from(n)
            .map_err(|_| MemoError::ArgumentBinding(format!("{} does not fit in i32", n)))
    }
}

impl FromValue for u32 {
    fn from_value(value: &Value, heap: &Heap) -> Result<Self> {
        let n = i64::from_value(value, heap)?;
        u32::try_from(n)
            .map_err(|_| MemoError::ArgumentBinding(format!("{} does not fit in u32", n)))
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value, heap: &Heap) -> Result<Self> {
        let n = i64::from_value(value, heap)?;
        u64::try_from(n)
            .map_err(|_| MemoError::ArgumentBinding(format!("{} does not fit in u64", n)))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value, heap: &Heap) -> Result<Self> {
        match heap.resolve(value)? {
            Value::Float(f) => Ok(*f),
            Value::Int(n) => Ok(*n as f64),
            other => Err(mismatch("float", other, heap)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value, heap: &Heap) -> Result<Self> {
        match heap.resolve(value)? {
            Value::Str(s) => Ok(s.clone()),
            other => Err(mismatch("str", other, heap)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value, heap: &Heap) -> Result<Self> {
        match heap.resolve(value)? {
            Value::None => Ok(None),
            other => T::from_value(other, heap).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value, heap: &Heap) -> Result<Self> {
        match heap.resolve(value)? {
            Value::List(items) | Value::Tuple(items) | Value::Set(items) => items
                .iter()
                .map(|item| T::from_value(item, heap))
                .collect(),
            other => Err(mismatch("sequence", other, heap)),
        }
    }
}
