//! Argument Binding Module
//!
//! Binds positional and keyword call arguments against a declared signature,
//! applying defaults so that equivalent call shapes produce the same bound
//! form.

use crate::error::{MemoError, Result};
use crate::hash::value::{FromValue, Heap, Value};

// == Parameter ==
/// How a parameter accepts arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Filled by position or by name.
    PositionalOrKeyword,
    /// Collects surplus positional arguments into a tuple.
    VarPositional,
    /// Filled by name only.
    KeywordOnly,
    /// Collects unknown keyword arguments into a mapping.
    VarKeyword,
}

/// A declared parameter.
#[derive(Debug, Clone)]
pub struct Param {
    name: String,
    kind: ParamKind,
    default: Option<Value>,
}

impl Param {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

// == Signature ==
/// Declared parameters of a memoized callee.
#[derive(Debug, Clone)]
pub struct Signature {
    qualname: String,
    params: Vec<Param>,
}

impl Signature {
    /// Creates a signature with no parameters.
    pub fn new(qualname: impl Into<String>) -> Self {
        Self {
            qualname: qualname.into(),
            params: Vec::new(),
        }
    }

    /// Creates a method signature whose first parameter is the `self` receiver.
    pub fn method(qualname: impl Into<String>) -> Self {
        Self::new(qualname).param("self")
    }

    /// Adds a required positional-or-keyword parameter.
    pub fn param(self, name: impl Into<String>) -> Self {
        self.push(name, ParamKind::PositionalOrKeyword, None)
    }

    /// Adds a positional-or-keyword parameter with a default.
    pub fn param_with_default(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.push(name, ParamKind::PositionalOrKeyword, Some(default.into()))
    }

    /// Adds a `*args`-style parameter.
    pub fn var_positional(self, name: impl Into<String>) -> Self {
        self.push(name, ParamKind::VarPositional, None)
    }

    /// Adds a required keyword-only parameter.
    pub fn keyword_only(self, name: impl Into<String>) -> Self {
        self.push(name, ParamKind::KeywordOnly, None)
    }

    /// Adds a keyword-only parameter with a default.
    pub fn keyword_only_with_default(
        self,
        name: impl Into<String>,
        default: impl Into<Value>,
    ) -> Self {
        self.push(name, ParamKind::KeywordOnly, Some(default.into()))
    }

    /// Adds a `**kwargs`-style parameter.
    pub fn var_keyword(self, name: impl Into<String>) -> Self {
        self.push(name, ParamKind::VarKeyword, None)
    }

    fn push(mut self, name: impl Into<String>, kind: ParamKind, default: Option<Value>) -> Self {
        self.params.push(Param {
            name: name.into(),
            kind,
            default,
        });
        self
    }

    pub fn qualname(&self) -> &str {
        &self.qualname
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    // == Bind ==
    /// Binds `args` to the declared parameters and applies defaults.
    ///
    /// `*args` parameters default to an empty tuple and `**kwargs`
    /// parameters to an empty mapping.
    pub fn bind(&self, args: Args) -> Result<BoundArguments> {
        let Args {
            positional,
            mut keywords,
            heap,
        } = args;

        for (index, (name, _)) in keywords.iter().enumerate() {
            if keywords[..index].iter().any(|(seen, _)| seen == name) {
                return Err(self.binding_error(format!(
                    "multiple values for keyword argument '{}'",
                    name
                )));
            }
        }

        let mut positional = positional.into_iter();
        let mut arguments: Vec<(String, Value)> = Vec::with_capacity(self.params.len());
        let mut var_keyword_slot = None;

        for param in &self.params {
            let value = match param.kind {
                ParamKind::PositionalOrKeyword => match positional.next() {
                    Some(value) => {
                        if keywords.iter().any(|(name, _)| *name == param.name) {
                            return Err(self.binding_error(format!(
                                "multiple values for argument '{}'",
                                param.name
                            )));
                        }
                        value
                    }
                    None => self.keyword_or_default(param, &mut keywords)?,
                },
                ParamKind::VarPositional => Value::Tuple(positional.by_ref().collect()),
                ParamKind::KeywordOnly => self.keyword_or_default(param, &mut keywords)?,
                ParamKind::VarKeyword => {
                    var_keyword_slot = Some(arguments.len());
                    Value::Map(Vec::new())
                }
            };
            arguments.push((param.name.clone(), value));
        }

        if positional.next().is_some() {
            return Err(self.binding_error("too many positional arguments".to_string()));
        }

        match var_keyword_slot {
            Some(slot) => {
                let extra = keywords
                    .into_iter()
                    .map(|(name, value)| (Value::Str(name), value))
                    .collect();
                arguments[slot].1 = Value::Map(extra);
            }
            None => {
                if let Some((name, _)) = keywords.first() {
                    return Err(self.binding_error(format!(
                        "got an unexpected keyword argument '{}'",
                        name
                    )));
                }
            }
        }

        Ok(BoundArguments { arguments, heap })
    }

    fn keyword_or_default(
        &self,
        param: &Param,
        keywords: &mut Vec<(String, Value)>,
    ) -> Result<Value> {
        if let Some(index) = keywords.iter().position(|(name, _)| *name == param.name) {
            return Ok(keywords.remove(index).1);
        }
        param.default.clone().ok_or_else(|| {
            self.binding_error(format!("missing a required argument: '{}'", param.name))
        })
    }

    fn binding_error(&self, message: String) -> MemoError {
        MemoError::ArgumentBinding(format!("{}(): {}", self.qualname, message))
    }
}

// == Call Arguments ==
/// Positional and keyword arguments of one call, plus the heap their
/// references point into.
#[derive(Debug, Clone, Default)]
pub struct Args {
    positional: Vec<Value>,
    keywords: Vec<(String, Value)>,
    heap: Heap,
}

impl Args {
    /// Creates an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Appends a keyword argument.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keywords.push((name.into(), value.into()));
        self
    }

    /// Uses `heap` to resolve `Value::Ref` arguments.
    pub fn with_heap(mut self, heap: Heap) -> Self {
        self.heap = heap;
        self
    }

    /// Heap for allocating shared or cyclic argument nodes.
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Inserts a receiver in front of the positional arguments.
    pub(crate) fn with_receiver(mut self, receiver: Value) -> Self {
        self.positional.insert(0, receiver);
        self
    }
}

// == Bound Arguments ==
/// Arguments bound to parameter names in declaration order, defaults applied.
#[derive(Debug, Clone)]
pub struct BoundArguments {
    arguments: Vec<(String, Value)>,
    heap: Heap,
}

impl BoundArguments {
    /// Returns the raw value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.arguments
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value)
    }

    /// Extracts the argument bound to `name` as `T`.
    pub fn extract<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.get(name).ok_or_else(|| {
            MemoError::ArgumentBinding(format!("no argument named '{}'", name))
        })?;
        T::from_value(value, &self.heap)
    }

    /// Iterates `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.arguments
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }
}
