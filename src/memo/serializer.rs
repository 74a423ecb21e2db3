//! Serializer Module
//!
//! Turns wrapped-function results into stored bytes and back.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{MemoError, Result};

// == Serializer Trait ==
/// Byte encoding of cached results.
///
/// `deserialize(serialize(v))` must give back `v` for every value a wrapped
/// function returns.
pub trait Serializer: Clone + fmt::Debug + Send + Sync + 'static {
    /// Name reported by `cache_parameters`.
    fn name(&self) -> &str;

    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

// == Bincode ==
/// Compact binary encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeSerializer;

impl Serializer for BincodeSerializer {
    fn name(&self) -> &str {
        "bincode"
    }

    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(|e| MemoError::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes).map_err(|e| MemoError::Serialization(e.to_string()))
    }
}

// == JSON ==
/// UTF-8 JSON encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn name(&self) -> &str {
        "json"
    }

    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| MemoError::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| MemoError::Serialization(e.to_string()))
    }
}

// == Builtin Selection ==
/// A serializer chosen by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuiltinSerializer {
    #[default]
    Bincode,
    Json,
}

impl Serializer for BuiltinSerializer {
    fn name(&self) -> &str {
        match self {
            BuiltinSerializer::Bincode => BincodeSerializer.name(),
            BuiltinSerializer::Json => JsonSerializer.name(),
        }
    }

    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        match self {
            BuiltinSerializer::Bincode => BincodeSerializer.serialize(value),
            BuiltinSerializer::Json => JsonSerializer.serialize(value),
        }
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        match self {
            BuiltinSerializer::Bincode => BincodeSerializer.deserialize(bytes),
            BuiltinSerializer::Json => JsonSerializer.deserialize(bytes),
        }
    }
}

/// `"pickle"` and `"bincode"` select the binary encoding, `"json"` JSON.
impl FromStr for BuiltinSerializer {
    type Err = MemoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pickle" | "bincode" => Ok(BuiltinSerializer::Bincode),
            "json" => Ok(BuiltinSerializer::Json),
            other => Err(MemoError::Configuration(format!(
                "Unknown serializer '{}', expected 'pickle', 'bincode' or 'json'",
                other
            ))),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Report {
        name: String,
        scores: Vec<f64>,
        tags: HashMap<String, bool>,
        parent: Option<Box<Report>>,
    }

    fn report() -> Report {
        Report {
            name: "weekly".to_string(),
            scores: vec![1.5, -2.0],
            tags: HashMap::from([("final".to_string(), true)]),
            parent: Some(Box::new(Report {
                name: "monthly".to_string(),
                scores: vec![],
                tags: HashMap::new(),
                parent: None,
            })),
        }
    }

    #[test]
    fn test_bincode_round_trip() {
        let bytes = BincodeSerializer.serialize(&report()).unwrap();
        let back: Report = BincodeSerializer.deserialize(&bytes).unwrap();
        assert_eq!(back, report());
    }

    #[test]
    fn test_json_round_trip() {
        let bytes = JsonSerializer.serialize(&report()).unwrap();
        assert!(std::str::from_utf8(&bytes).unwrap().contains("weekly"));
        let back: Report = JsonSerializer.deserialize(&bytes).unwrap();
        assert_eq!(back, report());
    }

    #[test]
    fn test_garbage_is_serialization_error() {
        let err = JsonSerializer.deserialize::<Report>(b"not json").unwrap_err();
        assert!(matches!(err, MemoError::Serialization(_)));

        let err = BincodeSerializer.deserialize::<String>(&[0xff]).unwrap_err();
        assert!(matches!(err, MemoError::Serialization(_)));
    }

    #[test]
    fn test_json_rejects_non_string_map_keys() {
        let value: HashMap<Vec<u8>, u8> = HashMap::from([(vec![1], 1)]);
        let err = JsonSerializer.serialize(&value).unwrap_err();
        assert!(matches!(err, MemoError::Serialization(_)));
    }

    #[test]
    fn test_parse_builtin() {
        assert_eq!("pickle".parse::<BuiltinSerializer>().unwrap(), BuiltinSerializer::Bincode);
        assert_eq!("bincode".parse::<BuiltinSerializer>().unwrap(), BuiltinSerializer::Bincode);
        assert_eq!("json".parse::<BuiltinSerializer>().unwrap(), BuiltinSerializer::Json);
        assert!(matches!(
            "yaml".parse::<BuiltinSerializer>(),
            Err(MemoError::Configuration(_))
        ));
    }

    #[test]
    fn test_builtin_default_is_binary() {
        assert_eq!(BuiltinSerializer::default().name(), "bincode");
    }
}
