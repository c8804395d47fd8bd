//! Store attribute values and the codec that produces them.
//!
//! `u64`, `i64`, strings and byte sequences take a typed fast path into
//! number, string and binary attributes. Anything else goes through the
//! structural fallback, which maps a `serde_json::Value` onto attributes.

use crate::error::{GeoIndexError, Result};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

/// Flat attribute map of one store item.
pub type AttributeMap = HashMap<String, AttributeValue>;

/// A store attribute value.
///
/// Serializes in the externally tagged form used by DynamoDB JSON, e.g.
/// `{"N": "42"}` or `{"M": {"geohash": {"N": "1"}}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// String
    S(String),
    /// Number, kept in its decimal text form
    N(String),
    /// Binary
    B(Bytes),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
    /// List
    L(Vec<AttributeValue>),
    /// Map
    M(AttributeMap),
}

impl AttributeValue {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::S(_) => "S",
            AttributeValue::N(_) => "N",
            AttributeValue::B(_) => "B",
            AttributeValue::Bool(_) => "BOOL",
            AttributeValue::Null(_) => "NULL",
            AttributeValue::L(_) => "L",
            AttributeValue::M(_) => "M",
        }
    }

    /// Borrows the map of an `M` value.
    pub fn as_map(&self) -> Result<&AttributeMap> {
        match self {
            AttributeValue::M(map) => Ok(map),
            other => Err(GeoIndexError::MalformedAttributeValue {
                expected: "M",
                actual: other.kind(),
            }),
        }
    }

    pub fn into_map(self) -> Result<AttributeMap> {
        match self {
            AttributeValue::M(map) => Ok(map),
            other => Err(GeoIndexError::MalformedAttributeValue {
                expected: "M",
                actual: other.kind(),
            }),
        }
    }
}

/// Kinds with a typed fast path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    U64,
    I64,
    Str,
    Bytes,
}

/// A primitive attribute payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Primitive {
    U64(u64),
    I64(i64),
    Str(String),
    Bytes(Bytes),
}

impl Primitive {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::U64(_) => PrimitiveKind::U64,
            Primitive::I64(_) => PrimitiveKind::I64,
            Primitive::Str(_) => PrimitiveKind::Str,
            Primitive::Bytes(_) => PrimitiveKind::Bytes,
        }
    }
}

/// Encodes a primitive into its native attribute.
pub fn marshal_primitive(value: &Primitive) -> AttributeValue {
    match value {
        Primitive::U64(v) => AttributeValue::N(v.to_string()),
        Primitive::I64(v) => AttributeValue::N(v.to_string()),
        Primitive::Str(v) => AttributeValue::S(v.clone()),
        Primitive::Bytes(v) => AttributeValue::B(v.clone()),
    }
}

/// Decodes `av` as `kind` on the fast path.
///
/// Returns `Ok(None)` when the attribute's shape does not match `kind`, so
/// the caller can fall back to the structural codec. A number attribute that
/// does not parse is an error.
pub fn unmarshal_primitive(av: &AttributeValue, kind: PrimitiveKind) -> Result<Option<Primitive>> {
    let value = match (av, kind) {
        (AttributeValue::N(n), PrimitiveKind::U64) => {
            Primitive::U64(n.parse().map_err(|e| {
                GeoIndexError::UnsupportedType(format!("u64 from number {:?}: {}", n, e))
            })?)
        }
        (AttributeValue::N(n), PrimitiveKind::I64) => {
            Primitive::I64(n.parse().map_err(|e| {
                GeoIndexError::UnsupportedType(format!("i64 from number {:?}: {}", n, e))
            })?)
        }
        (AttributeValue::S(s), PrimitiveKind::Str) => Primitive::Str(s.clone()),
        (AttributeValue::B(b), PrimitiveKind::Bytes) => Primitive::Bytes(b.clone()),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// Encodes any serializable value through the structural codec.
pub fn marshal_fallback<T: Serialize + ?Sized>(value: &T) -> Result<AttributeValue> {
    let json = serde_json::to_value(value).map_err(|e| unsupported::<T>(e))?;
    Ok(json_to_attribute(json))
}

/// Decodes a value through the structural codec.
pub fn unmarshal_fallback<T: DeserializeOwned>(av: &AttributeValue) -> Result<T> {
    let json = attribute_to_json(av).map_err(|msg| unsupported::<T>(msg))?;
    serde_json::from_value(json).map_err(|e| unsupported::<T>(e))
}

fn unsupported<T: ?Sized>(cause: impl std::fmt::Display) -> GeoIndexError {
    GeoIndexError::UnsupportedType(format!("{}: {}", std::any::type_name::<T>(), cause))
}

fn json_to_attribute(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s),
        Value::Array(items) => AttributeValue::L(items.into_iter().map(json_to_attribute).collect()),
        Value::Object(fields) => AttributeValue::M(
            fields
                .into_iter()
                .map(|(k, v)| (k, json_to_attribute(v)))
                .collect(),
        ),
    }
}

fn attribute_to_json(av: &AttributeValue) -> std::result::Result<Value, String> {
    Ok(match av {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => Value::Number(parse_number(n)?),
        AttributeValue::B(b) => Value::Array(b.iter().map(|&byte| Value::from(byte)).collect()),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(items) => Value::Array(
            items
                .iter()
                .map(attribute_to_json)
                .collect::<std::result::Result<_, _>>()?,
        ),
        AttributeValue::M(fields) => {
            let mut map = Map::with_capacity(fields.len());
            for (k, v) in fields {
                map.insert(k.clone(), attribute_to_json(v)?);
            }
            Value::Object(map)
        }
    })
}

fn parse_number(n: &str) -> std::result::Result<Number, String> {
    if let Ok(v) = n.parse::<u64>() {
        return Ok(Number::from(v));
    }
    if let Ok(v) = n.parse::<i64>() {
        return Ok(Number::from(v));
    }
    n.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| format!("number attribute {:?} is not a finite number", n))
}

/// Conversion between a hash value type and a store attribute.
pub trait AttributeCodec: Sized {
    fn to_attribute(&self) -> Result<AttributeValue>;
    fn from_attribute(av: &AttributeValue) -> Result<Self>;
}

macro_rules! primitive_codec {
    ($ty:ty, $variant:ident, $into:expr) => {
        impl AttributeCodec for $ty {
            fn to_attribute(&self) -> Result<AttributeValue> {
                let into: fn(&$ty) -> Primitive = $into;
                Ok(marshal_primitive(&into(self)))
            }

            fn from_attribute(av: &AttributeValue) -> Result<Self> {
                match unmarshal_primitive(av, PrimitiveKind::$variant)? {
                    Some(Primitive::$variant(v)) => Ok(v.into()),
                    _ => unmarshal_fallback(av),
                }
            }
        }
    };
}

primitive_codec!(u64, U64, |v| Primitive::U64(*v));
primitive_codec!(i64, I64, |v| Primitive::I64(*v));
primitive_codec!(String, Str, |v| Primitive::Str(v.clone()));
primitive_codec!(Bytes, Bytes, |v| Primitive::Bytes(v.clone()));
primitive_codec!(Vec<u8>, Bytes, |v| Primitive::Bytes(Bytes::copy_from_slice(v)));

/// Wrapper that routes a composite value through the structural codec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Structured<T>(pub T);

impl<T: Serialize + DeserializeOwned> AttributeCodec for Structured<T> {
    fn to_attribute(&self) -> Result<AttributeValue> {
        marshal_fallback(&self.0)
    }

    fn from_attribute(av: &AttributeValue) -> Result<Self> {
        unmarshal_fallback(av).map(Structured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_path_shapes() {
        assert_eq!(42u64.to_attribute().unwrap(), AttributeValue::N("42".into()));
        assert_eq!((-7i64).to_attribute().unwrap(), AttributeValue::N("-7".into()));
        assert_eq!(
            "cell".to_string().to_attribute().unwrap(),
            AttributeValue::S("cell".into())
        );
        assert_eq!(
            vec![1u8, 2, 3].to_attribute().unwrap(),
            AttributeValue::B(Bytes::from_static(&[1, 2, 3]))
        );
    }

    #[test]
    fn test_u64_full_range() {
        let av = u64::MAX.to_attribute().unwrap();
        assert_eq!(u64::from_attribute(&av).unwrap(), u64::MAX);
    }

    #[test]
    fn test_unparseable_number_is_error() {
        let av = AttributeValue::N("twelve".into());
        assert!(matches!(
            u64::from_attribute(&av),
            Err(GeoIndexError::UnsupportedType(_))
        ));
        assert!(unmarshal_primitive(&av, PrimitiveKind::I64).is_err());
    }

    #[test]
    fn test_shape_mismatch_goes_to_fallback() {
        let av = AttributeValue::S("12".into());
        assert_eq!(unmarshal_primitive(&av, PrimitiveKind::U64).unwrap(), None);
        // the structural codec does not coerce strings into numbers either
        assert!(matches!(
            u64::from_attribute(&av),
            Err(GeoIndexError::UnsupportedType(_))
        ));

        // a list of small numbers decodes as bytes through the fallback
        let list = AttributeValue::L(vec![AttributeValue::N("1".into()), AttributeValue::N("2".into())]);
        assert_eq!(Vec::<u8>::from_attribute(&list).unwrap(), vec![1, 2]);
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Bucket {
        face: u8,
        token: String,
        tags: Vec<String>,
    }

    #[test]
    fn test_structured_roundtrip() {
        let value = Structured(Bucket {
            face: 4,
            token: "89c25".into(),
            tags: vec!["coarse".into()],
        });
        let av = value.to_attribute().unwrap();
        let map = av.as_map().unwrap();
        assert_eq!(map.get("face"), Some(&AttributeValue::N("4".into())));

        let back = Structured::<Bucket>::from_attribute(&av).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_structured_wrong_shape() {
        let av = AttributeValue::Bool(true);
        assert!(matches!(
            Structured::<Bucket>::from_attribute(&av),
            Err(GeoIndexError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_as_map_reports_shapes() {
        let err = AttributeValue::N("1".into()).as_map().unwrap_err();
        match err {
            GeoIndexError::MalformedAttributeValue { expected, actual } => {
                assert_eq!(expected, "M");
                assert_eq!(actual, "N");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_dynamodb_json_shape() {
        let json = serde_json::to_string(&AttributeValue::N("5".into())).unwrap();
        assert_eq!(json, r#"{"N":"5"}"#);
        let parsed: AttributeValue = serde_json::from_str(r#"{"BOOL":true}"#).unwrap();
        assert_eq!(parsed, AttributeValue::Bool(true));
    }
}
