use std::collections::HashMap;

use bytes::Bytes;

/// Typed result of a command, as produced by a [`Transform`].
///
/// [`Transform`]: crate::transform::Transform
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `not_found`, or a key absent from a lookup.
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Bytes(Bytes),
    List(Vec<Value>),
    /// Key/value pairs in server order.
    Pairs(Vec<(Bytes, Value)>),
    Map(HashMap<Bytes, Value>),
}

// ── Convenience accessors ──────────────────────────────────────────

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to interpret this value as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Try to interpret this value as a UTF-8 string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_pairs(&self) -> Option<&[(Bytes, Value)]> {
        match self {
            Self::Pairs(pairs) => Some(pairs),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<Bytes, Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key in a `Map` or `Pairs` value.
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        match self {
            Self::Map(map) => map.get(key),
            Self::Pairs(pairs) => pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Pairs(_) => "pairs",
            Self::Map(_) => "map",
        }
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Self::Bytes(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

// ── Tests ──────────────────────────────────────────────────────────
