//! Result transforms.
//!
//! A [`Transform`] turns the body of an `ok` response into a typed
//! [`Value`]. The set is closed and every variant is a pure function of the
//! body plus whatever auxiliary input the variant itself carries (the key
//! list of a [`Transform::KeyedLookup`], for instance). Call sites pick one
//! explicitly; nothing is inferred from the command name.

use std::collections::HashMap;

use bytes::Bytes;

use crate::error::{Result, SsdbError};
use crate::proto::types::Response;
use crate::value::Value;

/// Conversion applied to single elements inside paired bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scalar {
    #[default]
    Bytes,
    Int,
    Float,
}

impl Scalar {
    fn convert(self, raw: &Bytes) -> Result<Value> {
        match self {
            Self::Bytes => Ok(Value::Bytes(raw.clone())),
            Self::Int => parse_int(raw).map(Value::Int),
            Self::Float => parse_float(raw).map(Value::Float),
        }
    }
}

/// Output shape of a keyed lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupShape {
    /// A `List` parallel to the requested keys.
    Values,
    /// A `Map` holding every requested key.
    Map,
}

/// The closed catalogue of result transforms.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// The body as a `List` of `Bytes`, untouched.
    Raw,
    /// Ignore the body.
    Unit,
    /// Exactly one element, as bytes.
    Bytes,
    /// One element; `"1"` is true, anything else false.
    Bool,
    /// One element parsed as a signed decimal integer.
    Int,
    /// One element parsed as a float.
    Float,
    /// Every element as bytes.
    List,
    /// Even-length body as ordered `(key, value)` pairs.
    Pairs(Scalar),
    /// Even-length body as a mapping.
    Map(Scalar),
    /// Even-length body projected onto the keys that were asked for.
    /// Keys the server did not return map to `Nil`.
    KeyedLookup {
        keys: Vec<Bytes>,
        shape: LookupShape,
        scalar: Scalar,
    },
    /// Server statistics: a banner element followed by key/value pairs.
    /// Multi-line values become a `List` of their trimmed lines.
    Stats,
}

impl Default for Transform {
    fn default() -> Self {
        Self::Raw
    }
}

impl Transform {
    /// Keyed lookup producing values parallel to `keys`.
    pub fn lookup_values<I>(keys: I, scalar: Scalar) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        Self::KeyedLookup {
            keys: keys.into_iter().map(Into::into).collect(),
            shape: LookupShape::Values,
            scalar,
        }
    }

    /// Keyed lookup producing a mapping over `keys`.
    pub fn lookup_map<I>(keys: I, scalar: Scalar) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        Self::KeyedLookup {
            keys: keys.into_iter().map(Into::into).collect(),
            shape: LookupShape::Map,
            scalar,
        }
    }

    /// Apply the transform to the body of an `ok` response.
    pub fn apply(&self, body: &[Bytes]) -> Result<Value> {
        match self {
            Self::Raw | Self::List => Ok(Value::List(
                body.iter().cloned().map(Value::Bytes).collect(),
            )),
            Self::Unit => Ok(Value::Nil),
            Self::Bytes => single(body, "bytes").map(|b| Value::Bytes(b.clone())),
            Self::Bool => single(body, "bool").map(|b| Value::Bool(&b[..] == b"1")),
            Self::Int => single(body, "int").and_then(parse_int).map(Value::Int),
            Self::Float => single(body, "float").and_then(parse_float).map(Value::Float),
            Self::Pairs(scalar) => Ok(Value::Pairs(pairs(body, *scalar)?)),
            Self::Map(scalar) => Ok(Value::Map(pairs(body, *scalar)?.into_iter().collect())),
            Self::KeyedLookup {
                keys,
                shape,
                scalar,
            } => keyed_lookup(body, keys, *shape, *scalar),
            Self::Stats => stats(body),
        }
    }

    /// Resolve a full response.
    ///
    /// `ok` applies the transform, `not_found` yields `Nil`, every other
    /// status is a server error.
    pub fn resolve(&self, response: Response) -> Result<Value> {
        match response.into_body()? {
            Some(body) => self.apply(&body),
            None => Ok(Value::Nil),
        }
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn single<'a>(body: &'a [Bytes], what: &str) -> Result<&'a Bytes> {
    match body {
        [only] => Ok(only),
        _ => Err(SsdbError::Transform(format!(
            "{what} transform expects exactly one element, got {}",
            body.len()
        ))),
    }
}

fn parse_int(raw: &Bytes) -> Result<i64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            SsdbError::Transform(format!(
                "not an integer: {:?}",
                String::from_utf8_lossy(raw)
            ))
        })
}

fn parse_float(raw: &Bytes) -> Result<f64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| {
            SsdbError::Transform(format!(
                "not a number: {:?}",
                String::from_utf8_lossy(raw)
            ))
        })
}

fn pairs(body: &[Bytes], scalar: Scalar) -> Result<Vec<(Bytes, Value)>> {
    if body.len() % 2 != 0 {
        return Err(SsdbError::Transform(format!(
            "paired transform expects an even number of elements, got {}",
            body.len()
        )));
    }
    body.chunks_exact(2)
        .map(|kv| Ok((kv[0].clone(), scalar.convert(&kv[1])?)))
        .collect()
}

fn keyed_lookup(
    body: &[Bytes],
    keys: &[Bytes],
    shape: LookupShape,
    scalar: Scalar,
) -> Result<Value> {
    let mut found: HashMap<Bytes, Value> = pairs(body, scalar)?.into_iter().collect();
    match shape {
        LookupShape::Values => Ok(Value::List(
            keys.iter()
                .map(|k| found.get(k).cloned().unwrap_or(Value::Nil))
                .collect(),
        )),
        LookupShape::Map => Ok(Value::Map(
            keys.iter()
                .map(|k| (k.clone(), found.remove(k).unwrap_or(Value::Nil)))
                .collect(),
        )),
    }
}

fn stats(body: &[Bytes]) -> Result<Value> {
    let Some((_banner, rest)) = body.split_first() else {
        return Err(SsdbError::Transform("stats body is empty".into()));
    };
    let entries = pairs(rest, Scalar::Bytes)?;
    let map = entries
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                Value::Bytes(raw) if raw.contains(&b'\n') => Value::List(
                    raw.split(|&b| b == b'\n')
                        .map(|line| line.trim_ascii())
                        .filter(|line| !line.is_empty())
                        .map(|line| Value::Bytes(raw.slice_ref(line)))
                        .collect(),
                ),
                other => other,
            };
            (k, v)
        })
        .collect();
    Ok(Value::Map(map))
}

// ── Tests ──────────────────────────────────────────────────────────
