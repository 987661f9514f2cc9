//! Compound value encoding (flag 4)
//!
//! ```text
//! ┌─────────────┬──────────────────────────────┐
//! │ Version (1) │ bincode(Value)               │
//! └─────────────┴──────────────────────────────┘
//! ```
//!
//! bincode uses fixed-width little-endian integers: a `u32` variant index per
//! value and a `u64` length before every string, byte string, list and map.
//!
//! Decoding never trusts the payload: nesting is checked while descending,
//! before a nested list or map is read, and every length is bounded by the
//! bytes actually present.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use bincode::Options;
use serde::de::{self, DeserializeSeed, EnumAccess, MapAccess, SeqAccess, VariantAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::error::{MemcacheError, Result};
use super::Value;

/// Leading byte of every compound payload
pub const COMPOUND_FORMAT_VERSION: u8 = 1;

/// Deepest accepted nesting of lists and maps
pub const MAX_NESTING_DEPTH: usize = 64;

/// Variant names in declaration (and wire index) order
const VARIANTS: &[&str] = &[
    "String", "Bytes", "Integer", "Float", "Boolean", "Null", "List", "Map",
];

/// Upper bound on elements reserved up front from a declared length
const PREALLOCATE_LIMIT: usize = 4096;

fn options() -> impl Options {
    bincode::DefaultOptions::new().with_fixint_encoding()
}

// =============================================================================
// Encode / Decode
// =============================================================================

/// Encode a compound value tree
pub(super) fn encode(value: &Value) -> Result<Vec<u8>> {
    check_depth(value)?;

    let body = options()
        .serialize(value)
        .map_err(|e| MemcacheError::Serialization(format!("compound encode failed: {}", e)))?;

    let mut bytes = Vec::with_capacity(1 + body.len());
    bytes.push(COMPOUND_FORMAT_VERSION);
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Decode a compound payload
pub(super) fn decode(bytes: &[u8]) -> Result<Value> {
    let (version, body) = bytes.split_first().ok_or_else(|| {
        MemcacheError::Serialization("empty compound payload".to_string())
    })?;

    if *version != COMPOUND_FORMAT_VERSION {
        return Err(MemcacheError::Serialization(format!(
            "unsupported compound format version {} (expected {})",
            version, COMPOUND_FORMAT_VERSION
        )));
    }

    options()
        .with_limit(body.len() as u64)
        .deserialize::<Value>(body)
        .map_err(|e| MemcacheError::Serialization(format!("compound decode failed: {}", e)))
}

/// Reject trees nested deeper than [`MAX_NESTING_DEPTH`]
///
/// Walks the tree with an explicit stack.
fn check_depth(value: &Value) -> Result<()> {
    let mut pending = vec![(value, 0usize)];

    while let Some((value, enclosing)) = pending.pop() {
        let level = enclosing + 1;
        match value {
            Value::List(items) if level <= MAX_NESTING_DEPTH => {
                pending.extend(items.iter().map(|item| (item, level)));
            }
            Value::Map(entries) if level <= MAX_NESTING_DEPTH => {
                pending.extend(entries.values().map(|item| (item, level)));
            }
            Value::List(_) | Value::Map(_) => return Err(too_deep()),
            _ => {}
        }
    }
    Ok(())
}

fn too_deep() -> MemcacheError {
    MemcacheError::Serialization(format!(
        "compound value nested deeper than {} levels",
        MAX_NESTING_DEPTH
    ))
}

// =============================================================================
// Depth-limited Deserialize
// =============================================================================

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        ValueSeed { enclosing: 0 }.deserialize(deserializer)
    }
}

/// Deserializes one value inside `enclosing` lists or maps
#[derive(Clone, Copy)]
struct ValueSeed {
    enclosing: usize,
}

impl<'de> DeserializeSeed<'de> for ValueSeed {
    type Value = Value;

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_enum("Value", VARIANTS, self)
    }
}

impl<'de> Visitor<'de> for ValueSeed {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a cached value")
    }

    fn visit_enum<A>(self, data: A) -> std::result::Result<Value, A::Error>
    where
        A: EnumAccess<'de>,
    {
        let (tag, variant) = data.variant::<Tag>()?;
        let nested = Nested {
            level: self.enclosing + 1,
        };

        match tag {
            Tag::String => variant.newtype_variant().map(Value::String),
            Tag::Bytes => variant.newtype_variant().map(Value::Bytes),
            Tag::Integer => variant.newtype_variant().map(Value::Integer),
            Tag::Float => variant.newtype_variant().map(Value::Float),
            Tag::Boolean => variant.newtype_variant().map(Value::Boolean),
            Tag::Null => variant.unit_variant().map(|()| Value::Null),
            Tag::List => variant
                .newtype_variant_seed(ListSeed(nested))
                .map(Value::List),
            Tag::Map => variant.newtype_variant_seed(MapSeed(nested)).map(Value::Map),
        }
    }
}

/// Variant tag, by wire index or by name
enum Tag {
    String,
    Bytes,
    Integer,
    Float,
    Boolean,
    Null,
    List,
    Map,
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_identifier(TagVisitor)
    }
}

struct TagVisitor;

impl<'de> Visitor<'de> for TagVisitor {
    type Value = Tag;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a value variant")
    }

    fn visit_u64<E: de::Error>(self, index: u64) -> std::result::Result<Tag, E> {
        match index {
            0 => Ok(Tag::String),
            1 => Ok(Tag::Bytes),
            2 => Ok(Tag::Integer),
            3 => Ok(Tag::Float),
            4 => Ok(Tag::Boolean),
            5 => Ok(Tag::Null),
            6 => Ok(Tag::List),
            7 => Ok(Tag::Map),
            _ => Err(E::invalid_value(de::Unexpected::Unsigned(index), &self)),
        }
    }

    fn visit_str<E: de::Error>(self, name: &str) -> std::result::Result<Tag, E> {
        match VARIANTS.iter().position(|variant| *variant == name) {
            Some(index) => self.visit_u64(index as u64),
            None => Err(E::unknown_variant(name, VARIANTS)),
        }
    }
}

/// Nesting level of a list or map being decoded
#[derive(Clone, Copy)]
struct Nested {
    level: usize,
}

impl Nested {
    fn check<E: de::Error>(self) -> std::result::Result<(), E> {
        if self.level > MAX_NESTING_DEPTH {
            return Err(E::custom(format!(
                "compound value nested deeper than {} levels",
                MAX_NESTING_DEPTH
            )));
        }
        Ok(())
    }

    fn element(self) -> ValueSeed {
        ValueSeed {
            enclosing: self.level,
        }
    }
}

#[derive(Clone, Copy)]
struct ListSeed(Nested);

impl<'de> DeserializeSeed<'de> for ListSeed {
    type Value = Vec<Value>;

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<Vec<Value>, D::Error>
    where
        D: Deserializer<'de>,
    {
        self.0.check::<D::Error>()?;
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for ListSeed {
    type Value = Vec<Value>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a list of values")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Vec<Value>, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(PREALLOCATE_LIMIT));
        while let Some(item) = seq.next_element_seed(self.0.element())? {
            items.push(item);
        }
        Ok(items)
    }
}

#[derive(Clone, Copy)]
struct MapSeed(Nested);

impl<'de> DeserializeSeed<'de> for MapSeed {
    type Value = BTreeMap<String, Value>;

    fn deserialize<D>(self, deserializer: D) -> std::result::Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        self.0.check::<D::Error>()?;
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for MapSeed {
    type Value = BTreeMap<String, Value>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of values")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = BTreeMap::new();
        while let Some((key, item)) =
            map.next_entry_seed(PhantomData::<String>, self.0.element())?
        {
            entries.insert(key, item);
        }
        Ok(entries)
    }
}
