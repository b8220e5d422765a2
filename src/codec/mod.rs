//! Conversion of analysis results into protocol-safe wire values.
//!
//! Every value that crosses the protocol boundary goes through [`Encode`].
//! Domain records get their encoder from the [`record!`](crate::record)
//! macro, which also publishes the record's field order for the schema
//! explainers. Maps keyed by domain identifiers coerce keys through
//! [`WireKey`] and refuse to merge two keys that coerce to the same string.

mod graph;

pub use graph::{GraphEdge, GraphResult};

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;
use serde_json::Number;

use crate::errors::EncodeError;

/// Canonical wire representation: null, bool, number, string, list, or an
/// insertion-ordered string-keyed map.
pub type WireValue = serde_json::Value;

/// Insertion-ordered string-keyed map of wire values.
pub type WireMap = serde_json::Map<String, WireValue>;

/// A value that can be converted into its wire form.
pub trait Encode {
    fn encode(&self) -> Result<WireValue, EncodeError>;
}

/// A domain record with a fixed, declared field order.
pub trait Record: Encode {
    /// Wire field names in encoding order.
    const FIELDS: &'static [&'static str];
}

/// Coercion of a map key into its wire string form.
pub trait WireKey {
    fn wire_key(&self) -> String;
}

/// Encodes `value`, failing the whole conversion on the first unencodable part.
pub fn encode<T: Encode + ?Sized>(value: &T) -> Result<WireValue, EncodeError> {
    value.encode()
}

/// Builds a wire map from `(key, value)` pairs, rejecting coerced key collisions.
pub fn encode_entries<'a, K, V, I>(entries: I) -> Result<WireMap, EncodeError>
where
    K: WireKey + ?Sized + 'a,
    V: Encode + ?Sized + 'a,
    I: IntoIterator<Item = (&'a K, &'a V)>,
{
    let mut map = WireMap::new();
    for (k, v) in entries {
        let key = k.wire_key();
        if map.contains_key(&key) {
            return Err(EncodeError::KeyCollision { key });
        }
        map.insert(key, v.encode()?);
    }
    Ok(map)
}

/// Implements [`Encode`] and [`Record`] for a struct, encoding the listed
/// fields in the listed order. `field as "name"` renames a field on the wire.
#[macro_export]
macro_rules! record {
    (@name $field:ident) => {
        stringify!($field)
    };
    (@name $field:ident $wire:literal) => {
        $wire
    };
    ($ty:ty { $($field:ident $(as $wire:literal)?),* $(,)? }) => {
        impl $crate::codec::Record for $ty {
            const FIELDS: &'static [&'static str] = &[$($crate::record!(@name $field $($wire)?)),*];
        }

        impl $crate::codec::Encode for $ty {
            fn encode(
                &self,
            ) -> ::std::result::Result<$crate::codec::WireValue, $crate::errors::EncodeError> {
                let mut map = $crate::codec::WireMap::new();
                $(
                    map.insert(
                        $crate::record!(@name $field $($wire)?).to_string(),
                        $crate::codec::Encode::encode(&self.$field)?,
                    );
                )*
                Ok($crate::codec::WireValue::Object(map))
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

impl Encode for WireValue {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        Ok(self.clone())
    }
}

impl Encode for () {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        Ok(WireValue::Null)
    }
}

impl Encode for bool {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        Ok(WireValue::Bool(*self))
    }
}

impl Encode for str {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        Ok(WireValue::String(self.to_string()))
    }
}

impl Encode for String {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        Ok(WireValue::String(self.clone()))
    }
}

macro_rules! encode_integer {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn encode(&self) -> Result<WireValue, EncodeError> {
                    Ok(WireValue::Number(Number::from(*self)))
                }
            }

            impl WireKey for $t {
                fn wire_key(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

encode_integer!(i32, i64, u32, u64, usize);

impl Encode for f64 {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        Number::from_f64(*self)
            .map(WireValue::Number)
            .ok_or_else(|| EncodeError::Unencodable {
                what: format!("non-finite number {}", self),
            })
    }
}

impl Encode for std::path::Path {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        self.to_str()
            .map(|s| WireValue::String(s.to_string()))
            .ok_or_else(|| EncodeError::Unencodable {
                what: format!("non-UTF-8 path {}", self.display()),
            })
    }
}

impl Encode for std::path::PathBuf {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        self.as_path().encode()
    }
}

// ---------------------------------------------------------------------------
// Wrappers
// ---------------------------------------------------------------------------

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        (**self).encode()
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        (**self).encode()
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        match self {
            Some(v) => v.encode(),
            None => Ok(WireValue::Null),
        }
    }
}

impl<A: Encode, B: Encode> Encode for (A, B) {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        Ok(WireValue::Array(vec![self.0.encode()?, self.1.encode()?]))
    }
}

// ---------------------------------------------------------------------------
// Sequences
// ---------------------------------------------------------------------------

impl<T: Encode> Encode for [T] {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        self.iter()
            .map(Encode::encode)
            .collect::<Result<Vec<_>, _>>()
            .map(WireValue::Array)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        self.as_slice().encode()
    }
}

impl<T: Encode> Encode for BTreeSet<T> {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        self.iter()
            .map(Encode::encode)
            .collect::<Result<Vec<_>, _>>()
            .map(WireValue::Array)
    }
}

/// Hash sets have no stable order, so elements are sorted by their encoded
/// JSON text.
impl<T: Encode, S> Encode for HashSet<T, S> {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        let mut items = self
            .iter()
            .map(|v| {
                let encoded = v.encode()?;
                Ok((encoded.to_string(), encoded))
            })
            .collect::<Result<Vec<_>, EncodeError>>()?;
        items.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(WireValue::Array(items.into_iter().map(|(_, v)| v).collect()))
    }
}

// ---------------------------------------------------------------------------
// Mappings
// ---------------------------------------------------------------------------

impl WireKey for str {
    fn wire_key(&self) -> String {
        self.to_string()
    }
}

impl WireKey for String {
    fn wire_key(&self) -> String {
        self.clone()
    }
}

impl<K: WireKey + ?Sized> WireKey for &K {
    fn wire_key(&self) -> String {
        (**self).wire_key()
    }
}

impl<K: WireKey, V: Encode> Encode for IndexMap<K, V> {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        encode_entries(self.iter()).map(WireValue::Object)
    }
}

impl<K: WireKey, V: Encode> Encode for BTreeMap<K, V> {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        encode_entries(self.iter()).map(WireValue::Object)
    }
}

/// Hash maps are emitted in coerced-key order.
impl<K: WireKey, V: Encode, S> Encode for HashMap<K, V, S> {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        let mut entries: Vec<(String, &K, &V)> =
            self.iter().map(|(k, v)| (k.wire_key(), k, v)).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        encode_entries(entries.into_iter().map(|(_, k, v)| (k, v))).map(WireValue::Object)
    }
}
