//! Typed value leaves and the codec contract.
//!
//! Every leaf is one variant of the closed [`ValueData`] enum; serialization
//! and population pattern-match exhaustively, so adding a kind is a
//! compile-time event rather than a runtime type-check chain. Non-primitive
//! values are stored through a [`Codec`]: the serialized string is the
//! persisted form, the deserialized value is cached on every set.

use std::{any::Any, fmt, marker::PhantomData, sync::Arc};

use serde_json::Value as Json;

use crate::category::{CategoryId, ValueId};

// ── Kind tags ───────────────────────────────────────────────────────────────

/// Declared kind of a leaf, used in type-mismatch diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    String,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    /// Raw JSON carried as-is (scalar, array, or object).
    Json,
    Array,
    /// Codec-backed value persisted as a string.
    Serialized,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "boolean",
            Self::String => "string",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Json => "json",
            Self::Array => "array",
            Self::Serialized => "serialized string",
        };
        write!(f, "{name}")
    }
}

/// Name of a JSON value's kind, for the `found` side of a mismatch report.
pub(crate) fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

// ── Codec contract ──────────────────────────────────────────────────────────

/// Serialize/deserialize function pair for codec-backed leaves.
///
/// Both functions are pure. `deserialize` is total: codecs that can fail to
/// parse decide their own fallback (see the enum recipe in the tests). The
/// engine never inspects `T` itself.
pub struct Codec<T> {
    serialize: Arc<dyn Fn(&T) -> String + Send + Sync>,
    deserialize: Arc<dyn Fn(&str) -> T + Send + Sync>,
}

impl<T> Clone for Codec<T> {
    fn clone(&self) -> Self {
        Self {
            serialize: Arc::clone(&self.serialize),
            deserialize: Arc::clone(&self.deserialize),
        }
    }
}

impl<T: Send + Sync + 'static> Codec<T> {
    pub fn new(
        serialize: impl Fn(&T) -> String + Send + Sync + 'static,
        deserialize: impl Fn(&str) -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            serialize: Arc::new(serialize),
            deserialize: Arc::new(deserialize),
        }
    }

    pub fn serialize(&self, value: &T) -> String {
        (self.serialize)(value)
    }

    pub fn deserialize(&self, raw: &str) -> T {
        (self.deserialize)(raw)
    }

    fn erased(&self) -> ErasedCodec {
        let deserialize = Arc::clone(&self.deserialize);
        ErasedCodec {
            deserialize: Arc::new(move |raw| Box::new(deserialize(raw))),
        }
    }
}

/// Type-erased deserializer kept inside a [`SerializedSlot`] so the closed
/// enum can hold any `T` behind `dyn Any`.
#[derive(Clone)]
pub(crate) struct ErasedCodec {
    deserialize: Arc<dyn Fn(&str) -> Box<dyn Any + Send + Sync> + Send + Sync>,
}

/// Storage for a codec-backed leaf: the persisted string plus the
/// deserialized cache, refreshed on every set.
pub struct SerializedSlot {
    raw: String,
    cache: Box<dyn Any + Send + Sync>,
    codec: ErasedCodec,
}

impl SerializedSlot {
    pub(crate) fn new<T: Send + Sync + 'static>(codec: &Codec<T>, default: &T) -> Self {
        let erased = codec.erased();
        let raw = codec.serialize(default);
        let cache = (erased.deserialize)(&raw);
        Self {
            raw,
            cache,
            codec: erased,
        }
    }

    pub(crate) fn set_raw(&mut self, raw: &str) {
        self.cache = (self.codec.deserialize)(raw);
        self.raw = raw.to_owned();
    }

    pub(crate) fn raw(&self) -> &str {
        &self.raw
    }

    pub(crate) fn cached<T: Clone + 'static>(&self) -> Option<T> {
        self.cache.downcast_ref::<T>().cloned()
    }
}

// ── Leaf storage ────────────────────────────────────────────────────────────

/// Current value of a leaf. The variant is fixed at construction and never
/// changes; populating from a JSON value of another kind is a type mismatch,
/// not a coercion.
pub enum ValueData {
    Bool(bool),
    String(String),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Json(Json),
    Array(Vec<Json>),
    Serialized(SerializedSlot),
}

impl ValueData {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::String(_) => ValueKind::String,
            Self::I8(_) => ValueKind::I8,
            Self::I16(_) => ValueKind::I16,
            Self::I32(_) => ValueKind::I32,
            Self::I64(_) => ValueKind::I64,
            Self::F32(_) => ValueKind::F32,
            Self::F64(_) => ValueKind::F64,
            Self::Json(_) => ValueKind::Json,
            Self::Array(_) => ValueKind::Array,
            Self::Serialized(_) => ValueKind::Serialized,
        }
    }
}

/// A named, typed terminal node owned by one category.
pub(crate) struct Leaf {
    pub(crate) name: String,
    pub(crate) parent: CategoryId,
    pub(crate) data: ValueData,
}

impl Leaf {
    pub(crate) fn new(name: impl Into<String>, parent: CategoryId, data: ValueData) -> Self {
        Self {
            name: name.into(),
            parent,
            data,
        }
    }

    /// Append this leaf under its own name, using the JSON representation
    /// matching its kind: numbers as numbers, booleans as booleans, raw JSON
    /// as-is, everything else as a string holding the serialized form.
    pub(crate) fn write_to(&self, out: &mut serde_json::Map<String, Json>) {
        let value = match &self.data {
            ValueData::Bool(v) => Json::Bool(*v),
            ValueData::String(v) => Json::String(v.clone()),
            ValueData::I8(v) => Json::from(*v),
            ValueData::I16(v) => Json::from(*v),
            ValueData::I32(v) => Json::from(*v),
            ValueData::I64(v) => Json::from(*v),
            ValueData::F32(v) => Json::from(f64::from(*v)),
            ValueData::F64(v) => Json::from(*v),
            ValueData::Json(v) => v.clone(),
            ValueData::Array(items) => Json::Array(items.clone()),
            ValueData::Serialized(slot) => Json::String(slot.raw().to_owned()),
        };
        out.insert(self.name.clone(), value);
    }

    /// Set this leaf from an on-disk JSON value. Returns `false` when the
    /// JSON kind is incompatible with the declared kind; the stored value is
    /// left untouched in that case.
    pub(crate) fn populate(&mut self, value: &Json) -> bool {
        match &mut self.data {
            ValueData::Bool(slot) => match value.as_bool() {
                Some(v) => {
                    *slot = v;
                    true
                },
                None => false,
            },
            ValueData::String(slot) => match value.as_str() {
                Some(v) => {
                    *slot = v.to_owned();
                    true
                },
                None => false,
            },
            ValueData::I8(slot) => match value.as_i64().and_then(|v| i8::try_from(v).ok()) {
                Some(v) => {
                    *slot = v;
                    true
                },
                None => false,
            },
            ValueData::I16(slot) => match value.as_i64().and_then(|v| i16::try_from(v).ok()) {
                Some(v) => {
                    *slot = v;
                    true
                },
                None => false,
            },
            ValueData::I32(slot) => match value.as_i64().and_then(|v| i32::try_from(v).ok()) {
                Some(v) => {
                    *slot = v;
                    true
                },
                None => false,
            },
            ValueData::I64(slot) => match value.as_i64() {
                Some(v) => {
                    *slot = v;
                    true
                },
                None => false,
            },
            ValueData::F32(slot) => match value.as_f64() {
                Some(v) => {
                    *slot = v as f32;
                    true
                },
                None => false,
            },
            ValueData::F64(slot) => match value.as_f64() {
                Some(v) => {
                    *slot = v;
                    true
                },
                None => false,
            },
            // Raw JSON carries any kind as-is.
            ValueData::Json(slot) => {
                *slot = value.clone();
                true
            },
            ValueData::Array(slot) => match value.as_array() {
                Some(items) => {
                    *slot = items.clone();
                    true
                },
                None => false,
            },
            ValueData::Serialized(slot) => match value.as_str() {
                Some(raw) => {
                    slot.set_raw(raw);
                    true
                },
                None => false,
            },
        }
    }
}

// ── Typed handles ───────────────────────────────────────────────────────────

/// Handle to a primitive leaf, returned by
/// [`SchemaBuilder::define`](crate::SchemaBuilder::define). Retain it to read
/// the value back after the load pass.
pub struct ValueRef<T> {
    pub(crate) id: ValueId,
    pub(crate) _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ValueRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ValueRef<T> {}

/// Handle to a codec-backed leaf, returned by
/// [`SchemaBuilder::define_serialized`](crate::SchemaBuilder::define_serialized).
pub struct SerializedRef<T> {
    pub(crate) id: ValueId,
    pub(crate) _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for SerializedRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SerializedRef<T> {}

/// Types that can live in a primitive leaf.
pub trait LeafValue: Sized {
    fn into_data(self) -> ValueData;
    fn from_data(data: &ValueData) -> Option<Self>;
}

/// Default values accepted by `define`. This is the Rust rendering of an
/// overload set: `&str` defaults produce string leaves, everything else
/// stores as itself.
pub trait DefineLeaf {
    type Stored: LeafValue;
    fn into_stored(self) -> Self::Stored;
}

macro_rules! leaf_value {
    ($ty:ty, $variant:ident) => {
        impl LeafValue for $ty {
            fn into_data(self) -> ValueData {
                ValueData::$variant(self)
            }

            fn from_data(data: &ValueData) -> Option<Self> {
                match data {
                    ValueData::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }

        impl DefineLeaf for $ty {
            type Stored = $ty;

            fn into_stored(self) -> Self {
                self
            }
        }
    };
}

leaf_value!(bool, Bool);
leaf_value!(String, String);
leaf_value!(i8, I8);
leaf_value!(i16, I16);
leaf_value!(i32, I32);
leaf_value!(i64, I64);
leaf_value!(f32, F32);
leaf_value!(f64, F64);
leaf_value!(Json, Json);
leaf_value!(Vec<Json>, Array);

impl DefineLeaf for &str {
    type Stored = String;

    fn into_stored(self) -> String {
        self.to_owned()
    }
}
