//! Typed values: what dehydrate produces and hydrate consumes.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use indexmap::IndexMap;

use crate::ir::TypeId;

#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Any(serde_json::Value),
    Null,
    Bool(bool),
    Integer(i64),
    /// The number token as read, so an integral `3` is written back as `3`.
    Double(serde_json::Number),
    String(String),
    Transformed(TransformedValue),
    Array(Vec<TypedValue>),
    Map(IndexMap<String, TypedValue>),
    Object(TypedObject),
    Enum(String),
    Union(Box<UnionValue>),
}

impl TypedValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Any(_) => "any",
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Transformed(t) => t.kind_name(),
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
            Self::Enum(_) => "enum case",
            Self::Union(_) => "union",
        }
    }

    pub fn as_object(&self) -> Option<&TypedObject> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Enum(s) => Some(s),
            _ => None,
        }
    }
}

/// A string with a recognized interpretation, held in parsed form.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformedValue {
    DateTime(DateTime<FixedOffset>),
    Date(NaiveDate),
    Time(NaiveTime),
    Uuid(String),
    Uri(String),
    IntegerString(i64),
    BoolString(bool),
}

impl TransformedValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::DateTime(_) => "date-time",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Uuid(_) => "uuid",
            Self::Uri(_) => "uri",
            Self::IntegerString(_) => "integer-string",
            Self::BoolString(_) => "bool-string",
        }
    }
}

/// An instance of a class. Fields are in declared order; `None` marks an absent
/// optional field.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedObject {
    pub class: TypeId,
    pub fields: IndexMap<String, Option<TypedValue>>,
}

impl TypedObject {
    pub fn new(class: TypeId) -> Self {
        Self { class, fields: IndexMap::new() }
    }

    pub fn with(mut self, key: impl Into<String>, value: Option<TypedValue>) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// The value of a present field.
    pub fn get(&self, key: &str) -> Option<&TypedValue> {
        self.fields.get(key).and_then(Option::as_ref)
    }

    pub fn is_absent(&self, key: &str) -> bool {
        self.get(key).is_none()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Value of a true union: at most one slot is populated, and which one is the
/// discriminant. All slots empty means `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnionValue {
    pub bool: Option<bool>,
    pub integer: Option<i64>,
    pub double: Option<serde_json::Number>,
    /// Plain or transformed string.
    pub string: Option<TypedValue>,
    pub array: Option<Vec<TypedValue>>,
    pub class: Option<TypedObject>,
    pub map: Option<IndexMap<String, TypedValue>>,
    pub enumeration: Option<String>,
}

impl UnionValue {
    pub fn null() -> Self {
        Self::default()
    }

    pub fn is_null(&self) -> bool {
        *self == Self::default()
    }
}
