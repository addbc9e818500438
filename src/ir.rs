// Type graph shared by every generator pass. Immutable once built.
//
// Named types (classes, enums) get their identity from their `TypeId`, never from
// their shape: two classes with identical fields are still two nodes. Recursive
// references are `TypeId` indirections into the arena.
pub mod builder;

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

pub use builder::TypeGraphBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Semantic interpretation of a string value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StringKind {
    DateTime,
    Date,
    Time,
    Uuid,
    Uri,
    IntegerString,
    BoolString,
    /// Produced by the front-end, but not something this crate knows how to convert.
    Other(String),
}

impl StringKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "date-time" => Self::DateTime,
            "date" => Self::Date,
            "time" => Self::Time,
            "uuid" => Self::Uuid,
            "uri" => Self::Uri,
            "integer-string" => Self::IntegerString,
            "bool-string" => Self::BoolString,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::DateTime => "date-time",
            Self::Date => "date",
            Self::Time => "time",
            Self::Uuid => "uuid",
            Self::Uri => "uri",
            Self::IntegerString => "integer-string",
            Self::BoolString => "bool-string",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for StringKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub enum Ty {
    Any,
    Null,
    Bool,
    Integer,
    Double,
    String,
    TransformedString(StringKind),
    Array(TypeId),       // items
    Map(TypeId),         // values; keys are always strings
    Class(ClassType),
    Enum(EnumType),
    Union(UnionType),
}

#[derive(Debug, Clone)]
pub struct ClassType {
    pub name: String,                    // display text, pre-styling
    pub fields: IndexMap<String, Field>, // declared order
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub ty: TypeId,
    pub optional: bool,
}

#[derive(Debug, Clone)]
pub struct EnumType {
    pub name: String,
    pub cases: IndexSet<String>,
}

#[derive(Debug, Clone)]
pub struct UnionType {
    pub members: IndexSet<TypeId>, // at most one member per `TypeKind`
}

#[derive(Debug, Clone)]
pub struct TypeGraph {
    pub(crate) types: Vec<Ty>,
    pub(crate) top_levels: IndexMap<String, TypeId>,
}

impl TypeGraph {
    pub fn get(&self, id: TypeId) -> &Ty {
        &self.types[id.index()]
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        (0..self.types.len() as u32).map(TypeId)
    }

    pub fn top_levels(&self) -> &IndexMap<String, TypeId> {
        &self.top_levels
    }

    pub fn top_level(&self, name: &str) -> Option<TypeId> {
        self.top_levels.get(name).copied()
    }

    pub fn class(&self, id: TypeId) -> Option<&ClassType> {
        match self.get(id) {
            Ty::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn enum_type(&self, id: TypeId) -> Option<&EnumType> {
        match self.get(id) {
            Ty::Enum(enum_type) => Some(enum_type),
            _ => None,
        }
    }

    /// Classes in declaration order.
    pub fn classes(&self) -> impl Iterator<Item = (TypeId, &ClassType)> + '_ {
        self.ids().filter_map(|id| self.class(id).map(|c| (id, c)))
    }

    /// Enums in declaration order.
    pub fn enums(&self) -> impl Iterator<Item = (TypeId, &EnumType)> + '_ {
        self.ids().filter_map(|id| self.enum_type(id).map(|e| (id, e)))
    }

    /// Look up a class by its display name. First declared wins.
    pub fn class_named(&self, name: &str) -> Option<TypeId> {
        self.classes().find(|(_, c)| c.name == name).map(|(id, _)| id)
    }

    /// Short human description used in error messages and outlines.
    pub fn describe(&self, id: TypeId) -> String {
        match self.get(id) {
            Ty::Any => "any".into(),
            Ty::Null => "null".into(),
            Ty::Bool => "bool".into(),
            Ty::Integer => "integer".into(),
            Ty::Double => "double".into(),
            Ty::String => "string".into(),
            Ty::TransformedString(kind) => format!("string<{kind}>"),
            Ty::Array(items) => format!("array<{}>", self.describe(*items)),
            Ty::Map(values) => format!("map<{}>", self.describe(*values)),
            Ty::Class(class) => class.name.clone(),
            Ty::Enum(enum_type) => enum_type.name.clone(),
            Ty::Union(union) => {
                let arms = union.members.iter().map(|m| self.describe(*m)).collect::<Vec<_>>();
                arms.join(" | ")
            }
        }
    }
}
