//! Single-dispatch over the closed set of `Ty` variants.
//!
//! Every pass that needs per-variant behavior implements [`TypeVisitor`], so a new
//! variant is a compile error in each of them rather than a silently ignored case.
//! The dispatcher does not collapse nullable unions; callers ask for that
//! explicitly through [`nullable_member`] / [`union_shape`].

use std::fmt;

use serde::Serialize;

use crate::ir::{ClassType, EnumType, StringKind, Ty, TypeGraph, TypeId, UnionType};

pub trait TypeVisitor<'g> {
    type Output;

    fn any(&mut self) -> Self::Output;
    fn null(&mut self) -> Self::Output;
    fn bool(&mut self) -> Self::Output;
    fn integer(&mut self) -> Self::Output;
    fn double(&mut self) -> Self::Output;
    fn string(&mut self) -> Self::Output;
    fn transformed_string(&mut self, kind: &'g StringKind) -> Self::Output;
    fn array(&mut self, items: TypeId) -> Self::Output;
    fn map(&mut self, values: TypeId) -> Self::Output;
    fn class(&mut self, id: TypeId, class: &'g ClassType) -> Self::Output;
    fn enumeration(&mut self, id: TypeId, enum_type: &'g EnumType) -> Self::Output;
    fn union(&mut self, id: TypeId, union: &'g UnionType) -> Self::Output;
}

pub fn dispatch<'g, V: TypeVisitor<'g>>(graph: &'g TypeGraph, id: TypeId, visitor: &mut V) -> V::Output {
    match graph.get(id) {
        Ty::Any => visitor.any(),
        Ty::Null => visitor.null(),
        Ty::Bool => visitor.bool(),
        Ty::Integer => visitor.integer(),
        Ty::Double => visitor.double(),
        Ty::String => visitor.string(),
        Ty::TransformedString(kind) => visitor.transformed_string(kind),
        Ty::Array(items) => visitor.array(*items),
        Ty::Map(values) => visitor.map(*values),
        Ty::Class(class) => visitor.class(id, class),
        Ty::Enum(enum_type) => visitor.enumeration(id, enum_type),
        Ty::Union(union) => visitor.union(id, union),
    }
}

/// Top-level kind of a type. A union holds at most one member of each kind;
/// plain and transformed strings share the `String` kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeKind {
    Any,
    Null,
    Bool,
    Integer,
    Double,
    String,
    Array,
    Map,
    Class,
    Enum,
    Union,
}

impl TypeKind {
    pub fn of(ty: &Ty) -> Self {
        match ty {
            Ty::Any => Self::Any,
            Ty::Null => Self::Null,
            Ty::Bool => Self::Bool,
            Ty::Integer => Self::Integer,
            Ty::Double => Self::Double,
            Ty::String | Ty::TransformedString(_) => Self::String,
            Ty::Array(_) => Self::Array,
            Ty::Map(_) => Self::Map,
            Ty::Class(_) => Self::Class,
            Ty::Enum(_) => Self::Enum,
            Ty::Union(_) => Self::Union,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Double => "double",
            Self::String => "string",
            Self::Array => "array",
            Self::Map => "map",
            Self::Class => "class",
            Self::Enum => "enum",
            Self::Union => "union",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a union should be treated by downstream passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionShape {
    /// Only `Null`.
    NullOnly,
    /// One non-null member and no `Null`: the union is just that member.
    Single(TypeId),
    /// `Null` plus exactly one other member: an optional wrapper.
    Nullable(TypeId),
    /// Two or more non-null members, `nullable` if `Null` is also a member.
    Multi { nullable: bool },
}

pub fn union_shape(graph: &TypeGraph, union: &UnionType) -> UnionShape {
    let mut nullable = false;
    let mut others = Vec::with_capacity(union.members.len());
    for member in &union.members {
        if matches!(graph.get(*member), Ty::Null) {
            nullable = true;
        } else {
            others.push(*member);
        }
    }
    match (others.as_slice(), nullable) {
        ([], _) => UnionShape::NullOnly,
        ([only], false) => UnionShape::Single(*only),
        ([only], true) => UnionShape::Nullable(*only),
        _ => UnionShape::Multi { nullable },
    }
}

/// The wrapped member if `id` is the canonical nullable union `Null | T`.
pub fn nullable_member(graph: &TypeGraph, id: TypeId) -> Option<TypeId> {
    match graph.get(id) {
        Ty::Union(union) => match union_shape(graph, union) {
            UnionShape::Nullable(inner) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

/// Whether a value of this type may be `null` on the wire.
pub fn accepts_null(graph: &TypeGraph, id: TypeId) -> bool {
    match graph.get(id) {
        Ty::Any | Ty::Null => true,
        Ty::Union(union) => match union_shape(graph, union) {
            UnionShape::NullOnly | UnionShape::Nullable(_) => true,
            UnionShape::Single(inner) => accepts_null(graph, inner),
            UnionShape::Multi { nullable } => nullable,
        },
        _ => false,
    }
}
