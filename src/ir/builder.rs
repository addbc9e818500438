use std::collections::BTreeSet;

use indexmap::{IndexMap, IndexSet};

use super::{ClassType, EnumType, Field, StringKind, Ty, TypeGraph, TypeId, UnionType};
use crate::dispatch::TypeKind;
use crate::error::ConfigError;

/// Accumulates nodes, then validates and freezes them into a [`TypeGraph`].
///
/// Classes may be declared before they are defined so that fields can refer back
/// to their own class (directly or through other classes).
#[derive(Debug, Default)]
pub struct TypeGraphBuilder {
    types: Vec<Ty>,
    undefined: BTreeSet<TypeId>,
    top_levels: IndexMap<String, TypeId>,
}

impl TypeGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, ty: Ty) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    pub fn any(&mut self) -> TypeId {
        self.add(Ty::Any)
    }

    pub fn null(&mut self) -> TypeId {
        self.add(Ty::Null)
    }

    pub fn bool(&mut self) -> TypeId {
        self.add(Ty::Bool)
    }

    pub fn integer(&mut self) -> TypeId {
        self.add(Ty::Integer)
    }

    pub fn double(&mut self) -> TypeId {
        self.add(Ty::Double)
    }

    pub fn string(&mut self) -> TypeId {
        self.add(Ty::String)
    }

    pub fn transformed(&mut self, kind: StringKind) -> TypeId {
        self.add(Ty::TransformedString(kind))
    }

    pub fn array(&mut self, items: TypeId) -> TypeId {
        self.add(Ty::Array(items))
    }

    pub fn map(&mut self, values: TypeId) -> TypeId {
        self.add(Ty::Map(values))
    }

    pub fn union(&mut self, members: impl IntoIterator<Item = TypeId>) -> TypeId {
        self.add(Ty::Union(UnionType { members: members.into_iter().collect() }))
    }

    /// `Union{Null, inner}`, the canonical nullable shape.
    pub fn nullable(&mut self, inner: TypeId) -> TypeId {
        let null = self.null();
        self.union([null, inner])
    }

    pub fn enumeration<S: Into<String>>(
        &mut self,
        name: impl Into<String>,
        cases: impl IntoIterator<Item = S>,
    ) -> TypeId {
        self.add(Ty::Enum(EnumType {
            name: name.into(),
            cases: cases.into_iter().map(Into::into).collect(),
        }))
    }

    /// Reserve identity for a class whose fields are supplied later.
    pub fn declare_class(&mut self, name: impl Into<String>) -> TypeId {
        let id = self.add(Ty::Class(ClassType { name: name.into(), fields: IndexMap::new() }));
        self.undefined.insert(id);
        id
    }

    pub fn define_class<K: Into<String>>(
        &mut self,
        id: TypeId,
        fields: impl IntoIterator<Item = (K, Field)>,
    ) -> Result<(), ConfigError> {
        match self.types.get_mut(id.index()) {
            Some(Ty::Class(class)) => {
                class.fields = fields.into_iter().map(|(k, f)| (k.into(), f)).collect();
                self.undefined.remove(&id);
                Ok(())
            }
            _ => Err(ConfigError::NotAClass(id)),
        }
    }

    pub fn class<K: Into<String>>(
        &mut self,
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (K, Field)>,
    ) -> TypeId {
        self.add(Ty::Class(ClassType {
            name: name.into(),
            fields: fields.into_iter().map(|(k, f)| (k.into(), f)).collect(),
        }))
    }

    pub fn top_level(&mut self, name: impl Into<String>, id: TypeId) -> &mut Self {
        self.top_levels.insert(name.into(), id);
        self
    }

    pub fn build(self) -> Result<TypeGraph, ConfigError> {
        if let Some(id) = self.undefined.iter().next() {
            let name = match &self.types[id.index()] {
                Ty::Class(class) => class.name.clone(),
                _ => id.to_string(),
            };
            return Err(ConfigError::UndefinedClass(name));
        }

        let count = self.types.len();
        let check = |id: TypeId| {
            if id.index() < count { Ok(()) } else { Err(ConfigError::DanglingType(id)) }
        };

        for ty in &self.types {
            match ty {
                Ty::Array(inner) | Ty::Map(inner) => check(*inner)?,
                Ty::Class(class) => {
                    for field in class.fields.values() {
                        check(field.ty)?;
                    }
                }
                Ty::Union(union) => {
                    let mut seen = IndexSet::new();
                    for member in &union.members {
                        check(*member)?;
                        let kind = TypeKind::of(&self.types[member.index()]);
                        if kind == TypeKind::Union {
                            return Err(ConfigError::NestedUnion);
                        }
                        if !seen.insert(kind) {
                            return Err(ConfigError::DuplicateUnionKind(kind));
                        }
                    }
                    if union.members.is_empty() {
                        return Err(ConfigError::EmptyUnion);
                    }
                }
                _ => {}
            }
        }
        for id in self.top_levels.values() {
            check(*id)?;
        }

        Ok(TypeGraph { types: self.types, top_levels: self.top_levels })
    }
}

impl Field {
    pub fn required(ty: TypeId) -> Self {
        Self { ty, optional: false }
    }

    pub fn optional(ty: TypeId) -> Self {
        Self { ty, optional: true }
    }
}
