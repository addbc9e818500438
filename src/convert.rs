//! Structural converter: one hydrate/dehydrate pair per reachable class.
//!
//! Building walks the graph depth-first from the entry classes and records a
//! [`Rule`] per field. Each class is planned exactly once, keyed by its
//! `TypeId`; a class reached again (including through itself) becomes a
//! `Rule::Class` reference to its own converter. The resulting [`Converters`]
//! is the generated program and can be executed directly (see `runtime`).
pub mod runtime;
pub mod transformed;

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::dispatch::{TypeVisitor, UnionShape, dispatch, union_shape};
use crate::error::ConfigError;
use crate::ir::{ClassType, EnumType, StringKind, Ty, TypeGraph, TypeId, UnionType};
use crate::union_codec::UnionCodec;

pub use transformed::TransformKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Primitive {
    Any,
    Null,
    Bool,
    Integer,
    Double,
    String,
}

/// How a value at one position is converted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "kebab-case")]
pub enum Rule {
    /// Copied verbatim after a shape check.
    Copy { primitive: Primitive },
    Transformed { kind: TransformKind },
    Enum { id: TypeId },
    /// Delegates to the class's own converter.
    Class { id: TypeId },
    Array { items: Box<Rule> },
    Map { values: Box<Rule> },
    /// The canonical `Null | T` union.
    Nullable { inner: Box<Rule> },
    /// Delegates to the union codec.
    Union { id: TypeId },
}

impl Rule {
    pub fn describe(&self) -> String {
        match self {
            Self::Copy { primitive } => format!("{primitive:?}").to_lowercase(),
            Self::Transformed { kind } => format!("{} string", kind.name()),
            Self::Enum { .. } => "enum case".into(),
            Self::Class { .. } => "object".into(),
            Self::Array { .. } => "array".into(),
            Self::Map { .. } => "map".into(),
            Self::Nullable { inner } => format!("nullable {}", inner.describe()),
            Self::Union { .. } => "union".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldConverter {
    pub key: String,
    pub optional: bool,
    pub rule: Rule,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassConverter {
    pub id: TypeId,
    pub name: String,
    pub fields: Vec<FieldConverter>, // declared order
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumConverter {
    pub id: TypeId,
    pub name: String,
    pub cases: IndexSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Converters {
    pub entries: Vec<TypeId>,
    /// Dependencies before dependents.
    pub classes: IndexMap<TypeId, ClassConverter>,
    pub enums: IndexMap<TypeId, EnumConverter>,
    pub unions: IndexMap<TypeId, UnionCodec>,
}

/// What to do with a non-nullable union of several members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnionRouting {
    /// Delegate to a union codec.
    #[default]
    Codec,
    /// Fail generation.
    Reject,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConverterOptions {
    pub unions: UnionRouting,
}

/// `buildHydrateDehydrate(entryClasses)` with true unions routed to the codec.
pub fn build_hydrate_dehydrate(graph: &TypeGraph, entries: &[TypeId]) -> Result<Converters, ConfigError> {
    build_with(graph, entries, ConverterOptions::default())
}

pub fn build_with(
    graph: &TypeGraph,
    entries: &[TypeId],
    options: ConverterOptions,
) -> Result<Converters, ConfigError> {
    for entry in entries {
        if graph.class(*entry).is_none() {
            return Err(ConfigError::NotAClass(*entry));
        }
    }
    check_cycles(graph, entries)?;

    let mut builder = Builder::new(graph, options);
    for entry in entries {
        builder.context = graph.describe(*entry);
        builder.rule(*entry)?;
    }
    builder.out.entries = entries.to_vec();
    tracing::debug!(
        classes = builder.out.classes.len(),
        enums = builder.out.enums.len(),
        unions = builder.out.unions.len(),
        "built converters"
    );
    Ok(builder.out)
}

// ————————————————————————————————————————————————————————————————————————————
// BUILDER
// ————————————————————————————————————————————————————————————————————————————

pub(crate) struct Builder<'g> {
    pub(crate) graph: &'g TypeGraph,
    options: ConverterOptions,
    pub(crate) out: Converters,
    in_progress: HashSet<TypeId>,
    context: String, // "Class.field" being planned, for error messages
}

impl<'g> Builder<'g> {
    pub(crate) fn new(graph: &'g TypeGraph, options: ConverterOptions) -> Self {
        Self { graph, options, out: Converters::default(), in_progress: HashSet::new(), context: String::new() }
    }

    pub(crate) fn rule(&mut self, id: TypeId) -> Result<Rule, ConfigError> {
        let graph = self.graph;
        dispatch(graph, id, self)
    }

    pub(crate) fn into_converters(self) -> Converters {
        self.out
    }
}

impl<'g> TypeVisitor<'g> for Builder<'g> {
    type Output = Result<Rule, ConfigError>;

    fn any(&mut self) -> Self::Output {
        Ok(Rule::Copy { primitive: Primitive::Any })
    }

    fn null(&mut self) -> Self::Output {
        Ok(Rule::Copy { primitive: Primitive::Null })
    }

    fn bool(&mut self) -> Self::Output {
        Ok(Rule::Copy { primitive: Primitive::Bool })
    }

    fn integer(&mut self) -> Self::Output {
        Ok(Rule::Copy { primitive: Primitive::Integer })
    }

    fn double(&mut self) -> Self::Output {
        Ok(Rule::Copy { primitive: Primitive::Double })
    }

    fn string(&mut self) -> Self::Output {
        Ok(Rule::Copy { primitive: Primitive::String })
    }

    fn transformed_string(&mut self, kind: &'g StringKind) -> Self::Output {
        Ok(Rule::Transformed { kind: TransformKind::try_from(kind)? })
    }

    fn array(&mut self, items: TypeId) -> Self::Output {
        Ok(Rule::Array { items: Box::new(self.rule(items)?) })
    }

    fn map(&mut self, values: TypeId) -> Self::Output {
        Ok(Rule::Map { values: Box::new(self.rule(values)?) })
    }

    fn class(&mut self, id: TypeId, class: &'g ClassType) -> Self::Output {
        if self.out.classes.contains_key(&id) || !self.in_progress.insert(id) {
            return Ok(Rule::Class { id });
        }
        let outer = std::mem::take(&mut self.context);
        let mut fields = Vec::with_capacity(class.fields.len());
        for (key, field) in &class.fields {
            self.context = format!("{}.{}", class.name, key);
            fields.push(FieldConverter { key: key.clone(), optional: field.optional, rule: self.rule(field.ty)? });
        }
        self.context = outer;
        self.in_progress.remove(&id);
        tracing::trace!(class = %class.name, fields = fields.len(), "planned class converter");
        self.out.classes.insert(id, ClassConverter { id, name: class.name.clone(), fields });
        Ok(Rule::Class { id })
    }

    fn enumeration(&mut self, id: TypeId, enum_type: &'g EnumType) -> Self::Output {
        self.out.enums.entry(id).or_insert_with(|| EnumConverter {
            id,
            name: enum_type.name.clone(),
            cases: enum_type.cases.clone(),
        });
        Ok(Rule::Enum { id })
    }

    fn union(&mut self, id: TypeId, union: &'g UnionType) -> Self::Output {
        match union_shape(self.graph, union) {
            UnionShape::NullOnly => Ok(Rule::Copy { primitive: Primitive::Null }),
            UnionShape::Single(member) => self.rule(member),
            UnionShape::Nullable(member) => Ok(Rule::Nullable { inner: Box::new(self.rule(member)?) }),
            UnionShape::Multi { .. } if self.options.unions == UnionRouting::Reject => {
                Err(ConfigError::UnionInStructuralConverter { union: id, context: self.context.clone() })
            }
            UnionShape::Multi { .. } => {
                if !self.out.unions.contains_key(&id) && self.in_progress.insert(id) {
                    let codec = UnionCodec::build(self, id, union)?;
                    self.in_progress.remove(&id);
                    self.out.unions.insert(id, codec);
                }
                Ok(Rule::Union { id })
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CYCLES
// ————————————————————————————————————————————————————————————————————————————

/// Reject class cycles in which every edge is a required, non-nullable, direct
/// class reference. No finite value satisfies such a cycle. Arrays, maps,
/// optional fields and nullable or multi-member unions all break a cycle.
pub fn check_cycles(graph: &TypeGraph, entries: &[TypeId]) -> Result<(), ConfigError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Active,
        Done,
    }

    fn hard_target(graph: &TypeGraph, ty: TypeId) -> Option<TypeId> {
        match graph.get(ty) {
            Ty::Class(_) => Some(ty),
            Ty::Union(union) => match union_shape(graph, union) {
                UnionShape::Single(member) => hard_target(graph, member),
                _ => None,
            },
            _ => None,
        }
    }

    fn visit(
        graph: &TypeGraph,
        id: TypeId,
        marks: &mut HashMap<TypeId, Mark>,
        stack: &mut Vec<TypeId>,
    ) -> Result<(), ConfigError> {
        match marks.get(&id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Active) => {
                let start = stack.iter().position(|s| *s == id).unwrap_or(0);
                let mut path: Vec<String> = stack[start..].iter().map(|s| graph.describe(*s)).collect();
                path.push(graph.describe(id));
                return Err(ConfigError::UnbreakableCycle { path });
            }
            None => {}
        }
        marks.insert(id, Mark::Active);
        stack.push(id);
        if let Some(class) = graph.class(id) {
            for field in class.fields.values().filter(|f| !f.optional) {
                if let Some(next) = hard_target(graph, field.ty) {
                    visit(graph, next, marks, stack)?;
                }
            }
        }
        stack.pop();
        marks.insert(id, Mark::Done);
        Ok(())
    }

    let mut marks = HashMap::new();
    let mut stack = Vec::new();
    // every class, not only the entries: a soft edge can lead into a hard cycle
    for id in entries.iter().copied().chain(graph.classes().map(|(id, _)| id)) {
        visit(graph, id, &mut marks, &mut stack)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Field, TypeGraphBuilder};

    #[test]
    fn class_reached_twice_is_planned_once() {
        let mut b = TypeGraphBuilder::new();
        let s = b.string();
        let address = b.class("Address", [("city", Field::required(s))]);
        let many = b.array(address);
        let maybe = b.nullable(address);
        let person = b.class("Person", [
            ("home", Field::required(address)),
            ("others", Field::required(many)),
            ("work", Field::required(maybe)),
        ]);
        let graph = b.build().unwrap();

        let converters = build_hydrate_dehydrate(&graph, &[person]).unwrap();
        assert_eq!(converters.classes.keys().copied().collect::<Vec<_>>(), vec![address, person]);
        let fields = &converters.classes[&person].fields;
        assert_eq!(fields[1].rule, Rule::Array { items: Box::new(Rule::Class { id: address }) });
        assert_eq!(fields[2].rule, Rule::Nullable { inner: Box::new(Rule::Class { id: address }) });
    }

    #[test]
    fn structurally_equal_classes_stay_distinct() {
        let mut b = TypeGraphBuilder::new();
        let s = b.string();
        let a = b.class("A", [("x", Field::required(s))]);
        let c = b.class("A", [("x", Field::required(s))]);
        let root = b.class("Root", [("a", Field::required(a)), ("c", Field::required(c))]);
        let graph = b.build().unwrap();
        let converters = build_hydrate_dehydrate(&graph, &[root]).unwrap();
        assert_eq!(converters.classes.len(), 3);
    }

    #[test]
    fn recursion_through_an_array_is_fine() {
        let mut b = TypeGraphBuilder::new();
        let node = b.declare_class("Node");
        let kids = b.array(node);
        b.define_class(node, [("children", Field::required(kids))]).unwrap();
        let graph = b.build().unwrap();
        let converters = build_hydrate_dehydrate(&graph, &[node]).unwrap();
        assert_eq!(converters.classes.len(), 1);
    }

    #[test]
    fn required_self_reference_is_rejected() {
        let mut b = TypeGraphBuilder::new();
        let a = b.declare_class("A");
        let bb = b.declare_class("B");
        b.define_class(a, [("b", Field::required(bb))]).unwrap();
        b.define_class(bb, [("a", Field::required(a))]).unwrap();
        let graph = b.build().unwrap();
        let err = build_hydrate_dehydrate(&graph, &[a]).unwrap_err();
        assert_eq!(err, ConfigError::UnbreakableCycle { path: vec!["A".into(), "B".into(), "A".into()] });
    }

    #[test]
    fn optional_field_breaks_a_cycle() {
        let mut b = TypeGraphBuilder::new();
        let a = b.declare_class("A");
        b.define_class(a, [("next", Field::optional(a))]).unwrap();
        let graph = b.build().unwrap();
        assert!(build_hydrate_dehydrate(&graph, &[a]).is_ok());
    }

    #[test]
    fn rejecting_profile_fails_on_true_union() {
        let mut b = TypeGraphBuilder::new();
        let s = b.string();
        let i = b.integer();
        let either = b.union([s, i]);
        let root = b.class("Root", [("v", Field::required(either))]);
        let graph = b.build().unwrap();
        let err = build_with(&graph, &[root], ConverterOptions { unions: UnionRouting::Reject }).unwrap_err();
        assert_eq!(err, ConfigError::UnionInStructuralConverter { union: either, context: "Root.v".into() });
        assert!(build_hydrate_dehydrate(&graph, &[root]).unwrap().unions.contains_key(&either));
    }

    #[test]
    fn unknown_string_kind_fails_generation() {
        let mut b = TypeGraphBuilder::new();
        let ip = b.transformed(StringKind::from_name("ipv6"));
        let root = b.class("Root", [("addr", Field::required(ip))]);
        let graph = b.build().unwrap();
        assert_eq!(
            build_hydrate_dehydrate(&graph, &[root]).unwrap_err(),
            ConfigError::UnsupportedStringKind("ipv6".into())
        );
    }
}
