//! Name assignment: one walk over the graph that registers every name a backend
//! will emit, followed by resolution.

use indexmap::IndexMap;
use serde::Serialize;

use super::{NameId, NameRegistry, NameStyle, NamingPolicy, ResolvedNames};
use crate::dispatch::accepts_null;
use crate::error::ConfigError;
use crate::ir::{TypeGraph, TypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyNames {
    pub name: NameId,
    pub getter: NameId,
    pub setter: NameId,
    pub hydrator: NameId,
    pub dehydrator: NameId,
}

/// Per-field metadata, created once and shared by every pass that refers to
/// the field by role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    pub key: String,
    pub nullable: bool,
    pub names: PropertyNames,
}

#[derive(Debug, Clone)]
pub struct ClassNames {
    pub name: NameId,
    pub hydrate: NameId,
    pub dehydrate: NameId,
    pub properties: Vec<PropertyInfo>,
}

#[derive(Debug)]
pub struct NameAssignment {
    pub registry: NameRegistry,
    pub classes: IndexMap<TypeId, ClassNames>,
    pub enums: IndexMap<TypeId, (NameId, Vec<(String, NameId)>)>,
}

pub fn assign_names(graph: &TypeGraph, policy: &NamingPolicy) -> NameAssignment {
    let mut registry = NameRegistry::new();
    let global = registry.global();
    registry.forbid(global, policy.reserved.iter().cloned());
    let templates = policy.templates;

    // type names first, in declaration order, so they win over anything derived
    let mut type_names = IndexMap::new();
    for id in graph.ids() {
        let display = match (graph.class(id), graph.enum_type(id)) {
            (Some(class), _) => &class.name,
            (_, Some(enum_type)) => &enum_type.name,
            _ => continue,
        };
        type_names.insert(id, registry.register_primary(global, NameStyle::Type, display.clone()));
    }

    let mut classes = IndexMap::new();
    for (id, class) in graph.classes() {
        let name = type_names[&id];
        let hydrate = registry.register_derived(name, NameStyle::Function, templates.class_hydrate);
        let dehydrate = registry.register_derived(name, NameStyle::Function, templates.class_dehydrate);

        let scope = registry.add_scope(global, class.name.clone(), policy.property_reserved.iter().cloned());
        let properties = class
            .fields
            .iter()
            .map(|(key, field)| {
                let prop = registry.register_primary(scope, NameStyle::Property, key.clone());
                PropertyInfo {
                    key: key.clone(),
                    nullable: field.optional || accepts_null(graph, field.ty),
                    names: PropertyNames {
                        name: prop,
                        getter: registry.register_derived(prop, NameStyle::Function, templates.getter),
                        setter: registry.register_derived(prop, NameStyle::Function, templates.setter),
                        hydrator: registry.register_derived(prop, NameStyle::Function, templates.hydrator),
                        dehydrator: registry.register_derived(prop, NameStyle::Function, templates.dehydrator),
                    },
                }
            })
            .collect();
        classes.insert(id, ClassNames { name, hydrate, dehydrate, properties });
    }

    let mut enums = IndexMap::new();
    for (id, enum_type) in graph.enums() {
        let scope = registry.add_scope(global, enum_type.name.clone(), Vec::<String>::new());
        let cases = enum_type
            .cases
            .iter()
            .map(|case| (case.clone(), registry.register_primary(scope, NameStyle::EnumCase, case.clone())))
            .collect();
        enums.insert(id, (type_names[&id], cases));
    }

    tracing::debug!(names = registry.len(), classes = classes.len(), enums = enums.len(), "registered names");
    NameAssignment { registry, classes, enums }
}

impl NameAssignment {
    pub fn resolve(&self, policy: &NamingPolicy) -> Result<GraphNames, ConfigError> {
        let resolved = self.registry.resolve(policy)?;
        Ok(GraphNames::collect(self, &resolved))
    }
}

/// `resolveNames(graph, policy)`: assign and resolve in one step.
pub fn resolve_names(graph: &TypeGraph, policy: &NamingPolicy) -> Result<GraphNames, ConfigError> {
    assign_names(graph, policy).resolve(policy)
}

// ————————————————————————————————————————————————————————————————————————————
// RESOLVED VIEW
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyIdents {
    pub name: String,
    pub getter: String,
    pub setter: String,
    pub hydrator: String,
    pub dehydrator: String,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassIdents {
    pub name: String,
    pub hydrate: String,
    pub dehydrate: String,
    /// Keyed by the field's JSON key.
    pub properties: IndexMap<String, PropertyIdents>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumIdents {
    pub name: String,
    /// Keyed by the JSON tag.
    pub cases: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNames {
    pub classes: IndexMap<TypeId, ClassIdents>,
    pub enums: IndexMap<TypeId, EnumIdents>,
}

impl GraphNames {
    fn collect(assignment: &NameAssignment, resolved: &ResolvedNames) -> Self {
        let text = |id: NameId| resolved[id].to_string();
        let classes = assignment
            .classes
            .iter()
            .map(|(id, class)| {
                let properties = class
                    .properties
                    .iter()
                    .map(|p| {
                        (p.key.clone(), PropertyIdents {
                            name: text(p.names.name),
                            getter: text(p.names.getter),
                            setter: text(p.names.setter),
                            hydrator: text(p.names.hydrator),
                            dehydrator: text(p.names.dehydrator),
                            nullable: p.nullable,
                        })
                    })
                    .collect();
                (*id, ClassIdents {
                    name: text(class.name),
                    hydrate: text(class.hydrate),
                    dehydrate: text(class.dehydrate),
                    properties,
                })
            })
            .collect();
        let enums = assignment
            .enums
            .iter()
            .map(|(id, (name, cases))| {
                let cases = cases.iter().map(|(tag, case)| (tag.clone(), text(*case))).collect();
                (*id, EnumIdents { name: text(*name), cases })
            })
            .collect();
        Self { classes, enums }
    }

    /// Resolved type name of a class or enum.
    pub fn type_name(&self, id: TypeId) -> Option<&str> {
        self.classes
            .get(&id)
            .map(|c| c.name.as_str())
            .or_else(|| self.enums.get(&id).map(|e| e.name.as_str()))
    }

    pub fn property(&self, class: TypeId, key: &str) -> Option<&PropertyIdents> {
        self.classes.get(&class).and_then(|c| c.properties.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Field, TypeGraphBuilder};

    #[test]
    fn getters_track_renamed_properties() {
        let mut b = TypeGraphBuilder::new();
        let s = b.string();
        let class = b.class("thing", [("type", Field::required(s)), ("get_type_", Field::required(s))]);
        let graph = b.build().unwrap();

        let names = resolve_names(&graph, &NamingPolicy::rust()).unwrap();
        let ty = names.property(class, "type").unwrap();
        assert_eq!(ty.name, "type_");
        assert_eq!(ty.getter, "get_type");
        // snake-casing strips the trailing underscore of the literal field, so it collides
        // with the getter already assigned above
        let literal = names.property(class, "get_type_").unwrap();
        assert_eq!(literal.name, "get_type2");
        assert_eq!(names.type_name(class), Some("Thing"));
        assert_eq!(names.classes[&class].hydrate, "thing_to_json");
    }
}
