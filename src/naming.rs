//! Name registry and resolution.
//!
//! Names live in scopes. A scope's forbidden words and already-assigned names
//! apply to it and to every scope nested inside it. A name is either *primary*
//! (display text from the graph) or *derived* (text computed from another name's
//! resolved text). Resolution walks names in topological order, ties broken by
//! registration order, so the result depends only on what was registered and in
//! which order, never on hashing.
pub mod assign;
pub mod policy;

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::ops::Index;

use serde::Serialize;

use crate::error::ConfigError;

pub use assign::{GraphNames, NameAssignment, PropertyInfo, PropertyNames, assign_names, resolve_names};
pub use policy::{DerivedTemplates, NamingPolicy, Styler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NameId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

/// Which styling function a name goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NameStyle {
    Type,
    Property,
    EnumCase,
    Function,
}

pub type Derivation = Box<dyn Fn(&str) -> String>;

enum NameSource {
    Primary(String),
    Derived { base: NameId, derive: Derivation },
}

impl fmt::Debug for NameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary(text) => f.debug_tuple("Primary").field(text).finish(),
            Self::Derived { base, .. } => f.debug_struct("Derived").field("base", base).finish_non_exhaustive(),
        }
    }
}

#[derive(Debug)]
struct NameEntry {
    scope: ScopeId,
    style: NameStyle,
    source: NameSource,
}

#[derive(Debug)]
struct Scope {
    label: String,
    parent: Option<ScopeId>,
    forbidden: BTreeSet<String>,
}

#[derive(Debug)]
pub struct NameRegistry {
    scopes: Vec<Scope>,
    names: Vec<NameEntry>,
}

impl Default for NameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NameRegistry {
    /// A registry holding only the global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope { label: "global".into(), parent: None, forbidden: BTreeSet::new() }],
            names: Vec::new(),
        }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn add_scope<S: Into<String>>(
        &mut self,
        parent: ScopeId,
        label: impl Into<String>,
        forbidden: impl IntoIterator<Item = S>,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            label: label.into(),
            parent: Some(parent),
            forbidden: forbidden.into_iter().map(Into::into).collect(),
        });
        id
    }

    pub fn forbid<S: Into<String>>(&mut self, scope: ScopeId, words: impl IntoIterator<Item = S>) {
        self.scopes[scope.0 as usize].forbidden.extend(words.into_iter().map(Into::into));
    }

    pub fn register_primary(&mut self, scope: ScopeId, style: NameStyle, display: impl Into<String>) -> NameId {
        self.push(NameEntry { scope, style, source: NameSource::Primary(display.into()) })
    }

    /// A name in the same scope as `base`, computed from its resolved text.
    pub fn register_derived(
        &mut self,
        base: NameId,
        style: NameStyle,
        derive: impl Fn(&str) -> String + 'static,
    ) -> NameId {
        let scope = self.names[base.0 as usize].scope;
        self.register_derived_in(scope, base, style, derive)
    }

    pub fn register_derived_in(
        &mut self,
        scope: ScopeId,
        base: NameId,
        style: NameStyle,
        derive: impl Fn(&str) -> String + 'static,
    ) -> NameId {
        self.push(NameEntry {
            scope,
            style,
            source: NameSource::Derived { base, derive: Box::new(derive) },
        })
    }

    fn push(&mut self, entry: NameEntry) -> NameId {
        let id = NameId(self.names.len() as u32);
        self.names.push(entry);
        id
    }

    fn chain(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), |s| self.scopes[s.0 as usize].parent)
    }

    /// Bases before derivatives; among ready names, lowest registration index first.
    fn resolution_order(&self) -> Vec<NameId> {
        let mut dependents: Vec<Vec<NameId>> = vec![Vec::new(); self.names.len()];
        let mut ready = BTreeSet::new();
        for (index, entry) in self.names.iter().enumerate() {
            let id = NameId(index as u32);
            match &entry.source {
                NameSource::Primary(_) => {
                    ready.insert(id);
                }
                NameSource::Derived { base, .. } => dependents[base.0 as usize].push(id),
            }
        }

        let mut order = Vec::with_capacity(self.names.len());
        while let Some(next) = ready.pop_first() {
            order.push(next);
            ready.extend(dependents[next.0 as usize].iter().copied());
        }
        order
    }

    /// Assigns every name its final text.
    ///
    /// A candidate is checked against names already taken in its own scope and the
    /// scopes enclosing it. Names assigned later in an enclosing scope do not check
    /// nested scopes, so a property may share its text with a global name.
    pub fn resolve(&self, policy: &NamingPolicy) -> Result<ResolvedNames, ConfigError> {
        let mut resolved: Vec<Option<String>> = vec![None; self.names.len()];
        let mut taken: Vec<HashSet<String>> = vec![HashSet::new(); self.scopes.len()];

        for id in self.resolution_order() {
            let entry = &self.names[id.0 as usize];
            let display_text = match &entry.source {
                NameSource::Primary(text) => text.clone(),
                NameSource::Derived { base, derive } => {
                    // resolution order guarantees the base is already assigned
                    let base_text = resolved[base.0 as usize].as_deref().unwrap_or_default();
                    derive(base_text)
                }
            };

            let forbidden: BTreeSet<String> = self
                .chain(entry.scope)
                .flat_map(|s| self.scopes[s.0 as usize].forbidden.iter().cloned())
                .collect();
            let candidate = policy.style(entry.style, &display_text, &forbidden);

            let is_free = |text: &str| {
                !forbidden.contains(text) && self.chain(entry.scope).all(|s| !taken[s.0 as usize].contains(text))
            };

            let mut assigned = None;
            for attempt in 0..policy.max_attempts {
                let text = if attempt == 0 { candidate.clone() } else { (policy.disambiguate)(&candidate, attempt) };
                if is_free(&text) {
                    assigned = Some(text);
                    break;
                }
            }
            let Some(text) = assigned else {
                return Err(ConfigError::UnresolvableName {
                    candidate,
                    scope: self.scopes[entry.scope.0 as usize].label.clone(),
                    attempts: policy.max_attempts,
                });
            };
            tracing::trace!(name = id.0, source = %display_text, resolved = %text, "assigned name");
            taken[entry.scope.0 as usize].insert(text.clone());
            resolved[id.0 as usize] = Some(text);
        }

        tracing::debug!(names = self.names.len(), scopes = self.scopes.len(), "resolved names");
        Ok(ResolvedNames { names: resolved.into_iter().map(Option::unwrap_or_default).collect() })
    }
}

/// Final identifier text for every registered name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNames {
    names: Vec<String>,
}

impl ResolvedNames {
    pub fn get(&self, id: NameId) -> &str {
        &self.names[id.0 as usize]
    }
}

impl Index<NameId> for ResolvedNames {
    type Output = str;

    fn index(&self, id: NameId) -> &str {
        self.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verbatim() -> NamingPolicy {
        NamingPolicy::verbatim()
    }

    #[test]
    fn collisions_get_suffixes_in_registration_order() {
        let mut reg = NameRegistry::new();
        let g = reg.global();
        let a = reg.register_primary(g, NameStyle::Type, "Item");
        let b = reg.register_primary(g, NameStyle::Type, "Item");
        let c = reg.register_primary(g, NameStyle::Type, "Item");
        let names = reg.resolve(&verbatim()).unwrap();
        assert_eq!(&names[a], "Item");
        assert_eq!(&names[b], "Item2");
        assert_eq!(&names[c], "Item3");
    }

    #[test]
    fn derived_names_follow_renamed_base() {
        let mut reg = NameRegistry::new();
        let g = reg.global();
        reg.forbid(g, ["name"]);
        let class = reg.add_scope(g, "Person", Vec::<String>::new());
        let prop = reg.register_primary(class, NameStyle::Property, "name");
        let getter = reg.register_derived(prop, NameStyle::Property, |s| format!("get_{s}"));
        let names = reg.resolve(&verbatim()).unwrap();
        assert_eq!(&names[prop], "name2");
        assert_eq!(&names[getter], "get_name2");
    }

    #[test]
    fn derived_registered_before_competing_primary_wins_the_text() {
        let mut reg = NameRegistry::new();
        let g = reg.global();
        let base = reg.register_primary(g, NameStyle::Property, "x");
        let derived = reg.register_derived(base, NameStyle::Property, |s| format!("get_{s}"));
        let literal = reg.register_primary(g, NameStyle::Property, "get_x");
        let names = reg.resolve(&verbatim()).unwrap();
        assert_eq!(&names[derived], "get_x");
        assert_eq!(&names[literal], "get_x2");
    }

    #[test]
    fn sibling_scopes_do_not_collide_but_nested_ones_do() {
        let mut reg = NameRegistry::new();
        let g = reg.global();
        let top = reg.register_primary(g, NameStyle::Type, "value");
        let s1 = reg.add_scope(g, "A", Vec::<String>::new());
        let s2 = reg.add_scope(g, "B", Vec::<String>::new());
        let a = reg.register_primary(s1, NameStyle::Property, "id");
        let b = reg.register_primary(s2, NameStyle::Property, "id");
        let shadow = reg.register_primary(s1, NameStyle::Property, "value");
        let names = reg.resolve(&verbatim()).unwrap();
        assert_eq!(&names[top], "value");
        assert_eq!(&names[a], "id");
        assert_eq!(&names[b], "id");
        assert_eq!(&names[shadow], "value2");
    }

    #[test]
    fn enclosing_names_assigned_later_do_not_see_nested_scopes() {
        let mut reg = NameRegistry::new();
        let g = reg.global();
        let class = reg.add_scope(g, "A", Vec::<String>::new());
        let prop = reg.register_primary(class, NameStyle::Property, "b_to_json");
        let func = reg.register_primary(g, NameStyle::Function, "b_to_json");
        let names = reg.resolve(&verbatim()).unwrap();
        assert_eq!(&names[prop], "b_to_json");
        assert_eq!(&names[func], "b_to_json");
    }

    #[test]
    fn bounded_attempts_fail_fatally() {
        let mut reg = NameRegistry::new();
        let g = reg.global();
        reg.forbid(g, ["a", "a2", "a3"]);
        reg.register_primary(g, NameStyle::Type, "a");
        let policy = NamingPolicy { max_attempts: 3, ..verbatim() };
        let err = reg.resolve(&policy).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnresolvableName { candidate: "a".into(), scope: "global".into(), attempts: 3 }
        );
    }
}
