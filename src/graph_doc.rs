//! JSON document format for a finished type graph.
//!
//! ```json
//! {
//!   "top_levels": { "Person": "Person" },
//!   "types": {
//!     "Person": { "kind": "class", "fields": {
//!       "name": { "type": "string" },
//!       "born": { "type": { "transformed": "date" }, "optional": true },
//!       "tags": { "type": { "array": "string" } }
//!     } },
//!     "Color": { "kind": "enum", "cases": ["red", "green"] }
//!   }
//! }
//! ```
//!
//! Document order is declaration order.
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use crate::error::ConfigError;
use crate::ir::{Field, StringKind, TypeGraph, TypeGraphBuilder, TypeId};
use crate::path_de::{PathError, from_slice_with_path, from_str_with_path};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphDocument {
    #[serde(default)]
    pub top_levels: IndexMap<String, TypeExpr>,
    #[serde(default)]
    pub types: IndexMap<String, NamedType>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NamedType {
    Class {
        #[serde(default)]
        fields: IndexMap<String, FieldDoc>,
    },
    Enum {
        cases: Vec<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDoc {
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TypeExpr {
    /// A primitive (`any`, `null`, `bool`, `integer`, `double`, `string`) or a named type.
    Name(String),
    Array { array: Box<TypeExpr> },
    Map { map: Box<TypeExpr> },
    Union { union: Vec<TypeExpr> },
    Transformed { transformed: String },
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] PathError),
    #[error("{at}: unknown type `{name}`")]
    UnknownType { name: String, at: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ————————————————————————————————————————————————————————————————————————————
// LOADING
// ————————————————————————————————————————————————————————————————————————————

pub fn load_graph_str(src: &str) -> Result<TypeGraph, DocumentError> {
    let doc: GraphDocument = from_str_with_path(src)?;
    doc.into_graph()
}

pub fn load_graph_file(path: impl AsRef<Path>) -> Result<TypeGraph, DocumentError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| DocumentError::Io { path: path.to_path_buf(), source })?;
    let doc: GraphDocument = from_slice_with_path(&bytes)?;
    tracing::debug!(path = %path.display(), types = doc.types.len(), "loaded graph document");
    doc.into_graph()
}

impl GraphDocument {
    pub fn into_graph(self) -> Result<TypeGraph, DocumentError> {
        let mut b = TypeGraphBuilder::new();

        // every named type gets its id before any expression is lowered
        let mut named = IndexMap::with_capacity(self.types.len());
        for (name, ty) in &self.types {
            let id = match ty {
                NamedType::Class { .. } => b.declare_class(name.as_str()),
                NamedType::Enum { cases } => b.enumeration(name.as_str(), cases.iter().cloned()),
            };
            named.insert(name.clone(), id);
        }

        let mut lower = Lowering { builder: &mut b, named: &named };
        for (name, ty) in &self.types {
            let NamedType::Class { fields } = ty else {
                continue;
            };
            let mut lowered = Vec::with_capacity(fields.len());
            for (key, field) in fields {
                let ty = lower.expr(&field.ty, &format!("types.{name}.fields.{key}"))?;
                lowered.push((key.clone(), Field { ty, optional: field.optional }));
            }
            lower.builder.define_class(named[name], lowered)?;
        }

        let mut top_levels = Vec::with_capacity(self.top_levels.len());
        for (name, expr) in &self.top_levels {
            top_levels.push((name.clone(), lower.expr(expr, &format!("top_levels.{name}"))?));
        }
        for (name, id) in top_levels {
            b.top_level(name, id);
        }
        Ok(b.build()?)
    }
}

struct Lowering<'a> {
    builder: &'a mut TypeGraphBuilder,
    named: &'a IndexMap<String, TypeId>,
}

impl Lowering<'_> {
    fn expr(&mut self, expr: &TypeExpr, at: &str) -> Result<TypeId, DocumentError> {
        let id = match expr {
            TypeExpr::Name(name) => match name.as_str() {
                "any" => self.builder.any(),
                "null" => self.builder.null(),
                "bool" => self.builder.bool(),
                "integer" => self.builder.integer(),
                "double" => self.builder.double(),
                "string" => self.builder.string(),
                other => match self.named.get(other) {
                    Some(id) => *id,
                    None => return Err(DocumentError::UnknownType { name: other.to_string(), at: at.to_string() }),
                },
            },
            TypeExpr::Array { array } => {
                let items = self.expr(array, &format!("{at}[]"))?;
                self.builder.array(items)
            }
            TypeExpr::Map { map } => {
                let values = self.expr(map, &format!("{at}{{}}"))?;
                self.builder.map(values)
            }
            TypeExpr::Union { union } => {
                let mut members = Vec::with_capacity(union.len());
                for (i, member) in union.iter().enumerate() {
                    members.push(self.expr(member, &format!("{at}|{i}"))?);
                }
                self.builder.union(members)
            }
            TypeExpr::Transformed { transformed } => self.builder.transformed(StringKind::from_name(transformed)),
        };
        Ok(id)
    }
}
