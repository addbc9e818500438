//! Code-generation core for JSON bridging: a finished type graph in, resolved
//! identifiers and hydrate/dehydrate converters out.
pub mod cli;
pub mod convert;
pub mod dispatch;
pub mod emit;
pub mod error;
pub mod graph_doc;
pub mod ir;
pub mod jq_exec;
pub mod naming;
pub mod path_de;
pub mod target;
pub mod union_codec;
pub mod value;

pub use convert::{Converters, build_hydrate_dehydrate};
pub use error::{ConfigError, DataError};
pub use ir::{TypeGraph, TypeGraphBuilder, TypeId};
pub use naming::{NameRegistry, resolve_names};
pub use union_codec::build_union_codec;
