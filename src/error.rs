//! Error classes.
//!
//! `ConfigError` is raised while generating and is never retried. `DataError` is
//! what converters report about a particular input value.

use thiserror::Error;

use crate::dispatch::TypeKind;
use crate::ir::TypeId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unsupported transformed string kind `{0}`")]
    UnsupportedStringKind(String),
    #[error("union {union} in `{context}` has several non-null members; the structural converter does not handle it")]
    UnionInStructuralConverter { union: TypeId, context: String },
    #[error("union member of kind {0} cannot be decoded by the union codec")]
    UnsupportedUnionMember(TypeKind),
    #[error("no unique name for `{candidate}` in scope `{scope}` after {attempts} attempts")]
    UnresolvableName { candidate: String, scope: String, attempts: usize },
    #[error("class cycle without an optional or nullable break: {}", path.join(" -> "))]
    UnbreakableCycle { path: Vec<String> },
    #[error("union contains two members of kind {0}")]
    DuplicateUnionKind(TypeKind),
    #[error("union contains a nested union")]
    NestedUnion,
    #[error("union has no members")]
    EmptyUnion,
    #[error("type reference {0} is not part of the graph")]
    DanglingType(TypeId),
    #[error("{0} is not a class")]
    NotAClass(TypeId),
    #[error("{0} is not a union of several non-null members")]
    NotATrueUnion(TypeId),
    #[error("class `{0}` was declared but never defined")]
    UndefinedClass(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("missing required field: {field}")]
    MissingField { class: String, field: String },
    #[error("{path}: expected {expected}, found {found}")]
    TypeMismatch { path: String, expected: String, found: &'static str },
    #[error("{path}: `{tag}` is not a case of enum {enum_name}")]
    UnknownEnumCase { path: String, enum_name: String, tag: String },
    #[error("{path}: {value} is out of range for {expected}")]
    OutOfRange { path: String, expected: &'static str, value: String },
    #[error("{path}: union does not contain {kind}")]
    UnionMismatch { path: String, kind: &'static str },
    #[error("{path}: union must not be null")]
    NullUnion { path: String },
    #[error("{path}: `{value}` is not a valid {kind}: {reason}")]
    InvalidString { path: String, kind: &'static str, value: String, reason: String },
    #[error("{path}: expected an instance of {expected}, found {found}")]
    WrongClass { path: String, expected: String, found: String },
    #[error("no converter was generated for type {0}")]
    MissingConverter(TypeId),
}

impl DataError {
    pub(crate) fn mismatch(path: &str, expected: impl Into<String>, found: &'static str) -> Self {
        Self::TypeMismatch { path: path.to_string(), expected: expected.into(), found }
    }
}
