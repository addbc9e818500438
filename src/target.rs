//! Target profiles: what differs between the modeled backends.

use clap::ValueEnum;

use crate::convert::{ConverterOptions, UnionRouting};
use crate::naming::NamingPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Target {
    #[default]
    Rust,
    #[value(name = "typescript", alias = "ts")]
    TypeScript,
}

impl Target {
    pub fn name(self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::TypeScript => "typescript",
        }
    }

    pub fn policy(self) -> NamingPolicy {
        match self {
            Self::Rust => NamingPolicy::rust(),
            Self::TypeScript => NamingPolicy::typescript(),
        }
    }

    /// TypeScript output has no codec for multi-member unions.
    pub fn converter_options(self) -> ConverterOptions {
        let unions = match self {
            Self::Rust => UnionRouting::Codec,
            Self::TypeScript => UnionRouting::Reject,
        };
        ConverterOptions { unions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::build_with;
    use crate::error::ConfigError;
    use crate::ir::{Field, TypeGraphBuilder};
    use crate::naming::resolve_names;

    #[test]
    fn profiles_style_the_same_graph_differently() {
        let mut b = TypeGraphBuilder::new();
        let s = b.string();
        let user = b.class("user_account", [("first_name", Field::required(s))]);
        let graph = b.build().unwrap();

        let rust = resolve_names(&graph, &Target::Rust.policy()).unwrap();
        assert_eq!(rust.classes[&user].name, "UserAccount");
        assert_eq!(rust.property(user, "first_name").unwrap().name, "first_name");

        let ts = resolve_names(&graph, &Target::TypeScript.policy()).unwrap();
        assert_eq!(ts.classes[&user].name, "UserAccount");
        assert_eq!(ts.property(user, "first_name").unwrap().name, "firstName");
    }

    #[test]
    fn typescript_rejects_true_unions() {
        let mut b = TypeGraphBuilder::new();
        let s = b.string();
        let i = b.integer();
        let either = b.union([s, i]);
        let root = b.class("Root", [("id", Field::required(either))]);
        let graph = b.build().unwrap();

        assert!(build_with(&graph, &[root], Target::Rust.converter_options()).is_ok());
        let err = build_with(&graph, &[root], Target::TypeScript.converter_options()).unwrap_err();
        assert!(matches!(err, ConfigError::UnionInStructuralConverter { .. }));
    }
}
