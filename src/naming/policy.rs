use std::collections::BTreeSet;

use heck::{ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};

use super::NameStyle;

/// `(display text, forbidden words) -> legal candidate`.
pub type Styler = fn(&str, &BTreeSet<String>) -> String;

#[derive(Debug, Clone)]
pub struct NamingPolicy {
    pub type_names: Styler,
    pub property_names: Styler,
    pub enum_cases: Styler,
    pub functions: Styler,
    /// Produces the `attempt`-th alternative (`attempt >= 1`) for a taken candidate.
    pub disambiguate: fn(&str, usize) -> String,
    pub max_attempts: usize,
    /// Forbidden everywhere.
    pub reserved: Vec<String>,
    /// Forbidden in every class-property scope.
    pub property_reserved: Vec<String>,
    pub templates: DerivedTemplates,
}

/// Display text of derived names, computed from the resolved base name. The
/// result still goes through the styler of the derived name.
#[derive(Debug, Clone, Copy)]
pub struct DerivedTemplates {
    pub getter: fn(&str) -> String,
    pub setter: fn(&str) -> String,
    pub hydrator: fn(&str) -> String,
    pub dehydrator: fn(&str) -> String,
    pub class_hydrate: fn(&str) -> String,
    pub class_dehydrate: fn(&str) -> String,
}

impl Default for DerivedTemplates {
    fn default() -> Self {
        Self {
            getter: |p| format!("get_{p}"),
            setter: |p| format!("set_{p}"),
            hydrator: |p| format!("hydrate_{p}"),
            dehydrator: |p| format!("dehydrate_{p}"),
            class_hydrate: |t| format!("{t}_to_json"),
            class_dehydrate: |t| format!("{t}_from_json"),
        }
    }
}

pub const DEFAULT_MAX_ATTEMPTS: usize = 1000;

impl NamingPolicy {
    pub fn style(&self, style: NameStyle, display: &str, forbidden: &BTreeSet<String>) -> String {
        let styler = match style {
            NameStyle::Type => self.type_names,
            NameStyle::Property => self.property_names,
            NameStyle::EnumCase => self.enum_cases,
            NameStyle::Function => self.functions,
        };
        styler(display, forbidden)
    }

    /// No styling at all; only collision handling.
    pub fn verbatim() -> Self {
        fn same(display: &str, _: &BTreeSet<String>) -> String {
            display.to_string()
        }
        Self {
            type_names: same,
            property_names: same,
            enum_cases: same,
            functions: same,
            disambiguate: numeric_suffix,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            reserved: Vec::new(),
            property_reserved: Vec::new(),
            templates: DerivedTemplates::default(),
        }
    }

    pub fn rust() -> Self {
        fn types(display: &str, forbidden: &BTreeSet<String>) -> String {
            escape_keyword(legalize(display.to_upper_camel_case(), "T"), forbidden)
        }
        fn snake(display: &str, forbidden: &BTreeSet<String>) -> String {
            escape_keyword(legalize(display.to_snake_case(), "_"), forbidden)
        }
        Self {
            type_names: types,
            property_names: snake,
            enum_cases: types,
            functions: snake,
            disambiguate: numeric_suffix,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            reserved: words(RUST_RESERVED),
            property_reserved: Vec::new(),
            templates: DerivedTemplates::default(),
        }
    }

    pub fn typescript() -> Self {
        fn types(display: &str, forbidden: &BTreeSet<String>) -> String {
            escape_keyword(legalize(display.to_upper_camel_case(), "T"), forbidden)
        }
        fn camel(display: &str, forbidden: &BTreeSet<String>) -> String {
            escape_keyword(legalize(display.to_lower_camel_case(), "_"), forbidden)
        }
        Self {
            type_names: types,
            property_names: camel,
            enum_cases: types,
            functions: camel,
            disambiguate: numeric_suffix,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            reserved: words(TYPESCRIPT_RESERVED),
            property_reserved: words(&["constructor", "prototype", "toJSON"]),
            templates: DerivedTemplates::default(),
        }
    }
}

fn numeric_suffix(candidate: &str, attempt: usize) -> String {
    format!("{candidate}{}", attempt + 1)
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

/// Keep identifier characters only; never start with a digit or end up empty.
fn legalize(styled: String, digit_prefix: &str) -> String {
    let cleaned: String = styled.chars().filter(|c| c.is_alphanumeric() || *c == '_').collect();
    match cleaned.chars().next() {
        None => format!("{digit_prefix}empty"),
        Some(c) if c.is_ascii_digit() => format!("{digit_prefix}{cleaned}"),
        Some(_) => cleaned,
    }
}

fn escape_keyword(candidate: String, forbidden: &BTreeSet<String>) -> String {
    if forbidden.contains(&candidate) { format!("{candidate}_") } else { candidate }
}

const RUST_RESERVED: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub",
    "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe",
    "use", "where", "while", "abstract", "become", "box", "do", "final", "macro", "override", "priv",
    "typeof", "unsized", "virtual", "yield", "try", "Option", "Some", "None", "Result", "Ok", "Err",
    "String", "Vec", "Box", "HashMap",
];

const TYPESCRIPT_RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "enum", "export", "extends", "false", "finally", "for", "function", "if", "import", "in",
    "instanceof", "new", "null", "return", "super", "switch", "this", "throw", "true", "try",
    "typeof", "var", "void", "while", "with", "as", "implements", "interface", "let", "package",
    "private", "protected", "public", "static", "yield", "any", "boolean", "number", "string",
    "symbol", "type", "from", "of", "Object", "Array", "Date", "JSON", "Map",
];
