//! Emission context.
//!
//! Output is grouped into named units. A unit is opened and closed by
//! [`EmitContext::unit`]; whatever the closure writes is recorded only if it
//! returns `Ok`, so a failed unit leaves nothing behind.
use std::fmt::{self, Write};
use std::io;
use std::path::Path;

use indexmap::IndexMap;

use crate::convert::{Converters, Rule};
use crate::naming::GraphNames;
use crate::union_codec::UnionCodec;

const INDENT: &str = "    ";

#[derive(Debug, Default)]
pub struct EmitContext {
    header: Option<String>,
    units: IndexMap<String, String>,
}

/// The unit currently being written.
#[derive(Debug, Default)]
pub struct Unit {
    buf: String,
    depth: usize,
    at_line_start: bool,
}

impl EmitContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_header(&mut self, header: impl Into<String>) -> &mut Self {
        self.header = Some(header.into());
        self
    }

    pub fn unit<E>(
        &mut self,
        name: impl Into<String>,
        write: impl FnOnce(&mut Unit) -> Result<(), E>,
    ) -> Result<(), E> {
        let name = name.into();
        let mut unit = Unit { at_line_start: true, ..Unit::default() };
        write(&mut unit)?;
        tracing::trace!(unit = %name, bytes = unit.buf.len(), "closed emission unit");
        self.units.insert(name, unit.buf);
        Ok(())
    }

    pub fn units(&self) -> impl Iterator<Item = (&str, &str)> {
        self.units.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.units.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// All units in the order they were first opened, separated by blank lines.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(header) = &self.header {
            for line in header.lines() {
                out.push_str("// ");
                out.push_str(line);
                out.push('\n');
            }
            out.push('\n');
        }
        for (i, text) in self.units.values().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(text);
        }
        out
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render())
    }
}

impl Unit {
    /// Runs `write` one level deeper.
    pub fn indented<R>(&mut self, write: impl FnOnce(&mut Unit) -> R) -> R {
        self.depth += 1;
        let out = write(self);
        self.depth -= 1;
        out
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }
}

impl Write for Unit {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for piece in s.split_inclusive('\n') {
            if self.at_line_start && piece != "\n" {
                for _ in 0..self.depth {
                    self.buf.push_str(INDENT);
                }
            }
            self.buf.push_str(piece);
            self.at_line_start = piece.ends_with('\n');
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// OUTLINE
// ————————————————————————————————————————————————————————————————————————————

/// One unit per enum, class and union codec: declared identifiers and the
/// conversion rule of every field.
pub fn render_outline(names: &GraphNames, converters: &Converters) -> Result<EmitContext, fmt::Error> {
    let mut cx = EmitContext::new();

    for (id, converter) in &converters.enums {
        let name = names.type_name(*id).unwrap_or(converter.name.as_str());
        cx.unit(format!("enum {name}"), |u| -> fmt::Result {
            writeln!(u, "enum {name} ({id})")?;
            u.indented(|u| -> fmt::Result {
                for tag in &converter.cases {
                    let case = names.enums.get(id).and_then(|e| e.cases.get(tag)).unwrap_or(tag);
                    writeln!(u, "{case} = {tag:?}")?;
                }
                Ok(())
            })
        })?;
    }

    for (id, converter) in &converters.classes {
        let Some(idents) = names.classes.get(id) else {
            continue;
        };
        cx.unit(format!("class {}", idents.name), |u| -> fmt::Result {
            writeln!(u, "class {} ({id})", idents.name)?;
            u.indented(|u| -> fmt::Result {
                writeln!(u, "hydrate: {}", idents.hydrate)?;
                writeln!(u, "dehydrate: {}", idents.dehydrate)?;
                for field in &converter.fields {
                    let Some(prop) = idents.properties.get(&field.key) else {
                        continue;
                    };
                    let presence = if field.optional { "optional" } else { "required" };
                    writeln!(u, "{} <- {:?}: {} ({presence})", prop.name, field.key, rule_text(&field.rule, names))?;
                    u.indented(|u| {
                        writeln!(u, "{} / {}", prop.getter, prop.setter)?;
                        writeln!(u, "{} / {}", prop.hydrator, prop.dehydrator)
                    })?;
                }
                Ok(())
            })
        })?;
    }

    for (id, codec) in &converters.unions {
        cx.unit(format!("union {id}"), |u| {
            writeln!(u, "union {id}")?;
            u.indented(|u| write_codec(u, codec, names))
        })?;
    }

    Ok(cx)
}

fn write_codec(u: &mut Unit, codec: &UnionCodec, names: &GraphNames) -> fmt::Result {
    let slot = |u: &mut Unit, label: &str, rule: Option<String>| match rule {
        Some(text) => writeln!(u, "{label}: {text}"),
        None => Ok(()),
    };
    slot(u, "bool", codec.boolean.then(|| "bool".to_string()))?;
    slot(u, "integer", codec.integer.then(|| "integer".to_string()))?;
    slot(u, "double", codec.double.then(|| "double".to_string()))?;
    slot(u, "string", codec.string.as_ref().map(|r| rule_text(r, names)))?;
    slot(u, "array", codec.array.as_ref().map(|r| format!("[{}]", rule_text(r, names))))?;
    slot(u, "class", codec.class.map(|id| type_text(id, names)))?;
    slot(u, "map", codec.map.as_ref().map(|r| format!("{{{}}}", rule_text(r, names))))?;
    slot(u, "enum", codec.enumeration.map(|id| type_text(id, names)))?;
    if codec.nullable {
        writeln!(u, "null")?;
    }
    Ok(())
}

fn type_text(id: crate::ir::TypeId, names: &GraphNames) -> String {
    names.type_name(id).map(str::to_string).unwrap_or_else(|| id.to_string())
}

pub fn rule_text(rule: &Rule, names: &GraphNames) -> String {
    match rule {
        Rule::Copy { .. } | Rule::Transformed { .. } => rule.describe(),
        Rule::Enum { id } | Rule::Class { id } => type_text(*id, names),
        Rule::Array { items } => format!("[{}]", rule_text(items, names)),
        Rule::Map { values } => format!("{{{}}}", rule_text(values, names)),
        Rule::Nullable { inner } => format!("{}?", rule_text(inner, names)),
        Rule::Union { id } => format!("union {id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::build_hydrate_dehydrate;
    use crate::ir::{Field, TypeGraphBuilder};
    use crate::naming::{NamingPolicy, resolve_names};

    #[test]
    fn failed_unit_is_not_recorded() {
        let mut cx = EmitContext::new();
        cx.unit("a", |u| writeln!(u, "kept")).unwrap();
        let failed: Result<(), &str> = cx.unit("b", |u| {
            let _ = writeln!(u, "partial");
            Err("boom")
        });
        assert_eq!(failed, Err("boom"));
        assert_eq!(cx.len(), 1);
        assert!(cx.get("b").is_none());
    }

    #[test]
    fn nested_writes_are_indented() {
        let mut cx = EmitContext::new();
        cx.unit("x", |u| {
            writeln!(u, "outer")?;
            u.indented(|u| writeln!(u, "inner\n\nsecond"))
        })
        .unwrap();
        assert_eq!(cx.get("x"), Some("outer\n    inner\n\n    second\n"));
    }

    #[test]
    fn written_file_matches_render() {
        let mut cx = EmitContext::new();
        cx.set_header("plan");
        cx.unit("a", |u| writeln!(u, "one")).unwrap();
        let path = std::env::temp_dir().join(format!("json-bridge-emit-{}", std::process::id())).join("plan.txt");
        cx.write_to_file(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), cx.render());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn outline_lists_identifiers_and_rules() {
        let mut b = TypeGraphBuilder::new();
        let s = b.string();
        let tags = b.array(s);
        let maybe = b.nullable(s);
        let person = b.class("person", [("tags", Field::required(tags)), ("nick", Field::optional(maybe))]);
        let graph = b.build().unwrap();
        let names = resolve_names(&graph, &NamingPolicy::rust()).unwrap();
        let converters = build_hydrate_dehydrate(&graph, &[person]).unwrap();

        let outline = render_outline(&names, &converters).unwrap();
        let text = outline.get("class Person").unwrap();
        assert!(text.starts_with("class Person (#"));
        assert!(text.contains("    hydrate: person_to_json\n"));
        assert!(text.contains("    tags <- \"tags\": [string] (required)\n"));
        assert!(text.contains("    nick <- \"nick\": string? (optional)\n"));
        assert!(text.contains("        get_nick / set_nick\n"));
    }
}
