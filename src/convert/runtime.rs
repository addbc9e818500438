//! Executing converters.
//!
//! Dehydrate: `serde_json::Value` -> typed value. Hydrate: typed value -> `Value`.
//! Paths in errors are JSON-path-like (`$.address.city`, `$.tags[2]`).

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

use super::{ClassConverter, Converters, EnumConverter, Primitive, Rule};
use crate::error::DataError;
use crate::ir::TypeId;
use crate::union_codec::UnionCodec;
use crate::value::{TypedObject, TypedValue};

pub const ROOT: &str = "$";

pub(crate) fn child(path: &str, key: &str) -> String {
    format!("{path}.{key}")
}

pub(crate) fn item(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Converters {
    pub fn class_converter(&self, id: TypeId) -> Result<&ClassConverter, DataError> {
        self.classes.get(&id).ok_or(DataError::MissingConverter(id))
    }

    pub fn enum_converter(&self, id: TypeId) -> Result<&EnumConverter, DataError> {
        self.enums.get(&id).ok_or(DataError::MissingConverter(id))
    }

    pub fn union_codec(&self, id: TypeId) -> Result<&UnionCodec, DataError> {
        self.unions.get(&id).ok_or(DataError::MissingConverter(id))
    }

    /// Generic value -> instance of `class`.
    pub fn dehydrate(&self, class: TypeId, value: &Value) -> Result<TypedObject, DataError> {
        self.dehydrate_class(class, value, ROOT)
    }

    /// Instance -> generic value, using the converter of the instance's class.
    pub fn hydrate(&self, object: &TypedObject) -> Result<Value, DataError> {
        self.hydrate_class(object.class, object, ROOT)
    }

    fn accepts_null(&self, rule: &Rule) -> bool {
        match rule {
            Rule::Copy { primitive: Primitive::Any | Primitive::Null } | Rule::Nullable { .. } => true,
            Rule::Union { id } => self.unions.get(id).is_some_and(|codec| codec.nullable),
            _ => false,
        }
    }

    pub(crate) fn dehydrate_class(&self, class: TypeId, value: &Value, path: &str) -> Result<TypedObject, DataError> {
        let converter = self.class_converter(class)?;
        let Value::Object(object) = value else {
            return Err(DataError::mismatch(path, format!("object {}", converter.name), json_kind(value)));
        };

        let mut fields = IndexMap::with_capacity(converter.fields.len());
        for field in &converter.fields {
            let field_path = child(path, &field.key);
            let typed = match object.get(&field.key) {
                None if field.optional => None,
                None => {
                    return Err(DataError::MissingField {
                        class: converter.name.clone(),
                        field: field.key.clone(),
                    });
                }
                // null for a nullable wrapper is the absence marker, same as an optional field
                Some(Value::Null) if matches!(field.rule, Rule::Nullable { .. }) => None,
                Some(Value::Null) if field.optional && !self.accepts_null(&field.rule) => None,
                Some(v) => Some(self.dehydrate_rule(&field.rule, v, &field_path)?),
            };
            fields.insert(field.key.clone(), typed);
        }
        Ok(TypedObject { class, fields })
    }

    pub(crate) fn dehydrate_rule(&self, rule: &Rule, value: &Value, path: &str) -> Result<TypedValue, DataError> {
        match rule {
            Rule::Copy { primitive } => copy_in(*primitive, value, path),
            Rule::Transformed { kind } => match value {
                Value::String(text) => Ok(TypedValue::Transformed(kind.parse(text, path)?)),
                other => Err(DataError::mismatch(path, rule.describe(), json_kind(other))),
            },
            Rule::Enum { id } => {
                let converter = self.enum_converter(*id)?;
                match value {
                    Value::String(tag) if converter.cases.contains(tag) => Ok(TypedValue::Enum(tag.clone())),
                    Value::String(tag) => Err(DataError::UnknownEnumCase {
                        path: path.to_string(),
                        enum_name: converter.name.clone(),
                        tag: tag.clone(),
                    }),
                    other => Err(DataError::mismatch(path, format!("{} case", converter.name), json_kind(other))),
                }
            }
            Rule::Class { id } => Ok(TypedValue::Object(self.dehydrate_class(*id, value, path)?)),
            Rule::Array { items } => match value {
                Value::Array(elements) => elements
                    .iter()
                    .enumerate()
                    .map(|(i, el)| self.dehydrate_rule(items, el, &item(path, i)))
                    .collect::<Result<Vec<_>, _>>()
                    .map(TypedValue::Array),
                other => Err(DataError::mismatch(path, "array", json_kind(other))),
            },
            Rule::Map { values } => match value {
                Value::Object(entries) => entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), self.dehydrate_rule(values, v, &child(path, k))?)))
                    .collect::<Result<IndexMap<_, _>, DataError>>()
                    .map(TypedValue::Map),
                other => Err(DataError::mismatch(path, "map", json_kind(other))),
            },
            Rule::Nullable { inner } => match value {
                Value::Null => Ok(TypedValue::Null),
                other => self.dehydrate_rule(inner, other, path),
            },
            Rule::Union { id } => {
                let decoded = self.union_codec(*id)?.decode(self, value, path)?;
                Ok(TypedValue::Union(Box::new(decoded)))
            }
        }
    }

    pub(crate) fn hydrate_class(&self, class: TypeId, object: &TypedObject, path: &str) -> Result<Value, DataError> {
        let converter = self.class_converter(class)?;
        if object.class != class {
            let found = self
                .classes
                .get(&object.class)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| object.class.to_string());
            return Err(DataError::WrongClass { path: path.to_string(), expected: converter.name.clone(), found });
        }

        let mut out = Map::new();
        for field in &converter.fields {
            match object.get(&field.key) {
                Some(typed) => {
                    let value = self.hydrate_rule(&field.rule, typed, &child(path, &field.key))?;
                    out.insert(field.key.clone(), value);
                }
                None if field.optional => {}
                None if self.accepts_null(&field.rule) => {
                    out.insert(field.key.clone(), Value::Null);
                }
                None => {
                    return Err(DataError::MissingField {
                        class: converter.name.clone(),
                        field: field.key.clone(),
                    });
                }
            }
        }
        Ok(Value::Object(out))
    }

    pub(crate) fn hydrate_rule(&self, rule: &Rule, typed: &TypedValue, path: &str) -> Result<Value, DataError> {
        let value = match (rule, typed) {
            (Rule::Copy { primitive: Primitive::Any }, TypedValue::Any(v)) => v.clone(),
            (Rule::Copy { primitive: Primitive::Null }, TypedValue::Null) => Value::Null,
            (Rule::Copy { primitive: Primitive::Bool }, TypedValue::Bool(b)) => Value::Bool(*b),
            (Rule::Copy { primitive: Primitive::Integer }, TypedValue::Integer(i)) => Value::from(*i),
            (Rule::Copy { primitive: Primitive::Double }, TypedValue::Double(n)) => Value::Number(n.clone()),
            (Rule::Copy { primitive: Primitive::String }, TypedValue::String(s)) => Value::String(s.clone()),
            (Rule::Transformed { kind }, TypedValue::Transformed(t)) => match kind.format(t) {
                Some(text) => Value::String(text),
                None => return Err(DataError::mismatch(path, rule.describe(), t.kind_name())),
            },
            (Rule::Enum { id }, TypedValue::Enum(tag)) => {
                let converter = self.enum_converter(*id)?;
                if !converter.cases.contains(tag) {
                    return Err(DataError::UnknownEnumCase {
                        path: path.to_string(),
                        enum_name: converter.name.clone(),
                        tag: tag.clone(),
                    });
                }
                Value::String(tag.clone())
            }
            (Rule::Class { id }, TypedValue::Object(object)) => self.hydrate_class(*id, object, path)?,
            (Rule::Array { items }, TypedValue::Array(elements)) => Value::Array(
                elements
                    .iter()
                    .enumerate()
                    .map(|(i, el)| self.hydrate_rule(items, el, &item(path, i)))
                    .collect::<Result<_, _>>()?,
            ),
            (Rule::Map { values }, TypedValue::Map(entries)) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), self.hydrate_rule(values, v, &child(path, k))?)))
                    .collect::<Result<Map<_, _>, DataError>>()?,
            ),
            (Rule::Nullable { .. }, TypedValue::Null) => Value::Null,
            (Rule::Nullable { inner }, other) => self.hydrate_rule(inner, other, path)?,
            (Rule::Union { id }, TypedValue::Union(union)) => self.union_codec(*id)?.encode(self, union, path)?,
            (rule, other) => return Err(DataError::mismatch(path, rule.describe(), other.kind_name())),
        };
        Ok(value)
    }
}

fn copy_in(primitive: Primitive, value: &Value, path: &str) -> Result<TypedValue, DataError> {
    let typed = match (primitive, value) {
        (Primitive::Any, v) => TypedValue::Any(v.clone()),
        (Primitive::Null, Value::Null) => TypedValue::Null,
        (Primitive::Bool, Value::Bool(b)) => TypedValue::Bool(*b),
        (Primitive::Integer, Value::Number(n)) => TypedValue::Integer(integer_in(n, path)?),
        (Primitive::Double, Value::Number(n)) => TypedValue::Double(n.clone()),
        (Primitive::String, Value::String(s)) => TypedValue::String(s.clone()),
        (primitive, other) => {
            return Err(DataError::mismatch(path, format!("{primitive:?}").to_lowercase(), json_kind(other)));
        }
    };
    Ok(typed)
}

/// An integer token that fits `i64`. Larger integer tokens are out of range, not a
/// type mismatch.
pub(crate) fn integer_in(n: &Number, path: &str) -> Result<i64, DataError> {
    if let Some(i) = n.as_i64() {
        return Ok(i);
    }
    if n.is_u64() {
        return Err(DataError::OutOfRange { path: path.to_string(), expected: "integer", value: n.to_string() });
    }
    Err(DataError::mismatch(path, "integer", "number"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::convert::build_hydrate_dehydrate;
    use crate::ir::{Field, TypeGraphBuilder};

    #[test]
    fn integer_field_rejects_fractional_number() {
        let mut b = TypeGraphBuilder::new();
        let i = b.integer();
        let root = b.class("Root", [("n", Field::required(i))]);
        let graph = b.build().unwrap();
        let converters = build_hydrate_dehydrate(&graph, &[root]).unwrap();

        let err = converters.dehydrate(root, &json!({"n": 1.5})).unwrap_err();
        assert_eq!(err, DataError::mismatch("$.n", "integer", "number"));
        assert!(converters.dehydrate(root, &json!({"n": 7})).is_ok());
    }

    #[test]
    fn integer_beyond_i64_is_out_of_range() {
        let mut b = TypeGraphBuilder::new();
        let i = b.integer();
        let root = b.class("Root", [("n", Field::required(i))]);
        let graph = b.build().unwrap();
        let converters = build_hydrate_dehydrate(&graph, &[root]).unwrap();

        let err = converters.dehydrate(root, &json!({"n": 18446744073709551615u64})).unwrap_err();
        assert_eq!(err.to_string(), "$.n: 18446744073709551615 is out of range for integer");
        assert!(converters.dehydrate(root, &json!({"n": i64::MIN})).is_ok());
    }

    #[test]
    fn double_field_keeps_the_number_token() {
        let mut b = TypeGraphBuilder::new();
        let d = b.double();
        let root = b.class("Root", [("x", Field::required(d))]);
        let graph = b.build().unwrap();
        let converters = build_hydrate_dehydrate(&graph, &[root]).unwrap();

        for value in [json!({"x": 3}), json!({"x": 3.0}), json!({"x": -0.25}), json!({"x": 18446744073709551615u64})] {
            let typed = converters.dehydrate(root, &value).unwrap();
            assert_eq!(converters.hydrate(&typed).unwrap(), value);
        }
    }

    #[test]
    fn errors_carry_nested_paths() {
        let mut b = TypeGraphBuilder::new();
        let s = b.string();
        let tags = b.array(s);
        let root = b.class("Root", [("tags", Field::required(tags))]);
        let graph = b.build().unwrap();
        let converters = build_hydrate_dehydrate(&graph, &[root]).unwrap();

        let err = converters.dehydrate(root, &json!({"tags": ["a", "b", 3]})).unwrap_err();
        assert_eq!(err.to_string(), "$.tags[2]: expected string, found number");
    }

    #[test]
    fn unknown_enum_case_is_a_data_error() {
        let mut b = TypeGraphBuilder::new();
        let color = b.enumeration("Color", ["red", "green"]);
        let root = b.class("Root", [("color", Field::required(color))]);
        let graph = b.build().unwrap();
        let converters = build_hydrate_dehydrate(&graph, &[root]).unwrap();

        let err = converters.dehydrate(root, &json!({"color": "blue"})).unwrap_err();
        assert_eq!(
            err,
            DataError::UnknownEnumCase { path: "$.color".into(), enum_name: "Color".into(), tag: "blue".into() }
        );
    }

    #[test]
    fn hydrate_rejects_instance_of_another_class() {
        let mut b = TypeGraphBuilder::new();
        let s = b.string();
        let a = b.class("A", [("x", Field::optional(s))]);
        let c = b.class("C", [("a", Field::required(a))]);
        let graph = b.build().unwrap();
        let converters = build_hydrate_dehydrate(&graph, &[c]).unwrap();

        let wrong = TypedObject::new(c).with("a", Some(TypedValue::Object(TypedObject::new(c))));
        let err = converters.hydrate(&wrong).unwrap_err();
        assert!(matches!(err, DataError::WrongClass { .. }));
    }
}
