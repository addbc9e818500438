//! Union codec: decoding and encoding of true multi-member unions by the runtime
//! shape of the value.
//!
//! Decoding looks at the JSON token once:
//! - number: integer member if the token is an `i64`, else double member holding
//!   the token as read
//! - bool: bool member
//! - string: enum member if the tag is one of its cases, else string member
//! - null: only if the union is nullable
//! - object: class member first, then map member
//! - array: array member
//!
//! Encoding writes the single populated slot, checked in the order bool,
//! integer, double, string, array, class, map, enum. No populated slot is
//! `null`, which only a nullable union accepts.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::convert::runtime::{child, item};
use crate::convert::{Builder, ConverterOptions, Converters, Primitive, Rule, TransformKind};
use crate::dispatch::{TypeKind, TypeVisitor, dispatch};
use crate::error::{ConfigError, DataError};
use crate::ir::{ClassType, EnumType, StringKind, Ty, TypeGraph, TypeId, UnionType};
use crate::value::UnionValue;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnionCodec {
    pub id: TypeId,
    pub nullable: bool,
    pub boolean: bool,
    pub integer: bool,
    pub double: bool,
    /// Rule for the string member, plain or transformed.
    pub string: Option<Rule>,
    pub enumeration: Option<TypeId>,
    pub class: Option<TypeId>,
    /// Rule for the map member's values.
    pub map: Option<Rule>,
    /// Rule for the array member's items.
    pub array: Option<Rule>,
}

/// `buildUnionCodec(unionType)`: the codec for `union` together with the
/// converters of every class and enum it reaches.
pub fn build_union_codec(graph: &TypeGraph, union: TypeId) -> Result<Converters, ConfigError> {
    let mut builder = Builder::new(graph, ConverterOptions::default());
    match (graph.get(union), builder.rule(union)?) {
        (Ty::Union(_), Rule::Union { .. }) => Ok(builder.into_converters()),
        _ => Err(ConfigError::NotATrueUnion(union)),
    }
}

struct Slots<'a, 'g> {
    builder: &'a mut Builder<'g>,
    codec: &'a mut UnionCodec,
}

impl<'a, 'g> TypeVisitor<'g> for Slots<'a, 'g> {
    type Output = Result<(), ConfigError>;

    fn any(&mut self) -> Self::Output {
        Err(ConfigError::UnsupportedUnionMember(TypeKind::Any))
    }

    fn null(&mut self) -> Self::Output {
        self.codec.nullable = true;
        Ok(())
    }

    fn bool(&mut self) -> Self::Output {
        self.codec.boolean = true;
        Ok(())
    }

    fn integer(&mut self) -> Self::Output {
        self.codec.integer = true;
        Ok(())
    }

    fn double(&mut self) -> Self::Output {
        self.codec.double = true;
        Ok(())
    }

    fn string(&mut self) -> Self::Output {
        self.codec.string = Some(Rule::Copy { primitive: Primitive::String });
        Ok(())
    }

    fn transformed_string(&mut self, kind: &'g StringKind) -> Self::Output {
        self.codec.string = Some(Rule::Transformed { kind: TransformKind::try_from(kind)? });
        Ok(())
    }

    fn array(&mut self, items: TypeId) -> Self::Output {
        self.codec.array = Some(self.builder.rule(items)?);
        Ok(())
    }

    fn map(&mut self, values: TypeId) -> Self::Output {
        self.codec.map = Some(self.builder.rule(values)?);
        Ok(())
    }

    fn class(&mut self, id: TypeId, _: &'g ClassType) -> Self::Output {
        self.builder.rule(id)?;
        self.codec.class = Some(id);
        Ok(())
    }

    fn enumeration(&mut self, id: TypeId, _: &'g EnumType) -> Self::Output {
        self.builder.rule(id)?;
        self.codec.enumeration = Some(id);
        Ok(())
    }

    fn union(&mut self, _: TypeId, _: &'g UnionType) -> Self::Output {
        Err(ConfigError::NestedUnion)
    }
}

impl UnionCodec {
    pub(crate) fn build(builder: &mut Builder<'_>, id: TypeId, union: &UnionType) -> Result<Self, ConfigError> {
        let graph = builder.graph;
        let mut codec = UnionCodec {
            id,
            nullable: false,
            boolean: false,
            integer: false,
            double: false,
            string: None,
            enumeration: None,
            class: None,
            map: None,
            array: None,
        };
        for member in &union.members {
            dispatch(graph, *member, &mut Slots { builder: &mut *builder, codec: &mut codec })?;
        }
        tracing::trace!(union = %id, kinds = ?codec.member_kinds(), "planned union codec");
        Ok(codec)
    }

    pub fn member_kinds(&self) -> Vec<TypeKind> {
        let mut kinds = Vec::new();
        let flags = [
            (self.nullable, TypeKind::Null),
            (self.boolean, TypeKind::Bool),
            (self.integer, TypeKind::Integer),
            (self.double, TypeKind::Double),
            (self.string.is_some(), TypeKind::String),
            (self.array.is_some(), TypeKind::Array),
            (self.class.is_some(), TypeKind::Class),
            (self.map.is_some(), TypeKind::Map),
            (self.enumeration.is_some(), TypeKind::Enum),
        ];
        for (present, kind) in flags {
            if present {
                kinds.push(kind);
            }
        }
        kinds
    }

    fn mismatch(path: &str, kind: &'static str) -> DataError {
        DataError::UnionMismatch { path: path.to_string(), kind }
    }

    pub fn decode(&self, cx: &Converters, value: &Value, path: &str) -> Result<UnionValue, DataError> {
        let mut out = UnionValue::default();
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64().filter(|_| self.integer) {
                    out.integer = Some(i);
                } else if self.double {
                    out.double = Some(n.clone());
                } else if self.integer && n.is_u64() {
                    let token = n.to_string();
                    return Err(DataError::OutOfRange { path: path.to_string(), expected: "integer", value: token });
                } else {
                    return Err(Self::mismatch(path, "number"));
                }
            }
            Value::Bool(b) if self.boolean => out.bool = Some(*b),
            Value::Bool(_) => return Err(Self::mismatch(path, "bool")),
            Value::String(tag) => {
                let enum_case = match self.enumeration {
                    Some(id) => {
                        let converter = cx.enum_converter(id)?;
                        if !converter.cases.contains(tag) && self.string.is_none() {
                            return Err(DataError::UnknownEnumCase {
                                path: path.to_string(),
                                enum_name: converter.name.clone(),
                                tag: tag.clone(),
                            });
                        }
                        converter.cases.contains(tag)
                    }
                    None => false,
                };
                if enum_case {
                    out.enumeration = Some(tag.clone());
                } else if let Some(rule) = &self.string {
                    out.string = Some(cx.dehydrate_rule(rule, value, path)?);
                } else {
                    return Err(Self::mismatch(path, "string"));
                }
            }
            Value::Null if self.nullable => {}
            Value::Null => return Err(Self::mismatch(path, "null")),
            Value::Object(entries) => {
                if let Some(class) = self.class {
                    out.class = Some(cx.dehydrate_class(class, value, path)?);
                } else if let Some(values) = &self.map {
                    let map = entries
                        .iter()
                        .map(|(k, v)| Ok((k.clone(), cx.dehydrate_rule(values, v, &child(path, k))?)))
                        .collect::<Result<IndexMap<_, _>, DataError>>()?;
                    out.map = Some(map);
                } else {
                    return Err(Self::mismatch(path, "object"));
                }
            }
            Value::Array(elements) => {
                let Some(items) = &self.array else {
                    return Err(Self::mismatch(path, "array"));
                };
                let decoded = elements
                    .iter()
                    .enumerate()
                    .map(|(i, el)| cx.dehydrate_rule(items, el, &item(path, i)))
                    .collect::<Result<Vec<_>, _>>()?;
                out.array = Some(decoded);
            }
        }
        Ok(out)
    }

    pub fn encode(&self, cx: &Converters, value: &UnionValue, path: &str) -> Result<Value, DataError> {
        if let Some(b) = value.bool {
            return if self.boolean { Ok(Value::Bool(b)) } else { Err(Self::mismatch(path, "bool")) };
        }
        if let Some(i) = value.integer {
            return if self.integer { Ok(Value::from(i)) } else { Err(Self::mismatch(path, "integer")) };
        }
        if let Some(n) = &value.double {
            return if self.double { Ok(Value::Number(n.clone())) } else { Err(Self::mismatch(path, "double")) };
        }
        if let Some(s) = &value.string {
            let rule = self.string.as_ref().ok_or_else(|| Self::mismatch(path, "string"))?;
            return cx.hydrate_rule(rule, s, path);
        }
        if let Some(elements) = &value.array {
            let items = self.array.as_ref().ok_or_else(|| Self::mismatch(path, "array"))?;
            let encoded = elements
                .iter()
                .enumerate()
                .map(|(i, el)| cx.hydrate_rule(items, el, &item(path, i)))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Value::Array(encoded));
        }
        if let Some(object) = &value.class {
            let class = self.class.ok_or_else(|| Self::mismatch(path, "object"))?;
            return cx.hydrate_class(class, object, path);
        }
        if let Some(entries) = &value.map {
            let values = self.map.as_ref().ok_or_else(|| Self::mismatch(path, "map"))?;
            let encoded = entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), cx.hydrate_rule(values, v, &child(path, k))?)))
                .collect::<Result<serde_json::Map<_, _>, DataError>>()?;
            return Ok(Value::Object(encoded));
        }
        if let Some(tag) = &value.enumeration {
            let id = self.enumeration.ok_or_else(|| Self::mismatch(path, "enum"))?;
            let converter = cx.enum_converter(id)?;
            if !converter.cases.contains(tag) {
                return Err(DataError::UnknownEnumCase {
                    path: path.to_string(),
                    enum_name: converter.name.clone(),
                    tag: tag.clone(),
                });
            }
            return Ok(Value::String(tag.clone()));
        }
        if self.nullable { Ok(Value::Null) } else { Err(DataError::NullUnion { path: path.to_string() }) }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::convert::runtime::ROOT;
    use crate::ir::{Field, TypeGraphBuilder};
    use crate::value::TypedValue;

    fn codec_of(graph: &TypeGraph, union: TypeId) -> Converters {
        build_union_codec(graph, union).unwrap()
    }

    #[test]
    fn integral_tokens_prefer_integer_member() {
        let mut b = TypeGraphBuilder::new();
        let i = b.integer();
        let d = b.double();
        let u = b.union([i, d]);
        let graph = b.build().unwrap();
        let cx = codec_of(&graph, u);
        let codec = cx.union_codec(u).unwrap();

        assert_eq!(codec.decode(&cx, &json!(3), ROOT).unwrap().integer, Some(3));
        assert_eq!(codec.decode(&cx, &json!(3.5), ROOT).unwrap().double.and_then(|n| n.as_f64()), Some(3.5));
        let whole = codec.decode(&cx, &json!(3.0), ROOT).unwrap();
        assert_eq!(whole.integer, None);
        assert_eq!(codec.encode(&cx, &whole, ROOT).unwrap(), json!(3.0));
    }

    #[test]
    fn number_without_numeric_member_fails() {
        let mut b = TypeGraphBuilder::new();
        let s = b.string();
        let t = b.bool();
        let u = b.union([s, t]);
        let graph = b.build().unwrap();
        let cx = codec_of(&graph, u);
        let err = cx.union_codec(u).unwrap().decode(&cx, &json!(1), ROOT).unwrap_err();
        assert_eq!(err.to_string(), "$: union does not contain number");
    }

    #[test]
    fn enum_tags_win_over_plain_strings() {
        let mut b = TypeGraphBuilder::new();
        let color = b.enumeration("Color", ["red"]);
        let s = b.string();
        let u = b.union([s, color]);
        let graph = b.build().unwrap();
        let cx = codec_of(&graph, u);
        let codec = cx.union_codec(u).unwrap();

        assert_eq!(codec.decode(&cx, &json!("red"), ROOT).unwrap().enumeration.as_deref(), Some("red"));
        let other = codec.decode(&cx, &json!("teal"), ROOT).unwrap();
        assert_eq!(other.string.and_then(|s| s.as_str().map(str::to_string)).as_deref(), Some("teal"));
    }

    #[test]
    fn null_only_when_nullable() {
        let mut b = TypeGraphBuilder::new();
        let s = b.string();
        let i = b.integer();
        let n = b.null();
        let strict = b.union([s, i]);
        let loose = b.union([n, s, i]);
        let graph = b.build().unwrap();

        let cx = codec_of(&graph, strict);
        let err = cx.union_codec(strict).unwrap().decode(&cx, &Value::Null, ROOT).unwrap_err();
        assert_eq!(err.to_string(), "$: union does not contain null");
        let err = cx.union_codec(strict).unwrap().encode(&cx, &UnionValue::null(), ROOT).unwrap_err();
        assert_eq!(err.to_string(), "$: union must not be null");

        let cx = codec_of(&graph, loose);
        let codec = cx.union_codec(loose).unwrap();
        let decoded = codec.decode(&cx, &Value::Null, ROOT).unwrap();
        assert!(decoded.is_null());
        assert_eq!(codec.encode(&cx, &decoded, ROOT).unwrap(), Value::Null);
    }

    #[test]
    fn arrays_decode_per_element() {
        let mut b = TypeGraphBuilder::new();
        let s = b.string();
        let point = b.class("Point", [("x", Field::required(s))]);
        let points = b.array(point);
        let u = b.union([s, points]);
        let graph = b.build().unwrap();
        let cx = codec_of(&graph, u);
        let codec = cx.union_codec(u).unwrap();

        let input = json!([{"x": "1"}, {"x": "2"}]);
        let decoded = codec.decode(&cx, &input, ROOT).unwrap();
        assert_eq!(decoded.array.as_ref().map(Vec::len), Some(2));
        assert_eq!(codec.encode(&cx, &decoded, ROOT).unwrap(), input);

        let err = codec.decode(&cx, &json!([{"y": 1}]), ROOT).unwrap_err();
        assert_eq!(err.to_string(), "missing required field: x");
    }

    #[test]
    fn encode_follows_slot_priority() {
        let mut b = TypeGraphBuilder::new();
        let t = b.bool();
        let s = b.string();
        let u = b.union([t, s]);
        let graph = b.build().unwrap();
        let cx = codec_of(&graph, u);
        let codec = cx.union_codec(u).unwrap();

        let both = UnionValue {
            bool: Some(true),
            string: Some(TypedValue::String("x".into())),
            ..UnionValue::default()
        };
        assert_eq!(codec.encode(&cx, &both, ROOT).unwrap(), json!(true));
    }

    #[test]
    fn any_member_is_rejected() {
        let mut b = TypeGraphBuilder::new();
        let a = b.any();
        let s = b.integer();
        let u = b.union([a, s]);
        let graph = b.build().unwrap();
        assert_eq!(
            build_union_codec(&graph, u).unwrap_err(),
            ConfigError::UnsupportedUnionMember(TypeKind::Any)
        );
    }

    #[test]
    fn objects_bind_to_the_map_member_without_a_class() {
        let mut b = TypeGraphBuilder::new();
        let s = b.string();
        let i = b.integer();
        let counts = b.map(i);
        let u = b.union([s, counts]);
        let graph = b.build().unwrap();
        let cx = codec_of(&graph, u);
        let codec = cx.union_codec(u).unwrap();

        let input = json!({"a": 1, "b": 2});
        let decoded = codec.decode(&cx, &input, ROOT).unwrap();
        let map = decoded.map.as_ref().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(map.get("b"), Some(&TypedValue::Integer(2)));
        assert_eq!(codec.encode(&cx, &decoded, ROOT).unwrap(), input);

        let err = codec.decode(&cx, &json!({"a": "x"}), ROOT).unwrap_err();
        assert_eq!(err.to_string(), "$.a: expected integer, found string");
    }

    #[test]
    fn bool_tokens_bind_to_the_bool_member() {
        let mut b = TypeGraphBuilder::new();
        let t = b.bool();
        let i = b.integer();
        let u = b.union([t, i]);
        let graph = b.build().unwrap();
        let cx = codec_of(&graph, u);
        let codec = cx.union_codec(u).unwrap();

        let decoded = codec.decode(&cx, &json!(false), ROOT).unwrap();
        assert_eq!(decoded.bool, Some(false));
        assert_eq!(decoded.integer, None);
        assert_eq!(codec.encode(&cx, &decoded, ROOT).unwrap(), json!(false));
        assert_eq!(codec.decode(&cx, &json!(4), ROOT).unwrap().integer, Some(4));
    }

    #[test]
    fn integral_token_in_double_member_is_written_back_unchanged() {
        let mut b = TypeGraphBuilder::new();
        let d = b.double();
        let s = b.string();
        let u = b.union([d, s]);
        let graph = b.build().unwrap();
        let cx = codec_of(&graph, u);
        let codec = cx.union_codec(u).unwrap();

        for input in [json!(3), json!(3.0), json!(18446744073709551615u64)] {
            let decoded = codec.decode(&cx, &input, ROOT).unwrap();
            assert!(decoded.double.is_some());
            assert_eq!(codec.encode(&cx, &decoded, ROOT).unwrap(), input);
        }
    }

    #[test]
    fn integer_member_reports_tokens_beyond_i64() {
        let mut b = TypeGraphBuilder::new();
        let i = b.integer();
        let s = b.string();
        let u = b.union([i, s]);
        let graph = b.build().unwrap();
        let cx = codec_of(&graph, u);
        let err = cx.union_codec(u).unwrap().decode(&cx, &json!(18446744073709551615u64), ROOT).unwrap_err();
        assert_eq!(err.to_string(), "$: 18446744073709551615 is out of range for integer");
    }

    #[test]
    fn nullable_wrapper_is_not_a_true_union() {
        let mut b = TypeGraphBuilder::new();
        let s = b.string();
        let opt = b.nullable(s);
        let graph = b.build().unwrap();
        assert_eq!(build_union_codec(&graph, opt).unwrap_err(), ConfigError::NotATrueUnion(opt));
    }
}
