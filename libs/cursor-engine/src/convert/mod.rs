//! Type-directed conversion of raw values into [`ComplexValue`] trees, and
//! the canonical text form of such trees.
//!
//! Descriptor text is parsed one level at a time: a nested type is only
//! parsed when a container value of that type is actually met.

pub mod coerce;
pub mod primitive;

use cursor_api::{ComplexKind, ComplexValue, CursorError, PrimitiveKind, RawValue, Result};

use crate::grammar::{clean_type_name, descriptor_kind, parse_array, parse_map, parse_struct};

pub use primitive::convert_primitive;

static NULL: RawValue = RawValue::Null;

/// Convert a raw value against a type descriptor.
///
/// A null raw value converts to [`ComplexValue::Null`] at any level.
pub fn convert(raw: &RawValue, type_text: &str) -> Result<ComplexValue> {
    if raw.is_null() {
        return Ok(ComplexValue::Null);
    }
    let type_text = clean_type_name(type_text);
    match descriptor_kind(&type_text) {
        Some(ComplexKind::Array) => convert_array(raw, &type_text),
        Some(ComplexKind::Struct) => convert_struct(raw, &type_text),
        Some(ComplexKind::Map) => convert_map(raw, &type_text),
        None => convert_primitive(raw, PrimitiveKind::of(&type_text)).map(ComplexValue::Scalar),
    }
}

/// Decode JSON text, then convert it against the descriptor.
pub fn convert_json(text: &str, type_text: &str) -> Result<ComplexValue> {
    tracing::debug!(type_text, len = text.len(), "decoding complex value");
    let json: serde_json::Value = serde_json::from_str(text)?;
    convert(&RawValue::from(json), type_text)
}

fn shape(kind: ComplexKind, expected: &'static str, raw: &RawValue) -> CursorError {
    CursorError::ShapeMismatch { kind, expected, found: raw.kind_name() }
}

fn convert_array(raw: &RawValue, type_text: &str) -> Result<ComplexValue> {
    let RawValue::Seq(items) = raw else {
        return Err(shape(ComplexKind::Array, "a sequence", raw));
    };
    let element_type = parse_array(type_text)?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| convert(item, &element_type).map_err(|e| e.with_context(format!("element {i}"))))
        .collect::<Result<Vec<_>>>()
        .map(ComplexValue::Array)
}

fn convert_struct(raw: &RawValue, type_text: &str) -> Result<ComplexValue> {
    let RawValue::Mapping(entries) = raw else {
        return Err(shape(ComplexKind::Struct, "a mapping", raw));
    };
    let fields = parse_struct(type_text)?;

    let undeclared = entries
        .iter()
        .filter(|(k, _)| !matches!(k, RawValue::Text(name) if fields.iter().any(|(f, _)| f == name)))
        .count();
    if undeclared > 0 {
        tracing::debug!(type_text, undeclared, "ignoring struct keys missing from the type");
    }

    fields
        .into_iter()
        .map(|(name, field_type)| -> Result<(String, ComplexValue)> {
            let value = match raw.get(&name) {
                Some(value) => convert(value, &field_type)
                    .map_err(|e| e.with_context(format!("field \"{name}\"")))?,
                None => ComplexValue::Null,
            };
            Ok((name, value))
        })
        .collect::<Result<Vec<_>>>()
        .map(ComplexValue::Struct)
}

/// Accepts a native mapping or a sequence of `{"key": .., "value": ..}` pairs.
fn convert_map(raw: &RawValue, type_text: &str) -> Result<ComplexValue> {
    let (key_type, value_type) = parse_map(type_text)?;
    let pairs: Vec<(&RawValue, &RawValue)> = match raw {
        RawValue::Mapping(entries) => entries.iter().map(|(k, v)| (k, v)).collect(),
        RawValue::Seq(items) => items
            .iter()
            .map(|item| match item {
                RawValue::Mapping(_) => item
                    .get("key")
                    .map(|key| (key, item.get("value").unwrap_or(&NULL)))
                    .ok_or_else(|| {
                        CursorError::conversion(item.kind_name(), type_text, "map entry has no \"key\"")
                    }),
                other => Err(shape(ComplexKind::Map, "a key/value pair", other)),
            })
            .collect::<Result<_>>()?,
        other => return Err(shape(ComplexKind::Map, "a mapping", other)),
    };

    pairs
        .into_iter()
        .map(|(k, v)| -> Result<(ComplexValue, ComplexValue)> {
            if k.is_null() {
                return Err(CursorError::conversion("null", key_type.as_str(), "map keys cannot be null"));
            }
            let key = convert(k, &key_type).map_err(|e| e.with_context("map key"))?;
            let value = convert(v, &value_type).map_err(|e| e.with_context(format!("map value for {key}")))?;
            Ok((key, value))
        })
        .collect::<Result<Vec<_>>>()
        .map(ComplexValue::Map)
}

// ═══════════════════════════════════════════════════════════════
//  Canonical serialization
// ═══════════════════════════════════════════════════════════════

/// Render a value in canonical text form, quoting by declared type.
///
/// STRING scalars are double-quoted as-is (no escaping), struct field names
/// are always quoted, and map keys/values are quoted only when their declared
/// type is STRING. No whitespace is emitted.
pub fn serialize(value: &ComplexValue, type_text: &str) -> Result<String> {
    let mut out = String::new();
    write_value(&mut out, value, &clean_type_name(type_text))?;
    Ok(out)
}

fn write_value(out: &mut String, value: &ComplexValue, type_text: &str) -> Result<()> {
    if value.is_null() {
        out.push_str("null");
        return Ok(());
    }
    match (descriptor_kind(type_text), value) {
        (Some(ComplexKind::Array), ComplexValue::Array(items)) => {
            let element_type = parse_array(type_text)?;
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item, &element_type)?;
            }
            out.push(']');
        }
        (Some(ComplexKind::Struct), ComplexValue::Struct(values)) => {
            out.push('{');
            for (i, (name, field_type)) in parse_struct(type_text)?.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push('"');
                out.push_str(name);
                out.push_str("\":");
                match values.iter().find(|(n, _)| n == name) {
                    Some((_, v)) => write_value(out, v, field_type)?,
                    None => out.push_str("null"),
                }
            }
            out.push('}');
        }
        (Some(ComplexKind::Map), ComplexValue::Map(entries)) => {
            let (key_type, value_type) = parse_map(type_text)?;
            out.push('{');
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, k, &key_type)?;
                out.push(':');
                write_value(out, v, &value_type)?;
            }
            out.push('}');
        }
        (None, ComplexValue::Scalar(scalar)) => {
            if PrimitiveKind::of(type_text) == PrimitiveKind::String {
                out.push('"');
                out.push_str(&scalar.to_string());
                out.push('"');
            } else {
                out.push_str(&scalar.to_string());
            }
        }
        (Some(kind), other) => {
            return Err(CursorError::conversion(
                other.kind_name(),
                type_text,
                format!("expected a {} value", kind.keyword().to_ascii_lowercase()),
            ));
        }
        (None, other) => {
            return Err(CursorError::conversion(other.kind_name(), type_text, "expected a scalar value"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cursor_api::{ErrorKind, Scalar};

    fn json(text: &str) -> RawValue {
        RawValue::from(serde_json::from_str::<serde_json::Value>(text).expect("valid json"))
    }

    #[test]
    fn struct_follows_declared_order_and_fills_missing() {
        let value = convert(&json(r#"{"c":true,"a":"1","z":9}"#), "STRUCT<a:INT,b:STRING,c:BOOLEAN>")
            .expect("struct");
        assert_eq!(
            value,
            ComplexValue::Struct(vec![
                ("a".into(), Scalar::Int(1).into()),
                ("b".into(), ComplexValue::Null),
                ("c".into(), Scalar::Boolean(true).into()),
            ])
        );
    }

    #[test]
    fn map_accepts_object_and_pair_list() {
        let from_object = convert(&json(r#"{"1":"one","2":"two"}"#), "MAP<INT,STRING>").expect("object form");
        let from_pairs = convert(
            &json(r#"[{"key":1,"value":"one"},{"key":"2","value":"two"}]"#),
            "MAP<INT,STRING>",
        )
        .expect("pair form");
        assert_eq!(from_object, from_pairs);
        assert_eq!(
            serialize(&from_object, "MAP<INT,STRING>").expect("serialize"),
            r#"{1:"one",2:"two"}"#
        );
    }

    #[test]
    fn map_pair_without_key_is_rejected() {
        let err = convert(&json(r#"[{"value":1}]"#), "MAP<STRING,INT>").expect_err("no key");
        assert_eq!(err.kind(), ErrorKind::Conversion);
        let err = convert(&json(r#"[{"key":null,"value":1}]"#), "MAP<STRING,INT>").expect_err("null key");
        assert_eq!(err.kind(), ErrorKind::Conversion);
    }

    #[test]
    fn shape_mismatch_names_expected_and_found() {
        let err = convert(&RawValue::Int(5), "ARRAY<INT>").expect_err("not a sequence");
        assert_eq!(err.to_string(), "expected a sequence for ARRAY but found: integer");
        let err = convert(&RawValue::text("x"), "STRUCT<a:INT>").expect_err("not a mapping");
        assert_eq!(err.to_string(), "expected a mapping for STRUCT but found: text");
    }

    #[test]
    fn nested_failures_carry_position() {
        let err = convert(&json(r#"{"xs":[1,"two"]}"#), "STRUCT<xs:ARRAY<INT>>").expect_err("bad element");
        assert_eq!(err.kind(), ErrorKind::Conversion);
        let message = err.to_string();
        assert!(message.starts_with("field \"xs\": element 1: "), "{message}");
    }

    #[test]
    fn nested_tree_converts_lazily_per_level() {
        let value = convert(
            &json(r#"[{"id":1,"tags":{"k":["a","b"]}},null]"#),
            "ARRAY<STRUCT<id:BIGINT,tags:MAP<STRING,ARRAY<STRING>>>>",
        )
        .expect("nested");
        assert_eq!(
            serialize(&value, "ARRAY<STRUCT<id:BIGINT,tags:MAP<STRING,ARRAY<STRING>>>>").expect("serialize"),
            r#"[{"id":1,"tags":{"k":["a","b"]}},null]"#
        );
    }

    #[test]
    fn canonical_forms() {
        let array = ComplexValue::Array((1..=3).map(|i| Scalar::Int(i).into()).collect());
        assert_eq!(serialize(&array, "ARRAY<INT>").expect("array"), "[1,2,3]");

        let record = ComplexValue::Struct(vec![
            ("id".into(), Scalar::Int(123).into()),
            ("name".into(), Scalar::String("foo".into()).into()),
        ]);
        assert_eq!(
            serialize(&record, "STRUCT<id:INT,name:STRING>").expect("struct"),
            r#"{"id":123,"name":"foo"}"#
        );
        assert_eq!(record.to_string(), r#"{"id":123,"name":"foo"}"#);
    }

    #[test]
    fn serialize_rejects_mismatched_shape() {
        let scalar = ComplexValue::Scalar(Scalar::Int(1));
        assert!(serialize(&scalar, "ARRAY<INT>").is_err());
        assert!(serialize(&ComplexValue::Array(vec![]), "INT").is_err());
    }

    #[test]
    fn scalar_text_round_trips() {
        for (text, ty) in [("123.45", "DECIMAL(10,2)"), ("2023-10-05", "DATE"), ("12:34:56", "TIME"), ("-7", "INT")] {
            let value = convert(&RawValue::text(text), ty).expect(text);
            let rendered = serialize(&value, ty).expect("serialize");
            assert_eq!(rendered, text);
            assert_eq!(convert(&RawValue::text(rendered), ty).expect("reparse"), value);
        }
    }
}
