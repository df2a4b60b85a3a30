use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{CursorError, Result};

/// Value as handed out by a backend reader, before any type-directed conversion.
///
/// Inline JSON rows arrive as `Text`/`Seq`/`Mapping`; columnar chunks may
/// already carry typed leaves (`Decimal`, `Date`, ...).
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Decimal(BigDecimal),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Seq(Vec<RawValue>),
    /// Ordered key/value pairs.
    Mapping(Vec<(RawValue, RawValue)>),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Shape name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            RawValue::Null => "null",
            RawValue::Bool(_) => "boolean",
            RawValue::Int(_) => "integer",
            RawValue::Float(_) => "float",
            RawValue::Text(_) => "text",
            RawValue::Bytes(_) => "bytes",
            RawValue::Decimal(_) => "decimal",
            RawValue::Date(_) => "date",
            RawValue::Time(_) => "time",
            RawValue::Timestamp(_) => "timestamp",
            RawValue::Seq(_) => "sequence",
            RawValue::Mapping(_) => "mapping",
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        RawValue::Text(s.into())
    }

    /// Look up a mapping entry whose key is the given text.
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        match self {
            RawValue::Mapping(entries) => entries
                .iter()
                .find(|(k, _)| matches!(k, RawValue::Text(s) if s == key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Textual form of a leaf value; `None` for null and containers.
    pub fn leaf_text(&self) -> Option<String> {
        match self {
            RawValue::Null | RawValue::Seq(_) | RawValue::Mapping(_) => None,
            RawValue::Bool(b) => Some(b.to_string()),
            RawValue::Int(i) => Some(i.to_string()),
            RawValue::Float(f) => Some(f.to_string()),
            RawValue::Text(s) => Some(s.clone()),
            RawValue::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            RawValue::Decimal(d) => Some(d.to_string()),
            RawValue::Date(d) => Some(d.format(DATE_FORMAT).to_string()),
            RawValue::Time(t) => Some(t.format(TIME_FORMAT).to_string()),
            RawValue::Timestamp(ts) => Some(ts.format(TIMESTAMP_FORMAT).to_string()),
        }
    }
}

impl From<serde_json::Value> for RawValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => RawValue::Null,
            serde_json::Value::Bool(b) => RawValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => RawValue::Int(i),
                None => match n.as_f64() {
                    Some(f) => RawValue::Float(f),
                    None => RawValue::Text(n.to_string()),
                },
            },
            serde_json::Value::String(s) => RawValue::Text(s),
            serde_json::Value::Array(items) => {
                RawValue::Seq(items.into_iter().map(RawValue::from).collect())
            }
            serde_json::Value::Object(map) => RawValue::Mapping(
                map.into_iter()
                    .map(|(k, v)| (RawValue::Text(k), RawValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_owned())
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        RawValue::Int(i)
    }
}

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S%.f";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

// ═══════════════════════════════════════════════════════════════
//  Typed values
// ═══════════════════════════════════════════════════════════════

/// Typed primitive SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Boolean(bool),
    TinyInt(i8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    /// Arbitrary precision; DECIMAL(38, s) values fit.
    Decimal(BigDecimal),
    String(String),
    Binary(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
}

impl Scalar {
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Boolean(_) => "BOOLEAN",
            Scalar::TinyInt(_) => "TINYINT",
            Scalar::SmallInt(_) => "SMALLINT",
            Scalar::Int(_) => "INT",
            Scalar::BigInt(_) => "BIGINT",
            Scalar::Float(_) => "FLOAT",
            Scalar::Double(_) => "DOUBLE",
            Scalar::Decimal(_) => "DECIMAL",
            Scalar::String(_) => "STRING",
            Scalar::Binary(_) => "BINARY",
            Scalar::Date(_) => "DATE",
            Scalar::Time(_) => "TIME",
            Scalar::Timestamp(_) => "TIMESTAMP",
        }
    }
}

/// Natural textual form: unquoted, binary as standard base64.
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Boolean(b) => write!(f, "{b}"),
            Scalar::TinyInt(v) => write!(f, "{v}"),
            Scalar::SmallInt(v) => write!(f, "{v}"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::BigInt(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Double(v) => write!(f, "{v}"),
            Scalar::Decimal(d) => write!(f, "{d}"),
            Scalar::String(s) => f.write_str(s),
            Scalar::Binary(b) => f.write_str(&STANDARD.encode(b)),
            Scalar::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Scalar::Time(t) => write!(f, "{}", t.format(TIME_FORMAT)),
            Scalar::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
        }
    }
}

/// Decoded counterpart of a type tree.
///
/// `Null` stands for a SQL NULL element, field or map value.
#[derive(Debug, Clone, PartialEq)]
pub enum ComplexValue {
    Null,
    Scalar(Scalar),
    Array(Vec<ComplexValue>),
    Struct(Vec<(String, ComplexValue)>),
    Map(Vec<(ComplexValue, ComplexValue)>),
}

impl ComplexValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ComplexValue::Null)
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            ComplexValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ComplexValue::Null => "null",
            ComplexValue::Scalar(_) => "scalar",
            ComplexValue::Array(_) => "array",
            ComplexValue::Struct(_) => "struct",
            ComplexValue::Map(_) => "map",
        }
    }
}

impl From<Scalar> for ComplexValue {
    fn from(s: Scalar) -> Self {
        ComplexValue::Scalar(s)
    }
}

/// Canonical text form.
///
/// Strings are quoted as-is, struct field names always quoted, other scalars
/// unquoted. Quoting follows the value itself, which for a tree built by the
/// converter coincides with the declared type.
impl fmt::Display for ComplexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplexValue::Null => f.write_str("null"),
            ComplexValue::Scalar(Scalar::String(s)) => write!(f, "\"{s}\""),
            ComplexValue::Scalar(s) => write!(f, "{s}"),
            ComplexValue::Array(items) => write_array(f, items),
            ComplexValue::Struct(fields) => write_struct(f, fields),
            ComplexValue::Map(entries) => write_map(f, entries),
        }
    }
}

fn write_array(f: &mut fmt::Formatter<'_>, items: &[ComplexValue]) -> fmt::Result {
    f.write_str("[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str("]")
}

fn write_struct(f: &mut fmt::Formatter<'_>, fields: &[(String, ComplexValue)]) -> fmt::Result {
    f.write_str("{")?;
    for (i, (name, value)) in fields.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "\"{name}\":{value}")?;
    }
    f.write_str("}")
}

fn write_map(f: &mut fmt::Formatter<'_>, entries: &[(ComplexValue, ComplexValue)]) -> fmt::Result {
    f.write_str("{")?;
    for (i, (key, value)) in entries.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{key}:{value}")?;
    }
    f.write_str("}")
}

// ═══════════════════════════════════════════════════════════════
//  Accessor results
// ═══════════════════════════════════════════════════════════════

/// Result of `get_array`: converted elements plus the column's type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    type_name: String,
    elements: Vec<ComplexValue>,
}

impl ArrayValue {
    pub fn new(type_name: impl Into<String>, elements: Vec<ComplexValue>) -> Self {
        Self { type_name: type_name.into(), elements }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn elements(&self) -> &[ComplexValue] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// `count` elements starting at 1-based `index`.
    pub fn slice(&self, index: usize, count: usize) -> Result<&[ComplexValue]> {
        let start = index
            .checked_sub(1)
            .ok_or_else(|| CursorError::InvalidState("array index starts at 1".into()))?;
        let end = start.saturating_add(count);
        if end > self.elements.len() {
            return Err(CursorError::InvalidState(format!(
                "array slice {index}..{} out of bounds (length {})",
                index.saturating_add(count),
                self.elements.len()
            )));
        }
        Ok(&self.elements[start..end])
    }

    pub fn into_elements(self) -> Vec<ComplexValue> {
        self.elements
    }
}

impl fmt::Display for ArrayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_array(f, &self.elements)
    }
}

/// Result of `get_struct`: fields in declared order.
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    type_name: String,
    fields: Vec<(String, ComplexValue)>,
}

impl StructValue {
    pub fn new(type_name: impl Into<String>, fields: Vec<(String, ComplexValue)>) -> Self {
        Self { type_name: type_name.into(), fields }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn fields(&self) -> &[(String, ComplexValue)] {
        &self.fields
    }

    /// Field values in declared order.
    pub fn attributes(&self) -> impl Iterator<Item = &ComplexValue> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn field(&self, name: &str) -> Option<&ComplexValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl fmt::Display for StructValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_struct(f, &self.fields)
    }
}

/// Result of `get_map`: entries in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct MapValue {
    type_name: String,
    entries: Vec<(ComplexValue, ComplexValue)>,
}

impl MapValue {
    pub fn new(type_name: impl Into<String>, entries: Vec<(ComplexValue, ComplexValue)>) -> Self {
        Self { type_name: type_name.into(), entries }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn entries(&self) -> &[(ComplexValue, ComplexValue)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &ComplexValue) -> Option<&ComplexValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

impl fmt::Display for MapValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_map(f, &self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_object_keeps_key_order() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"z":1,"a":"x","m":[true,null]}"#).expect("valid json");
        let raw = RawValue::from(json);
        let RawValue::Mapping(entries) = &raw else {
            panic!("expected mapping, got {raw:?}");
        };
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![RawValue::text("z"), RawValue::text("a"), RawValue::text("m")]);
        assert_eq!(raw.get("a"), Some(&RawValue::text("x")));
        assert_eq!(
            raw.get("m"),
            Some(&RawValue::Seq(vec![RawValue::Bool(true), RawValue::Null]))
        );
    }

    #[test]
    fn display_renders_canonical_text() {
        let value = ComplexValue::Struct(vec![
            ("id".into(), Scalar::Int(7).into()),
            ("tags".into(), ComplexValue::Array(vec![Scalar::String("a b".into()).into(), ComplexValue::Null])),
            (
                "attrs".into(),
                ComplexValue::Map(vec![(Scalar::BigInt(1).into(), Scalar::Boolean(false).into())]),
            ),
        ]);
        assert_eq!(value.to_string(), r#"{"id":7,"tags":["a b",null],"attrs":{1:false}}"#);
    }

    #[test]
    fn temporal_scalars_use_sql_text() {
        let ts = NaiveDate::from_ymd_opt(2023, 10, 5)
            .and_then(|d| d.and_hms_milli_opt(15, 20, 30, 250))
            .expect("valid timestamp");
        assert_eq!(Scalar::Timestamp(ts).to_string(), "2023-10-05 15:20:30.250");
        let t = NaiveTime::from_hms_opt(12, 34, 56).expect("valid time");
        assert_eq!(Scalar::Time(t).to_string(), "12:34:56");
        assert_eq!(Scalar::Binary(b"hi".to_vec()).to_string(), "aGk=");
    }

    #[test]
    fn array_slice_is_one_based() {
        let array = ArrayValue::new(
            "ARRAY<INT>",
            (1..=4).map(|i| ComplexValue::Scalar(Scalar::Int(i))).collect(),
        );
        let slice = array.slice(2, 2).expect("in bounds");
        assert_eq!(slice, &[Scalar::Int(2).into(), Scalar::Int(3).into()]);
        assert!(array.slice(0, 1).is_err());
        assert!(array.slice(4, 2).is_err());
    }
}
