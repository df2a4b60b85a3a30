use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ComplexKind;

/// Parsed type descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeNode {
    /// Primitive type name with any `NOT NULL` qualifier already stripped.
    Primitive(String),
    Array(Box<TypeNode>),
    Map(Box<TypeNode>, Box<TypeNode>),
    /// Fields in declared order.
    Struct(Vec<(String, TypeNode)>),
}

/// Normalized descriptor text, e.g. `STRUCT<a:INT,b:ARRAY<STRING>>`.
impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeNode::Primitive(name) => f.write_str(name),
            TypeNode::Array(element) => write!(f, "ARRAY<{element}>"),
            TypeNode::Map(key, value) => write!(f, "MAP<{key},{value}>"),
            TypeNode::Struct(fields) => {
                f.write_str("STRUCT<")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{name}:{ty}")?;
                }
                f.write_str(">")
            }
        }
    }
}

/// Primitive names the converter understands.
///
/// Unrecognized names are read as [`PrimitiveKind::String`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Decimal,
    Boolean,
    Date,
    Time,
    Timestamp,
    Binary,
    String,
}

impl PrimitiveKind {
    /// Recognize a primitive type name. Case-insensitive; a `(p,s)` or `(n)`
    /// suffix is ignored.
    pub fn parse(name: &str) -> Option<Self> {
        let base = name.split('(').next().unwrap_or(name).trim();
        let kind = match base.to_ascii_uppercase().as_str() {
            "TINYINT" | "BYTE" => PrimitiveKind::TinyInt,
            "SMALLINT" | "SHORT" => PrimitiveKind::SmallInt,
            "INT" | "INTEGER" => PrimitiveKind::Int,
            "BIGINT" | "LONG" => PrimitiveKind::BigInt,
            "FLOAT" | "REAL" => PrimitiveKind::Float,
            "DOUBLE" => PrimitiveKind::Double,
            "DECIMAL" | "NUMERIC" | "DEC" => PrimitiveKind::Decimal,
            "BOOLEAN" | "BOOL" => PrimitiveKind::Boolean,
            "DATE" => PrimitiveKind::Date,
            "TIME" => PrimitiveKind::Time,
            "TIMESTAMP" | "TIMESTAMP_NTZ" | "TIMESTAMP_LTZ" => PrimitiveKind::Timestamp,
            "BINARY" => PrimitiveKind::Binary,
            "STRING" | "VARCHAR" | "CHAR" => PrimitiveKind::String,
            _ => return None,
        };
        Some(kind)
    }

    pub fn of(name: &str) -> Self {
        Self::parse(name).unwrap_or(PrimitiveKind::String)
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::TinyInt => "TINYINT",
            PrimitiveKind::SmallInt => "SMALLINT",
            PrimitiveKind::Int => "INT",
            PrimitiveKind::BigInt => "BIGINT",
            PrimitiveKind::Float => "FLOAT",
            PrimitiveKind::Double => "DOUBLE",
            PrimitiveKind::Decimal => "DECIMAL",
            PrimitiveKind::Boolean => "BOOLEAN",
            PrimitiveKind::Date => "DATE",
            PrimitiveKind::Time => "TIME",
            PrimitiveKind::Timestamp => "TIMESTAMP",
            PrimitiveKind::Binary => "BINARY",
            PrimitiveKind::String => "STRING",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column-level SQL type tag reported by the metadata provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SqlType {
    Boolean,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Decimal,
    String,
    Binary,
    Date,
    Time,
    Timestamp,
    Array,
    Struct,
    Map,
    Interval,
    Null,
    Other,
}

impl SqlType {
    /// Derive the tag from a type name or the leading keyword of a descriptor.
    pub fn from_type_name(name: &str) -> Self {
        let upper = name.trim().to_ascii_uppercase();
        let keyword = upper
            .split(|c: char| c == '<' || c == '(' || c.is_whitespace())
            .next()
            .unwrap_or("");
        match keyword {
            "ARRAY" => return SqlType::Array,
            "STRUCT" => return SqlType::Struct,
            "MAP" => return SqlType::Map,
            "INTERVAL" => return SqlType::Interval,
            "NULL" | "VOID" => return SqlType::Null,
            _ => {}
        }
        match PrimitiveKind::parse(keyword) {
            Some(kind) => kind.into(),
            None => SqlType::Other,
        }
    }

    pub fn complex_kind(self) -> Option<ComplexKind> {
        match self {
            SqlType::Array => Some(ComplexKind::Array),
            SqlType::Struct => Some(ComplexKind::Struct),
            SqlType::Map => Some(ComplexKind::Map),
            _ => None,
        }
    }

    pub fn is_floating(self) -> bool {
        matches!(self, SqlType::Float | SqlType::Double)
    }
}

impl From<PrimitiveKind> for SqlType {
    fn from(kind: PrimitiveKind) -> Self {
        match kind {
            PrimitiveKind::TinyInt => SqlType::TinyInt,
            PrimitiveKind::SmallInt => SqlType::SmallInt,
            PrimitiveKind::Int => SqlType::Int,
            PrimitiveKind::BigInt => SqlType::BigInt,
            PrimitiveKind::Float => SqlType::Float,
            PrimitiveKind::Double => SqlType::Double,
            PrimitiveKind::Decimal => SqlType::Decimal,
            PrimitiveKind::Boolean => SqlType::Boolean,
            PrimitiveKind::Date => SqlType::Date,
            PrimitiveKind::Time => SqlType::Time,
            PrimitiveKind::Timestamp => SqlType::Timestamp,
            PrimitiveKind::Binary => SqlType::Binary,
            PrimitiveKind::String => SqlType::String,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_names_ignore_case_and_parameters() {
        assert_eq!(PrimitiveKind::of("decimal(10,2)"), PrimitiveKind::Decimal);
        assert_eq!(PrimitiveKind::of("Timestamp_NTZ"), PrimitiveKind::Timestamp);
        assert_eq!(PrimitiveKind::of("VARCHAR(32)"), PrimitiveKind::String);
        assert_eq!(PrimitiveKind::of("GEOGRAPHY"), PrimitiveKind::String);
        assert_eq!(PrimitiveKind::parse("GEOGRAPHY"), None);
    }

    #[test]
    fn sql_type_from_descriptor_keyword() {
        assert_eq!(SqlType::from_type_name("ARRAY<INT>"), SqlType::Array);
        assert_eq!(SqlType::from_type_name("struct <a:int>"), SqlType::Struct);
        assert_eq!(SqlType::from_type_name("MAP<STRING,INT>"), SqlType::Map);
        assert_eq!(SqlType::from_type_name("DECIMAL(38,6)"), SqlType::Decimal);
        assert_eq!(SqlType::from_type_name("INTERVAL DAY"), SqlType::Interval);
        assert_eq!(SqlType::from_type_name("VARIANT"), SqlType::Other);
    }

    #[test]
    fn type_node_display_is_normalized() {
        let node = TypeNode::Struct(vec![
            ("a".into(), TypeNode::Primitive("INT".into())),
            (
                "b".into(),
                TypeNode::Map(
                    Box::new(TypeNode::Primitive("STRING".into())),
                    Box::new(TypeNode::Array(Box::new(TypeNode::Primitive("DATE".into())))),
                ),
            ),
        ]);
        assert_eq!(node.to_string(), "STRUCT<a:INT,b:MAP<STRING,ARRAY<DATE>>>");
    }
}
