use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use cursor_api::value::{DATE_FORMAT, TIME_FORMAT, TIMESTAMP_FORMAT};
use cursor_api::{CursorError, PrimitiveKind, RawValue, Result, Scalar};

const TIMESTAMP_T_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Convert a leaf value to the declared primitive kind.
///
/// Values already in the kind's natural form pass through; anything else is
/// read as text and parsed.
pub fn convert_primitive(raw: &RawValue, kind: PrimitiveKind) -> Result<Scalar> {
    match (raw, kind) {
        (RawValue::Bool(b), PrimitiveKind::Boolean) => return Ok(Scalar::Boolean(*b)),
        (RawValue::Int(i), PrimitiveKind::BigInt) => return Ok(Scalar::BigInt(*i)),
        (RawValue::Int(i), PrimitiveKind::Int) => {
            return i32::try_from(*i).map(Scalar::Int).map_err(|e| CursorError::conversion(i, kind.name(), e));
        }
        (RawValue::Int(i), PrimitiveKind::SmallInt) => {
            return i16::try_from(*i)
                .map(Scalar::SmallInt)
                .map_err(|e| CursorError::conversion(i, kind.name(), e));
        }
        (RawValue::Int(i), PrimitiveKind::TinyInt) => {
            return i8::try_from(*i).map(Scalar::TinyInt).map_err(|e| CursorError::conversion(i, kind.name(), e));
        }
        (RawValue::Int(i), PrimitiveKind::Decimal) => return Ok(Scalar::Decimal(BigDecimal::from(*i))),
        (RawValue::Int(i), PrimitiveKind::Double) => return Ok(Scalar::Double(*i as f64)),
        (RawValue::Int(i), PrimitiveKind::Float) => return Ok(Scalar::Float(*i as f32)),
        (RawValue::Float(f), PrimitiveKind::Double) => return Ok(Scalar::Double(*f)),
        (RawValue::Float(f), PrimitiveKind::Float) => return Ok(Scalar::Float(*f as f32)),
        (RawValue::Decimal(d), PrimitiveKind::Decimal) => return Ok(Scalar::Decimal(d.clone())),
        (RawValue::Date(d), PrimitiveKind::Date) => return Ok(Scalar::Date(*d)),
        (RawValue::Time(t), PrimitiveKind::Time) => return Ok(Scalar::Time(*t)),
        (RawValue::Timestamp(ts), PrimitiveKind::Timestamp) => return Ok(Scalar::Timestamp(*ts)),
        (RawValue::Bytes(b), PrimitiveKind::Binary) => return Ok(Scalar::Binary(b.clone())),
        (RawValue::Text(s), PrimitiveKind::String) => return Ok(Scalar::String(s.clone())),
        _ => {}
    }
    let text = raw.leaf_text().ok_or_else(|| {
        CursorError::conversion(raw.kind_name(), kind.name(), "expected a scalar value")
    })?;
    parse_text(&text, kind)
}

/// Parse the textual form of a primitive. Strings are kept verbatim.
pub fn parse_text(text: &str, kind: PrimitiveKind) -> Result<Scalar> {
    let fail = |detail: &dyn std::fmt::Display| CursorError::conversion(text, kind.name(), detail);
    match kind {
        PrimitiveKind::TinyInt => text.parse().map(Scalar::TinyInt).map_err(|e| fail(&e)),
        PrimitiveKind::SmallInt => text.parse().map(Scalar::SmallInt).map_err(|e| fail(&e)),
        PrimitiveKind::Int => text.parse().map(Scalar::Int).map_err(|e| fail(&e)),
        PrimitiveKind::BigInt => text.parse().map(Scalar::BigInt).map_err(|e| fail(&e)),
        PrimitiveKind::Float => text.parse().map(Scalar::Float).map_err(|e| fail(&e)),
        PrimitiveKind::Double => text.parse().map(Scalar::Double).map_err(|e| fail(&e)),
        PrimitiveKind::Decimal => parse_decimal(text).map(Scalar::Decimal),
        PrimitiveKind::Boolean => {
            if text.eq_ignore_ascii_case("true") {
                Ok(Scalar::Boolean(true))
            } else if text.eq_ignore_ascii_case("false") {
                Ok(Scalar::Boolean(false))
            } else {
                Err(fail(&"expected true or false"))
            }
        }
        PrimitiveKind::Date => parse_date(text).map(Scalar::Date),
        PrimitiveKind::Time => parse_time(text).map(Scalar::Time),
        PrimitiveKind::Timestamp => parse_timestamp(text).map(Scalar::Timestamp),
        PrimitiveKind::Binary => Ok(Scalar::Binary(text.as_bytes().to_vec())),
        PrimitiveKind::String => Ok(Scalar::String(text.to_string())),
    }
}

/// Exact decimal from plain or scientific notation, at any precision.
pub fn parse_decimal(text: &str) -> Result<BigDecimal> {
    BigDecimal::from_str(text).map_err(|e| CursorError::conversion(text, "DECIMAL", e))
}

pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT).map_err(|e| CursorError::conversion(text, "DATE", e))
}

pub fn parse_time(text: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(text, TIME_FORMAT).map_err(|e| CursorError::conversion(text, "TIME", e))
}

/// `yyyy-MM-dd HH:mm:ss[.f]`, also with a `T` separator.
///
/// A trailing offset (`Z`, `+05:30`) is accepted and dropped: the wall-clock
/// fields are kept as written.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, TIMESTAMP_T_FORMAT))
        .or_else(|_| DateTime::parse_from_rfc3339(text).map(|dt| dt.naive_local()))
        .map_err(|e| CursorError::conversion(text, "TIMESTAMP", e))
}
