//! Scalar coercions behind the cursor's typed accessors.
//!
//! Narrowing is range-checked, fractional values truncate toward zero, and
//! pairs with no sensible mapping report `Unsupported`.

use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive, Zero};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};

use cursor_api::{CursorError, Result, Scalar};

use super::primitive::{parse_date, parse_decimal, parse_time, parse_timestamp};

fn unsupported(value: &Scalar, target: &str) -> CursorError {
    CursorError::unsupported(format!("reading a {} value as {target}", value.type_name()))
}

fn out_of_range(value: &Scalar, target: &str) -> CursorError {
    CursorError::conversion(value, target, "value out of range")
}

/// Text `"0"`/`"false"` reads as false, `"1"`/`"true"` and any other text as true.
pub fn to_bool(value: &Scalar) -> Result<bool> {
    match value {
        Scalar::Boolean(b) => Ok(*b),
        Scalar::TinyInt(v) => Ok(*v != 0),
        Scalar::SmallInt(v) => Ok(*v != 0),
        Scalar::Int(v) => Ok(*v != 0),
        Scalar::BigInt(v) => Ok(*v != 0),
        Scalar::Float(v) => Ok(*v != 0.0),
        Scalar::Double(v) => Ok(*v != 0.0),
        Scalar::Decimal(d) => Ok(!d.is_zero()),
        Scalar::String(s) => {
            let s = s.trim();
            Ok(!(s == "0" || s.eq_ignore_ascii_case("false")))
        }
        Scalar::Binary(b) => Ok(b.first().is_some_and(|byte| *byte != 0)),
        Scalar::Date(_) | Scalar::Time(_) | Scalar::Timestamp(_) => Err(unsupported(value, "BOOLEAN")),
    }
}

/// Dates read as epoch days and timestamps as epoch milliseconds.
pub fn to_i64(value: &Scalar) -> Result<i64> {
    match value {
        Scalar::Boolean(b) => Ok(i64::from(*b)),
        Scalar::TinyInt(v) => Ok(i64::from(*v)),
        Scalar::SmallInt(v) => Ok(i64::from(*v)),
        Scalar::Int(v) => Ok(i64::from(*v)),
        Scalar::BigInt(v) => Ok(*v),
        Scalar::Float(v) => float_to_i64(f64::from(*v)).ok_or_else(|| out_of_range(value, "BIGINT")),
        Scalar::Double(v) => float_to_i64(*v).ok_or_else(|| out_of_range(value, "BIGINT")),
        Scalar::Decimal(d) => truncate(d).to_i64().ok_or_else(|| out_of_range(value, "BIGINT")),
        Scalar::String(s) => match s.trim().parse::<i64>() {
            Ok(v) => Ok(v),
            Err(_) => truncate(&parse_decimal(s.trim())?)
                .to_i64()
                .ok_or_else(|| out_of_range(value, "BIGINT")),
        },
        Scalar::Date(d) => Ok(d.signed_duration_since(epoch_day()).num_days()),
        Scalar::Timestamp(ts) => Ok(ts.and_utc().timestamp_millis()),
        Scalar::Time(_) | Scalar::Binary(_) => Err(unsupported(value, "BIGINT")),
    }
}

fn float_to_i64(v: f64) -> Option<i64> {
    let t = v.trunc();
    (t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64).then_some(t as i64)
}

pub fn to_i32(value: &Scalar) -> Result<i32> {
    i32::try_from(to_i64(value)?).map_err(|_| out_of_range(value, "INT"))
}

pub fn to_i16(value: &Scalar) -> Result<i16> {
    i16::try_from(to_i64(value)?).map_err(|_| out_of_range(value, "SMALLINT"))
}

pub fn to_i8(value: &Scalar) -> Result<i8> {
    i8::try_from(to_i64(value)?).map_err(|_| out_of_range(value, "TINYINT"))
}

pub fn to_f64(value: &Scalar) -> Result<f64> {
    match value {
        Scalar::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Scalar::TinyInt(v) => Ok(f64::from(*v)),
        Scalar::SmallInt(v) => Ok(f64::from(*v)),
        Scalar::Int(v) => Ok(f64::from(*v)),
        Scalar::BigInt(v) => Ok(*v as f64),
        Scalar::Float(v) => Ok(f64::from(*v)),
        Scalar::Double(v) => Ok(*v),
        Scalar::Decimal(d) => d.to_f64().ok_or_else(|| out_of_range(value, "DOUBLE")),
        Scalar::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| CursorError::conversion(s, "DOUBLE", e)),
        _ => Err(unsupported(value, "DOUBLE")),
    }
}

pub fn to_f32(value: &Scalar) -> Result<f32> {
    match value {
        Scalar::Float(v) => Ok(*v),
        Scalar::String(s) => s
            .trim()
            .parse::<f32>()
            .map_err(|e| CursorError::conversion(s, "FLOAT", e)),
        other => to_f64(other).map(|v| v as f32),
    }
}

fn truncate(d: &BigDecimal) -> BigDecimal {
    d.with_scale_round(0, RoundingMode::Down)
}

fn float_to_decimal(value: &Scalar, text: &str) -> Result<BigDecimal> {
    BigDecimal::from_str(text).map_err(|e| CursorError::conversion(value, "DECIMAL", e))
}

pub fn to_decimal(value: &Scalar) -> Result<BigDecimal> {
    match value {
        Scalar::Boolean(b) => Ok(BigDecimal::from(u8::from(*b))),
        Scalar::TinyInt(v) => Ok(BigDecimal::from(*v)),
        Scalar::SmallInt(v) => Ok(BigDecimal::from(*v)),
        Scalar::Int(v) => Ok(BigDecimal::from(*v)),
        Scalar::BigInt(v) => Ok(BigDecimal::from(*v)),
        // Shortest round-trip text, so 0.1 stays 0.1 rather than its binary expansion.
        Scalar::Float(v) => float_to_decimal(value, &v.to_string()),
        Scalar::Double(v) => float_to_decimal(value, &v.to_string()),
        Scalar::Decimal(d) => Ok(d.clone()),
        Scalar::String(s) => parse_decimal(s.trim()),
        _ => Err(unsupported(value, "DECIMAL")),
    }
}

/// Natural text form of any scalar.
pub fn to_string(value: &Scalar) -> String {
    match value {
        Scalar::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn to_bytes(value: &Scalar) -> Result<Vec<u8>> {
    match value {
        Scalar::Binary(b) => Ok(b.clone()),
        Scalar::String(s) => Ok(s.as_bytes().to_vec()),
        _ => Err(unsupported(value, "BINARY")),
    }
}

/// Integers read as epoch days; timestamps keep their date.
pub fn to_date(value: &Scalar) -> Result<NaiveDate> {
    match value {
        Scalar::Date(d) => Ok(*d),
        Scalar::Timestamp(ts) => Ok(ts.date()),
        Scalar::String(s) => {
            let s = s.trim();
            parse_date(s).or_else(|e| parse_timestamp(s).map(|ts| ts.date()).map_err(|_| e))
        }
        Scalar::TinyInt(_) | Scalar::SmallInt(_) | Scalar::Int(_) | Scalar::BigInt(_) => {
            let days = to_i64(value)?;
            TimeDelta::try_days(days)
                .and_then(|delta| epoch_day().checked_add_signed(delta))
                .ok_or_else(|| out_of_range(value, "DATE"))
        }
        _ => Err(unsupported(value, "DATE")),
    }
}

/// Timestamps keep only their time of day.
pub fn to_time(value: &Scalar) -> Result<NaiveTime> {
    match value {
        Scalar::Time(t) => Ok(*t),
        Scalar::Timestamp(ts) => Ok(ts.time()),
        Scalar::String(s) => {
            let s = s.trim();
            parse_time(s).or_else(|e| parse_timestamp(s).map(|ts| ts.time()).map_err(|_| e))
        }
        Scalar::BigInt(_) | Scalar::Int(_) => to_timestamp(value).map(|ts| ts.time()),
        _ => Err(unsupported(value, "TIME")),
    }
}

/// Integers read as epoch milliseconds; dates start at midnight.
pub fn to_timestamp(value: &Scalar) -> Result<NaiveDateTime> {
    match value {
        Scalar::Timestamp(ts) => Ok(*ts),
        Scalar::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
        Scalar::String(s) => {
            let s = s.trim();
            parse_timestamp(s).or_else(|e| parse_date(s).map(|d| d.and_time(NaiveTime::MIN)).map_err(|_| e))
        }
        Scalar::TinyInt(_) | Scalar::SmallInt(_) | Scalar::Int(_) | Scalar::BigInt(_) => {
            DateTime::from_timestamp_millis(to_i64(value)?)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| out_of_range(value, "TIMESTAMP"))
        }
        _ => Err(unsupported(value, "TIMESTAMP")),
    }
}

fn epoch_day() -> NaiveDate {
    DateTime::<Utc>::UNIX_EPOCH.date_naive()
}
