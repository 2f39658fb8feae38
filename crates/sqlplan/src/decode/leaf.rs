//! Re-typing of single values toward a declared [DataType].
//!
//! Drivers hand back values in whatever form the wire protocol or the JSON
//! encoding of a nested sub-query produced: timestamps as text, booleans as
//! `0`/`1`, points as `(x,y)`, bytes as hex. Every conversion here accepts a
//! value that already has the target type unchanged, so decoding twice is the
//! same as decoding once.
use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;

use crate::ast::{hex_decode, DataType, Interval, Point, Value};
use crate::{DetectOptions, Error, Reason, Result};

/// Converts `value` toward `data_type`. Used when binding parameters and when
/// decoding typed columns.
pub(crate) fn coerce(value: Value, data_type: &DataType) -> Result<Value> {
    if value.is_null() {
        return Ok(value);
    }
    let converted = match data_type {
        DataType::Boolean => to_bool(&value).map(Value::Bool),
        DataType::SmallInt | DataType::Integer | DataType::BigInt => to_int(&value).map(Value::Int),
        DataType::UnsignedInteger | DataType::UnsignedBigInt => to_uint(&value).map(Value::UInt),
        DataType::Real | DataType::Double => to_float(&value).map(Value::Float),
        DataType::Decimal { .. } => to_decimal(&value).map(Value::Decimal),
        DataType::Text | DataType::Varchar(_) | DataType::Uuid => to_text(&value).map(Value::Text),
        DataType::Bytes => to_bytes(&value).map(Value::Bytes),
        DataType::Date => to_date(&value).map(Value::Date),
        DataType::Time => to_time(&value).map(Value::Time),
        DataType::Timestamp => to_timestamp(&value).map(Value::Timestamp),
        DataType::TimestampTz => to_timestamp_tz(&value).map(Value::TimestampTz),
        DataType::Interval => to_interval(&value).map(Value::Interval),
        DataType::Json => to_json(&value).map(Value::Json),
        DataType::Point => to_point(&value).map(Value::Point),
        DataType::Array(element) => return to_array(value, element),
        DataType::Custom(_) => return Ok(value),
    };

    converted.ok_or_else(|| {
        Error::new(Reason::Expected {
            who: None,
            expected: format!("a value of type {}", type_name(data_type)),
            found: describe(&value),
        })
    })
}

/// Re-types a value without a declared type, as far as the detection
/// options allow. Values that are not recognized are returned unchanged.
pub(crate) fn detect(column: &str, value: Value, options: &DetectOptions) -> Value {
    for detector in &options.custom {
        if let Some(detected) = detector.detect(column, &value) {
            return detected;
        }
    }

    let Value::Text(text) = &value else {
        return value;
    };
    let trimmed = text.trim();

    if options.json && (trimmed.starts_with('{') || trimmed.starts_with('[')) {
        if let Ok(json) = serde_json::from_str(trimmed) {
            return Value::Json(json);
        }
    }

    if options.date {
        if date_pattern().is_match(trimmed) {
            if let Some(date) = to_date(&value) {
                return Value::Date(date);
            }
        }
        if let Some(caps) = timestamp_pattern().captures(trimmed) {
            let detected = if caps.name("offset").is_some() {
                to_timestamp_tz(&value).map(Value::TimestampTz)
            } else {
                to_timestamp(&value).map(Value::Timestamp)
            };
            if let Some(detected) = detected {
                return detected;
            }
        }
    }
    value
}

fn date_pattern() -> &'static Regex {
    static DATE: OnceLock<Regex> = OnceLock::new();
    DATE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap())
}

fn timestamp_pattern() -> &'static Regex {
    static TIMESTAMP: OnceLock<Regex> = OnceLock::new();
    TIMESTAMP.get_or_init(|| {
        Regex::new(
            r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(?P<offset>Z|[+-]\d{2}(:?\d{2})?)?$",
        )
        .unwrap()
    })
}

fn type_name(data_type: &DataType) -> String {
    match data_type {
        DataType::Array(element) => format!("{}[]", type_name(element)),
        DataType::Custom(name) => name.clone(),
        other => {
            let name: &str = other.kind().into();
            name.to_lowercase()
        }
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Text(text) => format!("text `{text}`"),
        Value::Bytes(bytes) => format!("{} bytes", bytes.len()),
        Value::Json(json) => format!("json `{json}`"),
        other => format!("`{}`", other.to_json()),
    }
}

/// Numbers and text of a JSON value, so nested values decode the same way as
/// top-level ones.
fn from_json_scalar(value: &Value) -> Option<Value> {
    match value {
        Value::Json(json) => match json {
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
            scalar => Some(Value::from_json(scalar.clone())),
        },
        _ => None,
    }
}

fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Int(i) => Some(*i != 0),
        Value::UInt(u) => Some(*u != 0),
        Value::Text(text) | Value::Decimal(text) => match text.trim().to_ascii_lowercase().as_str() {
            "t" | "true" | "1" | "y" | "yes" => Some(true),
            "f" | "false" | "0" | "n" | "no" => Some(false),
            _ => None,
        },
        _ => from_json_scalar(value).and_then(|v| to_bool(&v)),
    }
}

fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::UInt(u) => i64::try_from(*u).ok(),
        Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
        Value::Bool(b) => Some(*b as i64),
        Value::Text(text) | Value::Decimal(text) => {
            let text = text.trim();
            text.parse()
                .ok()
                .or_else(|| text.strip_suffix(".0").and_then(|t| t.parse().ok()))
        }
        _ => from_json_scalar(value).and_then(|v| to_int(&v)),
    }
}

fn to_uint(value: &Value) -> Option<u64> {
    match value {
        Value::UInt(u) => Some(*u),
        Value::Int(i) => u64::try_from(*i).ok(),
        Value::Bool(b) => Some(*b as u64),
        Value::Text(text) | Value::Decimal(text) => text.trim().parse().ok(),
        _ => from_json_scalar(value).and_then(|v| to_uint(&v)),
    }
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Float(f) => Some(*f),
        Value::Int(i) => Some(*i as f64),
        Value::UInt(u) => Some(*u as f64),
        Value::Text(text) | Value::Decimal(text) => text.trim().parse().ok(),
        _ => from_json_scalar(value).and_then(|v| to_float(&v)),
    }
}

fn to_decimal(value: &Value) -> Option<String> {
    match value {
        Value::Decimal(text) => Some(text.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::UInt(u) => Some(u.to_string()),
        Value::Float(f) if f.is_finite() => Some(f.to_string()),
        Value::Text(text) => {
            let text = text.trim();
            text.parse::<f64>().ok().map(|_| text.to_string())
        }
        _ => from_json_scalar(value).and_then(|v| to_decimal(&v)),
    }
}

fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::Text(text) | Value::Decimal(text) => Some(text.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::UInt(u) => Some(u.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Json(serde_json::Value::String(text)) => Some(text.clone()),
        _ => None,
    }
}

fn to_bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Bytes(bytes) => Some(bytes.clone()),
        Value::Text(text) => {
            if let Some(hex) = text.strip_prefix("\\x") {
                return hex_decode(hex);
            }
            Some(hex_decode(text).unwrap_or_else(|| text.as_bytes().to_vec()))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| to_uint(item).and_then(|b| u8::try_from(b).ok()))
            .collect(),
        Value::Json(json) => to_bytes(&Value::from_json(json.clone())),
        _ => None,
    }
}

fn to_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(date) => Some(*date),
        Value::Timestamp(ts) => Some(ts.date()),
        Value::TimestampTz(ts) => Some(ts.date_naive()),
        Value::Text(text) => {
            let text = text.trim();
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .or_else(|| to_timestamp(value).map(|ts| ts.date()))
        }
        _ => from_json_scalar(value).and_then(|v| to_date(&v)),
    }
}

fn to_time(value: &Value) -> Option<NaiveTime> {
    match value {
        Value::Time(time) => Some(*time),
        Value::Timestamp(ts) => Some(ts.time()),
        Value::Text(text) => {
            let text = text.trim();
            NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
                .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
                .ok()
        }
        _ => from_json_scalar(value).and_then(|v| to_time(&v)),
    }
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn to_timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Timestamp(ts) => Some(*ts),
        Value::TimestampTz(ts) => Some(ts.naive_utc()),
        Value::Date(date) => date.and_hms_opt(0, 0, 0),
        Value::Text(text) => {
            let text = text.trim();
            NAIVE_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
                .or_else(|| parse_timestamp_tz(text).map(|ts| ts.naive_utc()))
                .or_else(|| NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?.and_hms_opt(0, 0, 0))
        }
        _ => from_json_scalar(value).and_then(|v| to_timestamp(&v)),
    }
}

fn to_timestamp_tz(value: &Value) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::TimestampTz(ts) => Some(*ts),
        Value::Timestamp(ts) => Some(Utc.from_utc_datetime(ts).fixed_offset()),
        Value::Date(_) => to_timestamp(value).map(|ts| Utc.from_utc_datetime(&ts).fixed_offset()),
        Value::Text(text) => {
            let text = text.trim();
            // text without an offset is taken as UTC
            parse_timestamp_tz(text).or_else(|| {
                to_timestamp(value).map(|ts| Utc.from_utc_datetime(&ts).fixed_offset())
            })
        }
        _ => from_json_scalar(value).and_then(|v| to_timestamp_tz(&v)),
    }
}

/// RFC 3339, and the Postgres text form with a short offset
/// (`2024-01-02 03:04:05.6+02`).
fn parse_timestamp_tz(text: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(text).ok().or_else(|| {
        ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"]
            .iter()
            .find_map(|f| DateTime::parse_from_str(text, f).ok())
    })
}

fn to_interval(value: &Value) -> Option<Interval> {
    match value {
        Value::Interval(interval) => Some(*interval),
        Value::Text(text) => Interval::parse(text),
        Value::Json(serde_json::Value::Object(map)) => {
            // node-postgres style { years, months, days, hours, minutes, seconds }
            let get = |key: &str| map.get(key).and_then(serde_json::Value::as_f64).unwrap_or(0.0);
            let micros = get("hours") * 3_600_000_000.0
                + get("minutes") * 60_000_000.0
                + get("seconds") * 1_000_000.0
                + get("milliseconds") * 1_000.0;
            Some(Interval::new(
                (get("years") * 12.0 + get("months")) as i32,
                get("days") as i32,
                micros as i64,
            ))
        }
        _ => from_json_scalar(value).and_then(|v| to_interval(&v)),
    }
}

fn to_json(value: &Value) -> Option<serde_json::Value> {
    match value {
        Value::Json(json) => Some(json.clone()),
        Value::Text(text) => serde_json::from_str(text).ok(),
        Value::Bytes(bytes) => serde_json::from_slice(bytes).ok(),
        other => Some(other.to_json()),
    }
}

fn to_point(value: &Value) -> Option<Point> {
    match value {
        Value::Point(point) => Some(*point),
        Value::Text(text) => parse_point_text(text.trim()),
        Value::Bytes(bytes) => parse_wkb(bytes),
        Value::Json(json) => point_from_json(json),
        Value::Object(_) => point_from_json(&value.to_json()),
        _ => None,
    }
}

/// `(x,y)`, `POINT(x y)`, or a JSON object.
fn parse_point_text(text: &str) -> Option<Point> {
    if text.starts_with('{') {
        return point_from_json(&serde_json::from_str(text).ok()?);
    }

    let upper = text.to_ascii_uppercase();
    let (inner, separator) = if let Some(rest) = upper.strip_prefix("POINT") {
        let rest = rest.trim_start();
        (rest.strip_prefix('(')?.strip_suffix(')')?.to_string(), ' ')
    } else {
        (text.strip_prefix('(')?.strip_suffix(')')?.to_string(), ',')
    };

    let mut coords = inner
        .split(separator)
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let x = coords.next()?.parse().ok()?;
    let y = coords.next()?.parse().ok()?;
    coords.next().is_none().then_some(Point::new(x, y))
}

/// `{x, y}` or a GeoJSON point.
fn point_from_json(json: &serde_json::Value) -> Option<Point> {
    let object = json.as_object()?;
    if let (Some(x), Some(y)) = (object.get("x"), object.get("y")) {
        return Some(Point::new(x.as_f64()?, y.as_f64()?));
    }
    if object.get("type")?.as_str()? != "Point" {
        return None;
    }
    let coordinates = object.get("coordinates")?.as_array()?;
    match coordinates.as_slice() {
        [x, y, ..] => Some(Point::new(x.as_f64()?, y.as_f64()?)),
        _ => None,
    }
}

/// Well-known binary, optionally prefixed by a 4 byte SRID as MySQL stores
/// geometry.
fn parse_wkb(bytes: &[u8]) -> Option<Point> {
    let wkb = match bytes.len() {
        21 => bytes,
        25 => &bytes[4..],
        _ => return None,
    };
    let little_endian = match wkb[0] {
        0 => false,
        1 => true,
        _ => return None,
    };
    let read_u32 = |b: &[u8]| -> Option<u32> {
        let b: [u8; 4] = b.try_into().ok()?;
        Some(if little_endian {
            u32::from_le_bytes(b)
        } else {
            u32::from_be_bytes(b)
        })
    };
    let read_f64 = |b: &[u8]| -> Option<f64> {
        let b: [u8; 8] = b.try_into().ok()?;
        Some(if little_endian {
            f64::from_le_bytes(b)
        } else {
            f64::from_be_bytes(b)
        })
    };

    // geometry type 1 is a point
    if read_u32(&wkb[1..5])? != 1 {
        return None;
    }
    Some(Point::new(read_f64(&wkb[5..13])?, read_f64(&wkb[13..21])?))
}

fn to_array(value: Value, element: &DataType) -> Result<Value> {
    let items = match value {
        Value::Array(items) => items,
        Value::Json(serde_json::Value::Array(items)) => {
            items.into_iter().map(Value::from_json).collect()
        }
        Value::Text(text) => {
            let trimmed = text.trim();
            if trimmed.starts_with('[') {
                let json: serde_json::Value = serde_json::from_str(trimmed).map_err(|e| {
                    Error::new(Reason::Expected {
                        who: None,
                        expected: "an array".to_string(),
                        found: e.to_string(),
                    })
                })?;
                return to_array(Value::Json(json), element);
            }
            parse_array_literal(trimmed).ok_or_else(|| {
                Error::new(Reason::Expected {
                    who: None,
                    expected: format!("an array of {}", type_name(element)),
                    found: describe(&Value::Text(text.clone())),
                })
            })?
        }
        other => {
            return Err(Error::new(Reason::Expected {
                who: None,
                expected: format!("an array of {}", type_name(element)),
                found: describe(&other),
            }))
        }
    };

    items
        .into_iter()
        .map(|item| coerce(item, element))
        .collect::<Result<_>>()
        .map(Value::Array)
}

/// The Postgres text form of a one-dimensional array, `{1,"a b",NULL}`.
fn parse_array_literal(text: &str) -> Option<Vec<Value>> {
    let inner = text.strip_prefix('{')?.strip_suffix('}')?;
    if inner.is_empty() {
        return Some(Vec::new());
    }

    let mut items = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut was_quoted = false;
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                quoted = !quoted;
                was_quoted = true;
            }
            '\\' if quoted => current.push(chars.next()?),
            ',' if !quoted => {
                items.push(array_item(std::mem::take(&mut current), was_quoted));
                was_quoted = false;
            }
            c => current.push(c),
        }
    }
    if quoted {
        return None;
    }
    items.push(array_item(current, was_quoted));
    Some(items)
}

fn array_item(text: String, quoted: bool) -> Value {
    if !quoted && text.eq_ignore_ascii_case("null") {
        Value::Null
    } else {
        Value::Text(text)
    }
}
