use std::fmt::{self, Write};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use enum_as_inner::EnumAsInner;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ast::DataType;

/// A runtime value, used for constants in a plan, for parameter bindings and
/// for decoded results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumAsInner, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Exact numeric kept in its textual form.
    Decimal(String),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<FixedOffset>),
    Interval(Interval),
    Point(Point),
    Json(serde_json::Value),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Calendar interval split the way Postgres stores it: months and days do not
/// have a fixed length, so they are kept apart from the time component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Interval {
    pub months: i32,
    pub days: i32,
    pub micros: i64,
}

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_MINUTE: i64 = 60 * MICROS_PER_SECOND;
const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MINUTE;

impl Value {
    /// The type a value implies when no type was declared.
    pub fn implied_type(&self) -> Option<DataType> {
        Some(match self {
            Value::Null => return None,
            Value::Bool(_) => DataType::Boolean,
            Value::Int(_) => DataType::BigInt,
            Value::UInt(_) => DataType::UnsignedBigInt,
            Value::Float(_) => DataType::Double,
            Value::Decimal(_) => DataType::Decimal {
                precision: None,
                scale: None,
            },
            Value::Text(_) => DataType::Text,
            Value::Bytes(_) => DataType::Bytes,
            Value::Date(_) => DataType::Date,
            Value::Time(_) => DataType::Time,
            Value::Timestamp(_) => DataType::Timestamp,
            Value::TimestampTz(_) => DataType::TimestampTz,
            Value::Interval(_) => DataType::Interval,
            Value::Point(_) => DataType::Point,
            Value::Json(_) | Value::Object(_) => DataType::Json,
            Value::Array(items) => DataType::Array(Box::new(
                items
                    .iter()
                    .find_map(|v| v.implied_type())
                    .unwrap_or(DataType::Text),
            )),
        })
    }

    pub fn array<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Value {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    pub fn from_json(json: serde_json::Value) -> Value {
        use serde_json::Value as J;
        match json {
            J::Null => Value::Null,
            J::Bool(b) => Value::Bool(b),
            J::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            J::String(s) => Value::Text(s),
            J::Array(items) => Value::Array(items.into_iter().map(Value::from_json).collect()),
            J::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            Value::Null => J::Null,
            Value::Bool(b) => J::Bool(*b),
            Value::Int(i) => J::from(*i),
            Value::UInt(u) => J::from(*u),
            Value::Float(f) => J::from(*f),
            Value::Decimal(d) => J::String(d.clone()),
            Value::Text(s) => J::String(s.clone()),
            Value::Bytes(b) => J::String(hex_encode(b)),
            Value::Date(d) => J::String(d.to_string()),
            Value::Time(t) => J::String(t.to_string()),
            Value::Timestamp(ts) => J::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            Value::TimestampTz(ts) => J::String(ts.to_rfc3339()),
            Value::Interval(i) => J::String(i.to_string()),
            Value::Point(p) => serde_json::json!({ "x": p.x, "y": p.y }),
            Value::Json(j) => j.clone(),
            Value::Array(items) => J::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => J::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

pub(crate) fn hex_decode(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(text.get(i..i + 2)?, 16).ok())
        .collect()
}

impl Interval {
    pub fn new(months: i32, days: i32, micros: i64) -> Self {
        Interval {
            months,
            days,
            micros,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.months == 0 && self.days == 0 && self.micros == 0
    }

    /// Parses the Postgres `postgres` interval output style
    /// (`1 year 2 mons 3 days 04:05:06.5`) as well as ISO 8601 durations
    /// (`P1Y2M3DT4H5M6S`).
    pub fn parse(text: &str) -> Option<Interval> {
        let text = text.trim();
        if let Some(rest) = text.strip_prefix('P') {
            return Self::parse_iso(rest);
        }

        let mut interval = Interval::default();
        let mut tokens = text.split_whitespace();
        let mut seen = false;
        while let Some(token) = tokens.next() {
            seen = true;
            if token.contains(':') {
                interval.micros += parse_clock(token)?;
                continue;
            }
            let amount: f64 = token.parse().ok()?;
            let unit = tokens.next()?.trim_end_matches(',').to_ascii_lowercase();
            let unit = unit.trim_end_matches('s');
            match unit {
                "year" => interval.months += (amount * 12.0) as i32,
                "mon" | "month" => interval.months += amount as i32,
                "week" => interval.days += (amount * 7.0) as i32,
                "day" => interval.days += amount as i32,
                "hour" => interval.micros += (amount * MICROS_PER_HOUR as f64) as i64,
                "min" | "minute" => interval.micros += (amount * MICROS_PER_MINUTE as f64) as i64,
                "sec" | "second" => interval.micros += (amount * MICROS_PER_SECOND as f64) as i64,
                _ => return None,
            }
        }
        seen.then_some(interval)
    }

    fn parse_iso(text: &str) -> Option<Interval> {
        let mut interval = Interval::default();
        let mut in_time = false;
        let mut number = String::new();
        for c in text.chars() {
            match c {
                'T' => in_time = true,
                '0'..='9' | '.' | '-' => number.push(c),
                unit => {
                    let amount: f64 = number.parse().ok()?;
                    number.clear();
                    match (in_time, unit) {
                        (false, 'Y') => interval.months += (amount * 12.0) as i32,
                        (false, 'M') => interval.months += amount as i32,
                        (false, 'W') => interval.days += (amount * 7.0) as i32,
                        (false, 'D') => interval.days += amount as i32,
                        (true, 'H') => interval.micros += (amount * MICROS_PER_HOUR as f64) as i64,
                        (true, 'M') => {
                            interval.micros += (amount * MICROS_PER_MINUTE as f64) as i64
                        }
                        (true, 'S') => {
                            interval.micros += (amount * MICROS_PER_SECOND as f64) as i64
                        }
                        _ => return None,
                    }
                }
            }
        }
        number.is_empty().then_some(interval)
    }
}

fn parse_clock(token: &str) -> Option<i64> {
    let (negative, token) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let mut parts = token.split(':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next().unwrap_or("0").parse().ok()?;
    let micros = hours * MICROS_PER_HOUR
        + minutes * MICROS_PER_MINUTE
        + (seconds * MICROS_PER_SECOND as f64).round() as i64;
    Some(if negative { -micros } else { micros })
}

impl fmt::Display for Interval {
    /// Formats like Postgres' default `IntervalStyle`, so the text is accepted
    /// back by [Interval::parse] and by Postgres itself.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        let (years, months) = (self.months / 12, self.months % 12);
        if years != 0 {
            parts.push(format!("{years} year{}", plural(years as i64)));
        }
        if months != 0 {
            parts.push(format!("{months} mon{}", plural(months as i64)));
        }
        if self.days != 0 {
            parts.push(format!("{} day{}", self.days, plural(self.days as i64)));
        }
        if self.micros != 0 || parts.is_empty() {
            let sign = if self.micros < 0 { "-" } else { "" };
            let micros = self.micros.abs();
            let hours = micros / MICROS_PER_HOUR;
            let minutes = (micros % MICROS_PER_HOUR) / MICROS_PER_MINUTE;
            let seconds = (micros % MICROS_PER_MINUTE) / MICROS_PER_SECOND;
            let fraction = micros % MICROS_PER_SECOND;
            let mut clock = format!("{sign}{hours:02}:{minutes:02}:{seconds:02}");
            if fraction != 0 {
                let digits = format!("{fraction:06}");
                clock.push('.');
                clock.push_str(digits.trim_end_matches('0'));
            }
            parts.push(clock);
        }
        f.write_str(&parts.join(" "))
    }
}

fn plural(n: i64) -> &'static str {
    if n.abs() == 1 {
        ""
    } else {
        "s"
    }
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::UInt(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<NaiveTime> for Value {
    fn from(value: NaiveTime) -> Self {
        Value::Time(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::Timestamp(value)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Value::TimestampTz(value)
    }
}

impl From<Interval> for Value {
    fn from(value: Interval) -> Self {
        Value::Interval(value)
    }
}

impl From<Point> for Value {
    fn from(value: Point) -> Self {
        Value::Point(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::Json(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("1 year 2 mons 3 days 04:05:06", Interval::new(14, 3, 14_706_000_000))]
    #[case("3 days", Interval::new(0, 3, 0))]
    #[case("-00:00:01.5", Interval::new(0, 0, -1_500_000))]
    #[case("P1Y2M3DT4H5M6S", Interval::new(14, 3, 14_706_000_000))]
    #[case("PT0.25S", Interval::new(0, 0, 250_000))]
    fn test_interval_parse(#[case] text: &str, #[case] expected: Interval) {
        assert_eq!(Interval::parse(text), Some(expected));
    }

    #[test]
    fn test_interval_display() {
        assert_eq!(
            Interval::new(14, 3, 14_706_000_000).to_string(),
            "1 year 2 mons 3 days 04:05:06"
        );
        assert_eq!(Interval::new(0, 0, 1_500_000).to_string(), "00:00:01.5");
        assert_eq!(Interval::default().to_string(), "00:00:00");

        let i = Interval::new(-25, 1, -61_000_000);
        assert_eq!(Interval::parse(&i.to_string()), Some(i));
    }

    #[test]
    fn test_object_to_json_keeps_key_order() {
        let row = Value::Object(IndexMap::from([
            ("name".to_string(), Value::Text("Ann".to_string())),
            ("id".to_string(), Value::Int(1)),
            ("books".to_string(), Value::Array(vec![])),
        ]));
        assert_eq!(row.to_json().to_string(), r#"{"name":"Ann","id":1,"books":[]}"#);
        assert!(Value::Null.is_null());
    }

    #[test]
    fn test_interval_rejects_garbage() {
        assert_eq!(Interval::parse(""), None);
        assert_eq!(Interval::parse("3 fortnights"), None);
        assert_eq!(Interval::parse("P3"), None);
    }

    #[test]
    fn test_hex() {
        assert_eq!(hex_encode(&[0xde, 0xad, 0x01]), "dead01");
        assert_eq!(hex_decode("DEAD01"), Some(vec![0xde, 0xad, 0x01]));
        assert_eq!(hex_decode("abc"), None);
    }

    #[test]
    fn test_json_conversion() {
        let json = serde_json::json!({"a": [1, "x", null], "b": 1.5});
        let value = Value::from_json(json.clone());
        assert_eq!(
            value,
            Value::Object(IndexMap::from([
                (
                    "a".to_string(),
                    Value::Array(vec![Value::Int(1), Value::Text("x".into()), Value::Null])
                ),
                ("b".to_string(), Value::Float(1.5)),
            ]))
        );
        assert_eq!(value.to_json(), json);
    }
}
