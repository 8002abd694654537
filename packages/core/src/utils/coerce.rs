//! Wire-boundary coercion
//!
//! Pure helpers that normalize what the graph session hands back (wrapped
//! 64-bit integers, stringified dates) and check values against declared
//! property types.

use crate::models::{PropertyType, ValidationError, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value as Json};

/// Check `value` against `declared`, returning it (possibly coerced).
///
/// Null is always accepted so optional properties short-circuit. A string
/// supplied for a `Date` property is parsed into a date; that is the only
/// coercion performed. Anything else that does not match is a
/// [`ValidationError::TypeMismatch`].
pub fn check_type(name: &str, value: Value, declared: PropertyType) -> Result<Value, ValidationError> {
    if value.is_null() || declared.matches(&value) {
        return Ok(value);
    }

    if declared == PropertyType::Date {
        if let Value::String(raw) = &value {
            if let Some(date) = parse_date(raw) {
                return Ok(Value::Date(date));
            }
        }
    }

    Err(ValidationError::type_mismatch(name, declared, value.type_name()))
}

/// Parse the date shapes that show up on the wire.
///
/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS[.fff]` (taken as UTC) and
/// plain `YYYY-MM-DD` (midnight UTC).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Decode a wire integer: either a plain JSON number or a `{low, high}` pair.
///
/// `low` and `high` are the signed 32-bit halves of a 64-bit integer.
pub fn wire_integer(value: &Json) -> Option<i64> {
    match value {
        Json::Number(n) => n.as_i64(),
        Json::Object(map) if is_wrapped_integer(map) => {
            let low = map.get("low").and_then(Json::as_i64)?;
            let high = map.get("high").and_then(Json::as_i64)?;
            Some((high << 32) | (low as u32 as i64))
        }
        _ => None,
    }
}

fn is_wrapped_integer(map: &Map<String, Json>) -> bool {
    map.len() == 2
        && map.get("low").is_some_and(Json::is_i64)
        && map.get("high").is_some_and(Json::is_i64)
}

/// Unwrap `{low, high}` integers in place.
///
/// Every top-level property is unwrapped; arrays are unwrapped element-wise,
/// best-effort (elements that are not wrapped integers are left alone).
pub fn flatten_numeric_properties(properties: &mut Map<String, Json>) {
    for value in properties.values_mut() {
        if let Some(n) = unwrap_integer(value) {
            *value = Json::from(n);
            continue;
        }
        if let Json::Array(items) = value {
            for item in items.iter_mut() {
                if let Some(n) = unwrap_integer(item) {
                    *item = Json::from(n);
                }
            }
        }
    }
}

fn unwrap_integer(value: &Json) -> Option<i64> {
    match value {
        Json::Object(map) if is_wrapped_integer(map) => wire_integer(value),
        _ => None,
    }
}
