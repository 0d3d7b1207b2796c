//! Field extraction helpers for loosely-typed venue JSON.
//!
//! Venues send numbers either as JSON strings or JSON numbers, sometimes
//! both for the same field across endpoints.

use super::DataSourceError;
use crate::domain::Decimal;
use serde_json::Value;

fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Decimal::from_str_canonical(s).ok(),
        Value::Number(n) => Decimal::from_str_canonical(&n.to_string()).ok(),
        _ => None,
    }
}

/// Required decimal field.
pub fn decimal_field(obj: &Value, key: &str) -> Result<Decimal, DataSourceError> {
    let value = obj
        .get(key)
        .ok_or_else(|| DataSourceError::ParseError(format!("Missing {} field", key)))?;
    as_decimal(value).ok_or_else(|| DataSourceError::ParseError(format!("Invalid {}: {}", key, value)))
}

/// Optional decimal field; absent, null, empty and unparsable all give None.
pub fn opt_decimal_field(obj: &Value, key: &str) -> Option<Decimal> {
    obj.get(key).and_then(as_decimal)
}

/// Optional integer field given as a number or numeric string.
pub fn opt_i64_field(obj: &Value, key: &str) -> Option<i64> {
    match obj.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Required integer field given as a number or numeric string.
pub fn i64_field(obj: &Value, key: &str) -> Result<i64, DataSourceError> {
    opt_i64_field(obj, key).ok_or_else(|| DataSourceError::ParseError(format!("Missing {} field", key)))
}

pub fn str_field<'a>(obj: &'a Value, key: &str) -> Result<&'a str, DataSourceError> {
    obj.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| DataSourceError::ParseError(format!("Missing {} field", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decimal_from_string_or_number() {
        let obj = json!({"a": "1.5", "b": 2.25, "c": "", "d": null, "e": "x"});
        assert_eq!(decimal_field(&obj, "a").unwrap(), Decimal::from_str_canonical("1.5").unwrap());
        assert_eq!(decimal_field(&obj, "b").unwrap(), Decimal::from_str_canonical("2.25").unwrap());
        assert_eq!(opt_decimal_field(&obj, "c"), None);
        assert_eq!(opt_decimal_field(&obj, "d"), None);
        assert!(matches!(decimal_field(&obj, "e"), Err(DataSourceError::ParseError(_))));
        assert!(matches!(decimal_field(&obj, "z"), Err(DataSourceError::ParseError(_))));
    }

    #[test]
    fn test_i64_from_string_or_number() {
        let obj = json!({"a": "1700000000000", "b": 42, "c": "soon"});
        assert_eq!(i64_field(&obj, "a").unwrap(), 1_700_000_000_000);
        assert_eq!(i64_field(&obj, "b").unwrap(), 42);
        assert_eq!(opt_i64_field(&obj, "c"), None);
    }
}
