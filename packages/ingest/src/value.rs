//! Lenient scalar extraction from JSON property values.
//!
//! Census exports are inconsistent about types: ids and zipcodes show up
//! both as numbers and as strings depending on the export tool.

use serde_json::Value;

/// Reads an integer from a number (integral floats included) or a numeric
/// string.
#[allow(clippy::cast_possible_truncation)]
pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

/// Reads a float from a number or a numeric string.
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Reads a non-empty string; numbers are rendered as text.
pub fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads a boolean from `true`/`false`, `0`/`1`, or their string forms.
pub fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reads_ids_from_numbers_and_strings() {
        assert_eq!(as_i64(&json!(180683)), Some(180_683));
        assert_eq!(as_i64(&json!(180683.0)), Some(180_683));
        assert_eq!(as_i64(&json!("180683")), Some(180_683));
        assert_eq!(as_i64(&json!(1.5)), None);
        assert_eq!(as_i64(&json!(null)), None);
    }

    #[test]
    fn renders_numeric_zipcodes_as_text() {
        assert_eq!(as_string(&json!(11375)), Some("11375".to_string()));
        assert_eq!(as_string(&json!(" 11375 ")), Some("11375".to_string()));
        assert_eq!(as_string(&json!("")), None);
    }

    #[test]
    fn reads_flexible_booleans() {
        assert_eq!(as_bool(&json!(true)), Some(true));
        assert_eq!(as_bool(&json!(0)), Some(false));
        assert_eq!(as_bool(&json!("True")), Some(true));
        assert_eq!(as_bool(&json!("maybe")), None);
    }

    #[test]
    fn reads_numeric_strings_as_floats() {
        assert_eq!(as_f64(&json!("3")), Some(3.0));
        assert_eq!(as_f64(&json!(2.5)), Some(2.5));
        assert_eq!(as_f64(&json!([1])), None);
    }
}
