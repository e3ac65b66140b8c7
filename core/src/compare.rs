//! Structural, type-tolerant equality between an actual and an expected
//! JSON value.

use polyrun_webclient::Value;

/// Absolute tolerance for numeric equality.
pub const FLOAT_TOLERANCE: f64 = 1e-4;

/// `null`, `"null"` and `"None"` all mean "no value".
fn is_null_like(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => matches!(s.trim(), "null" | "None"),
        _ => false,
    }
}

pub fn compare(actual: &Value, expected: &Value) -> bool {
    match (is_null_like(actual), is_null_like(expected)) {
        (true, true) => return true,
        (true, false) | (false, true) => return false,
        (false, false) => {}
    }

    match (actual, expected) {
        (Value::String(a), Value::String(b)) => a.trim() == b.trim(),
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => (a - b).abs() <= FLOAT_TOLERANCE,
            _ => a == b,
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| compare(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, x)| b.get(key).map_or(false, |y| compare(x, y)))
        }
        _ => actual == expected,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_equivalence() {
        assert!(compare(&Value::Null, &json!("null")));
        assert!(compare(&json!("None"), &Value::Null));
        assert!(compare(&json!(" None "), &json!("null")));
        assert!(!compare(&Value::Null, &json!(0)));
        assert!(!compare(&json!([]), &Value::Null));
    }

    #[test]
    fn numbers_within_tolerance() {
        assert!(compare(&json!(5), &json!(5.00005)));
        assert!(!compare(&json!(5), &json!(5.01)));
        assert!(compare(&json!(-0.1), &json!(-0.10001)));
        assert!(compare(&json!(u64::MAX), &json!(u64::MAX)));
    }

    #[test]
    fn strings_are_trimmed() {
        assert!(compare(&json!("abc\n"), &json!("  abc")));
        assert!(!compare(&json!("abc"), &json!("ABC")));
        assert!(!compare(&json!("5"), &json!(5)));
    }

    #[test]
    fn arrays_are_ordered() {
        assert!(compare(&json!([1, 2]), &json!([1, 2])));
        assert!(!compare(&json!([1, 2]), &json!([2, 1])));
        assert!(!compare(&json!([1, 2]), &json!([1, 2, 3])));
        assert!(compare(&json!([[1.00001], ["x "]]), &json!([[1], ["x"]])));
    }

    #[test]
    fn objects_ignore_key_order() {
        assert!(compare(&json!({"a": 1, "b": 2}), &json!({"b": 2, "a": 1})));
        assert!(!compare(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!compare(&json!({"a": 1, "c": 2}), &json!({"a": 1, "b": 2})));
        assert!(compare(&json!({"a": {"b": null}}), &json!({"a": {"b": "None"}})));
    }

    #[test]
    fn mismatched_types_fall_back_to_equality() {
        assert!(compare(&json!(true), &json!(true)));
        assert!(!compare(&json!(true), &json!(1)));
        assert!(!compare(&json!({}), &json!([])));
    }
}
