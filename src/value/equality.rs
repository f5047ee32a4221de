//! Deep structural equality over JSON slots.

use serde_json::{Number, Value};

/// Equality contract supplied to a record at creation
pub type Equality = fn(Option<&Value>, Option<&Value>) -> bool;

/// Default equality contract.
///
/// - two absent slots are equal, one absent slot is unequal
/// - arrays compare element-wise, objects compare by key set and per-key value
/// - numbers compare by numeric value, so `1` equals `1.0`
/// - everything else compares strictly
pub fn deep_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            if std::ptr::eq(a, b) {
                return true;
            }
            values_equal(a, b)
        }
        _ => false,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        _ => a == b,
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    if x == y {
        return true;
    }
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a == b;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_handling() {
        assert!(deep_equal(None, None));
        assert!(!deep_equal(None, Some(&json!(1))));
        assert!(!deep_equal(Some(&json!({})), None));
    }

    #[test]
    fn test_nested_structures() {
        let a = json!({"theme": {"colors": ["red", "blue"], "size": 16}, "on": true});
        let b = json!({"on": true, "theme": {"size": 16, "colors": ["red", "blue"]}});
        assert!(deep_equal(Some(&a), Some(&b)));

        let c = json!({"on": true, "theme": {"size": 16, "colors": ["blue", "red"]}});
        assert!(!deep_equal(Some(&a), Some(&c)));
    }

    #[test]
    fn test_numbers_compare_by_value() {
        assert!(deep_equal(Some(&json!(1)), Some(&json!(1.0))));
        assert!(!deep_equal(Some(&json!(1)), Some(&json!(1.5))));
        assert!(!deep_equal(Some(&json!(1)), Some(&json!("1"))));
    }

    #[test]
    fn test_extra_key_is_unequal() {
        let a = json!({"a": 1});
        let b = json!({"a": 1, "b": null});
        assert!(!deep_equal(Some(&a), Some(&b)));
    }
}
