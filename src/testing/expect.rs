//! Expectation matching against JSON responses
//!
//! Objects match as a subset (extra keys in the actual value are fine),
//! arrays must have the same length, scalars must be equal. Any node can be
//! replaced by `{"$expect": "<predicate>"}` (or a list of predicates)
//! evaluated with `val` bound to the actual value at that position.

use serde_json::Value;

use crate::common::{Error, Result};
use crate::expr::{evaluate_predicate, type_name, values_equal};

/// Key marking a predicate node in an expectation template
pub const EXPECT_KEY: &str = "$expect";

/// Check `actual` against an expectation template
pub fn check_result(actual: &Value, expected: &Value) -> Result<()> {
    check(actual, expected, "")
}

fn check(actual: &Value, expected: &Value, path: &str) -> Result<()> {
    if let Value::Object(template) = expected {
        if let Some(predicates) = template.get(EXPECT_KEY) {
            return check_predicates(actual, predicates, path);
        }
    }

    if type_name(actual) != type_name(expected) {
        return Err(Error::expectation_at(
            format!(
                "Wrong type. Got {}, expected {}",
                type_name(actual),
                type_name(expected)
            ),
            path,
        ));
    }

    match (actual, expected) {
        (Value::Object(actual), Value::Object(expected)) => {
            for (key, value) in expected {
                match actual.get(key) {
                    None | Some(Value::Null) => {
                        return Err(Error::expectation_at(format!("Missing key '{}'", key), path))
                    }
                    Some(child) => check(child, value, &format!("{}.{}", path, key))?,
                }
            }
            Ok(())
        }
        (Value::Array(actual), Value::Array(expected)) => {
            if actual.len() != expected.len() {
                return Err(Error::expectation_at(
                    format!(
                        "Wrong length. Got {}, expected {}",
                        actual.len(),
                        expected.len()
                    ),
                    path,
                ));
            }
            for (i, (left, right)) in actual.iter().zip(expected).enumerate() {
                check(left, right, &format!("{}[{}]", path, i))?;
            }
            Ok(())
        }
        _ if values_equal(actual, expected) => Ok(()),
        _ => Err(Error::expectation_at(
            format!("Expected {}, got {}", expected, actual),
            path,
        )),
    }
}

fn check_predicates(actual: &Value, predicates: &Value, path: &str) -> Result<()> {
    let predicates: Vec<&str> = match predicates {
        Value::String(p) => vec![p.as_str()],
        Value::Array(items) => items
            .iter()
            .map(|p| {
                p.as_str().ok_or_else(|| {
                    Error::expectation_at(format!("{} entries must be strings", EXPECT_KEY), path)
                })
            })
            .collect::<Result<_>>()?,
        other => {
            return Err(Error::expectation_at(
                format!("{} must be a string or a list of strings, got {}", EXPECT_KEY, other),
                path,
            ))
        }
    };

    for predicate in predicates {
        let holds = evaluate_predicate(predicate, actual).map_err(|e| {
            Error::expectation_at(format!("Could not evaluate expectation: {}", e), path)
        })?;
        if !holds {
            return Err(Error::expectation_at(
                format!("Failed to meet expectation '{}' (value: {})", predicate, actual),
                path,
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(result: Result<()>) -> String {
        match result {
            Err(Error::Expectation(msg)) => msg,
            other => panic!("Expected an expectation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_subset_matching_on_objects() {
        let actual = json!({"num_hits": 3, "hits": [], "elapsed_time_micros": 1234});
        assert!(check_result(&actual, &json!({"num_hits": 3})).is_ok());
        assert!(check_result(&actual, &json!({})).is_ok());
    }

    #[test]
    fn test_missing_and_null_keys() {
        let actual = json!({"a": {"b": null}});
        let msg = message(check_result(&actual, &json!({"a": {"c": 1}})));
        assert!(msg.contains("Missing key 'c'"));
        assert!(msg.contains("'.a'"));
        let msg = message(check_result(&actual, &json!({"a": {"b": 1}})));
        assert!(msg.contains("Missing key 'b'"));
    }

    #[test]
    fn test_arrays_need_exact_length() {
        let actual = json!({"hits": [1, 2, 3]});
        let msg = message(check_result(&actual, &json!({"hits": [1, 2]})));
        assert!(msg.contains("Wrong length"));
        assert!(msg.contains("'.hits'"));
        assert!(check_result(&actual, &json!({"hits": [1, 2, 3]})).is_ok());
    }

    #[test]
    fn test_array_elements_match_as_subsets() {
        let actual = json!([{"id": 1, "title": "a"}, {"id": 2, "title": "b"}]);
        assert!(check_result(&actual, &json!([{"id": 1}, {"id": 2}])).is_ok());
        let msg = message(check_result(&actual, &json!([{"id": 1}, {"id": 3}])));
        assert!(msg.contains("'[1].id'"));
    }

    #[test]
    fn test_type_mismatch() {
        let msg = message(check_result(&json!({"a": "1"}), &json!({"a": 1})));
        assert!(msg.contains("Wrong type. Got string, expected number"));
    }

    #[test]
    fn test_scalars() {
        assert!(check_result(&json!(1.0), &json!(1)).is_ok());
        assert!(check_result(&json!(true), &json!(true)).is_ok());
        let msg = message(check_result(&json!("x"), &json!("y")));
        assert!(msg.contains("Expected \"y\", got \"x\""));
    }

    #[test]
    fn test_predicate_escape() {
        assert!(check_result(&json!(5), &json!({"$expect": "val > 0"})).is_ok());
        let msg = message(check_result(&json!({"n": -1}), &json!({"n": {"$expect": "val > 0"}})));
        assert!(msg.contains("val > 0"));
        assert!(msg.contains("'.n'"));
    }

    #[test]
    fn test_predicate_list_checks_every_entry() {
        let template = json!({"$expect": ["len(val) == 2", "val[0] == 'a'", "val[1] == 'c'"]});
        let msg = message(check_result(&json!(["a", "b"]), &template));
        assert!(msg.contains("val[1] == 'c'"));
    }

    #[test]
    fn test_predicate_skips_structural_comparison() {
        // the predicate node is an object but the actual value is an array
        assert!(check_result(&json!([1, 2]), &json!({"$expect": "len(val) == 2"})).is_ok());
    }

    #[test]
    fn test_matching_does_not_mutate_actual() {
        let actual = json!({"a": [1, {"b": 2}]});
        let before = actual.clone();
        let _ = check_result(&actual, &json!({"a": [1, {"b": 3}]}));
        assert_eq!(actual, before);
    }

    #[test]
    fn test_predicate_errors_are_failures() {
        let msg = message(check_result(&json!({}), &json!({"$expect": "val['x'] > 1"})));
        assert!(msg.contains("Could not evaluate"));
    }
}
