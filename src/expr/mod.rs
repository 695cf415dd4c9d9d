//! Sandboxed expression language used inside scenarios
//!
//! Scenarios embed small expressions in two places:
//! - `{"$previous": "<expr>"}` nodes in request arguments, evaluated with
//!   `val` bound to the previous step's result;
//! - `{"$expect": "<expr>"}` nodes in expectation templates, evaluated with
//!   `val` bound to the actual value at that position.
//!
//! The grammar is fixed (literals, indexing, arithmetic, comparisons, boolean
//! connectives and a handful of builtins). `val` is the only name in scope;
//! anything else is rejected before evaluation.

mod eval;
mod lexer;
mod parser;

use serde_json::Value;

use crate::common::{Error, Result};

pub use eval::{truthy, type_name, values_equal};

/// Key marking a node to replace with an expression over the previous result
pub const PREVIOUS_KEY: &str = "$previous";

fn compile(source: &str) -> Result<parser::Expr> {
    let tokens = lexer::tokenize(source).map_err(|e| Error::expression(source, e))?;
    parser::parse(&tokens).map_err(|e| Error::expression(source, e))
}

/// Evaluate an expression with `val` bound to the given value
pub fn evaluate(source: &str, val: &Value) -> Result<Value> {
    let expr = compile(source)?;
    eval::eval(&expr, val).map_err(|e| Error::expression(source, e))
}

/// Evaluate an expression as a predicate over `val`
pub fn evaluate_predicate(source: &str, val: &Value) -> Result<bool> {
    evaluate(source, val).map(|v| truthy(&v))
}

/// Replace every `{"$previous": expr}` node with the value of `expr` over `previous`
///
/// Other objects and arrays are rebuilt with the same shape; scalars pass through.
pub fn resolve_previous(value: &Value, previous: &Value) -> Result<Value> {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(reference) = map.get(PREVIOUS_KEY) {
                    let source = reference.as_str().ok_or_else(|| {
                        Error::expression(
                            &reference.to_string(),
                            "$previous expects an expression string",
                        )
                    })?;
                    return evaluate(source, previous);
                }
            }
            map.iter()
                .map(|(k, v)| Ok((k.clone(), resolve_previous(v, previous)?)))
                .collect::<Result<serde_json::Map<_, _>>>()
                .map(Value::Object)
        }
        Value::Array(items) => items
            .iter()
            .map(|v| resolve_previous(v, previous))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_predicate() {
        assert!(evaluate_predicate("val > 0", &json!(5)).unwrap());
        assert!(!evaluate_predicate("val > 0", &json!(-1)).unwrap());
        assert!(evaluate_predicate("val['num_hits']", &json!({"num_hits": 2})).unwrap());
    }

    #[test]
    fn test_errors_name_the_expression() {
        let err = evaluate("val['x']", &json!({})).unwrap_err();
        match err {
            Error::Expression { expression, message } => {
                assert_eq!(expression, "val['x']");
                assert!(message.contains("not found"));
            }
            other => panic!("Expected expression error, got {:?}", other),
        }
        assert!(matches!(
            evaluate("os.system('ls')", &json!(null)),
            Err(Error::Expression { .. })
        ));
    }

    #[test]
    fn test_resolve_previous() {
        let previous = json!({"id": "abc"});
        let body = json!({"json": {"doc_id": {"$previous": "val['id']"}, "n": 1}});
        assert_eq!(
            resolve_previous(&body, &previous).unwrap(),
            json!({"json": {"doc_id": "abc", "n": 1}})
        );
    }

    #[test]
    fn test_resolve_previous_in_arrays() {
        let previous = json!({"ids": [1, 2]});
        let body = json!({"params": [{"$previous": "val['ids'][1]"}, "x", null]});
        assert_eq!(
            resolve_previous(&body, &previous).unwrap(),
            json!({"params": [2, "x", null]})
        );
    }

    #[test]
    fn test_previous_needs_single_key() {
        let body = json!({"$previous": "val", "other": 1});
        assert_eq!(resolve_previous(&body, &json!(7)).unwrap(), body);
    }

    #[test]
    fn test_previous_requires_string() {
        let body = json!({"$previous": 3});
        assert!(resolve_previous(&body, &json!({})).is_err());
    }
}
