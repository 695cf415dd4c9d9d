//! Tree-walking interpreter over JSON values

use std::cmp::Ordering;

use serde_json::{Map, Number, Value};

use super::parser::{BinaryOp, Builtin, CompareOp, Expr};

type EvalResult = Result<Value, String>;

/// Evaluate an expression with `val` bound to `val`
pub fn eval(expr: &Expr, val: &Value) -> EvalResult {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Val => Ok(val.clone()),
        Expr::List(items) => items
            .iter()
            .map(|item| eval(item, val))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Expr::Dict(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                let key = match eval(key, val)? {
                    Value::String(s) => s,
                    other => return Err(format!("dict keys must be strings, got {}", type_name(&other))),
                };
                map.insert(key, eval(value, val)?);
            }
            Ok(Value::Object(map))
        }
        Expr::Index(target, index) => index_value(&eval(target, val)?, &eval(index, val)?),
        Expr::Call(builtin, args) => {
            let args = args
                .iter()
                .map(|arg| eval(arg, val))
                .collect::<Result<Vec<_>, _>>()?;
            call(*builtin, &args)
        }
        Expr::Neg(inner) => match Num::from_value(&eval(inner, val)?) {
            Some(Num::Int(i)) => i
                .checked_neg()
                .map(Value::from)
                .ok_or_else(|| "integer overflow".to_string()),
            Some(Num::Float(f)) => float_value(-f),
            None => Err("unary '-' expects a number".to_string()),
        },
        Expr::Not(inner) => Ok(Value::Bool(!truthy(&eval(inner, val)?))),
        Expr::Binary(op, left, right) => binary(*op, &eval(left, val)?, &eval(right, val)?),
        Expr::Compare(first, rest) => {
            let mut left = eval(first, val)?;
            for (op, right) in rest {
                let right = eval(right, val)?;
                if !compare(*op, &left, &right)? {
                    return Ok(Value::Bool(false));
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }
        Expr::And(left, right) => {
            let left = eval(left, val)?;
            if truthy(&left) {
                eval(right, val)
            } else {
                Ok(left)
            }
        }
        Expr::Or(left, right) => {
            let left = eval(left, val)?;
            if truthy(&left) {
                Ok(left)
            } else {
                eval(right, val)
            }
        }
    }
}

/// Truthiness: null, false, zero and empty containers are false
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Name of a value's variant, for diagnostics
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Structural equality where numbers compare by value (`1 == 1.0`, `True == 1`)
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), Value::Number(_))
        | (Value::Bool(_), Value::Number(_))
        | (Value::Number(_), Value::Bool(_)) => {
            num_cmp(Num::from_value(left), Num::from_value(right)) == Some(Ordering::Equal)
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|other| values_equal(v, other)))
        }
        _ => left == right,
    }
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn from_value(value: &Value) -> Option<Num> {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Num::Int(i)),
                None => n.as_f64().map(Num::Float),
            },
            Value::Bool(b) => Some(Num::Int(i64::from(*b))),
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

fn num_cmp(left: Option<Num>, right: Option<Num>) -> Option<Ordering> {
    match (left?, right?) {
        (Num::Int(a), Num::Int(b)) => Some(a.cmp(&b)),
        (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
    }
}

fn float_value(f: f64) -> EvalResult {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| format!("result {} is not a finite number", f))
}

fn order(left: &Value, right: &Value) -> Result<Ordering, String> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::Array(a), Value::Array(b)) => {
            for (x, y) in a.iter().zip(b) {
                match order(x, y)? {
                    Ordering::Equal => continue,
                    other => return Ok(other),
                }
            }
            Ok(a.len().cmp(&b.len()))
        }
        _ => num_cmp(Num::from_value(left), Num::from_value(right)).ok_or_else(|| {
            format!(
                "cannot order {} and {}",
                type_name(left),
                type_name(right)
            )
        }),
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool, String> {
    match container {
        Value::String(haystack) => match item {
            Value::String(needle) => Ok(haystack.contains(needle.as_str())),
            other => Err(format!("'in <string>' requires a string, got {}", type_name(other))),
        },
        Value::Array(items) => Ok(items.iter().any(|x| values_equal(x, item))),
        Value::Object(map) => match item {
            Value::String(key) => Ok(map.contains_key(key)),
            _ => Ok(false),
        },
        other => Err(format!("{} is not a container", type_name(other))),
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, String> {
    Ok(match op {
        CompareOp::Eq => values_equal(left, right),
        CompareOp::NotEq => !values_equal(left, right),
        CompareOp::Lt => order(left, right)? == Ordering::Less,
        CompareOp::Le => order(left, right)? != Ordering::Greater,
        CompareOp::Gt => order(left, right)? == Ordering::Greater,
        CompareOp::Ge => order(left, right)? != Ordering::Less,
        CompareOp::In => contains(right, left)?,
        CompareOp::NotIn => !contains(right, left)?,
    })
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    match (op, left, right) {
        (BinaryOp::Add, Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
        (BinaryOp::Add, Value::Array(a), Value::Array(b)) => {
            Ok(Value::Array(a.iter().chain(b).cloned().collect()))
        }
        _ => {
            let (a, b) = match (Num::from_value(left), Num::from_value(right)) {
                (Some(a), Some(b)) => (a, b),
                _ => {
                    return Err(format!(
                        "unsupported operand types for {:?}: {} and {}",
                        op,
                        type_name(left),
                        type_name(right)
                    ))
                }
            };
            arithmetic(op, a, b)
        }
    }
}

fn arithmetic(op: BinaryOp, a: Num, b: Num) -> EvalResult {
    let overflow = || "integer overflow".to_string();
    if let (Num::Int(x), Num::Int(y)) = (a, b) {
        match op {
            BinaryOp::Add => return x.checked_add(y).map(Value::from).ok_or_else(overflow),
            BinaryOp::Sub => return x.checked_sub(y).map(Value::from).ok_or_else(overflow),
            BinaryOp::Mul => return x.checked_mul(y).map(Value::from).ok_or_else(overflow),
            BinaryOp::FloorDiv | BinaryOp::Mod if y == 0 => {
                return Err("division by zero".to_string())
            }
            BinaryOp::FloorDiv => {
                let q = x.checked_div(y).ok_or_else(overflow)?;
                let q = if x % y != 0 && (x < 0) != (y < 0) { q - 1 } else { q };
                return Ok(Value::from(q));
            }
            BinaryOp::Mod => {
                let r = x.checked_rem(y).ok_or_else(overflow)?;
                let r = if r != 0 && (r < 0) != (y < 0) { r + y } else { r };
                return Ok(Value::from(r));
            }
            BinaryOp::Div => {}
        }
    }

    let (x, y) = (a.as_f64(), b.as_f64());
    if y == 0.0 && matches!(op, BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod) {
        return Err("division by zero".to_string());
    }
    let result = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => x / y,
        BinaryOp::FloorDiv => (x / y).floor(),
        BinaryOp::Mod => x - y * (x / y).floor(),
    };
    float_value(result)
}

fn index_value(target: &Value, index: &Value) -> EvalResult {
    match (target, index) {
        (Value::Object(map), Value::String(key)) => map
            .get(key)
            .cloned()
            .ok_or_else(|| format!("key '{}' not found", key)),
        (Value::Array(items), Value::Number(_)) => {
            let i = index
                .as_i64()
                .ok_or_else(|| "array index must be an integer".to_string())?;
            let len = items.len() as i64;
            let pos = if i < 0 { len + i } else { i };
            if pos < 0 || pos >= len {
                return Err(format!("index {} out of range for array of length {}", i, len));
            }
            Ok(items[pos as usize].clone())
        }
        (Value::String(s), Value::Number(_)) => {
            let i = index
                .as_i64()
                .ok_or_else(|| "string index must be an integer".to_string())?;
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len() as i64;
            let pos = if i < 0 { len + i } else { i };
            if pos < 0 || pos >= len {
                return Err(format!("index {} out of range for string of length {}", i, len));
            }
            Ok(Value::String(chars[pos as usize].to_string()))
        }
        _ => Err(format!(
            "cannot index {} with {}",
            type_name(target),
            type_name(index)
        )),
    }
}

fn call(builtin: Builtin, args: &[Value]) -> EvalResult {
    match builtin {
        Builtin::Len => match single(args, "len")? {
            Value::String(s) => Ok(Value::from(s.chars().count())),
            Value::Array(a) => Ok(Value::from(a.len())),
            Value::Object(o) => Ok(Value::from(o.len())),
            other => Err(format!("len() of {}", type_name(other))),
        },
        Builtin::Abs => match Num::from_value(single(args, "abs")?) {
            Some(Num::Int(i)) => i
                .checked_abs()
                .map(Value::from)
                .ok_or_else(|| "integer overflow".to_string()),
            Some(Num::Float(f)) => float_value(f.abs()),
            None => Err("abs() expects a number".to_string()),
        },
        Builtin::Min | Builtin::Max => {
            let items = spread(args)?;
            let mut best: Option<&Value> = None;
            for item in items {
                best = match best {
                    None => Some(item),
                    Some(current) => {
                        let ord = order(item, current)?;
                        let better = if builtin == Builtin::Min {
                            ord == Ordering::Less
                        } else {
                            ord == Ordering::Greater
                        };
                        Some(if better { item } else { current })
                    }
                };
            }
            best.cloned()
                .ok_or_else(|| "min()/max() of an empty sequence".to_string())
        }
        Builtin::Sum => {
            let mut total = Value::from(0);
            for item in spread(args)? {
                total = binary(BinaryOp::Add, &total, item)?;
            }
            Ok(total)
        }
        Builtin::Sorted => match single(args, "sorted")? {
            Value::Array(items) => {
                let mut items = items.clone();
                let mut failure = None;
                items.sort_by(|a, b| {
                    order(a, b).unwrap_or_else(|e| {
                        failure.get_or_insert(e);
                        Ordering::Equal
                    })
                });
                match failure {
                    Some(e) => Err(e),
                    None => Ok(Value::Array(items)),
                }
            }
            other => Err(format!("sorted() of {}", type_name(other))),
        },
    }
}

fn single<'v>(args: &'v [Value], name: &str) -> Result<&'v Value, String> {
    match args {
        [arg] => Ok(arg),
        _ => Err(format!("{}() takes exactly one argument ({} given)", name, args.len())),
    }
}

/// `min(a, b)` and `min([a, b])` both work
fn spread(args: &[Value]) -> Result<&[Value], String> {
    match args {
        [Value::Array(items)] => Ok(items),
        [_] => Err("expected a list or several arguments".to_string()),
        _ => Ok(args),
    }
}

#[cfg(test)]
mod tests {
    use super::super::{lexer::tokenize, parser::parse};
    use super::*;
    use serde_json::json;

    fn run(expr: &str, val: Value) -> EvalResult {
        let ast = parse(&tokenize(expr)?)?;
        eval(&ast, &val)
    }

    #[test]
    fn test_indexing() {
        let val = json!({"hits": [{"id": "a"}, {"id": "b"}]});
        assert_eq!(run("val['hits'][0]['id']", val.clone()).unwrap(), json!("a"));
        assert_eq!(run("val['hits'][-1]['id']", val.clone()).unwrap(), json!("b"));
        assert!(run("val['missing']", val.clone()).unwrap_err().contains("not found"));
        assert!(run("val['hits'][5]", val).unwrap_err().contains("out of range"));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(run("7 // 2", json!(null)).unwrap(), json!(3));
        assert_eq!(run("-7 // 2", json!(null)).unwrap(), json!(-4));
        assert_eq!(run("-7 % 3", json!(null)).unwrap(), json!(2));
        assert_eq!(run("7 / 2", json!(null)).unwrap(), json!(3.5));
        assert_eq!(run("val * 2 + 1", json!(4)).unwrap(), json!(9));
        assert_eq!(run("'a' + 'b'", json!(null)).unwrap(), json!("ab"));
        assert!(run("1 / 0", json!(null)).is_err());
        assert!(run("'a' - 1", json!(null)).is_err());
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(run("val == 1.0", json!(1)).unwrap(), json!(true));
        assert_eq!(run("0 < val < 10", json!(5)).unwrap(), json!(true));
        assert_eq!(run("0 < val < 10", json!(15)).unwrap(), json!(false));
        assert_eq!(run("'ab' < 'b'", json!(null)).unwrap(), json!(true));
        assert_eq!(run("val is None", json!(null)).unwrap(), json!(true));
        assert_eq!(run("val is not None", json!(0)).unwrap(), json!(true));
        assert_eq!(run("val is False", json!(false)).unwrap(), json!(true));
        assert!(run("val < 'a'", json!(1)).is_err());
    }

    #[test]
    fn test_bools_equal_numbers_by_value() {
        assert_eq!(run("val == 1", json!(true)).unwrap(), json!(true));
        assert_eq!(run("val == 0", json!(false)).unwrap(), json!(true));
        assert_eq!(run("val != 1", json!(true)).unwrap(), json!(false));
        assert_eq!(run("1 in [True]", json!(null)).unwrap(), json!(true));
        assert_eq!(run("val == 'true'", json!(true)).unwrap(), json!(false));
    }

    #[test]
    fn test_membership() {
        let val = json!({"tags": ["x", "y"], "title": "hello world"});
        assert_eq!(run("'x' in val['tags']", val.clone()).unwrap(), json!(true));
        assert_eq!(run("'z' not in val['tags']", val.clone()).unwrap(), json!(true));
        assert_eq!(run("'world' in val['title']", val.clone()).unwrap(), json!(true));
        assert_eq!(run("'tags' in val", val).unwrap(), json!(true));
    }

    #[test]
    fn test_boolean_short_circuit() {
        // the right-hand side would fail on a missing key
        assert_eq!(
            run("'a' in val and val['a'] > 1", json!({})).unwrap(),
            json!(false)
        );
        assert_eq!(run("val or 'default'", json!("")).unwrap(), json!("default"));
        assert_eq!(run("not val", json!([])).unwrap(), json!(true));
    }

    #[test]
    fn test_builtins() {
        let val = json!({"hits": [3, 1, 2]});
        assert_eq!(run("len(val['hits'])", val.clone()).unwrap(), json!(3));
        assert_eq!(run("sorted(val['hits'])", val.clone()).unwrap(), json!([1, 2, 3]));
        assert_eq!(run("max(val['hits'])", val.clone()).unwrap(), json!(3));
        assert_eq!(run("min(4, 2, 8)", json!(null)).unwrap(), json!(2));
        assert_eq!(run("sum(val['hits'])", val).unwrap(), json!(6));
        assert_eq!(run("abs(-2.5)", json!(null)).unwrap(), json!(2.5));
        assert!(run("len(1)", json!(null)).is_err());
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            run("{'a': [1, True, None]}", json!(null)).unwrap(),
            json!({"a": [1, true, null]})
        );
        assert_eq!(run("val == [1, 2]", json!([1, 2])).unwrap(), json!(true));
    }
}
