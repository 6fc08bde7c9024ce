//! Value-level helpers shared by the evaluator: ordering, deep merge, and
//! the path-based set/delete used by yq's `.path = value` and `del(.path)`.

use std::cmp::Ordering;
use indexmap::IndexMap;
use super::value::Value;

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

/// jq's total order across mixed types: by type rank, then by value.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (xa, yb) in x.iter().zip(y.iter()) {
                let c = compare(xa, yb);
                if c != Ordering::Equal {
                    return c;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            let mut xk: Vec<&String> = x.keys().collect();
            let mut yk: Vec<&String> = y.keys().collect();
            xk.sort();
            yk.sort();
            if xk != yk {
                return xk.cmp(&yk);
            }
            for k in xk {
                let c = compare(x.get(k).unwrap(), y.get(k).unwrap());
                if c != Ordering::Equal {
                    return c;
                }
            }
            Ordering::Equal
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

pub fn deep_merge(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Object(x), Value::Object(y)) => {
            let mut result = x.clone();
            for (k, v) in y {
                let merged = match result.get(k) {
                    Some(existing) => deep_merge(existing, v),
                    None => v.clone(),
                };
                result.insert(k.clone(), merged);
            }
            Value::Object(result)
        }
        _ => b.clone(),
    }
}

pub enum PathElement {
    Key(String),
    Index(usize),
}

pub fn set_path(value: &Value, path: &[PathElement], new_val: Value) -> Value {
    match path.split_first() {
        None => new_val,
        Some((PathElement::Key(k), rest)) => {
            let mut obj = match value {
                Value::Object(o) => o.clone(),
                _ => IndexMap::new(),
            };
            let child = obj.get(k).cloned().unwrap_or(Value::Null);
            obj.insert(k.clone(), set_path(&child, rest, new_val));
            Value::Object(obj)
        }
        Some((PathElement::Index(i), rest)) => {
            let mut arr = match value {
                Value::Array(a) => a.clone(),
                _ => Vec::new(),
            };
            while arr.len() <= *i {
                arr.push(Value::Null);
            }
            arr[*i] = set_path(&arr[*i].clone(), rest, new_val);
            Value::Array(arr)
        }
    }
}

pub fn delete_path(value: &Value, path: &[PathElement]) -> Value {
    match path.split_first() {
        None => value.clone(),
        Some((PathElement::Key(k), rest)) => match value {
            Value::Object(o) => {
                let mut obj = o.clone();
                if rest.is_empty() {
                    obj.shift_remove(k);
                } else if let Some(child) = obj.get(k).cloned() {
                    obj.insert(k.clone(), delete_path(&child, rest));
                }
                Value::Object(obj)
            }
            other => other.clone(),
        },
        Some((PathElement::Index(i), rest)) => match value {
            Value::Array(a) => {
                let mut arr = a.clone();
                if rest.is_empty() {
                    if *i < arr.len() {
                        arr.remove(*i);
                    }
                } else if let Some(child) = arr.get(*i).cloned() {
                    arr[*i] = delete_path(&child, rest);
                }
                Value::Array(arr)
            }
            other => other.clone(),
        },
    }
}
