//! Interpreter for the jq stage AST. Every node evaluates to a *stream* of
//! values (`Vec<Value>`), since `.[]` and `,` can fan a single input out
//! into many outputs that keep flowing through the rest of the pipeline.

use indexmap::IndexMap;
use regex_lite::Regex;

use super::ast::{AstNode, BinOp, ObjectKey};
use super::context::{EvalContext, JqError};
use super::operations::compare;
use super::value::Value;

pub fn evaluate(node: &AstNode, input: &Value, ctx: &EvalContext) -> Result<Vec<Value>, JqError> {
    match node {
        AstNode::Identity => Ok(vec![input.clone()]),
        AstNode::Literal(v) => Ok(vec![v.clone()]),
        AstNode::Var(name) => ctx
            .vars
            .get(name)
            .cloned()
            .map(|v| vec![v])
            .ok_or_else(|| JqError::Runtime(format!("${name} is not defined"))),
        AstNode::Field(base, name) => {
            let mut out = Vec::new();
            for v in evaluate(base, input, ctx)? {
                out.push(field_of(&v, name)?);
            }
            Ok(out)
        }
        AstNode::Index(base, idx) => {
            let mut out = Vec::new();
            for v in evaluate(base, input, ctx)? {
                for i in evaluate(idx, input, ctx)? {
                    out.push(index_of(&v, &i)?);
                }
            }
            Ok(out)
        }
        AstNode::Slice(base, lo, hi) => {
            let mut out = Vec::new();
            for v in evaluate(base, input, ctx)? {
                let arr = match &v {
                    Value::Array(a) => a.clone(),
                    Value::Null => Vec::new(),
                    other => return Err(JqError::Type(format!("cannot slice {}", other.type_name()))),
                };
                let len = arr.len() as i64;
                let lo_v = match lo {
                    Some(e) => evaluate(e, input, ctx)?[0].as_f64().unwrap_or(0.0) as i64,
                    None => 0,
                };
                let hi_v = match hi {
                    Some(e) => evaluate(e, input, ctx)?[0].as_f64().unwrap_or(0.0) as i64,
                    None => len,
                };
                let lo_c = lo_v.clamp(0, len) as usize;
                let hi_c = hi_v.clamp(0, len) as usize;
                if lo_c < hi_c {
                    out.push(Value::Array(arr[lo_c..hi_c].to_vec()));
                } else {
                    out.push(Value::Array(Vec::new()));
                }
            }
            Ok(out)
        }
        AstNode::Iterate(base) => {
            let mut out = Vec::new();
            for v in evaluate(base, input, ctx)? {
                match v {
                    Value::Array(items) => out.extend(items),
                    Value::Object(map) => out.extend(map.into_values()),
                    other => return Err(JqError::Type(format!("cannot iterate over {}", other.type_name()))),
                }
            }
            Ok(out)
        }
        AstNode::Pipe(left, right) => {
            let mut out = Vec::new();
            for v in evaluate(left, input, ctx)? {
                out.extend(evaluate(right, &v, ctx)?);
            }
            Ok(out)
        }
        AstNode::Comma(left, right) => {
            let mut out = evaluate(left, input, ctx)?;
            out.extend(evaluate(right, input, ctx)?);
            Ok(out)
        }
        AstNode::Default(left, right) => match evaluate(left, input, ctx) {
            Ok(vs) if !vs.is_empty() && vs.iter().all(|v| v.is_truthy()) => Ok(vs),
            _ => evaluate(right, input, ctx),
        },
        AstNode::Merge(left, right) => {
            let mut out = Vec::new();
            for l in evaluate(left, input, ctx)? {
                for r in evaluate(right, input, ctx)? {
                    out.push(super::operations::deep_merge(&l, &r));
                }
            }
            Ok(out)
        }
        AstNode::If(cond, then_branch, else_branch) => {
            let mut out = Vec::new();
            for c in evaluate(cond, input, ctx)? {
                if c.is_truthy() {
                    out.extend(evaluate(then_branch, input, ctx)?);
                } else if let Some(e) = else_branch {
                    out.extend(evaluate(e, input, ctx)?);
                } else {
                    out.push(input.clone());
                }
            }
            Ok(out)
        }
        AstNode::TryCatch(body, handler) => match evaluate(body, input, ctx) {
            Ok(vs) => Ok(vs),
            Err(e) => match handler {
                Some(h) => evaluate(h, &Value::String(e.to_string()), ctx),
                None => Ok(vec![]),
            },
        },
        AstNode::Binary(op, left, right) => {
            let mut out = Vec::new();
            for l in evaluate(left, input, ctx)? {
                for r in evaluate(right, input, ctx)? {
                    out.push(apply_binop(*op, &l, &r)?);
                }
            }
            Ok(out)
        }
        AstNode::ObjectConstruct(entries) => build_objects(entries, input, ctx),
        AstNode::Call(name, args) => call_builtin(name, args, input, ctx),
    }
}

fn field_of(v: &Value, name: &str) -> Result<Value, JqError> {
    match v {
        Value::Object(map) => Ok(map.get(name).cloned().unwrap_or(Value::Null)),
        Value::Null => Ok(Value::Null),
        other => Err(JqError::Type(format!("cannot index {} with \"{name}\"", other.type_name()))),
    }
}

fn index_of(v: &Value, idx: &Value) -> Result<Value, JqError> {
    match (v, idx) {
        (Value::Array(arr), Value::Number(n)) => {
            let len = arr.len() as i64;
            let mut i = *n as i64;
            if i < 0 {
                i += len;
            }
            Ok(if i >= 0 && i < len { arr[i as usize].clone() } else { Value::Null })
        }
        (Value::Object(map), Value::String(key)) => Ok(map.get(key).cloned().unwrap_or(Value::Null)),
        (Value::Null, _) => Ok(Value::Null),
        (other, _) => Err(JqError::Type(format!("cannot index {}", other.type_name()))),
    }
}

fn apply_binop(op: BinOp, l: &Value, r: &Value) -> Result<Value, JqError> {
    Ok(match op {
        BinOp::Eq => Value::Bool(l == r),
        BinOp::Ne => Value::Bool(l != r),
        BinOp::Lt => Value::Bool(compare(l, r) == std::cmp::Ordering::Less),
        BinOp::Le => Value::Bool(compare(l, r) != std::cmp::Ordering::Greater),
        BinOp::Gt => Value::Bool(compare(l, r) == std::cmp::Ordering::Greater),
        BinOp::Ge => Value::Bool(compare(l, r) != std::cmp::Ordering::Less),
        BinOp::And => Value::Bool(l.is_truthy() && r.is_truthy()),
        BinOp::Or => Value::Bool(l.is_truthy() || r.is_truthy()),
        BinOp::Add => add_values(l, r)?,
        BinOp::Sub => match (l, r) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a - b),
            (Value::Array(a), Value::Array(b)) => {
                Value::Array(a.iter().filter(|x| !b.contains(x)).cloned().collect())
            }
            _ => return Err(JqError::Type("cannot subtract these types".to_string())),
        },
    })
}

fn add_values(l: &Value, r: &Value) -> Result<Value, JqError> {
    Ok(match (l, r) {
        (Value::Null, other) | (other, Value::Null) => other.clone(),
        (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
        (Value::String(a), Value::String(b)) => Value::String(format!("{a}{b}")),
        (Value::Array(a), Value::Array(b)) => {
            let mut v = a.clone();
            v.extend(b.clone());
            Value::Array(v)
        }
        (Value::Object(a), Value::Object(b)) => super::operations::deep_merge(&Value::Object(a.clone()), &Value::Object(b.clone())),
        _ => return Err(JqError::Type("cannot add these types".to_string())),
    })
}

fn build_objects(entries: &[(ObjectKey, Option<AstNode>)], input: &Value, ctx: &EvalContext) -> Result<Vec<Value>, JqError> {
    let mut results = vec![IndexMap::new()];
    for (key, value_expr) in entries {
        let key_name = match key {
            ObjectKey::Ident(name) => name.clone(),
            ObjectKey::Expr(e) => evaluate(e, input, ctx)?[0].as_str().unwrap_or_default().to_string(),
        };
        let values = match value_expr {
            Some(e) => evaluate(e, input, ctx)?,
            None => vec![field_of(input, &key_name)?],
        };
        let mut next = Vec::new();
        for base in &results {
            for v in &values {
                let mut obj = base.clone();
                obj.insert(key_name.clone(), v.clone());
                next.push(obj);
            }
        }
        results = next;
    }
    Ok(results.into_iter().map(Value::Object).collect())
}

fn call_builtin(name: &str, args: &[AstNode], input: &Value, ctx: &EvalContext) -> Result<Vec<Value>, JqError> {
    match name {
        "__array_empty" => Ok(vec![Value::Array(Vec::new())]),
        "__array_collect" => Ok(vec![Value::Array(evaluate(&args[0], input, ctx)?)]),
        "length" => Ok(vec![Value::Number(match input {
            Value::Array(a) => a.len() as f64,
            Value::Object(o) => o.len() as f64,
            Value::String(s) => s.chars().count() as f64,
            Value::Null => 0.0,
            Value::Number(n) => n.abs(),
            Value::Bool(_) => return Err(JqError::Type("boolean has no length".to_string())),
        })]),
        "keys" => match input {
            Value::Object(o) => {
                let mut ks: Vec<String> = o.keys().cloned().collect();
                ks.sort();
                Ok(vec![Value::Array(ks.into_iter().map(Value::String).collect())])
            }
            Value::Array(a) => Ok(vec![Value::Array((0..a.len()).map(|i| Value::Number(i as f64)).collect())]),
            other => Err(JqError::Type(format!("{} has no keys", other.type_name()))),
        },
        "values" => match input {
            Value::Object(o) => Ok(vec![Value::Array(o.values().cloned().collect())]),
            Value::Array(a) => Ok(vec![Value::Array(a.clone())]),
            other => Err(JqError::Type(format!("{} has no values", other.type_name()))),
        },
        "type" => Ok(vec![Value::String(input.type_name().to_string())]),
        "tostring" => Ok(vec![Value::String(input.to_string())]),
        "tonumber" => Ok(vec![match input {
            Value::Number(n) => Value::Number(*n),
            Value::String(s) => Value::Number(s.trim().parse().map_err(|_| JqError::Runtime(format!("cannot parse '{s}' as number")))?),
            other => return Err(JqError::Type(format!("cannot parse {} as number", other.type_name()))),
        }]),
        "sort" => match input {
            Value::Array(a) => {
                let mut v = a.clone();
                v.sort_by(compare);
                Ok(vec![Value::Array(v)])
            }
            other => Err(JqError::Type(format!("{} cannot be sorted", other.type_name()))),
        },
        "sort_by" => match input {
            Value::Array(a) => {
                let mut keyed: Vec<(Value, Value)> = Vec::new();
                for item in a {
                    let key = evaluate(&args[0], item, ctx)?.into_iter().next().unwrap_or(Value::Null);
                    keyed.push((key, item.clone()));
                }
                keyed.sort_by(|x, y| compare(&x.0, &y.0));
                Ok(vec![Value::Array(keyed.into_iter().map(|(_, v)| v).collect())])
            }
            other => Err(JqError::Type(format!("{} cannot be sorted", other.type_name()))),
        },
        "reverse" => match input {
            Value::Array(a) => {
                let mut v = a.clone();
                v.reverse();
                Ok(vec![Value::Array(v)])
            }
            Value::String(s) => Ok(vec![Value::String(s.chars().rev().collect())]),
            other => Err(JqError::Type(format!("cannot reverse {}", other.type_name()))),
        },
        "unique" => match input {
            Value::Array(a) => {
                let mut v = a.clone();
                v.sort_by(compare);
                v.dedup_by(|x, y| x == y);
                Ok(vec![Value::Array(v)])
            }
            other => Err(JqError::Type(format!("{} cannot be made unique", other.type_name()))),
        },
        "flatten" => match input {
            Value::Array(a) => {
                let mut out = Vec::new();
                flatten_into(a, &mut out);
                Ok(vec![Value::Array(out)])
            }
            other => Err(JqError::Type(format!("{} cannot be flattened", other.type_name()))),
        },
        "add" => match input {
            Value::Array(a) => {
                let mut acc = Value::Null;
                for item in a {
                    acc = add_values(&acc, item)?;
                }
                Ok(vec![acc])
            }
            other => Err(JqError::Type(format!("cannot add over {}", other.type_name()))),
        },
        "ascii_upcase" => match input {
            Value::String(s) => Ok(vec![Value::String(s.to_uppercase())]),
            other => Err(JqError::Type(format!("{} is not a string", other.type_name()))),
        },
        "ascii_downcase" => match input {
            Value::String(s) => Ok(vec![Value::String(s.to_lowercase())]),
            other => Err(JqError::Type(format!("{} is not a string", other.type_name()))),
        },
        "map" => match input {
            Value::Array(a) => {
                let mut out = Vec::new();
                for item in a {
                    out.extend(evaluate(&args[0], item, ctx)?);
                }
                Ok(vec![Value::Array(out)])
            }
            other => Err(JqError::Type(format!("cannot map over {}", other.type_name()))),
        },
        "select" => {
            let keep = evaluate(&args[0], input, ctx)?.iter().any(|v| v.is_truthy());
            Ok(if keep { vec![input.clone()] } else { vec![] })
        }
        "has" => {
            let key = evaluate(&args[0], input, ctx)?.into_iter().next().unwrap_or(Value::Null);
            Ok(vec![Value::Bool(match (input, &key) {
                (Value::Object(o), Value::String(k)) => o.contains_key(k),
                (Value::Array(a), Value::Number(n)) => (*n as usize) < a.len(),
                _ => false,
            })])
        }
        "split" => {
            let sep = evaluate(&args[0], input, ctx)?.into_iter().next().unwrap_or(Value::Null);
            match (input, sep) {
                (Value::String(s), Value::String(sep)) => {
                    Ok(vec![Value::Array(s.split(sep.as_str()).map(|p| Value::String(p.to_string())).collect())])
                }
                _ => Err(JqError::Type("split requires string input and separator".to_string())),
            }
        }
        "join" => {
            let sep = evaluate(&args[0], input, ctx)?.into_iter().next().unwrap_or(Value::Null);
            match (input, sep) {
                (Value::Array(a), Value::String(sep)) => {
                    let parts: Vec<String> = a.iter().map(|v| if v.is_null() { String::new() } else { v.as_str().map(|s| s.to_string()).unwrap_or_else(|| v.to_string()) }).collect();
                    Ok(vec![Value::String(parts.join(&sep))])
                }
                _ => Err(JqError::Type("join requires array input and string separator".to_string())),
            }
        }
        "test" => {
            let pat = evaluate(&args[0], input, ctx)?.into_iter().next().unwrap_or(Value::Null);
            match (input, pat) {
                (Value::String(s), Value::String(pat)) => {
                    let re = Regex::new(&pat).map_err(|e| JqError::Runtime(e.to_string()))?;
                    Ok(vec![Value::Bool(re.is_match(s))])
                }
                _ => Err(JqError::Type("test requires string input and pattern".to_string())),
            }
        }
        "empty" => Ok(vec![]),
        "not" => Ok(vec![Value::Bool(!input.is_truthy())]),
        "del" => {
            // handled specially by yq; in jq context this is a no-op over identity
            Err(JqError::Runtime("del/1 is only supported by yq".to_string()))
        }
        "env" | "$ENV" => {
            let mut map = IndexMap::new();
            for (k, v) in &ctx.env {
                map.insert(k.clone(), Value::String(v.clone()));
            }
            Ok(vec![Value::Object(map)])
        }
        other => Err(JqError::Runtime(format!("{other}/{} is not defined", args.len()))),
    }
}

fn flatten_into(items: &[Value], out: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::Array(inner) => flatten_into(inner, out),
            other => out.push(other.clone()),
        }
    }
}
