//! YAML subset parser/serializer plus the `props`/`csv`/`json` output
//! writers. Supports scalars, block mappings, block and flow sequences,
//! `&anchor`/`*alias`, and `<<: *merge`.

use std::collections::HashMap;
use indexmap::IndexMap;
use crate::commands::query_engine::Value;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Format {
    Yaml,
    Json,
    Props,
    Csv,
}

pub fn parse_format(s: &str) -> Result<Format, String> {
    match s {
        "yaml" | "yml" | "y" => Ok(Format::Yaml),
        "json" | "j" => Ok(Format::Json),
        "props" | "properties" | "p" => Ok(Format::Props),
        "csv" => Ok(Format::Csv),
        other => Err(format!("unsupported format: {other}")),
    }
}

pub fn parse_yaml(src: &str) -> Result<Value, String> {
    let lines: Vec<&str> = src.lines().filter(|l| !l.trim_start().starts_with('#')).collect();
    let mut anchors: HashMap<String, Value> = HashMap::new();
    let (value, _) = parse_block(&lines, 0, 0, &mut anchors)?;
    Ok(value)
}

fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ').count()
}

fn parse_block(lines: &[&str], mut idx: usize, min_indent: usize, anchors: &mut HashMap<String, Value>) -> Result<(Value, usize), String> {
    while idx < lines.len() && lines[idx].trim().is_empty() {
        idx += 1;
    }
    if idx >= lines.len() {
        return Ok((Value::Null, idx));
    }
    let base_indent = indent_of(lines[idx]);
    if base_indent < min_indent {
        return Ok((Value::Null, idx));
    }
    let first = lines[idx].trim();
    if let Some(rest) = first.strip_prefix("- ").or_else(|| if first == "-" { Some("") } else { None }) {
        let _ = rest;
        return parse_sequence(lines, idx, base_indent, anchors);
    }
    parse_mapping(lines, idx, base_indent, anchors)
}

fn parse_sequence(lines: &[&str], mut idx: usize, indent: usize, anchors: &mut HashMap<String, Value>) -> Result<(Value, usize), String> {
    let mut items = Vec::new();
    while idx < lines.len() {
        if lines[idx].trim().is_empty() {
            idx += 1;
            continue;
        }
        let line_indent = indent_of(lines[idx]);
        if line_indent != indent || !lines[idx].trim_start().starts_with('-') {
            break;
        }
        let after_dash = &lines[idx][indent + 1..];
        let after_dash = after_dash.strip_prefix(' ').unwrap_or(after_dash);
        if after_dash.trim().is_empty() {
            let (v, next) = parse_block(lines, idx + 1, indent + 1, anchors)?;
            items.push(v);
            idx = next;
        } else {
            let synthetic_line = format!("{}{}", " ".repeat(indent + 2), after_dash);
            let mut sub_lines: Vec<&str> = vec![Box::leak(synthetic_line.into_boxed_str())];
            let mut j = idx + 1;
            while j < lines.len() && (lines[j].trim().is_empty() || indent_of(lines[j]) > indent) {
                sub_lines.push(lines[j]);
                j += 1;
            }
            let (v, _) = parse_block(&sub_lines, 0, indent + 2, anchors)?;
            items.push(v);
            idx = j;
        }
    }
    Ok((Value::Array(items), idx))
}

fn parse_mapping(lines: &[&str], mut idx: usize, indent: usize, anchors: &mut HashMap<String, Value>) -> Result<(Value, usize), String> {
    let mut map = IndexMap::new();
    while idx < lines.len() {
        if lines[idx].trim().is_empty() {
            idx += 1;
            continue;
        }
        let line_indent = indent_of(lines[idx]);
        if line_indent != indent {
            break;
        }
        let content = lines[idx][indent..].to_string();
        let Some(colon) = find_key_colon(&content) else { break };
        let mut key = content[..colon].trim().to_string();
        let rest = content[colon + 1..].trim();

        let mut anchor_name = None;
        let mut value_text = rest;
        if let Some(stripped) = value_text.strip_prefix('&') {
            let (name, remainder) = stripped.split_once(' ').unwrap_or((stripped, ""));
            anchor_name = Some(name.to_string());
            value_text = remainder.trim();
        }

        if key.starts_with('"') && key.ends_with('"') && key.len() >= 2 {
            key = key[1..key.len() - 1].to_string();
        }

        let (value, next_idx) = if value_text.is_empty() {
            parse_block(lines, idx + 1, indent + 1, anchors)?
        } else if let Some(alias) = value_text.strip_prefix('*') {
            let v = anchors.get(alias.trim()).cloned().unwrap_or(Value::Null);
            (v, idx + 1)
        } else {
            (parse_scalar_or_flow(value_text), idx + 1)
        };

        if let Some(name) = anchor_name {
            anchors.insert(name, value.clone());
        }

        if key == "<<" {
            if let Value::Object(merge_in) = &value {
                for (k, v) in merge_in {
                    map.entry(k.clone()).or_insert_with(|| v.clone());
                }
            }
        } else {
            map.insert(key, value);
        }
        idx = next_idx;
    }
    Ok((Value::Object(map), idx))
}

fn find_key_colon(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut in_quotes = false;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'"' => in_quotes = !in_quotes,
            b':' if !in_quotes && (i + 1 == bytes.len() || bytes[i + 1] == b' ') => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_scalar_or_flow(text: &str) -> Value {
    let text = text.trim();
    if text.starts_with('[') || text.starts_with('{') {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(text) {
            return Value::from_serde_json(json);
        }
    }
    parse_scalar(text)
}

fn parse_scalar(text: &str) -> Value {
    let text = text.trim();
    if text.is_empty() || text == "~" || text == "null" {
        return Value::Null;
    }
    if text == "true" {
        return Value::Bool(true);
    }
    if text == "false" {
        return Value::Bool(false);
    }
    if let Ok(n) = text.parse::<f64>() {
        return Value::Number(n);
    }
    if (text.starts_with('"') && text.ends_with('"') && text.len() >= 2)
        || (text.starts_with('\'') && text.ends_with('\'') && text.len() >= 2)
    {
        return Value::String(text[1..text.len() - 1].to_string());
    }
    Value::String(text.to_string())
}

pub fn to_yaml(value: &Value) -> String {
    let mut out = String::new();
    write_yaml(value, 0, &mut out, false);
    out
}

fn write_yaml(value: &Value, indent: usize, out: &mut String, as_item: bool) {
    let pad = "  ".repeat(indent);
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (i, (k, v)) in map.iter().enumerate() {
                if i > 0 || !as_item {
                    out.push_str(&pad);
                }
                out.push_str(k);
                out.push(':');
                match v {
                    Value::Object(o) if !o.is_empty() => {
                        out.push('\n');
                        write_yaml(v, indent + 1, out, false);
                    }
                    Value::Array(a) if !a.is_empty() => {
                        out.push('\n');
                        write_yaml(v, indent, out, false);
                    }
                    _ => {
                        out.push(' ');
                        out.push_str(&scalar_to_yaml(v));
                        out.push('\n');
                    }
                }
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for item in items {
                out.push_str(&pad);
                out.push_str("- ");
                match item {
                    Value::Object(o) if !o.is_empty() => write_yaml(item, indent + 1, out, true),
                    Value::Array(a) if !a.is_empty() => {
                        out.push('\n');
                        write_yaml(item, indent + 1, out, false);
                    }
                    _ => {
                        out.push_str(&scalar_to_yaml(item));
                        out.push('\n');
                    }
                }
            }
        }
        other => {
            out.push_str(&pad);
            out.push_str(&scalar_to_yaml(other));
            out.push('\n');
        }
    }
}

fn scalar_to_yaml(v: &Value) -> String {
    match v {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(_) => v.to_string(),
        Value::String(s) if s.is_empty() || needs_quoting(s) => format!("\"{}\"", s.replace('"', "\\\"")),
        Value::String(s) => s.clone(),
        other => other.to_json_string_compact(),
    }
}

fn needs_quoting(s: &str) -> bool {
    matches!(s, "true" | "false" | "null" | "~") || s.parse::<f64>().is_ok() || s.starts_with(' ') || s.contains(": ")
}

/// Flattens an object/array into `dotted.path=value` lines.
pub fn to_props(value: &Value) -> String {
    let mut lines = Vec::new();
    collect_props("", value, &mut lines);
    lines.join("\n") + "\n"
}

fn collect_props(prefix: &str, value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let next = if prefix.is_empty() { k.clone() } else { format!("{prefix}.{k}") };
                collect_props(&next, v, out);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                let next = format!("{prefix}.{i}");
                collect_props(&next, item, out);
            }
        }
        other => out.push(format!("{prefix}={other}")),
    }
}

/// Serializes an array of flat objects to CSV using the union of keys
/// from the first row as the header.
pub fn to_csv(value: &Value) -> Result<String, String> {
    let rows = match value {
        Value::Array(items) => items,
        other => return Err(format!("csv output requires an array, got {}", other.type_name())),
    };
    if rows.is_empty() {
        return Ok(String::new());
    }
    let header: Vec<String> = match &rows[0] {
        Value::Object(map) => map.keys().cloned().collect(),
        _ => return Err("csv output requires an array of objects".to_string()),
    };
    let mut out = header.join(",") + "\n";
    for row in rows {
        if let Value::Object(map) = row {
            let cells: Vec<String> = header.iter().map(|h| csv_escape(&map.get(h).map(|v| v.to_string()).unwrap_or_default())).collect();
            out.push_str(&cells.join(","));
            out.push('\n');
        }
    }
    Ok(out)
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
