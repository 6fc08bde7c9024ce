//! A minimal `yq`: parses the supported YAML subset, converts to the jq
//! data model, runs a jq filter or a `.path = value` / `del(.path)`
//! mutation over it, and writes back as yaml/json/props/csv.

pub mod formats;

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};
use crate::commands::query_engine::{evaluate, parse, Value};
use crate::commands::query_engine::context::EvalContext;
use crate::commands::query_engine::operations::{delete_path, set_path, PathElement};
use formats::{parse_format, parse_yaml, to_csv, to_props, to_yaml, Format};

pub struct YqCommand;

struct Options {
    input_format: Format,
    output_format: Format,
    filter: Option<String>,
}

fn parse_args(argv: &[String]) -> Result<Options, String> {
    let mut opts = Options { input_format: Format::Yaml, output_format: Format::Yaml, filter: None };
    let mut i = 0;
    while i < argv.len() {
        match argv[i].as_str() {
            "-o" | "--output-format" => {
                let fmt = argv.get(i + 1).ok_or("-o requires a format")?;
                opts.output_format = parse_format(fmt)?;
                i += 1;
            }
            "-p" | "--input-format" => {
                let fmt = argv.get(i + 1).ok_or("-p requires a format")?;
                opts.input_format = parse_format(fmt)?;
                i += 1;
            }
            other if opts.filter.is_none() => opts.filter = Some(other.to_string()),
            _ => {}
        }
        i += 1;
    }
    Ok(opts)
}

fn parse_input(text: &str, format: Format) -> Result<Value, String> {
    match format {
        Format::Yaml => parse_yaml(text),
        Format::Json => serde_json::from_str::<serde_json::Value>(text).map(Value::from_serde_json).map_err(|e| e.to_string()),
        Format::Props | Format::Csv => Err("props/csv input is not supported".to_string()),
    }
}

fn render_output(value: &Value, format: Format) -> Result<String, String> {
    match format {
        Format::Yaml => Ok(to_yaml(value)),
        Format::Json => Ok(value.to_json_string() + "\n"),
        Format::Props => Ok(to_props(value)),
        Format::Csv => to_csv(value),
    }
}

/// `.a.b.c` / `.a[0].b` path parsed into key/index segments, used for
/// assignment and `del()`. Anything richer falls back to the jq evaluator.
fn parse_simple_path(src: &str) -> Option<Vec<PathElement>> {
    let src = src.trim().strip_prefix('.')?;
    let mut path = Vec::new();
    let mut remaining = src;
    while !remaining.is_empty() {
        if let Some(rest) = remaining.strip_prefix('[') {
            let end = rest.find(']')?;
            let idx: usize = rest[..end].parse().ok()?;
            path.push(PathElement::Index(idx));
            remaining = &rest[end + 1..];
            remaining = remaining.strip_prefix('.').unwrap_or(remaining);
        } else {
            let end = remaining.find(['.', '[']).unwrap_or(remaining.len());
            path.push(PathElement::Key(remaining[..end].to_string()));
            remaining = &remaining[end..];
            remaining = remaining.strip_prefix('.').unwrap_or(remaining);
        }
    }
    Some(path)
}

fn try_assignment(filter: &str, root: &Value) -> Option<Result<Value, String>> {
    let (lhs, rhs) = filter.split_once(" = ")?;
    let path = parse_simple_path(lhs)?;
    let parsed: Value = serde_json::from_str(rhs.trim())
        .map(Value::from_serde_json)
        .unwrap_or_else(|_| Value::String(rhs.trim().trim_matches('"').to_string()));
    Some(Ok(set_path(root, &path, parsed)))
}

fn try_del(filter: &str, root: &Value) -> Option<Result<Value, String>> {
    let inner = filter.trim().strip_prefix("del(")?.strip_suffix(')')?;
    let path = parse_simple_path(inner)?;
    Some(Ok(delete_path(root, &path)))
}

#[async_trait]
impl Command for YqCommand {
    fn name(&self) -> &'static str {
        "yq"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let opts = match parse_args(&ctx.args) {
            Ok(o) => o,
            Err(e) => return CommandResult::error(format!("yq: {e}\n")),
        };
        if ctx.stdin.trim().is_empty() {
            return CommandResult::success(String::new());
        }
        let root = match parse_input(&ctx.stdin, opts.input_format) {
            Ok(v) => v,
            Err(e) => return CommandResult::error(format!("yq: {e}\n")),
        };

        let filter = opts.filter.as_deref().unwrap_or(".");
        let result = if let Some(r) = try_assignment(filter, &root) {
            r
        } else if let Some(r) = try_del(filter, &root) {
            r
        } else {
            match parse(filter).and_then(|ast| evaluate(&ast, &root, &EvalContext::new()).map_err(|e| e.to_string())) {
                Ok(values) => Ok(values.into_iter().next().unwrap_or(Value::Null)),
                Err(e) => Err(e),
            }
        };

        match result {
            Ok(value) => match render_output(&value, opts.output_format) {
                Ok(text) => CommandResult::success(text),
                Err(e) => CommandResult::error(format!("yq: {e}\n")),
            },
            Err(e) => CommandResult::error(format!("yq: {e}\n")),
        }
    }
}
