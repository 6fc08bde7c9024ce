//! A minimal `jq`: parses a single filter expression and streams it over
//! one or more concatenated JSON values read from stdin.

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};
use crate::commands::query_engine::{evaluate, parse, Value};
use crate::commands::query_engine::context::EvalContext;

pub struct JqCommand;

fn parse_json_stream(input: &str) -> Result<Vec<Value>, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(vec![]);
    }
    let mut de = serde_json::Deserializer::from_str(trimmed).into_iter::<serde_json::Value>();
    let mut out = Vec::new();
    for item in &mut de {
        out.push(Value::from_serde_json(item.map_err(|e| e.to_string())?));
    }
    Ok(out)
}

struct Options {
    raw_output: bool,
    compact: bool,
    slurp: bool,
    null_input: bool,
    args: Vec<(String, Value)>,
    filter: Option<String>,
}

fn parse_args(argv: &[String]) -> Result<Options, String> {
    let mut opts = Options {
        raw_output: false,
        compact: false,
        slurp: false,
        null_input: false,
        args: Vec::new(),
        filter: None,
    };
    let mut i = 0;
    while i < argv.len() {
        match argv[i].as_str() {
            "-r" | "--raw-output" => opts.raw_output = true,
            "-c" | "--compact-output" => opts.compact = true,
            "-s" | "--slurp" => opts.slurp = true,
            "-n" | "--null-input" => opts.null_input = true,
            "--arg" => {
                let name = argv.get(i + 1).ok_or("--arg requires a name")?.clone();
                let value = argv.get(i + 2).ok_or("--arg requires a value")?.clone();
                opts.args.push((name, Value::String(value)));
                i += 2;
            }
            "--argjson" => {
                let name = argv.get(i + 1).ok_or("--argjson requires a name")?.clone();
                let raw = argv.get(i + 2).ok_or("--argjson requires a value")?.clone();
                let json: serde_json::Value = serde_json::from_str(&raw).map_err(|e| e.to_string())?;
                opts.args.push((name, Value::from_serde_json(json)));
                i += 2;
            }
            other if opts.filter.is_none() => opts.filter = Some(other.to_string()),
            _ => {}
        }
        i += 1;
    }
    Ok(opts)
}

fn render(v: &Value, raw: bool, compact: bool) -> String {
    if raw {
        if let Value::String(s) = v {
            return s.clone();
        }
    }
    if compact {
        v.to_json_string_compact()
    } else {
        v.to_json_string()
    }
}

#[async_trait]
impl Command for JqCommand {
    fn name(&self) -> &'static str {
        "jq"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let opts = match parse_args(&ctx.args) {
            Ok(o) => o,
            Err(e) => return CommandResult::error(format!("jq: {e}\n")),
        };
        let Some(filter_src) = &opts.filter else {
            return CommandResult::error("jq: no filter given\n".to_string());
        };
        let ast = match parse(filter_src) {
            Ok(a) => a,
            Err(e) => return CommandResult::error(format!("jq: {e}\n")),
        };

        let mut eval_ctx = EvalContext::with_env(ctx.env.clone());
        for (name, value) in opts.args {
            eval_ctx = eval_ctx.with_var(&name, value);
        }

        let inputs = if opts.null_input {
            vec![Value::Null]
        } else {
            match parse_json_stream(&ctx.stdin) {
                Ok(values) if opts.slurp => vec![Value::Array(values)],
                Ok(values) => values,
                Err(e) => return CommandResult::error(format!("jq: invalid JSON: {e}\n")),
            }
        };

        let mut out = String::new();
        for input in &inputs {
            match evaluate(&ast, input, &eval_ctx) {
                Ok(results) => {
                    for r in results {
                        out.push_str(&render(&r, opts.raw_output, opts.compact));
                        out.push('\n');
                    }
                }
                Err(e) => return CommandResult::with_exit_code(out, format!("jq: {e}\n"), 5),
            }
        }
        CommandResult::success(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn make_ctx(args: &[&str], stdin: &str) -> CommandContext {
        CommandContext {
            args: args.iter().map(|s| s.to_string()).collect(),
            stdin: stdin.to_string(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
            exec_fn: None,
            fetch_fn: None,
        }
    }

    #[tokio::test]
    async fn identity_roundtrips_compact() {
        let cmd = JqCommand;
        let result = cmd.execute(make_ctx(&["-c", "."], r#"{"a":1}"#)).await;
        assert_eq!(result.stdout.trim(), r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn field_and_pipe() {
        let cmd = JqCommand;
        let result = cmd.execute(make_ctx(&["-r", ".name"], r#"{"name":"sam"}"#)).await;
        assert_eq!(result.stdout.trim(), "sam");
    }

    #[tokio::test]
    async fn iterate_over_array() {
        let cmd = JqCommand;
        let result = cmd.execute(make_ctx(&["-c", ".[]"], r#"[1,2,3]"#)).await;
        assert_eq!(result.stdout, "1\n2\n3\n");
    }

    #[tokio::test]
    async fn select_filters_stream() {
        let cmd = JqCommand;
        let result = cmd.execute(make_ctx(&["-c", "select(.ok)"], "{\"ok\":true}\n{\"ok\":false}\n")).await;
        assert_eq!(result.stdout.trim(), r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn map_and_sort_by() {
        let cmd = JqCommand;
        let result = cmd.execute(make_ctx(&["-c", "sort_by(.n)"], r#"[{"n":2},{"n":1}]"#)).await;
        assert_eq!(result.stdout.trim(), r#"[{"n":1},{"n":2}]"#);
    }

    #[tokio::test]
    async fn object_construction_shorthand() {
        let cmd = JqCommand;
        let result = cmd.execute(make_ctx(&["-c", "{name, value}"], r#"{"name":"x","value":1,"extra":2}"#)).await;
        assert_eq!(result.stdout.trim(), r#"{"name":"x","value":1}"#);
    }

    #[tokio::test]
    async fn arg_binding_is_usable_in_filter() {
        let cmd = JqCommand;
        let result = cmd.execute(make_ctx(&["--arg", "who", "sam", "-r", "$who"], "null")).await;
        assert_eq!(result.stdout.trim(), "sam");
    }
}
