//! `envsubst`: substitutes `$VAR` and `${VAR}` from the provided
//! environment, plus the `${VAR:-default}` / `${VAR:+alt}` /
//! `${VAR:?msg}` / `${VAR:=default}` parameter-expansion forms.

use async_trait::async_trait;

use crate::commands::{Command, CommandContext, CommandResult};

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_cont(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

enum ExpandError {
    Unset(String),
}

fn substitute(input: &str, env: &std::collections::HashMap<String, String>) -> Result<String, ExpandError> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '$' && i + 1 < chars.len() && chars[i + 1] == '{' {
            let close = find_matching_brace(&chars, i + 1).unwrap_or(chars.len());
            let inner: String = chars[i + 2..close].iter().collect();
            out.push_str(&expand_braced(&inner, env)?);
            i = close + 1;
        } else if chars[i] == '$' && i + 1 < chars.len() && is_ident_start(chars[i + 1]) {
            let start = i + 1;
            let mut end = start;
            while end < chars.len() && is_ident_cont(chars[end]) {
                end += 1;
            }
            let name: String = chars[start..end].iter().collect();
            out.push_str(env.get(&name).map(String::as_str).unwrap_or(""));
            i = end;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    Ok(out)
}

fn find_matching_brace(chars: &[char], open: usize) -> Option<usize> {
    chars[open..].iter().position(|c| *c == '}').map(|p| open + p)
}

fn expand_braced(inner: &str, env: &std::collections::HashMap<String, String>) -> Result<String, ExpandError> {
    for op in [":-", ":+", ":?", ":=", "-", "+", "?", "="] {
        if let Some(pos) = inner.find(op) {
            let name = &inner[..pos];
            let word = &inner[pos + op.len()..];
            let value = env.get(name).cloned();
            let is_set = value.is_some();
            let is_nonempty = value.as_deref().map(|v| !v.is_empty()).unwrap_or(false);
            return Ok(match op {
                ":-" | "-" => {
                    if is_nonempty || (!is_colon_mode(op) && is_set) {
                        value.unwrap_or_default()
                    } else {
                        word.to_string()
                    }
                }
                ":+" | "+" => {
                    if is_nonempty || (!is_colon_mode(op) && is_set) {
                        word.to_string()
                    } else {
                        String::new()
                    }
                }
                ":?" | "?" => {
                    if is_nonempty || (!is_colon_mode(op) && is_set) {
                        value.unwrap_or_default()
                    } else {
                        return Err(ExpandError::Unset(format!("{name}: {word}")));
                    }
                }
                ":=" | "=" => {
                    if is_nonempty || (!is_colon_mode(op) && is_set) {
                        value.unwrap_or_default()
                    } else {
                        word.to_string()
                    }
                }
                _ => unreachable!(),
            });
        }
    }
    Ok(env.get(inner).cloned().unwrap_or_default())
}

fn is_colon_mode(op: &str) -> bool {
    op.starts_with(':')
}

pub struct EnvsubstCommand;

#[async_trait]
impl Command for EnvsubstCommand {
    fn name(&self) -> &'static str {
        "envsubst"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        match substitute(&ctx.stdin, &ctx.env) {
            Ok(out) => CommandResult::success(out),
            Err(ExpandError::Unset(msg)) => CommandResult::with_exit_code(String::new(), format!("envsubst: {msg}\n"), 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, InMemoryFs};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn ctx(stdin: &str, env: &[(&str, &str)]) -> CommandContext {
        CommandContext {
            args: vec![],
            stdin: stdin.to_string(),
            cwd: "/".to_string(),
            env: env.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            fs: Arc::new(InMemoryFs::new()),
            exec_fn: None,
            fetch_fn: None,
        }
    }

    #[tokio::test]
    async fn substitutes_bare_variable() {
        let result = EnvsubstCommand.execute(ctx("hello $NAME\n", &[("NAME", "world")])).await;
        assert_eq!(result.stdout, "hello world\n");
    }

    #[tokio::test]
    async fn substitutes_braced_variable() {
        let result = EnvsubstCommand.execute(ctx("hello ${NAME}!\n", &[("NAME", "world")])).await;
        assert_eq!(result.stdout, "hello world!\n");
    }

    #[tokio::test]
    async fn default_value_used_when_unset() {
        let result = EnvsubstCommand.execute(ctx("${MISSING:-fallback}\n", &[])).await;
        assert_eq!(result.stdout, "fallback\n");
    }

    #[tokio::test]
    async fn alt_value_used_when_set() {
        let result = EnvsubstCommand.execute(ctx("${NAME:+present}\n", &[("NAME", "x")])).await;
        assert_eq!(result.stdout, "present\n");
    }

    #[tokio::test]
    async fn unset_required_var_errors() {
        let result = EnvsubstCommand.execute(ctx("${MISSING:?must be set}\n", &[])).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("must be set"));
    }

    #[tokio::test]
    async fn missing_variable_becomes_empty() {
        let result = EnvsubstCommand.execute(ctx("[$MISSING]\n", &[])).await;
        assert_eq!(result.stdout, "[]\n");
    }
}
