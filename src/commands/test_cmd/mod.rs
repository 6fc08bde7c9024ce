//! `test`/`[`: evaluate a conditional expression (spec.md's
//! control-flow group). `-nt`/`-ot` are the file-comparison binary
//! operators GNU `test` supports alongside `-eq`/`-lt`/etc; they need
//! both operands' `FsStat::mtime`, so they get their own branch in the
//! three-argument case rather than falling through to string compare.

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct TestCommand;

#[async_trait]
impl Command for TestCommand {
    fn name(&self) -> &'static str {
        "test"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let args = &ctx.args;

        if args.is_empty() {
            return CommandResult::with_exit_code(String::new(), String::new(), 1);
        }

        let args: Vec<&str> = if args[0] == "[" {
            if args.last().map(|s| s.as_str()) != Some("]") {
                return CommandResult::error("test: missing ']'\n".to_string());
            }
            args[1..args.len() - 1].iter().map(|s| s.as_str()).collect()
        } else {
            args.iter().map(|s| s.as_str()).collect()
        };

        if args.is_empty() {
            return CommandResult::with_exit_code(String::new(), String::new(), 1);
        }

        let result = evaluate_expression(&args, &ctx).await;
        CommandResult::with_exit_code(String::new(), String::new(), if result { 0 } else { 1 })
    }
}

async fn file_mtime(ctx: &CommandContext, path: &str) -> Option<std::time::SystemTime> {
    let resolved = ctx.fs.resolve_path(&ctx.cwd, path);
    ctx.fs.stat(&resolved).await.ok().map(|s| s.mtime)
}

async fn evaluate_expression(args: &[&str], ctx: &CommandContext) -> bool {
    if args.len() == 1 {
        return !args[0].is_empty();
    }

    if args[0] == "!" {
        return !Box::pin(evaluate_expression(&args[1..], ctx)).await;
    }

    if args.len() >= 3 {
        for i in 1..args.len() {
            match args[i] {
                "-a" => {
                    let left = Box::pin(evaluate_expression(&args[..i], ctx)).await;
                    let right = Box::pin(evaluate_expression(&args[i + 1..], ctx)).await;
                    return left && right;
                }
                "-o" => {
                    let left = Box::pin(evaluate_expression(&args[..i], ctx)).await;
                    let right = Box::pin(evaluate_expression(&args[i + 1..], ctx)).await;
                    return left || right;
                }
                _ => {}
            }
        }
    }

    if args.len() == 3 {
        let left = args[0];
        let op = args[1];
        let right = args[2];

        match op {
            "=" | "==" => return left == right,
            "!=" => return left != right,
            "-eq" => return left.parse::<i64>().unwrap_or(0) == right.parse::<i64>().unwrap_or(0),
            "-ne" => return left.parse::<i64>().unwrap_or(0) != right.parse::<i64>().unwrap_or(0),
            "-lt" => return left.parse::<i64>().unwrap_or(0) < right.parse::<i64>().unwrap_or(0),
            "-le" => return left.parse::<i64>().unwrap_or(0) <= right.parse::<i64>().unwrap_or(0),
            "-gt" => return left.parse::<i64>().unwrap_or(0) > right.parse::<i64>().unwrap_or(0),
            "-ge" => return left.parse::<i64>().unwrap_or(0) >= right.parse::<i64>().unwrap_or(0),
            "-nt" => {
                return match (file_mtime(ctx, left).await, file_mtime(ctx, right).await) {
                    (Some(l), Some(r)) => l > r,
                    (Some(_), None) => true,
                    _ => false,
                };
            }
            "-ot" => {
                return match (file_mtime(ctx, left).await, file_mtime(ctx, right).await) {
                    (Some(l), Some(r)) => l < r,
                    (None, Some(_)) => true,
                    _ => false,
                };
            }
            "-ef" => {
                return ctx.fs.resolve_path(&ctx.cwd, left) == ctx.fs.resolve_path(&ctx.cwd, right);
            }
            _ => {}
        }
    }

    if args.len() == 2 {
        let op = args[0];
        let operand = args[1];

        match op {
            "-z" => return operand.is_empty(),
            "-n" => return !operand.is_empty(),
            "-e" => return ctx.fs.exists(&ctx.fs.resolve_path(&ctx.cwd, operand)).await,
            "-f" => {
                let path = ctx.fs.resolve_path(&ctx.cwd, operand);
                return ctx.fs.stat(&path).await.map(|s| s.is_file).unwrap_or(false);
            }
            "-d" => {
                let path = ctx.fs.resolve_path(&ctx.cwd, operand);
                return ctx.fs.stat(&path).await.map(|s| s.is_directory).unwrap_or(false);
            }
            "-s" => {
                let path = ctx.fs.resolve_path(&ctx.cwd, operand);
                return ctx.fs.stat(&path).await.map(|s| s.size > 0).unwrap_or(false);
            }
            "-r" | "-w" | "-x" => {
                let path = ctx.fs.resolve_path(&ctx.cwd, operand);
                return ctx.fs.exists(&path).await;
            }
            "-L" | "-h" => {
                let path = ctx.fs.resolve_path(&ctx.cwd, operand);
                return ctx.fs.lstat(&path).await.map(|s| s.is_symlink).unwrap_or(false);
            }
            _ => {}
        }
    }

    false
}

pub struct BracketCommand;

#[async_trait]
impl Command for BracketCommand {
    fn name(&self) -> &'static str {
        "["
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.args.last().map(|s| s.as_str()) != Some("]") {
            return CommandResult::error("[: missing ']'\n".to_string());
        }

        let args: Vec<&str> = ctx.args[..ctx.args.len() - 1].iter().map(|s| s.as_str()).collect();

        if args.is_empty() {
            return CommandResult::with_exit_code(String::new(), String::new(), 1);
        }

        let result = evaluate_expression(&args, &ctx).await;
        CommandResult::with_exit_code(String::new(), String::new(), if result { 0 } else { 1 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, InMemoryFs};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn ctx(args: Vec<&str>) -> CommandContext {
        CommandContext { args: args.into_iter().map(String::from).collect(), stdin: String::new(), cwd: "/".to_string(), env: HashMap::new(), fs: Arc::new(InMemoryFs::new()), exec_fn: None, fetch_fn: None }
    }

    async fn ctx_with_files(args: Vec<&str>, files: Vec<(&str, &str)>) -> CommandContext {
        let fs = Arc::new(InMemoryFs::new());
        for (path, content) in files {
            fs.write_file(path, content.as_bytes()).await.unwrap();
        }
        CommandContext { args: args.into_iter().map(String::from).collect(), stdin: String::new(), cwd: "/".to_string(), env: HashMap::new(), fs, exec_fn: None, fetch_fn: None }
    }

    #[tokio::test]
    async fn no_arguments_is_false() {
        assert_eq!(TestCommand.execute(ctx(vec![])).await.exit_code, 1);
    }

    #[tokio::test]
    async fn a_single_nonempty_argument_is_true() {
        assert_eq!(TestCommand.execute(ctx(vec!["hello"])).await.exit_code, 0);
    }

    #[tokio::test]
    async fn string_equality() {
        assert_eq!(TestCommand.execute(ctx(vec!["hello", "=", "hello"])).await.exit_code, 0);
        assert_eq!(TestCommand.execute(ctx(vec!["hello", "!=", "world"])).await.exit_code, 0);
    }

    #[tokio::test]
    async fn numeric_comparisons() {
        assert_eq!(TestCommand.execute(ctx(vec!["5", "-eq", "5"])).await.exit_code, 0);
        assert_eq!(TestCommand.execute(ctx(vec!["3", "-lt", "5"])).await.exit_code, 0);
        assert_eq!(TestCommand.execute(ctx(vec!["5", "-gt", "3"])).await.exit_code, 0);
    }

    #[tokio::test]
    async fn z_and_n_check_emptiness() {
        assert_eq!(TestCommand.execute(ctx(vec!["-z", ""])).await.exit_code, 0);
        assert_eq!(TestCommand.execute(ctx(vec!["-n", "hello"])).await.exit_code, 0);
        assert_eq!(TestCommand.execute(ctx(vec!["-z", "hello"])).await.exit_code, 1);
    }

    #[tokio::test]
    async fn file_existence_and_type_checks() {
        let c = ctx_with_files(vec!["-e", "/test.txt"], vec![("/test.txt", "content")]).await;
        assert_eq!(TestCommand.execute(c).await.exit_code, 0);
        let c = ctx_with_files(vec!["-f", "/test.txt"], vec![("/test.txt", "content")]).await;
        assert_eq!(TestCommand.execute(c).await.exit_code, 0);
        let c = ctx_with_files(vec!["-d", "/dir"], vec![("/dir/file.txt", "content")]).await;
        assert_eq!(TestCommand.execute(c).await.exit_code, 0);
        assert_eq!(TestCommand.execute(ctx(vec!["-e", "/nonexistent"])).await.exit_code, 1);
    }

    #[tokio::test]
    async fn negation_and_boolean_combinators() {
        assert_eq!(TestCommand.execute(ctx(vec!["!", "-z", "hello"])).await.exit_code, 0);
        assert_eq!(TestCommand.execute(ctx(vec!["-n", "a", "-a", "-n", "b"])).await.exit_code, 0);
        assert_eq!(TestCommand.execute(ctx(vec!["-z", "a", "-o", "-n", "b"])).await.exit_code, 0);
        assert_eq!(TestCommand.execute(ctx(vec!["-z", "a", "-a", "-z", "b"])).await.exit_code, 1);
    }

    #[tokio::test]
    async fn bracket_form_requires_a_closing_bracket() {
        assert_eq!(TestCommand.execute(ctx(vec!["[", "-n", "hello", "]"])).await.exit_code, 0);
        let result = TestCommand.execute(ctx(vec!["[", "-n", "hello"])).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("missing ']'"));
    }

    #[tokio::test]
    async fn bracket_command_mirrors_test() {
        assert_eq!(BracketCommand.execute(ctx(vec!["-f", "/file.txt", "]"])).await.exit_code, 1);
        let result = BracketCommand.execute(ctx(vec!["-f", "/file.txt"])).await;
        assert!(result.stderr.contains("missing ']'"));
    }

    #[tokio::test]
    async fn nt_is_true_when_left_file_is_newer() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/older.txt", b"x").await.unwrap();
        fs.write_file("/newer.txt", b"x").await.unwrap();
        let mut c = ctx(vec!["/newer.txt", "-nt", "/older.txt"]);
        c.fs = fs;
        assert_eq!(TestCommand.execute(c).await.exit_code, 0);
    }

    #[tokio::test]
    async fn ot_is_true_when_left_file_is_older() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/older.txt", b"x").await.unwrap();
        fs.write_file("/newer.txt", b"x").await.unwrap();
        let mut c = ctx(vec!["/older.txt", "-ot", "/newer.txt"]);
        c.fs = fs;
        assert_eq!(TestCommand.execute(c).await.exit_code, 0);
    }

    #[tokio::test]
    async fn ef_is_true_for_the_same_resolved_path() {
        let c = ctx_with_files(vec!["a.txt", "-ef", "/a.txt"], vec![("/a.txt", "x")]).await;
        assert_eq!(TestCommand.execute(c).await.exit_code, 0);
    }
}
