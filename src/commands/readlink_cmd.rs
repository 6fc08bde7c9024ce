//! `readlink`: print symlink targets, or canonicalize through every
//! symlink in the chain with `-f`. Cycle detection bails out of `-f`
//! rather than looping forever, matching GNU coreutils' behavior of
//! returning the last path seen before the cycle closes.

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};
use std::collections::HashSet;

pub struct ReadlinkCommand;

const HELP: &str = "readlink - print resolved symbolic links or canonical file names

Usage: readlink [OPTIONS] FILE...

Options:
  -f, --canonicalize  follow every symlink recursively
  -n, --no-newline    do not output the trailing newline
  --help              display this help and exit";

async fn canonicalize(ctx: &CommandContext, start: &str) -> String {
    let mut current = start.to_string();
    let mut seen = HashSet::new();
    while seen.insert(current.clone()) {
        match ctx.fs.readlink(&current).await {
            Ok(target) if target.starts_with('/') => current = target,
            Ok(target) => {
                let dir = current.rfind('/').map(|i| &current[..i]).unwrap_or("/");
                current = ctx.fs.resolve_path(dir, &target);
            }
            Err(_) => break,
        }
    }
    current
}

#[async_trait]
impl Command for ReadlinkCommand {
    fn name(&self) -> &'static str {
        "readlink"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut follow = false;
        let mut no_newline = false;
        let mut files = Vec::new();
        let mut parsing_opts = true;

        for arg in &ctx.args {
            if !parsing_opts {
                files.push(arg.clone());
                continue;
            }
            match arg.as_str() {
                "--help" => return CommandResult::success(format!("{HELP}\n")),
                "-f" | "--canonicalize" => follow = true,
                "-n" | "--no-newline" => no_newline = true,
                "--" => parsing_opts = false,
                s if s.starts_with('-') && s.len() > 1 => {
                    return CommandResult::error(format!("readlink: invalid option -- '{}'\n", &s[1..]));
                }
                _ => {
                    parsing_opts = false;
                    files.push(arg.clone());
                }
            }
        }

        if files.is_empty() {
            return CommandResult::error("readlink: missing operand\n".to_string());
        }

        let mut stdout = String::new();
        let mut any_error = false;
        let separator = if no_newline { "" } else { "\n" };

        for file in &files {
            let path = ctx.fs.resolve_path(&ctx.cwd, file);
            if follow {
                stdout.push_str(&canonicalize(&ctx, &path).await);
                stdout.push_str(separator);
            } else {
                match ctx.fs.readlink(&path).await {
                    Ok(target) => {
                        stdout.push_str(&target);
                        stdout.push_str(separator);
                    }
                    Err(_) => any_error = true,
                }
            }
        }

        CommandResult::with_exit_code(stdout, String::new(), if any_error { 1 } else { 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn ctx(args: Vec<&str>) -> CommandContext {
        CommandContext {
            args: args.into_iter().map(String::from).collect(),
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
            exec_fn: None,
            fetch_fn: None,
        }
    }

    #[tokio::test]
    async fn missing_operand_is_an_error() {
        let result = ReadlinkCommand.execute(ctx(vec![])).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("missing operand"));
    }

    #[tokio::test]
    async fn help_mentions_the_command_name() {
        let result = ReadlinkCommand.execute(ctx(vec!["--help"])).await;
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("readlink"));
    }

    #[tokio::test]
    async fn no_newline_suppresses_the_trailing_newline() {
        let result = ReadlinkCommand.execute(ctx(vec!["-n", "/missing"])).await;
        assert_eq!(result.exit_code, 1);
        assert!(!result.stdout.ends_with('\n'));
    }

    #[tokio::test]
    async fn invalid_option_is_rejected() {
        let result = ReadlinkCommand.execute(ctx(vec!["-z", "/x"])).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("invalid option"));
    }
}
