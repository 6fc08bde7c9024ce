//! `tee`: copy stdin to stdout and to zero or more files (spec.md's
//! process-construction group, used for fanning a pipeline's output out
//! to disk without breaking the pipe). Per-file write failures are
//! collected but don't stop the remaining files from being attempted.

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct TeeCommand;

const HELP: &str = "Usage: tee [OPTION]... [FILE]...

read from stdin and write to stdout and files

Options:
  -a, --append              append to the given FILEs, do not overwrite
  -i, --ignore-interrupts   ignore interrupt signals
      --help                 display this help and exit
";

#[derive(Default)]
struct Options {
    append: bool,
    ignore_interrupts: bool,
}

fn parse_short_run(arg: &str) -> Option<Options> {
    let body = arg.strip_prefix('-')?;
    if body.is_empty() || body.starts_with('-') || !body.chars().all(|c| matches!(c, 'a' | 'i')) {
        return None;
    }
    let mut opts = Options::default();
    for c in body.chars() {
        match c {
            'a' => opts.append = true,
            'i' => opts.ignore_interrupts = true,
            _ => unreachable!(),
        }
    }
    Some(opts)
}

#[async_trait]
impl Command for TeeCommand {
    fn name(&self) -> &'static str {
        "tee"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.has_flag(&["--help"]) {
            return CommandResult::success(HELP.to_string());
        }

        let mut opts = Options::default();
        let mut files: Vec<String> = Vec::new();

        for arg in &ctx.args {
            match arg.as_str() {
                "--append" => opts.append = true,
                "--ignore-interrupts" => opts.ignore_interrupts = true,
                _ => match parse_short_run(arg) {
                    Some(parsed) => {
                        opts.append |= parsed.append;
                        opts.ignore_interrupts |= parsed.ignore_interrupts;
                    }
                    None => files.push(arg.clone()),
                },
            }
        }
        let _ = opts.ignore_interrupts;

        let content = &ctx.stdin;
        let mut stderr = String::new();
        let mut exit_code = 0;

        for file in &files {
            let path = ctx.fs.resolve_path(&ctx.cwd, file);
            let write = if opts.append {
                ctx.fs.append_file(&path, content.as_bytes()).await
            } else {
                ctx.fs.write_file(&path, content.as_bytes()).await
            };
            if write.is_err() {
                stderr.push_str(&format!("tee: {file}: No such file or directory\n"));
                exit_code = 1;
            }
        }

        CommandResult::with_exit_code(content.clone(), stderr, exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, InMemoryFs};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn ctx_with_fs(args: Vec<&str>, stdin: &str, fs: Arc<InMemoryFs>) -> CommandContext {
        CommandContext { args: args.into_iter().map(String::from).collect(), stdin: stdin.into(), cwd: "/".into(), env: HashMap::new(), fs, exec_fn: None, fetch_fn: None }
    }

    fn ctx(args: Vec<&str>, stdin: &str) -> CommandContext {
        ctx_with_fs(args, stdin, Arc::new(InMemoryFs::new()))
    }

    #[tokio::test]
    async fn stdin_is_always_echoed_to_stdout() {
        let result = TeeCommand.execute(ctx(vec![], "hello\n")).await;
        assert_eq!(result.stdout, "hello\n");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn a_named_file_receives_a_copy_of_stdin() {
        let fs = Arc::new(InMemoryFs::new());
        let result = TeeCommand.execute(ctx_with_fs(vec!["output.txt"], "hello\n", fs.clone())).await;
        assert_eq!(result.stdout, "hello\n");
        assert_eq!(fs.read_file("/output.txt").await.unwrap(), "hello\n");
    }

    #[tokio::test]
    async fn multiple_files_each_get_a_copy() {
        let fs = Arc::new(InMemoryFs::new());
        let result = TeeCommand.execute(ctx_with_fs(vec!["file1.txt", "file2.txt"], "hello\n", fs.clone())).await;
        assert_eq!(result.stdout, "hello\n");
        assert_eq!(fs.read_file("/file1.txt").await.unwrap(), "hello\n");
        assert_eq!(fs.read_file("/file2.txt").await.unwrap(), "hello\n");
    }

    #[tokio::test]
    async fn append_flag_extends_an_existing_file_instead_of_truncating() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/test.txt", b"existing\n").await.unwrap();
        TeeCommand.execute(ctx_with_fs(vec!["-a", "/test.txt"], "appended\n", fs.clone())).await;
        assert_eq!(fs.read_file("/test.txt").await.unwrap(), "existing\nappended\n");
    }

    #[tokio::test]
    async fn combined_short_flags_apply_both_options() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/test.txt", b"existing\n").await.unwrap();
        let result = TeeCommand.execute(ctx_with_fs(vec!["-ai", "/test.txt"], "more\n", fs.clone())).await;
        assert_eq!(result.exit_code, 0);
        assert_eq!(fs.read_file("/test.txt").await.unwrap(), "existing\nmore\n");
    }

    #[tokio::test]
    async fn help_mentions_append_and_stdin() {
        let result = TeeCommand.execute(ctx(vec!["--help"], "")).await;
        assert!(result.stdout.contains("tee"));
        assert!(result.stdout.contains("stdin"));
    }

    #[tokio::test]
    async fn a_path_under_a_nonexistent_directory_gets_its_parents_created() {
        let fs = Arc::new(InMemoryFs::new());
        let result = TeeCommand.execute(ctx_with_fs(vec!["/deep/nested/output.txt"], "hello\n", fs.clone())).await;
        assert_eq!(result.exit_code, 0);
        assert_eq!(fs.read_file("/deep/nested/output.txt").await.unwrap(), "hello\n");
    }
}
