//! `rm`: remove files and, with `-r`, directories (spec.md's
//! filesystem-mutation group). `-d` covers the GNU-specific case of an
//! empty directory removed without recursion, distinct from `-r`'s
//! "remove whatever's inside too" semantics.

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};
use crate::fs::RmOptions;

pub struct RmCommand;

const HELP: &str = "Usage: rm [OPTION]... [FILE]...

Remove (unlink) the FILE(s).

Options:
  -f, --force          ignore nonexistent files and arguments
  -r, -R, --recursive   remove directories and their contents recursively
  -d, --dir             remove empty directories
  -v, --verbose         explain what is being done
      --help            display this help and exit
";

#[derive(Default)]
struct Options {
    recursive: bool,
    force: bool,
    verbose: bool,
    empty_dir: bool,
}

fn parse_short_run(arg: &str) -> Option<Options> {
    let body = arg.strip_prefix('-')?;
    if body.is_empty() || body.starts_with('-') || !body.chars().all(|c| matches!(c, 'r' | 'R' | 'f' | 'v' | 'd')) {
        return None;
    }
    let mut opts = Options::default();
    for c in body.chars() {
        match c {
            'r' | 'R' => opts.recursive = true,
            'f' => opts.force = true,
            'v' => opts.verbose = true,
            'd' => opts.empty_dir = true,
            _ => unreachable!(),
        }
    }
    Some(opts)
}

#[async_trait]
impl Command for RmCommand {
    fn name(&self) -> &'static str {
        "rm"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.has_flag(&["--help"]) {
            return CommandResult::success(HELP.to_string());
        }

        let mut opts = Options::default();
        let mut paths: Vec<String> = Vec::new();

        for arg in &ctx.args {
            match arg.as_str() {
                "--recursive" => opts.recursive = true,
                "--force" => opts.force = true,
                "--verbose" => opts.verbose = true,
                "--dir" => opts.empty_dir = true,
                _ => match parse_short_run(arg) {
                    Some(parsed) => {
                        opts.recursive |= parsed.recursive;
                        opts.force |= parsed.force;
                        opts.verbose |= parsed.verbose;
                        opts.empty_dir |= parsed.empty_dir;
                    }
                    None if !arg.starts_with('-') => paths.push(arg.clone()),
                    None => {}
                },
            }
        }

        if paths.is_empty() {
            return if opts.force { CommandResult::success(String::new()) } else { CommandResult::error("rm: missing operand\n".to_string()) };
        }

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;

        for path in &paths {
            let full_path = ctx.fs.resolve_path(&ctx.cwd, path);

            match ctx.fs.stat(&full_path).await {
                Ok(stat) if stat.is_directory && !opts.recursive && !opts.empty_dir => {
                    stderr.push_str(&format!("rm: cannot remove '{path}': Is a directory\n"));
                    exit_code = 1;
                    continue;
                }
                Ok(_) => {}
                Err(_) => {
                    if !opts.force {
                        stderr.push_str(&format!("rm: cannot remove '{path}': No such file or directory\n"));
                        exit_code = 1;
                    }
                    continue;
                }
            }

            let fs_opts = RmOptions { recursive: opts.recursive, force: opts.force };
            match ctx.fs.rm(&full_path, &fs_opts).await {
                Ok(()) => {
                    if opts.verbose {
                        stdout.push_str(&format!("removed '{path}'\n"));
                    }
                }
                Err(e) => {
                    if !opts.force {
                        let msg = format!("{e:?}");
                        if msg.contains("NotEmpty") {
                            stderr.push_str(&format!("rm: cannot remove '{path}': Directory not empty\n"));
                        } else {
                            stderr.push_str(&format!("rm: cannot remove '{path}': {msg}\n"));
                        }
                        exit_code = 1;
                    }
                }
            }
        }

        CommandResult::with_exit_code(stdout, stderr, exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, InMemoryFs, MkdirOptions};
    use std::collections::HashMap;
    use std::sync::Arc;

    async fn ctx_with_files(args: Vec<&str>, files: Vec<(&str, &str)>) -> CommandContext {
        let fs = Arc::new(InMemoryFs::new());
        for (path, content) in files {
            fs.write_file(path, content.as_bytes()).await.unwrap();
        }
        CommandContext { args: args.into_iter().map(String::from).collect(), stdin: String::new(), cwd: "/".to_string(), env: HashMap::new(), fs, exec_fn: None, fetch_fn: None }
    }

    #[tokio::test]
    async fn removes_a_plain_file() {
        let ctx = ctx_with_files(vec!["/test.txt"], vec![("/test.txt", "content")]).await;
        let fs = ctx.fs.clone();
        let result = RmCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
        assert!(!fs.exists("/test.txt").await);
    }

    #[tokio::test]
    async fn a_missing_file_without_force_is_an_error() {
        let result = RmCommand.execute(ctx_with_files(vec!["/nonexistent.txt"], vec![]).await).await;
        assert!(result.stderr.contains("No such file or directory"));
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn force_silences_the_missing_file_error() {
        let result = RmCommand.execute(ctx_with_files(vec!["-f", "/nonexistent.txt"], vec![]).await).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn a_directory_without_r_or_d_is_an_error() {
        let fs = Arc::new(InMemoryFs::new());
        fs.mkdir("/testdir", &MkdirOptions { recursive: false }).await.unwrap();
        let mut ctx = ctx_with_files(vec!["/testdir"], vec![]).await;
        ctx.fs = fs;
        let result = RmCommand.execute(ctx).await;
        assert!(result.stderr.contains("Is a directory"));
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn recursive_removes_directories_and_their_contents() {
        let fs = Arc::new(InMemoryFs::new());
        fs.mkdir("/testdir", &MkdirOptions { recursive: false }).await.unwrap();
        fs.write_file("/testdir/file.txt", b"content").await.unwrap();
        let mut ctx = ctx_with_files(vec!["-r", "/testdir"], vec![]).await;
        ctx.fs = fs.clone();
        let result = RmCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
        assert!(!fs.exists("/testdir").await);
    }

    #[tokio::test]
    async fn dir_flag_removes_an_empty_directory_without_recursive() {
        let fs = Arc::new(InMemoryFs::new());
        fs.mkdir("/empty", &MkdirOptions { recursive: false }).await.unwrap();
        let mut ctx = ctx_with_files(vec!["-d", "/empty"], vec![]).await;
        ctx.fs = fs.clone();
        let result = RmCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
        assert!(!fs.exists("/empty").await);
    }

    #[tokio::test]
    async fn combined_short_flags_apply_recursive_and_force_together() {
        let fs = Arc::new(InMemoryFs::new());
        fs.mkdir("/testdir", &MkdirOptions { recursive: false }).await.unwrap();
        let mut ctx = ctx_with_files(vec!["-rf", "/testdir", "/nonexistent.txt"], vec![]).await;
        ctx.fs = fs.clone();
        let result = RmCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
        assert!(!fs.exists("/testdir").await);
    }
}
