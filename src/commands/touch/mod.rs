//! `touch`: update file timestamps, creating missing files by default
//! (spec.md's filesystem-mutation group). `-r FILE` needs that file's
//! own `FsStat::mtime` resolved before any target gets touched, so it's
//! looked up once up front rather than per-target.

use async_trait::async_trait;
use std::time::SystemTime;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct TouchCommand;

const HELP: &str = "Usage: touch [OPTION]... FILE...

Update the access and modification times of each FILE to the current time.

Options:
  -c, --no-create      do not create any files
  -r, --reference=FILE  use this file's times instead of current time
  -d, --date=STRING    parse STRING and use it instead of current time (ignored)
      --help           display this help and exit
";

#[async_trait]
impl Command for TouchCommand {
    fn name(&self) -> &'static str {
        "touch"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.has_flag(&["--help"]) {
            return CommandResult::success(HELP.to_string());
        }

        let mut files: Vec<String> = Vec::new();
        let mut no_create = false;
        let mut reference: Option<String> = None;

        let mut i = 0;
        while i < ctx.args.len() {
            let arg = &ctx.args[i];

            if arg == "--" {
                files.extend(ctx.args[i + 1..].iter().cloned());
                break;
            } else if arg == "-r" || arg == "--reference" {
                i += 1;
                reference = ctx.args.get(i).cloned();
            } else if let Some(value) = arg.strip_prefix("--reference=") {
                reference = Some(value.to_string());
            } else if arg == "-d" || arg == "--date" {
                i += 1;
            } else if arg.starts_with("--date=") {
            } else if arg == "-c" || arg == "--no-create" {
                no_create = true;
            } else if arg == "-a" || arg == "-m" || arg == "-t" {
                if arg == "-t" {
                    i += 1;
                }
            } else if arg.starts_with('-') && arg.len() > 1 {
                for c in arg[1..].chars() {
                    match c {
                        'c' => no_create = true,
                        'a' | 'm' => {}
                        _ => {}
                    }
                }
            } else {
                files.push(arg.clone());
            }
            i += 1;
        }

        if files.is_empty() {
            return CommandResult::error("touch: missing file operand\n".to_string());
        }

        let target_time = if let Some(ref_file) = &reference {
            let ref_path = ctx.fs.resolve_path(&ctx.cwd, ref_file);
            match ctx.fs.stat(&ref_path).await {
                Ok(stat) => stat.mtime,
                Err(e) => return CommandResult::error(format!("touch: failed to get attributes of '{ref_file}': {e}\n")),
            }
        } else {
            SystemTime::now()
        };

        let mut stderr = String::new();
        let mut exit_code = 0;

        for file in &files {
            let path = ctx.fs.resolve_path(&ctx.cwd, file);
            let exists = ctx.fs.exists(&path).await;

            if !exists {
                if no_create {
                    continue;
                }
                if let Err(e) = ctx.fs.write_file(&path, &[]).await {
                    stderr.push_str(&format!("touch: cannot touch '{file}': {e}\n"));
                    exit_code = 1;
                    continue;
                }
            }

            if let Err(e) = ctx.fs.utimes(&path, target_time).await {
                stderr.push_str(&format!("touch: cannot touch '{file}': {e}\n"));
                exit_code = 1;
            }
        }

        CommandResult::with_exit_code(String::new(), stderr, exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, InMemoryFs};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn ctx(args: Vec<&str>, fs: Arc<InMemoryFs>) -> CommandContext {
        CommandContext { args: args.into_iter().map(String::from).collect(), stdin: String::new(), cwd: "/".to_string(), env: HashMap::new(), fs, exec_fn: None, fetch_fn: None }
    }

    #[tokio::test]
    async fn creates_a_missing_file() {
        let fs = Arc::new(InMemoryFs::new());
        let result = TouchCommand.execute(ctx(vec!["/newfile.txt"], fs.clone())).await;
        assert_eq!(result.exit_code, 0);
        assert!(fs.exists("/newfile.txt").await);
    }

    #[tokio::test]
    async fn no_create_leaves_a_missing_file_untouched() {
        let fs = Arc::new(InMemoryFs::new());
        let result = TouchCommand.execute(ctx(vec!["-c", "/nonexistent.txt"], fs.clone())).await;
        assert_eq!(result.exit_code, 0);
        assert!(!fs.exists("/nonexistent.txt").await);
    }

    #[tokio::test]
    async fn missing_operand_is_an_error() {
        let result = TouchCommand.execute(ctx(vec![], Arc::new(InMemoryFs::new()))).await;
        assert!(result.stderr.contains("missing file operand"));
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn multiple_files_all_get_created() {
        let fs = Arc::new(InMemoryFs::new());
        let result = TouchCommand.execute(ctx(vec!["/a.txt", "/b.txt"], fs.clone())).await;
        assert_eq!(result.exit_code, 0);
        assert!(fs.exists("/a.txt").await);
        assert!(fs.exists("/b.txt").await);
    }

    #[tokio::test]
    async fn reference_copies_another_files_mtime() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/source.txt", b"x").await.unwrap();
        let source_mtime = fs.stat("/source.txt").await.unwrap().mtime;
        let result = TouchCommand.execute(ctx(vec!["-r", "/source.txt", "/target.txt"], fs.clone())).await;
        assert_eq!(result.exit_code, 0);
        assert_eq!(fs.stat("/target.txt").await.unwrap().mtime, source_mtime);
    }

    #[tokio::test]
    async fn reference_to_a_missing_file_is_an_error() {
        let fs = Arc::new(InMemoryFs::new());
        let result = TouchCommand.execute(ctx(vec!["--reference=/missing.txt", "/target.txt"], fs.clone())).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("failed to get attributes"));
    }
}
