//! `mv`: rename or move files and directories (spec.md's
//! filesystem-mutation group). `-u` needs both sides' `FsStat` before
//! deciding whether to skip a source, so it runs its own check ahead of
//! the existence-only `-n` gate.

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct MvCommand;

const HELP: &str = "Usage: mv [OPTION]... SOURCE... DEST

Rename SOURCE to DEST, or move SOURCE(s) to DIRECTORY.

Options:
  -f, --force        do not prompt before overwriting
  -n, --no-clobber    do not overwrite an existing file
  -u, --update        move only when SOURCE is newer than DEST, or DEST is missing
  -v, --verbose       explain what is being done
      --help          display this help and exit
";

#[derive(Default)]
struct Options {
    no_clobber: bool,
    update: bool,
    verbose: bool,
}

fn parse_short_run(arg: &str) -> Option<Options> {
    let body = arg.strip_prefix('-')?;
    if body.is_empty() || body.starts_with('-') || !body.chars().all(|c| matches!(c, 'f' | 'n' | 'u' | 'v')) {
        return None;
    }
    let mut opts = Options::default();
    for c in body.chars() {
        match c {
            'f' => {}
            'n' => opts.no_clobber = true,
            'u' => opts.update = true,
            'v' => opts.verbose = true,
            _ => unreachable!(),
        }
    }
    Some(opts)
}

#[async_trait]
impl Command for MvCommand {
    fn name(&self) -> &'static str {
        "mv"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.has_flag(&["--help"]) {
            return CommandResult::success(HELP.to_string());
        }

        let mut opts = Options::default();
        let mut paths: Vec<String> = Vec::new();

        for arg in &ctx.args {
            match arg.as_str() {
                "--force" => {}
                "--no-clobber" => opts.no_clobber = true,
                "--update" => opts.update = true,
                "--verbose" => opts.verbose = true,
                _ => match parse_short_run(arg) {
                    Some(parsed) => {
                        opts.no_clobber |= parsed.no_clobber;
                        opts.update |= parsed.update;
                        opts.verbose |= parsed.verbose;
                    }
                    None if !arg.starts_with('-') => paths.push(arg.clone()),
                    None => {}
                },
            }
        }

        if paths.len() < 2 {
            return CommandResult::error("mv: missing destination file operand\n".to_string());
        }

        let dest = paths.pop().unwrap();
        let sources = paths;
        let dest_path = ctx.fs.resolve_path(&ctx.cwd, &dest);

        let dest_is_dir = match ctx.fs.stat(&dest_path).await {
            Ok(stat) => stat.is_directory,
            Err(_) => false,
        };

        if sources.len() > 1 && !dest_is_dir {
            return CommandResult::error(format!("mv: target '{dest}' is not a directory\n"));
        }

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;

        for src in &sources {
            let src_path = ctx.fs.resolve_path(&ctx.cwd, src);

            let src_stat = match ctx.fs.stat(&src_path).await {
                Ok(s) => s,
                Err(_) => {
                    stderr.push_str(&format!("mv: cannot stat '{src}': No such file or directory\n"));
                    exit_code = 1;
                    continue;
                }
            };

            let target_path = if dest_is_dir {
                let basename = src.rsplit('/').next().unwrap_or(src);
                ctx.fs.resolve_path(&dest_path, basename)
            } else {
                dest_path.clone()
            };

            let dest_stat = ctx.fs.stat(&target_path).await.ok();

            if opts.no_clobber && dest_stat.is_some() {
                continue;
            }

            if opts.update {
                if let Some(ref d) = dest_stat {
                    if d.mtime >= src_stat.mtime {
                        continue;
                    }
                }
            }

            match ctx.fs.mv(&src_path, &target_path).await {
                Ok(()) => {
                    if opts.verbose {
                        stdout.push_str(&format!("renamed '{src}' -> '{target_path}'\n"));
                    }
                }
                Err(e) => {
                    stderr.push_str(&format!("mv: cannot move '{src}': {e}\n"));
                    exit_code = 1;
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
    async fn renames_a_file() {
        let ctx = ctx_with_files(vec!["/old.txt", "/new.txt"], vec![("/old.txt", "content")]).await;
        let fs = ctx.fs.clone();
        let result = MvCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
        assert!(!fs.exists("/old.txt").await);
        assert!(fs.exists("/new.txt").await);
    }

    #[tokio::test]
    async fn moving_into_a_directory_keeps_the_basename() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/src.txt", b"content").await.unwrap();
        fs.mkdir("/destdir", &MkdirOptions { recursive: false }).await.unwrap();
        let mut ctx = ctx_with_files(vec!["/src.txt", "/destdir"], vec![]).await;
        ctx.fs = fs.clone();
        let result = MvCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
        assert!(fs.exists("/destdir/src.txt").await);
    }

    #[tokio::test]
    async fn no_clobber_leaves_the_destination_untouched() {
        let ctx = ctx_with_files(vec!["-n", "/src.txt", "/dest.txt"], vec![("/src.txt", "new"), ("/dest.txt", "old")]).await;
        let fs = ctx.fs.clone();
        let result = MvCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
        assert!(fs.exists("/src.txt").await);
        assert_eq!(fs.read_file("/dest.txt").await.unwrap(), "old");
    }

    #[tokio::test]
    async fn missing_source_reports_an_error() {
        let result = MvCommand.execute(ctx_with_files(vec!["/nonexistent.txt", "/dest.txt"], vec![]).await).await;
        assert!(result.stderr.contains("No such file or directory"));
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn multiple_sources_require_a_directory_destination() {
        let result = MvCommand.execute(ctx_with_files(vec!["/a.txt", "/b.txt", "/nonexistent"], vec![("/a.txt", ""), ("/b.txt", "")]).await).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("not a directory"));
    }

    #[tokio::test]
    async fn multiple_sources_land_in_the_destination_directory() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/a.txt", b"aaa").await.unwrap();
        fs.write_file("/b.txt", b"bbb").await.unwrap();
        fs.mkdir("/dir", &MkdirOptions { recursive: false }).await.unwrap();
        let mut ctx = ctx_with_files(vec!["/a.txt", "/b.txt", "/dir"], vec![]).await;
        ctx.fs = fs.clone();
        let result = MvCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
        assert_eq!(fs.read_file("/dir/a.txt").await.unwrap(), "aaa");
        assert_eq!(fs.read_file("/dir/b.txt").await.unwrap(), "bbb");
    }

    #[tokio::test]
    async fn missing_destination_operand_is_an_error() {
        let result = MvCommand.execute(ctx_with_files(vec!["/src.txt"], vec![("/src.txt", "")]).await).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("missing destination"));
    }

    #[tokio::test]
    async fn verbose_flag_reports_the_rename() {
        let result = MvCommand.execute(ctx_with_files(vec!["-v", "/old.txt", "/new.txt"], vec![("/old.txt", "content")]).await).await;
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("renamed"));
        assert!(result.stdout.contains("/old.txt"));
    }

    #[tokio::test]
    async fn combined_short_flags_apply_both_options() {
        let result = MvCommand.execute(ctx_with_files(vec!["-fv", "/old.txt", "/new.txt"], vec![("/old.txt", "content")]).await).await;
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("renamed"));
    }

    #[tokio::test]
    async fn update_skips_a_destination_that_is_not_older() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/src.txt", b"new").await.unwrap();
        fs.write_file("/dest.txt", b"old").await.unwrap();
        let mut ctx = ctx_with_files(vec!["-u", "/src.txt", "/dest.txt"], vec![]).await;
        ctx.fs = fs.clone();
        let result = MvCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
        assert!(fs.exists("/src.txt").await);
        assert_eq!(fs.read_file("/dest.txt").await.unwrap(), "old");
    }

    #[tokio::test]
    async fn update_moves_when_the_destination_is_missing() {
        let result = MvCommand.execute(ctx_with_files(vec!["-u", "/src.txt", "/dest.txt"], vec![("/src.txt", "content")]).await).await;
        assert_eq!(result.exit_code, 0);
    }
}
