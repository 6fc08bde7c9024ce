//! `cp`: copy files and, with `-r`, directories (spec.md's
//! filesystem-mutation group). Shares its `-u` update check with `mv`
//! in spirit: compare `FsStat::mtime` before touching the destination.

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};
use crate::fs::CpOptions;

pub struct CpCommand;

const HELP: &str = "Usage: cp [OPTION]... SOURCE... DEST

Copy SOURCE to DEST, or multiple SOURCE(s) to DIRECTORY.

Options:
  -r, -R, --recursive  copy directories recursively
  -n, --no-clobber     do not overwrite an existing file
  -u, --update         copy only when SOURCE is newer than DEST, or DEST is missing
  -v, --verbose        explain what is being done
  -p, --preserve       preserve file attributes (accepted, no-op)
      --help           display this help and exit
";

#[derive(Default)]
struct Options {
    recursive: bool,
    no_clobber: bool,
    update: bool,
    verbose: bool,
}

fn parse_short_run(arg: &str) -> Option<Options> {
    let body = arg.strip_prefix('-')?;
    if body.is_empty() || body.starts_with('-') || !body.chars().all(|c| matches!(c, 'r' | 'R' | 'n' | 'u' | 'v' | 'p')) {
        return None;
    }
    let mut opts = Options::default();
    for c in body.chars() {
        match c {
            'r' | 'R' => opts.recursive = true,
            'n' => opts.no_clobber = true,
            'u' => opts.update = true,
            'v' => opts.verbose = true,
            'p' => {}
            _ => unreachable!(),
        }
    }
    Some(opts)
}

#[async_trait]
impl Command for CpCommand {
    fn name(&self) -> &'static str {
        "cp"
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
                "--no-clobber" => opts.no_clobber = true,
                "--update" => opts.update = true,
                "--verbose" => opts.verbose = true,
                "--preserve" => {}
                _ => match parse_short_run(arg) {
                    Some(parsed) => {
                        opts.recursive |= parsed.recursive;
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
            return CommandResult::error("cp: missing destination file operand\n".to_string());
        }

        let dest = paths.pop().unwrap();
        let sources = paths;
        let dest_path = ctx.fs.resolve_path(&ctx.cwd, &dest);

        let dest_is_dir = match ctx.fs.stat(&dest_path).await {
            Ok(stat) => stat.is_directory,
            Err(_) => false,
        };

        if sources.len() > 1 && !dest_is_dir {
            return CommandResult::error(format!("cp: target '{dest}' is not a directory\n"));
        }

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;

        for src in &sources {
            let src_path = ctx.fs.resolve_path(&ctx.cwd, src);

            let src_stat = match ctx.fs.stat(&src_path).await {
                Ok(s) => s,
                Err(_) => {
                    stderr.push_str(&format!("cp: cannot stat '{src}': No such file or directory\n"));
                    exit_code = 1;
                    continue;
                }
            };

            if src_stat.is_directory && !opts.recursive {
                stderr.push_str(&format!("cp: -r not specified; omitting directory '{src}'\n"));
                exit_code = 1;
                continue;
            }

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

            let fs_opts = CpOptions { recursive: opts.recursive };
            match ctx.fs.cp(&src_path, &target_path, &fs_opts).await {
                Ok(()) => {
                    if opts.verbose {
                        stdout.push_str(&format!("'{src}' -> '{target_path}'\n"));
                    }
                }
                Err(e) => {
                    stderr.push_str(&format!("cp: cannot copy '{src}': {e}\n"));
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
    async fn copies_a_file() {
        let ctx = ctx_with_files(vec!["/src.txt", "/dest.txt"], vec![("/src.txt", "content")]).await;
        let fs = ctx.fs.clone();
        let result = CpCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
        assert_eq!(fs.read_file("/dest.txt").await.unwrap(), "content");
    }

    #[tokio::test]
    async fn copying_into_a_directory_keeps_the_basename() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/src.txt", b"content").await.unwrap();
        fs.mkdir("/destdir", &MkdirOptions { recursive: false }).await.unwrap();
        let mut ctx = ctx_with_files(vec!["/src.txt", "/destdir"], vec![]).await;
        ctx.fs = fs.clone();
        let result = CpCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
        assert!(fs.exists("/destdir/src.txt").await);
    }

    #[tokio::test]
    async fn a_directory_source_without_recursive_is_an_error() {
        let fs = Arc::new(InMemoryFs::new());
        fs.mkdir("/srcdir", &MkdirOptions { recursive: false }).await.unwrap();
        let mut ctx = ctx_with_files(vec!["/srcdir", "/destdir"], vec![]).await;
        ctx.fs = fs;
        let result = CpCommand.execute(ctx).await;
        assert!(result.stderr.contains("omitting directory"));
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn no_clobber_leaves_the_destination_untouched() {
        let ctx = ctx_with_files(vec!["-n", "/src.txt", "/dest.txt"], vec![("/src.txt", "new"), ("/dest.txt", "old")]).await;
        let fs = ctx.fs.clone();
        let result = CpCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
        assert_eq!(fs.read_file("/dest.txt").await.unwrap(), "old");
    }

    #[tokio::test]
    async fn source_survives_the_copy() {
        let ctx = ctx_with_files(vec!["/src.txt", "/dest.txt"], vec![("/src.txt", "content")]).await;
        let fs = ctx.fs.clone();
        let result = CpCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
        assert_eq!(fs.read_file("/src.txt").await.unwrap(), "content");
    }

    #[tokio::test]
    async fn multiple_sources_require_a_directory_destination() {
        let result = CpCommand.execute(ctx_with_files(vec!["/a.txt", "/b.txt", "/nonexistent"], vec![("/a.txt", ""), ("/b.txt", "")]).await).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("not a directory"));
    }

    #[tokio::test]
    async fn recursive_copies_a_directory_and_its_contents() {
        let fs = Arc::new(InMemoryFs::new());
        fs.mkdir("/src", &MkdirOptions { recursive: true }).await.unwrap();
        fs.mkdir("/src/a", &MkdirOptions { recursive: true }).await.unwrap();
        fs.write_file("/src/a/c.txt", b"deep").await.unwrap();
        fs.write_file("/src/root.txt", b"root").await.unwrap();
        let mut ctx = ctx_with_files(vec!["-r", "/src", "/dst"], vec![]).await;
        ctx.fs = fs.clone();
        let result = CpCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
        assert_eq!(fs.read_file("/dst/a/c.txt").await.unwrap(), "deep");
        assert_eq!(fs.read_file("/dst/root.txt").await.unwrap(), "root");
    }

    #[tokio::test]
    async fn missing_source_reports_an_error() {
        let result = CpCommand.execute(ctx_with_files(vec!["/missing.txt", "/dst.txt"], vec![]).await).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("No such file or directory"));
    }

    #[tokio::test]
    async fn missing_destination_operand_is_an_error() {
        let result = CpCommand.execute(ctx_with_files(vec!["/src.txt"], vec![("/src.txt", "")]).await).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("missing destination"));
    }

    #[tokio::test]
    async fn verbose_flag_reports_the_copy() {
        let result = CpCommand.execute(ctx_with_files(vec!["-v", "/src.txt", "/dest.txt"], vec![("/src.txt", "content")]).await).await;
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("/src.txt"));
        assert!(result.stdout.contains("/dest.txt"));
    }

    #[tokio::test]
    async fn combined_short_flags_apply_recursive_and_verbose() {
        let fs = Arc::new(InMemoryFs::new());
        fs.mkdir("/srcdir", &MkdirOptions { recursive: false }).await.unwrap();
        fs.write_file("/srcdir/file.txt", b"content").await.unwrap();
        let mut ctx = ctx_with_files(vec!["-rv", "/srcdir", "/dstdir"], vec![]).await;
        ctx.fs = fs.clone();
        let result = CpCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("->"));
        assert!(fs.exists("/dstdir/file.txt").await);
    }

    #[tokio::test]
    async fn update_skips_a_destination_that_is_not_older() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/src.txt", b"new").await.unwrap();
        fs.write_file("/dest.txt", b"old").await.unwrap();
        let mut ctx = ctx_with_files(vec!["-u", "/src.txt", "/dest.txt"], vec![]).await;
        ctx.fs = fs.clone();
        let result = CpCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
        assert_eq!(fs.read_file("/dest.txt").await.unwrap(), "old");
    }
}
