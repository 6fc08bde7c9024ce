//! `stat`: report file status, optionally through a `%`-directive FORMAT
//! string (spec.md's filesystem-inspection group). Ownership fields
//! (`%u`/`%U`/`%g`/`%G`) are hardcoded since `InMemoryFs` is a single-user
//! sandbox with no real uid/gid table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::commands::{Command, CommandContext, CommandResult};
use crate::fs::FsStat;

pub struct StatCommand;

const HELP: &str = "Usage: stat [OPTION]... FILE...

display file or file system status

Options:
  -c FORMAT   use the specified FORMAT instead of the default
      --help  display this help and exit

FORMAT sequences:
  %n  file name  %N  quoted file name  %s  size
  %F  file type  %a  access rights (octal)  %A  access rights (human)
  %u  user ID  %U  user name  %g  group ID  %G  group name
  %y  last modification time, human readable
";

fn format_mode_string(mode: u32, is_directory: bool) -> String {
    let type_char = if is_directory { 'd' } else { '-' };
    let bits = [0o400, 0o200, 0o100, 0o040, 0o020, 0o010, 0o004, 0o002, 0o001];
    let letters = ['r', 'w', 'x', 'r', 'w', 'x', 'r', 'w', 'x'];
    let perms: String = bits.iter().zip(letters).map(|(bit, letter)| if mode & bit != 0 { letter } else { '-' }).collect();
    format!("{type_char}{perms}")
}

fn human_mtime(stat: &FsStat) -> String {
    DateTime::<Utc>::from(stat.mtime).format("%Y-%m-%d %H:%M:%S").to_string()
}

fn apply_format(fmt: &str, file: &str, stat: &FsStat) -> String {
    fmt.replace("%n", file)
        .replace("%N", &format!("'{file}'"))
        .replace("%s", &stat.size.to_string())
        .replace("%F", if stat.is_directory { "directory" } else { "regular file" })
        .replace("%a", &format!("{:o}", stat.mode))
        .replace("%A", &format_mode_string(stat.mode, stat.is_directory))
        .replace("%u", "1000")
        .replace("%U", "user")
        .replace("%g", "1000")
        .replace("%G", "group")
        .replace("%y", &human_mtime(stat))
}

fn default_report(file: &str, stat: &FsStat) -> String {
    let mode_octal = format!("{:04o}", stat.mode);
    let mode_str = format_mode_string(stat.mode, stat.is_directory);
    let blocks = (stat.size + 511) / 512;
    format!(
        "  File: {file}\n  Size: {}\t\tBlocks: {blocks}\nAccess: ({mode_octal}/{mode_str})\nModify: {}\n",
        stat.size,
        human_mtime(stat),
    )
}

#[async_trait]
impl Command for StatCommand {
    fn name(&self) -> &'static str {
        "stat"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.has_flag(&["--help"]) {
            return CommandResult::success(HELP.to_string());
        }

        let args = &ctx.args;
        let mut format: Option<String> = None;
        let mut files: Vec<String> = Vec::new();
        let mut i = 0;
        while i < args.len() {
            let a = &args[i];
            if a == "-c" && i + 1 < args.len() {
                i += 1;
                format = Some(args[i].clone());
            } else if let Some(rest) = a.strip_prefix("-c") {
                if !rest.is_empty() {
                    format = Some(rest.to_string());
                }
            } else if !a.starts_with('-') || a == "-" {
                files.push(a.clone());
            }
            i += 1;
        }

        if files.is_empty() {
            return CommandResult::error("stat: missing operand\n".to_string());
        }

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut has_error = false;

        for file in &files {
            let path = ctx.fs.resolve_path(&ctx.cwd, file);
            match ctx.fs.stat(&path).await {
                Ok(stat) => {
                    let report = match &format {
                        Some(fmt) => format!("{}\n", apply_format(fmt, file, &stat)),
                        None => default_report(file, &stat),
                    };
                    stdout.push_str(&report);
                }
                Err(_) => {
                    stderr.push_str(&format!("stat: cannot stat '{file}': No such file or directory\n"));
                    has_error = true;
                }
            }
        }

        CommandResult::with_exit_code(stdout, stderr, if has_error { 1 } else { 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, InMemoryFs};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn ctx_with_fs(args: Vec<&str>, fs: Arc<InMemoryFs>) -> CommandContext {
        CommandContext { args: args.into_iter().map(String::from).collect(), stdin: String::new(), cwd: "/".into(), env: HashMap::new(), fs, exec_fn: None, fetch_fn: None }
    }

    fn ctx(args: Vec<&str>) -> CommandContext {
        ctx_with_fs(args, Arc::new(InMemoryFs::new()))
    }

    #[tokio::test]
    async fn default_report_names_size_and_access() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/test.txt", b"hello world").await.unwrap();
        let r = StatCommand.execute(ctx_with_fs(vec!["/test.txt"], fs)).await;
        assert!(r.stdout.contains("File: /test.txt"));
        assert!(r.stdout.contains("Size: 11"));
        assert_eq!(r.exit_code, 0);
    }

    #[tokio::test]
    async fn directory_report_shows_the_d_bit() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/mydir/file.txt", b"content").await.unwrap();
        let r = StatCommand.execute(ctx_with_fs(vec!["/mydir"], fs)).await;
        assert!(r.stdout.contains("File: /mydir"));
        assert!(r.stdout.contains("drwx"));
    }

    #[tokio::test]
    async fn missing_file_reports_an_error() {
        let r = StatCommand.execute(ctx(vec!["/nonexistent"])).await;
        assert!(r.stderr.contains("No such file or directory"));
        assert_eq!(r.exit_code, 1);
    }

    #[tokio::test]
    async fn missing_operand_is_an_error() {
        let r = StatCommand.execute(ctx(vec![])).await;
        assert!(r.stderr.contains("missing operand"));
        assert_eq!(r.exit_code, 1);
    }

    #[tokio::test]
    async fn format_name_directive_prints_just_the_path() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/test.txt", b"hello").await.unwrap();
        let r = StatCommand.execute(ctx_with_fs(vec!["-c", "%n", "/test.txt"], fs)).await;
        assert_eq!(r.stdout.trim(), "/test.txt");
    }

    #[tokio::test]
    async fn format_size_directive_prints_just_the_byte_count() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/test.txt", b"hello").await.unwrap();
        let r = StatCommand.execute(ctx_with_fs(vec!["-c", "%s", "/test.txt"], fs)).await;
        assert_eq!(r.stdout.trim(), "5");
    }

    #[tokio::test]
    async fn format_type_directive_distinguishes_files_from_directories() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/mydir/file.txt", b"content").await.unwrap();
        let r1 = StatCommand.execute(ctx_with_fs(vec!["-c", "%F", "/mydir/file.txt"], fs.clone())).await;
        assert_eq!(r1.stdout.trim(), "regular file");
        let r2 = StatCommand.execute(ctx_with_fs(vec!["-c", "%F", "/mydir"], fs)).await;
        assert_eq!(r2.stdout.trim(), "directory");
    }

    #[tokio::test]
    async fn format_directives_can_be_combined_with_literal_text() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/test.txt", b"hello world").await.unwrap();
        let r = StatCommand.execute(ctx_with_fs(vec!["-c", "%n: %s bytes", "/test.txt"], fs)).await;
        assert_eq!(r.stdout.trim(), "/test.txt: 11 bytes");
    }

    #[tokio::test]
    async fn help_mentions_the_format_flag() {
        let r = StatCommand.execute(ctx(vec!["--help"])).await;
        assert!(r.stdout.contains("stat"));
        assert!(r.stdout.contains("-c"));
    }

    #[tokio::test]
    async fn multiple_files_each_get_their_own_report() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/a.txt", b"aaa").await.unwrap();
        fs.write_file("/b.txt", b"bbbbb").await.unwrap();
        let r = StatCommand.execute(ctx_with_fs(vec!["/a.txt", "/b.txt"], fs)).await;
        assert!(r.stdout.contains("File: /a.txt"));
        assert!(r.stdout.contains("File: /b.txt"));
    }

    #[tokio::test]
    async fn one_missing_file_does_not_stop_the_others() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/exists.txt", b"yes").await.unwrap();
        let r = StatCommand.execute(ctx_with_fs(vec!["/exists.txt", "/missing.txt"], fs)).await;
        assert!(r.stdout.contains("File: /exists.txt"));
        assert!(r.stderr.contains("missing.txt"));
        assert_eq!(r.exit_code, 1);
    }

    #[tokio::test]
    async fn human_mtime_directive_is_iso_like() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/test.txt", b"hello").await.unwrap();
        let r = StatCommand.execute(ctx_with_fs(vec!["-c", "%y", "/test.txt"], fs)).await;
        assert!(r.stdout.trim().contains('-'));
        assert!(r.stdout.trim().contains(':'));
    }
}
