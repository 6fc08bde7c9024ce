//! `tail`: print the trailing lines (or bytes) of each file, falling back
//! to stdin when no files are given. The legacy `+N`/`-n +N` syntax means
//! "start output at line N" rather than "the last N lines" — `utils::head_tail`
//! tracks that distinction as `HeadTailOptions::from_line`.

use async_trait::async_trait;
use crate::commands::utils::{get_tail, process_head_tail_files, parse_head_tail_args, HeadTailParseResult};
use crate::commands::{Command, CommandContext, CommandResult};

pub struct TailCommand;

const HELP: &str = "Usage: tail [OPTION]... [FILE]...

Print the last 10 lines of each FILE to standard output.
With more than one FILE, precede each with a header giving its name.

Options:
  -c, --bytes=NUM    print the last NUM bytes
  -n, --lines=NUM    print the last NUM lines instead of the last 10
  -n +NUM            print starting from line NUM
  -q, --quiet        never print headers giving file names
  -v, --verbose      always print headers giving file names
      --help         display this help and exit
";

#[async_trait]
impl Command for TailCommand {
    fn name(&self) -> &'static str {
        "tail"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.has_flag(&["--help"]) {
            return CommandResult::success(HELP.to_string());
        }

        let opts = match parse_head_tail_args(&ctx.args, "tail") {
            HeadTailParseResult::Ok(opts) => opts,
            HeadTailParseResult::Err(result) => return result,
        };

        process_head_tail_files(&ctx, &opts, "tail", |content| {
            get_tail(content, opts.lines, opts.bytes, opts.from_line)
        }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, InMemoryFs};
    use std::collections::HashMap;
    use std::sync::Arc;

    async fn ctx_with_files(args: Vec<&str>, files: Vec<(&str, &str)>) -> CommandContext {
        let fs = Arc::new(InMemoryFs::new());
        for (path, content) in files {
            fs.write_file(path, content.as_bytes()).await.unwrap();
        }
        CommandContext {
            args: args.into_iter().map(String::from).collect(),
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs,
            exec_fn: None,
            fetch_fn: None,
        }
    }

    fn numbered_lines(from: u32, to: u32) -> String {
        (from..=to).map(|i| format!("line{i}")).collect::<Vec<_>>().join("\n") + "\n"
    }

    #[tokio::test]
    async fn defaults_to_the_last_ten_lines() {
        let content = numbered_lines(1, 20);
        let ctx = ctx_with_files(vec!["/test.txt"], vec![("/test.txt", &content)]).await;
        let result = TailCommand.execute(ctx).await;
        assert_eq!(result.stdout, numbered_lines(11, 20));
    }

    #[tokio::test]
    async fn honors_a_custom_line_count() {
        let content = numbered_lines(1, 10);
        let ctx = ctx_with_files(vec!["-n", "3", "/test.txt"], vec![("/test.txt", &content)]).await;
        let result = TailCommand.execute(ctx).await;
        assert_eq!(result.stdout, numbered_lines(8, 10));
    }

    #[tokio::test]
    async fn byte_mode_ignores_line_boundaries() {
        let ctx = ctx_with_files(vec!["-c", "5", "/test.txt"], vec![("/test.txt", "hello world\n")]).await;
        let result = TailCommand.execute(ctx).await;
        assert_eq!(result.stdout, "orld\n");
    }

    #[tokio::test]
    async fn plus_n_starts_output_at_the_given_line() {
        let content = numbered_lines(1, 5);
        let ctx = ctx_with_files(vec!["-n", "+3", "/test.txt"], vec![("/test.txt", &content)]).await;
        let result = TailCommand.execute(ctx).await;
        assert_eq!(result.stdout, numbered_lines(3, 5));
    }

    #[tokio::test]
    async fn attached_n_value_is_parsed() {
        let content = "a\nb\nc\nd\ne\n";
        let ctx = ctx_with_files(vec!["-n2", "/test.txt"], vec![("/test.txt", content)]).await;
        let result = TailCommand.execute(ctx).await;
        assert_eq!(result.stdout, "d\ne\n");
    }

    #[tokio::test]
    async fn bare_dash_number_is_a_line_count() {
        let content = "a\nb\nc\nd\ne\n";
        let ctx = ctx_with_files(vec!["-3", "/test.txt"], vec![("/test.txt", content)]).await;
        let result = TailCommand.execute(ctx).await;
        assert_eq!(result.stdout, "c\nd\ne\n");
    }

    #[tokio::test]
    async fn short_file_returns_all_its_lines() {
        let ctx = ctx_with_files(vec!["-n", "10", "/test.txt"], vec![("/test.txt", "a\nb\n")]).await;
        let result = TailCommand.execute(ctx).await;
        assert_eq!(result.stdout, "a\nb\n");
    }

    #[tokio::test]
    async fn multiple_files_get_name_headers() {
        let ctx = ctx_with_files(vec!["/a.txt", "/b.txt"], vec![("/a.txt", "aaa\n"), ("/b.txt", "bbb\n")]).await;
        let result = TailCommand.execute(ctx).await;
        assert!(result.stdout.contains("==> /a.txt <=="));
        assert!(result.stdout.contains("==> /b.txt <=="));
        assert!(result.stdout.contains("aaa"));
        assert!(result.stdout.contains("bbb"));
    }

    #[tokio::test]
    async fn missing_file_reports_an_error() {
        let ctx = ctx_with_files(vec!["/missing.txt"], vec![]).await;
        let result = TailCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("No such file or directory"));
    }

    #[tokio::test]
    async fn reads_stdin_when_no_files_given() {
        let mut ctx = ctx_with_files(vec!["-n", "2"], vec![]).await;
        ctx.stdin = "a\nb\nc\nd\ne\n".to_string();
        let result = TailCommand.execute(ctx).await;
        assert_eq!(result.stdout, "d\ne\n");
    }

    #[tokio::test]
    async fn empty_file_produces_no_output() {
        let ctx = ctx_with_files(vec!["/empty.txt"], vec![("/empty.txt", "")]).await;
        let result = TailCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "");
    }

    #[tokio::test]
    async fn single_line_with_n1_returns_it_whole() {
        let ctx = ctx_with_files(vec!["-n", "1", "/test.txt"], vec![("/test.txt", "only line\n")]).await;
        let result = TailCommand.execute(ctx).await;
        assert_eq!(result.stdout, "only line\n");
    }

    #[tokio::test]
    async fn n1_shows_only_the_last_line() {
        let content = "first\nsecond\nthird\n";
        let ctx = ctx_with_files(vec!["-n", "1", "/test.txt"], vec![("/test.txt", content)]).await;
        let result = TailCommand.execute(ctx).await;
        assert_eq!(result.stdout, "third\n");
    }

    #[tokio::test]
    async fn twenty_lines_default_to_the_last_ten() {
        let content = numbered_lines(1, 20);
        let ctx = ctx_with_files(vec!["/test.txt"], vec![("/test.txt", &content)]).await;
        let result = TailCommand.execute(ctx).await;
        assert_eq!(result.stdout, numbered_lines(11, 20));
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn plus_one_prints_the_whole_file() {
        let ctx = ctx_with_files(vec!["-n", "+1", "/test.txt"], vec![("/test.txt", "line1\nline2\nline3\n")]).await;
        let result = TailCommand.execute(ctx).await;
        assert_eq!(result.stdout, "line1\nline2\nline3\n");
    }

    #[tokio::test]
    async fn plus_two_skips_the_first_line() {
        let ctx = ctx_with_files(vec!["-n", "+2", "/test.txt"], vec![("/test.txt", "line1\nline2\nline3\n")]).await;
        let result = TailCommand.execute(ctx).await;
        assert_eq!(result.stdout, "line2\nline3\n");
    }

    #[tokio::test]
    async fn plus_n_one_past_the_last_line_yields_a_bare_newline() {
        let ctx = ctx_with_files(vec!["-n", "+10", "/test.txt"], vec![("/test.txt", "line1\nline2\n")]).await;
        let result = TailCommand.execute(ctx).await;
        assert_eq!(result.stdout, "\n");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn plus_n_from_stdin() {
        let mut ctx = ctx_with_files(vec!["-n", "+3"], vec![]).await;
        ctx.stdin = "a\nb\nc\nd\ne\n".to_string();
        let result = TailCommand.execute(ctx).await;
        assert_eq!(result.stdout, "c\nd\ne\n");
    }
}
