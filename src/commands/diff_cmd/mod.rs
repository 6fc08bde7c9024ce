//! `diff`: unified line-by-line comparison (spec.md's text-filter group).
//! `similar::TextDiff` does the actual line matching; this module only
//! handles argument parsing, the brief/identical short-circuits, and
//! formatting the hunks GNU `diff -u` produces.

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};
use similar::{ChangeTag, TextDiff};

pub struct DiffCommand;

const HELP: &str = "Usage: diff [OPTION]... FILE1 FILE2\n\n\
Compare files line by line.\n\n\
Options:\n\
  -u, --unified                output unified diff format (default)\n\
  -U NUM                        output NUM lines of context (default 3)\n\
  -q, --brief                  report only whether files differ\n\
  -s, --report-identical-files  report when files are the same\n\
  -i, --ignore-case            ignore case differences\n\
      --help                   display this help and exit\n";

#[derive(Default)]
struct Options {
    brief: bool,
    report_same: bool,
    ignore_case: bool,
    context: usize,
}

fn parse_args(args: &[String]) -> Result<(Options, Vec<String>), String> {
    let mut opts = Options { context: 3, ..Options::default() };
    let mut files = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-u" | "--unified" => {}
            "-q" | "--brief" => opts.brief = true,
            "-s" | "--report-identical-files" => opts.report_same = true,
            "-i" | "--ignore-case" => opts.ignore_case = true,
            "-U" => {
                let n = iter.next().ok_or("diff: option requires an argument -- 'U'\n")?;
                opts.context = n.parse().map_err(|_| format!("diff: invalid context length '{n}'\n"))?;
            }
            s if s.starts_with("-U") => {
                opts.context = s[2..].parse().map_err(|_| format!("diff: invalid context length '{}'\n", &s[2..]))?;
            }
            s if !s.starts_with('-') || s == "-" => files.push(s.to_string()),
            _ => {}
        }
    }
    Ok((opts, files))
}

async fn read_side(ctx: &CommandContext, file: &str) -> Result<String, String> {
    if file == "-" {
        return Ok(ctx.stdin.clone());
    }
    let path = ctx.fs.resolve_path(&ctx.cwd, file);
    ctx.fs.read_file(&path).await.map_err(|_| format!("diff: {file}: No such file or directory\n"))
}

#[async_trait]
impl Command for DiffCommand {
    fn name(&self) -> &'static str {
        "diff"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.has_flag(&["--help"]) {
            return CommandResult::success(HELP.to_string());
        }

        let (opts, files) = match parse_args(&ctx.args) {
            Ok(v) => v,
            Err(e) => return CommandResult::with_exit_code(String::new(), e, 2),
        };

        if files.len() < 2 {
            return CommandResult::with_exit_code(String::new(), "diff: missing operand\n".to_string(), 2);
        }

        let f1 = &files[0];
        let f2 = &files[1];

        let c1 = match read_side(&ctx, f1).await {
            Ok(c) => c,
            Err(e) => return CommandResult::with_exit_code(String::new(), e, 2),
        };
        let c2 = match read_side(&ctx, f2).await {
            Ok(c) => c,
            Err(e) => return CommandResult::with_exit_code(String::new(), e, 2),
        };

        let equal = if opts.ignore_case { c1.to_lowercase() == c2.to_lowercase() } else { c1 == c2 };

        if equal {
            return if opts.report_same {
                CommandResult::with_exit_code(format!("Files {f1} and {f2} are identical\n"), String::new(), 0)
            } else {
                CommandResult::with_exit_code(String::new(), String::new(), 0)
            };
        }

        if opts.brief {
            return CommandResult::with_exit_code(format!("Files {f1} and {f2} differ\n"), String::new(), 1);
        }

        CommandResult::with_exit_code(format_unified_diff(f1, f2, &c1, &c2, opts.context), String::new(), 1)
    }
}

fn format_unified_diff(file1: &str, file2: &str, content1: &str, content2: &str, context: usize) -> String {
    let diff = TextDiff::from_lines(content1, content2);
    let mut output = format!("--- {file1}\n+++ {file2}\n");

    for hunk in diff.unified_diff().context_radius(context).iter_hunks() {
        output.push_str(&format!("{}\n", hunk.header()));
        for change in hunk.iter_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => " ",
            };
            output.push_str(sign);
            output.push_str(change.value());
            if !change.value().ends_with('\n') {
                output.push('\n');
                output.push_str("\\ No newline at end of file\n");
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{InMemoryFs, FileSystem};
    use std::collections::HashMap;
    use std::sync::Arc;

    async fn ctx_with_files(args: Vec<&str>, stdin: &str, files: Vec<(&str, &str)>) -> CommandContext {
        let fs = Arc::new(InMemoryFs::new());
        for (path, content) in files {
            fs.write_file(path, content.as_bytes()).await.unwrap();
        }
        CommandContext {
            args: args.into_iter().map(String::from).collect(),
            stdin: stdin.to_string(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs,
            exec_fn: None,
            fetch_fn: None,
        }
    }

    #[tokio::test]
    async fn identical_files_produce_no_output_and_exit_zero() {
        let ctx = ctx_with_files(vec!["a.txt", "b.txt"], "", vec![("/a.txt", "hello\nworld\n"), ("/b.txt", "hello\nworld\n")]).await;
        let result = DiffCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "");
    }

    #[tokio::test]
    async fn different_files_produce_a_unified_diff() {
        let ctx = ctx_with_files(vec!["a.txt", "b.txt"], "", vec![("/a.txt", "hello\nworld\n"), ("/b.txt", "hello\nrust\n")]).await;
        let result = DiffCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stdout.contains("--- a.txt"));
        assert!(result.stdout.contains("+++ b.txt"));
        assert!(result.stdout.contains("-world"));
        assert!(result.stdout.contains("+rust"));
    }

    #[tokio::test]
    async fn brief_mode_only_reports_that_files_differ() {
        let ctx = ctx_with_files(vec!["-q", "a.txt", "b.txt"], "", vec![("/a.txt", "hello\n"), ("/b.txt", "world\n")]).await;
        let result = DiffCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 1);
        assert_eq!(result.stdout, "Files a.txt and b.txt differ\n");
    }

    #[tokio::test]
    async fn report_identical_flag_announces_a_match() {
        let ctx = ctx_with_files(vec!["-s", "a.txt", "b.txt"], "", vec![("/a.txt", "same\n"), ("/b.txt", "same\n")]).await;
        let result = DiffCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "Files a.txt and b.txt are identical\n");
    }

    #[tokio::test]
    async fn ignore_case_treats_differing_case_as_equal() {
        let ctx = ctx_with_files(vec!["-i", "a.txt", "b.txt"], "", vec![("/a.txt", "Hello\nWorld\n"), ("/b.txt", "hello\nworld\n")]).await;
        let result = DiffCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn dash_reads_stdin_for_the_first_operand() {
        let ctx = ctx_with_files(vec!["-", "b.txt"], "hello\nworld\n", vec![("/b.txt", "hello\nrust\n")]).await;
        let result = DiffCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stdout.contains("--- -"));
    }

    #[tokio::test]
    async fn missing_file_exits_two() {
        let ctx = ctx_with_files(vec!["a.txt", "nonexistent.txt"], "", vec![("/a.txt", "hello\n")]).await;
        let result = DiffCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 2);
        assert!(result.stderr.contains("No such file or directory"));
    }

    #[tokio::test]
    async fn missing_operand_exits_two() {
        let ctx = ctx_with_files(vec!["a.txt"], "", vec![("/a.txt", "hello\n")]).await;
        let result = DiffCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 2);
        assert!(result.stderr.contains("missing operand"));
    }

    #[tokio::test]
    async fn help_describes_the_command() {
        let ctx = ctx_with_files(vec!["--help"], "", vec![]).await;
        let result = DiffCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("Usage: diff"));
    }

    #[tokio::test]
    async fn custom_context_radius_widens_the_hunk() {
        let a = (1..=10).map(|i| format!("line{i}")).collect::<Vec<_>>().join("\n") + "\n";
        let b = a.replace("line5", "CHANGED");
        let ctx = ctx_with_files(vec!["-U", "5", "a.txt", "b.txt"], "", vec![("/a.txt", &a), ("/b.txt", &b)]).await;
        let result = DiffCommand.execute(ctx).await;
        assert!(result.stdout.contains("line1"));
        assert!(result.stdout.contains("line10"));
    }
}
