//! `uniq`: collapse adjacent matching lines, same semantics as GNU
//! coreutils' `uniq` (spec.md's text-filter group). Matching is always
//! between neighbors, never across the whole input — that's what tells
//! callers to `sort` first if they want global dedup.

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct UniqCommand;

const HELP: &str = "Usage: uniq [OPTION]... [INPUT [OUTPUT]]\n\n\
Filter adjacent matching lines from INPUT (or stdin).\n\n\
Options:\n\
  -c, --count            prefix lines by the number of occurrences\n\
  -d, --repeated         only print duplicate lines, one for each group\n\
  -u, --unique           only print unique lines\n\
  -i, --ignore-case      ignore differences in case when comparing\n\
  -f, --skip-fields=N    avoid comparing the first N fields\n\
  -s, --skip-chars=N     avoid comparing the first N characters\n\
      --help             display this help and exit\n";

#[derive(Default)]
struct UniqOptions {
    count: bool,
    repeated: bool,
    unique: bool,
    ignore_case: bool,
    skip_fields: usize,
    skip_chars: usize,
    files: Vec<String>,
}

fn parse_options(ctx: &CommandContext) -> Result<UniqOptions, String> {
    let mut opts = UniqOptions::default();
    let mut iter = ctx.args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-c" | "--count" => opts.count = true,
            "-d" | "--repeated" => opts.repeated = true,
            "-u" | "--unique" => opts.unique = true,
            "-i" | "--ignore-case" => opts.ignore_case = true,
            "-f" | "--skip-fields" => {
                let n = iter.next().ok_or("uniq: option requires an argument -- 'f'\n")?;
                opts.skip_fields = n.parse().map_err(|_| format!("uniq: invalid number of fields: '{n}'\n"))?;
            }
            "-s" | "--skip-chars" => {
                let n = iter.next().ok_or("uniq: option requires an argument -- 's'\n")?;
                opts.skip_chars = n.parse().map_err(|_| format!("uniq: invalid number of bytes: '{n}'\n"))?;
            }
            s if s.starts_with("--skip-fields=") => {
                let n = &s["--skip-fields=".len()..];
                opts.skip_fields = n.parse().map_err(|_| format!("uniq: invalid number of fields: '{n}'\n"))?;
            }
            s if s.starts_with("--skip-chars=") => {
                let n = &s["--skip-chars=".len()..];
                opts.skip_chars = n.parse().map_err(|_| format!("uniq: invalid number of bytes: '{n}'\n"))?;
            }
            s if !s.starts_with('-') || s == "-" => opts.files.push(s.to_string()),
            _ => {}
        }
    }
    Ok(opts)
}

/// The portion of a line GNU `uniq` actually compares: skip `skip_fields`
/// whitespace-delimited fields, then `skip_chars` characters of what's left.
fn comparison_key(line: &str, opts: &UniqOptions) -> String {
    let mut rest = line;
    for _ in 0..opts.skip_fields {
        rest = rest.trim_start();
        match rest.find(char::is_whitespace) {
            Some(idx) => rest = &rest[idx..],
            None => {
                rest = "";
                break;
            }
        }
    }
    let rest: String = rest.chars().skip(opts.skip_chars).collect();
    if opts.ignore_case { rest.to_ascii_lowercase() } else { rest }
}

#[async_trait]
impl Command for UniqCommand {
    fn name(&self) -> &'static str {
        "uniq"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.has_flag(&["--help"]) {
            return CommandResult::success(HELP.to_string());
        }

        let opts = match parse_options(&ctx) {
            Ok(o) => o,
            Err(e) => return CommandResult::error(e),
        };

        let input = if opts.files.is_empty() || opts.files[0] == "-" {
            ctx.stdin.clone()
        } else {
            let path = ctx.fs.resolve_path(&ctx.cwd, &opts.files[0]);
            match ctx.fs.read_file(&path).await {
                Ok(c) => c,
                Err(_) => return CommandResult::error(format!("uniq: {}: No such file or directory\n", opts.files[0])),
            }
        };

        if input.is_empty() {
            return CommandResult::success(String::new());
        }

        let mut groups: Vec<(usize, &str)> = Vec::new();
        for line in input.lines() {
            let same_as_last = groups
                .last()
                .map(|(_, last)| comparison_key(last, &opts) == comparison_key(line, &opts))
                .unwrap_or(false);
            if same_as_last {
                groups.last_mut().unwrap().0 += 1;
            } else {
                groups.push((1, line));
            }
        }

        let mut output = String::new();
        for (count, line) in &groups {
            let keep = if opts.repeated {
                *count > 1
            } else if opts.unique {
                *count == 1
            } else {
                true
            };
            if !keep {
                continue;
            }
            if opts.count {
                output.push_str(&format!("{count:>7} {line}\n"));
            } else {
                output.push_str(line);
                output.push('\n');
            }
        }

        CommandResult::success(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::types::FileSystem;
    use crate::fs::InMemoryFs;
    use std::collections::HashMap;
    use std::sync::Arc;

    async fn make_ctx(args: Vec<&str>, stdin: &str, files: Vec<(&str, &str)>) -> CommandContext {
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
    async fn collapses_adjacent_duplicates() {
        let ctx = make_ctx(vec!["/test.txt"], "", vec![("/test.txt", "aaa\naaa\nbbb\nccc\nccc\n")]).await;
        let result = UniqCommand.execute(ctx).await;
        assert_eq!(result.stdout, "aaa\nbbb\nccc\n");
    }

    #[tokio::test]
    async fn counts_occurrences_with_c() {
        let ctx = make_ctx(vec!["-c", "/test.txt"], "", vec![("/test.txt", "aaa\naaa\naaa\nbbb\nccc\nccc\n")]).await;
        let result = UniqCommand.execute(ctx).await;
        assert!(result.stdout.contains("3 aaa"));
        assert!(result.stdout.contains("1 bbb"));
        assert!(result.stdout.contains("2 ccc"));
    }

    #[tokio::test]
    async fn only_duplicates_with_d() {
        let ctx = make_ctx(vec!["-d", "/test.txt"], "", vec![("/test.txt", "aaa\naaa\nbbb\nccc\nccc\n")]).await;
        let result = UniqCommand.execute(ctx).await;
        assert_eq!(result.stdout, "aaa\nccc\n");
    }

    #[tokio::test]
    async fn only_unique_with_u() {
        let ctx = make_ctx(vec!["-u", "/test.txt"], "", vec![("/test.txt", "aaa\naaa\nbbb\nccc\nccc\n")]).await;
        let result = UniqCommand.execute(ctx).await;
        assert_eq!(result.stdout, "bbb\n");
    }

    #[tokio::test]
    async fn only_adjacent_duplicates_collapse() {
        let ctx = make_ctx(vec!["/test.txt"], "", vec![("/test.txt", "aaa\nbbb\naaa\n")]).await;
        let result = UniqCommand.execute(ctx).await;
        assert_eq!(result.stdout, "aaa\nbbb\naaa\n");
    }

    #[tokio::test]
    async fn reads_from_stdin_when_no_file_given() {
        let ctx = make_ctx(vec![], "hello\nhello\nworld\n", vec![]).await;
        let result = UniqCommand.execute(ctx).await;
        assert_eq!(result.stdout, "hello\nworld\n");
    }

    #[tokio::test]
    async fn case_insensitive_with_i() {
        let ctx = make_ctx(vec!["-i", "/test.txt"], "", vec![("/test.txt", "Hello\nhello\nWorld\n")]).await;
        let result = UniqCommand.execute(ctx).await;
        assert_eq!(result.stdout, "Hello\nWorld\n");
    }

    #[tokio::test]
    async fn skip_fields_ignores_leading_columns() {
        let ctx = make_ctx(vec!["-f", "1", "/test.txt"], "", vec![("/test.txt", "1 apple\n2 apple\n3 pear\n")]).await;
        let result = UniqCommand.execute(ctx).await;
        assert_eq!(result.stdout, "1 apple\n3 pear\n");
    }

    #[tokio::test]
    async fn skip_chars_ignores_leading_characters() {
        let ctx = make_ctx(vec!["-s", "2", "/test.txt"], "", vec![("/test.txt", "aaXXX\nbbXXX\n")]).await;
        let result = UniqCommand.execute(ctx).await;
        assert_eq!(result.stdout, "aaXXX\n");
    }

    #[tokio::test]
    async fn missing_input_file_is_an_error() {
        let ctx = make_ctx(vec!["/nonexistent.txt"], "", vec![]).await;
        let result = UniqCommand.execute(ctx).await;
        assert_ne!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn empty_input_produces_empty_output() {
        let ctx = make_ctx(vec![], "", vec![]).await;
        let result = UniqCommand.execute(ctx).await;
        assert_eq!(result.stdout, "");
    }
}
