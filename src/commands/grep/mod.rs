//! `grep`: search file content against a pattern (spec.md's
//! text-filter group). Built on `regex_lite` rather than a hand-rolled
//! matcher, since the native kernel gets POSIX-ish regex support for
//! free from it. `-A`/`-B`/`-C` share one context-window renderer;
//! `-C n` is just shorthand for `-A n -B n`.

use async_trait::async_trait;
use regex_lite::Regex;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct GrepCommand;

const HELP: &str = "Usage: grep [OPTION]... PATTERN [FILE]...

Search for PATTERN in each FILE.

Options:
  -E, --extended-regexp  PATTERN is an extended regular expression
  -F, --fixed-strings    PATTERN is a set of newline-separated strings
  -i, --ignore-case      ignore case distinctions
  -v, --invert-match     select non-matching lines
  -c, --count            print only a count of matching lines
  -l, --files-with-matches  print only names of FILEs with matches
  -L, --files-without-match  print only names of FILEs without matches
  -n, --line-number      print line number with output lines
  -o, --only-matching    show only the part of a line matching PATTERN
  -q, --quiet            suppress all normal output
  -F, --fixed-strings    PATTERN is a set of newline-separated strings
  -A NUM, --after-context=NUM   print NUM lines of trailing context
  -B NUM, --before-context=NUM  print NUM lines of leading context
  -C NUM, --context=NUM         print NUM lines of output context
  -m NUM, --max-count=NUM  stop after NUM matches
      --help             display this help and exit
";

#[derive(Default)]
struct Options {
    pattern: String,
    ignore_case: bool,
    invert_match: bool,
    count_only: bool,
    files_with_matches: bool,
    files_without_matches: bool,
    line_number: bool,
    only_matching: bool,
    quiet: bool,
    fixed_strings: bool,
    max_count: Option<usize>,
    before_context: usize,
    after_context: usize,
    files: Vec<String>,
}

fn parse_short_run(arg: &str) -> Option<Options> {
    let body = arg.strip_prefix('-')?;
    if body.is_empty() || body.starts_with('-') || !body.chars().all(|c| matches!(c, 'i' | 'v' | 'c' | 'l' | 'n' | 'o' | 'q' | 'F' | 'E')) {
        return None;
    }
    let mut opts = Options::default();
    for c in body.chars() {
        match c {
            'i' => opts.ignore_case = true,
            'v' => opts.invert_match = true,
            'c' => opts.count_only = true,
            'l' => opts.files_with_matches = true,
            'n' => opts.line_number = true,
            'o' => opts.only_matching = true,
            'q' => opts.quiet = true,
            'F' => opts.fixed_strings = true,
            'E' => {}
            _ => unreachable!(),
        }
    }
    Some(opts)
}

fn merge(dest: &mut Options, src: Options) {
    dest.ignore_case |= src.ignore_case;
    dest.invert_match |= src.invert_match;
    dest.count_only |= src.count_only;
    dest.files_with_matches |= src.files_with_matches;
    dest.files_without_matches |= src.files_without_matches;
    dest.line_number |= src.line_number;
    dest.only_matching |= src.only_matching;
    dest.quiet |= src.quiet;
    dest.fixed_strings |= src.fixed_strings;
}

fn parse_grep_args(args: &[String]) -> Result<Options, String> {
    let mut opts = Options::default();
    let mut positional: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];

        if arg == "-e" && i + 1 < args.len() {
            i += 1;
            opts.pattern = args[i].clone();
        } else if arg == "-i" || arg == "--ignore-case" {
            opts.ignore_case = true;
        } else if arg == "-v" || arg == "--invert-match" {
            opts.invert_match = true;
        } else if arg == "-c" || arg == "--count" {
            opts.count_only = true;
        } else if arg == "-l" || arg == "--files-with-matches" {
            opts.files_with_matches = true;
        } else if arg == "-L" || arg == "--files-without-match" {
            opts.files_without_matches = true;
        } else if arg == "-n" || arg == "--line-number" {
            opts.line_number = true;
        } else if arg == "-o" || arg == "--only-matching" {
            opts.only_matching = true;
        } else if arg == "-q" || arg == "--quiet" || arg == "--silent" {
            opts.quiet = true;
        } else if arg == "-F" || arg == "--fixed-strings" {
            opts.fixed_strings = true;
        } else if arg == "-E" || arg == "--extended-regexp" {
            // extended regex is already the default
        } else if arg == "-A" && i + 1 < args.len() {
            i += 1;
            opts.after_context = args[i].parse().unwrap_or(0);
        } else if arg == "-B" && i + 1 < args.len() {
            i += 1;
            opts.before_context = args[i].parse().unwrap_or(0);
        } else if arg == "-C" && i + 1 < args.len() {
            i += 1;
            let n = args[i].parse().unwrap_or(0);
            opts.before_context = n;
            opts.after_context = n;
        } else if let Some(n) = arg.strip_prefix("--after-context=") {
            opts.after_context = n.parse().unwrap_or(0);
        } else if let Some(n) = arg.strip_prefix("--before-context=") {
            opts.before_context = n.parse().unwrap_or(0);
        } else if let Some(n) = arg.strip_prefix("--context=") {
            let n: usize = n.parse().unwrap_or(0);
            opts.before_context = n;
            opts.after_context = n;
        } else if arg == "-m" && i + 1 < args.len() {
            i += 1;
            opts.max_count = args[i].parse().ok();
        } else if let Some(n) = arg.strip_prefix("-m") {
            opts.max_count = n.parse().ok();
        } else if let Some(parsed) = parse_short_run(arg) {
            merge(&mut opts, parsed);
        } else if !arg.starts_with('-') {
            positional.push(arg.clone());
        }
        i += 1;
    }

    if opts.pattern.is_empty() {
        if positional.is_empty() {
            return Err("grep: no pattern specified".to_string());
        }
        opts.pattern = positional.remove(0);
    }

    opts.files = positional;
    Ok(opts)
}

fn build_regex(opts: &Options) -> Result<Regex, String> {
    let mut pattern = opts.pattern.clone();

    if opts.fixed_strings {
        pattern = regex_lite::escape(&pattern);
    }

    if opts.ignore_case {
        pattern = format!("(?i){pattern}");
    }

    Regex::new(&pattern).map_err(|e| format!("grep: invalid pattern: {e}"))
}

/// Renders the matched lines of one file, pulling in before/after
/// context lines and separating non-adjacent runs with "--".
fn render_matches(lines: &[&str], matched: &[usize], opts: &Options, regex: &Regex, file: &str, show_filename: bool) -> String {
    let mut out = String::new();
    let mut shown: Vec<bool> = vec![false; lines.len()];
    let mut context: Vec<bool> = vec![false; lines.len()];

    for &m in matched {
        shown[m] = true;
        for b in m.saturating_sub(opts.before_context)..m {
            context[b] = true;
        }
        for a in (m + 1)..=(m + opts.after_context).min(lines.len().saturating_sub(1)) {
            context[a] = true;
        }
    }

    let mut previous_shown = false;
    for (idx, line) in lines.iter().enumerate() {
        let is_match = shown[idx];
        let is_context = context[idx] && !is_match;
        if !is_match && !is_context {
            previous_shown = false;
            continue;
        }

        if !previous_shown && !out.is_empty() {
            out.push_str("--\n");
        }
        previous_shown = true;

        let separator = if is_match { ':' } else { '-' };
        let prefix = if show_filename {
            if opts.line_number {
                format!("{file}{separator}{}{separator}", idx + 1)
            } else {
                format!("{file}{separator}")
            }
        } else if opts.line_number {
            format!("{}{separator}", idx + 1)
        } else {
            String::new()
        };

        if is_match && opts.only_matching {
            for mat in regex.find_iter(line) {
                out.push_str(&format!("{prefix}{}\n", mat.as_str()));
            }
        } else {
            out.push_str(&format!("{prefix}{line}\n"));
        }
    }

    out
}

#[async_trait]
impl Command for GrepCommand {
    fn name(&self) -> &'static str {
        "grep"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.has_flag(&["--help"]) {
            return CommandResult::success(HELP.to_string());
        }

        let opts = match parse_grep_args(&ctx.args) {
            Ok(o) => o,
            Err(e) => return CommandResult::error(format!("{e}\n")),
        };

        let regex = match build_regex(&opts) {
            Ok(r) => r,
            Err(e) => return CommandResult::error(format!("{e}\n")),
        };

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 1;

        let files = if opts.files.is_empty() { vec!["-".to_string()] } else { opts.files.clone() };
        let show_filename = files.len() > 1;

        for file in &files {
            let content = if file == "-" {
                ctx.stdin.clone()
            } else {
                let path = ctx.fs.resolve_path(&ctx.cwd, file);
                match ctx.fs.read_file(&path).await {
                    Ok(c) => c,
                    Err(_) => {
                        stderr.push_str(&format!("grep: {file}: No such file or directory\n"));
                        continue;
                    }
                }
            };

            let lines: Vec<&str> = content.lines().collect();
            let mut matched_indices: Vec<usize> = Vec::new();

            for (idx, line) in lines.iter().enumerate() {
                let is_match = regex.is_match(line);
                let should_output = if opts.invert_match { !is_match } else { is_match };
                if should_output {
                    matched_indices.push(idx);
                    if let Some(max) = opts.max_count {
                        if matched_indices.len() >= max {
                            break;
                        }
                    }
                }
            }

            let file_matches = matched_indices.len();
            if file_matches > 0 {
                exit_code = 0;
            }

            if opts.quiet {
                if file_matches > 0 {
                    return CommandResult::with_exit_code(String::new(), stderr, 0);
                }
                continue;
            }

            if opts.files_with_matches {
                if file_matches > 0 {
                    stdout.push_str(&format!("{file}\n"));
                }
                continue;
            }

            if opts.files_without_matches {
                if file_matches == 0 {
                    stdout.push_str(&format!("{file}\n"));
                }
                continue;
            }

            if opts.count_only {
                if show_filename {
                    stdout.push_str(&format!("{file}:{file_matches}\n"));
                } else {
                    stdout.push_str(&format!("{file_matches}\n"));
                }
                continue;
            }

            stdout.push_str(&render_matches(&lines, &matched_indices, &opts, &regex, file, show_filename));
        }

        CommandResult::with_exit_code(stdout, stderr, exit_code)
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
        CommandContext { args: args.into_iter().map(String::from).collect(), stdin: String::new(), cwd: "/".to_string(), env: HashMap::new(), fs, exec_fn: None, fetch_fn: None }
    }

    #[tokio::test]
    async fn matches_lines_containing_the_pattern() {
        let result = GrepCommand.execute(ctx_with_files(vec!["hello", "/test.txt"], vec![("/test.txt", "hello world\nfoo bar\nhello again\n")]).await).await;
        assert!(result.stdout.contains("hello world"));
        assert!(result.stdout.contains("hello again"));
        assert!(!result.stdout.contains("foo bar"));
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn ignore_case_matches_regardless_of_capitalization() {
        let result = GrepCommand.execute(ctx_with_files(vec!["-i", "HELLO", "/test.txt"], vec![("/test.txt", "Hello World\nhello world\n")]).await).await;
        assert_eq!(result.stdout, "Hello World\nhello world\n");
    }

    #[tokio::test]
    async fn invert_match_selects_non_matching_lines() {
        let result = GrepCommand.execute(ctx_with_files(vec!["-v", "hello", "/test.txt"], vec![("/test.txt", "hello\nworld\nhello again\n")]).await).await;
        assert_eq!(result.stdout.trim(), "world");
    }

    #[tokio::test]
    async fn count_only_prints_the_number_of_matches() {
        let result = GrepCommand.execute(ctx_with_files(vec!["-c", "hello", "/test.txt"], vec![("/test.txt", "hello\nworld\nhello again\n")]).await).await;
        assert_eq!(result.stdout.trim(), "2");
    }

    #[tokio::test]
    async fn line_number_prefixes_each_match() {
        let result = GrepCommand.execute(ctx_with_files(vec!["-n", "hello", "/test.txt"], vec![("/test.txt", "hello\nworld\nhello again\n")]).await).await;
        assert!(result.stdout.contains("1:hello"));
        assert!(result.stdout.contains("3:hello again"));
    }

    #[tokio::test]
    async fn no_match_exits_nonzero_with_empty_output() {
        let result = GrepCommand.execute(ctx_with_files(vec!["notfound", "/test.txt"], vec![("/test.txt", "hello world\n")]).await).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stdout.is_empty());
    }

    #[tokio::test]
    async fn fixed_strings_treats_the_pattern_literally() {
        let result = GrepCommand.execute(ctx_with_files(vec!["-F", "a.b", "/test.txt"], vec![("/test.txt", "a.b\naXb\n")]).await).await;
        assert_eq!(result.stdout.trim(), "a.b");
    }

    #[tokio::test]
    async fn files_with_matches_lists_only_matching_files() {
        let result = GrepCommand.execute(ctx_with_files(
            vec!["-l", "hello", "/a.txt", "/b.txt", "/c.txt"],
            vec![("/a.txt", "hello world"), ("/b.txt", "goodbye"), ("/c.txt", "hello again")],
        ).await).await;
        assert_eq!(result.stdout, "/a.txt\n/c.txt\n");
    }

    #[tokio::test]
    async fn files_without_match_lists_only_non_matching_files() {
        let result = GrepCommand.execute(ctx_with_files(
            vec!["-L", "hello", "/a.txt", "/b.txt"],
            vec![("/a.txt", "hello world"), ("/b.txt", "goodbye world")],
        ).await).await;
        assert_eq!(result.stdout, "/b.txt\n");
    }

    #[tokio::test]
    async fn only_matching_prints_just_the_matched_text() {
        let result = GrepCommand.execute(ctx_with_files(vec!["-o", "hello", "/test.txt"], vec![("/test.txt", "hello world hello\nfoo bar\n")]).await).await;
        assert_eq!(result.stdout, "hello\nhello\n");
    }

    #[tokio::test]
    async fn quiet_mode_produces_no_output() {
        let result = GrepCommand.execute(ctx_with_files(vec!["-q", "hello", "/test.txt"], vec![("/test.txt", "hello world\n")]).await).await;
        assert_eq!(result.stdout, "");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn max_count_stops_after_n_matches() {
        let result = GrepCommand.execute(ctx_with_files(vec!["-m", "2", "line", "/test.txt"], vec![("/test.txt", "line1\nline2\nline3\nline4\n")]).await).await;
        assert_eq!(result.stdout, "line1\nline2\n");
    }

    #[tokio::test]
    async fn combined_max_count_flag_works_like_the_split_form() {
        let result = GrepCommand.execute(ctx_with_files(vec!["-m2", "test", "/test.txt"], vec![("/test.txt", "test1\ntest2\ntest3\n")]).await).await;
        assert_eq!(result.stdout, "test1\ntest2\n");
    }

    #[tokio::test]
    async fn combined_short_flags_apply_ignore_case_and_line_number() {
        let result = GrepCommand.execute(ctx_with_files(vec!["-in", "HELLO", "/test.txt"], vec![("/test.txt", "hello\nworld\n")]).await).await;
        assert_eq!(result.stdout, "1:hello\n");
    }

    #[tokio::test]
    async fn multiple_files_prefix_each_match_with_its_filename() {
        let result = GrepCommand.execute(ctx_with_files(
            vec!["test", "/a.txt", "/b.txt"],
            vec![("/a.txt", "test line\n"), ("/b.txt", "another test\n")],
        ).await).await;
        assert!(result.stdout.contains("/a.txt:test line"));
        assert!(result.stdout.contains("/b.txt:another test"));
    }

    #[tokio::test]
    async fn a_single_file_gets_no_filename_prefix() {
        let result = GrepCommand.execute(ctx_with_files(vec!["test", "/test.txt"], vec![("/test.txt", "test line\n")]).await).await;
        assert_eq!(result.stdout, "test line\n");
    }

    #[tokio::test]
    async fn regex_metacharacters_work_as_a_real_pattern() {
        let result = GrepCommand.execute(ctx_with_files(vec!["^test", "/test.txt"], vec![("/test.txt", "test line\n  test line\ntest\n")]).await).await;
        assert_eq!(result.stdout, "test line\ntest\n");
    }

    #[tokio::test]
    async fn after_context_includes_trailing_lines() {
        let result = GrepCommand.execute(ctx_with_files(vec!["-A", "1", "match", "/test.txt"], vec![("/test.txt", "match\nafter\nother\nmatch\nafter2\n")]).await).await;
        assert_eq!(result.stdout, "match\nafter\n--\nmatch\nafter2\n");
    }

    #[tokio::test]
    async fn before_context_includes_leading_lines() {
        let result = GrepCommand.execute(ctx_with_files(vec!["-B", "1", "match", "/test.txt"], vec![("/test.txt", "before\nmatch\nfiller\nbefore2\nmatch\n")]).await).await;
        assert_eq!(result.stdout, "before\nmatch\n--\nbefore2\nmatch\n");
    }

    #[tokio::test]
    async fn context_flag_covers_both_sides() {
        let result = GrepCommand.execute(ctx_with_files(vec!["-C", "1", "match", "/test.txt"], vec![("/test.txt", "a\nmatch\nb\nc\n")]).await).await;
        assert_eq!(result.stdout, "a\nmatch\nb\n");
    }

    #[tokio::test]
    async fn adjacent_context_windows_merge_without_a_separator() {
        let result = GrepCommand.execute(ctx_with_files(vec!["-A", "1", "match", "/test.txt"], vec![("/test.txt", "match\nmatch\nfiller\n")]).await).await;
        assert_eq!(result.stdout, "match\nmatch\nfiller\n");
    }

    #[tokio::test]
    async fn empty_pattern_matches_every_line() {
        let result = GrepCommand.execute(ctx_with_files(vec!["", "/test.txt"], vec![("/test.txt", "hello\nworld\n")]).await).await;
        assert_eq!(result.stdout, "hello\nworld\n");
    }

    #[tokio::test]
    async fn extended_regex_alternation_matches_either_side() {
        let result = GrepCommand.execute(ctx_with_files(vec!["-E", "test|hello", "/test.txt"], vec![("/test.txt", "test\nworld\nhello\n")]).await).await;
        assert_eq!(result.stdout, "test\nhello\n");
    }
}
