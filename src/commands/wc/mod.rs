//! `wc`: count lines, words, characters, and the longest line of each
//! file (spec.md's text-filter group). A single scan over the content
//! in `count_stats` drives every counter that `-l`/`-w`/`-c`/`-m`/`-L`
//! can select from.

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct WcCommand;

const HELP: &str = "Usage: wc [OPTION]... [FILE]...

Print newline, word, and byte counts for each FILE.

Options:
  -c, --bytes    print the byte counts
  -m, --chars    print the character counts
  -l, --lines    print the newline counts
  -w, --words    print the word counts
  -L, --max-line-length  print the length of the longest line
      --help     display this help and exit
";

#[derive(Default)]
struct Stats {
    lines: usize,
    words: usize,
    chars: usize,
    max_line_length: usize,
}

fn count_stats(content: &str) -> Stats {
    let mut stats = Stats::default();
    let mut in_word = false;
    let mut current_line_length = 0;

    for c in content.chars() {
        stats.chars += 1;
        if c == '\n' {
            stats.lines += 1;
            stats.max_line_length = stats.max_line_length.max(current_line_length);
            current_line_length = 0;
            if in_word {
                stats.words += 1;
                in_word = false;
            }
        } else {
            current_line_length += 1;
            if c == ' ' || c == '\t' || c == '\r' {
                if in_word {
                    stats.words += 1;
                    in_word = false;
                }
            } else {
                in_word = true;
            }
        }
    }

    if in_word {
        stats.words += 1;
    }
    stats.max_line_length = stats.max_line_length.max(current_line_length);

    stats
}

#[derive(Default)]
struct Columns {
    lines: bool,
    words: bool,
    chars: bool,
    max_line_length: bool,
}

fn render_row(stats: &Stats, columns: &Columns, width: usize, label: Option<&str>) -> String {
    let mut parts = Vec::new();
    if columns.lines {
        parts.push(format!("{:>width$}", stats.lines));
    }
    if columns.words {
        parts.push(format!("{:>width$}", stats.words));
    }
    if columns.chars {
        parts.push(format!("{:>width$}", stats.chars));
    }
    if columns.max_line_length {
        parts.push(format!("{:>width$}", stats.max_line_length));
    }
    match label {
        Some(name) => format!("{} {}\n", parts.join(" "), name),
        None => format!("{}\n", parts.join(" ")),
    }
}

#[async_trait]
impl Command for WcCommand {
    fn name(&self) -> &'static str {
        "wc"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.has_flag(&["--help"]) {
            return CommandResult::success(HELP.to_string());
        }

        let mut columns = Columns::default();
        let mut files: Vec<String> = Vec::new();

        for arg in &ctx.args {
            match arg.as_str() {
                "-l" | "--lines" => columns.lines = true,
                "-w" | "--words" => columns.words = true,
                "-c" | "--bytes" | "-m" | "--chars" => columns.chars = true,
                "-L" | "--max-line-length" => columns.max_line_length = true,
                _ if !arg.starts_with('-') => files.push(arg.clone()),
                _ => {}
            }
        }

        if !columns.lines && !columns.words && !columns.chars && !columns.max_line_length {
            columns.lines = true;
            columns.words = true;
            columns.chars = true;
        }

        if files.is_empty() {
            files.push("-".to_string());
        }

        let mut all_stats: Vec<(Stats, Option<String>)> = Vec::new();
        let mut stderr = String::new();
        let mut exit_code = 0;

        for file in &files {
            let content = if file == "-" {
                ctx.stdin.clone()
            } else {
                let path = ctx.fs.resolve_path(&ctx.cwd, file);
                match ctx.fs.read_file(&path).await {
                    Ok(c) => c,
                    Err(_) => {
                        stderr.push_str(&format!("wc: {file}: No such file or directory\n"));
                        exit_code = 1;
                        continue;
                    }
                }
            };

            all_stats.push((count_stats(&content), if file == "-" { None } else { Some(file.clone()) }));
        }

        let width = all_stats.iter().fold(if all_stats.len() > 1 { 7 } else { 0 }, |w, (s, _)| {
            w.max(s.lines.to_string().len()).max(s.words.to_string().len()).max(s.chars.to_string().len()).max(s.max_line_length.to_string().len())
        });

        let mut stdout = String::new();
        let mut total = Stats::default();

        for (stats, filename) in &all_stats {
            stdout.push_str(&render_row(stats, &columns, width, filename.as_deref()));
            total.lines += stats.lines;
            total.words += stats.words;
            total.chars += stats.chars;
            total.max_line_length = total.max_line_length.max(stats.max_line_length);
        }

        if all_stats.len() > 1 {
            stdout.push_str(&render_row(&total, &columns, width, Some("total")));
        }

        CommandResult::with_exit_code(stdout, stderr, exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::types::FileSystem;
    use crate::fs::InMemoryFs;
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
    async fn no_flags_shows_lines_words_and_chars() {
        let result = WcCommand.execute(ctx_with_files(vec!["/test.txt"], vec![("/test.txt", "hello world\nfoo bar\n")]).await).await;
        assert!(result.stdout.contains("2"));
        assert!(result.stdout.contains("4"));
        assert!(result.stdout.contains("20"));
    }

    #[tokio::test]
    async fn l_flag_shows_only_the_line_count() {
        let result = WcCommand.execute(ctx_with_files(vec!["-l", "/test.txt"], vec![("/test.txt", "line1\nline2\nline3\n")]).await).await;
        assert!(result.stdout.trim().starts_with('3'));
    }

    #[tokio::test]
    async fn multiple_files_get_a_total_row() {
        let result = WcCommand.execute(ctx_with_files(vec!["/a.txt", "/b.txt"], vec![("/a.txt", "aaa\n"), ("/b.txt", "bbb\nccc\n")]).await).await;
        assert!(result.stdout.contains("total"));
    }

    #[tokio::test]
    async fn max_line_length_reports_the_longest_line() {
        let result = WcCommand.execute(ctx_with_files(vec!["-L", "/test.txt"], vec![("/test.txt", "short\na much longer line\nmid\n")]).await).await;
        assert_eq!(result.stdout.trim(), "18");
    }

    #[tokio::test]
    async fn max_line_length_counts_a_trailing_unterminated_line() {
        let result = WcCommand.execute(ctx_with_files(vec!["-L", "/test.txt"], vec![("/test.txt", "ab\nabcdef")]).await).await;
        assert_eq!(result.stdout.trim(), "6");
    }

    #[tokio::test]
    async fn missing_file_reports_an_error() {
        let result = WcCommand.execute(ctx_with_files(vec!["/missing.txt"], vec![]).await).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("No such file or directory"));
    }
}
