//! `cat`: concatenate files to stdout (spec.md's text-output group).
//! `-b` and `-n` share the same numbering pass; `-b` only differs in
//! which lines count toward the running total.

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct CatCommand;

const HELP: &str = "Usage: cat [OPTION]... [FILE]...

Concatenate FILE(s) to standard output.

Options:
  -n, --number           number all output lines
  -b, --number-nonblank  number nonempty output lines, overrides -n
      --help             display this help and exit
";

#[derive(Clone, Copy, PartialEq)]
enum Numbering {
    None,
    All,
    NonBlank,
}

#[async_trait]
impl Command for CatCommand {
    fn name(&self) -> &'static str {
        "cat"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.has_flag(&["--help"]) {
            return CommandResult::success(HELP.to_string());
        }

        let mut numbering = Numbering::None;
        let mut files: Vec<String> = Vec::new();

        for arg in &ctx.args {
            match arg.as_str() {
                "-n" | "--number" => {
                    if numbering == Numbering::None {
                        numbering = Numbering::All;
                    }
                }
                "-b" | "--number-nonblank" => numbering = Numbering::NonBlank,
                _ if !arg.starts_with('-') || arg == "-" => files.push(arg.clone()),
                _ => {}
            }
        }

        if files.is_empty() {
            files.push("-".to_string());
        }

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;
        let mut line_number = 1;

        for file in &files {
            let content = if file == "-" {
                ctx.stdin.clone()
            } else {
                let path = ctx.fs.resolve_path(&ctx.cwd, file);
                match ctx.fs.read_file(&path).await {
                    Ok(c) => c,
                    Err(_) => {
                        stderr.push_str(&format!("cat: {file}: No such file or directory\n"));
                        exit_code = 1;
                        continue;
                    }
                }
            };

            if numbering == Numbering::None {
                stdout.push_str(&content);
            } else {
                let (numbered, next_line) = add_line_numbers(&content, line_number, numbering);
                stdout.push_str(&numbered);
                line_number = next_line;
            }
        }

        CommandResult::with_exit_code(stdout, stderr, exit_code)
    }
}

fn add_line_numbers(content: &str, start_line: usize, numbering: Numbering) -> (String, usize) {
    let lines: Vec<&str> = content.split('\n').collect();
    let has_trailing_newline = content.ends_with('\n');
    let lines_to_number = if has_trailing_newline { &lines[..lines.len() - 1] } else { &lines[..] };

    let mut next = start_line;
    let mut rendered = Vec::with_capacity(lines_to_number.len());
    for line in lines_to_number {
        if numbering == Numbering::NonBlank && line.is_empty() {
            rendered.push(String::new());
        } else {
            rendered.push(format!("{next:>6}\t{line}"));
            next += 1;
        }
    }

    let result = if has_trailing_newline { format!("{}\n", rendered.join("\n")) } else { rendered.join("\n") };
    (result, next)
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
    async fn a_single_file_is_printed_verbatim() {
        let result = CatCommand.execute(ctx_with_files(vec!["/test.txt"], vec![("/test.txt", "hello world\n")]).await).await;
        assert_eq!(result.stdout, "hello world\n");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn multiple_files_are_concatenated_in_order() {
        let result = CatCommand.execute(ctx_with_files(vec!["/a.txt", "/b.txt"], vec![("/a.txt", "aaa\n"), ("/b.txt", "bbb\n")]).await).await;
        assert_eq!(result.stdout, "aaa\nbbb\n");
    }

    #[tokio::test]
    async fn n_flag_numbers_every_line() {
        let result = CatCommand.execute(ctx_with_files(vec!["-n", "/test.txt"], vec![("/test.txt", "line1\nline2\n")]).await).await;
        assert_eq!(result.stdout, "     1\tline1\n     2\tline2\n");
    }

    #[tokio::test]
    async fn missing_file_reports_an_error_but_continues() {
        let result = CatCommand.execute(ctx_with_files(vec!["/missing.txt", "/exists.txt"], vec![("/exists.txt", "content")]).await).await;
        assert_eq!(result.stdout, "content");
        assert!(result.stderr.contains("No such file or directory"));
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn dash_reads_from_stdin() {
        let mut ctx = ctx_with_files(vec!["-"], vec![]).await;
        ctx.stdin = "from stdin\n".to_string();
        let result = CatCommand.execute(ctx).await;
        assert_eq!(result.stdout, "from stdin\n");
    }

    #[tokio::test]
    async fn empty_file_produces_no_output() {
        let result = CatCommand.execute(ctx_with_files(vec!["/empty.txt"], vec![("/empty.txt", "")]).await).await;
        assert_eq!(result.stdout, "");
    }

    #[tokio::test]
    async fn relative_paths_resolve_against_cwd() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/home/user/file.txt", b"content").await.unwrap();
        let mut ctx = ctx_with_files(vec!["file.txt"], vec![]).await;
        ctx.fs = fs;
        ctx.cwd = "/home/user".to_string();
        let result = CatCommand.execute(ctx).await;
        assert_eq!(result.stdout, "content");
    }

    #[tokio::test]
    async fn number_nonblank_skips_empty_lines_in_the_count() {
        let result = CatCommand.execute(ctx_with_files(vec!["-b", "/test.txt"], vec![("/test.txt", "one\n\ntwo\n")]).await).await;
        assert_eq!(result.stdout, "     1\tone\n\n     2\ttwo\n");
    }

    #[tokio::test]
    async fn number_nonblank_overrides_a_preceding_n_flag() {
        let result = CatCommand.execute(ctx_with_files(vec!["-n", "-b", "/test.txt"], vec![("/test.txt", "a\n\nb\n")]).await).await;
        assert_eq!(result.stdout, "     1\ta\n\n     2\tb\n");
    }

    #[tokio::test]
    async fn long_option_name_works_like_its_short_form() {
        let result = CatCommand.execute(ctx_with_files(vec!["--number", "/test.txt"], vec![("/test.txt", "line1\nline2\n")]).await).await;
        assert_eq!(result.stdout, "     1\tline1\n     2\tline2\n");
    }
}
