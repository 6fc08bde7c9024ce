//! Argument parsing and line/byte trimming shared by `head` and `tail`.
//! Both read the same flag set (`-n`/`-c`/`-q`/`-v`) and the same
//! multi-file header convention (`==> name <==`); `tail` alone accepts
//! the legacy `+N`/`-n+N` "start at line N" syntax.

use crate::commands::{CommandContext, CommandResult};

#[derive(Debug, Clone)]
pub struct HeadTailOptions {
    pub lines: usize,
    pub bytes: Option<usize>,
    pub quiet: bool,
    pub verbose: bool,
    pub files: Vec<String>,
    pub from_line: bool,
}

impl Default for HeadTailOptions {
    fn default() -> Self {
        Self { lines: 10, bytes: None, quiet: false, verbose: false, files: Vec::new(), from_line: false }
    }
}

pub enum HeadTailParseResult {
    Ok(HeadTailOptions),
    Err(CommandResult),
}

fn invalid_option(cmd_name: &str, arg: &str) -> HeadTailParseResult {
    if arg.starts_with("--") {
        HeadTailParseResult::Err(CommandResult::error(format!("{cmd_name}: unrecognized option '{arg}'\n")))
    } else {
        HeadTailParseResult::Err(CommandResult::error(format!("{cmd_name}: invalid option -- '{}'\n", &arg[1..])))
    }
}

pub fn parse_head_tail_args(args: &[String], cmd_name: &str) -> HeadTailParseResult {
    let mut opts = HeadTailOptions::default();
    let is_tail = cmd_name == "tail";
    let mut iter = args.iter().peekable();

    while let Some(arg) = iter.next() {
        let arg = arg.as_str();
        if arg == "-n" || arg == "--lines" {
            let Some(value) = iter.next() else { return invalid_option(cmd_name, arg) };
            if is_tail && value.starts_with('+') {
                opts.from_line = true;
                opts.lines = value[1..].parse().unwrap_or(10);
            } else {
                opts.lines = value.parse().unwrap_or(10);
            }
        } else if is_tail && arg.starts_with("-n+") {
            opts.from_line = true;
            opts.lines = arg[3..].parse().unwrap_or(10);
        } else if let Some(rest) = arg.strip_prefix("-n") {
            if !rest.is_empty() {
                opts.lines = rest.parse().unwrap_or(10);
            }
        } else if arg == "-c" || arg == "--bytes" {
            let Some(value) = iter.next() else { return invalid_option(cmd_name, arg) };
            opts.bytes = value.parse().ok();
        } else if let Some(rest) = arg.strip_prefix("--bytes=") {
            opts.bytes = rest.parse().ok();
        } else if let Some(rest) = arg.strip_prefix("--lines=") {
            opts.lines = rest.parse().unwrap_or(10);
        } else if let Some(rest) = arg.strip_prefix("-c") {
            if !rest.is_empty() {
                opts.bytes = rest.parse().ok();
            }
        } else if matches!(arg, "-q" | "--quiet" | "--silent") {
            opts.quiet = true;
        } else if matches!(arg, "-v" | "--verbose") {
            opts.verbose = true;
        } else if let Some(rest) = arg.strip_prefix('-') {
            if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
                opts.lines = rest.parse().unwrap_or(10);
            } else if arg != "-" {
                return invalid_option(cmd_name, arg);
            } else {
                opts.files.push(arg.to_string());
            }
        } else {
            opts.files.push(arg.to_string());
        }
    }

    if opts.bytes == Some(0) {
        return HeadTailParseResult::Err(CommandResult::error(format!("{cmd_name}: invalid number of bytes\n")));
    }

    HeadTailParseResult::Ok(opts)
}

pub async fn process_head_tail_files<F>(ctx: &CommandContext, opts: &HeadTailOptions, cmd_name: &str, processor: F) -> CommandResult
where
    F: Fn(&str) -> String,
{
    if opts.files.is_empty() {
        return CommandResult::success(processor(&ctx.stdin));
    }

    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut exit_code = 0;
    let show_headers = opts.verbose || (!opts.quiet && opts.files.len() > 1);
    let mut shown_any = false;

    for file in &opts.files {
        let path = ctx.fs.resolve_path(&ctx.cwd, file);
        match ctx.fs.read_file(&path).await {
            Ok(content) => {
                if show_headers {
                    if shown_any {
                        stdout.push('\n');
                    }
                    stdout.push_str(&format!("==> {file} <==\n"));
                }
                stdout.push_str(&processor(&content));
                shown_any = true;
            }
            Err(_) => {
                stderr.push_str(&format!("{cmd_name}: {file}: No such file or directory\n"));
                exit_code = 1;
            }
        }
    }

    CommandResult::with_exit_code(stdout, stderr, exit_code)
}

/// First `lines` lines of `content`, or first `bytes` bytes when given.
pub fn get_head(content: &str, lines: usize, bytes: Option<usize>) -> String {
    if let Some(b) = bytes {
        return content.chars().take(b).collect();
    }
    if lines == 0 {
        return String::new();
    }
    match content.match_indices('\n').nth(lines - 1) {
        Some((idx, _)) => content[..=idx].to_string(),
        None => content.to_string(),
    }
}

/// Last `lines` lines of `content` (or, with `from_line`, everything from
/// line `lines` onward), or the last `bytes` bytes when given.
pub fn get_tail(content: &str, lines: usize, bytes: Option<usize>, from_line: bool) -> String {
    if let Some(b) = bytes {
        let chars: Vec<char> = content.chars().collect();
        let start = chars.len().saturating_sub(b);
        return chars[start..].iter().collect();
    }
    if content.is_empty() {
        return String::new();
    }

    if from_line {
        let start = if lines <= 1 {
            0
        } else {
            match content.match_indices('\n').nth(lines - 2) {
                Some((idx, _)) => idx + 1,
                None => content.len(),
            }
        };
        let body = &content[start..];
        if body.ends_with('\n') { body.to_string() } else { format!("{body}\n") }
    } else {
        if lines == 0 {
            return String::new();
        }
        let scan_end = if content.ends_with('\n') { content.len() - 1 } else { content.len() };
        let start = match content[..scan_end].rmatch_indices('\n').nth(lines - 1) {
            Some((idx, _)) => idx + 1,
            None => 0,
        };
        let body = &content[start..];
        if content.ends_with('\n') { body.to_string() } else { format!("{body}\n") }
    }
}
