//! `sort`: GNU-coreutils-style line sorting (spec.md's text-filter group).
//! Key parsing and comparison modes live in `comparator`; this module only
//! does argument parsing, record splitting, and I/O.

pub mod comparator;

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};
use comparator::{SortOptions, parse_key_spec, create_comparator};

pub struct SortCommand;

const HELP: &str = "Usage: sort [OPTION]... [FILE]...\n\n\
Write sorted concatenation of all FILE(s) to standard output.\n\n\
Options:\n\
  -r, --reverse              reverse the result of comparisons\n\
  -n, --numeric-sort         compare according to string numerical value\n\
  -u, --unique               output only unique lines\n\
  -f, --ignore-case          fold lower case to upper case characters\n\
  -h, --human-numeric-sort   compare human readable numbers (e.g., 2K 1G)\n\
  -V, --version-sort         natural sort of (version) numbers within text\n\
  -d, --dictionary-order     consider only blanks and alphanumeric characters\n\
  -M, --month-sort           compare (unknown) < 'JAN' < ... < 'DEC'\n\
  -b, --ignore-leading-blanks ignore leading blanks\n\
  -s, --stable               stabilize sort by disabling last-resort comparison\n\
  -c, --check                check for sorted input; do not sort\n\
  -z, --zero-terminated      records end with NUL, not newline\n\
  -o FILE, --output=FILE     write result to FILE instead of standard output\n\
  -k KEYDEF, --key=KEYDEF    sort via a key; KEYDEF gives location and type\n\
  -t SEP, --field-separator=SEP  use SEP instead of non-blank to blank transition\n\
      --help                 display this help and exit\n";

fn parse_args(args: &[String]) -> (SortOptions, Vec<String>, bool) {
    let mut opts = SortOptions::default();
    let mut files = Vec::new();
    let mut zero_terminated = false;
    let mut iter = args.iter().enumerate().peekable();

    while let Some((i, arg)) = iter.next() {
        if arg == "--" {
            files.extend(args[i + 1..].iter().cloned());
            break;
        }

        if let Some(long) = arg.strip_prefix("--") {
            match long {
                "reverse" => opts.reverse = true,
                "numeric-sort" => opts.numeric = true,
                "unique" => opts.unique = true,
                "ignore-case" => opts.ignore_case = true,
                "human-numeric-sort" => opts.human_numeric = true,
                "version-sort" => opts.version_sort = true,
                "dictionary-order" => opts.dictionary_order = true,
                "month-sort" => opts.month_sort = true,
                "ignore-leading-blanks" => opts.ignore_leading_blanks = true,
                "stable" => opts.stable = true,
                "check" => opts.check = true,
                "zero-terminated" => zero_terminated = true,
                _ if long.starts_with("output=") => opts.output_file = Some(long["output=".len()..].to_string()),
                _ if long.starts_with("key=") => opts.keys.push(parse_key_spec(&long["key=".len()..])),
                _ if long.starts_with("field-separator=") => {
                    opts.field_separator = long["field-separator=".len()..].chars().next();
                }
                _ => {}
            }
            continue;
        }

        if arg.starts_with('-') && arg.len() > 1 {
            let mut chars = arg[1..].chars().peekable();
            while let Some(c) = chars.next() {
                match c {
                    'r' => opts.reverse = true,
                    'n' => opts.numeric = true,
                    'u' => opts.unique = true,
                    'f' => opts.ignore_case = true,
                    'h' => opts.human_numeric = true,
                    'V' => opts.version_sort = true,
                    'd' => opts.dictionary_order = true,
                    'M' => opts.month_sort = true,
                    'b' => opts.ignore_leading_blanks = true,
                    's' => opts.stable = true,
                    'c' => opts.check = true,
                    'z' => zero_terminated = true,
                    'o' | 'k' | 't' => {
                        let rest: String = chars.by_ref().collect();
                        let value = if !rest.is_empty() {
                            rest
                        } else if let Some((_, next)) = iter.next() {
                            next.clone()
                        } else {
                            String::new()
                        };
                        match c {
                            'o' => opts.output_file = Some(value),
                            'k' => opts.keys.push(parse_key_spec(&value)),
                            _ => opts.field_separator = value.chars().next(),
                        }
                        break;
                    }
                    _ => {}
                }
            }
            continue;
        }

        files.push(arg.clone());
    }

    (opts, files, zero_terminated)
}

fn split_records(input: &str, zero_terminated: bool) -> Vec<&str> {
    if zero_terminated {
        let trimmed = input.strip_suffix('\0').unwrap_or(input);
        if trimmed.is_empty() { Vec::new() } else { trimmed.split('\0').collect() }
    } else {
        input.lines().collect()
    }
}

#[async_trait]
impl Command for SortCommand {
    fn name(&self) -> &'static str {
        "sort"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.has_flag(&["--help"]) {
            return CommandResult::success(HELP.to_string());
        }

        let (opts, files, zero_terminated) = parse_args(&ctx.args);

        let input = if files.is_empty() || (files.len() == 1 && files[0] == "-") {
            ctx.stdin.clone()
        } else {
            let path = ctx.fs.resolve_path(&ctx.cwd, &files[0]);
            match ctx.fs.read_file(&path).await {
                Ok(c) => c,
                Err(_) => return CommandResult::error(format!("sort: {}: No such file or directory\n", files[0])),
            }
        };

        if input.is_empty() {
            return CommandResult::success(String::new());
        }

        let mut lines = split_records(&input, zero_terminated);
        if lines.is_empty() {
            return CommandResult::success(String::new());
        }

        let separator = if zero_terminated { '\0' } else { '\n' };

        // The comparator closure isn't Send; keep its lifetime confined to this
        // block so nothing holding it crosses an .await below.
        let output = {
            let comparator = create_comparator(&opts);

            if opts.check {
                for idx in 1..lines.len() {
                    if comparator(lines[idx - 1], lines[idx]) == std::cmp::Ordering::Greater {
                        return CommandResult::with_exit_code(
                            String::new(),
                            format!("sort: -:{}:disorder: {}\n", idx + 1, lines[idx]),
                            1,
                        );
                    }
                }
                return CommandResult::success(String::new());
            }

            lines.sort_by(|a, b| comparator(a, b));

            if opts.unique {
                lines.dedup_by(|a, b| comparator(a, b) == std::cmp::Ordering::Equal);
            }

            let mut out = String::new();
            for line in &lines {
                out.push_str(line);
                out.push(separator);
            }
            out
        };

        if let Some(ref out_path) = opts.output_file {
            let resolved = ctx.fs.resolve_path(&ctx.cwd, out_path);
            return match ctx.fs.write_file(&resolved, output.as_bytes()).await {
                Ok(_) => CommandResult::success(String::new()),
                Err(e) => CommandResult::error(format!("sort: {out_path}: {e}\n")),
            };
        }

        CommandResult::success(output)
    }
}
