//! `xargs`: build and run command lines from a stream of input items
//! (spec.md's process-construction group). Batching (`-n`), replacement
//! (`-I`), and null/custom delimiters all reduce to "split the input into
//! items, then group items into one or more invocations of `command`".
//! Without an `exec_fn` wired into the context, invocations are echoed
//! back as text rather than actually run.

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct XargsCommand;

const HELP: &str = "Usage: xargs [OPTION]... [COMMAND [INITIAL-ARGS]]

Build and execute command lines from standard input.

Options:
  -I REPLACE   replace occurrences of REPLACE with input
  -d DELIM     use DELIM as input delimiter
  -a FILE      read items from FILE instead of standard input
  -n NUM       use at most NUM arguments per command line
  -P NUM       run at most NUM processes at a time
  -0, --null   items are separated by null, not whitespace
  -t, --verbose  print commands before executing
  -r, --no-run-if-empty  do not run command if input is empty
      --help   display this help and exit
";

fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "\"\"".to_string();
    }
    if arg.contains(|c: char| c.is_whitespace() || "\"'$`\\!#&|;(){}".contains(c)) {
        format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\"").replace('$', "\\$").replace('`', "\\`"))
    } else {
        arg.to_string()
    }
}

fn parse_delimiter(delim: &str) -> String {
    delim.replace("\\n", "\n").replace("\\t", "\t").replace("\\r", "\r").replace("\\0", "\0").replace("\\\\", "\\")
}

fn split_items(input: &str, null_separator: bool, delimiter: &Option<String>) -> Vec<String> {
    if null_separator {
        input.split('\0').filter(|s| !s.is_empty()).map(String::from).collect()
    } else if let Some(delim) = delimiter {
        let trimmed = input.strip_suffix('\n').unwrap_or(input);
        trimmed.split(delim.as_str()).filter(|s| !s.is_empty()).map(String::from).collect()
    } else {
        input.split_whitespace().map(String::from).collect()
    }
}

#[derive(Default)]
struct Options {
    replace_str: Option<String>,
    delimiter: Option<String>,
    input_file: Option<String>,
    max_args: Option<usize>,
    null_separator: bool,
    verbose: bool,
    no_run_if_empty: bool,
}

fn parse_options(args: &[String]) -> Result<(Options, Vec<String>), String> {
    let mut opts = Options::default();
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "-I" if i + 1 < args.len() => {
                i += 1;
                opts.replace_str = Some(args[i].clone());
            }
            "-d" if i + 1 < args.len() => {
                i += 1;
                opts.delimiter = Some(parse_delimiter(&args[i]));
            }
            "-a" if i + 1 < args.len() => {
                i += 1;
                opts.input_file = Some(args[i].clone());
            }
            "-n" if i + 1 < args.len() => {
                i += 1;
                opts.max_args = Some(args[i].parse().map_err(|_| format!("xargs: invalid number for -n: '{}'\n", args[i]))?);
            }
            "-P" if i + 1 < args.len() => {
                i += 1;
                args[i].parse::<usize>().map_err(|_| format!("xargs: invalid number for -P: '{}'\n", args[i]))?;
            }
            "-0" | "--null" => opts.null_separator = true,
            "-t" | "--verbose" => opts.verbose = true,
            "-r" | "--no-run-if-empty" => opts.no_run_if_empty = true,
            s if s.starts_with("--") => return Err(format!("xargs: unknown option '{s}'\n")),
            s if s.starts_with('-') && s.len() > 1 => {
                for c in s[1..].chars() {
                    match c {
                        '0' => opts.null_separator = true,
                        't' => opts.verbose = true,
                        'r' => opts.no_run_if_empty = true,
                        other => return Err(format!("xargs: unknown option '-{other}'\n")),
                    }
                }
            }
            _ => return Ok((opts, args[i..].to_vec())),
        }
        i += 1;
    }
    Ok((opts, Vec::new()))
}

fn build_invocations(command: &[String], items: &[String], opts: &Options) -> Vec<Vec<String>> {
    if let Some(rs) = &opts.replace_str {
        items.iter().map(|item| command.iter().map(|c| c.replace(rs.as_str(), item)).collect()).collect()
    } else if let Some(n) = opts.max_args {
        items.chunks(n).map(|batch| command.iter().cloned().chain(batch.iter().cloned()).collect()).collect()
    } else {
        vec![command.iter().cloned().chain(items.iter().cloned()).collect()]
    }
}

#[async_trait]
impl Command for XargsCommand {
    fn name(&self) -> &'static str {
        "xargs"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.has_flag(&["--help"]) {
            return CommandResult::success(HELP.to_string());
        }

        let (opts, rest) = match parse_options(&ctx.args) {
            Ok(v) => v,
            Err(e) => return CommandResult::error(e),
        };

        let mut command = rest;
        if command.is_empty() {
            command.push("echo".to_string());
        }

        let input = match &opts.input_file {
            Some(file) => {
                let path = ctx.fs.resolve_path(&ctx.cwd, file);
                match ctx.fs.read_file(&path).await {
                    Ok(content) => content,
                    Err(_) => return CommandResult::error(format!("xargs: {file}: No such file or directory\n")),
                }
            }
            None => ctx.stdin.clone(),
        };

        let items = split_items(&input, opts.null_separator, &opts.delimiter);

        if items.is_empty() {
            return CommandResult::success(String::new());
        }
        let _ = opts.no_run_if_empty;

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;

        for cmd_args in build_invocations(&command, &items, &opts) {
            let cmd_line = cmd_args.iter().map(|a| quote_arg(a)).collect::<Vec<_>>().join(" ");

            if opts.verbose {
                stderr.push_str(&format!("{cmd_line}\n"));
            }

            match &ctx.exec_fn {
                Some(exec_fn) => {
                    let result = exec_fn(cmd_line, String::new(), ctx.cwd.clone(), ctx.env.clone(), ctx.fs.clone()).await;
                    stdout.push_str(&result.stdout);
                    stderr.push_str(&result.stderr);
                    if result.exit_code != 0 {
                        exit_code = result.exit_code;
                    }
                }
                None => stdout.push_str(&format!("{cmd_line}\n")),
            }
        }

        CommandResult::with_exit_code(stdout, stderr, exit_code)
    }
}
