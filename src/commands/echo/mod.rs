//! `echo`: print arguments separated by spaces (spec.md's text-output
//! group). `-n`/`-e`/`-E` combine freely in one flag, matching GNU
//! coreutils' `echo` rather than bash's builtin, which only recognizes
//! the bare flags.

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct EchoCommand;

#[derive(Default)]
struct Flags {
    no_newline: bool,
    interpret_escapes: bool,
}

/// GNU `echo` accepts any run of `n`/`e`/`E` characters as a single flag
/// (`-ne`, `-en`, `-nEe`, ...), not just the two fixed spellings bash's
/// builtin recognizes. Returns `None` if `arg` isn't such a run.
fn parse_flag_run(arg: &str) -> Option<Flags> {
    let body = arg.strip_prefix('-')?;
    if body.is_empty() || !body.chars().all(|c| matches!(c, 'n' | 'e' | 'E')) {
        return None;
    }
    let mut flags = Flags::default();
    for c in body.chars() {
        match c {
            'n' => flags.no_newline = true,
            'e' => flags.interpret_escapes = true,
            'E' => flags.interpret_escapes = false,
            _ => unreachable!(),
        }
    }
    Some(flags)
}

#[async_trait]
impl Command for EchoCommand {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let args = &ctx.args;
        let mut flags = Flags::default();
        let mut start_index = 0;

        while start_index < args.len() {
            match parse_flag_run(&args[start_index]) {
                Some(parsed) => {
                    flags.no_newline |= parsed.no_newline;
                    flags.interpret_escapes = parsed.interpret_escapes || flags.interpret_escapes;
                    start_index += 1;
                }
                None => break,
            }
        }

        let mut output = args[start_index..].join(" ");

        if flags.interpret_escapes {
            let result = process_escapes(&output);
            output = result.output;
            if result.stop {
                return CommandResult::success(output);
            }
        }

        if !flags.no_newline {
            output.push('\n');
        }

        CommandResult::success(output)
    }
}

struct EscapeResult {
    output: String,
    stop: bool,
}

/// Interprets the backslash escapes `echo -e` understands. `\c` is a hard
/// stop: everything after it, including the trailing newline, is dropped.
fn process_escapes(input: &str) -> EscapeResult {
    let mut result = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        let Some(&next) = chars.peek() else {
            result.push('\\');
            break;
        };
        match next {
            '\\' | 'n' | 't' | 'r' | 'a' | 'b' | 'f' | 'v' | 'e' | 'E' => {
                chars.next();
                result.push(match next {
                    '\\' => '\\',
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    'a' => '\x07',
                    'b' => '\x08',
                    'f' => '\x0c',
                    'v' => '\x0b',
                    _ => '\x1b',
                });
            }
            'c' => {
                chars.next();
                return EscapeResult { output: result, stop: true };
            }
            '0' => {
                chars.next();
                let octal: String = chars.clone().take(3).take_while(|c| ('0'..='7').contains(c)).collect();
                for _ in 0..octal.len() {
                    chars.next();
                }
                if octal.is_empty() {
                    result.push('\0');
                } else if let Some(c) = char::from_u32(u32::from_str_radix(&octal, 8).unwrap_or(0) % 256) {
                    result.push(c);
                }
            }
            'x' | 'u' | 'U' => {
                let marker = next;
                chars.next();
                let max = match marker {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let hex: String = chars.clone().take(max).take_while(|c| c.is_ascii_hexdigit()).collect();
                for _ in 0..hex.len() {
                    chars.next();
                }
                if hex.is_empty() {
                    result.push('\\');
                    result.push(marker);
                } else {
                    let code = u32::from_str_radix(&hex, 16).unwrap_or(0);
                    match char::from_u32(code) {
                        Some(c) => result.push(c),
                        None => {
                            result.push('\\');
                            result.push(marker);
                            result.push_str(&hex);
                        }
                    }
                }
            }
            other => {
                chars.next();
                result.push('\\');
                result.push(other);
            }
        }
    }

    EscapeResult { output: result, stop: false }
}
