//! `truncate`: resize a file to exactly `-s SIZE` bytes. `SIZE` may be
//! prefixed with `+`/`-` to grow/shrink relative to the current size,
//! or `=` (the default) for an absolute size. Growing pads with NUL
//! bytes; `-c`/`--no-create` skips files that don't exist instead of
//! creating them at size 0 first.

use async_trait::async_trait;

use crate::commands::{Command, CommandContext, CommandResult};

pub struct TruncateCommand;

enum SizeSpec {
    Absolute(u64),
    Grow(u64),
    Shrink(u64),
}

fn parse_size(arg: &str) -> Result<SizeSpec, String> {
    let (sign, digits) = match arg.as_bytes().first() {
        Some(b'+') => (1i8, &arg[1..]),
        Some(b'-') => (-1i8, &arg[1..]),
        _ => (0i8, arg),
    };
    let value = digits.parse::<u64>().map_err(|_| format!("invalid size: '{arg}'"))?;
    Ok(match sign {
        1 => SizeSpec::Grow(value),
        -1 => SizeSpec::Shrink(value),
        _ => SizeSpec::Absolute(value),
    })
}

struct Options {
    size: Option<SizeSpec>,
    no_create: bool,
}

fn parse_args(argv: &[String]) -> Result<(Options, Vec<String>), String> {
    let mut opts = Options { size: None, no_create: false };
    let mut idx = 0;
    while idx < argv.len() {
        match argv[idx].as_str() {
            "-s" | "--size" => {
                idx += 1;
                let arg = argv.get(idx).ok_or("option '-s' requires an argument")?;
                opts.size = Some(parse_size(arg)?);
            }
            s if s.starts_with("-s") && s.len() > 2 => {
                opts.size = Some(parse_size(&s[2..])?);
            }
            s if s.starts_with("--size=") => {
                opts.size = Some(parse_size(&s[7..])?);
            }
            "-c" | "--no-create" => opts.no_create = true,
            "--" => {
                idx += 1;
                break;
            }
            other if other.starts_with('-') && other.len() > 1 => {
                return Err(format!("invalid option -- '{}'", other.trim_start_matches('-')));
            }
            _ => break,
        }
        idx += 1;
    }
    let files = argv[idx..].to_vec();
    Ok((opts, files))
}

#[async_trait]
impl Command for TruncateCommand {
    fn name(&self) -> &'static str {
        "truncate"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let (opts, files) = match parse_args(&ctx.args) {
            Ok(v) => v,
            Err(e) => return CommandResult::with_exit_code(String::new(), format!("truncate: {e}\n"), 1),
        };
        let Some(size_spec) = opts.size else {
            return CommandResult::with_exit_code(String::new(), "truncate: you must specify a size\n".to_string(), 1);
        };
        if files.is_empty() {
            return CommandResult::with_exit_code(String::new(), "truncate: missing file operand\n".to_string(), 1);
        }

        let mut stderr = String::new();
        let mut had_error = false;

        for file in &files {
            let path = ctx.fs.resolve_path(&ctx.cwd, file);
            let current_size = match ctx.fs.stat(&path).await {
                Ok(stat) => stat.size,
                Err(_) if opts.no_create => {
                    stderr.push_str(&format!("truncate: cannot open '{file}' for writing\n"));
                    had_error = true;
                    continue;
                }
                Err(_) => 0,
            };

            let target = match &size_spec {
                SizeSpec::Absolute(n) => *n,
                SizeSpec::Grow(n) => current_size.saturating_add(*n),
                SizeSpec::Shrink(n) => current_size.saturating_sub(*n),
            };

            if !ctx.fs.exists(&path).await {
                if let Err(e) = ctx.fs.write_file(&path, &[]).await {
                    stderr.push_str(&format!("truncate: cannot create '{file}': {e}\n"));
                    had_error = true;
                    continue;
                }
            }

            if let Err(e) = ctx.fs.truncate(&path, target).await {
                stderr.push_str(&format!("truncate: cannot truncate '{file}': {e}\n"));
                had_error = true;
            }
        }

        CommandResult::with_exit_code(String::new(), stderr, if had_error { 1 } else { 0 })
    }
}
