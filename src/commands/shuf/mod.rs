//! `shuf`: Fisher-Yates shuffle over lines of input, an `-i a-b` numeric
//! range, or an `-e` argument list. `-n` caps the number of lines
//! emitted; `-r` allows repeats (sampling with replacement) instead of
//! a plain permutation.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::commands::{Command, CommandContext, CommandResult};

pub struct ShufCommand;

struct Options {
    count: Option<usize>,
    repeat: bool,
    range: Option<(i64, i64)>,
    echo_args: Option<Vec<String>>,
}

fn parse_range(spec: &str) -> Result<(i64, i64), String> {
    let (lo, hi) = spec.split_once('-').ok_or_else(|| format!("shuf: invalid input range: '{spec}'"))?;
    let lo = lo.parse::<i64>().map_err(|_| format!("shuf: invalid input range: '{spec}'"))?;
    let hi = hi.parse::<i64>().map_err(|_| format!("shuf: invalid input range: '{spec}'"))?;
    if lo > hi {
        return Err(format!("shuf: invalid input range: '{spec}'"));
    }
    Ok((lo, hi))
}

fn parse_args(argv: &[String]) -> Result<Options, String> {
    let mut count = None;
    let mut repeat = false;
    let mut range = None;
    let mut echo_args = None;
    let mut i = 0;
    while i < argv.len() {
        let arg = argv[i].as_str();
        match arg {
            "-n" | "--head-count" => {
                let value = argv.get(i + 1).ok_or_else(|| "shuf: option requires an argument -- 'n'".to_string())?;
                count = Some(value.parse::<usize>().map_err(|_| format!("shuf: invalid number: '{value}'"))?);
                i += 2;
            }
            s if s.starts_with("--head-count=") => {
                let value = &s["--head-count=".len()..];
                count = Some(value.parse::<usize>().map_err(|_| format!("shuf: invalid number: '{value}'"))?);
                i += 1;
            }
            s if s.starts_with("-n") && s.len() > 2 => {
                let value = &s[2..];
                count = Some(value.parse::<usize>().map_err(|_| format!("shuf: invalid number: '{value}'"))?);
                i += 1;
            }
            "-r" | "--repeat" => {
                repeat = true;
                i += 1;
            }
            "-i" | "--input-range" => {
                let value = argv.get(i + 1).ok_or_else(|| "shuf: option requires an argument -- 'i'".to_string())?;
                range = Some(parse_range(value)?);
                i += 2;
            }
            s if s.starts_with("--input-range=") => {
                range = Some(parse_range(&s["--input-range=".len()..])?);
                i += 1;
            }
            s if s.starts_with("-i") && s.len() > 2 => {
                range = Some(parse_range(&s[2..])?);
                i += 1;
            }
            "-e" | "--echo" => {
                echo_args = Some(argv[i + 1..].to_vec());
                i = argv.len();
            }
            "--" => {
                i += 1;
            }
            _ => {
                i += 1;
            }
        }
    }
    Ok(Options { count, repeat, range, echo_args })
}

#[async_trait]
impl Command for ShufCommand {
    fn name(&self) -> &'static str {
        "shuf"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let opts = match parse_args(&ctx.args) {
            Ok(o) => o,
            Err(e) => return CommandResult::with_exit_code(String::new(), format!("{e}\n"), 1),
        };

        let mut pool: Vec<String> = if let Some(args) = &opts.echo_args {
            args.clone()
        } else if let Some((lo, hi)) = opts.range {
            (lo..=hi).map(|n| n.to_string()).collect()
        } else {
            ctx.stdin.lines().map(|l| l.to_string()).collect()
        };

        if pool.is_empty() {
            return CommandResult::success(String::new());
        }

        let mut rng = rand::thread_rng();
        let output: Vec<String> = if opts.repeat {
            let n = opts.count.unwrap_or(pool.len());
            (0..n).map(|_| pool[rng.gen_range(0..pool.len())].clone()).collect()
        } else {
            pool.shuffle(&mut rng);
            let n = opts.count.unwrap_or(pool.len()).min(pool.len());
            pool.truncate(n);
            pool
        };

        CommandResult::success(format!("{}\n", output.join("\n")))
    }
}
