//! `sleep`: pause for the sum of its NUMBER[SUFFIX] operands (spec.md's
//! control-flow group). Runs on `tokio::time::sleep` rather than
//! `std::thread::sleep` so the dispatcher's native-timeout race in
//! `run_native` can actually cancel it by dropping the future.

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct SleepCommand;

const HELP: &str = "Usage: sleep NUMBER[SUFFIX]...

delay for a specified amount of time

SUFFIX may be:
  s - seconds (default)
  m - minutes
  h - hours
  d - days

NUMBER may be a decimal number. Given multiple arguments, sleep for
the sum of their values.
";

fn parse_duration(arg: &str) -> Option<f64> {
    let suffix_pos = arg.find(|c: char| !c.is_ascii_digit() && c != '.');
    let (number_part, suffix) = match suffix_pos {
        Some(pos) => (&arg[..pos], &arg[pos..]),
        None => (arg, "s"),
    };
    if number_part.is_empty() {
        return None;
    }
    let value: f64 = number_part.parse().ok()?;
    let multiplier = match suffix {
        "s" => 1.0,
        "m" => 60.0,
        "h" => 3600.0,
        "d" => 86400.0,
        _ => return None,
    };
    Some(value * multiplier * 1000.0)
}

#[async_trait]
impl Command for SleepCommand {
    fn name(&self) -> &'static str {
        "sleep"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.has_flag(&["--help"]) {
            return CommandResult::success(HELP.to_string());
        }
        if ctx.args.is_empty() {
            return CommandResult::error("sleep: missing operand\n".to_string());
        }

        let mut total_ms: f64 = 0.0;
        for arg in &ctx.args {
            match parse_duration(arg) {
                Some(ms) => total_ms += ms,
                None => return CommandResult::error(format!("sleep: invalid time interval '{arg}'\n")),
            }
        }

        let clamped_ms = total_ms.max(0.0).min(u64::MAX as f64) as u64;
        tokio::time::sleep(std::time::Duration::from_millis(clamped_ms)).await;
        CommandResult::success(String::new())
    }
}
