use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct TimeoutCommand;

const HELP: &str = "timeout - run a command with a time limit

Usage: timeout [OPTION] DURATION COMMAND [ARG]...

DURATION is a number with optional suffix:
  s - seconds (default)
  m - minutes
  h - hours
  d - days

Options:
  --preserve-status  exit with same status as COMMAND, even on timeout
  --help             display this help and exit";

fn is_valid_duration(arg: &str) -> bool {
    parse_duration_secs(arg).is_some()
}

fn parse_duration_secs(arg: &str) -> Option<f64> {
    let (s, mult) = if arg.ends_with('s') {
        (&arg[..arg.len() - 1], 1.0)
    } else if arg.ends_with('m') {
        (&arg[..arg.len() - 1], 60.0)
    } else if arg.ends_with('h') {
        (&arg[..arg.len() - 1], 3600.0)
    } else if arg.ends_with('d') {
        (&arg[..arg.len() - 1], 86400.0)
    } else {
        (arg, 1.0)
    };
    s.parse::<f64>().ok().map(|v| v * mult)
}

#[async_trait]
impl Command for TimeoutCommand {
    fn name(&self) -> &'static str {
        "timeout"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut preserve_status = false;
        let mut kill_after: Option<f64> = None;
        let mut command_start = 0;
        let mut i = 0;

        while i < ctx.args.len() {
            let arg = &ctx.args[i];
            match arg.as_str() {
                "--help" => return CommandResult::success(format!("{}\n", HELP)),
                "--preserve-status" => {
                    preserve_status = true;
                    command_start = i + 1;
                    i += 1;
                }
                "--foreground" => {
                    command_start = i + 1;
                    i += 1;
                }
                "-k" | "--kill-after" => {
                    kill_after = ctx.args.get(i + 1).and_then(|v| parse_duration_secs(v));
                    i += 2;
                    command_start = i;
                }
                "-s" | "--signal" => {
                    i += 2;
                    command_start = i;
                }
                s if s.starts_with("--kill-after=") => {
                    kill_after = parse_duration_secs(&s["--kill-after=".len()..]);
                    command_start = i + 1;
                    i += 1;
                }
                s if s.starts_with("--signal=") => {
                    command_start = i + 1;
                    i += 1;
                }
                s if s.starts_with("-k") && s.len() > 2 => {
                    kill_after = parse_duration_secs(&s[2..]);
                    command_start = i + 1;
                    i += 1;
                }
                s if s.starts_with("-s") && s.len() > 2 => {
                    command_start = i + 1;
                    i += 1;
                }
                "--" => {
                    command_start = i + 1;
                    break;
                }
                _ => {
                    command_start = i;
                    break;
                }
            }
        }

        let remaining: Vec<String> = ctx.args[command_start..].to_vec();
        if remaining.is_empty() {
            return CommandResult::error("timeout: missing operand\n".to_string());
        }

        let Some(duration_secs) = parse_duration_secs(&remaining[0]) else {
            return CommandResult::error(format!(
                "timeout: invalid time interval '{}'\n",
                remaining[0]
            ));
        };

        let command_args: Vec<String> = remaining[1..].to_vec();
        if command_args.is_empty() {
            return CommandResult::error("timeout: missing operand\n".to_string());
        }

        let exec_fn = match &ctx.exec_fn {
            Some(f) => f.clone(),
            None => {
                return CommandResult::error("timeout: exec not available\n".to_string());
            }
        };

        let command_str = command_args.iter()
            .map(|arg| {
                if arg.contains(' ') || arg.contains('\t') {
                    format!("'{}'", arg.replace('\'', "'\\''"))
                } else {
                    arg.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ");

        let exec_future = exec_fn(
            command_str,
            ctx.stdin.clone(),
            ctx.cwd.clone(),
            ctx.env.clone(),
            ctx.fs.clone(),
        );

        let deadline = std::time::Duration::from_secs_f64(duration_secs.max(0.0));
        match tokio::time::timeout(deadline, exec_future).await {
            Ok(result) => result,
            Err(_) => {
                // The in-process command has no separate kill signal to send;
                // dropping the future at the deadline is the only abort we have,
                // so -k's grace period and --preserve-status have no status to
                // recover once the future is gone.
                let _ = (kill_after, preserve_status);
                CommandResult::with_exit_code(String::new(), String::new(), 124)
            }
        }
    }
}
