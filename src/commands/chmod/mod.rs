//! `chmod`: octal modes only. Symbolic modes (`u+x`, `a=rw`, ...) are
//! rejected with exit 1 rather than interpreted.

use async_trait::async_trait;

use crate::commands::{Command, CommandContext, CommandResult};

pub struct ChmodCommand;

struct Options {
    recursive: bool,
    verbose: bool,
}

fn parse_args(argv: &[String]) -> Result<(Options, u32, Vec<String>), String> {
    let mut opts = Options { recursive: false, verbose: false };
    let mut idx = 0;
    while idx < argv.len() && argv[idx].starts_with('-') && argv[idx] != "-" {
        match argv[idx].as_str() {
            "-R" | "--recursive" => opts.recursive = true,
            "-v" | "--verbose" => opts.verbose = true,
            "--" => {
                idx += 1;
                break;
            }
            other => return Err(format!("invalid option -- '{}'", other.trim_start_matches('-'))),
        }
        idx += 1;
    }
    let mode_arg = argv.get(idx).ok_or("missing operand")?;
    let files = argv[idx + 1..].to_vec();
    if files.is_empty() {
        return Err("missing operand".to_string());
    }
    if mode_arg.is_empty() || !mode_arg.chars().all(|c| ('0'..='7').contains(&c)) || mode_arg.len() > 4 {
        return Err(format!("invalid mode: '{mode_arg}' (only octal modes are accepted)"));
    }
    let mode = u32::from_str_radix(mode_arg, 8).map_err(|_| format!("invalid mode: '{mode_arg}'"))?;
    Ok((opts, mode, files))
}

#[async_trait]
impl Command for ChmodCommand {
    fn name(&self) -> &'static str {
        "chmod"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let (opts, mode, files) = match parse_args(&ctx.args) {
            Ok(v) => v,
            Err(e) => return CommandResult::with_exit_code(String::new(), format!("chmod: {e}\n"), 1),
        };

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut had_error = false;

        for file in &files {
            let path = ctx.fs.resolve_path(&ctx.cwd, file);
            if let Err(e) = ctx.fs.chmod(&path, mode).await {
                stderr.push_str(&format!("chmod: cannot access '{file}': {e}\n"));
                had_error = true;
                continue;
            }
            if opts.verbose {
                stdout.push_str(&format!("mode of '{file}' changed to {mode:04o}\n"));
            }
            if opts.recursive {
                if let Ok(stat) = ctx.fs.stat(&path).await {
                    if stat.is_directory {
                        chmod_recursive(&ctx, &path, mode, opts.verbose, &mut stdout).await;
                    }
                }
            }
        }

        CommandResult::with_exit_code(stdout, stderr, if had_error { 1 } else { 0 })
    }
}

async fn chmod_recursive(ctx: &CommandContext, dir: &str, mode: u32, verbose: bool, out: &mut String) {
    let entries = match ctx.fs.readdir(dir).await {
        Ok(e) => e,
        Err(_) => return,
    };
    for entry in &entries {
        let path = format!("{}/{}", dir.trim_end_matches('/'), entry);
        if ctx.fs.chmod(&path, mode).await.is_err() {
            continue;
        }
        if verbose {
            out.push_str(&format!("mode of '{path}' changed to {mode:04o}\n"));
        }
        if let Ok(stat) = ctx.fs.stat(&path).await {
            if stat.is_directory {
                Box::pin(chmod_recursive(ctx, &path, mode, verbose, out)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, InMemoryFs};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn ctx(args: &[&str], fs: Arc<InMemoryFs>) -> CommandContext {
        CommandContext {
            args: args.iter().map(|s| s.to_string()).collect(),
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs,
            exec_fn: None,
            fetch_fn: None,
        }
    }

    #[tokio::test]
    async fn octal_mode_applies() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/t.txt", b"hi").await.unwrap();
        let result = ChmodCommand.execute(ctx(&["755", "/t.txt"], fs.clone())).await;
        assert_eq!(result.exit_code, 0);
        assert_eq!(fs.stat("/t.txt").await.unwrap().mode & 0o777, 0o755);
    }

    #[tokio::test]
    async fn symbolic_mode_is_rejected() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/t.txt", b"hi").await.unwrap();
        let result = ChmodCommand.execute(ctx(&["u+x", "/t.txt"], fs)).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("octal"));
    }

    #[tokio::test]
    async fn missing_operand_errors() {
        let fs = Arc::new(InMemoryFs::new());
        let result = ChmodCommand.execute(ctx(&[], fs)).await;
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn missing_file_reports_error() {
        let fs = Arc::new(InMemoryFs::new());
        let result = ChmodCommand.execute(ctx(&["644", "/nope"], fs)).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("nope"));
    }

    #[tokio::test]
    async fn verbose_reports_change() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/t.txt", b"hi").await.unwrap();
        let result = ChmodCommand.execute(ctx(&["-v", "600", "/t.txt"], fs)).await;
        assert!(result.stdout.contains("changed to 0600"));
    }
}
