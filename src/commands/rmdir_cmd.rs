//! `rmdir`: remove empty directories (spec.md's filesystem-mutation
//! group). `-p` walks back up the removed directory's ancestors,
//! removing each one as long as it's also empty; it stops silently at
//! the first non-empty or already-gone ancestor.

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};
use crate::fs::RmOptions;

pub struct RmdirCommand;

const HELP: &str = "Usage: rmdir [OPTION]... DIRECTORY...
Remove empty directories.

Options:
  -p, --parents                  remove DIRECTORY and its ancestors
      --ignore-fail-on-non-empty ignore failures caused by non-empty directories
  -v, --verbose                  output a diagnostic for every directory processed
      --help                     display this help and exit
";

#[derive(Default)]
struct Options {
    parents: bool,
    verbose: bool,
    ignore_non_empty: bool,
}

fn parse_short_run(arg: &str) -> Result<Option<Options>, char> {
    let Some(body) = arg.strip_prefix('-') else { return Ok(None) };
    if body.is_empty() || body.starts_with('-') {
        return Ok(None);
    }
    let mut opts = Options::default();
    for c in body.chars() {
        match c {
            'p' => opts.parents = true,
            'v' => opts.verbose = true,
            other => return Err(other),
        }
    }
    Ok(Some(opts))
}

fn get_parent_path(path: &str) -> String {
    let normalized = path.trim_end_matches('/');
    match normalized.rfind('/') {
        None => ".".to_string(),
        Some(0) => "/".to_string(),
        Some(pos) => normalized[..pos].to_string(),
    }
}

async fn remove_single_dir(ctx: &CommandContext, full_path: &str, display_path: &str, opts: &Options) -> Result<CommandResult, CommandResult> {
    if !ctx.fs.exists(full_path).await {
        return Err(CommandResult::error(format!("rmdir: failed to remove '{display_path}': No such file or directory\n")));
    }

    match ctx.fs.stat(full_path).await {
        Ok(stat) if !stat.is_directory => {
            return Err(CommandResult::error(format!("rmdir: failed to remove '{display_path}': Not a directory\n")));
        }
        Err(e) => return Err(CommandResult::error(format!("rmdir: failed to remove '{display_path}': {e}\n"))),
        Ok(_) => {}
    }

    match ctx.fs.readdir(full_path).await {
        Ok(entries) if !entries.is_empty() => {
            return if opts.ignore_non_empty {
                Ok(CommandResult::success(String::new()))
            } else {
                Err(CommandResult::error(format!("rmdir: failed to remove '{display_path}': Directory not empty\n")))
            };
        }
        Err(e) => return Err(CommandResult::error(format!("rmdir: failed to remove '{display_path}': {e}\n"))),
        Ok(_) => {}
    }

    if let Err(e) = ctx.fs.rm(full_path, &RmOptions { recursive: false, force: false }).await {
        return Err(CommandResult::error(format!("rmdir: failed to remove '{display_path}': {e}\n")));
    }

    Ok(if opts.verbose {
        CommandResult::success(format!("rmdir: removing directory, '{display_path}'\n"))
    } else {
        CommandResult::success(String::new())
    })
}

async fn remove_dir(ctx: &CommandContext, dir: &str, opts: &Options) -> CommandResult {
    let full_path = ctx.fs.resolve_path(&ctx.cwd, dir);
    let mut stdout = String::new();

    match remove_single_dir(ctx, &full_path, dir, opts).await {
        Ok(r) => stdout.push_str(&r.stdout),
        Err(e) => return e,
    }

    if opts.parents {
        let mut current_path = full_path;
        let mut current_dir = dir.to_string();
        loop {
            let parent_path = get_parent_path(&current_path);
            let parent_dir = get_parent_path(&current_dir);
            if parent_path == current_path || parent_path == "/" || parent_dir == "." || parent_dir.is_empty() {
                break;
            }
            match remove_single_dir(ctx, &parent_path, &parent_dir, opts).await {
                Ok(r) => stdout.push_str(&r.stdout),
                Err(_) => break,
            }
            current_path = parent_path;
            current_dir = parent_dir;
        }
    }

    CommandResult::success(stdout)
}

#[async_trait]
impl Command for RmdirCommand {
    fn name(&self) -> &'static str {
        "rmdir"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut opts = Options::default();
        let mut dirs = Vec::new();

        for arg in &ctx.args {
            match arg.as_str() {
                "--help" => return CommandResult::success(format!("{HELP}\n")),
                "--parents" => opts.parents = true,
                "--verbose" => opts.verbose = true,
                "--ignore-fail-on-non-empty" => opts.ignore_non_empty = true,
                s if s.starts_with('-') && s.len() > 1 => match parse_short_run(s) {
                    Ok(Some(parsed)) => {
                        opts.parents |= parsed.parents;
                        opts.verbose |= parsed.verbose;
                    }
                    Ok(None) => {}
                    Err(bad) => return CommandResult::error(format!("rmdir: invalid option -- '{bad}'\n")),
                },
                _ => dirs.push(arg.clone()),
            }
        }

        if dirs.is_empty() {
            return CommandResult::error("rmdir: missing operand\n".to_string());
        }

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;

        for dir in dirs {
            let result = remove_dir(&ctx, &dir, &opts).await;
            stdout.push_str(&result.stdout);
            stderr.push_str(&result.stderr);
            if result.exit_code != 0 {
                exit_code = result.exit_code;
            }
        }

        CommandResult::with_exit_code(stdout, stderr, exit_code)
    }
}
