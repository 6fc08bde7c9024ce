//! `chown`: accepts `uid`, `uid:gid`, `uid:`, or `:gid` forms. Named
//! users/groups are not resolved against any passwd database; only
//! numeric ids are accepted.

use async_trait::async_trait;

use crate::commands::{Command, CommandContext, CommandResult};

pub struct ChownCommand;

struct Options {
    recursive: bool,
    verbose: bool,
}

struct Owner {
    uid: Option<u32>,
    gid: Option<u32>,
}

fn parse_owner(spec: &str) -> Result<Owner, String> {
    if let Some((uid_part, gid_part)) = spec.split_once(':') {
        let uid = if uid_part.is_empty() {
            None
        } else {
            Some(uid_part.parse::<u32>().map_err(|_| format!("invalid user: '{spec}'"))?)
        };
        let gid = if gid_part.is_empty() {
            None
        } else {
            Some(gid_part.parse::<u32>().map_err(|_| format!("invalid group: '{spec}'"))?)
        };
        Ok(Owner { uid, gid })
    } else {
        let uid = spec.parse::<u32>().map_err(|_| format!("invalid user: '{spec}'"))?;
        Ok(Owner { uid: Some(uid), gid: None })
    }
}

fn parse_args(argv: &[String]) -> Result<(Options, Owner, Vec<String>), String> {
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
    let owner_arg = argv.get(idx).ok_or("missing operand")?;
    let files = argv[idx + 1..].to_vec();
    if files.is_empty() {
        return Err("missing operand".to_string());
    }
    let owner = parse_owner(owner_arg)?;
    Ok((opts, owner, files))
}

#[async_trait]
impl Command for ChownCommand {
    fn name(&self) -> &'static str {
        "chown"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let (opts, owner, files) = match parse_args(&ctx.args) {
            Ok(v) => v,
            Err(e) => return CommandResult::with_exit_code(String::new(), format!("chown: {e}\n"), 1),
        };

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut had_error = false;

        for file in &files {
            let path = ctx.fs.resolve_path(&ctx.cwd, file);
            if let Err(e) = apply_chown(&ctx, &path, &owner).await {
                stderr.push_str(&format!("chown: cannot access '{file}': {e}\n"));
                had_error = true;
                continue;
            }
            if opts.verbose {
                stdout.push_str(&format!("ownership of '{file}' retained as {}:{}\n", owner.uid.unwrap_or(0), owner.gid.unwrap_or(0)));
            }
            if opts.recursive {
                if let Ok(stat) = ctx.fs.stat(&path).await {
                    if stat.is_directory {
                        chown_recursive(&ctx, &path, &owner, opts.verbose, &mut stdout).await;
                    }
                }
            }
        }

        CommandResult::with_exit_code(stdout, stderr, if had_error { 1 } else { 0 })
    }
}

async fn apply_chown(ctx: &CommandContext, path: &str, owner: &Owner) -> Result<(), crate::fs::FsError> {
    let stat = ctx.fs.stat(path).await?;
    let uid = owner.uid.unwrap_or(stat.uid);
    let gid = owner.gid.unwrap_or(stat.gid);
    ctx.fs.chown(path, uid, gid).await
}

async fn chown_recursive(ctx: &CommandContext, dir: &str, owner: &Owner, verbose: bool, out: &mut String) {
    let entries = match ctx.fs.readdir(dir).await {
        Ok(e) => e,
        Err(_) => return,
    };
    for entry in &entries {
        let path = format!("{}/{}", dir.trim_end_matches('/'), entry);
        if apply_chown(ctx, &path, owner).await.is_err() {
            continue;
        }
        if verbose {
            out.push_str(&format!("changed ownership of '{path}'\n"));
        }
        if let Ok(stat) = ctx.fs.stat(&path).await {
            if stat.is_directory {
                Box::pin(chown_recursive(ctx, &path, owner, verbose, out)).await;
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
    async fn sets_uid_and_gid() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/t.txt", b"hi").await.unwrap();
        let result = ChownCommand.execute(ctx(&["501:20", "/t.txt"], fs.clone())).await;
        assert_eq!(result.exit_code, 0);
        let stat = fs.stat("/t.txt").await.unwrap();
        assert_eq!(stat.uid, 501);
        assert_eq!(stat.gid, 20);
    }

    #[tokio::test]
    async fn uid_only_leaves_gid_unchanged() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/t.txt", b"hi").await.unwrap();
        fs.chown("/t.txt", 1, 9).await.unwrap();
        let result = ChownCommand.execute(ctx(&["42", "/t.txt"], fs.clone())).await;
        assert_eq!(result.exit_code, 0);
        let stat = fs.stat("/t.txt").await.unwrap();
        assert_eq!(stat.uid, 42);
        assert_eq!(stat.gid, 9);
    }

    #[tokio::test]
    async fn gid_only_form() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/t.txt", b"hi").await.unwrap();
        let result = ChownCommand.execute(ctx(&[":30", "/t.txt"], fs.clone())).await;
        assert_eq!(result.exit_code, 0);
        let stat = fs.stat("/t.txt").await.unwrap();
        assert_eq!(stat.gid, 30);
    }

    #[tokio::test]
    async fn invalid_owner_errors() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/t.txt", b"hi").await.unwrap();
        let result = ChownCommand.execute(ctx(&["bob", "/t.txt"], fs)).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("invalid user"));
    }

    #[tokio::test]
    async fn missing_file_reports_error() {
        let fs = Arc::new(InMemoryFs::new());
        let result = ChownCommand.execute(ctx(&["1:1", "/nope"], fs)).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("nope"));
    }

    #[tokio::test]
    async fn recursive_applies_to_children() {
        let fs = Arc::new(InMemoryFs::new());
        fs.mkdir("/dir", &crate::fs::MkdirOptions { recursive: false }).await.unwrap();
        fs.write_file("/dir/a.txt", b"a").await.unwrap();
        let result = ChownCommand.execute(ctx(&["-R", "7:7", "/dir"], fs.clone())).await;
        assert_eq!(result.exit_code, 0);
        let stat = fs.stat("/dir/a.txt").await.unwrap();
        assert_eq!(stat.uid, 7);
        assert_eq!(stat.gid, 7);
    }
}
