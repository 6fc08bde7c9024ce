//! `ln`: hard and symbolic links (spec.md's filesystem-mutation group).
//! Hard links require both ends to already be real paths in `fs`; a
//! symlink's target string is stored verbatim and resolved lazily by
//! whoever follows it (`readlink_cmd.rs`, `cat`'s path resolution, etc).

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};
use crate::fs::types::RmOptions;

pub struct LnCommand;

const HELP: &str = "Usage: ln [OPTIONS] TARGET LINK_NAME

Make links between files.

Options:
  -s, --symbolic    create a symbolic link instead of a hard link
  -f, --force       remove existing destination files
  -b, --backup      back up an existing destination before removing it
  -n, --no-dereference  treat LINK_NAME as a normal file if it is a symlink to a directory
  -v, --verbose     print name of each linked file
      --help        display this help and exit
";

#[derive(Default)]
struct Options {
    symbolic: bool,
    force: bool,
    backup: bool,
    verbose: bool,
}

fn parse_flags(arg: &str) -> Result<Options, char> {
    let mut opts = Options::default();
    for c in arg[1..].chars() {
        match c {
            's' => opts.symbolic = true,
            'f' => opts.force = true,
            'b' => opts.backup = true,
            'v' => opts.verbose = true,
            'n' => {}
            other => return Err(other),
        }
    }
    Ok(opts)
}

#[async_trait]
impl Command for LnCommand {
    fn name(&self) -> &'static str {
        "ln"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.has_flag(&["--help"]) {
            return CommandResult::success(HELP.to_string());
        }

        let args = &ctx.args;
        let mut opts = Options::default();
        let mut idx = 0;

        while idx < args.len() {
            match args[idx].as_str() {
                "--" => {
                    idx += 1;
                    break;
                }
                "--symbolic" => opts.symbolic = true,
                "--force" => opts.force = true,
                "--backup" => opts.backup = true,
                "--verbose" => opts.verbose = true,
                "--no-dereference" => {}
                arg if arg.starts_with('-') && arg.len() > 1 => match parse_flags(arg) {
                    Ok(parsed) => {
                        opts.symbolic |= parsed.symbolic;
                        opts.force |= parsed.force;
                        opts.backup |= parsed.backup;
                        opts.verbose |= parsed.verbose;
                    }
                    Err(bad) => {
                        return CommandResult::error(format!("ln: invalid option -- '{bad}'\n"));
                    }
                },
                _ => break,
            }
            idx += 1;
        }

        let remaining = &args[idx..];
        if remaining.len() < 2 {
            return CommandResult::error("ln: missing file operand\n".to_string());
        }

        let target = &remaining[0];
        let link_name = &remaining[1];
        let link_path = ctx.fs.resolve_path(&ctx.cwd, link_name);

        if ctx.fs.exists(&link_path).await {
            if opts.backup {
                let backup_path = format!("{link_path}~");
                if let Err(e) = ctx.fs.mv(&link_path, &backup_path).await {
                    return CommandResult::error(format!("ln: cannot backup '{link_name}': {e}\n"));
                }
            } else if opts.force {
                if ctx.fs.rm(&link_path, &RmOptions { force: true, recursive: false }).await.is_err() {
                    return CommandResult::error(format!("ln: cannot remove '{link_name}': Permission denied\n"));
                }
            } else {
                let link_type = if opts.symbolic { "symbolic " } else { "" };
                return CommandResult::error(format!("ln: failed to create {link_type}link '{link_name}': File exists\n"));
            }
        }

        if opts.symbolic {
            if let Err(e) = ctx.fs.symlink(target, &link_path).await {
                return CommandResult::error(format!("ln: {e}\n"));
            }
        } else {
            let target_path = ctx.fs.resolve_path(&ctx.cwd, target);
            if !ctx.fs.exists(&target_path).await {
                return CommandResult::error(format!("ln: failed to access '{target}': No such file or directory\n"));
            }
            if let Err(e) = ctx.fs.link(&target_path, &link_path).await {
                let msg = e.to_string();
                if msg.contains("EPERM") {
                    return CommandResult::error(format!("ln: '{target}': hard link not allowed for directory\n"));
                }
                return CommandResult::error(format!("ln: {msg}\n"));
            }
        }

        let stdout = if opts.verbose { format!("'{link_name}' -> '{target}'\n") } else { String::new() };
        CommandResult::with_exit_code(stdout, String::new(), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, InMemoryFs};
    use std::collections::HashMap;
    use std::sync::Arc;

    async fn ctx_with_files(args: Vec<&str>, files: Vec<(&str, &str)>) -> CommandContext {
        let fs = Arc::new(InMemoryFs::new());
        for (path, content) in files {
            fs.write_file(path, content.as_bytes()).await.unwrap();
        }
        CommandContext {
            args: args.into_iter().map(String::from).collect(),
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs,
            exec_fn: None,
            fetch_fn: None,
        }
    }

    #[tokio::test]
    async fn symbolic_link_creation_succeeds() {
        let ctx = ctx_with_files(vec!["-s", "/target.txt", "/link.txt"], vec![("/target.txt", "hello world\n")]).await;
        let result = LnCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn existing_destination_without_force_is_an_error() {
        let ctx = ctx_with_files(vec!["-s", "/target.txt", "/link.txt"], vec![("/target.txt", "hello\n"), ("/link.txt", "existing\n")]).await;
        let result = LnCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("File exists"));
    }

    #[tokio::test]
    async fn missing_operands_is_an_error() {
        let result = LnCommand.execute(ctx_with_files(vec![], vec![]).await).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("missing file operand"));
    }

    #[tokio::test]
    async fn help_mentions_symbolic_and_force() {
        let result = LnCommand.execute(ctx_with_files(vec!["--help"], vec![]).await).await;
        assert!(result.stdout.contains("symbolic"));
        assert!(result.stdout.contains("force"));
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn hard_link_to_an_existing_file_succeeds() {
        let ctx = ctx_with_files(vec!["/original.txt", "/hardlink.txt"], vec![("/original.txt", "hello world\n")]).await;
        let result = LnCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn hard_link_to_a_missing_target_is_an_error() {
        let ctx = ctx_with_files(vec!["/nonexistent.txt", "/link.txt"], vec![]).await;
        let result = LnCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("No such file"));
    }

    #[tokio::test]
    async fn force_overwrites_an_existing_destination() {
        let ctx = ctx_with_files(vec!["-sf", "/target.txt", "/link.txt"], vec![("/target.txt", "new\n"), ("/link.txt", "old\n")]).await;
        let result = LnCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn backup_renames_the_existing_destination_with_a_tilde() {
        let ctx = ctx_with_files(vec!["-sb", "/target.txt", "/link.txt"], vec![("/target.txt", "new\n"), ("/link.txt", "old\n")]).await;
        let fs = ctx.fs.clone();
        let result = LnCommand.execute(ctx).await;
        assert_eq!(result.exit_code, 0);
        assert_eq!(fs.read_file("/link.txt~").await.unwrap(), "old\n");
    }

    #[tokio::test]
    async fn unknown_short_flag_is_rejected() {
        let result = LnCommand.execute(ctx_with_files(vec!["-z", "/a", "/b"], vec![]).await).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("invalid option"));
    }
}
