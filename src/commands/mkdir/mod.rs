//! `mkdir`: create directories (spec.md's filesystem-mutation group).
//! `-p` delegates recursive parent creation to `FileSystem::mkdir`'s own
//! `MkdirOptions::recursive`, rather than walking the path components here.

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};
use crate::fs::MkdirOptions;

pub struct MkdirCommand;

const HELP: &str = "Usage: mkdir [OPTION]... DIRECTORY...

Create the DIRECTORY(ies), if they do not already exist.

Options:
  -p, --parents    no error if existing, make parent directories as needed
  -m, --mode=MODE  set the access permissions (octal, e.g. 700) instead of the default
  -v, --verbose    print a message for each created directory
      --help       display this help and exit
";

fn describe_error(dir: &str, err: &crate::fs::FsError) -> String {
    let msg = format!("{err:?}");
    if msg.contains("NotFound") {
        format!("mkdir: cannot create directory '{dir}': No such file or directory\n")
    } else if msg.contains("AlreadyExists") {
        format!("mkdir: cannot create directory '{dir}': File exists\n")
    } else {
        format!("mkdir: cannot create directory '{dir}': {err}\n")
    }
}

#[async_trait]
impl Command for MkdirCommand {
    fn name(&self) -> &'static str {
        "mkdir"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.has_flag(&["--help"]) {
            return CommandResult::success(HELP.to_string());
        }

        let mut recursive = false;
        let mut verbose = false;
        let mut mode: Option<u32> = None;
        let mut dirs: Vec<String> = Vec::new();
        let mut iter = ctx.args.iter();

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-p" | "--parents" => recursive = true,
                "-v" | "--verbose" => verbose = true,
                "-m" | "--mode" => {
                    if let Some(value) = iter.next() {
                        mode = u32::from_str_radix(value, 8).ok();
                    }
                }
                s if s.starts_with("--mode=") => mode = u32::from_str_radix(&s["--mode=".len()..], 8).ok(),
                s if !s.starts_with('-') => dirs.push(s.to_string()),
                _ => {}
            }
        }

        if dirs.is_empty() {
            return CommandResult::error("mkdir: missing operand\n".to_string());
        }

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;

        for dir in &dirs {
            let path = ctx.fs.resolve_path(&ctx.cwd, dir);
            match ctx.fs.mkdir(&path, &MkdirOptions { recursive }).await {
                Ok(()) => {
                    if let Some(m) = mode {
                        let _ = ctx.fs.chmod(&path, m).await;
                    }
                    if verbose {
                        stdout.push_str(&format!("mkdir: created directory '{dir}'\n"));
                    }
                }
                Err(e) => {
                    stderr.push_str(&describe_error(dir, &e));
                    exit_code = 1;
                }
            }
        }

        CommandResult::with_exit_code(stdout, stderr, exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, InMemoryFs};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn ctx(args: Vec<&str>) -> CommandContext {
        CommandContext {
            args: args.into_iter().map(String::from).collect(),
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
            exec_fn: None,
            fetch_fn: None,
        }
    }

    #[tokio::test]
    async fn creates_a_single_directory() {
        let result = MkdirCommand.execute(ctx(vec!["/newdir"])).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn parents_flag_creates_intermediate_directories() {
        let result = MkdirCommand.execute(ctx(vec!["-p", "/a/b/c"])).await;
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn verbose_flag_announces_each_created_directory() {
        let result = MkdirCommand.execute(ctx(vec!["-v", "/newdir"])).await;
        assert!(result.stdout.contains("created directory"));
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn missing_operand_is_an_error() {
        let result = MkdirCommand.execute(ctx(vec![])).await;
        assert!(result.stderr.contains("missing operand"));
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn missing_parent_without_p_is_an_error() {
        let result = MkdirCommand.execute(ctx(vec!["/nonexistent/dir"])).await;
        assert!(result.stderr.contains("No such file or directory"));
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn mode_flag_sets_permissions_on_the_new_directory() {
        let c = ctx(vec!["-m", "700", "/secret"]);
        let fs = c.fs.clone();
        let result = MkdirCommand.execute(c).await;
        assert_eq!(result.exit_code, 0);
        let stat = fs.stat("/secret").await.unwrap();
        assert_eq!(stat.mode & 0o777, 0o700);
    }
}
