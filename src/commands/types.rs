//! The native-tier calling convention: every command the dispatcher's
//! registry resolves to `Tier::Native` (spec.md §4.4) implements `Command`
//! against this `CommandContext`/`CommandResult` pair rather than touching
//! the dispatcher, the filesystem, or a real process directly.
//!
//! `run_native` races a command's `execute` future against
//! `DispatcherConfig::native_timeout_ms` and drops it on expiry (see
//! `dispatcher.rs`); a command has no cancellation token to poll itself,
//! it simply stops running when the outer future is dropped at its next
//! `.await`. `sleep` and `timeout` are the two commands where that matters
//! in practice, since everything else here is CPU-bound and returns well
//! inside the default budget.

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use crate::fs::FileSystem;

/// Re-entry hook for commands that shell back into the native kernel
/// (`xargs`, `find -exec`, `timeout`'s inner command). Parameters:
/// command line, stdin, cwd, env, filesystem handle.
pub type ExecFn = Arc<
    dyn Fn(String, String, String, HashMap<String, String>, Arc<dyn FileSystem>)
            -> Pin<Box<dyn Future<Output = CommandResult> + Send>>
        + Send
        + Sync,
>;

/// What `curl`/`wget` get back from the dispatcher's injected HTTP client.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub url: String,
}

/// Parameters: url, method, headers, optional body.
pub type FetchFn = Arc<
    dyn Fn(String, String, HashMap<String, String>, Option<String>)
            -> Pin<Box<dyn Future<Output = Result<FetchResponse, String>> + Send>>
        + Send
        + Sync,
>;

/// A native command's outcome, before `command_result_to_bash_result`
/// folds it into the dispatcher-wide `BashResult`. There's no `blocked`
/// here: native commands never see policy decisions, only their argv.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success(stdout: String) -> Self {
        Self { stdout, stderr: String::new(), exit_code: 0 }
    }

    pub fn error(stderr: String) -> Self {
        Self { stdout: String::new(), stderr, exit_code: 1 }
    }

    pub fn with_exit_code(stdout: String, stderr: String, exit_code: i32) -> Self {
        Self { stdout, stderr, exit_code }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Everything a native command needs to run without touching the outside
/// world directly: argv (argv\[0\] is the command's own first argument,
/// not its name, since `Command::name` already carries that), stdin, the
/// working directory and environment, the filesystem capability the
/// dispatcher bound (or an in-memory default when none was bound), and the
/// optional exec/fetch callbacks for commands that need to re-enter the
/// kernel or make an HTTP call.
pub struct CommandContext {
    pub args: Vec<String>,
    pub stdin: String,
    pub cwd: String,
    pub env: HashMap<String, String>,
    pub fs: Arc<dyn FileSystem>,
    pub exec_fn: Option<ExecFn>,
    pub fetch_fn: Option<FetchFn>,
}

impl CommandContext {
    /// `true` if any of `names` appears verbatim in argv. Most commands
    /// here scan for `--help`/`-h` the same way; this just names the scan.
    pub fn has_flag(&self, names: &[&str]) -> bool {
        self.args.iter().any(|a| names.contains(&a.as_str()))
    }

    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }
}

/// One native-kernel command. `name` is what the registry keys it under
/// (`CommandRegistry::get`), not necessarily argv\[0\] of the line that
/// reached it — aliases like `test`'s `[` register under a second key
/// pointing at the same `Command` impl.
#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, ctx: CommandContext) -> CommandResult;
}
