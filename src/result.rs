//! The shape every `exec`/`run` call returns.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BashResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// `true` when the safety/scope gate refused execution outright.
    /// Blocked commands always carry `exit_code = 0`: the refusal is
    /// surfaced through `blocked`, not as a process failure.
    pub blocked: bool,
    pub block_reason: Option<String>,
}

impl BashResult {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self { stdout: stdout.into(), stderr: String::new(), exit_code: 0, blocked: false, block_reason: None }
    }

    pub fn failure(stderr: impl Into<String>, exit_code: i32) -> Self {
        Self { stdout: String::new(), stderr: stderr.into(), exit_code, blocked: false, block_reason: None }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 0,
            blocked: true,
            block_reason: Some(reason.into()),
        }
    }

    /// A native command that ran past its wall-clock deadline. Exit code
    /// 130 is the conventional `128 + SIGINT` used for cancellation,
    /// matching what an interactive shell reports for Ctrl-C.
    pub fn cancelled() -> Self {
        Self { stdout: String::new(), stderr: String::new(), exit_code: 130, blocked: false, block_reason: None }
    }

    pub fn is_ok(&self) -> bool {
        !self.blocked && self.exit_code == 0
    }
}
