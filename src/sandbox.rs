//! Sandbox binding: consumed, not implemented. Tier 4 hands an unparsed
//! or unsafe command off to whatever full Linux sandbox the host wires in.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::result::BashResult;

#[derive(Debug, Clone, Default)]
pub struct SandboxOptions {
    pub cwd: Option<String>,
    pub env: Option<HashMap<String, String>>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Term,
    Kill,
    Int,
}

/// A running sandboxed process, for interactive `spawn` use.
#[async_trait]
pub trait SpawnHandle: Send + Sync {
    fn pid(&self) -> u32;
    async fn wait(&mut self) -> BashResult;
    async fn kill(&mut self, signal: Signal);
    async fn write(&mut self, data: &[u8]);
    async fn close_stdin(&mut self);
}

/// `execute(command, options) -> BashResult`, with an optional `spawn` for
/// interactive sessions.
#[async_trait]
pub trait SandboxBinding: Send + Sync {
    async fn execute(&self, command: &str, options: &SandboxOptions) -> BashResult;

    async fn spawn(
        &self,
        _command: &str,
        _args: &[String],
        _options: &SandboxOptions,
    ) -> Option<Box<dyn SpawnHandle>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoSandbox;

    #[async_trait]
    impl SandboxBinding for EchoSandbox {
        async fn execute(&self, command: &str, _options: &SandboxOptions) -> BashResult {
            BashResult::success(format!("ran: {command}"))
        }
    }

    #[tokio::test]
    async fn binding_executes_and_returns_result() {
        let sandbox = EchoSandbox;
        let result = sandbox.execute("for i in 1 2 3; do echo $i; done", &SandboxOptions::default()).await;
        assert!(result.is_ok());
        assert!(result.stdout.contains("ran:"));
    }

    #[tokio::test]
    async fn default_spawn_is_unsupported() {
        let sandbox = EchoSandbox;
        assert!(sandbox.spawn("cmd", &[], &SandboxOptions::default()).await.is_none());
    }
}
