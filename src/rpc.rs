//! RPC binding: consumed, not implemented. Routes a Tier-2 command to an
//! external service over whatever transport the host provides.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    pub command: String,
    pub cwd: Option<String>,
    pub env: Option<HashMap<String, String>>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

#[derive(Debug)]
pub struct RpcError(pub String);

/// One RPC-backed capability: a named set of commands it owns, reached
/// through a fetcher the host supplies (an HTTP endpoint, an in-process
/// channel, anything that can answer an `RpcRequest`).
#[async_trait]
pub trait RpcBinding: Send + Sync {
    fn name(&self) -> &str;
    fn commands(&self) -> &[String];
    async fn call(&self, request: RpcRequest) -> Result<RpcResponse, RpcError>;
}
