//! Evaluation context threaded through the jq evaluator: `--arg`/`--argjson`
//! bindings and the process environment exposed via `env`/`$ENV`.

use std::collections::HashMap;
use super::value::Value;

#[derive(Clone, Default)]
pub struct EvalContext {
    pub vars: HashMap<String, Value>,
    pub env: HashMap<String, String>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(env: HashMap<String, String>) -> Self {
        Self { vars: HashMap::new(), env }
    }

    pub fn with_var(&self, name: &str, value: Value) -> Self {
        let mut ctx = self.clone();
        ctx.vars.insert(name.to_string(), value);
        ctx
    }
}

#[derive(Debug)]
pub enum JqError {
    Type(String),
    Runtime(String),
    Parse(String),
}

impl std::fmt::Display for JqError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JqError::Type(msg) => write!(f, "{msg}"),
            JqError::Runtime(msg) => write!(f, "{msg}"),
            JqError::Parse(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for JqError {}
