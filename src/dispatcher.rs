//! The dispatcher: wires the safety policy, tier classifier, circuit
//! breaker, and native command kernel into the single `exec` entry point
//! described by spec.md §4.5.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::ast::{Node, Program};
use crate::audit::{AuditRecord, AuditSink, InMemoryAuditSink};
use crate::auth::AuthContext;
use crate::breaker::{BreakerCallError, CircuitBreaker};
use crate::commands::{Command, CommandContext, CommandRegistry, CommandResult, ExecFn, FetchFn};
use crate::config::DispatcherConfig;
use crate::fs::{FileSystem, InMemoryFs};
use crate::loader::{LoaderBinding, LoaderError};
use crate::parser::parse;
use crate::policy::{self, PolicyDecision, PolicyInput};
use crate::result::BashResult;
use crate::rpc::{RpcBinding, RpcError, RpcRequest, RpcResponse};
use crate::sandbox::{SandboxBinding, SandboxOptions};
use crate::tier::{self, Tier, TierBindings, TierClassification};

/// Ties every consumed capability (filesystem, sandbox, RPC services,
/// loader modules, audit sink) together with the native command kernel.
/// Built with the usual `with_*` consuming-builder pattern.
pub struct Dispatcher {
    config: DispatcherConfig,
    fs: Arc<dyn FileSystem>,
    fs_bound: bool,
    commands: Arc<CommandRegistry>,
    rpc: Vec<Arc<dyn RpcBinding>>,
    loaders: Vec<Arc<dyn LoaderBinding>>,
    sandbox: Option<Arc<dyn SandboxBinding>>,
    audit: Arc<dyn AuditSink>,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            fs: Arc::new(InMemoryFs::new()),
            fs_bound: false,
            commands: Arc::new(register_default_commands()),
            rpc: Vec::new(),
            loaders: Vec::new(),
            sandbox: None,
            audit: Arc::new(InMemoryAuditSink::new()),
            breakers: Mutex::new(HashMap::new()),
        }
    }

    /// Binds a real filesystem capability. Without this, Tier-1 `Fs`
    /// commands (`cat`, `ls`, `rm`, ...) have no tier to run at.
    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self.fs_bound = true;
        self
    }

    pub fn with_sandbox(mut self, sandbox: Arc<dyn SandboxBinding>) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    pub fn with_rpc(mut self, rpc: Arc<dyn RpcBinding>) -> Self {
        self.rpc.push(rpc);
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn LoaderBinding>) -> Self {
        self.loaders.push(loader);
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn audit_sink(&self) -> Arc<dyn AuditSink> {
        self.audit.clone()
    }

    /// Top-level entry point. Parses `command_text`, runs it through the
    /// safety policy, and on `Allow` dispatches the pipeline. Emits
    /// exactly one audit record regardless of outcome.
    pub async fn exec(&self, command_text: &str, ctx: &AuthContext) -> BashResult {
        let program = parse(command_text);
        let bare_name = first_command_name(&program).unwrap_or_default();
        let args = collect_all_args(&program);
        let input = PolicyInput { command_text, bare_name: &bare_name, program: &program, args: &args };

        match policy::evaluate(ctx, &input) {
            PolicyDecision::Block(reason) => {
                tracing::warn!(user = ?ctx.user_id, command = %bare_name, reason = %reason, "policy blocked command");
                self.record_audit(ctx, command_text, true, &reason).await;
                BashResult::blocked(reason)
            }
            PolicyDecision::Allow => {
                let result = self.run_pipeline(command_text, String::new(), ctx).await;
                self.record_audit(ctx, command_text, false, "allowed").await;
                result
            }
        }
    }

    async fn record_audit(&self, ctx: &AuthContext, command: &str, blocked: bool, reason: &str) {
        self.audit
            .record(AuditRecord {
                timestamp_millis: now_millis(),
                user_id: ctx.user_id.clone(),
                command: command.to_string(),
                blocked,
                reason: reason.to_string(),
            })
            .await;
    }

    fn tier_bindings(&self) -> TierBindings {
        let mut rpc_commands = HashSet::new();
        let mut rpc_service_name = None;
        for binding in &self.rpc {
            for c in binding.commands() {
                rpc_commands.insert(c.clone());
            }
            rpc_service_name = Some(binding.name().to_string());
        }
        let mut loader_modules = HashSet::new();
        let mut loader_name = None;
        for binding in &self.loaders {
            for m in binding.modules() {
                loader_modules.insert(m.clone());
            }
            loader_name = Some(binding.name().to_string());
        }
        TierBindings {
            fs_bound: self.fs_bound,
            rpc_commands,
            rpc_service_name,
            loader_modules,
            loader_name,
            sandbox_bound: self.sandbox.is_some(),
        }
    }

    fn breaker_for(&self, name: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().unwrap();
        breakers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(name, self.config.breaker_config())))
            .clone()
    }

    pub(crate) fn fs_is_bound(&self) -> bool {
        self.fs_bound
    }

    pub(crate) async fn read_redirect_source(&self, path: &str) -> Result<String, String> {
        self.fs.read_file(path).await.map_err(|e| format!("bashx: {path}: {e}\n"))
    }

    /// Dispatches one pipeline segment at its classified tier, falling
    /// back to the sandbox on a non-sandbox tier failure (never on a
    /// plain non-zero exit, which is propagated verbatim).
    pub(crate) async fn dispatch_segment(&self, segment_text: &str, stdin: String, ctx: &AuthContext) -> BashResult {
        let program = parse(segment_text);
        let name = first_command_name(&program).unwrap_or_default();
        let args = first_command_args(&program);
        let bindings = self.tier_bindings();

        match tier::classify(&name, &bindings) {
            Ok(classification) => self.run_at_tier(classification, &name, &args, segment_text, stdin, ctx).await,
            Err(_) => match &self.sandbox {
                Some(sandbox) => self.run_sandbox(sandbox.clone(), segment_text).await,
                None => BashResult::failure(format!("bashx: {name}: command not found\n"), 127),
            },
        }
    }

    async fn run_at_tier(
        &self,
        classification: TierClassification,
        name: &str,
        args: &[String],
        segment_text: &str,
        stdin: String,
        ctx: &AuthContext,
    ) -> BashResult {
        match classification.tier {
            Tier::Native => self.run_native(name, args, stdin).await,
            Tier::Rpc => self.run_rpc(&classification.capability, name, segment_text, ctx).await,
            Tier::Loader => self.run_loader(&classification.capability, name, args, segment_text, ctx).await,
            Tier::Sandbox => match &self.sandbox {
                Some(sandbox) => self.run_sandbox(sandbox.clone(), segment_text).await,
                None => BashResult::failure(format!("bashx: {name}: command not found\n"), 127),
            },
        }
    }

    async fn run_native(&self, name: &str, args: &[String], stdin: String) -> BashResult {
        let Some(command) = self.commands.get(name) else {
            return BashResult::failure(format!("bashx: {name}: command not found\n"), 127);
        };
        let command_ctx = CommandContext {
            args: args.to_vec(),
            stdin,
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: self.fs.clone(),
            exec_fn: Some(build_exec_fn(self.commands.clone())),
            fetch_fn: None,
        };
        let deadline = std::time::Duration::from_millis(self.config.native_timeout_ms);
        match tokio::time::timeout(deadline, command.execute(command_ctx)).await {
            Ok(result) => command_result_to_bash_result(result),
            Err(_) => {
                tracing::warn!(command = %name, timeout_ms = self.config.native_timeout_ms, "native command exceeded deadline, cancelling");
                BashResult::cancelled()
            }
        }
    }

    async fn run_rpc(&self, capability: &str, name: &str, segment_text: &str, ctx: &AuthContext) -> BashResult {
        let Some(binding) = self.rpc.iter().find(|r| r.commands().iter().any(|c| c == name)).cloned() else {
            return self.fallback_to_sandbox(segment_text, ctx).await;
        };
        let breaker = self.breaker_for(&format!("rpc:{capability}"));
        let request = RpcRequest { command: segment_text.to_string(), cwd: None, env: None, timeout_ms: None };
        let outcome = breaker
            .guard(|r: &Result<RpcResponse, RpcError>| r.is_err(), binding.call(request))
            .await;
        match outcome {
            Ok(response) => BashResult {
                stdout: response.stdout,
                stderr: response.stderr,
                exit_code: response.exit_code,
                blocked: false,
                block_reason: None,
            },
            Err(BreakerCallError::Open) | Err(BreakerCallError::Timeout) | Err(BreakerCallError::Inner(_)) => {
                self.fallback_to_sandbox(segment_text, ctx).await
            }
        }
    }

    async fn run_loader(
        &self,
        capability: &str,
        name: &str,
        args: &[String],
        segment_text: &str,
        ctx: &AuthContext,
    ) -> BashResult {
        let Some(binding) = self.loaders.iter().find(|l| l.modules().iter().any(|m| m == name)).cloned() else {
            return self.fallback_to_sandbox(segment_text, ctx).await;
        };
        let breaker = self.breaker_for(&format!("loader:{capability}"));
        let module_name = name.to_string();
        let owned_args = args.to_vec();
        let call = async move {
            let module = binding.load(&module_name).await?;
            module.invoke(&owned_args).await
        };
        let outcome = breaker
            .guard(|r: &Result<(String, String, i32), LoaderError>| r.is_err(), call)
            .await;
        match outcome {
            Ok((stdout, stderr, exit_code)) => BashResult { stdout, stderr, exit_code, blocked: false, block_reason: None },
            Err(BreakerCallError::Open) | Err(BreakerCallError::Timeout) | Err(BreakerCallError::Inner(_)) => {
                self.fallback_to_sandbox(segment_text, ctx).await
            }
        }
    }

    async fn fallback_to_sandbox(&self, segment_text: &str, _ctx: &AuthContext) -> BashResult {
        match &self.sandbox {
            Some(sandbox) => {
                tracing::warn!(segment = %segment_text, "tier execution failed, falling back to sandbox");
                self.run_sandbox(sandbox.clone(), segment_text).await
            }
            None => BashResult::failure("bashx: execution failed and no sandbox fallback is bound\n", 1),
        }
    }

    async fn run_sandbox(&self, sandbox: Arc<dyn SandboxBinding>, segment_text: &str) -> BashResult {
        sandbox.execute(segment_text, &SandboxOptions::default()).await
    }
}

fn command_result_to_bash_result(result: CommandResult) -> BashResult {
    BashResult { stdout: result.stdout, stderr: result.stderr, exit_code: result.exit_code, blocked: false, block_reason: None }
}

fn now_millis() -> u128 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or(0)
}

/// Builds the `ExecFn` handed to commands (`xargs`, `find -exec`) that
/// invoke other native commands in-process. Re-entry stays within the
/// native kernel; it does not re-run the safety policy, since the outer
/// command that owns this callback was already cleared to run.
fn build_exec_fn(commands: Arc<CommandRegistry>) -> ExecFn {
    Arc::new(move |command_str, stdin, cwd, env, fs| {
        let commands = commands.clone();
        Box::pin(async move {
            let program = parse(&command_str);
            let name = first_command_name(&program).unwrap_or_default();
            let args = first_command_args(&program);
            let Some(command) = commands.get(&name) else {
                return CommandResult::error(format!("{name}: command not found\n"));
            };
            let ctx = CommandContext {
                args,
                stdin,
                cwd,
                env,
                fs,
                exec_fn: Some(build_exec_fn(commands.clone())),
                fetch_fn: None,
            };
            command.execute(ctx).await
        })
    })
}

/// Walks to the first simple command reachable from the program root and
/// returns its bare name. Stops at the first `List`/`Pipeline` stage since
/// a pipeline segment's classifying name is always its leading command.
fn first_command_name(program: &Program) -> Option<String> {
    program.body.first().and_then(node_command_name)
}

fn node_command_name(node: &Node) -> Option<String> {
    match node {
        Node::List(list) => node_command_name(&list.left),
        Node::Pipeline(pipeline) => pipeline.stages.first().and_then(node_command_name),
        Node::Command(command) => command.name.as_ref().map(|w| w.text.clone()),
        Node::Subshell(subshell) => subshell.body.body.first().and_then(node_command_name),
        Node::Program(_) | Node::Compound(_) | Node::FunctionDef(_) | Node::Error(_) => None,
    }
}

/// Arguments of that same first simple command, for dispatching a single
/// pipeline segment.
fn first_command_args(program: &Program) -> Vec<String> {
    program.body.first().and_then(node_command_args).unwrap_or_default()
}

fn node_command_args(node: &Node) -> Option<Vec<String>> {
    match node {
        Node::List(list) => node_command_args(&list.left),
        Node::Pipeline(pipeline) => pipeline.stages.first().and_then(node_command_args),
        Node::Command(command) => Some(command.args.iter().map(|w| w.text.clone()).collect()),
        Node::Subshell(subshell) => subshell.body.body.first().and_then(node_command_args),
        Node::Program(_) | Node::Compound(_) | Node::FunctionDef(_) | Node::Error(_) => None,
    }
}

/// Every command name and argument anywhere in the program, so the
/// policy's traversal/injection scan sees arguments buried in later
/// pipeline stages or `&&`-chained commands, not just the first one.
fn collect_all_args(program: &Program) -> Vec<String> {
    let mut out = Vec::new();
    for node in &program.body {
        collect_node_args(node, &mut out);
    }
    out
}

fn collect_node_args(node: &Node, out: &mut Vec<String>) {
    match node {
        Node::List(list) => {
            collect_node_args(&list.left, out);
            collect_node_args(&list.right, out);
        }
        Node::Pipeline(pipeline) => {
            for stage in &pipeline.stages {
                collect_node_args(stage, out);
            }
        }
        Node::Command(command) => {
            if let Some(name) = &command.name {
                out.push(name.text.clone());
            }
            out.extend(command.args.iter().map(|w| w.text.clone()));
        }
        Node::Subshell(subshell) => {
            for node in &subshell.body.body {
                collect_node_args(node, out);
            }
        }
        Node::Program(_) | Node::Compound(_) | Node::FunctionDef(_) | Node::Error(_) => {}
    }
}

fn register_default_commands() -> CommandRegistry {
    use crate::commands::awk::AwkCommand;
    use crate::commands::base64_cmd::Base64Command;
    use crate::commands::bc::BcCommand;
    use crate::commands::cat::CatCommand;
    use crate::commands::chmod::ChmodCommand;
    use crate::commands::chown::ChownCommand;
    use crate::commands::cp::CpCommand;
    use crate::commands::curl::CurlCommand;
    use crate::commands::cut::CutCommand;
    use crate::commands::diff_cmd::DiffCommand;
    use crate::commands::echo::EchoCommand;
    use crate::commands::envsubst::EnvsubstCommand;
    use crate::commands::expr_cmd::ExprCommand;
    use crate::commands::find::FindCommand;
    use crate::commands::grep::GrepCommand;
    use crate::commands::head::HeadCommand;
    use crate::commands::jq::JqCommand;
    use crate::commands::ln::LnCommand;
    use crate::commands::ls::LsCommand;
    use crate::commands::md5sum::{
        CksumCommand, Md5sumCommand, OpensslCommand, Sha1sumCommand, Sha256sumCommand, Sha384sumCommand,
        Sha512sumCommand, UuidgenCommand,
    };
    use crate::commands::mkdir::MkdirCommand;
    use crate::commands::mv::MvCommand;
    use crate::commands::patch::PatchCommand;
    use crate::commands::readlink_cmd::ReadlinkCommand;
    use crate::commands::rm::RmCommand;
    use crate::commands::rmdir_cmd::RmdirCommand;
    use crate::commands::sed::SedCommand;
    use crate::commands::seq::SeqCommand;
    use crate::commands::shuf::ShufCommand;
    use crate::commands::sleep_cmd::SleepCommand;
    use crate::commands::sort::SortCommand;
    use crate::commands::stat_cmd::StatCommand;
    use crate::commands::tail::TailCommand;
    use crate::commands::tee::TeeCommand;
    use crate::commands::test_cmd::{BracketCommand, TestCommand};
    use crate::commands::timeout_cmd::TimeoutCommand;
    use crate::commands::touch::TouchCommand;
    use crate::commands::truncate::TruncateCommand;
    use crate::commands::uniq::UniqCommand;
    use crate::commands::wc::WcCommand;
    use crate::commands::wget::WgetCommand;
    use crate::commands::xargs::XargsCommand;
    use crate::commands::yq::YqCommand;

    let mut registry = CommandRegistry::new();
    let commands: Vec<Box<dyn Command>> = vec![
        Box::new(AwkCommand),
        Box::new(Base64Command),
        Box::new(BcCommand),
        Box::new(CatCommand),
        Box::new(ChmodCommand),
        Box::new(ChownCommand),
        Box::new(CpCommand),
        Box::new(CurlCommand),
        Box::new(CutCommand),
        Box::new(DiffCommand),
        Box::new(EchoCommand),
        Box::new(EnvsubstCommand),
        Box::new(ExprCommand),
        Box::new(FindCommand),
        Box::new(GrepCommand),
        Box::new(HeadCommand),
        Box::new(JqCommand),
        Box::new(LnCommand),
        Box::new(LsCommand),
        Box::new(Md5sumCommand),
        Box::new(Sha1sumCommand),
        Box::new(Sha256sumCommand),
        Box::new(Sha384sumCommand),
        Box::new(Sha512sumCommand),
        Box::new(CksumCommand),
        Box::new(UuidgenCommand),
        Box::new(OpensslCommand),
        Box::new(MkdirCommand),
        Box::new(MvCommand),
        Box::new(PatchCommand),
        Box::new(ReadlinkCommand),
        Box::new(RmCommand),
        Box::new(RmdirCommand),
        Box::new(SedCommand),
        Box::new(SeqCommand),
        Box::new(ShufCommand),
        Box::new(SleepCommand),
        Box::new(SortCommand),
        Box::new(StatCommand),
        Box::new(TailCommand),
        Box::new(TeeCommand),
        Box::new(TestCommand),
        Box::new(BracketCommand),
        Box::new(TimeoutCommand),
        Box::new(TouchCommand),
        Box::new(TruncateCommand),
        Box::new(UniqCommand),
        Box::new(WcCommand),
        Box::new(WgetCommand),
        Box::new(XargsCommand),
        Box::new(YqCommand),
    ];
    for command in commands {
        registry.register(command);
    }
    registry
}
