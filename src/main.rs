use std::io::Read;
use std::sync::Arc;

use clap::Parser;

use bashx::auth::{AuthContext, Permissions};
use bashx::fs::InMemoryFs;
use bashx::{Dispatcher, DispatcherConfig};

#[derive(Parser)]
#[command(name = "bashx")]
#[command(about = "A safety-gated bash execution dispatcher")]
#[command(version)]
struct Cli {
    /// Execute the command line argument instead of reading a script
    #[arg(short = 'c')]
    command: Option<String>,

    /// Output the result as JSON ({stdout, stderr, exitCode, blocked, blockReason})
    #[arg(long = "json")]
    json: bool,

    /// Grant the `bash:admin` scope (required to run commands the analyzer flags as dangerous)
    #[arg(long = "admin")]
    admin: bool,

    /// Withhold the `bash:exec` scope, leaving only read-only/low-risk commands runnable
    #[arg(long = "no-exec")]
    no_exec: bool,

    /// User id recorded on audit records
    #[arg(long = "user")]
    user: Option<String>,

    /// Script file to execute
    #[arg()]
    script_file: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();

    let command_text = if let Some(c) = cli.command {
        c
    } else if let Some(ref file) = cli.script_file {
        match std::fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("bashx: cannot read script file: {file}: {e}");
                std::process::exit(1);
            }
        }
    } else {
        use std::io::IsTerminal;
        if std::io::stdin().is_terminal() {
            eprintln!("bashx: no command provided. Use -c 'command', pass a script file, or pipe via stdin.");
            std::process::exit(1);
        }
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).unwrap_or_default();
        buf
    };

    if command_text.trim().is_empty() {
        if cli.json {
            println!("{}", serde_json::json!({"stdout": "", "stderr": "", "exitCode": 0, "blocked": false, "blockReason": null}));
        }
        std::process::exit(0);
    }

    let dispatcher = Dispatcher::new(DispatcherConfig::default().from_env()).with_fs(Arc::new(InMemoryFs::new()));

    let ctx = AuthContext {
        authenticated: true,
        user_id: cli.user,
        permissions: Permissions { exec: !cli.no_exec, admin: cli.admin, ..Default::default() },
        scopes: Vec::new(),
        exp: None,
    };

    let result = dispatcher.exec(&command_text, &ctx).await;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "stdout": result.stdout,
                "stderr": result.stderr,
                "exitCode": result.exit_code,
                "blocked": result.blocked,
                "blockReason": result.block_reason,
            })
        );
    } else if result.blocked {
        eprintln!("bashx: blocked: {}", result.block_reason.unwrap_or_default());
    } else {
        if !result.stdout.is_empty() {
            print!("{}", result.stdout);
        }
        if !result.stderr.is_empty() {
            eprint!("{}", result.stderr);
        }
    }

    std::process::exit(if result.blocked { 1 } else { result.exit_code });
}
