//! A minimal `wget`: `-O`/`--output-document`, `-q`/`--quiet`,
//! `--no-verbose`/`-nv`, `-P`/`--directory-prefix`. Always GET; like
//! `curl`, requests go through the injected fetch callback rather than
//! a real socket.

use async_trait::async_trait;

use crate::commands::{Command, CommandContext, CommandResult};

pub struct WgetCommand;

struct Options {
    output: Option<String>,
    directory_prefix: Option<String>,
    quiet: bool,
    url: Option<String>,
}

fn parse_args(argv: &[String]) -> Result<Options, String> {
    let mut opts = Options { output: None, directory_prefix: None, quiet: false, url: None };
    let mut i = 0;
    while i < argv.len() {
        match argv[i].as_str() {
            "-O" | "--output-document" => {
                i += 1;
                opts.output = Some(argv.get(i).ok_or("-O requires a path")?.clone());
            }
            "-P" | "--directory-prefix" => {
                i += 1;
                opts.directory_prefix = Some(argv.get(i).ok_or("-P requires a path")?.clone());
            }
            "-q" | "--quiet" | "-nv" | "--no-verbose" => opts.quiet = true,
            other if !other.starts_with('-') && opts.url.is_none() => opts.url = Some(other.to_string()),
            other => return Err(format!("unrecognized option '{other}'")),
        }
        i += 1;
    }
    Ok(opts)
}

fn default_output_name(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    match without_query.rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "index.html".to_string(),
    }
}

#[async_trait]
impl Command for WgetCommand {
    fn name(&self) -> &'static str {
        "wget"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let opts = match parse_args(&ctx.args) {
            Ok(o) => o,
            Err(e) => return CommandResult::error(format!("wget: {e}\n")),
        };
        let Some(url) = opts.url.clone() else {
            return CommandResult::error("wget: missing URL\n".to_string());
        };
        let Some(fetch_fn) = ctx.fetch_fn.clone() else {
            return CommandResult::error("wget: network access is not available in this context\n".to_string());
        };

        match fetch_fn(url.clone(), "GET".to_string(), Default::default(), None).await {
            Ok(response) => {
                if response.status >= 400 {
                    return CommandResult::with_exit_code(
                        String::new(),
                        format!("wget: server returned error: HTTP/1.1 {} \n", response.status),
                        8,
                    );
                }

                let filename = opts.output.clone().unwrap_or_else(|| default_output_name(&url));
                let full_path = match &opts.directory_prefix {
                    Some(prefix) if !filename.starts_with('/') => format!("{}/{}", prefix.trim_end_matches('/'), filename),
                    _ => filename.clone(),
                };
                let resolved = ctx.fs.resolve_path(&ctx.cwd, &full_path);

                if let Err(e) = ctx.fs.write_file(&resolved, response.body.as_bytes()).await {
                    return CommandResult::error(format!("wget: {full_path}: {e}\n"));
                }

                let stderr = if opts.quiet {
                    String::new()
                } else {
                    format!("saved '{full_path}' [{} bytes]\n", response.body.len())
                };
                CommandResult::with_exit_code(String::new(), stderr, 0)
            }
            Err(e) => CommandResult::with_exit_code(String::new(), format!("wget: unable to resolve host address: {e}\n"), 4),
        }
    }
}
