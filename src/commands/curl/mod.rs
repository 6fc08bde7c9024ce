//! A minimal `curl`: `-X`, `-H`, `-d`/`--data`/`--data-raw`, `-o`, `-s`,
//! `-L`, `-I`/`--head`, `-i`, `-u`. Requests are dispatched through the
//! injected fetch callback; `curl` never opens a socket directly.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashMap;

use crate::commands::{Command, CommandContext, CommandResult};

pub struct CurlCommand;

struct Options {
    method: String,
    headers: HashMap<String, String>,
    body: Option<String>,
    output: Option<String>,
    silent: bool,
    follow_redirects: bool,
    head_only: bool,
    include_headers: bool,
    user: Option<String>,
    url: Option<String>,
}

fn parse_args(argv: &[String]) -> Result<Options, String> {
    let mut opts = Options {
        method: "GET".to_string(),
        headers: HashMap::new(),
        body: None,
        output: None,
        silent: false,
        follow_redirects: false,
        head_only: false,
        include_headers: false,
        user: None,
        url: None,
    };
    let mut i = 0;
    while i < argv.len() {
        match argv[i].as_str() {
            "-X" | "--request" => {
                i += 1;
                opts.method = argv.get(i).ok_or("-X requires a method")?.clone();
            }
            "-H" | "--header" => {
                i += 1;
                let header = argv.get(i).ok_or("-H requires a value")?;
                if let Some((k, v)) = header.split_once(':') {
                    opts.headers.insert(k.trim().to_string(), v.trim().to_string());
                }
            }
            "-d" | "--data" | "--data-raw" => {
                i += 1;
                opts.body = Some(argv.get(i).ok_or("-d requires a value")?.clone());
                if opts.method == "GET" {
                    opts.method = "POST".to_string();
                }
            }
            "-o" | "--output" => {
                i += 1;
                opts.output = Some(argv.get(i).ok_or("-o requires a path")?.clone());
            }
            "-s" | "--silent" => opts.silent = true,
            "-L" | "--location" => opts.follow_redirects = true,
            "-I" | "--head" => {
                opts.head_only = true;
                opts.method = "HEAD".to_string();
            }
            "-i" | "--include" => opts.include_headers = true,
            "-u" | "--user" => {
                i += 1;
                opts.user = Some(argv.get(i).ok_or("-u requires credentials")?.clone());
            }
            other if !other.starts_with('-') && opts.url.is_none() => opts.url = Some(other.to_string()),
            _ => {}
        }
        i += 1;
    }
    Ok(opts)
}

#[async_trait]
impl Command for CurlCommand {
    fn name(&self) -> &'static str {
        "curl"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let opts = match parse_args(&ctx.args) {
            Ok(o) => o,
            Err(e) => return CommandResult::error(format!("curl: {e}\n")),
        };
        let Some(url) = opts.url.clone() else {
            return CommandResult::error("curl: no URL given\n".to_string());
        };
        let Some(fetch_fn) = ctx.fetch_fn.clone() else {
            return CommandResult::error("curl: network access is not available in this context\n".to_string());
        };

        let mut headers = opts.headers.clone();
        if let Some(user) = &opts.user {
            headers.insert("Authorization".to_string(), format!("Basic {}", STANDARD.encode(user.as_bytes())));
        }
        // follow_redirects is advisory: the fetch binding owns actual redirect policy.
        let _ = opts.follow_redirects;

        match fetch_fn(url, opts.method.clone(), headers, opts.body.clone()).await {
            Ok(response) => {
                let mut out = String::new();
                if opts.include_headers || opts.head_only {
                    out.push_str(&format!("HTTP/1.1 {}\n", response.status));
                    for (k, v) in &response.headers {
                        out.push_str(&format!("{k}: {v}\n"));
                    }
                    out.push('\n');
                }
                if !opts.head_only {
                    out.push_str(&response.body);
                }

                if let Some(path) = &opts.output {
                    let full_path = if path.starts_with('/') { path.clone() } else { format!("{}/{}", ctx.cwd.trim_end_matches('/'), path) };
                    if let Err(e) = ctx.fs.write_file(&full_path, response.body.as_bytes()).await {
                        return CommandResult::error(format!("curl: {path}: {e}\n"));
                    }
                    return CommandResult::success(String::new());
                }

                if response.status >= 400 && !opts.silent {
                    return CommandResult::with_exit_code(out, format!("curl: HTTP {}\n", response.status), 22);
                }
                CommandResult::success(out)
            }
            Err(e) => CommandResult::error(format!("curl: {e}\n")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{FetchFn, FetchResponse};
    use crate::fs::InMemoryFs;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;

    fn fetch_returning(status: u16, body: &'static str) -> FetchFn {
        std::sync::Arc::new(move |url: String, _method: String, _headers: HashMap<String, String>, _body: Option<String>| {
            Box::pin(async move {
                Ok(FetchResponse { status, headers: HashMap::new(), body: body.to_string(), url })
            }) as Pin<Box<dyn Future<Output = Result<FetchResponse, String>> + Send>>
        })
    }

    fn ctx(args: &[&str], fetch_fn: Option<FetchFn>) -> CommandContext {
        CommandContext {
            args: args.iter().map(|s| s.to_string()).collect(),
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
            exec_fn: None,
            fetch_fn,
        }
    }

    #[tokio::test]
    async fn get_returns_body() {
        let cmd = CurlCommand;
        let result = cmd.execute(ctx(&["http://example.test"], Some(fetch_returning(200, "hello")))).await;
        assert_eq!(result.stdout, "hello");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn data_flag_switches_to_post() {
        let cmd = CurlCommand;
        let result = cmd.execute(ctx(&["-d", "x=1", "http://example.test"], Some(fetch_returning(200, "ok")))).await;
        assert_eq!(result.stdout, "ok");
    }

    #[tokio::test]
    async fn missing_fetch_fn_errors() {
        let cmd = CurlCommand;
        let result = cmd.execute(ctx(&["http://example.test"], None)).await;
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn http_error_status_is_nonzero_exit() {
        let cmd = CurlCommand;
        let result = cmd.execute(ctx(&["http://example.test"], Some(fetch_returning(500, "boom")))).await;
        assert_eq!(result.exit_code, 22);
    }
}
