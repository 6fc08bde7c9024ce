//! `base64`: RFC 4648 standard alphabet only (spec.md's text-filter group
//! doesn't call for base64url). Encoding wraps at 76 columns like GNU
//! coreutils; `-w 0` disables wrapping entirely.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct Base64Command;

const HELP: &str = "Usage: base64 [OPTION]... [FILE]\n\
base64 encode/decode data and print to standard output.\n\n\
Options:\n\
  -d, --decode          decode data\n\
  -i, --ignore-garbage  when decoding, ignore non-alphabet characters\n\
  -w, --wrap=COLS       wrap encoded lines after COLS characters (default 76, 0 to disable)\n\
      --help            display this help and exit\n";

struct Options {
    decode: bool,
    ignore_garbage: bool,
    wrap_cols: usize,
    files: Vec<String>,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut opts = Options { decode: false, ignore_garbage: false, wrap_cols: 76, files: Vec::new() };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-d" | "--decode" => opts.decode = true,
            "-i" | "--ignore-garbage" => opts.ignore_garbage = true,
            "-w" | "--wrap" => {
                let value = iter.next().ok_or_else(|| "base64: option requires an argument -- 'w'\n".to_string())?;
                opts.wrap_cols = value.parse().map_err(|_| format!("base64: invalid wrap size: '{value}'\n"))?;
            }
            s if s.starts_with("--wrap=") => {
                let value = &s["--wrap=".len()..];
                opts.wrap_cols = value.parse().map_err(|_| format!("base64: invalid wrap size: '{value}'\n"))?;
            }
            other => opts.files.push(other.to_string()),
        }
    }
    Ok(opts)
}

async fn read_input(ctx: &CommandContext, files: &[String]) -> Result<Vec<u8>, CommandResult> {
    if files.is_empty() || (files.len() == 1 && files[0] == "-") {
        return Ok(ctx.stdin.as_bytes().to_vec());
    }
    let mut bytes = Vec::new();
    for file in files {
        if file == "-" {
            bytes.extend_from_slice(ctx.stdin.as_bytes());
            continue;
        }
        let path = ctx.fs.resolve_path(&ctx.cwd, file);
        match ctx.fs.read_file_buffer(&path).await {
            Ok(data) => bytes.extend_from_slice(&data),
            Err(_) => return Err(CommandResult::error(format!("base64: {file}: No such file or directory\n"))),
        }
    }
    Ok(bytes)
}

fn wrap(encoded: String, cols: usize) -> String {
    if cols == 0 || encoded.is_empty() {
        return encoded;
    }
    let chars: Vec<char> = encoded.chars().collect();
    chars.chunks(cols).map(|chunk| chunk.iter().collect::<String>()).collect::<Vec<_>>().join("\n") + "\n"
}

#[async_trait]
impl Command for Base64Command {
    fn name(&self) -> &'static str {
        "base64"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.has_flag(&["--help"]) {
            return CommandResult::success(HELP.to_string());
        }

        let opts = match parse_args(&ctx.args) {
            Ok(o) => o,
            Err(e) => return CommandResult::error(e),
        };

        let data = match read_input(&ctx, &opts.files).await {
            Ok(d) => d,
            Err(e) => return e,
        };

        if opts.decode {
            let text = String::from_utf8_lossy(&data);
            let cleaned: String = if opts.ignore_garbage {
                text.chars().filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')).collect()
            } else {
                text.chars().filter(|c| !c.is_whitespace()).collect()
            };
            match STANDARD.decode(&cleaned) {
                Ok(decoded) => CommandResult::success(String::from_utf8_lossy(&decoded).to_string()),
                Err(_) => CommandResult::error("base64: invalid input\n".to_string()),
            }
        } else {
            CommandResult::success(wrap(STANDARD.encode(&data), opts.wrap_cols))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, InMemoryFs};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn ctx(args: Vec<&str>, stdin: &str, fs: Arc<InMemoryFs>) -> CommandContext {
        CommandContext {
            args: args.into_iter().map(String::from).collect(),
            stdin: stdin.to_string(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs,
            exec_fn: None,
            fetch_fn: None,
        }
    }

    #[tokio::test]
    async fn encodes_a_simple_string() {
        let result = Base64Command.execute(ctx(vec![], "Hello, World!", Arc::new(InMemoryFs::new()))).await;
        assert_eq!(result.stdout, "SGVsbG8sIFdvcmxkIQ==\n");
    }

    #[tokio::test]
    async fn wraps_long_output_at_default_width() {
        let long_input = "A".repeat(60);
        let result = Base64Command.execute(ctx(vec![], &long_input, Arc::new(InMemoryFs::new()))).await;
        let lines: Vec<&str> = result.stdout.trim_end_matches('\n').split('\n').collect();
        assert_eq!(lines[0].len(), 76);
        assert_eq!(lines.len(), 2);
    }

    #[tokio::test]
    async fn wrap_zero_disables_wrapping() {
        let long_input = "A".repeat(60);
        let result = Base64Command.execute(ctx(vec!["-w", "0"], &long_input, Arc::new(InMemoryFs::new()))).await;
        assert!(!result.stdout.contains('\n'));
    }

    #[tokio::test]
    async fn decodes_valid_base64() {
        let result = Base64Command.execute(ctx(vec!["-d"], "SGVsbG8sIFdvcmxkIQ==", Arc::new(InMemoryFs::new()))).await;
        assert_eq!(result.stdout, "Hello, World!");
    }

    #[tokio::test]
    async fn decode_strips_whitespace() {
        let result = Base64Command.execute(ctx(vec!["--decode"], "SGVsbG8s\nIFdvcmxk\nIQ==\n", Arc::new(InMemoryFs::new()))).await;
        assert_eq!(result.stdout, "Hello, World!");
    }

    #[tokio::test]
    async fn ignore_garbage_strips_non_alphabet_chars() {
        let result = Base64Command.execute(ctx(vec!["-d", "-i"], "SGVs!!bG8s#IFdvcmxkIQ==", Arc::new(InMemoryFs::new()))).await;
        assert_eq!(result.stdout, "Hello, World!");
    }

    #[tokio::test]
    async fn decode_without_ignore_garbage_fails_on_junk() {
        let result = Base64Command.execute(ctx(vec!["-d"], "!!!invalid!!!", Arc::new(InMemoryFs::new()))).await;
        assert_eq!(result.exit_code, 1);
    }

    #[tokio::test]
    async fn reads_and_concatenates_multiple_files() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/a.txt", b"hello").await.unwrap();
        fs.write_file("/b.txt", b"world").await.unwrap();
        let result = Base64Command.execute(ctx(vec!["/a.txt", "/b.txt"], "", fs)).await;
        assert_eq!(result.stdout, format!("{}\n", STANDARD.encode(b"helloworld")));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let result = Base64Command.execute(ctx(vec!["/nonexistent.txt"], "", Arc::new(InMemoryFs::new()))).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("No such file or directory"));
    }

    #[tokio::test]
    async fn empty_input_encodes_to_empty_output() {
        let result = Base64Command.execute(ctx(vec![], "", Arc::new(InMemoryFs::new()))).await;
        assert_eq!(result.stdout, "");
    }
}
