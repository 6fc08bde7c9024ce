//! A minimal `find`: recursive traversal with `-name` glob matching and
//! `-type f|d`. `-exec`/`-delete`/other predicates are not supported.

use std::collections::VecDeque;

use async_trait::async_trait;
use regex_lite::Regex;

use crate::commands::{Command, CommandContext, CommandResult};

pub struct FindCommand;

fn glob_to_regex(pattern: &str) -> Regex {
    let mut out = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            c if "\\.+()|[]{}^$".contains(c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push('$');
    Regex::new(&out).unwrap_or_else(|_| Regex::new("^$").unwrap())
}

struct Options {
    name: Option<String>,
    type_filter: Option<char>,
}

fn parse_args(argv: &[String]) -> (String, Options) {
    let mut root = ".".to_string();
    let mut opts = Options { name: None, type_filter: None };
    let mut i = 0;
    let mut root_set = false;
    while i < argv.len() {
        match argv[i].as_str() {
            "-name" => {
                i += 1;
                opts.name = argv.get(i).cloned();
            }
            "-type" => {
                i += 1;
                opts.type_filter = argv.get(i).and_then(|s| s.chars().next());
            }
            other if !root_set && !other.starts_with('-') => {
                root = other.to_string();
                root_set = true;
            }
            _ => {}
        }
        i += 1;
    }
    (root, opts)
}

#[async_trait]
impl Command for FindCommand {
    fn name(&self) -> &'static str {
        "find"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let (root_arg, opts) = parse_args(&ctx.args);
        let root = if root_arg.starts_with('/') {
            root_arg
        } else {
            format!("{}/{}", ctx.cwd.trim_end_matches('/'), root_arg)
        };
        let name_re = opts.name.as_deref().map(glob_to_regex);

        let mut out = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(root.clone());

        while let Some(path) = queue.pop_front() {
            let stat = match ctx.fs.stat(&path).await {
                Ok(s) => s,
                Err(e) => return CommandResult::error(format!("find: {path}: {e}\n")),
            };
            let basename = path.rsplit('/').next().unwrap_or(&path);
            let name_ok = name_re.as_ref().map(|re| re.is_match(basename)).unwrap_or(true);
            let type_ok = match opts.type_filter {
                Some('f') => stat.is_file,
                Some('d') => stat.is_directory,
                _ => true,
            };
            if name_ok && type_ok {
                out.push(path.clone());
            }
            if stat.is_directory {
                match ctx.fs.readdir(&path).await {
                    Ok(entries) => {
                        for entry in entries {
                            queue.push_back(format!("{}/{}", path.trim_end_matches('/'), entry));
                        }
                    }
                    Err(e) => return CommandResult::error(format!("find: {path}: {e}\n")),
                }
            }
        }

        out.sort();
        CommandResult::success(out.join("\n") + if out.is_empty() { "" } else { "\n" })
    }
}
