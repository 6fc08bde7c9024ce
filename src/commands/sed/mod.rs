//! A minimal `sed`: `-n`, `-E`/`-r`, `-i[suffix]`, `-e expr`, substitution
//! `s/re/repl/[gip]`, line-range print (`N,Mp`, `$p`), and delete
//! (`Nd`, `/re/d`). Multi-expression chains apply left to right per line;
//! a delete short-circuits the remaining expressions for that line. Hold
//! space, `y///`, `a/i/c`, and branch labels are not supported.

use async_trait::async_trait;
use regex_lite::Regex;

use crate::commands::{Command, CommandContext, CommandResult};

pub struct SedCommand;

#[derive(Debug, Clone)]
enum Expr {
    Substitute { pattern: String, replacement: String, global: bool, print: bool, ignore_case: bool },
    PrintRange { start: RangeBound, end: Option<RangeBound> },
    Delete { start: RangeBound, end: Option<RangeBound> },
}

#[derive(Debug, Clone, Copy)]
enum RangeBound {
    Line(usize),
    Last,
}

fn compile_regex(pattern: &str, extended: bool, ignore_case: bool) -> Result<Regex, String> {
    let translated = translate_bre_to_host(pattern, extended);
    let with_flags = if ignore_case { format!("(?i){translated}") } else { translated };
    Regex::new(&with_flags).map_err(|e| e.to_string())
}

/// Translates BRE backreference groups `\(...\)` into the host's `(...)`
/// when not already in extended mode; extended mode passes through as-is.
fn translate_bre_to_host(pattern: &str, extended: bool) -> String {
    if extended {
        return pattern.to_string();
    }
    let mut out = String::new();
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() && (chars[i + 1] == '(' || chars[i + 1] == ')') {
            out.push(chars[i + 1]);
            i += 2;
        } else if chars[i] == '(' || chars[i] == ')' {
            out.push('\\');
            out.push(chars[i]);
            i += 1;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn apply_replacement(caps: &regex_lite::Captures, replacement: &str) -> String {
    let mut out = String::new();
    let chars: Vec<char> = replacement.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() && chars[i + 1].is_ascii_digit() {
            let idx: usize = chars[i + 1].to_digit(10).unwrap() as usize;
            if let Some(m) = caps.get(idx) {
                out.push_str(m.as_str());
            }
            i += 2;
        } else if chars[i] == '&' {
            if let Some(m) = caps.get(0) {
                out.push_str(m.as_str());
            }
            i += 1;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn parse_range_bound(s: &str) -> Option<RangeBound> {
    if s == "$" {
        Some(RangeBound::Last)
    } else {
        s.parse().ok().map(RangeBound::Line)
    }
}

fn parse_expr(script: &str) -> Result<Expr, String> {
    let script = script.trim();
    if let Some(rest) = script.strip_prefix('s') {
        let delim = rest.chars().next().ok_or("empty s/// expression")?;
        let parts: Vec<&str> = rest[delim.len_utf8()..].splitn(3, delim).collect();
        if parts.len() != 3 {
            return Err(format!("malformed substitution: {script}"));
        }
        let flags = parts[2];
        return Ok(Expr::Substitute {
            pattern: parts[0].to_string(),
            replacement: parts[1].to_string(),
            global: flags.contains('g'),
            print: flags.contains('p'),
            ignore_case: flags.contains('i'),
        });
    }
    if let Some(stripped) = script.strip_suffix('d') {
        if let Some((a, b)) = stripped.split_once(',') {
            let start = parse_range_bound(a).ok_or("bad range start")?;
            let end = parse_range_bound(b).ok_or("bad range end")?;
            return Ok(Expr::Delete { start, end: Some(end) });
        }
        let line: usize = stripped.parse().map_err(|_| format!("bad line number: {stripped}"))?;
        return Ok(Expr::Delete { start: RangeBound::Line(line), end: None });
    }
    if let Some(stripped) = script.strip_suffix('p') {
        if let Some((a, b)) = stripped.split_once(',') {
            let start = parse_range_bound(a).ok_or("bad range start")?;
            let end = if b == "$" { RangeBound::Last } else { parse_range_bound(b).ok_or("bad range end")? };
            return Ok(Expr::PrintRange { start, end: Some(end) });
        }
        let start = parse_range_bound(stripped).ok_or_else(|| format!("bad line number: {stripped}"))?;
        return Ok(Expr::PrintRange { start, end: None });
    }
    Err(format!("unsupported sed expression: {script}"))
}

fn matches_delete_regex(line: &str, re_source: &str, extended: bool) -> bool {
    compile_regex(re_source, extended, false).map(|re| re.is_match(line)).unwrap_or(false)
}

fn in_range(line_no: usize, total: usize, start: RangeBound, end: Option<RangeBound>) -> bool {
    let resolve = |b: RangeBound| match b {
        RangeBound::Line(n) => n,
        RangeBound::Last => total,
    };
    let start_n = resolve(start);
    match end {
        None => line_no == start_n,
        Some(e) => line_no >= start_n && line_no <= resolve(e),
    }
}

fn run_sed(text: &str, scripts: &[String], extended: bool, quiet: bool) -> Result<String, String> {
    let mut delete_regex_exprs: Vec<(usize, String)> = Vec::new();
    let mut exprs = Vec::new();
    for s in scripts {
        let trimmed = s.trim();
        if let Some(re) = trimmed.strip_prefix('/').and_then(|rest| {
            let end = rest.rfind("/d")?;
            Some(rest[..end].to_string())
        }) {
            delete_regex_exprs.push((exprs.len(), re));
            exprs.push(Expr::Delete { start: RangeBound::Line(0), end: None });
            continue;
        }
        exprs.push(parse_expr(trimmed)?);
    }

    let had_trailing_newline = text.ends_with('\n');
    let lines: Vec<&str> = if text.is_empty() { vec![] } else { text.trim_end_matches('\n').split('\n').collect() };
    let total = lines.len();
    let mut out_lines: Vec<String> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let line_no = i + 1;
        let mut current = line.to_string();
        let mut deleted = false;
        let mut extra_prints: Vec<String> = Vec::new();

        for (idx, expr) in exprs.iter().enumerate() {
            if let Some((_, re)) = delete_regex_exprs.iter().find(|(e_idx, _)| *e_idx == idx) {
                if matches_delete_regex(&current, re, extended) {
                    deleted = true;
                    break;
                }
                continue;
            }
            match expr {
                Expr::Substitute { pattern, replacement, global, print, ignore_case } => {
                    let re = compile_regex(pattern, extended, *ignore_case).map_err(|e| format!("sed: {e}"))?;
                    let new_value = if *global {
                        re.replace_all(&current, |caps: &regex_lite::Captures| apply_replacement(caps, replacement)).to_string()
                    } else {
                        re.replace(&current, |caps: &regex_lite::Captures| apply_replacement(caps, replacement)).to_string()
                    };
                    current = new_value;
                    if *print {
                        extra_prints.push(current.clone());
                    }
                }
                Expr::PrintRange { start, end } => {
                    if in_range(line_no, total, *start, *end) {
                        extra_prints.push(current.clone());
                    }
                }
                Expr::Delete { start, end } => {
                    if in_range(line_no, total, *start, *end) {
                        deleted = true;
                        break;
                    }
                }
            }
        }

        if deleted {
            continue;
        }
        if quiet {
            out_lines.extend(extra_prints);
        } else {
            out_lines.extend(extra_prints);
            out_lines.push(current);
        }
    }

    let mut result = out_lines.join("\n");
    if had_trailing_newline && !result.is_empty() {
        result.push('\n');
    }
    Ok(result)
}

#[async_trait]
impl Command for SedCommand {
    fn name(&self) -> &'static str {
        "sed"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut quiet = false;
        let mut extended = false;
        let mut in_place: Option<String> = None;
        let mut scripts = Vec::new();
        let mut files = Vec::new();
        let mut i = 0;
        while i < ctx.args.len() {
            let arg = &ctx.args[i];
            match arg.as_str() {
                "-n" => quiet = true,
                "-E" | "-r" => extended = true,
                "-e" => {
                    i += 1;
                    if let Some(s) = ctx.args.get(i) {
                        scripts.push(s.clone());
                    }
                }
                _ if arg.starts_with("-i") => {
                    in_place = Some(arg[2..].to_string());
                }
                _ if arg.starts_with('-') && arg.len() > 1 => {
                    return CommandResult::error(format!("sed: unknown option {arg}\n"));
                }
                _ if scripts.is_empty() => scripts.push(arg.clone()),
                _ => files.push(arg.clone()),
            }
            i += 1;
        }

        if scripts.is_empty() {
            return CommandResult::error("sed: no script given\n".to_string());
        }

        if files.is_empty() {
            return match run_sed(&ctx.stdin, &scripts, extended, quiet) {
                Ok(out) => CommandResult::success(out),
                Err(e) => CommandResult::error(format!("sed: {e}\n")),
            };
        }

        let mut combined_out = String::new();
        for file in &files {
            let path = if file.starts_with('/') { file.clone() } else { format!("{}/{}", ctx.cwd.trim_end_matches('/'), file) };
            let content = match ctx.fs.read_file(&path).await {
                Ok(c) => c,
                Err(e) => return CommandResult::error(format!("sed: {file}: {e}\n")),
            };
            let processed = match run_sed(&content, &scripts, extended, quiet) {
                Ok(out) => out,
                Err(e) => return CommandResult::error(format!("sed: {e}\n")),
            };
            if let Some(suffix) = &in_place {
                if !suffix.is_empty() {
                    let backup_path = format!("{path}{suffix}");
                    if let Err(e) = ctx.fs.write_file(&backup_path, content.as_bytes()).await {
                        return CommandResult::error(format!("sed: {backup_path}: {e}\n"));
                    }
                }
                if let Err(e) = ctx.fs.write_file(&path, processed.as_bytes()).await {
                    return CommandResult::error(format!("sed: {path}: {e}\n"));
                }
            } else {
                combined_out.push_str(&processed);
            }
        }
        CommandResult::success(combined_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn ctx(args: &[&str], stdin: &str) -> CommandContext {
        CommandContext {
            args: args.iter().map(|s| s.to_string()).collect(),
            stdin: stdin.to_string(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
            exec_fn: None,
            fetch_fn: None,
        }
    }

    #[tokio::test]
    async fn global_substitution() {
        let cmd = SedCommand;
        let result = cmd.execute(ctx(&["s/a/b/g"], "banana\n")).await;
        assert_eq!(result.stdout, "bbnbnb\n");
    }

    #[tokio::test]
    async fn quiet_mode_only_prints_p_flag() {
        let cmd = SedCommand;
        let result = cmd.execute(ctx(&["-n", "s/foo/bar/p"], "foo\nbaz\n")).await;
        assert_eq!(result.stdout, "bar\n");
    }

    #[tokio::test]
    async fn line_range_delete() {
        let cmd = SedCommand;
        let result = cmd.execute(ctx(&["2,3d"], "a\nb\nc\nd\n")).await;
        assert_eq!(result.stdout, "a\nd\n");
    }

    #[tokio::test]
    async fn preserves_missing_trailing_newline() {
        let cmd = SedCommand;
        let result = cmd.execute(ctx(&["s/x/y/"], "x")).await;
        assert_eq!(result.stdout, "y");
    }

    #[tokio::test]
    async fn backreferences_translate_from_bre() {
        let cmd = SedCommand;
        let result = cmd.execute(ctx(&[r"s/\(a\)\(b\)/\2\1/"], "ab\n")).await;
        assert_eq!(result.stdout, "ba\n");
    }
}
