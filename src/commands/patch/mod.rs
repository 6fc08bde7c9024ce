//! A minimal `patch`: parses a unified diff, applies each hunk at the
//! recorded offset with context verification, and reports (without
//! failing the whole invocation) hunks that are already applied or
//! already reversed. `-R` reverses, `-pN` strips leading path
//! components, `--dry-run` reports without writing.

use async_trait::async_trait;

use crate::commands::{Command, CommandContext, CommandResult};

#[derive(Debug, Clone)]
enum HunkLine {
    Context(String),
    Remove(String),
    Add(String),
}

#[derive(Debug, Clone)]
struct Hunk {
    old_start: usize,
    lines: Vec<HunkLine>,
}

#[derive(Debug, Clone)]
struct FilePatch {
    old_path: String,
    new_path: String,
    hunks: Vec<Hunk>,
}

fn strip_components(path: &str, strip: usize) -> String {
    let mut parts: Vec<&str> = path.split('/').collect();
    if parts.len() > strip {
        parts.drain(0..strip);
    }
    parts.join("/")
}

fn parse_patch(text: &str) -> Result<Vec<FilePatch>, String> {
    let lines: Vec<&str> = text.lines().collect();
    let mut files = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if !lines[i].starts_with("--- ") {
            i += 1;
            continue;
        }
        let old_path = lines[i][4..].split('\t').next().unwrap_or("").trim().to_string();
        i += 1;
        if i >= lines.len() || !lines[i].starts_with("+++ ") {
            return Err("patch: expected '+++' header after '---'".to_string());
        }
        let new_path = lines[i][4..].split('\t').next().unwrap_or("").trim().to_string();
        i += 1;

        let mut hunks = Vec::new();
        while i < lines.len() && lines[i].starts_with("@@ ") {
            let header = lines[i];
            let old_start = parse_hunk_old_start(header)?;
            i += 1;
            let mut hunk_lines = Vec::new();
            while i < lines.len()
                && (lines[i].starts_with(' ') || lines[i].starts_with('-') || lines[i].starts_with('+'))
            {
                let (tag, rest) = lines[i].split_at(1);
                hunk_lines.push(match tag {
                    " " => HunkLine::Context(rest.to_string()),
                    "-" => HunkLine::Remove(rest.to_string()),
                    "+" => HunkLine::Add(rest.to_string()),
                    _ => unreachable!(),
                });
                i += 1;
            }
            hunks.push(Hunk { old_start, lines: hunk_lines });
        }
        files.push(FilePatch { old_path, new_path, hunks });
    }
    if files.is_empty() {
        return Err("patch: no hunks found".to_string());
    }
    Ok(files)
}

fn parse_hunk_old_start(header: &str) -> Result<usize, String> {
    let inner = header.trim_start_matches("@@ ").split(" @@").next().unwrap_or("");
    let old_part = inner.split(' ').next().ok_or("patch: malformed hunk header")?;
    let old_part = old_part.trim_start_matches('-');
    let start = old_part.split(',').next().unwrap_or("1");
    start.parse::<usize>().map_err(|_| "patch: malformed hunk header".to_string())
}

enum HunkOutcome {
    Applied,
    AlreadyApplied,
    DoesNotApply,
}

/// Applies one hunk's old/new block against `lines`, searching near the
/// recorded offset first and falling back to a full scan.
fn apply_hunk(lines: &mut Vec<String>, hunk: &Hunk, reverse: bool) -> HunkOutcome {
    let mut before = Vec::new();
    let mut after = Vec::new();
    for line in &hunk.lines {
        match line {
            HunkLine::Context(s) => {
                before.push(s.clone());
                after.push(s.clone());
            }
            HunkLine::Remove(s) => {
                if reverse {
                    after.push(s.clone());
                } else {
                    before.push(s.clone());
                }
            }
            HunkLine::Add(s) => {
                if reverse {
                    before.push(s.clone());
                } else {
                    after.push(s.clone());
                }
            }
        }
    }

    let anchor = hunk.old_start.saturating_sub(1);
    let search_order: Vec<usize> = {
        let mut candidates = vec![anchor];
        candidates.extend(0..lines.len());
        candidates
    };

    for start in search_order {
        if start + before.len() <= lines.len() && lines[start..start + before.len()] == before[..] {
            lines.splice(start..start + before.len(), after);
            return HunkOutcome::Applied;
        }
    }
    for start in 0..lines.len() {
        if start + after.len() <= lines.len() && lines[start..start + after.len()] == after[..] {
            return HunkOutcome::AlreadyApplied;
        }
    }
    HunkOutcome::DoesNotApply
}

struct Options {
    reverse: bool,
    strip: usize,
    dry_run: bool,
    target: Option<String>,
}

fn parse_args(argv: &[String]) -> Options {
    let mut opts = Options { reverse: false, strip: 0, dry_run: false, target: None };
    let mut i = 0;
    while i < argv.len() {
        match argv[i].as_str() {
            "-R" | "--reverse" => opts.reverse = true,
            "--dry-run" => opts.dry_run = true,
            s if s.starts_with("-p") && s.len() > 2 => {
                opts.strip = s[2..].parse().unwrap_or(0);
            }
            "-p" => {
                i += 1;
                opts.strip = argv.get(i).and_then(|v| v.parse().ok()).unwrap_or(0);
            }
            other if !other.starts_with('-') => opts.target = Some(other.to_string()),
            _ => {}
        }
        i += 1;
    }
    opts
}

pub struct PatchCommand;

#[async_trait]
impl Command for PatchCommand {
    fn name(&self) -> &'static str {
        "patch"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let opts = parse_args(&ctx.args);
        let file_patches = match parse_patch(&ctx.stdin) {
            Ok(p) => p,
            Err(e) => return CommandResult::with_exit_code(String::new(), format!("{e}\n"), 2),
        };

        let mut stdout = String::new();
        let mut had_failure = false;

        for fp in &file_patches {
            let raw_path = opts.target.clone().unwrap_or_else(|| {
                if opts.reverse { fp.old_path.clone() } else { fp.new_path.clone() }
            });
            let target_path = strip_components(&raw_path, opts.strip);
            let resolved = ctx.fs.resolve_path(&ctx.cwd, &target_path);

            let original = match ctx.fs.read_file(&resolved).await {
                Ok(c) => c,
                Err(e) => {
                    stdout.push_str(&format!("can't find file to patch: {target_path}: {e}\n"));
                    had_failure = true;
                    continue;
                }
            };
            let had_trailing_newline = original.ends_with('\n');
            let mut lines: Vec<String> = original.lines().map(str::to_string).collect();

            let mut file_failed = false;
            for (idx, hunk) in fp.hunks.iter().enumerate() {
                match apply_hunk(&mut lines, hunk, opts.reverse) {
                    HunkOutcome::Applied => {
                        stdout.push_str(&format!("patching file {target_path}\n"));
                    }
                    HunkOutcome::AlreadyApplied => {
                        stdout.push_str(&format!(
                            "Reversed (or previously applied) patch detected! Hunk #{} ignored.\n",
                            idx + 1
                        ));
                    }
                    HunkOutcome::DoesNotApply => {
                        stdout.push_str(&format!("Hunk #{} FAILED at {}.\n", idx + 1, hunk.old_start));
                        file_failed = true;
                        had_failure = true;
                    }
                }
            }

            if !file_failed && !opts.dry_run {
                let mut result = lines.join("\n");
                if had_trailing_newline && !result.is_empty() {
                    result.push('\n');
                }
                if let Err(e) = ctx.fs.write_file(&resolved, result.as_bytes()).await {
                    stdout.push_str(&format!("patch: {target_path}: {e}\n"));
                    had_failure = true;
                }
            }
        }

        CommandResult::with_exit_code(stdout, String::new(), if had_failure { 1 } else { 0 })
    }
}
