//! Safety policy and scope gate: the ordered sequence of checks that
//! decides whether a command runs, per spec.md §4.6. Denial precedence is
//! strictly `auth -> admin -> exec -> allowlist -> blocklist -> path-allow
//! -> traversal -> injection`; the first violated rule wins.

use regex_lite::Regex;

use crate::analyzer::is_dangerous;
use crate::ast::Program;
use crate::auth::AuthContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Allow,
    Block(String),
}

pub struct PolicyInput<'a> {
    pub command_text: &'a str,
    pub bare_name: &'a str,
    pub program: &'a Program,
    pub args: &'a [String],
}

/// Run the ordered checks, stopping at the first denial.
pub fn evaluate(ctx: &AuthContext, input: &PolicyInput) -> PolicyDecision {
    if !ctx.authenticated {
        return PolicyDecision::Block("authentication required".to_string());
    }

    let (dangerous, _) = is_dangerous(input.program, input.command_text);

    if dangerous && !ctx.permissions.admin {
        return PolicyDecision::Block("admin scope required for dangerous commands".to_string());
    }

    if !dangerous && !ctx.permissions.exec {
        return PolicyDecision::Block("exec permission denied".to_string());
    }

    if let Some(allowed) = &ctx.permissions.allowed_commands {
        if !allowed.is_empty()
            && !allowed.iter().any(|pat| glob_match(pat, input.command_text) || glob_match(pat, input.bare_name))
        {
            return PolicyDecision::Block("command not in allowlist".to_string());
        }
    }

    if let Some(blocked) = &ctx.permissions.blocked_commands {
        if !blocked.is_empty()
            && blocked.iter().any(|pat| glob_match(pat, input.command_text) || glob_match(pat, input.bare_name))
        {
            return PolicyDecision::Block("command is blocklisted".to_string());
        }
    }

    if let Some(allowed_paths) = &ctx.permissions.allowed_paths {
        if !allowed_paths.is_empty() {
            let candidates = extract_path_candidates(input.args);
            for candidate in &candidates {
                if !allowed_paths.iter().any(|p| glob_match(p, candidate)) {
                    return PolicyDecision::Block(format!("path not in allowlist: {candidate}"));
                }
            }
        }
    }

    for arg in input.args {
        if arg.contains("..") && !path_traversal_is_safe(arg, ctx.permissions.allowed_paths.as_deref()) {
            return PolicyDecision::Block("security: path traversal blocked".to_string());
        }
    }

    for arg in input.args {
        if arg.contains("$(") || arg.contains('`') {
            return PolicyDecision::Block("security: command injection blocked".to_string());
        }
    }

    PolicyDecision::Allow
}

fn path_traversal_is_safe(arg: &str, allowed_paths: Option<&[String]>) -> bool {
    // A `..` segment is only tolerated when the resolved path still falls
    // under an explicitly allowed prefix; absent an allowlist, any `..`
    // is treated as traversal.
    match allowed_paths {
        Some(paths) if !paths.is_empty() => paths.iter().any(|p| arg.starts_with(p.trim_end_matches('*'))),
        _ => false,
    }
}

/// Best-effort extraction of path-like arguments from a command's argv,
/// skipping flags and flag values that are clearly not paths.
fn extract_path_candidates(args: &[String]) -> Vec<String> {
    args.iter()
        .filter(|a| !a.is_empty() && !a.starts_with('-') && (a.contains('/') || a.contains('.')))
        .cloned()
        .collect()
}

/// `*` -> any sequence, `?` -> one character, anchored at both ends;
/// all other regex metacharacters are escaped.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let mut regex_str = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => regex_str.push_str(".*"),
            '?' => regex_str.push('.'),
            c if "\\.+^$()[]{}|".contains(c) => {
                regex_str.push('\\');
                regex_str.push(c);
            }
            c => regex_str.push(c),
        }
    }
    regex_str.push('$');
    Regex::new(&regex_str).map(|r| r.is_match(text)).unwrap_or(false)
}
