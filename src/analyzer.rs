//! Intent and safety classification over a parsed [`Program`].
//!
//! Walks the AST collecting the read/write/delete/network/elevated facts
//! spec.md §4.2 calls for, then applies the ordered classification rules to
//! produce an [`Intent`] and [`Classification`]. Both are pure functions of
//! the AST: calling `analyze` twice on an equal AST yields equal output.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex_lite::Regex;

use crate::ast::{CommandNode, Node, Program, RedirectOp};

const PATH_LIKE_READERS: &[&str] = &[
    "cat", "head", "tail", "less", "more", "grep", "awk", "sed", "diff", "jq", "yq", "wc", "sort",
    "uniq", "cut",
];
const WRITE_DEST_COMMANDS: &[&str] = &["cp", "mv", "tee", "touch", "mkdir"];
const DELETE_COMMANDS: &[&str] = &["rm", "rmdir", "unlink", "trash"];
const NETWORK_COMMANDS: &[&str] =
    &["curl", "wget", "nc", "ssh", "scp", "rsync", "ping", "dig", "nslookup", "host"];
const ELEVATED_COMMANDS: &[&str] = &["sudo", "su", "doas"];
const ELEVATED_PATH_PREFIXES: &[&str] = &["/etc", "/usr", "/var", "/boot"];

lazy_static! {
    static ref DANGER_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"rm\s+-[a-zA-Z]*r").unwrap(),
        Regex::new(r"\bsudo\b").unwrap(),
        Regex::new(r"\bchmod\b").unwrap(),
        Regex::new(r"\bchown\b").unwrap(),
        Regex::new(r"\bmkfs\b").unwrap(),
        Regex::new(r"\bdd\b").unwrap(),
        Regex::new(r"\bkill\b").unwrap(),
        Regex::new(r"\bfdisk\b").unwrap(),
        Regex::new(r"\bmount\b").unwrap(),
        Regex::new(r"\bsystemctl\b").unwrap(),
        Regex::new(r"\biptables\b").unwrap(),
        Regex::new(r"\buseradd\b").unwrap(),
        Regex::new(r"\bpasswd\b").unwrap(),
    ];
    static ref SYSTEM_DESTRUCTIVE: Regex =
        Regex::new(r"\bmkfs\b|dd\s+[^\n]*of=/dev/|\bfdisk\b|\bshutdown\b|\breboot\b|\binit\b").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Impact {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Impact {
    fn escalate(self) -> Self {
        match self {
            Impact::None => Impact::Low,
            Impact::Low => Impact::Medium,
            Impact::Medium => Impact::High,
            Impact::High | Impact::Critical => Impact::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Delete,
    System,
    Mixed,
    Write,
    Network,
    Read,
    Execute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub r#type: CommandType,
    pub impact: Impact,
    pub reversible: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Intent {
    pub reads: Vec<String>,
    pub writes: Vec<String>,
    pub deletes: Vec<String>,
    pub network: bool,
    pub elevated: bool,
    pub commands: HashSet<String>,
}

#[derive(Debug, Clone)]
pub struct AnalysisError {
    pub message: String,
}

/// `analyze(ast) -> {intent, classification}`.
pub fn analyze(program: &Program) -> (Intent, Classification) {
    let mut intent = Intent::default();
    collect(&program.body, &mut intent);
    let classification = classify(&intent);
    (intent, classification)
}

/// When the AST has an unexpected shape, surface the most conservative
/// classification rather than panic.
pub fn analyze_checked(program: &Program) -> Result<(Intent, Classification), AnalysisError> {
    if !program.is_parseable() && program.body.is_empty() {
        return Err(AnalysisError { message: "AST carries no body to analyze".into() });
    }
    Ok(analyze(program))
}

pub fn conservative_classification() -> Classification {
    Classification { r#type: CommandType::System, impact: Impact::High, reversible: false }
}

fn collect(nodes: &[Node], intent: &mut Intent) {
    for node in nodes {
        collect_node(node, intent);
    }
}

fn collect_node(node: &Node, intent: &mut Intent) {
    match node {
        Node::Program(p) => collect(&p.body, intent),
        Node::List(l) => {
            collect_node(&l.left, intent);
            collect_node(&l.right, intent);
        }
        Node::Pipeline(p) => {
            for stage in &p.stages {
                collect_node(stage, intent);
            }
        }
        Node::Subshell(s) => collect(&s.body.body, intent),
        Node::Command(c) => collect_command(c, intent),
        Node::Compound(_) | Node::FunctionDef(_) | Node::Error(_) => {}
    }
}

fn collect_command(cmd: &CommandNode, intent: &mut Intent) {
    let Some(name_word) = &cmd.name else { return };
    let name = base_name(&name_word.text);
    intent.commands.insert(name.clone());

    if ELEVATED_COMMANDS.contains(&name.as_str()) {
        intent.elevated = true;
    }
    if NETWORK_COMMANDS.contains(&name.as_str()) {
        intent.network = true;
    }

    let args: Vec<&str> = cmd.args.iter().map(|w| w.text.as_str()).collect();

    if DELETE_COMMANDS.contains(&name.as_str()) {
        intent.deletes.extend(args.iter().filter(|a| !a.starts_with('-')).map(|s| s.to_string()));
    }
    if name == "find" {
        if let Some(pos) = args.iter().position(|a| *a == "-delete") {
            if let Some(path) = args.first() {
                if pos > 0 {
                    intent.deletes.push(path.to_string());
                }
            }
        }
    }

    if PATH_LIKE_READERS.contains(&name.as_str()) {
        intent.reads.extend(
            args.iter()
                .filter(|a| !a.starts_with('-') && looks_like_path(a))
                .map(|s| s.to_string()),
        );
    }

    if WRITE_DEST_COMMANDS.contains(&name.as_str()) {
        if let Some(dest) = args.iter().rev().find(|a| !a.starts_with('-')) {
            intent.writes.push(dest.to_string());
        }
    }

    for candidate in args.iter().chain(std::iter::once(&name_word.text.as_str())) {
        if ELEVATED_PATH_PREFIXES.iter().any(|p| candidate.starts_with(p)) {
            intent.elevated = true;
        }
    }

    for redirect in &cmd.redirects {
        match redirect.op {
            RedirectOp::In => intent.reads.push(redirect.target.text.clone()),
            RedirectOp::Out | RedirectOp::Append | RedirectOp::OutErr | RedirectOp::OutErrAppend => {
                intent.writes.push(redirect.target.text.clone());
                if ELEVATED_PATH_PREFIXES.iter().any(|p| redirect.target.text.starts_with(p)) {
                    intent.elevated = true;
                }
            }
            _ => {}
        }
    }
}

fn base_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

fn looks_like_path(arg: &str) -> bool {
    !arg.is_empty() && !arg.starts_with('$')
}

fn classify(intent: &Intent) -> Classification {
    let rm_recursive = intent.commands.contains("rm")
        && intent
            .deletes
            .iter()
            .any(|d| d == "/" || d.starts_with("/home") || d == "~" || d.starts_with("$HOME"));

    if rm_recursive {
        return Classification { r#type: CommandType::Delete, impact: Impact::Critical, reversible: false };
    }
    if !intent.deletes.is_empty() {
        return Classification { r#type: CommandType::Delete, impact: Impact::High, reversible: false };
    }

    let mut classification = if system_destructive(intent) {
        Classification { r#type: CommandType::System, impact: Impact::Critical, reversible: false }
    } else if !intent.writes.is_empty() && !intent.reads.is_empty() {
        Classification { r#type: CommandType::Mixed, impact: Impact::Medium, reversible: false }
    } else if !intent.writes.is_empty() {
        Classification { r#type: CommandType::Write, impact: Impact::Medium, reversible: false }
    } else if intent.network {
        Classification { r#type: CommandType::Network, impact: Impact::Low, reversible: true }
    } else if !intent.reads.is_empty() {
        Classification { r#type: CommandType::Read, impact: Impact::None, reversible: true }
    } else {
        Classification { r#type: CommandType::Execute, impact: Impact::Low, reversible: true }
    };

    if intent.elevated {
        classification.impact = classification.impact.escalate();
    }

    classification
}

fn system_destructive(intent: &Intent) -> bool {
    const SYSTEM_COMMANDS: &[&str] = &["mkfs", "fdisk", "shutdown", "reboot", "init"];
    intent.commands.iter().any(|c| SYSTEM_COMMANDS.contains(&c.as_str()))
        || (intent.commands.contains("dd") && intent.writes.iter().any(|w| w.starts_with("/dev/")))
}

/// `is_dangerous(ast) -> {dangerous, reason?}`.
pub fn is_dangerous(program: &Program, source: &str) -> (bool, Option<String>) {
    let (_, classification) = analyze(program);
    if classification.impact >= Impact::High {
        return (true, Some(format!("classified impact {:?}", classification.impact)));
    }
    for pattern in DANGER_PATTERNS.iter() {
        if pattern.is_match(source) {
            return (true, Some(format!("matches danger pattern /{}/", pattern.as_str())));
        }
    }
    (false, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn rm_rf_root_is_critical_delete() {
        let p = parse("rm -rf /");
        let (_, c) = analyze(&p);
        assert_eq!(c.r#type, CommandType::Delete);
        assert_eq!(c.impact, Impact::Critical);
        assert!(!c.reversible);
    }

    #[test]
    fn plain_delete_is_high_impact() {
        let p = parse("rm file.txt");
        let (_, c) = analyze(&p);
        assert_eq!(c.r#type, CommandType::Delete);
        assert_eq!(c.impact, Impact::High);
    }

    #[test]
    fn read_only_pipeline_is_none_impact() {
        let p = parse("cat file.txt");
        let (_, c) = analyze(&p);
        assert_eq!(c.r#type, CommandType::Read);
        assert_eq!(c.impact, Impact::None);
        assert!(c.reversible);
    }

    #[test]
    fn network_command_is_low_reversible() {
        let p = parse("curl https://example.com");
        let (intent, c) = analyze(&p);
        assert!(intent.network);
        assert_eq!(c.r#type, CommandType::Network);
        assert_eq!(c.impact, Impact::Low);
    }

    #[test]
    fn elevated_write_escalates_impact() {
        let p = parse("cp a.txt /etc/a.txt");
        let (intent, c) = analyze(&p);
        assert!(intent.elevated);
        assert_eq!(c.r#type, CommandType::Write);
        assert_eq!(c.impact, Impact::High);
    }

    #[test]
    fn is_dangerous_flags_sudo() {
        let p = parse("sudo reboot");
        let (dangerous, reason) = is_dangerous(&p, "sudo reboot");
        assert!(dangerous);
        assert!(reason.is_some());
    }

    #[test]
    fn plain_echo_is_not_dangerous() {
        let p = parse("echo hello");
        let (dangerous, _) = is_dangerous(&p, "echo hello");
        assert!(!dangerous);
    }

    #[test]
    fn delete_always_irreversible_invariant() {
        for script in ["rm a", "rm -rf /", "rmdir dir", "find . -delete"] {
            let p = parse(script);
            let (_, c) = analyze(&p);
            if c.r#type == CommandType::Delete {
                assert!(!c.reversible);
            }
        }
    }
}
