//! Abstract syntax tree for the subset of bash the dispatcher understands
//! natively.
//!
//! This is deliberately not a full bash grammar. Only simple commands,
//! pipelines, redirection, quoting, environment-variable prefixes, and a
//! handful of compound-command shapes are modeled in detail; anything more
//! exotic (loops, functions, process substitution, case/for bodies) is
//! captured as an opaque `CompoundCommand` whose raw source text is handed
//! to a higher execution tier unchanged.

use std::fmt;

/// Position information for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

/// Span in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// Quoting style a word was lexed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    None,
    Single,
    Double,
    AnsiC,
    Locale,
}

/// A shell expansion occurring within a word.
#[derive(Debug, Clone, PartialEq)]
pub enum Expansion {
    Variable(String),
    CommandSubstitution(String),
    Arithmetic(String),
    Tilde,
    Parameter(String),
    Glob,
}

/// A lexed word: literal text, its quoting, and any expansions it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub quote: QuoteStyle,
    pub expansions: Vec<Expansion>,
    pub span: Span,
}

impl Word {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quote: QuoteStyle::None,
            expansions: Vec::new(),
            span: Span::default(),
        }
    }

    /// True if this word contains a command-substitution or arithmetic
    /// expansion that could execute arbitrary inline code.
    pub fn has_inline_code(&self) -> bool {
        self.expansions
            .iter()
            .any(|e| matches!(e, Expansion::CommandSubstitution(_) | Expansion::Arithmetic(_)))
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Redirection operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectOp {
    In,          // <
    Out,         // >
    Append,      // >>
    HereDoc,     // <<
    HereString,  // <<<
    ReadWrite,   // <>
    DupOut,      // >&
    OutErr,      // &>
    OutErrAppend,// &>>
}

#[derive(Debug, Clone, PartialEq)]
pub struct Redirect {
    pub op: RedirectOp,
    pub target: Word,
    pub fd: Option<u32>,
}

/// `name=value` or `name+=value` prefix assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignOp {
    Set,
    Append,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub value: Option<Word>,
    pub op: AssignOp,
}

/// List connective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOp {
    And,  // &&
    Or,   // ||
    Semi, // ;
    Async,// &
}

/// One AST node of the closed tagged union described by the system's data
/// model: `Program`, `List`, `Pipeline`, `Command`, `Subshell`,
/// `CompoundCommand`, `FunctionDef`.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Program(Program),
    List(Box<ListNode>),
    Pipeline(PipelineNode),
    Command(CommandNode),
    Subshell(Box<SubshellNode>),
    Compound(CompoundCommandNode),
    FunctionDef(Box<FunctionDefNode>),
    /// A syntax error recovered in place; traversal does not stop here.
    Error(ErrorNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorNode {
    pub message: String,
    pub span: Span,
}

/// Root node: a sequence of top-level list statements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub body: Vec<Node>,
    pub errors: Vec<ErrorNode>,
}

impl Program {
    /// A program is parseable when no descendant carries an error flag.
    pub fn is_parseable(&self) -> bool {
        self.errors.is_empty()
    }
}

/// `left OP right`, e.g. `cmd1 && cmd2`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListNode {
    pub left: Node,
    pub op: ListOp,
    pub right: Node,
}

/// A pipeline: `cmd1 | cmd2 | cmd3`. Stages are restricted to
/// `Command | Subshell | CompoundCommand` per the AST invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineNode {
    pub stages: Vec<Node>,
    pub negated: bool,
}

/// A simple command: optional prefix assignments, a name, arguments, and
/// redirections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandNode {
    pub prefix_assignments: Vec<Assignment>,
    pub name: Option<Word>,
    pub args: Vec<Word>,
    pub redirects: Vec<Redirect>,
}

/// `( ... )` — a subshell whose body is itself a full sub-program.
#[derive(Debug, Clone, PartialEq)]
pub struct SubshellNode {
    pub body: Program,
}

/// The kind of compound command recognized structurally. The dispatcher
/// never interprets the body of these; it routes them to the sandbox tier
/// with the original source text intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundKind {
    If,
    While,
    For,
    Case,
    Brace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompoundCommandNode {
    pub kind: CompoundKind,
    /// Raw source text of the construct, preserved verbatim for Tier-4
    /// execution.
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefNode {
    pub name: String,
    pub raw_body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_is_parseable_without_errors() {
        let p = Program::default();
        assert!(p.is_parseable());
    }

    #[test]
    fn program_with_errors_is_not_parseable() {
        let mut p = Program::default();
        p.errors.push(ErrorNode { message: "boom".into(), span: Span::default() });
        assert!(!p.is_parseable());
    }

    #[test]
    fn word_detects_inline_code() {
        let mut w = Word::plain("$(whoami)");
        w.expansions.push(Expansion::CommandSubstitution("whoami".into()));
        assert!(w.has_inline_code());

        let plain = Word::plain("hello");
        assert!(!plain.has_inline_code());
    }
}
