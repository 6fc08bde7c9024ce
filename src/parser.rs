//! Recursive-descent parser turning a token stream into a [`Program`].
//!
//! Grammar (informal, matches the lexer's token set):
//!
//! ```text
//! program  := list*
//! list     := pipeline (('&&' | '||' | ';' | '&') pipeline)*
//! pipeline := '!'? simple (('|') simple)*
//! simple   := compound | subshell | function_def | command
//! command  := assignment* word+ redirect*
//! redirect := ('<'|'>'|'>>'|'<<'|'<<<'|'&>'|'&>>'|'<>'|'>&') word
//! ```
//!
//! Parsing never aborts on malformed input: an unrecognized construct is
//! recorded as an [`ErrorNode`] and the parser resynchronizes at the next
//! list delimiter, so `parse` always returns a complete `Program`.

use crate::ast::*;
use crate::lexer::{Lexer, Token};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ErrorNode>,
}

/// Parse a full script into a [`Program`]. Never fails; collects errors.
pub fn parse(input: &str) -> Program {
    let tokens = Lexer::new(input).tokenize();
    let mut parser = Parser { tokens, pos: 0, errors: Vec::new() };
    let body = parser.parse_program();
    Program { body, errors: parser.errors }
}

/// `true` iff parsing produced no error nodes.
pub fn is_valid_syntax(input: &str) -> bool {
    parse(input).is_parseable()
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), Some(Token::Newline) | Some(Token::Semi)) {
            self.advance();
        }
    }

    fn parse_program(&mut self) -> Vec<Node> {
        let mut body = Vec::new();
        self.skip_separators();
        while self.peek().is_some() {
            let node = self.parse_list();
            body.push(node);
            self.skip_separators();
        }
        body
    }

    fn parse_list(&mut self) -> Node {
        let mut left = self.parse_pipeline();
        loop {
            let op = match self.peek() {
                Some(Token::AndAnd) => ListOp::And,
                Some(Token::OrOr) => ListOp::Or,
                Some(Token::Semi) => ListOp::Semi,
                Some(Token::Amp) => ListOp::Async,
                _ => break,
            };
            self.advance();
            // Trailing terminator with nothing after it: stop, don't
            // synthesize an empty right-hand pipeline.
            if matches!(self.peek(), None | Some(Token::Newline)) {
                break;
            }
            let right = self.parse_pipeline();
            left = Node::List(Box::new(ListNode { left, op, right }));
        }
        left
    }

    fn parse_pipeline(&mut self) -> Node {
        let negated = if matches!(self.peek(), Some(Token::Bang)) {
            self.advance();
            true
        } else {
            false
        };

        let mut stages = vec![self.parse_simple()];
        while matches!(self.peek(), Some(Token::Pipe) | Some(Token::PipeStderr)) {
            self.advance();
            stages.push(self.parse_simple());
        }

        if stages.len() == 1 && !negated {
            stages.into_iter().next().unwrap()
        } else {
            Node::Pipeline(PipelineNode { stages, negated })
        }
    }

    fn parse_simple(&mut self) -> Node {
        match self.peek() {
            Some(Token::LParen) => self.parse_subshell(),
            Some(Token::Word(w)) if is_function_def_start(w, &self.tokens, self.pos) => {
                self.parse_function_def()
            }
            Some(Token::Word(w)) if is_compound_keyword(&w.text) => self.parse_compound(),
            _ => self.parse_command(),
        }
    }

    fn parse_subshell(&mut self) -> Node {
        self.advance(); // consume '('
        let mut inner_tokens = Vec::new();
        let mut depth = 1i32;
        while let Some(tok) = self.peek() {
            match tok {
                Token::LParen => { depth += 1; inner_tokens.push(tok.clone()); self.advance(); }
                Token::RParen => {
                    depth -= 1;
                    self.advance();
                    if depth == 0 { break; }
                    inner_tokens.push(Token::RParen);
                }
                other => { inner_tokens.push(other.clone()); self.advance(); }
            }
        }
        let mut sub = Parser { tokens: inner_tokens, pos: 0, errors: Vec::new() };
        let body = Program { body: sub.parse_program(), errors: sub.errors };
        Node::Subshell(Box::new(SubshellNode { body }))
    }

    fn parse_function_def(&mut self) -> Node {
        let name = match self.advance() {
            Some(Token::Word(w)) => w.text.clone(),
            _ => String::new(),
        };
        // skip "()" if present
        if matches!(self.peek(), Some(Token::LParen)) {
            self.advance();
            if matches!(self.peek(), Some(Token::RParen)) {
                self.advance();
            }
        }
        let raw_body = self.consume_compound_body();
        Node::FunctionDef(Box::new(FunctionDefNode { name, raw_body }))
    }

    fn parse_compound(&mut self) -> Node {
        let keyword = match self.peek() {
            Some(Token::Word(w)) => w.text.clone(),
            _ => String::new(),
        };
        let kind = match keyword.as_str() {
            "if" => CompoundKind::If,
            "while" => CompoundKind::While,
            "for" => CompoundKind::For,
            "case" => CompoundKind::Case,
            "{" => CompoundKind::Brace,
            _ => CompoundKind::Brace,
        };
        let raw = self.consume_compound_body();
        Node::Compound(CompoundCommandNode { kind, raw })
    }

    /// Compound-command bodies are not interpreted structurally beyond
    /// locating their closing keyword; capture the raw text verbatim for
    /// a higher execution tier.
    fn consume_compound_body(&mut self) -> String {
        let mut words = Vec::new();
        let closers = ["fi", "done", "esac", "}"];
        loop {
            match self.advance() {
                Some(Token::Word(w)) => {
                    let is_closer = closers.contains(&w.text.as_str());
                    words.push(w.text.clone());
                    if is_closer {
                        break;
                    }
                }
                Some(Token::Newline) => words.push("\n".to_string()),
                Some(Token::Semi) => words.push(";".to_string()),
                Some(Token::Pipe) => words.push("|".to_string()),
                Some(other_tok) => words.push(format!("{:?}", other_tok)),
                None => break,
            }
        }
        words.join(" ")
    }

    fn parse_command(&mut self) -> Node {
        let mut cmd = CommandNode::default();

        // Prefix environment assignments.
        while let Some(Token::Word(w)) = self.peek() {
            if let Some((name, value)) = crate::lexer::is_assignment_word(&w.text) {
                cmd.prefix_assignments.push(Assignment {
                    name: name.to_string(),
                    value: Some(Word::plain(value)),
                    op: AssignOp::Set,
                });
                self.advance();
            } else {
                break;
            }
        }

        loop {
            match self.peek() {
                Some(Token::Word(w)) => {
                    let w = w.clone();
                    self.advance();
                    if cmd.name.is_none() {
                        cmd.name = Some(w);
                    } else {
                        cmd.args.push(w);
                    }
                }
                Some(t) if redirect_op(t).is_some() => {
                    let op = redirect_op(t).unwrap();
                    self.advance();
                    match self.advance() {
                        Some(Token::Word(target)) => {
                            cmd.redirects.push(Redirect { op, target, fd: None });
                        }
                        _ => {
                            self.errors.push(ErrorNode {
                                message: "redirection missing target".into(),
                                span: Span::default(),
                            });
                        }
                    }
                }
                _ => break,
            }
        }

        if cmd.name.is_none() && cmd.prefix_assignments.is_empty() {
            self.errors.push(ErrorNode { message: "expected command".into(), span: Span::default() });
            // Resynchronize: consume the offending token so we make progress.
            self.advance();
            return Node::Error(ErrorNode { message: "expected command".into(), span: Span::default() });
        }

        Node::Command(cmd)
    }
}

fn redirect_op(tok: &Token) -> Option<RedirectOp> {
    Some(match tok {
        Token::RedirectIn => RedirectOp::In,
        Token::RedirectOut => RedirectOp::Out,
        Token::RedirectAppend => RedirectOp::Append,
        Token::RedirectHereDoc => RedirectOp::HereDoc,
        Token::RedirectHereStr => RedirectOp::HereString,
        Token::RedirectReadWrite => RedirectOp::ReadWrite,
        Token::RedirectDupOut => RedirectOp::DupOut,
        Token::RedirectOutErr => RedirectOp::OutErr,
        Token::RedirectOutErrAppend => RedirectOp::OutErrAppend,
        _ => return None,
    })
}

fn is_compound_keyword(text: &str) -> bool {
    matches!(text, "if" | "while" | "for" | "case" | "{")
}

/// `name ()` or `function name` introduces a FunctionDef.
fn is_function_def_start(word: &Word, tokens: &[Token], pos: usize) -> bool {
    if word.text == "function" {
        return true;
    }
    matches!(tokens.get(pos + 1), Some(Token::LParen))
        && matches!(tokens.get(pos + 2), Some(Token::RParen))
}
