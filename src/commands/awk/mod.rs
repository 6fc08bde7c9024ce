//! A minimal `awk`: one `pattern { action }` main block plus optional
//! `BEGIN`/`END` blocks, field splitting on `-F`, `print`/`printf`,
//! assignment operators, `var++`, and relational/regex/compound
//! conditions. Anything outside this subset (user functions, arrays,
//! multiple main rules, `getline`) is not supported; scripts that need it
//! are routed to a higher execution tier before reaching here.

use std::collections::HashMap;

use regex_lite::Regex;

use crate::commands::{Command, CommandContext, CommandResult};
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Num(f64),
    Str(String),
}

impl Value {
    fn as_num(&self) -> f64 {
        match self {
            Value::Num(n) => *n,
            Value::Str(s) => s.trim().parse().unwrap_or(0.0),
        }
    }

    fn as_str(&self) -> String {
        match self {
            Value::Num(n) => format_num(*n),
            Value::Str(s) => s.clone(),
        }
    }

    fn looks_numeric(&self) -> bool {
        match self {
            Value::Num(_) => true,
            Value::Str(s) => s.trim().parse::<f64>().is_ok(),
        }
    }
}

fn format_num(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[derive(Debug, Clone)]
enum Expr {
    Num(f64),
    Str(String),
    Field(Box<Expr>),
    Var(String),
    Regex(String),
    Assign(String, Box<Expr>),
    CompoundAssign(String, char, Box<Expr>),
    Binary(Box<Expr>, BinOp, Box<Expr>),
    Logical(Box<Expr>, bool, Box<Expr>),
    Not(Box<Expr>),
    Match(Box<Expr>, String, bool),
    PostIncr(String),
    PreIncr(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Concat,
}

#[derive(Debug, Clone)]
enum Stmt {
    Print(Vec<Expr>),
    Printf(Vec<Expr>),
    Expr(Expr),
    If(Expr, Box<Stmt>, Option<Box<Stmt>>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone)]
enum Pattern {
    Always,
    Begin,
    End,
    Expr(Expr),
}

#[derive(Debug, Clone)]
struct Rule {
    pattern: Pattern,
    action: Vec<Stmt>,
}

struct Tokens<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek_char(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }
}

/// Parses the program text into BEGIN/main/END rules. Best-effort: a
/// program outside the supported subset produces `None` so the caller can
/// report a syntax error rather than panic.
fn parse_program(src: &str) -> Option<Vec<Rule>> {
    let mut rules = Vec::new();
    let mut toks = Tokens::new(src);
    loop {
        toks.skip_ws();
        if toks.pos >= toks.src.len() {
            break;
        }
        let pattern = parse_pattern(&mut toks)?;
        toks.skip_ws();
        let action = if toks.peek_char() == Some('{') {
            parse_block(&mut toks)?
        } else {
            vec![Stmt::Print(vec![])]
        };
        rules.push(Rule { pattern, action });
        toks.skip_ws();
    }
    Some(rules)
}

fn parse_pattern(toks: &mut Tokens) -> Option<Pattern> {
    toks.skip_ws();
    if toks.src[toks.pos..].starts_with("BEGIN") {
        toks.pos += 5;
        return Some(Pattern::Begin);
    }
    if toks.src[toks.pos..].starts_with("END") {
        toks.pos += 3;
        return Some(Pattern::End);
    }
    if toks.peek_char() == Some('{') {
        return Some(Pattern::Always);
    }
    let expr_src = take_until_brace(toks);
    if expr_src.trim().is_empty() {
        return Some(Pattern::Always);
    }
    let expr = parse_expr_str(expr_src.trim())?;
    Some(Pattern::Expr(expr))
}

fn take_until_brace(toks: &mut Tokens) -> String {
    let start = toks.pos;
    let mut depth = 0i32;
    while let Some(c) = toks.peek_char() {
        match c {
            '{' if depth == 0 => break,
            '(' | '[' => {
                depth += 1;
                toks.bump();
            }
            ')' | ']' => {
                depth -= 1;
                toks.bump();
            }
            _ => {
                toks.bump();
            }
        }
    }
    toks.src[start..toks.pos].to_string()
}

fn parse_block(toks: &mut Tokens) -> Option<Vec<Stmt>> {
    toks.skip_ws();
    if toks.bump() != Some('{') {
        return None;
    }
    let start = toks.pos;
    let mut depth = 1i32;
    while let Some(c) = toks.peek_char() {
        match c {
            '{' => {
                depth += 1;
                toks.bump();
            }
            '}' => {
                depth -= 1;
                toks.bump();
                if depth == 0 {
                    break;
                }
            }
            '"' => {
                toks.bump();
                while let Some(c2) = toks.peek_char() {
                    toks.bump();
                    if c2 == '\\' {
                        toks.bump();
                    } else if c2 == '"' {
                        break;
                    }
                }
            }
            _ => {
                toks.bump();
            }
        }
    }
    let body = &toks.src[start..toks.pos.saturating_sub(1)];
    parse_statements(body)
}

fn parse_statements(src: &str) -> Option<Vec<Stmt>> {
    let mut stmts = Vec::new();
    for raw in split_statements(src) {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        stmts.push(parse_statement(raw)?);
    }
    Some(stmts)
}

fn split_statements(src: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut in_str = false;
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                in_str = !in_str;
                current.push(c);
            }
            '(' if !in_str => {
                depth += 1;
                current.push(c);
            }
            ')' if !in_str => {
                depth -= 1;
                current.push(c);
            }
            ';' | '\n' if !in_str && depth == 0 => {
                parts.push(current.clone());
                current.clear();
            }
            _ => current.push(c),
        }
        i += 1;
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts
}

fn parse_statement(src: &str) -> Option<Stmt> {
    let src = src.trim();
    if let Some(rest) = src.strip_prefix("print") {
        let rest = rest.trim();
        if rest.is_empty() {
            return Some(Stmt::Print(vec![]));
        }
        let args = split_args(rest)?.into_iter().map(|a| parse_expr_str(a.trim())).collect::<Option<Vec<_>>>()?;
        return Some(Stmt::Print(args));
    }
    if let Some(rest) = src.strip_prefix("printf") {
        let args = split_args(rest.trim())?.into_iter().map(|a| parse_expr_str(a.trim())).collect::<Option<Vec<_>>>()?;
        return Some(Stmt::Printf(args));
    }
    if let Some(rest) = src.strip_prefix("if") {
        let rest = rest.trim_start();
        let rest = rest.strip_prefix('(')?;
        let (cond_src, after) = split_balanced_paren(rest)?;
        let cond = parse_expr_str(cond_src.trim())?;
        let after = after.trim();
        let (then_src, else_src) = split_if_else(after);
        let then_stmt = if then_src.trim_start().starts_with('{') {
            Stmt::Block(parse_block(&mut Tokens::new(then_src.trim_start()))?)
        } else {
            parse_statement(then_src)?
        };
        let else_stmt = match else_src {
            Some(e) if e.trim_start().starts_with('{') => {
                Some(Box::new(Stmt::Block(parse_block(&mut Tokens::new(e.trim_start()))?)))
            }
            Some(e) if !e.trim().is_empty() => Some(Box::new(parse_statement(e)?)),
            _ => None,
        };
        return Some(Stmt::If(cond, Box::new(then_stmt), else_stmt));
    }
    Some(Stmt::Expr(parse_expr_str(src)?))
}

fn split_if_else(src: &str) -> (&str, Option<&str>) {
    if let Some(idx) = src.find("else") {
        (&src[..idx], Some(&src[idx + 4..]))
    } else {
        (src, None)
    }
}

fn split_balanced_paren(src: &str) -> Option<(&str, &str)> {
    let mut depth = 1i32;
    for (i, c) in src.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&src[..i], &src[i + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

fn split_args(src: &str) -> Option<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut in_str = false;
    for c in src.chars() {
        match c {
            '"' => {
                in_str = !in_str;
                current.push(c);
            }
            '(' if !in_str => {
                depth += 1;
                current.push(c);
            }
            ')' if !in_str => {
                depth -= 1;
                current.push(c);
            }
            ',' if !in_str && depth == 0 => {
                parts.push(current.clone());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() || parts.is_empty() {
        parts.push(current);
    }
    Some(parts)
}

/// Tiny precedence-climbing expression parser covering the spec's subset:
/// assignment, `||`/`&&`, relational, concat, additive, multiplicative,
/// unary, postfix `++`, and `$N` field references.
fn parse_expr_str(src: &str) -> Option<Expr> {
    let mut p = ExprParser { src: src.trim(), pos: 0 };
    p.skip_ws();
    let e = p.parse_assign()?;
    p.skip_ws();
    Some(e)
}

struct ExprParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> ExprParser<'a> {
    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        while self.rest().starts_with(' ') || self.rest().starts_with('\t') {
            self.pos += 1;
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    fn consume(&mut self, s: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn parse_assign(&mut self) -> Option<Expr> {
        let start = self.pos;
        if let Some(name) = self.try_parse_ident() {
            self.skip_ws();
            for (op, ch) in [("+=", '+'), ("-=", '-'), ("*=", '*'), ("/=", '/')] {
                if self.consume(op) {
                    let rhs = self.parse_assign()?;
                    return Some(Expr::CompoundAssign(name, ch, Box::new(rhs)));
                }
            }
            if self.rest().starts_with('=') && !self.rest().starts_with("==") {
                self.pos += 1;
                let rhs = self.parse_assign()?;
                return Some(Expr::Assign(name, Box::new(rhs)));
            }
            self.pos = start;
        }
        self.parse_logical()
    }

    fn try_parse_ident(&mut self) -> Option<String> {
        self.skip_ws();
        let start = self.pos;
        let rest = self.rest();
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, c)) if c.is_alphabetic() || c == '_' => {}
            _ => return None,
        }
        let mut end = 1;
        for (i, c) in chars {
            if c.is_alphanumeric() || c == '_' {
                end = i + c.len_utf8();
            } else {
                break;
            }
        }
        let ident = rest[..end].to_string();
        self.pos = start + end;
        Some(ident)
    }

    fn parse_logical(&mut self) -> Option<Expr> {
        let mut left = self.parse_relational()?;
        loop {
            self.skip_ws();
            if self.consume("&&") {
                let right = self.parse_relational()?;
                left = Expr::Logical(Box::new(left), true, Box::new(right));
            } else if self.consume("||") {
                let right = self.parse_relational()?;
                left = Expr::Logical(Box::new(left), false, Box::new(right));
            } else {
                break;
            }
        }
        Some(left)
    }

    fn parse_relational(&mut self) -> Option<Expr> {
        let left = self.parse_concat()?;
        self.skip_ws();
        for (op_str, op) in [
            ("==", BinOp::Eq),
            ("!=", BinOp::Ne),
            ("<=", BinOp::Le),
            (">=", BinOp::Ge),
            ("<", BinOp::Lt),
            (">", BinOp::Gt),
        ] {
            if self.consume(op_str) {
                let right = self.parse_concat()?;
                return Some(Expr::Binary(Box::new(left), op, Box::new(right)));
            }
        }
        if self.consume("!~") {
            let re = self.parse_regex_or_str()?;
            return Some(Expr::Match(Box::new(left), re, true));
        }
        if self.consume("~") {
            let re = self.parse_regex_or_str()?;
            return Some(Expr::Match(Box::new(left), re, false));
        }
        Some(left)
    }

    fn parse_regex_or_str(&mut self) -> Option<String> {
        self.skip_ws();
        if self.rest().starts_with('/') {
            self.pos += 1;
            let start = self.pos;
            while self.pos < self.src.len() && !self.rest().starts_with('/') {
                self.pos += 1;
            }
            let re = self.src[start..self.pos].to_string();
            self.pos += 1;
            Some(re)
        } else {
            match self.parse_concat()? {
                Expr::Str(s) => Some(s),
                _ => None,
            }
        }
    }

    fn parse_concat(&mut self) -> Option<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            self.skip_ws();
            if self.rest().is_empty()
                || self.starts_with("&&")
                || self.starts_with("||")
                || self.starts_with(")")
                || self.starts_with(",")
                || ["==", "!=", "<=", ">=", "<", ">", "~"].iter().any(|op| self.starts_with(op))
            {
                break;
            }
            match self.parse_additive() {
                Some(right) => left = Expr::Binary(Box::new(left), BinOp::Concat, Box::new(right)),
                None => break,
            }
        }
        Some(left)
    }

    fn parse_additive(&mut self) -> Option<Expr> {
        let mut left = self.parse_mul()?;
        loop {
            self.skip_ws();
            if self.consume("+") {
                let right = self.parse_mul()?;
                left = Expr::Binary(Box::new(left), BinOp::Add, Box::new(right));
            } else if self.starts_with("-") && !self.starts_with("--") {
                self.pos += 1;
                let right = self.parse_mul()?;
                left = Expr::Binary(Box::new(left), BinOp::Sub, Box::new(right));
            } else {
                break;
            }
        }
        Some(left)
    }

    fn parse_mul(&mut self) -> Option<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_ws();
            if self.consume("*") {
                let right = self.parse_unary()?;
                left = Expr::Binary(Box::new(left), BinOp::Mul, Box::new(right));
            } else if self.consume("/") {
                let right = self.parse_unary()?;
                left = Expr::Binary(Box::new(left), BinOp::Div, Box::new(right));
            } else {
                break;
            }
        }
        Some(left)
    }

    fn parse_unary(&mut self) -> Option<Expr> {
        self.skip_ws();
        if self.consume("!") {
            let e = self.parse_unary()?;
            return Some(Expr::Not(Box::new(e)));
        }
        if self.consume("++") {
            let name = self.try_parse_ident()?;
            return Some(Expr::PreIncr(name));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Option<Expr> {
        let start = self.pos;
        if let Some(name) = self.try_parse_ident() {
            if self.starts_with("++") {
                self.pos += 2;
                return Some(Expr::PostIncr(name));
            }
            self.pos = start;
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        self.skip_ws();
        if self.consume("$") {
            let inner = self.parse_primary()?;
            return Some(Expr::Field(Box::new(inner)));
        }
        if self.consume("(") {
            let e = self.parse_assign()?;
            self.consume(")");
            return Some(e);
        }
        if self.rest().starts_with('"') {
            self.pos += 1;
            let mut s = String::new();
            while let Some(c) = self.rest().chars().next() {
                self.pos += c.len_utf8();
                if c == '\\' {
                    if let Some(n) = self.rest().chars().next() {
                        self.pos += n.len_utf8();
                        s.push(match n {
                            'n' => '\n',
                            't' => '\t',
                            other => other,
                        });
                    }
                } else if c == '"' {
                    break;
                } else {
                    s.push(c);
                }
            }
            return Some(Expr::Str(s));
        }
        if self.rest().starts_with('/') {
            self.pos += 1;
            let start = self.pos;
            while self.pos < self.src.len() && !self.rest().starts_with('/') {
                self.pos += 1;
            }
            let re = self.src[start..self.pos].to_string();
            self.pos += 1;
            return Some(Expr::Regex(re));
        }
        let rest = self.rest();
        if let Some(c) = rest.chars().next() {
            if c.is_ascii_digit() || (c == '.' && rest.chars().nth(1).is_some_and(|n| n.is_ascii_digit())) {
                let mut end = 0;
                for (i, ch) in rest.char_indices() {
                    if ch.is_ascii_digit() || ch == '.' {
                        end = i + ch.len_utf8();
                    } else {
                        break;
                    }
                }
                let n: f64 = rest[..end].parse().ok()?;
                self.pos += end;
                return Some(Expr::Num(n));
            }
        }
        let name = self.try_parse_ident()?;
        Some(Expr::Var(name))
    }
}

struct AwkState {
    fields: Vec<String>,
    vars: HashMap<String, Value>,
    ofs: String,
    ors: String,
}

impl AwkState {
    fn get_var(&self, name: &str) -> Value {
        self.vars.get(name).cloned().unwrap_or(Value::Str(String::new()))
    }

    fn set_var(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_string(), value);
    }

    fn field(&self, index: usize) -> String {
        if index == 0 {
            self.fields.join(&self.ofs)
        } else {
            self.fields.get(index - 1).cloned().unwrap_or_default()
        }
    }
}

fn eval(expr: &Expr, state: &mut AwkState) -> Value {
    match expr {
        Expr::Num(n) => Value::Num(*n),
        Expr::Str(s) => Value::Str(s.clone()),
        Expr::Regex(re) => {
            Value::Num(if Regex::new(re).map(|r| r.is_match(&state.field(0))).unwrap_or(false) { 1.0 } else { 0.0 })
        }
        Expr::Field(inner) => {
            let idx = eval(inner, state).as_num() as usize;
            Value::Str(state.field(idx))
        }
        Expr::Var(name) => state.get_var(name),
        Expr::Assign(name, rhs) => {
            let v = eval(rhs, state);
            state.set_var(name, v.clone());
            v
        }
        Expr::CompoundAssign(name, op, rhs) => {
            let cur = state.get_var(name).as_num();
            let rv = eval(rhs, state).as_num();
            let result = match op {
                '+' => cur + rv,
                '-' => cur - rv,
                '*' => cur * rv,
                '/' => cur / rv,
                _ => cur,
            };
            state.set_var(name, Value::Num(result));
            Value::Num(result)
        }
        Expr::PostIncr(name) => {
            let cur = state.get_var(name).as_num();
            state.set_var(name, Value::Num(cur + 1.0));
            Value::Num(cur)
        }
        Expr::PreIncr(name) => {
            let cur = state.get_var(name).as_num() + 1.0;
            state.set_var(name, Value::Num(cur));
            Value::Num(cur)
        }
        Expr::Binary(l, op, r) => {
            if *op == BinOp::Concat {
                let ls = eval(l, state).as_str();
                let rs = eval(r, state).as_str();
                return Value::Str(format!("{ls}{rs}"));
            }
            let lv = eval(l, state);
            let rv = eval(r, state);
            let numeric = lv.looks_numeric() && rv.looks_numeric();
            match op {
                BinOp::Add => Value::Num(lv.as_num() + rv.as_num()),
                BinOp::Sub => Value::Num(lv.as_num() - rv.as_num()),
                BinOp::Mul => Value::Num(lv.as_num() * rv.as_num()),
                BinOp::Div => Value::Num(lv.as_num() / rv.as_num()),
                BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                    let ord = if numeric {
                        lv.as_num().partial_cmp(&rv.as_num())
                    } else {
                        lv.as_str().partial_cmp(&rv.as_str())
                    };
                    let result = match (op, ord) {
                        (BinOp::Eq, Some(std::cmp::Ordering::Equal)) => true,
                        (BinOp::Ne, Some(o)) => o != std::cmp::Ordering::Equal,
                        (BinOp::Lt, Some(std::cmp::Ordering::Less)) => true,
                        (BinOp::Le, Some(o)) => o != std::cmp::Ordering::Greater,
                        (BinOp::Gt, Some(std::cmp::Ordering::Greater)) => true,
                        (BinOp::Ge, Some(o)) => o != std::cmp::Ordering::Less,
                        _ => false,
                    };
                    Value::Num(if result { 1.0 } else { 0.0 })
                }
                BinOp::Concat => unreachable!(),
            }
        }
        Expr::Logical(l, is_and, r) => {
            let lb = eval(l, state).as_num() != 0.0;
            let result = if *is_and { lb && eval(r, state).as_num() != 0.0 } else { lb || eval(r, state).as_num() != 0.0 };
            Value::Num(if result { 1.0 } else { 0.0 })
        }
        Expr::Not(e) => Value::Num(if eval(e, state).as_num() == 0.0 { 1.0 } else { 0.0 }),
        Expr::Match(e, re, negate) => {
            let text = eval(e, state).as_str();
            let is_match = Regex::new(re).map(|r| r.is_match(&text)).unwrap_or(false);
            Value::Num(if is_match != *negate { 1.0 } else { 0.0 })
        }
    }
}

fn exec_stmt(stmt: &Stmt, state: &mut AwkState, out: &mut String) {
    match stmt {
        Stmt::Print(args) => {
            if args.is_empty() {
                out.push_str(&state.field(0));
            } else {
                let parts: Vec<String> = args.iter().map(|a| eval(a, state).as_str()).collect();
                out.push_str(&parts.join(&state.ofs));
            }
            out.push_str(&state.ors);
        }
        Stmt::Printf(args) => {
            if let Some((fmt, rest)) = args.split_first() {
                let fmt_str = eval(fmt, state).as_str();
                let values: Vec<Value> = rest.iter().map(|a| eval(a, state)).collect();
                out.push_str(&apply_printf(&fmt_str, &values));
            }
        }
        Stmt::Expr(e) => {
            eval(e, state);
        }
        Stmt::If(cond, then_branch, else_branch) => {
            if eval(cond, state).as_num() != 0.0 {
                exec_stmt(then_branch, state, out);
            } else if let Some(e) = else_branch {
                exec_stmt(e, state, out);
            }
        }
        Stmt::Block(stmts) => {
            for s in stmts {
                exec_stmt(s, state, out);
            }
        }
    }
}

fn apply_printf(fmt: &str, values: &[Value]) -> String {
    let mut out = String::new();
    let mut chars = fmt.chars().peekable();
    let mut vi = 0;
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
            continue;
        }
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('d') => {
                out.push_str(&format!("{}", values.get(vi).map(|v| v.as_num() as i64).unwrap_or(0)));
                vi += 1;
            }
            Some('s') => {
                out.push_str(&values.get(vi).map(|v| v.as_str()).unwrap_or_default());
                vi += 1;
            }
            Some('f') => {
                out.push_str(&format!("{:.6}", values.get(vi).map(|v| v.as_num()).unwrap_or(0.0)));
                vi += 1;
            }
            Some('e') => {
                out.push_str(&format!("{:e}", values.get(vi).map(|v| v.as_num()).unwrap_or(0.0)));
                vi += 1;
            }
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

pub struct AwkCommand;

#[async_trait]
impl Command for AwkCommand {
    fn name(&self) -> &'static str {
        "awk"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut fs = " ".to_string();
        let mut program_src = None;
        let mut i = 0;
        let mut inline_assignments = Vec::new();
        while i < ctx.args.len() {
            let arg = &ctx.args[i];
            if arg == "-F" && i + 1 < ctx.args.len() {
                i += 1;
                fs = ctx.args[i].clone();
            } else if let Some(rest) = arg.strip_prefix("-F") {
                fs = rest.to_string();
            } else if let Some((k, v)) = arg.split_once('=') {
                if k.chars().all(|c| c.is_alphanumeric() || c == '_') && program_src.is_some() {
                    inline_assignments.push((k.to_string(), v.to_string()));
                } else if program_src.is_none() {
                    program_src = Some(arg.clone());
                }
            } else if program_src.is_none() {
                program_src = Some(arg.clone());
            }
            i += 1;
        }

        let Some(src) = program_src else {
            return CommandResult::error("awk: no program given\n".to_string());
        };
        let Some(rules) = parse_program(&src) else {
            return CommandResult::error(format!("awk: syntax error in program: {src}\n"));
        };

        let mut state = AwkState {
            fields: Vec::new(),
            vars: HashMap::new(),
            ofs: " ".to_string(),
            ors: "\n".to_string(),
        };
        state.set_var("FS", Value::Str(fs.clone()));
        state.set_var("OFS", Value::Str(" ".to_string()));
        state.set_var("ORS", Value::Str("\n".to_string()));
        for (k, v) in inline_assignments {
            state.set_var(&k, Value::Str(v));
        }

        let mut out = String::new();
        for rule in &rules {
            if matches!(rule.pattern, Pattern::Begin) {
                for stmt in &rule.action {
                    exec_stmt(stmt, &mut state, &mut out);
                }
            }
        }

        let has_main_or_end = rules.iter().any(|r| !matches!(r.pattern, Pattern::Begin));
        if has_main_or_end {
            let mut nr = 0i64;
            for line in ctx.stdin.lines() {
                nr += 1;
                state.fields = split_fields(line, &fs);
                state.set_var("NR", Value::Num(nr as f64));
                state.set_var("NF", Value::Num(state.fields.len() as f64));
                for rule in &rules {
                    let matched = match &rule.pattern {
                        Pattern::Always => true,
                        Pattern::Begin | Pattern::End => false,
                        Pattern::Expr(e) => eval(e, &mut state).as_num() != 0.0,
                    };
                    if matched {
                        for stmt in &rule.action {
                            exec_stmt(stmt, &mut state, &mut out);
                        }
                    }
                }
            }
        }

        for rule in &rules {
            if matches!(rule.pattern, Pattern::End) {
                for stmt in &rule.action {
                    exec_stmt(stmt, &mut state, &mut out);
                }
            }
        }

        CommandResult::success(out)
    }
}

fn split_fields(line: &str, fs: &str) -> Vec<String> {
    if fs == " " {
        line.split_whitespace().map(|s| s.to_string()).collect()
    } else if fs.chars().count() == 1 {
        line.split(fs.chars().next().unwrap()).map(|s| s.to_string()).collect()
    } else {
        Regex::new(fs)
            .map(|re| re.split(line).map(|s| s.to_string()).collect())
            .unwrap_or_else(|_| vec![line.to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;
    use std::collections::HashMap as Map;
    use std::sync::Arc;

    fn ctx(args: &[&str], stdin: &str) -> CommandContext {
        CommandContext {
            args: args.iter().map(|s| s.to_string()).collect(),
            stdin: stdin.to_string(),
            cwd: "/".to_string(),
            env: Map::new(),
            fs: Arc::new(InMemoryFs::new()),
            exec_fn: None,
            fetch_fn: None,
        }
    }

    #[tokio::test]
    async fn prints_second_field_with_custom_separator() {
        let cmd = AwkCommand;
        let result = cmd.execute(ctx(&["-F", ",", "{print $2}"], "a,b,c\nd,e,f\n")).await;
        assert_eq!(result.stdout, "b\ne\n");
    }

    #[tokio::test]
    async fn begin_end_blocks_run_once() {
        let cmd = AwkCommand;
        let result = cmd.execute(ctx(&["BEGIN{print \"start\"} {print $1} END{print \"done\"}"], "x\ny\n")).await;
        assert_eq!(result.stdout, "start\nx\ny\ndone\n");
    }

    #[tokio::test]
    async fn nr_and_nf_builtins() {
        let cmd = AwkCommand;
        let result = cmd.execute(ctx(&["{print NR, NF}"], "a b c\nd e\n")).await;
        assert_eq!(result.stdout, "1 3\n2 2\n");
    }

    #[tokio::test]
    async fn condition_filters_rows_numerically() {
        let cmd = AwkCommand;
        let result = cmd.execute(ctx(&["$2 > 10 {print $1}"], "a 5\nb 20\nc 15\n")).await;
        assert_eq!(result.stdout, "b\nc\n");
    }

    #[tokio::test]
    async fn sum_accumulator_with_end_block() {
        let cmd = AwkCommand;
        let result = cmd.execute(ctx(&["{sum += $1} END {print sum}"], "1\n2\n3\n")).await;
        assert_eq!(result.stdout, "6\n");
    }
}
