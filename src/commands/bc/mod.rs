//! A pared-down `bc`: one statement per line (or `;`-separated),
//! `scale`/`ibase`/`obase` pseudo-variables, ordinary variable
//! assignment, and the usual arithmetic grammar. Numbers are held as
//! `f64` rather than arbitrary-precision decimals; `scale` truncates
//! (never rounds) the fractional part of printed results, matching
//! bc's own truncation semantics. `ibase`/`obase` affect only the
//! integer part of non-decimal input/output.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::commands::{Command, CommandContext, CommandResult};

pub struct BcCommand;

struct Interpreter {
    vars: HashMap<String, f64>,
    scale: i64,
    ibase: u32,
    obase: u32,
}

impl Interpreter {
    fn new() -> Self {
        Self { vars: HashMap::new(), scale: 0, ibase: 10, obase: 10 }
    }

    fn format_value(&self, value: f64) -> String {
        if self.obase != 10 {
            return format_in_base(value, self.obase);
        }
        if self.scale <= 0 {
            return format!("{}", value.trunc() as i64);
        }
        let factor = 10f64.powi(self.scale as i32);
        let truncated = (value * factor).trunc() / factor;
        let s = format!("{:.*}", self.scale as usize, truncated);
        s
    }
}

fn format_in_base(value: f64, base: u32) -> String {
    let mut n = value.trunc() as i64;
    let negative = n < 0;
    n = n.abs();
    if n == 0 {
        return "0".to_string();
    }
    let digits = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut out = Vec::new();
    while n > 0 {
        let d = (n % base as i64) as usize;
        out.push(digits.as_bytes()[d] as char);
        n /= base as i64;
    }
    if negative {
        out.push('-');
    }
    out.iter().rev().collect()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Assign,
    LParen,
    RParen,
    Semi,
}

fn tokenize(line: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let value = text.parse::<f64>().map_err(|_| format!("bc: invalid number '{text}'"))?;
            tokens.push(Token::Num(value));
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else {
            match c {
                '+' => tokens.push(Token::Plus),
                '-' => tokens.push(Token::Minus),
                '*' => tokens.push(Token::Star),
                '/' => tokens.push(Token::Slash),
                '%' => tokens.push(Token::Percent),
                '^' => tokens.push(Token::Caret),
                '=' => tokens.push(Token::Assign),
                '(' => tokens.push(Token::LParen),
                ')' => tokens.push(Token::RParen),
                ';' => tokens.push(Token::Semi),
                _ => return Err(format!("bc: unexpected character '{c}'")),
            }
            i += 1;
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    fn parse_stmt(&mut self, interp: &mut Interpreter) -> Result<Option<f64>, String> {
        if let Some(Token::Ident(name)) = self.peek().cloned() {
            if self.tokens.get(self.pos + 1) == Some(&Token::Assign) {
                self.advance();
                self.advance();
                let value = self.parse_expr(interp)?;
                assign(interp, &name, value)?;
                return Ok(None);
            }
        }
        let value = self.parse_expr(interp)?;
        Ok(Some(value))
    }

    fn parse_expr(&mut self, interp: &mut Interpreter) -> Result<f64, String> {
        self.parse_add_sub(interp)
    }

    fn parse_add_sub(&mut self, interp: &mut Interpreter) -> Result<f64, String> {
        let mut left = self.parse_mul_div(interp)?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    left += self.parse_mul_div(interp)?;
                }
                Some(Token::Minus) => {
                    self.advance();
                    left -= self.parse_mul_div(interp)?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_mul_div(&mut self, interp: &mut Interpreter) -> Result<f64, String> {
        let mut left = self.parse_pow(interp)?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    left *= self.parse_pow(interp)?;
                }
                Some(Token::Slash) => {
                    self.advance();
                    let right = self.parse_pow(interp)?;
                    if right == 0.0 {
                        return Err("divide by zero".to_string());
                    }
                    left /= right;
                }
                Some(Token::Percent) => {
                    self.advance();
                    let right = self.parse_pow(interp)?;
                    if right == 0.0 {
                        return Err("divide by zero".to_string());
                    }
                    left %= right;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_pow(&mut self, interp: &mut Interpreter) -> Result<f64, String> {
        let base = self.parse_unary(interp)?;
        if self.peek() == Some(&Token::Caret) {
            self.advance();
            let exp = self.parse_pow(interp)?;
            return Ok(base.powf(exp));
        }
        Ok(base)
    }

    fn parse_unary(&mut self, interp: &mut Interpreter) -> Result<f64, String> {
        if self.peek() == Some(&Token::Minus) {
            self.advance();
            return Ok(-self.parse_unary(interp)?);
        }
        self.parse_primary(interp)
    }

    fn parse_primary(&mut self, interp: &mut Interpreter) -> Result<f64, String> {
        match self.advance().cloned() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::Ident(name)) => Ok(lookup(interp, &name)),
            Some(Token::LParen) => {
                let v = self.parse_expr(interp)?;
                if self.advance() != Some(&Token::RParen) {
                    return Err("bc: expected ')'".to_string());
                }
                Ok(v)
            }
            other => Err(format!("bc: unexpected token {other:?}")),
        }
    }
}

fn lookup(interp: &Interpreter, name: &str) -> f64 {
    match name {
        "scale" => interp.scale as f64,
        "ibase" => interp.ibase as f64,
        "obase" => interp.obase as f64,
        _ => *interp.vars.get(name).unwrap_or(&0.0),
    }
}

fn assign(interp: &mut Interpreter, name: &str, value: f64) -> Result<(), String> {
    match name {
        "scale" => interp.scale = value as i64,
        "ibase" => interp.ibase = value as u32,
        "obase" => interp.obase = value as u32,
        _ => {
            interp.vars.insert(name.to_string(), value);
        }
    }
    Ok(())
}

fn run(script: &str) -> Result<String, String> {
    let mut interp = Interpreter::new();
    let mut out = String::new();
    for raw_line in script.lines() {
        for stmt in raw_line.split(';') {
            let stmt = stmt.trim();
            if stmt.is_empty() {
                continue;
            }
            let tokens = tokenize(stmt)?;
            if tokens.is_empty() {
                continue;
            }
            let mut parser = Parser::new(&tokens);
            match parser.parse_stmt(&mut interp)? {
                Some(value) => {
                    out.push_str(&interp.format_value(value));
                    out.push('\n');
                }
                None => {}
            }
        }
    }
    Ok(out)
}

#[async_trait]
impl Command for BcCommand {
    fn name(&self) -> &'static str {
        "bc"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        match run(&ctx.stdin) {
            Ok(out) => CommandResult::success(out),
            Err(e) => CommandResult::with_exit_code(String::new(), format!("bc: {e}\n"), 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use crate::fs::InMemoryFs;

    fn ctx(stdin: &str) -> CommandContext {
        CommandContext {
            args: vec![],
            stdin: stdin.to_string(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
            exec_fn: None,
            fetch_fn: None,
        }
    }

    #[tokio::test]
    async fn basic_arithmetic() {
        let result = BcCommand.execute(ctx("2 + 3 * 4\n")).await;
        assert_eq!(result.stdout, "14\n");
    }

    #[tokio::test]
    async fn scale_truncates_fractional_part() {
        let result = BcCommand.execute(ctx("scale = 2\n10 / 3\n")).await;
        assert_eq!(result.stdout, "3.33\n");
    }

    #[tokio::test]
    async fn scale_zero_prints_integer() {
        let result = BcCommand.execute(ctx("10 / 3\n")).await;
        assert_eq!(result.stdout, "3\n");
    }

    #[tokio::test]
    async fn variables_persist_across_statements() {
        let result = BcCommand.execute(ctx("x = 5\ny = x * 2\ny\n")).await;
        assert_eq!(result.stdout, "10\n");
    }

    #[tokio::test]
    async fn exponentiation() {
        let result = BcCommand.execute(ctx("2 ^ 10\n")).await;
        assert_eq!(result.stdout, "1024\n");
    }

    #[tokio::test]
    async fn obase_converts_output_base() {
        let result = BcCommand.execute(ctx("obase = 16\n255\n")).await;
        assert_eq!(result.stdout, "FF\n");
    }

    #[tokio::test]
    async fn divide_by_zero_errors() {
        let result = BcCommand.execute(ctx("1 / 0\n")).await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("divide by zero"));
    }

    #[tokio::test]
    async fn semicolon_separates_statements() {
        let result = BcCommand.execute(ctx("x = 1; x + 1\n")).await;
        assert_eq!(result.stdout, "2\n");
    }
}
