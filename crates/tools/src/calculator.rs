//! Calculator tool: evaluates arithmetic expressions.
//!
//! Supports `+`, `-`, `*`, `/`, floor division `//`, powers `**`,
//! parentheses, decimal numbers and unary signs. Input is checked against a
//! strict character class first, then evaluated by a recursive-descent
//! parser. Nothing but arithmetic is ever evaluated.

use async_trait::async_trait;
use regex::Regex;
use rustedtutor_core::error::ToolError;
use rustedtutor_core::subject::CALCULATOR;
use rustedtutor_core::tool::{Tool, ToolResult};
use std::sync::LazyLock;

static ALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9+\-*/.()]+$").expect("static regex"));

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalcError {
    #[error("Invalid characters in expression")]
    InvalidCharacters,

    #[error("{0}")]
    EvaluationFailed(String),
}

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        CALCULATOR
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression. Supports +, -, *, /, // (floor division), ** (power), parentheses and decimal numbers."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The arithmetic expression to evaluate, e.g. '10 + 5*3'"
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let Some(expr) = arguments["expression"].as_str() else {
            return Ok(ToolResult::failure("Calculator error: missing 'expression' argument"));
        };

        match evaluate(expr) {
            Ok(value) => {
                tracing::debug!(expression = expr, value, "Calculator evaluated");
                Ok(ToolResult::success(
                    format_number(value),
                    serde_json::json!({ "value": value }),
                ))
            }
            Err(e) => Ok(ToolResult::failure(format!("Calculator error: {e}"))),
        }
    }
}

/// Render a value without a trailing `.0` when it is integral.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

// ── Recursive-descent expression evaluator ────────────────────────────────

/// Evaluate an arithmetic expression string.
pub fn evaluate(expr: &str) -> Result<f64, CalcError> {
    let cleaned: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
    if !ALLOWED.is_match(&cleaned) {
        return Err(CalcError::InvalidCharacters);
    }

    let tokens = tokenize(&cleaned)?;
    let mut parser = Parser::new(&tokens);
    let result = parser.parse_expr()?;
    if let Some(tok) = parser.peek() {
        return Err(CalcError::EvaluationFailed(format!(
            "Unexpected token at position {}: {:?}",
            parser.pos, tok
        )));
    }
    if !result.is_finite() {
        return Err(CalcError::EvaluationFailed("Result is not a finite number".into()));
    }
    Ok(result)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let next = chars.get(i + 1).copied();
        match chars[i] {
            '+' => { tokens.push(Token::Plus); i += 1; }
            '-' => { tokens.push(Token::Minus); i += 1; }
            '*' if next == Some('*') => { tokens.push(Token::DoubleStar); i += 2; }
            '*' => { tokens.push(Token::Star); i += 1; }
            '/' if next == Some('/') => { tokens.push(Token::DoubleSlash); i += 2; }
            '/' => { tokens.push(Token::Slash); i += 1; }
            '(' => { tokens.push(Token::LParen); i += 1; }
            ')' => { tokens.push(Token::RParen); i += 1; }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let num_str: String = chars[start..i].iter().collect();
                let num: f64 = num_str
                    .parse()
                    .map_err(|_| CalcError::EvaluationFailed(format!("Invalid number: {}", num_str)))?;
                tokens.push(Token::Number(num));
            }
            c => return Err(CalcError::EvaluationFailed(format!("Unexpected character: '{}'", c))),
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

    fn consume(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    // expr = term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<f64, CalcError> {
        let mut left = self.parse_term()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Plus => {
                    self.consume();
                    left += self.parse_term()?;
                }
                Token::Minus => {
                    self.consume();
                    left -= self.parse_term()?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    // term = unary (('*' | '/' | '//') unary)*
    fn parse_term(&mut self) -> Result<f64, CalcError> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.peek() {
            match op {
                Token::Star => {
                    self.consume();
                    left *= self.parse_unary()?;
                }
                Token::Slash => {
                    self.consume();
                    let right = self.parse_unary()?;
                    if right == 0.0 {
                        return Err(CalcError::EvaluationFailed("Division by zero".into()));
                    }
                    left /= right;
                }
                Token::DoubleSlash => {
                    self.consume();
                    let right = self.parse_unary()?;
                    if right == 0.0 {
                        return Err(CalcError::EvaluationFailed("Division by zero".into()));
                    }
                    left = (left / right).floor();
                }
                _ => break,
            }
        }
        Ok(left)
    }

    // unary = ('+' | '-') unary | power
    fn parse_unary(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.consume();
                Ok(-self.parse_unary()?)
            }
            Some(Token::Plus) => {
                self.consume();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    // power = primary ('**' unary)?
    fn parse_power(&mut self) -> Result<f64, CalcError> {
        let base = self.parse_primary()?;
        if let Some(Token::DoubleStar) = self.peek() {
            self.consume();
            let exponent = self.parse_unary()?;
            if base == 0.0 && exponent < 0.0 {
                return Err(CalcError::EvaluationFailed(
                    "Zero cannot be raised to a negative power".into(),
                ));
            }
            let value = base.powf(exponent);
            if value.is_nan() {
                return Err(CalcError::EvaluationFailed(
                    "Power of a negative number has no real value".into(),
                ));
            }
            return Ok(value);
        }
        Ok(base)
    }

    // primary = NUMBER | '(' expr ')'
    fn parse_primary(&mut self) -> Result<f64, CalcError> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(*n),
            Some(Token::LParen) => {
                let val = self.parse_expr()?;
                match self.consume() {
                    Some(Token::RParen) => Ok(val),
                    _ => Err(CalcError::EvaluationFailed("Expected closing parenthesis".into())),
                }
            }
            Some(tok) => Err(CalcError::EvaluationFailed(format!("Unexpected token: {:?}", tok))),
            None => Err(CalcError::EvaluationFailed("Unexpected end of expression".into())),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
