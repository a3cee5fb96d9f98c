//! Recursive-descent parser for one side of an equation.
//!
//! Evaluates directly into a [`RatFn`] while parsing. Accepts numbers,
//! identifiers, `+ - * /`, unary signs, parentheses and `^`/`**` powers.

use super::EqError;
use super::polynomial::RatFn;
use super::rational::Rational;

/// Largest exponent magnitude accepted in `x**n`.
const MAX_EXPONENT: i128 = 64;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

/// Whether `s` is a valid variable name.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn tokenize(input: &str) -> Result<Vec<Token>, EqError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let next = chars.get(i + 1).copied();
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            '+' => { tokens.push(Token::Plus); i += 1; }
            '-' => { tokens.push(Token::Minus); i += 1; }
            '*' if next == Some('*') => { tokens.push(Token::Caret); i += 2; }
            '*' => { tokens.push(Token::Star); i += 1; }
            '/' => { tokens.push(Token::Slash); i += 1; }
            '^' => { tokens.push(Token::Caret); i += 1; }
            '(' => { tokens.push(Token::LParen); i += 1; }
            ')' => { tokens.push(Token::RParen); i += 1; }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                tokens.push(Token::Number(chars[start..i].iter().collect()));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            c => return Err(EqError::ParseFailed(format!("Unexpected character '{c}'"))),
        }
    }

    Ok(tokens)
}

/// Parse and reduce an algebraic expression.
pub fn parse_expression(input: &str) -> Result<RatFn, EqError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(EqError::ParseFailed("Empty side of equation".into()));
    }
    let mut parser = Parser { tokens: &tokens, pos: 0 };
    let value = parser.parse_expr()?;
    match parser.peek() {
        None => Ok(value),
        Some(Token::Number(_) | Token::Ident(_) | Token::LParen) => Err(EqError::ParseFailed(
            "Implicit multiplication is not supported; write '2*x' instead of '2x'".into(),
        )),
        Some(tok) => Err(EqError::ParseFailed(format!("Unexpected token {tok:?}"))),
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    // expr = term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<RatFn, EqError> {
        let mut left = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.consume();
                    left = left.checked_add(&self.parse_term()?)?;
                }
                Some(Token::Minus) => {
                    self.consume();
                    left = left.checked_sub(&self.parse_term()?)?;
                }
                _ => return Ok(left),
            }
        }
    }

    // term = unary (('*' | '/') unary)*
    fn parse_term(&mut self) -> Result<RatFn, EqError> {
        let mut left = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.consume();
                    left = left.checked_mul(&self.parse_unary()?)?;
                }
                Some(Token::Slash) => {
                    self.consume();
                    left = left.checked_div(&self.parse_unary()?)?;
                }
                _ => return Ok(left),
            }
        }
    }

    // unary = ('+' | '-') unary | power
    fn parse_unary(&mut self) -> Result<RatFn, EqError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.consume();
                self.parse_unary()?.checked_neg()
            }
            Some(Token::Plus) => {
                self.consume();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    // power = primary (('^' | '**') unary)?
    fn parse_power(&mut self) -> Result<RatFn, EqError> {
        let base = self.parse_primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.consume();
            let exponent = self.parse_unary()?;
            return base.checked_pow(integer_exponent(&exponent)?);
        }
        Ok(base)
    }

    // primary = NUMBER | IDENT | '(' expr ')'
    fn parse_primary(&mut self) -> Result<RatFn, EqError> {
        match self.consume() {
            Some(Token::Number(text)) => Rational::parse_decimal(text)
                .map(RatFn::constant)
                .ok_or_else(|| EqError::ParseFailed(format!("Invalid number '{text}'"))),
            Some(Token::Ident(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    return Err(EqError::ParseFailed(format!(
                        "Function calls such as '{name}(...)' are not supported"
                    )));
                }
                Ok(RatFn::var(name))
            }
            Some(Token::LParen) => {
                let value = self.parse_expr()?;
                match self.consume() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(EqError::ParseFailed("Expected closing parenthesis".into())),
                }
            }
            Some(tok) => Err(EqError::ParseFailed(format!("Unexpected token {tok:?}"))),
            None => Err(EqError::ParseFailed("Unexpected end of expression".into())),
        }
    }
}

fn integer_exponent(exponent: &RatFn) -> Result<i64, EqError> {
    let value = exponent
        .as_constant()
        .filter(|r| r.is_integer())
        .ok_or_else(|| EqError::Unsolvable("only integer exponents are supported".into()))?;
    if value.numer().abs() > MAX_EXPONENT {
        return Err(EqError::Unsolvable(format!(
            "exponent {value} exceeds the supported range of ±{MAX_EXPONENT}"
        )));
    }
    i64::try_from(value.numer()).map_err(|_| EqError::Unsolvable("exponent out of range".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show(input: &str) -> String {
        parse_expression(input).unwrap().to_string()
    }

    #[test]
    fn expands_products_and_powers() {
        assert_eq!(show("(x + 1)^2"), "x**2 + 2*x + 1");
        assert_eq!(show("(x + 1)**2"), "x**2 + 2*x + 1");
        assert_eq!(show("2*x + 5 - 11"), "2*x - 6");
    }

    #[test]
    fn decimals_are_exact() {
        assert_eq!(show("0.1 + 0.2"), "3/10");
    }

    #[test]
    fn unary_minus_binds_looser_than_power() {
        assert_eq!(show("-x^2"), "-x**2");
        assert_eq!(show("2^-1"), "1/2");
    }

    #[test]
    fn division_builds_rational_functions() {
        assert_eq!(show("1/x"), "1/x");
        assert_eq!(show("(x^2 - 1)/2"), "x**2/2 - 1/2");
        assert_eq!(show("(a*b)/a"), "b");
    }

    #[test]
    fn rejects_unsupported_syntax() {
        assert!(matches!(parse_expression("2x"), Err(EqError::ParseFailed(_))));
        assert!(matches!(parse_expression("sin(x)"), Err(EqError::ParseFailed(_))));
        assert!(matches!(parse_expression("x $ 2"), Err(EqError::ParseFailed(_))));
        assert!(matches!(parse_expression("(x + 1"), Err(EqError::ParseFailed(_))));
        assert!(matches!(parse_expression(""), Err(EqError::ParseFailed(_))));
    }

    #[test]
    fn rejects_unsupported_exponents() {
        assert!(matches!(parse_expression("x^0.5"), Err(EqError::Unsolvable(_))));
        assert!(matches!(parse_expression("2^x"), Err(EqError::Unsolvable(_))));
        assert!(matches!(parse_expression("x^100"), Err(EqError::Unsolvable(_))));
        assert!(matches!(parse_expression("1/0"), Err(EqError::Unsolvable(_))));
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("x"));
        assert!(is_identifier("v_0"));
        assert!(!is_identifier("2x"));
        assert!(!is_identifier(""));
    }
}
