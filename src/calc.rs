//! Arithmetic evaluation for the calculation handler.
//!
//! Input is restricted to `[0-9+\-*/().]` (whitespace is stripped first) and
//! evaluated by a small recursive-descent parser. Nothing is ever handed to a
//! general-purpose evaluator.

use thiserror::Error;

/// Longest sanitized expression accepted.
pub const MAX_EXPRESSION_LEN: usize = 1_000;

/// Deepest nesting of parentheses and unary signs accepted.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("expression is empty")]
    Empty,
    #[error("expression contains unsupported characters: {0}")]
    InvalidCharacters(String),
    #[error("malformed expression at position {0}")]
    Malformed(usize),
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite number")]
    NotFinite,
    #[error("expression is longer than 1000 characters")]
    TooLong,
    #[error("expression nests deeper than 256 levels")]
    TooDeep,
}

/// Strip whitespace and reject anything outside the arithmetic whitelist.
pub fn sanitize(expression: &str) -> Result<String, CalcError> {
    let compact: String = expression.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(CalcError::Empty);
    }
    if compact.len() > MAX_EXPRESSION_LEN {
        return Err(CalcError::TooLong);
    }

    let rejected: String = compact
        .chars()
        .filter(|c| !is_allowed(*c))
        .collect();
    if !rejected.is_empty() {
        return Err(CalcError::InvalidCharacters(rejected));
    }

    Ok(compact)
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '+' | '-' | '*' | '/' | '(' | ')' | '.')
}

/// Sanitize then evaluate.
pub fn evaluate(expression: &str) -> Result<f64, CalcError> {
    let sanitized = sanitize(expression)?;
    let mut parser = Parser {
        input: sanitized.as_bytes(),
        pos: 0,
        depth: 0,
    };

    let value = parser.expr()?;
    if parser.pos != parser.input.len() {
        return Err(CalcError::Malformed(parser.pos));
    }
    if !value.is_finite() {
        return Err(CalcError::NotFinite);
    }
    Ok(value)
}

/// Render a result the way people read numbers: `4`, not `4.0`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, CalcError>) -> Result<T, CalcError> {
        if self.depth >= MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut acc = self.term()?;
        while let Some(op @ (b'+' | b'-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            if op == b'+' {
                acc += rhs;
            } else {
                acc -= rhs;
            }
        }
        Ok(acc)
    }

    fn term(&mut self) -> Result<f64, CalcError> {
        let mut acc = self.factor()?;
        while let Some(op @ (b'*' | b'/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            if op == b'*' {
                acc *= rhs;
            } else {
                if rhs == 0.0 {
                    return Err(CalcError::DivisionByZero);
                }
                acc /= rhs;
            }
        }
        Ok(acc)
    }

    fn factor(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                Ok(-self.nested(Self::factor)?)
            }
            Some(b'+') => {
                self.pos += 1;
                self.nested(Self::factor)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                let value = self.nested(Self::expr)?;
                if self.peek() != Some(b')') {
                    return Err(CalcError::Malformed(self.pos));
                }
                self.pos += 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
            _ => Err(CalcError::Malformed(self.pos)),
        }
    }

    fn number(&mut self) -> Result<f64, CalcError> {
        let start = self.pos;
        let mut seen_dot = false;
        let mut digits = 0;

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits += 1;
            } else if c == b'.' && !seen_dot {
                seen_dot = true;
            } else {
                break;
            }
            self.pos += 1;
        }

        if digits == 0 {
            return Err(CalcError::Malformed(start));
        }

        // Only ASCII digits and one dot were consumed
        let text = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| CalcError::Malformed(start))?;
        text.parse::<f64>().map_err(|_| CalcError::Malformed(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_arithmetic() {
        assert_eq!(evaluate("2 + 2"), Ok(4.0));
        assert_eq!(evaluate("2+3*4"), Ok(14.0));
        assert_eq!(evaluate("(2+3)*4"), Ok(20.0));
        assert_eq!(evaluate("10/4"), Ok(2.5));
        assert_eq!(evaluate("-3 - -2"), Ok(-1.0));
        assert_eq!(evaluate("1.5*2"), Ok(3.0));
        assert_eq!(evaluate(".5+.25"), Ok(0.75));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(evaluate("5 / 0"), Err(CalcError::DivisionByZero));
        assert_eq!(evaluate("1/(2-2)"), Err(CalcError::DivisionByZero));
    }

    #[test]
    fn test_rejects_non_arithmetic_input() {
        assert_eq!(
            evaluate("alert(1)"),
            Err(CalcError::InvalidCharacters("alert".to_string()))
        );
        assert!(matches!(evaluate("2 ** x"), Err(CalcError::InvalidCharacters(_))));
        assert!(matches!(evaluate("process.exit()"), Err(CalcError::InvalidCharacters(_))));
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(evaluate("2+"), Err(CalcError::Malformed(_))));
        assert!(matches!(evaluate("(1+2"), Err(CalcError::Malformed(_))));
        assert!(matches!(evaluate("1..2"), Err(CalcError::Malformed(_))));
        assert!(matches!(evaluate("()"), Err(CalcError::Malformed(_))));
        assert_eq!(evaluate("   "), Err(CalcError::Empty));
    }

    #[test]
    fn test_nesting_limit() {
        let ok = format!("{}1{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert_eq!(evaluate(&ok), Ok(1.0));

        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert_eq!(evaluate(&deep), Err(CalcError::TooDeep));

        let signs = format!("{}1", "-".repeat(MAX_DEPTH + 1));
        assert_eq!(evaluate(&signs), Err(CalcError::TooDeep));
    }

    #[test]
    fn test_length_limit() {
        let huge = format!("{}1{}", "(".repeat(5_000), ")".repeat(5_000));
        assert_eq!(evaluate(&huge), Err(CalcError::TooLong));
        assert_eq!(sanitize(&"1+".repeat(MAX_EXPRESSION_LEN)), Err(CalcError::TooLong));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(-12.0), "-12");
        assert_eq!(format_number(2.5), "2.5");
    }
}
