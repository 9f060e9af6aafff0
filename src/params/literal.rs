//! Bounded literal parser for structured parameter values.
//!
//! Some hyperparameters are written as literals rather than scalars:
//! `class_weight={0: 1, 1: 5}` or a search list `max_depth=[3, 5, 7]`.
//! This parser accepts exactly that vocabulary and nothing else:
//!
//! ```text
//! value   := null | bool | number | string | list | tuple | map
//! null    := "None" | "null"
//! bool    := "True" | "true" | "False" | "false"
//! number  := [+-]? digits ("." digits)? ([eE] [+-]? digits)?
//! string  := '...' | "..."          (backslash escapes)
//! list    := "[" (value ("," value)* ","?)? "]"
//! tuple   := "(" value "," ... ")"  (a single parenthesised value is just the value)
//! map     := "{" (scalar ":" value ("," ...)* ","?)? "}"
//! ```
//!
//! Containers nest at most [`MAX_DEPTH`] levels. There are no names,
//! operators or calls.

use thiserror::Error;

use super::value::ParamValue;

/// Maximum container nesting.
pub const MAX_DEPTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

/// Parse a complete literal. Surrounding whitespace is ignored; anything
/// after the literal is an error.
pub fn parse_literal(input: &str) -> Result<ParamValue, LiteralError> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
    };
    parser.skip_ws();
    if parser.at_end() {
        return Err(parser.error("empty literal"));
    }
    let value = parser.value(0)?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(parser.error("unexpected trailing characters"));
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, want: char) -> Result<(), LiteralError> {
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => {
                self.pos -= 1;
                Err(self.error(format!("expected '{}', found '{}'", want, c)))
            }
            None => Err(self.error(format!("expected '{}', found end of input", want))),
        }
    }

    fn value(&mut self, depth: usize) -> Result<ParamValue, LiteralError> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some('[') => self.sequence(depth, ']').map(ParamValue::List),
            Some('(') => self.parenthesised(depth),
            Some('{') => self.map(depth),
            Some(q @ ('\'' | '"')) => self.string(q).map(ParamValue::Str),
            Some(c) if c.is_ascii_digit() || matches!(c, '+' | '-' | '.') => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.word(),
            Some(c) => Err(self.error(format!("unexpected character '{}'", c))),
        }
    }

    fn enter(&self, depth: usize) -> Result<usize, LiteralError> {
        if depth >= MAX_DEPTH {
            return Err(self.error(format!("nesting deeper than {} levels", MAX_DEPTH)));
        }
        Ok(depth + 1)
    }

    /// Comma-separated values up to `close`. Consumes the opening bracket.
    fn sequence(&mut self, depth: usize, close: char) -> Result<Vec<ParamValue>, LiteralError> {
        let depth = self.enter(depth)?;
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(items);
            }
            items.push(self.value(depth)?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(c) if c == close => {}
                _ => return Err(self.error(format!("expected ',' or '{}'", close))),
            }
        }
    }

    /// `(x)` is `x`; `(x,)`, `(x, y)` and `()` are lists.
    fn parenthesised(&mut self, depth: usize) -> Result<ParamValue, LiteralError> {
        let start = self.pos;
        let inner_depth = self.enter(depth)?;
        self.pos += 1;
        self.skip_ws();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(ParamValue::List(Vec::new()));
        }
        let first = self.value(inner_depth)?;
        self.skip_ws();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(first);
        }
        self.pos = start;
        self.sequence(depth, ')').map(ParamValue::List)
    }

    fn map(&mut self, depth: usize) -> Result<ParamValue, LiteralError> {
        let depth = self.enter(depth)?;
        self.pos += 1;
        let mut pairs: Vec<(ParamValue, ParamValue)> = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(ParamValue::Map(pairs));
            }
            let key_pos = self.pos;
            let key = self.value(depth)?;
            if !key.is_scalar() {
                self.pos = key_pos;
                return Err(self.error("map keys must be scalars"));
            }
            self.skip_ws();
            self.expect(':')?;
            let value = self.value(depth)?;
            match pairs.iter_mut().find(|(k, _)| *k == key) {
                Some((_, slot)) => *slot = value,
                None => pairs.push((key, value)),
            }
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {}
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<String, LiteralError> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    None => return Err(self.error("unterminated string")),
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some(c @ ('\\' | '\'' | '"')) => out.push(c),
                    Some(c) => {
                        out.push('\\');
                        out.push(c);
                    }
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn number(&mut self) -> Result<ParamValue, LiteralError> {
        let start = self.pos;
        if matches!(self.peek(), Some('+' | '-')) {
            self.pos += 1;
        }
        let mut is_float = false;
        let mut digits = 0;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits += 1;
            } else if c == '.' && !is_float {
                is_float = true;
            } else {
                break;
            }
            self.pos += 1;
        }
        if digits == 0 {
            self.pos = start;
            return Err(self.error("malformed number"));
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            is_float = true;
            self.pos += 1;
            if matches!(self.peek(), Some('+' | '-')) {
                self.pos += 1;
            }
            let exp_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
            if self.pos == exp_start {
                return Err(self.error("malformed exponent"));
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        if is_float {
            text.parse::<f64>()
                .map(ParamValue::Float)
                .map_err(|_| self.error(format!("invalid float '{}'", text)))
        } else {
            text.parse::<i64>()
                .map(ParamValue::Int)
                .map_err(|_| self.error(format!("integer '{}' out of range", text)))
        }
    }

    fn word(&mut self) -> Result<ParamValue, LiteralError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "None" | "null" => Ok(ParamValue::Null),
            "True" | "true" => Ok(ParamValue::Bool(true)),
            "False" | "false" => Ok(ParamValue::Bool(false)),
            _ => {
                self.pos = start;
                Err(self.error(format!("unknown name '{}'", word)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> ParamValue {
        ParamValue::List(values.iter().copied().map(ParamValue::Int).collect())
    }

    #[test]
    fn test_scalars() {
        assert_eq!(parse_literal("42"), Ok(ParamValue::Int(42)));
        assert_eq!(parse_literal("-7"), Ok(ParamValue::Int(-7)));
        assert_eq!(parse_literal("0.25"), Ok(ParamValue::Float(0.25)));
        assert_eq!(parse_literal("1e-3"), Ok(ParamValue::Float(0.001)));
        assert_eq!(parse_literal(".5"), Ok(ParamValue::Float(0.5)));
        assert_eq!(parse_literal(" True "), Ok(ParamValue::Bool(true)));
        assert_eq!(parse_literal("None"), Ok(ParamValue::Null));
        assert_eq!(parse_literal("'gbdt'"), Ok(ParamValue::from("gbdt")));
        assert_eq!(parse_literal(r#""a\"b""#), Ok(ParamValue::from("a\"b")));
    }

    #[test]
    fn test_lists_and_tuples() {
        assert_eq!(parse_literal("[1,2,3]"), Ok(ints(&[1, 2, 3])));
        assert_eq!(parse_literal("[1, 2, ]"), Ok(ints(&[1, 2])));
        assert_eq!(parse_literal("(1, 2)"), Ok(ints(&[1, 2])));
        assert_eq!(parse_literal("(1,)"), Ok(ints(&[1])));
        assert_eq!(parse_literal("()"), Ok(ints(&[])));
        // A parenthesised value is not a tuple
        assert_eq!(parse_literal("(5)"), Ok(ParamValue::Int(5)));
        assert_eq!(
            parse_literal("['l1', 'l2']"),
            Ok(ParamValue::List(vec!["l1".into(), "l2".into()]))
        );
    }

    #[test]
    fn test_maps() {
        assert_eq!(
            parse_literal("{0: 1, 1: 5.5}"),
            Ok(ParamValue::Map(vec![
                (ParamValue::Int(0), ParamValue::Int(1)),
                (ParamValue::Int(1), ParamValue::Float(5.5)),
            ]))
        );
        assert_eq!(parse_literal("{}"), Ok(ParamValue::Map(Vec::new())));
        assert!(parse_literal("{[1]: 2}").is_err());
    }

    #[test]
    fn test_list_of_maps() {
        let value = parse_literal("[{0: 1, 1: 2}, 'balanced', None]").unwrap();
        let ParamValue::List(items) = value else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(items[1], ParamValue::from("balanced"));
        assert_eq!(items[2], ParamValue::Null);
    }

    #[test]
    fn test_rejects_expressions() {
        assert!(parse_literal("balanced").is_err());
        assert!(parse_literal("__import__('os')").is_err());
        assert!(parse_literal("1 + 2").is_err());
        assert!(parse_literal("[1, 2").is_err());
        assert!(parse_literal("'open").is_err());
        assert!(parse_literal("").is_err());
        assert!(parse_literal("   ").is_err());
    }

    #[test]
    fn test_depth_limit() {
        assert!(parse_literal("[[[[1]]]]").is_ok());
        assert!(parse_literal("[[[[[1]]]]]").is_err());
    }

    #[test]
    fn test_error_reports_offset() {
        let err = parse_literal("[1, @]").unwrap_err();
        assert_eq!(err.offset, 4);
    }
}
