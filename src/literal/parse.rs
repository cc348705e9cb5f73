use crate::literal::Literal;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

// Sign, integer or decimal part, optional exponent. `1.` and `.5` count too.
static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?")
        .expect("number pattern compiles")
});

const MAX_DEPTH: usize = 64;

/// Why a line is not a well-formed literal. Columns are 1-based characters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("unexpected character {found:?} at column {column}, expected {expected}")]
    UnexpectedChar {
        found: char,
        column: usize,
        expected: &'static str,
    },

    #[error("invalid number {text:?} at column {column}")]
    InvalidNumber { text: String, column: usize },

    #[error("unterminated string starting at column {column}")]
    UnterminatedString { column: usize },

    #[error("invalid \\{escape} escape at column {column}")]
    InvalidEscape { escape: char, column: usize },

    #[error("unknown name {name:?} at column {column}; only True, False and None are allowed")]
    UnknownIdentifier { name: String, column: usize },

    #[error("expected whitespace between the two literals at column {column}")]
    MissingSeparator { column: usize },

    #[error("literal nested too deeply at column {column}")]
    TooDeep { column: usize },

    #[error("trailing input at column {column}")]
    TrailingInput { column: usize },
}

/// Parse `text` as exactly one literal (surrounding whitespace allowed).
pub fn parse_literal(text: &str) -> Result<Literal, ParseError> {
    let mut p = Parser::new(text);
    let value = p.value()?;
    p.skip_ws();
    p.finish()?;
    Ok(value)
}

/// Parse `text` as two whitespace-separated literals, e.g. `'size' '30'`.
///
/// String literals may contain whitespace; the separator is whatever follows
/// the end of the first literal.
pub fn parse_literal_pair(text: &str) -> Result<(Literal, Literal), ParseError> {
    let mut p = Parser::new(text);
    let first = p.value()?;
    let column = p.column();
    if !p.skip_ws() {
        if p.peek().is_none() {
            return Err(ParseError::UnexpectedEnd {
                expected: "a second literal",
            });
        }
        return Err(ParseError::MissingSeparator { column });
    }
    let second = p.value()?;
    p.skip_ws();
    p.finish()?;
    Ok((first, second))
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            depth: 0,
        }
    }

    fn column(&self) -> usize {
        self.src[..self.pos].chars().count() + 1
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Returns true if any whitespace was consumed.
    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
        self.pos > start
    }

    fn finish(&self) -> Result<(), ParseError> {
        if self.pos < self.src.len() {
            return Err(ParseError::TrailingInput {
                column: self.column(),
            });
        }
        Ok(())
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        match self.peek() {
            None => ParseError::UnexpectedEnd { expected },
            Some(found) => ParseError::UnexpectedChar {
                found,
                column: self.column(),
                expected,
            },
        }
    }

    fn value(&mut self) -> Result<Literal, ParseError> {
        self.skip_ws();
        match self.peek() {
            Some('(') | Some('[') | Some('{') => {
                if self.depth >= MAX_DEPTH {
                    return Err(ParseError::TooDeep {
                        column: self.column(),
                    });
                }
                self.depth += 1;
                let out = match self.peek() {
                    Some('(') => self.tuple(),
                    Some('[') => self.list(),
                    _ => self.dict(),
                };
                self.depth -= 1;
                out
            }
            Some('\'') | Some('"') => self.string(),
            Some(c) if c.is_ascii_digit() || c == '+' || c == '-' || c == '.' => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.identifier(),
            _ => Err(self.unexpected("a literal")),
        }
    }

    fn number(&mut self) -> Result<Literal, ParseError> {
        let column = self.column();
        let rest = &self.src[self.pos..];
        let invalid = || ParseError::InvalidNumber {
            text: rest
                .chars()
                .take_while(|c| !c.is_whitespace() && !",:)]}".contains(*c))
                .collect(),
            column,
        };

        let text = NUMBER_RE.find(rest).ok_or_else(invalid)?.as_str();
        self.pos += text.len();

        // `12abc` or `1.2.3` must not silently parse as a prefix.
        if let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                return Err(invalid());
            }
        }

        if text.contains(['.', 'e', 'E']) {
            return text.parse::<f64>().map(Literal::Float).map_err(|_| invalid());
        }
        match text.parse::<i64>() {
            Ok(i) => Ok(Literal::Int(i)),
            // Out of i64 range: keep the magnitude as a float.
            Err(_) => text.parse::<f64>().map(Literal::Float).map_err(|_| invalid()),
        }
    }

    fn string(&mut self) -> Result<Literal, ParseError> {
        let column = self.column();
        let quote = self.bump().ok_or(ParseError::UnexpectedEnd {
            expected: "a string",
        })?;

        let mut out = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(ParseError::UnterminatedString { column }),
                Some(c) if c == quote => break,
                Some('\\') => {
                    let escape_column = self.column();
                    match self.bump() {
                        None => return Err(ParseError::UnterminatedString { column }),
                        Some('\\') => out.push('\\'),
                        Some('\'') => out.push('\''),
                        Some('"') => out.push('"'),
                        Some('n') => out.push('\n'),
                        Some('r') => out.push('\r'),
                        Some('t') => out.push('\t'),
                        Some('0') => out.push('\0'),
                        Some('\n') => {}
                        Some('x') => out.push(self.hex_escape('x', 2, escape_column)?),
                        Some('u') => out.push(self.hex_escape('u', 4, escape_column)?),
                        // Unknown escapes stay verbatim, e.g. Windows paths.
                        Some(other) => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                Some(c) => out.push(c),
            }
        }
        Ok(Literal::Str(out))
    }

    fn hex_escape(&mut self, escape: char, digits: usize, column: usize) -> Result<char, ParseError> {
        let mut code = 0u32;
        for _ in 0..digits {
            let d = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or(ParseError::InvalidEscape { escape, column })?;
            code = code * 16 + d;
        }
        char::from_u32(code).ok_or(ParseError::InvalidEscape { escape, column })
    }

    fn identifier(&mut self) -> Result<Literal, ParseError> {
        let column = self.column();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !(c.is_alphanumeric() || c == '_') {
                break;
            }
            self.pos += c.len_utf8();
        }
        match &self.src[start..self.pos] {
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            "None" => Ok(Literal::None),
            name => Err(ParseError::UnknownIdentifier {
                name: name.to_string(),
                column,
            }),
        }
    }

    /// `()` is the empty tuple, `(x)` is just `x`, `(x,)` is a one-tuple.
    fn tuple(&mut self) -> Result<Literal, ParseError> {
        self.bump();
        self.skip_ws();
        if self.peek() == Some(')') {
            self.bump();
            return Ok(Literal::Tuple(Vec::new()));
        }

        let first = self.value()?;
        self.skip_ws();
        match self.peek() {
            Some(')') => {
                self.bump();
                return Ok(first);
            }
            Some(',') => {
                self.bump();
            }
            _ => return Err(self.unexpected("',' or ')'")),
        }

        let mut items = vec![first];
        items.extend(self.items(')', "',' or ')'")?);
        Ok(Literal::Tuple(items))
    }

    fn list(&mut self) -> Result<Literal, ParseError> {
        self.bump();
        Ok(Literal::List(self.items(']', "',' or ']'")?))
    }

    /// Comma-separated values up to and including `close`; trailing comma ok.
    fn items(&mut self, close: char, expected: &'static str) -> Result<Vec<Literal>, ParseError> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.bump();
                return Ok(items);
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(c) if c == close => {
                    self.bump();
                    return Ok(items);
                }
                _ => return Err(self.unexpected(expected)),
            }
        }
    }

    fn dict(&mut self) -> Result<Literal, ParseError> {
        self.bump();
        let mut entries = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.bump();
                return Ok(Literal::Dict(entries));
            }
            let key = self.value()?;
            self.skip_ws();
            if self.peek() != Some(':') {
                return Err(self.unexpected("':'"));
            }
            self.bump();
            let value = self.value()?;
            entries.push((key, value));

            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some('}') => {
                    self.bump();
                    return Ok(Literal::Dict(entries));
                }
                _ => return Err(self.unexpected("',' or '}'")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn s(v: &str) -> Literal {
        Literal::Str(v.to_string())
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_literal("42"), Ok(Literal::Int(42)));
        assert_eq!(parse_literal("-7"), Ok(Literal::Int(-7)));
        assert_eq!(parse_literal("+3"), Ok(Literal::Int(3)));
        assert_eq!(parse_literal("1.500000"), Ok(Literal::Float(1.5)));
        assert_eq!(parse_literal(".5"), Ok(Literal::Float(0.5)));
        assert_eq!(parse_literal("2."), Ok(Literal::Float(2.0)));
        assert_eq!(parse_literal("1e3"), Ok(Literal::Float(1000.0)));
        assert_eq!(parse_literal("-2.5E-1"), Ok(Literal::Float(-0.25)));
        assert_eq!(
            parse_literal("99999999999999999999"),
            Ok(Literal::Float(1e20))
        );
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert!(matches!(
            parse_literal("12abc"),
            Err(ParseError::InvalidNumber { column: 1, .. })
        ));
        assert!(matches!(
            parse_literal("1.2.3"),
            Err(ParseError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_literal("-"),
            Err(ParseError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn strings_and_escapes() {
        assert_eq!(parse_literal("'Montage'"), Ok(s("Montage")));
        assert_eq!(parse_literal(r#""it's""#), Ok(s("it's")));
        assert_eq!(parse_literal(r"'a\tb\n'"), Ok(s("a\tb\n")));
        assert_eq!(parse_literal(r"'\x41\u00e9'"), Ok(s("Aé")));
        assert_eq!(parse_literal(r"'C:\dags'"), Ok(s(r"C:\dags")));
        assert_eq!(
            parse_literal("'open"),
            Err(ParseError::UnterminatedString { column: 1 })
        );
        assert_eq!(
            parse_literal(r"'\xZZ'"),
            Err(ParseError::InvalidEscape {
                escape: 'x',
                column: 3
            })
        );
    }

    #[test]
    fn names() {
        assert_eq!(parse_literal("True"), Ok(Literal::Bool(true)));
        assert_eq!(parse_literal("None"), Ok(Literal::None));
        assert_eq!(
            parse_literal("__import__('os')"),
            Err(ParseError::UnknownIdentifier {
                name: "__import__".to_string(),
                column: 1
            })
        );
    }

    #[test]
    fn tuples() {
        assert_eq!(parse_literal("()"), Ok(Literal::Tuple(vec![])));
        assert_eq!(parse_literal("(1)"), Ok(Literal::Int(1)));
        assert_eq!(
            parse_literal("(1,)"),
            Ok(Literal::Tuple(vec![Literal::Int(1)]))
        );
        assert_eq!(
            parse_literal("( 'a' , 2 )"),
            Ok(Literal::Tuple(vec![s("a"), Literal::Int(2)]))
        );
    }

    #[test]
    fn lists_and_dicts_accept_trailing_commas() {
        assert_eq!(
            parse_literal("[1, 2,]"),
            Ok(Literal::List(vec![Literal::Int(1), Literal::Int(2)]))
        );
        assert_eq!(
            parse_literal("{1.000000:50.000000, 2.000000:100.000000, }"),
            Ok(Literal::Dict(vec![
                (Literal::Float(1.0), Literal::Float(50.0)),
                (Literal::Float(2.0), Literal::Float(100.0)),
            ]))
        );
        assert_eq!(parse_literal("{}"), Ok(Literal::Dict(vec![])));
    }

    #[test]
    fn power_trace_line() {
        let line = "('power cap', 100.000000, {1.000000:50.000000, })";
        assert_eq!(
            parse_literal(line),
            Ok(Literal::Tuple(vec![
                s("power cap"),
                Literal::Float(100.0),
                Literal::Dict(vec![(Literal::Float(1.0), Literal::Float(50.0))]),
            ]))
        );
    }

    #[test]
    fn expressions_are_not_literals() {
        assert_eq!(
            parse_literal("1 + 2"),
            Err(ParseError::TrailingInput { column: 3 })
        );
        assert!(matches!(
            parse_literal("[1 2]"),
            Err(ParseError::UnexpectedChar { found: '2', .. })
        ));
        assert!(matches!(
            parse_literal("{'a' 1}"),
            Err(ParseError::UnexpectedChar { found: '1', .. })
        ));
        assert_eq!(
            parse_literal(""),
            Err(ParseError::UnexpectedEnd {
                expected: "a literal"
            })
        );
    }

    #[test]
    fn deep_nesting_is_bounded() {
        let text = "[".repeat(MAX_DEPTH + 1);
        assert!(matches!(
            parse_literal(&text),
            Err(ParseError::TooDeep { .. })
        ));
    }

    #[test]
    fn pairs() {
        assert_eq!(
            parse_literal_pair("'makespan' 1234.500000"),
            Ok((s("makespan"), Literal::Float(1234.5)))
        );
        assert_eq!(
            parse_literal_pair("'application'   'Montage 25'  "),
            Ok((s("application"), s("Montage 25")))
        );
        assert_eq!(
            parse_literal_pair("'size'"),
            Err(ParseError::UnexpectedEnd {
                expected: "a second literal"
            })
        );
        assert_eq!(
            parse_literal_pair("'size''30'"),
            Err(ParseError::MissingSeparator { column: 7 })
        );
        assert_eq!(
            parse_literal_pair("'size' '30' 4"),
            Err(ParseError::TrailingInput { column: 13 })
        );
    }
}
