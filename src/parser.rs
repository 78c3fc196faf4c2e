// src/parser.rs
use crate::errors::SyntaxError;

/// Character scanner shared by the expression grammar.
pub struct Parser<'a> {
    s: &'a str,
    i: usize,
}

impl<'a> Parser<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    /// Build a diagnostic anchored at the current position.
    pub fn error(&self, msg: impl Into<String>) -> SyntaxError {
        SyntaxError::new(self.column(), msg)
    }

    /// Current position counted in characters.
    pub fn column(&self) -> usize {
        self.s[..self.i].chars().count()
    }

    /// `[A-Za-z_][A-Za-z0-9_-]*`
    pub fn parse_identifier(&mut self) -> Result<&'a str, SyntaxError> {
        let start = self.i;
        match self.peek_char() {
            Some(c) if c == '_' || c.is_ascii_alphabetic() => self.i += 1,
            Some(c) => return Err(self.error(format!("identifier expected, found '{c}'"))),
            None => return Err(self.error("identifier expected, found end of input")),
        }
        while let Some(c) = self.peek_char() {
            if c == '_' || c == '-' || c.is_ascii_alphanumeric() {
                self.i += 1;
            } else {
                break;
            }
        }
        Ok(&self.s[start..self.i])
    }

    /// Raw number text: optional sign, digits, optional fraction and exponent.
    /// Conversion to int or float is left to the evaluator.
    pub fn parse_number_literal(&mut self) -> Result<&'a str, SyntaxError> {
        let start = self.i;
        self.consume_char('-');
        if self.eat_digits() == 0 {
            self.i = start;
            return Err(self.error("number expected"));
        }
        if self.peek_char() == Some('.') {
            self.i += 1;
            if self.eat_digits() == 0 {
                return Err(self.error("digits expected after '.'"));
            }
        }
        if matches!(self.peek_char(), Some('e') | Some('E')) {
            self.i += 1;
            if !self.consume_char('+') {
                self.consume_char('-');
            }
            if self.eat_digits() == 0 {
                return Err(self.error("digits expected in exponent"));
            }
        }
        Ok(&self.s[start..self.i])
    }

    /// Single-quoted string, returned verbatim with its quotes. A backslash
    /// keeps the following character inside the literal; nothing is unescaped.
    pub fn parse_quoted_string(&mut self) -> Result<&'a str, SyntaxError> {
        let start = self.i;
        if !self.consume_char('\'') {
            return Err(self.error("expected quoted string"));
        }
        while let Some(c) = self.peek_char() {
            self.i += c.len_utf8();
            match c {
                '\'' => return Ok(&self.s[start..self.i]),
                '\\' => {
                    if let Some(nc) = self.peek_char() {
                        self.i += nc.len_utf8();
                    }
                }
                _ => {}
            }
        }
        Err(SyntaxError::new(
            self.s[..start].chars().count(),
            "unterminated string",
        ))
    }

    pub fn expect(&mut self, c: char) -> Result<(), SyntaxError> {
        if self.consume_char(c) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{c}'")))
        }
    }

    pub fn expect_str(&mut self, lit: &str) -> Result<(), SyntaxError> {
        if self.consume_str(lit) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{lit}'")))
        }
    }

    /// "expected X, found Y" at the current position.
    pub fn unexpected(&self, expected: &str) -> SyntaxError {
        match self.peek_char() {
            Some(c) => self.error(format!("expected {expected}, found '{c}'")),
            None => self.error(format!("expected {expected}, found end of input")),
        }
    }

    pub fn consume_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.i += c.len_utf8();
            true
        } else {
            false
        }
    }

    pub fn consume_str(&mut self, lit: &str) -> bool {
        if self.peek_str(lit) {
            self.i += lit.len();
            true
        } else {
            false
        }
    }

    pub fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }

    pub fn peek_second_char(&self) -> Option<char> {
        self.s[self.i..].chars().nth(1)
    }

    pub fn peek_str(&self, lit: &str) -> bool {
        self.s[self.i..].starts_with(lit)
    }

    /// True when the upcoming text is `word` not followed by an identifier character.
    pub fn peek_keyword(&self, word: &str) -> bool {
        self.peek_str(word)
            && !self.s[self.i + word.len()..]
                .chars()
                .next()
                .map_or(false, |c| c == '_' || c == '-' || c.is_ascii_alphanumeric())
    }

    pub fn skip_ws(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.i += c.len_utf8();
            } else {
                break;
            }
        }
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }

    fn eat_digits(&mut self) -> usize {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.i += 1;
            } else {
                break;
            }
        }
        self.i - start
    }
}
