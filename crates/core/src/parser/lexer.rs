//! PDF tokenizer.
//!
//! Splits PDF object syntax into tokens: numbers, names, strings,
//! keywords and the structural delimiters `[ ] << >>`.

use crate::error::{PdfError, Result};

/// PDF token types
#[derive(Debug, Clone, PartialEq)]
pub enum PSToken {
    /// Integer value
    Int(i64),
    /// Floating point value
    Real(f64),
    /// Boolean value
    Bool(bool),
    /// Literal name (e.g., /Name)
    Literal(String),
    /// Keyword/operator (e.g., obj, R, stream) and delimiters
    Keyword(Vec<u8>),
    /// String (literal or hex)
    String(Vec<u8>),
}

/// Check if byte is whitespace
pub(crate) const fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\x00' | b'\x0c')
}

/// Check if byte is delimiter
pub(crate) const fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// Base tokenizer over a byte slice.
pub struct PSBaseParser<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PSBaseParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current position in stream
    pub fn tell(&self) -> usize {
        self.pos
    }

    /// Set current position in stream.
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    /// Get remaining unparsed data
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Peek at current byte without advancing
    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Peek at byte at offset from current position
    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.data.get(self.pos + offset).copied()
    }

    /// Advance position by one
    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    /// Skip whitespace and comments
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if is_whitespace(b) {
                self.advance();
            } else if b == b'%' {
                while let Some(c) = self.advance() {
                    if c == b'\r' || c == b'\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    /// Parse a literal name (/Name)
    fn parse_literal(&mut self) -> PSToken {
        self.advance(); // Skip '/'
        let mut name = Vec::new();

        while let Some(b) = self.peek() {
            if is_whitespace(b) || is_delimiter(b) {
                break;
            }
            self.advance();
            if b == b'#'
                && let (Some(c1), Some(c2)) = (self.peek(), self.peek_at(1))
                && let (Some(h), Some(l)) = (hex_nibble(c1), hex_nibble(c2))
            {
                self.pos += 2;
                name.push((h << 4) | l);
                continue;
            }
            name.push(b);
        }

        let name = match String::from_utf8(name) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        };
        PSToken::Literal(name)
    }

    /// Parse a number (integer or real)
    fn parse_number(&mut self) -> Result<PSToken> {
        let start = self.pos;
        let mut has_dot = false;

        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            self.advance();
        }

        while let Some(b) = self.peek() {
            if b.is_ascii_digit() {
                self.advance();
            } else if b == b'.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        let s = std::str::from_utf8(&self.data[start..self.pos]).map_err(|_| {
            PdfError::TokenError {
                pos: start,
                msg: "invalid number".into(),
            }
        })?;

        if has_dot {
            // "5." and "-.5" are valid PDF reals; Rust needs a digit on both sides
            let normalized = normalize_real(s);
            let val: f64 = normalized.parse().map_err(|_| PdfError::TokenError {
                pos: start,
                msg: format!("invalid real: {}", s),
            })?;
            Ok(PSToken::Real(val))
        } else {
            match s.parse::<i64>() {
                Ok(val) => Ok(PSToken::Int(val)),
                // Out-of-range integers degrade to reals instead of failing
                Err(_) => s
                    .parse::<f64>()
                    .map(PSToken::Real)
                    .map_err(|_| PdfError::TokenError {
                        pos: start,
                        msg: format!("invalid int: {}", s),
                    }),
            }
        }
    }

    /// Parse a literal string (...)
    fn parse_string(&mut self) -> Result<PSToken> {
        self.advance(); // Skip '('
        let mut result = Vec::new();
        let mut depth = 1;

        while depth > 0 {
            match self.advance() {
                Some(b'(') => {
                    depth += 1;
                    result.push(b'(');
                }
                Some(b')') => {
                    depth -= 1;
                    if depth > 0 {
                        result.push(b')');
                    }
                }
                Some(b'\\') => match self.advance() {
                    Some(b'n') => result.push(b'\n'),
                    Some(b'r') => result.push(b'\r'),
                    Some(b't') => result.push(b'\t'),
                    Some(b'b') => result.push(0x08),
                    Some(b'f') => result.push(0x0c),
                    Some(b'\r') => {
                        // Line continuation
                        if self.peek() == Some(b'\n') {
                            self.advance();
                        }
                    }
                    Some(b'\n') => {}
                    Some(c) if (b'0'..b'8').contains(&c) => {
                        let mut octal = (c - b'0') as u32;
                        for _ in 0..2 {
                            match self.peek() {
                                Some(d) if (b'0'..b'8').contains(&d) => {
                                    self.advance();
                                    octal = octal * 8 + (d - b'0') as u32;
                                }
                                _ => break,
                            }
                        }
                        result.push((octal & 0xFF) as u8);
                    }
                    // \( \) \\ and unknown escapes keep the character
                    Some(c) => result.push(c),
                    None => return Err(PdfError::UnexpectedEof),
                },
                Some(b'\r') => {
                    // Bare EOL markers inside strings read as a single \n
                    if self.peek() == Some(b'\n') {
                        self.advance();
                    }
                    result.push(b'\n');
                }
                Some(c) => result.push(c),
                None => return Err(PdfError::UnexpectedEof),
            }
        }

        Ok(PSToken::String(result))
    }

    /// Parse a hex string <...>
    fn parse_hex_string(&mut self) -> Result<PSToken> {
        let start = self.pos;
        self.advance(); // Skip '<'
        let mut result = Vec::new();
        let mut pending: Option<u8> = None;

        loop {
            match self.advance() {
                Some(b'>') => break,
                Some(c) if is_whitespace(c) => {}
                Some(c) => {
                    let nibble = hex_nibble(c).ok_or_else(|| PdfError::TokenError {
                        pos: start,
                        msg: format!("invalid hex digit {:?}", c as char),
                    })?;
                    match pending.take() {
                        Some(high) => result.push((high << 4) | nibble),
                        None => pending = Some(nibble),
                    }
                }
                None => return Err(PdfError::UnexpectedEof),
            }
        }

        // Odd digit count: the final digit is followed by an implicit 0
        if let Some(high) = pending {
            result.push(high << 4);
        }

        Ok(PSToken::String(result))
    }

    /// Parse a keyword
    fn parse_keyword(&mut self) -> PSToken {
        let start = self.pos;

        while let Some(b) = self.peek() {
            if is_whitespace(b) || is_delimiter(b) {
                break;
            }
            self.advance();
        }
        if self.pos == start {
            // Stray delimiter such as ')' or '}'
            self.advance();
        }

        let keyword = &self.data[start..self.pos];
        match keyword {
            b"true" => PSToken::Bool(true),
            b"false" => PSToken::Bool(false),
            _ => PSToken::Keyword(keyword.to_vec()),
        }
    }

    /// Get next token with its starting position.
    pub fn next_token(&mut self) -> Option<Result<(usize, PSToken)>> {
        self.skip_whitespace();

        let token_pos = self.pos;
        let b = self.peek()?;

        let result = match b {
            b'/' => Ok(self.parse_literal()),
            b'(' => self.parse_string(),
            b'<' => {
                if self.peek_at(1) == Some(b'<') {
                    self.pos += 2;
                    Ok(PSToken::Keyword(b"<<".to_vec()))
                } else {
                    self.parse_hex_string()
                }
            }
            b'>' => {
                if self.peek_at(1) == Some(b'>') {
                    self.pos += 2;
                    Ok(PSToken::Keyword(b">>".to_vec()))
                } else {
                    self.advance();
                    Ok(PSToken::Keyword(b">".to_vec()))
                }
            }
            b'[' | b']' | b'{' | b'}' => {
                self.advance();
                Ok(PSToken::Keyword(vec![b]))
            }
            b'+' | b'-' | b'.' => {
                if matches!(self.peek_at(1), Some(c) if c.is_ascii_digit() || c == b'.') {
                    self.parse_number()
                } else {
                    Ok(self.parse_keyword())
                }
            }
            c if c.is_ascii_digit() => self.parse_number(),
            _ => Ok(self.parse_keyword()),
        };

        Some(result.map(|token| (token_pos, token)))
    }
}

fn normalize_real(s: &str) -> String {
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'+') => ("", &s[1..]),
        Some(b'-') => ("-", &s[1..]),
        _ => ("", s),
    };
    let mut out = String::with_capacity(digits.len() + 3);
    out.push_str(sign);
    if digits.starts_with('.') {
        out.push('0');
    }
    out.push_str(digits);
    if digits.ends_with('.') {
        out.push('0');
    }
    if out == "-0.0" || out.is_empty() {
        return "0".to_string();
    }
    out
}

pub(crate) const fn hex_nibble(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
