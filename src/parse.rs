//! Reader for Lua table constructors.
//!
//! Covers the subset of Lua that description files are written in: an
//! optional leading `return`, nested table constructors, string, number and
//! boolean literals, `nil`, unary minus on numbers, `..` between string
//! literals, and `--` comments. Anything executable is a parse error.

use crate::error::ParseError;
use crate::value::{Key, Table, Value};

type Result<T> = std::result::Result<T, ParseError>;

/// Parse a complete description file into a value.
pub fn parse(input: &str) -> Result<Value> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_chunk()
}

// -- Lexer --------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Str(String),
    Int(i64),
    Float(f64),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Assign,
    Comma,
    Semicolon,
    Minus,
    Concat,
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Name(n) => format!("`{}`", n),
            Token::Str(_) => "string".to_string(),
            Token::Int(_) | Token::Float(_) => "number".to_string(),
            Token::LBrace => "`{`".to_string(),
            Token::RBrace => "`}`".to_string(),
            Token::LBracket => "`[`".to_string(),
            Token::RBracket => "`]`".to_string(),
            Token::Assign => "`=`".to_string(),
            Token::Comma => "`,`".to_string(),
            Token::Semicolon => "`;`".to_string(),
            Token::Minus => "`-`".to_string(),
            Token::Concat => "`..`".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            src: input.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
        }
        Some(b)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.line, message)
    }

    fn tokenize(mut self) -> Result<Vec<(Token, usize)>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let line = self.line;
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push((token, line));
            if done {
                return Ok(tokens);
            }
        }
    }

    fn skip_trivia(&mut self) -> Result<()> {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() {
                self.bump();
            } else if b == b'-' && self.peek_at(1) == Some(b'-') {
                self.pos += 2;
                if self.peek() == Some(b'[') {
                    if let Some(level) = self.long_bracket_level() {
                        self.read_long_bracket(level)?;
                        continue;
                    }
                }
                while let Some(c) = self.peek() {
                    if c == b'\n' {
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    fn next_token(&mut self) -> Result<Token> {
        let Some(b) = self.peek() else {
            return Ok(Token::Eof);
        };
        match b {
            b'{' => self.single(Token::LBrace),
            b'}' => self.single(Token::RBrace),
            b']' => self.single(Token::RBracket),
            b'=' => self.single(Token::Assign),
            b',' => self.single(Token::Comma),
            b';' => self.single(Token::Semicolon),
            b'-' => self.single(Token::Minus),
            b'[' => match self.long_bracket_level() {
                Some(level) => Ok(Token::Str(self.read_long_bracket(level)?)),
                None => self.single(Token::LBracket),
            },
            b'.' if self.peek_at(1) == Some(b'.') => {
                if self.peek_at(2) == Some(b'.') {
                    return Err(self.error("varargs are not allowed in description tables"));
                }
                self.pos += 2;
                Ok(Token::Concat)
            }
            b'.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.read_number(),
            b'0'..=b'9' => self.read_number(),
            b'"' | b'\'' => self.read_short_string(b),
            b if b.is_ascii_alphabetic() || b == b'_' => Ok(self.read_name()),
            other => Err(self.error(format!("unexpected character `{}`", other as char))),
        }
    }

    fn single(&mut self, token: Token) -> Result<Token> {
        self.pos += 1;
        Ok(token)
    }

    fn read_name(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.pos += 1;
        }
        Token::Name(String::from_utf8_lossy(&self.src[start..self.pos]).into_owned())
    }

    fn read_number(&mut self) -> Result<Token> {
        let start = self.pos;
        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x' | b'X')) {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let digits = std::str::from_utf8(&self.src[digits_start..self.pos]).unwrap_or_default();
            // Lua wraps hexadecimal integers around on overflow.
            let mut value: u64 = 0;
            if digits.is_empty() {
                return Err(self.error("malformed hexadecimal number"));
            }
            for c in digits.chars() {
                value = value.wrapping_mul(16).wrapping_add(c.to_digit(16).unwrap_or(0) as u64);
            }
            return Ok(Token::Int(value as i64));
        }

        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                b'0'..=b'9' => self.pos += 1,
                b'.' if self.peek_at(1) != Some(b'.') => {
                    is_float = true;
                    self.pos += 1;
                }
                b'e' | b'E' => {
                    is_float = true;
                    self.pos += 1;
                    if matches!(self.peek(), Some(b'+' | b'-')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
        if self.peek().is_some_and(|c| c.is_ascii_alphabetic() || c == b'_') {
            return Err(self.error("malformed number"));
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or_default();
        if !is_float {
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Token::Int(i));
            }
        }
        text.parse::<f64>()
            .map(Token::Float)
            .map_err(|_| self.error(format!("malformed number `{}`", text)))
    }

    /// At a `[`: the level of a long bracket opener (`[[`, `[==[`), if any.
    fn long_bracket_level(&self) -> Option<usize> {
        let mut offset = 1;
        while self.peek_at(offset) == Some(b'=') {
            offset += 1;
        }
        (self.peek_at(offset) == Some(b'[')).then_some(offset - 1)
    }

    fn read_long_bracket(&mut self, level: usize) -> Result<String> {
        let start_line = self.line;
        self.pos += level + 2;
        // A newline right after the opener is not part of the content.
        if matches!(self.peek(), Some(b'\n' | b'\r')) {
            self.skip_newline();
        }
        let mut out = Vec::new();
        loop {
            match self.peek() {
                None => {
                    return Err(ParseError::new(start_line, "unfinished long string"));
                }
                Some(b']') if self.closes_long_bracket(level) => {
                    self.pos += level + 2;
                    break;
                }
                Some(b'\n' | b'\r') => {
                    self.skip_newline();
                    out.push(b'\n');
                }
                Some(b) => {
                    self.pos += 1;
                    out.push(b);
                }
            }
        }
        String::from_utf8(out).map_err(|_| ParseError::new(start_line, "invalid UTF-8 in string"))
    }

    /// Consume one newline sequence (`\n`, `\r`, `\r\n` or `\n\r`).
    fn skip_newline(&mut self) {
        let first = self.peek();
        self.pos += 1;
        if matches!(self.peek(), Some(c @ (b'\n' | b'\r')) if Some(c) != first) {
            self.pos += 1;
        }
        self.line += 1;
    }

    fn closes_long_bracket(&self, level: usize) -> bool {
        (1..=level).all(|i| self.peek_at(i) == Some(b'=')) && self.peek_at(level + 1) == Some(b']')
    }

    fn read_short_string(&mut self, quote: u8) -> Result<Token> {
        let start_line = self.line;
        self.pos += 1;
        let mut out: Vec<u8> = Vec::new();
        loop {
            let Some(b) = self.peek() else {
                return Err(ParseError::new(start_line, "unfinished string"));
            };
            match b {
                b'\n' | b'\r' => {
                    return Err(ParseError::new(start_line, "unfinished string"));
                }
                b'\\' => {
                    self.pos += 1;
                    self.read_escape(&mut out)?;
                }
                _ if b == quote => {
                    self.pos += 1;
                    break;
                }
                _ => {
                    self.pos += 1;
                    out.push(b);
                }
            }
        }
        String::from_utf8(out)
            .map(Token::Str)
            .map_err(|_| ParseError::new(start_line, "invalid UTF-8 in string"))
    }

    fn read_escape(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let Some(b) = self.peek() else {
            return Err(self.error("unfinished string"));
        };
        let simple = match b {
            b'a' => Some(0x07),
            b'b' => Some(0x08),
            b'f' => Some(0x0c),
            b'n' => Some(b'\n'),
            b'r' => Some(b'\r'),
            b't' => Some(b'\t'),
            b'v' => Some(0x0b),
            b'\\' => Some(b'\\'),
            b'"' => Some(b'"'),
            b'\'' => Some(b'\''),
            _ => None,
        };
        if let Some(c) = simple {
            self.pos += 1;
            out.push(c);
            return Ok(());
        }
        match b {
            b'\n' | b'\r' => {
                self.skip_newline();
                out.push(b'\n');
            }
            b'z' => {
                self.pos += 1;
                while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
                    self.bump();
                }
            }
            b'x' => {
                self.pos += 1;
                let hex = self.take_while_max(2, |c| c.is_ascii_hexdigit());
                if hex.len() != 2 {
                    return Err(self.error("hexadecimal digit expected"));
                }
                out.push(u8::from_str_radix(&hex, 16).map_err(|_| self.error("bad \\x escape"))?);
            }
            b'u' => {
                self.pos += 1;
                if self.peek() != Some(b'{') {
                    return Err(self.error("missing `{` in \\u{xxxx}"));
                }
                self.pos += 1;
                let hex = self.take_while_max(8, |c| c.is_ascii_hexdigit());
                if self.peek() != Some(b'}') || hex.is_empty() {
                    return Err(self.error("malformed \\u{xxxx} escape"));
                }
                self.pos += 1;
                let ch = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.error("UTF-8 value too large"))?;
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
            b'0'..=b'9' => {
                let digits = self.take_while_max(3, |c| c.is_ascii_digit());
                let value: u32 = digits.parse().unwrap_or(u32::MAX);
                let byte = u8::try_from(value).map_err(|_| self.error("decimal escape too large"))?;
                out.push(byte);
            }
            other => {
                return Err(self.error(format!("invalid escape sequence `\\{}`", other as char)));
            }
        }
        Ok(())
    }

    fn take_while_max(&mut self, max: usize, pred: impl Fn(u8) -> bool) -> String {
        let start = self.pos;
        while self.pos - start < max && self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.src[start..self.pos]).into_owned()
    }
}

// -- Parser -------------------------------------------------------------------

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.pos + offset)
            .or_else(|| self.tokens.last())
            .map(|(t, _)| t)
            .unwrap_or(&Token::Eof)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, l)| *l)
            .unwrap_or(1)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.line(), message)
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        if *self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {}, found {}",
                expected.describe(),
                self.peek().describe()
            )))
        }
    }

    fn parse_chunk(&mut self) -> Result<Value> {
        if matches!(self.peek(), Token::Name(n) if n == "return") {
            self.advance();
        }
        let value = self.parse_expr()?;
        if *self.peek() == Token::Semicolon {
            self.advance();
        }
        if *self.peek() != Token::Eof {
            return Err(self.error(format!(
                "unexpected {} after value",
                self.peek().describe()
            )));
        }
        Ok(value)
    }

    fn parse_expr(&mut self) -> Result<Value> {
        let mut value = self.parse_simple()?;
        while *self.peek() == Token::Concat {
            self.advance();
            let rhs = self.parse_simple()?;
            value = match (value, rhs) {
                (Value::String(mut lhs), Value::String(rhs)) => {
                    lhs.push_str(&rhs);
                    Value::String(lhs)
                }
                _ => return Err(self.error("`..` only joins string literals")),
            };
        }
        Ok(value)
    }

    fn parse_simple(&mut self) -> Result<Value> {
        match self.advance() {
            Token::Str(s) => Ok(Value::String(s)),
            Token::Int(i) => Ok(Value::Integer(i)),
            Token::Float(f) => Ok(Value::Float(f)),
            Token::Minus => match self.advance() {
                Token::Int(i) => Ok(Value::Integer(i.wrapping_neg())),
                Token::Float(f) => Ok(Value::Float(-f)),
                other => Err(self.error(format!(
                    "unary minus needs a number, found {}",
                    other.describe()
                ))),
            },
            Token::LBrace => self.parse_table().map(Value::Table),
            Token::Name(n) => match n.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                "nil" => Ok(Value::Nil),
                _ => Err(self.error(format!("unexpected identifier `{}`", n))),
            },
            other => Err(self.error(format!("expected a value, found {}", other.describe()))),
        }
    }

    /// Called after the opening `{`.
    ///
    /// Follows Lua's constructor semantics: a `nil` field is absent, and
    /// positional items are stored after the keyed ones, so they win over an
    /// explicit `[n]` for the same index.
    fn parse_table(&mut self) -> Result<Table> {
        let mut table = Table::new();
        let mut positional = Vec::new();
        loop {
            if *self.peek() == Token::RBrace {
                self.advance();
                for (i, value) in positional.into_iter().enumerate() {
                    set_field(&mut table, Key::Index(i as i64 + 1), value);
                }
                return Ok(table);
            }

            let assigns = *self.peek_at(1) == Token::Assign;
            match self.peek().clone() {
                Token::LBracket => {
                    self.advance();
                    let key_line = self.line();
                    let key = self.parse_expr()?;
                    self.expect(Token::RBracket)?;
                    self.expect(Token::Assign)?;
                    let value = self.parse_expr()?;
                    set_field(&mut table, to_key(key, key_line)?, value);
                }
                Token::Name(name) if assigns => {
                    self.advance();
                    self.advance();
                    let value = self.parse_expr()?;
                    set_field(&mut table, Key::Name(name), value);
                }
                _ => positional.push(self.parse_expr()?),
            }

            match self.peek() {
                Token::Comma | Token::Semicolon => {
                    self.advance();
                }
                Token::RBrace => {}
                other => {
                    return Err(self.error(format!(
                        "expected `,` or `}}` in table, found {}",
                        other.describe()
                    )));
                }
            }
        }
    }
}

/// Assigning `nil` removes the field.
fn set_field(table: &mut Table, key: Key, value: Value) {
    match value {
        Value::Nil => {
            table.remove_key(&key);
        }
        value => table.insert(key, value),
    }
}

fn to_key(value: Value, line: usize) -> Result<Key> {
    match value {
        Value::String(s) => Ok(Key::Name(s)),
        Value::Integer(i) => Ok(Key::Index(i)),
        Value::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(Key::Index(f as i64)),
        Value::Float(f) if f.is_nan() => Err(ParseError::new(line, "table index is NaN")),
        Value::Float(f) => Ok(Key::Float(f)),
        Value::Bool(b) => Ok(Key::Bool(b)),
        Value::Nil => Err(ParseError::new(line, "table index is nil")),
        Value::Table(_) => Err(ParseError::new(line, "table keys cannot be tables")),
    }
}
