use std::rc::Rc;

use crate::error::{Error, ErrorCode};
use crate::syntax::token::{Token, TokenKind};

/// Characters that terminate an identifier. Everything else that is not
/// whitespace belongs to the identifier catch-all, which is what lets
/// `+`, `!=`, `:keyword` and `mod:name` lex without special cases.
fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'[' | b']' | b'{' | b'\'' | b'"' | b';')
}

pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    file: Rc<str>,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, file: Rc<str>) -> Self {
        Self { src, bytes: src.as_bytes(), file, pos: 0, line: 1, column: 1 }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, Vec<Error>> {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        loop {
            self.skip_whitespace_and_comments();

            if self.is_at_end() {
                tokens.push(Token::new(TokenKind::Eof, self.line, self.column));
                break;
            }

            match self.next_token() {
                Ok(tok) => tokens.push(tok),
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() { Ok(tokens) } else { Err(errors) }
    }

    fn next_token(&mut self) -> Result<Token, Error> {
        let line = self.line;
        let col = self.column;

        let kind = match self.peek() {
            b'(' => {
                self.advance();
                TokenKind::LParen
            }
            b')' => {
                self.advance();
                TokenKind::RParen
            }
            quote @ (b'"' | b'\'') => {
                self.advance();
                TokenKind::StringLit(self.read_string(quote, line, col)?)
            }
            b'[' | b']' | b'{' => {
                let ch = self.advance();
                return Err(Error::new(
                    ErrorCode::L001,
                    self.file.clone(),
                    line,
                    col,
                    format!("character `{}` cannot start a token", ch as char),
                ));
            }
            _ => TokenKind::Ident(self.read_ident()),
        };

        Ok(Token::new(kind, line, col))
    }

    // ─── Primitives ──────────────────────────────────────────────────────────

    fn advance(&mut self) -> u8 {
        let b = self.bytes[self.pos];
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        b
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() { 0 } else { self.bytes[self.pos] }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn skip_whitespace_and_comments(&mut self) {
        while !self.is_at_end() {
            match self.peek() {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.advance();
                }
                b';' => self.skip_line(),
                _ => break,
            }
        }
    }

    fn skip_line(&mut self) {
        while !self.is_at_end() && self.peek() != b'\n' {
            self.advance();
        }
    }

    // ─── Readers ─────────────────────────────────────────────────────────────

    /// Contents between matching quotes, verbatim. A newline is allowed
    /// inside; only end-of-input before the closing quote is an error.
    fn read_string(&mut self, quote: u8, start_line: usize, start_col: usize) -> Result<String, Error> {
        let start = self.pos;
        while !self.is_at_end() && self.peek() != quote {
            self.advance();
        }
        if self.is_at_end() {
            return Err(Error::new(
                ErrorCode::L002,
                self.file.clone(),
                start_line,
                start_col,
                "unterminated string literal",
            ));
        }
        let s = self.src[start..self.pos].to_string();
        self.advance(); // closing quote
        Ok(s)
    }

    fn read_ident(&mut self) -> String {
        let start = self.pos;
        while !self.is_at_end() {
            let b = self.peek();
            if b.is_ascii_whitespace() || is_delimiter(b) {
                break;
            }
            self.advance();
        }
        self.src[start..self.pos].to_string()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
