//! Schema Tokenizer
//!
//! Turns schema source text into a lazy stream of [`Token`]s. The tokenizer never
//! fails: anything it cannot classify becomes an [`TokenKind::Illegal`] token and
//! the parser decides what to do with it.
//!
//! # Example
//! ```ignore
//! let mut tokenizer = Tokenizer::new("table users\n");
//! assert_eq!(tokenizer.next_token().kind, TokenKind::Table);
//! ```

use super::token::{Token, TokenKind};

pub struct Tokenizer<'a> {
    source: &'a str,
    /// Byte offset of the next unread character
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Produces the next token and advances past it.
    ///
    /// Once the end of the input is reached every call returns an
    /// [`TokenKind::Eof`] token at the same position.
    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();

            let (line, column) = (self.line, self.column);
            let Some(ch) = self.current() else {
                return Token::new(TokenKind::Eof, "", line, column);
            };

            match ch {
                '\n' | '\r' => {
                    self.consume_line_break();
                    return Token::new(TokenKind::Eol, "", line, column);
                }
                '@' => {
                    self.advance();
                    match self.current() {
                        // a lone `@` is dropped
                        Some(next) if is_whitespace(next) => continue,
                        Some(next) if is_identifier_start(next) => {
                            let name = self.read_while(is_identifier_part);
                            return Token::new(TokenKind::Attribute, name, line, column);
                        }
                        _ => return Token::new(TokenKind::Illegal, "@", line, column),
                    }
                }
                '(' | ')' | ',' => {
                    self.advance();
                    let kind = match ch {
                        '(' => TokenKind::LeftParen,
                        ')' => TokenKind::RightParen,
                        _ => TokenKind::Comma,
                    };
                    return Token::new(kind, ch.to_string(), line, column);
                }
                '"' | '`' => {
                    self.advance();
                    let literal = self.read_quoted(ch);
                    let kind = if ch == '"' {
                        TokenKind::String
                    } else {
                        TokenKind::Raw
                    };
                    return Token::new(kind, literal, line, column);
                }
                c if is_identifier_start(c) => {
                    let word = self.read_while(is_identifier_part);
                    return Token::word(word, line, column);
                }
                c if c.is_ascii_digit() => {
                    let number = self.read_while(|c| c.is_ascii_digit());
                    return Token::new(TokenKind::Number, number, line, column);
                }
                c => {
                    self.advance();
                    return Token::new(TokenKind::Illegal, c.to_string(), line, column);
                }
            }
        }
    }

    /// Returns the next token without consuming it
    pub fn peek_token(&mut self) -> Token {
        let saved = (self.pos, self.line, self.column);
        let token = self.next_token();
        (self.pos, self.line, self.column) = saved;
        token
    }

    fn current(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current()?;
        self.pos += ch.len_utf8();
        self.column += 1;
        Some(ch)
    }

    fn new_line(&mut self) {
        self.line += 1;
        self.column = 1;
    }

    /// Consumes `\n`, `\r` or `\r\n` as a single line break
    fn consume_line_break(&mut self) {
        if self.advance() == Some('\r') && self.current() == Some('\n') {
            self.advance();
        }
        self.new_line();
    }

    fn skip_whitespace(&mut self) {
        while self.current().is_some_and(is_whitespace) {
            self.advance();
        }
    }

    fn read_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.current().is_some_and(&accept) {
            self.advance();
        }
        self.source[start..self.pos].to_string()
    }

    /// Reads up to the closing delimiter. Reaching the end of the input first
    /// returns what was read so far.
    fn read_quoted(&mut self, delimiter: char) -> String {
        let mut value = String::new();

        while let Some(ch) = self.current() {
            if ch == delimiter {
                self.advance();
                break;
            }

            if ch == '\n' || ch == '\r' {
                let start = self.pos;
                self.consume_line_break();
                value.push_str(&self.source[start..self.pos]);
            } else {
                self.advance();
                value.push(ch);
            }
        }

        value
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    /// Yields every token before end-of-file
    fn next(&mut self) -> Option<Token> {
        let token = self.next_token();
        (!token.is(TokenKind::Eof)).then_some(token)
    }
}

fn is_whitespace(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_identifier_part(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}
