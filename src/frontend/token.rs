use std::fmt::Display;

/// Represents the different kinds of schema tokens
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
    /// End of the source text
    Eof,
    /// A `\n`, `\r` or `\r\n` line break
    Eol,
    /// The `table` keyword
    Table,
    /// The `end` keyword
    End,
    /// The `set` keyword
    Set,
    LeftParen,
    RightParen,
    Comma,
    /// `@name`, the literal holds the name without the marker
    Attribute,
    /// Table, column, type and configuration names
    Identifier,
    /// `"..."`
    String,
    /// `` `...` ``
    Raw,
    Number,
    /// Any character the grammar has no use for
    Illegal,
}

/// A lexical token with the 1-based position of its first character
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            literal: literal.into(),
            line,
            column,
        }
    }

    /// Maps a scanned word to its keyword kind, or to an identifier
    pub fn word(literal: String, line: usize, column: usize) -> Self {
        let kind = match literal.as_str() {
            "table" => TokenKind::Table,
            "end" => TokenKind::End,
            "set" => TokenKind::Set,
            _ => TokenKind::Identifier,
        };
        Self::new(kind, literal, line, column)
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "EOF"),
            TokenKind::Eol => write!(f, "EOL"),
            TokenKind::Attribute => write!(f, "@{}", self.literal),
            TokenKind::String => write!(f, "\"{}\"", self.literal),
            TokenKind::Raw => write!(f, "`{}`", self.literal),
            _ => write!(f, "{}", self.literal),
        }
    }
}
