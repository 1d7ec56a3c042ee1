//! Lexer output

use serde::{Deserialize, Serialize};

/// Token category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    /// User identifier (`total`, `fetchUser`)
    Ident,
    /// Reserved system identifier (`$preValue`)
    SystemIdent,
    Keyword,
    /// Integer literal; `text` holds the normalized decimal digits
    Int,
    /// Decimal literal; `text` holds a string `f64::from_str` accepts
    Float,
    /// String literal; `text` holds the unescaped contents
    Str,
    /// Operators and punctuation, including brackets
    Punct,
    /// Statement boundary (newline or `;`)
    LineEnd,
    Comment,
}

/// A single lexed token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based line the token starts on
    pub line: usize,
    /// Start byte offset in the script text
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, start: usize, end: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            start,
            end,
        }
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == keyword
    }

    pub fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == punct
    }

    pub fn is_line_end(&self) -> bool {
        self.kind == TokenKind::LineEnd
    }

    /// Render the token roughly as it appeared in the source
    pub fn display_text(&self) -> String {
        match self.kind {
            TokenKind::Str => format!("{:?}", self.text),
            TokenKind::LineEnd => "⏎".to_string(),
            _ => self.text.clone(),
        }
    }
}
