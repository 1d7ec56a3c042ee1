//! Lexer: script text → token stream
//!
//! Scanning happens in two passes. [`check_balance`] first verifies that
//! brackets nest properly and every string literal is closed, so a broken
//! script fails before a single token is produced. The scanner then walks the
//! text once, dispatching on the first character of each token.

use super::errors::{SyntaxCategory, SyntaxError};
use super::types::{Token, TokenKind};

/// Case-sensitive reserved words
pub const KEYWORDS: &[&str] = &[
    "import", "as", "declare", "run", "task", "export", "echo", "if", "else", "switch", "case",
    "default", "for", "in", "while", "break", "breakAll", "continue", "function", "return",
    "true", "false", "null",
];

/// Operators and punctuation, longest first so matching is greedy
const OPERATORS: &[&str] = &[
    "..<", "..", "==", "!=", "<=", ">=", "&&", "||", "->", "+", "-", "*", "/", "%", "<", ">",
    "=", "!", "?", "(", ")", "{", "}", "[", "]", ",", ":", ".",
];

/* ===================== Public API ===================== */

/// Tokenize a script.
///
/// Fails with a `Bracket` or `String` error before scanning when the text is
/// unbalanced, and with a `Token` error on characters or literals that cannot
/// be scanned.
pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    check_balance(source)?;
    Lexer::new(source).scan()
}

/// Verify that `{}`, `[]`, `()` nest properly and that no string literal is
/// left open (an odd number of unescaped `"`). Brackets inside strings and
/// comments are ignored.
pub fn check_balance(source: &str) -> Result<(), SyntaxError> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut line = 1;
    let mut string_opened_at: Option<usize> = None;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        if string_opened_at.is_some() {
            match c {
                '\\' => {
                    if chars.next() == Some('\n') {
                        line += 1;
                    }
                }
                '"' => string_opened_at = None,
                '\n' => line += 1,
                _ => {}
            }
            continue;
        }

        match c {
            '\n' => line += 1,
            '"' => string_opened_at = Some(line),
            '/' if chars.peek() == Some(&'/') => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if next == '\n' {
                        line += 1;
                    }
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            '(' | '[' | '{' => stack.push((c, line)),
            ')' | ']' | '}' => {
                let expected_open = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected_open => {}
                    Some((open, open_line)) => {
                        return Err(SyntaxError::new(
                            line,
                            SyntaxCategory::Bracket,
                            format!(
                                "mismatched '{}': '{}' opened on line {} is still open",
                                c, open, open_line
                            ),
                            source_line(source, line),
                            format!("close '{}' with '{}' before '{}'", open, closing_for(open), c),
                        ));
                    }
                    None => {
                        return Err(SyntaxError::new(
                            line,
                            SyntaxCategory::Bracket,
                            format!("unexpected '{}' with no matching '{}'", c, expected_open),
                            source_line(source, line),
                            format!("remove the '{}' or add the missing '{}'", c, expected_open),
                        ));
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(opened_at) = string_opened_at {
        return Err(SyntaxError::new(
            opened_at,
            SyntaxCategory::String,
            "unterminated string literal (odd number of '\"')",
            source_line(source, opened_at),
            "close the string with '\"'",
        ));
    }

    if let Some((open, open_line)) = stack.pop() {
        return Err(SyntaxError::new(
            open_line,
            SyntaxCategory::Bracket,
            format!("unclosed '{}'", open),
            source_line(source, open_line),
            format!("add the matching '{}'", closing_for(open)),
        ));
    }

    Ok(())
}

fn closing_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// The trimmed text of a 1-based source line
fn source_line(source: &str, line: usize) -> String {
    source
        .lines()
        .nth(line.saturating_sub(1))
        .unwrap_or("")
        .trim()
        .to_string()
}

/* ===================== Scanner ===================== */

struct Lexer<'s> {
    source: &'s str,
    pos: usize,
    line: usize,
    tokens: Vec<Token>,
}

impl<'s> Lexer<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            tokens: Vec::new(),
        }
    }

    fn scan(mut self) -> Result<Vec<Token>, SyntaxError> {
        while let Some(c) = self.peek() {
            let start = self.pos;
            match c {
                '\n' => {
                    self.bump();
                    self.push(TokenKind::LineEnd, "\n", start);
                    self.line += 1;
                }
                ';' => {
                    self.bump();
                    self.push(TokenKind::LineEnd, ";", start);
                }
                c if c.is_whitespace() => {
                    self.bump();
                }
                '/' if matches!(self.peek_nth(1), Some('/') | Some('*')) => self.scan_comment()?,
                c if c.is_alphabetic() || c == '_' => self.scan_identifier(TokenKind::Ident),
                '$' if self.peek_nth(1).is_some_and(|n| n.is_alphabetic() || n == '_') => {
                    self.bump();
                    self.scan_identifier(TokenKind::SystemIdent);
                }
                c if c.is_ascii_digit() => self.scan_number()?,
                '"' => self.scan_string()?,
                _ => self.scan_operator()?,
            }
        }
        Ok(self.tokens)
    }

    /* ----- character helpers ----- */

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn push(&mut self, kind: TokenKind, text: impl Into<String>, start: usize) {
        let token = Token::new(kind, text, self.line, start, self.pos);
        self.tokens.push(token);
    }

    fn error(&self, message: impl Into<String>, suggestion: impl Into<String>) -> SyntaxError {
        SyntaxError::new(
            self.line,
            SyntaxCategory::Token,
            message,
            source_line(self.source, self.line),
            suggestion,
        )
    }

    /* ----- sub-scanners ----- */

    fn scan_comment(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;
        let start_line = self.line;
        self.bump();
        if self.bump() == Some('/') {
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                self.bump();
            }
        } else {
            let mut closed = false;
            while let Some(c) = self.bump() {
                if c == '\n' {
                    self.line += 1;
                }
                if c == '*' && self.peek() == Some('/') {
                    self.bump();
                    closed = true;
                    break;
                }
            }
            if !closed {
                return Err(SyntaxError::new(
                    start_line,
                    SyntaxCategory::Token,
                    "unterminated block comment",
                    source_line(self.source, start_line),
                    "close the comment with '*/'",
                ));
            }
        }
        let text = &self.source[start..self.pos];
        self.tokens
            .push(Token::new(TokenKind::Comment, text, start_line, start, self.pos));
        Ok(())
    }

    fn scan_identifier(&mut self, kind: TokenKind) {
        // System identifiers start at the '$' that was already consumed
        let start = if kind == TokenKind::SystemIdent {
            self.pos - 1
        } else {
            self.pos
        };
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let text = &self.source[start..self.pos];
        let kind = if kind == TokenKind::Ident && KEYWORDS.contains(&text) {
            TokenKind::Keyword
        } else {
            kind
        };
        self.push(kind, text.to_string(), start);
    }

    fn scan_number(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;

        if self.peek() == Some('0') && matches!(self.peek_nth(1), Some('x') | Some('X')) {
            self.bump();
            self.bump();
            let mut digits = String::new();
            while let Some(c) = self.peek() {
                if c.is_ascii_hexdigit() {
                    digits.push(c);
                } else if c != '_' {
                    break;
                }
                self.bump();
            }
            if matches!(self.peek(), Some('L') | Some('l')) {
                self.bump();
            }
            self.reject_trailing_letters(start)?;
            let value = i64::from_str_radix(&digits, 16).map_err(|_| {
                self.error(
                    format!("invalid hex literal '{}'", &self.source[start..self.pos]),
                    "hex literals need at least one digit and must fit in 64 bits",
                )
            })?;
            self.push(TokenKind::Int, value.to_string(), start);
            return Ok(());
        }

        let mut text = String::new();
        let mut is_float = false;
        self.take_digits(&mut text);

        // A '.' followed by a digit is a decimal point; '..' is a range operator
        if self.peek() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            text.push('.');
            self.bump();
            self.take_digits(&mut text);
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            let signed = matches!(self.peek_nth(1), Some('+') | Some('-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push('e');
                self.bump();
                if signed {
                    if let Some(sign) = self.bump() {
                        text.push(sign);
                    }
                }
                self.take_digits(&mut text);
            }
        }

        match self.peek() {
            Some('L') | Some('l') => {
                if is_float {
                    return Err(self.error(
                        format!(
                            "integer suffix on decimal literal '{}'",
                            &self.source[start..=self.pos]
                        ),
                        "drop the 'L' suffix or write an integer",
                    ));
                }
                self.bump();
            }
            Some('D') | Some('d') | Some('F') | Some('f') => {
                is_float = true;
                self.bump();
            }
            _ => {}
        }
        self.reject_trailing_letters(start)?;

        if is_float {
            if text.parse::<f64>().is_err() {
                return Err(self.error(
                    format!("invalid decimal literal '{}'", &self.source[start..self.pos]),
                    "write decimals as 1.5, 2e3 or 2.5E-2",
                ));
            }
            self.push(TokenKind::Float, text, start);
        } else {
            let value = text.parse::<i64>().map_err(|_| {
                self.error(
                    format!("integer literal '{}' is out of range", &self.source[start..self.pos]),
                    "integers must fit in 64 bits; use a decimal literal for larger values",
                )
            })?;
            self.push(TokenKind::Int, value.to_string(), start);
        }
        Ok(())
    }

    fn take_digits(&mut self, into: &mut String) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                into.push(c);
            } else if c != '_' {
                break;
            }
            self.bump();
        }
    }

    fn reject_trailing_letters(&self, start: usize) -> Result<(), SyntaxError> {
        if self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            let mut end = self.pos;
            for c in self.source[self.pos..].chars() {
                if !(c.is_alphanumeric() || c == '_') {
                    break;
                }
                end += c.len_utf8();
            }
            return Err(self.error(
                format!("invalid numeric literal '{}'", &self.source[start..end]),
                "identifiers cannot start with a digit",
            ));
        }
        Ok(())
    }

    fn scan_string(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;
        let start_line = self.line;
        self.bump();
        let mut value = String::new();

        loop {
            let Some(c) = self.bump() else {
                return Err(SyntaxError::new(
                    start_line,
                    SyntaxCategory::String,
                    "unterminated string literal",
                    source_line(self.source, start_line),
                    "close the string with '\"'",
                ));
            };
            match c {
                '"' => break,
                '\n' => {
                    self.line += 1;
                    value.push('\n');
                }
                '\\' => {
                    let escaped = self.bump();
                    match escaped {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('0') => value.push('\0'),
                        Some('"') => value.push('"'),
                        Some('\'') => value.push('\''),
                        Some('\\') => value.push('\\'),
                        Some('u') => {
                            let hex: String = self.source[self.pos..].chars().take(4).collect();
                            let decoded = (hex.len() == 4)
                                .then(|| u32::from_str_radix(&hex, 16).ok())
                                .flatten()
                                .and_then(char::from_u32);
                            match decoded {
                                Some(ch) => {
                                    value.push(ch);
                                    self.pos += hex.len();
                                }
                                None => {
                                    return Err(SyntaxError::new(
                                        self.line,
                                        SyntaxCategory::String,
                                        format!("invalid unicode escape '\\u{}'", hex),
                                        source_line(self.source, self.line),
                                        "unicode escapes take exactly four hex digits: \\u00e9",
                                    ));
                                }
                            }
                        }
                        other => {
                            let shown = other.map(String::from).unwrap_or_default();
                            return Err(SyntaxError::new(
                                self.line,
                                SyntaxCategory::String,
                                format!("unknown escape sequence '\\{}'", shown),
                                source_line(self.source, self.line),
                                "supported escapes: \\n \\t \\r \\0 \\\" \\' \\\\ \\uXXXX",
                            ));
                        }
                    }
                }
                other => value.push(other),
            }
        }

        self.tokens
            .push(Token::new(TokenKind::Str, value, start_line, start, self.pos));
        Ok(())
    }

    fn scan_operator(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;
        let rest = &self.source[self.pos..];
        let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) else {
            let c = self.peek().unwrap_or('?');
            return Err(self.error(
                format!("unexpected character '{}'", c),
                "remove the character or quote it inside a string",
            ));
        };
        self.pos += op.len();
        self.push(TokenKind::Punct, *op, start);
        Ok(())
    }
}
