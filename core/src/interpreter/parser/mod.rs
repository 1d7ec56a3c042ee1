//! Parser: token stream → AST
//!
//! A recursive statement-list parser over a flat token buffer. At every
//! statement position the registered [`statements::RULES`] are tried in order;
//! the first rule whose `matches` accepts the current token consumes the
//! statement and yields exactly one [`Node`]. Block rules call back into
//! [`Parser::parse_statements`] bounded by their closing delimiter, which is what
//! makes the grammar recursive.

mod cursor;
mod statements;

#[cfg(test)]
mod tests;

use tracing::trace;

use super::errors::{SyntaxCategory, SyntaxError};
use super::types::{CallSpec, Expr, Node, Token, TokenKind};

pub use cursor::TokenCursor;

/// Maximum number of tokens rendered in an error context
const CONTEXT_WINDOW: usize = 20;

const STATEMENT_SUGGESTION: &str = "start the statement with one of: import, declare, run, task, \
     export, echo, if, switch, for, while, break, breakAll, continue, return, function, \
     or write `name = value` / `name(args)`";

/* ===================== Public API ===================== */

/// Parse a token stream into the top-level statement list.
///
/// `source` must be the text the tokens were produced from; expressions are
/// sliced out of it verbatim.
pub fn parse(tokens: Vec<Token>, source: &str) -> Result<Vec<Node>, SyntaxError> {
    let tokens: Vec<Token> = tokens
        .into_iter()
        .filter(|t| t.kind != TokenKind::Comment)
        .collect();
    let parser = Parser { source };
    let mut cursor = TokenCursor::new(&tokens);
    parser.parse_statements(&mut cursor, Terminator::EndOfInput)
}

/* ===================== Parser ===================== */

/// Where a statement list stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Terminator {
    EndOfInput,
    /// Before the `}` closing the current block
    CloseBrace,
    /// Before the next `case`, `default` or the switch's `}`
    CaseBody,
}

pub(crate) struct Parser<'s> {
    source: &'s str,
}

impl<'s> Parser<'s> {
    /// Parse statements until `terminator`, leaving the terminator unconsumed
    pub(crate) fn parse_statements(
        &self,
        cursor: &mut TokenCursor<'_>,
        terminator: Terminator,
    ) -> Result<Vec<Node>, SyntaxError> {
        let mut nodes = Vec::new();

        loop {
            cursor.skip_line_ends();

            let Some(token) = cursor.peek() else {
                if terminator == Terminator::EndOfInput {
                    break;
                }
                return Err(self.error(
                    cursor,
                    "unexpected end of input inside a block",
                    "close the block with '}'",
                ));
            };

            let at_close = token.is_punct("}");
            match terminator {
                Terminator::CloseBrace if at_close => break,
                Terminator::CaseBody
                    if at_close || token.is_keyword("case") || token.is_keyword("default") =>
                {
                    break
                }
                Terminator::EndOfInput if at_close => {
                    return Err(self.error(
                        cursor,
                        "unexpected '}' outside of a block",
                        "remove the extra '}'",
                    ));
                }
                _ => {}
            }

            let Some(rule) = statements::RULES.iter().find(|rule| (rule.matches)(cursor)) else {
                return Err(self.error(
                    cursor,
                    format!("unrecognized statement starting with '{}'", token.display_text()),
                    STATEMENT_SUGGESTION,
                ));
            };

            trace!(rule = rule.name, line = token.line, "parsing statement");
            let node = (rule.parse)(self, cursor)?;
            nodes.push(node);
        }

        Ok(nodes)
    }

    /// Parse `{ statements }`
    pub(crate) fn parse_block(&self, cursor: &mut TokenCursor<'_>) -> Result<Vec<Node>, SyntaxError> {
        self.expect_punct(cursor, "{", "'{' to open the block")?;
        let body = self.parse_statements(cursor, Terminator::CloseBrace)?;
        self.expect_punct(cursor, "}", "'}' to close the block")?;
        Ok(body)
    }

    /* ----- expressions ----- */

    /// Consume expression tokens up to (not including) a line end, a brace, an
    /// unmatched closer, or a token accepted by `stop`, all at bracket depth 0.
    /// Returns the consumed token range.
    pub(crate) fn scan_expression(
        &self,
        cursor: &mut TokenCursor<'_>,
        stop: impl Fn(&Token) -> bool,
    ) -> (usize, usize) {
        let from = cursor.position();
        let mut depth = 0usize;

        while let Some(token) = cursor.peek() {
            if depth == 0 {
                if token.is_line_end() || token.is_punct("{") || token.is_punct("}") || stop(token)
                {
                    break;
                }
                if token.is_punct(")") || token.is_punct("]") {
                    break;
                }
            }
            if token.is_punct("(") || token.is_punct("[") {
                depth += 1;
            } else if token.is_punct(")") || token.is_punct("]") {
                depth -= 1;
            }
            cursor.advance();
        }

        (from, cursor.position())
    }

    /// Slice the source text covered by tokens `[from, to)`
    pub(crate) fn expr_from(&self, tokens: &[Token], from: usize, to: usize) -> Option<Expr> {
        if from >= to {
            return None;
        }
        let start = tokens[from].start;
        let end = tokens[to - 1].end;
        Some(Expr::new(self.source[start..end].trim()))
    }

    /// Take an expression that must not be empty
    pub(crate) fn take_expression(
        &self,
        cursor: &mut TokenCursor<'_>,
        stop: impl Fn(&Token) -> bool,
        what: &str,
    ) -> Result<Expr, SyntaxError> {
        let (from, to) = self.scan_expression(cursor, stop);
        self.expr_from(cursor.tokens(), from, to)
            .ok_or_else(|| self.error(cursor, format!("expected {}", what), format!("write {} here", what)))
    }

    /// Take `( expression )` and return the inner expression
    pub(crate) fn take_parenthesized(
        &self,
        cursor: &mut TokenCursor<'_>,
        what: &str,
    ) -> Result<Expr, SyntaxError> {
        self.expect_punct(cursor, "(", &format!("'(' before the {}", what))?;
        let mut depth = 0usize;
        let from = cursor.position();
        loop {
            let Some(token) = cursor.peek() else {
                return Err(self.error(cursor, format!("unclosed '(' around the {}", what), "add ')'"));
            };
            if token.is_punct("(") {
                depth += 1;
            } else if token.is_punct(")") {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            cursor.advance();
        }
        let to = cursor.position();
        let expr = self
            .expr_from(cursor.tokens(), from, to)
            .ok_or_else(|| self.error(cursor, format!("empty {}", what), format!("write the {} inside the parentheses", what)))?;
        cursor.advance();
        Ok(expr)
    }

    /// Parse `name(arg, ...)` where `name` may be dotted (`http.get`)
    pub(crate) fn parse_call_spec(&self, cursor: &mut TokenCursor<'_>) -> Result<CallSpec, SyntaxError> {
        let name = self.expect_dotted_name(cursor, "a task or function name")?;
        self.expect_punct(cursor, "(", "'(' to start the argument list")?;

        let mut args = Vec::new();
        if cursor.eat_punct(")") {
            return Ok(CallSpec { name, args });
        }
        loop {
            let arg = self.take_expression(cursor, |t| t.is_punct(","), "an argument")?;
            args.push(arg);
            if cursor.eat_punct(",") {
                continue;
            }
            self.expect_punct(cursor, ")", "',' or ')' after the argument")?;
            break;
        }
        Ok(CallSpec { name, args })
    }

    /* ----- token expectations ----- */

    pub(crate) fn expect_punct<'t>(
        &self,
        cursor: &mut TokenCursor<'t>,
        punct: &str,
        what: &str,
    ) -> Result<&'t Token, SyntaxError> {
        if cursor.at_punct(punct) {
            if let Some(token) = cursor.advance() {
                return Ok(token);
            }
        }
        Err(self.error(cursor, format!("expected {}", what), format!("insert '{}'", punct)))
    }

    pub(crate) fn expect_keyword(
        &self,
        cursor: &mut TokenCursor<'_>,
        keyword: &str,
    ) -> Result<(), SyntaxError> {
        if cursor.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(
                cursor,
                format!("expected keyword '{}'", keyword),
                format!("insert '{}'", keyword),
            ))
        }
    }

    /// Expect a user identifier; reserved `$` names and keywords are rejected
    pub(crate) fn expect_name(&self, cursor: &mut TokenCursor<'_>, what: &str) -> Result<String, SyntaxError> {
        match cursor.peek() {
            Some(token) if token.kind == TokenKind::Ident => {
                cursor.advance();
                Ok(token.text.clone())
            }
            Some(token) if token.kind == TokenKind::SystemIdent => Err(self.error(
                cursor,
                format!("'{}' is a reserved system name", token.text),
                "names starting with '$' are read-only; pick a name without '$'",
            )),
            Some(token) if token.kind == TokenKind::Keyword => Err(self.error(
                cursor,
                format!("'{}' is a keyword and cannot be used as {}", token.text, what),
                "pick a different name",
            )),
            _ => Err(self.error(cursor, format!("expected {}", what), format!("write {} here", what))),
        }
    }

    pub(crate) fn expect_dotted_name(
        &self,
        cursor: &mut TokenCursor<'_>,
        what: &str,
    ) -> Result<String, SyntaxError> {
        let mut name = self.expect_name(cursor, what)?;
        while cursor.at_punct(".") && cursor.peek_nth(1).is_some_and(|t| t.kind == TokenKind::Ident) {
            cursor.advance();
            name.push('.');
            name.push_str(&self.expect_name(cursor, what)?);
        }
        Ok(name)
    }

    pub(crate) fn expect_statement_end(
        &self,
        cursor: &mut TokenCursor<'_>,
        statement: &str,
    ) -> Result<(), SyntaxError> {
        if cursor.at_statement_end() {
            return Ok(());
        }
        let found = cursor.peek().map(Token::display_text).unwrap_or_default();
        Err(self.error(
            cursor,
            format!("unexpected '{}' after {} statement", found, statement),
            "put each statement on its own line or separate statements with ';'",
        ))
    }

    /* ----- errors ----- */

    pub(crate) fn error(
        &self,
        cursor: &TokenCursor<'_>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> SyntaxError {
        SyntaxError::new(
            cursor.line(),
            SyntaxCategory::Statement,
            message,
            render_context(cursor.tokens(), cursor.position()),
            suggestion,
        )
    }
}

/// Render at most [`CONTEXT_WINDOW`] tokens around `pos`, marking the token at
/// `pos` with `»«`.
pub(crate) fn render_context(tokens: &[Token], pos: usize) -> String {
    let from = pos.saturating_sub(CONTEXT_WINDOW / 2 - 2);
    let to = (from + CONTEXT_WINDOW).min(tokens.len());
    let mut parts: Vec<String> = Vec::with_capacity(to.saturating_sub(from) + 1);

    for (i, token) in tokens.iter().enumerate().take(to).skip(from) {
        if i == pos {
            parts.push(format!("»{}«", token.display_text()));
        } else {
            parts.push(token.display_text());
        }
    }
    if pos >= tokens.len() {
        parts.push("»<end of input>«".to_string());
    }
    parts.join(" ")
}
