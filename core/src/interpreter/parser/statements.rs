//! Statement rules
//!
//! Each rule pairs a cheap `matches` check on the current token(s) with a
//! `parse` function that consumes the whole statement. Order matters only for
//! the last two rules, which both start with an identifier.

use std::collections::HashSet;

use super::{Parser, Terminator, TokenCursor};
use crate::interpreter::errors::SyntaxError;
use crate::interpreter::types::{Iterable, Node, NodeKind, Rhs, TaskSpec, TokenKind};

type ParseFn = fn(&Parser<'_>, &mut TokenCursor<'_>) -> Result<Node, SyntaxError>;

pub(super) struct StatementRule {
    pub name: &'static str,
    pub matches: fn(&TokenCursor<'_>) -> bool,
    pub parse: ParseFn,
}

pub(super) const RULES: &[StatementRule] = &[
    StatementRule {
        name: "import",
        matches: |c| c.at_keyword("import"),
        parse: parse_import,
    },
    StatementRule {
        name: "declare",
        matches: |c| c.at_keyword("declare"),
        parse: parse_declare,
    },
    StatementRule {
        name: "run",
        matches: |c| c.at_keyword("run"),
        parse: parse_run,
    },
    StatementRule {
        name: "task",
        matches: |c| c.at_keyword("task"),
        parse: parse_task,
    },
    StatementRule {
        name: "export",
        matches: |c| c.at_keyword("export"),
        parse: parse_export,
    },
    StatementRule {
        name: "echo",
        matches: |c| c.at_keyword("echo"),
        parse: parse_echo,
    },
    StatementRule {
        name: "if",
        matches: |c| c.at_keyword("if"),
        parse: parse_if,
    },
    StatementRule {
        name: "switch",
        matches: |c| c.at_keyword("switch"),
        parse: parse_switch,
    },
    StatementRule {
        name: "for",
        matches: |c| c.at_keyword("for"),
        parse: parse_for,
    },
    StatementRule {
        name: "while",
        matches: |c| c.at_keyword("while"),
        parse: parse_while,
    },
    StatementRule {
        name: "loop-control",
        matches: |c| c.at_keyword("break") || c.at_keyword("breakAll") || c.at_keyword("continue"),
        parse: parse_loop_control,
    },
    StatementRule {
        name: "return",
        matches: |c| c.at_keyword("return"),
        parse: parse_return,
    },
    StatementRule {
        name: "function",
        matches: |c| c.at_keyword("function"),
        parse: parse_function,
    },
    StatementRule {
        name: "assign",
        matches: |c| {
            (c.at_kind(TokenKind::Ident) || c.at_kind(TokenKind::SystemIdent))
                && c.peek_nth(1).is_some_and(|t| t.is_punct("="))
        },
        parse: parse_assign,
    },
    StatementRule {
        name: "call",
        matches: |c| c.at_kind(TokenKind::Ident) && c.peek_nth(1).is_some_and(|t| t.is_punct("(")),
        parse: parse_call,
    },
];

/* ===================== Line Statements ===================== */

fn parse_import(p: &Parser<'_>, cursor: &mut TokenCursor<'_>) -> Result<Node, SyntaxError> {
    let line = cursor.line();
    cursor.advance();
    let path = p.expect_dotted_name(cursor, "an import path")?;
    let alias = if cursor.eat_keyword("as") {
        p.expect_name(cursor, "an import alias")?
    } else {
        path.rsplit('.').next().unwrap_or(&path).to_string()
    };
    p.expect_statement_end(cursor, "import")?;
    Ok(Node::line(NodeKind::Import { path, alias }, line))
}

fn parse_declare(p: &Parser<'_>, cursor: &mut TokenCursor<'_>) -> Result<Node, SyntaxError> {
    let line = cursor.line();
    cursor.advance();
    let name = p.expect_name(cursor, "a variable name")?;
    let declared_type = if cursor.eat_punct(":") {
        Some(p.expect_dotted_name(cursor, "a type name")?)
    } else {
        None
    };
    let value = if cursor.eat_punct("=") {
        Some(parse_rhs(p, cursor)?)
    } else {
        None
    };
    p.expect_statement_end(cursor, "declare")?;
    Ok(Node::line(
        NodeKind::Declare {
            name,
            declared_type,
            value,
        },
        line,
    ))
}

fn parse_assign(p: &Parser<'_>, cursor: &mut TokenCursor<'_>) -> Result<Node, SyntaxError> {
    let line = cursor.line();
    let name = p.expect_name(cursor, "a variable name")?;
    p.expect_punct(cursor, "=", "'='")?;
    let value = parse_rhs(p, cursor)?;
    p.expect_statement_end(cursor, "assignment")?;
    Ok(Node::line(NodeKind::Assign { name, value }, line))
}

/// `run tool(args)`, a bare `name(args)` call, or an expression
fn parse_rhs(p: &Parser<'_>, cursor: &mut TokenCursor<'_>) -> Result<Rhs, SyntaxError> {
    if cursor.eat_keyword("run") {
        let call = p.parse_call_spec(cursor)?;
        return Ok(Rhs::Run { call });
    }

    if cursor.at_kind(TokenKind::Ident) && cursor.peek_nth(1).is_some_and(|t| t.is_punct("(")) {
        let mut lookahead = *cursor;
        let from = lookahead.position();
        if let Ok(call) = p.parse_call_spec(&mut lookahead) {
            if lookahead.at_statement_end() {
                let to = lookahead.position();
                if let Some(source) = p.expr_from(lookahead.tokens(), from, to) {
                    *cursor = lookahead;
                    return Ok(Rhs::Invoke { call, source });
                }
            }
        }
    }

    let expr = p.take_expression(cursor, |_| false, "a value")?;
    Ok(Rhs::Expr { expr })
}

fn parse_run(p: &Parser<'_>, cursor: &mut TokenCursor<'_>) -> Result<Node, SyntaxError> {
    let line = cursor.line();
    cursor.advance();
    let call = p.parse_call_spec(cursor)?;
    p.expect_statement_end(cursor, "run")?;
    Ok(Node::line(NodeKind::Run { call }, line))
}

fn parse_call(p: &Parser<'_>, cursor: &mut TokenCursor<'_>) -> Result<Node, SyntaxError> {
    let line = cursor.line();
    let call = p.parse_call_spec(cursor)?;
    p.expect_statement_end(cursor, "call")?;
    Ok(Node::line(NodeKind::Call { call }, line))
}

/// `task target { key: tool(args) ... }`
fn parse_task(p: &Parser<'_>, cursor: &mut TokenCursor<'_>) -> Result<Node, SyntaxError> {
    let line = cursor.line();
    cursor.advance();
    let target = p.expect_name(cursor, "a result variable name")?;
    p.expect_punct(cursor, "{", "'{' to open the task list")?;

    let mut tasks = Vec::new();
    let mut keys = HashSet::new();
    loop {
        while cursor.peek().is_some_and(|t| t.is_line_end() || t.is_punct(",")) {
            cursor.advance();
        }
        if cursor.eat_punct("}") {
            break;
        }

        let entry_line = cursor.line();
        let key = match cursor.peek() {
            Some(t) if matches!(t.kind, TokenKind::Ident | TokenKind::Str) => {
                cursor.advance();
                t.text.clone()
            }
            _ => {
                return Err(p.error(
                    cursor,
                    "expected a task key",
                    "write entries as `key: tool(args)`",
                ))
            }
        };
        if !keys.insert(key.clone()) {
            return Err(p.error(
                cursor,
                format!("duplicate task key '{}'", key),
                "give every task entry a unique key",
            ));
        }
        p.expect_punct(cursor, ":", "':' after the task key")?;
        let call = p.parse_call_spec(cursor)?;
        tasks.push(TaskSpec {
            key,
            call,
            line: entry_line,
        });

        if !(cursor.at_statement_end() || cursor.at_punct(",")) {
            return Err(p.error(
                cursor,
                "expected a line end, ',' or '}' after the task entry",
                "put each task entry on its own line",
            ));
        }
    }

    p.expect_statement_end(cursor, "task")?;
    Ok(Node::line(NodeKind::Task { target, tasks }, line))
}

fn parse_export(p: &Parser<'_>, cursor: &mut TokenCursor<'_>) -> Result<Node, SyntaxError> {
    let line = cursor.line();
    cursor.advance();
    let value = p.take_expression(cursor, |_| false, "the value to export")?;
    p.expect_statement_end(cursor, "export")?;
    Ok(Node::line(NodeKind::Export { value }, line))
}

fn parse_echo(p: &Parser<'_>, cursor: &mut TokenCursor<'_>) -> Result<Node, SyntaxError> {
    let line = cursor.line();
    cursor.advance();
    let value = p.take_expression(cursor, |_| false, "the value to echo")?;
    p.expect_statement_end(cursor, "echo")?;
    Ok(Node::line(NodeKind::Echo { value }, line))
}

fn parse_loop_control(p: &Parser<'_>, cursor: &mut TokenCursor<'_>) -> Result<Node, SyntaxError> {
    let line = cursor.line();
    let (kind, label) = match cursor.advance() {
        Some(t) if t.is_keyword("break") => (NodeKind::Break, "break"),
        Some(t) if t.is_keyword("breakAll") => (NodeKind::BreakAll, "breakAll"),
        _ => (NodeKind::Continue, "continue"),
    };
    p.expect_statement_end(cursor, label)?;
    Ok(Node::line(kind, line))
}

fn parse_return(p: &Parser<'_>, cursor: &mut TokenCursor<'_>) -> Result<Node, SyntaxError> {
    let line = cursor.line();
    cursor.advance();
    let value = if cursor.at_statement_end() {
        None
    } else {
        Some(p.take_expression(cursor, |_| false, "the return value")?)
    };
    p.expect_statement_end(cursor, "return")?;
    Ok(Node::line(NodeKind::Return { value }, line))
}

/* ===================== Block Statements ===================== */

/// `if (c) { } else if (c) { } else { }`, with `else` allowed on the next line
fn parse_if(p: &Parser<'_>, cursor: &mut TokenCursor<'_>) -> Result<Node, SyntaxError> {
    let line = cursor.line();
    cursor.advance();
    let condition = p.take_parenthesized(cursor, "if condition")?;
    let body = p.parse_block(cursor)?;
    let mut children = vec![Node::block(NodeKind::Branch { condition }, line, body)];

    loop {
        let mut lookahead = *cursor;
        lookahead.skip_line_ends();
        if !lookahead.at_keyword("else") {
            break;
        }
        *cursor = lookahead;
        let else_line = cursor.line();
        cursor.advance();

        if cursor.eat_keyword("if") {
            let condition = p.take_parenthesized(cursor, "else-if condition")?;
            let body = p.parse_block(cursor)?;
            children.push(Node::block(NodeKind::Branch { condition }, else_line, body));
        } else {
            let body = p.parse_block(cursor)?;
            children.push(Node::block(NodeKind::Else, else_line, body));
            break;
        }
    }

    p.expect_statement_end(cursor, "if")?;
    Ok(Node::block(NodeKind::If, line, children))
}

/// `switch (subject) { case v: ... default: ... }`
fn parse_switch(p: &Parser<'_>, cursor: &mut TokenCursor<'_>) -> Result<Node, SyntaxError> {
    let line = cursor.line();
    cursor.advance();
    let subject = p.take_parenthesized(cursor, "switch subject")?;
    p.expect_punct(cursor, "{", "'{' to open the switch body")?;

    let mut children = Vec::new();
    loop {
        cursor.skip_line_ends();
        if cursor.eat_punct("}") {
            break;
        }
        let case_line = cursor.line();
        if cursor.eat_keyword("case") {
            let value = p.take_expression(cursor, |t| t.is_punct(":"), "a case value")?;
            p.expect_punct(cursor, ":", "':' after the case value")?;
            let body = p.parse_statements(cursor, Terminator::CaseBody)?;
            children.push(Node::block(NodeKind::Case { value }, case_line, body));
        } else if cursor.eat_keyword("default") {
            p.expect_punct(cursor, ":", "':' after 'default'")?;
            let body = p.parse_statements(cursor, Terminator::CaseBody)?;
            children.push(Node::block(NodeKind::Default, case_line, body));
        } else {
            return Err(p.error(
                cursor,
                "expected 'case', 'default' or '}' inside switch",
                "start each branch with `case value:` or `default:`",
            ));
        }
    }

    p.expect_statement_end(cursor, "switch")?;
    Ok(Node::block(NodeKind::Switch { subject }, line, children))
}

/// `for var in a..b { }`, `for var in a..<b { }` or `for var in expr { }`
fn parse_for(p: &Parser<'_>, cursor: &mut TokenCursor<'_>) -> Result<Node, SyntaxError> {
    let line = cursor.line();
    cursor.advance();
    let var = p.expect_name(cursor, "a loop variable")?;
    p.expect_keyword(cursor, "in")?;

    let (from, to) = p.scan_expression(cursor, |_| false);
    let tokens = cursor.tokens();
    let mut depth = 0usize;
    let mut range_at = None;
    for (i, token) in tokens.iter().enumerate().take(to).skip(from) {
        if token.is_punct("(") || token.is_punct("[") {
            depth += 1;
        } else if token.is_punct(")") || token.is_punct("]") {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && (token.is_punct("..") || token.is_punct("..<")) {
            range_at = Some(i);
            break;
        }
    }

    let iterable = match range_at {
        Some(at) => {
            let start = p.expr_from(tokens, from, at).ok_or_else(|| {
                p.error(cursor, "range is missing its start", "write ranges as `start..end`")
            })?;
            let end = p.expr_from(tokens, at + 1, to).ok_or_else(|| {
                p.error(cursor, "range is missing its end", "write ranges as `start..end`")
            })?;
            Iterable::Range {
                start,
                end,
                inclusive: tokens[at].is_punct(".."),
            }
        }
        None => {
            let expr = p.expr_from(tokens, from, to).ok_or_else(|| {
                p.error(
                    cursor,
                    "expected a range or collection after 'in'",
                    "write `for item in items { ... }` or `for i in 1..10 { ... }`",
                )
            })?;
            Iterable::Each { expr }
        }
    };

    let body = p.parse_block(cursor)?;
    p.expect_statement_end(cursor, "for")?;
    Ok(Node::block(NodeKind::For { var, iterable }, line, body))
}

fn parse_while(p: &Parser<'_>, cursor: &mut TokenCursor<'_>) -> Result<Node, SyntaxError> {
    let line = cursor.line();
    cursor.advance();
    let condition = p.take_parenthesized(cursor, "while condition")?;
    let body = p.parse_block(cursor)?;
    p.expect_statement_end(cursor, "while")?;
    Ok(Node::block(NodeKind::While { condition }, line, body))
}

/// `function name(a, b) { ... }`
fn parse_function(p: &Parser<'_>, cursor: &mut TokenCursor<'_>) -> Result<Node, SyntaxError> {
    let line = cursor.line();
    cursor.advance();
    let name = p.expect_name(cursor, "a function name")?;
    p.expect_punct(cursor, "(", "'(' to start the parameter list")?;

    let mut params: Vec<String> = Vec::new();
    if !cursor.eat_punct(")") {
        loop {
            let param = p.expect_name(cursor, "a parameter name")?;
            if params.contains(&param) {
                return Err(p.error(
                    cursor,
                    format!("duplicate parameter '{}'", param),
                    "give every parameter a unique name",
                ));
            }
            params.push(param);
            if cursor.eat_punct(",") {
                continue;
            }
            p.expect_punct(cursor, ")", "',' or ')' in the parameter list")?;
            break;
        }
    }

    let body = p.parse_block(cursor)?;
    p.expect_statement_end(cursor, "function")?;
    Ok(Node::block(NodeKind::FunctionDef { name, params }, line, body))
}
