//! Expression parser: source text → [`ExprNode`]
//!
//! Precedence climbing over the statement lexer's tokens. Binding power, lowest
//! first: `?:`, `||`, `&&`, `== !=`, `< <= > >=`, `+ -`, `* / %`, unary, postfix.

use crate::interpreter::errors::{EvalError, RuntimeErrorKind};
use crate::interpreter::lexer::tokenize;
use crate::interpreter::types::{Token, TokenKind, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    fn from_token(token: &Token) -> Option<(BinaryOp, u8)> {
        if token.kind != TokenKind::Punct {
            return None;
        }
        let op = match token.text.as_str() {
            "||" => (BinaryOp::Or, 1),
            "&&" => (BinaryOp::And, 2),
            "==" => (BinaryOp::Eq, 3),
            "!=" => (BinaryOp::Ne, 3),
            "<" => (BinaryOp::Lt, 4),
            "<=" => (BinaryOp::Le, 4),
            ">" => (BinaryOp::Gt, 4),
            ">=" => (BinaryOp::Ge, 4),
            "+" => (BinaryOp::Add, 5),
            "-" => (BinaryOp::Sub, 5),
            "*" => (BinaryOp::Mul, 6),
            "/" => (BinaryOp::Div, 6),
            "%" => (BinaryOp::Rem, 6),
            _ => return None,
        };
        Some(op)
    }

    pub(crate) fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ExprNode {
    Literal(Value),
    Var(String),
    List(Vec<ExprNode>),
    Unary {
        op: UnaryOp,
        operand: Box<ExprNode>,
    },
    Binary {
        op: BinaryOp,
        left: Box<ExprNode>,
        right: Box<ExprNode>,
    },
    Ternary {
        condition: Box<ExprNode>,
        then: Box<ExprNode>,
        otherwise: Box<ExprNode>,
    },
    Member {
        target: Box<ExprNode>,
        field: String,
    },
    Index {
        target: Box<ExprNode>,
        index: Box<ExprNode>,
    },
    Call {
        name: String,
        args: Vec<ExprNode>,
    },
}

pub(crate) fn parse_expression(source: &str) -> Result<ExprNode, EvalError> {
    let tokens: Vec<Token> = tokenize(source)
        .map_err(|e| syntax(format!("{} in '{}'", e.message, source)))?
        .into_iter()
        .filter(|t| !matches!(t.kind, TokenKind::LineEnd | TokenKind::Comment))
        .collect();

    let mut parser = ExprParser {
        tokens: &tokens,
        pos: 0,
        source,
    };
    let expr = parser.parse_ternary()?;
    if let Some(token) = parser.peek() {
        return Err(syntax(format!(
            "unexpected '{}' in expression '{}'",
            token.display_text(),
            source
        )));
    }
    Ok(expr)
}

fn syntax(message: impl Into<String>) -> EvalError {
    EvalError::new(RuntimeErrorKind::Evaluation, message)
}

struct ExprParser<'t> {
    tokens: &'t [Token],
    pos: usize,
    source: &'t str,
}

impl<'t> ExprParser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn matches(&mut self, punct: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_punct(punct)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &str) -> Result<(), EvalError> {
        if self.matches(punct) {
            Ok(())
        } else {
            let found = self
                .peek()
                .map(Token::display_text)
                .unwrap_or_else(|| "end of expression".to_string());
            Err(syntax(format!(
                "expected '{}' but found '{}' in '{}'",
                punct, found, self.source
            )))
        }
    }

    fn parse_ternary(&mut self) -> Result<ExprNode, EvalError> {
        let condition = self.parse_binary(0)?;
        if !self.matches("?") {
            return Ok(condition);
        }
        let then = self.parse_ternary()?;
        self.expect(":")?;
        let otherwise = self.parse_ternary()?;
        Ok(ExprNode::Ternary {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<ExprNode, EvalError> {
        let mut left = self.parse_unary()?;

        loop {
            let Some((op, prec)) = self.peek().and_then(BinaryOp::from_token) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.advance();
            let right = self.parse_binary(prec + 1)?;
            left = ExprNode::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<ExprNode, EvalError> {
        if self.matches("-") {
            let operand = self.parse_unary()?;
            return Ok(ExprNode::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }
        if self.matches("!") {
            let operand = self.parse_unary()?;
            return Ok(ExprNode::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<ExprNode, EvalError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.matches(".") {
                let field = match self.advance() {
                    Some(t) if matches!(t.kind, TokenKind::Ident | TokenKind::Keyword) => {
                        t.text.clone()
                    }
                    _ => {
                        return Err(syntax(format!(
                            "expected a field name after '.' in '{}'",
                            self.source
                        )))
                    }
                };
                expr = ExprNode::Member {
                    target: Box::new(expr),
                    field,
                };
                continue;
            }
            if self.matches("[") {
                let index = self.parse_ternary()?;
                self.expect("]")?;
                expr = ExprNode::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
                continue;
            }
            break;
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<ExprNode, EvalError> {
        let Some(token) = self.advance() else {
            return Err(syntax(format!("unexpected end of expression '{}'", self.source)));
        };

        match token.kind {
            TokenKind::Int => token
                .text
                .parse::<i64>()
                .map(|i| ExprNode::Literal(Value::Int(i)))
                .map_err(|_| syntax(format!("invalid integer '{}'", token.text))),
            TokenKind::Float => token
                .text
                .parse::<f64>()
                .map(|f| ExprNode::Literal(Value::Float(f)))
                .map_err(|_| syntax(format!("invalid number '{}'", token.text))),
            TokenKind::Str => Ok(ExprNode::Literal(Value::str(&token.text))),
            TokenKind::Keyword => match token.text.as_str() {
                "true" => Ok(ExprNode::Literal(Value::Bool(true))),
                "false" => Ok(ExprNode::Literal(Value::Bool(false))),
                "null" => Ok(ExprNode::Literal(Value::Null)),
                other => Err(syntax(format!(
                    "keyword '{}' cannot appear in an expression",
                    other
                ))),
            },
            TokenKind::SystemIdent => Ok(ExprNode::Var(token.text.clone())),
            TokenKind::Ident => {
                if self.matches("(") {
                    let args = self.parse_arguments(")")?;
                    Ok(ExprNode::Call {
                        name: token.text.clone(),
                        args,
                    })
                } else {
                    Ok(ExprNode::Var(token.text.clone()))
                }
            }
            TokenKind::Punct if token.text == "(" => {
                let inner = self.parse_ternary()?;
                self.expect(")")?;
                Ok(inner)
            }
            TokenKind::Punct if token.text == "[" => Ok(ExprNode::List(self.parse_arguments("]")?)),
            _ => Err(syntax(format!(
                "unexpected '{}' in expression '{}'",
                token.display_text(),
                self.source
            ))),
        }
    }

    /// Comma separated expressions up to `close`, which is consumed
    fn parse_arguments(&mut self, close: &str) -> Result<Vec<ExprNode>, EvalError> {
        let mut items = Vec::new();
        if self.matches(close) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_ternary()?);
            if self.matches(",") {
                continue;
            }
            self.expect(close)?;
            return Ok(items);
        }
    }
}
