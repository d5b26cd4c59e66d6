//! Recursive-descent parser producing the filter expression tree.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expr     := and ( "||" and )*
//! and      := relation ( "&&" relation )*
//! relation := member ( ( "==" | "!=" | "<" | "<=" | ">" | ">=" ) member )*
//! member   := primary ( "." IDENT [ "(" args ")" ] )*
//! primary  := IDENT [ "(" args ")" ] | literal | "-" number | "(" expr ")"
//! ```

use super::lexer::{tokenize, Token, TokenKind};
use crate::errors::FilterError;

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Int(i64),
    UInt(u64),
    Double(f64),
    Bool(bool),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Ident(String),
    /// Field selection `operand.field`.
    Select {
        operand: Box<Expr>,
        field: String,
    },
    /// Function call, either global `f(args)` or receiver-style `target.f(args)`.
    Call {
        target: Option<Box<Expr>>,
        function: String,
        args: Vec<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

/// Tallest expression tree the parser accepts.
pub const MAX_DEPTH: usize = 256;

/// Deepest parenthesis or call-argument nesting the parser accepts.
pub const MAX_NESTING: usize = 64;

/// Parse a complete filter expression.
pub fn parse(input: &str) -> Result<Expr, FilterError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        cursor: 0,
        nesting: 0,
    };
    let (expr, _) = parser.or()?;
    let trailing = parser.peek();
    if trailing.kind != TokenKind::Eof {
        return Err(FilterError::syntax(
            trailing.position,
            format!("unexpected {}", trailing.kind.describe()),
        ));
    }
    Ok(expr)
}

/// An expression paired with the height of its tree.
type Parsed = (Expr, usize);

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    nesting: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // The token stream always ends with Eof, and the cursor never passes it.
        &self.tokens[self.cursor.min(self.tokens.len() - 1)]
    }

    fn position(&self) -> usize {
        self.peek().position
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.cursor += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), FilterError> {
        let token = self.advance();
        if token.kind == kind {
            Ok(())
        } else {
            Err(FilterError::syntax(
                token.position,
                format!(
                    "expected {}, found {}",
                    kind.describe(),
                    token.kind.describe()
                ),
            ))
        }
    }

    /// Height of a node built on top of a child of height `child`.
    fn grow(&self, child: usize, position: usize) -> Result<usize, FilterError> {
        let height = child + 1;
        if height > MAX_DEPTH {
            return Err(too_deep(position));
        }
        Ok(height)
    }

    fn enter(&mut self, position: usize) -> Result<(), FilterError> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING {
            return Err(too_deep(position));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    fn or(&mut self) -> Result<Parsed, FilterError> {
        let (mut lhs, mut height) = self.and()?;
        while self.eat(&TokenKind::OrOr) {
            let position = self.position();
            let (rhs, rhs_height) = self.and()?;
            height = self.grow(height.max(rhs_height), position)?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        Ok((lhs, height))
    }

    fn and(&mut self) -> Result<Parsed, FilterError> {
        let (mut lhs, mut height) = self.relation()?;
        while self.eat(&TokenKind::AndAnd) {
            let position = self.position();
            let (rhs, rhs_height) = self.relation()?;
            height = self.grow(height.max(rhs_height), position)?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok((lhs, height))
    }

    fn relation(&mut self) -> Result<Parsed, FilterError> {
        let (mut lhs, mut height) = self.member()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::Ne,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => return Ok((lhs, height)),
            };
            self.advance();
            let position = self.position();
            let (rhs, rhs_height) = self.member()?;
            height = self.grow(height.max(rhs_height), position)?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn member(&mut self) -> Result<Parsed, FilterError> {
        let (mut expr, mut height) = self.primary()?;
        while self.eat(&TokenKind::Dot) {
            let token = self.advance();
            let TokenKind::Ident(field) = token.kind else {
                return Err(FilterError::syntax(
                    token.position,
                    format!("expected field name, found {}", token.kind.describe()),
                ));
            };
            if self.eat(&TokenKind::LParen) {
                let (args, args_height) = self.args(token.position)?;
                height = self.grow(height.max(args_height), token.position)?;
                expr = Expr::Call {
                    target: Some(Box::new(expr)),
                    function: field,
                    args,
                };
            } else {
                height = self.grow(height, token.position)?;
                expr = Expr::Select {
                    operand: Box::new(expr),
                    field,
                };
            }
        }
        Ok((expr, height))
    }

    fn primary(&mut self) -> Result<Parsed, FilterError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Ident(name) => {
                if self.eat(&TokenKind::LParen) {
                    let (args, args_height) = self.args(token.position)?;
                    let height = self.grow(args_height, token.position)?;
                    Ok((
                        Expr::Call {
                            target: None,
                            function: name,
                            args,
                        },
                        height,
                    ))
                } else {
                    leaf(Expr::Ident(name))
                }
            }
            TokenKind::String(value) => leaf(Expr::Literal(Literal::String(value))),
            TokenKind::Int(value) => leaf(Expr::Literal(Literal::Int(value))),
            TokenKind::UInt(value) => leaf(Expr::Literal(Literal::UInt(value))),
            TokenKind::Double(value) => leaf(Expr::Literal(Literal::Double(value))),
            TokenKind::Bool(value) => leaf(Expr::Literal(Literal::Bool(value))),
            TokenKind::Minus => {
                let number = self.advance();
                match number.kind {
                    TokenKind::Int(value) => leaf(Expr::Literal(Literal::Int(-value))),
                    TokenKind::Double(value) => leaf(Expr::Literal(Literal::Double(-value))),
                    other => Err(FilterError::syntax(
                        number.position,
                        format!("expected number after '-', found {}", other.describe()),
                    )),
                }
            }
            TokenKind::LParen => {
                self.enter(token.position)?;
                let parsed = self.or()?;
                self.expect(TokenKind::RParen)?;
                self.leave();
                Ok(parsed)
            }
            TokenKind::Bang => Err(FilterError::syntax(
                token.position,
                "unsupported operator '!'",
            )),
            other => Err(FilterError::syntax(
                token.position,
                format!("unexpected {}", other.describe()),
            )),
        }
    }

    /// Parse call arguments after the opening parenthesis, returning them
    /// with the height of the tallest one.
    fn args(&mut self, position: usize) -> Result<(Vec<Expr>, usize), FilterError> {
        let mut args = Vec::new();
        let mut height = 0;
        if self.eat(&TokenKind::RParen) {
            return Ok((args, height));
        }
        self.enter(position)?;
        loop {
            let (arg, arg_height) = self.or()?;
            args.push(arg);
            height = height.max(arg_height);
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::RParen)?;
            self.leave();
            return Ok((args, height));
        }
    }
}

fn leaf(expr: Expr) -> Result<Parsed, FilterError> {
    Ok((expr, 1))
}

fn too_deep(position: usize) -> FilterError {
    FilterError::syntax(position, "expression too deeply nested")
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}
