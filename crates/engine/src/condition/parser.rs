// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recursive-descent parser producing the condition AST.
//!
//! Precedence, loosest first: `or`, `and`, `not`, comparisons (chainable,
//! `in`, `not in`), `+ -`, `* / // %`, unary `- +`, `**` (right
//! associative), calls and atoms.

use super::eval::Value;
use super::lexer::{Token, TokenKind};
use super::{ConditionError, MAX_DEPTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Func {
    Float,
    Int,
    Str,
    Len,
    Abs,
    Min,
    Max,
}

impl Func {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "float" => Func::Float,
            "int" => Func::Int,
            "str" => Func::Str,
            "len" => Func::Len,
            "abs" => Func::Abs,
            "min" => Func::Min,
            "max" => Func::Max,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Func::Float => "float",
            Func::Int => "int",
            Func::Str => "str",
            Func::Len => "len",
            Func::Abs => "abs",
            Func::Min => "min",
            Func::Max => "max",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    Var(String),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// `a < b <= c` is `a < b and b <= c`, with `b` evaluated once
    Compare(Box<Expr>, Vec<(CmpOp, Expr)>),
    Call(Func, Vec<Expr>),
}

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    input_len: usize,
    depth: usize,
}

impl Parser {
    pub fn parse(tokens: Vec<Token>, input_len: usize) -> Result<Expr, ConditionError> {
        let mut parser = Parser {
            tokens,
            pos: 0,
            input_len,
            depth: 0,
        };
        let expr = parser.parse_or()?;
        match parser.peek() {
            None => Ok(expr),
            Some(_) => Err(parser.unexpected("end of expression")),
        }
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_next(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<TokenKind> {
        let token = self.tokens.get(self.pos).map(|t| t.kind.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn current_pos(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|t| t.pos)
            .unwrap_or(self.input_len)
    }

    fn unexpected(&self, expected: &str) -> ConditionError {
        let message = match self.peek() {
            Some(found) => format!("unexpected {found:?}, expected {expected}"),
            None => format!("unexpected end of input, expected {expected}"),
        };
        ConditionError::Syntax {
            pos: self.current_pos(),
            message,
        }
    }

    fn enter(&mut self) -> Result<(), ConditionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ConditionError::TooDeep);
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn parse_or(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_not()?;
        while self.eat(&TokenKind::And) {
            let rhs = self.parse_not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, ConditionError> {
        if self.eat(&TokenKind::Not) {
            self.enter()?;
            let inner = self.parse_not();
            self.leave();
            return Ok(Expr::Not(Box::new(inner?)));
        }
        self.parse_comparison()
    }

    fn comparison_op(&mut self) -> Option<CmpOp> {
        let op = match self.peek()? {
            TokenKind::EqEq => CmpOp::Eq,
            TokenKind::NotEq => CmpOp::Ne,
            TokenKind::Lt => CmpOp::Lt,
            TokenKind::Le => CmpOp::Le,
            TokenKind::Gt => CmpOp::Gt,
            TokenKind::Ge => CmpOp::Ge,
            TokenKind::In => CmpOp::In,
            TokenKind::Not if self.peek_next() == Some(&TokenKind::In) => {
                self.pos += 2;
                return Some(CmpOp::NotIn);
            }
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ConditionError> {
        let first = self.parse_sum()?;
        let mut rest = Vec::new();
        while let Some(op) = self.comparison_op() {
            rest.push((op, self.parse_sum()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare(Box::new(first), rest))
        }
    }

    fn parse_sum(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Plus) => BinOp::Add,
                Some(TokenKind::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_term(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Star) => BinOp::Mul,
                Some(TokenKind::Slash) => BinOp::Div,
                Some(TokenKind::SlashSlash) => BinOp::FloorDiv,
                Some(TokenKind::Percent) => BinOp::Mod,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ConditionError> {
        let negate = match self.peek() {
            Some(TokenKind::Minus) => true,
            Some(TokenKind::Plus) => false,
            _ => return self.parse_power(),
        };
        self.pos += 1;
        self.enter()?;
        let operand = self.parse_unary();
        self.leave();
        let operand = operand?;
        Ok(if negate {
            Expr::Neg(Box::new(operand))
        } else {
            operand
        })
    }

    fn parse_power(&mut self) -> Result<Expr, ConditionError> {
        let base = self.parse_primary()?;
        if !self.eat(&TokenKind::StarStar) {
            return Ok(base);
        }
        self.enter()?;
        let exponent = self.parse_unary();
        self.leave();
        Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent?)))
    }

    fn parse_primary(&mut self) -> Result<Expr, ConditionError> {
        let pos = self.current_pos();
        match self.advance() {
            Some(TokenKind::Int(i)) => Ok(Expr::Literal(Value::Int(i))),
            Some(TokenKind::Float(f)) => Ok(Expr::Literal(Value::Float(f))),
            Some(TokenKind::Str(s)) => Ok(Expr::Literal(Value::Str(s))),
            Some(TokenKind::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(TokenKind::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(TokenKind::LParen) => {
                self.enter()?;
                let inner = self.parse_or();
                self.leave();
                let inner = inner?;
                if !self.eat(&TokenKind::RParen) {
                    return Err(self.unexpected("')'"));
                }
                Ok(inner)
            }
            Some(TokenKind::Ident(name)) if self.peek() == Some(&TokenKind::LParen) => {
                self.pos += 1;
                let func =
                    Func::from_name(&name).ok_or(ConditionError::UnknownFunction(name))?;
                self.enter()?;
                let args = self.parse_args();
                self.leave();
                Ok(Expr::Call(func, args?))
            }
            Some(TokenKind::Ident(name)) => Ok(Expr::Var(name)),
            Some(_) => {
                self.pos -= 1;
                Err(self.unexpected("a value"))
            }
            None => Err(ConditionError::Syntax {
                pos,
                message: "unexpected end of input, expected a value".to_string(),
            }),
        }
    }

    /// Arguments after the opening paren, through the closing one
    fn parse_args(&mut self) -> Result<Vec<Expr>, ConditionError> {
        let mut args = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_or()?);
            if self.eat(&TokenKind::RParen) {
                return Ok(args);
            }
            if !self.eat(&TokenKind::Comma) {
                return Err(self.unexpected("',' or ')'"));
            }
        }
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
