// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Condition expressions gating watcher actions.
//!
//! A small, side-effect free expression language over captured variables:
//! literals, variable names, arithmetic (`+ - * / // % **`), comparisons
//! (chainable, plus `in` / `not in`), `and` / `or` / `not`, and the
//! functions `float`, `int`, `str`, `len`, `abs`, `min`, `max`. Nothing
//! else is reachable from an expression.
//!
//! ```text
//! float(loss) < 0.5 and int(epoch) >= 10
//! "nan" in str(loss) or abs(float(delta)) > 1e3
//! ```

mod eval;
mod lexer;
mod parser;

pub use eval::Value;

use jw_core::Variables;
use thiserror::Error;

/// Longest accepted expression, in bytes
pub const MAX_EXPRESSION_LEN: usize = 1000;

/// Deepest accepted nesting of sub-expressions
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConditionError {
    #[error("expression is {0} bytes, limit is {MAX_EXPRESSION_LEN}")]
    TooLong(usize),
    #[error("expression nested deeper than {MAX_DEPTH}")]
    TooDeep,
    #[error("syntax error at {pos}: {message}")]
    Syntax { pos: usize, message: String },
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("{func}() takes {expected}, got {got}")]
    Arity {
        func: &'static str,
        expected: &'static str,
        got: usize,
    },
    #[error("type error: {0}")]
    Type(String),
    #[error("invalid value: {0}")]
    Value(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
}

/// Parse and evaluate `expr`, returning its truthiness
pub fn try_evaluate(expr: &str, variables: &Variables) -> Result<bool, ConditionError> {
    let ast = parse(expr)?;
    Ok(eval::eval(&ast, variables)?.truthy())
}

/// Check an expression for syntax errors without evaluating it
pub fn check(expr: &str) -> Result<(), ConditionError> {
    parse(expr).map(|_| ())
}

fn parse(expr: &str) -> Result<parser::Expr, ConditionError> {
    if expr.len() > MAX_EXPRESSION_LEN {
        return Err(ConditionError::TooLong(expr.len()));
    }
    let tokens = lexer::Lexer::tokenize(expr)?;
    parser::Parser::parse(tokens, expr.len())
}

/// Evaluate an optional condition.
///
/// No condition (or a blank one) passes. Any error fails the condition and
/// is logged; it never propagates.
pub fn evaluate(expr: Option<&str>, variables: &Variables) -> bool {
    let Some(expr) = expr.map(str::trim).filter(|e| !e.is_empty()) else {
        return true;
    };
    match try_evaluate(expr, variables) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(condition = expr, error = %e, "condition evaluation failed");
            false
        }
    }
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
