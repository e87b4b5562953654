// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::condition::lexer::Lexer;

fn parse(input: &str) -> Result<Expr, ConditionError> {
    Parser::parse(Lexer::tokenize(input)?, input.len())
}

fn int(i: i64) -> Box<Expr> {
    Box::new(Expr::Literal(Value::Int(i)))
}

fn var(name: &str) -> Box<Expr> {
    Box::new(Expr::Var(name.to_string()))
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    assert_eq!(
        parse("1 + 2 * 3").unwrap(),
        Expr::Binary(
            BinOp::Add,
            int(1),
            Box::new(Expr::Binary(BinOp::Mul, int(2), int(3)))
        )
    );
}

#[test]
fn subtraction_is_left_associative() {
    assert_eq!(
        parse("5 - 2 - 1").unwrap(),
        Expr::Binary(
            BinOp::Sub,
            Box::new(Expr::Binary(BinOp::Sub, int(5), int(2))),
            int(1)
        )
    );
}

#[test]
fn power_is_right_associative_and_binds_tighter_than_unary_minus() {
    assert_eq!(
        parse("-2 ** 3 ** 2").unwrap(),
        Expr::Neg(Box::new(Expr::Binary(
            BinOp::Pow,
            int(2),
            Box::new(Expr::Binary(BinOp::Pow, int(3), int(2)))
        )))
    );
}

#[test]
fn comparisons_chain() {
    assert_eq!(
        parse("0 < x <= 10").unwrap(),
        Expr::Compare(
            int(0),
            vec![(CmpOp::Lt, *var("x")), (CmpOp::Le, Expr::Literal(Value::Int(10)))]
        )
    );
}

#[test]
fn not_in_is_one_operator() {
    assert_eq!(
        parse("'nan' not in loss").unwrap(),
        Expr::Compare(
            Box::new(Expr::Literal(Value::Str("nan".into()))),
            vec![(CmpOp::NotIn, *var("loss"))]
        )
    );
}

#[test]
fn not_binds_looser_than_comparison() {
    assert_eq!(
        parse("not a == b").unwrap(),
        Expr::Not(Box::new(Expr::Compare(var("a"), vec![(CmpOp::Eq, *var("b"))])))
    );
}

#[test]
fn and_binds_tighter_than_or() {
    assert_eq!(
        parse("a or b and c").unwrap(),
        Expr::Or(var("a"), Box::new(Expr::And(var("b"), var("c"))))
    );
}

#[test]
fn calls_take_argument_lists() {
    assert_eq!(
        parse("max(a, 2)").unwrap(),
        Expr::Call(Func::Max, vec![*var("a"), Expr::Literal(Value::Int(2))])
    );
    assert_eq!(parse("min()").unwrap(), Expr::Call(Func::Min, vec![]));
}

#[test]
fn parentheses_override_precedence() {
    assert_eq!(
        parse("(1 + 2) * 3").unwrap(),
        Expr::Binary(
            BinOp::Mul,
            Box::new(Expr::Binary(BinOp::Add, int(1), int(2))),
            int(3)
        )
    );
}

#[test]
fn unknown_function_is_rejected() {
    assert_eq!(
        parse("exec('ls')").unwrap_err(),
        ConditionError::UnknownFunction("exec".into())
    );
}

#[test]
fn trailing_tokens_are_rejected() {
    match parse("a b") {
        Err(ConditionError::Syntax { pos, .. }) => assert_eq!(pos, 2),
        other => panic!("expected syntax error, got {other:?}"),
    }
}

#[test]
fn missing_close_paren_reports_end_of_input() {
    match parse("(a < 1") {
        Err(ConditionError::Syntax { pos, message }) => {
            assert_eq!(pos, 6);
            assert!(message.contains("end of input"), "{message}");
        }
        other => panic!("expected syntax error, got {other:?}"),
    }
}

#[test]
fn empty_input_is_a_syntax_error() {
    assert!(matches!(parse(""), Err(ConditionError::Syntax { pos: 0, .. })));
}

#[test]
fn nesting_is_bounded() {
    let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
    assert_eq!(parse(&deep).unwrap_err(), ConditionError::TooDeep);

    let ok = format!("{}1{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
    assert_eq!(parse(&ok).unwrap(), Expr::Literal(Value::Int(1)));
}

#[test]
fn repeated_not_is_bounded() {
    let deep = format!("{}x", "not ".repeat(MAX_DEPTH + 1));
    assert_eq!(parse(&deep).unwrap_err(), ConditionError::TooDeep);
}
