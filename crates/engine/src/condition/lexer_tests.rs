// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn kinds(input: &str) -> Vec<TokenKind> {
    Lexer::tokenize(input)
        .unwrap()
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn tokenizes_comparison_with_call() {
    assert_eq!(
        kinds("float(loss) < 0.5"),
        vec![
            TokenKind::Ident("float".into()),
            TokenKind::LParen,
            TokenKind::Ident("loss".into()),
            TokenKind::RParen,
            TokenKind::Lt,
            TokenKind::Float(0.5),
        ]
    );
}

#[test]
fn records_byte_offsets() {
    let tokens = Lexer::tokenize("a  >= 10").unwrap();
    let positions: Vec<usize> = tokens.iter().map(|t| t.pos).collect();
    assert_eq!(positions, vec![0, 3, 6]);
}

#[parameterized(
    star_star = { "**", TokenKind::StarStar },
    slash_slash = { "//", TokenKind::SlashSlash },
    eq_eq = { "==", TokenKind::EqEq },
    not_eq = { "!=", TokenKind::NotEq },
    le = { "<=", TokenKind::Le },
    ge = { ">=", TokenKind::Ge },
    percent = { "%", TokenKind::Percent },
)]
fn two_char_operators(input: &str, expected: TokenKind) {
    assert_eq!(kinds(input), vec![expected]);
}

#[parameterized(
    int = { "42", TokenKind::Int(42) },
    underscores = { "1_000", TokenKind::Int(1000) },
    float = { "3.25", TokenKind::Float(3.25) },
    leading_dot = { ".5", TokenKind::Float(0.5) },
    exponent = { "1e3", TokenKind::Float(1000.0) },
    signed_exponent = { "2.5E-1", TokenKind::Float(0.25) },
)]
fn numbers(input: &str, expected: TokenKind) {
    assert_eq!(kinds(input), vec![expected]);
}

#[test]
fn exponent_without_digits_is_an_identifier() {
    assert_eq!(
        kinds("1e"),
        vec![TokenKind::Int(1), TokenKind::Ident("e".into())]
    );
}

#[parameterized(
    double = { r#""nan""#, "nan" },
    single = { "'nan'", "nan" },
    escaped_quote = { r#""say \"hi\"""#, "say \"hi\"" },
    newline = { r#""a\nb""#, "a\nb" },
    other_quote_inside = { r#""it's""#, "it's" },
)]
fn strings(input: &str, expected: &str) {
    assert_eq!(kinds(input), vec![TokenKind::Str(expected.into())]);
}

#[test]
fn keywords_accept_both_boolean_spellings() {
    assert_eq!(
        kinds("True false and or not in"),
        vec![
            TokenKind::True,
            TokenKind::False,
            TokenKind::And,
            TokenKind::Or,
            TokenKind::Not,
            TokenKind::In,
        ]
    );
}

#[test]
fn keyword_prefix_is_an_identifier() {
    assert_eq!(
        kinds("android index"),
        vec![
            TokenKind::Ident("android".into()),
            TokenKind::Ident("index".into()),
        ]
    );
}

#[parameterized(
    unterminated = { "'abc", 0 },
    lone_bang = { "a ! b", 2 },
    lone_equals = { "a = b", 2 },
    attribute_access = { "x.y", 1 },
    overflow = { "99999999999999999999", 0 },
)]
fn rejects(input: &str, pos: usize) {
    match Lexer::tokenize(input) {
        Err(ConditionError::Syntax { pos: got, .. }) => assert_eq!(got, pos),
        other => panic!("expected syntax error, got {other:?}"),
    }
}
