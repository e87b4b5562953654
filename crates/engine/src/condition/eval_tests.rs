// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::condition::lexer::Lexer;
use crate::condition::parser::Parser;
use yare::parameterized;

fn run(input: &str) -> Result<Value, ConditionError> {
    let mut vars = Variables::new();
    vars.insert("loss".to_string(), "0.25".to_string());
    vars.insert("epoch".to_string(), "12".to_string());
    vars.insert("status".to_string(), "loss=nan".to_string());
    let expr = Parser::parse(Lexer::tokenize(input)?, input.len())?;
    eval(&expr, &vars)
}

#[parameterized(
    int_add = { "1 + 2", Value::Int(3) },
    true_division = { "7 / 2", Value::Float(3.5) },
    exact_division_is_float = { "4 / 2", Value::Float(2.0) },
    floor_div = { "7 // 2", Value::Int(3) },
    floor_div_negative = { "-7 // 2", Value::Int(-4) },
    floor_div_negative_divisor = { "7 // -2", Value::Int(-4) },
    mod_positive = { "7 % 3", Value::Int(1) },
    mod_negative_dividend = { "-7 % 3", Value::Int(2) },
    mod_negative_divisor = { "7 % -3", Value::Int(-2) },
    float_floor_div = { "7.5 // 2", Value::Float(3.0) },
    pow = { "2 ** 10", Value::Int(1024) },
    negative_pow = { "2 ** -1", Value::Float(0.5) },
    mixed = { "1 + 0.5", Value::Float(1.5) },
    bool_as_int = { "True + 1", Value::Int(2) },
    concat = { "'ab' + 'cd'", Value::Str("abcd".into()) },
    neg = { "-(3 - 5)", Value::Int(2) },
)]
fn arithmetic(input: &str, expected: Value) {
    assert_eq!(run(input).unwrap(), expected);
}

#[parameterized(
    int_div_zero = { "1 / 0" },
    floor_div_zero = { "1 // 0" },
    mod_zero = { "1 % 0" },
    float_div_zero = { "1.0 / 0.0" },
)]
fn division_by_zero(input: &str) {
    assert_eq!(run(input).unwrap_err(), ConditionError::DivisionByZero);
}

#[parameterized(
    add = { "9223372036854775807 + 1" },
    mul = { "9223372036854775807 * 2" },
    pow = { "10 ** 100" },
    neg = { "-(-9223372036854775807 - 1)" },
)]
fn overflow(input: &str) {
    assert_eq!(run(input).unwrap_err(), ConditionError::Overflow);
}

#[parameterized(
    float_var = { "float(loss) < 0.5", true },
    int_var = { "int(epoch) >= 10", true },
    chained = { "0 < float(loss) < 1", true },
    chained_fails_on_second = { "0 < float(loss) < 0.1", false },
    string_eq = { "epoch == '12'", true },
    string_vs_number_eq = { "epoch == 12", false },
    string_vs_number_ne = { "epoch != 12", true },
    int_float_eq = { "1 == 1.0", true },
    substring = { "'nan' in status", true },
    not_substring = { "'inf' not in status", true },
    string_ordering = { "'abc' < 'abd'", true },
)]
fn comparisons(input: &str, expected: bool) {
    assert_eq!(run(input).unwrap(), Value::Bool(expected));
}

#[test]
fn ordering_string_against_number_is_a_type_error() {
    assert!(matches!(run("epoch < 5"), Err(ConditionError::Type(_))));
}

#[test]
fn in_requires_strings() {
    assert!(matches!(run("1 in status"), Err(ConditionError::Type(_))));
}

#[test]
fn boolean_operators_return_operands() {
    assert_eq!(run("0 or 'fallback'").unwrap(), Value::Str("fallback".into()));
    assert_eq!(run("'' and missing").unwrap(), Value::Str(String::new()));
    assert_eq!(run("not 0").unwrap(), Value::Bool(true));
}

#[test]
fn short_circuit_skips_unknown_variables() {
    assert_eq!(run("True or missing").unwrap(), Value::Bool(true));
    assert_eq!(
        run("False or missing").unwrap_err(),
        ConditionError::UnknownVariable("missing".into())
    );
}

#[parameterized(
    float_of_string = { "float(' 1.5 ')", Value::Float(1.5) },
    int_of_string = { "int('42')", Value::Int(42) },
    int_truncates_float = { "int(-3.9)", Value::Int(-3) },
    str_of_float = { "str(3.0)", Value::Str("3.0".into()) },
    str_of_int = { "str(3)", Value::Str("3".into()) },
    str_of_bool = { "str(True)", Value::Str("True".into()) },
    len_counts_chars = { "len('héllo')", Value::Int(5) },
    abs_int = { "abs(-4)", Value::Int(4) },
    abs_float = { "abs(-0.5)", Value::Float(0.5) },
    min_mixed = { "min(3, 1.5, 2)", Value::Float(1.5) },
    max_single = { "max(7)", Value::Int(7) },
    max_strings = { "max('a', 'c', 'b')", Value::Str("c".into()) },
)]
fn functions(input: &str, expected: Value) {
    assert_eq!(run(input).unwrap(), expected);
}

#[test]
fn int_rejects_decimal_strings() {
    assert!(matches!(run("int('3.5')"), Err(ConditionError::Value(_))));
}

#[test]
fn float_rejects_garbage() {
    assert!(matches!(run("float(status)"), Err(ConditionError::Value(_))));
}

#[test]
fn arity_is_checked() {
    assert_eq!(
        run("float(1, 2)").unwrap_err(),
        ConditionError::Arity {
            func: "float",
            expected: "exactly 1 argument",
            got: 2
        }
    );
    assert!(matches!(run("max()"), Err(ConditionError::Arity { got: 0, .. })));
}

#[parameterized(
    zero = { Value::Int(0), false },
    nonzero = { Value::Int(-1), true },
    zero_float = { Value::Float(0.0), false },
    empty = { Value::Str(String::new()), false },
    text = { Value::Str("0".into()), true },
    falsy = { Value::Bool(false), false },
)]
fn truthiness(value: Value, expected: bool) {
    assert_eq!(value.truthy(), expected);
}
