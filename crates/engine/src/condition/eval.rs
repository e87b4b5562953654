// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tree-walking evaluator for condition expressions.

use super::parser::{BinOp, CmpOp, Expr, Func};
use super::ConditionError;
use jw_core::Variables;
use std::cmp::Ordering;
use std::fmt;

/// A runtime value. Captured variables always enter as strings.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl Value {
    pub fn truthy(&self) -> bool {
        match self {
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bool(_) => "bool",
        }
    }

    fn as_number(&self) -> Option<Number> {
        match self {
            Value::Int(i) => Some(Number::Int(*i)),
            Value::Bool(b) => Some(Number::Int(i64::from(*b))),
            Value::Float(f) => Some(Number::Float(*f)),
            Value::Str(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 => {
                write!(f, "{x:.1}")
            }
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn to_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Number::Int(i) => Value::Int(i),
            Number::Float(f) => Value::Float(f),
        }
    }
}

fn type_error(message: String) -> ConditionError {
    ConditionError::Type(message)
}

pub(crate) fn eval(expr: &Expr, vars: &Variables) -> Result<Value, ConditionError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Var(name) => vars
            .get(name)
            .map(|v| Value::Str(v.clone()))
            .ok_or_else(|| ConditionError::UnknownVariable(name.clone())),
        Expr::Neg(inner) => match eval(inner, vars)?.as_number() {
            Some(Number::Int(i)) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or(ConditionError::Overflow),
            Some(Number::Float(f)) => Ok(Value::Float(-f)),
            None => Err(type_error("bad operand type for unary -: 'str'".to_string())),
        },
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, vars)?.truthy())),
        Expr::And(lhs, rhs) => {
            let l = eval(lhs, vars)?;
            if l.truthy() {
                eval(rhs, vars)
            } else {
                Ok(l)
            }
        }
        Expr::Or(lhs, rhs) => {
            let l = eval(lhs, vars)?;
            if l.truthy() {
                Ok(l)
            } else {
                eval(rhs, vars)
            }
        }
        Expr::Binary(op, lhs, rhs) => binary(*op, eval(lhs, vars)?, eval(rhs, vars)?),
        Expr::Compare(first, rest) => {
            let mut left = eval(first, vars)?;
            for (op, rhs) in rest {
                let right = eval(rhs, vars)?;
                if !compare(*op, &left, &right)? {
                    return Ok(Value::Bool(false));
                }
                left = right;
            }
            Ok(Value::Bool(true))
        }
        Expr::Call(func, args) => {
            let args = args
                .iter()
                .map(|a| eval(a, vars))
                .collect::<Result<Vec<_>, _>>()?;
            call(*func, args)
        }
    }
}

fn binary(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, ConditionError> {
    if let (BinOp::Add, Value::Str(a), Value::Str(b)) = (op, &lhs, &rhs) {
        return Ok(Value::Str(format!("{a}{b}")));
    }

    let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) else {
        return Err(type_error(format!(
            "unsupported operand types for {op:?}: '{}' and '{}'",
            lhs.type_name(),
            rhs.type_name()
        )));
    };

    match (a, b) {
        (Number::Int(x), Number::Int(y)) => int_binary(op, x, y),
        _ => float_binary(op, a.to_f64(), b.to_f64()),
    }
}

fn int_binary(op: BinOp, x: i64, y: i64) -> Result<Value, ConditionError> {
    let result = match op {
        BinOp::Add => x.checked_add(y),
        BinOp::Sub => x.checked_sub(y),
        BinOp::Mul => x.checked_mul(y),
        BinOp::Div => return float_binary(op, x as f64, y as f64),
        BinOp::FloorDiv | BinOp::Mod if y == 0 => return Err(ConditionError::DivisionByZero),
        BinOp::FloorDiv => x.checked_div_euclid(y).map(|q| {
            // Floor toward negative infinity, like Python
            if y < 0 && x.rem_euclid(y) != 0 {
                q - 1
            } else {
                q
            }
        }),
        BinOp::Mod => x.checked_rem_euclid(y).map(|r| {
            // Result takes the sign of the divisor
            if y < 0 && r != 0 {
                r + y
            } else {
                r
            }
        }),
        BinOp::Pow if y < 0 => return float_binary(op, x as f64, y as f64),
        BinOp::Pow => u32::try_from(y).ok().and_then(|e| x.checked_pow(e)),
    };
    result.map(Value::Int).ok_or(ConditionError::Overflow)
}

fn float_binary(op: BinOp, x: f64, y: f64) -> Result<Value, ConditionError> {
    let result = match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div | BinOp::FloorDiv | BinOp::Mod if y == 0.0 => {
            return Err(ConditionError::DivisionByZero)
        }
        BinOp::Div => x / y,
        BinOp::FloorDiv => (x / y).floor(),
        BinOp::Mod => x - y * (x / y).floor(),
        BinOp::Pow => x.powf(y),
    };
    Ok(Value::Float(result))
}

fn order(lhs: &Value, rhs: &Value) -> Result<Ordering, ConditionError> {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => match (lhs.as_number(), rhs.as_number()) {
            (Some(Number::Int(a)), Some(Number::Int(b))) => Ok(a.cmp(&b)),
            (Some(a), Some(b)) => a
                .to_f64()
                .partial_cmp(&b.to_f64())
                .ok_or_else(|| type_error("cannot order NaN".to_string())),
            _ => Err(type_error(format!(
                "cannot compare '{}' with '{}'",
                lhs.type_name(),
                rhs.type_name()
            ))),
        },
    }
}

fn equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Str(_), _) | (_, Value::Str(_)) => false,
        _ => matches!(order(lhs, rhs), Ok(Ordering::Equal)),
    }
}

fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<bool, ConditionError> {
    Ok(match op {
        CmpOp::Eq => equal(lhs, rhs),
        CmpOp::Ne => !equal(lhs, rhs),
        CmpOp::Lt => order(lhs, rhs)? == Ordering::Less,
        CmpOp::Le => order(lhs, rhs)? != Ordering::Greater,
        CmpOp::Gt => order(lhs, rhs)? == Ordering::Greater,
        CmpOp::Ge => order(lhs, rhs)? != Ordering::Less,
        CmpOp::In | CmpOp::NotIn => {
            let (Value::Str(needle), Value::Str(haystack)) = (lhs, rhs) else {
                return Err(type_error(format!(
                    "'in' requires strings, got '{}' and '{}'",
                    lhs.type_name(),
                    rhs.type_name()
                )));
            };
            haystack.contains(needle.as_str()) == (op == CmpOp::In)
        }
    })
}

fn arity(func: Func, args: &[Value], expected: &'static str, ok: bool) -> Result<(), ConditionError> {
    if ok {
        Ok(())
    } else {
        Err(ConditionError::Arity {
            func: func.name(),
            expected,
            got: args.len(),
        })
    }
}

fn call(func: Func, args: Vec<Value>) -> Result<Value, ConditionError> {
    match func {
        Func::Min | Func::Max => {
            arity(func, &args, "at least 1 argument", !args.is_empty())?;
            let mut best: Option<Value> = None;
            for arg in args {
                best = Some(match best {
                    None => arg,
                    Some(current) => {
                        let ord = order(&arg, &current)?;
                        let better = if func == Func::Min {
                            ord == Ordering::Less
                        } else {
                            ord == Ordering::Greater
                        };
                        if better {
                            arg
                        } else {
                            current
                        }
                    }
                });
            }
            best.ok_or(ConditionError::Arity {
                func: func.name(),
                expected: "at least 1 argument",
                got: 0,
            })
        }
        _ => {
            arity(func, &args, "exactly 1 argument", args.len() == 1)?;
            let Some(arg) = args.into_iter().next() else {
                return Err(ConditionError::Arity {
                    func: func.name(),
                    expected: "exactly 1 argument",
                    got: 0,
                });
            };
            unary_call(func, arg)
        }
    }
}

fn unary_call(func: Func, arg: Value) -> Result<Value, ConditionError> {
    match (func, arg) {
        (Func::Str, v) => Ok(Value::Str(v.to_string())),
        (Func::Float, Value::Str(s)) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| ConditionError::Value(format!("could not convert '{s}' to float"))),
        (Func::Float, v) => v
            .as_number()
            .map(|n| Value::Float(n.to_f64()))
            .ok_or_else(|| type_error("float() argument".to_string())),
        (Func::Int, Value::Str(s)) => s
            .trim()
            .replace('_', "")
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| ConditionError::Value(format!("invalid literal for int(): '{s}'"))),
        (Func::Int, Value::Float(f)) => {
            let t = f.trunc();
            if t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64 {
                Ok(Value::Int(t as i64))
            } else {
                Err(ConditionError::Value(format!("cannot convert {f} to int")))
            }
        }
        (Func::Int, v) => v
            .as_number()
            .map(Number::into_value)
            .ok_or_else(|| type_error("int() argument".to_string())),
        (Func::Len, Value::Str(s)) => Ok(Value::Int(s.chars().count() as i64)),
        (Func::Len, v) => Err(type_error(format!(
            "object of type '{}' has no len()",
            v.type_name()
        ))),
        (Func::Abs, v) => match v.as_number() {
            Some(Number::Int(i)) => i.checked_abs().map(Value::Int).ok_or(ConditionError::Overflow),
            Some(Number::Float(f)) => Ok(Value::Float(f.abs())),
            None => Err(type_error("bad operand type for abs(): 'str'".to_string())),
        },
        (Func::Min | Func::Max, v) => Ok(v),
    }
}

#[cfg(test)]
#[path = "eval_tests.rs"]
mod tests;
