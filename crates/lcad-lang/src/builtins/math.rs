//! Arithmetic, comparison and math builtins.
//!
//! Arithmetic is variadic and int-preserving: a chain of ints yields an
//! int, the first float promotes the whole result. `(- a)` negates.
//! Comparisons are binary; `=`/`!=` use structural equality across all
//! types, the orderings are numeric only.

use crate::builtins::{all_ints, int_arg, Registry};
use crate::error::{EvalError, EvalErrorKind};
use crate::runtime::eval::Evaluator;
use crate::runtime::model::Model;
use crate::runtime::signature::{BoundArgs, Signature};
use crate::runtime::value::{TypeSet, Value};
use crate::syntax::ast::Span;

pub(super) fn register(r: &mut Registry) {
    let one_number = || Signature::Fixed(vec![TypeSet::NUMBER]);
    let two_numbers = || Signature::Fixed(vec![TypeSet::NUMBER, TypeSet::NUMBER]);
    let chain = || Signature::Variadic { required: vec![TypeSet::NUMBER], rest: TypeSet::NUMBER };

    r.ordinary("+", chain(), add);
    r.ordinary("-", chain(), sub);
    r.ordinary("*", chain(), mul);
    r.ordinary(
        "/",
        Signature::Variadic {
            required: vec![TypeSet::NUMBER, TypeSet::NUMBER],
            rest: TypeSet::NUMBER,
        },
        div,
    );
    r.ordinary("mod", two_numbers(), modulo);

    r.ordinary("=", Signature::any(2), |_, _, a, _| {
        Ok(Value::Bool(a.positional[0] == a.positional[1]))
    });
    r.ordinary("!=", Signature::any(2), |_, _, a, _| {
        Ok(Value::Bool(a.positional[0] != a.positional[1]))
    });
    r.ordinary("<", two_numbers(), |_, _, a, _| Ok(cmp(&a, |x, y| x < y)));
    r.ordinary("<=", two_numbers(), |_, _, a, _| Ok(cmp(&a, |x, y| x <= y)));
    r.ordinary(">", two_numbers(), |_, _, a, _| Ok(cmp(&a, |x, y| x > y)));
    r.ordinary(">=", two_numbers(), |_, _, a, _| Ok(cmp(&a, |x, y| x >= y)));

    r.ordinary("not", Signature::Fixed(vec![TypeSet::BOOLEAN]), |_, _, a, _| {
        match a.positional[0] {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            _ => unreachable!("signature admitted a non-boolean"),
        }
    });

    r.ordinary("sin", one_number(), |_, _, a, _| Ok(Value::Float(a.positional[0].as_f64().sin())));
    r.ordinary("cos", one_number(), |_, _, a, _| Ok(Value::Float(a.positional[0].as_f64().cos())));
    r.ordinary("tan", one_number(), |_, _, a, _| Ok(Value::Float(a.positional[0].as_f64().tan())));
    r.ordinary("asin", one_number(), |_, _, a, _| Ok(Value::Float(a.positional[0].as_f64().asin())));
    r.ordinary("acos", one_number(), |_, _, a, _| Ok(Value::Float(a.positional[0].as_f64().acos())));
    r.ordinary("atan", one_number(), |_, _, a, _| Ok(Value::Float(a.positional[0].as_f64().atan())));
    r.ordinary("atan2", two_numbers(), |_, _, a, _| {
        Ok(Value::Float(a.positional[0].as_f64().atan2(a.positional[1].as_f64())))
    });
    r.ordinary("sqrt", one_number(), |_, _, a, _| Ok(Value::Float(a.positional[0].as_f64().sqrt())));
    r.ordinary("pow", two_numbers(), |_, _, a, _| {
        Ok(Value::Float(a.positional[0].as_f64().powf(a.positional[1].as_f64())))
    });

    r.ordinary("abs", one_number(), |_, _, a, _| {
        Ok(match a.positional[0] {
            Value::Int(i) => Value::Int(i.abs()),
            ref v => Value::Float(v.as_f64().abs()),
        })
    });
    r.ordinary("sign", one_number(), |_, _, a, _| {
        Ok(match a.positional[0] {
            Value::Int(i) => Value::Int(i.signum()),
            ref v => Value::Float(v.as_f64().signum()),
        })
    });
    r.ordinary("fract", one_number(), |_, _, a, _| {
        let x = a.positional[0].as_f64();
        Ok(Value::Float(x - x.floor()))
    });
    r.ordinary(
        "clamp",
        Signature::Fixed(vec![TypeSet::NUMBER, TypeSet::NUMBER, TypeSet::NUMBER]),
        |_, _, a, _| {
            let (x, lo, hi) =
                (a.positional[0].as_f64(), a.positional[1].as_f64(), a.positional[2].as_f64());
            Ok(Value::Float(x.clamp(lo, hi)))
        },
    );
    r.ordinary(
        "lerp",
        Signature::Fixed(vec![TypeSet::NUMBER, TypeSet::NUMBER, TypeSet::NUMBER]),
        |_, _, a, _| {
            let (x, y, t) =
                (a.positional[0].as_f64(), a.positional[1].as_f64(), a.positional[2].as_f64());
            Ok(Value::Float(x + (y - x) * t))
        },
    );
    r.ordinary("floor", one_number(), |_, _, a, _| Ok(to_int_like(&a.positional[0], f64::floor)));
    r.ordinary("ceil", one_number(), |_, _, a, _| Ok(to_int_like(&a.positional[0], f64::ceil)));
    r.ordinary("round", one_number(), |_, _, a, _| Ok(to_int_like(&a.positional[0], f64::round)));
    r.ordinary("min", two_numbers(), |_, _, a, _| Ok(pick(&a, |x, y| x <= y)));
    r.ordinary("max", two_numbers(), |_, _, a, _| Ok(pick(&a, |x, y| x >= y)));
}

// ─── Arithmetic ──────────────────────────────────────────────────────────────

fn add(_: &mut Evaluator, _: &mut Model, a: BoundArgs, _: &Span) -> Result<Value, EvalError> {
    if all_ints(&a.positional) {
        Ok(Value::Int(a.positional.iter().map(int_arg).sum()))
    } else {
        Ok(Value::Float(a.positional.iter().map(Value::as_f64).sum()))
    }
}

fn sub(_: &mut Evaluator, _: &mut Model, a: BoundArgs, _: &Span) -> Result<Value, EvalError> {
    if a.positional.len() == 1 {
        return Ok(match a.positional[0] {
            Value::Int(i) => Value::Int(-i),
            ref v => Value::Float(-v.as_f64()),
        });
    }
    if all_ints(&a.positional) {
        let first = int_arg(&a.positional[0]);
        Ok(Value::Int(a.positional[1..].iter().map(int_arg).fold(first, |acc, v| acc - v)))
    } else {
        let first = a.positional[0].as_f64();
        Ok(Value::Float(a.positional[1..].iter().fold(first, |acc, v| acc - v.as_f64())))
    }
}

fn mul(_: &mut Evaluator, _: &mut Model, a: BoundArgs, _: &Span) -> Result<Value, EvalError> {
    if all_ints(&a.positional) {
        Ok(Value::Int(a.positional.iter().map(int_arg).product()))
    } else {
        Ok(Value::Float(a.positional.iter().map(Value::as_f64).product()))
    }
}

fn div(_: &mut Evaluator, _: &mut Model, a: BoundArgs, span: &Span) -> Result<Value, EvalError> {
    let ints = all_ints(&a.positional);
    if ints {
        let mut acc = match a.positional[0] {
            Value::Int(i) => i,
            _ => unreachable!(),
        };
        for v in &a.positional[1..] {
            let d = match v {
                Value::Int(i) => *i,
                _ => unreachable!(),
            };
            if d == 0 {
                return Err(EvalError::new(EvalErrorKind::DivideByZero, span));
            }
            acc /= d;
        }
        Ok(Value::Int(acc))
    } else {
        let mut acc = a.positional[0].as_f64();
        for v in &a.positional[1..] {
            let d = v.as_f64();
            if d == 0.0 {
                return Err(EvalError::new(EvalErrorKind::DivideByZero, span));
            }
            acc /= d;
        }
        Ok(Value::Float(acc))
    }
}

fn modulo(_: &mut Evaluator, _: &mut Model, a: BoundArgs, span: &Span) -> Result<Value, EvalError> {
    match (&a.positional[0], &a.positional[1]) {
        (Value::Int(x), Value::Int(y)) => {
            if *y == 0 {
                return Err(EvalError::new(EvalErrorKind::DivideByZero, span));
            }
            Ok(Value::Int(x.rem_euclid(*y)))
        }
        (x, y) => {
            let d = y.as_f64();
            if d == 0.0 {
                return Err(EvalError::new(EvalErrorKind::DivideByZero, span));
            }
            Ok(Value::Float(x.as_f64().rem_euclid(d)))
        }
    }
}

// ─── Comparison helpers ──────────────────────────────────────────────────────

fn cmp(a: &BoundArgs, op: fn(f64, f64) -> bool) -> Value {
    Value::Bool(op(a.positional[0].as_f64(), a.positional[1].as_f64()))
}

fn pick(a: &BoundArgs, keep_first: fn(f64, f64) -> bool) -> Value {
    if keep_first(a.positional[0].as_f64(), a.positional[1].as_f64()) {
        a.positional[0].clone()
    } else {
        a.positional[1].clone()
    }
}

fn to_int_like(v: &Value, op: fn(f64) -> f64) -> Value {
    match v {
        Value::Int(i) => Value::Int(*i),
        other => Value::Float(op(other.as_f64())),
    }
}
