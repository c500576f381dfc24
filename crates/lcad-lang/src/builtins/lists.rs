//! List builtins. Lists are immutable — `append` and `reverse` build new
//! lists; scripts mutate by rebinding with `set`.

use std::rc::Rc;

use crate::builtins::{int_arg, Registry};
use crate::error::{EvalError, EvalErrorKind};
use crate::runtime::signature::Signature;
use crate::runtime::value::{TypeSet, Value};
use crate::syntax::ast::Span;

/// All elements as f64, or `None` when any element is non-numeric.
fn numbers(value: &Value) -> Option<Vec<f64>> {
    let Value::List(items) = value else { return None };
    items
        .iter()
        .map(|v| match v {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        })
        .collect()
}

fn vector_type_error(name: &str, actual: &Value, span: &Span) -> EvalError {
    EvalError::new(
        EvalErrorKind::WrongType {
            name: name.to_string(),
            index: 1,
            expected: "numeric lists of matching length".into(),
            actual: actual.type_name(),
        },
        span,
    )
}

pub(super) fn register(r: &mut Registry) {
    r.ordinary(
        "list",
        Signature::Variadic { required: vec![], rest: TypeSet::ANY },
        |_, _, a, _| Ok(Value::List(Rc::new(a.positional))),
    );

    r.ordinary(
        "item",
        Signature::Fixed(vec![TypeSet::INT, TypeSet::LIST]),
        |_, _, a, span| {
            let index = int_arg(&a.positional[0]);
            let Value::List(items) = &a.positional[1] else { unreachable!() };
            if index < 0 || index as usize >= items.len() {
                return Err(EvalError::new(
                    EvalErrorKind::IndexOutOfRange { index, len: items.len() },
                    span,
                ));
            }
            Ok(items[index as usize].clone())
        },
    );

    r.ordinary(
        "len",
        Signature::Fixed(vec![TypeSet::LIST.union(TypeSet::STRING)]),
        |_, _, a, _| {
            let n = match &a.positional[0] {
                Value::List(items) => items.len(),
                Value::Str(s) => s.chars().count(),
                _ => unreachable!(),
            };
            Ok(Value::Int(n as i64))
        },
    );

    r.ordinary(
        "append",
        Signature::Variadic { required: vec![TypeSet::LIST], rest: TypeSet::LIST },
        |_, _, a, _| {
            let mut out = Vec::new();
            for v in &a.positional {
                let Value::List(items) = v else { unreachable!() };
                out.extend(items.iter().cloned());
            }
            Ok(Value::List(Rc::new(out)))
        },
    );

    r.ordinary("reverse", Signature::Fixed(vec![TypeSet::LIST]), |_, _, a, _| {
        let Value::List(items) = &a.positional[0] else { unreachable!() };
        let mut out: Vec<Value> = items.iter().cloned().collect();
        out.reverse();
        Ok(Value::List(Rc::new(out)))
    });

    r.ordinary("dot", Signature::Fixed(vec![TypeSet::LIST, TypeSet::LIST]), |_, _, a, span| {
        let (x, y) = (numbers(&a.positional[0]), numbers(&a.positional[1]));
        match (x, y) {
            (Some(x), Some(y)) if x.len() == y.len() => {
                Ok(Value::Float(x.iter().zip(&y).map(|(a, b)| a * b).sum()))
            }
            _ => Err(vector_type_error("dot", &a.positional[0], span)),
        }
    });

    r.ordinary("cross", Signature::Fixed(vec![TypeSet::LIST, TypeSet::LIST]), |_, _, a, span| {
        let (x, y) = (numbers(&a.positional[0]), numbers(&a.positional[1]));
        match (x, y) {
            (Some(x), Some(y)) if x.len() == 3 && y.len() == 3 => Ok(Value::List(Rc::new(vec![
                Value::Float(x[1] * y[2] - x[2] * y[1]),
                Value::Float(x[2] * y[0] - x[0] * y[2]),
                Value::Float(x[0] * y[1] - x[1] * y[0]),
            ]))),
            _ => Err(vector_type_error("cross", &a.positional[0], span)),
        }
    });

    r.ordinary(
        "range",
        Signature::Variadic { required: vec![TypeSet::INT], rest: TypeSet::INT },
        |_, _, a, span| {
            if a.positional.len() > 3 {
                return Err(EvalError::new(
                    EvalErrorKind::WrongArgCount {
                        name: "range".into(),
                        expected: "1 to 3".into(),
                        actual: a.positional.len(),
                    },
                    span,
                ));
            }
            let nums: Vec<i64> = a.positional.iter().map(int_arg).collect();
            let (start, end, step) = match nums.as_slice() {
                [end] => (0, *end, 1),
                [start, end] => (*start, *end, 1),
                [start, end, step] => (*start, *end, *step),
                _ => unreachable!(),
            };
            if step == 0 {
                return Err(EvalError::new(EvalErrorKind::DivideByZero, span));
            }
            let mut out = Vec::new();
            let mut i = start;
            while (step > 0 && i < end) || (step < 0 && i > end) {
                out.push(Value::Int(i));
                i += step;
            }
            Ok(Value::List(Rc::new(out)))
        },
    );
}
