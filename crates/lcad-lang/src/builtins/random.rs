//! Random number builtins, backed by the evaluator's seedable RNG.

use rand::Rng as _;

use crate::builtins::{int_arg, Registry};
use crate::error::{EvalError, EvalErrorKind};
use crate::runtime::signature::Signature;
use crate::runtime::value::{TypeSet, Value};

pub(super) fn register(r: &mut Registry) {
    r.ordinary("rand-uniform", Signature::Fixed(vec![]), |eval, _, _, _| {
        Ok(Value::Float(eval.rng.gen_range(0.0..1.0)))
    });

    r.ordinary("rand-int", Signature::Fixed(vec![TypeSet::INT]), |eval, _, a, span| {
        let n = int_arg(&a.positional[0]);
        if n <= 0 {
            return Err(EvalError::new(
                EvalErrorKind::IndexOutOfRange { index: n, len: 0 },
                span,
            ));
        }
        Ok(Value::Int(eval.rng.gen_range(0..n)))
    });
}
