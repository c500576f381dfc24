//! String building and console output.

use std::fmt::Write as _;

use crate::builtins::Registry;
use crate::runtime::signature::Signature;
use crate::runtime::value::{TypeSet, Value};

pub(super) fn register(r: &mut Registry) {
    r.ordinary(
        "concat",
        Signature::Variadic { required: vec![], rest: TypeSet::ANY },
        |_, _, a, _| {
            let mut out = String::new();
            for v in &a.positional {
                let _ = write!(out, "{v}");
            }
            Ok(Value::Str(out.into()))
        },
    );

    r.ordinary(
        "print",
        Signature::Variadic { required: vec![], rest: TypeSet::ANY },
        |_, _, a, _| {
            let line =
                a.positional.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ");
            println!("{line}");
            Ok(Value::NIL)
        },
    );
}
