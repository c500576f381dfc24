//! Declared argument contracts and the generic binding routine.
//!
//! Every ordinary builtin declares one of three calling conventions:
//! a fixed list of required type sets, a variadic tail, or required
//! positionals followed by keyword pairs. A function never combines the
//! variadic and keyword conventions. User-defined functions synthesize
//! the equivalent contract from their parameter list (see
//! `Evaluator::call_user`); this module is the single place where
//! builtin argument counts, types and keywords are enforced.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{EvalError, EvalErrorKind};
use crate::runtime::value::{TypeSet, Value};
use crate::syntax::ast::{Node, Span};

#[derive(Debug, Clone)]
pub struct KwSpec {
    pub name: &'static str,
    pub types: TypeSet,
    pub default: Value,
}

#[derive(Debug, Clone)]
pub enum Signature {
    /// Exactly these positional arguments.
    Fixed(Vec<TypeSet>),
    /// Required positionals, then any number of `rest`-typed trailing args.
    Variadic { required: Vec<TypeSet>, rest: TypeSet },
    /// Required positionals, then `:name value` pairs.
    Keyword { required: Vec<TypeSet>, keys: Vec<KwSpec> },
}

impl Signature {
    pub fn any(n: usize) -> Signature {
        Signature::Fixed(vec![TypeSet::ANY; n])
    }

    /// Count validation — run once per call site, then latched.
    pub fn check_count(&self, name: &str, n: usize, span: &Span) -> Result<(), EvalError> {
        let ok = match self {
            Signature::Fixed(required) => n == required.len(),
            Signature::Variadic { required, .. } => n >= required.len(),
            Signature::Keyword { required, .. } => {
                n >= required.len() && (n - required.len()) % 2 == 0
            }
        };
        if ok {
            return Ok(());
        }
        let expected = match self {
            Signature::Fixed(required) => required.len().to_string(),
            Signature::Variadic { required, .. } => format!("at least {}", required.len()),
            Signature::Keyword { required, .. } => {
                format!("{} plus `:name value` pairs", required.len())
            }
        };
        Err(EvalError::new(
            EvalErrorKind::WrongArgCount { name: name.to_string(), expected, actual: n },
            span,
        ))
    }
}

/// Evaluated, validated arguments ready for a builtin body.
#[derive(Debug)]
pub struct BoundArgs {
    pub positional: Vec<Value>,
    pub keywords: HashMap<&'static str, Value>,
}

impl BoundArgs {
    pub fn keyword(&self, name: &str) -> &Value {
        &self.keywords[name]
    }
}

/// The generic binding algorithm: evaluate required arguments in order and
/// type-check each, then consume the variadic tail or keyword pairs. `eval`
/// is the evaluator re-entry point — arguments are evaluated left to right,
/// eagerly, exactly once.
pub fn bind(
    name: &str,
    sig: &Signature,
    args: &[Rc<Node>],
    span: &Span,
    eval: &mut impl FnMut(&Rc<Node>) -> Result<Value, EvalError>,
) -> Result<BoundArgs, EvalError> {
    sig.check_count(name, args.len(), span)?;

    let (required, rest, keys): (&[TypeSet], Option<TypeSet>, Option<&[KwSpec]>) = match sig {
        Signature::Fixed(required) => (required, None, None),
        Signature::Variadic { required, rest } => (required, Some(*rest), None),
        Signature::Keyword { required, keys } => (required, None, Some(keys)),
    };

    let mut positional = Vec::with_capacity(args.len());
    for (i, (node, expected)) in args.iter().zip(required.iter()).enumerate() {
        let value = eval(node)?;
        check_type(name, i, *expected, &value, span)?;
        positional.push(value);
    }

    let tail = &args[required.len()..];

    if let Some(rest) = rest {
        for (i, node) in tail.iter().enumerate() {
            let value = eval(node)?;
            check_type(name, required.len() + i, rest, &value, span)?;
            positional.push(value);
        }
        return Ok(BoundArgs { positional, keywords: HashMap::new() });
    }

    let mut keywords = HashMap::new();
    if let Some(keys) = keys {
        for spec in keys {
            keywords.insert(spec.name, spec.default.clone());
        }
        let mut pairs = tail.chunks_exact(2);
        for pair in &mut pairs {
            let keyword = match pair[0].symbol_name().and_then(|n| n.strip_prefix(':')) {
                Some(k) => k,
                None => {
                    return Err(EvalError::new(
                        EvalErrorKind::WrongType {
                            name: name.to_string(),
                            index: required.len() + 1,
                            expected: "a `:keyword` name".into(),
                            actual: "expression",
                        },
                        pair[0].span(),
                    ));
                }
            };
            let Some(spec) = keys.iter().find(|s| s.name == keyword) else {
                return Err(EvalError::new(
                    EvalErrorKind::UnknownKeyword {
                        name: name.to_string(),
                        keyword: keyword.to_string(),
                    },
                    pair[0].span(),
                ));
            };
            let value = eval(&pair[1])?;
            check_type(name, required.len(), spec.types, &value, span)?;
            keywords.insert(spec.name, value);
        }
    } else if !tail.is_empty() {
        // Fixed signature with extras — check_count already rejected this.
        unreachable!("fixed-arity call with trailing arguments");
    }

    Ok(BoundArgs { positional, keywords })
}

pub fn check_type(
    name: &str,
    index: usize,
    expected: TypeSet,
    value: &Value,
    span: &Span,
) -> Result<(), EvalError> {
    if expected.intersects(value.type_set()) {
        return Ok(());
    }
    Err(EvalError::new(
        EvalErrorKind::WrongType {
            name: name.to_string(),
            index: index + 1,
            expected: expected.describe(),
            actual: value.type_name(),
        },
        span,
    ))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
