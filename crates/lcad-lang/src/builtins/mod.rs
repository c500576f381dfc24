//! The builtin function library.
//!
//! The registry is built once at startup, is immutable afterwards, and is
//! injected into the root lexical frame — there is no ambient global
//! state. Each builtin declares a signature used by the generic binding
//! routine; special forms bypass binding and receive their raw argument
//! nodes instead, which is how `if`, `and`, the loops and the geometry
//! forms control their own evaluation order.

use std::collections::HashMap;
use std::rc::Rc;

use crate::analysis::env::{EnvArena, FrameId};
use crate::error::EvalError;
use crate::runtime::eval::Evaluator;
use crate::runtime::model::Model;
use crate::runtime::signature::{BoundArgs, Signature};
use crate::runtime::value::{Function, Value};
use crate::syntax::ast::{ExprNode, Span};

pub mod control;
pub mod geometry;
pub mod lists;
pub mod math;
pub mod modules;
pub mod random;
pub mod strings;

/// Receives raw, unevaluated argument nodes and drives its own evaluation.
pub type SpecialFn = fn(&mut Evaluator, &mut Model, &ExprNode) -> Result<Value, EvalError>;

/// Receives arguments already evaluated and validated against the signature.
pub type OrdinaryFn = fn(&mut Evaluator, &mut Model, BoundArgs, &Span) -> Result<Value, EvalError>;

#[derive(Clone, Copy)]
pub enum BuiltinImpl {
    Special(SpecialFn),
    Ordinary(OrdinaryFn),
}

pub struct Builtin {
    pub name: &'static str,
    pub sig: Signature,
    pub imp: BuiltinImpl,
}

impl std::fmt::Debug for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builtin").field("name", &self.name).finish()
    }
}

/// Reserved constant names seeded into every root frame alongside the
/// builtins. Rebinding any of them is a hard error regardless of scope.
pub const RESERVED_CONSTANTS: &[&str] = &["t", "nil", "e", "pi", "step-offset", "time-index"];

/// Root-owned process symbols that `set` is allowed to write.
pub const MUTABLE_SYMBOLS: &[&str] = &["step-offset", "time-index"];

pub struct Registry {
    builtins: HashMap<&'static str, Rc<Builtin>>,
}

impl Registry {
    pub fn standard() -> Self {
        let mut r = Self { builtins: HashMap::new() };
        control::register(&mut r);
        math::register(&mut r);
        lists::register(&mut r);
        strings::register(&mut r);
        random::register(&mut r);
        geometry::register(&mut r);
        modules::register(&mut r);
        r
    }

    pub(crate) fn special(&mut self, name: &'static str, sig: Signature, f: SpecialFn) {
        self.add(name, sig, BuiltinImpl::Special(f));
    }

    pub(crate) fn ordinary(&mut self, name: &'static str, sig: Signature, f: OrdinaryFn) {
        self.add(name, sig, BuiltinImpl::Ordinary(f));
    }

    fn add(&mut self, name: &'static str, sig: Signature, imp: BuiltinImpl) {
        debug_assert!(!self.builtins.contains_key(name), "duplicate builtin `{name}`");
        self.builtins.insert(name, Rc::new(Builtin { name, sig, imp }));
    }

    pub fn get(&self, name: &str) -> Option<&Rc<Builtin>> {
        self.builtins.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builtins.contains_key(name)
    }

    /// Builtin functions and reserved constants alike may never be rebound.
    pub fn is_reserved(&self, name: &str) -> bool {
        self.contains(name) || RESERVED_CONSTANTS.contains(&name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Rc<Builtin>)> {
        self.builtins.iter().map(|(name, b)| (*name, b))
    }
}

/// Allocate a root frame and seed it: every builtin, the boolean
/// sentinels, the math constants, and the process symbols. Used for the
/// top-level script and for each imported module's fresh environment.
pub fn seed_root(arena: &mut EnvArena, registry: &Registry) -> FrameId {
    let root = arena.new_frame(None);
    for (name, builtin) in registry.iter() {
        let slot = arena.bind(root, name, true).expect("fresh root frame");
        arena.set(slot, Value::Function(Function::Builtin(builtin.clone())));
    }
    let constants = [
        ("t", Value::T),
        ("nil", Value::NIL),
        ("e", Value::Float(std::f64::consts::E)),
        ("pi", Value::Float(std::f64::consts::PI)),
        ("step-offset", Value::Int(0)),
        ("time-index", Value::Int(0)),
    ];
    for (name, value) in constants {
        let slot = arena.bind(root, name, true).expect("fresh root frame");
        arena.set(slot, value);
    }
    root
}

// ─── Shared helpers ──────────────────────────────────────────────────────────

/// Extract an int argument the signature has already type-checked.
pub(crate) fn int_arg(value: &Value) -> i64 {
    match value {
        Value::Int(i) => *i,
        _ => unreachable!("signature admitted a non-int"),
    }
}

pub(crate) fn str_arg(value: &Value) -> &str {
    match value {
        Value::Str(s) => s,
        _ => unreachable!("signature admitted a non-string"),
    }
}

/// True when every argument is an int — arithmetic stays integral until a
/// float appears.
pub(crate) fn all_ints(values: &[Value]) -> bool {
    values.iter().all(|v| matches!(v, Value::Int(_)))
}
