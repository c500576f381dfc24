//! Tree-walking evaluator.
//!
//! A plain recursive walk over the annotated AST: constants yield their
//! value, symbols walk their static frame chain, expressions dispatch
//! through the function value their head evaluates to. Special forms
//! receive raw argument nodes and drive their own evaluation; ordinary
//! functions get their arguments bound through the signature protocol
//! first. All domain-specific behavior lives in the builtin registry —
//! the evaluator itself knows nothing about geometry.

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::analysis::env::{EnvArena, FrameId};
use crate::builtins::{BuiltinImpl, Registry};
use crate::error::{EvalError, EvalErrorKind};
use crate::runtime::model::Model;
use crate::runtime::signature;
use crate::runtime::value::{Function, UserFunction, Value};
use crate::syntax::ast::{ExprNode, Node, Span};

/// Runaway recursion fails with a deterministic error well before the host
/// stack is exhausted.
pub const MAX_CALL_DEPTH: usize = 512;

#[derive(Debug, Clone)]
pub struct EvalOptions {
    /// Exposed to scripts as the read-only `time-index` symbol.
    pub time_index: i64,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Module search path for `import`, tried in order.
    pub search_paths: Vec<PathBuf>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        let mut search_paths = vec![PathBuf::from(".")];
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                search_paths.push(dir.join("library"));
            }
        }
        Self { time_index: 0, seed: None, search_paths }
    }
}

pub struct Evaluator {
    pub(crate) arena: EnvArena,
    pub(crate) registry: Rc<Registry>,
    pub(crate) root: FrameId,
    pub(crate) rng: StdRng,
    pub(crate) search_paths: Vec<PathBuf>,
    /// Modules already evaluated, keyed by canonical path — a second
    /// import re-exports without re-running the file.
    pub(crate) modules: HashMap<PathBuf, FrameId>,
    depth: usize,
}

impl Evaluator {
    pub(crate) fn new(
        arena: EnvArena,
        root: FrameId,
        registry: Rc<Registry>,
        options: &EvalOptions,
    ) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut eval = Self {
            arena,
            registry,
            root,
            rng,
            search_paths: options.search_paths.clone(),
            modules: HashMap::new(),
            depth: 0,
        };
        eval.set_root_symbol("time-index", Value::Int(options.time_index));
        eval
    }

    fn set_root_symbol(&mut self, name: &str, value: Value) {
        if let Some(binding) = self.arena.lookup(self.root, name) {
            let slot = binding.slot;
            self.arena.set(slot, value);
        }
    }

    /// Evaluate a top-level term sequence in order against one model;
    /// yields the value of the last term (`nil` for an empty program).
    pub fn run_program(
        &mut self,
        nodes: &[Rc<Node>],
        model: &mut Model,
    ) -> Result<Value, EvalError> {
        let mut last = Value::NIL;
        for node in nodes {
            last = self.eval(node, model)?;
        }
        Ok(last)
    }

    // ─── Node dispatch ────────────────────────────────────────────────────────

    pub fn eval(&mut self, node: &Node, model: &mut Model) -> Result<Value, EvalError> {
        match node {
            Node::Int(i, _) => Ok(Value::Int(*i)),
            Node::Float(f, _) => Ok(Value::Float(*f)),
            Node::Str(s, _) => Ok(Value::Str(s.as_str().into())),
            Node::Symbol(s) => self.eval_symbol(&s.name, s.env.get(), &s.span),
            Node::Expr(e) => self.eval_expr(e, model),
        }
    }

    fn eval_symbol(&self, name: &str, frame: FrameId, span: &Span) -> Result<Value, EvalError> {
        let Some(binding) = self.arena.lookup(frame, name) else {
            return Err(EvalError::new(EvalErrorKind::SymbolNotDefined(name.to_string()), span));
        };
        match self.arena.get(binding.slot) {
            Some(value) => Ok(value.clone()),
            None => Err(EvalError::new(EvalErrorKind::VariableNotSet(name.to_string()), span)),
        }
    }

    fn eval_expr(&mut self, e: &ExprNode, model: &mut Model) -> Result<Value, EvalError> {
        // `()` reads as "no-op / false" without special syntax.
        let Some(head) = e.elements.first() else {
            return Ok(Value::NIL);
        };

        let func = match self.eval(head, model)? {
            Value::Function(func) => func,
            other => {
                let what = head
                    .symbol_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| other.type_name().to_string());
                return Err(EvalError::new(EvalErrorKind::NotAFunction(what), &e.span));
            }
        };

        // One-shot argument-count validation per call site.
        if !e.checked.get() {
            self.check_call_count(&func, e)?;
            e.checked.set(true);
        }

        let name = func.name();
        self.dispatch(&func, e, model)
            .map_err(|err| err.push_frame(name, &e.span))
    }

    fn check_call_count(&self, func: &Function, e: &ExprNode) -> Result<(), EvalError> {
        let n = e.args().len();
        match func {
            Function::Builtin(b) => b.sig.check_count(b.name, n, &e.span),
            Function::User(u) => {
                let required = u.required_count();
                let ok = if u.has_keywords() {
                    n >= required && (n - required) % 2 == 0
                } else {
                    n == required
                };
                if ok {
                    return Ok(());
                }
                let expected = if u.has_keywords() {
                    format!("{required} plus `:name value` pairs")
                } else {
                    required.to_string()
                };
                Err(EvalError::new(
                    EvalErrorKind::WrongArgCount {
                        name: u.name.to_string(),
                        expected,
                        actual: n,
                    },
                    &e.span,
                ))
            }
        }
    }

    fn dispatch(
        &mut self,
        func: &Function,
        e: &ExprNode,
        model: &mut Model,
    ) -> Result<Value, EvalError> {
        match func {
            Function::Builtin(b) => match b.imp {
                BuiltinImpl::Special(f) => f(self, model, e),
                BuiltinImpl::Ordinary(f) => {
                    let bound = signature::bind(b.name, &b.sig, e.args(), &e.span, &mut |node| {
                        self.eval(node, model)
                    })?;
                    f(self, model, bound, &e.span)
                }
            },
            Function::User(u) => self.call_user(u.clone(), e.args(), &e.span, model),
        }
    }

    /// Invoke a function value with no arguments — used for the
    /// `step-offset` process symbol, which may be a zero-argument function.
    pub(crate) fn call_no_args(
        &mut self,
        value: &Value,
        model: &mut Model,
        span: &Span,
    ) -> Result<Value, EvalError> {
        match value {
            Value::Function(Function::Builtin(b)) => match b.imp {
                BuiltinImpl::Ordinary(f) => {
                    let bound = signature::bind(b.name, &b.sig, &[], span, &mut |_| {
                        unreachable!("no argument nodes")
                    })?;
                    f(self, model, bound, span)
                }
                BuiltinImpl::Special(_) => {
                    Err(EvalError::new(EvalErrorKind::NotAFunction(b.name.to_string()), span))
                }
            },
            Value::Function(Function::User(u)) => self.call_user(u.clone(), &[], span, model),
            other => {
                Err(EvalError::new(EvalErrorKind::NotAFunction(other.type_name().into()), span))
            }
        }
    }

    // ─── User function calls ─────────────────────────────────────────────────

    fn call_user(
        &mut self,
        func: Rc<UserFunction>,
        args: &[Rc<Node>],
        span: &Span,
        model: &mut Model,
    ) -> Result<Value, EvalError> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(EvalError::new(EvalErrorKind::RecursionLimit, span));
        }
        self.depth += 1;
        let result = self.call_user_inner(&func, args, span, model);
        self.depth -= 1;
        result
    }

    fn call_user_inner(
        &mut self,
        func: &UserFunction,
        args: &[Rc<Node>],
        span: &Span,
        model: &mut Model,
    ) -> Result<Value, EvalError> {
        let required = func.required_count();

        // The latch validated counts for call sites; direct invocations
        // (`call_no_args`) arrive unchecked.
        if args.len() < required {
            return Err(EvalError::new(
                EvalErrorKind::WrongArgCount {
                    name: func.name.to_string(),
                    expected: required.to_string(),
                    actual: args.len(),
                },
                span,
            ));
        }

        // Required positionals and keyword overrides evaluate eagerly,
        // left to right, in the caller's environment.
        let mut req_values = Vec::with_capacity(required);
        for node in &args[..required] {
            req_values.push(self.eval(node, model)?);
        }

        let mut provided: Vec<(&str, Value)> = Vec::new();
        for pair in args[required..].chunks_exact(2) {
            let Some(keyword) = pair[0].symbol_name().and_then(|n| n.strip_prefix(':')) else {
                return Err(EvalError::new(
                    EvalErrorKind::WrongType {
                        name: func.name.to_string(),
                        index: required + 1,
                        expected: "a `:keyword` name".into(),
                        actual: "expression",
                    },
                    pair[0].span(),
                ));
            };
            let Some(spec) = func.params.iter().find(|p| p.default.is_some() && p.name == keyword)
            else {
                return Err(EvalError::new(
                    EvalErrorKind::UnknownKeyword {
                        name: func.name.to_string(),
                        keyword: keyword.to_string(),
                    },
                    pair[0].span(),
                ));
            };
            let value = self.eval(&pair[1], model)?;
            provided.push((spec.name.as_str(), value));
        }

        // Activation record: every parameter slot is saved and re-seeded,
        // then restored on the way out — this is what makes recursive and
        // mutually recursive calls safe even though the slots are shared.
        let saved: Vec<Option<Value>> =
            func.params.iter().map(|p| self.arena.replace(p.slot, None)).collect();

        let result = self.bind_params_and_run(func, req_values, &provided, model);

        for (p, old) in func.params.iter().zip(saved) {
            self.arena.replace(p.slot, old);
        }
        result
    }

    fn bind_params_and_run(
        &mut self,
        func: &UserFunction,
        req_values: Vec<Value>,
        provided: &[(&str, Value)],
        model: &mut Model,
    ) -> Result<Value, EvalError> {
        // Required parameters first, so keyword defaults can reference them.
        let mut req_iter = req_values.into_iter();
        for p in func.params.iter().filter(|p| p.default.is_none()) {
            self.arena.set(p.slot, req_iter.next().unwrap());
        }

        // Keyword parameters in declaration order: the caller's value if
        // given, otherwise the default expression — re-evaluated on every
        // call in the function's captured environment, never memoized.
        for p in &func.params {
            let Some(default) = &p.default else { continue };
            match provided.iter().find(|(name, _)| *name == p.name) {
                Some((_, value)) => self.arena.set(p.slot, value.clone()),
                None => {
                    let value = self.eval(default, model)?;
                    self.arena.set(p.slot, value);
                }
            }
        }

        self.eval(&func.body, model)
    }
}

// ─── Boolean positions ───────────────────────────────────────────────────────

/// Only the two sentinels are valid where a boolean is required; there is
/// no truthiness coercion.
pub fn expect_bool(value: &Value, span: &Span) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(EvalError::new(
            EvalErrorKind::BooleanExpected { actual: other.type_name() },
            span,
        )),
    }
}
