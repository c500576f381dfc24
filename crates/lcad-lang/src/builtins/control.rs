//! Control special forms. Each receives its raw argument nodes and decides
//! what to evaluate and in which order — short-circuiting and loops are
//! ordinary early returns here, never exception control flow.

use std::rc::Rc;

use crate::builtins::{Registry, MUTABLE_SYMBOLS};
use crate::error::{EvalError, EvalErrorKind};
use crate::runtime::eval::{expect_bool, Evaluator};
use crate::runtime::model::Model;
use crate::runtime::signature::Signature;
use crate::runtime::value::{Function, ParamSpec, TypeSet, UserFunction, Value};
use crate::syntax::ast::{ExprNode, Node};

pub(super) fn register(r: &mut Registry) {
    let at_least = |n: usize| Signature::Variadic {
        required: vec![TypeSet::ANY; n],
        rest: TypeSet::ANY,
    };

    r.special("def", at_least(2), sf_def);
    r.special("set", Signature::any(2), sf_set);
    r.special("if", at_least(2), sf_if);
    r.special("cond", at_least(0), sf_cond);
    r.special("and", at_least(0), sf_and);
    r.special("or", at_least(0), sf_or);
    r.special("while", at_least(1), sf_while);
    r.special("for", at_least(1), sf_for);
    r.special("lambda", Signature::any(2), sf_lambda);
    r.special("quote", Signature::any(1), sf_quote);
}

// ─── def / set ───────────────────────────────────────────────────────────────

/// The binding itself was created by the environment builder, in the frame
/// enclosing this expression; evaluation only assigns. The 4-element
/// function form was fully materialized at build time, so here it simply
/// yields the function value.
fn sf_def(eval: &mut Evaluator, model: &mut Model, e: &ExprNode) -> Result<Value, EvalError> {
    let name_node = &e.elements[1];
    let Some(name) = name_node.symbol_name() else {
        // Unreachable for built programs; kept as an error for robustness.
        return Err(EvalError::new(
            EvalErrorKind::CannotSet("a non-symbol".into()),
            name_node.span(),
        ));
    };
    let target = eval.arena.parent(e.env.get()).unwrap_or(eval.root);
    let Some(binding) = eval.arena.binding(target, name) else {
        return Err(EvalError::new(
            EvalErrorKind::SymbolNotDefined(name.to_string()),
            name_node.span(),
        ));
    };
    let slot = binding.slot;

    if e.elements.len() == 4 {
        return match eval.arena.get(slot) {
            Some(func) => Ok(func.clone()),
            None => Err(EvalError::new(
                EvalErrorKind::VariableNotSet(name.to_string()),
                name_node.span(),
            )),
        };
    }

    let value = eval.eval(&e.elements[2], model)?;
    eval.arena.set(slot, value.clone());
    Ok(value)
}

/// Mutates an existing binding found by the ordinary frame walk. Builtins
/// are immutable; the root-owned process symbols on the allow-list are the
/// one exception.
fn sf_set(eval: &mut Evaluator, model: &mut Model, e: &ExprNode) -> Result<Value, EvalError> {
    let name_node = &e.elements[1];
    let Some(name) = name_node.symbol_name() else {
        return Err(EvalError::new(
            EvalErrorKind::CannotSet("a non-symbol".into()),
            name_node.span(),
        ));
    };
    let Some(binding) = eval.arena.lookup(e.env.get(), name) else {
        return Err(EvalError::new(
            EvalErrorKind::SymbolNotDefined(name.to_string()),
            name_node.span(),
        ));
    };
    if binding.protected && !MUTABLE_SYMBOLS.contains(&name) {
        return Err(EvalError::new(
            EvalErrorKind::CannotSet(name.to_string()),
            name_node.span(),
        ));
    }
    let slot = binding.slot;
    let value = eval.eval(&e.elements[2], model)?;
    eval.arena.set(slot, value.clone());
    Ok(value)
}

// ─── Branching ───────────────────────────────────────────────────────────────

fn sf_if(eval: &mut Evaluator, model: &mut Model, e: &ExprNode) -> Result<Value, EvalError> {
    if e.args().len() > 3 {
        return Err(EvalError::new(
            EvalErrorKind::WrongArgCount {
                name: "if".into(),
                expected: "2 or 3".into(),
                actual: e.args().len(),
            },
            &e.span,
        ));
    }
    let condition = eval.eval(&e.elements[1], model)?;
    if expect_bool(&condition, e.elements[1].span())? {
        eval.eval(&e.elements[2], model)
    } else {
        match e.elements.get(3) {
            Some(alt) => eval.eval(alt, model),
            None => Ok(Value::NIL),
        }
    }
}

/// `(cond (test body...) ...)` — first clause whose test is `t` wins; its
/// body values evaluate in order and the last one is the result (the test
/// value itself when the clause has no body).
fn sf_cond(eval: &mut Evaluator, model: &mut Model, e: &ExprNode) -> Result<Value, EvalError> {
    for clause in e.args() {
        let Some(c) = clause.as_expr().filter(|c| !c.elements.is_empty()) else {
            return Err(EvalError::new(
                EvalErrorKind::WrongType {
                    name: "cond".into(),
                    index: 1,
                    expected: "a `(test body...)` clause".into(),
                    actual: "expression",
                },
                clause.span(),
            ));
        };
        let test = eval.eval(&c.elements[0], model)?;
        if expect_bool(&test, c.elements[0].span())? {
            let mut result = test;
            for body in &c.elements[1..] {
                result = eval.eval(body, model)?;
            }
            return Ok(result);
        }
    }
    Ok(Value::NIL)
}

fn sf_and(eval: &mut Evaluator, model: &mut Model, e: &ExprNode) -> Result<Value, EvalError> {
    for arg in e.args() {
        let value = eval.eval(arg, model)?;
        if !expect_bool(&value, arg.span())? {
            return Ok(Value::NIL);
        }
    }
    Ok(Value::T)
}

fn sf_or(eval: &mut Evaluator, model: &mut Model, e: &ExprNode) -> Result<Value, EvalError> {
    for arg in e.args() {
        let value = eval.eval(arg, model)?;
        if expect_bool(&value, arg.span())? {
            return Ok(Value::T);
        }
    }
    Ok(Value::NIL)
}

// ─── Loops ───────────────────────────────────────────────────────────────────

fn sf_while(eval: &mut Evaluator, model: &mut Model, e: &ExprNode) -> Result<Value, EvalError> {
    loop {
        let condition = eval.eval(&e.elements[1], model)?;
        if !expect_bool(&condition, e.elements[1].span())? {
            return Ok(Value::NIL);
        }
        for body in &e.elements[2..] {
            eval.eval(body, model)?;
        }
    }
}

/// `(for (var limit) ...)`, `(for (var list) ...)`, `(for (var start end
/// [step]) ...)`. Iterating a collection is only supported in the
/// single-range-argument form; the 2/3-argument forms are always numeric.
fn sf_for(eval: &mut Evaluator, model: &mut Model, e: &ExprNode) -> Result<Value, EvalError> {
    let range = e.elements[1].as_expr().expect("malformed `for` survived the builder");
    let var = range.elements[0].symbol_name().expect("malformed `for` survived the builder");
    let slot = eval
        .arena
        .binding(e.env.get(), var)
        .expect("loop variable registered by the builder")
        .slot;

    let items: Vec<Value> = match range.args() {
        [limit] => {
            let value = eval.eval(limit, model)?;
            match value {
                Value::Int(n) => (0..n).map(Value::Int).collect(),
                Value::List(list) => list.iter().cloned().collect(),
                other => {
                    return Err(EvalError::new(
                        EvalErrorKind::WrongType {
                            name: "for".into(),
                            index: 1,
                            expected: "int or list".into(),
                            actual: other.type_name(),
                        },
                        limit.span(),
                    ));
                }
            }
        }
        bounds => {
            let mut nums = Vec::with_capacity(3);
            for node in bounds {
                let value = eval.eval(node, model)?;
                if !value.type_set().intersects(TypeSet::NUMBER) {
                    return Err(EvalError::new(
                        EvalErrorKind::WrongType {
                            name: "for".into(),
                            index: nums.len() + 1,
                            expected: TypeSet::NUMBER.describe(),
                            actual: value.type_name(),
                        },
                        node.span(),
                    ));
                }
                nums.push(value);
            }
            numeric_range(&nums, e)?
        }
    };

    // The loop variable is activation-saved like a parameter so the slot
    // survives re-entrant use of the enclosing function.
    let saved = eval.arena.replace(slot, None);
    let mut run = || -> Result<(), EvalError> {
        for item in items {
            eval.arena.set(slot, item);
            for body in &e.elements[2..] {
                eval.eval(body, model)?;
            }
        }
        Ok(())
    };
    let result = run();
    eval.arena.replace(slot, saved);
    result.map(|_| Value::NIL)
}

fn numeric_range(nums: &[Value], e: &ExprNode) -> Result<Vec<Value>, EvalError> {
    let ints = nums.iter().all(|v| matches!(v, Value::Int(_)));
    let (start, end, step) = match nums {
        [s, t] => (s.as_f64(), t.as_f64(), 1.0),
        [s, t, p] => (s.as_f64(), t.as_f64(), p.as_f64()),
        _ => unreachable!("builder validated the loop spec arity"),
    };
    if step == 0.0 {
        return Err(EvalError::new(EvalErrorKind::DivideByZero, &e.span));
    }
    let mut out = Vec::new();
    let mut x = start;
    while (step > 0.0 && x < end) || (step < 0.0 && x > end) {
        out.push(if ints { Value::Int(x as i64) } else { Value::Float(x) });
        x += step;
    }
    Ok(out)
}

// ─── lambda / quote ──────────────────────────────────────────────────────────

/// The parameter slots were registered in this expression's frame at build
/// time; here we assemble the closure value around them.
fn sf_lambda(eval: &mut Evaluator, _: &mut Model, e: &ExprNode) -> Result<Value, EvalError> {
    let frame = e.env.get();
    let list = e.elements[1].as_expr().expect("malformed `lambda` survived the builder");

    let mut params = Vec::new();
    let mut i = 0;
    while i < list.elements.len() {
        let sym = list.elements[i].as_symbol().expect("malformed parameter survived the builder");
        if let Some(stripped) = sym.name.strip_prefix(':') {
            let slot = eval.arena.binding(frame, stripped).expect("parameter registered").slot;
            params.push(ParamSpec {
                name: stripped.to_string(),
                slot,
                default: Some(list.elements[i + 1].clone()),
            });
            i += 2;
        } else {
            let slot = eval.arena.binding(frame, &sym.name).expect("parameter registered").slot;
            params.push(ParamSpec { name: sym.name.clone(), slot, default: None });
            i += 1;
        }
    }

    Ok(Value::Function(Function::User(Rc::new(UserFunction {
        name: "lambda".into(),
        params,
        body: e.elements[2].clone(),
        frame,
    }))))
}

fn sf_quote(_: &mut Evaluator, _: &mut Model, e: &ExprNode) -> Result<Value, EvalError> {
    Ok(quote_value(&e.elements[1]))
}

/// Constants map to themselves, symbols to their names, expressions to
/// lists of their quoted elements.
fn quote_value(node: &Node) -> Value {
    match node {
        Node::Int(i, _) => Value::Int(*i),
        Node::Float(f, _) => Value::Float(*f),
        Node::Str(s, _) => Value::Str(s.as_str().into()),
        Node::Symbol(s) => Value::Str(s.name.as_str().into()),
        Node::Expr(e) => {
            Value::List(Rc::new(e.elements.iter().map(|n| quote_value(n)).collect()))
        }
    }
}
