//! Builder-pass unit tests: frame attribution, eager function
//! materialization, and slot registration — below the level the
//! integration suites exercise.

use std::rc::Rc;

use crate::analysis::env::{EnvArena, FrameId};
use crate::analysis::{self, build};
use crate::builtins::{seed_root, Registry};
use crate::error::{Error, ErrorCode};
use crate::runtime::value::{Function, Value};
use crate::syntax::ast::{Node, Program};
use crate::syntax::lexer::Lexer;
use crate::syntax::parser::Parser;

// ─── Helpers ─────────────────────────────────────────────────────────────────

struct Built {
    program: Program,
    arena: EnvArena,
    root: FrameId,
    warnings: Vec<Error>,
}

fn parse(src: &str) -> Program {
    let tokens = Lexer::new(src, "test.lcad".into()).tokenize().expect("lex failed");
    Parser::new(tokens, "test.lcad".into()).parse().expect("parse failed")
}

fn build_ok(src: &str) -> Built {
    let program = parse(src);
    let registry = Registry::standard();
    let mut arena = EnvArena::new();
    let root = seed_root(&mut arena, &registry);
    let warnings = build(&mut arena, &registry, &program.nodes, root)
        .unwrap_or_else(|errs| panic!("build failed: {errs:#?}"));
    Built { program, arena, root, warnings }
}

fn build_err(src: &str) -> Vec<Error> {
    let program = parse(src);
    let registry = Registry::standard();
    let mut arena = EnvArena::new();
    let root = seed_root(&mut arena, &registry);
    match analysis::build(&mut arena, &registry, &program.nodes, root) {
        Ok(_) => panic!("expected build to fail"),
        Err(errs) => errs,
    }
}

/// Every expression and symbol in the tree has a frame attached.
fn assert_all_annotated(node: &Rc<Node>) {
    match &**node {
        Node::Expr(e) => {
            assert_ne!(e.env.get(), FrameId::UNSET, "expression without a frame");
            for child in &e.elements {
                assert_all_annotated(child);
            }
        }
        Node::Symbol(s) => {
            assert_ne!(s.env.get(), FrameId::UNSET, "symbol `{}` without a frame", s.name);
        }
        _ => {}
    }
}

// ─── Frame attribution ───────────────────────────────────────────────────────

#[test]
fn every_node_gets_a_frame() {
    let built = build_ok(
        "(def gap (x :pad 2) (+ x pad)) \
         (for (i 3) (translate (list 0 0 i) (part \"3001\" 4)))",
    );
    for node in &built.program.nodes {
        assert_all_annotated(node);
    }
}

#[test]
fn nested_expression_frames_chain_to_the_root() {
    let built = build_ok("(if t (if t 1 2) 3)");
    let Node::Expr(outer) = &*built.program.nodes[0] else { panic!() };
    let Node::Expr(inner) = &*outer.elements[2] else { panic!() };
    assert_eq!(built.arena.parent(outer.env.get()), Some(built.root));
    assert_eq!(built.arena.parent(inner.env.get()), Some(outer.env.get()));
}

// ─── Eager function registration ─────────────────────────────────────────────

#[test]
fn function_definition_is_materialized_at_build_time() {
    // The value exists before any evaluation happens.
    let built = build_ok("(def incf (x) (+ x 1))");
    let binding = built.arena.lookup(built.root, "incf").expect("incf bound");
    match built.arena.get(binding.slot) {
        Some(Value::Function(Function::User(f))) => {
            assert_eq!(&*f.name, "incf");
            assert_eq!(f.params.len(), 1);
            assert_eq!(f.params[0].name, "x");
        }
        other => panic!("expected a user function, got {other:?}"),
    }
}

#[test]
fn variable_definition_slot_stays_unset_until_evaluation() {
    let built = build_ok("(def x 15)");
    let binding = built.arena.lookup(built.root, "x").expect("x bound");
    assert!(built.arena.get(binding.slot).is_none());
}

#[test]
fn parameters_live_in_the_def_frame() {
    let built = build_ok("(def f (a :b 1) (+ a b))");
    let Node::Expr(def) = &*built.program.nodes[0] else { panic!() };
    let frame = def.env.get();
    assert!(built.arena.binding(frame, "a").is_some());
    assert!(built.arena.binding(frame, "b").is_some());
    // Not leaked into the enclosing frame.
    assert!(built.arena.binding(built.root, "a").is_none());
}

#[test]
fn loop_variable_lives_in_the_for_frame() {
    let built = build_ok("(for (i 3) i)");
    let Node::Expr(for_expr) = &*built.program.nodes[0] else { panic!() };
    assert!(built.arena.binding(for_expr.env.get(), "i").is_some());
    assert!(built.arena.binding(built.root, "i").is_none());
}

#[test]
fn lambda_parameters_are_registered_at_build_time() {
    let built = build_ok("(def f (lambda (x) x))");
    // The lambda's own frame holds `x`; find it through the def body.
    let Node::Expr(def) = &*built.program.nodes[0] else { panic!() };
    let Node::Expr(lambda) = &*def.elements[2] else { panic!() };
    assert!(built.arena.binding(lambda.env.get(), "x").is_some());
}

// ─── Errors and warnings ─────────────────────────────────────────────────────

#[test]
fn duplicate_in_same_frame_is_fatal() {
    let errs = build_err("(def x 1) (def x 2)");
    assert_eq!(errs[0].code, ErrorCode::S001);
}

#[test]
fn builtin_override_is_fatal_in_any_scope() {
    assert_eq!(build_err("(def part 1)")[0].code, ErrorCode::S002);
    assert_eq!(build_err("(def f (x) (if t (def nil 1) 2))")[0].code, ErrorCode::S002);
}

#[test]
fn shadowing_is_a_warning_not_an_error() {
    let built = build_ok("(def x 1) (def f (x) x)");
    assert_eq!(built.warnings.len(), 1);
    assert_eq!(built.warnings[0].code, ErrorCode::W001);
    assert!(!built.warnings[0].code.is_error());
}

#[test]
fn multiple_errors_are_collected() {
    let errs = build_err("(def t 1) (def x 1) (def x 2)");
    assert!(errs.len() >= 2);
    assert!(errs.iter().any(|e| e.code == ErrorCode::S002));
    assert!(errs.iter().any(|e| e.code == ErrorCode::S001));
}
