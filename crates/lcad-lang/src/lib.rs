//! lcad — an embedded Lisp-like language whose programs describe 3D brick
//! assemblies by composing geometric transforms and emitting part
//! placement records.
//!
//! Pipeline: source text → lexer → parser → lexical-environment builder →
//! tree-walking evaluator, which executes expressions against a mutable
//! [`Model`] (current transform + accumulated output). See `compile` and
//! [`Script::evaluate`].

pub mod analysis;
pub mod builtins;
pub mod error;
pub mod runtime;
pub mod syntax;

pub use error::{Error, ErrorCode, EvalError, EvalErrorKind};
pub use runtime::eval::EvalOptions;
pub use runtime::model::{Entry, Group, Model, PartPlacement, Primitive, PrimitiveKind};
pub use runtime::value::{Function, TypeSet, Value};

use std::rc::Rc;

use analysis::env::{EnvArena, FrameId};
use builtins::{seed_root, Registry};
use runtime::eval::Evaluator;
use syntax::ast::Program;
use syntax::lexer::Lexer;
use syntax::parser::Parser;

/// A parsed, scope-resolved script ready for evaluation. Produced by
/// [`compile`]; function definitions are already materialized, every
/// symbol occurrence already points at its frame.
pub struct Script {
    program: Program,
    arena: EnvArena,
    root: FrameId,
    registry: Rc<Registry>,
    warnings: Vec<Error>,
}

impl Script {
    /// Non-fatal builder diagnostics (shadowing).
    pub fn warnings(&self) -> &[Error] {
        &self.warnings
    }

    /// Evaluate the whole script against a fresh model. A single error
    /// aborts the evaluation of the file; there is no partial-results mode.
    pub fn evaluate(self, options: &EvalOptions) -> Result<Model, EvalError> {
        self.evaluate_value(options).map(|(model, _)| model)
    }

    /// Like [`Script::evaluate`], additionally yielding the value of the
    /// last top-level term — useful for embedding and tests.
    pub fn evaluate_value(self, options: &EvalOptions) -> Result<(Model, Value), EvalError> {
        let mut evaluator = Evaluator::new(self.arena, self.root, self.registry, options);
        let mut model = Model::new();
        let value = evaluator.run_program(&self.program.nodes, &mut model)?;
        Ok((model, value))
    }
}

/// Lex, parse and scope-resolve source text. All build-phase diagnostics
/// are collected; any hard error prevents evaluation.
pub fn compile(source: &str, file: &str) -> Result<Script, Vec<Error>> {
    let file: Rc<str> = Rc::from(file);

    let tokens = Lexer::new(source, file.clone()).tokenize()?;
    let program = Parser::new(tokens, file).parse().map_err(|e| vec![e])?;

    let registry = Rc::new(Registry::standard());
    let mut arena = EnvArena::new();
    let root = seed_root(&mut arena, &registry);
    let warnings = analysis::build(&mut arena, &registry, &program.nodes, root)?;

    Ok(Script { program, arena, root, registry, warnings })
}

/// Convenience wrapper: compile and evaluate with default options.
pub fn run(source: &str, file: &str) -> Result<Model, String> {
    let script = compile(source, file).map_err(|errs| {
        errs.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
    })?;
    script.evaluate(&EvalOptions::default()).map_err(|e| e.to_string())
}
