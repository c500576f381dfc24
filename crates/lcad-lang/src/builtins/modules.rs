//! The `import` special form.
//!
//! `(import name)` resolves `name.lcad` against the search path, evaluates
//! it once in a fresh root environment seeded only with builtins, and
//! re-exports its top-level bindings into the importer's enclosing frame
//! as `name:symbol` — or flattened when the trailing `:local` marker is
//! present. Modules never see the importer's local bindings.

use std::path::PathBuf;
use std::rc::Rc;

use crate::analysis::env::FrameId;
use crate::builtins::{seed_root, Registry};
use crate::error::{EvalError, EvalErrorKind};
use crate::runtime::eval::Evaluator;
use crate::runtime::model::Model;
use crate::runtime::signature::Signature;
use crate::runtime::value::{TypeSet, Value};
use crate::syntax::ast::ExprNode;
use crate::syntax::lexer::Lexer;
use crate::syntax::parser::Parser;

pub(super) fn register(r: &mut Registry) {
    r.special(
        "import",
        Signature::Variadic { required: vec![TypeSet::ANY], rest: TypeSet::ANY },
        sf_import,
    );
}

fn sf_import(eval: &mut Evaluator, model: &mut Model, e: &ExprNode) -> Result<Value, EvalError> {
    let name_node = &e.elements[1];
    let Some(name) = name_node.symbol_name() else {
        return Err(EvalError::new(
            EvalErrorKind::ModuleLoad {
                module: String::new(),
                message: "`import` expects a bare module name".into(),
            },
            name_node.span(),
        ));
    };

    let local = match e.elements.get(2) {
        None => false,
        Some(marker) if marker.symbol_name() == Some(":local") => true,
        Some(marker) => {
            return Err(EvalError::new(
                EvalErrorKind::UnknownKeyword {
                    name: "import".into(),
                    keyword: marker
                        .symbol_name()
                        .unwrap_or("?")
                        .trim_start_matches(':')
                        .to_string(),
                },
                marker.span(),
            ));
        }
    };
    if e.elements.len() > 3 {
        return Err(EvalError::new(
            EvalErrorKind::WrongArgCount {
                name: "import".into(),
                expected: "1 or 2".into(),
                actual: e.args().len(),
            },
            &e.span,
        ));
    }

    let path = resolve(eval, name)
        .ok_or_else(|| EvalError::new(EvalErrorKind::ModuleNotFound(name.to_string()), &e.span))?;
    let canonical = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());

    let module_root = match eval.modules.get(&canonical) {
        Some(frame) => *frame,
        None => {
            log::debug!("importing module `{name}` from {}", path.display());
            let frame = load_module(eval, model, name, &path, e)?;
            eval.modules.insert(canonical.clone(), frame);
            frame
        }
    };

    // Re-export the module's top-level non-builtin bindings into the frame
    // enclosing this import statement. The importer's name aliases the
    // module's slot — the storage is shared, not copied.
    let origin: Rc<str> = Rc::from(canonical.to_string_lossy().as_ref());
    let target = eval.arena.parent(e.env.get()).unwrap_or(eval.root);

    let exports: Vec<(String, crate::analysis::env::Binding)> = eval
        .arena
        .bindings_of(module_root)
        .filter(|(_, b)| !b.protected)
        .map(|(n, b)| (n.clone(), b.clone()))
        .collect();

    for (symbol, binding) in exports {
        let export_name = if local { symbol } else { format!("{name}:{symbol}") };
        let existing = eval.arena.binding(target, &export_name).map(|b| b.origin.clone());
        match existing {
            // Importing the same symbol from the same file again is fine.
            Some(Some(o)) if *o == *origin => continue,
            Some(_) => {
                return Err(EvalError::new(
                    EvalErrorKind::ImportConflict(export_name),
                    &e.span,
                ));
            }
            None => {
                eval.arena.bind_alias(target, &export_name, binding.slot, Some(origin.clone()));
            }
        }
    }

    Ok(Value::NIL)
}

fn resolve(eval: &Evaluator, name: &str) -> Option<PathBuf> {
    let file_name = format!("{name}.lcad");
    eval.search_paths
        .iter()
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file())
}

/// Lex, parse, build and evaluate the module file in a fresh root frame.
/// Build diagnostics abort the import; the module's own runtime errors
/// propagate with their trace intact.
fn load_module(
    eval: &mut Evaluator,
    model: &mut Model,
    name: &str,
    path: &std::path::Path,
    e: &ExprNode,
) -> Result<FrameId, EvalError> {
    let load_err = |message: String| {
        EvalError::new(
            EvalErrorKind::ModuleLoad { module: name.to_string(), message },
            &e.span,
        )
    };

    let source = std::fs::read_to_string(path).map_err(|io| load_err(io.to_string()))?;
    let file: Rc<str> = Rc::from(path.to_string_lossy().as_ref());

    let tokens = Lexer::new(&source, file.clone())
        .tokenize()
        .map_err(|errs| load_err(errs[0].to_string()))?;
    let program = Parser::new(tokens, file).parse().map_err(|err| load_err(err.to_string()))?;

    let registry = eval.registry.clone();
    let module_root = seed_root(&mut eval.arena, &registry);
    if let Err(errors) = crate::analysis::build(&mut eval.arena, &registry, &program.nodes, module_root) {
        return Err(load_err(errors[0].to_string()));
    }

    // Modules inherit the process symbols of the importing evaluation.
    for symbol in crate::builtins::MUTABLE_SYMBOLS {
        let value = eval
            .arena
            .lookup(eval.root, symbol)
            .and_then(|b| eval.arena.get(b.slot).cloned());
        if let (Some(value), Some(binding)) = (value, eval.arena.lookup(module_root, symbol)) {
            let slot = binding.slot;
            eval.arena.set(slot, value);
        }
    }

    eval.run_program(&program.nodes, model)?;
    Ok(module_root)
}
