//! `import` behavior: search-path resolution, fresh module environments,
//! namespaced vs `:local` re-export, caching, and collision rules.

use std::path::{Path, PathBuf};

use lcad_lang::{compile, EvalError, EvalErrorKind, EvalOptions, Model, Value};

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Fresh per-test directory under the system temp dir.
fn module_dir(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("lcad-lang-tests").join(test);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create module dir");
    dir
}

fn write_module(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(format!("{name}.lcad")), body).expect("write module");
}

fn eval_in(dir: &Path, src: &str) -> Result<(Model, Value), EvalError> {
    let script = compile(src, "test.lcad").unwrap_or_else(|errs| {
        panic!("compile failed: {errs:#?}");
    });
    let mut options = EvalOptions::default();
    options.seed = Some(1);
    options.search_paths = vec![dir.to_path_buf()];
    script.evaluate_value(&options)
}

fn value_in(dir: &Path, src: &str) -> Value {
    eval_in(dir, src).unwrap_or_else(|e| panic!("evaluation failed: {e}")).1
}

fn error_in(dir: &Path, src: &str) -> EvalError {
    match eval_in(dir, src) {
        Ok(_) => panic!("expected evaluation to fail but it succeeded"),
        Err(e) => e,
    }
}

// ─── Namespaced and local re-export ──────────────────────────────────────────

#[test]
fn namespaced_import() {
    let dir = module_dir("namespaced");
    write_module(&dir, "geo", "(def gap (x) (* x 2)) (def width 8)");
    assert_eq!(value_in(&dir, "(import geo) (geo:gap 3)"), Value::Int(6));
    assert_eq!(value_in(&dir, "(import geo) (+ geo:width 1)"), Value::Int(9));
}

#[test]
fn local_import_flattens_names() {
    let dir = module_dir("local");
    write_module(&dir, "geo", "(def gap (x) (* x 2))");
    assert_eq!(value_in(&dir, "(import geo :local) (gap 4)"), Value::Int(8));
}

#[test]
fn missing_module_errors() {
    let dir = module_dir("missing");
    let err = error_in(&dir, "(import nothing-here)");
    assert_eq!(err.kind, EvalErrorKind::ModuleNotFound("nothing-here".into()));
}

#[test]
fn module_with_build_error_fails_to_load() {
    let dir = module_dir("broken");
    write_module(&dir, "broken", "(def x 1) (def x 2)");
    let err = error_in(&dir, "(import broken)");
    assert!(matches!(err.kind, EvalErrorKind::ModuleLoad { .. }));
}

// ─── Isolation ───────────────────────────────────────────────────────────────

#[test]
fn module_does_not_see_importer_bindings() {
    let dir = module_dir("isolation");
    write_module(&dir, "peeking", "(def probe secret)");
    let err = error_in(&dir, "(def secret 1) (import peeking)");
    assert_eq!(err.kind, EvalErrorKind::SymbolNotDefined("secret".into()));
}

#[test]
fn module_geometry_lands_in_the_importing_model() {
    let dir = module_dir("geometry");
    write_module(&dir, "bricks", "(part \"3001\" 4)");
    let (model, _) = eval_in(&dir, "(import bricks)").unwrap();
    assert_eq!(model.groups()[0].part_count(), 1);
}

// ─── Caching and collisions ──────────────────────────────────────────────────

#[test]
fn reimport_is_tolerated_and_cached() {
    let dir = module_dir("cache");
    write_module(&dir, "bricks", "(part \"3001\" 4) (def width 8)");
    let (model, value) =
        eval_in(&dir, "(import bricks) (import bricks) bricks:width").unwrap();
    // Evaluated once: one part, and the second import is a no-op.
    assert_eq!(model.groups()[0].part_count(), 1);
    assert_eq!(value, Value::Int(8));
}

#[test]
fn same_name_from_different_modules_conflicts() {
    let dir = module_dir("conflict");
    write_module(&dir, "a", "(def shared 1)");
    write_module(&dir, "b", "(def shared 2)");
    let err = error_in(&dir, "(import a :local) (import b :local)");
    assert_eq!(err.kind, EvalErrorKind::ImportConflict("shared".into()));
}

#[test]
fn local_import_conflicts_with_own_definition() {
    let dir = module_dir("own-def");
    write_module(&dir, "a", "(def shared 1)");
    let err = error_in(&dir, "(def shared 0) (import a :local)");
    assert_eq!(err.kind, EvalErrorKind::ImportConflict("shared".into()));
}

// ─── Argument validation ─────────────────────────────────────────────────────

#[test]
fn import_rejects_unknown_marker() {
    let dir = module_dir("marker");
    write_module(&dir, "geo", "(def x 1)");
    let err = error_in(&dir, "(import geo :flatten)");
    assert!(matches!(err.kind, EvalErrorKind::UnknownKeyword { .. }));
}
