//! Build-phase behavior: scope construction, eager function registration,
//! duplicate/override rules, shadowing diagnostics.

use lcad_lang::{compile, Error, ErrorCode};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn ok(src: &str) -> lcad_lang::Script {
    compile(src, "test.lcad").unwrap_or_else(|errs| {
        panic!("compile failed: {errs:#?}");
    })
}

fn errs(src: &str) -> Vec<Error> {
    match compile(src, "test.lcad") {
        Ok(_) => panic!("expected compile to fail but it succeeded"),
        Err(errs) => errs,
    }
}

fn first_code(src: &str) -> ErrorCode {
    errs(src)[0].code.clone()
}

// ─── Lexer / parser diagnostics surface through compile ──────────────────────

#[test]
fn unterminated_string_is_l002() {
    assert_eq!(first_code("(print \"oops)"), ErrorCode::L002);
}

#[test]
fn stray_bracket_is_l001() {
    assert_eq!(first_code("(list [1])"), ErrorCode::L001);
}

#[test]
fn unbalanced_open_paren_is_p002() {
    assert_eq!(first_code("(def x 1"), ErrorCode::P002);
}

#[test]
fn stray_close_paren_is_p001() {
    assert_eq!(first_code("(def x 1))"), ErrorCode::P001);
}

// ─── Definitions ─────────────────────────────────────────────────────────────

#[test]
fn simple_definitions_compile() {
    ok("(def x 15) (def f (a b) (+ a b))");
}

#[test]
fn sibling_functions_may_forward_reference() {
    // `even?` calls `odd?` before it is textually defined.
    ok("(def even? (n) (if (= n 0) t (odd? (- n 1)))) \
        (def odd? (n) (if (= n 0) nil (even? (- n 1))))");
}

#[test]
fn duplicate_definition_same_frame_is_s001() {
    assert_eq!(first_code("(def x 1) (def x 2)"), ErrorCode::S001);
}

#[test]
fn duplicate_function_name_is_s001() {
    assert_eq!(first_code("(def f (x) x) (def f (y) y)"), ErrorCode::S001);
}

#[test]
fn duplicate_parameter_is_s001() {
    assert_eq!(first_code("(def f (x x) x)"), ErrorCode::S001);
}

#[test]
fn override_builtin_function_is_s002() {
    assert_eq!(first_code("(def + (a b) a)"), ErrorCode::S002);
    assert_eq!(first_code("(def translate 1)"), ErrorCode::S002);
}

#[test]
fn override_reserved_constant_is_s002() {
    assert_eq!(first_code("(def t 1)"), ErrorCode::S002);
    assert_eq!(first_code("(def nil 1)"), ErrorCode::S002);
    assert_eq!(first_code("(def pi 3)"), ErrorCode::S002);
}

#[test]
fn override_builtin_as_parameter_is_s002() {
    assert_eq!(first_code("(def f (t) t)"), ErrorCode::S002);
}

#[test]
fn override_process_symbol_is_s002() {
    assert_eq!(first_code("(def step-offset 1)"), ErrorCode::S002);
}

// ─── Malformed forms ─────────────────────────────────────────────────────────

#[test]
fn def_without_name_is_s004() {
    assert_eq!(first_code("(def)"), ErrorCode::S004);
    assert_eq!(first_code("(def 1 2)"), ErrorCode::S004);
}

#[test]
fn def_with_extra_args_is_s004() {
    assert_eq!(first_code("(def x 1 2)"), ErrorCode::S004);
}

#[test]
fn non_symbol_parameter_is_s003() {
    assert_eq!(first_code("(def f (1) 2)"), ErrorCode::S003);
}

#[test]
fn keyword_parameter_without_default_is_s003() {
    assert_eq!(first_code("(def f (:x) x)"), ErrorCode::S003);
}

#[test]
fn required_after_keyword_parameter_is_s003() {
    assert_eq!(first_code("(def f (:x 1 y) y)"), ErrorCode::S003);
}

#[test]
fn malformed_for_spec_is_s004() {
    assert_eq!(first_code("(for x (part \"a\" 1))"), ErrorCode::S004);
    assert_eq!(first_code("(for () 1)"), ErrorCode::S004);
}

#[test]
fn malformed_lambda_is_s004() {
    assert_eq!(first_code("(lambda x)"), ErrorCode::S004);
}

// ─── Shadowing warnings ──────────────────────────────────────────────────────

#[test]
fn parameter_shadowing_global_warns() {
    let script = ok("(def x 1) (def f (x) x)");
    assert_eq!(script.warnings().len(), 1);
    assert_eq!(script.warnings()[0].code, ErrorCode::W001);
}

#[test]
fn nested_def_shadowing_warns_but_compiles() {
    let script = ok("(def x 1) (def f (y) (if t (def x 2) nil))");
    assert!(script.warnings().iter().any(|w| w.code == ErrorCode::W001));
}

#[test]
fn unrelated_names_do_not_warn() {
    let script = ok("(def x 1) (def f (y) y)");
    assert!(script.warnings().is_empty());
}

// ─── Error positions ─────────────────────────────────────────────────────────

#[test]
fn error_carries_file_and_position() {
    let errors = errs("(def x 1)\n(def x 2)");
    assert_eq!(&*errors[0].file, "test.lcad");
    assert_eq!(errors[0].line, 2);
}
