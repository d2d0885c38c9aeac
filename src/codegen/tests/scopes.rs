//! Declarations, shadowing and per-function error recovery.

use super::*;

// ── Test: inner block shadows, outer binding survives ──

#[test]
fn inner_block_shadows_outer_binding() {
    let f = file(vec![func(
        "main",
        &[],
        Some("int"),
        vec![
            decl("x", Some("int"), Some(num(1.0))),
            sp(Stmt::Block(block(vec![decl("x", Some("double"), Some(num(2.5)))]))),
            ret(Some(var("x"))),
        ],
    )]);
    let out = translate(&f);
    assert!(errors(&out).is_empty(), "{:?}", out.diagnostics);
    assert!(!function(&out.module, "user_main").is_declaration());
}

// ── Test: same-frame redeclaration is an error ──

#[test]
fn redeclaration_in_same_frame_is_rejected() {
    let f = file(vec![func(
        "main",
        &[],
        None,
        vec![
            decl("x", Some("int"), Some(num(1.0))),
            decl("x", Some("int"), Some(num(2.0))),
        ],
    )]);
    let out = translate(&f);
    assert_eq!(errors(&out), vec!["Variable already declared in this scope: x"]);
    // the broken body is dropped
    assert!(function(&out.module, "user_main").is_declaration());
}

// ── Test: bindings end with their block ──

#[test]
fn binding_is_gone_after_block() {
    let f = file(vec![func(
        "main",
        &[],
        Some("int"),
        vec![
            sp(Stmt::Block(block(vec![decl("y", Some("int"), Some(num(3.0)))]))),
            ret(Some(var("y"))),
        ],
    )]);
    assert_eq!(errors(&translate(&f)), vec!["Undefined variable: y"]);
}

// ── Test: one broken function does not stop the others ──

#[test]
fn errors_are_reported_per_function() {
    let f = file(vec![
        func("broken", &[], None, vec![expr_stmt(var("nope"))]),
        func("also_broken", &[], None, vec![sp(Stmt::Break)]),
        func("fine", &[("a", "int")], Some("int"), vec![ret(Some(var("a")))]),
    ]);
    let out = translate(&f);
    assert_eq!(
        errors(&out),
        vec!["Undefined variable: nope", "Break statement outside of loop"]
    );
    assert!(function(&out.module, "broken").is_declaration());
    assert!(!function(&out.module, "fine").is_declaration());
}

// ── Test: auto keeps the initializer type ──

#[test]
fn auto_requires_initializer() {
    let f = file(vec![func("main", &[], None, vec![decl("z", None, None)])]);
    assert_eq!(
        errors(&translate(&f)),
        vec!["Auto variable requires initialization: z"]
    );
}

#[test]
fn uninitialised_scalar_is_zeroed() {
    let f = file(vec![func(
        "main",
        &[],
        Some("int"),
        vec![decl("n", Some("int"), None), ret(Some(var("n")))],
    )]);
    let out = translate(&f);
    assert!(errors(&out).is_empty());
    let text = function(&out.module, "user_main").to_string();
    assert!(text.contains("store i32 0"), "{}", text);
}

// ── Test: parameters are mutable locals ──

#[test]
fn parameters_are_stored_in_slots() {
    let f = file(vec![func(
        "bump",
        &[("n", "int")],
        Some("int"),
        vec![
            assign(Place::Var("n".into()), bin(BinOp::Add, var("n"), num(1.0))),
            ret(Some(var("n"))),
        ],
    )]);
    let out = translate(&f);
    assert!(errors(&out).is_empty(), "{:?}", out.diagnostics);
    let text = function(&out.module, "bump").to_string();
    assert!(text.contains("alloca i32"), "{}", text);
}

#[test]
fn duplicate_parameter_is_rejected() {
    let f = file(vec![func("f", &[("a", "int"), ("a", "int")], None, vec![])]);
    assert_eq!(errors(&translate(&f)), vec!["Duplicate parameter: a"]);
}
