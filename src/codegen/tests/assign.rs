//! Compound assignment, increment and decrement, and literal lowering.

use super::*;

fn ch(c: char) -> Spanned<Expr> {
    sp(Expr::Literal(Literal::Char(c)))
}

fn place(name: &str) -> Spanned<Place> {
    sp(Place::Var(name.to_string()))
}

fn element(name: &str, idx: Spanned<Expr>) -> Spanned<Place> {
    sp(Place::Index(Box::new(place(name)), vec![idx]))
}

fn compound(op: BinOp, place: Spanned<Place>, value: Spanned<Expr>) -> Spanned<Stmt> {
    sp(Stmt::CompoundAssign { op, place, value })
}

fn step(op: StepOp, place: Spanned<Place>) -> Spanned<Stmt> {
    expr_stmt(sp(Expr::Step { op, place }))
}

fn body(stmts: Vec<Spanned<Stmt>>) -> File {
    file(vec![func("main", &[], None, stmts)])
}

fn assert_clean(out: &GenOutput) {
    assert!(errors(out).is_empty(), "{:?}", out.diagnostics);
    if let Err(errs) = crate::ir::verify::verify_module(&out.module) {
        panic!("{:?}\n{}", errs, out.module);
    }
}

// ── Test: compound assignment keeps the target type ──

#[test]
fn compound_assign_on_double() {
    let out = translate(&body(vec![
        decl("d", Some("double"), Some(num(1.5))),
        compound(BinOp::Add, place("d"), num(2.0)),
        compound(BinOp::Mul, place("d"), var("d")),
    ]));
    assert_clean(&out);
    let text = function(&out.module, "user_main").to_string();
    assert!(text.contains("fadd double"), "{}", text);
    assert!(text.contains("fmul double"), "{}", text);
}

#[test]
fn compound_assign_on_char_truncates() {
    let out = translate(&body(vec![
        decl("c", Some("char"), Some(ch('a'))),
        compound(BinOp::Add, place("c"), num(1.0)),
    ]));
    assert_clean(&out);
    let text = function(&out.module, "user_main").to_string();
    assert!(text.contains("trunc i32"), "{}", text);
}

#[test]
fn compound_assign_on_string_byte() {
    let out = translate(&body(vec![
        decl("s", Some("string"), Some(text("abc"))),
        compound(BinOp::Add, element("s", num(0.0)), num(1.0)),
    ]));
    assert_clean(&out);
    let main = function(&out.module, "user_main");
    assert!(main.callees().contains(&"strlen"));
    assert!(main.block_named("valid_access").is_some());
}

#[test]
fn compound_assign_on_array_element() {
    let out = translate(&body(vec![
        decl("a", Some("double[2]"), Some(array(vec![num(1.0), num(2.0)]))),
        compound(BinOp::Sub, element("a", num(1.0)), num(1.0)),
    ]));
    assert_clean(&out);
    let text = function(&out.module, "user_main").to_string();
    assert!(text.contains("fsub double"), "{}", text);
}

#[test]
fn char_pair_into_char_is_rejected() {
    let f = body(vec![
        decl("c", Some("char"), Some(ch('a'))),
        compound(BinOp::Add, place("c"), ch('b')),
    ]);
    assert_eq!(
        errors(&translate(&f)),
        vec!["Type mismatch in compound assignment"]
    );
}

#[test]
fn string_into_int_is_rejected() {
    let f = body(vec![
        decl("n", Some("int"), Some(num(1.0))),
        compound(BinOp::Add, place("n"), text("x")),
    ]);
    assert_eq!(
        errors(&translate(&f)),
        vec!["Type mismatch in compound assignment"]
    );
}

#[test]
fn string_byte_rejects_char_and_double_results() {
    for value in [ch('a'), num(1.5)] {
        let f = body(vec![
            decl("s", Some("string"), Some(text("abc"))),
            compound(BinOp::Add, element("s", num(0.0)), value),
        ]);
        assert_eq!(
            errors(&translate(&f)),
            vec!["Type mismatch in compound assignment"]
        );
    }
}

#[test]
fn mismatch_note_names_both_types() {
    let f = body(vec![
        decl("c", Some("char"), Some(ch('a'))),
        compound(BinOp::Add, place("c"), ch('b')),
    ]);
    let out = translate(&f);
    let diag = out.diagnostics.iter().find(|d| d.is_error()).unwrap();
    assert!(diag
        .notes
        .iter()
        .any(|n| n == "cannot store string into char"), "{:?}", diag);
}

// ── Test: increment and decrement ──

#[test]
fn step_on_double_char_byte_and_element() {
    let out = translate(&body(vec![
        decl("d", Some("double"), Some(num(0.5))),
        decl("c", Some("char"), Some(ch('a'))),
        decl("s", Some("string"), Some(text("abc"))),
        decl("a", Some("int[2]"), Some(array(vec![num(1.0), num(2.0)]))),
        step(StepOp::Inc, place("d")),
        step(StepOp::Dec, place("c")),
        step(StepOp::Inc, element("s", num(2.0))),
        step(StepOp::Dec, element("a", num(0.0))),
    ]));
    assert_clean(&out);
    let text = function(&out.module, "user_main").to_string();
    assert!(text.contains("fadd double"), "{}", text);
    assert!(text.contains("sub i8"), "{}", text);
    assert!(text.contains("add i8"), "{}", text);
    assert!(text.contains("sub i32"), "{}", text);
}

#[test]
fn step_on_bool_is_rejected() {
    let f = body(vec![
        decl("b", Some("bool"), Some(sp(Expr::Literal(Literal::Bool(true))))),
        step(StepOp::Inc, place("b")),
    ]);
    assert_eq!(
        errors(&translate(&f)),
        vec!["Increment and decrement require a numeric variable"]
    );
}

// ── Test: literals ──

#[test]
fn fractional_literal_is_a_double() {
    let out = translate(&body(vec![decl("y", None, Some(num(5.5)))]));
    assert_clean(&out);
    let text = function(&out.module, "user_main").to_string();
    assert!(text.contains("alloca double"), "{}", text);
    assert!(text.contains("store double 5.5"), "{}", text);
}

#[test]
fn latin1_char_literal_is_one_byte() {
    let out = translate(&body(vec![decl("c", None, Some(ch('\u{e9}')))]));
    assert_clean(&out);
    let text = function(&out.module, "user_main").to_string();
    assert!(text.contains("alloca i8"), "{}", text);
}

#[test]
fn wide_char_literal_is_rejected() {
    let f = body(vec![decl("c", None, Some(ch('\u{20ac}')))]);
    assert_eq!(
        errors(&translate(&f)),
        vec!["Character literal out of range: '\u{20ac}' (U+20AC)"]
    );
}
