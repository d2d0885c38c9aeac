//! Blocks, guards, loops and returns.

use super::*;

fn if_else(cond: Spanned<Expr>, then: Vec<Spanned<Stmt>>, otherwise: Vec<Spanned<Stmt>>) -> Spanned<Stmt> {
    sp(Stmt::If {
        branches: vec![IfBranch {
            cond,
            body: block(then),
        }],
        else_block: Some(block(otherwise)),
    })
}

// ── Test: statements after a return are skipped ──

#[test]
fn dead_code_after_return_is_not_lowered() {
    let f = file(vec![func(
        "main",
        &[],
        Some("int"),
        vec![
            ret(Some(num(1.0))),
            expr_stmt(call("print", vec![num(2.0)])),
            expr_stmt(var("undefined_after_return")),
        ],
    )]);
    let out = translate(&f);
    assert!(errors(&out).is_empty(), "{:?}", out.diagnostics);
    let main = function(&out.module, "user_main");
    assert!(!main.callees().contains(&"printf"));
    assert_eq!(main.blocks.len(), 1);
}

// ── Test: if/else where both arms return drops the merge block ──

#[test]
fn if_chain_with_terminating_arms_has_no_merge_block() {
    let f = file(vec![func(
        "sign",
        &[("n", "int")],
        Some("int"),
        vec![if_else(
            bin(BinOp::Lt, var("n"), num(0.0)),
            vec![ret(Some(num(-1.0)))],
            vec![ret(Some(num(1.0)))],
        )],
    )]);
    let out = translate(&f);
    assert!(errors(&out).is_empty(), "{:?}", out.diagnostics);
    let sign = function(&out.module, "sign");
    assert!(sign.block_named("ifcont").is_none(), "{}", sign);
    assert!(sign.block_named("else").is_some());
    assert!(crate::ir::verify::verify_module(&out.module).is_ok());
}

#[test]
fn if_without_else_falls_through_to_merge() {
    let f = file(vec![func(
        "clamp",
        &[("n", "int")],
        Some("int"),
        vec![
            sp(Stmt::If {
                branches: vec![IfBranch {
                    cond: bin(BinOp::Gt, var("n"), num(10.0)),
                    body: block(vec![assign(Place::Var("n".into()), num(10.0))]),
                }],
                else_block: None,
            }),
            ret(Some(var("n"))),
        ],
    )]);
    let out = translate(&f);
    let clamp = function(&out.module, "clamp");
    assert!(clamp.block_named("ifcont").is_some(), "{}", clamp);
    assert!(crate::ir::verify::verify_module(&out.module).is_ok());
}

// ── Test: guards short-circuit, plain expressions do not ──

#[test]
fn guard_conjunction_short_circuits() {
    let cond = bin(
        BinOp::And,
        bin(BinOp::Gt, var("a"), num(0.0)),
        bin(BinOp::Gt, var("b"), num(0.0)),
    );
    let f = file(vec![func(
        "both",
        &[("a", "int"), ("b", "int")],
        Some("bool"),
        vec![if_else(cond, vec![ret(Some(sp(Expr::Literal(Literal::Bool(true)))))], vec![])],
    )]);
    let out = translate(&f);
    assert!(errors(&out).is_empty(), "{:?}", out.diagnostics);
    let both = function(&out.module, "both");
    assert!(both.block_named("land.rhs").is_some());
    assert!(both.to_string().contains("phi i1"), "{}", both);
}

#[test]
fn eager_logical_operators_outside_guards() {
    let f = file(vec![func(
        "either",
        &[("a", "bool"), ("b", "bool")],
        Some("bool"),
        vec![ret(Some(bin(BinOp::Or, var("a"), var("b"))))],
    )]);
    let out = translate(&f);
    let either = function(&out.module, "either");
    assert!(either.block_named("lor.rhs").is_none());
    assert_eq!(either.blocks.len(), 1);
}

// ── Test: loops and break ──

#[test]
fn while_loop_with_break() {
    let body = vec![
        sp(Stmt::CompoundAssign {
            op: BinOp::Add,
            place: sp(Place::Var("i".into())),
            value: num(1.0),
        }),
        sp(Stmt::If {
            branches: vec![IfBranch {
                cond: bin(BinOp::Eq, var("i"), num(5.0)),
                body: block(vec![sp(Stmt::Break)]),
            }],
            else_block: None,
        }),
    ];
    let f = file(vec![func(
        "count",
        &[],
        Some("int"),
        vec![
            decl("i", Some("int"), Some(num(0.0))),
            sp(Stmt::While {
                cond: sp(Expr::Literal(Literal::Bool(true))),
                body: block(body),
            }),
            ret(Some(var("i"))),
        ],
    )]);
    let out = translate(&f);
    assert!(errors(&out).is_empty(), "{:?}", out.diagnostics);
    let count = function(&out.module, "count");
    for label in ["while.header", "while.body", "while.exit"] {
        assert!(count.block_named(label).is_some(), "missing {}", label);
    }
    assert!(crate::ir::verify::verify_module(&out.module).is_ok());
}

#[test]
fn for_loop_variable_is_scoped_to_loop() {
    let f = file(vec![func(
        "sum",
        &[],
        Some("int"),
        vec![
            decl("total", Some("int"), Some(num(0.0))),
            sp(Stmt::For {
                init: Some(Box::new(decl("i", Some("int"), Some(num(0.0))))),
                cond: Some(bin(BinOp::Lt, var("i"), num(3.0))),
                step: Some(sp(Expr::Step {
                    op: StepOp::Inc,
                    place: sp(Place::Var("i".into())),
                })),
                body: block(vec![sp(Stmt::CompoundAssign {
                    op: BinOp::Add,
                    place: sp(Place::Var("total".into())),
                    value: var("i"),
                })]),
            }),
            ret(Some(var("i"))),
        ],
    )]);
    assert_eq!(errors(&translate(&f)), vec!["Undefined variable: i"]);
}

// ── Test: returns ──

#[test]
fn value_returned_from_void_function() {
    let f = file(vec![func("f", &[], None, vec![ret(Some(num(1.0)))])]);
    assert_eq!(
        errors(&translate(&f)),
        vec!["Cannot return a value from a void function"]
    );
}

#[test]
fn fall_through_returns_zero() {
    let f = file(vec![func("f", &[], Some("double"), vec![])]);
    let out = translate(&f);
    let text = function(&out.module, "f").to_string();
    assert!(text.contains("ret double"), "{}", text);
}

#[test]
fn string_returned_as_int_is_rejected() {
    let f = file(vec![func("f", &[], Some("int"), vec![ret(Some(text("no")))])]);
    let out = translate(&f);
    assert_eq!(errors(&out).len(), 1);
    assert!(function(&out.module, "f").is_declaration());
}
