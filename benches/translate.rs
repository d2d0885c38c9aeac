//! Translation throughput on synthetic programs.
//!
//! Measures:
//! 1. AST → IR lowering for growing function counts
//! 2. IR verification of the lowered module
//! 3. Content hashing of every function

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use aero::ast::{BinOp, Block, Expr, File, FnDef, Item, Literal, Place, Stmt, TypeName};
use aero::span::Spanned;
use aero::{BuiltinTable, GenConfig};

fn sp<T>(node: T) -> Spanned<T> {
    Spanned::dummy(node)
}

fn num(n: f64) -> Spanned<Expr> {
    sp(Expr::Literal(Literal::Number(n)))
}

fn var(name: &str) -> Spanned<Expr> {
    sp(Expr::Var(name.to_string()))
}

fn bin(op: BinOp, lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
    sp(Expr::BinOp {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

fn decl(name: &str, ty: Option<&str>, init: Option<Spanned<Expr>>) -> Spanned<Stmt> {
    sp(Stmt::Var {
        name: sp(name.to_string()),
        ty: ty.map(|t| sp(TypeName::parse(t))),
        init,
    })
}

fn assign(name: &str, value: Spanned<Expr>) -> Spanned<Stmt> {
    sp(Stmt::Assign {
        place: sp(Place::Var(name.to_string())),
        value,
    })
}

/// One function: a summing loop over a fixed array, with a branch and
/// a string concatenation in the body.
fn synthetic_fn(i: usize) -> Spanned<Item> {
    let elems = (0..8).map(|k| num(k as f64)).collect();
    let index = sp(Expr::Index {
        expr: Box::new(var("xs")),
        indices: vec![var("i")],
    });
    let label = bin(
        BinOp::Add,
        sp(Expr::Literal(Literal::Str("step ".into()))),
        var("i"),
    );
    let body = vec![
        assign("acc", bin(BinOp::Add, var("acc"), index)),
        sp(Stmt::If {
            branches: vec![aero::ast::IfBranch {
                cond: bin(BinOp::Gt, var("acc"), num(10.0)),
                body: sp(Block {
                    stmts: vec![sp(Stmt::Expr(sp(Expr::Call {
                        name: sp("println".into()),
                        args: vec![label],
                    })))],
                }),
            }],
            else_block: None,
        }),
    ];
    let stmts = vec![
        decl("xs", Some("int[8]"), Some(sp(Expr::ArrayInit(elems)))),
        decl("acc", Some("int"), Some(num(0.0))),
        sp(Stmt::For {
            init: Some(Box::new(decl("i", Some("int"), Some(num(0.0))))),
            cond: Some(bin(BinOp::Lt, var("i"), num(8.0))),
            step: Some(sp(Expr::Step {
                op: aero::ast::StepOp::Inc,
                place: sp(Place::Var("i".into())),
            })),
            body: sp(Block { stmts: body }),
        }),
        sp(Stmt::Return(Some(var("acc")))),
    ];
    sp(Item::Fn(FnDef {
        name: sp(format!("f{}", i)),
        params: Vec::new(),
        return_ty: Some(sp(TypeName::named("int"))),
        body: sp(Block { stmts }),
    }))
}

fn synthetic_file(n: usize) -> File {
    File {
        name: "bench.aero".into(),
        items: (0..n).map(synthetic_fn).collect(),
    }
}

/// Benchmark: AST → IR for 10 and 100 functions.
fn bench_lowering(c: &mut Criterion) {
    let small = synthetic_file(10);
    let large = synthetic_file(100);
    let builtins = BuiltinTable::standard();
    let mut config = GenConfig::default();
    config.module.verify = false;

    let mut group = c.benchmark_group("lowering");
    group.bench_function("10_fns", |b| {
        b.iter(|| aero::translate_with_builtins(black_box(&small), &config, &builtins))
    });
    group.bench_function("100_fns", |b| {
        b.iter(|| aero::translate_with_builtins(black_box(&large), &config, &builtins))
    });
    group.finish();
}

/// Benchmark: verifier and hasher over an already-lowered module.
fn bench_post_passes(c: &mut Criterion) {
    let file = synthetic_file(100);
    let Ok(translation) = aero::translate(&file) else {
        panic!("synthetic program failed to translate");
    };
    let module = translation.module;

    c.bench_function("verify_100_fns", |b| {
        b.iter(|| aero::ir::verify::verify_module(black_box(&module)))
    });
    c.bench_function("hash_100_fns", |b| {
        b.iter(|| aero::hash::hash_functions(black_box(&module)))
    });
}

criterion_group!(benches, bench_lowering, bench_post_passes);
criterion_main!(benches);
