//! CodeGen unit tests. Helpers here build small ASTs by hand.

mod assign;
mod calls;
mod control;
mod scopes;

use crate::ast::*;
use crate::codegen::{BuiltinTable, CodeGen, GenOutput};
use crate::config::GenConfig;
use crate::ir::{Function, Module};
use crate::span::{Span, Spanned};

fn sp<T>(node: T) -> Spanned<T> {
    Spanned::new(node, Span::dummy())
}

fn num(n: f64) -> Spanned<Expr> {
    sp(Expr::Literal(Literal::Number(n)))
}

fn text(s: &str) -> Spanned<Expr> {
    sp(Expr::Literal(Literal::Str(s.to_string())))
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

fn call(name: &str, args: Vec<Spanned<Expr>>) -> Spanned<Expr> {
    sp(Expr::Call {
        name: sp(name.to_string()),
        args,
    })
}

fn index(name: &str, indices: Vec<Spanned<Expr>>) -> Spanned<Expr> {
    sp(Expr::Index {
        expr: Box::new(var(name)),
        indices,
    })
}

fn array(elems: Vec<Spanned<Expr>>) -> Spanned<Expr> {
    sp(Expr::ArrayInit(elems))
}

/// `ty name = init;`, or `auto` when `ty` is `None`.
fn decl(name: &str, ty: Option<&str>, init: Option<Spanned<Expr>>) -> Spanned<Stmt> {
    sp(Stmt::Var {
        name: sp(name.to_string()),
        ty: ty.map(|t| sp(TypeName::parse(t))),
        init,
    })
}

fn assign(place: Place, value: Spanned<Expr>) -> Spanned<Stmt> {
    sp(Stmt::Assign {
        place: sp(place),
        value,
    })
}

fn expr_stmt(e: Spanned<Expr>) -> Spanned<Stmt> {
    sp(Stmt::Expr(e))
}

fn ret(value: Option<Spanned<Expr>>) -> Spanned<Stmt> {
    sp(Stmt::Return(value))
}

fn block(stmts: Vec<Spanned<Stmt>>) -> Spanned<Block> {
    sp(Block { stmts })
}

fn fn_def(name: &str, params: &[(&str, &str)], ret: Option<&str>, stmts: Vec<Spanned<Stmt>>) -> FnDef {
    FnDef {
        name: sp(name.to_string()),
        params: params
            .iter()
            .map(|(n, t)| Param {
                name: sp(n.to_string()),
                ty: sp(TypeName::parse(t)),
            })
            .collect(),
        return_ty: ret.map(|t| sp(TypeName::parse(t))),
        body: block(stmts),
    }
}

fn func(name: &str, params: &[(&str, &str)], ret: Option<&str>, stmts: Vec<Spanned<Stmt>>) -> Spanned<Item> {
    sp(Item::Fn(fn_def(name, params, ret, stmts)))
}

fn file(items: Vec<Spanned<Item>>) -> File {
    File {
        name: "test.aero".to_string(),
        items,
    }
}

fn translate(file: &File) -> GenOutput {
    translate_with(file, GenConfig::default())
}

fn translate_with(file: &File, config: GenConfig) -> GenOutput {
    let table = BuiltinTable::standard();
    CodeGen::new("test.vexar", &table)
        .with_config(config)
        .build_file(file)
}

/// Messages of every error diagnostic.
fn errors(out: &GenOutput) -> Vec<String> {
    out.diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(|d| d.message.clone())
        .collect()
}

fn function<'m>(module: &'m Module, name: &str) -> &'m Function {
    module
        .function(name)
        .unwrap_or_else(|| panic!("no function @{} in module:\n{}", name, module))
}

fn has_string(module: &Module, s: &str) -> bool {
    module
        .globals
        .iter()
        .any(|g| module.string_constant(&g.name) == Some(s))
}
