//! End-to-end translation through the public API and the JSON loader.

use std::io::Write;

use serde_json::{json, Value as Json};

use aero::ast::File;
use aero::ir::verify::reachable_blocks;
use aero::ir::{Module, Terminator, Type};
use aero::{Error, GenConfig};

// ── JSON AST helpers ──

fn node(n: Json) -> Json {
    json!({ "node": n })
}

fn at(n: Json, line: u32, column: u32) -> Json {
    json!({ "node": n, "span": { "line": line, "column": column } })
}

fn num(n: f64) -> Json {
    node(json!({ "literal": { "number": n } }))
}

fn string(s: &str) -> Json {
    node(json!({ "literal": { "str": s } }))
}

fn var(name: &str) -> Json {
    node(json!({ "var": name }))
}

fn bin(op: &str, lhs: Json, rhs: Json) -> Json {
    node(json!({ "bin_op": { "op": op, "lhs": lhs, "rhs": rhs } }))
}

fn call(name: &str, args: Vec<Json>) -> Json {
    node(json!({ "call": { "name": node(json!(name)), "args": args } }))
}

fn decl(name: &str, init: Json) -> Json {
    node(json!({ "var": { "name": node(json!(name)), "init": init } }))
}

fn decl_typed(name: &str, ty: Json, init: Json) -> Json {
    node(json!({ "var": { "name": node(json!(name)), "ty": node(ty), "init": init } }))
}

fn func(name: &str, ret: Option<&str>, stmts: Vec<Json>) -> Json {
    let mut def = json!({
        "name": node(json!(name)),
        "body": node(json!({ "stmts": stmts })),
    });
    if let Some(ty) = ret {
        def["return_ty"] = node(json!({ "name": ty }));
    }
    node(json!({ "fn": def }))
}

fn has_string(module: &Module, s: &str) -> bool {
    module
        .globals
        .iter()
        .any(|g| module.string_constant(&g.name) == Some(s))
}

fn program(items: Vec<Json>) -> File {
    serde_json::from_value(json!({ "name": "prog.aero", "items": items })).unwrap()
}

// ── Scenario: int + double promotes to double ──

#[test]
fn auto_declarations_promote_to_double() {
    let file = program(vec![func(
        "main",
        None,
        vec![
            decl("x", num(5.0)),
            decl("y", num(3.5)),
            decl("z", bin("+", var("x"), var("y"))),
        ],
    )]);
    let t = aero::translate(&file).unwrap();
    let text = t.module.function("user_main").unwrap().to_string();
    assert!(text.contains("alloca i32"), "{}", text);
    assert!(text.contains("sitofp i32"), "{}", text);
    assert!(text.contains("fadd double"), "{}", text);
    assert_eq!(text.matches("alloca double").count(), 2, "{}", text);
}

// ── Scenario: empty int function returns zero ──

#[test]
fn empty_int_function_returns_zero() {
    let file = program(vec![func("f", Some("int"), vec![])]);
    let t = aero::translate(&file).unwrap();
    let f = t.module.function("f").unwrap();
    assert_eq!(f.ret, Type::I32);
    assert!(f.to_string().contains("ret i32 0"), "{}", f);
}

// ── Scenario: constant out-of-range index fails with its position ──

#[test]
fn constant_out_of_range_index_reports_position() {
    let sized = json!({ "name": "int", "dims": [ { "sized": num(3.0) } ] });
    let array = node(json!({ "array_init": [num(1.0), num(2.0), num(3.0)] }));
    let access = node(json!({ "index": { "expr": var("a"), "indices": [at(json!({ "literal": { "number": 5.0 } }), 2, 13)] } }));
    let file = program(vec![func(
        "main",
        None,
        vec![decl_typed("a", sized, array), decl("v", access)],
    )]);
    let Err(Error::Translate(diags)) = aero::translate(&file) else {
        panic!("expected a translation error");
    };
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].message, "Array index 5 out of bounds for array of size 3");
    assert_eq!((diags[0].span.line, diags[0].span.column), (2, 13));
}

// ── Scenario: while(false) keeps an unreachable body ──

#[test]
fn while_false_body_is_built_but_unreachable() {
    let assign = node(json!({ "assign": { "place": node(json!({ "var": "x" })), "value": num(1.0) } }));
    let looped = node(json!({
        "while": {
            "cond": node(json!({ "literal": { "bool": false } })),
            "body": node(json!({ "stmts": [assign] })),
        }
    }));
    let file = program(vec![func("main", None, vec![decl("x", num(0.0)), looped])]);
    let t = aero::translate(&file).unwrap();
    let main = t.module.function("user_main").unwrap();

    let header = main.block_named("while.header").unwrap();
    let body = main.block_named("while.body").unwrap();
    let exit = main.block_named("while.exit").unwrap();
    match &header.term {
        Some(Terminator::CondBr { cond, else_bb, .. }) => {
            assert_eq!(cond.as_const_int(), Some(0));
            assert_eq!(*else_bb, exit.id);
        }
        other => panic!("unexpected header terminator {:?}", other),
    }
    assert!(!body.instrs.is_empty());
    let reachable = reachable_blocks(main);
    // the CFG keeps both edges; only a constant-aware walk would drop the body
    assert!(reachable.contains(&exit.id));
}

// ── Scenario: string plus int concatenates at runtime ──

#[test]
fn string_plus_int_concatenates() {
    let file = program(vec![func(
        "main",
        None,
        vec![node(json!({ "expr": call("print", vec![bin("+", string("a"), num(1.0))]) }))],
    )]);
    let t = aero::translate(&file).unwrap();
    let main = t.module.function("user_main").unwrap();
    let callees = main.callees();
    let pos = |name: &str| {
        callees
            .iter()
            .position(|c| *c == name)
            .unwrap_or_else(|| panic!("no call to {} in {:?}", name, callees))
    };
    assert!(pos("sprintf") < pos("strcpy"));
    assert!(pos("strcpy") < pos("strcat"));
    assert!(pos("strcat") < pos("printf"));
    assert!(has_string(&t.module, "%d"));
    assert!(has_string(&t.module, "%s"));
}

// ── Loader and driver ──

#[test]
fn compile_file_names_module_after_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hello.json");
    let file = json!({ "items": [func("main", Some("int"), vec![node(json!({ "return": num(0.0) }))])] });
    std::fs::write(&path, file.to_string()).unwrap();

    let t = aero::compile_file(&path, &GenConfig::default()).unwrap();
    assert_eq!(t.module.name, "hello.vexar");
    assert!(t.module.function("main").is_some());
    assert!(t.warnings.is_empty());
}

#[test]
fn malformed_ast_is_reported() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    write!(tmp, "{{ \"items\": [ {{ \"bogus\": 1 }} ] }}").unwrap();
    let err = aero::compile_file(tmp.path(), &GenConfig::default()).unwrap_err();
    assert!(matches!(err, Error::Ast { .. }), "{}", err);
}

#[test]
fn missing_file_is_io_error() {
    let err = aero::load_ast(std::path::Path::new("/nonexistent/prog.json")).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

#[test]
fn config_file_changes_translation() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    writeln!(tmp, "[module]\nsuffix = \".ll\"\nopt_level = 2\n\n[runtime]\ntracked_allocation = false").unwrap();
    let config = GenConfig::load(tmp.path()).unwrap();

    let file = program(vec![func(
        "main",
        None,
        vec![decl("xs", node(json!({ "array_init": [num(1.0), num(2.0)] })))],
    )]);
    let t = aero::translate_with_config(&file, &config).unwrap();
    assert_eq!(t.module.name, "prog.ll");
    assert_eq!(t.module.opt_level, aero::ir::OptLevel::O2);
    let callees = t.module.function("user_main").unwrap().callees();
    assert!(callees.contains(&"malloc"));
    assert!(!callees.contains(&"gc_register"));
}

#[test]
fn every_function_error_is_collected() {
    let file = program(vec![
        func("a", None, vec![node(json!({ "expr": var("missing") }))]),
        func("b", None, vec![node(json!({ "expr": call("nope", vec![]) }))]),
    ]);
    let err = aero::translate(&file).unwrap_err();
    let messages: Vec<&str> = err.diagnostics().iter().map(|d| d.message.as_str()).collect();
    assert_eq!(messages, vec!["Undefined variable: missing", "Function not found: nope"]);
}
