//! Functions, builtins, structs, casts and entry synthesis.

use super::*;

fn point_struct(methods: Vec<FnDef>) -> Spanned<Item> {
    let field = |name: &str| StructField {
        name: sp(name.to_string()),
        ty: sp(TypeName::named("int")),
    };
    sp(Item::Struct(StructDef {
        name: sp("Point".to_string()),
        fields: vec![field("x"), field("y")],
        methods,
    }))
}

fn field(obj: &str, name: &str) -> Spanned<Expr> {
    sp(Expr::FieldAccess {
        expr: Box::new(var(obj)),
        field: sp(name.to_string()),
    })
}

fn field_place(obj: &str, name: &str) -> Place {
    Place::Field(Box::new(sp(Place::Var(obj.into()))), sp(name.to_string()))
}

// ── Test: entry synthesis ──

#[test]
fn user_main_is_wrapped_by_native_main() {
    let f = file(vec![func("main", &[], Some("int"), vec![ret(Some(num(7.0)))])]);
    let out = translate(&f);
    assert!(errors(&out).is_empty(), "{:?}", out.diagnostics);
    let main = function(&out.module, "main");
    assert_eq!(main.ret, crate::ir::Type::I32);
    let callees = main.callees();
    assert!(callees.contains(&"user_main"));
    assert!(callees.contains(&"atexit"));
    assert!(out.module.function("gc_cleanup").is_some());
}

#[test]
fn missing_user_main_exits_with_one() {
    let f = file(vec![func("helper", &[], None, vec![])]);
    let out = translate(&f);
    let text = function(&out.module, "main").to_string();
    assert!(text.contains("ret i32 1"), "{}", text);
}

#[test]
fn void_user_main_exits_with_zero() {
    let f = file(vec![func("main", &[], None, vec![])]);
    let out = translate(&f);
    let text = function(&out.module, "main").to_string();
    assert!(text.contains("ret i32 0"), "{}", text);
}

#[test]
fn entry_synthesis_can_be_disabled() {
    let mut config = GenConfig::default();
    config.module.synthesize_entry = false;
    let f = file(vec![func("main", &[], Some("int"), vec![ret(Some(num(0.0)))])]);
    let out = translate_with(&f, config);
    assert!(out.module.function("user_main").is_none());
    assert!(!function(&out.module, "main").is_declaration());
}

// ── Test: symbol table ──

#[test]
fn redefinition_keeps_first_definition() {
    let f = file(vec![
        func("f", &[], Some("int"), vec![ret(Some(num(1.0)))]),
        func("f", &[("a", "int")], Some("int"), vec![ret(Some(var("a")))]),
    ]);
    let out = translate(&f);
    assert_eq!(errors(&out), vec!["Function already defined: f"]);
    assert!(function(&out.module, "f").params.is_empty());
}

#[test]
fn runtime_and_builtin_names_are_reserved() {
    let f = file(vec![
        func("malloc", &[], None, vec![]),
        func("print", &[], None, vec![]),
    ]);
    assert_eq!(
        errors(&translate(&f)),
        vec!["Function name is reserved: malloc", "Function name is reserved: print"]
    );
}

#[test]
fn forward_and_recursive_calls_resolve() {
    let fact = func(
        "fact",
        &[("n", "int")],
        Some("int"),
        vec![
            sp(Stmt::If {
                branches: vec![IfBranch {
                    cond: bin(BinOp::Lte, var("n"), num(1.0)),
                    body: block(vec![ret(Some(num(1.0)))]),
                }],
                else_block: None,
            }),
            ret(Some(bin(
                BinOp::Mul,
                var("n"),
                call("fact", vec![bin(BinOp::Sub, var("n"), num(1.0))]),
            ))),
        ],
    );
    let main = func("main", &[], Some("int"), vec![ret(Some(call("fact", vec![num(5.0)])))]);
    let out = translate(&file(vec![main, fact]));
    assert!(errors(&out).is_empty(), "{:?}", out.diagnostics);
    assert!(function(&out.module, "fact").callees().contains(&"fact"));
    assert!(crate::ir::verify::verify_module(&out.module).is_ok());
}

#[test]
fn call_errors() {
    let f = file(vec![
        func("two", &[("a", "int"), ("b", "int")], None, vec![]),
        func("a", &[], None, vec![expr_stmt(call("missing", vec![]))]),
        func("b", &[], None, vec![expr_stmt(call("two", vec![num(1.0)]))]),
        func("c", &[], None, vec![expr_stmt(call("print", vec![]))]),
    ]);
    assert_eq!(
        errors(&translate(&f)),
        vec![
            "Function not found: missing",
            "Function two expects 2 argument(s), got 1",
            "Empty arguments for print function",
        ]
    );
}

// ── Test: builtins ──

#[test]
fn print_formats_follow_value_type() {
    let f = file(vec![func(
        "main",
        &[],
        None,
        vec![
            expr_stmt(call("println", vec![num(1.0)])),
            expr_stmt(call("print", vec![num(2.5)])),
            expr_stmt(call("println", vec![text("hi")])),
            expr_stmt(call("println", vec![sp(Expr::Literal(Literal::Bool(true)))])),
        ],
    )]);
    let out = translate(&f);
    assert!(errors(&out).is_empty(), "{:?}", out.diagnostics);
    for s in ["%d\n", "%.6f", "%s\n", "%s", "true\n", "false\n"] {
        assert!(has_string(&out.module, s), "missing {:?}", s);
    }
}

#[test]
fn type_builtin_names_the_type() {
    let f = file(vec![func(
        "main",
        &[],
        None,
        vec![
            decl("a", Some("int[3]"), None),
            expr_stmt(call("println", vec![call("type", vec![var("a")])])),
            expr_stmt(call("println", vec![call("type", vec![num(1.5)])])),
        ],
    )]);
    let out = translate(&f);
    assert!(errors(&out).is_empty(), "{:?}", out.diagnostics);
    assert!(has_string(&out.module, "int[3]"));
    assert!(has_string(&out.module, "double"));
}

#[test]
fn str_of_int_uses_sprintf() {
    let f = file(vec![func(
        "show",
        &[("n", "int")],
        Some("string"),
        vec![ret(Some(call("str", vec![var("n")])))],
    )]);
    let out = translate(&f);
    assert!(errors(&out).is_empty(), "{:?}", out.diagnostics);
    assert!(function(&out.module, "show").callees().contains(&"sprintf"));
}

// ── Test: strings ──

#[test]
fn string_concatenation_allocates() {
    let f = file(vec![func(
        "greet",
        &[("name", "string")],
        Some("string"),
        vec![ret(Some(bin(BinOp::Add, text("hi "), var("name"))))],
    )]);
    let out = translate(&f);
    assert!(errors(&out).is_empty(), "{:?}", out.diagnostics);
    let callees = function(&out.module, "greet").callees();
    for c in ["strlen", "malloc", "strcpy", "strcat"] {
        assert!(callees.contains(&c), "missing {}", c);
    }
}

#[test]
fn string_equality_uses_strcmp() {
    let f = file(vec![func(
        "same",
        &[("a", "string"), ("b", "string")],
        Some("bool"),
        vec![ret(Some(bin(BinOp::Eq, var("a"), var("b"))))],
    )]);
    let out = translate(&f);
    assert!(function(&out.module, "same").callees().contains(&"strcmp"));
}

#[test]
fn modulo_on_floats_is_rejected() {
    let f = file(vec![func(
        "m",
        &[("a", "double")],
        Some("double"),
        vec![ret(Some(bin(BinOp::Mod, var("a"), num(2.0))))],
    )]);
    assert_eq!(
        errors(&translate(&f)),
        vec!["Modulo operator not supported on floating-point numbers"]
    );
}

// ── Test: casts ──

#[test]
fn cast_to_same_type_warns() {
    let cast = sp(Expr::Cast {
        target: sp("int".to_string()),
        expr: Box::new(num(3.0)),
    });
    let f = file(vec![func("main", &[], Some("int"), vec![ret(Some(cast))])]);
    let out = translate(&f);
    assert!(errors(&out).is_empty());
    assert!(out
        .diagnostics
        .iter()
        .any(|d| !d.is_error() && d.message == "No cast needed"));
}

#[test]
fn cast_to_unknown_type_is_rejected() {
    let cast = sp(Expr::Cast {
        target: sp("Point".to_string()),
        expr: Box::new(num(3.0)),
    });
    let f = file(vec![func("main", &[], None, vec![expr_stmt(cast)])]);
    assert_eq!(errors(&translate(&f)), vec!["Unsupported target type: Point"]);
}

fn cast(target: &str, expr: Spanned<Expr>) -> Spanned<Expr> {
    sp(Expr::Cast {
        target: sp(target.to_string()),
        expr: Box::new(expr),
    })
}

#[test]
fn string_to_double_cast_uses_strtod() {
    let f = file(vec![func(
        "parse",
        &[("s", "string")],
        Some("double"),
        vec![ret(Some(cast("double", var("s"))))],
    )]);
    let out = translate(&f);
    assert!(errors(&out).is_empty(), "{:?}", out.diagnostics);
    assert!(function(&out.module, "parse").callees().contains(&"strtod"));
}

#[test]
fn string_to_int_cast_reads_first_char() {
    let f = file(vec![func(
        "code",
        &[("s", "string")],
        Some("int"),
        vec![ret(Some(cast("int", var("s"))))],
    )]);
    let out = translate(&f);
    assert!(errors(&out).is_empty(), "{:?}", out.diagnostics);
    let code = function(&out.module, "code");
    assert!(!code.callees().contains(&"atoi"));
    let text = code.to_string();
    assert!(text.contains("load i8"), "{}", text);
    assert!(text.contains("sext i8"), "{}", text);
}

#[test]
fn number_to_string_cast_formats_with_sprintf() {
    let f = file(vec![func(
        "show",
        &[("x", "double")],
        Some("string"),
        vec![ret(Some(cast("string", var("x"))))],
    )]);
    let out = translate(&f);
    assert!(errors(&out).is_empty(), "{:?}", out.diagnostics);
    assert!(function(&out.module, "show").callees().contains(&"sprintf"));
    assert!(has_string(&out.module, "%.6f"));
}

// ── Test: structs and methods ──

#[test]
fn struct_fields_and_methods() {
    let sum = fn_def(
        "sum",
        &[],
        Some("int"),
        vec![ret(Some(bin(BinOp::Add, field("self", "x"), field("self", "y"))))],
    );
    let main = func(
        "main",
        &[],
        Some("int"),
        vec![
            decl("p", Some("Point"), None),
            assign(field_place("p", "x"), num(3.0)),
            assign(field_place("p", "y"), num(4.0)),
            ret(Some(sp(Expr::MethodCall {
                receiver: Box::new(var("p")),
                method: sp("sum".to_string()),
                args: vec![],
            }))),
        ],
    );
    let out = translate(&file(vec![point_struct(vec![sum]), main]));
    assert!(errors(&out).is_empty(), "{:?}", out.diagnostics);
    assert!(out.module.struct_type("Point").is_some());
    let method = function(&out.module, "Point__sum");
    assert_eq!(method.params.len(), 1);
    assert!(function(&out.module, "user_main").callees().contains(&"Point__sum"));
    assert!(crate::ir::verify::verify_module(&out.module).is_ok());
}

#[test]
fn unknown_field_and_method() {
    let main = func(
        "main",
        &[],
        None,
        vec![
            decl("p", Some("Point"), None),
            expr_stmt(field("p", "z")),
        ],
    );
    let other = func(
        "other",
        &[],
        None,
        vec![
            decl("p", Some("Point"), None),
            expr_stmt(sp(Expr::MethodCall {
                receiver: Box::new(var("p")),
                method: sp("norm".to_string()),
                args: vec![],
            })),
        ],
    );
    assert_eq!(
        errors(&translate(&file(vec![point_struct(vec![]), main, other]))),
        vec!["Unknown field: Point.z", "Unknown method: Point.norm"]
    );
}

#[test]
fn struct_as_value_is_rejected() {
    let main = func(
        "main",
        &[],
        None,
        vec![
            decl("p", Some("Point"), None),
            expr_stmt(call("println", vec![var("p")])),
        ],
    );
    assert_eq!(
        errors(&translate(&file(vec![point_struct(vec![]), main]))),
        vec!["Struct value cannot be used as an expression: p"]
    );
}

// ── Test: inline assembly ──

#[test]
fn inline_asm_uses_positional_operands() {
    let f = file(vec![func(
        "main",
        &[],
        None,
        vec![
            decl("x", Some("int"), Some(num(1.0))),
            sp(Stmt::Inline {
                lang: "asm".to_string(),
                code: "nop # $x".to_string(),
                volatile: true,
            }),
        ],
    )]);
    let out = translate(&f);
    assert!(errors(&out).is_empty(), "{:?}", out.diagnostics);
    let text = function(&out.module, "user_main").to_string();
    assert!(text.contains("asm sideeffect \"nop # $0\", \"r\""), "{}", text);
}

#[test]
fn inline_unknown_language_is_rejected() {
    let f = file(vec![func(
        "main",
        &[],
        None,
        vec![sp(Stmt::Inline {
            lang: "cobol".to_string(),
            code: String::new(),
            volatile: false,
        })],
    )]);
    assert_eq!(errors(&translate(&f)), vec!["Unsupported inline language: cobol"]);
}
