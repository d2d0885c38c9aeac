//! The builtin function table.
//!
//! Built once (`BuiltinTable::standard`) and shared read-only by every
//! translation. Handlers receive the raw argument expressions so shape
//! sensitive builtins like `len` can look at identifiers before anything
//! is evaluated.

use std::collections::BTreeMap;

use crate::ast::Expr;
use crate::diagnostic::Diagnostic;
use crate::ir::{RuntimeFn, Type, Value};
use crate::span::{Span, Spanned};

use super::array::ArrayStorage;
use super::types::{type_name, Coercion};
use super::{CodeGen, GenResult};

/// Handler signature: translator, raw arguments, call span.
pub type BuiltinFn = fn(&mut CodeGen<'_>, &[Spanned<Expr>], Span) -> GenResult<Value>;

/// Accepted argument counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
}

impl Arity {
    pub fn accepts(&self, n: usize) -> bool {
        match *self {
            Arity::Exact(k) => n == k,
            Arity::Range(lo, hi) => (lo..=hi).contains(&n),
        }
    }

    fn min(&self) -> usize {
        match *self {
            Arity::Exact(k) | Arity::Range(k, _) => k,
        }
    }
}

#[derive(Clone)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: Arity,
    pub handler: BuiltinFn,
}

impl Builtin {
    pub fn check_arity(&self, n: usize, span: Span) -> GenResult<()> {
        if self.arity.accepts(n) {
            return Ok(());
        }
        if n == 0 && self.arity.min() > 0 {
            return Err(Diagnostic::error(
                format!("Empty arguments for {} function", self.name),
                span,
            ));
        }
        let expected = match self.arity {
            Arity::Exact(k) => k.to_string(),
            Arity::Range(lo, hi) => format!("{} to {}", lo, hi),
        };
        Err(Diagnostic::error(
            format!(
                "Function {} expects {} argument(s), got {}",
                self.name, expected, n
            ),
            span,
        ))
    }
}

impl std::fmt::Debug for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuiltinTable {
    entries: BTreeMap<&'static str, Builtin>,
}

impl BuiltinTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every builtin the language defines.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        table.register("print", Arity::Exact(1), builtin_print);
        table.register("println", Arity::Exact(1), builtin_println);
        table.register("input", Arity::Range(0, 1), builtin_input);
        table.register("type", Arity::Exact(1), builtin_type);
        table.register("toString", Arity::Exact(1), builtin_str);
        table.register("str", Arity::Exact(1), builtin_str);
        table.register("int", Arity::Exact(1), builtin_int);
        table.register("float", Arity::Exact(1), builtin_float);
        table.register("char", Arity::Exact(1), builtin_char);
        table.register("bool", Arity::Exact(1), builtin_bool);
        table.register("exit", Arity::Range(0, 1), builtin_exit);
        table.register("len", Arity::Exact(1), builtin_len);
        table.register("arraysize", Arity::Exact(1), builtin_len);
        table.register("malloc", Arity::Exact(1), builtin_malloc);
        table.register("malloc_tracked", Arity::Exact(1), builtin_malloc_tracked);
        table.register("free", Arity::Exact(1), builtin_free);
        table.register("free_deep", Arity::Exact(2), builtin_free_deep);
        table.register("gc_collect", Arity::Exact(0), builtin_gc_collect);
        table
    }

    /// Register (or replace) a handler.
    pub fn register(&mut self, name: &'static str, arity: Arity, handler: BuiltinFn) {
        self.entries.insert(
            name,
            Builtin {
                name,
                arity,
                handler,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&Builtin> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─── Output ────────────────────────────────────────────────────────

fn builtin_print(gen: &mut CodeGen<'_>, args: &[Spanned<Expr>], _span: Span) -> GenResult<Value> {
    let v = gen.build_expr(&args[0])?;
    gen.print_value(v, false, args[0].span)
}

fn builtin_println(gen: &mut CodeGen<'_>, args: &[Spanned<Expr>], _span: Span) -> GenResult<Value> {
    let v = gen.build_expr(&args[0])?;
    gen.print_value(v, true, args[0].span)
}

impl<'b> CodeGen<'b> {
    /// `printf` with a format chosen by the value's type.
    pub(crate) fn print_value(&mut self, v: Value, newline: bool, span: Span) -> GenResult<Value> {
        let nl = if newline { "\n" } else { "" };
        let (fmt, arg) = match v.ty.clone() {
            Type::Int(1) => {
                let t = self.ir.const_string(&format!("true{}", nl));
                let f = self.ir.const_string(&format!("false{}", nl));
                ("%s".to_string(), self.ir.select(v, t, f))
            }
            Type::Int(8) => (format!("%c{}", nl), self.ir.int_cast(v, Type::I32, true)),
            Type::Int(64) => (format!("%ld{}", nl), v),
            Type::Int(_) => (format!("%d{}", nl), self.ir.int_cast(v, Type::I32, true)),
            Type::Float | Type::Double => (format!("%.6f{}", nl), self.ir.fp_cast(v, Type::F64)),
            Type::Ptr => (format!("%s{}", nl), v),
            other => {
                return Err(Diagnostic::error(
                    format!("Cannot print a value of type {}", type_name(&other)),
                    span,
                ))
            }
        };
        Ok(self.ir.printf(&fmt, vec![arg]))
    }
}

/// Reads one whitespace-delimited word (at most 255 bytes).
fn builtin_input(gen: &mut CodeGen<'_>, args: &[Spanned<Expr>], _span: Span) -> GenResult<Value> {
    if let Some(prompt) = args.first() {
        let p = gen.build_expr(prompt)?;
        gen.print_value(p, false, prompt.span)?;
    }
    let size = gen.ir.const_i64(256);
    let buf = gen.ir.tracked_malloc(size, 1);
    let fmt = gen.ir.const_string("%255s");
    gen.ir.call_runtime(RuntimeFn::Scanf, vec![fmt, buf.clone()]);
    Ok(buf)
}

// ─── Conversions ───────────────────────────────────────────────────

fn builtin_type(gen: &mut CodeGen<'_>, args: &[Spanned<Expr>], _span: Span) -> GenResult<Value> {
    if let Expr::Var(name) = &args[0].node {
        let slot = gen.lookup(name, args[0].span)?;
        let text = match (&slot.array, slot.struct_name()) {
            (Some(info), _) => info.describe(),
            (None, Some(ty_name)) => ty_name.to_string(),
            (None, None) => type_name(&slot.ty).to_string(),
        };
        return Ok(gen.ir.const_string(&text));
    }
    let v = gen.build_expr(&args[0])?;
    Ok(gen.ir.const_string(type_name(&v.ty)))
}

/// `str(x)`: `%d` for ints and bools, `%c` for chars, `%.6f` for floats.
fn builtin_str(gen: &mut CodeGen<'_>, args: &[Spanned<Expr>], span: Span) -> GenResult<Value> {
    let v = gen.build_expr(&args[0])?;
    match v.ty.clone() {
        Type::Ptr => Ok(v),
        Type::Int(8) => {
            let c = gen.ir.int_cast(v, Type::I32, true);
            Ok(gen.sprintf_number("%c", c))
        }
        Type::Int(64) => Ok(gen.sprintf_number("%ld", v)),
        Type::Int(_) => {
            let n = gen.ir.int_cast(v, Type::I32, true);
            Ok(gen.sprintf_number("%d", n))
        }
        Type::Float | Type::Double => {
            let d = gen.ir.fp_cast(v, Type::F64);
            Ok(gen.sprintf_number("%.6f", d))
        }
        other => Err(Diagnostic::error(
            format!("Cannot convert {} to string", type_name(&other)),
            span,
        )),
    }
}

fn builtin_int(gen: &mut CodeGen<'_>, args: &[Spanned<Expr>], span: Span) -> GenResult<Value> {
    let v = gen.build_expr(&args[0])?;
    match &v.ty {
        Type::Ptr => Ok(gen.ir.call_runtime(RuntimeFn::Atoi, vec![v])),
        Type::Int(_) | Type::Float | Type::Double => {
            gen.coerce(v, &Type::I32, Coercion::Operand, span)
        }
        other => Err(Diagnostic::error(
            format!("Cannot convert {} to int", type_name(other)),
            span,
        )),
    }
}

fn builtin_float(gen: &mut CodeGen<'_>, args: &[Spanned<Expr>], span: Span) -> GenResult<Value> {
    let v = gen.build_expr(&args[0])?;
    match &v.ty {
        Type::Ptr => {
            let d = gen.ir.call_runtime(RuntimeFn::Atof, vec![v]);
            Ok(gen.ir.fp_cast(d, Type::F32))
        }
        Type::Int(_) | Type::Float | Type::Double => {
            gen.coerce(v, &Type::F32, Coercion::Operand, span)
        }
        other => Err(Diagnostic::error(
            format!("Cannot convert {} to float", type_name(other)),
            span,
        )),
    }
}

fn builtin_char(gen: &mut CodeGen<'_>, args: &[Spanned<Expr>], span: Span) -> GenResult<Value> {
    let v = gen.build_expr(&args[0])?;
    match &v.ty {
        Type::Ptr => Ok(gen.ir.load(Type::I8, v)),
        Type::Int(_) => Ok(gen.ir.int_cast(v, Type::I8, true)),
        Type::Float | Type::Double => Ok(gen.ir.fp_to_si(v, Type::I8)),
        other => Err(Diagnostic::error(
            format!("Cannot convert {} to char", type_name(other)),
            span,
        )),
    }
}

fn builtin_bool(gen: &mut CodeGen<'_>, args: &[Spanned<Expr>], span: Span) -> GenResult<Value> {
    let v = gen.build_expr(&args[0])?;
    gen.to_bool(v, span)
}

fn builtin_exit(gen: &mut CodeGen<'_>, args: &[Spanned<Expr>], span: Span) -> GenResult<Value> {
    let code = match args.first() {
        Some(arg) => {
            let v = gen.build_expr(arg)?;
            gen.coerce(v, &Type::I32, Coercion::Argument(0, "exit"), span)?
        }
        None => gen.ir.const_i32(0),
    };
    Ok(gen.ir.call_runtime(RuntimeFn::Exit, vec![code]))
}

// ─── Lengths ───────────────────────────────────────────────────────

/// Arrays report their outer size (constant for stack arrays, tracked
/// size for heap arrays), strings their `strlen`, scalars 1. `len(m[i])`
/// on a 2-D stack array is the inner size.
fn builtin_len(gen: &mut CodeGen<'_>, args: &[Spanned<Expr>], span: Span) -> GenResult<Value> {
    let arg = &args[0];
    match &arg.node {
        Expr::Var(name) => {
            let slot = gen.lookup(name, arg.span)?;
            if slot.array.is_some() {
                return gen.array_len(name, &slot, span);
            }
            if slot.ty.is_ptr() {
                let s = gen.ir.load(Type::PTR, slot.ptr.clone());
                return Ok(string_len(gen, s));
            }
            if slot.struct_name().is_some() {
                return Err(Diagnostic::error(
                    format!("len() is not defined for struct value: {}", name),
                    arg.span,
                ));
            }
            Ok(gen.ir.const_i32(1))
        }
        Expr::Index { expr, indices } if indices.len() == 1 => {
            if let Expr::Var(name) = &expr.node {
                let slot = gen.lookup(name, expr.span)?;
                if let Some(info) = &slot.array {
                    if info.storage == ArrayStorage::Stack && info.rank() == 2 {
                        let inner = info.dims[1].unwrap_or(0);
                        return Ok(gen.ir.const_i32(inner as i64));
                    }
                }
            }
            len_of_value(gen, arg, span)
        }
        _ => len_of_value(gen, arg, span),
    }
}

fn len_of_value(gen: &mut CodeGen<'_>, arg: &Spanned<Expr>, span: Span) -> GenResult<Value> {
    let v = gen.build_expr(arg)?;
    if v.ty.is_ptr() {
        return Ok(string_len(gen, v));
    }
    Err(Diagnostic::error("len() requires an array or a string", span)
        .with_note(format!("found {}", type_name(&v.ty))))
}

fn string_len(gen: &mut CodeGen<'_>, s: Value) -> Value {
    let n = gen.ir.strlen(s);
    gen.ir.int_cast(n, Type::I32, false)
}

// ─── Memory ────────────────────────────────────────────────────────

fn size_arg(gen: &mut CodeGen<'_>, arg: &Spanned<Expr>, fname: &str) -> GenResult<Value> {
    let v = gen.build_expr(arg)?;
    if !v.ty.is_int() {
        return Err(Diagnostic::error(
            format!("Size argument of {} must be an integer", fname),
            arg.span,
        ));
    }
    Ok(gen.ir.int_cast(v, Type::I64, true))
}

fn pointer_arg(gen: &mut CodeGen<'_>, arg: &Spanned<Expr>, fname: &str) -> GenResult<Value> {
    let v = gen.build_expr(arg)?;
    if !v.ty.is_ptr() {
        return Err(Diagnostic::error(
            format!("{} expects a pointer, found {}", fname, type_name(&v.ty)),
            arg.span,
        ));
    }
    Ok(v)
}

/// A pointer that may be released: fixed arrays live on the stack.
fn heap_arg(gen: &mut CodeGen<'_>, arg: &Spanned<Expr>, fname: &str) -> GenResult<Value> {
    let mut inner = arg;
    while let Expr::Paren(e) = &inner.node {
        inner = e.as_ref();
    }
    if let Expr::Var(name) = &inner.node {
        let slot = gen.lookup(name, inner.span)?;
        if let Some(info) = slot.array.as_ref().filter(|a| a.storage == ArrayStorage::Stack) {
            return Err(Diagnostic::error(
                format!("{} expects a heap pointer, but '{}' is a fixed-size array", fname, name),
                arg.span,
            )
            .with_note(format!("'{}' has type {}", name, info.describe())));
        }
    }
    pointer_arg(gen, arg, fname)
}

fn builtin_malloc(gen: &mut CodeGen<'_>, args: &[Spanned<Expr>], _span: Span) -> GenResult<Value> {
    let size = size_arg(gen, &args[0], "malloc")?;
    Ok(gen.ir.malloc(size))
}

fn builtin_malloc_tracked(
    gen: &mut CodeGen<'_>,
    args: &[Spanned<Expr>],
    _span: Span,
) -> GenResult<Value> {
    let size = size_arg(gen, &args[0], "malloc_tracked")?;
    Ok(gen.ir.tracked_malloc(size, 1))
}

fn builtin_free(gen: &mut CodeGen<'_>, args: &[Spanned<Expr>], _span: Span) -> GenResult<Value> {
    let ptr = heap_arg(gen, &args[0], "free")?;
    gen.ir.untrack(ptr.clone());
    gen.ir.free(ptr);
    Ok(Value::undef(Type::VOID))
}

/// `free_deep(table, rows)`: every row, then the table.
fn builtin_free_deep(gen: &mut CodeGen<'_>, args: &[Spanned<Expr>], span: Span) -> GenResult<Value> {
    let table = heap_arg(gen, &args[0], "free_deep")?;
    let rows = gen.build_expr(&args[1])?;
    if !rows.ty.is_int() {
        return Err(Diagnostic::error("Row count of free_deep must be an integer", span));
    }
    gen.ir.free_rows(table, rows);
    Ok(Value::undef(Type::VOID))
}

fn builtin_gc_collect(gen: &mut CodeGen<'_>, _args: &[Spanned<Expr>], _span: Span) -> GenResult<Value> {
    gen.ir.gc_collect();
    Ok(Value::undef(Type::VOID))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_has_aliases() {
        let table = BuiltinTable::standard();
        assert!(table.contains("len"));
        assert!(table.contains("arraysize"));
        assert!(table.contains("toString"));
        assert!(table.contains("str"));
        assert!(!table.contains("main"));
    }

    #[test]
    fn test_arity_messages() {
        let table = BuiltinTable::standard();
        let print = table.get("print").unwrap();
        let err = print.check_arity(0, Span::dummy()).unwrap_err();
        assert_eq!(err.message, "Empty arguments for print function");
        let err = print.check_arity(2, Span::dummy()).unwrap_err();
        assert!(err.message.contains("expects 1"));
        assert!(table.get("exit").unwrap().check_arity(0, Span::dummy()).is_ok());
    }

    #[test]
    fn test_register_replaces_handler() {
        let mut table = BuiltinTable::empty();
        table.register("len", Arity::Exact(1), builtin_len);
        table.register("len", Arity::Range(1, 2), builtin_len);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("len").unwrap().arity, Arity::Range(1, 2));
    }
}
