//! Inline foreign code: `asm`, `c` and `cxx` blocks.
//!
//! Source variables are referenced as `$name`. Assembly gets them as
//! positional register operands; C and C++ blocks are wrapped in a
//! function taking them as parameters, compiled to textual IR by the
//! configured compiler and attached to the module as a foreign unit.

use std::path::Path;
use std::process::Command;

use crate::diagnostic::Diagnostic;
use crate::ir::{ForeignUnit, Param, Type, Value};
use crate::span::Span;

use super::array::ArrayStorage;
use super::{CodeGen, GenResult};

/// Return type of a wrapped C block, guessed from its first `return`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CReturn {
    Void,
    Int,
    Char,
    Bool,
    Float,
    Double,
    Str,
}

impl CReturn {
    fn c_name(self) -> &'static str {
        match self {
            CReturn::Void => "void",
            CReturn::Int => "int32_t",
            CReturn::Char => "char",
            CReturn::Bool => "bool",
            CReturn::Float => "float",
            CReturn::Double => "double",
            CReturn::Str => "const char*",
        }
    }

    fn ir_type(self) -> Type {
        match self {
            CReturn::Void => Type::VOID,
            CReturn::Int => Type::I32,
            CReturn::Char => Type::I8,
            CReturn::Bool => Type::I1,
            CReturn::Float => Type::F32,
            CReturn::Double => Type::F64,
            CReturn::Str => Type::PTR,
        }
    }
}

// ─── Text helpers ──────────────────────────────────────────────────

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Split `code` into literal text and `$name` references.
fn tokens(code: &str) -> Vec<(bool, &str)> {
    let mut out = Vec::new();
    let mut literal_start = 0;
    let mut chars = code.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '$' {
            continue;
        }
        let Some(&(start, first)) = chars.peek() else {
            break;
        };
        if !is_ident_start(first) {
            continue;
        }
        let mut end = start;
        while let Some(&(j, ch)) = chars.peek() {
            if !is_ident_char(ch) {
                break;
            }
            end = j + ch.len_utf8();
            chars.next();
        }
        if literal_start < i {
            out.push((false, &code[literal_start..i]));
        }
        out.push((true, &code[start..end]));
        literal_start = end;
    }
    if literal_start < code.len() {
        out.push((false, &code[literal_start..]));
    }
    out
}

/// Referenced variable names, each once, in order of first use.
pub(crate) fn referenced_vars(code: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (is_ref, text) in tokens(code) {
        if is_ref && !names.iter().any(|n| n == text) {
            names.push(text.to_string());
        }
    }
    names
}

/// Replace every `$name` with `operand(position of name in names)`.
pub(crate) fn rewrite_refs(code: &str, names: &[String], operand: impl Fn(usize) -> String) -> String {
    let mut out = String::with_capacity(code.len());
    for (is_ref, text) in tokens(code) {
        match names.iter().position(|n| n == text) {
            Some(pos) if is_ref => out.push_str(&operand(pos)),
            _ if is_ref => {
                out.push('$');
                out.push_str(text);
            }
            _ => out.push_str(text),
        }
    }
    out
}

/// Guess the C return type from the first `return <expr>;`.
pub(crate) fn infer_return(code: &str) -> CReturn {
    let mut rest = code;
    while let Some(pos) = rest.find("return") {
        let before_ok = rest[..pos]
            .chars()
            .next_back()
            .map_or(true, |c| !is_ident_char(c));
        let after = &rest[pos + "return".len()..];
        let after_ok = after.chars().next().map_or(false, |c| !is_ident_char(c));
        if before_ok && after_ok {
            let expr = after.split(';').next().unwrap_or("").trim();
            return classify_return(expr);
        }
        rest = after;
    }
    CReturn::Void
}

fn classify_return(expr: &str) -> CReturn {
    if expr.is_empty() {
        return CReturn::Void;
    }
    if expr.contains('"') {
        return CReturn::Str;
    }
    if expr.contains('\'') {
        return CReturn::Char;
    }
    if expr == "true" || expr == "false" {
        return CReturn::Bool;
    }
    let numeric = expr
        .trim_start_matches(['+', '-'])
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_digit() || c == '.');
    if numeric && (expr.ends_with('f') || expr.ends_with('F')) {
        return CReturn::Float;
    }
    if numeric && (expr.contains('.') || expr.contains('e') || expr.contains('E')) {
        return CReturn::Double;
    }
    CReturn::Int
}

/// C spelling of a parameter type.
pub(crate) fn c_param_type(ty: &Type) -> &'static str {
    match ty {
        Type::Int(1) => "bool",
        Type::Int(8) => "char",
        Type::Int(16) => "int16_t",
        Type::Int(64) => "int64_t",
        Type::Int(_) => "int32_t",
        Type::Float => "float",
        Type::Double => "double",
        _ => "char*",
    }
}

/// Full translation unit for a C or C++ block.
pub(crate) fn render_c_source(
    lang: &str,
    symbol: &str,
    params: &[Type],
    ret: CReturn,
    body: &str,
) -> String {
    let cxx = lang != "c";
    let mut src = String::new();
    if cxx {
        src.push_str("#include <cstdint>\n#include <cstdio>\n#include <cstdlib>\n");
        src.push_str("extern \"C\" {\n");
    } else {
        src.push_str("#include <stdint.h>\n#include <stdio.h>\n#include <stdlib.h>\n#include <stdbool.h>\n");
    }
    let args: Vec<String> = params
        .iter()
        .enumerate()
        .map(|(i, ty)| format!("{} arg{}", c_param_type(ty), i))
        .collect();
    src.push_str(&format!("{} {}({}) {{\n", ret.c_name(), symbol, args.join(", ")));
    src.push_str(body);
    src.push_str("\n}\n");
    if cxx {
        src.push_str("}\n");
    }
    src
}

/// Compile `source` to textual IR. The scratch directory is removed when
/// this returns.
fn compile_to_ir(compiler: &str, lang: &str, source: &str, span: Span) -> GenResult<String> {
    let dir = tempfile::tempdir().map_err(|e| {
        Diagnostic::error("Cannot create a directory for inline code", span).with_note(e.to_string())
    })?;
    let ext = if lang == "c" { "c" } else { "cpp" };
    let src_path = dir.path().join(format!("inline.{}", ext));
    let out_path = dir.path().join("inline.ll");
    std::fs::write(&src_path, source).map_err(|e| {
        Diagnostic::error("Cannot write inline code to disk", span).with_note(e.to_string())
    })?;
    run_compiler(compiler, &src_path, &out_path, span)?;
    std::fs::read_to_string(&out_path).map_err(|e| {
        Diagnostic::error("Cannot read compiled inline code", span).with_note(e.to_string())
    })
}

fn run_compiler(compiler: &str, src: &Path, out: &Path, span: Span) -> GenResult<()> {
    log::debug!("{} -S -emit-llvm -O2 {}", compiler, src.display());
    let output = Command::new(compiler)
        .args(["-S", "-emit-llvm", "-O2"])
        .arg(src)
        .arg("-o")
        .arg(out)
        .output()
        .map_err(|e| {
            Diagnostic::error(format!("Failed to run inline compiler '{}'", compiler), span)
                .with_note(e.to_string())
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(
            Diagnostic::error(format!("Inline code failed to compile with '{}'", compiler), span)
                .with_note(stderr.trim().to_string()),
        );
    }
    Ok(())
}

// ─── Lowering ──────────────────────────────────────────────────────

impl<'b> CodeGen<'b> {
    pub(crate) fn build_inline(
        &mut self,
        lang: &str,
        code: &str,
        volatile: bool,
        span: Span,
    ) -> GenResult<Value> {
        let names = referenced_vars(code);
        let inputs = self.inline_inputs(&names, span)?;
        match lang {
            "asm" | "assembly" => {
                let text = rewrite_refs(code, &names, |i| format!("${}", i));
                let constraints = vec!["r"; inputs.len()].join(",");
                log::trace!("inline asm with {} operand(s)", inputs.len());
                self.ir.inline_asm(&text, &constraints, inputs, volatile);
                Ok(self.ir.const_i32(0))
            }
            _ => match self.config.compiler_for(lang).map(str::to_string) {
                Some(compiler) => self.build_foreign(lang, &compiler, code, &names, inputs, span),
                None => Err(Diagnostic::error(
                    format!("Unsupported inline language: {}", lang),
                    span,
                )),
            },
        }
    }

    /// Current values of the referenced variables.
    fn inline_inputs(&mut self, names: &[String], span: Span) -> GenResult<Vec<Value>> {
        let mut inputs = Vec::with_capacity(names.len());
        for name in names {
            let slot = self.lookup(name, span)?;
            let by_pointer = slot
                .array
                .as_ref()
                .map_or(true, |info| info.storage != ArrayStorage::Stack);
            if slot.struct_name().is_some() || !by_pointer {
                return Err(Diagnostic::error(
                    format!("Variable cannot be passed to inline code: {}", name),
                    span,
                ));
            }
            inputs.push(self.ir.load(slot.ty.clone(), slot.ptr.clone()));
        }
        Ok(inputs)
    }

    fn build_foreign(
        &mut self,
        lang: &str,
        compiler: &str,
        code: &str,
        names: &[String],
        inputs: Vec<Value>,
        span: Span,
    ) -> GenResult<Value> {
        let symbol = self.fresh_label("__aero_inline");
        let ret = infer_return(code);
        let param_tys: Vec<Type> = inputs.iter().map(|v| v.ty.clone()).collect();
        let body = rewrite_refs(code, names, |i| format!("arg{}", i));
        let source = render_c_source(lang, &symbol, &param_tys, ret, &body);

        log::debug!("compiling inline {} block @{} with {}", lang, symbol, compiler);
        let ir = compile_to_ir(compiler, lang, &source, span)?;
        self.ir.module.foreign.push(ForeignUnit {
            lang: lang.to_string(),
            symbol: symbol.clone(),
            ir,
        });

        let params = param_tys
            .into_iter()
            .enumerate()
            .map(|(i, ty)| Param::new(format!("arg{}", i), ty))
            .collect();
        self.ir.declare_function(&symbol, params, ret.ir_type(), false);
        let result = self.ir.call(&symbol, inputs);
        Ok(match ret {
            CReturn::Void => self.ir.const_i32(0),
            CReturn::Int | CReturn::Char | CReturn::Bool => {
                self.ir.int_cast(result, Type::I32, ret != CReturn::Bool)
            }
            CReturn::Float | CReturn::Double | CReturn::Str => result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referenced_vars_dedup_in_order() {
        let names = referenced_vars("mov $b, $a\nadd $a, $b\nret $ 5");
        assert_eq!(names, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_rewrite_asm_operands() {
        let names = referenced_vars("movl $x, %eax; addl $y, %eax; addl $x, %eax");
        let text = rewrite_refs("movl $x, %eax; addl $y, %eax; addl $x, %eax", &names, |i| {
            format!("${}", i)
        });
        assert_eq!(text, "movl $0, %eax; addl $1, %eax; addl $0, %eax");
    }

    #[test]
    fn test_unreferenced_dollar_kept() {
        let names = vec!["n".to_string()];
        assert_eq!(rewrite_refs("$m + $n + $", &names, |i| format!("arg{}", i)), "$m + arg0 + $");
    }

    #[test]
    fn test_infer_return() {
        assert_eq!(infer_return("int x = 1;"), CReturn::Void);
        assert_eq!(infer_return("return $a + $b;"), CReturn::Int);
        assert_eq!(infer_return("return 2.5;"), CReturn::Double);
        assert_eq!(infer_return("return 2.5f;"), CReturn::Float);
        assert_eq!(infer_return("return 'c';"), CReturn::Char);
        assert_eq!(infer_return("return \"hi\";"), CReturn::Str);
        assert_eq!(infer_return("return true;"), CReturn::Bool);
        assert_eq!(infer_return("int returned = 3; return;"), CReturn::Void);
    }

    #[test]
    fn test_render_c_source() {
        let src = render_c_source("c", "f__1", &[Type::I32, Type::F64], CReturn::Int, "return arg0;");
        assert!(src.contains("int32_t f__1(int32_t arg0, double arg1) {\nreturn arg0;\n}"));
        assert!(!src.contains("extern \"C\""));
        let src = render_c_source("cxx", "g__2", &[], CReturn::Void, "puts(\"x\");");
        assert!(src.contains("extern \"C\" {"));
        assert!(src.trim_end().ends_with("}\n}"));
    }
}
