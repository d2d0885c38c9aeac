//! Explicit casts and value-to-text formatting.

use crate::ast::Expr;
use crate::diagnostic::Diagnostic;
use crate::ir::{RuntimeFn, Type, Value};
use crate::span::{Span, Spanned};

use super::types::{scalar_type, type_name, Coercion};
use super::{CodeGen, GenResult};

/// Scratch buffer size for numbers formatted with `sprintf`.
pub const NUMBER_BUFFER: i64 = 32;

/// Target names accepted by `(T) expr`.
const CAST_TARGETS: [&str; 8] = [
    "int", "long", "short", "float", "double", "char", "bool", "string",
];

impl<'b> CodeGen<'b> {
    pub(crate) fn build_cast(
        &mut self,
        target: &Spanned<String>,
        expr: &Spanned<Expr>,
        span: Span,
    ) -> GenResult<Value> {
        let to = match scalar_type(&target.node) {
            Some(ty) if CAST_TARGETS.contains(&target.node.as_str()) => ty,
            _ => {
                return Err(Diagnostic::error(
                    format!("Unsupported target type: {}", target.node),
                    target.span,
                ))
            }
        };
        let value = self.build_expr(expr)?;
        if value.ty == to {
            self.warn("No cast needed", span);
            return Ok(value);
        }
        let from = value.ty.clone();
        match (&from, &to) {
            (_, Type::Int(1)) => self.to_bool(value, span),
            (Type::Int(8), Type::Ptr) => Ok(self.char_to_string(value)),
            (Type::Int(_) | Type::Float | Type::Double, Type::Ptr) => Ok(self.to_text(value)),
            // first character of the string
            (Type::Ptr, Type::Int(_)) => {
                let c = self.ir.load(Type::I8, value);
                Ok(self.ir.int_cast(c, to, true))
            }
            (Type::Ptr, Type::Float | Type::Double) => {
                let null = self.ir.const_null();
                let d = self.ir.call_runtime(RuntimeFn::Strtod, vec![value, null]);
                Ok(self.ir.fp_cast(d, to))
            }
            (Type::Int(_) | Type::Float | Type::Double, Type::Int(_) | Type::Float | Type::Double) => {
                self.coerce(value, &to, Coercion::Operand, span)
            }
            _ => Err(Diagnostic::error("Unsupported cast", span).with_note(format!(
                "from {} to {}",
                type_name(&from),
                type_name(&to)
            ))),
        }
    }

    /// String form of a scalar: `true`/`false` for bools, a one-character
    /// string for chars, `%d` for integers, `%.6f` for floats. Strings are
    /// returned unchanged.
    pub(crate) fn to_text(&mut self, value: Value) -> Value {
        match value.ty.clone() {
            Type::Int(1) => {
                let t = self.ir.const_string("true");
                let f = self.ir.const_string("false");
                self.ir.select(value, t, f)
            }
            Type::Int(8) => self.char_to_string(value),
            Type::Int(64) => self.sprintf_number("%ld", value),
            Type::Int(_) => {
                let v = self.ir.int_cast(value, Type::I32, true);
                self.sprintf_number("%d", v)
            }
            Type::Float | Type::Double => {
                let v = self.ir.fp_cast(value, Type::F64);
                self.sprintf_number("%.6f", v)
            }
            _ => value,
        }
    }

    /// `sprintf` into a fresh tracked buffer.
    pub(crate) fn sprintf_number(&mut self, fmt: &str, value: Value) -> Value {
        let size = self.ir.const_i64(NUMBER_BUFFER);
        let buf = self.ir.tracked_malloc(size, 1);
        let fmt = self.ir.const_string(fmt);
        self.ir
            .call_runtime(RuntimeFn::Sprintf, vec![buf.clone(), fmt, value]);
        buf
    }

    /// Two-byte buffer holding `c` and a terminator.
    pub(crate) fn char_to_string(&mut self, c: Value) -> Value {
        let size = self.ir.const_i64(2);
        let buf = self.ir.tracked_malloc(size, 1);
        self.ir.store(c, buf.clone());
        let one = self.ir.const_i32(1);
        let end = self.ir.gep(Type::I8, buf.clone(), vec![one]);
        let nul = self.ir.const_i8(0);
        self.ir.store(nul, end);
        buf
    }
}
