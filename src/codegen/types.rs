//! Source type names → IR types, numeric promotion, and the coercion
//! matrix applied at assignment, return, argument and operator boundaries.

use crate::ast::{ArrayDim, Expr, Literal, TypeName};
use crate::diagnostic::Diagnostic;
use crate::ir::{FloatPredicate, IntPredicate, RuntimeFn, Type, Value};
use crate::span::Span;

use super::array::{ArrayInfo, ArrayStorage};
use super::{CodeGen, GenResult};

/// Arrays deeper than this are rejected.
pub const MAX_ARRAY_DIMS: usize = 2;

/// A resolved declaration type.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredType {
    /// Slot type.
    pub ty: Type,
    pub array: Option<ArrayInfo>,
    /// Runtime element count of a dynamically sized heap array.
    pub len: Option<Value>,
}

enum Dim {
    Const(u64),
    Dynamic(Value),
    Unsized,
}

/// Where a coercion happens; selects the error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion<'a> {
    Variable(&'a str),
    Assignment,
    CompoundAssignment,
    Argument(usize, &'a str),
    Return,
    ArrayElement,
    Operand,
}

impl Coercion<'_> {
    pub(crate) fn mismatch(&self) -> String {
        match self {
            Coercion::Variable(name) => format!("Type mismatch for variable: {}", name),
            Coercion::Assignment => "Type mismatch in variable assignment".to_string(),
            Coercion::CompoundAssignment => "Type mismatch in compound assignment".to_string(),
            Coercion::Argument(i, f) => format!("Type mismatch for argument {} in function: {}", i, f),
            Coercion::Return => "Unsupported type conversion in return statement".to_string(),
            Coercion::ArrayElement => "Type mismatch in array assignment".to_string(),
            Coercion::Operand => "Type mismatch in binary operation".to_string(),
        }
    }
}

/// Scalar IR type for a source type name.
pub fn scalar_type(name: &str) -> Option<Type> {
    match name {
        "int" => Some(Type::I32),
        "long" => Some(Type::I64),
        "short" => Some(Type::I16),
        "float" => Some(Type::F32),
        "double" => Some(Type::F64),
        "char" => Some(Type::I8),
        "bool" => Some(Type::I1),
        "string" => Some(Type::PTR),
        "void" => Some(Type::VOID),
        _ if name.ends_with('*') => Some(Type::PTR),
        _ => None,
    }
}

/// Source-level name of an IR value type.
pub fn type_name(ty: &Type) -> &'static str {
    match ty {
        Type::Int(32) => "int",
        Type::Int(64) => "long",
        Type::Int(16) => "short",
        Type::Int(8) => "char",
        Type::Int(1) => "bool",
        Type::Float => "float",
        Type::Double => "double",
        Type::Ptr => "string",
        Type::Void => "void",
        _ => "unknown",
    }
}

/// The value-inspection rule shared by literals, `auto` and array-literal
/// element inference: a float with no fractional part is an `int`.
pub fn literal_is_integral(n: f64) -> bool {
    n.is_finite() && n == n.floor() && n.abs() <= f64::from(i32::MAX)
}

/// Result type of `int op int` / `float op double` etc.
pub fn promoted(lhs: &Type, rhs: &Type) -> Option<Type> {
    if lhs.is_double() || rhs.is_double() {
        if lhs.is_numeric() && rhs.is_numeric() {
            return Some(Type::F64);
        }
        return None;
    }
    if lhs.is_float() || rhs.is_float() {
        if lhs.is_numeric() && rhs.is_numeric() {
            return Some(Type::F32);
        }
        return None;
    }
    match (lhs.int_width(), rhs.int_width()) {
        (Some(a), Some(b)) => Some(Type::Int(a.max(b).max(32))),
        _ => None,
    }
}

impl<'b> CodeGen<'b> {
    // ── Resolution ────────────────────────────────────────────────

    /// Resolve a non-array type name, including custom aggregates.
    pub(crate) fn resolve_scalar(&self, name: &str, span: Span) -> GenResult<Type> {
        if let Some(ty) = scalar_type(name) {
            return Ok(ty);
        }
        if let Some(ct) = self.ir.custom_type(name) {
            return Ok(ct.ty());
        }
        Err(Diagnostic::error(format!("Unknown type: {}", name), span))
    }

    /// Resolve a declared type. Constant dims give a nested `[N x T]`
    /// stack array; an unsized or dynamic dim gives a 1-D heap array,
    /// whose dynamic length (if any) is returned alongside.
    pub(crate) fn resolve_declared(
        &mut self,
        tn: &TypeName,
        span: Span,
    ) -> GenResult<DeclaredType> {
        let base = self.resolve_scalar(&tn.name, span)?;
        if tn.dims.is_empty() {
            return Ok(DeclaredType {
                ty: base,
                array: None,
                len: None,
            });
        }
        if tn.dims.len() > MAX_ARRAY_DIMS {
            return Err(Diagnostic::error(
                format!(
                    "Too many array dimensions ({}), at most {} are supported",
                    tn.dims.len(),
                    MAX_ARRAY_DIMS
                ),
                span,
            ));
        }
        if base.is_void() {
            return Err(Diagnostic::error("Array of void is not allowed", span));
        }
        if base.is_struct() {
            return Err(Diagnostic::error(
                format!("Arrays of struct type are not supported: {}", tn.name),
                span,
            ));
        }
        let mut fixed = Vec::with_capacity(tn.dims.len());
        let mut len = None;
        let mut is_heap = false;
        for dim in &tn.dims {
            match self.array_dim(dim)? {
                Dim::Const(n) => {
                    if n == 0 || n > self.config.runtime.max_array_len {
                        return Err(Diagnostic::error(format!("Invalid array size: {}", n), span));
                    }
                    fixed.push(n);
                }
                Dim::Dynamic(v) => {
                    len = Some(v);
                    is_heap = true;
                }
                Dim::Unsized => is_heap = true,
            }
        }
        if is_heap {
            if tn.dims.len() > 1 {
                return Err(Diagnostic::error(
                    "Multi-dimensional arrays need constant sizes",
                    span,
                ));
            }
            return Ok(DeclaredType {
                ty: Type::PTR,
                array: Some(ArrayInfo::heap(base)),
                len,
            });
        }
        let ty = fixed
            .iter()
            .rev()
            .fold(base.clone(), |acc, &n| Type::array(acc, n));
        Ok(DeclaredType {
            ty,
            array: Some(ArrayInfo::fixed(base, fixed)),
            len: None,
        })
    }

    fn array_dim(&mut self, dim: &ArrayDim) -> GenResult<Dim> {
        let ArrayDim::Sized(expr) = dim else {
            return Ok(Dim::Unsized);
        };
        if let Expr::Literal(Literal::Number(n)) = &expr.node {
            if *n >= 0.0 && literal_is_integral(*n) {
                return Ok(Dim::Const(*n as u64));
            }
        }
        let v = self.build_expr(expr)?;
        if !v.ty.is_int() {
            return Err(Diagnostic::error("Array size must be an integer", expr.span));
        }
        match v.as_const_int() {
            Some(n) if n < 0 => Err(Diagnostic::error(
                format!("Invalid array size: {}", n),
                expr.span,
            )),
            Some(n) => Ok(Dim::Const(n as u64)),
            None => Ok(Dim::Dynamic(v)),
        }
    }

    /// Shape of a function parameter of array type: always passed as a
    /// pointer.
    pub(crate) fn param_array(&self, tn: &TypeName, span: Span) -> GenResult<Option<ArrayInfo>> {
        if tn.dims.is_empty() {
            return Ok(None);
        }
        if tn.dims.len() > MAX_ARRAY_DIMS {
            return Err(Diagnostic::error("Too many array dimensions", span));
        }
        let base = self.resolve_scalar(&tn.name, span)?;
        let info = if tn.dims.len() == 2 {
            ArrayInfo {
                elem: base,
                dims: vec![None, None],
                storage: ArrayStorage::Rows,
            }
        } else {
            ArrayInfo::param(base)
        };
        Ok(Some(info))
    }

    // ── Promotion ─────────────────────────────────────────────────

    /// Bring two numeric operands to their promoted common type.
    pub(crate) fn promote_pair(
        &mut self,
        lhs: Value,
        rhs: Value,
        span: Span,
    ) -> GenResult<(Value, Value)> {
        let Some(target) = promoted(&lhs.ty, &rhs.ty) else {
            return Err(Diagnostic::error(
                format!(
                    "Incompatible operand types {} and {}",
                    type_name(&lhs.ty),
                    type_name(&rhs.ty)
                ),
                span,
            ));
        };
        let l = self.coerce(lhs, &target, Coercion::Operand, span)?;
        let r = self.coerce(rhs, &target, Coercion::Operand, span)?;
        Ok((l, r))
    }

    // ── Coercion matrix ───────────────────────────────────────────

    /// Convert `value` to `target` following the implicit conversion rules.
    pub(crate) fn coerce(
        &mut self,
        value: Value,
        target: &Type,
        ctx: Coercion<'_>,
        span: Span,
    ) -> GenResult<Value> {
        let from = value.ty.clone();
        if &from == target {
            return Ok(value);
        }
        match (&from, target) {
            // bool ← int / float / pointer
            (Type::Int(_) | Type::Ptr, Type::Int(1)) => {
                let zero = self.ir.zero(&from);
                Ok(self.ir.icmp(IntPredicate::Ne, value, zero))
            }
            (Type::Float | Type::Double, Type::Int(1)) => {
                let zero = self.ir.zero(&from);
                Ok(self.ir.fcmp(FloatPredicate::One, value, zero))
            }
            (Type::Int(_), Type::Int(_)) => Ok(self.ir.int_cast(value, target.clone(), true)),
            (Type::Int(_), Type::Float | Type::Double) => {
                Ok(self.ir.si_to_fp(value, target.clone()))
            }
            (Type::Float | Type::Double, Type::Int(_)) => {
                Ok(self.ir.fp_to_si(value, target.clone()))
            }
            (Type::Float | Type::Double, Type::Float | Type::Double) => {
                Ok(self.ir.fp_cast(value, target.clone()))
            }
            // String bridge
            (Type::Ptr, Type::Int(_)) => {
                let n = self.ir.call_runtime(RuntimeFn::Atoi, vec![value]);
                Ok(self.ir.int_cast(n, target.clone(), true))
            }
            (Type::Ptr, Type::Float | Type::Double) => {
                let null = self.ir.const_null();
                let d = self.ir.call_runtime(RuntimeFn::Strtod, vec![value, null]);
                Ok(self.ir.fp_cast(d, target.clone()))
            }
            (Type::Int(_) | Type::Float | Type::Double, Type::Ptr) => Ok(self.to_text(value)),
            _ => Err(Diagnostic::error(ctx.mismatch(), span).with_note(format!(
                "cannot convert {} to {}",
                type_name(&from),
                type_name(target)
            ))),
        }
    }

    /// Normalise any scalar to `i1` (`!= 0`, `!= 0.0`, `!= null`).
    pub(crate) fn to_bool(&mut self, value: Value, span: Span) -> GenResult<Value> {
        match &value.ty {
            Type::Int(1) => Ok(value),
            Type::Int(_) | Type::Ptr => {
                let zero = self.ir.zero(&value.ty);
                Ok(self.ir.icmp(IntPredicate::Ne, value, zero))
            }
            Type::Float | Type::Double => {
                let zero = self.ir.zero(&value.ty);
                Ok(self.ir.fcmp(FloatPredicate::One, value, zero))
            }
            _ => Err(Diagnostic::error("Unsupported type for boolean conversion", span)),
        }
    }
}
