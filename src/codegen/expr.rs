//! Expression dispatch, literals, identifiers and unary operators.

use crate::ast::{Expr, Literal, Place, StepOp, UnaryOp};
use crate::diagnostic::Diagnostic;
use crate::ir::{Type, Value};
use crate::span::{Span, Spanned};

use super::array::{Access, PlaceRef};
use super::scope::Slot;
use super::types::{literal_is_integral, type_name};
use super::{CodeGen, GenResult};

impl<'b> CodeGen<'b> {
    /// Lower one expression to a value.
    pub(crate) fn build_expr(&mut self, expr: &Spanned<Expr>) -> GenResult<Value> {
        match &expr.node {
            Expr::Literal(lit) => self.build_literal(lit, expr.span),
            Expr::Var(name) => self.build_var(name, expr.span),
            Expr::Paren(inner) => self.build_expr(inner),
            Expr::BinOp { op, lhs, rhs } => self.build_binop(*op, lhs, rhs, expr.span),
            Expr::Unary { op, operand } => self.build_unary(*op, operand, expr.span),
            Expr::Step { op, place } => self.build_step(*op, place, expr.span),
            Expr::Cast { target, expr: inner } => self.build_cast(target, inner, expr.span),
            Expr::Call { name, args } => self.build_call(name, args, expr.span),
            Expr::MethodCall {
                receiver,
                method,
                args,
            } => self.build_method_call(receiver, method, args, expr.span),
            Expr::FieldAccess { expr: obj, field } => self.build_field_access(obj, field),
            Expr::ArrayInit(elems) => Ok(self.build_array_literal(elems, None, expr.span)?.0),
            Expr::Index {
                expr: base,
                indices,
            } => self.build_index(base, indices, expr.span),
        }
    }

    // ── Literals ──────────────────────────────────────────────────

    /// Integral numbers become `i32`, everything else `double`. A `char`
    /// is one byte, so only code points up to U+00FF are accepted.
    pub(crate) fn build_literal(&mut self, lit: &Literal, span: Span) -> GenResult<Value> {
        Ok(match lit {
            Literal::Number(n) if literal_is_integral(*n) => self.ir.const_i32(*n as i64),
            Literal::Number(n) => self.ir.const_f64(*n),
            Literal::Str(s) => self.ir.const_string(s),
            Literal::Char(c) => match u8::try_from(u32::from(*c)) {
                Ok(byte) => self.ir.const_char(byte),
                Err(_) => {
                    return Err(Diagnostic::error(
                        format!("Character literal out of range: '{}' (U+{:04X})", c, u32::from(*c)),
                        span,
                    )
                    .with_help("a char holds a single byte"))
                }
            },
            Literal::Bool(b) => self.ir.const_bool(*b),
        })
    }

    // ── Identifiers ───────────────────────────────────────────────

    /// Slot bound to `name`, or an "Undefined variable" error.
    pub(crate) fn lookup(&self, name: &str, span: Span) -> GenResult<Slot> {
        self.scopes
            .resolve(name)
            .cloned()
            .ok_or_else(|| Diagnostic::error(format!("Undefined variable: {}", name), span))
    }

    fn build_var(&mut self, name: &str, span: Span) -> GenResult<Value> {
        let slot = self.lookup(name, span)?;
        if let Some(ty_name) = slot.struct_name() {
            return Err(Diagnostic::error(
                format!("Struct value cannot be used as an expression: {}", name),
                span,
            )
            .with_note(format!("'{}' has type {}", name, ty_name)));
        }
        if slot.ty.is_array() {
            // decays to the address of the first element
            let zero = self.ir.const_i32(0);
            let mut idx = vec![zero.clone()];
            idx.extend(std::iter::repeat(zero).take(slot.ty.array_rank()));
            return Ok(self.ir.gep(slot.ty.clone(), slot.ptr, idx));
        }
        Ok(self.ir.load(slot.ty, slot.ptr))
    }

    // ── Places ────────────────────────────────────────────────────

    /// Address of an assignable place.
    pub(crate) fn place_ref(&mut self, place: &Spanned<Place>, access: Access) -> GenResult<PlaceRef> {
        match &place.node {
            Place::Var(name) => {
                let slot = self.lookup(name, place.span)?;
                if slot.struct_name().is_some() {
                    return Err(Diagnostic::error(
                        format!("Cannot assign to struct value: {}", name),
                        place.span,
                    ));
                }
                if slot.ty.is_array() {
                    return Err(Diagnostic::error(
                        format!("Cannot assign to array: {}", name),
                        place.span,
                    ));
                }
                Ok(PlaceRef::new(slot.ptr, slot.ty))
            }
            Place::Field(obj, field) => {
                let (addr, ty_name) = self.place_object(obj)?;
                self.field_ref(&ty_name, addr, field)
            }
            Place::Index(base, indices) => match &base.node {
                Place::Var(name) => {
                    let slot = self.lookup(name, base.span)?;
                    self.index_slot(name, &slot, indices, access, place.span)
                }
                _ => {
                    let target = self.place_ref(base, access)?;
                    if !target.ty.is_ptr() {
                        return Err(Diagnostic::error(
                            format!("Cannot index a value of type {}", type_name(&target.ty)),
                            base.span,
                        ));
                    }
                    let s = self.ir.load(Type::PTR, target.ptr);
                    self.index_string(s, indices, access, place.span)
                }
            },
        }
    }

    // ── Unary operators ───────────────────────────────────────────

    fn build_unary(
        &mut self,
        op: UnaryOp,
        operand: &Spanned<Expr>,
        span: Span,
    ) -> GenResult<Value> {
        let v = self.build_expr(operand)?;
        match op {
            UnaryOp::Neg | UnaryOp::Plus if !v.ty.is_numeric() => Err(Diagnostic::error(
                format!("Unary {} requires a numeric operand", op.as_str()),
                span,
            )
            .with_note(format!("found {}", type_name(&v.ty)))),
            UnaryOp::Neg => Ok(self.ir.neg(v)),
            UnaryOp::Plus => Ok(v),
            UnaryOp::Not => {
                let b = self.to_bool(v, span)?;
                Ok(self.ir.not(b))
            }
        }
    }

    /// `++x` / `--x` / `++a[i]`: update in place and yield the new value.
    fn build_step(&mut self, op: StepOp, place: &Spanned<Place>, span: Span) -> GenResult<Value> {
        let target = self.place_ref(place, Access::Compound)?;
        if !target.ty.is_numeric() || target.ty.is_bool() {
            return Err(Diagnostic::error(
                "Increment and decrement require a numeric variable",
                span,
            ));
        }
        let current = self.ir.load(target.ty.clone(), target.ptr.clone());
        let one = match &target.ty {
            Type::Float => self.ir.const_f32(1.0),
            Type::Double => self.ir.const_f64(1.0),
            ty => self.ir.const_int(ty.clone(), 1),
        };
        let next = match op {
            StepOp::Inc => self.ir.add(current, one),
            StepOp::Dec => self.ir.sub(current, one),
        };
        self.ir.store(next.clone(), target.ptr);
        Ok(next)
    }
}
