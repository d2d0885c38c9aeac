//! Binary operators.
//!
//! Both operands are always evaluated, left first. `+` doubles as string
//! concatenation whenever a pointer is involved; comparisons between
//! strings go through `strcmp`. `&&` and `||` here are eager: only the
//! guard path in `cond` short-circuits.

use crate::ast::{BinOp, Expr};
use crate::diagnostic::Diagnostic;
use crate::ir::{BinaryOp, FloatPredicate, IntPredicate, RuntimeFn, Type, Value};
use crate::span::{Span, Spanned};

use super::types::type_name;
use super::{CodeGen, GenResult};

impl<'b> CodeGen<'b> {
    pub(crate) fn build_binop(
        &mut self,
        op: BinOp,
        lhs: &Spanned<Expr>,
        rhs: &Spanned<Expr>,
        span: Span,
    ) -> GenResult<Value> {
        let l = self.build_expr(lhs)?;
        let r = self.build_expr(rhs)?;
        self.binary_values(op, l, r, span)
    }

    /// Apply `op` to two already lowered operands.
    pub(crate) fn binary_values(
        &mut self,
        op: BinOp,
        l: Value,
        r: Value,
        span: Span,
    ) -> GenResult<Value> {
        for v in [&l, &r] {
            if v.ty.is_void() || v.ty.is_struct() || v.ty.is_array() {
                return Err(Diagnostic::error(
                    format!("Invalid operand for '{}'", op.as_str()),
                    span,
                )
                .with_note(format!("found {}", type_name(&v.ty))));
            }
        }
        match op {
            BinOp::And | BinOp::Or => {
                let lb = self.to_bool(l, span)?;
                let rb = self.to_bool(r, span)?;
                let ir_op = if op == BinOp::And { BinaryOp::And } else { BinaryOp::Or };
                Ok(self.ir.binary(ir_op, lb, rb))
            }
            BinOp::Add if l.ty.is_char() && r.ty.is_char() => Ok(self.char_pair(l, r)),
            BinOp::Add if l.ty.is_ptr() || r.ty.is_ptr() => Ok(self.string_add(l, r)),
            _ if op.is_comparison() => self.compare(op, l, r, span),
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
                let (l, r) = self.promote_pair(l, r, span)?;
                Ok(match op {
                    BinOp::Add => self.ir.add(l, r),
                    BinOp::Sub => self.ir.sub(l, r),
                    BinOp::Mul => self.ir.mul(l, r),
                    _ => self.ir.div(l, r),
                })
            }
            BinOp::Mod => {
                if l.ty.is_fp() || r.ty.is_fp() {
                    return Err(Diagnostic::error(
                        "Modulo operator not supported on floating-point numbers",
                        span,
                    ));
                }
                let (l, r) = self.promote_pair(l, r, span)?;
                Ok(self.ir.rem(l, r))
            }
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr => {
                self.bitwise(op, l, r, span)
            }
            _ => Err(Diagnostic::error(
                format!("Unsupported binary operator: {}", op.as_str()),
                span,
            )),
        }
    }

    fn compare(&mut self, op: BinOp, l: Value, r: Value, span: Span) -> GenResult<Value> {
        if l.ty.is_ptr() || r.ty.is_ptr() {
            if !(l.ty.is_ptr() && r.ty.is_ptr()) {
                return Err(Diagnostic::error(
                    format!(
                        "Cannot compare {} with {}",
                        type_name(&l.ty),
                        type_name(&r.ty)
                    ),
                    span,
                ));
            }
            let order = self.ir.call_runtime(RuntimeFn::Strcmp, vec![l, r]);
            let zero = self.ir.const_i32(0);
            return Ok(self.ir.icmp(int_predicate(op), order, zero));
        }
        let (l, r) = self.promote_pair(l, r, span)?;
        if l.ty.is_fp() {
            Ok(self.ir.fcmp(float_predicate(op), l, r))
        } else {
            Ok(self.ir.icmp(int_predicate(op), l, r))
        }
    }

    fn bitwise(&mut self, op: BinOp, l: Value, r: Value, span: Span) -> GenResult<Value> {
        let name = match op {
            BinOp::BitAnd => "Bitwise AND",
            BinOp::BitOr => "Bitwise OR",
            BinOp::BitXor => "Bitwise XOR",
            BinOp::Shl => "Shift left",
            _ => "Shift right",
        };
        if l.ty.is_fp() || r.ty.is_fp() {
            return Err(Diagnostic::error(
                format!("{} operator not supported on floating-point numbers", name),
                span,
            ));
        }
        if l.ty.is_ptr() || r.ty.is_ptr() {
            return Err(Diagnostic::error(
                format!("{} operator not supported on pointer types", name),
                span,
            ));
        }
        let (l, r) = self.promote_pair(l, r, span)?;
        let ir_op = match op {
            BinOp::BitAnd => BinaryOp::And,
            BinOp::BitOr => BinaryOp::Or,
            BinOp::BitXor => BinaryOp::Xor,
            BinOp::Shl => BinaryOp::Shl,
            _ => BinaryOp::AShr,
        };
        Ok(self.ir.binary(ir_op, l, r))
    }

    // ── Strings ───────────────────────────────────────────────────

    fn string_add(&mut self, l: Value, r: Value) -> Value {
        if l.ty.is_ptr() && r.ty.is_char() {
            return self.append_char(l, r);
        }
        let l = self.to_text(l);
        let r = self.to_text(r);
        self.concat(l, r)
    }

    /// `strlen` both, allocate the sum plus one, `strcpy` then `strcat`.
    pub(crate) fn concat(&mut self, a: Value, b: Value) -> Value {
        let la = self.ir.strlen(a.clone());
        let lb = self.ir.strlen(b.clone());
        let total = self.ir.add(la, lb);
        let one = self.ir.const_i64(1);
        let size = self.ir.add(total, one);
        let buf = self.ir.tracked_malloc(size, 1);
        self.ir.call_runtime(RuntimeFn::Strcpy, vec![buf.clone(), a]);
        self.ir.call_runtime(RuntimeFn::Strcat, vec![buf.clone(), b]);
        buf
    }

    fn append_char(&mut self, s: Value, c: Value) -> Value {
        let len = self.ir.strlen(s.clone());
        let two = self.ir.const_i64(2);
        let size = self.ir.add(len.clone(), two);
        let buf = self.ir.tracked_malloc(size, 1);
        self.ir.call_runtime(RuntimeFn::Strcpy, vec![buf.clone(), s]);
        let at = self.ir.gep(Type::I8, buf.clone(), vec![len.clone()]);
        self.ir.store(c, at);
        let one = self.ir.const_i64(1);
        let end = self.ir.add(len, one);
        let nul_at = self.ir.gep(Type::I8, buf.clone(), vec![end]);
        let nul = self.ir.const_i8(0);
        self.ir.store(nul, nul_at);
        buf
    }

    /// `'a' + 'b'` is the two-character string "ab".
    fn char_pair(&mut self, a: Value, b: Value) -> Value {
        let size = self.ir.const_i64(3);
        let buf = self.ir.tracked_malloc(size, 1);
        for (i, v) in [a, b, self.ir.const_i8(0)].into_iter().enumerate() {
            let idx = self.ir.const_i32(i as i64);
            let at = self.ir.gep(Type::I8, buf.clone(), vec![idx]);
            self.ir.store(v, at);
        }
        buf
    }
}

fn int_predicate(op: BinOp) -> IntPredicate {
    match op {
        BinOp::Eq => IntPredicate::Eq,
        BinOp::Neq => IntPredicate::Ne,
        BinOp::Lt => IntPredicate::Slt,
        BinOp::Lte => IntPredicate::Sle,
        BinOp::Gt => IntPredicate::Sgt,
        _ => IntPredicate::Sge,
    }
}

fn float_predicate(op: BinOp) -> FloatPredicate {
    match op {
        BinOp::Eq => FloatPredicate::Oeq,
        BinOp::Neq => FloatPredicate::One,
        BinOp::Lt => FloatPredicate::Olt,
        BinOp::Lte => FloatPredicate::Ole,
        BinOp::Gt => FloatPredicate::Ogt,
        _ => FloatPredicate::Oge,
    }
}
