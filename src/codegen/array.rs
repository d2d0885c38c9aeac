//! Array and string element access.
//!
//! Two representations coexist:
//! - fixed stack arrays (`[N x T]`, up to two dimensions), whose constant
//!   indices are checked at translation time and dynamic indices at run
//!   time against the declared size;
//! - heap arrays, held as a pointer in a stack slot. Their bound is the
//!   size recorded by the allocation tracker. Strings are byte buffers
//!   bounded by `strlen`.
//!
//! A failed runtime check prints a message and exits with the configured
//! fault status (139, like a segmentation fault).

use crate::ast::Expr;
use crate::diagnostic::Diagnostic;
use crate::ir::{AllocStrategy, IntPredicate, RuntimeFn, Type, Value};
use crate::span::{Span, Spanned};

use super::scope::Slot;
use super::types::{type_name, Coercion};
use super::{CodeGen, GenResult};

// ─── Array descriptors ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayStorage {
    /// `[N x T]` (or nested) stack aggregate; the slot is the array.
    Stack,
    /// Tracked heap buffer; the slot holds the pointer.
    Heap,
    /// 1-D array parameter: an element pointer plus a hidden length.
    Param,
    /// 2-D array parameter: a table of row pointers plus hidden row and
    /// column counts.
    Rows,
}

/// Shape of an array-typed slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayInfo {
    pub elem: Type,
    /// Constant size per dimension, `None` where only known at run time.
    pub dims: Vec<Option<u64>>,
    pub storage: ArrayStorage,
}

impl ArrayInfo {
    pub fn fixed(elem: Type, dims: Vec<u64>) -> Self {
        Self {
            elem,
            dims: dims.into_iter().map(Some).collect(),
            storage: ArrayStorage::Stack,
        }
    }

    pub fn heap(elem: Type) -> Self {
        Self {
            elem,
            dims: vec![None],
            storage: ArrayStorage::Heap,
        }
    }

    pub fn param(elem: Type) -> Self {
        Self {
            elem,
            dims: vec![None],
            storage: ArrayStorage::Param,
        }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Source spelling, e.g. `int[3][4]` or `double[]`.
    pub fn describe(&self) -> String {
        let mut out = type_name(&self.elem).to_string();
        for dim in &self.dims {
            match dim {
                Some(n) => out.push_str(&format!("[{}]", n)),
                None => out.push_str("[]"),
            }
        }
        out
    }
}

/// What an element address is needed for; selects the bounds message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Read,
    Assign,
    Compound,
}

impl Access {
    fn suffix(&self) -> &'static str {
        match self {
            Access::Read => "",
            Access::Assign => " in assignment",
            Access::Compound => " in compound assignment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    Array,
    String,
}

/// An addressable location produced by place resolution.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlaceRef {
    pub ptr: Value,
    pub ty: Type,
    /// A byte inside a string buffer (stores must be `char`).
    pub string_byte: bool,
}

impl PlaceRef {
    pub fn new(ptr: Value, ty: Type) -> Self {
        Self {
            ptr,
            ty,
            string_byte: false,
        }
    }
}

impl<'b> CodeGen<'b> {
    // ── Element addressing ────────────────────────────────────────

    /// Address of `name[indices...]`, bounds-checked per representation.
    pub(crate) fn index_slot(
        &mut self,
        name: &str,
        slot: &Slot,
        indices: &[Spanned<Expr>],
        access: Access,
        span: Span,
    ) -> GenResult<PlaceRef> {
        let Some(info) = &slot.array else {
            if slot.ty.is_ptr() {
                let s = self.ir.load(Type::PTR, slot.ptr.clone());
                return self.index_string(s, indices, access, span);
            }
            return Err(Diagnostic::error(
                format!("Variable is not an array: {}", name),
                span,
            ));
        };
        if indices.len() != info.rank() {
            return Err(Diagnostic::error(
                format!(
                    "Array '{}' has {} dimension(s) but {} index(es) were given",
                    name,
                    info.rank(),
                    indices.len()
                ),
                span,
            ));
        }
        match info.storage {
            ArrayStorage::Stack => {
                let mut gep = vec![self.ir.const_i32(0)];
                for (dim, idx_expr) in info.dims.iter().zip(indices) {
                    let idx = self.build_index_value(idx_expr)?;
                    let len = dim.unwrap_or(0);
                    self.check_fixed_index(&idx, len, access, idx_expr.span)?;
                    gep.push(idx);
                }
                let ptr = self.ir.gep(slot.ty.clone(), slot.ptr.clone(), gep);
                Ok(PlaceRef::new(ptr, info.elem.clone()))
            }
            ArrayStorage::Heap => {
                let base = self.ir.load(Type::PTR, slot.ptr.clone());
                let idx = self.build_index_value(&indices[0])?;
                self.reject_negative(&idx, indices[0].span)?;
                if self.ir.alloc == AllocStrategy::Tracked {
                    let count = self.heap_count(base.clone(), &info.elem);
                    self.emit_bounds_check(idx.clone(), count, Fault::Array);
                }
                let ptr = self.ir.gep(info.elem.clone(), base, vec![idx]);
                Ok(PlaceRef::new(ptr, info.elem.clone()))
            }
            ArrayStorage::Param => {
                let base = self.ir.load(Type::PTR, slot.ptr.clone());
                let idx = self.build_index_value(&indices[0])?;
                self.reject_negative(&idx, indices[0].span)?;
                if let Some(len) = slot.extents.first() {
                    self.emit_bounds_check(idx.clone(), len.clone(), Fault::Array);
                }
                let ptr = self.ir.gep(info.elem.clone(), base, vec![idx]);
                Ok(PlaceRef::new(ptr, info.elem.clone()))
            }
            ArrayStorage::Rows => {
                let table = self.ir.load(Type::PTR, slot.ptr.clone());
                let row_idx = self.build_index_value(&indices[0])?;
                self.reject_negative(&row_idx, indices[0].span)?;
                if let Some(rows) = slot.extents.first() {
                    self.emit_bounds_check(row_idx.clone(), rows.clone(), Fault::Array);
                }
                let col_idx = self.build_index_value(&indices[1])?;
                self.reject_negative(&col_idx, indices[1].span)?;
                if let Some(cols) = slot.extents.get(1) {
                    self.emit_bounds_check(col_idx.clone(), cols.clone(), Fault::Array);
                }
                let row_slot = self.ir.gep(Type::PTR, table, vec![row_idx]);
                let row = self.ir.load(Type::PTR, row_slot);
                let ptr = self.ir.gep(info.elem.clone(), row, vec![col_idx]);
                Ok(PlaceRef::new(ptr, info.elem.clone()))
            }
        }
    }

    /// Address of one byte of a string, checked against `strlen`.
    pub(crate) fn index_string(
        &mut self,
        s: Value,
        indices: &[Spanned<Expr>],
        access: Access,
        span: Span,
    ) -> GenResult<PlaceRef> {
        if indices.len() != 1 {
            return Err(Diagnostic::error(
                format!("Strings take exactly one index{}", access.suffix()),
                span,
            ));
        }
        let idx = self.build_index_value(&indices[0])?;
        self.reject_negative(&idx, indices[0].span)?;
        let len = self.ir.strlen(s.clone());
        self.emit_bounds_check(idx.clone(), len, Fault::String);
        let ptr = self.ir.gep(Type::I8, s, vec![idx]);
        Ok(PlaceRef {
            ptr,
            ty: Type::I8,
            string_byte: true,
        })
    }

    /// Read `base[indices...]` where `base` is any expression.
    pub(crate) fn build_index(
        &mut self,
        base: &Spanned<Expr>,
        indices: &[Spanned<Expr>],
        span: Span,
    ) -> GenResult<Value> {
        let place = match &base.node {
            Expr::Var(name) => {
                let slot = self.lookup(name, base.span)?;
                self.index_slot(name, &slot, indices, Access::Read, span)?
            }
            _ => {
                let value = self.build_expr(base)?;
                if !value.ty.is_ptr() {
                    return Err(Diagnostic::error(
                        format!("Cannot index a value of type {}", type_name(&value.ty)),
                        base.span,
                    ));
                }
                self.index_string(value, indices, Access::Read, span)?
            }
        };
        Ok(self.ir.load(place.ty, place.ptr))
    }

    fn build_index_value(&mut self, expr: &Spanned<Expr>) -> GenResult<Value> {
        let idx = self.build_expr(expr)?;
        if !idx.ty.is_int() {
            return Err(Diagnostic::error("Array index must be an integer", expr.span)
                .with_note(format!("found {}", type_name(&idx.ty))));
        }
        // i64 so a wide index cannot wrap into range before the check
        Ok(self.ir.int_cast(idx, Type::I64, true))
    }

    fn check_fixed_index(
        &mut self,
        idx: &Value,
        len: u64,
        access: Access,
        span: Span,
    ) -> GenResult<()> {
        match idx.as_const_int() {
            Some(i) if i < 0 || i as u64 >= len => Err(Diagnostic::error(
                format!(
                    "Array index {} out of bounds for array of size {}{}",
                    i,
                    len,
                    access.suffix()
                ),
                span,
            )),
            Some(_) => Ok(()),
            None => {
                let len = self.ir.const_i32(len as i64);
                self.emit_bounds_check(idx.clone(), len, Fault::Array);
                Ok(())
            }
        }
    }

    fn reject_negative(&self, idx: &Value, span: Span) -> GenResult<()> {
        match idx.as_const_int() {
            Some(i) if i < 0 => Err(Diagnostic::error(
                format!("Negative array index: {}", i),
                span,
            )),
            _ => Ok(()),
        }
    }

    /// Element count of a tracked heap buffer.
    fn heap_count(&mut self, base: Value, elem: &Type) -> Value {
        let bytes = self.ir.tracked_size(base);
        let elem_size = self.ir.const_i32(self.ir.size_of(elem).max(1) as i64);
        self.ir.div(bytes, elem_size)
    }

    /// `if idx >=u len { printf(msg); exit(code) }`, continuing in the
    /// valid-access block. Unsigned compare at `i64`, so negative indices
    /// fault too. Lengths are zero-extended; an unknown length (`-1`)
    /// therefore accepts every index.
    fn emit_bounds_check(&mut self, idx: Value, len: Value, fault: Fault) {
        let idx = self.ir.int_cast(idx, Type::I64, true);
        let len = self.ir.int_cast(len, Type::I64, false);
        let (err_label, ok_label, msg) = match fault {
            Fault::Array => (
                "array_bounds_error",
                "valid_array_access",
                "Segmentation fault: array index out of bounds\n",
            ),
            Fault::String => (
                "bounds_error",
                "valid_access",
                "Segmentation fault: string index out of bounds\n",
            ),
        };
        let out_of_range = self.ir.icmp(IntPredicate::Uge, idx, len);
        let err_bb = self.ir.append_block(err_label);
        let ok_bb = self.ir.append_block(ok_label);
        self.ir.cond_br(out_of_range, err_bb, ok_bb);

        self.ir.position_at_end(err_bb);
        self.ir.printf(msg, vec![]);
        let code = self.ir.const_i32(i64::from(self.config.runtime.fault_exit_code));
        self.ir.call_runtime(RuntimeFn::Exit, vec![code]);
        self.ir.unreachable();

        self.ir.position_at_end(ok_bb);
        log::trace!("emitted {} bounds check", err_label);
    }

    // ── Literals ──────────────────────────────────────────────────

    /// Store a (possibly nested) array literal into a fixed stack array.
    /// Elements past the end of a short literal are left untouched.
    pub(crate) fn init_fixed_array(
        &mut self,
        ptr: &Value,
        ty: &Type,
        elems: &[Spanned<Expr>],
        span: Span,
    ) -> GenResult<()> {
        let mut path = Vec::new();
        self.fill_fixed(ptr, ty, ty, elems, &mut path, span)
    }

    fn fill_fixed(
        &mut self,
        base_ptr: &Value,
        base_ty: &Type,
        ty: &Type,
        elems: &[Spanned<Expr>],
        path: &mut Vec<Value>,
        span: Span,
    ) -> GenResult<()> {
        let Some((elem_ty, len)) = ty.array_parts() else {
            return Err(Diagnostic::error("Array literal for a non-array type", span));
        };
        let elem_ty = elem_ty.clone();
        if elems.len() as u64 > len {
            return Err(Diagnostic::error(
                format!(
                    "Too many elements in array literal: {} for array of size {}",
                    elems.len(),
                    len
                ),
                span,
            ));
        }
        for (i, elem) in elems.iter().enumerate() {
            path.push(self.ir.const_i32(i as i64));
            if elem_ty.is_array() {
                let Expr::ArrayInit(inner) = &elem.node else {
                    return Err(Diagnostic::error("Expected nested array literal", elem.span));
                };
                self.fill_fixed(base_ptr, base_ty, &elem_ty, inner, path, elem.span)?;
            } else {
                let v = self.build_expr(elem)?;
                let v = self.coerce(v, &elem_ty, Coercion::ArrayElement, elem.span)?;
                let mut idx = vec![self.ir.const_i32(0)];
                idx.extend(path.iter().cloned());
                let dst = self.ir.gep(base_ty.clone(), base_ptr.clone(), idx);
                self.ir.store(v, dst);
            }
            path.pop();
        }
        Ok(())
    }

    /// A literal in expression position becomes a tracked heap buffer.
    /// The element type is `elem_hint` when known, otherwise that of the
    /// first element.
    pub(crate) fn build_array_literal(
        &mut self,
        elems: &[Spanned<Expr>],
        elem_hint: Option<&Type>,
        span: Span,
    ) -> GenResult<(Value, Type)> {
        let Some(first) = elems.first() else {
            return Err(Diagnostic::error("Array literal must not be empty", span));
        };
        if elems.len() as u64 > self.config.runtime.max_array_len {
            return Err(Diagnostic::error(
                format!("Array literal too large: {} elements", elems.len()),
                span,
            ));
        }
        if elems.iter().any(|e| matches!(e.node, Expr::ArrayInit(_))) {
            return Err(Diagnostic::error(
                "Nested array literals need a fixed-size array type",
                span,
            ));
        }
        let first_value = self.build_expr(first)?;
        let elem = match elem_hint {
            Some(ty) => ty.clone(),
            None => first_value.ty.clone(),
        };
        if elem.is_void() || elem.is_struct() {
            return Err(Diagnostic::error(
                format!("Invalid array element type: {}", type_name(&elem)),
                first.span,
            ));
        }
        let count = self.ir.const_i64(elems.len() as i64);
        let buf = self.ir.heap_array(&elem, count);
        let mut pending = Some(first_value);
        for (i, e) in elems.iter().enumerate() {
            let v = match pending.take() {
                Some(v) => v,
                None => self.build_expr(e)?,
            };
            let v = self.coerce(v, &elem, Coercion::ArrayElement, e.span)?;
            let idx = self.ir.const_i32(i as i64);
            let dst = self.ir.gep(elem.clone(), buf.clone(), vec![idx]);
            self.ir.store(v, dst);
        }
        Ok((buf, elem))
    }

    // ── Lengths and argument passing ──────────────────────────────

    /// Element count of the outer dimension of an array variable.
    pub(crate) fn array_len(&mut self, name: &str, slot: &Slot, span: Span) -> GenResult<Value> {
        let Some(info) = &slot.array else {
            return Err(Diagnostic::error(
                format!("Variable is not an array: {}", name),
                span,
            ));
        };
        match (info.storage, info.dims.first().copied().flatten()) {
            (ArrayStorage::Stack, Some(n)) => Ok(self.ir.const_i32(n as i64)),
            (ArrayStorage::Heap, _) if self.ir.alloc == AllocStrategy::Tracked => {
                let base = self.ir.load(Type::PTR, slot.ptr.clone());
                Ok(self.heap_count(base, &info.elem))
            }
            (ArrayStorage::Param | ArrayStorage::Rows, _) if !slot.extents.is_empty() => {
                Ok(slot.extents[0].clone())
            }
            _ => Err(Diagnostic::error(
                format!("Length of array '{}' is not known", name),
                span,
            )),
        }
    }

    /// Values passed for an array parameter: the array pointer, then one
    /// `i32` length per dimension. 1-D stack arrays decay to a pointer to
    /// their first element; 2-D stack arrays are copied into a tracked
    /// table of row pointers; pointer-held arrays pass as-is. A length
    /// that cannot be known is passed as `-1`.
    pub(crate) fn array_argument(
        &mut self,
        arg: &Spanned<Expr>,
        param: &ArrayInfo,
        ctx: Coercion<'_>,
    ) -> GenResult<Vec<Value>> {
        let mismatch = |what: &str| {
            Diagnostic::error(ctx.mismatch(), arg.span).with_note(what.to_string())
        };
        let Expr::Var(name) = &arg.node else {
            let v = self.build_expr(arg)?;
            if !(v.ty.is_ptr() && param.rank() == 1) {
                return Err(mismatch("expected an array"));
            }
            // literals in argument position are tracked heap buffers
            let len = if matches!(arg.node, Expr::ArrayInit(_))
                && self.ir.alloc == AllocStrategy::Tracked
            {
                self.heap_count(v.clone(), &param.elem)
            } else {
                self.unknown_len()
            };
            return Ok(vec![v, len]);
        };
        let slot = self.lookup(name, arg.span)?;
        let Some(info) = &slot.array else {
            if slot.ty.is_ptr() && param.rank() == 1 {
                let v = self.ir.load(Type::PTR, slot.ptr.clone());
                return Ok(vec![v, self.unknown_len()]);
            }
            return Err(mismatch("expected an array"));
        };
        if info.rank() != param.rank() {
            return Err(mismatch("array dimension mismatch"));
        }
        if info.elem != param.elem {
            return Err(mismatch("array element type mismatch"));
        }
        let const_dims: Vec<Value> = info
            .dims
            .iter()
            .map(|d| self.ir.const_i32(d.unwrap_or(0) as i64))
            .collect();
        match info.storage {
            ArrayStorage::Stack if info.rank() == 1 => {
                let zero = self.ir.const_i32(0);
                let ptr = self.ir.gep(slot.ty.clone(), slot.ptr.clone(), vec![zero.clone(), zero]);
                Ok(std::iter::once(ptr).chain(const_dims).collect())
            }
            ArrayStorage::Stack => {
                let rows = info.dims[0].unwrap_or(0);
                let table = self.row_table(&slot, rows);
                Ok(std::iter::once(table).chain(const_dims).collect())
            }
            ArrayStorage::Heap => {
                let base = self.ir.load(Type::PTR, slot.ptr.clone());
                let len = if self.ir.alloc == AllocStrategy::Tracked {
                    self.heap_count(base.clone(), &info.elem)
                } else {
                    self.unknown_len()
                };
                Ok(vec![base, len])
            }
            ArrayStorage::Param | ArrayStorage::Rows => {
                let base = self.ir.load(Type::PTR, slot.ptr.clone());
                let mut out = vec![base];
                out.extend(slot.extents.iter().cloned());
                while out.len() <= info.rank() {
                    out.push(self.unknown_len());
                }
                Ok(out)
            }
        }
    }

    fn unknown_len(&self) -> Value {
        self.ir.const_i32(-1)
    }

    /// Copy the row addresses of a 2-D stack array into a tracked table.
    fn row_table(&mut self, slot: &Slot, rows: u64) -> Value {
        let bytes = self.ir.const_i64((rows * 8) as i64);
        let table = self.ir.tracked_malloc(bytes, 2);
        let counter = self.ir.alloca(Type::I32);
        let zero = self.ir.const_i32(0);
        self.ir.store(zero.clone(), counter.clone());

        let header = self.ir.append_block("rows.header");
        let body = self.ir.append_block("rows.body");
        let exit = self.ir.append_block("rows.exit");
        self.ir.br(header);

        self.ir.position_at_end(header);
        let i = self.ir.load(Type::I32, counter.clone());
        let limit = self.ir.const_i32(rows as i64);
        let more = self.ir.icmp(IntPredicate::Slt, i.clone(), limit);
        self.ir.cond_br(more, body, exit);

        self.ir.position_at_end(body);
        let row = self
            .ir
            .gep(slot.ty.clone(), slot.ptr.clone(), vec![zero.clone(), i.clone(), zero]);
        let dst = self.ir.gep(Type::PTR, table.clone(), vec![i.clone()]);
        self.ir.store(row, dst);
        let one = self.ir.const_i32(1);
        let next = self.ir.add(i, one);
        self.ir.store(next, counter);
        self.ir.br(header);

        self.ir.position_at_end(exit);
        table
    }
}
