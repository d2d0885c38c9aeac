//! Statement and block lowering.

use crate::ast::{BinOp, Block, Expr, Place, Stmt, TypeName};
use crate::diagnostic::Diagnostic;
use crate::ir::{Type, Value};
use crate::span::{Span, Spanned};

use super::array::{Access, ArrayInfo, ArrayStorage};
use super::scope::Slot;
use super::types::{type_name, Coercion};
use super::{CodeGen, GenResult};

impl<'b> CodeGen<'b> {
    // ── Blocks ────────────────────────────────────────────────────

    /// Lower a block in a fresh scope frame.
    pub(crate) fn build_block(&mut self, block: &Spanned<Block>) -> GenResult<()> {
        let mut scope = self.enter_scope();
        scope.build_stmts(&block.node.stmts)
    }

    /// Statements in order, stopping once the current block is terminated.
    pub(crate) fn build_stmts(&mut self, stmts: &[Spanned<Stmt>]) -> GenResult<()> {
        for (i, stmt) in stmts.iter().enumerate() {
            if self.ir.is_terminated() {
                log::trace!("skipping {} unreachable statement(s)", stmts.len() - i);
                break;
            }
            self.build_stmt(stmt)?;
        }
        Ok(())
    }

    pub(crate) fn build_stmt(&mut self, stmt: &Spanned<Stmt>) -> GenResult<()> {
        match &stmt.node {
            Stmt::Var { name, ty, init } => {
                self.build_var_decl(name, ty.as_ref(), init.as_ref(), stmt.span)
            }
            Stmt::Assign { place, value } => self.build_assign(place, value),
            Stmt::CompoundAssign { op, place, value } => {
                self.build_compound_assign(*op, place, value, stmt.span)
            }
            Stmt::Expr(expr) => self.build_expr(expr).map(|_| ()),
            Stmt::If {
                branches,
                else_block,
            } => self.build_if(branches, else_block.as_ref()),
            Stmt::While { cond, body } => self.build_while(cond, body),
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => self.build_for(init.as_deref(), cond.as_ref(), step.as_ref(), body),
            Stmt::Break => self.build_break(stmt.span),
            Stmt::Return(value) => self.build_return(value.as_ref(), stmt.span),
            Stmt::Block(block) => self.build_block(block),
            Stmt::Inline {
                lang,
                code,
                volatile,
            } => self.build_inline(lang, code, *volatile, stmt.span).map(|_| ()),
        }
    }

    // ── Declarations ──────────────────────────────────────────────

    fn build_var_decl(
        &mut self,
        name: &Spanned<String>,
        ty: Option<&Spanned<TypeName>>,
        init: Option<&Spanned<Expr>>,
        span: Span,
    ) -> GenResult<()> {
        if self.scopes.is_declared_here(&name.node) {
            return Err(Diagnostic::error(
                format!("Variable already declared in this scope: {}", name.node),
                name.span,
            ));
        }
        let slot = match ty {
            Some(tn) if !tn.node.is_auto() => self.declared_slot(name, tn, init)?,
            _ => self.inferred_slot(name, init, span)?,
        };
        log::trace!("declare {}: {}", name.node, slot.ty);
        self.scopes.declare(&name.node, slot);
        Ok(())
    }

    /// `auto x = init` / `var x = init`.
    fn inferred_slot(
        &mut self,
        name: &Spanned<String>,
        init: Option<&Spanned<Expr>>,
        span: Span,
    ) -> GenResult<Slot> {
        let Some(init) = init else {
            return Err(Diagnostic::error(
                format!("Auto variable requires initialization: {}", name.node),
                span,
            ));
        };
        if let Expr::ArrayInit(elems) = &init.node {
            let (buf, elem) = self.build_array_literal(elems, None, init.span)?;
            let ptr = self.ir.alloca(Type::PTR);
            self.ir.store(buf, ptr.clone());
            return Ok(Slot::array(ptr, Type::PTR, ArrayInfo::heap(elem)));
        }
        let value = self.build_expr(init)?;
        let ty = match &value.ty {
            Type::Int(_) | Type::Ptr | Type::Double => value.ty.clone(),
            Type::Float => Type::F64,
            other => {
                return Err(Diagnostic::error(
                    format!("Cannot infer a type for {} from {}", name.node, type_name(other)),
                    init.span,
                ))
            }
        };
        let value = self.coerce(value, &ty, Coercion::Variable(&name.node), init.span)?;
        let ptr = self.ir.alloca(ty.clone());
        self.ir.store(value, ptr.clone());
        Ok(Slot::scalar(ptr, ty))
    }

    fn declared_slot(
        &mut self,
        name: &Spanned<String>,
        tn: &Spanned<TypeName>,
        init: Option<&Spanned<Expr>>,
    ) -> GenResult<Slot> {
        let declared = self.resolve_declared(&tn.node, tn.span)?;
        if declared.ty.is_void() {
            return Err(Diagnostic::error(
                format!("Variable cannot have type void: {}", name.node),
                tn.span,
            ));
        }

        // ── Struct object ──
        if let Type::Struct(ty_name) = &declared.ty {
            if init.is_some() {
                return Err(Diagnostic::error(
                    format!("Struct variable cannot have an initializer: {}", name.node),
                    name.span,
                ));
            }
            let ptr = self.ir.alloca(declared.ty.clone());
            log::trace!("object {} of type {}", name.node, ty_name);
            return Ok(Slot::scalar(ptr, declared.ty));
        }

        match declared.array {
            // ── Fixed stack array ──
            Some(info) if info.storage == ArrayStorage::Stack => {
                let ptr = self.ir.alloca(declared.ty.clone());
                match init.map(|e| &e.node) {
                    None => {}
                    Some(Expr::ArrayInit(elems)) => {
                        let init_span = init.map(|e| e.span).unwrap_or(name.span);
                        self.init_fixed_array(&ptr, &declared.ty, elems, init_span)?;
                    }
                    Some(_) => {
                        return Err(Diagnostic::error(
                            format!(
                                "Array variable requires array literal initialization: {}",
                                name.node
                            ),
                            name.span,
                        ))
                    }
                }
                Ok(Slot::array(ptr, declared.ty, info))
            }
            // ── Heap array ──
            Some(info) => {
                let buf = match init {
                    Some(Spanned {
                        node: Expr::ArrayInit(elems),
                        span,
                    }) => self.build_array_literal(elems, Some(&info.elem), *span)?.0,
                    Some(expr) => self.pointer_value(expr, Coercion::Variable(&name.node))?,
                    None => match declared.len {
                        Some(len) => self.ir.heap_array(&info.elem, len),
                        None => self.ir.const_null(),
                    },
                };
                let ptr = self.ir.alloca(Type::PTR);
                self.ir.store(buf, ptr.clone());
                Ok(Slot::array(ptr, Type::PTR, info))
            }
            // ── Scalar ──
            None => {
                let value = match init {
                    Some(Spanned {
                        node: Expr::ArrayInit(_),
                        span,
                    }) => {
                        return Err(Diagnostic::error(
                            format!("Array literal assigned to non-array variable: {}", name.node),
                            *span,
                        ))
                    }
                    Some(expr) => {
                        let v = self.build_expr(expr)?;
                        self.coerce(v, &declared.ty, Coercion::Variable(&name.node), expr.span)?
                    }
                    None => self.ir.zero(&declared.ty),
                };
                let ptr = self.ir.alloca(declared.ty.clone());
                self.ir.store(value, ptr.clone());
                Ok(Slot::scalar(ptr, declared.ty))
            }
        }
    }

    /// A non-literal value for a pointer-held array.
    fn pointer_value(&mut self, expr: &Spanned<Expr>, ctx: Coercion<'_>) -> GenResult<Value> {
        let v = self.build_expr(expr)?;
        if !v.ty.is_ptr() {
            return Err(Diagnostic::error(ctx.mismatch(), expr.span)
                .with_note(format!("expected an array, found {}", type_name(&v.ty))));
        }
        Ok(v)
    }

    // ── Assignment ────────────────────────────────────────────────

    fn build_assign(&mut self, place: &Spanned<Place>, value: &Spanned<Expr>) -> GenResult<()> {
        // whole-array assignment
        if let Place::Var(name) = &place.node {
            let slot = self.lookup(name, place.span)?;
            if let Some(info) = &slot.array {
                return self.assign_array(name, &slot, info, value);
            }
        }
        let target = self.place_ref(place, Access::Assign)?;
        let v = self.build_expr(value)?;
        let v = if target.string_byte {
            match &v.ty {
                Type::Int(w) if *w > 1 => self.ir.int_cast(v, Type::I8, true),
                _ => {
                    return Err(Diagnostic::error(
                        "Type mismatch in string assignment",
                        value.span,
                    ))
                }
            }
        } else {
            let ctx = if matches!(place.node, Place::Index(..)) {
                Coercion::ArrayElement
            } else {
                Coercion::Assignment
            };
            self.coerce(v, &target.ty, ctx, value.span)?
        };
        self.ir.store(v, target.ptr);
        Ok(())
    }

    fn assign_array(
        &mut self,
        name: &str,
        slot: &Slot,
        info: &ArrayInfo,
        value: &Spanned<Expr>,
    ) -> GenResult<()> {
        match (&value.node, info.storage) {
            (Expr::ArrayInit(elems), ArrayStorage::Stack) => {
                self.init_fixed_array(&slot.ptr, &slot.ty, elems, value.span)
            }
            (_, ArrayStorage::Stack) => Err(Diagnostic::error(
                format!("Cannot assign to array: {}", name),
                value.span,
            )),
            (Expr::ArrayInit(elems), _) => {
                let (buf, _) = self.build_array_literal(elems, Some(&info.elem), value.span)?;
                self.ir.store(buf, slot.ptr.clone());
                Ok(())
            }
            _ => {
                let v = self.pointer_value(value, Coercion::Assignment)?;
                self.ir.store(v, slot.ptr.clone());
                Ok(())
            }
        }
    }

    /// `place op= value`, arithmetic operators only.
    fn build_compound_assign(
        &mut self,
        op: BinOp,
        place: &Spanned<Place>,
        value: &Spanned<Expr>,
        span: Span,
    ) -> GenResult<()> {
        if !matches!(
            op,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod
        ) {
            return Err(Diagnostic::error(
                format!("Unsupported compound assignment operator: {}=", op.as_str()),
                span,
            ));
        }
        let target = self.place_ref(place, Access::Compound)?;
        let current = self.ir.load(target.ty.clone(), target.ptr.clone());
        let rhs = self.build_expr(value)?;
        let result = self.binary_values(op, current, rhs, span)?;
        let mismatch = || {
            Diagnostic::error(Coercion::CompoundAssignment.mismatch(), span).with_note(format!(
                "cannot store {} into {}",
                type_name(&result.ty),
                type_name(&target.ty)
            ))
        };
        // `char + char` and `string + x` yield a new string
        if result.ty.is_ptr() && !target.ty.is_ptr() {
            return Err(mismatch());
        }
        let result = if target.string_byte {
            if !matches!(result.ty, Type::Int(w) if w > 1) {
                return Err(mismatch());
            }
            self.ir.int_cast(result, Type::I8, true)
        } else {
            self.coerce(result, &target.ty, Coercion::CompoundAssignment, span)?
        };
        self.ir.store(result, target.ptr);
        Ok(())
    }

    // ── Jumps ─────────────────────────────────────────────────────

    fn build_break(&mut self, span: Span) -> GenResult<()> {
        match self.loop_exits.last() {
            Some(&exit) => {
                self.ir.br(exit);
                Ok(())
            }
            None => Err(Diagnostic::error("Break statement outside of loop", span)),
        }
    }

    /// `return;` in a non-void function returns the zero of its type.
    fn build_return(&mut self, value: Option<&Spanned<Expr>>, span: Span) -> GenResult<()> {
        let ret = self.current_ret.clone();
        match value {
            None if ret.is_void() => self.ir.ret_void(),
            None => {
                let zero = self.ir.zero(&ret);
                self.ir.ret(zero);
            }
            Some(expr) if ret.is_void() => {
                return Err(Diagnostic::error(
                    "Cannot return a value from a void function",
                    expr.span,
                ))
            }
            Some(expr) => {
                let v = self.build_expr(expr)?;
                let v = self.coerce_return(v, &ret, span)?;
                self.ir.ret(v);
            }
        }
        Ok(())
    }

    /// Numeric conversions only; strings never convert at a return.
    pub(crate) fn coerce_return(&mut self, v: Value, ret: &Type, span: Span) -> GenResult<Value> {
        if v.ty != *ret && (v.ty.is_ptr() || ret.is_ptr()) {
            return Err(Diagnostic::error(Coercion::Return.mismatch(), span).with_note(format!(
                "cannot convert {} to {}",
                type_name(&v.ty),
                type_name(ret)
            )));
        }
        self.coerce(v, ret, Coercion::Return, span)
    }
}
