//! Calls, method calls and struct objects.
//!
//! Builtins are looked up before user functions. Struct objects are
//! always handled by address: a struct variable's slot is the object, a
//! struct parameter (including `self`) is the incoming pointer.

use crate::ast::{Expr, Place};
use crate::diagnostic::Diagnostic;
use crate::ir::{Type, Value};
use crate::span::{Span, Spanned};

use super::array::PlaceRef;
use super::types::{type_name, Coercion};
use super::{CodeGen, FnSig, GenResult, ParamSig};

impl<'b> CodeGen<'b> {
    pub(crate) fn build_call(
        &mut self,
        name: &Spanned<String>,
        args: &[Spanned<Expr>],
        span: Span,
    ) -> GenResult<Value> {
        let table = self.builtins;
        if let Some(builtin) = table.get(&name.node) {
            builtin.check_arity(args.len(), span)?;
            log::trace!("builtin {}({} args)", builtin.name, args.len());
            return (builtin.handler)(self, args, span);
        }
        let Some(sig) = self.functions.get(&name.node).cloned() else {
            return Err(Diagnostic::error(
                format!("Function not found: {}", name.node),
                name.span,
            ));
        };
        if args.len() != sig.params.len() {
            return Err(Diagnostic::error(
                format!(
                    "Function {} expects {} argument(s), got {}",
                    name.node,
                    sig.params.len(),
                    args.len()
                ),
                span,
            ));
        }
        let values = self.call_args(&name.node, &sig.params, args)?;
        Ok(self.ir.call(&sig.symbol, values))
    }

    /// `receiver.method(args)`: the object address goes first.
    pub(crate) fn build_method_call(
        &mut self,
        receiver: &Spanned<Expr>,
        method: &Spanned<String>,
        args: &[Spanned<Expr>],
        span: Span,
    ) -> GenResult<Value> {
        let (obj, ty_name) = self.build_object(receiver)?;
        let symbol = self
            .ir
            .custom_type(&ty_name)
            .and_then(|ct| ct.methods.get(&method.node))
            .cloned()
            .ok_or_else(|| {
                Diagnostic::error(
                    format!("Unknown method: {}.{}", ty_name, method.node),
                    method.span,
                )
            })?;
        let sig = self.method_sig(&symbol, method.span)?;
        let params = &sig.params[1..];
        if args.len() != params.len() {
            return Err(Diagnostic::error(
                format!(
                    "Method {}.{} expects {} argument(s), got {}",
                    ty_name,
                    method.node,
                    params.len(),
                    args.len()
                ),
                span,
            ));
        }
        let values = self.call_args(&method.node, params, args)?;
        self.ir
            .method_call(&ty_name, &method.node, obj, values)
            .ok_or_else(|| Diagnostic::error(format!("Function not found: {}", symbol), span))
    }

    fn method_sig(&self, symbol: &str, span: Span) -> GenResult<FnSig> {
        self.methods.get(symbol).cloned().ok_or_else(|| {
            Diagnostic::error(format!("Function not found: {}", symbol), span)
        })
    }

    /// Arguments left to right, each converted to its parameter type.
    /// Array arguments expand to the pointer plus their hidden lengths.
    fn call_args(
        &mut self,
        fname: &str,
        params: &[ParamSig],
        args: &[Spanned<Expr>],
    ) -> GenResult<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for (i, (arg, param)) in args.iter().zip(params).enumerate() {
            let ctx = Coercion::Argument(i, fname);
            let value = if let Some(info) = &param.array {
                values.extend(self.array_argument(arg, info, ctx)?);
                continue;
            } else if let Type::Struct(expected) = &param.ty {
                let (obj, found) = self.build_object(arg)?;
                if &found != expected {
                    return Err(Diagnostic::error(ctx.mismatch(), arg.span)
                        .with_note(format!("expected {}, found {}", expected, found)));
                }
                obj
            } else {
                let v = self.build_expr(arg)?;
                self.coerce(v, &param.ty, ctx, arg.span)?
            };
            values.push(value);
        }
        Ok(values)
    }

    // ── Struct objects ────────────────────────────────────────────

    /// Address and type name of a struct-valued expression.
    pub(crate) fn build_object(&mut self, expr: &Spanned<Expr>) -> GenResult<(Value, String)> {
        match &expr.node {
            Expr::Paren(inner) => self.build_object(inner),
            Expr::Var(name) => {
                let slot = self.lookup(name, expr.span)?;
                match slot.struct_name() {
                    Some(ty_name) => Ok((slot.ptr.clone(), ty_name.to_string())),
                    None => Err(Diagnostic::error(
                        format!("Variable is not a struct: {}", name),
                        expr.span,
                    )),
                }
            }
            Expr::FieldAccess { expr: obj, field } => {
                let (addr, ty_name) = self.build_object(obj)?;
                let place = self.field_ref(&ty_name, addr, field)?;
                match place.ty {
                    Type::Struct(inner) => Ok((place.ptr, inner)),
                    other => Err(Diagnostic::error(
                        format!("Field is not a struct: {}.{}", ty_name, field.node),
                        field.span,
                    )
                    .with_note(format!("found {}", type_name(&other)))),
                }
            }
            _ => Err(Diagnostic::error("Expression is not a struct value", expr.span)),
        }
    }

    /// Same as `build_object` for assignment targets.
    pub(crate) fn place_object(&mut self, place: &Spanned<Place>) -> GenResult<(Value, String)> {
        match &place.node {
            Place::Var(name) => {
                let slot = self.lookup(name, place.span)?;
                match slot.struct_name() {
                    Some(ty_name) => Ok((slot.ptr.clone(), ty_name.to_string())),
                    None => Err(Diagnostic::error(
                        format!("Variable is not a struct: {}", name),
                        place.span,
                    )),
                }
            }
            Place::Field(obj, field) => {
                let (addr, ty_name) = self.place_object(obj)?;
                let inner = self.field_ref(&ty_name, addr, field)?;
                match inner.ty {
                    Type::Struct(name) => Ok((inner.ptr, name)),
                    _ => Err(Diagnostic::error(
                        format!("Field is not a struct: {}.{}", ty_name, field.node),
                        field.span,
                    )),
                }
            }
            Place::Index(..) => Err(Diagnostic::error(
                "Array elements cannot hold struct values",
                place.span,
            )),
        }
    }

    pub(crate) fn field_ref(
        &mut self,
        ty_name: &str,
        obj: Value,
        field: &Spanned<String>,
    ) -> GenResult<PlaceRef> {
        match self.ir.field_ptr(ty_name, obj, &field.node) {
            Some((ptr, ty)) => Ok(PlaceRef::new(ptr, ty)),
            None => Err(Diagnostic::error(
                format!("Unknown field: {}.{}", ty_name, field.node),
                field.span,
            )),
        }
    }

    pub(crate) fn build_field_access(
        &mut self,
        obj: &Spanned<Expr>,
        field: &Spanned<String>,
    ) -> GenResult<Value> {
        let (addr, ty_name) = self.build_object(obj)?;
        let place = self.field_ref(&ty_name, addr, field)?;
        if place.ty.is_struct() {
            return Err(Diagnostic::error(
                format!(
                    "Struct value cannot be used as an expression: {}.{}",
                    ty_name, field.node
                ),
                field.span,
            ));
        }
        Ok(self.ir.load(place.ty, place.ptr))
    }
}
