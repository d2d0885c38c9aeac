//! Struct types, function signatures and bodies, entry synthesis.

use crate::ast::{FnDef, StructDef};
use crate::diagnostic::Diagnostic;
use crate::ir::{RuntimeFn, Type, Value};

use super::types::type_name;
use super::{CodeGen, FnSig, GenResult, ParamSig, Slot};

/// Symbol of a method: `Type__name`.
pub(crate) fn method_symbol(owner: &str, name: &str) -> String {
    format!("{}__{}", owner, name)
}

impl<'b> CodeGen<'b> {
    // ── Structs ───────────────────────────────────────────────────

    pub(crate) fn declare_struct(&mut self, def: &StructDef) -> GenResult<()> {
        let name = &def.name.node;
        if self.ir.custom_type(name).is_some() || super::scalar_type(name).is_some() {
            return Err(Diagnostic::error(
                format!("Type already defined: {}", name),
                def.name.span,
            ));
        }
        let mut fields: Vec<(String, Type)> = Vec::with_capacity(def.fields.len());
        for field in &def.fields {
            if field.ty.node.is_array() {
                return Err(Diagnostic::error(
                    format!("Array fields are not supported: {}.{}", name, field.name.node),
                    field.ty.span,
                ));
            }
            if fields.iter().any(|(f, _)| *f == field.name.node) {
                return Err(Diagnostic::error(
                    format!("Duplicate field: {}.{}", name, field.name.node),
                    field.name.span,
                ));
            }
            if field.ty.node.name == *name {
                return Err(Diagnostic::error(
                    format!("Struct cannot contain itself: {}", name),
                    field.ty.span,
                ));
            }
            let ty = self.resolve_scalar(&field.ty.node.name, field.ty.span)?;
            if ty.is_void() {
                return Err(Diagnostic::error("Field of type void is not allowed", field.ty.span));
            }
            fields.push((field.name.node.clone(), ty));
        }
        log::debug!("struct {} with {} field(s)", name, fields.len());
        self.ir.define_custom_type(name, fields);
        Ok(())
    }

    // ── Signatures ────────────────────────────────────────────────

    /// Register a function (or, with `owner`, a method) so that calls
    /// anywhere in the file resolve before its body is lowered.
    pub(crate) fn declare_fn(&mut self, def: &FnDef, owner: Option<&str>) -> GenResult<FnSig> {
        let name = &def.name.node;
        let symbol = match owner {
            Some(owner) => method_symbol(owner, name),
            None if name == "main" && self.config.module.synthesize_entry => {
                self.config.module.user_entry.clone()
            }
            None => name.clone(),
        };

        if owner.is_none() {
            if RuntimeFn::from_name(name).is_some() || self.builtins.contains(name) {
                return Err(Diagnostic::error(
                    format!("Function name is reserved: {}", name),
                    def.name.span,
                ));
            }
            if self.functions.contains_key(name) {
                return Err(Diagnostic::error(
                    format!("Function already defined: {}", name),
                    def.name.span,
                ));
            }
        } else if self.methods.contains_key(&symbol) {
            return Err(Diagnostic::error(
                format!("Method already defined: {}", symbol.replace("__", ".")),
                def.name.span,
            ));
        }

        let mut params = Vec::with_capacity(def.params.len() + 1);
        if let Some(owner) = owner {
            params.push(ParamSig {
                name: "self".to_string(),
                ty: Type::Struct(owner.to_string()),
                array: None,
            });
        }
        for param in &def.params {
            let tn = &param.ty.node;
            let sig = match self.param_array(tn, param.ty.span)? {
                Some(info) => ParamSig {
                    name: param.name.node.clone(),
                    ty: Type::PTR,
                    array: Some(info),
                },
                None => {
                    let ty = self.resolve_scalar(&tn.name, param.ty.span)?;
                    if ty.is_void() {
                        return Err(Diagnostic::error(
                            format!("Parameter cannot be void: {}", param.name.node),
                            param.ty.span,
                        ));
                    }
                    ParamSig {
                        name: param.name.node.clone(),
                        ty,
                        array: None,
                    }
                }
            };
            params.push(sig);
        }

        let ret = match &def.return_ty {
            None => Type::VOID,
            Some(rt) => {
                if rt.node.is_array() {
                    return Err(Diagnostic::error(
                        format!("Function cannot return an array: {}", name),
                        rt.span,
                    ));
                }
                let ty = self.resolve_scalar(&rt.node.name, rt.span)?;
                if ty.is_struct() {
                    return Err(Diagnostic::error(
                        format!("Function cannot return a struct by value: {}", name),
                        rt.span,
                    ));
                }
                ty
            }
        };

        let ir_params = params.iter().flat_map(ParamSig::ir_params).collect();
        if !self.ir.declare_function(&symbol, ir_params, ret.clone(), false) {
            return Err(Diagnostic::error(
                format!("Function already defined: {}", symbol),
                def.name.span,
            ));
        }

        let sig = FnSig {
            symbol: symbol.clone(),
            params,
            ret,
        };
        match owner {
            Some(owner) => {
                self.ir.add_method(owner, name, &symbol);
                self.methods.insert(symbol, sig.clone());
            }
            None => {
                self.functions.insert(name.clone(), sig.clone());
            }
        }
        log::trace!("declared @{}/{}", sig.symbol, sig.params.len());
        Ok(sig)
    }

    // ── Bodies ────────────────────────────────────────────────────

    /// Lower one body. On error the partial body is dropped and the
    /// function stays a declaration.
    pub(crate) fn build_fn(&mut self, def: &FnDef, sig: &FnSig) -> GenResult<()> {
        let Some(incoming) = self.ir.define_function(&sig.symbol) else {
            return Err(Diagnostic::error(
                format!("Function not found: {}", sig.symbol),
                def.name.span,
            ));
        };
        log::debug!("lowering @{}", sig.symbol);
        self.scopes.reset();
        self.scopes.push();
        self.loop_exits.clear();
        self.current_ret = sig.ret.clone();

        let result = self.build_fn_body(def, sig, incoming);
        if result.is_err() {
            self.ir.discard_body();
        }
        self.scopes.reset();
        self.ir.end_function();
        result
    }

    fn build_fn_body(&mut self, def: &FnDef, sig: &FnSig, incoming: Vec<Value>) -> GenResult<()> {
        let mut incoming = incoming.into_iter();
        for (i, param) in sig.params.iter().enumerate() {
            let Some(value) = incoming.next() else {
                break;
            };
            let slot = if param.ty.is_struct() {
                Slot::scalar(value, param.ty.clone())
            } else {
                let ptr = self.ir.alloca(param.ty.clone());
                self.ir.store(value, ptr.clone());
                match &param.array {
                    Some(info) => {
                        let extents = incoming.by_ref().take(info.rank()).collect();
                        Slot::array(ptr, Type::PTR, info.clone()).with_extents(extents)
                    }
                    None => Slot::scalar(ptr, param.ty.clone()),
                }
            };
            if !self.scopes.declare(&param.name, slot) {
                // `self` is implicit, so only explicit parameters can clash
                let span = def
                    .params
                    .get(i.saturating_sub(sig.params.len() - def.params.len()))
                    .map_or(def.name.span, |p| p.name.span);
                return Err(Diagnostic::error(
                    format!("Duplicate parameter: {}", param.name),
                    span,
                ));
            }
        }

        self.build_stmts(&def.body.node.stmts)?;

        if !self.ir.is_terminated() {
            if self.config.runtime.scope_cleanup {
                self.ir.gc_collect();
            }
            if sig.ret.is_void() {
                self.ir.ret_void();
            } else {
                log::trace!("@{} falls through, returning zero", sig.symbol);
                let zero = self.ir.zero(&sig.ret);
                self.ir.ret(zero);
            }
        }
        Ok(())
    }

    // ── Entry ─────────────────────────────────────────────────────

    /// Native `main(): i32` around the user's entry point.
    pub(crate) fn synthesize_entry(&mut self) {
        let user_entry = self.config.module.user_entry.clone();
        if !self.ir.declare_function("main", Vec::new(), Type::I32, false) {
            self.warn(
                format!("Entry point not synthesized: main is already defined as {}", user_entry),
                crate::span::Span::dummy(),
            );
            return;
        }
        if self.ir.define_function("main").is_none() {
            return;
        }
        self.ir.cleanup_at_exit();

        let user = self
            .functions
            .get("main")
            .filter(|sig| sig.symbol == user_entry)
            .cloned();
        let status = match user {
            Some(sig) if sig.params.is_empty() => {
                let result = self.ir.call(&sig.symbol, Vec::new());
                match &sig.ret {
                    Type::Int(_) => self.ir.int_cast(result, Type::I32, true),
                    Type::Void => self.ir.const_i32(0),
                    other => {
                        log::debug!("user entry returns {}, exiting with 1", type_name(other));
                        self.ir.const_i32(1)
                    }
                }
            }
            Some(_) => {
                log::warn!("user main takes parameters, not calling it");
                self.ir.const_i32(1)
            }
            None => self.ir.const_i32(1),
        };
        self.ir.ret(status);
        self.ir.end_function();
    }
}
