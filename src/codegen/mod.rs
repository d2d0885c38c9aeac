//! CodeGen: lowers an Aero AST into an IR `Module`.
//!
//! The translator walks each function body depth-first and talks to the
//! IR only through `IrBuilder`. Every lowering step returns
//! `GenResult<T>`; the first error inside a function aborts that function
//! (its partial body is discarded) and translation moves on to the next
//! one, so a single run reports one diagnostic per broken function.
//!
//! Split by concern:
//! - `types`    source types, promotion, the coercion matrix
//! - `scope`    name → slot frames with a drop guard
//! - `expr`     expression dispatch, literals, identifiers, unary ops
//! - `binop`    binary operators including string concatenation
//! - `cond`     short-circuit guards and if/while/for lowering
//! - `stmt`     declarations, assignment, return, break
//! - `array`    stack/heap arrays, bounds checks, literals
//! - `call`     user calls, method calls, struct objects
//! - `cast`     explicit casts and value-to-text formatting
//! - `builtins` the builtin function table
//! - `func`     signatures, bodies, entry synthesis
//! - `inline`   inline asm and foreign C/C++ blocks

mod array;
mod binop;
mod builtins;
mod call;
mod cast;
mod cond;
mod expr;
mod func;
mod inline;
mod scope;
mod stmt;
mod types;
#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use crate::ast::{File, Item};
use crate::config::GenConfig;
use crate::diagnostic::Diagnostic;
use crate::ir::{BlockId, IrBuilder, Module, Param, Type};
use crate::span::Span;

pub use array::{ArrayInfo, ArrayStorage};
pub use builtins::{Arity, Builtin, BuiltinFn, BuiltinTable};
pub use scope::{ScopeStack, Slot};
pub use types::{literal_is_integral, promoted, scalar_type, type_name, Coercion, MAX_ARRAY_DIMS};

pub(crate) type GenResult<T> = Result<T, Diagnostic>;

// ─── Signatures ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSig {
    pub name: String,
    /// Source-level type: `Struct(..)` for objects passed by address.
    pub ty: Type,
    pub array: Option<ArrayInfo>,
}

impl ParamSig {
    /// IR parameters for this source parameter: the value itself, then one
    /// hidden `i32` length per array dimension.
    pub fn ir_params(&self) -> Vec<Param> {
        // structs cross calls by address
        let ty = if self.ty.is_struct() { Type::PTR } else { self.ty.clone() };
        let mut out = vec![Param::new(self.name.clone(), ty)];
        match self.array.as_ref().map(ArrayInfo::rank) {
            Some(1) => out.push(Param::new(format!("{}.len", self.name), Type::I32)),
            Some(_) => {
                out.push(Param::new(format!("{}.rows", self.name), Type::I32));
                out.push(Param::new(format!("{}.cols", self.name), Type::I32));
            }
            None => {}
        }
        out
    }
}

/// A user function or method as seen by callers.
#[derive(Debug, Clone, PartialEq)]
pub struct FnSig {
    /// IR symbol (`user_main` for the user's `main`, `Type__method` for
    /// methods).
    pub symbol: String,
    pub params: Vec<ParamSig>,
    pub ret: Type,
}

/// Result of translating one file: the module plus every diagnostic.
#[derive(Debug)]
pub struct GenOutput {
    pub module: Module,
    pub diagnostics: Vec<Diagnostic>,
}

// ─── CodeGen ───────────────────────────────────────────────────────

pub struct CodeGen<'b> {
    pub(crate) ir: IrBuilder,
    pub(crate) scopes: ScopeStack,
    /// Source name → signature of every user function.
    pub(crate) functions: BTreeMap<String, FnSig>,
    /// Method symbol → signature (first parameter is `self`).
    pub(crate) methods: BTreeMap<String, FnSig>,
    /// Exit blocks of the enclosing loops, innermost last.
    pub(crate) loop_exits: Vec<BlockId>,
    /// Return type of the function being lowered.
    pub(crate) current_ret: Type,
    pub(crate) label_counter: u32,
    pub(crate) builtins: &'b BuiltinTable,
    pub(crate) config: GenConfig,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl<'b> CodeGen<'b> {
    pub fn new(module_name: &str, builtins: &'b BuiltinTable) -> Self {
        Self {
            ir: IrBuilder::new(module_name),
            scopes: ScopeStack::new(),
            functions: BTreeMap::new(),
            methods: BTreeMap::new(),
            loop_exits: Vec::new(),
            current_ret: Type::VOID,
            label_counter: 0,
            builtins,
            config: GenConfig::default(),
            diagnostics: Vec::new(),
        }
    }

    // ── Builder-pattern configuration ─────────────────────────────

    pub fn with_config(mut self, config: GenConfig) -> Self {
        self.ir = self
            .ir
            .with_alloc_strategy(config.alloc_strategy())
            .with_opt_level(config.opt_level());
        self.config = config;
        self
    }

    pub fn with_module_name(mut self, name: &str) -> Self {
        self.ir.module.name = name.to_string();
        self
    }

    // ── Top-level entry: build_file ───────────────────────────────

    /// Translate a whole file. Struct types and signatures are registered
    /// before any body is lowered, so forward and recursive calls resolve.
    pub fn build_file(mut self, file: &File) -> GenOutput {
        log::debug!("translating '{}' into {}", file.name, self.ir.module().name);

        // ── Pre-scan: struct types ──
        for item in &file.items {
            if let Item::Struct(def) = &item.node {
                if let Err(d) = self.declare_struct(def) {
                    self.diagnostics.push(d);
                }
            }
        }

        // ── Pre-scan: signatures ──
        let mut pending = Vec::new();
        for item in &file.items {
            match &item.node {
                Item::Fn(def) => match self.declare_fn(def, None) {
                    Ok(sig) => pending.push((def, sig)),
                    Err(d) => self.diagnostics.push(d),
                },
                Item::Struct(def) => {
                    for method in &def.methods {
                        match self.declare_fn(method, Some(&def.name.node)) {
                            Ok(sig) => pending.push((method, sig)),
                            Err(d) => self.diagnostics.push(d),
                        }
                    }
                }
            }
        }

        // ── Bodies ──
        for (def, sig) in pending {
            if let Err(d) = self.build_fn(def, &sig) {
                log::debug!("discarding body of @{}: {}", sig.symbol, d.message);
                self.diagnostics.push(d);
            }
        }

        if self.config.module.synthesize_entry {
            self.synthesize_entry();
        }

        GenOutput {
            module: self.ir.finish(),
            diagnostics: self.diagnostics,
        }
    }

    // ── Helpers ───────────────────────────────────────────────────

    /// Unique symbol with the given prefix: `prefix__N`.
    pub(crate) fn fresh_label(&mut self, prefix: &str) -> String {
        self.label_counter += 1;
        format!("{}__{}", prefix, self.label_counter)
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>, span: Span) {
        let diag = Diagnostic::warning(message, span);
        log::debug!("{}", diag);
        self.diagnostics.push(diag);
    }
}
