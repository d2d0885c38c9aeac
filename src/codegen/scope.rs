//! Lexical scopes: a stack of name → storage-slot frames.
//!
//! Frames are pushed through `CodeGen::enter_scope`, which returns a guard
//! that pops on drop, so an early `?` out of a nested block still leaves
//! the stack balanced.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use crate::ir::{Type, Value};

use super::array::ArrayInfo;
use super::CodeGen;

/// Storage behind one declared name.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    /// Address of the stack slot.
    pub ptr: Value,
    /// Type stored in the slot (`[N x T]` for fixed arrays, `ptr` for heap
    /// arrays and strings).
    pub ty: Type,
    /// Shape information when the slot holds an array.
    pub array: Option<ArrayInfo>,
    /// Run-time length per dimension (`i32`) for array parameters, which
    /// receive them as hidden arguments.
    pub extents: Vec<Value>,
}

impl Slot {
    pub fn scalar(ptr: Value, ty: Type) -> Self {
        Self {
            ptr,
            ty,
            array: None,
            extents: Vec::new(),
        }
    }

    pub fn array(ptr: Value, ty: Type, info: ArrayInfo) -> Self {
        Self {
            ptr,
            ty,
            array: Some(info),
            extents: Vec::new(),
        }
    }

    pub fn with_extents(mut self, extents: Vec<Value>) -> Self {
        self.extents = extents;
        self
    }

    /// Struct type name when the slot holds a custom aggregate.
    pub fn struct_name(&self) -> Option<&str> {
        match &self.ty {
            Type::Struct(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScopeStack {
    frames: Vec<HashMap<String, Slot>>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    /// A stack holding only the outermost (module) frame.
    pub fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// Pop the innermost frame. The module frame is never popped.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Declare in the innermost frame. Returns false when the name is
    /// already declared in that same frame.
    pub fn declare(&mut self, name: &str, slot: Slot) -> bool {
        let Some(frame) = self.frames.last_mut() else {
            return false;
        };
        if frame.contains_key(name) {
            return false;
        }
        frame.insert(name.to_string(), slot);
        true
    }

    /// Innermost-first lookup.
    pub fn resolve(&self, name: &str) -> Option<&Slot> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    pub fn is_declared_here(&self, name: &str) -> bool {
        self.frames.last().is_some_and(|f| f.contains_key(name))
    }

    /// Drop everything except the module frame.
    pub fn reset(&mut self) {
        self.frames.truncate(1);
    }
}

// ─── Scope guard ───────────────────────────────────────────────────

/// Pops one frame from the translator's scope stack when dropped.
pub struct ScopeGuard<'g, 'b> {
    gen: &'g mut CodeGen<'b>,
}

impl<'b> CodeGen<'b> {
    pub(crate) fn enter_scope(&mut self) -> ScopeGuard<'_, 'b> {
        self.scopes.push();
        ScopeGuard { gen: self }
    }
}

impl<'b> Deref for ScopeGuard<'_, 'b> {
    type Target = CodeGen<'b>;

    fn deref(&self) -> &Self::Target {
        self.gen
    }
}

impl DerefMut for ScopeGuard<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.gen
    }
}

impl Drop for ScopeGuard<'_, '_> {
    fn drop(&mut self) {
        self.gen.scopes.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(n: u32) -> Slot {
        Slot::scalar(Value::reg(crate::ir::Reg(n), Type::PTR), Type::I32)
    }

    #[test]
    fn test_inner_frame_shadows_outer() {
        let mut s = ScopeStack::new();
        s.push();
        assert!(s.declare("x", slot(1)));
        s.push();
        assert!(s.declare("x", slot(2)));
        assert_eq!(s.resolve("x"), Some(&slot(2)));
        s.pop();
        assert_eq!(s.resolve("x"), Some(&slot(1)));
    }

    #[test]
    fn test_same_frame_redeclaration_rejected() {
        let mut s = ScopeStack::new();
        s.push();
        assert!(s.declare("x", slot(1)));
        assert!(!s.declare("x", slot(2)));
        assert_eq!(s.resolve("x"), Some(&slot(1)));
    }

    #[test]
    fn test_module_frame_survives_pop() {
        let mut s = ScopeStack::new();
        s.pop();
        s.pop();
        assert_eq!(s.depth(), 1);
        assert!(s.resolve("missing").is_none());
    }

    #[test]
    fn test_reset_drops_function_frames() {
        let mut s = ScopeStack::new();
        s.push();
        s.push();
        s.declare("y", slot(3));
        s.reset();
        assert_eq!(s.depth(), 1);
        assert!(s.resolve("y").is_none());
    }
}
