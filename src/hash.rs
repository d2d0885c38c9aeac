//! Content addressing for translated modules.
//!
//! Hashes are BLAKE3 over the printed IR, so two translations that print
//! identically share an identity. The module hash covers the whole text
//! (name and opt level included); function hashes cover one definition
//! each and ignore where it sits in the module.

use std::collections::BTreeMap;

use crate::ir::{Function, Module};

const MODULE_TAG: &[u8] = b"aero.module.v1\0";
const FUNCTION_TAG: &[u8] = b"aero.function.v1\0";

/// A 256-bit content hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Short base-32 form (8 characters, 40 bits).
    pub fn to_short(&self) -> String {
        const ALPHABET: &[u8] = b"0123456789abcdefghjkmnpqrstuvwxyz";
        let val = u64::from_be_bytes([
            0, 0, 0, self.0[0], self.0[1], self.0[2], self.0[3], self.0[4],
        ]);
        (0..8)
            .rev()
            .map(|i| ALPHABET[((val >> (i * 5)) & 0x1F) as usize] as char)
            .collect()
    }

    fn of(tag: &[u8], text: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(tag);
        hasher.update(text.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }
}

impl std::fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.to_short())
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.to_short())
    }
}

pub fn hash_module(module: &Module) -> ContentHash {
    ContentHash::of(MODULE_TAG, &module.to_string())
}

pub fn hash_function(func: &Function) -> ContentHash {
    ContentHash::of(FUNCTION_TAG, &func.to_string())
}

/// Hash of every defined function, keyed by symbol. Declarations are
/// skipped.
pub fn hash_functions(module: &Module) -> BTreeMap<String, ContentHash> {
    module
        .functions
        .iter()
        .filter(|f| !f.is_declaration())
        .map(|f| (f.name.clone(), hash_function(f)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IrBuilder, Type};

    fn module_returning(name: &str, value: i64) -> Module {
        let mut b = IrBuilder::new("m.vexar");
        b.declare_function(name, vec![], Type::I32, false);
        b.define_function(name);
        let v = b.const_i32(value);
        b.ret(v);
        b.end_function();
        b.finish()
    }

    #[test]
    fn test_identical_modules_hash_equal() {
        assert_eq!(
            hash_module(&module_returning("f", 1)),
            hash_module(&module_returning("f", 1))
        );
    }

    #[test]
    fn test_body_change_changes_hash() {
        let a = hash_functions(&module_returning("f", 1));
        let b = hash_functions(&module_returning("f", 2));
        assert_ne!(a["f"], b["f"]);
    }

    #[test]
    fn test_declarations_are_not_hashed() {
        let mut b = IrBuilder::new("m");
        b.declare_function("ext", vec![], Type::VOID, false);
        assert!(hash_functions(&b.finish()).is_empty());
    }

    #[test]
    fn test_short_form() {
        let h = ContentHash::zero();
        assert_eq!(h.to_short(), "00000000");
        assert_eq!(h.to_hex().len(), 64);
        assert_eq!(format!("{}", h), "#00000000");
    }
}
