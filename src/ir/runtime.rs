//! C runtime and allocation-tracking primitives the generated code calls.
//!
//! Declarations are added to the module lazily, the first time a
//! primitive is used, with the fixed signatures below.

use super::{Param, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeFn {
    // ── libc ──
    Malloc,
    Free,
    Printf,
    Scanf,
    Sprintf,
    Strlen,
    Strcpy,
    Strcat,
    Strcmp,
    Atoi,
    Atof,
    Strtod,
    Exit,
    Atexit,
    // ── Tracked allocation ──
    GcRegister,
    GcUnregister,
    GcCollect,
    GcCleanup,
    GcGetSize,
    FreePtrArray,
}

impl RuntimeFn {
    pub const ALL: [RuntimeFn; 20] = [
        RuntimeFn::Malloc,
        RuntimeFn::Free,
        RuntimeFn::Printf,
        RuntimeFn::Scanf,
        RuntimeFn::Sprintf,
        RuntimeFn::Strlen,
        RuntimeFn::Strcpy,
        RuntimeFn::Strcat,
        RuntimeFn::Strcmp,
        RuntimeFn::Atoi,
        RuntimeFn::Atof,
        RuntimeFn::Strtod,
        RuntimeFn::Exit,
        RuntimeFn::Atexit,
        RuntimeFn::GcRegister,
        RuntimeFn::GcUnregister,
        RuntimeFn::GcCollect,
        RuntimeFn::GcCleanup,
        RuntimeFn::GcGetSize,
        RuntimeFn::FreePtrArray,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RuntimeFn::Malloc => "malloc",
            RuntimeFn::Free => "free",
            RuntimeFn::Printf => "printf",
            RuntimeFn::Scanf => "scanf",
            RuntimeFn::Sprintf => "sprintf",
            RuntimeFn::Strlen => "strlen",
            RuntimeFn::Strcpy => "strcpy",
            RuntimeFn::Strcat => "strcat",
            RuntimeFn::Strcmp => "strcmp",
            RuntimeFn::Atoi => "atoi",
            RuntimeFn::Atof => "atof",
            RuntimeFn::Strtod => "strtod",
            RuntimeFn::Exit => "exit",
            RuntimeFn::Atexit => "atexit",
            RuntimeFn::GcRegister => "gc_register",
            RuntimeFn::GcUnregister => "gc_unregister",
            RuntimeFn::GcCollect => "gc_collect",
            RuntimeFn::GcCleanup => "gc_cleanup",
            RuntimeFn::GcGetSize => "gc_get_size",
            RuntimeFn::FreePtrArray => "free_ptr_array",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    /// (parameter types, return type, variadic)
    pub fn signature(&self) -> (Vec<Type>, Type, bool) {
        use Type as T;
        match self {
            RuntimeFn::Malloc => (vec![T::I64], T::PTR, false),
            RuntimeFn::Free => (vec![T::PTR], T::VOID, false),
            RuntimeFn::Printf | RuntimeFn::Scanf => (vec![T::PTR], T::I32, true),
            RuntimeFn::Sprintf => (vec![T::PTR, T::PTR], T::I32, true),
            RuntimeFn::Strlen => (vec![T::PTR], T::I64, false),
            RuntimeFn::Strcpy | RuntimeFn::Strcat => (vec![T::PTR, T::PTR], T::PTR, false),
            RuntimeFn::Strcmp => (vec![T::PTR, T::PTR], T::I32, false),
            RuntimeFn::Atoi => (vec![T::PTR], T::I32, false),
            RuntimeFn::Atof => (vec![T::PTR], T::F64, false),
            RuntimeFn::Strtod => (vec![T::PTR, T::PTR], T::F64, false),
            RuntimeFn::Exit => (vec![T::I32], T::VOID, false),
            RuntimeFn::Atexit => (vec![T::PTR], T::I32, false),
            RuntimeFn::GcRegister => (vec![T::PTR, T::I64, T::I32], T::VOID, false),
            RuntimeFn::GcUnregister => (vec![T::PTR], T::VOID, false),
            RuntimeFn::GcCollect | RuntimeFn::GcCleanup => (vec![], T::VOID, false),
            RuntimeFn::GcGetSize => (vec![T::PTR], T::I64, false),
            RuntimeFn::FreePtrArray => (vec![T::PTR, T::I32], T::VOID, false),
        }
    }

    pub(crate) fn params(&self) -> (Vec<Param>, Type, bool) {
        let (tys, ret, variadic) = self.signature();
        let params = tys
            .into_iter()
            .enumerate()
            .map(|(i, ty)| Param::new(format!("a{}", i), ty))
            .collect();
        (params, ret, variadic)
    }
}

impl std::fmt::Display for RuntimeFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_finds_every_primitive() {
        for f in RuntimeFn::ALL {
            assert_eq!(RuntimeFn::from_name(f.name()), Some(f));
        }
        assert_eq!(RuntimeFn::from_name("puts"), None);
    }

    #[test]
    fn test_printf_is_variadic() {
        let (params, ret, variadic) = RuntimeFn::Printf.signature();
        assert_eq!(params, vec![Type::PTR]);
        assert_eq!(ret, Type::I32);
        assert!(variadic);
        assert!(!RuntimeFn::Strlen.signature().2);
    }
}
