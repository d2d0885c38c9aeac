//! Tracked heap allocation.
//!
//! Every heap buffer the translator creates goes through
//! `tracked_malloc`, which registers the block with the runtime collector
//! (`gc_register(ptr, bytes, dims)`) so scope exits and program exit can
//! release it. With `AllocStrategy::Untracked` the registration is skipped
//! and plain `malloc` is emitted.

use super::builder::IrBuilder;
use super::runtime::RuntimeFn;
use super::{Type, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AllocStrategy {
    #[default]
    Tracked,
    Untracked,
}

impl IrBuilder {
    /// `malloc(size)`; `size` is widened to `i64` as needed.
    pub fn malloc(&mut self, size: Value) -> Value {
        let size = self.int_cast(size, Type::I64, false);
        self.call_runtime(RuntimeFn::Malloc, vec![size])
    }

    /// `malloc` followed by `gc_register(ptr, size, dims)`.
    pub fn tracked_malloc(&mut self, size: Value, dims: u32) -> Value {
        let size = self.int_cast(size, Type::I64, false);
        let ptr = self.malloc(size.clone());
        if self.alloc == AllocStrategy::Tracked {
            let dims = self.const_i32(i64::from(dims.max(1)));
            self.call_runtime(RuntimeFn::GcRegister, vec![ptr.clone(), size, dims]);
        }
        ptr
    }

    pub fn free(&mut self, ptr: Value) {
        self.call_runtime(RuntimeFn::Free, vec![ptr]);
    }

    /// Drop `ptr` from the collector's table without freeing it.
    pub fn untrack(&mut self, ptr: Value) {
        if self.alloc == AllocStrategy::Tracked {
            self.call_runtime(RuntimeFn::GcUnregister, vec![ptr]);
        }
    }

    pub fn gc_collect(&mut self) {
        if self.alloc == AllocStrategy::Tracked {
            self.call_runtime(RuntimeFn::GcCollect, vec![]);
        }
    }

    /// `atexit(gc_cleanup)`, so whatever is still tracked is released when
    /// the generated program exits.
    pub fn cleanup_at_exit(&mut self) {
        if self.alloc == AllocStrategy::Tracked {
            self.declare_runtime(RuntimeFn::GcCleanup);
            let hook = Value::global(RuntimeFn::GcCleanup.name());
            self.call_runtime(RuntimeFn::Atexit, vec![hook]);
        }
    }

    /// Byte size recorded for a tracked block, as `i32`.
    pub fn tracked_size(&mut self, ptr: Value) -> Value {
        let size = self.call_runtime(RuntimeFn::GcGetSize, vec![ptr]);
        self.int_cast(size, Type::I32, false)
    }

    /// Release a table of `rows` row pointers and the table itself.
    pub fn free_rows(&mut self, table: Value, rows: Value) {
        let rows = self.int_cast(rows, Type::I32, true);
        self.call_runtime(RuntimeFn::FreePtrArray, vec![table.clone(), rows]);
        self.untrack(table.clone());
        self.free(table);
    }
}
