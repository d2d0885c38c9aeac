//! IrBuilder: the emission facade between the translator and the IR.
//!
//! Owns the module under construction plus an insertion point (current
//! function + current block). Constant operands are folded the way an
//! LLVM `IRBuilder` folds them, so `sitofp i32 5` yields `5.0` directly
//! and constant index arithmetic stays visible to bounds checking.

use std::collections::{BTreeMap, HashMap};

use super::gc::AllocStrategy;
use super::runtime::RuntimeFn;
use super::verify::{verify_module, VerifyError};
use super::{
    BasicBlock, BinaryOp, BlockId, CastOp, FloatPredicate, Function, Global, GlobalInit, Instr,
    IntPredicate, Module, OptLevel, Param, Reg, StructType, Terminator, Type, Value, ValueKind,
};

// ─── Custom Types ──────────────────────────────────────────────────

/// A named aggregate: field name → index, plus method name → symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomType {
    pub name: String,
    pub field_indices: BTreeMap<String, u32>,
    pub field_types: Vec<Type>,
    pub methods: BTreeMap<String, String>,
}

impl CustomType {
    pub fn ty(&self) -> Type {
        Type::Struct(self.name.clone())
    }

    pub fn field(&self, name: &str) -> Option<(u32, &Type)> {
        let idx = *self.field_indices.get(name)?;
        self.field_types.get(idx as usize).map(|ty| (idx, ty))
    }
}

// ─── IrBuilder ─────────────────────────────────────────────────────

pub struct IrBuilder {
    pub(crate) module: Module,
    /// Index of the function being defined.
    current: Option<usize>,
    /// Insertion block inside the current function.
    insert: Option<BlockId>,
    /// String constant contents → global name.
    strings: HashMap<String, String>,
    custom: BTreeMap<String, CustomType>,
    pub(crate) alloc: AllocStrategy,
}

impl IrBuilder {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module: Module::new(module_name),
            current: None,
            insert: None,
            strings: HashMap::new(),
            custom: BTreeMap::new(),
            alloc: AllocStrategy::Tracked,
        }
    }

    pub fn with_alloc_strategy(mut self, alloc: AllocStrategy) -> Self {
        self.alloc = alloc;
        self
    }

    pub fn with_opt_level(mut self, level: OptLevel) -> Self {
        self.module.opt_level = level;
        self
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn finish(self) -> Module {
        self.module
    }

    pub fn verify(&self) -> Result<(), Vec<VerifyError>> {
        verify_module(&self.module)
    }

    pub fn size_of(&self, ty: &Type) -> u64 {
        self.module.size_of(ty)
    }

    // ── Constants ─────────────────────────────────────────────────

    pub fn const_bool(&self, b: bool) -> Value {
        Value::bool(b)
    }

    pub fn const_i8(&self, v: i64) -> Value {
        const_int(Type::I8, v)
    }

    pub fn const_i16(&self, v: i64) -> Value {
        const_int(Type::I16, v)
    }

    pub fn const_i32(&self, v: i64) -> Value {
        const_int(Type::I32, v)
    }

    pub fn const_i64(&self, v: i64) -> Value {
        const_int(Type::I64, v)
    }

    pub fn const_int(&self, ty: Type, v: i64) -> Value {
        const_int(ty, v)
    }

    pub fn const_f32(&self, v: f64) -> Value {
        Value::f32(v)
    }

    pub fn const_f64(&self, v: f64) -> Value {
        Value::f64(v)
    }

    pub fn const_char(&self, c: u8) -> Value {
        const_int(Type::I8, i64::from(c))
    }

    pub fn const_null(&self) -> Value {
        Value::null()
    }

    /// The zero value of a scalar type (`false`, `0`, `0.0`, `null`).
    pub fn zero(&self, ty: &Type) -> Value {
        match ty {
            Type::Int(_) => const_int(ty.clone(), 0),
            Type::Float => Value::f32(0.0),
            Type::Double => Value::f64(0.0),
            Type::Ptr => Value::null(),
            other => Value::undef(other.clone()),
        }
    }

    /// Private NUL-terminated string constant; identical contents share
    /// one global.
    pub fn const_string(&mut self, s: &str) -> Value {
        if let Some(name) = self.strings.get(s) {
            return Value::global(name.clone());
        }
        let name = format!(".str.{}", self.strings.len());
        self.module.globals.push(Global {
            name: name.clone(),
            ty: Type::array(Type::I8, s.len() as u64 + 1),
            init: GlobalInit::Str(s.to_string()),
            constant: true,
        });
        self.strings.insert(s.to_string(), name.clone());
        Value::global(name)
    }

    // ── Functions ─────────────────────────────────────────────────

    /// Declare a function. Returns false if the name already exists.
    pub fn declare_function(
        &mut self,
        name: &str,
        params: Vec<Param>,
        ret: Type,
        variadic: bool,
    ) -> bool {
        if self.module.function(name).is_some() {
            return false;
        }
        self.module
            .functions
            .push(Function::declaration(name, params, ret, variadic));
        true
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.module.function(name).is_some()
    }

    pub fn function_ret(&self, name: &str) -> Option<Type> {
        self.module.function(name).map(|f| f.ret.clone())
    }

    /// Start the body of a declared function: creates `entry`, positions
    /// there, and returns the incoming parameter values.
    pub fn define_function(&mut self, name: &str) -> Option<Vec<Value>> {
        let idx = self.module.functions.iter().position(|f| f.name == name)?;
        self.current = Some(idx);
        let func = &mut self.module.functions[idx];
        func.next_reg = func.params.len() as u32;
        let params: Vec<Value> = func
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| Value::reg(Reg(i as u32), p.ty.clone()))
            .collect();
        let entry = self.append_block("entry");
        self.position_at_end(entry);
        Some(params)
    }

    /// Drop every block of the current function, turning it back into a
    /// declaration. Used when lowering its body failed.
    pub fn discard_body(&mut self) {
        if let Some(func) = self.func_mut() {
            func.blocks.clear();
            func.next_block = 0;
            func.next_reg = func.params.len() as u32;
        }
        self.insert = None;
    }

    pub fn end_function(&mut self) {
        self.current = None;
        self.insert = None;
    }

    pub fn current_function(&self) -> Option<&Function> {
        self.module.functions.get(self.current?)
    }

    fn func_mut(&mut self) -> Option<&mut Function> {
        let idx = self.current?;
        self.module.functions.get_mut(idx)
    }

    // ── Blocks ────────────────────────────────────────────────────

    /// Append a new block to the current function. Labels are made unique
    /// within the function.
    pub fn append_block(&mut self, label: &str) -> BlockId {
        let Some(func) = self.func_mut() else {
            log::warn!("append_block('{}') outside of a function", label);
            return BlockId(u32::MAX);
        };
        let id = BlockId(func.next_block);
        func.next_block += 1;
        let label = if func.blocks.iter().any(|b| b.label == label) {
            format!("{}.{}", label, id.0)
        } else {
            label.to_string()
        };
        log::trace!("block {} ({}) in @{}", label, id, func.name);
        func.blocks.push(BasicBlock {
            id,
            label,
            instrs: Vec::new(),
            term: None,
        });
        id
    }

    pub fn position_at_end(&mut self, block: BlockId) {
        self.insert = Some(block);
    }

    pub fn current_block(&self) -> Option<BlockId> {
        self.insert
    }

    pub fn block_label(&self, block: BlockId) -> String {
        self.current_function()
            .map(|f| f.label_of(block))
            .unwrap_or_else(|| block.to_string())
    }

    /// True when the insertion block already ends in a terminator, or
    /// there is no insertion block at all.
    pub fn is_terminated(&self) -> bool {
        let Some(id) = self.insert else {
            return true;
        };
        self.current_function()
            .and_then(|f| f.block(id))
            .map(BasicBlock::is_terminated)
            .unwrap_or(true)
    }

    pub fn erase_block(&mut self, block: BlockId) {
        if let Some(func) = self.func_mut() {
            func.blocks.retain(|b| b.id != block);
        }
        if self.insert == Some(block) {
            self.insert = None;
        }
    }

    /// Move a block after every other block (keeps merge/exit blocks
    /// after the bodies that were generated into them).
    pub fn move_block_to_end(&mut self, block: BlockId) {
        if let Some(func) = self.func_mut() {
            if let Some(pos) = func.blocks.iter().position(|b| b.id == block) {
                let b = func.blocks.remove(pos);
                func.blocks.push(b);
            }
        }
    }

    // ── Emission core ─────────────────────────────────────────────

    fn next_reg(&mut self) -> Reg {
        match self.func_mut() {
            Some(func) => {
                let r = Reg(func.next_reg);
                func.next_reg += 1;
                r
            }
            None => Reg(u32::MAX),
        }
    }

    fn push(&mut self, instr: Instr) {
        let Some(id) = self.insert else {
            log::warn!("dropping instruction without insertion point: {:?}", instr);
            return;
        };
        if let Some(block) = self.func_mut().and_then(|f| f.block_mut(id)) {
            if block.term.is_some() {
                log::trace!("dropping instruction after terminator in {}", block.label);
                return;
            }
            block.instrs.push(instr);
        }
    }

    fn emit(&mut self, ty: Type, make: impl FnOnce(Reg) -> Instr) -> Value {
        let dst = self.next_reg();
        self.push(make(dst));
        Value::reg(dst, ty)
    }

    fn terminate(&mut self, term: Terminator) {
        let Some(id) = self.insert else {
            return;
        };
        if let Some(block) = self.func_mut().and_then(|f| f.block_mut(id)) {
            if block.term.is_none() {
                block.term = Some(term);
            }
        }
    }

    // ── Memory ────────────────────────────────────────────────────

    /// Stack slot for one value of `ty`.
    pub fn alloca(&mut self, ty: Type) -> Value {
        self.emit(Type::PTR, |dst| Instr::Alloca { dst, ty })
    }

    pub fn load(&mut self, ty: Type, ptr: Value) -> Value {
        self.emit(ty.clone(), |dst| Instr::Load { dst, ty, ptr })
    }

    pub fn store(&mut self, value: Value, ptr: Value) {
        self.push(Instr::Store { value, ptr });
    }

    /// Address computation `&ptr[indices...]` over `base_ty`.
    pub fn gep(&mut self, base_ty: Type, ptr: Value, indices: Vec<Value>) -> Value {
        self.emit(Type::PTR, |dst| Instr::Gep {
            dst,
            base_ty,
            ptr,
            indices,
        })
    }

    /// Heap array of `count` elements, allocated through the tracker.
    pub fn heap_array(&mut self, elem: &Type, count: Value) -> Value {
        let elem_size = self.const_i64(self.size_of(elem).max(1) as i64);
        let count = self.int_cast(count, Type::I64, true);
        let bytes = self.mul(count, elem_size);
        self.tracked_malloc(bytes, 1)
    }

    // ── Arithmetic ────────────────────────────────────────────────

    pub fn binary(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> Value {
        if let Some(folded) = fold_binary(op, &lhs, &rhs) {
            return folded;
        }
        let ty = lhs.ty.clone();
        self.emit(ty, |dst| Instr::Binary { dst, op, lhs, rhs })
    }

    pub fn add(&mut self, lhs: Value, rhs: Value) -> Value {
        let op = if lhs.ty.is_fp() { BinaryOp::FAdd } else { BinaryOp::Add };
        self.binary(op, lhs, rhs)
    }

    pub fn sub(&mut self, lhs: Value, rhs: Value) -> Value {
        let op = if lhs.ty.is_fp() { BinaryOp::FSub } else { BinaryOp::Sub };
        self.binary(op, lhs, rhs)
    }

    pub fn mul(&mut self, lhs: Value, rhs: Value) -> Value {
        let op = if lhs.ty.is_fp() { BinaryOp::FMul } else { BinaryOp::Mul };
        self.binary(op, lhs, rhs)
    }

    pub fn div(&mut self, lhs: Value, rhs: Value) -> Value {
        let op = if lhs.ty.is_fp() { BinaryOp::FDiv } else { BinaryOp::SDiv };
        self.binary(op, lhs, rhs)
    }

    pub fn rem(&mut self, lhs: Value, rhs: Value) -> Value {
        let op = if lhs.ty.is_fp() { BinaryOp::FRem } else { BinaryOp::SRem };
        self.binary(op, lhs, rhs)
    }

    pub fn neg(&mut self, value: Value) -> Value {
        if value.ty.is_fp() {
            if let Some(v) = value.as_const_float() {
                return Value {
                    kind: ValueKind::Float(-v),
                    ty: value.ty,
                };
            }
            return self.emit(value.ty.clone(), |dst| Instr::FNeg { dst, value });
        }
        let zero = self.zero(&value.ty);
        self.binary(BinaryOp::Sub, zero, value)
    }

    /// Bitwise not; for `i1` this is logical negation.
    pub fn not(&mut self, value: Value) -> Value {
        let ones = const_int(value.ty.clone(), -1);
        self.binary(BinaryOp::Xor, value, ones)
    }

    pub fn icmp(&mut self, pred: IntPredicate, lhs: Value, rhs: Value) -> Value {
        if let (Some(a), Some(b)) = (lhs.as_const_int(), rhs.as_const_int()) {
            return Value::bool(eval_icmp(pred, a, b, lhs.ty.int_width().unwrap_or(64)));
        }
        self.emit(Type::I1, |dst| Instr::ICmp {
            dst,
            pred,
            lhs,
            rhs,
        })
    }

    pub fn fcmp(&mut self, pred: FloatPredicate, lhs: Value, rhs: Value) -> Value {
        if let (Some(a), Some(b)) = (lhs.as_const_float(), rhs.as_const_float()) {
            let r = match pred {
                FloatPredicate::Oeq => a == b,
                FloatPredicate::One => a != b && !a.is_nan() && !b.is_nan(),
                FloatPredicate::Olt => a < b,
                FloatPredicate::Ole => a <= b,
                FloatPredicate::Ogt => a > b,
                FloatPredicate::Oge => a >= b,
            };
            return Value::bool(r);
        }
        self.emit(Type::I1, |dst| Instr::FCmp {
            dst,
            pred,
            lhs,
            rhs,
        })
    }

    pub fn select(&mut self, cond: Value, on_true: Value, on_false: Value) -> Value {
        if let Some(c) = cond.as_const_int() {
            return if c != 0 { on_true } else { on_false };
        }
        let ty = on_true.ty.clone();
        self.emit(ty, |dst| Instr::Select {
            dst,
            cond,
            on_true,
            on_false,
        })
    }

    pub fn phi(&mut self, ty: Type, incoming: Vec<(Value, BlockId)>) -> Value {
        self.emit(ty.clone(), |dst| Instr::Phi { dst, ty, incoming })
    }

    // ── Casts ─────────────────────────────────────────────────────

    pub fn cast(&mut self, op: CastOp, value: Value, to: Type) -> Value {
        if let Some(folded) = fold_cast(op, &value, &to) {
            return folded;
        }
        self.emit(to.clone(), |dst| Instr::Cast { dst, op, value, to })
    }

    /// Integer resize. `i1` sources always zero-extend.
    pub fn int_cast(&mut self, value: Value, to: Type, signed: bool) -> Value {
        let (Some(from_w), Some(to_w)) = (value.ty.int_width(), to.int_width()) else {
            return value;
        };
        if from_w == to_w {
            value
        } else if from_w > to_w {
            self.cast(CastOp::Trunc, value, to)
        } else if signed && from_w > 1 {
            self.cast(CastOp::SExt, value, to)
        } else {
            self.cast(CastOp::ZExt, value, to)
        }
    }

    /// `float` ↔ `double`.
    pub fn fp_cast(&mut self, value: Value, to: Type) -> Value {
        match (&value.ty, &to) {
            (Type::Float, Type::Double) => self.cast(CastOp::FPExt, value, to),
            (Type::Double, Type::Float) => self.cast(CastOp::FPTrunc, value, to),
            _ => value,
        }
    }

    /// Signed int → float; `i1` is widened to `i32` first so true maps to 1.0.
    pub fn si_to_fp(&mut self, value: Value, to: Type) -> Value {
        let value = if value.ty.is_bool() {
            self.int_cast(value, Type::I32, false)
        } else {
            value
        };
        self.cast(CastOp::SIToFP, value, to)
    }

    pub fn fp_to_si(&mut self, value: Value, to: Type) -> Value {
        self.cast(CastOp::FPToSI, value, to)
    }

    // ── Calls ─────────────────────────────────────────────────────

    /// Call a declared function. Void calls yield `undef` of type void.
    pub fn call(&mut self, callee: &str, args: Vec<Value>) -> Value {
        let ret = match self.module.function(callee) {
            Some(f) => f.ret.clone(),
            None => {
                log::warn!("call to undeclared function @{}", callee);
                Type::VOID
            }
        };
        let callee = callee.to_string();
        if ret.is_void() {
            self.push(Instr::Call {
                dst: None,
                callee,
                args,
                ret: Type::VOID,
            });
            return Value::undef(Type::VOID);
        }
        self.emit(ret.clone(), |dst| Instr::Call {
            dst: Some(dst),
            callee,
            args,
            ret,
        })
    }

    pub fn declare_runtime(&mut self, f: RuntimeFn) {
        if !self.has_function(f.name()) {
            let (params, ret, variadic) = f.params();
            self.declare_function(f.name(), params, ret, variadic);
        }
    }

    pub fn call_runtime(&mut self, f: RuntimeFn, args: Vec<Value>) -> Value {
        self.declare_runtime(f);
        self.call(f.name(), args)
    }

    /// `printf(fmt, args...)`.
    pub fn printf(&mut self, fmt: &str, mut args: Vec<Value>) -> Value {
        let fmt = self.const_string(fmt);
        args.insert(0, fmt);
        self.call_runtime(RuntimeFn::Printf, args)
    }

    pub fn strlen(&mut self, s: Value) -> Value {
        self.call_runtime(RuntimeFn::Strlen, vec![s])
    }

    pub fn inline_asm(&mut self, code: &str, constraints: &str, args: Vec<Value>, side_effects: bool) {
        self.push(Instr::InlineAsm {
            code: code.to_string(),
            constraints: constraints.to_string(),
            args,
            side_effects,
        });
    }

    // ── Control flow ──────────────────────────────────────────────

    pub fn br(&mut self, target: BlockId) {
        self.terminate(Terminator::Br(target));
    }

    pub fn cond_br(&mut self, cond: Value, then_bb: BlockId, else_bb: BlockId) {
        self.terminate(Terminator::CondBr {
            cond,
            then_bb,
            else_bb,
        });
    }

    pub fn ret(&mut self, value: Value) {
        self.terminate(Terminator::Ret(Some(value)));
    }

    pub fn ret_void(&mut self) {
        self.terminate(Terminator::Ret(None));
    }

    pub fn unreachable(&mut self) {
        self.terminate(Terminator::Unreachable);
    }

    // ── Custom types ──────────────────────────────────────────────

    pub fn define_custom_type(&mut self, name: &str, fields: Vec<(String, Type)>) -> Type {
        let mut field_indices = BTreeMap::new();
        let mut field_types = Vec::with_capacity(fields.len());
        for (i, (fname, fty)) in fields.into_iter().enumerate() {
            field_indices.insert(fname, i as u32);
            field_types.push(fty);
        }
        self.module.structs.retain(|s| s.name != name);
        self.module.structs.push(StructType {
            name: name.to_string(),
            fields: field_types.clone(),
        });
        self.custom.insert(
            name.to_string(),
            CustomType {
                name: name.to_string(),
                field_indices,
                field_types,
                methods: BTreeMap::new(),
            },
        );
        Type::Struct(name.to_string())
    }

    pub fn custom_type(&self, name: &str) -> Option<&CustomType> {
        self.custom.get(name)
    }

    pub fn add_method(&mut self, type_name: &str, method: &str, symbol: &str) -> bool {
        match self.custom.get_mut(type_name) {
            Some(ct) => {
                ct.methods.insert(method.to_string(), symbol.to_string());
                true
            }
            None => false,
        }
    }

    /// Address and type of `obj.field`, where `obj` points at `type_name`.
    pub fn field_ptr(&mut self, type_name: &str, obj: Value, field: &str) -> Option<(Value, Type)> {
        let (idx, fty) = {
            let ct = self.custom.get(type_name)?;
            let (idx, fty) = ct.field(field)?;
            (idx, fty.clone())
        };
        let zero = self.const_i32(0);
        let index = self.const_i32(i64::from(idx));
        let ptr = self.gep(Type::Struct(type_name.to_string()), obj, vec![zero, index]);
        Some((ptr, fty))
    }

    /// Call `type_name.method` with the object pointer as first argument.
    pub fn method_call(
        &mut self,
        type_name: &str,
        method: &str,
        obj: Value,
        mut args: Vec<Value>,
    ) -> Option<Value> {
        let symbol = self.custom.get(type_name)?.methods.get(method)?.clone();
        args.insert(0, obj);
        Some(self.call(&symbol, args))
    }
}

// ─── Constant folding ──────────────────────────────────────────────

/// Integer constant normalised to its bit width (sign-extended, `i1` as 0/1).
fn const_int(ty: Type, v: i64) -> Value {
    let bits = ty.int_width().unwrap_or(64);
    Value::int(ty, normalize(v, bits))
}

fn normalize(v: i64, bits: u32) -> i64 {
    match bits {
        1 => v & 1,
        b if b >= 64 => v,
        b => {
            let shift = 64 - b;
            (v << shift) >> shift
        }
    }
}

fn eval_icmp(pred: IntPredicate, a: i64, b: i64, bits: u32) -> bool {
    let mask = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
    let (ua, ub) = (a as u64 & mask, b as u64 & mask);
    match pred {
        IntPredicate::Eq => a == b,
        IntPredicate::Ne => a != b,
        IntPredicate::Slt => a < b,
        IntPredicate::Sle => a <= b,
        IntPredicate::Sgt => a > b,
        IntPredicate::Sge => a >= b,
        IntPredicate::Ult => ua < ub,
        IntPredicate::Uge => ua >= ub,
    }
}

fn fold_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Option<Value> {
    if op.is_float_op() {
        let (a, b) = (lhs.as_const_float()?, rhs.as_const_float()?);
        let r = match op {
            BinaryOp::FAdd => a + b,
            BinaryOp::FSub => a - b,
            BinaryOp::FMul => a * b,
            BinaryOp::FDiv => a / b,
            BinaryOp::FRem => a % b,
            _ => return None,
        };
        return Some(if lhs.ty.is_float() { Value::f32(r) } else { Value::f64(r) });
    }
    let (a, b) = (lhs.as_const_int()?, rhs.as_const_int()?);
    let bits = lhs.ty.int_width()?;
    let r = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::Xor => a ^ b,
        BinaryOp::Shl if (0..i64::from(bits)).contains(&b) => a.wrapping_shl(b as u32),
        BinaryOp::AShr if (0..i64::from(bits)).contains(&b) => a >> b,
        // Division by zero and overflow stay a runtime matter.
        BinaryOp::SDiv if b != 0 && !(b == -1 && a == i64::MIN) => a / b,
        BinaryOp::SRem if b != 0 && !(b == -1 && a == i64::MIN) => a % b,
        _ => return None,
    };
    Some(const_int(lhs.ty.clone(), r))
}

fn fold_cast(op: CastOp, value: &Value, to: &Type) -> Option<Value> {
    match op {
        CastOp::Trunc | CastOp::SExt => Some(const_int(to.clone(), value.as_const_int()?)),
        CastOp::ZExt => {
            let v = value.as_const_int()?;
            let bits = value.ty.int_width()?;
            let mask = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
            Some(const_int(to.clone(), (v as u64 & mask) as i64))
        }
        CastOp::SIToFP => {
            let v = value.as_const_int()? as f64;
            Some(if to.is_float() { Value::f32(v) } else { Value::f64(v) })
        }
        CastOp::FPToSI => {
            let v = value.as_const_float()?;
            Some(const_int(to.clone(), v.trunc() as i64))
        }
        CastOp::FPExt | CastOp::FPTrunc => {
            let v = value.as_const_float()?;
            Some(if to.is_float() { Value::f32(v) } else { Value::f64(v) })
        }
    }
}
