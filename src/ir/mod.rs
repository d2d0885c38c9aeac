//! Typed, basic-block intermediate representation.
//!
//! Three-address form with virtual registers and explicit control flow,
//! shaped after LLVM IR so the downstream toolchain can consume the
//! printed module directly:
//!   - Every instruction that produces a value writes a fresh `Reg`.
//!   - Every basic block ends in exactly one `Terminator`.
//!   - Pointers are opaque; loads, stores and address arithmetic carry
//!     the element type explicitly.
//!
//! `IrBuilder` (in `builder`) is the emission facade the translator talks
//! to; `verify` checks structural well-formedness of a finished module.

pub mod builder;
pub mod gc;
pub mod runtime;
pub mod verify;


use std::fmt;

pub use builder::{CustomType, IrBuilder};
pub use gc::AllocStrategy;
pub use runtime::RuntimeFn;

// ─── Types ────────────────────────────────────────────────────────

/// IR value types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    /// Integer of the given bit width (1, 8, 16, 32, 64).
    Int(u32),
    Float,
    Double,
    /// Opaque pointer.
    Ptr,
    Array(Box<Type>, u64),
    /// Named struct, see `Module::structs`.
    Struct(String),
}

impl Type {
    pub const VOID: Type = Type::Void;
    pub const I1: Type = Type::Int(1);
    pub const I8: Type = Type::Int(8);
    pub const I16: Type = Type::Int(16);
    pub const I32: Type = Type::Int(32);
    pub const I64: Type = Type::Int(64);
    pub const F32: Type = Type::Float;
    pub const F64: Type = Type::Double;
    pub const PTR: Type = Type::Ptr;

    pub fn array(elem: Type, len: u64) -> Type {
        Type::Array(Box::new(elem), len)
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Type::Int(_))
    }

    pub fn is_int_of(&self, bits: u32) -> bool {
        *self == Type::Int(bits)
    }

    pub fn is_bool(&self) -> bool {
        self.is_int_of(1)
    }

    pub fn is_char(&self) -> bool {
        self.is_int_of(8)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::Float)
    }

    pub fn is_double(&self) -> bool {
        matches!(self, Type::Double)
    }

    /// `float` or `double`.
    pub fn is_fp(&self) -> bool {
        matches!(self, Type::Float | Type::Double)
    }

    pub fn is_ptr(&self) -> bool {
        matches!(self, Type::Ptr)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(..))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Type::Struct(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_int() || self.is_fp()
    }

    pub fn int_width(&self) -> Option<u32> {
        match self {
            Type::Int(bits) => Some(*bits),
            _ => None,
        }
    }

    /// Element type and length of an array type.
    pub fn array_parts(&self) -> Option<(&Type, u64)> {
        match self {
            Type::Array(elem, len) => Some((elem, *len)),
            _ => None,
        }
    }

    /// Innermost element type of a (possibly nested) array.
    pub fn scalar_elem(&self) -> &Type {
        match self {
            Type::Array(elem, _) => elem.scalar_elem(),
            other => other,
        }
    }

    /// Number of nested array dimensions.
    pub fn array_rank(&self) -> usize {
        match self {
            Type::Array(elem, _) => 1 + elem.array_rank(),
            _ => 0,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int(bits) => write!(f, "i{}", bits),
            Type::Float => write!(f, "float"),
            Type::Double => write!(f, "double"),
            Type::Ptr => write!(f, "ptr"),
            Type::Array(elem, len) => write!(f, "[{} x {}]", len, elem),
            Type::Struct(name) => write!(f, "%{}", name),
        }
    }
}

// ─── Registers, Blocks, Values ────────────────────────────────────

/// A virtual register, numbered per function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reg(pub u32);

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%v{}", self.0)
    }
}

/// Stable identifier of a basic block within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Int(i64),
    Float(f64),
    Null,
    Undef,
    Reg(Reg),
    Global(String),
}

/// A typed IR operand.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub kind: ValueKind,
    pub ty: Type,
}

impl Value {
    pub fn int(ty: Type, v: i64) -> Self {
        Self {
            kind: ValueKind::Int(v),
            ty,
        }
    }

    pub fn bool(b: bool) -> Self {
        Self::int(Type::I1, b as i64)
    }

    pub fn f32(v: f64) -> Self {
        Self {
            kind: ValueKind::Float(v as f32 as f64),
            ty: Type::Float,
        }
    }

    pub fn f64(v: f64) -> Self {
        Self {
            kind: ValueKind::Float(v),
            ty: Type::Double,
        }
    }

    pub fn null() -> Self {
        Self {
            kind: ValueKind::Null,
            ty: Type::Ptr,
        }
    }

    pub fn undef(ty: Type) -> Self {
        Self {
            kind: ValueKind::Undef,
            ty,
        }
    }

    pub fn reg(reg: Reg, ty: Type) -> Self {
        Self {
            kind: ValueKind::Reg(reg),
            ty,
        }
    }

    pub fn global(name: impl Into<String>) -> Self {
        Self {
            kind: ValueKind::Global(name.into()),
            ty: Type::Ptr,
        }
    }

    pub fn as_const_int(&self) -> Option<i64> {
        match self.kind {
            ValueKind::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_const_float(&self) -> Option<f64> {
        match self.kind {
            ValueKind::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_reg(&self) -> Option<Reg> {
        match self.kind {
            ValueKind::Reg(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_const(&self) -> bool {
        matches!(
            self.kind,
            ValueKind::Int(_) | ValueKind::Float(_) | ValueKind::Null
        )
    }

    /// Operand with its type prefix, e.g. `i32 %v3`.
    pub fn typed(&self) -> String {
        format!("{} {}", self.ty, self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValueKind::Int(v) if self.ty.is_bool() => {
                write!(f, "{}", if *v != 0 { "true" } else { "false" })
            }
            ValueKind::Int(v) => write!(f, "{}", v),
            ValueKind::Float(v) => write!(f, "{:?}", v),
            ValueKind::Null => write!(f, "null"),
            ValueKind::Undef => write!(f, "undef"),
            ValueKind::Reg(r) => write!(f, "{}", r),
            ValueKind::Global(name) => write!(f, "@{}", name),
        }
    }
}

// ─── Operations ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // ── Integer ──
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
    Shl,
    AShr,
    And,
    Or,
    Xor,
    // ── Floating ──
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
}

impl BinaryOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::SRem => "srem",
            BinaryOp::Shl => "shl",
            BinaryOp::AShr => "ashr",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::FAdd => "fadd",
            BinaryOp::FSub => "fsub",
            BinaryOp::FMul => "fmul",
            BinaryOp::FDiv => "fdiv",
            BinaryOp::FRem => "frem",
        }
    }

    pub fn is_float_op(&self) -> bool {
        matches!(
            self,
            BinaryOp::FAdd | BinaryOp::FSub | BinaryOp::FMul | BinaryOp::FDiv | BinaryOp::FRem
        )
    }
}

/// Integer comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntPredicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Ult,
    Uge,
}

impl fmt::Display for IntPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntPredicate::Eq => "eq",
            IntPredicate::Ne => "ne",
            IntPredicate::Slt => "slt",
            IntPredicate::Sle => "sle",
            IntPredicate::Sgt => "sgt",
            IntPredicate::Sge => "sge",
            IntPredicate::Ult => "ult",
            IntPredicate::Uge => "uge",
        };
        write!(f, "{}", s)
    }
}

/// Ordered floating-point comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatPredicate {
    Oeq,
    One,
    Olt,
    Ole,
    Ogt,
    Oge,
}

impl fmt::Display for FloatPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FloatPredicate::Oeq => "oeq",
            FloatPredicate::One => "one",
            FloatPredicate::Olt => "olt",
            FloatPredicate::Ole => "ole",
            FloatPredicate::Ogt => "ogt",
            FloatPredicate::Oge => "oge",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
    FPTrunc,
    FPExt,
    SIToFP,
    FPToSI,
}

impl fmt::Display for CastOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CastOp::Trunc => "trunc",
            CastOp::ZExt => "zext",
            CastOp::SExt => "sext",
            CastOp::FPTrunc => "fptrunc",
            CastOp::FPExt => "fpext",
            CastOp::SIToFP => "sitofp",
            CastOp::FPToSI => "fptosi",
        };
        write!(f, "{}", s)
    }
}

/// Non-terminator instructions.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// dst = stack slot holding one `ty`.
    Alloca { dst: Reg, ty: Type },
    /// dst = *ptr
    Load { dst: Reg, ty: Type, ptr: Value },
    /// *ptr = value
    Store { value: Value, ptr: Value },
    /// dst = lhs op rhs
    Binary {
        dst: Reg,
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
    },
    /// dst = -value (floating)
    FNeg { dst: Reg, value: Value },
    ICmp {
        dst: Reg,
        pred: IntPredicate,
        lhs: Value,
        rhs: Value,
    },
    FCmp {
        dst: Reg,
        pred: FloatPredicate,
        lhs: Value,
        rhs: Value,
    },
    Cast {
        dst: Reg,
        op: CastOp,
        value: Value,
        to: Type,
    },
    /// dst = address of `ptr[indices...]` interpreted as `base_ty`.
    Gep {
        dst: Reg,
        base_ty: Type,
        ptr: Value,
        indices: Vec<Value>,
    },
    Call {
        dst: Option<Reg>,
        callee: String,
        args: Vec<Value>,
        ret: Type,
    },
    Phi {
        dst: Reg,
        ty: Type,
        incoming: Vec<(Value, BlockId)>,
    },
    Select {
        dst: Reg,
        cond: Value,
        on_true: Value,
        on_false: Value,
    },
    InlineAsm {
        code: String,
        constraints: String,
        args: Vec<Value>,
        side_effects: bool,
    },
}

impl Instr {
    pub fn dst(&self) -> Option<Reg> {
        match self {
            Instr::Alloca { dst, .. }
            | Instr::Load { dst, .. }
            | Instr::Binary { dst, .. }
            | Instr::FNeg { dst, .. }
            | Instr::ICmp { dst, .. }
            | Instr::FCmp { dst, .. }
            | Instr::Cast { dst, .. }
            | Instr::Gep { dst, .. }
            | Instr::Phi { dst, .. }
            | Instr::Select { dst, .. } => Some(*dst),
            Instr::Call { dst, .. } => *dst,
            Instr::Store { .. } | Instr::InlineAsm { .. } => None,
        }
    }

    /// Name of the called function, if this is a call.
    pub fn callee(&self) -> Option<&str> {
        match self {
            Instr::Call { callee, .. } => Some(callee),
            _ => None,
        }
    }

    fn render(&self, label: &dyn Fn(BlockId) -> String) -> String {
        match self {
            Instr::Alloca { dst, ty } => format!("{} = alloca {}", dst, ty),
            Instr::Load { dst, ty, ptr } => format!("{} = load {}, {}", dst, ty, ptr.typed()),
            Instr::Store { value, ptr } => format!("store {}, {}", value.typed(), ptr.typed()),
            Instr::Binary { dst, op, lhs, rhs } => {
                format!("{} = {} {}, {}", dst, op.mnemonic(), lhs.typed(), rhs)
            }
            Instr::FNeg { dst, value } => format!("{} = fneg {}", dst, value.typed()),
            Instr::ICmp {
                dst,
                pred,
                lhs,
                rhs,
            } => format!("{} = icmp {} {}, {}", dst, pred, lhs.typed(), rhs),
            Instr::FCmp {
                dst,
                pred,
                lhs,
                rhs,
            } => format!("{} = fcmp {} {}, {}", dst, pred, lhs.typed(), rhs),
            Instr::Cast { dst, op, value, to } => {
                format!("{} = {} {} to {}", dst, op, value.typed(), to)
            }
            Instr::Gep {
                dst,
                base_ty,
                ptr,
                indices,
            } => {
                let idx: Vec<String> = indices.iter().map(Value::typed).collect();
                format!(
                    "{} = getelementptr inbounds {}, {}, {}",
                    dst,
                    base_ty,
                    ptr.typed(),
                    idx.join(", ")
                )
            }
            Instr::Call {
                dst,
                callee,
                args,
                ret,
            } => {
                let a: Vec<String> = args.iter().map(Value::typed).collect();
                match dst {
                    Some(d) => format!("{} = call {} @{}({})", d, ret, callee, a.join(", ")),
                    None => format!("call {} @{}({})", ret, callee, a.join(", ")),
                }
            }
            Instr::Phi { dst, ty, incoming } => {
                let inc: Vec<String> = incoming
                    .iter()
                    .map(|(v, b)| format!("[ {}, %{} ]", v, label(*b)))
                    .collect();
                format!("{} = phi {} {}", dst, ty, inc.join(", "))
            }
            Instr::Select {
                dst,
                cond,
                on_true,
                on_false,
            } => format!(
                "{} = select {}, {}, {}",
                dst,
                cond.typed(),
                on_true.typed(),
                on_false.typed()
            ),
            Instr::InlineAsm {
                code,
                constraints,
                args,
                side_effects,
            } => {
                let a: Vec<String> = args.iter().map(Value::typed).collect();
                format!(
                    "call void asm {}\"{}\", \"{}\"({})",
                    if *side_effects { "sideeffect " } else { "" },
                    escape_bytes(code.as_bytes()),
                    constraints,
                    a.join(", ")
                )
            }
        }
    }
}

/// Block-ending control transfer.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Br(BlockId),
    CondBr {
        cond: Value,
        then_bb: BlockId,
        else_bb: BlockId,
    },
    Ret(Option<Value>),
    Unreachable,
}

impl Terminator {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Br(t) => vec![*t],
            Terminator::CondBr {
                then_bb, else_bb, ..
            } => vec![*then_bb, *else_bb],
            Terminator::Ret(_) | Terminator::Unreachable => Vec::new(),
        }
    }

    fn render(&self, label: &dyn Fn(BlockId) -> String) -> String {
        match self {
            Terminator::Br(t) => format!("br label %{}", label(*t)),
            Terminator::CondBr {
                cond,
                then_bb,
                else_bb,
            } => format!(
                "br {}, label %{}, label %{}",
                cond.typed(),
                label(*then_bb),
                label(*else_bb)
            ),
            Terminator::Ret(Some(v)) => format!("ret {}", v.typed()),
            Terminator::Ret(None) => "ret void".to_string(),
            Terminator::Unreachable => "unreachable".to_string(),
        }
    }
}

// ─── Containers ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub id: BlockId,
    pub label: String,
    pub instrs: Vec<Instr>,
    pub term: Option<Terminator>,
}

impl BasicBlock {
    pub fn is_terminated(&self) -> bool {
        self.term.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A function declaration or definition. Declarations have no blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Type,
    pub variadic: bool,
    pub blocks: Vec<BasicBlock>,
    pub(crate) next_reg: u32,
    pub(crate) next_block: u32,
}

impl Function {
    pub fn declaration(name: impl Into<String>, params: Vec<Param>, ret: Type, variadic: bool) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
            variadic,
            blocks: Vec::new(),
            next_reg: 0,
            next_block: 0,
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn entry(&self) -> Option<BlockId> {
        self.blocks.first().map(|b| b.id)
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut BasicBlock> {
        self.blocks.iter_mut().find(|b| b.id == id)
    }

    /// First block whose label starts with `prefix`.
    pub fn block_named(&self, prefix: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.label.starts_with(prefix))
    }

    /// All instructions of the function in layout order.
    pub fn instrs(&self) -> impl Iterator<Item = &Instr> {
        self.blocks.iter().flat_map(|b| b.instrs.iter())
    }

    /// Names of all called functions in layout order.
    pub fn callees(&self) -> Vec<&str> {
        self.instrs().filter_map(Instr::callee).collect()
    }

    pub fn label_of(&self, id: BlockId) -> String {
        self.block(id)
            .map(|b| b.label.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn signature(&self) -> String {
        let mut params: Vec<String> = if self.is_declaration() {
            self.params.iter().map(|p| p.ty.to_string()).collect()
        } else {
            self.params
                .iter()
                .enumerate()
                .map(|(i, p)| format!("{} {}", p.ty, Reg(i as u32)))
                .collect()
        };
        if self.variadic {
            params.push("...".to_string());
        }
        format!("{} @{}({})", self.ret, self.name, params.join(", "))
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_declaration() {
            return writeln!(f, "declare {}", self.signature());
        }
        writeln!(f, "define {} {{", self.signature())?;
        let label = |id: BlockId| self.label_of(id);
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}:", block.label)?;
            for instr in &block.instrs {
                writeln!(f, "  {}", instr.render(&label))?;
            }
            if let Some(term) = &block.term {
                writeln!(f, "  {}", term.render(&label))?;
            }
        }
        writeln!(f, "}}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GlobalInit {
    /// NUL-terminated byte string.
    Str(String),
    /// Zero-initialised storage of the global's type.
    Zero,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub name: String,
    pub ty: Type,
    pub init: GlobalInit,
    pub constant: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub name: String,
    pub fields: Vec<Type>,
}

/// IR produced by an external compiler for an inline foreign-code block.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignUnit {
    pub lang: String,
    pub symbol: String,
    pub ir: String,
}

/// Optimisation level requested for the downstream stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptLevel {
    #[default]
    O0,
    O1,
    O2,
    O3,
    Os,
    Oz,
}

impl OptLevel {
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(OptLevel::O0),
            1 => Some(OptLevel::O1),
            2 => Some(OptLevel::O2),
            3 => Some(OptLevel::O3),
            4 => Some(OptLevel::Os),
            5 => Some(OptLevel::Oz),
            _ => None,
        }
    }
}

impl fmt::Display for OptLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A translation unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub name: String,
    pub opt_level: OptLevel,
    pub structs: Vec<StructType>,
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
    pub foreign: Vec<ForeignUnit>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn function_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.functions.iter_mut().find(|f| f.name == name)
    }

    pub fn global(&self, name: &str) -> Option<&Global> {
        self.globals.iter().find(|g| g.name == name)
    }

    pub fn struct_type(&self, name: &str) -> Option<&StructType> {
        self.structs.iter().find(|s| s.name == name)
    }

    /// Contents of a string constant global.
    pub fn string_constant(&self, name: &str) -> Option<&str> {
        match &self.global(name)?.init {
            GlobalInit::Str(s) => Some(s),
            GlobalInit::Zero => None,
        }
    }

    /// Allocation size in bytes, with natural alignment for struct fields.
    pub fn size_of(&self, ty: &Type) -> u64 {
        match ty {
            Type::Void => 0,
            Type::Int(bits) => u64::from(bits.div_ceil(8)).max(1),
            Type::Float => 4,
            Type::Double | Type::Ptr => 8,
            Type::Array(elem, len) => self.size_of(elem) * len,
            Type::Struct(name) => {
                let Some(st) = self.struct_type(name) else {
                    return 8;
                };
                let mut size = 0u64;
                let mut max_align = 1u64;
                for field in &st.fields {
                    let align = self.align_of(field);
                    max_align = max_align.max(align);
                    size = size.div_ceil(align) * align + self.size_of(field);
                }
                size.div_ceil(max_align) * max_align
            }
        }
    }

    fn align_of(&self, ty: &Type) -> u64 {
        match ty {
            Type::Array(elem, _) => self.align_of(elem),
            Type::Struct(name) => self
                .struct_type(name)
                .map(|st| st.fields.iter().map(|f| self.align_of(f)).max().unwrap_or(1))
                .unwrap_or(8),
            other => self.size_of(other).max(1),
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        writeln!(f, "; opt-level = {}", self.opt_level)?;
        if !self.structs.is_empty() {
            writeln!(f)?;
            for st in &self.structs {
                let fields: Vec<String> = st.fields.iter().map(|t| t.to_string()).collect();
                writeln!(f, "%{} = type {{ {} }}", st.name, fields.join(", "))?;
            }
        }
        if !self.globals.is_empty() {
            writeln!(f)?;
            for g in &self.globals {
                let kind = if g.constant { "constant" } else { "global" };
                match &g.init {
                    GlobalInit::Str(s) => {
                        let mut bytes = s.as_bytes().to_vec();
                        bytes.push(0);
                        writeln!(
                            f,
                            "@{} = private {} [{} x i8] c\"{}\"",
                            g.name,
                            kind,
                            bytes.len(),
                            escape_bytes(&bytes)
                        )?;
                    }
                    GlobalInit::Zero => {
                        writeln!(f, "@{} = internal {} {} zeroinitializer", g.name, kind, g.ty)?
                    }
                }
            }
        }
        let (decls, defs): (Vec<&Function>, Vec<&Function>) =
            self.functions.iter().partition(|f| f.is_declaration());
        if !decls.is_empty() {
            writeln!(f)?;
            for func in decls {
                write!(f, "{}", func)?;
            }
        }
        for func in defs {
            writeln!(f)?;
            write!(f, "{}", func)?;
        }
        for unit in &self.foreign {
            writeln!(f)?;
            writeln!(f, "; foreign {} unit for @{}", unit.lang, unit.symbol)?;
            writeln!(f, "{}", unit.ir.trim_end())?;
        }
        Ok(())
    }
}

/// LLVM-style string escaping: printable ASCII verbatim, the rest as `\XX`.
fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if (0x20..0x7f).contains(&b) && b != b'"' && b != b'\\' {
            out.push(b as char);
        } else {
            out.push_str(&format!("\\{:02X}", b));
        }
    }
    out
}
