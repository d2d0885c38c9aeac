use serde::{Deserialize, Serialize};

use crate::span::Spanned;

/// A parsed Aero source file, handed over by the front end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct File {
    /// Source file name, used to derive the IR module name.
    #[serde(default)]
    pub name: String,
    pub items: Vec<Spanned<Item>>,
}

/// Top-level items.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Item {
    Fn(FnDef),
    Struct(StructDef),
}

/// A custom aggregate type: ordered fields plus a method table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    pub name: Spanned<String>,
    pub fields: Vec<StructField>,
    #[serde(default)]
    pub methods: Vec<FnDef>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructField {
    pub name: Spanned<String>,
    pub ty: Spanned<TypeName>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FnDef {
    pub name: Spanned<String>,
    #[serde(default)]
    pub params: Vec<Param>,
    /// `None` means `void`.
    #[serde(default)]
    pub return_ty: Option<Spanned<TypeName>>,
    pub body: Spanned<Block>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: Spanned<String>,
    pub ty: Spanned<TypeName>,
}

/// A type as written in source: a base name plus array-dimension suffixes.
///
/// `int[3][4]` is `{ name: "int", dims: [Sized(3), Sized(4)] }`, `int[]`
/// is `{ name: "int", dims: [Unsized] }`. A trailing `*` on the name marks
/// a raw pointer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeName {
    pub name: String,
    #[serde(default)]
    pub dims: Vec<ArrayDim>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayDim {
    Unsized,
    Sized(Spanned<Expr>),
}

impl TypeName {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dims: Vec::new(),
        }
    }

    /// Parse the textual form `base[N][]...`. Sizes must be integer
    /// literals; anything else between brackets is kept as an identifier
    /// so it resolves at translation time.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let (base, mut rest) = match text.find('[') {
            Some(pos) => (&text[..pos], &text[pos..]),
            None => (text, ""),
        };
        let mut dims = Vec::new();
        while let Some(stripped) = rest.strip_prefix('[') {
            let Some(close) = stripped.find(']') else {
                break;
            };
            let inner = stripped[..close].trim();
            if inner.is_empty() {
                dims.push(ArrayDim::Unsized);
            } else if let Ok(n) = inner.parse::<f64>() {
                dims.push(ArrayDim::Sized(Spanned::dummy(Expr::Literal(Literal::Number(n)))));
            } else {
                dims.push(ArrayDim::Sized(Spanned::dummy(Expr::Var(inner.to_string()))));
            }
            rest = &stripped[close + 1..];
        }
        Self {
            name: base.trim().to_string(),
            dims,
        }
    }

    pub fn is_auto(&self) -> bool {
        self.name == "auto"
    }

    pub fn is_array(&self) -> bool {
        !self.dims.is_empty()
    }
}

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        for dim in &self.dims {
            match dim {
                ArrayDim::Unsized => write!(f, "[]")?,
                ArrayDim::Sized(expr) => match &expr.node {
                    Expr::Literal(Literal::Number(n)) => write!(f, "[{}]", n)?,
                    Expr::Var(name) => write!(f, "[{}]", name)?,
                    _ => write!(f, "[..]")?,
                },
            }
        }
        Ok(())
    }
}

/// A block of statements.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Spanned<Stmt>>,
}

/// One `if` / `else if` arm.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IfBranch {
    pub cond: Spanned<Expr>,
    pub body: Spanned<Block>,
}

/// Statements.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    Var {
        name: Spanned<String>,
        #[serde(default)]
        ty: Option<Spanned<TypeName>>,
        #[serde(default)]
        init: Option<Spanned<Expr>>,
    },
    Assign {
        place: Spanned<Place>,
        value: Spanned<Expr>,
    },
    /// `place op= value`; only the arithmetic operators are accepted.
    CompoundAssign {
        op: BinOp,
        place: Spanned<Place>,
        value: Spanned<Expr>,
    },
    Expr(Spanned<Expr>),
    If {
        branches: Vec<IfBranch>,
        #[serde(default)]
        else_block: Option<Spanned<Block>>,
    },
    While {
        cond: Spanned<Expr>,
        body: Spanned<Block>,
    },
    For {
        #[serde(default)]
        init: Option<Box<Spanned<Stmt>>>,
        #[serde(default)]
        cond: Option<Spanned<Expr>>,
        #[serde(default)]
        step: Option<Spanned<Expr>>,
        body: Spanned<Block>,
    },
    Break,
    Return(Option<Spanned<Expr>>),
    Block(Spanned<Block>),
    /// Foreign code compiled by an external toolchain (`c`, `cxx`, `asm`).
    Inline {
        lang: String,
        code: String,
        #[serde(default)]
        volatile: bool,
    },
}

/// L-value places (can appear on left side of assignment).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Place {
    Var(String),
    Field(Box<Spanned<Place>>, Spanned<String>),
    Index(Box<Spanned<Place>>, Vec<Spanned<Expr>>),
}

/// Expressions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Literal(Literal),
    Var(String),
    Paren(Box<Spanned<Expr>>),
    BinOp {
        op: BinOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Spanned<Expr>>,
    },
    /// `++place` / `--place`, yielding the updated value.
    Step {
        op: StepOp,
        place: Spanned<Place>,
    },
    Cast {
        target: Spanned<String>,
        expr: Box<Spanned<Expr>>,
    },
    Call {
        name: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },
    MethodCall {
        receiver: Box<Spanned<Expr>>,
        method: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },
    FieldAccess {
        expr: Box<Spanned<Expr>>,
        field: Spanned<String>,
    },
    ArrayInit(Vec<Spanned<Expr>>),
    Index {
        expr: Box<Spanned<Expr>>,
        indices: Vec<Spanned<Expr>>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    /// All numeric literals arrive as doubles; integral values lower to `i32`.
    Number(f64),
    Str(String),
    Char(char),
    Bool(bool),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Neq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
    #[serde(rename = "&")]
    BitAnd,
    #[serde(rename = "|")]
    BitOr,
    #[serde(rename = "^")]
    BitXor,
    #[serde(rename = "<<")]
    Shl,
    #[serde(rename = ">>")]
    Shr,
}

impl BinOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Neq => "!=",
            BinOp::Lt => "<",
            BinOp::Lte => "<=",
            BinOp::Gt => ">",
            BinOp::Gte => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Neq | BinOp::Lt | BinOp::Lte | BinOp::Gt | BinOp::Gte
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    #[serde(rename = "-")]
    Neg,
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "!")]
    Not,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOp {
    #[serde(rename = "++")]
    Inc,
    #[serde(rename = "--")]
    Dec,
}
