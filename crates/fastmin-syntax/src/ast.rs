//! AST node types.
//!
//! Everything is an expression, a binding pattern, or a statement. Identifiers
//! that participate in scoping carry a `symbol` slot that scope analysis fills
//! with a handle into its symbol arena; the tree never points back at scopes.

use crate::span::Span;

/// One parsed source unit inside a merged program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Unit identifier: a path, or a synthetic index for inline code.
    pub name: String,
    /// First offset of this unit in the program-wide position space.
    pub base: u32,
    /// Length of the unit text in bytes.
    pub len: u32,
}

impl SourceUnit {
    /// Whether `offset` belongs to this unit.
    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.base && offset <= self.base + self.len
    }
}

/// The root of a (possibly merged) program tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    /// Top-level statements of every unit, in unit order.
    pub body: Vec<Stmt>,
    /// Units in the order they were appended.
    pub units: Vec<SourceUnit>,
}

impl Program {
    /// Offset at which the next appended unit starts.
    ///
    /// Units are separated by one unused offset so that an end-exclusive
    /// span of one unit never touches the next.
    pub fn next_base(&self) -> u32 {
        self.units.last().map_or(0, |u| u.base + u.len + 1)
    }

    /// Find the unit owning `offset`.
    pub fn unit_at(&self, offset: u32) -> Option<&SourceUnit> {
        let idx = self.units.partition_point(|u| u.base <= offset);
        idx.checked_sub(1)
            .and_then(|i| self.units.get(i))
            .filter(|u| u.contains(offset))
    }
}

/// Handle into the symbol arena built by scope analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An identifier that takes part in lexical scoping.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
    /// Resolved symbol, filled in by scope analysis.
    pub symbol: Option<SymbolId>,
    /// Output name assigned by the mangler; `name` keeps the original.
    pub mangled: Option<String>,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
            symbol: None,
            mangled: None,
        }
    }

    /// The name written to the output.
    pub fn output_name(&self) -> &str {
        self.mangled.as_deref().unwrap_or(&self.name)
    }
}

// =============================================================================
// Expressions
// =============================================================================

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Synthetic identifier reference.
    pub fn ident(name: impl Into<String>) -> Self {
        Self::new(
            ExprKind::Ident(Ident::new(name, Span::SYNTHETIC)),
            Span::SYNTHETIC,
        )
    }

    /// Synthetic string literal.
    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ExprKind::String(value.into()), Span::SYNTHETIC)
    }

    /// Synthetic `object[key]` access.
    pub fn index(object: Expr, key: Expr) -> Self {
        Self::new(
            ExprKind::Member {
                object: Box::new(object),
                property: MemberProp::Computed(Box::new(key)),
            },
            Span::SYNTHETIC,
        )
    }

    /// Synthetic `left = right`.
    pub fn assign(left: Expr, right: Expr) -> Self {
        Self::new(
            ExprKind::Assign {
                op: AssignOp::Assign,
                left: Box::new(left),
                right: Box::new(right),
            },
            Span::SYNTHETIC,
        )
    }

    /// Whether this is a literal with no side effects.
    pub fn is_constant(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Null | ExprKind::Bool(_) | ExprKind::Number(_) | ExprKind::String(_)
        )
    }
}

/// Expression kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // === Literals ===
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Regex { pattern: String, flags: String },
    /// Template literal: cooked quasis interleaved with substitutions.
    Template { quasis: Vec<String>, exprs: Vec<Expr> },

    // === Identifiers ===
    Ident(Ident),
    This,

    // === Compound Expressions ===
    /// Array literal; `None` is a hole.
    Array(Vec<Option<Expr>>),
    Object(Vec<Property>),
    Function(Box<Function>),
    Arrow(Box<ArrowFunction>),

    // === Operations ===
    Unary { op: UnaryOp, arg: Box<Expr> },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        arg: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Sequence(Vec<Expr>),

    // === Member Access and Calls ===
    Member {
        object: Box<Expr>,
        property: MemberProp,
    },
    Call { callee: Box<Expr>, args: Vec<Expr> },
    New { callee: Box<Expr>, args: Vec<Expr> },
    Spread(Box<Expr>),
}

/// The property side of a member access.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberProp {
    /// `a.name`: a member name, never a lexical reference.
    Name(String),
    /// `a[expr]`
    Computed(Box<Expr>),
}

// =============================================================================
// Statements
// =============================================================================

/// A statement node.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Synthetic expression statement.
    pub fn expr(expr: Expr) -> Self {
        Self::new(StmtKind::Expr(expr), Span::SYNTHETIC)
    }
}

/// Statement kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Var { kind: VarKind, decls: Vec<VarDeclarator> },
    Function(Box<Function>),
    Block(Vec<Stmt>),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    Switch { discriminant: Expr, cases: Vec<SwitchCase> },
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    ForIn {
        left: ForInit,
        right: Expr,
        body: Box<Stmt>,
    },
    ForOf {
        left: ForInit,
        right: Expr,
        body: Box<Stmt>,
    },
    While { test: Expr, body: Box<Stmt> },
    DoWhile { body: Box<Stmt>, test: Expr },
    Break { label: Option<String> },
    Continue { label: Option<String> },
    Return { arg: Option<Expr> },
    Throw { arg: Expr },
    Try {
        block: Vec<Stmt>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Stmt>>,
    },
    Labeled { label: String, body: Box<Stmt> },
    With { object: Expr, body: Box<Stmt> },
    Expr(Expr),
    Empty,
    Debugger,
}

// =============================================================================
// Bindings
// =============================================================================

/// A binding pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub kind: BindingKind,
    pub span: Span,
}

impl Binding {
    pub fn new(kind: BindingKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Binding pattern kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingKind {
    /// Simple identifier: `x`
    Ident(Ident),
    /// Array pattern: `[a, , ...rest]`
    Array(Vec<Option<ArrayPatternElement>>),
    /// Object pattern: `{a, b: c, ...rest}`
    Object(Vec<ObjectPatternProperty>),
}

/// Element in an array pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayPatternElement {
    pub binding: Binding,
    pub default: Option<Expr>,
    pub rest: bool,
}

/// Property in an object pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPatternProperty {
    pub key: PropertyKey,
    pub value: Binding,
    pub default: Option<Expr>,
    pub shorthand: bool,
    pub rest: bool,
}

// =============================================================================
// Supporting Types
// =============================================================================

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,  // -
    Plus,   // +
    Not,    // !
    BitNot, // ~
    Typeof, // typeof
    Void,   // void
    Delete, // delete
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,

    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    BitOr,
    BitXor,
    BitAnd,
    Shl,
    Shr,
    UShr,

    And,
    Or,
    NullishCoalesce,

    In,
    Instanceof,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    PowAssign,
    ShlAssign,
    ShrAssign,
    UShrAssign,
    BitOrAssign,
    BitXorAssign,
    BitAndAssign,
    AndAssign,
    OrAssign,
    NullishAssign,
}

/// Update operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

/// Variable declaration kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

impl VarKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VarKind::Var => "var",
            VarKind::Let => "let",
            VarKind::Const => "const",
        }
    }
}

/// Variable declarator.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclarator {
    pub binding: Binding,
    pub init: Option<Expr>,
    pub span: Span,
}

/// Object literal property.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: PropertyKey,
    pub value: Expr,
    pub kind: PropertyKind,
    /// Written as `{ name }` in the source.
    pub shorthand: bool,
    pub span: Span,
}

/// Property key.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    Ident(String),
    /// Quoted key: `{ "name": 1 }`
    String(String),
    Number(f64),
    Computed(Box<Expr>),
}

/// Property kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Init,
    Get,
    Set,
    Method,
    /// `...expr` inside an object literal; the key is unused.
    Spread,
}

/// Switch case.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// `None` for `default:`.
    pub test: Option<Expr>,
    pub consequent: Vec<Stmt>,
    pub span: Span,
}

/// Catch clause.
#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub param: Option<Binding>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// For loop initializer.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Var { kind: VarKind, decls: Vec<VarDeclarator> },
    Expr(Expr),
}

/// Function declaration or expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: Option<Ident>,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// Arrow function.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowFunction {
    pub params: Vec<Param>,
    pub body: ArrowBody,
    pub span: Span,
}

/// Arrow function body.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

/// Function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub binding: Binding,
    pub default: Option<Expr>,
    pub rest: bool,
    pub span: Span,
}
