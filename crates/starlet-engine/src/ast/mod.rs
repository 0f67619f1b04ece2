//! Abstract Syntax Tree (AST) definitions.
//!
//! The parser produces a [`File`]; the resolver then annotates it in place:
//! every [`Ident`] receives a [`BindingId`] into the file's binding arena and
//! every function (`def` or `lambda`) receives a [`FunctionInfo`] describing
//! its locals, cells and free variables. The compiler only accepts files that
//! have been annotated.

use std::fmt;

use crate::lexer::{IntLiteral, Position};
use crate::options::FileOptions;

/// A complete source file.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    /// The file name used in positions and tracebacks
    pub path: String,
    /// The toplevel statements
    pub stmts: Vec<Stmt>,
    /// Dialect the file was parsed and resolved with
    pub options: FileOptions,
    /// Resolution results, filled in by the resolver
    pub module: Option<ModuleInfo>,
}

/// Index into [`ModuleInfo::bindings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(pub u32);

/// The class of a resolved binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// A function local not captured by any nested function
    Local,
    /// A function local captured by a nested function, stored in a cell
    Cell,
    /// A variable of an enclosing function, reached through a cell
    Free,
    /// A module-level variable
    Global,
    /// A name supplied by the host at Init time
    Predeclared,
    /// A built-in name of the language
    Universal,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scope::Local => "local",
            Scope::Cell => "cell",
            Scope::Free => "free",
            Scope::Global => "global",
            Scope::Predeclared => "predeclared",
            Scope::Universal => "universal",
        };
        f.write_str(name)
    }
}

/// A resolved binding shared by every occurrence of the same variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// The binding class
    pub scope: Scope,
    /// Slot index; meaning depends on `scope`
    pub index: usize,
    /// The variable name
    pub name: String,
    /// Position of the first binding occurrence (or first use)
    pub first: Position,
}

/// Module-wide resolution results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModuleInfo {
    /// Arena of all bindings in the file
    pub bindings: Vec<Binding>,
    /// Global bindings, indexed by `Binding::index` of `Scope::Global`
    pub globals: Vec<BindingId>,
    /// Predeclared names referenced by the file
    pub predeclared: Vec<String>,
    /// Universal names referenced by the file
    pub universals: Vec<String>,
    /// Locals of the toplevel function (always empty in this dialect)
    pub toplevel: FunctionInfo,
}

impl ModuleInfo {
    /// Returns the binding for an identifier id.
    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id.0 as usize]
    }
}

/// Per-function resolution results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionInfo {
    /// Local bindings (parameters first), indexed by local slot
    pub locals: Vec<BindingId>,
    /// Indices into `locals` of variables captured by nested functions
    pub cells: Vec<usize>,
    /// Bindings in the enclosing function that this function captures
    pub freevars: Vec<BindingId>,
    /// Whether the function has a `*args` parameter
    pub has_varargs: bool,
    /// Whether the function has a `**kwargs` parameter
    pub has_kwargs: bool,
}

/// An identifier occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    /// The name of the identifier
    pub name: String,
    /// Where it occurs
    pub pos: Position,
    /// Filled in by the resolver
    pub binding: Option<BindingId>,
}

impl Ident {
    /// Creates an unresolved identifier.
    pub fn new(name: impl Into<String>, pos: Position) -> Self {
        Self {
            name: name.into(),
            pos,
            binding: None,
        }
    }
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `lhs = rhs` or `lhs op= rhs`
    Assign(AssignStmt),
    /// A bare expression
    Expr(ExprStmt),
    /// Function definition
    Def(DefStmt),
    /// `if`/`elif`/`else`
    If(IfStmt),
    /// `for x in y`
    For(ForStmt),
    /// `while cond`
    While(WhileStmt),
    /// `break`, `continue` or `pass`
    Branch(BranchStmt),
    /// `return [expr]`
    Return(ReturnStmt),
}

impl Stmt {
    /// Returns the starting position of the statement.
    pub fn pos(&self) -> Position {
        match self {
            Stmt::Assign(s) => s.lhs.pos(),
            Stmt::Expr(s) => s.expr.pos(),
            Stmt::Def(s) => s.pos,
            Stmt::If(s) => s.pos,
            Stmt::For(s) => s.pos,
            Stmt::While(s) => s.pos,
            Stmt::Branch(s) => s.pos,
            Stmt::Return(s) => s.pos,
        }
    }
}

/// An assignment statement.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    /// Position of the `=` or `op=` token
    pub op_pos: Position,
    /// `None` for plain `=`, the operator for augmented assignment
    pub op: Option<BinaryOp>,
    /// The target(s)
    pub lhs: Expr,
    /// The value
    pub rhs: Expr,
}

/// An expression statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprStmt {
    /// The expression
    pub expr: Expr,
}

/// A function definition.
#[derive(Debug, Clone, PartialEq)]
pub struct DefStmt {
    /// Position of the `def` keyword
    pub pos: Position,
    /// The function name
    pub name: Ident,
    /// The parameters
    pub params: Vec<Param>,
    /// The function body
    pub body: Vec<Stmt>,
    /// Leading string literal of the body
    pub doc: Option<String>,
    /// Filled in by the resolver
    pub function: Option<FunctionInfo>,
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// `name`
    Required(Ident),
    /// `name = default`
    Optional(Ident, Expr),
    /// `*name`
    Args(Ident),
    /// `**name`
    Kwargs(Ident),
}

impl Param {
    /// Returns the parameter's identifier.
    pub fn ident(&self) -> &Ident {
        match self {
            Param::Required(id) | Param::Optional(id, _) | Param::Args(id) | Param::Kwargs(id) => id,
        }
    }

    /// Returns the parameter's identifier mutably.
    pub fn ident_mut(&mut self) -> &mut Ident {
        match self {
            Param::Required(id) | Param::Optional(id, _) | Param::Args(id) | Param::Kwargs(id) => id,
        }
    }
}

/// An if statement; `elif` chains nest in `else_body`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    /// Position of `if` or `elif`
    pub pos: Position,
    /// The condition
    pub cond: Expr,
    /// The then branch
    pub then_body: Vec<Stmt>,
    /// The else branch (possibly empty)
    pub else_body: Vec<Stmt>,
}

/// A for statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    /// Position of `for`
    pub pos: Position,
    /// Loop variable(s)
    pub vars: Expr,
    /// The iterable
    pub iterable: Expr,
    /// The loop body
    pub body: Vec<Stmt>,
}

/// A while statement.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    /// Position of `while`
    pub pos: Position,
    /// The condition
    pub cond: Expr,
    /// The loop body
    pub body: Vec<Stmt>,
}

/// Kind of a [`BranchStmt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// `pass`
    Pass,
}

/// `break`, `continue` or `pass`.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchStmt {
    /// Position of the keyword
    pub pos: Position,
    /// Which keyword
    pub kind: BranchKind,
}

/// A return statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    /// Position of `return`
    pub pos: Position,
    /// The returned value, if any
    pub result: Option<Expr>,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Identifier
    Ident(Ident),
    /// Literal constant
    Literal(Literal),
    /// Tuple, parenthesized or not
    Tuple(TupleExpr),
    /// `[a, b]`
    List(ListExpr),
    /// `{k: v}`
    Dict(DictExpr),
    /// `x[i]`
    Index(IndexExpr),
    /// `f(args)`
    Call(CallExpr),
    /// `op x`
    Unary(UnaryExpr),
    /// `x op y`
    Binary(BinaryExpr),
    /// `a if cond else b`
    Cond(CondExpr),
    /// `lambda params: body`
    Lambda(LambdaExpr),
}

impl Expr {
    /// Returns the starting position of the expression.
    pub fn pos(&self) -> Position {
        match self {
            Expr::Ident(id) => id.pos,
            Expr::Literal(lit) => lit.pos,
            Expr::Tuple(t) => t.lparen.unwrap_or_else(|| t.elems.first().map(Expr::pos).unwrap_or_default()),
            Expr::List(l) => l.lbrack,
            Expr::Dict(d) => d.lbrace,
            Expr::Index(i) => i.x.pos(),
            Expr::Call(c) => c.func.pos(),
            Expr::Unary(u) => u.op_pos,
            Expr::Binary(b) => b.x.pos(),
            Expr::Cond(c) => c.then_expr.pos(),
            Expr::Lambda(l) => l.pos,
        }
    }

    /// Returns true for a comma-separated tuple written without parentheses.
    pub fn is_implicit_tuple(&self) -> bool {
        matches!(self, Expr::Tuple(t) if t.lparen.is_none())
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    /// Where it occurs
    pub pos: Position,
    /// The value
    pub value: LiteralValue,
}

/// The value of a [`Literal`].
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Integer
    Int(IntLiteral),
    /// Float
    Float(f64),
    /// String
    String(String),
    /// Bytes
    Bytes(Vec<u8>),
}

/// A tuple expression.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleExpr {
    /// Position of `(` when parenthesized
    pub lparen: Option<Position>,
    /// The elements
    pub elems: Vec<Expr>,
}

/// A list expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ListExpr {
    /// Position of `[`
    pub lbrack: Position,
    /// The elements
    pub elems: Vec<Expr>,
}

/// A dict expression.
#[derive(Debug, Clone, PartialEq)]
pub struct DictExpr {
    /// Position of `{`
    pub lbrace: Position,
    /// Key/value entries
    pub entries: Vec<DictEntry>,
}

/// One `key: value` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct DictEntry {
    /// Position of `:`
    pub colon: Position,
    /// The key
    pub key: Expr,
    /// The value
    pub value: Expr,
}

/// An index expression.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpr {
    /// The operand
    pub x: Box<Expr>,
    /// Position of `[`
    pub lbrack: Position,
    /// The index
    pub index: Box<Expr>,
}

/// A call expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    /// The callee
    pub func: Box<Expr>,
    /// Position of `(`
    pub lparen: Position,
    /// The arguments, in source order
    pub args: Vec<Arg>,
}

/// A call argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// `value`
    Positional(Expr),
    /// `name = value`
    Named(Ident, Expr),
    /// `*value`
    Star(Expr),
    /// `**value`
    StarStar(Expr),
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `~`
    Tilde,
    /// `not`
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Tilde => "~",
            UnaryOp::Not => "not",
        };
        f.write_str(s)
    }
}

/// A unary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    /// The operator
    pub op: UnaryOp,
    /// Position of the operator
    pub op_pos: Position,
    /// The operand
    pub x: Box<Expr>,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `or`
    Or,
    /// `and`
    And,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `in`
    In,
    /// `not in`
    NotIn,
    /// `|`
    Pipe,
    /// `^`
    Caret,
    /// `&`
    Amp,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `//`
    SlashSlash,
    /// `%`
    Percent,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::In => "in",
            BinaryOp::NotIn => "not in",
            BinaryOp::Pipe => "|",
            BinaryOp::Caret => "^",
            BinaryOp::Amp => "&",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Star => "*",
            BinaryOp::Slash => "/",
            BinaryOp::SlashSlash => "//",
            BinaryOp::Percent => "%",
        };
        f.write_str(s)
    }
}

/// A binary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    /// The operator
    pub op: BinaryOp,
    /// Position of the operator token
    pub op_pos: Position,
    /// Left operand
    pub x: Box<Expr>,
    /// Right operand
    pub y: Box<Expr>,
}

/// A conditional expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CondExpr {
    /// Position of `if`
    pub if_pos: Position,
    /// The condition
    pub cond: Box<Expr>,
    /// Value when true
    pub then_expr: Box<Expr>,
    /// Value when false
    pub else_expr: Box<Expr>,
}

/// A lambda expression.
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaExpr {
    /// Position of `lambda`
    pub pos: Position,
    /// The parameters
    pub params: Vec<Param>,
    /// The body
    pub body: Box<Expr>,
    /// Filled in by the resolver
    pub function: Option<FunctionInfo>,
}
