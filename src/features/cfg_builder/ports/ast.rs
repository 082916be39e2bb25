//! A minimal, read-only AST shape covering exactly the surface-language
//! kinds listed in §3. The real parser's tree is adapted to this shape by
//! the host; C2 pattern-matches it exhaustively, raising
//! [`crate::errors::IrBuildError::UnsupportedConstruct`] for anything
//! outside it (§9 "Dynamic typing and reflective AST nodes").

use crate::features::ir_model::BinaryOp;

#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Function {
        name: String,
        params: Vec<String>,
        body: Stmt,
    },
    Method {
        name: String,
        params: Vec<String>,
        body: Stmt,
    },
    Constructor {
        class_name: String,
        params: Vec<String>,
        field_initializers: Vec<(String, Expr)>,
        /// The synthetic receiver for a `super(...)`/redirecting
        /// `this(...)` invocation, if any (§4.2 "Constructor
        /// initializers").
        delegating_call: Option<(DelegatingTarget, String, Vec<Expr>)>,
        body: Stmt,
    },
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Declaration::Function { name, .. } => name,
            Declaration::Method { name, .. } => name,
            Declaration::Constructor { class_name, .. } => class_name,
        }
    }

    pub fn params(&self) -> &[String] {
        match self {
            Declaration::Function { params, .. }
            | Declaration::Method { params, .. }
            | Declaration::Constructor { params, .. } => params,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegatingTarget {
    Super,
    This,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Vec<Stmt>),
    VarDecl { name: String, init: Option<Expr>, offset: u32 },
    If { condition: Expr, then_branch: Box<Stmt>, else_branch: Option<Box<Stmt>>, offset: u32 },
    While { condition: Expr, body: Box<Stmt>, offset: u32 },
    DoWhile { body: Box<Stmt>, condition: Expr, offset: u32 },
    For { init: Vec<Stmt>, condition: Option<Expr>, update: Vec<Expr>, body: Box<Stmt>, offset: u32 },
    ForIn { loop_var: Option<String>, iterable: Expr, body: Box<Stmt>, offset: u32 },
    Return { value: Option<Expr>, offset: u32 },
    Break { offset: u32 },
    Continue { offset: u32 },
    Switch { discriminant: Expr, cases: Vec<SwitchCase>, offset: u32 },
    Try { body: Box<Stmt>, catches: Vec<CatchClause>, finally: Option<Box<Stmt>>, offset: u32 },
    Throw { exception: Expr, offset: u32 },
    Assert { condition: Expr, offset: u32 },
    Empty,
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// `None` marks the `default:` case.
    pub value: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub exception_type: Option<String>,
    pub body: Stmt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortCircuitOp {
    And,
    Or,
    NullCoalesce,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CascadeSection {
    Call { method_name: String, args: Vec<Expr> },
    FieldSet { field_name: String, value: Expr },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLiteral(i64, u32),
    DoubleLiteral(f64, u32),
    BoolLiteral(bool, u32),
    StringLiteral(String, u32),
    NullLiteral(u32),
    Identifier(String, u32),
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr>, offset: u32 },
    Unary { op: crate::features::ir_model::UnaryOp, operand: Box<Expr>, offset: u32 },
    Postfix { op: PostfixOp, operand: Box<Expr>, offset: u32 },
    PropertyAccess { receiver: Box<Expr>, name: String, offset: u32 },
    NullAwarePropertyAccess { receiver: Box<Expr>, name: String, offset: u32 },
    Index { receiver: Box<Expr>, index: Box<Expr>, offset: u32 },
    MethodInvocation { receiver: Option<Box<Expr>>, method_name: String, args: Vec<Expr>, offset: u32 },
    ObjectCreation { type_name: String, ctor_name: Option<String>, args: Vec<Expr>, offset: u32 },
    Conditional { condition: Box<Expr>, then_expr: Box<Expr>, else_expr: Box<Expr>, offset: u32 },
    Cascade { target: Box<Expr>, sections: Vec<CascadeSection>, offset: u32 },
    ShortCircuit { op: ShortCircuitOp, left: Box<Expr>, right: Box<Expr>, offset: u32 },
    Await { future: Box<Expr>, offset: u32 },
    Cast { operand: Box<Expr>, target_type: String, is_nullable: bool, offset: u32 },
    TypeTest { operand: Box<Expr>, target_type: String, negated: bool, offset: u32 },
    /// `target op= value`, or plain `target = value` when `op` is `None`.
    Assignment { target: Box<Expr>, op: Option<BinaryOp>, value: Box<Expr>, offset: u32 },
}

impl Expr {
    pub fn offset(&self) -> u32 {
        match self {
            Expr::IntLiteral(_, o)
            | Expr::DoubleLiteral(_, o)
            | Expr::BoolLiteral(_, o)
            | Expr::StringLiteral(_, o)
            | Expr::NullLiteral(o)
            | Expr::Identifier(_, o) => *o,
            Expr::Binary { offset, .. }
            | Expr::Unary { offset, .. }
            | Expr::Postfix { offset, .. }
            | Expr::PropertyAccess { offset, .. }
            | Expr::NullAwarePropertyAccess { offset, .. }
            | Expr::Index { offset, .. }
            | Expr::MethodInvocation { offset, .. }
            | Expr::ObjectCreation { offset, .. }
            | Expr::Conditional { offset, .. }
            | Expr::Cascade { offset, .. }
            | Expr::ShortCircuit { offset, .. }
            | Expr::Await { offset, .. }
            | Expr::Cast { offset, .. }
            | Expr::TypeTest { offset, .. }
            | Expr::Assignment { offset, .. } => *offset,
        }
    }
}
