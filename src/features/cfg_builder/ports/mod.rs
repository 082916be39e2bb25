//! The parser interface the core depends on (§6 "Parser interface",
//! §3 "Compilation Unit"). The core never depends on anything beyond the
//! node kinds defined here, identifier text, source offsets, and a
//! line/column resolver — the real parser and its AST live outside this
//! crate entirely.

pub mod ast;

pub use ast::{
    CascadeSection, CatchClause, Declaration, DelegatingTarget, Expr, PostfixOp, ShortCircuitOp,
    Stmt, SwitchCase,
};
