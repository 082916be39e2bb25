//! IR values (§3 "Value (sealed)").
//!
//! A sealed sum type, matched exhaustively at every consumer (§9, "Class
//! hierarchies ... become sealed sum types with exhaustive pattern
//! matching").

use serde::{Deserialize, Serialize};

use super::variable::Variable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    NullCoalesce,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Double(u64), // bit-pattern, so `Literal` stays `Eq`-comparable
    Bool(bool),
    Str(String),
    Null,
}

/// The sealed `Value` variant set from §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Constant(Literal),
    Var(Variable),
    Binary(BinaryOp, Box<Value>, Box<Value>),
    Unary(UnaryOp, Box<Value>),
    Call { receiver: Option<Box<Value>>, method_name: String, args: Vec<Value> },
    FieldAccess { receiver: Box<Value>, field_name: String },
    IndexAccess { receiver: Box<Value>, index: Box<Value> },
    NewObject { type_name: String, ctor_name: Option<String>, args: Vec<Value> },
    /// Present only in SSA form; the flow-insensitive fact extractor still
    /// projects a `Phi(Variable)` to an `Assign` per operand (§4.4).
    Phi(Variable),
}

impl Value {
    pub fn var(v: Variable) -> Self {
        Value::Var(v)
    }

    pub fn constant(lit: Literal) -> Self {
        Value::Constant(lit)
    }

    /// Every `Variable` directly referenced by this value, recursing through
    /// composite shapes. Used by the SSA renamer and the fact extractor.
    pub fn referenced_variables(&self) -> Vec<&Variable> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a Variable>) {
        match self {
            Value::Constant(_) => {}
            Value::Var(v) => out.push(v),
            Value::Binary(_, l, r) => {
                l.collect_variables(out);
                r.collect_variables(out);
            }
            Value::Unary(_, v) => v.collect_variables(out),
            Value::Call { receiver, args, .. } => {
                if let Some(r) = receiver {
                    r.collect_variables(out);
                }
                for a in args {
                    a.collect_variables(out);
                }
            }
            Value::FieldAccess { receiver, .. } => receiver.collect_variables(out),
            Value::IndexAccess { receiver, index } => {
                receiver.collect_variables(out);
                index.collect_variables(out);
            }
            Value::NewObject { args, .. } => {
                for a in args {
                    a.collect_variables(out);
                }
            }
            Value::Phi(v) => out.push(v),
        }
    }

    /// Applies `rename` to every `Var`/`Phi` leaf, returning a new value.
    /// This is the core of SSA renaming (§4.3 "Value renaming").
    pub fn map_variables(&self, rename: &mut impl FnMut(&Variable) -> Variable) -> Value {
        match self {
            Value::Constant(lit) => Value::Constant(lit.clone()),
            Value::Var(v) => Value::Var(rename(v)),
            Value::Binary(op, l, r) => {
                Value::Binary(*op, Box::new(l.map_variables(rename)), Box::new(r.map_variables(rename)))
            }
            Value::Unary(op, v) => Value::Unary(*op, Box::new(v.map_variables(rename))),
            Value::Call { receiver, method_name, args } => Value::Call {
                receiver: receiver.as_ref().map(|r| Box::new(r.map_variables(rename))),
                method_name: method_name.clone(),
                args: args.iter().map(|a| a.map_variables(rename)).collect(),
            },
            Value::FieldAccess { receiver, field_name } => Value::FieldAccess {
                receiver: Box::new(receiver.map_variables(rename)),
                field_name: field_name.clone(),
            },
            Value::IndexAccess { receiver, index } => Value::IndexAccess {
                receiver: Box::new(receiver.map_variables(rename)),
                index: Box::new(index.map_variables(rename)),
            },
            Value::NewObject { type_name, ctor_name, args } => Value::NewObject {
                type_name: type_name.clone(),
                ctor_name: ctor_name.clone(),
                args: args.iter().map(|a| a.map_variables(rename)).collect(),
            },
            Value::Phi(v) => Value::Phi(rename(v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referenced_variables_recurses_through_composites() {
        let value = Value::Binary(
            BinaryOp::Add,
            Box::new(Value::var(Variable::fresh("a"))),
            Box::new(Value::IndexAccess {
                receiver: Box::new(Value::var(Variable::fresh("xs"))),
                index: Box::new(Value::var(Variable::fresh("i"))),
            }),
        );
        let names: Vec<_> = value.referenced_variables().into_iter().map(|v| v.name.clone()).collect();
        assert_eq!(names, vec!["a", "xs", "i"]);
    }

    #[test]
    fn map_variables_renames_every_leaf() {
        let value = Value::Binary(
            BinaryOp::Add,
            Box::new(Value::var(Variable::fresh("a"))),
            Box::new(Value::var(Variable::fresh("a"))),
        );
        let renamed = value.map_variables(&mut |v| Variable::new(&v.name, 7));
        let names: Vec<_> = renamed.referenced_variables().into_iter().map(|v| v.version).collect();
        assert_eq!(names, vec![7, 7]);
    }
}
