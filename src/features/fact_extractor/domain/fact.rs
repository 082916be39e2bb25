//! The Datalog fact schema (§4.4, §3 "Datalog Fact").

use serde::{Deserialize, Serialize};

use crate::features::ir_model::BlockId;

/// A ground atom: either an integer SSA variable/site/block id, or a
/// string field name / heap id (§3 "Datalog Fact").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Atom {
    Id(i64),
    Text(String),
}

impl From<i64> for Atom {
    fn from(v: i64) -> Self {
        Atom::Id(v)
    }
}

impl From<&str> for Atom {
    fn from(v: &str) -> Self {
        Atom::Text(v.to_string())
    }
}

impl From<String> for Atom {
    fn from(v: String) -> Self {
        Atom::Text(v)
    }
}

/// `(predicateName, args)`. Facts are value-equal; a fact set collapses
/// duplicates (§3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fact {
    pub predicate: String,
    pub args: Vec<Atom>,
}

impl Fact {
    pub fn new(predicate: impl Into<String>, args: Vec<Atom>) -> Self {
        Self { predicate: predicate.into(), args }
    }

    pub fn flow(pred: BlockId, succ: BlockId) -> Self {
        Self::new("Flow", vec![Atom::Id(pred as i64), Atom::Id(succ as i64)])
    }

    pub fn reachable(entry: BlockId) -> Self {
        Self::new("Reachable", vec![Atom::Id(entry as i64)])
    }

    pub fn assign(target: i64, source: i64) -> Self {
        Self::new("Assign", vec![Atom::Id(target), Atom::Id(source)])
    }

    pub fn assign_at(block: BlockId, target: i64, source: i64) -> Self {
        Self::new("AssignAt", vec![Atom::Id(block as i64), Atom::Id(target), Atom::Id(source)])
    }

    pub fn alloc(expr_id: i64, heap_id: impl Into<String>) -> Self {
        Self::new("Alloc", vec![Atom::Id(expr_id), Atom::Text(heap_id.into())])
    }

    pub fn alloc_at(block: BlockId, expr_id: i64, heap_id: impl Into<String>) -> Self {
        Self::new("AllocAt", vec![Atom::Id(block as i64), Atom::Id(expr_id), Atom::Text(heap_id.into())])
    }

    pub fn call(call_site: i64, receiver_id: i64, method_name: impl Into<String>, result_id: i64) -> Self {
        Self::new("Call", vec![Atom::Id(call_site), Atom::Id(receiver_id), Atom::Text(method_name.into()), Atom::Id(result_id)])
    }

    pub fn call_at(block: BlockId, call_site: i64, receiver_id: i64, method_name: impl Into<String>, result_id: i64) -> Self {
        Self::new(
            "CallAt",
            vec![Atom::Id(block as i64), Atom::Id(call_site), Atom::Id(receiver_id), Atom::Text(method_name.into()), Atom::Id(result_id)],
        )
    }

    pub fn load_field(base_id: i64, field_name: impl Into<String>, target_id: i64) -> Self {
        Self::new("LoadField", vec![Atom::Id(base_id), Atom::Text(field_name.into()), Atom::Id(target_id)])
    }

    pub fn load_field_at(block: BlockId, base_id: i64, field_name: impl Into<String>, target_id: i64) -> Self {
        Self::new("LoadFieldAt", vec![Atom::Id(block as i64), Atom::Id(base_id), Atom::Text(field_name.into()), Atom::Id(target_id)])
    }

    pub fn store_field(base_id: i64, field_name: impl Into<String>, source_id: i64) -> Self {
        Self::new("StoreField", vec![Atom::Id(base_id), Atom::Text(field_name.into()), Atom::Id(source_id)])
    }

    pub fn store_field_at(block: BlockId, base_id: i64, field_name: impl Into<String>, source_id: i64) -> Self {
        Self::new("StoreFieldAt", vec![Atom::Id(block as i64), Atom::Id(base_id), Atom::Text(field_name.into()), Atom::Id(source_id)])
    }

    pub fn phi_at(block: BlockId, target_id: i64, pred_block: BlockId, source_id: i64) -> Self {
        Self::new("PhiAt", vec![Atom::Id(block as i64), Atom::Id(target_id), Atom::Id(pred_block as i64), Atom::Id(source_id)])
    }
}

/// The synthetic field name index access is modeled under (§4.4 "Index
/// access is modeled as field access").
pub const INDEX_FIELD_NAME: &str = "[]";
