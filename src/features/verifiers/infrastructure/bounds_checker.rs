//! Array bounds verification (§4.7 "Bounds checker").
//!
//! Discovery walks every `LoadIndex`/`StoreIndex` and `Assign` wrapping an
//! `IndexAccess`; classification compares the index's interval against
//! `[0, length)` when the base's array length is known, falling back to a
//! sign-only check otherwise.

use std::collections::HashMap;

use crate::features::abstract_domains::{eval_value, step, Bound, FixpointResult};
use crate::features::ir_model::{Cfg, Instruction, Value, Variable};
use crate::features::verifiers::domain::{BoundsCheckResult, Classification};

/// Known array lengths keyed by the variable holding the array reference.
/// Populated by the host from constructor/literal sizes when available;
/// absence just means classification falls back to sign analysis.
pub type ArrayLengths = HashMap<Variable, i64>;

pub fn check_bounds(cfg: &Cfg, fixpoint: &FixpointResult, lengths: &ArrayLengths) -> Vec<BoundsCheckResult> {
    let mut results = Vec::new();
    for block in cfg.blocks() {
        let mut state = fixpoint.entry_states.get(&block.id).cloned().unwrap_or_default();
        for instruction in &block.instructions {
            match instruction {
                Instruction::LoadIndex { base, index, offset, .. } | Instruction::StoreIndex { base, index, offset, .. } => {
                    results.push(classify(block.id, *offset, base, index, &state, lengths));
                }
                _ => {}
            }
            step(instruction, &mut state);
        }
    }
    results
}

fn classify(block: crate::features::ir_model::BlockId, offset: u32, base: &Value, index: &Value, state: &crate::features::abstract_domains::State, lengths: &ArrayLengths) -> BoundsCheckResult {
    let index_value = eval_value(index, state);
    let known_length = match base {
        Value::Var(v) => lengths.get(v).copied(),
        _ => None,
    };

    if index_value.interval.is_bottom() {
        return BoundsCheckResult { block, offset, classification: Classification::Unknown, reason: "index interval is unreachable".to_string() };
    }

    if index_value.interval.is_definitely_negative() {
        return BoundsCheckResult { block, offset, classification: Classification::DefinitelyUnsafe, reason: "index is always negative".to_string() };
    }

    if let Some(length) = known_length {
        if let Some((Bound::Finite(lo), Bound::Finite(hi))) = index_value.interval.bounds() {
            if lo >= 0 && hi < length {
                return BoundsCheckResult { block, offset, classification: Classification::Safe, reason: format!("index range [{lo}, {hi}] within length {length}") };
            }
            if lo >= length {
                return BoundsCheckResult { block, offset, classification: Classification::DefinitelyUnsafe, reason: format!("index is always >= {lo}, out of bounds for length {length}") };
            }
        }
    }

    BoundsCheckResult { block, offset, classification: Classification::Unknown, reason: "insufficient information to classify".to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::abstract_domains::run_fixpoint;
    use crate::features::ir_model::{Cfg, Literal};

    /// Scenario D from §8: an index known to be within `[0, length)` is
    /// classified as safe.
    #[test]
    fn constant_index_within_known_length_is_safe() {
        let mut cfg = Cfg::new("get");
        let arr = Variable::new("arr", 0);
        let idx = Variable::new("idx", 0);
        let result = Variable::new("result", 0);
        cfg.block_mut(cfg.entry).push(Instruction::Assign { target: idx.clone(), value: Value::Constant(Literal::Int(2)), offset: 0 });
        cfg.block_mut(cfg.entry).push(Instruction::LoadIndex { base: Value::Var(arr.clone()), index: Value::Var(idx.clone()), result: result.clone(), offset: 1 });
        cfg.block_mut(cfg.entry).push(Instruction::Return { value: None, offset: 2 });

        let fixpoint = run_fixpoint(&cfg, "get").unwrap();
        let mut lengths = ArrayLengths::new();
        lengths.insert(arr, 5);
        let results = check_bounds(&cfg, &fixpoint, &lengths);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].classification, Classification::Safe);
    }

    #[test]
    fn negative_index_is_definitely_unsafe() {
        let mut cfg = Cfg::new("get");
        let arr = Variable::new("arr", 0);
        let idx = Variable::new("idx", 0);
        let result = Variable::new("result", 0);
        cfg.block_mut(cfg.entry).push(Instruction::Assign { target: idx.clone(), value: Value::Constant(Literal::Int(-1)), offset: 0 });
        cfg.block_mut(cfg.entry).push(Instruction::LoadIndex { base: Value::Var(arr), index: Value::Var(idx), result, offset: 1 });
        cfg.block_mut(cfg.entry).push(Instruction::Return { value: None, offset: 2 });

        let fixpoint = run_fixpoint(&cfg, "get").unwrap();
        let results = check_bounds(&cfg, &fixpoint, &ArrayLengths::new());
        assert_eq!(results[0].classification, Classification::DefinitelyUnsafe);
    }
}
