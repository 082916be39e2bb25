//! Null-safety verification (§4.7 "Null verifier").
//!
//! Walks the nullability component of the fixpoint, re-running the
//! interpreter's branch refinement (`refine_branch`) on each `Branch` so
//! a dereference guarded by `if (v != null)` is classified against the
//! refined, not the pre-branch, state.

use crate::features::abstract_domains::{eval_value, refine_branch, step, FixpointResult};
use crate::features::ir_model::{Cfg, Instruction, Value};
use crate::features::verifiers::domain::{NullCheckResult, NullSafety};

pub fn check_nulls(cfg: &Cfg, fixpoint: &FixpointResult) -> Vec<NullCheckResult> {
    let mut results = Vec::new();
    for block in cfg.blocks() {
        let mut state = block_entry_state(cfg, fixpoint, block.id);
        for instruction in &block.instructions {
            match instruction {
                Instruction::LoadField { base, offset, .. } | Instruction::StoreField { base, offset, .. } => {
                    results.push(classify(block.id, *offset, base, &state));
                }
                Instruction::Call { receiver: Some(receiver), offset, .. } => {
                    results.push(classify(block.id, *offset, receiver, &state));
                }
                Instruction::NullCheck { operand, offset, .. } => {
                    // The `!` assertion forces non-null downstream regardless
                    // of what the domain can prove here, so it is itself the
                    // dereference site worth reporting (§8 scenario E).
                    results.push(classify(block.id, *offset, operand, &state));
                }
                _ => {}
            }
            step(instruction, &mut state);
        }
    }
    results
}

/// A block's starting state, refined by its single guarding branch when
/// one exists. A block with more than one predecessor (a merge point)
/// already carries the joined — and therefore unrefined — state from the
/// fixpoint, since two incoming edges can disagree on the refinement.
fn block_entry_state(cfg: &Cfg, fixpoint: &FixpointResult, block_id: crate::features::ir_model::BlockId) -> crate::features::abstract_domains::State {
    let block = cfg.block(block_id);
    if let [pred_id] = block.predecessors[..] {
        let pred = cfg.block(pred_id);
        if let Some(Instruction::Branch { condition, then_block, else_block, .. }) = pred.instructions.last() {
            let pred_state = fixpoint.exit_states.get(&pred_id).cloned().unwrap_or_default();
            let (then_state, else_state) = refine_branch(condition, &pred_state);
            if *then_block == block_id && *else_block != block_id {
                return then_state;
            }
            if *else_block == block_id && *then_block != block_id {
                return else_state;
            }
        }
    }
    fixpoint.entry_states.get(&block_id).cloned().unwrap_or_default()
}

fn classify(block: crate::features::ir_model::BlockId, offset: u32, receiver: &Value, state: &crate::features::abstract_domains::State) -> NullCheckResult {
    let Value::Var(v) = receiver else {
        return NullCheckResult { block, offset, variable: String::new(), safety: NullSafety::Safe };
    };
    let value = eval_value(receiver, state);
    let safety = if value.nullability.is_definitely_null() {
        NullSafety::DefinitelyNull
    } else if value.nullability.may_be_null() {
        NullSafety::Unknown
    } else {
        NullSafety::Safe
    };
    NullCheckResult { block, offset, variable: v.canonical_name(), safety }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::abstract_domains::run_fixpoint;
    use crate::features::ir_model::{BinaryOp, Cfg, Literal, Variable};

    /// Scenario E from §8: a field load on a variable assigned `null`
    /// directly is classified as definitely-null.
    #[test]
    fn load_field_on_null_literal_is_definitely_null() {
        let mut cfg = Cfg::new("read");
        let v = Variable::new("v", 0);
        let result = Variable::new("result", 0);
        cfg.block_mut(cfg.entry).push(Instruction::Assign { target: v.clone(), value: Value::Constant(Literal::Null), offset: 0 });
        cfg.block_mut(cfg.entry).push(Instruction::LoadField { base: Value::Var(v), field_name: "x".to_string(), result, offset: 1 });
        cfg.block_mut(cfg.entry).push(Instruction::Return { value: None, offset: 2 });

        let fixpoint = run_fixpoint(&cfg, "read").unwrap();
        let results = check_nulls(&cfg, &fixpoint);
        assert_eq!(results[0].safety, NullSafety::DefinitelyNull);
    }

    /// Scenario E from §8: asserting a nullable parameter non-null with no
    /// prior refinement reports the assertion site itself as unknown, while
    /// the field access it guards is safe once the assertion has run.
    #[test]
    fn null_assertion_on_unrefined_parameter_is_unknown_but_guards_the_field_load() {
        let mut cfg = Cfg::new("len");
        let s = Variable::new("s", 0);
        let asserted = Variable::new("s", 1);
        let result = Variable::new("result", 0);
        cfg.block_mut(cfg.entry).push(Instruction::NullCheck { operand: Value::Var(s), result: asserted.clone(), offset: 10 });
        cfg.block_mut(cfg.entry).push(Instruction::LoadField { base: Value::Var(asserted), field_name: "length".to_string(), result, offset: 11 });
        cfg.block_mut(cfg.entry).push(Instruction::Return { value: None, offset: 12 });

        let fixpoint = run_fixpoint(&cfg, "len").unwrap();
        let results = check_nulls(&cfg, &fixpoint);
        let assertion_site = results.iter().find(|r| r.offset == 10).unwrap();
        assert_eq!(assertion_site.safety, NullSafety::Unknown);
        let field_load_site = results.iter().find(|r| r.offset == 11).unwrap();
        assert_eq!(field_load_site.safety, NullSafety::Safe);
    }

    #[test]
    fn field_load_behind_non_null_guard_is_safe() {
        let mut cfg = Cfg::new("read");
        let then_block = cfg.new_block();
        let else_block = cfg.new_block();
        cfg.connect(cfg.entry, then_block);
        cfg.connect(cfg.entry, else_block);
        let v = Variable::new("v", 0);
        let result = Variable::new("result", 0);
        cfg.block_mut(cfg.entry).push(Instruction::Branch {
            condition: Value::Binary(BinaryOp::NotEq, Box::new(Value::Var(v.clone())), Box::new(Value::Constant(Literal::Null))),
            then_block,
            else_block,
            offset: 0,
        });
        cfg.block_mut(then_block).push(Instruction::LoadField { base: Value::Var(v), field_name: "x".to_string(), result, offset: 1 });
        cfg.block_mut(then_block).push(Instruction::Return { value: None, offset: 2 });
        cfg.block_mut(else_block).push(Instruction::Return { value: None, offset: 3 });

        let fixpoint = run_fixpoint(&cfg, "read").unwrap();
        let results = check_nulls(&cfg, &fixpoint);
        let then_block_result = results.iter().find(|r| r.block == then_block).unwrap();
        assert_eq!(then_block_result.safety, NullSafety::Safe);
    }
}
