//! Cyclomatic and cognitive complexity (§4.8).
//!
//! Both walk the already-lowered CFG rather than re-deriving decision
//! points from the AST: every `if`/`while`/`do`/`for`/`for-in`/ternary and
//! short-circuit `&&`/`||` the builder (§4.2) lowers becomes exactly one
//! `Branch` instruction with two distinct successors, and `switch` cases
//! become one `Branch` per test (the `default` arm is a plain fallthrough
//! edge, so it is never counted, matching "excl. default"). Exception
//! edges added for `try`/`catch` are plain CFG edges with no `Branch`
//! instruction behind them, so they do not inflate either count.

use std::collections::HashMap;

use crate::features::ir_model::{BlockId, Cfg, Instruction};

use super::dominators::Dominators;

fn is_decision(instruction: &Instruction) -> bool {
    matches!(instruction, Instruction::Branch { then_block, else_block, .. } if then_block != else_block)
}

fn decision_blocks(cfg: &Cfg) -> Vec<BlockId> {
    cfg.blocks()
        .iter()
        .filter(|b| b.terminator().map(is_decision).unwrap_or(false))
        .map(|b| b.id)
        .collect()
}

/// Starts at 1, +1 per decision point (§4.8 "Cyclomatic complexity
/// rules").
pub fn cyclomatic_complexity(cfg: &Cfg) -> u32 {
    1 + decision_blocks(cfg).len() as u32
}

/// Each decision contributes `1 + nesting`, where nesting is the number of
/// dominator-tree ancestors that are themselves decision blocks (§4.8
/// "Cognitive complexity rules: nesting-weighted").
pub fn cognitive_complexity(cfg: &Cfg) -> u32 {
    let dominators = Dominators::compute(cfg);
    let decisions: std::collections::HashSet<BlockId> = decision_blocks(cfg).into_iter().collect();

    let order = cfg.reverse_post_order();
    let mut nesting: HashMap<BlockId, u32> = HashMap::new();
    nesting.insert(cfg.entry, 0);
    for &block in &order {
        if block == cfg.entry {
            continue;
        }
        let Some(idom) = dominators.immediate_dominator(block) else { continue };
        let parent_nesting = *nesting.get(&idom).unwrap_or(&0);
        let bump = if decisions.contains(&idom) { 1 } else { 0 };
        nesting.insert(block, parent_nesting + bump);
    }

    decisions.iter().map(|&b| 1 + nesting.get(&b).copied().unwrap_or(0)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ir_model::{BinaryOp, Literal, Value, Variable};

    fn branch(cfg: &mut Cfg, from: BlockId, then_block: BlockId, else_block: BlockId) {
        cfg.block_mut(from).push(Instruction::Branch {
            condition: Value::Binary(BinaryOp::Lt, Box::new(Value::Var(Variable::fresh("x"))), Box::new(Value::Constant(Literal::Int(0)))),
            then_block,
            else_block,
            offset: 0,
        });
        cfg.connect(from, then_block);
        cfg.connect(from, else_block);
    }

    #[test]
    fn straight_line_function_has_complexity_one() {
        let mut cfg = Cfg::new("f");
        cfg.block_mut(cfg.entry).push(Instruction::Return { value: None, offset: 0 });
        assert_eq!(cyclomatic_complexity(&cfg), 1);
        assert_eq!(cognitive_complexity(&cfg), 0);
    }

    #[test]
    fn single_if_adds_one_to_cyclomatic_and_cognitive() {
        let mut cfg = Cfg::new("f");
        let then_block = cfg.new_block();
        let join = cfg.new_block();
        branch(&mut cfg, cfg.entry, then_block, join);
        cfg.connect(then_block, join);
        cfg.block_mut(join).push(Instruction::Return { value: None, offset: 0 });
        assert_eq!(cyclomatic_complexity(&cfg), 2);
        assert_eq!(cognitive_complexity(&cfg), 1);
    }

    #[test]
    fn nested_if_costs_more_cognitive_than_cyclomatic() {
        let mut cfg = Cfg::new("f");
        let outer_then = cfg.new_block();
        let inner_then = cfg.new_block();
        let inner_join = cfg.new_block();
        let outer_join = cfg.new_block();

        branch(&mut cfg, cfg.entry, outer_then, outer_join);
        branch(&mut cfg, outer_then, inner_then, inner_join);
        cfg.connect(inner_then, inner_join);
        cfg.connect(inner_join, outer_join);
        cfg.block_mut(outer_join).push(Instruction::Return { value: None, offset: 0 });

        assert_eq!(cyclomatic_complexity(&cfg), 3);
        // outer if: 1 + 0; inner if (nested inside outer_then): 1 + 1 = 2; total 3.
        assert_eq!(cognitive_complexity(&cfg), 3);
    }
}
