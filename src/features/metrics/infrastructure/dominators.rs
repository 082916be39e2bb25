//! Dominator tree construction (Cooper, Harvey & Kennedy, "A Simple, Fast
//! Dominance Algorithm", 2001), used by the cognitive-complexity weighting
//! (§4.8 "Cognitive complexity rules: nesting-weighted").

use std::collections::HashMap;

use crate::features::ir_model::{BlockId, Cfg};

pub struct Dominators {
    idom: HashMap<BlockId, BlockId>,
    rpo_index: HashMap<BlockId, usize>,
    entry: BlockId,
}

impl Dominators {
    pub fn compute(cfg: &Cfg) -> Self {
        let order = cfg.reverse_post_order();
        let rpo_index: HashMap<BlockId, usize> = order.iter().enumerate().map(|(i, &b)| (b, i)).collect();
        let entry = cfg.entry;

        let mut idom: HashMap<BlockId, BlockId> = HashMap::new();
        idom.insert(entry, entry);

        let mut changed = true;
        while changed {
            changed = false;
            for &block in order.iter().skip(1) {
                let preds = &cfg.block(block).predecessors;
                let mut new_idom: Option<BlockId> = None;
                for &pred in preds {
                    if idom.contains_key(&pred) {
                        new_idom = Some(match new_idom {
                            None => pred,
                            Some(current) => intersect(current, pred, &idom, &rpo_index),
                        });
                    }
                }
                if let Some(new_idom) = new_idom {
                    if idom.get(&block) != Some(&new_idom) {
                        idom.insert(block, new_idom);
                        changed = true;
                    }
                }
            }
        }

        Self { idom, rpo_index, entry }
    }

    pub fn immediate_dominator(&self, block: BlockId) -> Option<BlockId> {
        if block == self.entry {
            None
        } else {
            self.idom.get(&block).copied()
        }
    }
}

fn intersect(a: BlockId, b: BlockId, idom: &HashMap<BlockId, BlockId>, rpo_index: &HashMap<BlockId, usize>) -> BlockId {
    let mut finger1 = a;
    let mut finger2 = b;
    while finger1 != finger2 {
        while rpo_index[&finger1] > rpo_index[&finger2] {
            finger1 = idom[&finger1];
        }
        while rpo_index[&finger2] > rpo_index[&finger1] {
            finger2 = idom[&finger2];
        }
    }
    finger1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diamond_join_is_dominated_by_entry_not_either_branch() {
        let mut cfg = Cfg::new("f");
        let then_block = cfg.new_block();
        let else_block = cfg.new_block();
        let join = cfg.new_block();
        cfg.connect(cfg.entry, then_block);
        cfg.connect(cfg.entry, else_block);
        cfg.connect(then_block, join);
        cfg.connect(else_block, join);

        let dominators = Dominators::compute(&cfg);
        assert_eq!(dominators.immediate_dominator(join), Some(cfg.entry));
        assert_eq!(dominators.immediate_dominator(then_block), Some(cfg.entry));
    }
}
