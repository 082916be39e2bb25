//! Control-flow graphs (§3 "CFG", §3 "SSA CFG").
//!
//! Per §9 ("Cyclic graphs ... Use an arena"), all blocks of one function
//! live in a single owned vector; edges are stored as [`BlockId`]s, never as
//! references, so the structure has no lifetime parameter and is trivially
//! `Clone`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::block::{BasicBlock, BlockId};
use super::variable::Variable;

/// `(functionName, entry, blocks)`. The exit block is implicit: any
/// `Return`/`Throw`/terminal `Await` continuation simply has no successors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cfg {
    pub function_name: String,
    pub entry: BlockId,
    blocks: Vec<BasicBlock>,
    /// Ordered function parameters, version-0 at entry (§4.3 "SSA
    /// parameters"). Carried here because C3 needs it and it is cheap to
    /// thread through the arena rather than re-deriving it from the AST.
    pub parameters: Vec<Variable>,
    next_block_id: BlockId,
}

impl Cfg {
    pub fn new(function_name: impl Into<String>) -> Self {
        let mut cfg = Self {
            function_name: function_name.into(),
            entry: 0,
            blocks: Vec::new(),
            parameters: Vec::new(),
            next_block_id: 0,
        };
        let entry = cfg.new_block();
        cfg.entry = entry;
        cfg
    }

    pub fn new_block(&mut self) -> BlockId {
        let id = self.next_block_id;
        self.next_block_id += 1;
        self.blocks.push(BasicBlock::new(id));
        id
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        self.blocks.iter().find(|b| b.id == id).expect("block id must exist in this CFG's arena")
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        self.blocks.iter_mut().find(|b| b.id == id).expect("block id must exist in this CFG's arena")
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Connects two blocks by id, looked up within this CFG's own arena.
    pub fn connect(&mut self, from: BlockId, to: BlockId) {
        let from_idx = self.blocks.iter().position(|b| b.id == from).expect("source block exists");
        let to_idx = self.blocks.iter().position(|b| b.id == to).expect("target block exists");

        if from_idx == to_idx {
            let block = &mut self.blocks[from_idx];
            if !block.successors.contains(&to) {
                block.successors.push(to);
            }
            if !block.predecessors.contains(&from) {
                block.predecessors.push(from);
            }
            return;
        }

        // Split the borrow across the two distinct indices, then call
        // `connect_to` with `from_block` and `to_block` in the right roles
        // regardless of which one sits at the lower index.
        let (lo, hi) = if from_idx < to_idx { (from_idx, to_idx) } else { (to_idx, from_idx) };
        let (left, right) = self.blocks.split_at_mut(hi);
        let (lo_block, hi_block) = (&mut left[lo], &mut right[0]);
        if from_idx < to_idx {
            lo_block.connect_to(hi_block);
        } else {
            hi_block.connect_to(lo_block);
        }
    }

    /// Reverse post-order over blocks reachable from `entry` in forward
    /// flow — the canonical deterministic traversal for every fixpoint in
    /// this crate (§5 "Ordering guarantees").
    pub fn reverse_post_order(&self) -> Vec<BlockId> {
        let mut visited = HashSet::new();
        let mut post_order = Vec::new();
        self.dfs_post_order(self.entry, &mut visited, &mut post_order);
        post_order.reverse();
        post_order
    }

    fn dfs_post_order(&self, id: BlockId, visited: &mut HashSet<BlockId>, out: &mut Vec<BlockId>) {
        if !visited.insert(id) {
            return;
        }
        for &succ in &self.block(id).successors {
            self.dfs_post_order(succ, visited, out);
        }
        out.push(id);
    }

    /// Blocks reachable from `entry` via forward flow — the "live graph"
    /// referenced throughout §3 and §8 (invariant 1, "every block is
    /// reachable from entry").
    pub fn reachable_blocks(&self) -> HashSet<BlockId> {
        self.reverse_post_order().into_iter().collect()
    }

    /// Debug printer (§4.1 "CFG.dump()"): one line per block, its
    /// instructions, and its successor ids.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            out.push_str(&format!("block{}:\n", block.id));
            for instr in &block.instructions {
                out.push_str(&format!("  {:?}\n", instr));
            }
            out.push_str(&format!("  -> {:?}\n", block.successors));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_cfg_has_a_single_entry_block() {
        let cfg = Cfg::new("f");
        assert_eq!(cfg.block_count(), 1);
        assert_eq!(cfg.entry, 0);
    }

    #[test]
    fn reverse_post_order_visits_entry_first() {
        let mut cfg = Cfg::new("f");
        let b1 = cfg.new_block();
        let b2 = cfg.new_block();
        cfg.connect(cfg.entry, b1);
        cfg.connect(b1, b2);
        let rpo = cfg.reverse_post_order();
        assert_eq!(rpo[0], cfg.entry);
        assert_eq!(rpo.last().copied(), Some(b2));
    }

    #[test]
    fn connect_is_symmetric() {
        let mut cfg = Cfg::new("f");
        let b1 = cfg.new_block();
        cfg.connect(cfg.entry, b1);
        assert!(cfg.block(cfg.entry).successors.contains(&b1));
        assert!(cfg.block(b1).predecessors.contains(&cfg.entry));
    }

    #[test]
    fn unreachable_block_is_excluded_from_reachable_set() {
        let mut cfg = Cfg::new("f");
        let reachable = cfg.new_block();
        let unreachable = cfg.new_block();
        cfg.connect(cfg.entry, reachable);
        let _ = unreachable; // never connected
        assert!(cfg.reachable_blocks().contains(&reachable));
        assert!(!cfg.reachable_blocks().contains(&unreachable));
    }
}
