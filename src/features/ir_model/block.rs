//! Basic blocks (§3 "Basic Block").

use serde::{Deserialize, Serialize};

use super::instruction::Instruction;

pub type BlockId = u32;

/// `id`, an ordered list of instructions, and two adjacency lists. The
/// invariants from §3 (exactly one trailing terminator, symmetric edges,
/// phis before non-phis) are enforced by the builders that produce blocks,
/// not by this struct itself — it is a plain data holder, checked by the
/// invariant tests in §8.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    pub instructions: Vec<Instruction>,
    pub predecessors: Vec<BlockId>,
    pub successors: Vec<BlockId>,
}

impl BasicBlock {
    pub fn new(id: BlockId) -> Self {
        Self { id, instructions: Vec::new(), predecessors: Vec::new(), successors: Vec::new() }
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last().filter(|i| i.is_terminator())
    }

    pub fn is_terminated(&self) -> bool {
        self.terminator().is_some()
    }

    /// Records an edge `self -> successor` in both directions. Idempotent:
    /// calling it twice for the same pair does not duplicate the edge
    /// (§4.1 "BasicBlock.connect_to(successor) ... maintains both adjacency
    /// lists idempotently").
    pub fn connect_to(&mut self, successor: &mut BasicBlock) {
        if !self.successors.contains(&successor.id) {
            self.successors.push(successor.id);
        }
        if !successor.predecessors.contains(&self.id) {
            successor.predecessors.push(self.id);
        }
    }

    pub fn phi_instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter().filter(|i| matches!(i, Instruction::Phi { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_to_is_idempotent() {
        let mut a = BasicBlock::new(0);
        let mut b = BasicBlock::new(1);
        a.connect_to(&mut b);
        a.connect_to(&mut b);
        assert_eq!(a.successors, vec![1]);
        assert_eq!(b.predecessors, vec![0]);
    }

    #[test]
    fn terminator_only_recognized_as_last_instruction() {
        let mut block = BasicBlock::new(0);
        block.push(Instruction::Jump { target: 1, offset: 0 });
        assert!(block.is_terminated());
    }
}
