//! IR instructions (§3 "Instruction (sealed)").

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::block::BlockId;
use super::variable::Variable;
use super::value::Value;

/// One phi operand: the predecessor block it flows from, and the value
/// reaching the join along that edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhiOperand {
    pub predecessor: BlockId,
    pub value: Value,
}

/// The sealed `Instruction` variant set from §3. Every variant carries the
/// source offset it was lowered from, for diagnostic attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Assign { target: Variable, value: Value, offset: u32 },
    Branch { condition: Value, then_block: BlockId, else_block: BlockId, offset: u32 },
    Jump { target: BlockId, offset: u32 },
    Return { value: Option<Value>, offset: u32 },
    /// Operands keyed by predecessor block id; §3 requires phis to precede
    /// all non-phi instructions within a block once in SSA form.
    Phi { target: Variable, operands: BTreeMap<BlockId, Value>, offset: u32 },
    Call { receiver: Option<Value>, method_name: String, args: Vec<Value>, result: Option<Variable>, offset: u32 },
    LoadField { base: Value, field_name: String, result: Variable, offset: u32 },
    StoreField { base: Value, field_name: String, value: Value, offset: u32 },
    LoadIndex { base: Value, index: Value, result: Variable, offset: u32 },
    StoreIndex { base: Value, index: Value, value: Value, offset: u32 },
    NullCheck { operand: Value, result: Variable, offset: u32 },
    Cast { operand: Value, target_type: String, result: Variable, is_nullable: bool, offset: u32 },
    TypeCheck { operand: Value, target_type: String, result: Variable, negated: bool, offset: u32 },
    Throw { exception: Value, offset: u32 },
    Await { future: Value, result: Variable, offset: u32 },
}

impl Instruction {
    pub fn offset(&self) -> u32 {
        match self {
            Instruction::Assign { offset, .. }
            | Instruction::Branch { offset, .. }
            | Instruction::Jump { offset, .. }
            | Instruction::Return { offset, .. }
            | Instruction::Phi { offset, .. }
            | Instruction::Call { offset, .. }
            | Instruction::LoadField { offset, .. }
            | Instruction::StoreField { offset, .. }
            | Instruction::LoadIndex { offset, .. }
            | Instruction::StoreIndex { offset, .. }
            | Instruction::NullCheck { offset, .. }
            | Instruction::Cast { offset, .. }
            | Instruction::TypeCheck { offset, .. }
            | Instruction::Throw { offset, .. }
            | Instruction::Await { offset, .. } => *offset,
        }
    }

    /// Whether this instruction is one of the four terminator kinds
    /// (Branch / Jump / Return / Throw / Await — §3 lists `Await` among the
    /// constructs that may end a block via the continuation-block rewrite
    /// in §4.2).
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Branch { .. }
                | Instruction::Jump { .. }
                | Instruction::Return { .. }
                | Instruction::Throw { .. }
                | Instruction::Await { .. }
        )
    }

    /// The variable this instruction defines, if any. Used by SSA renaming
    /// (§4.3) to know which instruction kinds need their result versioned.
    pub fn defined_variable(&self) -> Option<&Variable> {
        match self {
            Instruction::Assign { target, .. } => Some(target),
            Instruction::Phi { target, .. } => Some(target),
            Instruction::Call { result: Some(r), .. } => Some(r),
            Instruction::LoadField { result, .. } => Some(result),
            Instruction::LoadIndex { result, .. } => Some(result),
            Instruction::NullCheck { result, .. } => Some(result),
            Instruction::Cast { result, .. } => Some(result),
            Instruction::TypeCheck { result, .. } => Some(result),
            Instruction::Await { result, .. } => Some(result),
            _ => None,
        }
    }

    /// Every value read by this instruction (not counting the defined
    /// variable itself), for dataflow and renaming purposes.
    pub fn used_values(&self) -> Vec<&Value> {
        match self {
            Instruction::Assign { value, .. } => vec![value],
            Instruction::Branch { condition, .. } => vec![condition],
            Instruction::Jump { .. } => vec![],
            Instruction::Return { value, .. } => value.iter().collect(),
            Instruction::Phi { operands, .. } => operands.values().collect(),
            Instruction::Call { receiver, args, .. } => {
                let mut vs: Vec<&Value> = receiver.iter().collect();
                vs.extend(args.iter());
                vs
            }
            Instruction::LoadField { base, .. } => vec![base],
            Instruction::StoreField { base, value, .. } => vec![base, value],
            Instruction::LoadIndex { base, index, .. } => vec![base, index],
            Instruction::StoreIndex { base, index, value, .. } => vec![base, index, value],
            Instruction::NullCheck { operand, .. } => vec![operand],
            Instruction::Cast { operand, .. } => vec![operand],
            Instruction::TypeCheck { operand, .. } => vec![operand],
            Instruction::Throw { exception, .. } => vec![exception],
            Instruction::Await { future, .. } => vec![future],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminators_are_classified_correctly() {
        let jump = Instruction::Jump { target: 1, offset: 0 };
        let assign = Instruction::Assign { target: Variable::fresh("x"), value: Value::Constant(super::super::value::Literal::Null), offset: 0 };
        assert!(jump.is_terminator());
        assert!(!assign.is_terminator());
    }

    #[test]
    fn defined_variable_tracks_result_field() {
        let result = Variable::fresh("t0");
        let call = Instruction::Call {
            receiver: None,
            method_name: "foo".to_string(),
            args: vec![],
            result: Some(result.clone()),
            offset: 0,
        };
        assert_eq!(call.defined_variable(), Some(&result));
    }
}
