//! Halstead metrics (§4.8 "Halstead").
//!
//! Operators are instruction/operation *kinds*; operands are the distinct
//! variables and literal constants they touch. Walking the IR rather than
//! source tokens means every operator the original language has already
//! been normalized by the builder into one of a small, closed set of
//! `Instruction`/`Value` kinds.

use std::collections::HashSet;

use crate::features::ir_model::{BinaryOp, Cfg, Instruction, Literal, UnaryOp, Value};
use crate::features::metrics::domain::HalsteadMetrics;

#[derive(Default)]
struct Counts {
    operator_kinds: HashSet<&'static str>,
    operand_keys: HashSet<String>,
    total_operators: u32,
    total_operands: u32,
}

impl Counts {
    fn operator(&mut self, kind: &'static str) {
        self.operator_kinds.insert(kind);
        self.total_operators += 1;
    }

    fn operand(&mut self, key: String) {
        self.operand_keys.insert(key);
        self.total_operands += 1;
    }
}

pub fn halstead_metrics(cfg: &Cfg) -> HalsteadMetrics {
    let mut counts = Counts::default();
    for block in cfg.blocks() {
        for instruction in &block.instructions {
            count_instruction(instruction, &mut counts);
        }
    }

    let n1 = counts.operator_kinds.len() as u32;
    let n2 = counts.operand_keys.len() as u32;
    let big_n1 = counts.total_operators;
    let big_n2 = counts.total_operands;
    let vocabulary = n1 + n2;
    let length = big_n1 + big_n2;
    let volume = if vocabulary == 0 { 0.0 } else { length as f64 * (vocabulary as f64).log2() };
    let difficulty = if n2 == 0 { 0.0 } else { (n1 as f64 / 2.0) * (big_n2 as f64 / n2 as f64) };
    let effort = difficulty * volume;

    HalsteadMetrics {
        distinct_operators: n1,
        distinct_operands: n2,
        total_operators: big_n1,
        total_operands: big_n2,
        vocabulary,
        length,
        volume,
        difficulty,
        effort,
    }
}

fn count_instruction(instruction: &Instruction, counts: &mut Counts) {
    match instruction {
        Instruction::Assign { value, .. } => {
            counts.operator("assign");
            count_value(value, counts);
        }
        Instruction::Branch { condition, .. } => {
            counts.operator("branch");
            count_value(condition, counts);
        }
        Instruction::Jump { .. } => counts.operator("jump"),
        Instruction::Return { value, .. } => {
            counts.operator("return");
            if let Some(v) = value {
                count_value(v, counts);
            }
        }
        Instruction::Phi { operands, .. } => {
            counts.operator("phi");
            for v in operands.values() {
                count_value(v, counts);
            }
        }
        Instruction::Call { receiver, method_name, args, .. } => {
            counts.operator("call");
            counts.operand(format!("method:{method_name}"));
            if let Some(r) = receiver {
                count_value(r, counts);
            }
            for a in args {
                count_value(a, counts);
            }
        }
        Instruction::LoadField { base, field_name, .. } => {
            counts.operator("load_field");
            counts.operand(format!("field:{field_name}"));
            count_value(base, counts);
        }
        Instruction::StoreField { base, field_name, value, .. } => {
            counts.operator("store_field");
            counts.operand(format!("field:{field_name}"));
            count_value(base, counts);
            count_value(value, counts);
        }
        Instruction::LoadIndex { base, index, .. } => {
            counts.operator("load_index");
            count_value(base, counts);
            count_value(index, counts);
        }
        Instruction::StoreIndex { base, index, value, .. } => {
            counts.operator("store_index");
            count_value(base, counts);
            count_value(index, counts);
            count_value(value, counts);
        }
        Instruction::NullCheck { operand, .. } => {
            counts.operator("null_check");
            count_value(operand, counts);
        }
        Instruction::Cast { operand, target_type, .. } => {
            counts.operator("cast");
            counts.operand(format!("type:{target_type}"));
            count_value(operand, counts);
        }
        Instruction::TypeCheck { operand, target_type, .. } => {
            counts.operator("type_check");
            counts.operand(format!("type:{target_type}"));
            count_value(operand, counts);
        }
        Instruction::Throw { exception, .. } => {
            counts.operator("throw");
            count_value(exception, counts);
        }
        Instruction::Await { future, .. } => {
            counts.operator("await");
            count_value(future, counts);
        }
    }
}

fn count_value(value: &Value, counts: &mut Counts) {
    match value {
        Value::Constant(lit) => {
            counts.operand(literal_key(lit));
        }
        Value::Var(v) | Value::Phi(v) => counts.operand(format!("var:{}", v.name)),
        Value::Binary(op, l, r) => {
            counts.operator(binary_op_name(*op));
            count_value(l, counts);
            count_value(r, counts);
        }
        Value::Unary(op, v) => {
            counts.operator(unary_op_name(*op));
            count_value(v, counts);
        }
        Value::Call { receiver, method_name, args } => {
            counts.operator("call_expr");
            counts.operand(format!("method:{method_name}"));
            if let Some(r) = receiver {
                count_value(r, counts);
            }
            for a in args {
                count_value(a, counts);
            }
        }
        Value::FieldAccess { receiver, field_name } => {
            counts.operator("field_access");
            counts.operand(format!("field:{field_name}"));
            count_value(receiver, counts);
        }
        Value::IndexAccess { receiver, index } => {
            counts.operator("index_access");
            count_value(receiver, counts);
            count_value(index, counts);
        }
        Value::NewObject { type_name, args, .. } => {
            counts.operator("new_object");
            counts.operand(format!("type:{type_name}"));
            for a in args {
                count_value(a, counts);
            }
        }
    }
}

fn literal_key(lit: &Literal) -> String {
    match lit {
        Literal::Int(n) => format!("int:{n}"),
        Literal::Double(bits) => format!("double:{bits}"),
        Literal::Bool(b) => format!("bool:{b}"),
        Literal::Str(s) => format!("str:{s}"),
        Literal::Null => "null".to_string(),
    }
}

fn binary_op_name(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "add",
        BinaryOp::Sub => "sub",
        BinaryOp::Mul => "mul",
        BinaryOp::Div => "div",
        BinaryOp::Mod => "mod",
        BinaryOp::Eq => "eq",
        BinaryOp::NotEq => "not_eq",
        BinaryOp::Lt => "lt",
        BinaryOp::LtEq => "lt_eq",
        BinaryOp::Gt => "gt",
        BinaryOp::GtEq => "gt_eq",
        BinaryOp::And => "and",
        BinaryOp::Or => "or",
        BinaryOp::NullCoalesce => "null_coalesce",
        BinaryOp::BitAnd => "bit_and",
        BinaryOp::BitOr => "bit_or",
        BinaryOp::BitXor => "bit_xor",
        BinaryOp::Shl => "shl",
        BinaryOp::Shr => "shr",
    }
}

fn unary_op_name(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "neg",
        UnaryOp::Not => "not",
        UnaryOp::BitNot => "bit_not",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ir_model::Variable;

    #[test]
    fn distinct_operators_deduplicate_across_occurrences() {
        let mut cfg = Cfg::new("f");
        let a = Variable::new("a", 0);
        let b = Variable::new("b", 0);
        cfg.block_mut(cfg.entry).push(Instruction::Assign {
            target: a.clone(),
            value: Value::Binary(BinaryOp::Add, Box::new(Value::Constant(Literal::Int(1))), Box::new(Value::Constant(Literal::Int(2)))),
            offset: 0,
        });
        cfg.block_mut(cfg.entry).push(Instruction::Assign {
            target: b,
            value: Value::Binary(BinaryOp::Add, Box::new(Value::Var(a)), Box::new(Value::Constant(Literal::Int(3)))),
            offset: 1,
        });
        let metrics = halstead_metrics(&cfg);
        assert_eq!(metrics.distinct_operators, 2); // "assign", "add"
        assert!(metrics.total_operators > metrics.distinct_operators);
        assert!(metrics.volume > 0.0);
    }
}
