//! C4 — Fact Extractor: projects an SSA CFG into the Datalog schema
//! (§4.4).

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::features::fact_extractor::domain::{Fact, INDEX_FIELD_NAME};
use crate::features::ir_model::{Cfg, Instruction, Value, Variable};

/// Variable-id interning plus heap/call-site counters, scoped to one
/// function's extraction (§3 "Lifecycles": fact sets live only for the
/// duration of one query session). Interning is the hottest loop in
/// extraction, so it uses the same `rustc-hash` map the SSA builder
/// reaches for.
pub struct FactExtractor {
    var_ids: FxHashMap<String, i64>,
    next_var_id: i64,
    next_heap_id: i64,
    next_call_site: i64,
    /// Instruction kinds visited that contribute no dataflow fact by design
    /// (§4.4 "Unhandled instruction kinds ... debug-visible set"): `Branch`,
    /// `Jump`, `Return`, `TypeCheck` carry no `Assign`/`Alloc`/`Call`/field
    /// fact under this schema.
    pub unhandled_types: BTreeSet<&'static str>,
    facts: Vec<Fact>,
}

impl Default for FactExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FactExtractor {
    pub fn new() -> Self {
        Self {
            var_ids: FxHashMap::default(),
            next_var_id: 0,
            next_heap_id: 0,
            next_call_site: 0,
            unhandled_types: BTreeSet::new(),
            facts: Vec::new(),
        }
    }

    /// Extracts facts for one SSA CFG, returning them alongside the
    /// extractor's running counters (so a caller extracting many functions
    /// in one session can keep heap ids globally unique by reusing the same
    /// extractor instance).
    pub fn extract(&mut self, cfg: &Cfg) -> Vec<Fact> {
        debug!(function = %cfg.function_name, "extracting datalog facts");
        self.facts.clear();

        for &block in &cfg.reverse_post_order() {
            for &succ in &cfg.block(block).successors {
                self.facts.push(Fact::flow(block, succ));
            }
        }
        self.facts.push(Fact::reachable(cfg.entry));

        for &block in &cfg.reverse_post_order() {
            for instr in &cfg.block(block).instructions {
                self.extract_instruction(block, instr);
            }
        }

        self.facts.clone()
    }

    fn var_id(&mut self, variable: &Variable) -> i64 {
        let name = variable.canonical_name();
        if let Some(&id) = self.var_ids.get(&name) {
            return id;
        }
        let id = self.next_var_id;
        self.next_var_id += 1;
        self.var_ids.insert(name, id);
        id
    }

    /// The id of a value used where the schema expects a plain variable
    /// reference (a call receiver, a field-access base). Non-`Var` values
    /// (constants, nested composites already materialized by C2 into a
    /// temp) have no variable identity here, so they report `-1` the same
    /// way the schema already uses `-1` for "no receiver".
    fn value_id(&mut self, value: &Value) -> i64 {
        match value {
            Value::Var(v) => self.var_id(v),
            _ => -1,
        }
    }

    fn fresh_heap_id(&mut self, type_name: &str) -> String {
        let id = self.next_heap_id;
        self.next_heap_id += 1;
        format!("{type_name}#{id}")
    }

    fn fresh_call_site(&mut self) -> i64 {
        let id = self.next_call_site;
        self.next_call_site += 1;
        id
    }

    fn extract_instruction(&mut self, block: u32, instr: &Instruction) {
        match instr {
            Instruction::Assign { target, value, offset: _ } => self.extract_assign(block, target, value),
            Instruction::Phi { target, operands, offset: _ } => {
                let target_id = self.var_id(target);
                for (&pred, value) in operands {
                    let source_id = self.value_id(value);
                    self.facts.push(Fact::phi_at(block, target_id, pred, source_id));
                    self.facts.push(Fact::assign(target_id, source_id));
                }
            }
            Instruction::Call { receiver, method_name, args, result, offset: _ } => {
                for a in args {
                    let _ = self.value_id(a); // register arg identities for later lookups
                }
                let receiver_id = receiver.as_ref().map(|r| self.value_id(r)).unwrap_or(-1);
                let result_id = result.as_ref().map(|r| self.var_id(r)).unwrap_or(-1);
                let call_site = self.fresh_call_site();
                self.facts.push(Fact::call(call_site, receiver_id, method_name.clone(), result_id));
                self.facts.push(Fact::call_at(block, call_site, receiver_id, method_name.clone(), result_id));
            }
            Instruction::LoadField { base, field_name, result, offset: _ } => {
                let base_id = self.value_id(base);
                let target_id = self.var_id(result);
                self.facts.push(Fact::load_field(base_id, field_name.clone(), target_id));
                self.facts.push(Fact::load_field_at(block, base_id, field_name.clone(), target_id));
            }
            Instruction::StoreField { base, field_name, value, offset: _ } => {
                let base_id = self.value_id(base);
                let source_id = self.value_id(value);
                self.facts.push(Fact::store_field(base_id, field_name.clone(), source_id));
                self.facts.push(Fact::store_field_at(block, base_id, field_name.clone(), source_id));
            }
            Instruction::LoadIndex { base, index, result, offset: _ } => {
                let _ = self.value_id(index);
                let base_id = self.value_id(base);
                let target_id = self.var_id(result);
                self.facts.push(Fact::load_field(base_id, INDEX_FIELD_NAME, target_id));
                self.facts.push(Fact::load_field_at(block, base_id, INDEX_FIELD_NAME, target_id));
            }
            Instruction::StoreIndex { base, index, value, offset: _ } => {
                let _ = self.value_id(index);
                let base_id = self.value_id(base);
                let source_id = self.value_id(value);
                self.facts.push(Fact::store_field(base_id, INDEX_FIELD_NAME, source_id));
                self.facts.push(Fact::store_field_at(block, base_id, INDEX_FIELD_NAME, source_id));
            }
            Instruction::NullCheck { operand, result, offset: _ } => {
                let source_id = self.value_id(operand);
                let target_id = self.var_id(result);
                self.facts.push(Fact::assign(target_id, source_id));
                self.facts.push(Fact::assign_at(block, target_id, source_id));
            }
            Instruction::Cast { operand, result, offset: _, .. } => {
                let source_id = self.value_id(operand);
                let target_id = self.var_id(result);
                self.facts.push(Fact::assign(target_id, source_id));
                self.facts.push(Fact::assign_at(block, target_id, source_id));
            }
            Instruction::Await { future, result, offset: _ } => {
                let source_id = self.value_id(future);
                let target_id = self.var_id(result);
                self.facts.push(Fact::assign(target_id, source_id));
                self.facts.push(Fact::assign_at(block, target_id, source_id));
            }
            Instruction::Branch { .. } => {
                self.unhandled_types.insert("Branch");
            }
            Instruction::Jump { .. } => {
                self.unhandled_types.insert("Jump");
            }
            Instruction::Return { .. } => {
                self.unhandled_types.insert("Return");
            }
            Instruction::Throw { .. } => {
                self.unhandled_types.insert("Throw");
            }
            Instruction::TypeCheck { .. } => {
                self.unhandled_types.insert("TypeCheck");
            }
        }
    }

    fn extract_assign(&mut self, block: u32, target: &Variable, value: &Value) {
        let target_id = self.var_id(target);
        match value {
            Value::Constant(_) => {} // §4.4 "Constants emit none."
            Value::Var(source) => {
                let source_id = self.var_id(source);
                self.facts.push(Fact::assign(target_id, source_id));
                self.facts.push(Fact::assign_at(block, target_id, source_id));
            }
            Value::Binary(..) | Value::Unary(..) => {
                // §4.4 "Binary/unary arithmetic ... emits no facts of its own."
            }
            Value::Call { receiver, method_name, args, .. } => {
                for a in args {
                    let _ = self.value_id(a);
                }
                let receiver_id = receiver.as_ref().map(|r| self.value_id(r)).unwrap_or(-1);
                let call_site = self.fresh_call_site();
                self.facts.push(Fact::call(call_site, receiver_id, method_name.clone(), target_id));
                self.facts.push(Fact::call_at(block, call_site, receiver_id, method_name.clone(), target_id));
            }
            Value::FieldAccess { receiver, field_name } => {
                let base_id = self.value_id(receiver);
                self.facts.push(Fact::load_field(base_id, field_name.clone(), target_id));
                self.facts.push(Fact::load_field_at(block, base_id, field_name.clone(), target_id));
            }
            Value::IndexAccess { receiver, index } => {
                let _ = self.value_id(index);
                let base_id = self.value_id(receiver);
                self.facts.push(Fact::load_field(base_id, INDEX_FIELD_NAME, target_id));
                self.facts.push(Fact::load_field_at(block, base_id, INDEX_FIELD_NAME, target_id));
            }
            Value::NewObject { type_name, args, .. } => {
                for a in args {
                    let _ = self.value_id(a);
                }
                let heap_id = self.fresh_heap_id(type_name);
                self.facts.push(Fact::alloc(target_id, heap_id.clone()));
                self.facts.push(Fact::alloc_at(block, target_id, heap_id));
            }
            Value::Phi(source) => {
                let source_id = self.var_id(source);
                self.facts.push(Fact::assign(target_id, source_id));
                self.facts.push(Fact::assign_at(block, target_id, source_id));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ir_model::Literal;

    #[test]
    fn new_object_produces_distinct_heap_ids() {
        let mut cfg = Cfg::new("f");
        let entry = cfg.entry;
        cfg.block_mut(entry).push(Instruction::Assign {
            target: Variable::new("a", 0),
            value: Value::NewObject { type_name: "Foo".to_string(), ctor_name: None, args: vec![] },
            offset: 0,
        });
        cfg.block_mut(entry).push(Instruction::Assign {
            target: Variable::new("b", 0),
            value: Value::NewObject { type_name: "Foo".to_string(), ctor_name: None, args: vec![] },
            offset: 0,
        });
        cfg.block_mut(entry).push(Instruction::Return { value: None, offset: 0 });

        let mut extractor = FactExtractor::new();
        let facts = extractor.extract(&cfg);
        let heap_ids: Vec<_> = facts
            .iter()
            .filter(|f| f.predicate == "Alloc")
            .map(|f| f.args[1].clone())
            .collect();
        assert_eq!(heap_ids.len(), 2);
        assert_ne!(heap_ids[0], heap_ids[1]);
    }

    #[test]
    fn constant_assignment_emits_no_data_fact() {
        let mut cfg = Cfg::new("f");
        let entry = cfg.entry;
        cfg.block_mut(entry).push(Instruction::Assign { target: Variable::new("x", 0), value: Value::Constant(Literal::Int(1)), offset: 0 });
        cfg.block_mut(entry).push(Instruction::Return { value: None, offset: 0 });

        let mut extractor = FactExtractor::new();
        let facts = extractor.extract(&cfg);
        assert!(facts.iter().all(|f| f.predicate != "Assign" && f.predicate != "AssignAt"));
    }

    #[test]
    fn phi_emits_one_phi_at_and_one_assign_per_operand() {
        let mut cfg = Cfg::new("f");
        let entry = cfg.entry;
        let b1 = cfg.new_block();
        let b2 = cfg.new_block();
        cfg.connect(entry, b1);
        cfg.connect(entry, b2);
        let merge = cfg.new_block();
        cfg.connect(b1, merge);
        cfg.connect(b2, merge);

        let mut operands = std::collections::BTreeMap::new();
        operands.insert(b1, Value::Var(Variable::new("x", 1)));
        operands.insert(b2, Value::Var(Variable::new("x", 2)));
        cfg.block_mut(merge).push(Instruction::Phi { target: Variable::new("x", 3), operands, offset: 0 });
        cfg.block_mut(merge).push(Instruction::Return { value: None, offset: 0 });

        let mut extractor = FactExtractor::new();
        let facts = extractor.extract(&cfg);
        assert_eq!(facts.iter().filter(|f| f.predicate == "PhiAt").count(), 2);
        assert_eq!(facts.iter().filter(|f| f.predicate == "Assign").count(), 2);
    }
}
