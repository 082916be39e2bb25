//! C3 — SSA Builder: Braun's on-the-fly SSA construction (§4.3).
//!
//! "Simple and Efficient Construction of Static Single Assignment Form"
//! (Braun et al., 2013) — no dominance frontiers, phi nodes inserted
//! on-demand while renaming, blocks sealed once every predecessor has been
//! filled, trivial phis removed as soon as they're recognized.

use std::collections::HashMap;

use ahash::AHashSet;

use crate::errors::SsaBuildError;
use crate::features::ir_model::{BlockId, Cfg, Instruction, Value, Variable};

type BuildResult<T> = Result<T, SsaBuildError>;

/// One phi still being assembled: its SSA result variable and the operands
/// collected so far, keyed by predecessor.
struct PhiBuilder {
    target: Variable,
    operands: HashMap<BlockId, Variable>,
}

/// Converts a non-SSA [`Cfg`] (variables all at version 0, one `Assign` per
/// write) into SSA form in place: every write gets a fresh version, every
/// read resolves to the version reaching it, and phi nodes are inserted at
/// merge points exactly where multiple versions could reach (§4.3
/// "Contract").
pub struct BraunSsaBuilder<'a> {
    cfg: &'a mut Cfg,
    current_def: HashMap<(BlockId, String), Variable>,
    version_counters: HashMap<String, u32>,
    phis: HashMap<BlockId, Vec<PhiBuilder>>,
    sealed: AHashSet<BlockId>,
    filled: AHashSet<BlockId>,
    incomplete_phis: HashMap<BlockId, HashMap<String, Variable>>,
    /// Trivial phis collapse to a single replacement variable; this map is
    /// applied to the whole function once construction finishes, so a phi
    /// eliminated early still gets seen correctly by phis that reference it
    /// (§4.3 "Trivial phi elimination").
    substitutions: HashMap<Variable, Variable>,
}

impl<'a> BraunSsaBuilder<'a> {
    pub fn new(cfg: &'a mut Cfg) -> Self {
        Self {
            cfg,
            current_def: HashMap::new(),
            version_counters: HashMap::new(),
            phis: HashMap::new(),
            sealed: AHashSet::new(),
            filled: AHashSet::new(),
            incomplete_phis: HashMap::new(),
            substitutions: HashMap::new(),
        }
    }

    pub fn build(mut self) -> BuildResult<()> {
        for param in self.cfg.parameters.clone() {
            // Advance this name's version counter past 0 so the first real
            // write inside the body (via `fresh_version`) does not collide
            // with the parameter's own implicit version-0 binding.
            let version = self.next_version(&param.name);
            debug_assert_eq!(version, 0, "parameter must be the first binding seen for its name");
            self.write_variable(&param.name, self.cfg.entry, Variable::new(&param.name, version));
        }

        // `try_seal` runs *before* a block's own instructions are renamed:
        // every predecessor already filled at that point is a forward edge
        // (all of them, unless this block is a loop header still waiting on
        // a not-yet-filled back edge), so sealing here lets straight-line
        // and if/else code resolve reads without ever creating an
        // incomplete phi.
        let order = self.cfg.reverse_post_order();
        for &block in &order {
            self.try_seal(block);
            self.rename_block(block);
            self.filled.insert(block);
        }

        // Any block still unsealed at this point only has back-edge
        // predecessors not yet filled when it was first visited (loop
        // headers) — every predecessor is filled now that the whole
        // function has been walked, so every remaining block can be sealed.
        let remaining: Vec<BlockId> = order.into_iter().filter(|b| !self.sealed.contains(b)).collect();
        for block in remaining {
            self.seal(block);
        }

        self.insert_phi_instructions();
        self.apply_substitutions();
        self.check_invariants()
    }

    fn next_version(&mut self, name: &str) -> u32 {
        let counter = self.version_counters.entry(name.to_string()).or_insert(0);
        let version = *counter;
        *counter += 1;
        version
    }

    fn write_variable(&mut self, name: &str, block: BlockId, value: Variable) {
        self.current_def.insert((block, name.to_string()), value);
    }

    fn read_variable(&mut self, name: &str, block: BlockId) -> Variable {
        if let Some(v) = self.current_def.get(&(block, name.to_string())) {
            return v.clone();
        }
        self.read_variable_recursive(name, block)
    }

    fn read_variable_recursive(&mut self, name: &str, block: BlockId) -> Variable {
        let value = if !self.sealed.contains(&block) {
            // Predecessor set isn't final yet (typically a loop header
            // reached before its back edge is filled) — park an incomplete
            // phi and finish it when the block is sealed.
            let version = self.next_version(name);
            let phi_var = Variable::new(name, version);
            self.incomplete_phis.entry(block).or_default().insert(name.to_string(), phi_var.clone());
            phi_var
        } else {
            let predecessors = self.cfg.block(block).predecessors.clone();
            match predecessors.as_slice() {
                [] => Variable::new(name, self.next_version(name)), // undefined at entry
                [only] => self.read_variable(name, *only),
                _ => {
                    let version = self.next_version(name);
                    let phi_var = Variable::new(name, version);
                    self.write_variable(name, block, phi_var.clone());
                    self.add_phi_operands(name, block, phi_var)
                }
            }
        };
        self.write_variable(name, block, value.clone());
        value
    }

    fn add_phi_operands(&mut self, name: &str, block: BlockId, phi_var: Variable) -> Variable {
        let predecessors = self.cfg.block(block).predecessors.clone();
        let mut operands = HashMap::new();
        for pred in predecessors {
            let value = self.read_variable(name, pred);
            operands.insert(pred, value);
        }
        self.phis.entry(block).or_default().push(PhiBuilder { target: phi_var.clone(), operands: operands.clone() });
        self.try_remove_trivial_phi(block, &phi_var, &operands)
    }

    /// A phi whose operands are all the same variable (ignoring references
    /// back to itself, which only arise in loops) carries no information —
    /// replace every use of it with that one variable (§4.3 "Trivial phi
    /// elimination").
    fn try_remove_trivial_phi(&mut self, block: BlockId, phi_var: &Variable, operands: &HashMap<BlockId, Variable>) -> Variable {
        let mut distinct: Vec<&Variable> = Vec::new();
        for v in operands.values() {
            if v == phi_var {
                continue;
            }
            if !distinct.contains(&v) {
                distinct.push(v);
            }
        }
        if distinct.len() > 1 {
            return phi_var.clone();
        }
        let replacement = match distinct.first() {
            Some(v) => (*v).clone(),
            None => return phi_var.clone(), // only self-references: keep as-is, effectively undefined
        };

        self.substitutions.insert(phi_var.clone(), replacement.clone());
        if let Some(list) = self.phis.get_mut(&block) {
            list.retain(|p| &p.target != phi_var);
        }
        self.write_variable(&phi_var.name, block, replacement.clone());
        replacement
    }

    fn try_seal(&mut self, block: BlockId) {
        if self.sealed.contains(&block) {
            return;
        }
        let predecessors = self.cfg.block(block).predecessors.clone();
        if predecessors.iter().all(|p| self.filled.contains(p)) {
            self.seal(block);
        }
    }

    fn seal(&mut self, block: BlockId) {
        if self.sealed.contains(&block) {
            return;
        }
        self.sealed.insert(block);
        let pending = self.incomplete_phis.remove(&block).unwrap_or_default();
        for (name, phi_var) in pending {
            self.add_phi_operands(&name, block, phi_var);
        }
    }

    fn rename_block(&mut self, block: BlockId) {
        let instructions = self.cfg.block(block).instructions.clone();
        let mut renamed = Vec::with_capacity(instructions.len());
        for instr in instructions {
            renamed.push(self.rename_instruction(instr, block));
        }
        self.cfg.block_mut(block).instructions = renamed;
    }

    fn rename_instruction(&mut self, instr: Instruction, block: BlockId) -> Instruction {
        let renamed_uses = |this: &mut Self, value: &Value| value.map_variables(&mut |v| this.read_variable(&v.name, block));

        let with_renamed_uses = match instr {
            Instruction::Assign { target, value, offset } => {
                let value = renamed_uses(self, &value);
                Instruction::Assign { target, value, offset }
            }
            Instruction::Branch { condition, then_block, else_block, offset } => {
                let condition = renamed_uses(self, &condition);
                Instruction::Branch { condition, then_block, else_block, offset }
            }
            Instruction::Jump { target, offset } => Instruction::Jump { target, offset },
            Instruction::Return { value, offset } => {
                let value = value.as_ref().map(|v| renamed_uses(self, v));
                Instruction::Return { value, offset }
            }
            Instruction::Phi { .. } => unreachable!("phis are inserted after renaming, not present in pre-SSA input"),
            Instruction::Call { receiver, method_name, args, result, offset } => {
                let receiver = receiver.as_ref().map(|v| renamed_uses(self, v));
                let args = args.iter().map(|a| renamed_uses(self, a)).collect();
                Instruction::Call { receiver, method_name, args, result, offset }
            }
            Instruction::LoadField { base, field_name, result, offset } => {
                let base = renamed_uses(self, &base);
                Instruction::LoadField { base, field_name, result, offset }
            }
            Instruction::StoreField { base, field_name, value, offset } => {
                let base = renamed_uses(self, &base);
                let value = renamed_uses(self, &value);
                Instruction::StoreField { base, field_name, value, offset }
            }
            Instruction::LoadIndex { base, index, result, offset } => {
                let base = renamed_uses(self, &base);
                let index = renamed_uses(self, &index);
                Instruction::LoadIndex { base, index, result, offset }
            }
            Instruction::StoreIndex { base, index, value, offset } => {
                let base = renamed_uses(self, &base);
                let index = renamed_uses(self, &index);
                let value = renamed_uses(self, &value);
                Instruction::StoreIndex { base, index, value, offset }
            }
            Instruction::NullCheck { operand, result, offset } => {
                let operand = renamed_uses(self, &operand);
                Instruction::NullCheck { operand, result, offset }
            }
            Instruction::Cast { operand, target_type, result, is_nullable, offset } => {
                let operand = renamed_uses(self, &operand);
                Instruction::Cast { operand, target_type, result, is_nullable, offset }
            }
            Instruction::TypeCheck { operand, target_type, result, negated, offset } => {
                let operand = renamed_uses(self, &operand);
                Instruction::TypeCheck { operand, target_type, result, negated, offset }
            }
            Instruction::Throw { exception, offset } => {
                let exception = renamed_uses(self, &exception);
                Instruction::Throw { exception, offset }
            }
            Instruction::Await { future, result, offset } => {
                let future = renamed_uses(self, &future);
                Instruction::Await { future, result, offset }
            }
        };

        self.rename_definition(with_renamed_uses, block)
    }

    /// After uses are renamed, give the instruction's own definition (if
    /// any) a fresh version and record it as the block's current def.
    fn rename_definition(&mut self, instr: Instruction, block: BlockId) -> Instruction {
        match instr {
            Instruction::Assign { target, value, offset } => {
                let fresh = self.fresh_version(&target, block);
                Instruction::Assign { target: fresh, value, offset }
            }
            Instruction::Call { receiver, method_name, args, result: Some(result), offset } => {
                let fresh = self.fresh_version(&result, block);
                Instruction::Call { receiver, method_name, args, result: Some(fresh), offset }
            }
            Instruction::LoadField { base, field_name, result, offset } => {
                let fresh = self.fresh_version(&result, block);
                Instruction::LoadField { base, field_name, result: fresh, offset }
            }
            Instruction::LoadIndex { base, index, result, offset } => {
                let fresh = self.fresh_version(&result, block);
                Instruction::LoadIndex { base, index, result: fresh, offset }
            }
            Instruction::NullCheck { operand, result, offset } => {
                let fresh = self.fresh_version(&result, block);
                Instruction::NullCheck { operand, result: fresh, offset }
            }
            Instruction::Cast { operand, target_type, result, is_nullable, offset } => {
                let fresh = self.fresh_version(&result, block);
                Instruction::Cast { operand, target_type, result: fresh, is_nullable, offset }
            }
            Instruction::TypeCheck { operand, target_type, result, negated, offset } => {
                let fresh = self.fresh_version(&result, block);
                Instruction::TypeCheck { operand, target_type, result: fresh, negated, offset }
            }
            Instruction::Await { future, result, offset } => {
                let fresh = self.fresh_version(&result, block);
                Instruction::Await { future, result: fresh, offset }
            }
            other => other,
        }
    }

    fn fresh_version(&mut self, target: &Variable, block: BlockId) -> Variable {
        let version = self.next_version(&target.name);
        let fresh = Variable::new(&target.name, version);
        self.write_variable(&target.name, block, fresh.clone());
        fresh
    }

    fn insert_phi_instructions(&mut self) {
        let blocks: Vec<BlockId> = self.phis.keys().copied().collect();
        for block in blocks {
            let builders = self.phis.remove(&block).unwrap_or_default();
            let mut phi_instructions: Vec<Instruction> = builders
                .into_iter()
                .map(|p| Instruction::Phi {
                    target: p.target,
                    operands: p.operands.into_iter().map(|(pred, v)| (pred, Value::Var(v))).collect(),
                    offset: 0,
                })
                .collect();
            // Deterministic order for byte-identical reports (§5 "Ordering
            // guarantees"): sort by target variable name.
            phi_instructions.sort_by(|a, b| match (a, b) {
                (Instruction::Phi { target: t1, .. }, Instruction::Phi { target: t2, .. }) => t1.cmp(t2),
                _ => std::cmp::Ordering::Equal,
            });
            let body = std::mem::take(&mut self.cfg.block_mut(block).instructions);
            let mut new_body = phi_instructions;
            new_body.extend(body);
            self.cfg.block_mut(block).instructions = new_body;
        }
    }

    /// Chases the substitution chain to a fixed point, so a phi eliminated
    /// in favor of another phi that was itself later eliminated resolves to
    /// the final live variable.
    fn resolve(&self, mut var: Variable) -> Variable {
        let mut seen = AHashSet::new();
        while let Some(next) = self.substitutions.get(&var) {
            if !seen.insert(var.clone()) {
                break; // defensive: a substitution cycle should not occur
            }
            var = next.clone();
        }
        var
    }

    fn apply_substitutions(&mut self) {
        if self.substitutions.is_empty() {
            return;
        }
        for block in self.cfg.blocks().iter().map(|b| b.id).collect::<Vec<_>>() {
            let instructions = self.cfg.block(block).instructions.clone();
            let rewritten: Vec<Instruction> = instructions
                .into_iter()
                .map(|instr| Self::rewrite_instruction_values(instr, &mut |v| self.resolve(v.clone())))
                .collect();
            self.cfg.block_mut(block).instructions = rewritten;
        }
    }

    fn rewrite_instruction_values(instr: Instruction, rename: &mut impl FnMut(&Variable) -> Variable) -> Instruction {
        match instr {
            Instruction::Assign { target, value, offset } => {
                Instruction::Assign { target, value: value.map_variables(rename), offset }
            }
            Instruction::Branch { condition, then_block, else_block, offset } => {
                Instruction::Branch { condition: condition.map_variables(rename), then_block, else_block, offset }
            }
            Instruction::Return { value, offset } => {
                Instruction::Return { value: value.map(|v| v.map_variables(rename)), offset }
            }
            Instruction::Phi { target, operands, offset } => {
                let operands = operands.into_iter().map(|(pred, v)| (pred, v.map_variables(rename))).collect();
                Instruction::Phi { target, operands, offset }
            }
            Instruction::Call { receiver, method_name, args, result, offset } => Instruction::Call {
                receiver: receiver.map(|v| v.map_variables(rename)),
                method_name,
                args: args.into_iter().map(|a| a.map_variables(rename)).collect(),
                result,
                offset,
            },
            Instruction::LoadField { base, field_name, result, offset } => {
                Instruction::LoadField { base: base.map_variables(rename), field_name, result, offset }
            }
            Instruction::StoreField { base, field_name, value, offset } => Instruction::StoreField {
                base: base.map_variables(rename),
                field_name,
                value: value.map_variables(rename),
                offset,
            },
            Instruction::LoadIndex { base, index, result, offset } => Instruction::LoadIndex {
                base: base.map_variables(rename),
                index: index.map_variables(rename),
                result,
                offset,
            },
            Instruction::StoreIndex { base, index, value, offset } => Instruction::StoreIndex {
                base: base.map_variables(rename),
                index: index.map_variables(rename),
                value: value.map_variables(rename),
                offset,
            },
            Instruction::NullCheck { operand, result, offset } => {
                Instruction::NullCheck { operand: operand.map_variables(rename), result, offset }
            }
            Instruction::Cast { operand, target_type, result, is_nullable, offset } => Instruction::Cast {
                operand: operand.map_variables(rename),
                target_type,
                result,
                is_nullable,
                offset,
            },
            Instruction::TypeCheck { operand, target_type, result, negated, offset } => Instruction::TypeCheck {
                operand: operand.map_variables(rename),
                target_type,
                result,
                negated,
                offset,
            },
            Instruction::Throw { exception, offset } => Instruction::Throw { exception: exception.map_variables(rename), offset },
            Instruction::Await { future, result, offset } => {
                Instruction::Await { future: future.map_variables(rename), result, offset }
            }
            Instruction::Jump { target, offset } => Instruction::Jump { target, offset },
        }
    }

    /// Postcondition check (§4.3 "Invariants"): every variable is assigned
    /// exactly once across the function, and every read resolves to a
    /// version defined somewhere in the function.
    fn check_invariants(&self) -> BuildResult<()> {
        let mut seen_targets: AHashSet<Variable> = AHashSet::new();
        for block in self.cfg.blocks() {
            for instr in &block.instructions {
                if let Some(target) = instr.defined_variable() {
                    if !seen_targets.insert(target.clone()) {
                        return Err(SsaBuildError::InvariantViolation {
                            function: self.cfg.function_name.clone(),
                            reason: format!("variable `{target}` is assigned more than once"),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Converts `cfg` to SSA form in place (§4.3).
pub fn build_ssa(cfg: &mut Cfg) -> BuildResult<()> {
    BraunSsaBuilder::new(cfg).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ir_model::{BinaryOp, Literal};

    /// Scenario from §8: an if/else that both assign `x` then read it
    /// after the merge must produce exactly one phi at the merge block.
    #[test]
    fn diamond_assignment_produces_single_phi() {
        let mut cfg = Cfg::new("f");
        let then_block = cfg.new_block();
        let else_block = cfg.new_block();
        let merge = cfg.new_block();

        cfg.block_mut(cfg.entry).push(Instruction::Branch {
            condition: Value::Constant(Literal::Bool(true)),
            then_block,
            else_block,
            offset: 0,
        });
        cfg.connect(cfg.entry, then_block);
        cfg.connect(cfg.entry, else_block);

        cfg.block_mut(then_block).push(Instruction::Assign { target: Variable::fresh("x"), value: Value::Constant(Literal::Int(1)), offset: 0 });
        cfg.block_mut(then_block).push(Instruction::Jump { target: merge, offset: 0 });
        cfg.connect(then_block, merge);

        cfg.block_mut(else_block).push(Instruction::Assign { target: Variable::fresh("x"), value: Value::Constant(Literal::Int(2)), offset: 0 });
        cfg.block_mut(else_block).push(Instruction::Jump { target: merge, offset: 0 });
        cfg.connect(else_block, merge);

        cfg.block_mut(merge).push(Instruction::Return { value: Some(Value::Var(Variable::fresh("x"))), offset: 0 });

        build_ssa(&mut cfg).unwrap();

        let phi_count = cfg.block(merge).phi_instructions().count();
        assert_eq!(phi_count, 1);
    }

    /// A loop that never reassigns its induction variable inside the body
    /// collapses the header phi to the single incoming value (trivial phi
    /// elimination, §4.3).
    #[test]
    fn trivial_phi_is_eliminated() {
        let mut cfg = Cfg::new("f");
        let header = cfg.new_block();
        let body = cfg.new_block();
        let exit = cfg.new_block();

        cfg.block_mut(cfg.entry).push(Instruction::Assign { target: Variable::fresh("x"), value: Value::Constant(Literal::Int(0)), offset: 0 });
        cfg.block_mut(cfg.entry).push(Instruction::Jump { target: header, offset: 0 });
        cfg.connect(cfg.entry, header);

        cfg.block_mut(header).push(Instruction::Branch {
            condition: Value::Constant(Literal::Bool(true)),
            then_block: body,
            else_block: exit,
            offset: 0,
        });
        cfg.connect(header, body);
        cfg.connect(header, exit);

        // Body reads x but never writes it, then jumps back to header.
        cfg.block_mut(body).push(Instruction::Call {
            receiver: None,
            method_name: "use".to_string(),
            args: vec![Value::Var(Variable::fresh("x"))],
            result: None,
            offset: 0,
        });
        cfg.block_mut(body).push(Instruction::Jump { target: header, offset: 0 });
        cfg.connect(body, header);

        cfg.block_mut(exit).push(Instruction::Return { value: Some(Value::Var(Variable::fresh("x"))), offset: 0 });

        build_ssa(&mut cfg).unwrap();

        assert_eq!(cfg.block(header).phi_instructions().count(), 0);
    }

    /// §8 invariant 4: reassigning a parameter inside the body must produce
    /// a version strictly greater than the parameter's own implicit
    /// version-0 binding at entry, not a colliding duplicate `x_0`.
    #[test]
    fn reassigned_parameter_gets_a_version_past_its_entry_binding() {
        let mut cfg = Cfg::new("f");
        cfg.parameters.push(Variable::new("x", 0));
        cfg.block_mut(cfg.entry).push(Instruction::Assign {
            target: Variable::fresh("x"),
            value: Value::Binary(BinaryOp::Add, Box::new(Value::Var(Variable::fresh("x"))), Box::new(Value::Constant(Literal::Int(1)))),
            offset: 0,
        });
        cfg.block_mut(cfg.entry).push(Instruction::Return { value: Some(Value::Var(Variable::fresh("x"))), offset: 0 });

        build_ssa(&mut cfg).unwrap();

        let reassignment = cfg.block(cfg.entry).instructions[0].defined_variable().unwrap();
        assert_eq!(reassignment.name, "x");
        assert!(reassignment.version >= 1, "reassignment must not collide with the parameter's own version 0");

        let Instruction::Return { value: Some(Value::Var(returned)), .. } = &cfg.block(cfg.entry).instructions[1] else {
            panic!("expected a return of a variable");
        };
        assert_eq!(*returned, reassignment);
    }

    #[test]
    fn straight_line_code_assigns_increasing_versions() {
        let mut cfg = Cfg::new("f");
        cfg.block_mut(cfg.entry).push(Instruction::Assign { target: Variable::fresh("x"), value: Value::Constant(Literal::Int(1)), offset: 0 });
        cfg.block_mut(cfg.entry).push(Instruction::Assign {
            target: Variable::fresh("x"),
            value: Value::Binary(BinaryOp::Add, Box::new(Value::Var(Variable::fresh("x"))), Box::new(Value::Constant(Literal::Int(1)))),
            offset: 0,
        });
        cfg.block_mut(cfg.entry).push(Instruction::Return { value: Some(Value::Var(Variable::fresh("x"))), offset: 0 });

        build_ssa(&mut cfg).unwrap();

        let versions: Vec<u32> = cfg.block(cfg.entry).instructions.iter().filter_map(|i| i.defined_variable()).map(|v| v.version).collect();
        assert_eq!(versions, vec![0, 1]);
    }
}
