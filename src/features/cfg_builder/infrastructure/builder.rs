//! C2 — CFG Builder: lowers one declaration to a control-flow graph
//! (§4.2).

use tracing::trace;

use crate::errors::IrBuildError;
use crate::features::cfg_builder::ports::{
    CascadeSection, CatchClause, Declaration, DelegatingTarget, Expr, PostfixOp, ShortCircuitOp,
    Stmt, SwitchCase,
};
use crate::features::ir_model::{BinaryOp, BlockId, Cfg, Instruction, Literal, Value, Variable};

type BuildResult<T> = Result<T, IrBuildError>;

/// Lowers a single function/method/constructor declaration into a
/// well-formed [`Cfg`] (§4.2 "Contract").
pub fn build_cfg(decl: &Declaration) -> BuildResult<Cfg> {
    let mut builder = CfgBuilder::new(decl.name());
    builder.lower_declaration(decl)?;
    Ok(builder.finish())
}

struct CfgBuilder {
    cfg: Cfg,
    current_block: BlockId,
    continue_targets: Vec<BlockId>,
    break_targets: Vec<BlockId>,
    temp_counter: u32,
}

impl CfgBuilder {
    fn new(function_name: &str) -> Self {
        let cfg = Cfg::new(function_name);
        let entry = cfg.entry;
        Self { cfg, current_block: entry, continue_targets: Vec::new(), break_targets: Vec::new(), temp_counter: 0 }
    }

    fn finish(mut self) -> Cfg {
        if !self.is_terminated() {
            self.push(Instruction::Return { value: None, offset: 0 });
        }
        self.cfg
    }

    // -- small helpers --------------------------------------------------

    fn fresh_temp(&mut self) -> Variable {
        let name = format!("_t{}", self.temp_counter);
        self.temp_counter += 1;
        Variable::fresh(name)
    }

    fn fresh_block(&mut self) -> BlockId {
        self.cfg.new_block()
    }

    fn push(&mut self, instruction: Instruction) {
        self.cfg.block_mut(self.current_block).push(instruction);
    }

    fn is_terminated(&self) -> bool {
        self.cfg.block(self.current_block).is_terminated()
    }

    fn connect(&mut self, from: BlockId, to: BlockId) {
        self.cfg.connect(from, to);
    }

    /// Jumps from the current block to `target` unless the current block
    /// already ends in a terminator (§4.2 "after a terminator,
    /// `current_block` is considered dead").
    fn jump_to_unless_terminated(&mut self, target: BlockId, offset: u32) {
        if !self.is_terminated() {
            self.push(Instruction::Jump { target, offset });
            self.connect(self.current_block, target);
        }
    }

    fn var(name: &str) -> Value {
        Value::Var(Variable::fresh(name))
    }

    // -- declarations -----------------------------------------------------

    fn lower_declaration(&mut self, decl: &Declaration) -> BuildResult<()> {
        for param in decl.params() {
            self.cfg.parameters.push(Variable::fresh(param));
        }
        match decl {
            Declaration::Function { body, .. } | Declaration::Method { body, .. } => {
                self.lower_stmt(body)
            }
            Declaration::Constructor { field_initializers, delegating_call, body, .. } => {
                if let Some((target, method_name, args)) = delegating_call {
                    let receiver_name = match target {
                        DelegatingTarget::Super => "super",
                        DelegatingTarget::This => "this",
                    };
                    let arg_values = args.iter().map(|a| self.lower_expr(a)).collect::<BuildResult<Vec<_>>>()?;
                    self.push(Instruction::Call {
                        receiver: Some(Self::var(receiver_name)),
                        method_name: method_name.clone(),
                        args: arg_values,
                        result: None,
                        offset: 0,
                    });
                }
                for (field_name, value_expr) in field_initializers {
                    let value = self.lower_expr(value_expr)?;
                    self.push(Instruction::StoreField {
                        base: Self::var("this"),
                        field_name: field_name.clone(),
                        value,
                        offset: value_expr.offset(),
                    });
                }
                self.lower_stmt(body)
            }
        }
    }

    // -- statements -------------------------------------------------------

    fn lower_stmt(&mut self, stmt: &Stmt) -> BuildResult<()> {
        if self.is_terminated() {
            // §4.2 "Sequencing": further statements in the same syntactic
            // block are skipped once the block is dead.
            return Ok(());
        }
        match stmt {
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.lower_stmt(s)?;
                    if self.is_terminated() {
                        break;
                    }
                }
                Ok(())
            }
            Stmt::Empty => Ok(()),
            Stmt::VarDecl { name, init, offset } => {
                if let Some(init_expr) = init {
                    let value = self.lower_expr(init_expr)?;
                    self.push(Instruction::Assign { target: Variable::fresh(name), value, offset: *offset });
                }
                Ok(())
            }
            Stmt::Expr(expr) => {
                self.lower_expr(expr)?;
                Ok(())
            }
            Stmt::Return { value, offset } => {
                let value = value.as_ref().map(|e| self.lower_expr(e)).transpose()?;
                self.push(Instruction::Return { value, offset: *offset });
                Ok(())
            }
            Stmt::Throw { exception, offset } => {
                let exception = self.lower_expr(exception)?;
                self.push(Instruction::Throw { exception, offset: *offset });
                Ok(())
            }
            Stmt::Assert { condition, offset } => self.lower_assert(condition, *offset),
            Stmt::If { condition, then_branch, else_branch, offset } => {
                self.lower_if(condition, then_branch, else_branch.as_deref(), *offset)
            }
            Stmt::While { condition, body, offset } => self.lower_while(condition, body, *offset),
            Stmt::DoWhile { body, condition, offset } => self.lower_do_while(body, condition, *offset),
            Stmt::For { init, condition, update, body, offset } => {
                self.lower_for(init, condition.as_ref(), update, body, *offset)
            }
            Stmt::ForIn { loop_var, iterable, body, offset } => {
                self.lower_for_in(loop_var.as_deref(), iterable, body, *offset)
            }
            Stmt::Break { offset } => {
                let target = *self
                    .break_targets
                    .last()
                    .ok_or_else(|| IrBuildError::UnsupportedConstruct { kind: "break outside loop/switch".to_string(), offset: *offset })?;
                self.jump_to_unless_terminated(target, *offset);
                Ok(())
            }
            Stmt::Continue { offset } => {
                let target = *self
                    .continue_targets
                    .last()
                    .ok_or_else(|| IrBuildError::UnsupportedConstruct { kind: "continue outside loop".to_string(), offset: *offset })?;
                self.jump_to_unless_terminated(target, *offset);
                Ok(())
            }
            Stmt::Switch { discriminant, cases, offset } => self.lower_switch(discriminant, cases, *offset),
            Stmt::Try { body, catches, finally, offset } => {
                self.lower_try(body, catches, finally.as_deref(), *offset)
            }
        }
    }

    fn lower_assert(&mut self, condition: &Expr, offset: u32) -> BuildResult<()> {
        let cond_value = self.lower_expr(condition)?;
        let pass = self.fresh_block();
        let fail = self.fresh_block();
        self.push(Instruction::Branch { condition: cond_value, then_block: pass, else_block: fail, offset });
        self.connect(self.current_block, pass);
        self.connect(self.current_block, fail);

        self.current_block = fail;
        self.push(Instruction::Throw {
            exception: Value::NewObject { type_name: "AssertionError".to_string(), ctor_name: None, args: vec![] },
            offset,
        });

        self.current_block = pass;
        Ok(())
    }

    fn lower_if(&mut self, condition: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>, offset: u32) -> BuildResult<()> {
        let cond_value = self.lower_expr(condition)?;
        let then_block = self.fresh_block();
        let else_block = self.fresh_block();
        let merge_block = self.fresh_block();

        self.push(Instruction::Branch { condition: cond_value, then_block, else_block, offset });
        self.connect(self.current_block, then_block);
        self.connect(self.current_block, else_block);

        self.current_block = then_block;
        self.lower_stmt(then_branch)?;
        self.jump_to_unless_terminated(merge_block, offset);

        self.current_block = else_block;
        if let Some(else_branch) = else_branch {
            self.lower_stmt(else_branch)?;
        }
        self.jump_to_unless_terminated(merge_block, offset);

        self.current_block = merge_block;
        Ok(())
    }

    fn lower_while(&mut self, condition: &Expr, body: &Stmt, offset: u32) -> BuildResult<()> {
        let header = self.fresh_block();
        let loop_body = self.fresh_block();
        let exit = self.fresh_block();

        self.jump_to_unless_terminated(header, offset);
        self.current_block = header;
        let cond_value = self.lower_expr(condition)?;
        self.push(Instruction::Branch { condition: cond_value, then_block: loop_body, else_block: exit, offset });
        self.connect(header, loop_body);
        self.connect(header, exit);

        self.break_targets.push(exit);
        self.continue_targets.push(header);
        self.current_block = loop_body;
        self.lower_stmt(body)?;
        self.jump_to_unless_terminated(header, offset);
        self.break_targets.pop();
        self.continue_targets.pop();

        self.current_block = exit;
        Ok(())
    }

    fn lower_do_while(&mut self, body: &Stmt, condition: &Expr, offset: u32) -> BuildResult<()> {
        let loop_body = self.fresh_block();
        let cond_block = self.fresh_block();
        let exit = self.fresh_block();

        self.jump_to_unless_terminated(loop_body, offset);

        self.break_targets.push(exit);
        self.continue_targets.push(cond_block);
        self.current_block = loop_body;
        self.lower_stmt(body)?;
        self.jump_to_unless_terminated(cond_block, offset);
        self.break_targets.pop();
        self.continue_targets.pop();

        self.current_block = cond_block;
        let cond_value = self.lower_expr(condition)?;
        self.push(Instruction::Branch { condition: cond_value, then_block: loop_body, else_block: exit, offset });
        self.connect(cond_block, loop_body);
        self.connect(cond_block, exit);

        self.current_block = exit;
        Ok(())
    }

    fn lower_for(&mut self, init: &[Stmt], condition: Option<&Expr>, update: &[Expr], body: &Stmt, offset: u32) -> BuildResult<()> {
        for s in init {
            self.lower_stmt(s)?;
        }

        let header = self.fresh_block();
        let loop_body = self.fresh_block();
        let update_block = self.fresh_block();
        let exit = self.fresh_block();

        self.jump_to_unless_terminated(header, offset);
        self.current_block = header;
        let cond_value = match condition {
            Some(c) => self.lower_expr(c)?,
            None => Value::Constant(Literal::Bool(true)),
        };
        self.push(Instruction::Branch { condition: cond_value, then_block: loop_body, else_block: exit, offset });
        self.connect(header, loop_body);
        self.connect(header, exit);

        self.break_targets.push(exit);
        self.continue_targets.push(update_block);
        self.current_block = loop_body;
        self.lower_stmt(body)?;
        self.jump_to_unless_terminated(update_block, offset);
        self.break_targets.pop();
        self.continue_targets.pop();

        self.current_block = update_block;
        for e in update {
            self.lower_expr(e)?;
        }
        self.jump_to_unless_terminated(header, offset);

        self.current_block = exit;
        Ok(())
    }

    /// `for-in` desugars to `iter = iterable.iterator; while
    /// (iter.moveNext()) { loopVar = iter.current; body; }` (§4.2).
    fn lower_for_in(&mut self, loop_var: Option<&str>, iterable: &Expr, body: &Stmt, offset: u32) -> BuildResult<()> {
        let iterable_value = self.lower_expr(iterable)?;
        let iter_var = self.fresh_temp();
        self.push(Instruction::Assign {
            target: iter_var.clone(),
            value: Value::FieldAccess { receiver: Box::new(iterable_value), field_name: "iterator".to_string() },
            offset,
        });

        let header = self.fresh_block();
        let loop_body = self.fresh_block();
        let exit = self.fresh_block();

        self.jump_to_unless_terminated(header, offset);
        self.current_block = header;
        let cond_result = self.fresh_temp();
        self.push(Instruction::Call {
            receiver: Some(Value::Var(iter_var.clone())),
            method_name: "moveNext".to_string(),
            args: vec![],
            result: Some(cond_result.clone()),
            offset,
        });
        self.push(Instruction::Branch {
            condition: Value::Var(cond_result),
            then_block: loop_body,
            else_block: exit,
            offset,
        });
        self.connect(header, loop_body);
        self.connect(header, exit);

        self.break_targets.push(exit);
        self.continue_targets.push(header);
        self.current_block = loop_body;
        // A missing loop variable still synthesizes a fresh temp to receive
        // `iter.current` (§4.2 "for-in with no loop variable synthesizes a
        // fresh temp").
        let loop_var_name = match loop_var {
            Some(name) => name.to_string(),
            None => format!("_t{}", self.temp_counter),
        };
        if loop_var.is_none() {
            self.temp_counter += 1;
        }
        self.push(Instruction::Assign {
            target: Variable::fresh(&loop_var_name),
            value: Value::FieldAccess { receiver: Box::new(Value::Var(iter_var)), field_name: "current".to_string() },
            offset,
        });
        self.lower_stmt(body)?;
        self.jump_to_unless_terminated(header, offset);
        self.break_targets.pop();
        self.continue_targets.pop();

        self.current_block = exit;
        Ok(())
    }

    fn lower_switch(&mut self, discriminant: &Expr, cases: &[SwitchCase], offset: u32) -> BuildResult<()> {
        let discriminant_value = self.lower_expr(discriminant)?;
        let switch_temp = self.fresh_temp();
        self.push(Instruction::Assign { target: switch_temp.clone(), value: discriminant_value, offset });

        let exit = self.fresh_block();
        self.break_targets.push(exit);

        let non_default: Vec<&SwitchCase> = cases.iter().filter(|c| c.value.is_some()).collect();
        let default_case = cases.iter().find(|c| c.value.is_none());

        // One body block per case, allocated up front so fall-through can
        // reference the next case's body block while lowering the current
        // one (§4.2 "Switch").
        let mut body_blocks: Vec<BlockId> = non_default.iter().map(|_| self.fresh_block()).collect();
        let default_block = default_case.map(|_| self.fresh_block());

        // Test chain: `Binary('==', switchTemp, caseValue)` then `Branch`.
        for (i, case) in non_default.iter().enumerate() {
            let case_value = self.lower_expr(case.value.as_ref().unwrap())?;
            let test_temp = self.fresh_temp();
            self.push(Instruction::Assign {
                target: test_temp.clone(),
                value: Value::Binary(BinaryOp::Eq, Box::new(Value::Var(switch_temp.clone())), Box::new(case_value)),
                offset,
            });
            let next_test_block = if i + 1 < non_default.len() {
                self.fresh_block()
            } else {
                default_block.unwrap_or(exit)
            };
            self.push(Instruction::Branch {
                condition: Value::Var(test_temp),
                then_block: body_blocks[i],
                else_block: next_test_block,
                offset,
            });
            self.connect(self.current_block, body_blocks[i]);
            self.connect(self.current_block, next_test_block);
            self.current_block = next_test_block;
        }
        if non_default.is_empty() {
            // No labeled cases: fall straight through to default (or exit).
            self.jump_to_unless_terminated(default_block.unwrap_or(exit), offset);
        }

        // Lower each case body; fall-through connects the unterminated
        // tail of one body to the start of the next.
        for (i, case) in non_default.iter().enumerate() {
            self.current_block = body_blocks[i];
            for s in &case.body {
                self.lower_stmt(s)?;
                if self.is_terminated() {
                    break;
                }
            }
            let next = if i + 1 < body_blocks.len() { body_blocks[i + 1] } else { default_block.unwrap_or(exit) };
            self.jump_to_unless_terminated(next, offset);
        }
        if let (Some(default_case), Some(default_block)) = (default_case, default_block) {
            self.current_block = default_block;
            for s in &default_case.body {
                self.lower_stmt(s)?;
                if self.is_terminated() {
                    break;
                }
            }
            self.jump_to_unless_terminated(exit, offset);
        }

        let _ = &mut body_blocks; // silence "unused mut" when non_default is empty
        self.break_targets.pop();
        self.current_block = exit;
        Ok(())
    }

    /// Conservative exception edges: every block created while lowering the
    /// try body gets an edge to every catch block (§4.2 "Try/catch/finally",
    /// §9 open question 2).
    fn lower_try(&mut self, body: &Stmt, catches: &[CatchClause], finally: Option<&Stmt>, offset: u32) -> BuildResult<()> {
        let try_block = self.fresh_block();
        self.jump_to_unless_terminated(try_block, offset);

        let catch_blocks: Vec<BlockId> = catches.iter().map(|_| self.fresh_block()).collect();
        let merge_block = self.fresh_block();

        let try_body_start = self.cfg.block_count();
        self.current_block = try_block;
        self.lower_stmt(body)?;
        self.jump_to_unless_terminated(merge_block, offset);
        let try_body_end = self.cfg.block_count();

        // `try_block` itself plus every block created while lowering the
        // body connects to every catch block (§4.2 "Try/catch/finally").
        // `try_block`'s own id is tracked directly rather than reconstructed
        // from `block_count()`, since `catch_blocks`/`merge_block` were
        // already allocated by the time body lowering starts.
        for &catch in &catch_blocks {
            self.connect(try_block, catch);
        }
        for block in self.cfg.blocks()[try_body_start..try_body_end].to_vec() {
            for &catch in &catch_blocks {
                self.connect(block.id, catch);
            }
        }

        for (catch, clause) in catch_blocks.iter().zip(catches.iter()) {
            self.current_block = *catch;
            self.lower_stmt(&clause.body)?;
            self.jump_to_unless_terminated(merge_block, offset);
        }

        self.current_block = merge_block;
        if let Some(finally_stmt) = finally {
            let finally_block = self.fresh_block();
            let post_finally = self.fresh_block();
            self.jump_to_unless_terminated(finally_block, offset);
            self.current_block = finally_block;
            self.lower_stmt(finally_stmt)?;
            self.jump_to_unless_terminated(post_finally, offset);
            self.current_block = post_finally;
        }
        Ok(())
    }

    // -- expressions ------------------------------------------------------

    fn lower_expr(&mut self, expr: &Expr) -> BuildResult<Value> {
        match expr {
            Expr::IntLiteral(v, _) => Ok(Value::Constant(Literal::Int(*v))),
            Expr::DoubleLiteral(v, _) => Ok(Value::Constant(Literal::Double(v.to_bits()))),
            Expr::BoolLiteral(v, _) => Ok(Value::Constant(Literal::Bool(*v))),
            Expr::StringLiteral(v, _) => Ok(Value::Constant(Literal::Str(v.clone()))),
            Expr::NullLiteral(_) => Ok(Value::Constant(Literal::Null)),
            Expr::Identifier(name, _) => Ok(Value::Var(Variable::fresh(name))),

            Expr::Binary { op, left, right, offset } => {
                let l = self.lower_expr(left)?;
                let r = self.lower_expr(right)?;
                let _ = offset;
                Ok(Value::Binary(*op, Box::new(l), Box::new(r)))
            }
            Expr::Unary { op, operand, .. } => {
                let v = self.lower_expr(operand)?;
                Ok(Value::Unary(*op, Box::new(v)))
            }
            Expr::Postfix { op, operand, offset } => self.lower_postfix(*op, operand, *offset),

            Expr::PropertyAccess { receiver, name, offset } => {
                let base = self.lower_expr(receiver)?;
                let result = self.fresh_temp();
                self.push(Instruction::LoadField { base, field_name: name.clone(), result: result.clone(), offset: *offset });
                Ok(Value::Var(result))
            }
            Expr::NullAwarePropertyAccess { receiver, name, offset } => self.lower_null_aware_access(receiver, name, *offset),

            Expr::Index { receiver, index, offset } => {
                let base = self.lower_expr(receiver)?;
                let index = self.lower_expr(index)?;
                let result = self.fresh_temp();
                self.push(Instruction::LoadIndex { base, index, result: result.clone(), offset: *offset });
                Ok(Value::Var(result))
            }
            Expr::MethodInvocation { receiver, method_name, args, offset } => {
                let receiver = receiver.as_ref().map(|r| self.lower_expr(r)).transpose()?;
                let arg_values = args.iter().map(|a| self.lower_expr(a)).collect::<BuildResult<Vec<_>>>()?;
                let result = self.fresh_temp();
                self.push(Instruction::Call {
                    receiver,
                    method_name: method_name.clone(),
                    args: arg_values,
                    result: Some(result.clone()),
                    offset: *offset,
                });
                Ok(Value::Var(result))
            }
            Expr::ObjectCreation { type_name, ctor_name, args, offset } => {
                let arg_values = args.iter().map(|a| self.lower_expr(a)).collect::<BuildResult<Vec<_>>>()?;
                let result = self.fresh_temp();
                self.push(Instruction::Assign {
                    target: result.clone(),
                    value: Value::NewObject { type_name: type_name.clone(), ctor_name: ctor_name.clone(), args: arg_values },
                    offset: *offset,
                });
                Ok(Value::Var(result))
            }
            Expr::Conditional { condition, then_expr, else_expr, offset } => {
                self.lower_conditional(condition, then_expr, else_expr, *offset)
            }
            Expr::Cascade { target, sections, offset } => self.lower_cascade(target, sections, *offset),
            Expr::ShortCircuit { op, left, right, offset } => self.lower_short_circuit(*op, left, right, *offset),
            Expr::Await { future, offset } => self.lower_await(future, *offset),
            Expr::Cast { operand, target_type, is_nullable, offset } => {
                let operand = self.lower_expr(operand)?;
                let result = self.fresh_temp();
                self.push(Instruction::Cast { operand, target_type: target_type.clone(), result: result.clone(), is_nullable: *is_nullable, offset: *offset });
                Ok(Value::Var(result))
            }
            Expr::TypeTest { operand, target_type, negated, offset } => {
                let operand = self.lower_expr(operand)?;
                let result = self.fresh_temp();
                self.push(Instruction::TypeCheck { operand, target_type: target_type.clone(), result: result.clone(), negated: *negated, offset: *offset });
                Ok(Value::Var(result))
            }
            Expr::Assignment { target, op, value, offset } => self.lower_assignment(target, *op, value, *offset),
        }
    }

    fn lower_postfix(&mut self, op: PostfixOp, operand: &Expr, offset: u32) -> BuildResult<Value> {
        // Capture the pre-update value in its own instruction first so SSA
        // renaming (which walks instructions in order) sees the value as it
        // was *before* the update, matching postfix semantics.
        let old_value = self.lower_expr(operand)?;
        let old_temp = self.fresh_temp();
        self.push(Instruction::Assign { target: old_temp.clone(), value: old_value, offset });

        let binary_op = match op {
            PostfixOp::Increment => BinaryOp::Add,
            PostfixOp::Decrement => BinaryOp::Sub,
        };
        let updated = Value::Binary(binary_op, Box::new(Value::Var(old_temp.clone())), Box::new(Value::Constant(Literal::Int(1))));
        self.store_into_target(operand, updated, offset)?;
        Ok(Value::Var(old_temp))
    }

    fn lower_null_aware_access(&mut self, receiver: &Expr, name: &str, offset: u32) -> BuildResult<Value> {
        let receiver_value = self.lower_expr(receiver)?;
        let is_null_temp = self.fresh_temp();
        self.push(Instruction::Assign {
            target: is_null_temp.clone(),
            value: Value::Binary(BinaryOp::Eq, Box::new(receiver_value.clone()), Box::new(Value::Constant(Literal::Null))),
            offset,
        });

        let result = self.fresh_temp();
        let null_block = self.fresh_block();
        let nonnull_block = self.fresh_block();
        let merge = self.fresh_block();

        self.push(Instruction::Branch { condition: Value::Var(is_null_temp), then_block: null_block, else_block: nonnull_block, offset });
        self.connect(self.current_block, null_block);
        self.connect(self.current_block, nonnull_block);

        self.current_block = null_block;
        self.push(Instruction::Assign { target: result.clone(), value: Value::Constant(Literal::Null), offset });
        self.jump_to_unless_terminated(merge, offset);

        self.current_block = nonnull_block;
        self.push(Instruction::LoadField { base: receiver_value, field_name: name.to_string(), result: result.clone(), offset });
        self.jump_to_unless_terminated(merge, offset);

        self.current_block = merge;
        Ok(Value::Var(result))
    }

    fn lower_conditional(&mut self, condition: &Expr, then_expr: &Expr, else_expr: &Expr, offset: u32) -> BuildResult<Value> {
        let cond_value = self.lower_expr(condition)?;
        let then_block = self.fresh_block();
        let else_block = self.fresh_block();
        let merge = self.fresh_block();
        let result = self.fresh_temp();

        self.push(Instruction::Branch { condition: cond_value, then_block, else_block, offset });
        self.connect(self.current_block, then_block);
        self.connect(self.current_block, else_block);

        self.current_block = then_block;
        let then_value = self.lower_expr(then_expr)?;
        self.push(Instruction::Assign { target: result.clone(), value: then_value, offset });
        self.jump_to_unless_terminated(merge, offset);

        self.current_block = else_block;
        let else_value = self.lower_expr(else_expr)?;
        self.push(Instruction::Assign { target: result.clone(), value: else_value, offset });
        self.jump_to_unless_terminated(merge, offset);

        self.current_block = merge;
        Ok(Value::Var(result))
    }

    fn lower_cascade(&mut self, target: &Expr, sections: &[CascadeSection], offset: u32) -> BuildResult<Value> {
        let target_value = self.lower_expr(target)?;
        let temp = self.fresh_temp();
        self.push(Instruction::Assign { target: temp.clone(), value: target_value, offset });

        for section in sections {
            match section {
                CascadeSection::Call { method_name, args } => {
                    let arg_values = args.iter().map(|a| self.lower_expr(a)).collect::<BuildResult<Vec<_>>>()?;
                    self.push(Instruction::Call {
                        receiver: Some(Value::Var(temp.clone())),
                        method_name: method_name.clone(),
                        args: arg_values,
                        result: None,
                        offset,
                    });
                }
                CascadeSection::FieldSet { field_name, value } => {
                    let value = self.lower_expr(value)?;
                    self.push(Instruction::StoreField { base: Value::Var(temp.clone()), field_name: field_name.clone(), value, offset });
                }
            }
        }
        Ok(Value::Var(temp))
    }

    /// `&&` evaluates right only on true side, `||` only on false side,
    /// `??` only on null side (§4.2).
    fn lower_short_circuit(&mut self, op: ShortCircuitOp, left: &Expr, right: &Expr, offset: u32) -> BuildResult<Value> {
        let left_value = self.lower_expr(left)?;
        let result = self.fresh_temp();
        let rhs_block = self.fresh_block();
        let shortcut_block = self.fresh_block();
        let merge = self.fresh_block();

        match op {
            ShortCircuitOp::And => {
                self.push(Instruction::Branch { condition: left_value, then_block: rhs_block, else_block: shortcut_block, offset });
                self.connect(self.current_block, rhs_block);
                self.connect(self.current_block, shortcut_block);

                self.current_block = rhs_block;
                let right_value = self.lower_expr(right)?;
                self.push(Instruction::Assign { target: result.clone(), value: right_value, offset });
                self.jump_to_unless_terminated(merge, offset);

                self.current_block = shortcut_block;
                self.push(Instruction::Assign { target: result.clone(), value: Value::Constant(Literal::Bool(false)), offset });
                self.jump_to_unless_terminated(merge, offset);
            }
            ShortCircuitOp::Or => {
                self.push(Instruction::Branch { condition: left_value, then_block: shortcut_block, else_block: rhs_block, offset });
                self.connect(self.current_block, shortcut_block);
                self.connect(self.current_block, rhs_block);

                self.current_block = shortcut_block;
                self.push(Instruction::Assign { target: result.clone(), value: Value::Constant(Literal::Bool(true)), offset });
                self.jump_to_unless_terminated(merge, offset);

                self.current_block = rhs_block;
                let right_value = self.lower_expr(right)?;
                self.push(Instruction::Assign { target: result.clone(), value: right_value, offset });
                self.jump_to_unless_terminated(merge, offset);
            }
            ShortCircuitOp::NullCoalesce => {
                let is_null_temp = self.fresh_temp();
                self.push(Instruction::Assign {
                    target: is_null_temp.clone(),
                    value: Value::Binary(BinaryOp::Eq, Box::new(left_value.clone()), Box::new(Value::Constant(Literal::Null))),
                    offset,
                });
                // `rhs_block` is the null side here (right evaluated only
                // when the left is null); `shortcut_block` is the non-null
                // side that just keeps `left_value`.
                self.push(Instruction::Branch { condition: Value::Var(is_null_temp), then_block: rhs_block, else_block: shortcut_block, offset });
                self.connect(self.current_block, rhs_block);
                self.connect(self.current_block, shortcut_block);

                self.current_block = rhs_block;
                let right_value = self.lower_expr(right)?;
                self.push(Instruction::Assign { target: result.clone(), value: right_value, offset });
                self.jump_to_unless_terminated(merge, offset);

                self.current_block = shortcut_block;
                self.push(Instruction::Assign { target: result.clone(), value: left_value, offset });
                self.jump_to_unless_terminated(merge, offset);
            }
        }

        self.current_block = merge;
        Ok(Value::Var(result))
    }

    fn lower_await(&mut self, future: &Expr, offset: u32) -> BuildResult<Value> {
        let future_value = self.lower_expr(future)?;
        let result = self.fresh_temp();
        let continuation = self.fresh_block();
        self.push(Instruction::Await { future: future_value, result: result.clone(), offset });
        self.connect(self.current_block, continuation);
        self.current_block = continuation;
        Ok(Value::Var(result))
    }

    fn lower_assignment(&mut self, target: &Expr, op: Option<BinaryOp>, value: &Expr, offset: u32) -> BuildResult<Value> {
        let rhs = self.lower_expr(value)?;
        let new_value = match op {
            None => rhs,
            Some(op) => {
                let current = self.lower_expr(target)?;
                Value::Binary(op, Box::new(current), Box::new(rhs))
            }
        };
        self.store_into_target(target, new_value.clone(), offset)?;
        Ok(new_value)
    }

    /// Emits the store instruction for an assignment target: plain
    /// `Assign` for an identifier, `StoreField`/`StoreIndex` for a
    /// property/index target (§4.2 "Assignment").
    fn store_into_target(&mut self, target: &Expr, value: Value, offset: u32) -> BuildResult<()> {
        match target {
            Expr::Identifier(name, _) => {
                self.push(Instruction::Assign { target: Variable::fresh(name), value, offset });
                Ok(())
            }
            Expr::PropertyAccess { receiver, name, .. } => {
                let base = self.lower_expr(receiver)?;
                self.push(Instruction::StoreField { base, field_name: name.clone(), value, offset });
                Ok(())
            }
            Expr::Index { receiver, index, .. } => {
                let base = self.lower_expr(receiver)?;
                let index = self.lower_expr(index)?;
                self.push(Instruction::StoreIndex { base, index, value, offset });
                Ok(())
            }
            other => {
                trace!(offset = other.offset(), "unsupported assignment target");
                Err(IrBuildError::UnsupportedConstruct { kind: "assignment target".to_string(), offset: other.offset() })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ir_model::Instruction;

    fn func(body: Stmt) -> Declaration {
        Declaration::Function { name: "f".to_string(), params: vec![], body }
    }

    /// Scenario A from §8: an empty body yields entry, a single `Return`,
    /// no other blocks.
    #[test]
    fn empty_body_yields_single_return() {
        let cfg = build_cfg(&func(Stmt::Block(vec![]))).unwrap();
        assert_eq!(cfg.block_count(), 1);
        let entry = cfg.block(cfg.entry);
        assert_eq!(entry.instructions.len(), 1);
        assert!(matches!(entry.instructions[0], Instruction::Return { value: None, .. }));
    }

    /// Scenario B from §8: `return a && b` produces a diamond CFG.
    #[test]
    fn short_circuit_and_produces_diamond() {
        let body = Stmt::Block(vec![Stmt::Return {
            value: Some(Expr::ShortCircuit {
                op: ShortCircuitOp::And,
                left: Box::new(Expr::Identifier("a".to_string(), 0)),
                right: Box::new(Expr::Identifier("b".to_string(), 0)),
                offset: 0,
            }),
            offset: 0,
        }]);
        let decl = Declaration::Function { name: "g".to_string(), params: vec!["a".to_string(), "b".to_string()], body };
        let cfg = build_cfg(&decl).unwrap();
        // entry, rhs_block, shortcut_block, merge == 4 blocks minimum.
        assert!(cfg.block_count() >= 4);
        let entry = cfg.block(cfg.entry);
        assert!(matches!(entry.terminator(), Some(Instruction::Branch { .. })));
    }

    #[test]
    fn if_without_else_still_merges() {
        let body = Stmt::Block(vec![
            Stmt::If {
                condition: Expr::Identifier("cond".to_string(), 0),
                then_branch: Box::new(Stmt::Expr(Expr::Identifier("a".to_string(), 0))),
                else_branch: None,
                offset: 0,
            },
            Stmt::Return { value: None, offset: 0 },
        ]);
        let decl = Declaration::Function { name: "h".to_string(), params: vec!["cond".to_string()], body };
        let cfg = build_cfg(&decl).unwrap();
        for id in cfg.reachable_blocks() {
            let block = cfg.block(id);
            assert!(block.is_terminated() || id == cfg.entry, "block {id} has no terminator");
        }
    }

    #[test]
    fn break_outside_loop_is_unsupported_construct() {
        let body = Stmt::Block(vec![Stmt::Break { offset: 5 }]);
        let err = build_cfg(&func(body)).unwrap_err();
        assert!(matches!(err, IrBuildError::UnsupportedConstruct { offset: 5, .. }));
    }

    #[test]
    fn try_body_blocks_connect_to_every_catch() {
        let body = Stmt::Block(vec![Stmt::Try {
            body: Box::new(Stmt::Block(vec![
                Stmt::If {
                    condition: Expr::Identifier("cond".to_string(), 0),
                    then_branch: Box::new(Stmt::Expr(Expr::Identifier("a".to_string(), 0))),
                    else_branch: Some(Box::new(Stmt::Expr(Expr::Identifier("b".to_string(), 0)))),
                    offset: 0,
                },
                Stmt::Expr(Expr::Identifier("c".to_string(), 0)),
            ])),
            catches: vec![CatchClause {
                exception_type: Some("Exception".to_string()),
                body: Stmt::Expr(Expr::MethodInvocation { receiver: None, method_name: "handle".to_string(), args: vec![], offset: 0 }),
            }],
            finally: None,
            offset: 0,
        }]);
        let decl = Declaration::Function { name: "t".to_string(), params: vec!["cond".to_string()], body };
        let cfg = build_cfg(&decl).unwrap();

        // Find the catch block: the one whose instructions include the
        // lowered call to `handle`.
        let catch = cfg
            .blocks()
            .iter()
            .find(|b| b.instructions.iter().any(|i| matches!(i, Instruction::Call { method_name, .. } if method_name == "handle")))
            .map(|b| b.id)
            .expect("expected a lowered catch body block");

        // Every block created while lowering the try body (the if/else
        // diamond inside it, plus the try block itself) must have an edge
        // to the catch block, not just the entry block that starts the try.
        let try_related_blocks: Vec<_> = cfg.blocks().iter().filter(|b| b.id != catch && b.id != cfg.entry).map(|b| b.id).collect();
        let connected_to_catch = try_related_blocks.iter().filter(|&&id| cfg.block(id).successors.contains(&catch)).count();
        assert!(connected_to_catch >= 2, "expected multiple try-body blocks (including nested if/else) to connect to the catch block");
    }

    #[test]
    fn while_loop_has_back_edge() {
        let body = Stmt::Block(vec![Stmt::While {
            condition: Expr::Identifier("cond".to_string(), 0),
            body: Box::new(Stmt::Expr(Expr::Identifier("x".to_string(), 0))),
            offset: 0,
        }]);
        let decl = Declaration::Function { name: "loop".to_string(), params: vec!["cond".to_string()], body };
        let cfg = build_cfg(&decl).unwrap();
        // The loop body block's successor set must include the header,
        // forming the back-edge.
        let has_back_edge = cfg.blocks().iter().any(|b| b.successors.len() == 1 && cfg.blocks().iter().any(|h| h.successors.contains(&b.id) && b.successors.contains(&h.id)));
        assert!(has_back_edge);
    }
}
