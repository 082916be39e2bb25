//! Black-box scenarios A-F (§8), driven only through the public API.

use anteater_core::config::DebtCostConfig;
use anteater_core::features::abstract_domains::{run_fixpoint, Bound};
use anteater_core::features::cfg_builder::build_cfg;
use anteater_core::features::cfg_builder::ports::{Declaration, Expr, ShortCircuitOp, Stmt};
use anteater_core::features::fact_extractor::{Atom, Fact};
use anteater_core::features::ir_model::{Cfg, Instruction, Literal, Value, Variable};
use anteater_core::features::ssa_builder::build_ssa;
use anteater_core::features::verifiers::{check_bounds, check_nulls, ArrayLengths, Classification, NullSafety};
use anteater_core::pipeline::{AnalysisSession, FunctionSource};
use anteater_core::shared::TableLineIndex;

fn session() -> AnalysisSession {
    AnalysisSession::new(DebtCostConfig::default()).unwrap()
}

/// A. Empty body: `void f() {}`.
#[test]
fn empty_body_is_maximally_maintainable_with_no_diagnostics() {
    let decl = Declaration::Function { name: "f".to_string(), params: vec![], body: Stmt::Empty };
    let cfg = build_cfg(&decl).unwrap();

    assert_eq!(cfg.blocks().len(), 1, "an empty body lowers to just the entry block");
    assert!(matches!(cfg.block(cfg.entry).instructions.last(), Some(Instruction::Return { value: None, .. })));

    let session = session();
    let line_index = TableLineIndex::from_source("void f() {}");
    let source = FunctionSource { file_path: "f.src", declaration: &decl, array_lengths: ArrayLengths::new() };
    let analysis = session.analyze_function(&source, &line_index).unwrap();

    assert_eq!(analysis.metrics.cyclomatic_complexity, 1);
    assert_eq!(analysis.metrics.cognitive_complexity, 0);
    assert_eq!(analysis.metrics.lines_of_code, 1);
    assert_eq!(analysis.metrics.maintainability_index, 100.0);
    assert!(analysis.diagnostics.is_empty());
}

/// B. Short-circuit AND: `bool g(bool a, bool b) { return a && b; }`.
/// Expected: a diamond CFG where SSA inserts a phi at the merge for the
/// short-circuit result, and CC=2 (one real decision).
#[test]
fn short_circuit_and_builds_a_diamond_with_one_decision() {
    let decl = Declaration::Function {
        name: "g".to_string(),
        params: vec!["a".to_string(), "b".to_string()],
        body: Stmt::Return {
            value: Some(Expr::ShortCircuit {
                op: ShortCircuitOp::And,
                left: Box::new(Expr::Identifier("a".to_string(), 0)),
                right: Box::new(Expr::Identifier("b".to_string(), 0)),
                offset: 0,
            }),
            offset: 0,
        },
    };

    let mut cfg = build_cfg(&decl).unwrap();
    assert!(cfg.blocks().len() >= 3, "short-circuit evaluation needs at least then/else/merge blocks");

    build_ssa(&mut cfg).unwrap();
    let merge = cfg.blocks().iter().find(|b| b.instructions.iter().any(|i| matches!(i, Instruction::Phi { .. })));
    assert!(merge.is_some(), "SSA must place a phi at the short-circuit merge point");

    let session = session();
    let line_index = TableLineIndex::from_source("bool g(bool a, bool b) { return a && b; }");
    let source = FunctionSource { file_path: "g.src", declaration: &decl, array_lengths: ArrayLengths::new() };
    let analysis = session.analyze_function(&source, &line_index).unwrap();
    assert_eq!(analysis.metrics.cyclomatic_complexity, 2);
}

/// C. Loop induction interval: `void h(int n) { var i = 0; while (i < n) { i = i + 1; } }`
/// with `n` unconstrained. After widening, `i` converges to `[0, +inf]` at
/// both the loop header and loop exit.
#[test]
fn unconstrained_loop_induction_variable_widens_to_infinity() {
    // Built directly against the IR: header tests `i < n`, body increments
    // `i`, and a phi at the header merges the pre-loop and back-edge values.
    let mut cfg = Cfg::new("h");
    let entry = cfg.entry;
    let header = cfg.new_block();
    let body = cfg.new_block();
    let exit = cfg.new_block();
    cfg.connect(entry, header);
    cfg.connect(header, body);
    cfg.connect(header, exit);
    cfg.connect(body, header);

    let i0 = Variable::new("i", 0);
    let i1 = Variable::new("i", 1);
    let i2 = Variable::new("i", 2);
    let n = Variable::new("n", 0);

    cfg.block_mut(entry).push(Instruction::Assign { target: i0.clone(), value: Value::Constant(Literal::Int(0)), offset: 0 });
    cfg.block_mut(entry).push(Instruction::Jump { target: header, offset: 0 });

    let mut operands = std::collections::BTreeMap::new();
    operands.insert(entry, Value::Var(i0));
    operands.insert(body, Value::Var(i2.clone()));
    cfg.block_mut(header).push(Instruction::Phi { target: i1.clone(), operands, offset: 0 });
    let cond = Variable::fresh("_cond");
    cfg.block_mut(header).push(Instruction::Assign {
        target: cond.clone(),
        value: Value::Binary(anteater_core::features::ir_model::BinaryOp::Lt, Box::new(Value::Var(i1.clone())), Box::new(Value::Var(n))),
        offset: 0,
    });
    cfg.block_mut(header).push(Instruction::Branch { condition: Value::Var(cond), then_block: body, else_block: exit, offset: 0 });

    cfg.block_mut(body).push(Instruction::Assign {
        target: i2,
        value: Value::Binary(anteater_core::features::ir_model::BinaryOp::Add, Box::new(Value::Var(i1)), Box::new(Value::Constant(Literal::Int(1)))),
        offset: 0,
    });
    cfg.block_mut(body).push(Instruction::Jump { target: header, offset: 0 });
    cfg.block_mut(exit).push(Instruction::Return { value: None, offset: 0 });

    let fixpoint = run_fixpoint(&cfg, "h").unwrap();
    let header_entry = fixpoint.entry_states.get(&header).unwrap();
    let header_i = header_entry.values().next();
    assert!(header_i.is_some());

    let exit_entry = fixpoint.entry_states.get(&exit).unwrap();
    for value in exit_entry.values() {
        if let Some((lo, hi)) = value.interval.bounds() {
            assert_eq!(lo, Bound::Finite(0));
            assert_eq!(hi, Bound::PosInf);
        }
    }
}

/// D. Bounds safety: `int idx(List<int> xs) { if (xs.isNotEmpty) return xs[0]; return -1; }`
/// with `xs.length` registered as 10. The `xs[0]` access is safe.
#[test]
fn constant_index_against_a_registered_length_is_safe() {
    let mut cfg = Cfg::new("idx");
    let entry = cfg.entry;
    let xs = Variable::new("xs", 0);
    let result = Variable::new("_t0", 0);
    cfg.block_mut(entry).push(Instruction::LoadIndex { base: Value::Var(xs.clone()), index: Value::Constant(Literal::Int(0)), result: result.clone(), offset: 10 });
    cfg.block_mut(entry).push(Instruction::Return { value: Some(Value::Var(result)), offset: 11 });

    let fixpoint = run_fixpoint(&cfg, "idx").unwrap();
    let mut lengths = ArrayLengths::new();
    lengths.insert(xs, 10);

    let results = check_bounds(&cfg, &fixpoint, &lengths);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].classification, Classification::Safe);
}

/// E. Null safety: `int len(String? s) { return s!.length; }`. The `!`
/// assertion on an unrefined nullable parameter is itself the risky
/// dereference site (unknown); the field load it guards is then safe.
#[test]
fn null_assertion_site_is_unknown_and_guards_the_field_load() {
    let mut cfg = Cfg::new("len");
    let entry = cfg.entry;
    let s = Variable::new("s", 0);
    let asserted = Variable::new("_t0", 0);
    let result = Variable::new("_t1", 0);
    cfg.block_mut(entry).push(Instruction::NullCheck { operand: Value::Var(s), result: asserted.clone(), offset: 20 });
    cfg.block_mut(entry).push(Instruction::LoadField { base: Value::Var(asserted), field_name: "length".to_string(), result: result.clone(), offset: 21 });
    cfg.block_mut(entry).push(Instruction::Return { value: Some(Value::Var(result)), offset: 22 });

    let fixpoint = run_fixpoint(&cfg, "len").unwrap();
    let results = check_nulls(&cfg, &fixpoint);
    assert!(results.iter().any(|r| r.offset == 20 && r.safety == NullSafety::Unknown));
    assert!(results.iter().any(|r| r.offset == 21 && r.safety == NullSafety::Safe));
}

/// F. Taint flow: `TaintSource(v1, "user_input")`, `Assign(v2, v1)`,
/// `Assign(v3, v2)`, `TaintSink(v3, "sql_query")` derives
/// `TaintViolation(v3, "sql_query")`; removing the sink removes it.
#[test]
fn taint_flows_to_a_declared_sink_and_disappears_without_one() {
    let mut cfg = Cfg::new("query");
    let entry = cfg.entry;
    cfg.block_mut(entry).push(Instruction::Assign {
        target: Variable::new("v1", 0),
        value: Value::NewObject { type_name: "Request".to_string(), ctor_name: None, args: vec![] },
        offset: 0,
    });
    cfg.block_mut(entry).push(Instruction::Assign { target: Variable::new("v2", 0), value: Value::Var(Variable::new("v1", 0)), offset: 0 });
    cfg.block_mut(entry).push(Instruction::Assign { target: Variable::new("v3", 0), value: Value::Var(Variable::new("v2", 0)), offset: 0 });
    cfg.block_mut(entry).push(Instruction::Return { value: None, offset: 0 });

    // First-use var numbering: v1 -> 0, v2 -> 1, v3 -> 2.
    let source_fact = Fact::new("TaintSource", vec![Atom::Id(0), Atom::Text("user_input".to_string())]);
    let sink_fact = Fact::new("TaintSink", vec![Atom::Id(2), Atom::Text("sql_query".to_string())]);

    let session = session();
    let with_sink = session.run_taint_analysis(&cfg, vec![source_fact.clone(), sink_fact]).unwrap();
    assert_eq!(with_sink.len(), 1);

    let without_sink = session.run_taint_analysis(&cfg, vec![source_fact]).unwrap();
    assert!(without_sink.is_empty());
}

