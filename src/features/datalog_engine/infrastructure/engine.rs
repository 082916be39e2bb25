//! C5 — Datalog Engine: stratified bottom-up evaluation to fixpoint
//! (§4.5).

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::errors::DatalogError;
use crate::features::datalog_engine::domain::{PredicateAtom, Rule, Term, UnsafeVariable};
use crate::features::datalog_engine::infrastructure::stratify::stratify;
use crate::features::fact_extractor::domain::{Atom, Fact};

type Tuple = Vec<Atom>;
type FactTable = HashMap<String, HashSet<Tuple>>;

/// A forward-chaining stratified Datalog evaluator. Owns one fact set and a
/// loaded program; `run()` computes the least fixpoint, after which
/// `query()` reads off derived facts by predicate name (§4.5 "Contract").
pub struct DatalogEngine {
    facts: FactTable,
    rules: Vec<Rule>,
    evaluated: bool,
}

impl DatalogEngine {
    pub fn new(initial_facts: Vec<Fact>) -> Self {
        let mut facts: FactTable = HashMap::new();
        for fact in initial_facts {
            facts.entry(fact.predicate).or_default().insert(fact.args);
        }
        Self { facts, rules: Vec::new(), evaluated: false }
    }

    /// Loads a rule set, validating safety eagerly (§4.5 "Errors").
    pub fn add_rules(&mut self, rules: Vec<Rule>) -> Result<(), DatalogError> {
        for rule in &rules {
            match rule.unsafe_variable() {
                Some(UnsafeVariable::Head(variable)) => {
                    return Err(DatalogError::UnsafeHeadVariable { head_predicate: rule.head.predicate.clone(), variable });
                }
                Some(UnsafeVariable::Negated(variable)) => {
                    return Err(DatalogError::UnsafeNegatedVariable { head_predicate: rule.head.predicate.clone(), variable });
                }
                None => {}
            }
        }
        self.rules.extend(rules);
        self.evaluated = false;
        Ok(())
    }

    /// Runs every loaded rule to its stratified fixpoint (§4.5).
    pub fn run(&mut self) -> Result<(), DatalogError> {
        let strata = stratify(&self.rules)?;
        let mut rules_by_stratum: HashMap<usize, Vec<Rule>> = HashMap::new();
        for rule in self.rules.clone() {
            let stratum = *strata.get(&rule.head.predicate).unwrap_or(&0);
            rules_by_stratum.entry(stratum).or_default().push(rule);
        }
        let mut stratum_ids: Vec<usize> = rules_by_stratum.keys().copied().collect();
        stratum_ids.sort_unstable();

        for stratum in stratum_ids {
            let rules = &rules_by_stratum[&stratum];
            debug!(stratum, rule_count = rules.len(), "evaluating datalog stratum");
            self.evaluate_stratum_to_fixpoint(rules);
        }
        self.evaluated = true;
        Ok(())
    }

    fn evaluate_stratum_to_fixpoint(&mut self, rules: &[Rule]) {
        loop {
            let mut newly_derived: Vec<(String, Tuple)> = Vec::new();
            for rule in rules {
                for tuple in evaluate_rule(rule, &self.facts) {
                    let table = self.facts.entry(rule.head.predicate.clone()).or_default();
                    if !table.contains(&tuple) {
                        newly_derived.push((rule.head.predicate.clone(), tuple));
                    }
                }
            }
            if newly_derived.is_empty() {
                break;
            }
            for (predicate, tuple) in newly_derived {
                self.facts.entry(predicate).or_default().insert(tuple);
            }
        }
    }

    /// Derived facts for `predicate` after `run()` (§4.5 "Query API").
    pub fn query(&self, predicate: &str) -> Vec<Fact> {
        if !self.evaluated {
            warn!(predicate, "query() called before run() — returning base facts only");
        }
        self.facts
            .get(predicate)
            .map(|tuples| tuples.iter().cloned().map(|args| Fact::new(predicate, args)).collect())
            .unwrap_or_default()
    }
}

type Substitution = HashMap<String, Atom>;

fn evaluate_rule(rule: &Rule, facts: &FactTable) -> Vec<Tuple> {
    let mut solutions = Vec::new();
    solve_body(&rule.positive_body, 0, Substitution::new(), facts, &mut solutions);

    let mut results = Vec::new();
    'solutions: for subst in solutions {
        for negated in &rule.negated_body {
            let tuple: Tuple = negated
                .terms
                .iter()
                .map(|t| match t {
                    Term::Const(c) => c.clone(),
                    Term::Var(name) => subst.get(name).cloned().expect("rule safety guarantees negated vars are bound"),
                })
                .collect();
            if facts.get(&negated.predicate).map(|s| s.contains(&tuple)).unwrap_or(false) {
                continue 'solutions;
            }
        }
        let head_tuple: Tuple = rule
            .head
            .terms
            .iter()
            .map(|t| match t {
                Term::Const(c) => c.clone(),
                Term::Var(name) => subst.get(name).cloned().expect("rule safety guarantees head vars are bound"),
            })
            .collect();
        results.push(head_tuple);
    }
    results
}

fn solve_body(atoms: &[PredicateAtom], index: usize, subst: Substitution, facts: &FactTable, out: &mut Vec<Substitution>) {
    if index == atoms.len() {
        out.push(subst);
        return;
    }
    let atom = &atoms[index];
    let Some(candidates) = facts.get(&atom.predicate) else { return };
    for tuple in candidates {
        if tuple.len() != atom.terms.len() {
            continue;
        }
        let mut next = subst.clone();
        let mut matched = true;
        for (term, value) in atom.terms.iter().zip(tuple.iter()) {
            match term {
                Term::Const(c) => {
                    if c != value {
                        matched = false;
                        break;
                    }
                }
                Term::Var(name) => match next.get(name) {
                    Some(existing) if existing != value => {
                        matched = false;
                        break;
                    }
                    Some(_) => {}
                    None => {
                        next.insert(name.clone(), value.clone());
                    }
                },
            }
        }
        if matched {
            solve_body(atoms, index + 1, next, facts, out);
        }
    }
}
