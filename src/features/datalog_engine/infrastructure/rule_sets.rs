//! Built-in rule sets for the analyses named in §4.5: points-to,
//! reachability, and taint. Each factory returns a self-contained,
//! already-safety-checkable program.

use crate::features::datalog_engine::domain::{PredicateAtom, Rule, Term};

fn atom(predicate: &str, vars: &[&str]) -> PredicateAtom {
    PredicateAtom::new(predicate, vars.iter().map(|v| Term::var(*v)).collect())
}

/// `VarPointsTo`/`FieldPointsTo` via `Alloc`/`Assign`/`StoreField`/`LoadField`.
pub fn points_to_rules() -> Vec<Rule> {
    vec![
        Rule::new(atom("VarPointsTo", &["v", "h"]), vec![atom("Alloc", &["v", "h"])]),
        Rule::new(atom("VarPointsTo", &["v", "h"]), vec![atom("Assign", &["v", "w"]), atom("VarPointsTo", &["w", "h"])]),
        Rule::new(
            atom("FieldPointsTo", &["h", "f", "h2"]),
            vec![atom("StoreField", &["b", "f", "s"]), atom("VarPointsTo", &["b", "h"]), atom("VarPointsTo", &["s", "h2"])],
        ),
        Rule::new(
            atom("VarPointsTo", &["v", "h2"]),
            vec![atom("LoadField", &["b", "f", "v"]), atom("VarPointsTo", &["b", "h"]), atom("FieldPointsTo", &["h", "f", "h2"])],
        ),
    ]
}

/// `Reachable(s) :- Reachable(p), Flow(p, s).`
pub fn reachability_rules() -> Vec<Rule> {
    vec![Rule::new(atom("Reachable", &["s"]), vec![atom("Reachable", &["p"]), atom("Flow", &["p", "s"])])]
}

/// Taint propagation with sanitizer cutoff (§4.5 "Taint"). `Sanitized` is a
/// single-arg predicate over the variable alone: a rule author wanting
/// per-kind sanitizers distinguishes them with distinct predicate names
/// (e.g. `SanitizedSql`, `SanitizedHtml`) rather than a second column, since
/// a negated atom's variables must all be bound by the positive body and
/// nothing upstream of this rule binds a sanitizer kind.
pub fn taint_rules() -> Vec<Rule> {
    vec![
        Rule::new(atom("Tainted", &["v"]), vec![atom("TaintSource", &["v", "kind"])]),
        Rule::new(atom("Tainted", &["v"]), vec![atom("Assign", &["v", "w"]), atom("Tainted", &["w"])])
            .with_negation(vec![atom("Sanitized", &["v"])]),
        Rule::new(atom("TaintViolation", &["v", "sink"]), vec![atom("TaintSink", &["v", "sink"]), atom("Tainted", &["v"])]),
    ]
}

/// Objects that are never the source of a `StoreField` are deeply immutable
/// once constructed — an opaque-factory style rule (§4.5 "Deep immutability").
pub fn deep_immutability_rules() -> Vec<Rule> {
    vec![
        Rule::new(atom("Mutated", &["h"]), vec![atom("StoreField", &["b", "f", "s"]), atom("VarPointsTo", &["b", "h"])]),
        Rule::new(atom("DeeplyImmutable", &["h"]), vec![atom("Alloc", &["v", "h"])]).with_negation(vec![atom("Mutated", &["h"])]),
    ]
}
