//! C5 — Datalog Engine (§4.5).

pub mod domain;
pub mod infrastructure;

pub use domain::{PredicateAtom, Rule, Term};
pub use infrastructure::{rule_sets, DatalogEngine};
