mod rule;

pub use rule::{PredicateAtom, Rule, Term, UnsafeVariable};
