//! Datalog rule syntax (§4.5 "A program of `Rule(head, body, negatedBody?)`").

use crate::features::fact_extractor::domain::Atom;

/// A rule-body term: either bound to a rule variable or a ground constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Var(String),
    Const(Atom),
}

impl Term {
    pub fn var(name: impl Into<String>) -> Self {
        Term::Var(name.into())
    }

    pub fn atom(atom: impl Into<Atom>) -> Self {
        Term::Const(atom.into())
    }
}

/// A predicate application appearing in a rule head or body, e.g.
/// `VarPointsTo(v, h)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PredicateAtom {
    pub predicate: String,
    pub terms: Vec<Term>,
}

impl PredicateAtom {
    pub fn new(predicate: impl Into<String>, terms: Vec<Term>) -> Self {
        Self { predicate: predicate.into(), terms }
    }
}

/// `head :- body, !negatedBody.` (§4.5).
#[derive(Debug, Clone)]
pub struct Rule {
    pub head: PredicateAtom,
    pub positive_body: Vec<PredicateAtom>,
    pub negated_body: Vec<PredicateAtom>,
}

impl Rule {
    pub fn new(head: PredicateAtom, positive_body: Vec<PredicateAtom>) -> Self {
        Self { head, positive_body, negated_body: Vec::new() }
    }

    pub fn with_negation(mut self, negated_body: Vec<PredicateAtom>) -> Self {
        self.negated_body = negated_body;
        self
    }

    /// Every variable bound by a rule's positive body, for safety checks.
    fn bound_vars(&self) -> std::collections::HashSet<&str> {
        self.positive_body
            .iter()
            .flat_map(|atom| &atom.terms)
            .filter_map(|t| match t {
                Term::Var(name) => Some(name.as_str()),
                Term::Const(_) => None,
            })
            .collect()
    }

    /// A rule is *unsafe* if the head or a negated atom references a
    /// variable the positive body never binds (§4.5 "Errors"). Distinguishes
    /// which side the offending variable came from, since the two cases get
    /// different error messages.
    pub fn unsafe_variable(&self) -> Option<UnsafeVariable> {
        let bound = self.bound_vars();
        for term in &self.head.terms {
            if let Term::Var(name) = term {
                if !bound.contains(name.as_str()) {
                    return Some(UnsafeVariable::Head(name.clone()));
                }
            }
        }
        for atom in &self.negated_body {
            for term in &atom.terms {
                if let Term::Var(name) = term {
                    if !bound.contains(name.as_str()) {
                        return Some(UnsafeVariable::Negated(name.clone()));
                    }
                }
            }
        }
        None
    }
}

/// Where an unsafe variable was found: the head, or a negated-body atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsafeVariable {
    Head(String),
    Negated(String),
}
