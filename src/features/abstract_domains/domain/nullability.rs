//! The 4-point nullability lattice (§4.6 "Nullability domain").

use std::fmt;

use super::lattice::Lattice;

/// ```text
///        Top (MaybeNull)
///        /          \
///   NonNull        Null
///        \          /
///        Bottom (Unreachable)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullability {
    Bottom,
    NonNull,
    Null,
    MaybeNull,
}

impl Lattice for Nullability {
    fn bottom() -> Self {
        Nullability::Bottom
    }

    fn top() -> Self {
        Nullability::MaybeNull
    }

    fn is_bottom(&self) -> bool {
        matches!(self, Nullability::Bottom)
    }

    fn is_top(&self) -> bool {
        matches!(self, Nullability::MaybeNull)
    }

    fn join(&self, other: &Self) -> Self {
        use Nullability::*;
        match (self, other) {
            (Bottom, x) | (x, Bottom) => *x,
            (a, b) if a == b => *a,
            _ => MaybeNull,
        }
    }

    fn meet(&self, other: &Self) -> Self {
        use Nullability::*;
        match (self, other) {
            (MaybeNull, x) | (x, MaybeNull) => *x,
            (a, b) if a == b => *a,
            _ => Bottom,
        }
    }

    /// A 4-point lattice has no infinite ascending chains, so widening is
    /// just `join` (§4.6 "widen = join for finite-height domains").
    fn widen(&self, other: &Self) -> Self {
        self.join(other)
    }

    /// Symmetrically, narrow is `meet`.
    fn narrow(&self, other: &Self) -> Self {
        self.meet(other)
    }
}

impl Nullability {
    /// Branch refinement on `v == null` / `v != null` (§4.7 "Null
    /// verifier").
    pub fn apply_null_constraint(&self) -> Self {
        self.meet(&Nullability::Null)
    }

    pub fn apply_non_null_constraint(&self) -> Self {
        self.meet(&Nullability::NonNull)
    }

    pub fn may_be_null(&self) -> bool {
        matches!(self, Nullability::Null | Nullability::MaybeNull)
    }

    pub fn is_definitely_null(&self) -> bool {
        matches!(self, Nullability::Null)
    }
}

impl fmt::Display for Nullability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Nullability::Bottom => "⊥",
            Nullability::NonNull => "NonNull",
            Nullability::Null => "Null",
            Nullability::MaybeNull => "MaybeNull",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_of_null_and_non_null_is_maybe_null() {
        assert_eq!(Nullability::Null.join(&Nullability::NonNull), Nullability::MaybeNull);
    }

    #[test]
    fn meet_after_non_null_constraint_on_maybe_null_is_non_null() {
        assert_eq!(Nullability::MaybeNull.apply_non_null_constraint(), Nullability::NonNull);
    }

    #[test]
    fn meet_after_null_constraint_on_non_null_is_bottom() {
        assert_eq!(Nullability::NonNull.apply_null_constraint(), Nullability::Bottom);
    }
}
