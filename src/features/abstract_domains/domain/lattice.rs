//! The shared abstract-domain contract (§4.6 "Lattice contract").

/// A bounded lattice with widening/narrowing, so one worklist interpreter
/// (infrastructure::worklist_interpreter) can drive any domain to a
/// fixpoint.
pub trait Lattice: Clone + PartialEq {
    fn bottom() -> Self;
    fn top() -> Self;
    fn is_bottom(&self) -> bool;
    fn is_top(&self) -> bool;
    fn join(&self, other: &Self) -> Self;
    fn meet(&self, other: &Self) -> Self;

    /// Accelerates convergence on loop headers past the widening threshold
    /// (§4.6 "Worklist fixpoint algorithm").
    fn widen(&self, other: &Self) -> Self;

    /// Recovers precision lost to widening during the narrowing phase.
    fn narrow(&self, other: &Self) -> Self;

    fn is_subset_of(&self, other: &Self) -> bool {
        &self.join(other) == other
    }
}
