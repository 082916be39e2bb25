//! The combined interval × nullability product domain (§4.6 "Combined
//! domain").

use std::fmt;

use super::interval::Interval;
use super::lattice::Lattice;
use super::nullability::Nullability;

/// Pairs the two domains pointwise; every lattice operation is the
/// componentwise operation on each half.
#[derive(Debug, Clone, PartialEq)]
pub struct AbstractValue {
    pub interval: Interval,
    pub nullability: Nullability,
}

impl AbstractValue {
    pub fn new(interval: Interval, nullability: Nullability) -> Self {
        Self { interval, nullability }
    }

    pub fn exact_int(value: i64) -> Self {
        Self::new(Interval::exact(value), Nullability::NonNull)
    }

    pub fn null() -> Self {
        Self::new(Interval::bottom(), Nullability::Null)
    }
}

impl Lattice for AbstractValue {
    fn bottom() -> Self {
        Self::new(Interval::bottom(), Nullability::bottom())
    }

    fn top() -> Self {
        Self::new(Interval::top(), Nullability::top())
    }

    fn is_bottom(&self) -> bool {
        self.interval.is_bottom() && self.nullability.is_bottom()
    }

    fn is_top(&self) -> bool {
        self.interval.is_top() && self.nullability.is_top()
    }

    fn join(&self, other: &Self) -> Self {
        Self::new(self.interval.join(&other.interval), self.nullability.join(&other.nullability))
    }

    fn meet(&self, other: &Self) -> Self {
        Self::new(self.interval.meet(&other.interval), self.nullability.meet(&other.nullability))
    }

    fn widen(&self, other: &Self) -> Self {
        Self::new(self.interval.widen(&other.interval), self.nullability.widen(&other.nullability))
    }

    fn narrow(&self, other: &Self) -> Self {
        Self::new(self.interval.narrow(&other.interval), self.nullability.narrow(&other.nullability))
    }
}

impl fmt::Display for AbstractValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.interval, self.nullability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_combines_both_components_independently() {
        let a = AbstractValue::exact_int(1);
        let b = AbstractValue::null();
        let joined = a.join(&b);
        assert_eq!(joined.nullability, Nullability::MaybeNull);
    }
}
