mod interval;
mod lattice;
mod nullability;
mod product;

pub use interval::{Bound, Interval};
pub use lattice::Lattice;
pub use nullability::Nullability;
pub use product::AbstractValue;
