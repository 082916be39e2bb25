mod bounds_checker;
mod null_verifier;

pub use bounds_checker::{check_bounds, ArrayLengths};
pub use null_verifier::check_nulls;
