//! C7 — Bounds & Null Verifiers (§4.7).

pub mod domain;
pub mod infrastructure;

pub use domain::{BoundsCheckResult, Classification, NullCheckResult, NullSafety};
pub use infrastructure::{check_bounds, check_nulls, ArrayLengths};
