//! C6 — Abstract Interpreter & Domains (§4.6).

pub mod domain;
pub mod infrastructure;

pub use domain::{AbstractValue, Bound, Interval, Lattice, Nullability};
pub use infrastructure::{eval_value, refine_branch, run_fixpoint, step, FixpointResult, State};
