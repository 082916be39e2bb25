//! C3 — SSA Builder (§4.3).

pub mod infrastructure;

pub use infrastructure::build_ssa;
