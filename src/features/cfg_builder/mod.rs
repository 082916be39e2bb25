//! C2 — CFG Builder (§4.2).

pub mod infrastructure;
pub mod ports;

pub use infrastructure::build_cfg;
