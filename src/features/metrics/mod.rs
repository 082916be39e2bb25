//! C8 — Metrics Engine (§4.8).

pub mod domain;
pub mod infrastructure;

pub use domain::{DebtType, FunctionMetrics, MetricsReport};
pub use infrastructure::{aggregate, compute_function_metrics};
