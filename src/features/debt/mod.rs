//! C9 — Technical Debt Aggregator (§4.9).

pub mod domain;
pub mod infrastructure;

pub use domain::{DebtItem, DebtReport, DebtSeverity, DuplicateCodeReport};
pub use infrastructure::{aggregate, detect_deprecated_usage, detect_dynamic_casts, duplicate_reports_to_debt, metrics_violations_to_debt, scan_comments};
