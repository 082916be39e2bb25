mod comment_scanner;
mod cost_aggregator;
mod duplicate_code;
mod static_detectors;

pub use comment_scanner::scan_comments;
pub use cost_aggregator::aggregate;
pub use duplicate_code::duplicate_reports_to_debt;
pub use static_detectors::{detect_deprecated_usage, detect_dynamic_casts, metrics_violations_to_debt};
