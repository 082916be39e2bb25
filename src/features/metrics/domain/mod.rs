mod debt_type;
mod report;

pub use debt_type::DebtType;
pub use report::{FunctionMetrics, HalsteadMetrics, MaintainabilityHistogram, MetricsReport, ThresholdViolation, ViolatedMetric};
