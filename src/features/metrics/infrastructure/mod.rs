mod aggregator;
mod complexity;
mod dominators;
mod halstead;

pub use aggregator::{aggregate, compute_function_metrics, maintainability_index};
pub use complexity::{cognitive_complexity, cyclomatic_complexity};
pub use dominators::Dominators;
pub use halstead::halstead_metrics;
