mod report;

pub use report::{BoundsCheckResult, Classification, NullCheckResult, NullSafety};
