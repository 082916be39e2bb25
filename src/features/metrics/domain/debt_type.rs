//! The debt-source taxonomy shared by C8 (as violation causes) and C9
//! (as cost-model keys) — §4.8, §4.9.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DebtType {
    TodoComment,
    FixmeComment,
    SuppressedWarning,
    DynamicCast,
    DeprecatedUsage,
    HighCyclomaticComplexity,
    HighCognitiveComplexity,
    LowMaintainability,
    FunctionTooLong,
    DuplicateCode,
}
