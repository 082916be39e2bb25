//! Debt severity and its cost multiplier (§4.9 "Cost model").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DebtSeverity {
    Critical,
    High,
    Medium,
    Low,
}
