//! Debt items and the aggregate report (§4.9).

use serde::{Deserialize, Serialize};

use crate::features::metrics::domain::DebtType;

use super::severity::DebtSeverity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtItem {
    pub debt_type: DebtType,
    pub severity: DebtSeverity,
    pub file_path: String,
    pub offset: u32,
    pub description: String,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtReport {
    pub items: Vec<DebtItem>,
    pub total_cost: f64,
    pub unit: String,
    pub exceeds_threshold: bool,
}

/// An externally detected duplicate-code finding (e.g. from a separate
/// clone-detection pass). Opaque to this crate beyond the fields needed to
/// cost it — §4.9 "Detection sources: duplicate-code reports as opaque
/// input".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCodeReport {
    pub file_path: String,
    pub offset: u32,
    pub duplicated_line_count: u32,
    pub clone_count: u32,
}
