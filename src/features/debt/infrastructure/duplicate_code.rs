//! Turns opaque, externally supplied duplicate-code findings into debt
//! items (§4.9 "Detection sources: duplicate-code reports").

use crate::config::DebtCostConfig;
use crate::features::debt::domain::{DebtItem, DebtSeverity, DuplicateCodeReport};
use crate::features::metrics::domain::DebtType;

/// Three or more clones of a block is treated as `Critical`; two clones is
/// `High` — duplication cost scales with how many call sites would need
/// fixing together, not with the block's size.
fn severity_for(report: &DuplicateCodeReport) -> DebtSeverity {
    if report.clone_count >= 3 {
        DebtSeverity::Critical
    } else {
        DebtSeverity::High
    }
}

pub fn duplicate_reports_to_debt(reports: &[DuplicateCodeReport], config: &DebtCostConfig) -> Vec<DebtItem> {
    reports
        .iter()
        .map(|report| {
            let severity = severity_for(report);
            DebtItem {
                debt_type: DebtType::DuplicateCode,
                severity,
                file_path: report.file_path.clone(),
                offset: report.offset,
                description: format!("{} duplicated lines across {} clones", report.duplicated_line_count, report.clone_count),
                cost: config.base_cost(DebtType::DuplicateCode) * config.multiplier(severity),
            }
        })
        .collect()
}
