//! Comment-marker detection (§4.9 "Detection sources: comment scanning").
//!
//! Operates on raw source text rather than the IR — by the time code
//! reaches C1, comments are already gone. The host is expected to pass
//! each file's text once per analysis run.

use crate::config::DebtCostConfig;
use crate::features::debt::domain::{DebtItem, DebtSeverity};
use crate::features::metrics::domain::DebtType;

struct Marker {
    needle: &'static str,
    debt_type: DebtType,
    severity: DebtSeverity,
}

const MARKERS: &[Marker] = &[
    Marker { needle: "TODO", debt_type: DebtType::TodoComment, severity: DebtSeverity::Low },
    Marker { needle: "FIXME", debt_type: DebtType::FixmeComment, severity: DebtSeverity::High },
    Marker { needle: "@SuppressWarnings", debt_type: DebtType::SuppressedWarning, severity: DebtSeverity::Medium },
];

pub fn scan_comments(file_path: &str, source: &str, config: &DebtCostConfig) -> Vec<DebtItem> {
    let mut items = Vec::new();
    let mut offset: u32 = 0;
    for line in source.split_inclusive('\n') {
        for marker in MARKERS {
            if let Some(pos) = line.find(marker.needle) {
                items.push(DebtItem {
                    debt_type: marker.debt_type,
                    severity: marker.severity,
                    file_path: file_path.to_string(),
                    offset: offset + pos as u32,
                    description: format!("{} marker found", marker.needle),
                    cost: config.base_cost(marker.debt_type) * config.multiplier(marker.severity),
                });
            }
        }
        offset += line.len() as u32;
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todo_and_fixme_are_both_detected() {
        let config = DebtCostConfig::default();
        let source = "fn f() {\n  // TODO clean this up\n  // FIXME broken on windows\n}\n";
        let items = scan_comments("f.src", source, &config);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].debt_type, DebtType::TodoComment);
        assert_eq!(items[1].debt_type, DebtType::FixmeComment);
    }
}
