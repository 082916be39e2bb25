//! Total-cost aggregation and the threshold flag (§4.9 "Cost model").

use crate::config::DebtCostConfig;
use crate::features::debt::domain::{DebtItem, DebtReport};

pub fn aggregate(items: Vec<DebtItem>, config: &DebtCostConfig) -> DebtReport {
    let total_cost: f64 = items.iter().map(|i| i.cost).sum();
    DebtReport { exceeds_threshold: total_cost > config.threshold, items, total_cost, unit: config.unit.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::debt::domain::DebtSeverity;
    use crate::features::metrics::domain::DebtType;

    #[test]
    fn total_cost_sums_every_item() {
        let config = DebtCostConfig::default();
        let items = vec![
            DebtItem { debt_type: DebtType::TodoComment, severity: DebtSeverity::Low, file_path: "a".to_string(), offset: 0, description: String::new(), cost: 0.25 },
            DebtItem { debt_type: DebtType::FixmeComment, severity: DebtSeverity::High, file_path: "a".to_string(), offset: 1, description: String::new(), cost: 2.0 },
        ];
        let report = aggregate(items, &config);
        assert_eq!(report.total_cost, 2.25);
        assert!(!report.exceeds_threshold);
    }

    #[test]
    fn exceeds_threshold_when_total_cost_is_over_configured_limit() {
        let config = DebtCostConfig { threshold: 1.0, ..DebtCostConfig::default() };
        let items = vec![DebtItem { debt_type: DebtType::FixmeComment, severity: DebtSeverity::High, file_path: "a".to_string(), offset: 0, description: String::new(), cost: 2.0 }];
        let report = aggregate(items, &config);
        assert!(report.exceeds_threshold);
    }
}
