//! Configuration objects consumed by the core (§6).
//!
//! These are plain, `serde`-serializable value types. Loading them from a
//! YAML file or CLI flags is strictly the host's job; the core only ever
//! receives an already-constructed, already-validated instance.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::SessionError;
use crate::features::debt::domain::DebtSeverity;
use crate::features::metrics::domain::DebtType;

/// Thresholds used by C8 to flag a function as a violation, and by C9 to
/// decide which metrics violations become debt items.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsThresholds {
    pub max_cyclomatic: u32,
    pub min_maintainability: f64,
    pub max_cognitive: u32,
    pub max_lines_of_code: u32,
}

impl Default for MetricsThresholds {
    fn default() -> Self {
        Self { max_cyclomatic: 20, min_maintainability: 50.0, max_cognitive: 15, max_lines_of_code: 100 }
    }
}

impl MetricsThresholds {
    pub fn validate(&self) -> Result<(), SessionError> {
        if !(0.0..=100.0).contains(&self.min_maintainability) {
            return Err(SessionError::Configuration {
                reason: format!("minMaintainability must be in [0, 100], got {}", self.min_maintainability),
            });
        }
        if self.max_cyclomatic == 0 {
            // Cyclomatic complexity is always >= 1, so a max of 0 could
            // never be satisfied; max_cognitive == 0 alone is fine, since
            // cognitive complexity is allowed to be 0.
            return Err(SessionError::Configuration { reason: "maxCyclomatic must be at least 1".to_string() });
        }
        Ok(())
    }
}

/// Cost model used by C9. Defaults match §6 exactly: debt unit "hours",
/// severity multipliers critical=4.0, high=2.0, medium=1.0, low=0.5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtCostConfig {
    pub costs: HashMap<DebtType, f64>,
    pub multipliers: HashMap<DebtSeverity, f64>,
    pub unit: String,
    pub threshold: f64,
    pub metrics_thresholds: MetricsThresholds,
    pub exclude: Vec<String>,
}

impl Default for DebtCostConfig {
    fn default() -> Self {
        let mut costs = HashMap::new();
        costs.insert(DebtType::TodoComment, 0.5);
        costs.insert(DebtType::FixmeComment, 1.0);
        costs.insert(DebtType::SuppressedWarning, 0.5);
        costs.insert(DebtType::DynamicCast, 1.0);
        costs.insert(DebtType::DeprecatedUsage, 0.5);
        costs.insert(DebtType::HighCyclomaticComplexity, 2.0);
        costs.insert(DebtType::HighCognitiveComplexity, 2.0);
        costs.insert(DebtType::LowMaintainability, 3.0);
        costs.insert(DebtType::FunctionTooLong, 1.5);
        costs.insert(DebtType::DuplicateCode, 4.0);

        let mut multipliers = HashMap::new();
        multipliers.insert(DebtSeverity::Critical, 4.0);
        multipliers.insert(DebtSeverity::High, 2.0);
        multipliers.insert(DebtSeverity::Medium, 1.0);
        multipliers.insert(DebtSeverity::Low, 0.5);

        Self {
            costs,
            multipliers,
            unit: "hours".to_string(),
            threshold: f64::INFINITY,
            metrics_thresholds: MetricsThresholds::default(),
            exclude: Vec::new(),
        }
    }
}

impl DebtCostConfig {
    pub fn validate(&self) -> Result<(), SessionError> {
        self.metrics_thresholds.validate()?;
        if self.threshold < 0.0 {
            return Err(SessionError::Configuration {
                reason: "debt threshold must be non-negative".to_string(),
            });
        }
        Ok(())
    }

    pub fn multiplier(&self, severity: DebtSeverity) -> f64 {
        self.multipliers.get(&severity).copied().unwrap_or(1.0)
    }

    pub fn base_cost(&self, debt_type: DebtType) -> f64 {
        self.costs.get(&debt_type).copied().unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let thresholds = MetricsThresholds::default();
        assert_eq!(thresholds.max_cyclomatic, 20);
        assert_eq!(thresholds.min_maintainability, 50.0);
        assert_eq!(thresholds.max_cognitive, 15);
        assert_eq!(thresholds.max_lines_of_code, 100);

        let debt = DebtCostConfig::default();
        assert_eq!(debt.unit, "hours");
        assert_eq!(debt.multiplier(DebtSeverity::Critical), 4.0);
        assert_eq!(debt.multiplier(DebtSeverity::High), 2.0);
        assert_eq!(debt.multiplier(DebtSeverity::Medium), 1.0);
        assert_eq!(debt.multiplier(DebtSeverity::Low), 0.5);
    }

    #[test]
    fn rejects_out_of_range_maintainability() {
        let thresholds = MetricsThresholds { min_maintainability: 150.0, ..Default::default() };
        assert!(thresholds.validate().is_err());
    }
}
