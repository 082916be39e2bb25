//! Metrics output shapes (§4.8).

use serde::{Deserialize, Serialize};

use super::debt_type::DebtType;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HalsteadMetrics {
    pub distinct_operators: u32,
    pub distinct_operands: u32,
    pub total_operators: u32,
    pub total_operands: u32,
    pub vocabulary: u32,
    pub length: u32,
    pub volume: f64,
    pub difficulty: f64,
    pub effort: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionMetrics {
    pub function_name: String,
    pub lines_of_code: u32,
    pub cyclomatic_complexity: u32,
    pub cognitive_complexity: u32,
    pub halstead: HalsteadMetrics,
    pub maintainability_index: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolatedMetric {
    Cyclomatic,
    Cognitive,
    Maintainability,
    LinesOfCode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdViolation {
    pub function_name: String,
    pub metric: ViolatedMetric,
    pub debt_type: DebtType,
    pub value: f64,
    pub threshold: f64,
}

/// Maintainability-index histogram bands (§4.8 "Aggregation").
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintainabilityHistogram {
    /// [85, 100]
    pub good: u32,
    /// [65, 85)
    pub moderate: u32,
    /// [0, 65)
    pub poor: u32,
}

impl MaintainabilityHistogram {
    pub fn record(&mut self, mi: f64) {
        if mi >= 85.0 {
            self.good += 1;
        } else if mi >= 65.0 {
            self.moderate += 1;
        } else {
            self.poor += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub functions: Vec<FunctionMetrics>,
    pub violations: Vec<ThresholdViolation>,
    pub histogram: MaintainabilityHistogram,
    /// LOC-weighted mean maintainability index across all functions
    /// (§4.8 "project health score").
    pub health_score: f64,
}
