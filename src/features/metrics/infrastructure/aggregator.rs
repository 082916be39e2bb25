//! Maintainability index and project-level aggregation (§4.8 "MI formula",
//! "Aggregation").

use std::collections::BTreeSet;

use crate::config::MetricsThresholds;
use crate::features::ir_model::Cfg;
use crate::features::metrics::domain::{
    DebtType, FunctionMetrics, MaintainabilityHistogram, MetricsReport, ThresholdViolation, ViolatedMetric,
};

use super::complexity::{cognitive_complexity, cyclomatic_complexity};
use super::halstead::halstead_metrics;

/// Counts distinct instruction offsets as a proxy line count — the IR
/// carries byte offsets, not source line numbers (§4.1).
fn lines_of_code(cfg: &Cfg) -> u32 {
    let offsets: BTreeSet<u32> = cfg.blocks().iter().flat_map(|b| b.instructions.iter().map(|i| i.offset())).collect();
    offsets.len() as u32
}

/// `MI_raw = 171 - 5.2*ln(V) - 0.23*G - 16.2*ln(LOC)`, rescaled to
/// `[0, 100]`; degenerate functions (no volume, no lines) are maximally
/// maintainable by definition (§4.8).
pub fn maintainability_index(volume: f64, cyclomatic: u32, loc: u32) -> f64 {
    if loc == 0 || volume == 0.0 {
        return 100.0;
    }
    let mi_raw = 171.0 - 5.2 * volume.ln() - 0.23 * cyclomatic as f64 - 16.2 * (loc as f64).ln();
    (mi_raw * 100.0 / 171.0).clamp(0.0, 100.0)
}

pub fn compute_function_metrics(function_name: &str, cfg: &Cfg) -> FunctionMetrics {
    let loc = lines_of_code(cfg);
    let cyclomatic = cyclomatic_complexity(cfg);
    let cognitive = cognitive_complexity(cfg);
    let halstead = halstead_metrics(cfg);
    let mi = maintainability_index(halstead.volume, cyclomatic, loc);

    FunctionMetrics {
        function_name: function_name.to_string(),
        lines_of_code: loc,
        cyclomatic_complexity: cyclomatic,
        cognitive_complexity: cognitive,
        halstead,
        maintainability_index: mi,
    }
}

pub fn aggregate(functions: Vec<FunctionMetrics>, thresholds: &MetricsThresholds) -> MetricsReport {
    let mut violations = Vec::new();
    let mut histogram = MaintainabilityHistogram::default();
    let mut weighted_sum = 0.0;
    let mut total_loc = 0u32;

    for f in &functions {
        histogram.record(f.maintainability_index);
        weighted_sum += f.maintainability_index * f.lines_of_code as f64;
        total_loc += f.lines_of_code;

        if f.cyclomatic_complexity > thresholds.max_cyclomatic {
            violations.push(ThresholdViolation {
                function_name: f.function_name.clone(),
                metric: ViolatedMetric::Cyclomatic,
                debt_type: DebtType::HighCyclomaticComplexity,
                value: f.cyclomatic_complexity as f64,
                threshold: thresholds.max_cyclomatic as f64,
            });
        }
        if f.cognitive_complexity > thresholds.max_cognitive {
            violations.push(ThresholdViolation {
                function_name: f.function_name.clone(),
                metric: ViolatedMetric::Cognitive,
                debt_type: DebtType::HighCognitiveComplexity,
                value: f.cognitive_complexity as f64,
                threshold: thresholds.max_cognitive as f64,
            });
        }
        if f.maintainability_index < thresholds.min_maintainability {
            violations.push(ThresholdViolation {
                function_name: f.function_name.clone(),
                metric: ViolatedMetric::Maintainability,
                debt_type: DebtType::LowMaintainability,
                value: f.maintainability_index,
                threshold: thresholds.min_maintainability,
            });
        }
        if f.lines_of_code > thresholds.max_lines_of_code {
            violations.push(ThresholdViolation {
                function_name: f.function_name.clone(),
                metric: ViolatedMetric::LinesOfCode,
                debt_type: DebtType::FunctionTooLong,
                value: f.lines_of_code as f64,
                threshold: thresholds.max_lines_of_code as f64,
            });
        }
    }

    let health_score = if total_loc == 0 { 100.0 } else { weighted_sum / total_loc as f64 };

    MetricsReport { functions, violations, histogram, health_score }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ir_model::Instruction;

    #[test]
    fn empty_function_is_maximally_maintainable() {
        let mut cfg = Cfg::new("f");
        cfg.block_mut(cfg.entry).push(Instruction::Return { value: None, offset: 0 });
        let metrics = compute_function_metrics("f", &cfg);
        assert_eq!(metrics.maintainability_index, 100.0);
    }

    #[test]
    fn aggregate_flags_high_cyclomatic_complexity_as_debt() {
        let metrics = FunctionMetrics {
            function_name: "big".to_string(),
            lines_of_code: 10,
            cyclomatic_complexity: 25,
            cognitive_complexity: 5,
            halstead: halstead_metrics(&Cfg::new("big")),
            maintainability_index: 90.0,
        };
        let report = aggregate(vec![metrics], &MetricsThresholds::default());
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].debt_type, DebtType::HighCyclomaticComplexity);
    }
}
