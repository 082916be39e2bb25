//! IR-driven detection sources (§4.9): dynamic casts, deprecated-symbol
//! usage, and metrics-threshold violations.

use std::collections::HashSet;

use crate::config::DebtCostConfig;
use crate::features::debt::domain::{DebtItem, DebtSeverity};
use crate::features::ir_model::{Cfg, Instruction, Value};
use crate::features::metrics::domain::{DebtType, ThresholdViolation, ViolatedMetric};

/// Every `Cast` in the language is a runtime type coercion — there is no
/// static-cast form in the IR — so each one is a dynamic-cast candidate
/// (§4.9 "Detection sources: dynamic casts").
pub fn detect_dynamic_casts(file_path: &str, cfg: &Cfg, config: &DebtCostConfig) -> Vec<DebtItem> {
    let mut items = Vec::new();
    for block in cfg.blocks() {
        for instruction in &block.instructions {
            if let Instruction::Cast { target_type, offset, .. } = instruction {
                items.push(DebtItem {
                    debt_type: DebtType::DynamicCast,
                    severity: DebtSeverity::Medium,
                    file_path: file_path.to_string(),
                    offset: *offset,
                    description: format!("dynamic cast to `{target_type}`"),
                    cost: config.base_cost(DebtType::DynamicCast) * config.multiplier(DebtSeverity::Medium),
                });
            }
        }
    }
    items
}

/// Flags calls and allocations whose target is in `deprecated_symbols`
/// (method or type names the host resolved from `@deprecated`-style
/// annotations it read off the declaration, since the IR itself carries no
/// annotation metadata — §4.9 "Detection sources: deprecated annotations").
pub fn detect_deprecated_usage(file_path: &str, cfg: &Cfg, deprecated_symbols: &HashSet<String>, config: &DebtCostConfig) -> Vec<DebtItem> {
    let mut items = Vec::new();
    for block in cfg.blocks() {
        for instruction in &block.instructions {
            match instruction {
                Instruction::Call { method_name, offset, .. } if deprecated_symbols.contains(method_name) => {
                    items.push(debt_item(file_path, *offset, method_name, config));
                }
                Instruction::Assign { value: Value::NewObject { type_name, .. }, offset, .. } if deprecated_symbols.contains(type_name) => {
                    items.push(debt_item(file_path, *offset, type_name, config));
                }
                _ => {}
            }
        }
    }
    items
}

fn debt_item(file_path: &str, offset: u32, symbol: &str, config: &DebtCostConfig) -> DebtItem {
    DebtItem {
        debt_type: DebtType::DeprecatedUsage,
        severity: DebtSeverity::Medium,
        file_path: file_path.to_string(),
        offset,
        description: format!("use of deprecated symbol `{symbol}`"),
        cost: config.base_cost(DebtType::DeprecatedUsage) * config.multiplier(DebtSeverity::Medium),
    }
}

/// Severity escalates with how far a violation sits past its threshold:
/// more than double the limit is `Critical`, otherwise `High` (§4.9).
fn violation_severity(violation: &ThresholdViolation) -> DebtSeverity {
    if violation.threshold > 0.0 && violation.value >= violation.threshold * 2.0 {
        DebtSeverity::Critical
    } else {
        DebtSeverity::High
    }
}

pub fn metrics_violations_to_debt(file_path: &str, violations: &[ThresholdViolation], config: &DebtCostConfig) -> Vec<DebtItem> {
    violations
        .iter()
        .map(|v| {
            let severity = violation_severity(v);
            DebtItem {
                debt_type: v.debt_type,
                severity,
                file_path: file_path.to_string(),
                offset: 0,
                description: format!("{} in `{}`: {:.1} exceeds threshold {:.1}", metric_label(v.metric), v.function_name, v.value, v.threshold),
                cost: config.base_cost(v.debt_type) * config.multiplier(severity),
            }
        })
        .collect()
}

fn metric_label(metric: ViolatedMetric) -> &'static str {
    match metric {
        ViolatedMetric::Cyclomatic => "cyclomatic complexity",
        ViolatedMetric::Cognitive => "cognitive complexity",
        ViolatedMetric::Maintainability => "maintainability index",
        ViolatedMetric::LinesOfCode => "lines of code",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_cast_is_a_dynamic_cast_candidate() {
        let mut cfg = Cfg::new("f");
        let result = crate::features::ir_model::Variable::new("r", 0);
        cfg.block_mut(cfg.entry).push(Instruction::Cast {
            operand: Value::Var(crate::features::ir_model::Variable::new("x", 0)),
            target_type: "Animal".to_string(),
            result,
            is_nullable: false,
            offset: 4,
        });
        let items = detect_dynamic_casts("f.src", &cfg, &DebtCostConfig::default());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].debt_type, DebtType::DynamicCast);
    }
}
