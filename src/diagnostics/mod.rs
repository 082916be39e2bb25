//! Diagnostic and report types produced by the core (§6).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::shared::LineColumn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: LineColumn,
    pub end: LineColumn,
}

/// Diagnostic codes emitted by the core, per §6.
pub mod codes {
    pub const HIGH_CYCLOMATIC_COMPLEXITY: &str = "high_cyclomatic_complexity";
    pub const HIGH_COGNITIVE_COMPLEXITY: &str = "high_cognitive_complexity";
    pub const LOW_MAINTAINABILITY_INDEX: &str = "low_maintainability_index";
    pub const FUNCTION_TOO_LONG: &str = "function_too_long";
    pub const POTENTIAL_NULL_DEREFERENCE: &str = "potential_null_dereference";
    pub const POTENTIAL_BOUNDS_VIOLATION: &str = "potential_bounds_violation";
    pub const MUTABLE_SHARED_STATE: &str = "mutable_shared_state";
    pub const SEMANTIC_CLONE: &str = "semantic_clone";
    pub const UNSUPPORTED_CONSTRUCT: &str = "unsupported_construct";
    pub const SSA_INVARIANT_VIOLATION: &str = "ssa_invariant_violation";
    pub const FILE_UNREADABLE: &str = "file_unreadable";
}

const SOURCE: &str = "anteater";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
    pub range: Range,
    pub source: String,
    pub code: Option<String>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, severity: Severity, range: Range) -> Self {
        Self { message: message.into(), severity, range, source: SOURCE.to_string(), code: None }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// `ProjectAnalysisResult` (§6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectAnalysisResult {
    pub file_count: usize,
    pub diagnostics: BTreeMap<String, Vec<Diagnostic>>,
    pub total_diagnostics: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
}

impl ProjectAnalysisResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts one file's diagnostics, sorted by source offset (§5,
    /// "Ordering guarantees": reports sort diagnostics by (file, offset)
    /// before emission) and keeps the aggregate counters consistent.
    pub fn add_file(&mut self, path: impl Into<String>, mut diagnostics: Vec<Diagnostic>) {
        diagnostics.sort_by_key(|d| (d.range.start.line, d.range.start.character));
        self.file_count += 1;
        for d in &diagnostics {
            self.total_diagnostics += 1;
            match d.severity {
                Severity::Error => self.error_count += 1,
                Severity::Warning => self.warning_count += 1,
                Severity::Info => self.info_count += 1,
                Severity::Hint => {}
            }
        }
        self.diagnostics.insert(path.into(), diagnostics);
    }

    /// §6 exit-code mapping, expressed as a boolean for the host to project
    /// onto its own process exit code (1 if any issue is at or above
    /// warning, 0 otherwise).
    pub fn exceeds_issue_threshold(&self) -> bool {
        self.error_count > 0 || self.warning_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::LineColumn;

    fn range(line: u32) -> Range {
        Range { start: LineColumn::new(line, 0), end: LineColumn::new(line, 1) }
    }

    #[test]
    fn add_file_sorts_by_offset_and_tallies_counts() {
        let mut report = ProjectAnalysisResult::new();
        report.add_file(
            "a.dart",
            vec![
                Diagnostic::new("second", Severity::Warning, range(5)),
                Diagnostic::new("first", Severity::Error, range(1)),
            ],
        );
        let sorted = &report.diagnostics["a.dart"];
        assert_eq!(sorted[0].message, "first");
        assert_eq!(sorted[1].message, "second");
        assert_eq!(report.error_count, 1);
        assert_eq!(report.warning_count, 1);
        assert_eq!(report.total_diagnostics, 2);
        assert!(report.exceeds_issue_threshold());
    }
}
