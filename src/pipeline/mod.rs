//! Analysis orchestration (§5 "Concurrency model", §6 "External
//! Interfaces").
//!
//! `AnalysisSession` is the crate's single entry point: the host builds
//! one per run, feeds it declarations file by file (or in parallel batches
//! via [`AnalysisSession::analyze_project`]), and disposes of it once done.
//! Every worker in `analyze_project` gets its own owned [`Cfg`] arena and
//! fact set — there is no shared mutable state across files (§5).

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::{info_span, warn};

use crate::config::DebtCostConfig;
use crate::diagnostics::{codes, Diagnostic, ProjectAnalysisResult, Range, Severity};
use crate::errors::{AnalysisError, AnalysisResult, SessionError};
use crate::features::abstract_domains::run_fixpoint;
use crate::features::cfg_builder::{build_cfg, ports::Declaration};
use crate::features::datalog_engine::{rule_sets, DatalogEngine};
use crate::features::debt::{self, DebtReport};
use crate::features::fact_extractor::{Fact, FactExtractor};
use crate::features::ir_model::Cfg;
use crate::features::metrics::{self, FunctionMetrics};
use crate::features::ssa_builder::build_ssa;
use crate::features::verifiers::{check_bounds, check_nulls, ArrayLengths, NullSafety};
use crate::shared::{LineIndex, Span, TableLineIndex};

/// One function's full analysis, before it is folded into the
/// project-level report.
#[derive(Debug, Clone)]
pub struct FunctionAnalysis {
    pub name: String,
    pub metrics: FunctionMetrics,
    pub diagnostics: Vec<Diagnostic>,
}

/// The per-function unit of work the host submits: a declaration plus the
/// file it came from, resolved against that file's line index once up
/// front (§6 "Parser interface contract").
pub struct FunctionSource<'a> {
    pub file_path: &'a str,
    pub declaration: &'a Declaration,
    pub array_lengths: ArrayLengths,
}

/// What the host should exit with, mirroring §6's exit-code mapping
/// without committing this crate to `std::process::exit` itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Clean,
    IssuesFound,
    Fatal(String),
}

pub struct AnalysisSession {
    debt_config: DebtCostConfig,
    disposed: AtomicBool,
}

impl AnalysisSession {
    pub fn new(debt_config: DebtCostConfig) -> Result<Self, SessionError> {
        debt_config.validate()?;
        Ok(Self { debt_config, disposed: AtomicBool::new(false) })
    }

    fn check_alive(&self) -> Result<(), SessionError> {
        if self.disposed.load(Ordering::Acquire) {
            Err(SessionError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Releases the session; every subsequent call returns
    /// [`SessionError::Disposed`] (§6 "Session lifecycle").
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }

    /// Builds the CFG, renames it to SSA, runs the abstract interpreter and
    /// both verifiers, and computes this function's metrics. A C2/C3
    /// failure is downgraded to an `info`/`error` diagnostic and does not
    /// abort the rest of the file (§7 "Propagation policy"); everything
    /// else propagates.
    pub fn analyze_function(&self, source: &FunctionSource, line_index: &dyn LineIndex) -> AnalysisResult<FunctionAnalysis> {
        self.check_alive()?;
        let name = source.declaration.name().to_string();
        let span = info_span!("analyze_function", function = %name, file = source.file_path);
        let _guard = span.enter();

        let mut cfg = match build_cfg(source.declaration) {
            Ok(cfg) => cfg,
            Err(err) => {
                let diagnostic = unsupported_construct_diagnostic(&err, line_index);
                return Ok(FunctionAnalysis {
                    name,
                    metrics: empty_metrics(&name),
                    diagnostics: vec![diagnostic],
                });
            }
        };

        if let Err(err) = build_ssa(&mut cfg) {
            warn!(error = %err, "SSA invariant violated, skipping verification for this function");
            let diagnostic = ssa_invariant_diagnostic(&err, line_index);
            return Ok(FunctionAnalysis { name, metrics: empty_metrics(&name), diagnostics: vec![diagnostic] });
        }

        let metrics = metrics::compute_function_metrics(&name, &cfg);
        let mut diagnostics = Vec::new();

        let fixpoint = run_fixpoint(&cfg, &name)?;
        for result in check_bounds(&cfg, &fixpoint, &source.array_lengths) {
            if matches!(result.classification, crate::features::verifiers::Classification::DefinitelyUnsafe) {
                diagnostics.push(
                    Diagnostic::new(result.reason, Severity::Warning, point_range(result.offset, line_index))
                        .with_code(codes::POTENTIAL_BOUNDS_VIOLATION),
                );
            }
        }
        for result in check_nulls(&cfg, &fixpoint) {
            if matches!(result.safety, NullSafety::DefinitelyNull) {
                diagnostics.push(
                    Diagnostic::new(
                        format!("`{}` is always null here", result.variable),
                        Severity::Warning,
                        point_range(result.offset, line_index),
                    )
                    .with_code(codes::POTENTIAL_NULL_DEREFERENCE),
                );
            }
        }

        Ok(FunctionAnalysis { name, metrics, diagnostics })
    }

    /// Runs `analyze_function` over every file's declarations in parallel
    /// via rayon's work-stealing pool (§5), then folds the results plus a
    /// debt pass into one deterministic, byte-stable report (§5 "Ordering
    /// guarantees").
    pub fn analyze_project(&self, files: &[(String, Vec<Declaration>, String)]) -> AnalysisResult<ProjectAnalysisResult> {
        self.check_alive()?;
        let mut result = ProjectAnalysisResult::new();

        let per_file: Vec<AnalysisResult<Vec<Diagnostic>>> = files
            .par_iter()
            .map(|(file_path, declarations, source_text)| {
                let line_index = TableLineIndex::from_source(source_text);
                let mut diagnostics = Vec::new();
                for declaration in declarations {
                    let source = FunctionSource { file_path, declaration, array_lengths: ArrayLengths::new() };
                    diagnostics.extend(self.analyze_function(&source, &line_index)?.diagnostics);
                }
                let comment_debt = debt::scan_comments(file_path, source_text, &self.debt_config);
                diagnostics.extend(comment_debt.iter().map(|item| debt_item_to_diagnostic(item, &line_index)));
                Ok::<_, AnalysisError>(diagnostics)
            })
            .collect();

        for ((file_path, _, _), diagnostics) in files.iter().zip(per_file.into_iter()) {
            result.add_file(file_path.clone(), diagnostics?);
        }

        Ok(result)
    }

    pub fn aggregate_debt(&self, items: Vec<crate::features::debt::DebtItem>) -> DebtReport {
        debt::aggregate(items, &self.debt_config)
    }

    /// Points-to facts for one function's SSA CFG (§4.5 "Points-to").
    /// Exposed directly rather than folded into [`Diagnostic`]s: points-to
    /// is an input other reasoners build on, not a defect in its own right.
    pub fn run_points_to(&self, cfg: &Cfg) -> AnalysisResult<Vec<Fact>> {
        self.check_alive()?;
        let mut engine = DatalogEngine::new(FactExtractor::new().extract(cfg));
        engine.add_rules(rule_sets::points_to_rules())?;
        engine.run()?;
        Ok(engine.query("VarPointsTo"))
    }

    /// Taint-flow analysis (§4.5 "Taint"): the host supplies `TaintSource`,
    /// `TaintSink`, and `Sanitized` facts for this function (annotations or
    /// naming conventions in the source language are outside this crate's
    /// scope), and gets back every derived `TaintViolation`.
    pub fn run_taint_analysis(&self, cfg: &Cfg, taint_facts: Vec<Fact>) -> AnalysisResult<Vec<Fact>> {
        self.check_alive()?;
        let mut facts = FactExtractor::new().extract(cfg);
        facts.extend(taint_facts);
        let mut engine = DatalogEngine::new(facts);
        engine.add_rules(rule_sets::reachability_rules())?;
        engine.add_rules(rule_sets::taint_rules())?;
        engine.run()?;
        Ok(engine.query("TaintViolation"))
    }
}

fn point_range(offset: u32, line_index: &dyn LineIndex) -> Range {
    let at = line_index.resolve(offset);
    let span = Span::point(offset, at);
    Range { start: span.start, end: span.end }
}

fn unsupported_construct_diagnostic(err: &crate::errors::IrBuildError, line_index: &dyn LineIndex) -> Diagnostic {
    let crate::errors::IrBuildError::UnsupportedConstruct { offset, .. } = err;
    Diagnostic::new(err.to_string(), Severity::Info, point_range(*offset, line_index)).with_code(codes::UNSUPPORTED_CONSTRUCT)
}

fn ssa_invariant_diagnostic(err: &crate::errors::SsaBuildError, line_index: &dyn LineIndex) -> Diagnostic {
    Diagnostic::new(err.to_string(), Severity::Error, point_range(0, line_index)).with_code(codes::SSA_INVARIANT_VIOLATION)
}

fn debt_item_to_diagnostic(item: &crate::features::debt::DebtItem, line_index: &dyn LineIndex) -> Diagnostic {
    Diagnostic::new(item.description.clone(), Severity::Info, point_range(item.offset, line_index))
}

fn empty_metrics(name: &str) -> FunctionMetrics {
    metrics::compute_function_metrics(name, &crate::features::ir_model::Cfg::new(name))
}
