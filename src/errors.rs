//! Error taxonomy (§7).
//!
//! One `thiserror` enum per component family, aggregated behind
//! [`AnalysisError`] so call sites can use `?` uniformly. Per-function and
//! per-file containment (§7 "Propagation policy") is enforced by callers,
//! not by this module: [`IrBuildError`] and [`SsaBuildError`] are caught at
//! the function boundary and downgraded to diagnostics, while the rest
//! propagate to the host.

use thiserror::Error;

/// C2 failures. Recoverable: the caller downgrades this to an `info`
/// diagnostic at the offending node's offset and continues with the rest
/// of the declaration where possible.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IrBuildError {
    #[error("unsupported construct `{kind}` at offset {offset}")]
    UnsupportedConstruct { kind: String, offset: u32 },
}

/// C3 failures. Fatal to the current function only: the SSA builder's
/// postcondition checker caught a violation of the single-assignment or
/// dominance invariant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SsaBuildError {
    #[error("SSA invariant violated in function `{function}`: {reason}")]
    InvariantViolation { function: String, reason: String },
}

/// C5 failures. Programmer errors in a Datalog rule set; these are bugs in
/// the rule author's program, not user data, so they propagate to the host.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DatalogError {
    #[error("stratification error: negation cycle through predicate `{predicate}`")]
    Stratification { predicate: String },

    #[error("unsafe rule for `{head_predicate}`: head variable `{variable}` does not appear in the positive body")]
    UnsafeHeadVariable { head_predicate: String, variable: String },

    #[error("unsafe rule for `{head_predicate}`: negated-body variable `{variable}` does not appear in the positive body")]
    UnsafeNegatedVariable { head_predicate: String, variable: String },
}

/// C6/C7 failures. `Inconclusive` is not really an error — it is a
/// best-effort marker threaded through verifier outputs, never a crash.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifierError {
    #[error("fixpoint did not converge within {max_iterations} iterations in function `{function}`")]
    FixpointInconclusive { function: String, max_iterations: u32 },
}

/// Session lifecycle and configuration failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session already disposed")]
    Disposed,

    #[error("invalid configuration: {reason}")]
    Configuration { reason: String },
}

/// Crate-level aggregate error. Fatal errors (stratification, unsafe rule,
/// configuration, session-disposed) should be propagated all the way to the
/// host; `IrBuildError` and `SsaBuildError` normally never reach this type
/// because they are contained at the function boundary, but the conversion
/// exists for callers that choose to propagate rather than contain (e.g.
/// tests exercising the builder directly).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error(transparent)]
    IrBuild(#[from] IrBuildError),

    #[error(transparent)]
    SsaBuild(#[from] SsaBuildError),

    #[error(transparent)]
    Datalog(#[from] DatalogError),

    #[error(transparent)]
    Verifier(#[from] VerifierError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("failed to read source file `{path}`: {reason}")]
    Io { path: String, reason: String },
}

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;
