//! Static analysis core: CFG/SSA construction, Datalog-based points-to and
//! taint analysis, abstract interpretation over interval/nullability
//! domains, and software metrics/technical-debt computation, for a
//! null-safe, async, class-based source language (see `SPEC_FULL.md`).
//!
//! The crate is organized feature-first (§4): each pipeline stage lives
//! under [`features`] with its own `domain`/`infrastructure` split, and
//! [`pipeline`] wires them into the session the host actually calls.

pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod features;
pub mod pipeline;
pub mod shared;

pub use errors::{AnalysisError, AnalysisResult};
pub use pipeline::{AnalysisOutcome, AnalysisSession, FunctionAnalysis, FunctionSource};
