//! Feature modules, one per pipeline component (§4).

pub mod abstract_domains;
pub mod cfg_builder;
pub mod datalog_engine;
pub mod debt;
pub mod fact_extractor;
pub mod ir_model;
pub mod metrics;
pub mod ssa_builder;
pub mod verifiers;
