//! C4 — Fact Extractor (§4.4).

pub mod domain;
pub mod infrastructure;

pub use domain::{Atom, Fact};
pub use infrastructure::FactExtractor;
