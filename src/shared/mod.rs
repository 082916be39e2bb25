//! Shared, dependency-free building blocks used across every feature.

mod span;

pub use span::{LineColumn, LineIndex, SourceOffset, Span};
