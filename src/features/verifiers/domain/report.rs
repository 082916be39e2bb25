//! Verifier output shapes (§4.7).

use crate::features::ir_model::BlockId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Safe,
    DefinitelyUnsafe,
    Unknown,
}

/// One index access, classified against the interval domain and (when
/// known) the array's registered length (§4.7 "Bounds checker").
#[derive(Debug, Clone, PartialEq)]
pub struct BoundsCheckResult {
    pub block: BlockId,
    pub offset: u32,
    pub classification: Classification,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullSafety {
    Safe,
    DefinitelyNull,
    Unknown,
}

/// One dereference site (`LoadField`/`StoreField`/`Call` on a receiver),
/// classified against the nullability domain (§4.7 "Null verifier").
#[derive(Debug, Clone, PartialEq)]
pub struct NullCheckResult {
    pub block: BlockId,
    pub offset: u32,
    pub variable: String,
    pub safety: NullSafety,
}
