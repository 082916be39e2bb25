//! SSA variables (§3 "Variable").

use serde::{Deserialize, Serialize};
use std::fmt;

/// `(name, version)`. Version 0 denotes the pre-SSA form (parameters and
/// fresh declarations); identity is exactly the pair, so two variables with
/// the same name but different versions are distinct occurrences.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub version: u32,
}

impl Variable {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self { name: name.into(), version }
    }

    /// Pre-SSA occurrence (parameters, fresh declarations before renaming).
    pub fn fresh(name: impl Into<String>) -> Self {
        Self::new(name, 0)
    }

    /// The canonical fact-extractor id, `name_version` (§4.4).
    pub fn canonical_name(&self) -> String {
        format!("{}_{}", self.name, self.version)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_requires_both_fields() {
        assert_eq!(Variable::new("x", 1), Variable::new("x", 1));
        assert_ne!(Variable::new("x", 1), Variable::new("x", 2));
        assert_ne!(Variable::new("x", 1), Variable::new("y", 1));
    }

    #[test]
    fn canonical_name_matches_display() {
        let v = Variable::new("i", 3);
        assert_eq!(v.canonical_name(), "i_3");
        assert_eq!(v.to_string(), "i_3");
    }
}
