//! Traversal depth for hierarchy and capability queries

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a query includes inherited results or only directly declared ones.
///
/// Not a stored attribute: it is threaded through each hierarchy, ownership
/// and instance query as a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Transitivity {
    /// Full closure over the type hierarchy
    #[default]
    Transitive,
    /// Direct results only
    Explicit,
}

impl Transitivity {
    pub fn is_transitive(self) -> bool {
        matches!(self, Transitivity::Transitive)
    }
}

impl fmt::Display for Transitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transitivity::Transitive => write!(f, "transitive"),
            Transitivity::Explicit => write!(f, "explicit"),
        }
    }
}
