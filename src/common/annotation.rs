//! Constraint tags carried by ownership edges

use serde::{Deserialize, Serialize};
use std::fmt;

/// Schema-level constraint on an `owns` edge.
///
/// Annotations are passed through to the engine untouched; the client never
/// validates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Annotation {
    /// Each owner has exactly one attribute of the type, unique across owners
    Key,
    /// No two owners share the same attribute of the type
    Unique,
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::Key => write!(f, "@key"),
            Annotation::Unique => write!(f, "@unique"),
        }
    }
}
