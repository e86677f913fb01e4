//! Errors reported by the engine behind the concept layer

use crate::common::Label;
use thiserror::Error;

/// Failures raised on the engine side of the collaborator contract
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("The transaction has been closed and no further operation is allowed")]
    TransactionClosed,

    #[error("The concept does not belong to this transaction")]
    ForeignConcept,

    #[error("Concept not found: {0}")]
    ConceptNotFound(String),

    #[error("Cannot create instances of abstract type '{0}'")]
    AbstractType(Label),

    #[error("Write operations are not permitted in a read transaction")]
    ReadOnly,

    #[error("Schema writes are only permitted in schema sessions")]
    SchemaWriteInDataSession,

    #[error("Commit rejected: the database moved from version {base} to {current} while this transaction was open")]
    CommitConflict { base: u64, current: u64 },

    #[error("Invalid regular expression '{regex}': {reason}")]
    InvalidRegex { regex: String, reason: String },

    /// Schema or data constraint violation with the engine's own code
    #[error("{message}")]
    Constraint { code: String, message: String },

    #[error("Internal engine error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn code(&self) -> &str {
        match self {
            EngineError::TransactionClosed => "TXN01",
            EngineError::ForeignConcept => "TXN02",
            EngineError::ReadOnly => "TXN03",
            EngineError::SchemaWriteInDataSession => "TXN04",
            EngineError::CommitConflict { .. } => "TXN05",
            EngineError::ConceptNotFound(_) => "CON01",
            EngineError::AbstractType(_) => "THW01",
            EngineError::InvalidRegex { .. } => "TYW10",
            EngineError::Constraint { code, .. } => code,
            EngineError::Internal(_) => "INT01",
        }
    }

    pub(crate) fn constraint(code: &str, message: impl Into<String>) -> Self {
        EngineError::Constraint {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
