//! Error types for the concept layer

use crate::common::Label;
use crate::engine::EngineError;
use thiserror::Error;

/// Errors raised by typed concept operations.
///
/// Every failure is reported synchronously at the call that triggered it and
/// is never retried here. Each variant carries a stable identifying code (see
/// [`ConceptError::code`]) alongside its message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConceptError {
    /// A wrapper was constructed from an absent engine reference
    #[error("Attempted to construct a concept from a null engine reference")]
    NullHandle,

    /// The resource behind a wrapper is no longer owned (e.g. the transaction closed)
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// The database behind a [`crate::Database`] handle was deleted
    #[error("The database '{0}' has been deleted and no further operation is allowed on it")]
    DatabaseDeleted(String),

    /// More than one mutually exclusive `get_has` filter was supplied
    #[error("Only one filter can be applied at a time to get_has: attribute_type, attribute_types or annotations")]
    MultipleFilters,

    /// The engine returned a concept kind this client does not know
    #[error("Unexpected concept kind '{0}' returned by the engine")]
    UnexpectedKind(String),

    /// The engine answered a request with the wrong response shape
    #[error("Unexpected engine response: expected {expected}, got {actual}")]
    UnexpectedResponse {
        expected: &'static str,
        actual: &'static str,
    },

    /// Instances of an abstract type cannot be created
    #[error("The type '{0}' is abstract and cannot be instantiated")]
    AbstractType(Label),

    /// The root thing type is synthesized and cannot be changed
    #[error("The root thing type does not support '{0}'")]
    RootThingType(&'static str),

    /// A server-side rejection, reported verbatim
    #[error("[{code}] {message}")]
    Engine { code: String, message: String },

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ConceptError {
    /// Stable identifying code for this failure
    pub fn code(&self) -> &str {
        match self {
            ConceptError::NullHandle => "CLI01",
            ConceptError::IllegalState(_) => "CLI02",
            ConceptError::DatabaseDeleted(_) => "CLI03",
            ConceptError::MultipleFilters => "CLI04",
            ConceptError::UnexpectedKind(_) => "CLI05",
            ConceptError::UnexpectedResponse { .. } => "CLI06",
            ConceptError::AbstractType(_) => "CLI07",
            ConceptError::RootThingType(_) => "CLI08",
            ConceptError::Config(_) => "CLI09",
            ConceptError::Engine { code, .. } => code,
        }
    }

    /// Whether discarding the offending wrapper is the correct recovery
    pub fn is_illegal_state(&self) -> bool {
        matches!(
            self,
            ConceptError::IllegalState(_) | ConceptError::DatabaseDeleted(_)
        )
    }
}

impl From<EngineError> for ConceptError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::TransactionClosed | EngineError::ForeignConcept => {
                ConceptError::IllegalState(e.to_string())
            }
            EngineError::AbstractType(label) => ConceptError::AbstractType(label),
            other => ConceptError::Engine {
                code: other.code().to_string(),
                message: other.to_string(),
            },
        }
    }
}

pub type ConceptResult<T> = Result<T, ConceptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_transaction_maps_to_illegal_state() {
        let err: ConceptError = EngineError::TransactionClosed.into();
        assert!(err.is_illegal_state());
        assert_eq!(err.code(), "CLI02");
    }

    #[test]
    fn test_constraint_violation_is_verbatim() {
        let engine = EngineError::Constraint {
            code: "TYW11".to_string(),
            message: "regex is only valid on string attribute types".to_string(),
        };
        let message = engine.to_string();
        let err: ConceptError = engine.into();
        assert_eq!(err.code(), "TYW11");
        assert!(err.to_string().contains(&message));
    }

    #[test]
    fn test_abstract_type_keeps_label() {
        let err: ConceptError = EngineError::AbstractType(Label::new("animal")).into();
        assert_eq!(err, ConceptError::AbstractType(Label::new("animal")));
    }
}
