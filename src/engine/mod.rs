//! The engine collaborator contract
//!
//! The concept layer never touches storage itself. It consumes an engine
//! through two narrow seams:
//!
//! - [`TransactionOps`], which executes one [`ConceptRequest`] at a time and
//!   answers with raw concepts or cursors of raw concepts;
//! - the kind registry ([`KIND_REGISTRY`]), through which the concept
//!   factory resolves a raw concept into its typed wrapper.
//!
//! [`memory`] provides an in-process engine implementing the contract.

pub mod error;
pub mod handle;
pub mod memory;
pub mod request;

pub use error::{EngineError, EngineResult};
pub use handle::{
    ConceptHandle, ConceptId, ConceptKind, RawConcept, RawPayload, TransactionId, KIND_REGISTRY,
};
pub use request::{ConceptRequest, ConceptResponse, Cursor};

use crate::config::TransactionOptions;
use serde::{Deserialize, Serialize};

/// Labels of the engine's built-in root types
pub const ROOT_ENTITY: &str = "entity";
pub const ROOT_RELATION: &str = "relation";
pub const ROOT_ATTRIBUTE: &str = "attribute";
/// Scoped by [`ROOT_RELATION`]
pub const ROOT_ROLE: &str = "role";
/// The universal supertype; synthesized client-side, never stored
pub const ROOT_THING: &str = "thing";

/// Session flavour a transaction was opened under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionType {
    Data,
    Schema,
}

impl SessionType {
    pub fn is_data(self) -> bool {
        matches!(self, SessionType::Data)
    }

    pub fn is_schema(self) -> bool {
        matches!(self, SessionType::Schema)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Read,
    Write,
}

impl TransactionType {
    pub fn is_read(self) -> bool {
        matches!(self, TransactionType::Read)
    }

    pub fn is_write(self) -> bool {
        matches!(self, TransactionType::Write)
    }
}

/// An open engine transaction.
///
/// Implementations must fail fast with [`EngineError::TransactionClosed`]
/// once the transaction is closed, for direct requests and for every cursor
/// produced earlier, rather than block or corrupt state.
pub trait TransactionOps: Send + Sync {
    fn id(&self) -> TransactionId;

    fn session_type(&self) -> SessionType;

    fn transaction_type(&self) -> TransactionType;

    fn is_open(&self) -> bool;

    fn execute(&self, request: ConceptRequest) -> EngineResult<ConceptResponse>;

    fn commit(&self) -> EngineResult<()>;

    fn rollback(&self) -> EngineResult<()>;

    fn close(&self);
}

/// An engine-side database
pub trait DatabaseOps: Send + Sync {
    fn name(&self) -> String;

    fn open_transaction(
        &self,
        session_type: SessionType,
        transaction_type: TransactionType,
        options: TransactionOptions,
    ) -> EngineResult<Box<dyn TransactionOps>>;

    /// Full schema definition, types and rules
    fn schema(&self) -> EngineResult<String>;

    fn type_schema(&self) -> EngineResult<String>;

    fn rule_schema(&self) -> EngineResult<String>;

    fn delete(&self) -> EngineResult<()>;
}
