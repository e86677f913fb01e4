//! Typegraph
//!
//! A typed concept model for a strongly-typed graph database: schema types
//! (entity, relation, attribute and role types), their instances, and
//! transaction-scoped traversal over both.
//!
//! # Architecture
//!
//! - [`engine`]: the collaborator contract. A transaction executes one
//!   [`engine::ConceptRequest`] at a time and answers with raw concepts or
//!   single-pass cursors. [`engine::memory`] is an in-process implementation.
//! - [`concept`]: typed wrappers over engine handles. Kind dispatch happens in
//!   one place, [`concept::ConceptFactory`]; shared behaviour lives in
//!   capability traits.
//! - [`connection`]: the [`Database`] and [`Transaction`] façades.
//! - [`config`]: transaction options, YAML client configuration and logging.
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use typegraph::{
//!     Database, InstanceContainer, MemoryDatabase, SessionType, ThingOps, TransactionOptions,
//!     TransactionType,
//! };
//!
//! let db = Database::new(Arc::new(MemoryDatabase::new("social")));
//! let tx = db
//!     .transaction(SessionType::Schema, TransactionType::Write, TransactionOptions::default())
//!     .unwrap();
//!
//! // Define a type and instantiate it
//! let person = tx.concepts().put_entity_type("person").unwrap();
//! let alice = person.create(&tx).unwrap();
//! assert!(!alice.get_iid().is_empty());
//!
//! let people = person.get_instances(&tx).unwrap().collect_all().unwrap();
//! assert_eq!(people, vec![alice]);
//! tx.commit().unwrap();
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod common;
pub mod concept;
pub mod config;
pub mod connection;
pub mod engine;
pub mod error;

// Re-export main types for convenience
pub use common::{Annotation, Iid, Label, Transitivity, Value, ValueType};

pub use concept::{
    Attribute, AttributeType, Concept, ConceptFactory, ConceptStream, Deletable, Entity,
    EntityType, HasFilter, Hierarchical, InstanceContainer, Labeled, Relation, RelationType,
    RoleType, RootThingType, Thing, ThingOps, ThingType, ThingTypeOps,
};

pub use config::{init_logging, ClientConfig, LoggingConfig, TransactionOptions};

pub use connection::{ConceptManager, Database, Transaction};

pub use engine::{memory::MemoryDatabase, SessionType, TransactionType};

pub use error::{ConceptError, ConceptResult};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "0.3.0");
    }
}
