//! In-process engine
//!
//! Holds each database's schema and data in memory, so the concept layer can
//! be used and tested without a server. Every transaction works on a private
//! copy of the committed store; `commit` publishes that copy back, provided
//! no other transaction committed since the copy was taken.

mod cursor;
mod render;
pub mod store;
mod transaction;

pub use cursor::MemoryCursor;
pub use transaction::MemoryTransaction;

use crate::config::TransactionOptions;
use crate::engine::{
    DatabaseOps, EngineError, EngineResult, SessionType, TransactionOps, TransactionType,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use store::Store;
use tracing::info;

/// The last published store and the number of commits that produced it
struct Committed {
    store: Store,
    version: u64,
}

/// Committed state shared by a database and its transactions
pub(crate) struct DatabaseState {
    name: String,
    committed: RwLock<Committed>,
    deleted: AtomicBool,
}

impl DatabaseState {
    fn ensure_exists(&self) -> EngineResult<()> {
        if self.deleted.load(Ordering::Acquire) {
            return Err(EngineError::constraint(
                "DBS01",
                format!("The database '{}' does not exist", self.name),
            ));
        }
        Ok(())
    }

    /// A private copy of the committed store, with the version it was taken at
    fn committed_copy(&self) -> EngineResult<(Store, u64)> {
        self.ensure_exists()?;
        self.committed
            .read()
            .map(|committed| (committed.store.clone(), committed.version))
            .map_err(|e| EngineError::Internal(format!("database store lock poisoned: {}", e)))
    }

    /// Replace the committed store, unless another commit landed after `base_version`
    fn publish(&self, store: Store, base_version: u64) -> EngineResult<u64> {
        self.ensure_exists()?;
        let mut committed = self
            .committed
            .write()
            .map_err(|e| EngineError::Internal(format!("database store lock poisoned: {}", e)))?;
        if committed.version != base_version {
            return Err(EngineError::CommitConflict {
                base: base_version,
                current: committed.version,
            });
        }
        committed.store = store;
        committed.version += 1;
        Ok(committed.version)
    }
}

/// A named in-memory database
#[derive(Clone)]
pub struct MemoryDatabase {
    state: Arc<DatabaseState>,
}

impl MemoryDatabase {
    /// Create a database seeded with the root types
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        info!("Created in-memory database '{}'", name);
        Self {
            state: Arc::new(DatabaseState {
                name,
                committed: RwLock::new(Committed {
                    store: Store::new(),
                    version: 0,
                }),
                deleted: AtomicBool::new(false),
            }),
        }
    }

    pub fn transaction(
        &self,
        session_type: SessionType,
        transaction_type: TransactionType,
        options: TransactionOptions,
    ) -> EngineResult<MemoryTransaction> {
        MemoryTransaction::open(self.state.clone(), session_type, transaction_type, options)
    }
}

impl DatabaseOps for MemoryDatabase {
    fn name(&self) -> String {
        self.state.name.clone()
    }

    fn open_transaction(
        &self,
        session_type: SessionType,
        transaction_type: TransactionType,
        options: TransactionOptions,
    ) -> EngineResult<Box<dyn TransactionOps>> {
        Ok(Box::new(self.transaction(session_type, transaction_type, options)?))
    }

    fn schema(&self) -> EngineResult<String> {
        // no rule engine: the full schema is the type schema
        self.type_schema()
    }

    fn type_schema(&self) -> EngineResult<String> {
        let (store, _) = self.state.committed_copy()?;
        render::type_schema(&store)
    }

    fn rule_schema(&self) -> EngineResult<String> {
        self.state.ensure_exists()?;
        Ok(String::new())
    }

    fn delete(&self) -> EngineResult<()> {
        self.state.ensure_exists()?;
        self.state.deleted.store(true, Ordering::Release);
        info!("Deleted in-memory database '{}'", self.state.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Label;
    use crate::engine::ConceptRequest;

    #[test]
    fn test_type_schema_after_commit() {
        let db = MemoryDatabase::new("library");
        assert_eq!(db.type_schema().unwrap(), "");

        let tx = db
            .transaction(SessionType::Schema, TransactionType::Write, TransactionOptions::default())
            .unwrap();
        tx.execute(ConceptRequest::PutEntityType {
            label: Label::new("book"),
        })
        .unwrap();
        assert_eq!(db.type_schema().unwrap(), "");
        tx.commit().unwrap();

        assert_eq!(db.schema().unwrap(), "define book sub entity;");
    }

    #[test]
    fn test_deleted_database_rejects_use() {
        let db = MemoryDatabase::new("library");
        db.delete().unwrap();
        assert!(db.delete().is_err());
        assert!(db.schema().is_err());
        assert!(db
            .transaction(SessionType::Data, TransactionType::Read, TransactionOptions::default())
            .is_err());
    }
}
