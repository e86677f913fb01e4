use super::Transaction;
use crate::config::TransactionOptions;
use crate::engine::{DatabaseOps, SessionType, TransactionType};
use crate::error::{ConceptError, ConceptResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// A database handle.
///
/// The name is captured once at construction and never re-queried. After
/// [`Database::delete`] every call fails with [`ConceptError::DatabaseDeleted`].
pub struct Database {
    ops: Arc<dyn DatabaseOps>,
    name: String,
    deleted: AtomicBool,
}

impl Database {
    pub fn new(ops: Arc<dyn DatabaseOps>) -> Self {
        let name = ops.name();
        Self {
            ops,
            name,
            deleted: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn ensure_live(&self) -> ConceptResult<()> {
        if self.deleted.load(Ordering::Acquire) {
            return Err(ConceptError::DatabaseDeleted(self.name.clone()));
        }
        Ok(())
    }

    /// Open a transaction; `options` are validated first
    pub fn transaction(
        &self,
        session_type: SessionType,
        transaction_type: TransactionType,
        options: TransactionOptions,
    ) -> ConceptResult<Transaction> {
        self.ensure_live()?;
        options.validate()?;
        let ops = self
            .ops
            .open_transaction(session_type, transaction_type, options.clone())?;
        info!(
            "Opened {:?} {:?} transaction {} on '{}'",
            session_type,
            transaction_type,
            ops.id(),
            self.name
        );
        Ok(Transaction::new(ops, options))
    }

    pub fn schema(&self) -> ConceptResult<String> {
        self.ensure_live()?;
        Ok(self.ops.schema()?)
    }

    pub fn type_schema(&self) -> ConceptResult<String> {
        self.ensure_live()?;
        Ok(self.ops.type_schema()?)
    }

    pub fn rule_schema(&self) -> ConceptResult<String> {
        self.ensure_live()?;
        Ok(self.ops.rule_schema()?)
    }

    pub fn delete(&self) -> ConceptResult<()> {
        self.ensure_live()?;
        self.ops.delete()?;
        self.deleted.store(true, Ordering::Release);
        info!("Database '{}' deleted", self.name);
        Ok(())
    }
}

impl std::fmt::Display for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::MemoryDatabase;

    #[test]
    fn test_operations_after_delete_fail() {
        let db = Database::new(Arc::new(MemoryDatabase::new("inventory")));
        assert_eq!(db.name(), "inventory");
        db.delete().unwrap();

        let err = db.schema().unwrap_err();
        assert_eq!(err, ConceptError::DatabaseDeleted("inventory".to_string()));
        assert!(err.is_illegal_state());
        assert!(db.delete().is_err());
        assert!(db
            .transaction(SessionType::Data, TransactionType::Read, TransactionOptions::default())
            .is_err());
        assert_eq!(db.name(), "inventory");
    }

    #[test]
    fn test_invalid_options_rejected() {
        let db = Database::new(Arc::new(MemoryDatabase::new("inventory")));
        let options = TransactionOptions::default().with_prefetch_size(0);
        let err = db
            .transaction(SessionType::Schema, TransactionType::Write, options)
            .unwrap_err();
        assert!(matches!(err, ConceptError::Config(_)));
    }
}
