//! Database and transaction handles over an engine

mod database;
mod manager;
mod transaction;

pub use database::Database;
pub use manager::ConceptManager;
pub use transaction::Transaction;
