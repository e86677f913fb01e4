use super::ConceptManager;
use crate::concept::{ConceptFactory, ConceptStream, FromConcept};
use crate::config::TransactionOptions;
use crate::engine::{
    ConceptRequest, ConceptResponse, SessionType, TransactionId, TransactionOps, TransactionType,
};
use crate::error::{ConceptError, ConceptResult};
use tracing::{info, trace};

/// A client transaction.
///
/// Every typed operation runs through exactly one engine request here. Once
/// the transaction is closed, by `close`, `commit` or the engine, every call
/// fails with [`ConceptError::IllegalState`].
pub struct Transaction {
    ops: Box<dyn TransactionOps>,
    options: TransactionOptions,
}

impl Transaction {
    pub fn new(ops: Box<dyn TransactionOps>, options: TransactionOptions) -> Self {
        Self { ops, options }
    }

    pub fn id(&self) -> TransactionId {
        self.ops.id()
    }

    pub fn session_type(&self) -> SessionType {
        self.ops.session_type()
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.ops.transaction_type()
    }

    pub fn options(&self) -> &TransactionOptions {
        &self.options
    }

    pub fn is_open(&self) -> bool {
        self.ops.is_open()
    }

    /// Schema roots and lookups by label or iid
    pub fn concepts(&self) -> ConceptManager<'_> {
        ConceptManager::new(self)
    }

    pub fn commit(&self) -> ConceptResult<()> {
        self.ensure_open()?;
        self.ops.commit()?;
        info!("Transaction {} committed", self.id());
        Ok(())
    }

    pub fn rollback(&self) -> ConceptResult<()> {
        self.ensure_open()?;
        self.ops.rollback()?;
        info!("Transaction {} rolled back", self.id());
        Ok(())
    }

    pub fn close(&self) {
        if self.is_open() {
            self.ops.close();
            info!("Transaction {} closed", self.id());
        }
    }

    pub(crate) fn ensure_open(&self) -> ConceptResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(ConceptError::IllegalState(format!(
                "transaction {} is closed",
                self.id()
            )))
        }
    }

    pub(crate) fn execute(&self, request: ConceptRequest) -> ConceptResult<ConceptResponse> {
        self.ensure_open()?;
        trace!("Transaction {} request {:?}", self.id(), request);
        Ok(self.ops.execute(request)?)
    }

    pub(crate) fn done(&self, request: ConceptRequest) -> ConceptResult<()> {
        self.execute(request)?.into_done()
    }

    pub(crate) fn flag(&self, request: ConceptRequest) -> ConceptResult<bool> {
        self.execute(request)?.into_bool()
    }

    pub(crate) fn text(&self, request: ConceptRequest) -> ConceptResult<Option<String>> {
        self.execute(request)?.into_text()
    }

    /// A concept that must be present
    pub(crate) fn single<T: FromConcept>(&self, request: ConceptRequest) -> ConceptResult<T> {
        let handle = self.execute(request)?.into_handle()?;
        ConceptFactory::wrap_as(handle)
    }

    pub(crate) fn optional<T: FromConcept>(&self, request: ConceptRequest) -> ConceptResult<Option<T>> {
        self.execute(request)?
            .into_optional_handle()?
            .map(ConceptFactory::wrap_as)
            .transpose()
    }

    pub(crate) fn stream<T: FromConcept>(&self, request: ConceptRequest) -> ConceptResult<ConceptStream<T>> {
        let cursor = self.execute(request)?.into_stream()?;
        Ok(ConceptStream::from_cursor(cursor))
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id())
            .field("session_type", &self.session_type())
            .field("transaction_type", &self.transaction_type())
            .field("open", &self.is_open())
            .finish()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        self.close();
    }
}
