use crate::engine::{Cursor, EngineError, EngineResult};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Batched cursor over a materialised answer set.
///
/// Answers move into the visible buffer `batch_size` at a time. Every call
/// checks the owning transaction's open flag first, so a cursor created
/// before `close` fails instead of yielding stale answers.
pub struct MemoryCursor<T> {
    pending: std::vec::IntoIter<T>,
    buffer: VecDeque<T>,
    batch_size: usize,
    open: Arc<AtomicBool>,
}

impl<T> MemoryCursor<T> {
    pub fn new(answers: Vec<T>, batch_size: usize, open: Arc<AtomicBool>) -> Self {
        Self {
            pending: answers.into_iter(),
            buffer: VecDeque::new(),
            batch_size: batch_size.max(1),
            open,
        }
    }

    fn fetch_batch(&mut self) {
        self.buffer.extend(self.pending.by_ref().take(self.batch_size));
        trace!("Cursor fetched a batch of {} answers", self.buffer.len());
    }
}

impl<T: Send> Cursor<T> for MemoryCursor<T> {
    fn next(&mut self) -> EngineResult<Option<T>> {
        if !self.open.load(Ordering::Acquire) {
            return Err(EngineError::TransactionClosed);
        }
        if self.buffer.is_empty() {
            self.fetch_batch();
        }
        Ok(self.buffer.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yields_in_order_then_exhausts() {
        let open = Arc::new(AtomicBool::new(true));
        let mut cursor = MemoryCursor::new(vec![1, 2, 3], 2, open);
        assert_eq!(cursor.next().unwrap(), Some(1));
        assert_eq!(cursor.next().unwrap(), Some(2));
        assert_eq!(cursor.next().unwrap(), Some(3));
        assert_eq!(cursor.next().unwrap(), None);
        assert_eq!(cursor.next().unwrap(), None);
    }

    #[test]
    fn test_fails_after_close() {
        let open = Arc::new(AtomicBool::new(true));
        let mut cursor = MemoryCursor::new(vec!["a", "b"], 1, open.clone());
        assert_eq!(cursor.next().unwrap(), Some("a"));
        open.store(false, Ordering::Release);
        assert_eq!(cursor.next().unwrap_err(), EngineError::TransactionClosed);
    }
}
