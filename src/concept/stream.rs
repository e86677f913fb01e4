//! Lazy, single-pass sequences of typed concepts

use super::{ConceptFactory, FromConcept};
use crate::engine::{ConceptHandle, Cursor, RawConcept};
use crate::error::{ConceptError, ConceptResult};
use std::fmt;
use std::marker::PhantomData;

/// Forward-only sequence of typed concepts.
///
/// Each element is materialised when it is pulled, interleaving engine
/// fetches with wrapping. The stream cannot be restarted, and pulling from
/// it after the owning transaction closed yields an
/// [`ConceptError::IllegalState`] once and then ends.
pub struct ConceptStream<T> {
    inner: Box<dyn Iterator<Item = ConceptResult<T>> + Send>,
}

impl<T: Send + 'static> ConceptStream<T> {
    pub fn new(iter: impl Iterator<Item = ConceptResult<T>> + Send + 'static) -> Self {
        Self {
            inner: Box::new(iter),
        }
    }

    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    pub fn once(item: T) -> Self {
        Self::new(std::iter::once(Ok(item)))
    }

    /// This stream, then `other`
    pub fn chain(self, other: ConceptStream<T>) -> Self {
        Self::new(self.inner.chain(other.inner))
    }

    /// Convert every element, keeping laziness
    pub fn map_ok<U: Send + 'static>(
        self,
        f: impl FnMut(T) -> ConceptResult<U> + Send + 'static,
    ) -> ConceptStream<U> {
        let mut f = f;
        ConceptStream::new(self.inner.map(move |item| item.and_then(&mut f)))
    }

    /// Drain the stream, stopping at the first failure
    pub fn collect_all(self) -> ConceptResult<Vec<T>> {
        self.collect()
    }
}

impl<T: FromConcept> ConceptStream<T> {
    /// Wrap an engine cursor, downcasting each concept to `T`
    pub(crate) fn from_cursor(cursor: Box<dyn Cursor<RawConcept>>) -> Self {
        Self::new(CursorIter::<T> {
            cursor,
            exhausted: false,
            _marker: PhantomData,
        })
    }
}

impl<T> Iterator for ConceptStream<T> {
    type Item = ConceptResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl<T> fmt::Debug for ConceptStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConceptStream")
    }
}

struct CursorIter<T> {
    cursor: Box<dyn Cursor<RawConcept>>,
    exhausted: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromConcept> Iterator for CursorIter<T> {
    type Item = ConceptResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        match self.cursor.next() {
            Ok(Some(raw)) => Some(
                ConceptHandle::new(Some(raw))
                    .and_then(ConceptFactory::wrap)
                    .and_then(T::from_concept),
            ),
            Ok(None) => {
                self.exhausted = true;
                None
            }
            Err(e) => {
                self.exhausted = true;
                Some(Err(ConceptError::from(e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_preserves_order() {
        let stream = ConceptStream::once(1).chain(ConceptStream::new(vec![Ok(2), Ok(3)].into_iter()));
        assert_eq!(stream.collect_all().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_collect_stops_at_first_error() {
        let stream = ConceptStream::new(
            vec![Ok(1), Err(ConceptError::MultipleFilters), Ok(3)].into_iter(),
        );
        assert_eq!(stream.collect_all().unwrap_err(), ConceptError::MultipleFilters);
    }

    #[test]
    fn test_map_ok_is_lazy() {
        let mut stream = ConceptStream::new(vec![Ok(1), Ok(2)].into_iter()).map_ok(|n| Ok(n * 10));
        assert_eq!(stream.next().unwrap().unwrap(), 10);
        assert_eq!(stream.next().unwrap().unwrap(), 20);
        assert!(stream.next().is_none());
        assert!(ConceptStream::<u8>::empty().next().is_none());
    }
}
