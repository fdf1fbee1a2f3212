//! Combinators available on every producer.

use super::Producer;
use crate::retry::RetryOperator;
use std::sync::Arc;

#[cfg(feature = "bridge")]
use crate::bridge::{subscribe_stream, ItemStream};
#[cfg(feature = "bridge")]
use crate::errors::Result;

/// Extension methods for building pipelines out of producers.
pub trait ProducerExt<T, E>: Producer<T, E> + Sized + 'static
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Re-attaches to this producer whenever `predicate` matches an item.
    fn retry_if<F>(self, predicate: F) -> RetryOperator<T, E>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        RetryOperator::new(self, predicate)
    }

    /// Like [`retry_if`](Self::retry_if), but runs `recovery` to completion
    /// before every re-attachment.
    fn retry_if_but_first<R, F>(self, recovery: R, predicate: F) -> RetryOperator<T, E>
    where
        R: Producer<T, E> + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        RetryOperator::new(self, predicate).with_recovery(recovery)
    }

    /// Erases the concrete producer type.
    fn boxed(self) -> Arc<dyn Producer<T, E>> {
        Arc::new(self)
    }

    /// Attaches a stream consumer that requests `batch` items at a time.
    #[cfg(feature = "bridge")]
    fn into_stream(self, batch: usize) -> Result<ItemStream<T, E>> {
        subscribe_stream(&self, batch)
    }
}

impl<T, E, P> ProducerExt<T, E> for P
where
    P: Producer<T, E> + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
}
