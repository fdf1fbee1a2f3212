//! The retry operator: configuration shared by all attachments.

use super::link::{Predicate, RetryLink};
use super::RetryConfig;
use crate::errors::Result;
use crate::events::{EventSink, NoOpEventSink};
use crate::flow::{Consumer, Producer};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Re-attaches to a producer whenever an item matches a predicate.
///
/// When the predicate returns true for an item, that item is dropped, the
/// live connection is cancelled, the optional recovery producer is run to
/// completion, and the original producer is attached again from scratch.
/// Failures are never retried; they always reach the consumer.
///
/// The operator itself is immutable. Every [`Producer::attach`] creates an
/// independent [`RetryLink`], and nothing is requested upstream until the
/// consumer asks for items.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use restream::prelude::*;
/// use restream::testing::{CollectingConsumer, SequenceProducer};
///
/// let operator = RetryOperator::new(
///     SequenceProducer::<i32, String>::new(vec![1, 2, 3]),
///     |item: &i32| *item == 2,
/// )
/// .with_recovery(SequenceProducer::new(vec![0]))
/// .with_config(RetryConfig::new().with_max_retries(1))
/// .unwrap();
///
/// let consumer = Arc::new(CollectingConsumer::<i32, String>::new());
/// operator.attach(consumer.clone());
/// assert_eq!(consumer.items(), vec![1, 0, 1, 2, 3]);
/// ```
pub struct RetryOperator<T, E> {
    upstream: Arc<dyn Producer<T, E>>,
    recovery: Option<Arc<dyn Producer<T, E>>>,
    predicate: Predicate<T>,
    config: RetryConfig,
    events: Arc<dyn EventSink>,
}

impl<T, E> RetryOperator<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Creates an operator that retries `upstream` when `predicate` matches.
    pub fn new<P, F>(upstream: P, predicate: F) -> Self
    where
        P: Producer<T, E> + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            upstream: Arc::new(upstream),
            recovery: None,
            predicate: Arc::new(predicate),
            config: RetryConfig::default(),
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Runs `recovery` to completion before every re-attachment.
    #[must_use]
    pub fn with_recovery<R>(mut self, recovery: R) -> Self
    where
        R: Producer<T, E> + 'static,
    {
        self.recovery = Some(Arc::new(recovery));
        self
    }

    /// Replaces the configuration after validating it.
    pub fn with_config(mut self, config: RetryConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Sends link lifecycle events to `sink`.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Returns true if a recovery producer is configured.
    #[must_use]
    pub const fn has_recovery(&self) -> bool {
        self.recovery.is_some()
    }

    /// Attaches `consumer` and returns the link it was handed.
    pub fn attach_link(&self, consumer: Arc<dyn Consumer<T, E>>) -> Arc<RetryLink<T, E>> {
        let handoff = Arc::clone(&consumer);
        let link = RetryLink::new(
            consumer,
            Arc::clone(&self.predicate),
            Arc::clone(&self.upstream),
            self.recovery.clone(),
            self.config.clone(),
            Arc::clone(&self.events),
        );
        debug!(link_id = %link.id(), label = %self.config.label, recovery = self.recovery.is_some(), "retry link created");
        handoff.on_connection_established(link.clone());
        link
    }
}

impl<T, E> Producer<T, E> for RetryOperator<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn attach(&self, consumer: Arc<dyn Consumer<T, E>>) {
        self.attach_link(consumer);
    }
}

impl<T, E> Clone for RetryOperator<T, E> {
    fn clone(&self) -> Self {
        Self {
            upstream: Arc::clone(&self.upstream),
            recovery: self.recovery.clone(),
            predicate: Arc::clone(&self.predicate),
            config: self.config.clone(),
            events: Arc::clone(&self.events),
        }
    }
}

impl<T, E> fmt::Debug for RetryOperator<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOperator")
            .field("config", &self.config)
            .field("has_recovery", &self.recovery.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Demand, LinkPhase};
    use crate::errors::RestreamError;
    use crate::testing::{CollectingConsumer, SequenceProducer};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_attach_is_lazy() {
        let upstream = Arc::new(SequenceProducer::<i32, String>::new(vec![1, 2, 3]));
        let operator = RetryOperator::new(upstream.clone(), |_: &i32| false);

        let consumer = Arc::new(CollectingConsumer::<i32, String>::with_demand(Demand::none()));
        let link = operator.attach_link(consumer.clone());

        assert_eq!(upstream.attachments(), 0);
        assert_eq!(link.phase(), LinkPhase::Unconnected);
        assert!(consumer.has_connection());
    }

    #[test]
    fn test_each_attachment_gets_its_own_link() {
        let upstream = Arc::new(SequenceProducer::<i32, String>::new(vec![1, 2]));
        let operator = RetryOperator::new(upstream.clone(), |_: &i32| false);

        let first = Arc::new(CollectingConsumer::<i32, String>::new());
        let second = Arc::new(CollectingConsumer::<i32, String>::new());
        let first_link = operator.attach_link(first.clone());
        let second_link = operator.attach_link(second.clone());

        assert_ne!(first_link.id(), second_link.id());
        assert_eq!(first.items(), vec![1, 2]);
        assert_eq!(second.items(), vec![1, 2]);
        assert_eq!(upstream.attachments(), 2);
    }

    #[test]
    fn test_with_config_validates() {
        let operator = RetryOperator::new(SequenceProducer::<i32, String>::new(vec![]), |_: &i32| false);
        let err = operator.with_config(RetryConfig::new().with_label("")).unwrap_err();
        assert!(matches!(err, RestreamError::InvalidConfig(_)));
    }

    #[test]
    fn test_accessors_and_debug() {
        let operator = RetryOperator::new(SequenceProducer::<i32, String>::new(vec![]), |_: &i32| false)
            .with_recovery(SequenceProducer::new(vec![0]))
            .with_config(RetryConfig::new().with_label("poll"))
            .unwrap();

        assert!(operator.has_recovery());
        assert_eq!(operator.config().label, "poll");
        let clone = operator.clone();
        assert!(format!("{clone:?}").contains("poll"));
    }
}
