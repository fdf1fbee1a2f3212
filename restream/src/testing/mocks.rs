//! Producers, connections and consumers for exercising pipelines.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::core::{Completion, Demand};
use crate::flow::{Connection, Consumer, Producer};

/// Emits a fixed list of items, then a fixed completion.
///
/// Every attachment starts again from the first item. Delivery honors
/// demand and tolerates re-entrant requests and cancellation from inside
/// `on_item_received`.
pub struct SequenceProducer<T, E> {
    items: Arc<Vec<T>>,
    termination: Completion<E>,
    attachments: AtomicUsize,
    last_connection: Mutex<Option<Arc<SequenceConnection<T, E>>>>,
}

impl<T, E> SequenceProducer<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Creates a producer that emits `items` and then finishes.
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: Arc::new(items),
            termination: Completion::Finished,
            attachments: AtomicUsize::new(0),
            last_connection: Mutex::new(None),
        }
    }

    /// Creates a producer that fails straight away.
    #[must_use]
    pub fn failing(error: E) -> Self {
        Self::new(Vec::new()).then_fail(error)
    }

    /// Fails with `error` after the last item instead of finishing.
    #[must_use]
    pub fn then_fail(mut self, error: E) -> Self {
        self.termination = Completion::Failed(error);
        self
    }

    /// Returns how many times a consumer attached.
    #[must_use]
    pub fn attachments(&self) -> usize {
        self.attachments.load(Ordering::SeqCst)
    }

    /// Returns the connection handed out by the latest attachment.
    #[must_use]
    pub fn last_connection(&self) -> Option<Arc<SequenceConnection<T, E>>> {
        self.last_connection.lock().clone()
    }
}

impl<T, E> Producer<T, E> for SequenceProducer<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn attach(&self, consumer: Arc<dyn Consumer<T, E>>) {
        self.attachments.fetch_add(1, Ordering::SeqCst);
        let connection = Arc::new(SequenceConnection {
            items: Arc::clone(&self.items),
            termination: self.termination.clone(),
            consumer: Mutex::new(Some(Arc::clone(&consumer))),
            state: Mutex::new(EmitState::default()),
        });
        *self.last_connection.lock() = Some(Arc::clone(&connection));
        consumer.on_connection_established(connection);
    }
}

#[derive(Debug, Default)]
struct EmitState {
    demand: Demand,
    requested: Demand,
    position: usize,
    emitting: bool,
    cancelled: bool,
    done: bool,
}

/// The connection handed out by a [`SequenceProducer`].
pub struct SequenceConnection<T, E> {
    items: Arc<Vec<T>>,
    termination: Completion<E>,
    consumer: Mutex<Option<Arc<dyn Consumer<T, E>>>>,
    state: Mutex<EmitState>,
}

impl<T, E> SequenceConnection<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Returns true once cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }

    /// Returns how many items have been emitted.
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.state.lock().position
    }

    /// Returns the total demand requested on this connection.
    #[must_use]
    pub fn requested(&self) -> Demand {
        self.state.lock().requested
    }

    /// Emits while there is demand, one item at a time.
    fn drain(&self) {
        loop {
            let next = {
                let mut state = self.state.lock();
                if state.cancelled {
                    state.emitting = false;
                    return;
                }
                if state.position >= self.items.len() {
                    state.done = true;
                    state.emitting = false;
                    None
                } else if state.demand.is_none() {
                    state.emitting = false;
                    return;
                } else {
                    state.demand = state.demand.decrement();
                    state.position += 1;
                    Some(self.items[state.position - 1].clone())
                }
            };

            let Some(item) = next else {
                let consumer = self.consumer.lock().take();
                if let Some(consumer) = consumer {
                    consumer.on_completion(self.termination.clone());
                }
                return;
            };

            let consumer = self.consumer.lock().clone();
            let Some(consumer) = consumer else {
                return;
            };
            let more = consumer.on_item_received(item);
            if !more.is_none() {
                let mut state = self.state.lock();
                state.demand += more;
                state.requested += more;
            }
        }
    }
}

impl<T, E> Connection for SequenceConnection<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn request_items(&self, demand: Demand) {
        {
            let mut state = self.state.lock();
            if state.cancelled || state.done {
                return;
            }
            state.demand += demand;
            state.requested += demand;
            if state.emitting {
                return;
            }
            state.emitting = true;
        }
        self.drain();
    }

    fn cancel(&self) {
        self.state.lock().cancelled = true;
        let consumer = self.consumer.lock().take();
        drop(consumer);
    }
}

/// A connection that records what it is asked for and never emits.
#[derive(Debug, Default)]
pub struct RecordingConnection {
    requested: Mutex<Demand>,
    cancels: AtomicUsize,
}

impl RecordingConnection {
    /// Creates a new recording connection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total demand requested so far.
    #[must_use]
    pub fn requested(&self) -> Demand {
        *self.requested.lock()
    }

    /// Returns how many times `cancel` was called.
    #[must_use]
    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    /// Returns true if `cancel` was called at least once.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_count() > 0
    }
}

impl Connection for RecordingConnection {
    fn request_items(&self, demand: Demand) {
        *self.requested.lock() += demand;
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

/// A producer that hands out a [`RecordingConnection`] and then stays
/// silent forever.
///
/// Attached consumers are kept alive, so anything that ends when its
/// consumer is dropped stays open.
pub struct PendingProducer<T, E> {
    connections: Mutex<Vec<Arc<RecordingConnection>>>,
    consumers: Mutex<Vec<Arc<dyn Consumer<T, E>>>>,
}

impl<T, E> Default for PendingProducer<T, E> {
    fn default() -> Self {
        Self {
            connections: Mutex::new(Vec::new()),
            consumers: Mutex::new(Vec::new()),
        }
    }
}

impl<T, E> PendingProducer<T, E> {
    /// Creates a new pending producer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every connection handed out so far.
    #[must_use]
    pub fn connections(&self) -> Vec<Arc<RecordingConnection>> {
        self.connections.lock().clone()
    }

    /// Returns how many consumers are attached.
    #[must_use]
    pub fn consumer_count(&self) -> usize {
        self.consumers.lock().len()
    }
}

impl<T, E> Producer<T, E> for PendingProducer<T, E> {
    fn attach(&self, consumer: Arc<dyn Consumer<T, E>>) {
        let connection = Arc::new(RecordingConnection::new());
        self.connections.lock().push(Arc::clone(&connection));
        self.consumers.lock().push(Arc::clone(&consumer));
        consumer.on_connection_established(connection);
    }
}

/// Records everything it receives.
///
/// Requests its initial demand as soon as the connection arrives, returns a
/// fixed extra demand for every item, and can cancel itself from inside an
/// item callback.
pub struct CollectingConsumer<T, E> {
    initial_demand: Demand,
    per_item_demand: Demand,
    cancel_after: Option<usize>,
    items: Mutex<Vec<T>>,
    completions: Mutex<Vec<Completion<E>>>,
    connection: Mutex<Option<Arc<dyn Connection>>>,
}

impl<T, E> CollectingConsumer<T, E> {
    /// Creates a consumer with unbounded demand.
    #[must_use]
    pub fn new() -> Self {
        Self::with_demand(Demand::Unbounded)
    }

    /// Creates a consumer that initially requests `demand`.
    #[must_use]
    pub fn with_demand(demand: Demand) -> Self {
        Self {
            initial_demand: demand,
            per_item_demand: Demand::none(),
            cancel_after: None,
            items: Mutex::new(Vec::new()),
            completions: Mutex::new(Vec::new()),
            connection: Mutex::new(None),
        }
    }

    /// Returns `demand` from every `on_item_received`.
    #[must_use]
    pub fn returning(mut self, demand: Demand) -> Self {
        self.per_item_demand = demand;
        self
    }

    /// Cancels the connection from inside the callback for the `n`th item.
    #[must_use]
    pub fn cancel_after(mut self, n: usize) -> Self {
        self.cancel_after = Some(n);
        self
    }

    /// Requests more items on the stored connection.
    pub fn request(&self, demand: Demand) {
        let connection = self.connection.lock().clone();
        if let Some(connection) = connection {
            connection.request_items(demand);
        }
    }

    /// Cancels the stored connection.
    pub fn cancel(&self) {
        let connection = self.connection.lock().clone();
        if let Some(connection) = connection {
            connection.cancel();
        }
    }

    /// Returns true once a connection has been established.
    #[must_use]
    pub fn has_connection(&self) -> bool {
        self.connection.lock().is_some()
    }

    /// Returns how many completions were received.
    #[must_use]
    pub fn completion_count(&self) -> usize {
        self.completions.lock().len()
    }

    /// Returns true if the first completion was `Finished`.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.completions.lock().first().is_some_and(Completion::is_finished)
    }
}

impl<T: Clone, E: Clone> CollectingConsumer<T, E> {
    /// Returns the items received so far.
    #[must_use]
    pub fn items(&self) -> Vec<T> {
        self.items.lock().clone()
    }

    /// Returns the first completion received, if any.
    #[must_use]
    pub fn completion(&self) -> Option<Completion<E>> {
        self.completions.lock().first().cloned()
    }

    /// Returns the failure payload of the first completion, if it failed.
    #[must_use]
    pub fn failure(&self) -> Option<E> {
        self.completion().and_then(|c| c.failure().cloned())
    }
}

impl<T, E> Default for CollectingConsumer<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Consumer<T, E> for CollectingConsumer<T, E>
where
    T: Send,
    E: Send,
{
    fn on_connection_established(&self, connection: Arc<dyn Connection>) {
        *self.connection.lock() = Some(Arc::clone(&connection));
        if !self.initial_demand.is_none() {
            connection.request_items(self.initial_demand);
        }
    }

    fn on_item_received(&self, item: T) -> Demand {
        let received = {
            let mut items = self.items.lock();
            items.push(item);
            items.len()
        };
        if self.cancel_after == Some(received) {
            self.cancel();
            return Demand::none();
        }
        self.per_item_demand
    }

    fn on_completion(&self, completion: Completion<E>) {
        self.completions.lock().push(completion);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_honors_demand() {
        let producer = SequenceProducer::<i32, String>::new(vec![1, 2, 3]);
        let consumer = Arc::new(CollectingConsumer::<i32, String>::with_demand(Demand::max(2)));

        producer.attach(consumer.clone());
        assert_eq!(consumer.items(), vec![1, 2]);
        assert_eq!(consumer.completion_count(), 0);

        consumer.request(Demand::max(1));
        assert_eq!(consumer.items(), vec![1, 2, 3]);
        assert!(consumer.is_finished());
    }

    #[test]
    fn test_sequence_restarts_per_attachment() {
        let producer = SequenceProducer::<i32, String>::new(vec![1, 2]);
        let first = Arc::new(CollectingConsumer::<i32, String>::new());
        let second = Arc::new(CollectingConsumer::<i32, String>::new());

        producer.attach(first.clone());
        producer.attach(second.clone());

        assert_eq!(first.items(), vec![1, 2]);
        assert_eq!(second.items(), vec![1, 2]);
        assert_eq!(producer.attachments(), 2);
    }

    #[test]
    fn test_sequence_failure_after_items() {
        let producer = SequenceProducer::new(vec![1]).then_fail("boom".to_string());
        let consumer = Arc::new(CollectingConsumer::<i32, String>::new());

        producer.attach(consumer.clone());

        assert_eq!(consumer.items(), vec![1]);
        assert_eq!(consumer.failure(), Some("boom".to_string()));
    }

    #[test]
    fn test_returned_demand_keeps_sequence_flowing() {
        let producer = SequenceProducer::<i32, String>::new(vec![1, 2, 3, 4]);
        let consumer = Arc::new(
            CollectingConsumer::<i32, String>::with_demand(Demand::max(1)).returning(Demand::max(1)),
        );

        producer.attach(consumer.clone());

        assert_eq!(consumer.items(), vec![1, 2, 3, 4]);
        assert!(consumer.is_finished());
        let connection = producer.last_connection().unwrap();
        assert_eq!(connection.requested(), Demand::max(5));
    }

    #[test]
    fn test_cancel_from_item_callback_stops_emission() {
        let producer = SequenceProducer::<i32, String>::new(vec![1, 2, 3]);
        let consumer = Arc::new(CollectingConsumer::<i32, String>::new().cancel_after(1));

        producer.attach(consumer.clone());

        assert_eq!(consumer.items(), vec![1]);
        assert_eq!(consumer.completion_count(), 0);
        let connection = producer.last_connection().unwrap();
        assert!(connection.is_cancelled());
        assert_eq!(connection.emitted(), 1);
    }

    #[test]
    fn test_pending_producer_keeps_consumer_alive() {
        let producer = PendingProducer::<i32, String>::new();
        let consumer = Arc::new(CollectingConsumer::<i32, String>::new());
        let observer = Arc::downgrade(&consumer);

        producer.attach(consumer);

        assert_eq!(producer.consumer_count(), 1);
        assert!(observer.upgrade().is_some());
    }

    #[test]
    fn test_pending_producer_records_requests() {
        let producer = PendingProducer::<i32, String>::new();
        let consumer = Arc::new(CollectingConsumer::<i32, String>::with_demand(Demand::max(3)));

        producer.attach(consumer.clone());
        consumer.cancel();

        let connections = producer.connections();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].requested(), Demand::max(3));
        assert_eq!(connections[0].cancel_count(), 1);
        assert!(consumer.items().is_empty());
    }
}
