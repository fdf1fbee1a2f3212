//! Bridge from the push protocol to async [`Stream`]s.
//!
//! [`subscribe_stream`] attaches a consumer that forwards everything it
//! receives into a tokio channel and exposes the receiving side as an
//! [`ItemStream`]. Demand is requested in batches: the first batch when the
//! connection is established, the next once the stream has yielded the
//! whole previous batch.

use crate::core::{Completion, Demand};
use crate::errors::{RestreamError, Result};
use crate::flow::{Connection, Consumer, Producer};
use futures::Stream;
use parking_lot::Mutex;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

type ConnectionSlot = Arc<Mutex<Option<Arc<dyn Connection>>>>;

enum Signal<T, E> {
    Item(T),
    Done(Completion<E>),
}

/// Attaches to `producer` and returns its items as a stream.
///
/// The stream yields `Ok(item)` for every item and a final `Err(error)` if
/// the producer fails. Dropping the stream cancels the connection.
///
/// # Errors
///
/// Returns [`RestreamError::InvalidConfig`] if `batch` is zero.
pub fn subscribe_stream<T, E, P>(producer: &P, batch: usize) -> Result<ItemStream<T, E>>
where
    P: Producer<T, E> + ?Sized,
    T: Send + 'static,
    E: Send + 'static,
{
    if batch == 0 {
        return Err(RestreamError::invalid_config("stream batch size must be at least 1"));
    }
    let (tx, rx) = unbounded_channel();
    let connection: ConnectionSlot = Arc::new(Mutex::new(None));
    producer.attach(Arc::new(StreamConsumer {
        tx: Mutex::new(Some(tx)),
        batch,
        connection: Arc::clone(&connection),
    }));
    Ok(ItemStream {
        rx,
        connection,
        batch,
        yielded: 0,
        finished: false,
    })
}

struct StreamConsumer<T, E> {
    tx: Mutex<Option<UnboundedSender<Signal<T, E>>>>,
    batch: usize,
    connection: ConnectionSlot,
}

impl<T, E> Consumer<T, E> for StreamConsumer<T, E>
where
    T: Send,
    E: Send,
{
    fn on_connection_established(&self, connection: Arc<dyn Connection>) {
        *self.connection.lock() = Some(Arc::clone(&connection));
        connection.request_items(Demand::max(self.batch));
    }

    fn on_item_received(&self, item: T) -> Demand {
        let tx = self.tx.lock().clone();
        let delivered = tx.is_some_and(|tx| tx.send(Signal::Item(item)).is_ok());
        if !delivered {
            // Receiver is gone; the stream's drop cancels the connection.
            trace!("stream receiver closed, dropping item");
        }
        Demand::none()
    }

    fn on_completion(&self, completion: Completion<E>) {
        let tx = self.tx.lock().take();
        let connection = self.connection.lock().take();
        drop(connection);
        if let Some(tx) = tx {
            let _ = tx.send(Signal::Done(completion));
        }
    }
}

/// A [`Stream`] of items received from a producer.
pub struct ItemStream<T, E> {
    rx: UnboundedReceiver<Signal<T, E>>,
    connection: ConnectionSlot,
    batch: usize,
    yielded: usize,
    finished: bool,
}

impl<T, E> Unpin for ItemStream<T, E> {}

impl<T, E> ItemStream<T, E> {
    /// Cancels the underlying connection.
    ///
    /// Items already received are still yielded; the stream then ends
    /// without a failure.
    pub fn cancel(&mut self) {
        self.rx.close();
        let connection = self.connection.lock().take();
        if let Some(connection) = connection {
            debug!("cancelling stream connection");
            connection.cancel();
        }
    }

    /// Returns true once the stream has yielded its last element.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    fn request_next_batch(&mut self) {
        self.yielded += 1;
        if self.yielded < self.batch {
            return;
        }
        self.yielded = 0;
        let connection = self.connection.lock().clone();
        if let Some(connection) = connection {
            connection.request_items(Demand::max(self.batch));
        }
    }
}

impl<T, E> Stream for ItemStream<T, E> {
    type Item = std::result::Result<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Signal::Item(item))) => {
                this.request_next_batch();
                Poll::Ready(Some(Ok(item)))
            }
            Poll::Ready(Some(Signal::Done(Completion::Failed(error)))) => {
                this.finished = true;
                Poll::Ready(Some(Err(error)))
            }
            Poll::Ready(Some(Signal::Done(Completion::Finished)) | None) => {
                this.finished = true;
                Poll::Ready(None)
            }
        }
    }
}

impl<T, E> Drop for ItemStream<T, E> {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl<T, E> fmt::Debug for ItemStream<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemStream")
            .field("batch", &self.batch)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
