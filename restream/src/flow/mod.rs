//! The producer/consumer/connection protocol.
//!
//! Items are pushed from a [`Producer`] to an attached [`Consumer`], but
//! only as far as the consumer's [`Demand`] allows. The live handle between
//! the two is a [`Connection`], which the consumer uses to request more
//! items or to cancel.
//!
//! Every call may happen synchronously and re-entrantly: a producer is free
//! to establish the connection and deliver items from inside `attach`, and
//! a consumer is free to request or cancel from inside `on_item_received`.
//! Implementations must therefore never hold a lock across a call into the
//! other side.

mod ext;

pub use ext::ProducerExt;

use crate::core::{Completion, Demand};
use std::sync::Arc;

/// The live handle between one producer and one consumer.
#[cfg_attr(test, mockall::automock)]
pub trait Connection: Send + Sync {
    /// Adds `demand` to the outstanding demand of this connection.
    fn request_items(&self, demand: Demand);

    /// Stops delivery on this connection.
    ///
    /// Cancelling is idempotent.
    fn cancel(&self);
}

/// Receives items and a terminal completion from a producer.
pub trait Consumer<T, E>: Send + Sync {
    /// Called once with the connection for this attachment.
    fn on_connection_established(&self, connection: Arc<dyn Connection>);

    /// Called for every item; returns additional demand to add upstream.
    fn on_item_received(&self, item: T) -> Demand;

    /// Called once when the producer is done.
    fn on_completion(&self, completion: Completion<E>);
}

/// Emits items to attached consumers.
pub trait Producer<T, E>: Send + Sync {
    /// Attaches a consumer.
    ///
    /// The producer hands the consumer its connection through
    /// [`Consumer::on_connection_established`]. Emission starts only once
    /// demand has been requested on that connection.
    fn attach(&self, consumer: Arc<dyn Consumer<T, E>>);
}

impl<T, E, P> Producer<T, E> for Arc<P>
where
    P: Producer<T, E> + ?Sized,
{
    fn attach(&self, consumer: Arc<dyn Consumer<T, E>>) {
        (**self).attach(consumer);
    }
}
