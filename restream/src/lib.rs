//! # Restream
//!
//! Retry-on-item with optional recovery for push-based, backpressure-aware
//! item pipelines.
//!
//! A [`RetryOperator`](retry::RetryOperator) wraps a producer. Whenever an
//! emitted item matches the retry predicate, the item is dropped, the live
//! upstream connection is cancelled, an optional recovery producer is run to
//! completion, and the original producer is attached again from scratch.
//! The consumer sees a single connection throughout and never loses the
//! demand it has requested.
//!
//! Restream provides:
//!
//! - **Protocol traits**: [`Producer`](flow::Producer),
//!   [`Consumer`](flow::Consumer) and [`Connection`](flow::Connection)
//! - **Retry state machine**: one [`RetryLink`](retry::RetryLink) per
//!   attachment, safe against re-entrant cancellation
//! - **Event-driven observability**: lifecycle events through an
//!   [`EventSink`](events::EventSink), plus `tracing` spans and logs
//! - **Stream bridge**: consume any producer as a `futures::Stream`
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use restream::prelude::*;
//! use restream::testing::{CollectingConsumer, SequenceProducer};
//!
//! let seen = std::sync::atomic::AtomicBool::new(false);
//! let operator = SequenceProducer::<i32, String>::new(vec![1, 2, 3])
//!     .retry_if_but_first(SequenceProducer::new(vec![4, 5, 6]), move |item: &i32| {
//!         *item == 2 && !seen.swap(true, std::sync::atomic::Ordering::SeqCst)
//!     });
//!
//! let consumer = Arc::new(CollectingConsumer::<i32, String>::new());
//! operator.attach(consumer.clone());
//! assert_eq!(consumer.items(), vec![1, 4, 5, 6, 1, 2, 3]);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

#[cfg(feature = "bridge")]
pub mod bridge;
pub mod core;
pub mod errors;
pub mod events;
pub mod flow;
pub mod observability;
pub mod retry;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    #[cfg(feature = "bridge")]
    pub use crate::bridge::{subscribe_stream, ItemStream};
    pub use crate::core::{Completion, Demand, LinkPhase, Source};
    pub use crate::errors::RestreamError;
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::flow::{Connection, Consumer, Producer, ProducerExt};
    pub use crate::observability::{init_tracing, LoggingConfig};
    pub use crate::retry::{LinkStats, RetryConfig, RetryLink, RetryOperator};
    pub use crate::utils::{generate_uuid, iso_timestamp};
}
