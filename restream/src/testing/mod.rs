//! Testing utilities for retry pipelines.
//!
//! This module provides:
//! - Scripted producers that emit a fixed sequence or stay silent
//! - A consumer that records everything it receives
//! - Assertions over what a consumer received

mod assertions;
mod mocks;

pub use assertions::{assert_failed_with, assert_finished, assert_items, assert_not_completed};
pub use mocks::{
    CollectingConsumer, PendingProducer, RecordingConnection, SequenceConnection,
    SequenceProducer,
};
