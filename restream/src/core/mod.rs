//! Core value types of the push/pull protocol.
//!
//! This module contains:
//! - Demand accounting
//! - Completion signals
//! - Link lifecycle phases

mod completion;
mod demand;
mod phase;

pub use completion::Completion;
pub use demand::Demand;
pub use phase::{LinkPhase, Source};
