//! Retry-on-item with optional recovery.
//!
//! This module provides:
//! - [`RetryOperator`], the immutable operator consumers attach to
//! - [`RetryLink`], the state machine created per attachment
//! - [`RetryConfig`] and [`LinkStats`]

mod config;
mod link;
mod operator;
mod stats;

pub use config::RetryConfig;
pub use link::RetryLink;
pub use operator::RetryOperator;
pub use stats::{LinkStats, LinkStatsSnapshot};
