//! The per-attachment retry state machine.
//!
//! A [`RetryLink`] sits between one consumer and whichever producer is
//! currently live. Downstream it is the consumer's [`Connection`]; upstream
//! it is a [`Consumer`] of the original or the recovery producer. Both roles
//! share one `LinkState` behind a mutex that is never held across a call
//! into a producer, a connection, the consumer, the predicate or the event
//! sink, so every entry point may be re-entered from inside another.

use super::{LinkStats, RetryConfig};
use crate::core::{Completion, Demand, LinkPhase, Source};
use crate::events::{self, EventSink};
use crate::flow::{Connection, Consumer, Producer};
use crate::utils::generate_uuid;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Decides whether an item triggers a retry.
pub(crate) type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

struct LinkState<T, E> {
    consumer: Option<Arc<dyn Consumer<T, E>>>,
    connection: Option<Arc<dyn Connection>>,
    awaiting_connection: bool,
    remaining: Demand,
    in_recovery: bool,
    cancelled: bool,
    phase: LinkPhase,
    /// Bumped whenever the live connection is superseded; signals tagged
    /// with an older generation are ignored.
    generation: u64,
    retries: u64,
}

impl<T, E> LinkState<T, E> {
    fn transition(&mut self, link_id: Uuid, next: LinkPhase) {
        if !self.phase.can_transition_to(next) {
            warn!(%link_id, from = %self.phase, to = %next, "unexpected retry link transition");
        }
        self.phase = next;
    }

    fn is_closed(&self) -> bool {
        self.cancelled || self.phase.is_terminal()
    }

    fn active_source(&self) -> Source {
        if self.in_recovery {
            Source::Recovery
        } else {
            Source::Upstream
        }
    }
}

/// One consumer's attachment to a [`RetryOperator`](super::RetryOperator).
pub struct RetryLink<T, E> {
    id: Uuid,
    config: RetryConfig,
    predicate: Predicate<T>,
    upstream: Arc<dyn Producer<T, E>>,
    recovery: Option<Arc<dyn Producer<T, E>>>,
    events: Arc<dyn EventSink>,
    stats: LinkStats,
    state: Mutex<LinkState<T, E>>,
    this: Weak<Self>,
}

impl<T, E> RetryLink<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub(crate) fn new(
        consumer: Arc<dyn Consumer<T, E>>,
        predicate: Predicate<T>,
        upstream: Arc<dyn Producer<T, E>>,
        recovery: Option<Arc<dyn Producer<T, E>>>,
        config: RetryConfig,
        events: Arc<dyn EventSink>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            id: generate_uuid(),
            config,
            predicate,
            upstream,
            recovery,
            events,
            stats: LinkStats::default(),
            state: Mutex::new(LinkState {
                consumer: Some(consumer),
                connection: None,
                awaiting_connection: false,
                remaining: Demand::none(),
                in_recovery: false,
                cancelled: false,
                phase: LinkPhase::Unconnected,
                generation: 0,
                retries: 0,
            }),
            this: this.clone(),
        })
    }

    /// Unique id of this link, as used in logs and events.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> LinkPhase {
        self.state.lock().phase
    }

    /// Demand the consumer has requested but not yet received.
    #[must_use]
    pub fn remaining_demand(&self) -> Demand {
        self.state.lock().remaining
    }

    /// Returns true once the consumer has cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }

    /// Returns true while an upstream connection is held.
    #[must_use]
    pub fn has_connection(&self) -> bool {
        self.state.lock().connection.is_some()
    }

    /// Returns true while the recovery producer is running.
    #[must_use]
    pub fn is_in_recovery(&self) -> bool {
        self.state.lock().in_recovery
    }

    /// Counters for this link.
    #[must_use]
    pub const fn stats(&self) -> &LinkStats {
        &self.stats
    }

    fn is_current(&self, generation: u64) -> bool {
        self.state.lock().generation == generation
    }

    fn emit(&self, event_type: &str, extra: Value) {
        if self.config.emit_events {
            let payload = events::link_event_payload(self.id, &self.config.label, extra);
            self.events.try_emit(event_type, Some(payload));
        }
    }

    /// Attaches to `source`, falling back to the original producer when no
    /// recovery producer is configured.
    fn connect(&self, source: Source) {
        let Some(this) = self.this.upgrade() else {
            return;
        };
        let (source, producer) = match (source, &self.recovery) {
            (Source::Recovery, Some(recovery)) => (Source::Recovery, Arc::clone(recovery)),
            _ => (Source::Upstream, Arc::clone(&self.upstream)),
        };
        let generation = {
            let mut state = self.state.lock();
            if state.is_closed() {
                return;
            }
            state.generation += 1;
            state.awaiting_connection = true;
            state.in_recovery = source == Source::Recovery;
            state.transition(self.id, LinkPhase::connecting(source));
            state.generation
        };
        self.stats.record_connection();
        debug!(link_id = %self.id, label = %self.config.label, %source, generation, "attaching to producer");
        producer.attach(Arc::new(UpstreamAdapter {
            link: this,
            generation,
            source,
        }));
    }

    /// Drops the live connection and starts over, through the recovery
    /// producer when there is one.
    fn retry(&self, generation: u64) {
        let next = if self.recovery.is_some() {
            Source::Recovery
        } else {
            Source::Upstream
        };
        let (stale, retries) = {
            let mut state = self.state.lock();
            if state.is_closed() || state.generation != generation {
                return;
            }
            state.retries += 1;
            state.generation += 1;
            state.awaiting_connection = true;
            (state.connection.take(), state.retries)
        };
        self.stats.record_retry();
        if let Some(connection) = stale {
            connection.cancel();
        }
        debug!(link_id = %self.id, label = %self.config.label, retries, next = %next, "retry triggered");
        self.emit(events::RETRY_TRIGGERED, json!({ "retries": retries, "next": next }));
        if next == Source::Recovery {
            self.emit(events::RECOVERY_STARTED, json!({ "retries": retries }));
        }
        self.connect(next);
    }

    fn forward(&self, item: T) -> Demand {
        let (consumer, generation) = {
            let mut state = self.state.lock();
            let Some(consumer) = state.consumer.clone() else {
                return Demand::none();
            };
            state.remaining = state.remaining.decrement();
            (consumer, state.generation)
        };
        self.stats.record_forward();
        trace!(link_id = %self.id, "forwarding item");

        let returned = consumer.on_item_received(item);
        if !self.config.honor_consumer_demand || returned.is_none() {
            return Demand::none();
        }

        // The consumer may have requested, cancelled or caused a retry while
        // it held the item. Extra demand goes to whichever connection is
        // live now, or waits in `remaining` for the next one.
        let redirect = {
            let mut state = self.state.lock();
            if state.is_closed() {
                return Demand::none();
            }
            state.remaining += returned;
            if state.generation == generation {
                return returned;
            }
            state.connection.clone()
        };
        if let Some(connection) = redirect {
            connection.request_items(returned);
        }
        Demand::none()
    }
}

impl<T, E> Connection for RetryLink<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn request_items(&self, demand: Demand) {
        if demand.is_none() {
            return;
        }
        let (live, connect) = {
            let mut state = self.state.lock();
            if state.is_closed() {
                return;
            }
            state.remaining += demand;
            match state.connection.clone() {
                Some(connection) => (Some(connection), false),
                None => (None, !state.awaiting_connection),
            }
        };
        trace!(link_id = %self.id, %demand, "demand requested");
        if let Some(connection) = live {
            connection.request_items(demand);
        } else if connect {
            self.connect(Source::Upstream);
        }
    }

    fn cancel(&self) {
        let (connection, consumer, was_terminal) = {
            let mut state = self.state.lock();
            if state.cancelled {
                return;
            }
            state.cancelled = true;
            state.awaiting_connection = false;
            state.generation += 1;
            let was_terminal = state.phase.is_terminal();
            if !was_terminal {
                state.transition(self.id, LinkPhase::Cancelled);
            }
            (state.connection.take(), state.consumer.take(), was_terminal)
        };
        drop(consumer);
        if let Some(connection) = connection {
            connection.cancel();
        }
        if !was_terminal {
            debug!(link_id = %self.id, label = %self.config.label, "link cancelled");
            self.emit(events::LINK_CANCELLED, json!({}));
        }
    }
}

impl<T, E> Consumer<T, E> for RetryLink<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn on_connection_established(&self, connection: Arc<dyn Connection>) {
        let demand = {
            let mut state = self.state.lock();
            if state.is_closed() {
                None
            } else {
                state.connection = Some(Arc::clone(&connection));
                state.awaiting_connection = false;
                let source = state.active_source();
                state.transition(self.id, LinkPhase::active(source));
                Some(state.remaining)
            }
        };
        match demand {
            None => connection.cancel(),
            Some(demand) if demand.is_none() => {}
            Some(demand) => connection.request_items(demand),
        }
    }

    fn on_item_received(&self, item: T) -> Demand {
        let (retry_enabled, generation) = {
            let state = self.state.lock();
            if state.is_closed() {
                return Demand::none();
            }
            (
                !state.in_recovery && self.config.allows_retry(state.retries),
                state.generation,
            )
        };
        if retry_enabled && (self.predicate)(&item) {
            self.retry(generation);
            return Demand::none();
        }
        self.forward(item)
    }

    fn on_completion(&self, completion: Completion<E>) {
        let (resume, consumer, finished_connection, from_recovery) = {
            let mut state = self.state.lock();
            if state.is_closed() {
                return;
            }
            let finished_connection = state.connection.take();
            state.generation += 1;
            let from_recovery = state.in_recovery;
            state.in_recovery = false;
            if from_recovery && completion.is_finished() {
                (true, None, finished_connection, true)
            } else {
                state.awaiting_connection = false;
                let next = if completion.is_finished() {
                    LinkPhase::Completed
                } else {
                    LinkPhase::Failed
                };
                state.transition(self.id, next);
                (false, state.consumer.take(), finished_connection, from_recovery)
            }
        };
        drop(finished_connection);

        if resume {
            self.stats.record_recovery();
            debug!(link_id = %self.id, label = %self.config.label, "recovery finished, re-attaching upstream");
            self.emit(events::RECOVERY_FINISHED, json!({}));
            self.connect(Source::Upstream);
            return;
        }

        let event = match (completion.is_finished(), from_recovery) {
            (true, _) => events::LINK_COMPLETED,
            (false, true) => events::RECOVERY_FAILED,
            (false, false) => events::LINK_FAILED,
        };
        debug!(link_id = %self.id, label = %self.config.label, event, "link terminated");
        self.emit(event, json!({ "retries": self.stats.retries() }));
        if let Some(consumer) = consumer {
            consumer.on_completion(completion);
        }
    }
}

impl<T, E> fmt::Debug for RetryLink<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RetryLink")
            .field("id", &self.id)
            .field("label", &self.config.label)
            .field("phase", &state.phase)
            .field("remaining", &state.remaining)
            .field("retries", &state.retries)
            .finish_non_exhaustive()
    }
}

/// The consumer a link hands to a producer for one attachment.
///
/// Signals are passed on only while the attachment is still the link's
/// current one, so a cancelled connection that keeps emitting cannot leak
/// items past a retry.
struct UpstreamAdapter<T, E> {
    link: Arc<RetryLink<T, E>>,
    generation: u64,
    source: Source,
}

impl<T, E> Consumer<T, E> for UpstreamAdapter<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn on_connection_established(&self, connection: Arc<dyn Connection>) {
        if self.link.is_current(self.generation) {
            self.link.on_connection_established(connection);
        } else {
            debug!(link_id = %self.link.id, source = %self.source, "cancelling superseded connection");
            connection.cancel();
        }
    }

    fn on_item_received(&self, item: T) -> Demand {
        if self.link.is_current(self.generation) {
            self.link.on_item_received(item)
        } else {
            trace!(link_id = %self.link.id, source = %self.source, "dropping item from superseded connection");
            Demand::none()
        }
    }

    fn on_completion(&self, completion: Completion<E>) {
        if self.link.is_current(self.generation) {
            self.link.on_completion(completion);
        } else {
            trace!(link_id = %self.link.id, source = %self.source, "ignoring completion from superseded connection");
        }
    }
}
