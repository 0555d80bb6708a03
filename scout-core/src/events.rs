//! Event dispatcher: ordered, synchronous delivery to subscribers with
//! per-handler fault isolation.

use uuid::Uuid;

use crate::diag::{DiagLevel, DiagSink};
use crate::peer::PeerRecord;
use crate::session::{RejectReason, SessionState};

/// Notifications delivered to subscribers. Snapshots only; subscribers never
/// receive mutable access to coordinator state.
#[derive(Debug, Clone)]
pub enum Event {
    PeerListChanged {
        added: Vec<PeerRecord>,
        updated: Vec<PeerRecord>,
        removed: Vec<PeerRecord>,
    },
    StateChanged {
        old: SessionState,
        new: SessionState,
        reason: Option<RejectReason>,
    },
}

/// Opaque handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

/// Subscriber callback. An `Err` is recorded as a handler fault and never
/// propagated to the originating transition.
pub type Handler = Box<dyn FnMut(&Event) -> anyhow::Result<()> + Send>;

/// Registry of subscribers. Delivery is synchronous, in event-generation
/// order across events and registration order within one event.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<(SubscriptionId, Handler)>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(Uuid::new_v4());
        self.handlers.push((id, handler));
        id
    }

    /// Remove a handler. No-op if already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.handlers.retain(|(h, _)| *h != id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }

    /// Deliver one event to every subscriber in registration order. A failing
    /// handler is reported to the sink and does not block later handlers.
    pub fn dispatch(&mut self, event: &Event, sink: &mut DiagSink) {
        for (id, handler) in &mut self.handlers {
            if let Err(err) = handler(event) {
                sink.record(
                    DiagLevel::Warn,
                    "handler fault during event delivery",
                    &[
                        ("subscription", &id.0.to_string()),
                        ("error", &format!("{err:#}")),
                    ],
                );
            }
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("subscribers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn state_event() -> Event {
        Event::StateChanged {
            old: SessionState::Idle,
            new: SessionState::Requesting,
            reason: None,
        }
    }

    #[test]
    fn delivery_in_registration_order() {
        let mut dispatcher = EventDispatcher::new();
        let mut sink = DiagSink::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["h1", "h2", "h3"] {
            let order = order.clone();
            dispatcher.subscribe(Box::new(move |_| {
                order.lock().unwrap().push(tag);
                Ok(())
            }));
        }

        dispatcher.dispatch(&state_event(), &mut sink);
        assert_eq!(*order.lock().unwrap(), vec!["h1", "h2", "h3"]);
    }

    #[test]
    fn failing_handler_does_not_block_later_ones() {
        let mut dispatcher = EventDispatcher::new();
        let mut sink = DiagSink::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = order.clone();
        dispatcher.subscribe(Box::new(move |_| {
            o.lock().unwrap().push("h1");
            Ok(())
        }));
        let o = order.clone();
        dispatcher.subscribe(Box::new(move |_| {
            o.lock().unwrap().push("h2");
            Err(anyhow::anyhow!("subscriber blew up"))
        }));
        let o = order.clone();
        dispatcher.subscribe(Box::new(move |_| {
            o.lock().unwrap().push("h3");
            Ok(())
        }));

        dispatcher.dispatch(&state_event(), &mut sink);

        assert_eq!(*order.lock().unwrap(), vec!["h1", "h2", "h3"]);
        let fault = sink
            .entries()
            .find(|r| r.message.contains("handler fault"))
            .expect("fault should be recorded");
        assert_eq!(fault.level, DiagLevel::Warn);
    }

    #[test]
    fn unsubscribe_removes_handler() {
        let mut dispatcher = EventDispatcher::new();
        let mut sink = DiagSink::new();
        let count = Arc::new(Mutex::new(0u32));

        let c = count.clone();
        let id = dispatcher.subscribe(Box::new(move |_| {
            *c.lock().unwrap() += 1;
            Ok(())
        }));

        dispatcher.dispatch(&state_event(), &mut sink);
        dispatcher.unsubscribe(id);
        dispatcher.dispatch(&state_event(), &mut sink);
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn unsubscribe_twice_is_noop() {
        let mut dispatcher = EventDispatcher::new();
        let id = dispatcher.subscribe(Box::new(|_| Ok(())));
        dispatcher.unsubscribe(id);
        dispatcher.unsubscribe(id);
        assert_eq!(dispatcher.subscriber_count(), 0);
    }
}
