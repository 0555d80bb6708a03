//! Host-driven coordinator: the host passes platform callbacks and caller
//! commands in; the coordinator returns actions for the host to perform.

use crate::diag::{DiagLevel, DiagRecord, DiagSink};
use crate::events::{Event, EventDispatcher, Handler, SubscriptionId};
use crate::peer::{PeerId, PeerInfo, PeerRecord};
use crate::session::{DiscoverySession, InvalidState, RejectReason, SessionState};
use crate::store::{PeerStore, ReconcileDelta};

/// Action for the host to forward to the platform discovery binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Issue a discovery request; the outcome comes back via `on_accepted`
    /// or `on_rejected`.
    RequestDiscovery,
    /// Tell the binding to cancel the in-flight request. Fire-and-forget:
    /// the session is already `Stopped` when this is returned.
    CancelDiscovery,
}

/// Owns the discovery session, the peer store, the event dispatcher and the
/// diagnostics sink. All entry points must be called from one logical owner;
/// the host serializes concurrent callers (see `scout-daemon`'s handle).
pub struct Coordinator {
    session: DiscoverySession,
    store: PeerStore,
    dispatcher: EventDispatcher,
    diag: DiagSink,
    /// Logical clock: advanced on every accepted entry-point call. Used for
    /// `last_seen` stamps and session timestamps.
    clock: u64,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::with_diag_sink(DiagSink::new())
    }

    /// Inject a sink with a specific capacity (or pre-seeded for tests).
    pub fn with_diag_sink(diag: DiagSink) -> Self {
        Self {
            session: DiscoverySession::new(),
            store: PeerStore::new(),
            dispatcher: EventDispatcher::new(),
            diag,
            clock: 0,
        }
    }

    /// Request discovery. Returns immediately with the action to forward;
    /// completion arrives asynchronously via `on_accepted`/`on_rejected`.
    pub fn start(&mut self) -> Result<Action, InvalidState> {
        let now = self.tick();
        let old = self.session.state();
        self.session.start(now)?;
        self.record_transition(old, self.session.state(), None);
        Ok(Action::RequestDiscovery)
    }

    /// Cancel the session. The binding's in-flight request is cancelled
    /// out-of-band via the returned action.
    pub fn stop(&mut self) -> Result<Action, InvalidState> {
        let now = self.tick();
        let old = self.session.state();
        self.session.stop(now)?;
        self.record_transition(old, self.session.state(), None);
        Ok(Action::CancelDiscovery)
    }

    /// Return a terminal session to `Idle`, clearing the failure reason and
    /// the peer store.
    pub fn reset(&mut self) -> Result<(), InvalidState> {
        self.tick();
        let old = self.session.state();
        self.session.reset()?;
        self.store.clear();
        self.record_transition(old, self.session.state(), None);
        Ok(())
    }

    /// Platform callback: the discovery request was accepted. Stale calls
    /// (session no longer `Requesting`) are dropped with a debug record.
    pub fn on_accepted(&mut self) {
        self.tick();
        let old = self.session.state();
        if self.session.on_accepted().is_err() {
            self.drop_stale("on_accepted", old);
            return;
        }
        self.record_transition(old, self.session.state(), None);
    }

    /// Platform callback: the discovery request was declined.
    pub fn on_rejected(&mut self, reason: RejectReason) {
        let now = self.tick();
        let old = self.session.state();
        if self.session.on_rejected(reason, now).is_err() {
            self.drop_stale("on_rejected", old);
            return;
        }
        self.diag.record(
            DiagLevel::Error,
            "discovery request rejected",
            &[("reason", &reason.to_string())],
        );
        self.record_transition(old, self.session.state(), Some(reason));
    }

    /// Platform callback: full authoritative peer report. Reconciled only
    /// while `Active`; reports arriving after `stop()` are silently dropped
    /// (debug record only). Returns the applied delta, empty when dropped.
    pub fn on_peers_report(&mut self, reports: Vec<PeerInfo>) -> ReconcileDelta {
        let now = self.tick();
        if self.session.state() != SessionState::Active {
            self.drop_stale("on_peers_report", self.session.state());
            return ReconcileDelta::default();
        }
        let delta = self.store.reconcile(reports, now);
        if delta.is_empty() {
            return delta;
        }
        self.diag.record(
            DiagLevel::Info,
            "peer list changed",
            &[
                ("added", &delta.added.len().to_string()),
                ("updated", &delta.updated.len().to_string()),
                ("removed", &delta.removed.len().to_string()),
            ],
        );
        let event = Event::PeerListChanged {
            added: delta.added.clone(),
            updated: delta.updated.clone(),
            removed: delta.removed.clone(),
        };
        self.dispatcher.dispatch(&event, &mut self.diag);
        delta
    }

    pub fn subscribe(&mut self, handler: Handler) -> SubscriptionId {
        self.dispatcher.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.dispatcher.unsubscribe(id);
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn failure_reason(&self) -> Option<RejectReason> {
        self.session.failure_reason()
    }

    /// Read-only snapshot: known peers ordered by recency then identity.
    pub fn peers(&self) -> Vec<PeerRecord> {
        self.store.all()
    }

    pub fn peer(&self, id: &PeerId) -> Option<&PeerRecord> {
        self.store.get(id)
    }

    pub fn diag(&self) -> &DiagSink {
        &self.diag
    }

    /// Move retained diagnostics out (for an external log collaborator).
    pub fn drain_diag(&mut self) -> Vec<DiagRecord> {
        self.diag.drain()
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn record_transition(
        &mut self,
        old: SessionState,
        new: SessionState,
        reason: Option<RejectReason>,
    ) {
        self.diag.record(
            DiagLevel::Info,
            "session state changed",
            &[("old", &old.to_string()), ("new", &new.to_string())],
        );
        let event = Event::StateChanged { old, new, reason };
        self.dispatcher.dispatch(&event, &mut self.diag);
    }

    fn drop_stale(&mut self, op: &str, state: SessionState) {
        self.diag.record(
            DiagLevel::Debug,
            "stale platform callback dropped",
            &[("op", op), ("state", &state.to_string())],
        );
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}
