//! Peer discovery session coordinator.
//! Host-driven: no I/O; the host passes platform callbacks and receives actions.

pub mod coordinator;
pub mod diag;
pub mod events;
pub mod peer;
pub mod session;
pub mod store;

pub use coordinator::{Action, Coordinator};
pub use diag::{DiagLevel, DiagRecord, DiagSink, DEFAULT_DIAG_CAPACITY};
pub use events::{Event, EventDispatcher, Handler, SubscriptionId};
pub use peer::{PeerId, PeerInfo, PeerRecord, PeerStatus};
pub use session::{DiscoverySession, InvalidState, RejectReason, SessionState};
pub use store::{PeerStore, ReconcileDelta};
