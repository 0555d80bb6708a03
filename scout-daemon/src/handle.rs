//! Serialized coordinator access: a single task owns the `Coordinator`; all
//! caller commands and platform callbacks are marshalled onto it over a
//! channel, so transitions execute one at a time regardless of which thread
//! the binding delivers callbacks on.

use scout_core::{
    Action, Coordinator, DiagRecord, Handler, InvalidState, PeerInfo, PeerRecord, RejectReason,
    SessionState, SubscriptionId,
};
use tokio::sync::{mpsc, oneshot};

/// Actions forwarded to the binding task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingCommand {
    /// Issue a discovery request; reply via `accepted`/`rejected`.
    Request,
    /// Cancel the in-flight request. Fire-and-forget.
    Cancel,
}

enum Command {
    Start(oneshot::Sender<Result<(), InvalidState>>),
    Stop(oneshot::Sender<Result<(), InvalidState>>),
    Reset(oneshot::Sender<Result<(), InvalidState>>),
    Accepted,
    Rejected(RejectReason),
    PeersReport(Vec<PeerInfo>),
    Subscribe(Handler, oneshot::Sender<SubscriptionId>),
    State(oneshot::Sender<SessionState>),
    Peers(oneshot::Sender<Vec<PeerRecord>>),
    DrainDiag(oneshot::Sender<Vec<DiagRecord>>),
}

#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    #[error(transparent)]
    InvalidState(#[from] InvalidState),
    #[error("coordinator task stopped")]
    Closed,
}

/// Cheap-to-clone front door to the coordinator task.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl CoordinatorHandle {
    /// Spawn the owner task. Coordinator actions are forwarded to the binding
    /// over `binding_tx`.
    pub fn spawn(
        coordinator: Coordinator,
        binding_tx: mpsc::UnboundedSender<BindingCommand>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(coordinator, rx, binding_tx));
        Self { tx }
    }

    pub async fn start(&self) -> Result<(), HandleError> {
        Ok(self.call(Command::Start).await??)
    }

    pub async fn stop(&self) -> Result<(), HandleError> {
        Ok(self.call(Command::Stop).await??)
    }

    pub async fn reset(&self) -> Result<(), HandleError> {
        Ok(self.call(Command::Reset).await??)
    }

    /// Platform callback: request accepted. Fire-and-forget.
    pub fn accepted(&self) {
        let _ = self.tx.send(Command::Accepted);
    }

    /// Platform callback: request declined. Fire-and-forget.
    pub fn rejected(&self, reason: RejectReason) {
        let _ = self.tx.send(Command::Rejected(reason));
    }

    /// Platform callback: full peer report. Fire-and-forget; reports arriving
    /// after `stop` are dropped by the coordinator.
    pub fn peers_report(&self, reports: Vec<PeerInfo>) {
        let _ = self.tx.send(Command::PeersReport(reports));
    }

    pub async fn subscribe(&self, handler: Handler) -> Result<SubscriptionId, HandleError> {
        self.call(|reply| Command::Subscribe(handler, reply)).await
    }

    pub async fn state(&self) -> Result<SessionState, HandleError> {
        self.call(Command::State).await
    }

    pub async fn peers(&self) -> Result<Vec<PeerRecord>, HandleError> {
        self.call(Command::Peers).await
    }

    pub async fn drain_diag(&self) -> Result<Vec<DiagRecord>, HandleError> {
        self.call(Command::DrainDiag).await
    }

    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, HandleError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(make(reply_tx)).map_err(|_| HandleError::Closed)?;
        reply_rx.await.map_err(|_| HandleError::Closed)
    }
}

async fn run(
    mut coordinator: Coordinator,
    mut rx: mpsc::UnboundedReceiver<Command>,
    binding_tx: mpsc::UnboundedSender<BindingCommand>,
) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Start(reply) => {
                let res = coordinator.start().map(|action| forward(&binding_tx, action));
                let _ = reply.send(res);
            }
            Command::Stop(reply) => {
                let res = coordinator.stop().map(|action| forward(&binding_tx, action));
                let _ = reply.send(res);
            }
            Command::Reset(reply) => {
                let _ = reply.send(coordinator.reset());
            }
            Command::Accepted => coordinator.on_accepted(),
            Command::Rejected(reason) => coordinator.on_rejected(reason),
            Command::PeersReport(reports) => {
                coordinator.on_peers_report(reports);
            }
            Command::Subscribe(handler, reply) => {
                let _ = reply.send(coordinator.subscribe(handler));
            }
            Command::State(reply) => {
                let _ = reply.send(coordinator.state());
            }
            Command::Peers(reply) => {
                let _ = reply.send(coordinator.peers());
            }
            Command::DrainDiag(reply) => {
                let _ = reply.send(coordinator.drain_diag());
            }
        }
    }
}

fn forward(binding_tx: &mpsc::UnboundedSender<BindingCommand>, action: Action) {
    let cmd = match action {
        Action::RequestDiscovery => BindingCommand::Request,
        Action::CancelDiscovery => BindingCommand::Cancel,
    };
    // Binding gone means shutdown is in progress; nothing to cancel.
    let _ = binding_tx.send(cmd);
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::{PeerId, PeerStatus};
    use std::sync::{Arc, Mutex};

    fn spawn_handle() -> (CoordinatorHandle, mpsc::UnboundedReceiver<BindingCommand>) {
        let (binding_tx, binding_rx) = mpsc::unbounded_channel();
        let handle = CoordinatorHandle::spawn(Coordinator::new(), binding_tx);
        (handle, binding_rx)
    }

    #[tokio::test]
    async fn start_forwards_request_to_binding() {
        let (handle, mut binding_rx) = spawn_handle();
        handle.start().await.unwrap();
        assert_eq!(binding_rx.recv().await, Some(BindingCommand::Request));
        assert_eq!(handle.state().await.unwrap(), SessionState::Requesting);
    }

    #[tokio::test]
    async fn stop_forwards_cancel_to_binding() {
        let (handle, mut binding_rx) = spawn_handle();
        handle.start().await.unwrap();
        handle.stop().await.unwrap();
        assert_eq!(binding_rx.recv().await, Some(BindingCommand::Request));
        assert_eq!(binding_rx.recv().await, Some(BindingCommand::Cancel));
        assert_eq!(handle.state().await.unwrap(), SessionState::Stopped);
    }

    #[tokio::test]
    async fn callbacks_are_serialized_with_commands() {
        let (handle, _binding_rx) = spawn_handle();
        handle.start().await.unwrap();
        handle.accepted();
        handle.peers_report(vec![PeerInfo::new("a", "alpha", PeerStatus::Available)]);

        // The queries below queue behind the callbacks on the same channel.
        assert_eq!(handle.state().await.unwrap(), SessionState::Active);
        let peers = handle.peers().await.unwrap();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].id, PeerId::new("a"));
    }

    #[tokio::test]
    async fn report_after_stop_is_dropped() {
        let (handle, _binding_rx) = spawn_handle();
        handle.start().await.unwrap();
        handle.accepted();
        handle.stop().await.unwrap();
        handle.peers_report(vec![PeerInfo::new("a", "alpha", PeerStatus::Available)]);
        assert!(handle.peers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_state_surfaces_through_handle() {
        let (handle, _binding_rx) = spawn_handle();
        let err = handle.stop().await.unwrap_err();
        assert!(matches!(err, HandleError::InvalidState(_)));
    }

    #[tokio::test]
    async fn subscriber_receives_events_via_handle() {
        let (handle, _binding_rx) = spawn_handle();
        let count = Arc::new(Mutex::new(0u32));
        let c = count.clone();
        handle
            .subscribe(Box::new(move |_| {
                *c.lock().unwrap() += 1;
                Ok(())
            }))
            .await
            .unwrap();
        handle.start().await.unwrap();
        handle.accepted();
        // Flush the queue with a query before asserting.
        handle.state().await.unwrap();
        assert_eq!(*count.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn drain_diag_returns_records() {
        let (handle, _binding_rx) = spawn_handle();
        handle.start().await.unwrap();
        let records = handle.drain_diag().await.unwrap();
        assert!(records.iter().any(|r| r.message.contains("state changed")));
    }
}
