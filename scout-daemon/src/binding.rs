//! LAN discovery binding: UDP multicast beacons, sighting table, periodic
//! full peer reports into the coordinator.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use scout_core::{PeerId, PeerInfo, PeerStatus, RejectReason};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::handle::{BindingCommand, CoordinatorHandle};
use crate::protocol::{decode_frame, encode_frame, Message, PROTOCOL_VERSION};

const MULTICAST_GROUP: &str = "239.255.71.71";

/// What we last heard from a peer, keyed by identity in the sighting table.
struct Sighting {
    display_name: String,
    status: PeerStatus,
    last_seen: Instant,
}

/// Drive the binding: waits for coordinator actions, owns the active
/// discovery loops. A second request while one is running is rejected with
/// `Busy`; socket setup failure is rejected with `Internal`.
pub async fn run_binding(
    cfg: Config,
    local_id: PeerId,
    handle: CoordinatorHandle,
    mut cmd_rx: mpsc::UnboundedReceiver<BindingCommand>,
) {
    let mut active: Option<ActiveBinding> = None;
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            BindingCommand::Request => {
                if active.is_some() {
                    handle.rejected(RejectReason::Busy);
                    continue;
                }
                match ActiveBinding::start(&cfg, &local_id, handle.clone()).await {
                    Ok(binding) => {
                        active = Some(binding);
                        handle.accepted();
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "discovery socket setup failed");
                        handle.rejected(RejectReason::Internal);
                    }
                }
            }
            BindingCommand::Cancel => {
                if let Some(binding) = active.take() {
                    binding.shutdown(&local_id).await;
                }
            }
        }
    }
    if let Some(binding) = active.take() {
        binding.shutdown(&local_id).await;
    }
}

struct ActiveBinding {
    socket: Arc<UdpSocket>,
    dest: SocketAddr,
    tasks: Vec<JoinHandle<()>>,
}

impl ActiveBinding {
    async fn start(
        cfg: &Config,
        local_id: &PeerId,
        handle: CoordinatorHandle,
    ) -> std::io::Result<Self> {
        let socket = Arc::new(make_multicast_socket(cfg.discovery_port).await?);
        let dest: SocketAddr = format!("{}:{}", MULTICAST_GROUP, cfg.discovery_port)
            .parse()
            .map_err(|e: std::net::AddrParseError| {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
            })?;

        let announce = Message::Announce {
            protocol_version: PROTOCOL_VERSION,
            peer_id: local_id.clone(),
            display_name: cfg.display_name.clone(),
            status: PeerStatus::Available,
        };
        let announce_frame = encode_frame(&announce)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let sightings: Arc<Mutex<HashMap<PeerId, Sighting>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let mut tasks = Vec::new();
        tasks.push(tokio::spawn(beacon_loop(
            socket.clone(),
            dest,
            announce_frame,
            Duration::from_secs(cfg.beacon_interval_secs),
        )));
        tasks.push(tokio::spawn(recv_loop(
            socket.clone(),
            sightings.clone(),
            local_id.clone(),
        )));
        tasks.push(tokio::spawn(report_loop(
            sightings,
            handle,
            Duration::from_secs(cfg.report_interval_secs),
            Duration::from_secs(cfg.peer_timeout_secs),
        )));

        Ok(Self {
            socket,
            dest,
            tasks,
        })
    }

    /// Best-effort leave, then stop the loops. Fire-and-forget from the
    /// coordinator's point of view.
    async fn shutdown(self, local_id: &PeerId) {
        let leave = Message::Leave {
            peer_id: local_id.clone(),
        };
        if let Ok(frame) = encode_frame(&leave) {
            let _ = self.socket.send_to(&frame, self.dest).await;
        }
        for task in self.tasks {
            task.abort();
        }
    }
}

async fn make_multicast_socket(discovery_port: u16) -> std::io::Result<UdpSocket> {
    let std_sock = std::net::UdpSocket::bind(("0.0.0.0", discovery_port))?;
    let multicast: std::net::Ipv4Addr =
        MULTICAST_GROUP
            .parse()
            .map_err(|e: std::net::AddrParseError| {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
            })?;
    std_sock.join_multicast_v4(&multicast, &std::net::Ipv4Addr::UNSPECIFIED)?;
    std_sock.set_multicast_ttl_v4(1)?;
    std_sock.set_nonblocking(true)?;
    UdpSocket::from_std(std_sock)
}

async fn beacon_loop(
    socket: Arc<UdpSocket>,
    dest: SocketAddr,
    frame: Vec<u8>,
    interval: Duration,
) {
    loop {
        let _ = socket.send_to(&frame, dest).await;
        tokio::time::sleep(interval).await;
    }
}

async fn recv_loop(
    socket: Arc<UdpSocket>,
    sightings: Arc<Mutex<HashMap<PeerId, Sighting>>>,
    local_id: PeerId,
) {
    let mut buf = vec![0u8; 65536];
    loop {
        let Ok((n, _from)) = socket.recv_from(&mut buf).await else {
            return;
        };
        let Ok((msg, _)) = decode_frame(&buf[..n]) else {
            continue;
        };
        match msg {
            Message::Announce {
                protocol_version,
                peer_id,
                display_name,
                status,
            } => {
                if protocol_version != PROTOCOL_VERSION || peer_id == local_id {
                    continue;
                }
                sightings.lock().await.insert(
                    peer_id,
                    Sighting {
                        display_name,
                        status,
                        last_seen: Instant::now(),
                    },
                );
            }
            Message::Leave { peer_id } => {
                sightings.lock().await.remove(&peer_id);
            }
        }
    }
}

/// Every interval: drop sightings past the timeout, then deliver the full
/// set of visible peers as one authoritative report.
async fn report_loop(
    sightings: Arc<Mutex<HashMap<PeerId, Sighting>>>,
    handle: CoordinatorHandle,
    interval: Duration,
    timeout: Duration,
) {
    loop {
        tokio::time::sleep(interval).await;
        let now = Instant::now();
        let report: Vec<PeerInfo> = {
            let mut map = sightings.lock().await;
            map.retain(|_, s| now.duration_since(s.last_seen) < timeout);
            map.iter()
                .map(|(id, s)| PeerInfo {
                    id: id.clone(),
                    display_name: s.display_name.clone(),
                    status: s.status,
                })
                .collect()
        };
        handle.peers_report(report);
    }
}
