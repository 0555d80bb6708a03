//! Peer identity and records: stable device identity, status, report entries.

use serde::{Deserialize, Serialize};

/// Stable opaque peer identity (device address). Primary key in the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        PeerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        PeerId(s.to_string())
    }
}

/// Peer availability as reported by the platform binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerStatus {
    Available,
    Unavailable,
    Connecting,
    Connected,
}

/// One entry of a platform peer report: what the binding knows about a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub id: PeerId,
    pub display_name: String,
    pub status: PeerStatus,
}

impl PeerInfo {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, status: PeerStatus) -> Self {
        Self {
            id: PeerId::new(id),
            display_name: display_name.into(),
            status,
        }
    }
}

/// Stored peer: report fields plus the logical clock value of the most recent
/// report that included it. `last_seen` is non-decreasing per identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRecord {
    pub id: PeerId,
    pub display_name: String,
    pub status: PeerStatus,
    pub last_seen: u64,
}

impl PeerRecord {
    pub fn from_info(info: PeerInfo, last_seen: u64) -> Self {
        Self {
            id: info.id,
            display_name: info.display_name,
            status: info.status,
            last_seen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_id_ordering_is_lexicographic() {
        let a = PeerId::new("aa:bb:cc:dd:ee:01");
        let b = PeerId::new("aa:bb:cc:dd:ee:02");
        assert!(a < b);
    }

    #[test]
    fn record_from_info_carries_fields() {
        let info = PeerInfo::new("aa:01", "printer", PeerStatus::Available);
        let rec = PeerRecord::from_info(info.clone(), 7);
        assert_eq!(rec.id, info.id);
        assert_eq!(rec.display_name, "printer");
        assert_eq!(rec.status, PeerStatus::Available);
        assert_eq!(rec.last_seen, 7);
    }
}
