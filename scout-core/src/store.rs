//! Peer store: identity-keyed records, full-report reconciliation, ordered snapshots.

use std::collections::HashMap;

use crate::peer::{PeerId, PeerInfo, PeerRecord};

/// Disjoint delta produced by one reconciliation: peers that appeared,
/// changed, or disappeared relative to the previous report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileDelta {
    pub added: Vec<PeerRecord>,
    pub updated: Vec<PeerRecord>,
    pub removed: Vec<PeerRecord>,
}

impl ReconcileDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Known peers keyed by identity. Exactly one record per identity.
#[derive(Debug, Default)]
pub struct PeerStore {
    peers: HashMap<PeerId, PeerRecord>,
}

impl PeerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one full, authoritative peer report. Computes the set difference
    /// against the current store and applies it atomically.
    ///
    /// Identity equality is by `PeerId` only; a `display_name` or `status`
    /// change counts as updated. Every peer present in the report has
    /// `last_seen` refreshed to `now`; a refresh alone is not an update, so
    /// applying the same report twice yields an empty delta the second time.
    /// An empty report clears the store (everything moves to `removed`).
    /// Duplicate identities within one report: last entry wins.
    pub fn reconcile(&mut self, reports: Vec<PeerInfo>, now: u64) -> ReconcileDelta {
        let mut incoming: HashMap<PeerId, PeerInfo> = HashMap::with_capacity(reports.len());
        for info in reports {
            incoming.insert(info.id.clone(), info);
        }

        let mut delta = ReconcileDelta::default();

        let gone: Vec<PeerId> = self
            .peers
            .keys()
            .filter(|id| !incoming.contains_key(*id))
            .cloned()
            .collect();
        for id in gone {
            if let Some(rec) = self.peers.remove(&id) {
                delta.removed.push(rec);
            }
        }

        for (id, info) in incoming {
            match self.peers.get_mut(&id) {
                Some(existing) => {
                    let changed =
                        existing.display_name != info.display_name || existing.status != info.status;
                    existing.display_name = info.display_name;
                    existing.status = info.status;
                    // last_seen never moves backwards, even with a stale clock.
                    existing.last_seen = existing.last_seen.max(now);
                    if changed {
                        delta.updated.push(existing.clone());
                    }
                }
                None => {
                    let rec = PeerRecord::from_info(info, now);
                    self.peers.insert(id, rec.clone());
                    delta.added.push(rec);
                }
            }
        }

        sort_records(&mut delta.added);
        sort_records(&mut delta.updated);
        sort_records(&mut delta.removed);
        delta
    }

    /// Point lookup by identity. No side effects.
    pub fn get(&self, id: &PeerId) -> Option<&PeerRecord> {
        self.peers.get(id)
    }

    /// All known peers, ordered by `last_seen` descending, ties broken by
    /// identity ascending. Deterministic for display and tests.
    pub fn all(&self) -> Vec<PeerRecord> {
        let mut out: Vec<PeerRecord> = self.peers.values().cloned().collect();
        sort_records(&mut out);
        out
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }
}

fn sort_records(records: &mut [PeerRecord]) {
    records.sort_by(|a, b| b.last_seen.cmp(&a.last_seen).then_with(|| a.id.cmp(&b.id)));
}
