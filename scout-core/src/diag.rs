//! Diagnostics sink: bounded FIFO ring buffer for structured log records.
//! Fire-and-forget; recording never fails the caller.

use std::collections::VecDeque;

/// Default capacity when none is configured.
pub const DEFAULT_DIAG_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for DiagLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DiagLevel::Debug => "debug",
            DiagLevel::Info => "info",
            DiagLevel::Warn => "warn",
            DiagLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// One recorded diagnostics entry. `seq` increases monotonically for the
/// lifetime of the sink, including across evictions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagRecord {
    pub seq: u64,
    pub level: DiagLevel,
    pub message: String,
    pub context: Vec<(String, String)>,
}

/// Bounded in-memory sink. Oldest entries are evicted past capacity; FIFO
/// order is preserved for replay and display.
#[derive(Debug)]
pub struct DiagSink {
    entries: VecDeque<DiagRecord>,
    capacity: usize,
    next_seq: u64,
}

impl DiagSink {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_DIAG_CAPACITY)
    }

    /// A zero capacity is bumped to 1 so `record` stays infallible.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            next_seq: 0,
        }
    }

    /// Append a record, evicting the oldest entry if the buffer is full.
    pub fn record(
        &mut self,
        level: DiagLevel,
        message: impl Into<String>,
        context: &[(&str, &str)],
    ) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(DiagRecord {
            seq: self.next_seq,
            level,
            message: message.into(),
            context: context
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        self.next_seq += 1;
    }

    /// Oldest-first view of the retained records.
    pub fn entries(&self) -> impl Iterator<Item = &DiagRecord> {
        self.entries.iter()
    }

    /// Move all retained records out, oldest first.
    pub fn drain(&mut self) -> Vec<DiagRecord> {
        self.entries.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for DiagSink {
    fn default() -> Self {
        Self::new()
    }
}
