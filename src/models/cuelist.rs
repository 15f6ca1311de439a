//! Active cue list snapshot.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Numeric cue list identifier as reported by the console.
pub type CuelistId = u32;

/// The complete result of one poll response.
///
/// A snapshot is only ever built whole and then swapped in, so a reader
/// holding one never sees a mix of two responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActiveCuelistSet {
    ids: BTreeSet<CuelistId>,
    /// When the terminator line completing this snapshot was parsed.
    captured_at: Option<DateTime<Utc>>,
}

impl ActiveCuelistSet {
    /// Build a snapshot from parsed identifiers.
    #[must_use]
    pub fn new(ids: BTreeSet<CuelistId>, captured_at: DateTime<Utc>) -> Self {
        Self {
            ids,
            captured_at: Some(captured_at),
        }
    }

    /// Whether cue list `id` was active in this snapshot.
    #[must_use]
    pub fn contains(&self, id: CuelistId) -> bool {
        self.ids.contains(&id)
    }

    /// Identifiers in ascending order, collected.
    #[must_use]
    pub fn to_vec(&self) -> Vec<CuelistId> {
        self.ids.iter().copied().collect()
    }

    /// Number of active cue lists.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no cue list is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Completion time, `None` for the initial placeholder before any poll.
    #[must_use]
    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        self.captured_at
    }

    /// Whether two snapshots name the same cue lists, ignoring timestamps.
    #[must_use]
    pub fn same_ids(&self, other: &Self) -> bool {
        self.ids == other.ids
    }
}
