//! # Load Diagnostics
//!
//! Integer-only occupancy and shape metrics for a store.

use crate::collection::Entry;
use crate::types::ExtDirection;
use serde::Serialize;
use std::fmt;

/// Snapshot of a store's occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LoadReport {
    /// Stored keys.
    pub entries: usize,
    /// Slots allocated by the map.
    pub capacity: usize,
    /// `entries / capacity`, scaled by 1000.
    pub load_per_thousand: u64,
    /// Keys with no edge in at least one direction.
    pub dead_ends: usize,
    /// Keys with more than one edge in at least one direction.
    pub ambiguous: usize,
    /// Keys carrying any mark flag.
    pub marked: usize,
    /// Keys flagged for deletion.
    pub deleted: usize,
    /// Sum of multiplicities.
    pub total_multiplicity: u64,
}

impl LoadReport {
    /// Compute a report over `entries` for a map with `capacity` slots.
    pub fn from_entries<'a>(entries: impl Iterator<Item = Entry<'a>>, capacity: usize) -> Self {
        let mut report = Self {
            capacity,
            ..Self::default()
        };

        for (_, data) in entries {
            report.entries = report.entries.saturating_add(1);
            report.total_multiplicity = report
                .total_multiplicity
                .saturating_add(data.multiplicity as u64);
            if data.ext.sense.is_empty() || data.ext.antisense.is_empty() {
                report.dead_ends += 1;
            }
            if data.ext.sense.is_ambiguous() || data.ext.antisense.is_ambiguous() {
                report.ambiguous += 1;
            }
            if ExtDirection::ALL.iter().any(|dir| data.is_marked(*dir)) {
                report.marked += 1;
            }
            if data.is_deleted() {
                report.deleted += 1;
            }
        }

        report.load_per_thousand = per_thousand(report.entries, report.capacity);
        report
    }

    /// Sum two reports, e.g. across ranks.
    #[must_use]
    pub fn combine(&self, other: &LoadReport) -> Self {
        let entries = self.entries.saturating_add(other.entries);
        let capacity = self.capacity.saturating_add(other.capacity);
        Self {
            entries,
            capacity,
            load_per_thousand: per_thousand(entries, capacity),
            dead_ends: self.dead_ends.saturating_add(other.dead_ends),
            ambiguous: self.ambiguous.saturating_add(other.ambiguous),
            marked: self.marked.saturating_add(other.marked),
            deleted: self.deleted.saturating_add(other.deleted),
            total_multiplicity: self
                .total_multiplicity
                .saturating_add(other.total_multiplicity),
        }
    }
}

fn per_thousand(part: usize, whole: usize) -> u64 {
    if whole == 0 {
        return 0;
    }
    (part as u64).saturating_mul(1000) / whole as u64
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} k-mers in {} slots ({}\u{2030}), {} dead ends, {} ambiguous, {} marked, {} deleted, multiplicity {}",
            self.entries,
            self.capacity,
            self.load_per_thousand,
            self.dead_ends,
            self.ambiguous,
            self.marked,
            self.deleted,
            self.total_multiplicity
        )
    }
}
