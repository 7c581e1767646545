//! Aggregation audit log for post-hoc analysis.
//!
//! Records metadata about each completed federated round so operators can
//! see who contributed to which model version without retaining the updates.

use serde::{Deserialize, Serialize};

/// Metadata for a single aggregation round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregationAuditEntry {
    /// Round number (0-indexed).
    pub round: u64,
    /// Number of distinct clients that contributed.
    pub n_clients: usize,
    /// Number of buffered updates folded into the round.
    pub n_updates: usize,
    /// Global model version produced by the round.
    pub version: u64,
}

/// Append-only audit log of aggregation rounds.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuditLog {
    entries: Vec<AggregationAuditEntry>,
}

impl AuditLog {
    /// Create a new, empty audit log.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry to the log.
    pub fn push(&mut self, entry: AggregationAuditEntry) {
        self.entries.push(entry);
    }

    /// Get all entries.
    pub fn entries(&self) -> &[AggregationAuditEntry] {
        &self.entries
    }

    /// Most recent entry, if any.
    pub fn last(&self) -> Option<&AggregationAuditEntry> {
        self.entries.last()
    }

    /// Number of recorded rounds.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_log_push_and_len() {
        let mut log = AuditLog::new();
        assert!(log.is_empty());

        log.push(AggregationAuditEntry {
            round: 0,
            n_clients: 2,
            n_updates: 3,
            version: 1,
        });

        assert_eq!(log.len(), 1);
        assert_eq!(log.last().unwrap().n_updates, 3);
    }

    #[test]
    fn test_audit_entry_serde() {
        let entry = AggregationAuditEntry {
            round: 3,
            n_clients: 20,
            n_updates: 25,
            version: 4,
        };
        let json = serde_json::to_string(&entry).unwrap();
        let restored: AggregationAuditEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, entry);
    }
}
