// crates/sync-engine/src/types.rs
//! Results reported by a sync pass

use semnet_core::ResourceRef;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// What a sync pass did for one document resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    /// A live resource was created (or contributed) for the document
    Create,
    /// An existing live resource was matched, and edited if needed
    Update,
}

/// A document resource paired with the live resource it synced onto
#[derive(Debug, Clone)]
pub struct SyncInfo {
    pub resource: ResourceRef,
    pub document: ResourceRef,
    pub action: SyncAction,
}

/// Counters for one sync pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Matched resources that needed no write
    pub unchanged: usize,
    /// Changes that were wanted but could not be made
    pub skipped: usize,
    /// Strategy tasks executed
    pub tasks: usize,
}

impl SyncStats {
    /// Adds another set of counters to these
    pub fn absorb(&mut self, other: &SyncStats) {
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
        self.tasks += other.tasks;
    }

    /// Number of writes that reached the server
    pub fn changes(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

impl AddAssign for SyncStats {
    fn add_assign(&mut self, other: Self) {
        self.absorb(&other);
    }
}

/// Outcome of a sync pass
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Infos produced by the root strategy
    pub infos: Vec<SyncInfo>,
    pub stats: SyncStats,
}

impl SyncReport {
    /// The live resource the root document synced onto
    pub fn resource(&self) -> Option<&ResourceRef> {
        self.infos.first().map(|info| &info.resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_absorb() {
        let mut total = SyncStats {
            created: 1,
            tasks: 1,
            ..SyncStats::default()
        };
        total += SyncStats {
            updated: 2,
            deleted: 1,
            skipped: 1,
            tasks: 2,
            ..SyncStats::default()
        };

        assert_eq!(total.changes(), 4);
        assert_eq!(total.skipped, 1);
        assert_eq!(total.tasks, 3);
    }

    #[test]
    fn test_stats_serialization() {
        let stats = SyncStats {
            created: 3,
            ..SyncStats::default()
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["created"], 3);
        assert_eq!(
            serde_json::to_value(SyncAction::Create).unwrap(),
            serde_json::json!("create")
        );
    }
}
