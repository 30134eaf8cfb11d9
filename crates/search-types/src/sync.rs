use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Per-source-collection checkpoint (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionSyncState {
    pub collection_key: String,
    pub index_name: String,
    pub timestamp_field: String,
    pub id_field: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_poll_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub last_sync_time: Option<OffsetDateTime>,
    #[serde(default)]
    pub documents_indexed: u64,
    pub total_documents: Option<u64>,
    #[serde(default)]
    pub sync_status: SyncStatus,
    #[serde(default = "default_progress")]
    pub progress: String,
}

fn default_progress() -> String {
    "not_available".to_string()
}

impl CollectionSyncState {
    pub fn new(collection_key: impl Into<String>, index_name: impl Into<String>,
        timestamp_field: impl Into<String>, id_field: impl Into<String>) -> Self {
        CollectionSyncState {
            collection_key: collection_key.into(),
            index_name: index_name.into(),
            timestamp_field: timestamp_field.into(),
            id_field: id_field.into(),
            last_poll_time: OffsetDateTime::UNIX_EPOCH,
            last_sync_time: None,
            documents_indexed: 0,
            total_documents: None,
            sync_status: SyncStatus::Idle,
            progress: default_progress(),
        }
    }

    /// Recomputes `progress` from `documents_indexed`/`total_documents`,
    /// per §4.1's persistence contract.
    pub fn recompute_progress(&mut self) {
        self.progress = match self.total_documents {
            None => "not_available".to_string(),
            Some(0) => "100%".to_string(),
            Some(total) => {
                let pct = (100 * self.documents_indexed / total).min(100);
                format!("{pct}%")
            }
        };
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Idle,
    InProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_clamped_to_100() {
        let mut s = CollectionSyncState::new("db.c", "idx", "_id", "_id");
        s.total_documents = Some(10);
        s.documents_indexed = 20;
        s.recompute_progress();
        assert_eq!(s.progress, "100%");
    }

    #[test]
    fn progress_not_available_without_total() {
        let mut s = CollectionSyncState::new("db.c", "idx", "_id", "_id");
        s.documents_indexed = 5;
        s.recompute_progress();
        assert_eq!(s.progress, "not_available");
    }

    #[test]
    fn progress_floors_the_percentage() {
        let mut s = CollectionSyncState::new("db.c", "idx", "_id", "_id");
        s.total_documents = Some(3);
        s.documents_indexed = 1;
        s.recompute_progress();
        assert_eq!(s.progress, "33%");
    }
}
