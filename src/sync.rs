use tracing::{debug, info};

use crate::db::{ContestResultRow, ResultStore};
use crate::error::Result;
use crate::types::DerivedRecord;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl SyncStats {
    pub fn writes(&self) -> usize {
        self.inserted + self.updated
    }

    pub fn absorb(&mut self, other: SyncStats) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// Reconciles derived records against the remote table, one record at a time.
pub struct Synchronizer<'a, S> {
    store: &'a S,
}

impl<'a, S: ResultStore> Synchronizer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn sync_user(&self, user: &str, records: &[DerivedRecord]) -> Result<SyncStats> {
        let mut stats = SyncStats::default();
        for record in records {
            match self.sync_record(user, record).await? {
                SyncOutcome::Inserted => stats.inserted += 1,
                SyncOutcome::Updated => stats.updated += 1,
                SyncOutcome::Unchanged => stats.unchanged += 1,
            }
        }
        Ok(stats)
    }

    /// Only a changed `general_place` triggers a write; the write replaces the whole row.
    pub async fn sync_record(&self, user: &str, record: &DerivedRecord) -> Result<SyncOutcome> {
        let row = ContestResultRow::from_derived(user, record);

        match self.store.find(user, record.abc).await? {
            None => {
                self.store.insert(&row).await?;
                info!(
                    event = "insert",
                    user = %user,
                    abc = record.abc,
                    "Inserted data for user={user}, abc={}",
                    record.abc
                );
                Ok(SyncOutcome::Inserted)
            }
            Some(existing) if existing.general_place != row.general_place => {
                self.store.update(&row).await?;
                info!(
                    event = "update",
                    user = %user,
                    abc = record.abc,
                    old_place = existing.general_place,
                    new_place = row.general_place,
                    "Updated data for user={user}, abc={}: place {} -> {}",
                    record.abc,
                    existing.general_place,
                    row.general_place
                );
                Ok(SyncOutcome::Updated)
            }
            Some(_) => {
                debug!(user = %user, abc = record.abc, "Already in sync");
                Ok(SyncOutcome::Unchanged)
            }
        }
    }
}
