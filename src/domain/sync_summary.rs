use std::fmt;

use crate::domain::product::StoreAction;

/// Counters collected over one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub pages_fetched: u32,
    pub fragments_seen: usize,
    pub records_extracted: usize,
    pub parse_failures: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub store_failures: usize,
    pub derivatives_written: usize,
    pub image_failures: usize,
}

impl SyncSummary {
    pub fn record_action(&mut self, action: StoreAction) {
        match action {
            StoreAction::Inserted => self.inserted += 1,
            StoreAction::Updated { .. } => self.updated += 1,
            StoreAction::Skipped => self.skipped += 1,
            StoreAction::Failed => self.store_failures += 1,
        }
    }

    pub const fn writes(&self) -> usize {
        self.inserted + self.updated
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pages={} fragments={} extracted={} parse_failures={} inserted={} updated={} skipped={} store_failures={} derivatives={} image_failures={}",
            self.pages_fetched,
            self.fragments_seen,
            self.records_extracted,
            self.parse_failures,
            self.inserted,
            self.updated,
            self.skipped,
            self.store_failures,
            self.derivatives_written,
            self.image_failures,
        )
    }
}
