use anyhow::Result;
use async_trait::async_trait;

use crate::db::Database;
use crate::session::{ProgressDelta, SessionReport};

/// Where finalized reports and progress counters go. Callers treat every
/// failure as non-fatal.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn save_report(&self, report: &SessionReport) -> Result<()>;

    async fn update_progress(&self, child_id: &str, delta: &ProgressDelta) -> Result<()>;
}

#[async_trait]
impl ReportStore for Database {
    async fn save_report(&self, report: &SessionReport) -> Result<()> {
        self.insert_report(report).await
    }

    async fn update_progress(&self, child_id: &str, delta: &ProgressDelta) -> Result<()> {
        self.apply_progress(child_id, delta).await
    }
}
