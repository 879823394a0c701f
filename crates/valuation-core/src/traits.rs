use async_trait::async_trait;
use crate::{FinancialSnapshot, ReportType, ValuationError};

/// Source of financial snapshots (the external data/AI provider).
///
/// The engines never call this; only the research session does, once per search.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn fetch(
        &self,
        query: &str,
        report_type: ReportType,
    ) -> Result<FinancialSnapshot, ValuationError>;

    fn name(&self) -> &'static str;
}
