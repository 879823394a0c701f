use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use valuation_core::{
    FinancialSnapshot, ReportType, ScenarioKind, SnapshotProvider, TerminalMethod, ValuationError,
};
use valuation_engine::{DcfCalculator, DcfValuation, InsightReport, SotpCalculator, SotpOutcome};

pub mod error;
pub mod gemini;
pub mod provider;

pub use error::{ProviderError, ProviderResult};
pub use gemini::{GeminiConfig, GeminiProvider};
pub use provider::JsonFileProvider;

const FALLBACK_ERROR: &str = "Failed to analyze stock. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadingState {
    Idle,
    Loading,
    Success,
    Error,
}

/// A settled analysis: the snapshot plus both calculators built from it
#[derive(Debug, Clone)]
pub struct Analysis {
    pub snapshot: Arc<FinancialSnapshot>,
    pub report_type: ReportType,
    pub fetched_at: DateTime<Utc>,
    pub dcf: DcfCalculator,
    pub sotp: SotpCalculator,
    pub insights: InsightReport,
}

impl Analysis {
    pub fn new(snapshot: FinancialSnapshot, report_type: ReportType) -> Self {
        let snapshot = Arc::new(snapshot);
        Self {
            dcf: DcfCalculator::new(Arc::clone(&snapshot)),
            sotp: SotpCalculator::new(Arc::clone(&snapshot)),
            insights: InsightReport::from_snapshot(&snapshot),
            snapshot,
            report_type,
            fetched_at: Utc::now(),
        }
    }

    /// Serializable view of the current calculator outputs
    pub fn report(&self) -> AnalysisReport {
        AnalysisReport {
            symbol: self.snapshot.symbol.clone(),
            name: self.snapshot.name.clone(),
            currency: self.snapshot.currency.clone(),
            price: self.snapshot.price,
            report_type: self.report_type,
            fetched_at: self.fetched_at,
            scenario: self.dcf.active_scenario(),
            terminal_method: self.dcf.terminal_method(),
            use_decay: self.dcf.use_decay(),
            dcf: self.dcf.result().clone(),
            implied_growth_rate: self.dcf.implied_growth_rate(),
            latest_free_cash_flow: self.snapshot.financials.latest_free_cash_flow(),
            sotp: self.sotp.result().clone(),
            insights: self.insights.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub symbol: String,
    pub name: String,
    pub currency: String,
    pub price: f64,
    pub report_type: ReportType,
    pub fetched_at: DateTime<Utc>,
    pub scenario: ScenarioKind,
    pub terminal_method: TerminalMethod,
    pub use_decay: bool,
    pub dcf: DcfValuation,
    pub implied_growth_rate: Option<f64>,
    /// Operating plus investing cash flow from the latest statement period
    pub latest_free_cash_flow: Option<f64>,
    pub sotp: SotpOutcome,
    pub insights: InsightReport,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub loading: LoadingState,
    pub query: Option<String>,
    pub report_type: ReportType,
    pub analysis: Option<Analysis>,
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            loading: LoadingState::Idle,
            query: None,
            report_type: ReportType::default(),
            analysis: None,
            error: None,
        }
    }
}

/// Handle for one in-flight search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    generation: u64,
    pub query: String,
    pub report_type: ReportType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Applied(LoadingState),
    /// A newer search started before this one settled; its result was dropped
    Superseded,
}

/// One user's research session. Only the most recently started search may
/// write its result; older responses are discarded when they arrive.
pub struct ResearchSession<P: SnapshotProvider> {
    provider: P,
    generation: AtomicU64,
    state: Mutex<SessionState>,
}

impl<P: SnapshotProvider> ResearchSession<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            generation: AtomicU64::new(0),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Fetch and analyze `query`, superseding any search still in flight.
    pub async fn search(&self, query: &str, report_type: ReportType) -> SearchOutcome {
        let ticket = self.begin_search(query, report_type).await;
        let result = self.provider.fetch(&ticket.query, report_type).await;
        self.complete_search(ticket, result).await
    }

    /// Start a search: clears the previous analysis and error, marks the
    /// session as loading, and returns the ticket that may settle it.
    pub async fn begin_search(&self, query: &str, report_type: ReportType) -> SearchTicket {
        let mut state = self.state.lock().await;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        *state = SessionState {
            loading: LoadingState::Loading,
            query: Some(query.trim().to_string()),
            report_type,
            analysis: None,
            error: None,
        };

        tracing::info!(
            "Analyzing {} ({}) via {} [search #{}]",
            query.trim(),
            report_type,
            self.provider.name(),
            generation
        );

        SearchTicket {
            generation,
            query: query.trim().to_string(),
            report_type,
        }
    }

    /// Settle a search. Ignored unless `ticket` belongs to the latest search.
    pub async fn complete_search(
        &self,
        ticket: SearchTicket,
        result: Result<FinancialSnapshot, ValuationError>,
    ) -> SearchOutcome {
        let mut state = self.state.lock().await;
        if ticket.generation != self.generation.load(Ordering::SeqCst) {
            tracing::debug!(
                "Dropping stale result for {} [search #{}]",
                ticket.query,
                ticket.generation
            );
            return SearchOutcome::Superseded;
        }

        match result {
            Ok(snapshot) => {
                tracing::info!(
                    "Analysis ready for {} at {} {}",
                    snapshot.symbol,
                    snapshot.price,
                    snapshot.currency
                );
                state.analysis = Some(Analysis::new(snapshot, ticket.report_type));
                state.error = None;
                state.loading = LoadingState::Success;
            }
            Err(err) => {
                tracing::warn!("Analysis failed for {}: {}", ticket.query, err);
                let message = err.to_string();
                state.analysis = None;
                state.error = Some(if message.trim().is_empty() {
                    FALLBACK_ERROR.to_string()
                } else {
                    message
                });
                state.loading = LoadingState::Error;
            }
        }

        SearchOutcome::Applied(state.loading)
    }

    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub async fn loading_state(&self) -> LoadingState {
        self.state.lock().await.loading
    }

    /// Run `f` against the settled analysis, if there is one. Calculator
    /// setters recompute inside the closure.
    pub async fn with_analysis<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut Analysis) -> R,
    {
        let mut state = self.state.lock().await;
        state.analysis.as_mut().map(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Serves canned snapshots with a per-symbol delay
    struct MockProvider {
        delays: HashMap<&'static str, u64>,
    }

    impl MockProvider {
        fn new(delays: &[(&'static str, u64)]) -> Self {
            Self {
                delays: delays.iter().copied().collect(),
            }
        }
    }

    #[async_trait]
    impl SnapshotProvider for MockProvider {
        async fn fetch(
            &self,
            query: &str,
            _report_type: ReportType,
        ) -> Result<FinancialSnapshot, ValuationError> {
            let delay = self.delays.get(query).copied().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            if query == "FAIL" {
                return Err(ValuationError::Provider("quota exhausted".to_string()));
            }
            Ok(snapshot(query))
        }

        fn name(&self) -> &'static str {
            "mock"
        }
    }

    fn snapshot(symbol: &str) -> FinancialSnapshot {
        FinancialSnapshot {
            symbol: symbol.to_string(),
            price: 100.0,
            fcf_per_share: 5.0,
            growth_rate: 10.0,
            discount_rate: 10.0,
            terminal_rate: 3.0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_successful_search() {
        let session = ResearchSession::new(MockProvider::new(&[]));
        assert_eq!(session.loading_state().await, LoadingState::Idle);

        let outcome = session.search(" ACME ", ReportType::Consolidated).await;
        assert_eq!(outcome, SearchOutcome::Applied(LoadingState::Success));

        let state = session.state().await;
        assert_eq!(state.query.as_deref(), Some("ACME"));
        let analysis = state.analysis.unwrap();
        assert_eq!(analysis.snapshot.symbol, "ACME");
        assert!(analysis.dcf.result().intrinsic_value_per_share > 0.0);
        assert!(!analysis.sotp.result().is_applicable());
    }

    #[tokio::test]
    async fn test_failure_clears_previous_results() {
        let session = ResearchSession::new(MockProvider::new(&[]));
        session.search("ACME", ReportType::Consolidated).await;

        let outcome = session.search("FAIL", ReportType::Consolidated).await;
        assert_eq!(outcome, SearchOutcome::Applied(LoadingState::Error));

        let state = session.state().await;
        assert!(state.analysis.is_none());
        assert!(state.error.unwrap().contains("quota exhausted"));
    }

    #[tokio::test]
    async fn test_begin_search_shows_loading_and_clears_state() {
        let session = ResearchSession::new(MockProvider::new(&[]));
        session.search("ACME", ReportType::Consolidated).await;

        let _ticket = session.begin_search("NEXT", ReportType::Standalone).await;
        let state = session.state().await;
        assert_eq!(state.loading, LoadingState::Loading);
        assert_eq!(state.report_type, ReportType::Standalone);
        assert!(state.analysis.is_none());
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_stale_ticket_is_ignored() {
        let session = ResearchSession::new(MockProvider::new(&[]));
        let first = session.begin_search("OLD", ReportType::Consolidated).await;
        let second = session.begin_search("NEW", ReportType::Consolidated).await;

        let applied = session.complete_search(second, Ok(snapshot("NEW"))).await;
        let stale = session.complete_search(first, Ok(snapshot("OLD"))).await;

        assert_eq!(applied, SearchOutcome::Applied(LoadingState::Success));
        assert_eq!(stale, SearchOutcome::Superseded);
        assert_eq!(session.state().await.analysis.unwrap().snapshot.symbol, "NEW");
    }

    #[tokio::test]
    async fn test_stale_failure_does_not_clobber_newer_search() {
        let session = ResearchSession::new(MockProvider::new(&[]));
        let first = session.begin_search("OLD", ReportType::Consolidated).await;
        let _second = session.begin_search("NEW", ReportType::Consolidated).await;

        let stale = session
            .complete_search(first, Err(ValuationError::Provider("timeout".to_string())))
            .await;
        assert_eq!(stale, SearchOutcome::Superseded);

        let state = session.state().await;
        assert_eq!(state.loading, LoadingState::Loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_last_request_wins_with_concurrent_searches() {
        let session = ResearchSession::new(MockProvider::new(&[("SLOW", 80), ("FAST", 5)]));

        let (slow, fast) = tokio::join!(
            session.search("SLOW", ReportType::Consolidated),
            session.search("FAST", ReportType::Consolidated),
        );

        assert_eq!(slow, SearchOutcome::Superseded);
        assert_eq!(fast, SearchOutcome::Applied(LoadingState::Success));

        let state = session.state().await;
        assert_eq!(state.query.as_deref(), Some("FAST"));
        assert_eq!(state.analysis.unwrap().snapshot.symbol, "FAST");
    }

    #[tokio::test]
    async fn test_with_analysis_drives_calculators() {
        let session = ResearchSession::new(MockProvider::new(&[]));
        assert!(session.with_analysis(|_| ()).await.is_none());

        session.search("ACME", ReportType::Consolidated).await;
        let (before, after) = session
            .with_analysis(|analysis| {
                let before = analysis.dcf.result().intrinsic_value_per_share;
                analysis.dcf.set_growth_rate(25.0);
                (before, analysis.dcf.result().intrinsic_value_per_share)
            })
            .await
            .unwrap();
        assert!(after > before);

        let report = session.state().await.analysis.unwrap().report();
        assert_relative_eq!(report.dcf.intrinsic_value_per_share, after);
        assert_eq!(report.scenario, ScenarioKind::Base);
    }
}
