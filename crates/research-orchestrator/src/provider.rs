use async_trait::async_trait;
use std::path::{Path, PathBuf};
use valuation_core::{FinancialSnapshot, ReportType, SnapshotProvider, ValuationError};

use crate::error::{ProviderError, ProviderResult};

/// Where a `JsonFileProvider` looks for snapshot documents
#[derive(Debug, Clone)]
enum Source {
    /// `<dir>/<SYMBOL>.<report>.json`, falling back to `<dir>/<SYMBOL>.json`
    Directory(PathBuf),
    /// One fixed document regardless of query
    File(PathBuf),
}

/// Serves previously saved provider responses from disk.
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    source: Source,
}

impl JsonFileProvider {
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::Directory(dir.into()),
        }
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::File(path.into()),
        }
    }

    /// Candidate paths for a query, most specific first. A query with no
    /// usable symbol characters has no candidates in a directory.
    fn candidates(&self, query: &str, report_type: ReportType) -> ProviderResult<Vec<PathBuf>> {
        match &self.source {
            Source::File(path) => Ok(vec![path.clone()]),
            Source::Directory(dir) => {
                let symbol = sanitize_symbol(query);
                if symbol.is_empty() {
                    return Err(ProviderError::NotFound(query.to_string()));
                }
                Ok(vec![
                    dir.join(format!("{}.{}.json", symbol, report_type)),
                    dir.join(format!("{}.json", symbol)),
                ])
            }
        }
    }

    async fn load(&self, query: &str, report_type: ReportType) -> ProviderResult<FinancialSnapshot> {
        for path in self.candidates(query, report_type)? {
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                continue;
            }
            tracing::debug!("Loading snapshot from {}", path.display());
            return read_snapshot(&path).await;
        }
        Err(ProviderError::NotFound(query.to_string()))
    }
}

async fn read_snapshot(path: &Path) -> ProviderResult<FinancialSnapshot> {
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(FinancialSnapshot::from_json(&raw)?)
}

/// Uppercased ticker with anything outside `[A-Z0-9._-]` dropped, so a query
/// can never escape the snapshot directory.
fn sanitize_symbol(query: &str) -> String {
    query
        .trim()
        .to_ascii_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

#[async_trait]
impl SnapshotProvider for JsonFileProvider {
    async fn fetch(
        &self,
        query: &str,
        report_type: ReportType,
    ) -> Result<FinancialSnapshot, ValuationError> {
        Ok(self.load(query, report_type).await?)
    }

    fn name(&self) -> &'static str {
        "json-file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("research-orchestrator-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_sanitize_symbol() {
        assert_eq!(sanitize_symbol(" reliance.ns "), "RELIANCE.NS");
        assert_eq!(sanitize_symbol("../../etc/passwd"), "ETCPASSWD");
        assert_eq!(sanitize_symbol("brk-b"), "BRK-B");
        assert_eq!(sanitize_symbol("../"), "");
    }

    #[tokio::test]
    async fn test_query_without_symbol_characters_is_not_found() {
        let dir = temp_dir("empty-symbol");
        std::fs::write(dir.join(".json"), r#"{ "symbol": "HIDDEN", "price": 1 }"#).unwrap();
        std::fs::write(dir.join(".consolidated.json"), r#"{ "symbol": "HIDDEN", "price": 1 }"#).unwrap();

        let provider = JsonFileProvider::from_dir(&dir);
        for query in ["../", "  ", "/"] {
            let err = provider.fetch(query, ReportType::Consolidated).await.unwrap_err();
            assert!(err.to_string().contains("Snapshot not found"), "{}", err);
        }
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_prefers_report_specific_document() {
        let dir = temp_dir("report");
        std::fs::write(dir.join("ACME.json"), r#"{ "symbol": "ACME", "price": 10 }"#).unwrap();
        std::fs::write(dir.join("ACME.standalone.json"), r#"{ "symbol": "ACME", "price": 12 }"#).unwrap();

        let provider = JsonFileProvider::from_dir(&dir);
        let consolidated = provider.fetch("acme", ReportType::Consolidated).await.unwrap();
        let standalone = provider.fetch("acme", ReportType::Standalone).await.unwrap();

        assert_eq!(consolidated.price, 10.0);
        assert_eq!(standalone.price, 12.0);
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_missing_and_malformed_documents() {
        let dir = temp_dir("errors");
        std::fs::write(dir.join("BAD.json"), "{ not json").unwrap();

        let provider = JsonFileProvider::from_dir(&dir);
        let missing = provider.fetch("NOPE", ReportType::Consolidated).await.unwrap_err();
        assert!(missing.to_string().contains("NOPE"));

        let malformed = provider.fetch("BAD", ReportType::Consolidated).await.unwrap_err();
        assert!(matches!(malformed, ValuationError::Serialization(_)));
        std::fs::remove_dir_all(dir).ok();
    }
}
