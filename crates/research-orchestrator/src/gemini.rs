use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use valuation_core::{FinancialSnapshot, ReportType, SnapshotProvider, ValuationError};

use crate::error::{ProviderError, ProviderResult};

/// Configuration for the Gemini snapshot provider
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
            timeout: Duration::from_secs(
                std::env::var("GEMINI_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(90),
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Asks a Gemini model for the full analysis document of one ticker.
#[derive(Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, config }
    }

    pub fn with_defaults() -> Self {
        Self::new(GeminiConfig::default())
    }

    async fn generate(&self, query: &str, report_type: ReportType) -> ProviderResult<FinancialSnapshot> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::ServiceUnavailable("GEMINI_API_KEY is not set".to_string()))?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": build_prompt(query, report_type) }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0
            }
        });

        tracing::debug!("Requesting {} analysis for {} from {}", report_type, query, self.config.model);
        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::ServiceUnavailable(format!(
                "Status: {}",
                response.status()
            )));
        }

        let payload = response.json::<GenerateContentResponse>().await?;
        let text = response_text(&payload).ok_or(ProviderError::EmptyResponse)?;

        let mut snapshot = FinancialSnapshot::from_json(strip_code_fence(&text))
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        if snapshot.last_updated.is_empty() {
            snapshot.last_updated = chrono::Utc::now().date_naive().to_string();
        }
        Ok(snapshot)
    }
}

fn build_prompt(query: &str, report_type: ReportType) -> String {
    format!(
        "Perform a comprehensive value investing analysis for the stock: \"{query}\".\n\
         Use the live market price in the exchange's own currency.\n\
         Use {report} financial statements.\n\
         Return one JSON object with camelCase keys including: symbol, name, price, currency, \
         fcfPerShare, growthRate, discountRate, terminalRate, intrinsicValue, reverseDcfRate, \
         scenarios (bull/base/bear with price, narrative, growthRate), segments (name, revenue, \
         ebitda, valuationMultiple, growthRate, narrative), netDebt, totalShares, pe, pb, eps, \
         revenueGrowth, sectorPe, industryPe, pegRatio, earningsYield, debtToEquity, \
         interestCoverage, roic, wacc, grahamNumber, grahamGrowthValue, piotroskiFScore, \
         evToEbitda, ownerEarningsPerShare, buffettTenCapPrice, and financials (profitLoss, \
         balanceSheet, cashFlow rows keyed by year).\n\
         All numerical values must be numbers. Percentages are whole numbers or one decimal.",
        query = query.trim(),
        report = report_type,
    )
}

fn response_text(payload: &GenerateContentResponse) -> Option<String> {
    let text: String = payload
        .candidates
        .first()?
        .content
        .as_ref()?
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Models sometimes wrap JSON in a markdown fence even when asked not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[async_trait]
impl SnapshotProvider for GeminiProvider {
    async fn fetch(
        &self,
        query: &str,
        report_type: ReportType,
    ) -> Result<FinancialSnapshot, ValuationError> {
        self.generate(query, report_type).await.map_err(|e| {
            tracing::warn!("Gemini analysis failed for {}: {}", query, e);
            e.into()
        })
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"price\": 1}\n```"), "{\"price\": 1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {\"a\": 2} "), "{\"a\": 2}");
    }

    #[test]
    fn test_response_text_joins_parts() {
        let payload: GenerateContentResponse = serde_json::from_str(
            r#"{ "candidates": [ { "content": { "parts": [ { "text": "{\"price\":" }, { "text": " 42}" } ] } } ] }"#,
        )
        .unwrap();
        let text = response_text(&payload).unwrap();
        let snapshot = FinancialSnapshot::from_json(strip_code_fence(&text)).unwrap();
        assert_eq!(snapshot.price, 42.0);
    }

    #[test]
    fn test_empty_response() {
        let payload: GenerateContentResponse = serde_json::from_str(r#"{ "candidates": [] }"#).unwrap();
        assert!(response_text(&payload).is_none());
    }

    #[test]
    fn test_prompt_mentions_report_type() {
        let prompt = build_prompt(" TCS ", ReportType::Standalone);
        assert!(prompt.contains("\"TCS\""));
        assert!(prompt.contains("standalone financial statements"));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_reported() {
        let provider = GeminiProvider::new(GeminiConfig {
            api_key: None,
            model: "test".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(1),
        });
        let err = provider.fetch("ACME", ReportType::Consolidated).await.unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }
}
