use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{FinancialStatements, ValuationError, ValuationResult};

/// Narrative scenario supplied by the provider (bear/base/bull)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Scenario {
    pub price: f64,
    pub narrative: String,
    pub growth_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenarios {
    pub bear: Scenario,
    pub base: Scenario,
    pub bull: Scenario,
}

impl Scenarios {
    pub fn get(&self, kind: ScenarioKind) -> &Scenario {
        match kind {
            ScenarioKind::Bear => &self.bear,
            ScenarioKind::Base => &self.base,
            ScenarioKind::Bull => &self.bull,
        }
    }
}

/// One business unit row used by the sum-of-the-parts valuation.
/// Only `ebitda` and `valuation_multiple` take part in the arithmetic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusinessSegment {
    pub name: String,
    pub revenue: f64,
    pub ebitda: f64,
    /// EV/EBITDA multiple
    pub valuation_multiple: f64,
    pub growth_rate: f64,
    pub narrative: String,
}

/// Financial snapshot returned by the provider for one search.
///
/// Read-only for the lifetime of an analysis. Rates are percentages
/// (`10.0` means 10%), money fields are in `currency` units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FinancialSnapshot {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub currency: String,

    // DCF assumptions (base case)
    pub fcf_per_share: f64,
    pub growth_rate: f64,
    pub discount_rate: f64,
    pub terminal_rate: f64,
    pub intrinsic_value: f64,
    pub reverse_dcf_rate: f64,
    pub scenarios: Scenarios,

    // SOTP inputs
    pub segments: Vec<BusinessSegment>,
    pub net_debt: Option<f64>,
    pub total_shares: Option<f64>,

    // Ratios consumed by the insight bands
    pub pe: f64,
    pub pb: f64,
    pub eps: f64,
    pub revenue_growth: f64,
    pub sector_pe: f64,
    pub industry_pe: f64,
    pub peg_ratio: f64,
    pub earnings_yield: f64,
    pub debt_to_equity: f64,
    pub interest_coverage: f64,
    pub roic: f64,
    pub wacc: f64,

    // Classic fair value models
    pub graham_number: f64,
    pub graham_growth_value: f64,
    #[serde(rename = "piotroskiFScore")]
    pub piotroski_f_score: f64,
    pub ev_to_ebitda: f64,
    pub owner_earnings_per_share: f64,
    pub buffett_ten_cap_price: f64,

    pub financials: FinancialStatements,
    pub last_updated: String,
}

impl FinancialSnapshot {
    /// Parse a provider document. The top level must be a JSON object;
    /// missing fields fall back to defaults.
    pub fn from_json(raw: &str) -> ValuationResult<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(ValuationError::InvalidSnapshot(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Net debt in absolute currency; missing means zero.
    pub fn net_debt(&self) -> f64 {
        self.net_debt.filter(|d| d.is_finite()).unwrap_or(0.0)
    }

    /// Share count for per-share conversion. Missing or non-positive counts
    /// fall back to 1 so the division stays defined (display fallback only).
    pub fn share_count(&self) -> f64 {
        match self.total_shares {
            Some(shares) if shares.is_finite() && shares > 0.0 => shares,
            _ => 1.0,
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValuationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ValuationError::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

/// Scenario tag selecting one independent set of DCF parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    Bear,
    Base,
    Bull,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 3] = [ScenarioKind::Bear, ScenarioKind::Base, ScenarioKind::Bull];
}

string_enum!(ScenarioKind, "scenario", {
    Bear => "bear",
    Base => "base",
    Bull => "bull",
});

/// How the DCF terminal value is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalMethod {
    /// Gordon Growth perpetuity; `terminal_val` is a growth percentage
    Growth,
    /// Exit EV/FCF multiple; `terminal_val` is the multiple
    Multiple,
}

string_enum!(TerminalMethod, "terminal method", {
    Growth => "growth",
    Multiple => "multiple",
});

/// Which set of financial statements the provider should report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    #[default]
    Consolidated,
    Standalone,
}

string_enum!(ReportType, "report type", {
    Consolidated => "consolidated",
    Standalone => "standalone",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_from_camel_case_json() {
        let raw = r#"{
            "symbol": "ACME",
            "price": 100.0,
            "currency": "USD",
            "fcfPerShare": 5.5,
            "growthRate": 12,
            "discountRate": 10,
            "terminalRate": 3,
            "piotroskiFScore": 7,
            "scenarios": {
                "bear": { "price": 70, "narrative": "slowdown", "growthRate": 4 },
                "bull": { "price": 150, "narrative": "expansion", "growthRate": 20 }
            },
            "segments": [
                { "name": "Cloud", "ebitda": 100, "valuationMultiple": 10 }
            ],
            "someFieldWeDoNotUse": { "nested": true }
        }"#;

        let snapshot = FinancialSnapshot::from_json(raw).unwrap();
        assert_eq!(snapshot.symbol, "ACME");
        assert_eq!(snapshot.fcf_per_share, 5.5);
        assert_eq!(snapshot.piotroski_f_score, 7.0);
        assert_eq!(snapshot.scenarios.get(ScenarioKind::Bull).growth_rate, 20.0);
        assert_eq!(snapshot.scenarios.base, Scenario::default());
        assert_eq!(snapshot.segments[0].valuation_multiple, 10.0);
    }

    #[test]
    fn test_missing_share_count_and_net_debt_fall_back() {
        let snapshot = FinancialSnapshot::from_json(r#"{ "price": 10 }"#).unwrap();
        assert_eq!(snapshot.share_count(), 1.0);
        assert_eq!(snapshot.net_debt(), 0.0);

        let zero_shares = FinancialSnapshot {
            total_shares: Some(0.0),
            ..Default::default()
        };
        assert_eq!(zero_shares.share_count(), 1.0);
    }

    #[test]
    fn test_malformed_document_is_rejected() {
        assert!(FinancialSnapshot::from_json("not json").is_err());
        assert!(FinancialSnapshot::from_json(r#"{ "price": "abc" }"#).is_err());
    }

    #[test]
    fn test_non_object_document_is_rejected() {
        let err = FinancialSnapshot::from_json("[]").unwrap_err();
        assert!(matches!(err, ValuationError::InvalidSnapshot(_)));
        assert!(err.to_string().contains("an array"));

        let err = FinancialSnapshot::from_json("42").unwrap_err();
        assert!(err.to_string().contains("a number"));
    }

    #[test]
    fn test_out_of_range_price_fails_to_parse() {
        let err = FinancialSnapshot::from_json(r#"{ "price": 1e400 }"#).unwrap_err();
        assert!(matches!(err, ValuationError::Serialization(_)));
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("Bull".parse::<ScenarioKind>().unwrap(), ScenarioKind::Bull);
        assert_eq!(" multiple ".parse::<TerminalMethod>().unwrap(), TerminalMethod::Multiple);
        assert_eq!("standalone".parse::<ReportType>().unwrap(), ReportType::Standalone);
        assert_eq!(ReportType::Consolidated.to_string(), "consolidated");

        let err = "sideways".parse::<ScenarioKind>().unwrap_err();
        assert!(err.to_string().contains("sideways"));
    }
}
