//! Typed financial statements.
//!
//! Providers deliver statement tables as rows of formatted strings keyed by
//! column name ("Mar 2023", "TTM", ...). Each statement gets a closed metric
//! enum so lookups are `table.get("Mar 2023", ProfitLossMetric::NetProfit)`
//! rather than string-keyed field access.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// A closed set of line items belonging to one statement.
pub trait Metric: Copy + Ord + Debug + 'static {
    const ALL: &'static [Self];

    /// Column key used by the provider document
    fn key(&self) -> &'static str;

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.key() == key)
    }
}

macro_rules! metric_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $key:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($variant,)+
        }

        impl Metric for $name {
            const ALL: &'static [Self] = &[$($name::$variant,)+];

            fn key(&self) -> &'static str {
                match self {
                    $($name::$variant => $key,)+
                }
            }
        }
    };
}

metric_enum!(
    /// Profit & loss line items
    ProfitLossMetric {
        Sales => "sales",
        Expenses => "expenses",
        OperatingProfit => "operatingProfit",
        OperatingMargin => "opm",
        OtherIncome => "otherIncome",
        Interest => "interest",
        Depreciation => "depreciation",
        ProfitBeforeTax => "profitBeforeTax",
        Tax => "tax",
        NetProfit => "netProfit",
        Eps => "eps",
        DividendPayout => "dividendPayout",
    }
);

metric_enum!(
    /// Balance sheet line items
    BalanceSheetMetric {
        EquityCapital => "equityCapital",
        Reserves => "reserves",
        Borrowings => "borrowings",
        OtherLiabilities => "otherLiabilities",
        TotalLiabilities => "totalLiabilities",
        FixedAssets => "fixedAssets",
        CapitalWorkInProgress => "cwip",
        Investments => "investments",
        OtherAssets => "otherAssets",
        TotalAssets => "totalAssets",
    }
);

metric_enum!(
    /// Cash flow statement line items
    CashFlowMetric {
        Operating => "cashFromOperating",
        Investing => "cashFromInvesting",
        Financing => "cashFromFinancing",
        NetCashFlow => "netCashFlow",
    }
);

const PERIOD_KEY: &str = "year";

/// Parse a provider-formatted amount ("1,234.5", "12%", "$4.2", "Rs. 1,234", "(45)").
///
/// Parentheses mean negative. Blank cells, dashes and "N/A" are absent, as is
/// anything left over once the currency prefix, grouping commas and percent
/// sign are removed (exponents, stray letters, a second decimal point).
pub fn parse_amount(raw: &str) -> Option<f64> {
    let mut s = raw.trim();
    if s.is_empty() || s == "-" || s == "--" || s.eq_ignore_ascii_case("n/a") {
        return None;
    }

    let parenthesized = s.starts_with('(') && s.ends_with(')');
    if parenthesized {
        s = s[1..s.len() - 1].trim();
    }

    let (minus_before, s) = split_sign(s);
    let (minus_after, s) = split_sign(strip_currency_prefix(s));
    let s = s.trim_end_matches('%').trim_end();

    let digits: String = s.chars().filter(|c| *c != ',').collect();
    let well_formed = digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1;
    if !well_formed {
        return None;
    }

    let value: f64 = digits.parse().ok()?;
    Some(if parenthesized || minus_before || minus_after { -value } else { value })
}

fn split_sign(s: &str) -> (bool, &str) {
    match s.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, s),
    }
}

/// Drops a leading currency code or symbol: "Rs.", "INR", "$", "₹".
fn strip_currency_prefix(s: &str) -> &str {
    let letters = s.find(|c: char| !c.is_alphabetic()).unwrap_or(s.len());
    let mut rest = &s[letters..];
    if letters > 0 {
        rest = rest.strip_prefix('.').unwrap_or(rest);
    }
    rest.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '$' | '₹' | '€' | '£'))
}

fn cell_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

/// One column of a statement (a fiscal year or TTM)
#[derive(Debug, Clone, PartialEq)]
pub struct StatementPeriod<M: Metric> {
    pub label: String,
    pub values: BTreeMap<M, f64>,
}

impl<M: Metric> StatementPeriod<M> {
    pub fn get(&self, metric: M) -> Option<f64> {
        self.values.get(&metric).copied()
    }
}

/// Ordered periods of a single statement, oldest first as delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementTable<M: Metric> {
    periods: Vec<StatementPeriod<M>>,
}

impl<M: Metric> Default for StatementTable<M> {
    fn default() -> Self {
        Self { periods: Vec::new() }
    }
}

impl<M: Metric> StatementTable<M> {
    pub fn new(periods: Vec<StatementPeriod<M>>) -> Self {
        Self { periods }
    }

    /// Build a table from raw provider rows. Unknown columns are ignored,
    /// unparsable cells are left out.
    pub fn from_rows(rows: &[Map<String, Value>]) -> Self {
        let periods = rows
            .iter()
            .map(|row| {
                let label = row
                    .get(PERIOD_KEY)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let values = row
                    .iter()
                    .filter_map(|(key, value)| {
                        let metric = M::from_key(key)?;
                        cell_value(value).map(|v| (metric, v))
                    })
                    .collect();
                StatementPeriod { label, values }
            })
            .collect();
        Self { periods }
    }

    pub fn periods(&self) -> &[StatementPeriod<M>] {
        &self.periods
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.periods.iter().map(|p| p.label.as_str())
    }

    pub fn get(&self, period: &str, metric: M) -> Option<f64> {
        self.periods
            .iter()
            .find(|p| p.label == period)
            .and_then(|p| p.get(metric))
    }

    /// Every period that reports `metric`, in table order.
    pub fn series(&self, metric: M) -> Vec<(&str, f64)> {
        self.periods
            .iter()
            .filter_map(|p| p.get(metric).map(|v| (p.label.as_str(), v)))
            .collect()
    }

    /// Most recent reported value of `metric`.
    pub fn latest(&self, metric: M) -> Option<f64> {
        self.periods.iter().rev().find_map(|p| p.get(metric))
    }

    fn to_rows(&self) -> Vec<Map<String, Value>> {
        self.periods
            .iter()
            .map(|p| {
                let mut row = Map::new();
                row.insert(PERIOD_KEY.to_string(), Value::String(p.label.clone()));
                for (metric, value) in &p.values {
                    row.insert(metric.key().to_string(), serde_json::json!(value));
                }
                row
            })
            .collect()
    }
}

impl<'de, M: Metric> Deserialize<'de> for StatementTable<M> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<Map<String, Value>>::deserialize(deserializer)?;
        Ok(Self::from_rows(&rows))
    }
}

impl<M: Metric> Serialize for StatementTable<M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_rows().serialize(serializer)
    }
}

/// The three statements as returned for the requested report type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FinancialStatements {
    pub profit_loss: StatementTable<ProfitLossMetric>,
    pub balance_sheet: StatementTable<BalanceSheetMetric>,
    pub cash_flow: StatementTable<CashFlowMetric>,
}

impl FinancialStatements {
    /// Operating plus investing cash flow of the newest period that reports
    /// operating cash flow, a rough free cash flow figure. Both figures come
    /// from that one period; a missing investing cell counts as zero.
    pub fn latest_free_cash_flow(&self) -> Option<f64> {
        self.cash_flow.periods().iter().rev().find_map(|p| {
            let operating = p.get(CashFlowMetric::Operating)?;
            Some(operating + p.get(CashFlowMetric::Investing).unwrap_or(0.0))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.5"), Some(1234.5));
        assert_eq!(parse_amount("12%"), Some(12.0));
        assert_eq!(parse_amount(" $4.20 "), Some(4.2));
        assert_eq!(parse_amount("(45)"), Some(-45.0));
        assert_eq!(parse_amount("-7.5"), Some(-7.5));
        assert_eq!(parse_amount("-"), None);
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("N/A"), None);
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn test_parse_amount_currency_prefixes_and_junk() {
        assert_eq!(parse_amount("Rs. 1,234"), Some(1234.0));
        assert_eq!(parse_amount("INR 56.5"), Some(56.5));
        assert_eq!(parse_amount("₹ 2,00,000"), Some(200000.0));
        assert_eq!(parse_amount("(Rs. 45)"), Some(-45.0));
        assert_eq!(parse_amount("-$4.2"), Some(-4.2));
        assert_eq!(parse_amount("1.2e3"), None);
        assert_eq!(parse_amount("1.2.3"), None);
        assert_eq!(parse_amount("12 Cr"), None);
        assert_eq!(parse_amount("Rs."), None);
        assert_eq!(parse_amount("inf"), None);
    }

    #[test]
    fn test_free_cash_flow_uses_one_period() {
        let raw = r#"{
            "cashFlow": [
                { "year": "Mar 2023", "cashFromOperating": "100", "cashFromInvesting": "(50)" },
                { "year": "Mar 2024", "cashFromOperating": "300", "cashFromInvesting": "-" },
                { "year": "TTM", "cashFromInvesting": "(70)" }
            ]
        }"#;
        let statements: FinancialStatements = serde_json::from_str(raw).unwrap();
        assert_relative_eq!(statements.latest_free_cash_flow().unwrap(), 300.0);

        assert_eq!(FinancialStatements::default().latest_free_cash_flow(), None);
    }

    #[test]
    fn test_statements_deserialize_into_typed_tables() {
        let raw = r#"{
            "profitLoss": [
                { "year": "Mar 2023", "sales": "1,000", "netProfit": "120", "opm": "18%" },
                { "year": "Mar 2024", "sales": "1,150", "netProfit": "(15)", "unknownColumn": "9" },
                { "year": "TTM", "sales": 1200, "netProfit": "-" }
            ],
            "cashFlow": [
                { "year": "Mar 2024", "cashFromOperating": "300", "cashFromInvesting": "(120)" }
            ]
        }"#;

        let statements: FinancialStatements = serde_json::from_str(raw).unwrap();
        let pl = &statements.profit_loss;

        assert_eq!(pl.labels().collect::<Vec<_>>(), vec!["Mar 2023", "Mar 2024", "TTM"]);
        assert_eq!(pl.get("Mar 2023", ProfitLossMetric::OperatingMargin), Some(18.0));
        assert_eq!(pl.get("Mar 2024", ProfitLossMetric::NetProfit), Some(-15.0));
        assert_eq!(pl.get("TTM", ProfitLossMetric::NetProfit), None);
        assert_eq!(pl.latest(ProfitLossMetric::NetProfit), Some(-15.0));
        assert_eq!(pl.latest(ProfitLossMetric::Sales), Some(1200.0));
        assert_eq!(pl.series(ProfitLossMetric::Sales).len(), 3);

        assert!(statements.balance_sheet.is_empty());
        assert_relative_eq!(statements.latest_free_cash_flow().unwrap(), 180.0);
    }

    #[test]
    fn test_metric_keys_round_trip() {
        for metric in BalanceSheetMetric::ALL {
            assert_eq!(BalanceSheetMetric::from_key(metric.key()), Some(*metric));
        }
        assert_eq!(CashFlowMetric::from_key("capex"), None);
    }
}
