//! Premium/discount classification and the rule-of-thumb bands shown next
//! to each ratio.

use serde::{Deserialize, Serialize};
use valuation_core::FinancialSnapshot;

/// Percentage gap between a value estimate and the market price.
/// `None` when the price is not positive.
pub fn margin_of_safety(value: f64, price: f64) -> Option<f64> {
    if price > 0.0 {
        Some((value - price) / price * 100.0)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceLabel {
    Discount,
    Premium,
}

impl PriceLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceLabel::Discount => "Discount",
            PriceLabel::Premium => "Premium",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuationInsight {
    /// |price - model| / model, in percent
    pub percent_difference: f64,
    pub is_undervalued: bool,
    pub label: PriceLabel,
}

/// Classify the market price against a model's fair value.
///
/// Shared by every fair value model. Returns `None` when the model value is
/// not positive, since the difference is relative to it.
pub fn classify(model_value: f64, current_price: f64) -> Option<ValuationInsight> {
    if !(model_value > 0.0) {
        return None;
    }
    let is_undervalued = current_price < model_value;
    Some(ValuationInsight {
        percent_difference: ((current_price - model_value) / model_value * 100.0).abs(),
        is_undervalued,
        label: if is_undervalued {
            PriceLabel::Discount
        } else {
            PriceLabel::Premium
        },
    })
}

/// Classic fair value models rendered as valuation cards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassicModel {
    GrahamNumber,
    GrahamGrowthValue,
    LynchFairValue,
    BuffettTenCap,
}

impl ClassicModel {
    pub const ALL: [ClassicModel; 4] = [
        ClassicModel::GrahamNumber,
        ClassicModel::GrahamGrowthValue,
        ClassicModel::LynchFairValue,
        ClassicModel::BuffettTenCap,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ClassicModel::GrahamNumber => "Graham Number",
            ClassicModel::GrahamGrowthValue => "Graham Growth Value",
            ClassicModel::LynchFairValue => "Lynch Fair Value",
            ClassicModel::BuffettTenCap => "Buffett Ten Cap",
        }
    }

    /// Fair value per share under this model.
    ///
    /// Lynch: P/E equal to the growth rate, i.e. EPS * growth.
    pub fn fair_value(&self, snapshot: &FinancialSnapshot) -> f64 {
        match self {
            ClassicModel::GrahamNumber => snapshot.graham_number,
            ClassicModel::GrahamGrowthValue => snapshot.graham_growth_value,
            ClassicModel::LynchFairValue => snapshot.eps * snapshot.revenue_growth,
            ClassicModel::BuffettTenCap => snapshot.buffett_ten_cap_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassicInsight {
    pub model: ClassicModel,
    pub fair_value: f64,
    pub insight: Option<ValuationInsight>,
}

pub fn classic_insights(snapshot: &FinancialSnapshot) -> Vec<ClassicInsight> {
    ClassicModel::ALL
        .iter()
        .map(|&model| {
            let fair_value = model.fair_value(snapshot);
            ClassicInsight {
                model,
                fair_value,
                insight: classify(fair_value, snapshot.price),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tone {
    Positive,
    Caution,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Band {
    pub tone: Tone,
    pub label: &'static str,
}

impl Band {
    const fn new(tone: Tone, label: &'static str) -> Self {
        Self { tone, label }
    }
}

/// Piotroski F-Score (0-9): 7+ strong, 4-6 moderate
pub fn f_score_band(score: f64) -> Band {
    if score >= 7.0 {
        Band::new(Tone::Positive, "Strong")
    } else if score >= 4.0 {
        Band::new(Tone::Caution, "Moderate")
    } else {
        Band::new(Tone::Negative, "Weak")
    }
}

/// EV/EBITDA: under 10x cheap, under 20x fair
pub fn ev_to_ebitda_band(ratio: f64) -> Band {
    if ratio < 10.0 {
        Band::new(Tone::Positive, "Cheap")
    } else if ratio < 20.0 {
        Band::new(Tone::Caution, "Fair")
    } else {
        Band::new(Tone::Negative, "Expensive")
    }
}

pub fn leverage_band(debt_to_equity: f64) -> Band {
    if debt_to_equity < 1.0 {
        Band::new(Tone::Positive, "Healthy Balance Sheet")
    } else {
        Band::new(Tone::Negative, "High Leverage")
    }
}

pub fn interest_coverage_band(coverage: f64) -> Band {
    if coverage > 5.0 {
        Band::new(Tone::Positive, "Safe")
    } else {
        Band::new(Tone::Negative, "Risky")
    }
}

pub fn peg_band(peg: f64) -> Band {
    if peg < 1.0 {
        Band::new(Tone::Positive, "Undervalued (<1.0)")
    } else {
        Band::new(Tone::Caution, "Fair/Overvalued")
    }
}

pub fn pe_band(pe: f64) -> Band {
    if pe > 25.0 {
        Band::new(Tone::Negative, "Premium Valuation")
    } else if pe < 15.0 {
        Band::new(Tone::Positive, "Potential Value")
    } else {
        Band::new(Tone::Caution, "Fair Value")
    }
}

pub fn relative_pe_band(pe: f64, industry_pe: f64) -> Band {
    if pe < industry_pe {
        Band::new(Tone::Positive, "Cheaper than peers")
    } else {
        Band::new(Tone::Negative, "Premium to peers")
    }
}

pub fn intrinsic_value_band(intrinsic_value: f64, price: f64) -> Band {
    if intrinsic_value > price {
        Band::new(Tone::Positive, "Undervalued")
    } else {
        Band::new(Tone::Negative, "Overvalued")
    }
}

/// Every band and classic model insight for one snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightReport {
    pub f_score: Band,
    pub ev_to_ebitda: Band,
    pub leverage: Band,
    pub interest_coverage: Band,
    pub peg: Band,
    pub pe: Band,
    pub relative_pe: Band,
    pub intrinsic_value: Band,
    pub classic: Vec<ClassicInsight>,
}

impl InsightReport {
    pub fn from_snapshot(snapshot: &FinancialSnapshot) -> Self {
        Self {
            f_score: f_score_band(snapshot.piotroski_f_score),
            ev_to_ebitda: ev_to_ebitda_band(snapshot.ev_to_ebitda),
            leverage: leverage_band(snapshot.debt_to_equity),
            interest_coverage: interest_coverage_band(snapshot.interest_coverage),
            peg: peg_band(snapshot.peg_ratio),
            pe: pe_band(snapshot.pe),
            relative_pe: relative_pe_band(snapshot.pe, snapshot.industry_pe),
            intrinsic_value: intrinsic_value_band(snapshot.intrinsic_value, snapshot.price),
            classic: classic_insights(snapshot),
        }
    }
}
