use serde::{Deserialize, Serialize};
use valuation_core::BusinessSegment;

use crate::insight::margin_of_safety;

/// One segment's slice of enterprise value (pie chart input)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentContribution {
    pub name: String,
    pub ebitda: f64,
    pub multiple: f64,
    pub ev: f64,
    /// Fraction of total EV (0.0 when total EV is zero)
    pub share_of_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SotpValuation {
    pub total_ev: f64,
    pub net_debt: f64,
    pub equity_value: f64,
    pub total_shares: f64,
    pub target_price_per_share: f64,
    /// Upside vs market price, `None` when the price is not positive
    pub upside_pct: Option<f64>,
    pub contributions: Vec<SegmentContribution>,
}

/// Result of a sum-of-the-parts run. A company without segment data is
/// `NotApplicable`, which is not the same as a valuation of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SotpOutcome {
    NotApplicable,
    Valued(SotpValuation),
}

impl SotpOutcome {
    pub fn valuation(&self) -> Option<&SotpValuation> {
        match self {
            SotpOutcome::Valued(v) => Some(v),
            SotpOutcome::NotApplicable => None,
        }
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, SotpOutcome::Valued(_))
    }
}

pub fn segment_ev(segment: &BusinessSegment) -> f64 {
    segment.ebitda * segment.valuation_multiple
}

/// Value each segment at its own EV/EBITDA multiple, sum to enterprise value,
/// and bridge to a per-share target price.
///
/// A non-positive `total_shares` is replaced with 1 so the division stays
/// defined; that is a display fallback, not a financial assumption.
pub fn compute_sotp(
    segments: &[BusinessSegment],
    net_debt: f64,
    total_shares: f64,
    price: f64,
) -> SotpOutcome {
    if segments.is_empty() {
        return SotpOutcome::NotApplicable;
    }

    let evs: Vec<f64> = segments.iter().map(segment_ev).collect();
    let total_ev: f64 = evs.iter().sum();
    let total_shares = if total_shares > 0.0 { total_shares } else { 1.0 };

    let equity_value = total_ev - net_debt;
    let target_price_per_share = equity_value / total_shares;

    let contributions = segments
        .iter()
        .zip(evs)
        .map(|(segment, ev)| SegmentContribution {
            name: segment.name.clone(),
            ebitda: segment.ebitda,
            multiple: segment.valuation_multiple,
            ev,
            share_of_total: if total_ev != 0.0 { ev / total_ev } else { 0.0 },
        })
        .collect();

    SotpOutcome::Valued(SotpValuation {
        total_ev,
        net_debt,
        equity_value,
        total_shares,
        target_price_per_share,
        upside_pct: margin_of_safety(target_price_per_share, price),
        contributions,
    })
}
