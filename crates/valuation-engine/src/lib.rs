//! Valuation engines: discounted cash flow, sum-of-the-parts, reverse DCF,
//! and the premium/discount classifier, plus the interactive calculator
//! sessions built on top of them.

pub mod calculator;
pub mod dcf;
pub mod insight;
pub mod reverse;
pub mod sotp;

pub use calculator::{DcfCalculator, ScenarioSet, SliderRange, SotpCalculator};
pub use dcf::{compute_dcf, DcfInputs, DcfValuation, ProjectionRow, ScenarioParams, PROJECTION_YEARS};
pub use insight::{classify, classic_insights, Band, ClassicModel, InsightReport, PriceLabel, Tone, ValuationInsight};
pub use reverse::implied_growth_rate;
pub use sotp::{compute_sotp, SegmentContribution, SotpOutcome, SotpValuation};
