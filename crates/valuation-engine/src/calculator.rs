//! Interactive calculator sessions.
//!
//! Each calculator owns its parameters and the latest result. Every setter
//! clamps its input to the control's range and recomputes synchronously, so
//! `result()` always reflects the current parameters.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use valuation_core::{
    BusinessSegment, FinancialSnapshot, ScenarioKind, TerminalMethod, ValuationError, ValuationResult,
};

use crate::dcf::{compute_dcf, DcfInputs, DcfValuation, ScenarioParams};
use crate::reverse::implied_growth_rate;
use crate::sotp::{compute_sotp, SotpOutcome};

/// Inclusive bounds of one input control
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliderRange {
    pub min: f64,
    pub max: f64,
}

impl SliderRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// NaN maps to `min`.
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            self.min
        } else {
            value.clamp(self.min, self.max)
        }
    }
}

pub const GROWTH_RANGE: SliderRange = SliderRange::new(-5.0, 40.0);
pub const DISCOUNT_RANGE: SliderRange = SliderRange::new(4.0, 20.0);
pub const TERMINAL_GROWTH_RANGE: SliderRange = SliderRange::new(0.0, 6.0);
pub const EXIT_MULTIPLE_RANGE: SliderRange = SliderRange::new(5.0, 50.0);
pub const SEGMENT_MULTIPLE_RANGE: SliderRange = SliderRange::new(1.0, 50.0);

pub fn terminal_range(method: TerminalMethod) -> SliderRange {
    match method {
        TerminalMethod::Growth => TERMINAL_GROWTH_RANGE,
        TerminalMethod::Multiple => EXIT_MULTIPLE_RANGE,
    }
}

/// Starting FCF control: up to three times the reported figure, at least 20
pub fn fcf_range(snapshot: &FinancialSnapshot) -> SliderRange {
    SliderRange::new(0.0, (snapshot.fcf_per_share * 3.0).max(20.0))
}

pub fn net_debt_per_share_range(snapshot: &FinancialSnapshot) -> SliderRange {
    SliderRange::new(0.0, snapshot.price.max(0.0))
}

/// Independent parameters for each scenario tag
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub bear: ScenarioParams,
    pub base: ScenarioParams,
    pub bull: ScenarioParams,
}

impl ScenarioSet {
    /// Defaults derived from the snapshot. Bear carries a higher discount rate
    /// and lower terminal value, bull the opposite.
    pub fn from_snapshot(snapshot: &FinancialSnapshot, method: TerminalMethod) -> Self {
        Self {
            bear: ScenarioParams {
                growth_rate: snapshot.scenarios.bear.growth_rate,
                discount_rate: snapshot.discount_rate + 2.0,
                terminal_val: default_terminal_val(snapshot, ScenarioKind::Bear, method),
            },
            base: ScenarioParams {
                growth_rate: snapshot.growth_rate,
                discount_rate: snapshot.discount_rate,
                terminal_val: default_terminal_val(snapshot, ScenarioKind::Base, method),
            },
            bull: ScenarioParams {
                growth_rate: snapshot.scenarios.bull.growth_rate,
                discount_rate: (snapshot.discount_rate - 1.0).max(6.0),
                terminal_val: default_terminal_val(snapshot, ScenarioKind::Bull, method),
            },
        }
    }

    pub fn get(&self, kind: ScenarioKind) -> &ScenarioParams {
        match kind {
            ScenarioKind::Bear => &self.bear,
            ScenarioKind::Base => &self.base,
            ScenarioKind::Bull => &self.bull,
        }
    }

    pub fn get_mut(&mut self, kind: ScenarioKind) -> &mut ScenarioParams {
        match kind {
            ScenarioKind::Bear => &mut self.bear,
            ScenarioKind::Base => &mut self.base,
            ScenarioKind::Bull => &mut self.bull,
        }
    }
}

/// Terminal value a scenario starts with under `method`
pub fn default_terminal_val(
    snapshot: &FinancialSnapshot,
    kind: ScenarioKind,
    method: TerminalMethod,
) -> f64 {
    match (method, kind) {
        (TerminalMethod::Growth, ScenarioKind::Bear) => (snapshot.terminal_rate - 1.5).max(1.0),
        (TerminalMethod::Growth, ScenarioKind::Base) => snapshot.terminal_rate,
        (TerminalMethod::Growth, ScenarioKind::Bull) => snapshot.terminal_rate + 1.0,
        (TerminalMethod::Multiple, ScenarioKind::Bear) => 10.0,
        (TerminalMethod::Multiple, ScenarioKind::Base) => 15.0,
        (TerminalMethod::Multiple, ScenarioKind::Bull) => 20.0,
    }
}

/// DCF sandbox for one analysis
#[derive(Debug, Clone)]
pub struct DcfCalculator {
    snapshot: Arc<FinancialSnapshot>,
    active: ScenarioKind,
    method: TerminalMethod,
    use_decay: bool,
    fcf: f64,
    net_debt_per_share: f64,
    scenarios: ScenarioSet,
    result: DcfValuation,
}

impl DcfCalculator {
    pub fn new(snapshot: Arc<FinancialSnapshot>) -> Self {
        let scenarios = ScenarioSet::from_snapshot(&snapshot, TerminalMethod::Growth);
        let fcf = snapshot.fcf_per_share;
        let mut calc = Self {
            snapshot,
            active: ScenarioKind::Base,
            method: TerminalMethod::Growth,
            use_decay: true,
            fcf,
            net_debt_per_share: 0.0,
            scenarios,
            result: DcfValuation {
                intrinsic_value_per_share: 0.0,
                enterprise_value_per_share: 0.0,
                discounted_fcf_sum: 0.0,
                terminal_value: 0.0,
                discounted_terminal_value: 0.0,
                margin_of_safety_pct: None,
                projections: Vec::new(),
            },
        };
        calc.recompute();
        calc
    }

    pub fn snapshot(&self) -> &FinancialSnapshot {
        &self.snapshot
    }

    pub fn result(&self) -> &DcfValuation {
        &self.result
    }

    pub fn active_scenario(&self) -> ScenarioKind {
        self.active
    }

    pub fn terminal_method(&self) -> TerminalMethod {
        self.method
    }

    pub fn use_decay(&self) -> bool {
        self.use_decay
    }

    pub fn fcf(&self) -> f64 {
        self.fcf
    }

    pub fn net_debt_per_share(&self) -> f64 {
        self.net_debt_per_share
    }

    pub fn scenarios(&self) -> &ScenarioSet {
        &self.scenarios
    }

    pub fn active_params(&self) -> ScenarioParams {
        *self.scenarios.get(self.active)
    }

    pub fn inputs(&self) -> DcfInputs {
        DcfInputs::new(
            self.active_params(),
            self.method,
            self.use_decay,
            self.fcf,
            self.net_debt_per_share,
        )
    }

    /// Growth rate implied by the current market price under the active inputs
    pub fn implied_growth_rate(&self) -> Option<f64> {
        implied_growth_rate(&self.inputs(), self.snapshot.price)
    }

    pub fn set_active_scenario(&mut self, kind: ScenarioKind) {
        self.active = kind;
        self.recompute();
    }

    /// Switching method rewrites every scenario's terminal value to the
    /// method default; growth and discount edits are kept.
    pub fn set_terminal_method(&mut self, method: TerminalMethod) {
        if method == self.method {
            return;
        }
        self.method = method;
        for kind in ScenarioKind::ALL {
            self.scenarios.get_mut(kind).terminal_val =
                default_terminal_val(&self.snapshot, kind, method);
        }
        self.recompute();
    }

    pub fn set_use_decay(&mut self, use_decay: bool) {
        self.use_decay = use_decay;
        self.recompute();
    }

    pub fn set_fcf(&mut self, fcf: f64) {
        self.fcf = fcf_range(&self.snapshot).clamp(fcf);
        self.recompute();
    }

    pub fn set_net_debt_per_share(&mut self, net_debt_per_share: f64) {
        self.net_debt_per_share = net_debt_per_share_range(&self.snapshot).clamp(net_debt_per_share);
        self.recompute();
    }

    /// Only the active scenario is edited.
    pub fn set_growth_rate(&mut self, growth_rate: f64) {
        self.scenarios.get_mut(self.active).growth_rate = GROWTH_RANGE.clamp(growth_rate);
        self.recompute();
    }

    pub fn set_discount_rate(&mut self, discount_rate: f64) {
        self.scenarios.get_mut(self.active).discount_rate = DISCOUNT_RANGE.clamp(discount_rate);
        self.recompute();
    }

    pub fn set_terminal_val(&mut self, terminal_val: f64) {
        let range = terminal_range(self.method);
        self.scenarios.get_mut(self.active).terminal_val = range.clamp(terminal_val);
        self.recompute();
    }

    /// Restore every parameter to its snapshot-derived default
    pub fn reset(&mut self) {
        self.active = ScenarioKind::Base;
        self.method = TerminalMethod::Growth;
        self.use_decay = true;
        self.fcf = self.snapshot.fcf_per_share;
        self.net_debt_per_share = 0.0;
        self.scenarios = ScenarioSet::from_snapshot(&self.snapshot, TerminalMethod::Growth);
        self.recompute();
    }

    fn recompute(&mut self) {
        self.result = compute_dcf(&self.inputs(), self.snapshot.price);
        tracing::debug!(
            symbol = %self.snapshot.symbol,
            scenario = %self.active,
            method = %self.method,
            intrinsic_value = self.result.intrinsic_value_per_share,
            "DCF recomputed"
        );
    }
}

/// Sum-of-the-parts sandbox for one analysis
#[derive(Debug, Clone)]
pub struct SotpCalculator {
    snapshot: Arc<FinancialSnapshot>,
    segments: Vec<BusinessSegment>,
    net_debt: f64,
    result: SotpOutcome,
}

impl SotpCalculator {
    pub fn new(snapshot: Arc<FinancialSnapshot>) -> Self {
        let segments = snapshot.segments.clone();
        let net_debt = snapshot.net_debt();
        let mut calc = Self {
            snapshot,
            segments,
            net_debt,
            result: SotpOutcome::NotApplicable,
        };
        calc.recompute();
        calc
    }

    pub fn result(&self) -> &SotpOutcome {
        &self.result
    }

    pub fn segments(&self) -> &[BusinessSegment] {
        &self.segments
    }

    pub fn net_debt(&self) -> f64 {
        self.net_debt
    }

    pub fn total_shares(&self) -> f64 {
        self.snapshot.share_count()
    }

    pub fn set_segment_multiple(&mut self, index: usize, multiple: f64) -> ValuationResult<()> {
        let len = self.segments.len();
        let segment = self
            .segments
            .get_mut(index)
            .ok_or(ValuationError::SegmentOutOfRange { index, len })?;
        segment.valuation_multiple = SEGMENT_MULTIPLE_RANGE.clamp(multiple);
        self.recompute();
        Ok(())
    }

    pub fn set_net_debt(&mut self, net_debt: f64) {
        if net_debt.is_finite() {
            self.net_debt = net_debt;
            self.recompute();
        }
    }

    pub fn reset(&mut self) {
        self.segments = self.snapshot.segments.clone();
        self.net_debt = self.snapshot.net_debt();
        self.recompute();
    }

    fn recompute(&mut self) {
        self.result = compute_sotp(
            &self.segments,
            self.net_debt,
            self.snapshot.share_count(),
            self.snapshot.price,
        );
        tracing::debug!(
            symbol = %self.snapshot.symbol,
            segments = self.segments.len(),
            applicable = self.result.is_applicable(),
            "SOTP recomputed"
        );
    }
}
