use serde::{Deserialize, Serialize};
use valuation_core::TerminalMethod;

use crate::insight::margin_of_safety;

/// Explicit forecast horizon in years
pub const PROJECTION_YEARS: u32 = 10;

/// Long-run growth the decay glides toward under the exit-multiple method
/// (GDP proxy). Independent of the exit multiple itself.
pub const MULTIPLE_DECAY_TARGET: f64 = 3.0;

/// Floor for `(discount - terminal growth) / 100` in the Gordon Growth model.
/// Terminal growth at or above the discount rate is approximated rather than
/// treated as a singularity.
pub const MIN_GORDON_DENOMINATOR: f64 = 0.001;

/// Growth/discount/terminal assumptions of one scenario
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParams {
    /// Starting annual FCF growth (%)
    pub growth_rate: f64,
    /// Discount rate (%)
    pub discount_rate: f64,
    /// Terminal growth (%) or exit EV/FCF multiple, per `TerminalMethod`
    pub terminal_val: f64,
}

/// Every input of a single DCF run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DcfInputs {
    pub growth_rate: f64,
    pub discount_rate: f64,
    pub terminal_val: f64,
    pub terminal_method: TerminalMethod,
    pub use_decay: bool,
    /// Starting free cash flow per share
    pub fcf: f64,
    pub net_debt_per_share: f64,
    pub projection_years: u32,
}

impl DcfInputs {
    pub fn new(
        params: ScenarioParams,
        terminal_method: TerminalMethod,
        use_decay: bool,
        fcf: f64,
        net_debt_per_share: f64,
    ) -> Self {
        Self {
            growth_rate: params.growth_rate,
            discount_rate: params.discount_rate,
            terminal_val: params.terminal_val,
            terminal_method,
            use_decay,
            fcf,
            net_debt_per_share,
            projection_years: PROJECTION_YEARS,
        }
    }

    pub fn with_growth_rate(mut self, growth_rate: f64) -> Self {
        self.growth_rate = growth_rate;
        self
    }
}

/// One projected year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRow {
    pub year: u32,
    /// Growth applied this year (%)
    pub growth_used: f64,
    pub fcf: f64,
    /// Present value of this year's FCF
    pub discounted: f64,
}

impl ProjectionRow {
    /// Chart label ("Y1".."Y10")
    pub fn label(&self) -> String {
        format!("Y{}", self.year)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfValuation {
    /// Equity value per share, floored at zero
    pub intrinsic_value_per_share: f64,
    pub enterprise_value_per_share: f64,
    pub discounted_fcf_sum: f64,
    pub terminal_value: f64,
    pub discounted_terminal_value: f64,
    /// `None` when the market price is not positive
    pub margin_of_safety_pct: Option<f64>,
    pub projections: Vec<ProjectionRow>,
}

/// Growth rate the decay schedule converges to in the final year.
pub fn decay_target(method: TerminalMethod, terminal_val: f64) -> f64 {
    match method {
        TerminalMethod::Growth => terminal_val,
        TerminalMethod::Multiple => MULTIPLE_DECAY_TARGET,
    }
}

/// Per-year growth rates (%) for years 1..=projection_years.
///
/// With decay the rate falls linearly from `growth_rate` to the decay target,
/// never below zero. Without decay every year uses `growth_rate`.
pub fn growth_schedule(inputs: &DcfInputs) -> Vec<f64> {
    let years = inputs.projection_years;
    let target = decay_target(inputs.terminal_method, inputs.terminal_val);
    let step = (inputs.growth_rate - target) / years.saturating_sub(1).max(1) as f64;

    (1..=years)
        .map(|i| {
            if inputs.use_decay {
                (inputs.growth_rate - step * (i - 1) as f64).max(0.0)
            } else {
                inputs.growth_rate
            }
        })
        .collect()
}

/// Gordon Growth terminal value of `final_fcf` (rates in %).
pub fn gordon_terminal_value(final_fcf: f64, discount_rate: f64, terminal_growth: f64) -> f64 {
    let denominator = ((discount_rate - terminal_growth) / 100.0).max(MIN_GORDON_DENOMINATOR);
    final_fcf * (1.0 + terminal_growth / 100.0) / denominator
}

pub fn terminal_value(inputs: &DcfInputs, final_fcf: f64) -> f64 {
    match inputs.terminal_method {
        TerminalMethod::Growth => {
            gordon_terminal_value(final_fcf, inputs.discount_rate, inputs.terminal_val)
        }
        TerminalMethod::Multiple => final_fcf * inputs.terminal_val,
    }
}

/// Two-stage DCF: explicit growth phase plus discounted terminal value,
/// bridged from enterprise to equity value per share.
pub fn compute_dcf(inputs: &DcfInputs, price: f64) -> DcfValuation {
    let discount = 1.0 + inputs.discount_rate / 100.0;

    let mut running_fcf = inputs.fcf;
    let mut discounted_fcf_sum = 0.0;
    let projections: Vec<ProjectionRow> = growth_schedule(inputs)
        .into_iter()
        .zip(1..)
        .map(|(growth_used, year)| {
            running_fcf *= 1.0 + growth_used / 100.0;
            let discounted = running_fcf / discount.powi(year as i32);
            discounted_fcf_sum += discounted;
            ProjectionRow {
                year,
                growth_used,
                fcf: running_fcf,
                discounted,
            }
        })
        .collect();

    let terminal_value = terminal_value(inputs, running_fcf);
    let discounted_terminal_value = terminal_value / discount.powi(inputs.projection_years as i32);

    let enterprise_value_per_share = discounted_fcf_sum + discounted_terminal_value;
    let intrinsic_value_per_share = (enterprise_value_per_share - inputs.net_debt_per_share).max(0.0);

    DcfValuation {
        intrinsic_value_per_share,
        enterprise_value_per_share,
        discounted_fcf_sum,
        terminal_value,
        discounted_terminal_value,
        margin_of_safety_pct: margin_of_safety(intrinsic_value_per_share, price),
        projections,
    }
}
