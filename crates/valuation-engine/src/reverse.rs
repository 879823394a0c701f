use crate::calculator::GROWTH_RANGE;
use crate::dcf::{compute_dcf, DcfInputs};

const TOLERANCE: f64 = 1e-6;
const MAX_ITERATIONS: usize = 200;

/// Reverse DCF: the starting growth rate (%) the market price implies, holding
/// every other input fixed.
///
/// Intrinsic value is non-decreasing in the starting growth rate, so a
/// bisection over the growth slider range converges. Returns `None` when the
/// price is not positive or cannot be reached inside that range.
pub fn implied_growth_rate(inputs: &DcfInputs, price: f64) -> Option<f64> {
    if !(price > 0.0) {
        return None;
    }

    let value_at = |growth: f64| {
        compute_dcf(&inputs.with_growth_rate(growth), price).intrinsic_value_per_share
    };

    let (mut lo, mut hi) = (GROWTH_RANGE.min, GROWTH_RANGE.max);
    if price < value_at(lo) || price > value_at(hi) {
        return None;
    }

    for _ in 0..MAX_ITERATIONS {
        if hi - lo < TOLERANCE {
            break;
        }
        let mid = (lo + hi) / 2.0;
        if value_at(mid) < price {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Some((lo + hi) / 2.0)
}
