// Chi-square goodness-of-fit test (§4.D / §9): baseline probabilities are
// scaled ×1000 to act as expected frequencies, observed probabilities
// likewise, across the sorted union of options. The CDF comes from a
// vetted statistics library rather than a hand-rolled implementation.

use statrs::distribution::{ChiSquared, ContinuousCDF};

const FREQUENCY_SCALE: f64 = 1000.0;

/// Returns `p = 1 − CDF(statistic)`, or `1.0` if the test cannot be run
/// (fewer than two options, or a degenerate expected-frequency vector) —
/// treated downstream as "no statistical test attempted".
pub fn chi_square_p_value(expected_probabilities: &[f64], observed_probabilities: &[f64]) -> f64 {
    debug_assert_eq!(expected_probabilities.len(), observed_probabilities.len());
    let k = expected_probabilities.len();
    if k < 2 {
        return 1.0;
    }

    let mut statistic = 0.0;
    for (&p_expected, &p_observed) in expected_probabilities.iter().zip(observed_probabilities) {
        let expected = p_expected * FREQUENCY_SCALE;
        let observed = p_observed * FREQUENCY_SCALE;
        if expected <= 0.0 {
            continue;
        }
        statistic += (observed - expected).powi(2) / expected;
    }

    let degrees_of_freedom = (k - 1) as f64;
    let Ok(dist) = ChiSquared::new(degrees_of_freedom) else {
        return 1.0;
    };
    let p = 1.0 - dist.cdf(statistic);
    if p.is_finite() {
        p.clamp(0.0, 1.0)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_distributions_yield_high_p_value() {
        let p = chi_square_p_value(&[0.5, 0.5], &[0.5, 0.5]);
        assert!(p > 0.99, "expected near-1.0 p-value, got {p}");
    }

    #[test]
    fn large_shift_yields_low_p_value() {
        let p = chi_square_p_value(&[0.65, 0.35], &[0.40, 0.60]);
        assert!(p < 0.05, "expected significant p-value, got {p}");
    }

    #[test]
    fn fewer_than_two_options_skips_test() {
        assert_eq!(chi_square_p_value(&[1.0], &[1.0]), 1.0);
    }

    #[test]
    fn zero_expected_frequency_is_skipped_not_a_division_error() {
        let p = chi_square_p_value(&[0.0, 1.0], &[0.2, 0.8]);
        assert!((0.0..=1.0).contains(&p));
    }
}
