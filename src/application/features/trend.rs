//! Least-squares trend summary of an indicator window.
//!
//! The window is regressed against its bar index `0..len`. The result is a
//! fixed triple (slope, |r|, p-value) regardless of window length.

use statrs::distribution::{ContinuousCDF, StudentsT};

/// Slope, correlation strength and two-sided significance of a linear fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendSummary {
    pub slope: f64,
    pub strength: f64,
    pub p_value: f64,
}

impl TrendSummary {
    fn undefined() -> Self {
        Self {
            slope: f64::NAN,
            strength: f64::NAN,
            p_value: f64::NAN,
        }
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.slope, self.strength, self.p_value]
    }
}

/// Fits `window` against its index and rounds the triple to 3/3/4 decimals.
///
/// Windows with fewer than two points have no defined trend and yield NaN,
/// which later rejects the symbol. A constant window yields `(0, 0, 1)`.
pub fn trend_summary(window: &[f64]) -> TrendSummary {
    let n = window.len();
    if n < 2 {
        return TrendSummary::undefined();
    }

    let nf = n as f64;
    let x_mean = (nf - 1.0) / 2.0;
    let y_mean = window.iter().sum::<f64>() / nf;

    let mut ss_x = 0.0;
    let mut ss_y = 0.0;
    let mut ss_xy = 0.0;
    for (i, y) in window.iter().enumerate() {
        let dx = i as f64 - x_mean;
        let dy = y - y_mean;
        ss_x += dx * dx;
        ss_y += dy * dy;
        ss_xy += dx * dy;
    }

    let slope = ss_xy / ss_x;
    let r = if ss_y == 0.0 {
        0.0
    } else {
        (ss_xy / (ss_x * ss_y).sqrt()).clamp(-1.0, 1.0)
    };

    let p_value = if n == 2 || r.abs() >= 1.0 {
        0.0
    } else {
        two_sided_p_value(r, n - 2)
    };

    TrendSummary {
        slope: round_to(slope, 3),
        strength: round_to(r.abs(), 3),
        p_value: round_to(p_value, 4),
    }
}

fn two_sided_p_value(r: f64, degrees_of_freedom: usize) -> f64 {
    let df = degrees_of_freedom as f64;
    let t = r * (df / ((1.0 - r) * (1.0 + r))).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => 2.0 * (1.0 - dist.cdf(t.abs())),
        Err(_) => f64::NAN,
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_line() {
        let trend = trend_summary(&[1.0, 3.0, 5.0, 7.0, 9.0]);
        assert_eq!(trend.slope, 2.0);
        assert_eq!(trend.strength, 1.0);
        assert_eq!(trend.p_value, 0.0);
    }

    #[test]
    fn test_falling_line_reports_absolute_strength() {
        let trend = trend_summary(&[10.0, 8.0, 6.0, 4.0]);
        assert_eq!(trend.slope, -2.0);
        assert_eq!(trend.strength, 1.0);
    }

    #[test]
    fn test_constant_window() {
        let trend = trend_summary(&[4.0; 7]);
        assert_eq!(trend.to_array(), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_two_points_have_zero_p_value() {
        let trend = trend_summary(&[1.0, 4.0]);
        assert_eq!(trend.slope, 3.0);
        assert_eq!(trend.p_value, 0.0);
    }

    #[test]
    fn test_short_window_is_undefined() {
        assert!(trend_summary(&[1.0]).slope.is_nan());
        assert!(trend_summary(&[]).p_value.is_nan());
    }

    #[test]
    fn test_noisy_window_matches_reference_fit() {
        // y = [1, 2, 1.5, 3, 2.5]: slope 0.4, r 0.8, t ~ 2.309 with 3 df
        let trend = trend_summary(&[1.0, 2.0, 1.5, 3.0, 2.5]);
        assert_eq!(trend.slope, 0.4);
        assert_eq!(trend.strength, 0.8);
        assert!(trend.p_value > 0.09 && trend.p_value < 0.12);
    }
}
