//! Pointwise loss functions applied at the output layer.

use serde_derive::{Deserialize, Serialize};

/// The loss between one output unit and its target.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ErrorFunction {
    /// `0.5 * (actual - target)^2`
    SquaredError,
    /// `-(t * ln(a) + (1 - t) * ln(1 - a))`, for outputs in `(0, 1)`.
    ///
    /// Outputs at or beyond either end of the open interval contribute zero
    /// to both the error and its derivative.
    CrossEntropy,
}

impl Default for ErrorFunction {
    fn default() -> Self {
        ErrorFunction::SquaredError
    }
}

impl ErrorFunction {
    /// The error `E(actual, target)`.
    pub fn e(&self, actual: f64, target: f64) -> f64 {
        match *self {
            ErrorFunction::SquaredError => {
                0.5 * (actual - target) * (actual - target)
            }
            ErrorFunction::CrossEntropy => {
                if actual <= 0.0 || actual >= 1.0 {
                    return 0.0;
                }
                -(target * actual.ln() + (1.0 - target) * (1.0 - actual).ln())
            }
        }
    }

    /// The derivative `dE/d(actual)`.
    pub fn de(&self, actual: f64, target: f64) -> f64 {
        match *self {
            ErrorFunction::SquaredError => actual - target,
            ErrorFunction::CrossEntropy => {
                if actual <= 0.0 || actual >= 1.0 {
                    return 0.0;
                }
                (actual - target) / (actual * (1.0 - actual))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squared_error() {
        let e = ErrorFunction::SquaredError;
        assert_eq!(e.e(3.0, 1.0), 2.0);
        assert_eq!(e.de(3.0, 1.0), 2.0);
        assert_eq!(e.e(1.0, 1.0), 0.0);
    }

    #[test]
    fn cross_entropy_matches_finite_difference() {
        let e = ErrorFunction::CrossEntropy;
        let h = 1e-7;
        for &(a, t) in &[(0.2, 1.0), (0.7, 0.0), (0.5, 0.5), (0.9, 1.0)] {
            let numeric = (e.e(a + h, t) - e.e(a - h, t)) / (2.0 * h);
            assert!((e.de(a, t) - numeric).abs() < 1e-5);
        }
    }

    #[test]
    fn cross_entropy_guards_saturation() {
        let e = ErrorFunction::CrossEntropy;
        for &a in &[0.0, 1.0, -0.5, 1.5] {
            assert_eq!(e.e(a, 1.0), 0.0);
            assert_eq!(e.de(a, 0.0), 0.0);
        }
        assert!(e.e(1e-300, 1.0).is_finite());
    }
}
