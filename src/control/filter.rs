//! Scalar Kalman filter for analog stick smoothing
//!
//! Each axis of each input device gets its own [`SignalFilter`]. The filter is
//! a one-dimensional linear estimator with fixed parameters; it carries no
//! state other than the current estimate and its covariance.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("Invalid filter parameter: {0}")]
    InvalidParameter(String),
}

/// Filter parameters (steady-state scalar Kalman form)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    /// Process noise
    #[serde(default = "default_r")]
    pub r: f64,

    /// Measurement noise
    #[serde(default = "default_q")]
    pub q: f64,

    /// State transition
    #[serde(default = "default_one")]
    pub a: f64,

    /// Control gain
    #[serde(default)]
    pub b: f64,

    /// Observation gain
    #[serde(default = "default_one")]
    pub c: f64,
}

fn default_r() -> f64 { 0.2 }
fn default_q() -> f64 { 0.1 }
fn default_one() -> f64 { 1.0 }

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            r: default_r(),
            q: default_q(),
            a: 1.0,
            b: 0.0,
            c: 1.0,
        }
    }
}

impl FilterParams {
    /// Reject parameter sets the update step cannot evaluate
    pub fn validate(&self) -> Result<(), FilterError> {
        let all = [("r", self.r), ("q", self.q), ("a", self.a), ("b", self.b), ("c", self.c)];
        for (name, value) in all {
            if !value.is_finite() {
                return Err(FilterError::InvalidParameter(format!(
                    "{} must be finite, got {}",
                    name, value
                )));
            }
        }

        if self.c == 0.0 {
            return Err(FilterError::InvalidParameter(
                "c (observation gain) must be non-zero".into(),
            ));
        }

        Ok(())
    }
}

/// Current estimate; both halves become defined on the first sample
#[derive(Debug, Clone, Copy, PartialEq)]
struct Estimate {
    value: f64,
    covariance: f64,
}

/// Single-axis recursive estimator
#[derive(Debug, Clone)]
pub struct SignalFilter {
    params: FilterParams,
    state: Option<Estimate>,
}

impl SignalFilter {
    /// Create an unprimed filter
    pub fn new(params: FilterParams) -> Result<Self, FilterError> {
        params.validate()?;
        Ok(Self { params, state: None })
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    /// Current estimate, `None` before the first sample
    pub fn estimate(&self) -> Option<f64> {
        self.state.map(|s| s.value)
    }

    /// Current covariance, `None` before the first sample
    pub fn covariance(&self) -> Option<f64> {
        self.state.map(|s| s.covariance)
    }

    /// Feed one measurement with no control input
    pub fn filter(&mut self, measurement: f64) -> f64 {
        self.filter_with_control(measurement, 0.0)
    }

    /// Feed one measurement and control input, returning the new estimate
    pub fn filter_with_control(&mut self, measurement: f64, control: f64) -> f64 {
        let FilterParams { r, q, a, b, c } = self.params;

        let next = match self.state {
            None => Estimate {
                value: measurement / c,
                covariance: q / (c * c),
            },
            Some(prev) => {
                let predicted = a * prev.value + b * control;
                let predicted_cov = a * a * prev.covariance + r;

                let gain = predicted_cov * c / (c * c * predicted_cov + q);

                Estimate {
                    value: predicted + gain * (measurement - c * predicted),
                    covariance: predicted_cov - gain * c * predicted_cov,
                }
            }
        };

        self.state = Some(next);
        next.value
    }

    /// Forget the current estimate
    pub fn reset(&mut self) {
        self.state = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_call_returns_measurement() {
        let mut filter = SignalFilter::new(FilterParams::default()).unwrap();
        assert_eq!(filter.estimate(), None);
        assert_eq!(filter.covariance(), None);

        assert_eq!(filter.filter(5.0), 5.0);
        assert_eq!(filter.estimate(), Some(5.0));
        assert_eq!(filter.covariance(), Some(0.1));
    }

    #[test]
    fn test_first_call_scales_by_observation_gain() {
        let params = FilterParams { c: 2.0, ..FilterParams::default() };
        let mut filter = SignalFilter::new(params).unwrap();

        assert_eq!(filter.filter(5.0), 2.5);
        assert_eq!(filter.covariance(), Some(0.1 / 4.0));
    }

    #[test]
    fn test_converges_monotonically() {
        let mut filter = SignalFilter::new(FilterParams::default()).unwrap();
        filter.filter(0.0);

        let target = 10.0;
        let mut last_error = f64::MAX;
        for _ in 0..50 {
            let error = (target - filter.filter(target)).abs();
            assert!(error <= last_error, "error grew: {} > {}", error, last_error);
            last_error = error;
        }

        assert!(last_error < 1e-3, "error after 50 steps: {}", last_error);
    }

    #[test]
    fn test_constant_input_is_stable() {
        let mut filter = SignalFilter::new(FilterParams::default()).unwrap();
        for _ in 0..50 {
            assert!((filter.filter(-3.5) + 3.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_control_input_shifts_prediction() {
        let params = FilterParams { b: 1.0, ..FilterParams::default() };
        let mut with_control = SignalFilter::new(params).unwrap();
        let mut without = SignalFilter::new(params).unwrap();

        with_control.filter(0.0);
        without.filter(0.0);

        assert!(with_control.filter_with_control(0.0, 1.0) > without.filter(0.0));
    }

    #[test]
    fn test_reset_unprimes() {
        let mut filter = SignalFilter::new(FilterParams::default()).unwrap();
        filter.filter(1.0);
        filter.filter(2.0);
        filter.reset();

        assert_eq!(filter.estimate(), None);
        assert_eq!(filter.filter(7.0), 7.0);
    }

    #[test]
    fn test_zero_observation_gain_rejected() {
        let params = FilterParams { c: 0.0, ..FilterParams::default() };
        assert!(SignalFilter::new(params).is_err());
    }

    #[test]
    fn test_non_finite_parameter_rejected() {
        let params = FilterParams { q: f64::NAN, ..FilterParams::default() };
        assert!(params.validate().is_err());

        let params = FilterParams { r: f64::INFINITY, ..FilterParams::default() };
        assert!(params.validate().is_err());
    }
}
