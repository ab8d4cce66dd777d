//! Metrics configuration.

use serde::{Deserialize, Serialize};

/// Conversion factor between steps and calories. It depends on metabolism in
/// practice, but values between 0.04 and 0.05 are generally acceptable.
pub const STEPS_TO_CALORIE_FACTOR: f64 = 0.04;

/// Configuration for the derived metrics engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Calories burnt per step.
    pub steps_to_calorie_factor: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            steps_to_calorie_factor: STEPS_TO_CALORIE_FACTOR,
        }
    }
}

impl MetricsConfig {
    /// Calories for a step count, truncated towards zero.
    pub fn calories_for(&self, steps: i64) -> i64 {
        (steps as f64 * self.steps_to_calorie_factor) as i64
    }
}
