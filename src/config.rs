// THEORY:
// Every numeric threshold the engine uses lives in `EngineConfig`. The defaults
// reproduce the reference heuristics exactly; a deployment can override any
// subset of them from a TOML file. `validate` catches the configurations that
// would make the engine meaningless (zero-capacity windows, negative or
// non-finite thresholds) before any buffer is allocated.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable behavior for the signal-fusion engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of the EAR, blink, head-pose, hand-centroid and raw sample buffers.
    pub buffer_size: usize,

    // --- Eye / gaze ---
    /// Average EAR below which the eyes count as closed.
    pub blink_ear_threshold: f64,
    /// Minimum time between two counted blinks.
    pub blink_debounce_secs: f64,
    /// Trailing horizon over which the blink rate is computed.
    pub blink_rate_window_secs: f64,
    /// Blink rate (per minute) that maximizes the eye attention factor.
    pub optimal_blink_rate: f64,
    /// Gaze stability (EAR std) above which reading difficulty is suspected.
    pub gaze_instability_threshold: f64,
    /// Blink rate (per minute) above which blinking is excessive.
    pub high_blink_rate: f64,
    /// Blink rate (per minute) below which blinking is too infrequent.
    pub low_blink_rate: f64,

    // --- Head pose ---
    /// The movement variance is only recomputed once more than this many samples exist.
    pub head_min_samples: usize,
    /// Movement variance above which head movement is excessive.
    pub head_movement_threshold: f64,

    // --- Hands ---
    /// Summed per-axis centroid std above which the frame counts as fidgeting.
    pub fidget_threshold: f64,
    /// Number of most recent centroids used for motor analysis.
    pub motor_window: usize,
    /// Capacity of the motor-precision score buffer.
    pub precision_history_size: usize,

    // --- Accessibility ---
    /// Capacity of the screen-distance sample buffer.
    pub screen_distance_history_size: usize,

    // --- Analytics and alerts ---
    /// Maximum number of retained analytics points.
    pub analytics_capacity: usize,
    /// Alerts older than this are no longer visible.
    pub alert_retention_hours: f64,
    /// Stress (0-1) above which a `high_stress` alert fires.
    pub stress_alert_threshold: f64,
    /// Visual strain (0-100) above which a `visual_strain` alert fires.
    pub visual_strain_alert_threshold: f64,
    /// ADHD-risk score (0-100) above which an `adhd_support` alert fires.
    pub adhd_alert_threshold: f64,
    /// Cognitive load (0-100) above which a `cognitive_overload` alert fires.
    pub cognitive_overload_alert_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_size: 30,
            blink_ear_threshold: 0.25,
            blink_debounce_secs: 0.3,
            blink_rate_window_secs: 60.0,
            optimal_blink_rate: 15.0,
            gaze_instability_threshold: 0.1,
            high_blink_rate: 25.0,
            low_blink_rate: 8.0,
            head_min_samples: 10,
            head_movement_threshold: 0.01,
            fidget_threshold: 0.05,
            motor_window: 10,
            precision_history_size: 10,
            screen_distance_history_size: 20,
            analytics_capacity: 1000,
            alert_retention_hours: 24.0,
            stress_alert_threshold: 0.8,
            visual_strain_alert_threshold: 75.0,
            adhd_alert_threshold: 70.0,
            cognitive_overload_alert_threshold: 80.0,
        }
    }
}

impl EngineConfig {
    /// Parses a (possibly partial) TOML document; missing fields keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let capacities = [
            ("buffer_size", self.buffer_size),
            ("motor_window", self.motor_window),
            ("precision_history_size", self.precision_history_size),
            ("screen_distance_history_size", self.screen_distance_history_size),
            ("analytics_capacity", self.analytics_capacity),
        ];
        for (field, value) in capacities {
            if value == 0 {
                return Err(ConfigError::ZeroCapacity { field });
            }
        }

        let thresholds = [
            ("blink_ear_threshold", self.blink_ear_threshold),
            ("blink_debounce_secs", self.blink_debounce_secs),
            ("gaze_instability_threshold", self.gaze_instability_threshold),
            ("high_blink_rate", self.high_blink_rate),
            ("low_blink_rate", self.low_blink_rate),
            ("head_movement_threshold", self.head_movement_threshold),
            ("fidget_threshold", self.fidget_threshold),
            ("stress_alert_threshold", self.stress_alert_threshold),
            ("visual_strain_alert_threshold", self.visual_strain_alert_threshold),
            ("adhd_alert_threshold", self.adhd_alert_threshold),
            ("cognitive_overload_alert_threshold", self.cognitive_overload_alert_threshold),
        ];
        for (field, value) in thresholds {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidThreshold { field, value });
            }
        }

        let horizons = [
            ("blink_rate_window_secs", self.blink_rate_window_secs),
            ("optimal_blink_rate", self.optimal_blink_rate),
            ("alert_retention_hours", self.alert_retention_hours),
        ];
        for (field, value) in horizons {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidThreshold { field, value });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.buffer_size, 30);
        assert_eq!(config.analytics_capacity, 1000);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            "buffer_size = 45\nstress_alert_threshold = 0.7\n",
        )
        .unwrap();
        assert_eq!(config.buffer_size, 45);
        assert_eq!(config.stress_alert_threshold, 0.7);
        assert_eq!(config.blink_ear_threshold, 0.25);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = EngineConfig::from_toml_str("analytics_capacity = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ZeroCapacity { field: "analytics_capacity" }
        ));
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let config = EngineConfig {
            fidget_threshold: -0.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThreshold { field: "fidget_threshold", .. })
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            EngineConfig::from_toml_str("buffer_size = \"lots\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
