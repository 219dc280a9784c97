// THEORY:
// The `eye_tracker` module is the gaze layer of the engine. It turns a stream
// of face meshes into blink events and gaze statistics.
//
// Key architectural principles:
// 1.  **Per-Frame Geometry**: Each frame is reduced to one number, the average
//     eye-aspect-ratio (EAR) of both eyes. EAR collapses when the lids close.
// 2.  **Debounced Events**: A blink is an EAR dip that happens at least
//     `blink_debounce_secs` after the previous counted blink, so one long
//     closure spread over several frames is a single blink.
// 3.  **Two Horizons**: Blink timestamps live in a count-bounded buffer, but the
//     blink rate is computed over a fixed time horizon (60 s by default). The two
//     windows are deliberately independent.
// 4.  **Graceful Degradation**: A frame without a face produces no metrics and
//     leaves the state untouched; a truncated mesh falls back to a neutral EAR.

use crate::config::EngineConfig;
use crate::core_modules::history::HistoryBuffer;
use crate::core_modules::landmarks::{FaceLandmarks, LandmarkPoint, LEFT_EYE_INDICES, RIGHT_EYE_INDICES};
use crate::core_modules::utils::clock::seconds_between;
use crate::core_modules::utils::stats::stats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// EAR assumed for an eye whose landmarks are incomplete.
pub const DEFAULT_EAR: f64 = 0.3;
const EAR_EPSILON: f64 = 1e-6;
const EAR_POINTS_PER_EYE: usize = 6;
/// Gaze stability is only computed once more than this many EAR samples exist.
const MIN_GAZE_SAMPLES: usize = 5;

/// Gaze and blink measurements for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeMetrics {
    /// Blinks counted in the trailing rate window, expressed per minute.
    pub blink_rate: f64,
    /// Average EAR of both eyes in this frame.
    pub eye_aspect_ratio: f64,
    /// Population standard deviation of the buffered EAR samples.
    pub gaze_stability: f64,
    /// Unstable gaze or excessive blinking.
    pub reading_difficulty: bool,
    /// Whether this frame produced a counted blink.
    pub blink_detected: bool,
}

/// Eye-aspect-ratio of a single eye from its first six contour points, or
/// `None` if fewer than six points are available.
pub fn eye_aspect_ratio(points: &[LandmarkPoint]) -> Option<f64> {
    if points.len() < EAR_POINTS_PER_EYE {
        return None;
    }
    let vertical_1 = points[1].distance(&points[5]);
    let vertical_2 = points[2].distance(&points[4]);
    let horizontal = points[0].distance(&points[3]);
    Some((vertical_1 + vertical_2) / (2.0 * horizontal + EAR_EPSILON))
}

/// Stateful blink and gaze analyzer.
#[derive(Debug, Clone)]
pub struct EyeTracker {
    /// Average EAR for the last N frames with a face.
    ear_history: HistoryBuffer<f64>,
    /// Timestamps of the last N counted blinks.
    blink_history: HistoryBuffer<DateTime<Utc>>,
    /// When the most recent blink was counted.
    last_blink_at: Option<DateTime<Utc>>,
    /// Total blinks counted this session.
    blink_count: u64,
    ear_threshold: f64,
    debounce_secs: f64,
    rate_window_secs: f64,
    gaze_threshold: f64,
    high_blink_rate: f64,
}

impl EyeTracker {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            ear_history: HistoryBuffer::new(config.buffer_size),
            blink_history: HistoryBuffer::new(config.buffer_size),
            last_blink_at: None,
            blink_count: 0,
            ear_threshold: config.blink_ear_threshold,
            debounce_secs: config.blink_debounce_secs,
            rate_window_secs: config.blink_rate_window_secs,
            gaze_threshold: config.gaze_instability_threshold,
            high_blink_rate: config.high_blink_rate,
        }
    }

    /// Processes one frame. Returns `None` (and changes nothing) when no face was detected.
    pub fn update(&mut self, face: Option<&FaceLandmarks>, at: DateTime<Utc>) -> Option<EyeMetrics> {
        let face = face.filter(|f| !f.is_empty())?;

        let left_ear = Self::eye_ear_or_default(face, &LEFT_EYE_INDICES, "left");
        let right_ear = Self::eye_ear_or_default(face, &RIGHT_EYE_INDICES, "right");
        let avg_ear = (left_ear + right_ear) / 2.0;

        let blink_detected = avg_ear < self.ear_threshold && self.debounce_elapsed(at);
        if blink_detected {
            self.blink_count += 1;
            self.last_blink_at = Some(at);
            self.blink_history.push(at);
            debug!(ear = avg_ear, total = self.blink_count, "blink counted");
        }

        self.ear_history.push(avg_ear);

        let blink_rate = self.blink_rate_at(at);
        let gaze_stability = self.gaze_stability();

        Some(EyeMetrics {
            blink_rate,
            eye_aspect_ratio: avg_ear,
            gaze_stability,
            reading_difficulty: gaze_stability > self.gaze_threshold || blink_rate > self.high_blink_rate,
            blink_detected,
        })
    }

    fn eye_ear_or_default(face: &FaceLandmarks, indices: &[usize], side: &str) -> f64 {
        face.resolve(&indices[..EAR_POINTS_PER_EYE])
            .and_then(|points| eye_aspect_ratio(&points))
            .unwrap_or_else(|| {
                warn!(side, mesh_points = face.len(), "incomplete eye landmarks, using default EAR");
                DEFAULT_EAR
            })
    }

    fn debounce_elapsed(&self, at: DateTime<Utc>) -> bool {
        match self.last_blink_at {
            Some(last) => seconds_between(last, at) >= self.debounce_secs,
            None => true,
        }
    }

    /// Blinks in the trailing rate window ending at `at`, per minute.
    pub fn blink_rate_at(&self, at: DateTime<Utc>) -> f64 {
        let recent = self
            .blink_history
            .iter()
            .filter(|&&t| seconds_between(t, at) < self.rate_window_secs)
            .count();
        (recent as f64 / self.rate_window_secs) * 60.0
    }

    /// EAR standard deviation over the buffer, 0 until enough samples exist.
    pub fn gaze_stability(&self) -> f64 {
        if self.ear_history.len() <= MIN_GAZE_SAMPLES {
            return 0.0;
        }
        let samples: Vec<f64> = self.ear_history.iter().copied().collect();
        stats::std_dev(&samples)
    }

    pub fn blink_count(&self) -> u64 {
        self.blink_count
    }

    pub fn ear_history(&self) -> &HistoryBuffer<f64> {
        &self.ear_history
    }
}
