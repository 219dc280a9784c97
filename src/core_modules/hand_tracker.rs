// THEORY:
// The `hand_tracker` watches how still the learner's hands are. Each detected
// hand is reduced to the centroid of its five fingertips, and every centroid
// goes into one shared movement window (hands are not told apart by identity).
//
// Once the window holds more than a handful of points, the spread of the most
// recent centroids becomes two signals:
// - **Fidgeting**: the summed per-axis standard deviation exceeds a threshold.
//   Every fidgeting frame bumps a session-level counter that the fusion layer
//   reads and slowly decays.
// - **Motor precision**: 1 - 10 x spread, clamped to [0, 1]. A steady hand scores
//   near 1, a restless one collapses toward 0.

use crate::config::EngineConfig;
use crate::core_modules::history::HistoryBuffer;
use crate::core_modules::landmarks::{HandLandmarks, LandmarkPoint};
use crate::core_modules::utils::stats::stats;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Motor analysis starts once the movement window holds more than this many centroids.
const MOTOR_ACTIVATION_SAMPLES: usize = 5;
const PRECISION_SENSITIVITY: f64 = 10.0;

/// Hand measurements for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandMetrics {
    pub hands_detected: usize,
    pub fidgeting: bool,
    /// 1.0 is perfectly steady.
    pub motor_precision: f64,
    /// Always false until a tremor detector exists.
    pub tremor_detected: bool,
}

impl Default for HandMetrics {
    fn default() -> Self {
        Self {
            hands_detected: 0,
            fidgeting: false,
            motor_precision: 1.0,
            tremor_detected: false,
        }
    }
}

/// Tracks fingertip movement across frames.
#[derive(Debug, Clone)]
pub struct HandTracker {
    /// Fingertip centroids of every detected hand, in arrival order.
    centroid_history: HistoryBuffer<LandmarkPoint>,
    /// The most recent motor precision scores.
    precision_history: HistoryBuffer<f64>,
    /// Fidgeting frames seen, decayed by the fusion layer.
    fidget_count: u32,
    fidget_threshold: f64,
    motor_window: usize,
}

impl HandTracker {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            centroid_history: HistoryBuffer::new(config.buffer_size),
            precision_history: HistoryBuffer::new(config.precision_history_size),
            fidget_count: 0,
            fidget_threshold: config.fidget_threshold,
            motor_window: config.motor_window,
        }
    }

    /// Processes every hand detected this frame. Returns `None` when no usable hand was seen.
    pub fn update(&mut self, hands: &[HandLandmarks]) -> Option<HandMetrics> {
        let mut metrics = HandMetrics::default();

        for hand in hands {
            let Some(centroid) = hand.fingertip_centroid() else {
                warn!(points = hand.points.len(), "hand is missing fingertip landmarks");
                continue;
            };
            metrics.hands_detected += 1;

            let motor_ready = self.centroid_history.len() > MOTOR_ACTIVATION_SAMPLES;
            self.centroid_history.push(centroid);
            if !motor_ready {
                continue;
            }

            let total_movement = self.recent_movement();
            if total_movement > self.fidget_threshold {
                metrics.fidgeting = true;
                self.fidget_count += 1;
                debug!(total_movement, fidget_count = self.fidget_count, "fidgeting frame");
            }

            metrics.motor_precision = (1.0 - total_movement * PRECISION_SENSITIVITY).clamp(0.0, 1.0);
            self.precision_history.push(metrics.motor_precision);
        }

        (metrics.hands_detected > 0).then_some(metrics)
    }

    /// Sum of the per-axis standard deviations of the most recent centroids.
    fn recent_movement(&self) -> f64 {
        let recent: Vec<&LandmarkPoint> = self.centroid_history.recent(self.motor_window).collect();
        let xs: Vec<f64> = recent.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = recent.iter().map(|p| p.y).collect();
        stats::std_dev(&xs) + stats::std_dev(&ys)
    }

    /// Mean of the buffered precision scores, 1.0 before any were recorded.
    pub fn mean_precision(&self) -> f64 {
        if self.precision_history.is_empty() {
            return 1.0;
        }
        stats::mean(self.precision_history.iter().copied())
    }

    pub fn fidget_count(&self) -> u32 {
        self.fidget_count
    }

    /// Mutable access for the fusion layer, which decays the counter.
    pub fn fidget_count_mut(&mut self) -> &mut u32 {
        &mut self.fidget_count
    }

    pub fn centroid_history(&self) -> &HistoryBuffer<LandmarkPoint> {
        &self.centroid_history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::synthetic_hand;

    #[test]
    fn no_hands_produces_no_metrics() {
        let mut tracker = HandTracker::new(&EngineConfig::default());
        assert!(tracker.update(&[]).is_none());
        let broken = HandLandmarks::new(vec![LandmarkPoint::new(0.5, 0.5); 10]);
        assert!(tracker.update(&[broken]).is_none());
        assert!(tracker.centroid_history().is_empty());
    }

    #[test]
    fn warmup_reports_full_precision() {
        let mut tracker = HandTracker::new(&EngineConfig::default());
        for i in 0..6 {
            let hand = synthetic_hand(LandmarkPoint::new(0.1 * i as f64, 0.5), 0.02);
            let metrics = tracker.update(&[hand]).unwrap();
            assert_eq!(metrics.motor_precision, 1.0);
            assert!(!metrics.fidgeting);
        }
        assert_eq!(tracker.centroid_history().len(), 6);
        assert_eq!(tracker.mean_precision(), 1.0);
    }

    #[test]
    fn steady_hand_keeps_precision() {
        let mut tracker = HandTracker::new(&EngineConfig::default());
        let mut last = None;
        for _ in 0..12 {
            last = tracker.update(&[synthetic_hand(LandmarkPoint::new(0.4, 0.6), 0.02)]);
        }
        let metrics = last.unwrap();
        assert!(!metrics.fidgeting);
        assert!(metrics.motor_precision > 0.99);
        assert_eq!(tracker.fidget_count(), 0);
    }

    #[test]
    fn scattered_hand_is_fidgeting() {
        let mut tracker = HandTracker::new(&EngineConfig::default());
        for _ in 0..6 {
            tracker.update(&[synthetic_hand(LandmarkPoint::new(0.5, 0.5), 0.02)]);
        }
        let scattered = [(0.1, 0.1), (0.9, 0.9), (0.1, 0.9), (0.9, 0.1)];
        let mut last = None;
        for (x, y) in scattered {
            last = tracker.update(&[synthetic_hand(LandmarkPoint::new(x, y), 0.02)]);
        }
        let metrics = last.unwrap();
        assert!(metrics.fidgeting);
        assert!(metrics.motor_precision < 0.5);
        assert_eq!(tracker.fidget_count(), 4);
        assert!(tracker.mean_precision() < 0.7);
    }

    #[test]
    fn two_hands_share_one_window() {
        let mut tracker = HandTracker::new(&EngineConfig::default());
        let left = synthetic_hand(LandmarkPoint::new(0.3, 0.5), 0.02);
        let right = synthetic_hand(LandmarkPoint::new(0.7, 0.5), 0.02);
        let metrics = tracker.update(&[left, right]).unwrap();
        assert_eq!(metrics.hands_detected, 2);
        assert_eq!(tracker.centroid_history().len(), 2);
    }
}
