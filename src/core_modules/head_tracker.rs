// THEORY:
// The `head_tracker` follows the learner's head across frames. A single frame
// yields a position (the nose tip) and a tilt (the angle of the line between
// the eye corners). Over a short window, the spread of those values becomes a
// restlessness signal: a head that keeps moving is a classic attention-
// difficulty indicator.
//
// The movement variance is sticky: it is recomputed only when a frame with a
// face arrives and enough samples have accumulated, and otherwise keeps its
// last value.

use crate::config::EngineConfig;
use crate::core_modules::history::HistoryBuffer;
use crate::core_modules::landmarks::{
    CHIN, FaceLandmarks, LEFT_EAR, LEFT_EYE_CORNER, NOSE_TIP, RIGHT_EAR, RIGHT_EYE_CORNER,
};
use crate::core_modules::utils::stats::stats;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Head position in normalized image coordinates, tilt in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadPosition {
    pub x: f64,
    pub y: f64,
    pub tilt: f64,
}

/// Head measurements for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadMetrics {
    pub position: HeadPosition,
    /// var(x) + var(y) + var(tilt) over the pose window.
    pub movement_variance: f64,
    pub excessive_movement: bool,
}

/// Tracks head pose over a short window of frames.
#[derive(Debug, Clone)]
pub struct HeadTracker {
    /// The last N observed head positions.
    pose_history: HistoryBuffer<HeadPosition>,
    /// The most recently computed movement variance.
    movement_variance: f64,
    min_samples: usize,
    movement_threshold: f64,
}

impl HeadTracker {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            pose_history: HistoryBuffer::new(config.buffer_size),
            movement_variance: 0.0,
            min_samples: config.head_min_samples,
            movement_threshold: config.head_movement_threshold,
        }
    }

    /// Processes one frame. Returns `None` when no usable face was detected;
    /// the previous movement variance is kept in that case.
    pub fn update(&mut self, face: Option<&FaceLandmarks>) -> Option<HeadMetrics> {
        let face = face.filter(|f| !f.is_empty())?;
        let Some(position) = Self::estimate_position(face) else {
            warn!(points = face.len(), "incomplete head landmarks, skipping head pose");
            return None;
        };

        self.pose_history.push(position);

        if self.pose_history.len() > self.min_samples {
            let xs: Vec<f64> = self.pose_history.iter().map(|p| p.x).collect();
            let ys: Vec<f64> = self.pose_history.iter().map(|p| p.y).collect();
            let tilts: Vec<f64> = self.pose_history.iter().map(|p| p.tilt).collect();
            self.movement_variance =
                stats::variance(&xs) + stats::variance(&ys) + stats::variance(&tilts);
        }

        Some(HeadMetrics {
            position,
            movement_variance: self.movement_variance,
            excessive_movement: self.is_excessive(),
        })
    }

    fn estimate_position(face: &FaceLandmarks) -> Option<HeadPosition> {
        let nose = face.get(NOSE_TIP)?;
        let left_eye = face.get(LEFT_EYE_CORNER)?;
        let right_eye = face.get(RIGHT_EYE_CORNER)?;
        // Chin and ears anchor the mesh; a result without them is not a full face.
        face.get(CHIN)?;
        face.get(LEFT_EAR)?;
        face.get(RIGHT_EAR)?;

        Some(HeadPosition {
            x: nose.x,
            y: nose.y,
            tilt: (right_eye.y - left_eye.y).atan2(right_eye.x - left_eye.x),
        })
    }

    pub fn movement_variance(&self) -> f64 {
        self.movement_variance
    }

    pub fn is_excessive(&self) -> bool {
        self.movement_variance > self.movement_threshold
    }

    pub fn pose_history(&self) -> &HistoryBuffer<HeadPosition> {
        &self.pose_history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::landmarks::LandmarkPoint;
    use crate::simulation::{FaceSpec, synthetic_face};

    fn face_at(x: f64, y: f64, tilt: f64) -> FaceLandmarks {
        synthetic_face(&FaceSpec {
            nose: LandmarkPoint::new(x, y),
            tilt,
            ..FaceSpec::default()
        })
    }

    #[test]
    fn tilt_follows_eye_line() {
        let mut tracker = HeadTracker::new(&EngineConfig::default());
        let metrics = tracker.update(Some(&face_at(0.5, 0.5, 0.2))).unwrap();
        assert!((metrics.position.tilt - 0.2).abs() < 1e-9);
        assert!((metrics.position.x - 0.5).abs() < 1e-12);
    }

    #[test]
    fn variance_waits_for_enough_samples() {
        let mut tracker = HeadTracker::new(&EngineConfig::default());
        for i in 0..10 {
            let x = if i % 2 == 0 { 0.2 } else { 0.8 };
            let metrics = tracker.update(Some(&face_at(x, 0.5, 0.0))).unwrap();
            assert_eq!(metrics.movement_variance, 0.0);
        }
        let metrics = tracker.update(Some(&face_at(0.2, 0.5, 0.0))).unwrap();
        assert!(metrics.movement_variance > 0.01);
        assert!(metrics.excessive_movement);
    }

    #[test]
    fn still_head_is_not_excessive() {
        let mut tracker = HeadTracker::new(&EngineConfig::default());
        let mut last = None;
        for _ in 0..15 {
            last = tracker.update(Some(&face_at(0.5, 0.5, 0.05)));
        }
        let metrics = last.unwrap();
        assert!(metrics.movement_variance < 1e-12);
        assert!(!metrics.excessive_movement);
    }

    #[test]
    fn missing_face_keeps_previous_variance() {
        let mut tracker = HeadTracker::new(&EngineConfig::default());
        for i in 0..12 {
            let y = if i % 2 == 0 { 0.3 } else { 0.7 };
            tracker.update(Some(&face_at(0.5, y, 0.0)));
        }
        let before = tracker.movement_variance();
        assert!(tracker.update(None).is_none());
        let truncated = FaceLandmarks::new(vec![LandmarkPoint::new(0.5, 0.5); 100]);
        assert!(tracker.update(Some(&truncated)).is_none());
        assert_eq!(tracker.movement_variance(), before);
        assert_eq!(tracker.pose_history().len(), 12);
    }
}
